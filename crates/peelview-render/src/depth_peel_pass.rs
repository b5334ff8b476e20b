//! Depth peeling pass for layer extraction.
//!
//! Each peel pass renders the scene into one of two `Rgba32Float` targets,
//! discarding fragments at or in front of the depth stored in the other one,
//! and counts the surviving samples with an occlusion query. The two targets
//! swap roles after every non-empty pass.

use glam::Mat4;

use crate::error::{RenderError, RenderResult};
use crate::gpu::{aligned_bytes_per_row, GpuContext};
use crate::layers::{PeelBackend, PingPong};
use crate::shader::ShaderSetup;

/// Format of the peel targets: red = depth, green/blue/alpha = normal.
pub const PEEL_TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Bytes per texel of [`PEEL_TARGET_FORMAT`].
const TEXEL_BYTES: u32 = 16;

/// Bytes of one resolved occlusion query result.
const QUERY_RESULT_BYTES: u64 = 8;

/// Geometry drawn by each peel pass.
///
/// Implementations record their draw calls into `pass`. The pipeline and
/// bind group are already set; vertex buffer slot 0 must hold
/// `[position: vec3<f32>, normal: vec3<f32>]` vertices (see
/// [`PEEL_VERTEX_LAYOUT`]).
pub trait PeelScene {
    /// Records the draw calls.
    fn draw(&self, pass: &mut wgpu::RenderPass<'_>);
}

/// Vertex layout expected by the peel pipeline.
pub const PEEL_VERTEX_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: 24,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &[
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x3,
            offset: 0,
            shader_location: 0,
        },
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x3,
            offset: 12,
            shader_location: 1,
        },
    ],
};

/// GPU representation of peel uniforms.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PeelUniforms {
    /// View matrix.
    pub view: [[f32; 4]; 4],
    /// Projection matrix.
    pub projection: [[f32; 4]; 4],
}

impl Default for PeelUniforms {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY.to_cols_array_2d(),
            projection: Mat4::IDENTITY.to_cols_array_2d(),
        }
    }
}

/// One peel target and the bind group that reads it as the reference.
struct PeelTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    reference_bind_group: wgpu::BindGroup,
}

/// Everything allocated for a single generation.
struct Generation {
    pipeline: wgpu::RenderPipeline,
    targets: PingPong<PeelTarget>,
    depth_view: wgpu::TextureView,
    query_set: wgpu::QuerySet,
    query_resolve_buffer: wgpu::Buffer,
    query_readback_buffer: wgpu::Buffer,
    color_readback_buffer: wgpu::Buffer,
}

/// [`PeelBackend`] rendering a [`PeelScene`] with wgpu.
pub struct WgpuPeelBackend<'a, S: PeelScene> {
    gpu: &'a GpuContext,
    scene: &'a S,
    shader: ShaderSetup,
    width: u32,
    height: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    generation: Option<Generation>,
}

impl<'a, S: PeelScene> WgpuPeelBackend<'a, S> {
    /// Creates a backend rendering `scene` at `width` × `height` with `shader`.
    pub fn new(
        gpu: &'a GpuContext,
        scene: &'a S,
        shader: ShaderSetup,
        width: u32,
        height: u32,
    ) -> Self {
        let device = &gpu.device;

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("peel uniforms"),
            size: std::mem::size_of::<PeelUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("peel bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("peel pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        Self {
            gpu,
            scene,
            shader,
            width: width.max(1),
            height: height.max(1),
            uniform_buffer,
            bind_group_layout,
            pipeline_layout,
            generation: None,
        }
    }

    /// The peel shader setup.
    #[must_use]
    pub fn shader(&self) -> &ShaderSetup {
        &self.shader
    }

    /// Mutable access to the peel shader setup; changes apply from the next
    /// generation on.
    pub fn shader_mut(&mut self) -> &mut ShaderSetup {
        &mut self.shader
    }

    /// Returns whether a generation is running.
    #[must_use]
    pub fn is_generating(&self) -> bool {
        self.generation.is_some()
    }

    fn active(&self) -> RenderResult<&Generation> {
        self.generation
            .as_ref()
            .ok_or(RenderError::InvalidState("no generation running"))
    }

    fn create_pipeline(&self) -> RenderResult<wgpu::RenderPipeline> {
        let module = self.shader.build_module(&self.gpu.device)?;
        let owned_constants = self.shader.constants();
        let constants: Vec<(&str, f64)> = owned_constants
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
            .collect();

        let pipeline = self.gpu.allocate("peel pipeline", |device| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("layer peel pipeline"),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: Some(self.shader.vertex_entry()),
                    buffers: &[PEEL_VERTEX_LAYOUT],
                    compilation_options: wgpu::PipelineCompilationOptions {
                        constants: &constants,
                        ..Default::default()
                    },
                },
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: Some(self.shader.fragment_entry()),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: PEEL_TARGET_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions {
                        constants: &constants,
                        ..Default::default()
                    },
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None, // Back faces are layers too
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        });
        pipeline.map_err(|e| match e {
            RenderError::ResourceAllocation(msg) => RenderError::ShaderCompilationFailed(msg),
            other => other,
        })
    }

    fn create_target(&self, device: &wgpu::Device, label: &str) -> PeelTarget {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: self.extent(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: PEEL_TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let reference_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
            ],
        });
        PeelTarget {
            texture,
            view,
            reference_bind_group,
        }
    }

    fn create_depth_view(&self, device: &wgpu::Device) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("peel depth buffer"),
            size: self.extent(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }

    fn fill_target(&self, target: &PeelTarget, value: f32) {
        let texels = vec![[value, 0.0, 0.0, 0.0]; (self.width * self.height) as usize];
        self.gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&texels),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.width * TEXEL_BYTES),
                rows_per_image: Some(self.height),
            },
            self.extent(),
        );
    }

    fn map_and_read(&self, buffer: &wgpu::Buffer) -> RenderResult<Vec<u8>> {
        let slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.gpu.wait_idle();
        rx.recv()
            .map_err(|_| RenderError::BufferMapFailed)?
            .map_err(|_| RenderError::BufferMapFailed)?;

        let data = slice.get_mapped_range().to_vec();
        buffer.unmap();
        Ok(data)
    }
}

impl<S: PeelScene> PeelBackend for WgpuPeelBackend<'_, S> {
    fn viewport(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn begin_generation(&mut self, reference_sentinel: f32) -> RenderResult<()> {
        if self.generation.is_some() {
            return Err(RenderError::InvalidState("generation already running"));
        }

        let pipeline = self.create_pipeline()?;

        let readback_size =
            u64::from(aligned_bytes_per_row(self.width * TEXEL_BYTES)) * u64::from(self.height);
        let (first, second, depth_view, query_set, resolve, query_readback, color_readback) =
            self.gpu.allocate("peel targets", |device| {
                let first = self.create_target(device, "peel target A");
                let second = self.create_target(device, "peel target B");
                let depth_view = self.create_depth_view(device);
                let query_set = device.create_query_set(&wgpu::QuerySetDescriptor {
                    label: Some("peel occlusion query"),
                    ty: wgpu::QueryType::Occlusion,
                    count: 1,
                });
                let resolve = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("peel query resolve"),
                    size: QUERY_RESULT_BYTES,
                    usage: wgpu::BufferUsages::QUERY_RESOLVE | wgpu::BufferUsages::COPY_SRC,
                    mapped_at_creation: false,
                });
                let query_readback = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("peel query readback"),
                    size: QUERY_RESULT_BYTES,
                    usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                let color_readback = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("peel color readback"),
                    size: readback_size,
                    usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                (
                    first,
                    second,
                    depth_view,
                    query_set,
                    resolve,
                    query_readback,
                    color_readback,
                )
            })?;

        let targets = PingPong::new(first, second);
        self.fill_target(targets.reference(), reference_sentinel);

        self.generation = Some(Generation {
            pipeline,
            targets,
            depth_view,
            query_set,
            query_resolve_buffer: resolve,
            query_readback_buffer: query_readback,
            color_readback_buffer: color_readback,
        });
        log::debug!("[peel] generation started ({}x{})", self.width, self.height);
        Ok(())
    }

    fn set_view(&mut self, view: Mat4, projection: Mat4) -> RenderResult<()> {
        let uniforms = PeelUniforms {
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
        };
        self.gpu
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));
        Ok(())
    }

    fn peel(&mut self) -> RenderResult<u64> {
        let generation = self.active()?;
        let reference = generation.targets.reference();
        let target = generation.targets.render_target();

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("peel encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("peel pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        // Uncovered pixels read as the far plane and stop peeling.
                        load: wgpu::LoadOp::Clear(wgpu::Color::WHITE),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &generation.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: Some(&generation.query_set),
                ..Default::default()
            });

            pass.set_pipeline(&generation.pipeline);
            pass.set_bind_group(0, &reference.reference_bind_group, &[]);
            pass.begin_occlusion_query(0);
            self.scene.draw(&mut pass);
            pass.end_occlusion_query();
        }

        encoder.resolve_query_set(
            &generation.query_set,
            0..1,
            &generation.query_resolve_buffer,
            0,
        );
        encoder.copy_buffer_to_buffer(
            &generation.query_resolve_buffer,
            0,
            &generation.query_readback_buffer,
            0,
            QUERY_RESULT_BYTES,
        );
        self.gpu.queue.submit(std::iter::once(encoder.finish()));

        let data = self.map_and_read(&generation.query_readback_buffer)?;
        let samples: u64 = bytemuck::pod_read_unaligned(&data[..8]);
        Ok(samples)
    }

    fn read_render_target(&mut self) -> RenderResult<Vec<f32>> {
        let generation = self.active()?;
        let target = generation.targets.render_target();
        let row_bytes = self.width * TEXEL_BYTES;
        let bytes_per_row = aligned_bytes_per_row(row_bytes);

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("peel readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &generation.color_readback_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            self.extent(),
        );
        self.gpu.queue.submit(std::iter::once(encoder.finish()));

        let data = self.map_and_read(&generation.color_readback_buffer)?;

        // Strip row padding.
        let mut bytes = Vec::with_capacity((row_bytes * self.height) as usize);
        for row in 0..self.height {
            let start = (row * bytes_per_row) as usize;
            bytes.extend_from_slice(&data[start..start + row_bytes as usize]);
        }
        Ok(bytes
            .chunks_exact(4)
            .map(bytemuck::pod_read_unaligned::<f32>)
            .collect())
    }

    fn swap_targets(&mut self) {
        if let Some(generation) = self.generation.as_mut() {
            generation.targets.advance();
        }
    }

    fn end_generation(&mut self) {
        if let Some(generation) = self.generation.take() {
            generation.query_resolve_buffer.destroy();
            generation.query_readback_buffer.destroy();
            generation.color_readback_buffer.destroy();
            log::debug!(
                "[peel] generation finished after {} swap(s)",
                generation.targets.iteration()
            );
        }
    }
}

impl<S: PeelScene> Drop for WgpuPeelBackend<'_, S> {
    fn drop(&mut self) {
        self.end_generation();
    }
}
