//! GPU textures for loaded layers.

use std::collections::BTreeMap;

use peelview_core::LayerData;

use crate::error::RenderResult;
use crate::gpu::GpuContext;
use crate::layers::LayerUploader;

/// A layer texture and the binding it was uploaded to.
pub struct LayerTexture {
    /// The texture.
    pub texture: wgpu::Texture,
    /// Default view of the texture.
    pub view: wgpu::TextureView,
    /// `R32Float` for heights, `Rgba32Float` for normals.
    pub format: wgpu::TextureFormat,
}

/// Uploads layers as float textures keyed by binding.
///
/// Uploading to a binding that is already occupied replaces the texture.
pub struct LayerTextures<'a> {
    gpu: &'a GpuContext,
    textures: BTreeMap<u32, LayerTexture>,
}

impl<'a> LayerTextures<'a> {
    /// Creates an empty set.
    pub fn new(gpu: &'a GpuContext) -> Self {
        Self {
            gpu,
            textures: BTreeMap::new(),
        }
    }

    /// Texture at `binding`, if any.
    #[must_use]
    pub fn get(&self, binding: u32) -> Option<&LayerTexture> {
        self.textures.get(&binding)
    }

    /// All textures, ordered by binding.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &LayerTexture)> {
        self.textures.iter().map(|(binding, texture)| (*binding, texture))
    }

    /// Number of uploaded textures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// Returns true if nothing was uploaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Drops all textures.
    pub fn clear(&mut self) {
        self.textures.clear();
    }

    /// Bind group layout entries for every uploaded texture, in binding order.
    #[must_use]
    pub fn layout_entries(&self) -> Vec<wgpu::BindGroupLayoutEntry> {
        self.textures
            .keys()
            .map(|&binding| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            })
            .collect()
    }

    /// Bind group entries matching [`Self::layout_entries`].
    #[must_use]
    pub fn bind_group_entries(&self) -> Vec<wgpu::BindGroupEntry<'_>> {
        self.textures
            .iter()
            .map(|(&binding, texture)| wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            })
            .collect()
    }

    fn upload(
        &mut self,
        binding: u32,
        layer: &LayerData,
        format: wgpu::TextureFormat,
        texel_bytes: u32,
        data: &[u8],
    ) -> RenderResult<()> {
        let size = wgpu::Extent3d {
            width: layer.width(),
            height: layer.height(),
            depth_or_array_layers: 1,
        };
        let label = format!("layer texture {binding}");
        let texture = self.gpu.allocate(&label, |device| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(&label),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            })
        })?;

        self.gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(layer.width() * texel_bytes),
                rows_per_image: Some(layer.height()),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.textures.insert(
            binding,
            LayerTexture {
                texture,
                view,
                format,
            },
        );
        Ok(())
    }
}

impl LayerUploader for LayerTextures<'_> {
    fn upload_height(&mut self, binding: u32, layer: &LayerData) -> RenderResult<()> {
        self.upload(
            binding,
            layer,
            wgpu::TextureFormat::R32Float,
            4,
            bytemuck::cast_slice(layer.heights()),
        )
    }

    fn upload_normal(&mut self, binding: u32, layer: &LayerData) -> RenderResult<()> {
        let normals = layer.normals_rgba();
        self.upload(
            binding,
            layer,
            wgpu::TextureFormat::Rgba32Float,
            16,
            bytemuck::cast_slice(&normals),
        )
    }
}
