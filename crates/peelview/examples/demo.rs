//! Demo: peel a torus into layers.
//!
//! Builds a torus lying in the XY plane, extracts its layers on a headless
//! GPU context and prints the survey. Pass an options JSON file as the first
//! argument to override the defaults.
//!
//! ```sh
//! RUST_LOG=info cargo run --example demo -- options.json
//! ```

use peelview::wgpu::util::DeviceExt;
use peelview::*;

const MAJOR_RADIUS: f32 = 0.35;
const MINOR_RADIUS: f32 = 0.12;

struct Torus {
    vertices: wgpu::Buffer,
    count: u32,
    bounds: Aabb,
}

impl Torus {
    fn new(gpu: &GpuContext, rings: u32, sides: u32) -> Self {
        let point = |i: u32, j: u32| {
            let theta = std::f32::consts::TAU * i as f32 / rings as f32;
            let phi = std::f32::consts::TAU * j as f32 / sides as f32;
            let ring = Vec3::new(theta.cos(), theta.sin(), 0.0);
            let normal = ring * phi.cos() + Vec3::Z * phi.sin();
            (ring * MAJOR_RADIUS + normal * MINOR_RADIUS, normal)
        };

        let mut data: Vec<f32> = Vec::new();
        for i in 0..rings {
            for j in 0..sides {
                let a = point(i, j);
                let b = point(i + 1, j);
                let c = point(i + 1, j + 1);
                let d = point(i, j + 1);
                for (p, n) in [a, b, c, a, c, d] {
                    data.extend_from_slice(&p.to_array());
                    data.extend_from_slice(&n.to_array());
                }
            }
        }

        let vertices = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("torus vertices"),
                contents: bytemuck::cast_slice(&data),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let reach = MAJOR_RADIUS + MINOR_RADIUS;
        Self {
            vertices,
            count: (data.len() / 6) as u32,
            bounds: Aabb::new(
                Vec3::new(-reach, -reach, -MINOR_RADIUS),
                Vec3::new(reach, reach, MINOR_RADIUS),
            ),
        }
    }
}

impl SceneGeometry for Torus {
    fn bounding_box(&self) -> Aabb {
        self.bounds
    }
}

impl PeelScene for Torus {
    fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertices.slice(..));
        pass.draw(0..self.count, 0..1);
    }
}

fn main() -> RenderResult<()> {
    init_logging();

    let options = match std::env::args().nth(1) {
        Some(path) => Options::load(path)?,
        None => Options::default(),
    };

    let viewer = Viewer::new(options.clone())?;
    let gpu = GpuContext::new_headless_blocking()?;
    let torus = Torus::new(&gpu, 64, 32);

    let backend = viewer.peel_backend(&gpu, &torus, 512, 512);
    match generate_layers(backend, &torus, &options, CancelToken::new())? {
        GenerationOutcome::Completed { survey, layers } => {
            for (axis, count) in survey.counts {
                println!("{}: {count} layer(s)", axis.name());
            }
            println!(
                "extracted {} layer(s) along {} into {}",
                layers.len(),
                survey.selected.name(),
                options.output_dir.display()
            );
        }
        GenerationOutcome::Cancelled { layers } => {
            println!("cancelled after {} layer(s)", layers.len());
        }
    }
    Ok(())
}
