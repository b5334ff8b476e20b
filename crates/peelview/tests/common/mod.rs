//! CPU stand-in for the GPU peel backend.
//!
//! The scene is a set of solid axis-aligned boxes. Every pixel casts one ray
//! through the orthographic view and peels box faces exactly like the peel
//! shader: keep the nearest surface strictly behind the reference depth.

#![allow(dead_code)]

use peelview::{Aabb, Mat4, PeelBackend, RenderResult, SceneGeometry, Vec2, Vec3};

const PEEL_EPSILON: f32 = 1e-6;

/// Boxes making up the scene.
#[derive(Debug, Clone)]
pub struct BoxScene {
    pub boxes: Vec<Aabb>,
}

impl BoxScene {
    /// Two unit cubes stacked along Z with a gap between them.
    pub fn stacked_along_z() -> Self {
        Self {
            boxes: vec![
                Aabb::new(Vec3::ZERO, Vec3::ONE),
                Aabb::new(Vec3::new(0.0, 0.0, 2.0), Vec3::new(1.0, 1.0, 3.0)),
            ],
        }
    }

    /// The unit cube plus a half-width box behind it along Z, so only the
    /// left half of a Z view has four surfaces.
    pub fn uneven_along_z() -> Self {
        Self {
            boxes: vec![
                Aabb::new(Vec3::ZERO, Vec3::ONE),
                Aabb::new(Vec3::new(0.0, 0.0, -2.0), Vec3::new(0.5, 1.0, -1.0)),
            ],
        }
    }

    pub fn empty() -> Self {
        Self { boxes: Vec::new() }
    }
}

impl SceneGeometry for BoxScene {
    fn bounding_box(&self) -> Aabb {
        let mut iter = self.boxes.iter();
        let Some(first) = iter.next() else {
            return Aabb::default();
        };
        iter.fold(*first, |acc, b| Aabb::new(acc.min.min(b.min), acc.max.max(b.max)))
    }
}

/// A surface hit: NDC depth and outward normal.
#[derive(Debug, Clone, Copy)]
struct Hit {
    depth: f32,
    normal: Vec3,
}

/// Entry and exit of a ray `origin + t * dir` (t in [0, 1]) through `b`.
fn intersect(origin: Vec3, dir: Vec3, b: &Aabb) -> Option<(Hit, Hit)> {
    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    let mut enter_normal = Vec3::ZERO;
    let mut exit_normal = Vec3::ZERO;

    for axis in 0..3 {
        let o = origin[axis];
        let d = dir[axis];
        let (lo, hi) = (b.min[axis], b.max[axis]);
        if d.abs() < 1e-12 {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }
        let mut unit = Vec3::ZERO;
        unit[axis] = 1.0;
        let (t0, t1, n0, n1) = if d > 0.0 {
            ((lo - o) / d, (hi - o) / d, -unit, unit)
        } else {
            ((hi - o) / d, (lo - o) / d, unit, -unit)
        };
        if t0 > t_enter {
            t_enter = t0;
            enter_normal = n0;
        }
        if t1 < t_exit {
            t_exit = t1;
            exit_normal = n1;
        }
    }

    if t_enter > t_exit || t_exit < 0.0 || t_enter > 1.0 {
        return None;
    }
    Some((
        Hit {
            depth: t_enter,
            normal: enter_normal,
        },
        Hit {
            depth: t_exit,
            normal: exit_normal,
        },
    ))
}

/// Peel backend that ray-casts a [`BoxScene`].
pub struct CpuPeelBackend {
    pub scene: BoxScene,
    pub width: u32,
    pub height: u32,
    inverse_view_projection: Mat4,
    reference: Vec<f32>,
    target: Vec<[f32; 4]>,
    active: bool,
    pub generations: u32,
    pub peels: u32,
}

impl CpuPeelBackend {
    pub fn new(scene: BoxScene, width: u32, height: u32) -> Self {
        Self {
            scene,
            width,
            height,
            inverse_view_projection: Mat4::IDENTITY,
            reference: Vec::new(),
            target: Vec::new(),
            active: false,
            generations: 0,
            peels: 0,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn ray(&self, x: u32, y: u32) -> (Vec3, Vec3) {
        let ndc = Vec2::new(
            (x as f32 + 0.5) / self.width as f32 * 2.0 - 1.0,
            1.0 - (y as f32 + 0.5) / self.height as f32 * 2.0,
        );
        let near = self
            .inverse_view_projection
            .project_point3(ndc.extend(0.0));
        let far = self
            .inverse_view_projection
            .project_point3(ndc.extend(1.0));
        (near, far - near)
    }
}

impl PeelBackend for CpuPeelBackend {
    fn viewport(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn begin_generation(&mut self, reference_sentinel: f32) -> RenderResult<()> {
        assert!(!self.active, "generation already running");
        let pixels = (self.width * self.height) as usize;
        self.reference = vec![reference_sentinel; pixels];
        self.target = vec![[1.0; 4]; pixels];
        self.active = true;
        self.generations += 1;
        Ok(())
    }

    fn set_view(&mut self, view: Mat4, projection: Mat4) -> RenderResult<()> {
        self.inverse_view_projection = (projection * view).inverse();
        Ok(())
    }

    fn peel(&mut self) -> RenderResult<u64> {
        assert!(self.active, "peel outside a generation");
        self.peels += 1;
        let mut samples = 0;
        for y in 0..self.height {
            for x in 0..self.width {
                let i = (y * self.width + x) as usize;
                let (origin, dir) = self.ray(x, y);
                let reference = self.reference[i];

                let nearest = self
                    .scene
                    .boxes
                    .iter()
                    .filter_map(|b| intersect(origin, dir, b))
                    .flat_map(|(enter, exit)| [enter, exit])
                    .filter(|hit| hit.depth > 0.0 && hit.depth < 1.0)
                    .filter(|hit| hit.depth > reference + PEEL_EPSILON)
                    .min_by(|a, b| a.depth.total_cmp(&b.depth));

                self.target[i] = match nearest {
                    Some(hit) => {
                        samples += 1;
                        [hit.depth, hit.normal.x, hit.normal.y, hit.normal.z]
                    }
                    None => [1.0; 4],
                };
            }
        }
        Ok(samples)
    }

    fn read_render_target(&mut self) -> RenderResult<Vec<f32>> {
        Ok(self.target.iter().flatten().copied().collect())
    }

    fn swap_targets(&mut self) {
        for (reference, texel) in self.reference.iter_mut().zip(&self.target) {
            *reference = texel[0];
        }
    }

    fn end_generation(&mut self) {
        self.active = false;
        self.reference.clear();
        self.target.clear();
    }
}

/// Fresh scratch directory under the system temp dir.
pub fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("peelview_it_{}_{name}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}
