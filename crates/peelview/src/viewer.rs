//! The viewer: camera state, render mode and shader setups.

use std::ops::{BitOr, BitOrAssign};
use std::path::Path;

use glam::{Mat4, Vec2, Vec3};
use peelview_core::{Aabb, Options, SceneGeometry};
use peelview_render::{
    ExamineManipulator, GpuContext, Key, LayerLoader, LayerUploader, LoadedLayer, Manipulator,
    PeelScene, PointerButtons, RenderResult, ShaderSetup, WgpuPeelBackend,
};

/// Which parts of the scene are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderMode(u8);

impl RenderMode {
    /// Nothing.
    pub const NONE: Self = Self(0);
    /// The model geometry.
    pub const GEOMETRY: Self = Self(1);
    /// The model's bounding box.
    pub const BOUNDING_BOX: Self = Self(1 << 1);
    /// Ray-cast reconstruction from loaded layers.
    pub const HEIGHTMAP: Self = Self(1 << 2);
    /// Screen-space post shading.
    pub const POST_SHADING: Self = Self(1 << 3);

    /// Raw bits.
    #[must_use]
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Returns true if every flag in `other` is set.
    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Sets the flags in `other`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clears the flags in `other`.
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Sets or clears the flags in `other`.
    pub fn set(&mut self, other: Self, enabled: bool) {
        if enabled {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }
}

impl Default for RenderMode {
    fn default() -> Self {
        Self::GEOMETRY
    }
}

impl BitOr for RenderMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for RenderMode {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Pointer position and held buttons, as last reported by the window.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct PointerState {
    pub(crate) position: Vec2,
    pub(crate) buttons: PointerButtons,
}

/// Interactive viewer state.
///
/// Owns the camera manipulator and the two shader setups: the peel shader
/// used for layer extraction and the ray-cast shader fed by loaded layers.
pub struct Viewer {
    options: Options,
    manipulator: ExamineManipulator,
    render_mode: RenderMode,
    peel_shader: ShaderSetup,
    ray_cast_shader: ShaderSetup,
    bounds: Option<Aabb>,
    pub(crate) pointer: PointerState,
}

impl Viewer {
    /// Creates a viewer, loading any shader files named in `options`.
    pub fn new(options: Options) -> RenderResult<Self> {
        let mut peel_shader = ShaderSetup::peel();
        if let Some(path) = &options.peel_shader {
            peel_shader.set_program_file(path)?;
        }
        let mut ray_cast_shader = ShaderSetup::new("ray cast");
        if let Some(path) = &options.ray_cast_shader {
            ray_cast_shader.set_program_file(path)?;
        }

        let manipulator =
            ExamineManipulator::new().with_wheel_dolly_factor(options.wheel_dolly_factor);

        Ok(Self {
            options,
            manipulator,
            render_mode: RenderMode::default(),
            peel_shader,
            ray_cast_shader,
            bounds: None,
            pointer: PointerState::default(),
        })
    }

    /// Options the viewer was created with.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The camera manipulator.
    #[must_use]
    pub fn manipulator(&self) -> &ExamineManipulator {
        &self.manipulator
    }

    /// Mutable access to the camera manipulator.
    pub fn manipulator_mut(&mut self) -> &mut ExamineManipulator {
        &mut self.manipulator
    }

    /// Current model-view transform.
    #[must_use]
    pub fn transform(&self) -> Mat4 {
        self.manipulator.transform()
    }

    /// Current render mode.
    #[must_use]
    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    /// Peel shader setup.
    #[must_use]
    pub fn peel_shader(&self) -> &ShaderSetup {
        &self.peel_shader
    }

    /// Mutable access to the peel shader setup.
    pub fn peel_shader_mut(&mut self) -> &mut ShaderSetup {
        &mut self.peel_shader
    }

    /// Ray-cast shader setup.
    #[must_use]
    pub fn ray_cast_shader(&self) -> &ShaderSetup {
        &self.ray_cast_shader
    }

    /// Mutable access to the ray-cast shader setup.
    pub fn ray_cast_shader_mut(&mut self) -> &mut ShaderSetup {
        &mut self.ray_cast_shader
    }

    /// Bounding box of the current model.
    #[must_use]
    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    /// Makes `model` the inspected object and frames it.
    pub fn add_model(&mut self, model: &dyn SceneGeometry) {
        let bbox = model.bounding_box();
        let (center, radius) = model.bounding_sphere();
        self.bounds = Some(bbox);
        self.manipulator.set_object_bounds(center, radius);
        log::info!(
            "[viewer] model bounds {:?}..{:?}, radius {radius}",
            bbox.min,
            bbox.max
        );
    }

    /// Enables or disables `mode` flags. Returns true (a redraw is needed).
    ///
    /// Enabling [`RenderMode::HEIGHTMAP`] frames the unit cube the ray-cast
    /// reconstruction lives in.
    pub fn set_render_mode(&mut self, mode: RenderMode, enabled: bool) -> bool {
        self.render_mode.set(mode, enabled);
        if enabled && mode.contains(RenderMode::HEIGHTMAP) {
            self.manipulator.set_object_bounds(Vec3::splat(0.5), 0.5);
        }
        true
    }

    /// Handles a command key. Returns true if a redraw is needed.
    pub fn handle_key(&mut self, key: Key) -> RenderResult<bool> {
        match key {
            Key::Reset => Ok(self.manipulator.key(key)),
            Key::ReloadShaders => {
                // Both are attempted; the first failure is reported.
                let peel = self.peel_shader.reload();
                let ray_cast = self.ray_cast_shader.reload();
                peel.and(ray_cast)?;
                log::info!("[viewer] shaders reloaded");
                Ok(true)
            }
        }
    }

    /// Records a new viewport size.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        self.manipulator.resize(width, height);
        true
    }

    /// Forwards a button press.
    pub fn pointer_down(&mut self, p: Vec2, buttons: PointerButtons) -> bool {
        self.manipulator.pointer_down(p, buttons)
    }

    /// Forwards pointer motion.
    pub fn pointer_move(&mut self, p: Vec2, buttons: PointerButtons) -> bool {
        self.manipulator.pointer_move(p, buttons)
    }

    /// Forwards a button release.
    pub fn pointer_up(&mut self, p: Vec2) -> bool {
        self.manipulator.pointer_up(p)
    }

    /// Forwards a wheel scroll.
    pub fn wheel(&mut self, delta: f32) -> bool {
        self.manipulator.wheel(delta)
    }

    /// A peel backend for `scene` using this viewer's peel shader.
    ///
    /// The shader is cloned, so later reloads apply to backends created after
    /// them.
    pub fn peel_backend<'a, S: PeelScene>(
        &self,
        gpu: &'a GpuContext,
        scene: &'a S,
        width: u32,
        height: u32,
    ) -> WgpuPeelBackend<'a, S> {
        WgpuPeelBackend::new(gpu, scene, self.peel_shader.clone(), width, height)
    }

    /// Loads all layers in `dir` into `uploader`, registering them with the
    /// ray-cast shader, and switches on [`RenderMode::HEIGHTMAP`] if any loaded.
    pub fn load_layers<U: LayerUploader>(&mut self, dir: &Path, uploader: U) -> RenderResult<Vec<LoadedLayer>> {
        let mut loader = LayerLoader::new(uploader, self.options.normal_binding_offset);
        let loaded = crate::layers::load_layers(dir, &mut loader, &mut self.ray_cast_shader)?;
        if !loaded.is_empty() {
            self.set_render_mode(RenderMode::HEIGHTMAP, true);
        }
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sphere {
        center: Vec3,
        radius: f32,
    }

    impl SceneGeometry for Sphere {
        fn bounding_box(&self) -> Aabb {
            Aabb::new(self.center - self.radius, self.center + self.radius)
        }

        fn bounding_sphere(&self) -> (Vec3, f32) {
            (self.center, self.radius)
        }
    }

    #[test]
    fn test_render_mode_flags() {
        let mut mode = RenderMode::default();
        assert!(mode.contains(RenderMode::GEOMETRY));
        mode |= RenderMode::BOUNDING_BOX;
        assert!(mode.contains(RenderMode::GEOMETRY | RenderMode::BOUNDING_BOX));
        mode.remove(RenderMode::GEOMETRY);
        assert!(!mode.contains(RenderMode::GEOMETRY));
        assert_eq!(mode.bits(), 2);
    }

    #[test]
    fn test_add_model_frames_sphere() {
        let mut viewer = Viewer::new(Options::default()).unwrap();
        viewer.add_model(&Sphere {
            center: Vec3::new(1.0, 2.0, 3.0),
            radius: 2.0,
        });
        assert_eq!(viewer.manipulator().object_center(), Vec3::new(1.0, 2.0, 3.0));
        assert!((viewer.manipulator().object_diameter() - 4.0).abs() < 1e-6);
        assert!(viewer.bounds().is_some());
    }

    #[test]
    fn test_heightmap_frames_unit_cube() {
        let mut viewer = Viewer::new(Options::default()).unwrap();
        viewer.add_model(&Sphere {
            center: Vec3::splat(10.0),
            radius: 5.0,
        });
        assert!(viewer.set_render_mode(RenderMode::HEIGHTMAP, true));
        assert!(viewer.render_mode().contains(RenderMode::HEIGHTMAP));
        assert_eq!(viewer.manipulator().object_center(), Vec3::splat(0.5));
        assert!((viewer.manipulator().object_diameter() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_reset_key() {
        let mut viewer = Viewer::new(Options::default()).unwrap();
        viewer.resize(800, 600);
        viewer.pointer_down(Vec2::new(400.0, 300.0), PointerButtons::PRIMARY);
        viewer.pointer_move(Vec2::new(420.0, 310.0), PointerButtons::PRIMARY);
        viewer.pointer_up(Vec2::new(420.0, 310.0));
        assert!(viewer.handle_key(Key::Reset).unwrap());
        assert_eq!(viewer.manipulator().orientation(), glam::Quat::IDENTITY);
    }

    #[test]
    fn test_reload_shaders_with_embedded_defaults() {
        let mut viewer = Viewer::new(Options::default()).unwrap();
        assert!(viewer.handle_key(Key::ReloadShaders).unwrap());
    }

    #[test]
    fn test_missing_shader_file_fails() {
        let options = Options {
            peel_shader: Some("/nonexistent/peelview/peel.wgsl".into()),
            ..Options::default()
        };
        assert!(Viewer::new(options).is_err());
    }
}
