//! Camera manipulation.
//!
//! [`Manipulator`] is the pointer-event interface the viewer forwards input
//! to. [`ExamineManipulator`] orbits an inspected object with an arcball and
//! pans/dollies it in view space.

use glam::{Mat4, Quat, Vec2, Vec3};

use crate::arcball::Arcball;

/// Half of the vertical field of view used to frame the object on reset.
const FRAME_HALF_ANGLE_DEGREES: f32 = 30.0;

/// Multiplier applied to vertical pointer motion when dollying.
const DOLLY_SPEED: f32 = 10.0;

/// Pointer buttons held during an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerButtons {
    /// Primary (usually left) button: rotate.
    pub primary: bool,
    /// Secondary (usually right) button: dolly.
    pub secondary: bool,
    /// Middle button: pan.
    pub middle: bool,
}

impl PointerButtons {
    /// No buttons held.
    pub const NONE: Self = Self {
        primary: false,
        secondary: false,
        middle: false,
    };

    /// Only the primary button held.
    pub const PRIMARY: Self = Self {
        primary: true,
        secondary: false,
        middle: false,
    };

    /// Only the secondary button held.
    pub const SECONDARY: Self = Self {
        primary: false,
        secondary: true,
        middle: false,
    };

    /// Only the middle button held.
    pub const MIDDLE: Self = Self {
        primary: false,
        secondary: false,
        middle: true,
    };

    /// Returns true if any button is held.
    #[must_use]
    pub fn any(self) -> bool {
        self.primary || self.secondary || self.middle
    }
}

/// Keyboard commands understood by the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Reset the camera to frame the object.
    Reset,
    /// Re-read shader sources from disk.
    ReloadShaders,
}

/// Pointer-driven camera controller.
///
/// Event handlers return `true` when the view changed and a redraw is needed.
pub trait Manipulator {
    /// Model-view transform.
    fn transform(&self) -> Mat4;
    /// Inverse of [`Self::transform`].
    fn inverse_transform(&self) -> Mat4;
    /// Restores the initial view of the object.
    fn reset(&mut self);
    /// Records a new viewport size in pixels.
    fn resize(&mut self, width: u32, height: u32);
    /// A button was pressed at pixel position `p`.
    fn pointer_down(&mut self, p: Vec2, buttons: PointerButtons) -> bool;
    /// The pointer moved to pixel position `p` with `buttons` held.
    fn pointer_move(&mut self, p: Vec2, buttons: PointerButtons) -> bool;
    /// A button was released at pixel position `p`.
    fn pointer_up(&mut self, p: Vec2) -> bool;
    /// Mouse wheel scrolled by `delta` lines.
    fn wheel(&mut self, delta: f32) -> bool;
    /// A command key was pressed.
    fn key(&mut self, key: Key) -> bool;
}

/// Examine-style manipulator: rotate around the object center, pan, dolly.
#[derive(Debug, Clone)]
pub struct ExamineManipulator {
    arcball: Arcball,
    translation: Vec3,
    object_center: Vec3,
    object_diameter: f32,
    width: u32,
    height: u32,
    translation_scale: f32,
    wheel_dolly_factor: f32,
    last_position: Vec2,
    click_position: Vec2,
    look_at: Mat4,
    inverse_look_at: Mat4,
}

impl ExamineManipulator {
    /// Creates a manipulator for a unit-diameter object at the origin.
    #[must_use]
    pub fn new() -> Self {
        let mut manipulator = Self {
            arcball: Arcball::new(),
            translation: Vec3::ZERO,
            object_center: Vec3::ZERO,
            object_diameter: 1.0,
            width: 1,
            height: 1,
            translation_scale: 1.0,
            wheel_dolly_factor: 0.0,
            last_position: Vec2::ZERO,
            click_position: Vec2::ZERO,
            look_at: Mat4::IDENTITY,
            inverse_look_at: Mat4::IDENTITY,
        };
        manipulator.update_translation_scale();
        manipulator.reset();
        manipulator
    }

    /// Sets the wheel dolly multiplier. Zero disables the wheel.
    #[must_use]
    pub fn with_wheel_dolly_factor(mut self, factor: f32) -> Self {
        self.wheel_dolly_factor = factor;
        self
    }

    /// Sets the wheel dolly multiplier. Zero disables the wheel.
    pub fn set_wheel_dolly_factor(&mut self, factor: f32) {
        self.wheel_dolly_factor = factor;
    }

    /// Sets the point the camera orbits around.
    pub fn set_object_center(&mut self, center: Vec3) {
        self.object_center = center;
        self.update_transform();
    }

    /// Sets the object diameter, which scales panning and dollying.
    pub fn set_object_diameter(&mut self, diameter: f32) {
        self.object_diameter = diameter;
        self.update_translation_scale();
    }

    /// Frames a bounding sphere and resets the view.
    pub fn set_object_bounds(&mut self, center: Vec3, radius: f32) {
        self.object_center = center;
        self.set_object_diameter(2.0 * radius);
        self.reset();
    }

    /// Current orientation.
    #[must_use]
    pub fn orientation(&self) -> Quat {
        self.arcball.orientation()
    }

    /// Current pan/dolly offset.
    #[must_use]
    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    /// World units moved per pixel of pointer motion.
    #[must_use]
    pub fn translation_scale(&self) -> f32 {
        self.translation_scale
    }

    /// Center of the inspected object.
    #[must_use]
    pub fn object_center(&self) -> Vec3 {
        self.object_center
    }

    /// Diameter of the inspected object.
    #[must_use]
    pub fn object_diameter(&self) -> f32 {
        self.object_diameter
    }

    /// Viewport size in pixels.
    #[must_use]
    pub fn viewport(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Pixel position of the last button press.
    #[must_use]
    pub fn click_position(&self) -> Vec2 {
        self.click_position
    }

    /// Maps a pixel position to arcball coordinates.
    ///
    /// The shorter viewport side spans `[-1, 1]`, y points up, and the
    /// viewport center maps to the origin.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn normalize(&self, p: Vec2) -> Vec2 {
        let w = self.width as f32;
        let h = self.height as f32;
        let s = w.min(h).max(1.0);
        Vec2::new(
            ((p.x / s) - (w / s) * 0.5) * 2.0,
            (-(p.y / s) + (h / s) * 0.5) * 2.0,
        )
    }

    #[allow(clippy::cast_precision_loss)]
    fn update_translation_scale(&mut self) {
        let largest = self.width.max(self.height).max(1) as f32;
        self.translation_scale = self.object_diameter / largest;
    }

    fn update_transform(&mut self) {
        self.look_at = Mat4::from_translation(self.translation)
            * Mat4::from_quat(self.arcball.orientation())
            * Mat4::from_translation(-self.object_center);
        self.inverse_look_at = self.look_at.inverse();
    }
}

impl Default for ExamineManipulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Manipulator for ExamineManipulator {
    fn transform(&self) -> Mat4 {
        self.look_at
    }

    fn inverse_transform(&self) -> Mat4 {
        self.inverse_look_at
    }

    fn reset(&mut self) {
        self.arcball.cancel_drag();
        self.arcball.set_orientation(Quat::IDENTITY);
        let distance = 0.5 * self.object_diameter / FRAME_HALF_ANGLE_DEGREES.to_radians().tan();
        self.translation = Vec3::new(0.0, 0.0, -distance);
        self.update_transform();
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.update_translation_scale();
    }

    fn pointer_down(&mut self, p: Vec2, buttons: PointerButtons) -> bool {
        if buttons.primary {
            self.arcball.begin_drag(self.normalize(p));
        }
        self.last_position = p;
        self.click_position = p;
        false
    }

    fn pointer_move(&mut self, p: Vec2, buttons: PointerButtons) -> bool {
        if !buttons.any() {
            return false;
        }

        let delta = Vec2::new(p.x - self.last_position.x, -(p.y - self.last_position.y));

        // Held buttons combine.
        if buttons.primary {
            self.arcball.update_drag(self.normalize(p));
        }
        if buttons.secondary {
            self.translation.z -= delta.y * self.translation_scale * DOLLY_SPEED;
        }
        if buttons.middle {
            self.translation.x += delta.x * self.translation_scale;
            self.translation.y += delta.y * self.translation_scale;
        }

        self.last_position = p;
        self.update_transform();
        true
    }

    fn pointer_up(&mut self, p: Vec2) -> bool {
        self.arcball.end_drag();
        self.last_position = p;
        false
    }

    fn wheel(&mut self, delta: f32) -> bool {
        if self.wheel_dolly_factor == 0.0 || delta == 0.0 {
            return false;
        }
        // Positive delta moves toward the object.
        self.translation.z += delta * self.translation_scale * self.wheel_dolly_factor;
        self.update_transform();
        true
    }

    fn key(&mut self, key: Key) -> bool {
        match key {
            Key::Reset => {
                self.reset();
                true
            }
            Key::ReloadShaders => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected_distance(diameter: f32) -> f32 {
        0.5 * diameter / 30f32.to_radians().tan()
    }

    #[test]
    fn test_reset_frames_object() {
        let mut m = ExamineManipulator::new();
        m.set_object_diameter(2.0);
        m.reset();
        assert_eq!(m.orientation(), Quat::IDENTITY);
        assert!((m.translation().z + expected_distance(2.0)).abs() < 1e-5);
        assert_eq!(m.translation().x, 0.0);
        assert_eq!(m.translation().y, 0.0);
    }

    #[test]
    fn test_reset_independent_of_viewport() {
        for (w, h) in [(1, 1), (800, 600), (300, 1200), (0, 0)] {
            let mut m = ExamineManipulator::new();
            m.set_object_diameter(3.0);
            m.resize(w, h);
            m.reset();
            assert!((m.translation().z + expected_distance(3.0)).abs() < 1e-5);
        }
    }

    #[test]
    fn test_translation_scale() {
        let mut m = ExamineManipulator::new();
        m.set_object_diameter(2.0);
        m.resize(800, 600);
        assert!((m.translation_scale() - 0.0025).abs() < 1e-7);

        m.set_object_diameter(4.0);
        assert!((m.translation_scale() - 0.005).abs() < 1e-7);
    }

    #[test]
    fn test_translation_scale_zero_viewport() {
        let mut m = ExamineManipulator::new();
        m.set_object_diameter(2.0);
        m.resize(0, 0);
        assert!(m.translation_scale().is_finite());
    }

    #[test]
    fn test_normalize_center_is_origin() {
        let mut m = ExamineManipulator::new();
        m.resize(800, 600);
        let p = m.normalize(Vec2::new(400.0, 300.0));
        assert!(p.length() < 1e-6);

        let top = m.normalize(Vec2::new(400.0, 0.0));
        assert!((top.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_drag_rotates_about_y() {
        let mut m = ExamineManipulator::new();
        m.resize(800, 600);
        m.set_object_bounds(Vec3::ZERO, 0.5);

        assert!(!m.pointer_down(Vec2::new(400.0, 300.0), PointerButtons::PRIMARY));
        assert!(m.pointer_move(Vec2::new(450.0, 300.0), PointerButtons::PRIMARY));
        assert!(!m.pointer_up(Vec2::new(450.0, 300.0)));

        let from = Vec3::Z;
        let x = (450.0 / 600.0 - 800.0 / 600.0 * 0.5) * 2.0;
        let to = Vec3::new(x, 0.0, (1.0f32 - x * x).sqrt());
        let (axis, angle) = m.orientation().to_axis_angle();
        assert!((axis - Vec3::Y).length() < 1e-4);
        assert!((angle - 2.0 * from.dot(to).acos()).abs() < 1e-4);
    }

    #[test]
    fn test_move_without_buttons_is_noop() {
        let mut m = ExamineManipulator::new();
        m.resize(800, 600);
        let before = m.transform();
        assert!(!m.pointer_move(Vec2::new(10.0, 10.0), PointerButtons::NONE));
        assert_eq!(m.transform(), before);
    }

    #[test]
    fn test_secondary_drag_dollies() {
        let mut m = ExamineManipulator::new();
        m.set_object_diameter(2.0);
        m.resize(800, 600);
        m.reset();
        let z0 = m.translation().z;

        m.pointer_down(Vec2::new(100.0, 100.0), PointerButtons::SECONDARY);
        assert!(m.pointer_move(Vec2::new(100.0, 80.0), PointerButtons::SECONDARY));
        // Moving up by 20 pixels gives delta.y = 20.
        assert!((m.translation().z - (z0 - 20.0 * 0.0025 * 10.0)).abs() < 1e-5);
    }

    #[test]
    fn test_middle_drag_pans() {
        let mut m = ExamineManipulator::new();
        m.set_object_diameter(2.0);
        m.resize(800, 600);
        m.reset();

        m.pointer_down(Vec2::new(100.0, 100.0), PointerButtons::MIDDLE);
        m.pointer_move(Vec2::new(140.0, 120.0), PointerButtons::MIDDLE);
        assert!((m.translation().x - 40.0 * 0.0025).abs() < 1e-6);
        assert!((m.translation().y + 20.0 * 0.0025).abs() < 1e-6);
        assert_eq!(m.orientation(), Quat::IDENTITY);
    }

    #[test]
    fn test_held_buttons_combine() {
        let mut m = ExamineManipulator::new();
        m.set_object_diameter(2.0);
        m.resize(800, 600);
        m.reset();
        let z0 = m.translation().z;

        let buttons = PointerButtons {
            primary: true,
            middle: true,
            ..PointerButtons::NONE
        };
        m.pointer_down(Vec2::new(400.0, 300.0), buttons);
        assert!(m.pointer_move(Vec2::new(440.0, 300.0), buttons));
        assert!((m.translation().x - 0.1).abs() < 1e-6);
        assert!(m.translation().y.abs() < 1e-6);
        assert_ne!(m.orientation(), Quat::IDENTITY);

        let buttons = PointerButtons {
            secondary: true,
            middle: true,
            ..PointerButtons::NONE
        };
        m.pointer_move(Vec2::new(440.0, 280.0), buttons);
        assert!((m.translation().y - 20.0 * 0.0025).abs() < 1e-6);
        assert!((m.translation().z - (z0 - 20.0 * 0.0025 * 10.0)).abs() < 1e-5);
    }

    #[test]
    fn test_transform_composition() {
        let mut m = ExamineManipulator::new();
        m.set_object_bounds(Vec3::new(1.0, 2.0, 3.0), 1.0);
        // The object center lands on the view axis at the framing distance.
        let p = m.transform().transform_point3(Vec3::new(1.0, 2.0, 3.0));
        assert!((p - m.translation()).length() < 1e-5);
    }

    #[test]
    fn test_inverse_transform() {
        let mut m = ExamineManipulator::new();
        m.resize(640, 480);
        m.set_object_bounds(Vec3::new(-1.0, 0.5, 2.0), 2.0);
        m.pointer_down(Vec2::new(320.0, 240.0), PointerButtons::PRIMARY);
        m.pointer_move(Vec2::new(380.0, 200.0), PointerButtons::PRIMARY);
        let product = m.transform() * m.inverse_transform();
        assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }

    #[test]
    fn test_wheel_disabled_by_default() {
        let mut m = ExamineManipulator::new();
        let before = m.translation();
        assert!(!m.wheel(1.0));
        assert_eq!(m.translation(), before);
    }

    #[test]
    fn test_wheel_dollies_when_enabled() {
        let mut m = ExamineManipulator::new().with_wheel_dolly_factor(10.0);
        m.set_object_diameter(2.0);
        m.resize(800, 600);
        m.reset();
        let z0 = m.translation().z;
        assert!(m.wheel(2.0));
        assert!((m.translation().z - (z0 + 2.0 * 0.0025 * 10.0)).abs() < 1e-6);
    }

    #[test]
    fn test_reset_key() {
        let mut m = ExamineManipulator::new();
        m.resize(800, 600);
        m.pointer_down(Vec2::new(400.0, 300.0), PointerButtons::PRIMARY);
        m.pointer_move(Vec2::new(500.0, 250.0), PointerButtons::PRIMARY);
        m.pointer_up(Vec2::new(500.0, 250.0));
        assert_ne!(m.orientation(), Quat::IDENTITY);

        assert!(m.key(Key::Reset));
        assert_eq!(m.orientation(), Quat::IDENTITY);
        assert!(!m.key(Key::ReloadShaders));
    }
}
