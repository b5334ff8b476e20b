//! Arcball rotation control.
//!
//! Implements the virtual trackball described by Ken Shoemake in "Arcball
//! Rotation Control" (Graphics Gems IV, 1994). Pointer positions are given in
//! normalized coordinates where the unit disk covers the ball.

use glam::{Quat, Vec2, Vec3};

/// Tolerance on `dot(from, to)` for the parallel/anti-parallel special cases.
const PARALLEL_EPSILON: f32 = 1e-6;

/// Maps a normalized 2D point onto the unit sphere.
///
/// Points inside the unit disk are lifted onto the front hemisphere. Points
/// on or outside the disk are pushed back onto the sphere border (z = 0).
#[must_use]
pub fn point_on_sphere(p: Vec2) -> Vec3 {
    let m = p.length_squared();
    if m < 1.0 {
        Vec3::new(p.x, p.y, (1.0 - m).sqrt())
    } else {
        let len = m.sqrt();
        Vec3::new(p.x / len, p.y / len, 0.0)
    }
}

/// Arcball rotation taking sphere point `from` to sphere point `to`.
///
/// This is Shoemake's quaternion `[from × to, from · to]`, which rotates about
/// `from × to` by twice the arc between the two points. Parallel inputs give
/// the identity; anti-parallel inputs give a half-turn about an axis
/// orthogonal to `from`.
#[must_use]
pub fn rotation_between(from: Vec3, to: Vec3) -> Quat {
    let d = from.dot(to);
    if d >= 1.0 - PARALLEL_EPSILON {
        return Quat::IDENTITY;
    }
    if d <= -1.0 + PARALLEL_EPSILON {
        return Quat::from_axis_angle(from.any_orthonormal_vector(), std::f32::consts::PI);
    }
    let axis = from.cross(to);
    Quat::from_xyzw(axis.x, axis.y, axis.z, d)
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    reference: Quat,
    from: Vec3,
}

/// Arcball orientation tracker.
///
/// `Idle -> Dragging -> Idle`, where the drag either ends (keeping the new
/// orientation) or is cancelled (restoring the orientation from before it).
#[derive(Debug, Clone)]
pub struct Arcball {
    orientation: Quat,
    drag: Option<DragState>,
}

impl Arcball {
    /// Creates an idle arcball with identity orientation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            orientation: Quat::IDENTITY,
            drag: None,
        }
    }

    /// Starts a drag at normalized point `p`.
    pub fn begin_drag(&mut self, p: Vec2) {
        self.drag = Some(DragState {
            reference: self.orientation,
            from: point_on_sphere(p),
        });
    }

    /// Moves the drag to normalized point `p`. Ignored when not dragging.
    pub fn update_drag(&mut self, p: Vec2) {
        let Some(drag) = self.drag else {
            return;
        };
        let to = point_on_sphere(p);
        self.orientation = drag.reference * rotation_between(drag.from, to);
    }

    /// Finishes the drag, keeping the current orientation.
    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    /// Aborts the drag, restoring the orientation from before [`Self::begin_drag`].
    pub fn cancel_drag(&mut self) {
        if let Some(drag) = self.drag.take() {
            self.orientation = drag.reference;
        }
    }

    /// Returns whether a drag is in progress.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Current orientation.
    #[must_use]
    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    /// Replaces the orientation. `q` is expected to be unit length.
    pub fn set_orientation(&mut self, q: Quat) {
        self.orientation = q;
    }
}

impl Default for Arcball {
    fn default() -> Self {
        Self::new()
    }
}
