//! Orthographic viewpoints along the coordinate axes.

use glam::{Mat4, Vec3};
use peelview_core::{Aabb, Axis};

/// Order in which candidate axes are surveyed. Also the tie-break priority.
pub const EVALUATION_ORDER: [Axis; 3] = [Axis::Z, Axis::X, Axis::Y];

/// Scale applied to the frame and depth range so boundary geometry is kept.
const FRAME_MARGIN: f32 = 1.01;

/// Near plane, slightly behind the eye so the facing box side is not clipped.
const NEAR_PLANE: f32 = -0.01;

/// Smallest extent used for framing; flat boxes still get a finite projection.
const MIN_EXTENT: f32 = 1e-4;

/// An orthographic camera looking along `-axis` at a bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisView {
    /// Axis the camera looks down (from the positive side).
    pub axis: Axis,
    /// Camera position: the center of the box side facing `+axis`.
    pub eye: Vec3,
    /// Box center.
    pub target: Vec3,
    /// Up vector.
    pub up: Vec3,
    /// Horizontal box extent.
    pub frame_width: f32,
    /// Vertical box extent.
    pub frame_height: f32,
    /// Box extent along the view direction.
    pub depth: f32,
}

impl AxisView {
    /// Frames `bbox` looking along `-axis`.
    ///
    /// | axis | frame (h × v) | depth | up |
    /// |---|---|---|---|
    /// | Z | x × y | z | +Y |
    /// | X | z × y | x | +Y |
    /// | Y | x × z | y | +Z |
    #[must_use]
    pub fn new(axis: Axis, bbox: &Aabb) -> Self {
        let extents = bbox.extents().max(Vec3::splat(MIN_EXTENT));
        let (frame_width, frame_height, depth, up) = match axis {
            Axis::Z => (extents.x, extents.y, extents.z, Vec3::Y),
            Axis::X => (extents.z, extents.y, extents.x, Vec3::Y),
            Axis::Y => (extents.x, extents.z, extents.y, Vec3::Z),
        };
        let target = bbox.center();
        Self {
            axis,
            eye: target + axis.unit() * (depth * 0.5),
            target,
            up,
            frame_width,
            frame_height,
            depth,
        }
    }

    /// All three candidate views, in [`EVALUATION_ORDER`].
    #[must_use]
    pub fn candidates(bbox: &Aabb) -> [Self; 3] {
        EVALUATION_ORDER.map(|axis| Self::new(axis, bbox))
    }

    /// View matrix.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// Orthographic projection matrix covering the whole box.
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        let half_width = self.frame_width * 0.5 * FRAME_MARGIN;
        let half_height = self.frame_height * 0.5 * FRAME_MARGIN;
        Mat4::orthographic_rh(
            -half_width,
            half_width,
            -half_height,
            half_height,
            NEAR_PLANE,
            self.depth * FRAME_MARGIN,
        )
    }

    /// Projection times view.
    #[must_use]
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}
