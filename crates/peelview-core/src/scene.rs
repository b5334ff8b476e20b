//! The geometry collaborator.
//!
//! Model loading and scene-graph traversal live outside peelview. A loaded
//! model only has to answer the two spatial queries below; drawing is handled
//! by the render crate's `PeelScene` trait.

use glam::Vec3;

use crate::aabb::Aabb;

/// Spatial queries answered by a loaded model.
pub trait SceneGeometry {
    /// Axis-aligned bounding box of the model in world coordinates.
    fn bounding_box(&self) -> Aabb;

    /// Bounding sphere of the model as `(center, radius)`.
    ///
    /// Defaults to the sphere through the bounding box corners.
    fn bounding_sphere(&self) -> (Vec3, f32) {
        let bbox = self.bounding_box();
        (bbox.center(), bbox.bounding_radius())
    }
}

impl SceneGeometry for Aabb {
    fn bounding_box(&self) -> Aabb {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bounding_sphere() {
        let bbox = Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        let (center, radius) = bbox.bounding_sphere();
        assert_eq!(center, Vec3::ZERO);
        assert!((radius - 3.0_f32.sqrt()).abs() < 1e-6);
    }
}
