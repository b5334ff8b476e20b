//! The rendering seam used by the layer extractor.

use glam::Mat4;

use crate::error::RenderResult;

/// Off-screen renderer able to run depth peeling passes.
///
/// A generation is bracketed by [`begin_generation`](Self::begin_generation)
/// and [`end_generation`](Self::end_generation). In between, each
/// [`peel`](Self::peel) renders the scene into the render target, keeping only
/// fragments strictly behind the depth stored in the reference target, and
/// returns the number of samples that passed. Pixels no fragment reaches read
/// back as `1.0` in every channel, the far plane.
pub trait PeelBackend {
    /// Render target size in pixels.
    fn viewport(&self) -> (u32, u32);

    /// Allocates the targets and occlusion query, and fills the reference
    /// target with `reference_sentinel`.
    fn begin_generation(&mut self, reference_sentinel: f32) -> RenderResult<()>;

    /// Sets the camera used by subsequent passes.
    fn set_view(&mut self, view: Mat4, projection: Mat4) -> RenderResult<()>;

    /// Runs one peel pass under an occlusion query; returns samples passed.
    fn peel(&mut self) -> RenderResult<u64>;

    /// Reads the render target back as RGBA floats, row-major.
    fn read_render_target(&mut self) -> RenderResult<Vec<f32>>;

    /// Makes the last render target the reference for the next pass.
    fn swap_targets(&mut self);

    /// Releases everything allocated by `begin_generation`. Safe to call when
    /// no generation is running.
    fn end_generation(&mut self);
}

impl<B: PeelBackend + ?Sized> PeelBackend for &mut B {
    fn viewport(&self) -> (u32, u32) {
        (**self).viewport()
    }

    fn begin_generation(&mut self, reference_sentinel: f32) -> RenderResult<()> {
        (**self).begin_generation(reference_sentinel)
    }

    fn set_view(&mut self, view: Mat4, projection: Mat4) -> RenderResult<()> {
        (**self).set_view(view, projection)
    }

    fn peel(&mut self) -> RenderResult<u64> {
        (**self).peel()
    }

    fn read_render_target(&mut self) -> RenderResult<Vec<f32>> {
        (**self).read_render_target()
    }

    fn swap_targets(&mut self) {
        (**self).swap_targets();
    }

    fn end_generation(&mut self) {
        (**self).end_generation();
    }
}
