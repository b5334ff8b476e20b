//! Rendering side of peelview.
//!
//! This crate provides:
//! - the arcball and the examine-style camera manipulator
//! - shader setups (WGSL programs plus named override constants)
//! - the layer extractor and its wgpu depth peeling backend
//! - layer texture upload and 8-bit debug previews

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
// GPU sizes are u32 and always fit usize on supported targets
#![allow(clippy::cast_possible_truncation)]

pub mod arcball;
pub mod camera;
pub mod debug_image;
pub mod depth_peel_pass;
pub mod error;
pub mod gpu;
pub mod layer_textures;
pub mod layers;
pub mod shader;

pub use arcball::{point_on_sphere, rotation_between, Arcball};
pub use camera::{ExamineManipulator, Key, Manipulator, PointerButtons};
pub use depth_peel_pass::{PeelScene, PeelUniforms, WgpuPeelBackend, PEEL_VERTEX_LAYOUT};
pub use error::{RenderError, RenderResult};
pub use gpu::GpuContext;
pub use layer_textures::{LayerTexture, LayerTextures};
pub use layers::{
    AxisSurvey, AxisView, CancelToken, GenerationOutcome, LayerExtractor, LayerLoader,
    LayerUploader, LoadedLayer, PeelBackend, PeelSummary, PingPong,
};
pub use shader::{ShaderProgram, ShaderSetup, PEEL_SHADER_SOURCE};

// Scene implementations record draws with wgpu types
pub use wgpu;
