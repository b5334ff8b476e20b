//! peelview: decompose a model into height/normal layers for ray-cast
//! reconstruction.
//!
//! A model is rendered with depth peeling from the three axis-aligned
//! orthographic views of its bounding box. The view that needs the fewest
//! layers is peeled again, and every layer is written as a pair of binary
//! files (`layerN.height`, `layerN.normal`). Those files can later be loaded
//! back as textures.
//!
//! # Quick Start
//!
//! ```no_run
//! use peelview::*;
//!
//! fn main() -> RenderResult<()> {
//!     init_logging();
//!
//!     let options = Options::default();
//!     let viewer = Viewer::new(options.clone())?;
//!     let gpu = GpuContext::new_headless_blocking()?;
//!
//!     # struct Model;
//!     # impl SceneGeometry for Model {
//!     #     fn bounding_box(&self) -> Aabb { Aabb::default() }
//!     # }
//!     # impl PeelScene for Model {
//!     #     fn draw(&self, _pass: &mut wgpu::RenderPass<'_>) {}
//!     # }
//!     let model = Model;
//!     let backend = viewer.peel_backend(&gpu, &model, 512, 512);
//!     let outcome = generate_layers(backend, &model, &options, CancelToken::new())?;
//!     println!("wrote {} layers", outcome.layers().len());
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`peelview_core`]: options, bounding boxes, the binary layer format
//! - [`peelview_render`]: arcball and camera manipulator, shader setups, the
//!   layer extractor and its wgpu backend
//! - this crate: [`Viewer`], winit input translation and batch layer
//!   operations

mod init;
pub mod input;
pub mod layers;
mod viewer;

pub use init::init_logging;
pub use input::{handle_window_event, InputEvent};
pub use layers::{delete_all_layers, generate_layers, layer_files, load_layers};
pub use viewer::{RenderMode, Viewer};

// Re-export core types
pub use peelview_core::{
    read_layer, write_layer, Aabb, Axis, AxisSelection, LayerData, LayerFileName, Options,
    PeelError, SceneGeometry, Mat4, Quat, Vec2, Vec3, Vec4,
};

// Re-export render types
pub use peelview_render::{
    Arcball, AxisSurvey, AxisView, CancelToken, ExamineManipulator, GenerationOutcome, GpuContext,
    Key, LayerExtractor, LayerLoader, LayerTextures, LayerUploader, LoadedLayer, Manipulator,
    PeelBackend, PeelScene, PointerButtons, RenderError, RenderResult, ShaderSetup,
    WgpuPeelBackend, PEEL_SHADER_SOURCE,
};
pub use peelview_render::wgpu;
