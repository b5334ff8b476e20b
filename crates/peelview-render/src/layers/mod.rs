//! Layer extraction and loading.
//!
//! Extraction renders a model from three axis-aligned orthographic views,
//! counting depth layers with occlusion queries, then peels the cheapest view
//! layer by layer into height/normal files. Loading reads those files back
//! into textures for ray-cast reconstruction.

pub mod axis;
pub mod backend;
pub mod extractor;
pub mod loader;
pub mod ping_pong;

pub use axis::{AxisView, EVALUATION_ORDER};
pub use backend::PeelBackend;
pub use extractor::{AxisSurvey, CancelToken, GenerationOutcome, LayerExtractor, PeelSummary};
pub use loader::{LayerLoader, LayerUploader, LoadedLayer};
pub use ping_pong::PingPong;
