//! Core types for peelview.
//!
//! This crate holds everything that does not need a GPU:
//! - [`Aabb`] and the [`SceneGeometry`] collaborator trait
//! - [`Options`] loaded from JSON
//! - the binary layer format ([`LayerData`], [`write_layer`], [`read_layer`])
//! - layer file naming ([`LayerFileName`])

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod aabb;
pub mod error;
pub mod layer_format;
pub mod layer_name;
pub mod options;
pub mod scene;

pub use aabb::{Aabb, Axis};
pub use error::{PeelError, Result};
pub use layer_format::{height_from_raw, read_layer, write_layer, LayerData};
pub use layer_name::{layer_base_name, layer_base_path, LayerFileName};
pub use options::{AxisSelection, Options};
pub use scene::SceneGeometry;

// Re-export glam types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
