//! Rendering error types.

use std::path::PathBuf;

use peelview_core::PeelError;
use thiserror::Error;

/// Errors that can occur during rendering operations.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter")]
    AdapterCreationFailed,

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// A shader file could not be read.
    #[error("failed to read shader '{}': {source}", path.display())]
    ShaderSourceMissing {
        /// The shader file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Shader compilation failed.
    #[error("shader compilation failed: {0}")]
    ShaderCompilationFailed(String),

    /// Render target, texture, or query allocation failed.
    #[error("GPU resource allocation failed: {0}")]
    ResourceAllocation(String),

    /// Layer generation was started twice, or stepped while idle.
    #[error("invalid generation state: {0}")]
    InvalidState(&'static str),

    /// Mapping a readback buffer failed.
    #[error("GPU buffer mapping failed")]
    BufferMapFailed,

    /// Image encoding error.
    #[error("image encoding error: {0}")]
    Image(#[from] image::ImageError),

    /// Layer file or format error.
    #[error(transparent)]
    Layer(#[from] PeelError),
}

impl From<std::io::Error> for RenderError {
    fn from(e: std::io::Error) -> Self {
        Self::Layer(PeelError::Io(e))
    }
}

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;
