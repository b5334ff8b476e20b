//! Naming of layer files.
//!
//! Layers are written as `layer<N>.height` / `layer<N>.normal` with `N`
//! counting from 1, front to back. When loading, the id is recovered from the
//! first run of digits in the base name.

use std::path::{Path, PathBuf};

use crate::error::{PeelError, Result};

/// Prefix of generated layer files.
pub const LAYER_PREFIX: &str = "layer";

/// Base name for layer `id` (without extension).
#[must_use]
pub fn layer_base_name(id: u32) -> String {
    format!("{LAYER_PREFIX}{id}")
}

/// Base path for layer `id` inside `dir`.
#[must_use]
pub fn layer_base_path(dir: &Path, id: u32) -> PathBuf {
    dir.join(layer_base_name(id))
}

/// A layer file name split into its base path and numeric id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerFileName {
    /// Directory plus base name, extension removed.
    pub base: PathBuf,
    /// Id parsed from the base name.
    pub id: u32,
    /// The digits the id was parsed from, as written in the file name.
    pub id_text: String,
}

impl LayerFileName {
    /// Parses `path`, e.g. `out/layer12.height` → base `out/layer12`, id 12.
    ///
    /// The extension (if any) is dropped, then everything from the first
    /// ASCII digit to the end of the base name must parse as the id.
    pub fn parse(path: &Path) -> Result<Self> {
        let invalid = || PeelError::InvalidLayerFilename(path.display().to_string());

        let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(invalid)?;
        let digits_at = stem.find(|c: char| c.is_ascii_digit()).ok_or_else(invalid)?;
        let id_text = &stem[digits_at..];
        let id = id_text.parse::<u32>().map_err(|_| invalid())?;

        Ok(Self {
            base: path.with_file_name(stem),
            id,
            id_text: id_text.to_string(),
        })
    }
}
