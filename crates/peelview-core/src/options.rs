//! Configuration options for peelview.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Result;

/// Upper bound on peel passes per viewpoint.
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// Value the reference texture starts with, far below any valid depth.
pub const DEFAULT_REFERENCE_SENTINEL: f32 = -1000.0;

/// Binding distance between a layer's height texture and its normal texture.
pub const DEFAULT_NORMAL_BINDING_OFFSET: u32 = 6;

/// How the extractor commits to one of the three candidate view axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AxisSelection {
    /// Axis with the strictly smallest layer count; ties go to Z, then X, then Y.
    #[default]
    Minimum,
    /// Always the last evaluated axis (Y), whatever the counts.
    ///
    /// This is what the legacy generator did; kept so old outputs can be
    /// reproduced.
    LastEvaluated,
}

/// Global configuration options for peelview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Directory that receives `layer<N>.height` / `layer<N>.normal` files.
    pub output_dir: PathBuf,

    /// Maximum number of peel passes per viewpoint.
    pub max_iterations: u32,

    /// Initial value of the reference texture.
    pub reference_sentinel: f32,

    /// Axis selection policy.
    pub axis_selection: AxisSelection,

    /// Whether to write 8-bit `.bmp` previews next to each layer.
    pub write_debug_images: bool,

    /// Mouse wheel dolly speed (0 = wheel ignored).
    pub wheel_dolly_factor: f32,

    /// Binding offset of normal textures relative to height textures.
    pub normal_binding_offset: u32,

    /// WGSL file for the peeling pass. `None` uses the built-in shader.
    pub peel_shader: Option<PathBuf>,

    /// WGSL file for ray-cast reconstruction from loaded layers.
    pub ray_cast_shader: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data/out"),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            reference_sentinel: DEFAULT_REFERENCE_SENTINEL,
            axis_selection: AxisSelection::Minimum,
            write_debug_images: false,
            wheel_dolly_factor: 0.0,
            normal_binding_offset: DEFAULT_NORMAL_BINDING_OFFSET,
            peel_shader: None,
            ray_cast_shader: None,
        }
    }
}

impl Options {
    /// Reads options from a JSON file. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let options = serde_json::from_str(&text)?;
        log::debug!("[options] loaded {}", path.display());
        Ok(options)
    }

    /// Writes options to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }
}
