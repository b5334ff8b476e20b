//! Batch layer operations.

use std::path::{Path, PathBuf};

use peelview_core::layer_format::{HEIGHT_EXTENSION, NORMAL_EXTENSION};
use peelview_core::{LayerFileName, Options, SceneGeometry};
use peelview_render::{
    CancelToken, GenerationOutcome, LayerExtractor, LayerLoader, LayerUploader, LoadedLayer,
    PeelBackend, RenderResult, ShaderSetup,
};

/// Extension of the debug previews removed by [`delete_all_layers`].
const PREVIEW_EXTENSION: &str = "bmp";

/// Extracts the layers of `geometry` into `options.output_dir`.
pub fn generate_layers<B: PeelBackend>(
    backend: B,
    geometry: &dyn SceneGeometry,
    options: &Options,
    cancel: CancelToken,
) -> RenderResult<GenerationOutcome> {
    let bbox = geometry.bounding_box();
    let mut extractor = LayerExtractor::new(backend, options.clone()).with_cancel_token(cancel);
    extractor.generate_layers(&bbox)
}

fn files_with_extensions(dir: &Path, extensions: &[&str]) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| extensions.contains(&e));
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Height files in `dir`, ordered by layer id. Names without an id sort last.
pub fn layer_files(dir: &Path) -> RenderResult<Vec<PathBuf>> {
    let mut files = files_with_extensions(dir, &[HEIGHT_EXTENSION])?;
    files.sort_by_key(|path| LayerFileName::parse(path).map_or(u32::MAX, |name| name.id));
    Ok(files)
}

/// Loads every layer in `dir`, skipping files that fail.
pub fn load_layers<U: LayerUploader>(
    dir: &Path,
    loader: &mut LayerLoader<U>,
    shader: &mut ShaderSetup,
) -> RenderResult<Vec<LoadedLayer>> {
    let files = layer_files(dir)?;
    let loaded = loader.load_layers(files.iter().map(PathBuf::as_path), shader);
    log::info!(
        "[layers] loaded {} of {} layer(s) from {}",
        loaded.len(),
        files.len(),
        dir.display()
    );
    Ok(loaded)
}

/// Removes layer files and previews from `dir`. Returns how many were removed.
///
/// A missing directory counts as empty. Files that cannot be removed are
/// logged and skipped.
pub fn delete_all_layers(dir: &Path) -> RenderResult<usize> {
    if !dir.exists() {
        return Ok(0);
    }
    let files = files_with_extensions(dir, &[HEIGHT_EXTENSION, NORMAL_EXTENSION, PREVIEW_EXTENSION])?;
    let mut removed = 0;
    for path in files {
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => log::error!("[layers] failed to remove {}: {e}", path.display()),
        }
    }
    log::info!("[layers] removed {removed} file(s) from {}", dir.display());
    Ok(removed)
}
