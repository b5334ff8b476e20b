//! 8-bit previews of extracted layers.
//!
//! Previews are for looking at, not for loading: the layer files stay the
//! source of truth.

use std::path::{Path, PathBuf};

use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use peelview_core::LayerData;

use crate::error::RenderResult;

/// Suffix appended to a layer base for the height preview.
pub const HEIGHT_PREVIEW_SUFFIX: &str = ".height.bmp";

/// Suffix appended to a layer base for the normal preview.
pub const NORMAL_PREVIEW_SUFFIX: &str = ".normal.bmp";

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Grayscale image of the height field; background is black.
#[must_use]
pub fn height_preview(layer: &LayerData) -> GrayImage {
    let width = layer.width();
    ImageBuffer::from_fn(width, layer.height(), |x, y| {
        let h = layer.heights()[(y * width + x) as usize];
        Luma([to_byte(h)])
    })
}

/// RGB image of the normal field, mapping `[-1, 1]` to `[0, 255]`.
#[must_use]
pub fn normal_preview(layer: &LayerData) -> RgbImage {
    let width = layer.width();
    ImageBuffer::from_fn(width, layer.height(), |x, y| {
        let n = layer.normals()[(y * width + x) as usize];
        Rgb(n.map(|c| to_byte(c * 0.5 + 0.5)))
    })
}

fn preview_path(base: &Path, suffix: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Writes `<base>.height.bmp` and `<base>.normal.bmp`; returns both paths.
pub fn write_previews(base: &Path, layer: &LayerData) -> RenderResult<(PathBuf, PathBuf)> {
    let height_path = preview_path(base, HEIGHT_PREVIEW_SUFFIX);
    height_preview(layer).save_with_format(&height_path, image::ImageFormat::Bmp)?;

    let normal_path = preview_path(base, NORMAL_PREVIEW_SUFFIX);
    normal_preview(layer).save_with_format(&normal_path, image::ImageFormat::Bmp)?;

    Ok((height_path, normal_path))
}
