//! Binary layer format.
//!
//! Every layer is stored as two files sharing a base name:
//!
//! - `<base>.height`: `i32 width`, `i32 height`, then `width * height` `f32`
//!   heights in row-major order.
//! - `<base>.normal`: the same header, then `width * height` triples of `f32`.
//!
//! All values use the platform's native byte order. There is no magic number
//! and no version field, so writer and reader must run on machines with the
//! same endianness.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{PeelError, Result};

/// Extension of the height map file.
pub const HEIGHT_EXTENSION: &str = "height";

/// Extension of the normal map file.
pub const NORMAL_EXTENSION: &str = "normal";

/// Bytes taken by the `width`/`height` header of both files.
const HEADER_BYTES: u64 = 8;

/// Floats per pixel in the RGBA buffers read back from the peel target.
pub const RGBA_CHANNELS: usize = 4;

/// Converts a raw depth value (red channel) to a height.
///
/// Exactly `0.0` marks background and passes through; anything else is
/// inverted so that nearer surfaces get larger heights.
#[inline]
#[must_use]
pub fn height_from_raw(raw: f32) -> f32 {
    if raw == 0.0 {
        0.0
    } else {
        1.0 - raw
    }
}

/// One depth-peeled layer: a height field plus a per-pixel normal field.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerData {
    width: u32,
    height: u32,
    heights: Vec<f32>,
    normals: Vec<[f32; 3]>,
}

impl LayerData {
    /// Creates a layer from its fields, checking that the sizes agree.
    pub fn new(width: u32, height: u32, heights: Vec<f32>, normals: Vec<[f32; 3]>) -> Result<Self> {
        let count = pixel_count(i64::from(width), i64::from(height))?;
        if heights.len() != count {
            return Err(PeelError::SizeMismatch {
                expected: count,
                actual: heights.len(),
            });
        }
        if normals.len() != count {
            return Err(PeelError::SizeMismatch {
                expected: count,
                actual: normals.len(),
            });
        }
        Ok(Self {
            width,
            height,
            heights,
            normals,
        })
    }

    /// Builds a layer from an RGBA float buffer read back from the peel target.
    ///
    /// Red holds the raw depth (converted with [`height_from_raw`]); green, blue
    /// and alpha hold the normal and are copied unchanged.
    pub fn from_rgba(width: u32, height: u32, rgba: &[f32]) -> Result<Self> {
        let count = pixel_count(i64::from(width), i64::from(height))?;
        if rgba.len() != count * RGBA_CHANNELS {
            return Err(PeelError::SizeMismatch {
                expected: count * RGBA_CHANNELS,
                actual: rgba.len(),
            });
        }

        let mut heights = Vec::with_capacity(count);
        let mut normals = Vec::with_capacity(count);
        for px in rgba.chunks_exact(RGBA_CHANNELS) {
            heights.push(height_from_raw(px[0]));
            normals.push([px[1], px[2], px[3]]);
        }

        Ok(Self {
            width,
            height,
            heights,
            normals,
        })
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of pixels.
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.heights.len()
    }

    /// Height field, row-major.
    #[must_use]
    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Normal field, row-major.
    #[must_use]
    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals
    }

    /// Normal field padded to four channels (`w = 0`), for RGBA textures.
    #[must_use]
    pub fn normals_rgba(&self) -> Vec<[f32; 4]> {
        self.normals.iter().map(|n| [n[0], n[1], n[2], 0.0]).collect()
    }
}

fn pixel_count(width: i64, height: i64) -> Result<usize> {
    if width <= 0 || height <= 0 || width > i64::from(i32::MAX) || height > i64::from(i32::MAX) {
        return Err(PeelError::InvalidDimensions { width, height });
    }
    usize::try_from(width * height).map_err(|_| PeelError::InvalidDimensions { width, height })
}

/// Path of the height map belonging to `base`.
#[must_use]
pub fn height_path(base: &Path) -> PathBuf {
    with_suffix(base, HEIGHT_EXTENSION)
}

/// Path of the normal map belonging to `base`.
#[must_use]
pub fn normal_path(base: &Path) -> PathBuf {
    with_suffix(base, NORMAL_EXTENSION)
}

// Appends rather than replaces, so bases like `out/scan.v2/layer1` keep their dots.
fn with_suffix(base: &Path, extension: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

fn write_header<W: Write>(w: &mut W, layer: &LayerData) -> io::Result<()> {
    // `LayerData` construction guarantees both fit in an i32.
    let width = i32::try_from(layer.width).unwrap_or(i32::MAX);
    let height = i32::try_from(layer.height).unwrap_or(i32::MAX);
    w.write_all(&width.to_ne_bytes())?;
    w.write_all(&height.to_ne_bytes())
}

/// Writes the `.height` representation of `layer`.
pub fn encode_height_map<W: Write>(w: &mut W, layer: &LayerData) -> io::Result<()> {
    write_header(w, layer)?;
    w.write_all(bytemuck::cast_slice(&layer.heights))
}

/// Writes the `.normal` representation of `layer`.
pub fn encode_normal_map<W: Write>(w: &mut W, layer: &LayerData) -> io::Result<()> {
    write_header(w, layer)?;
    w.write_all(bytemuck::cast_slice(&layer.normals))
}

fn read_exact_or_corrupt<R: Read>(r: &mut R, buf: &mut [u8], source: &Path, what: &str) -> Result<()> {
    r.read_exact(buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            PeelError::corrupt(source, format!("truncated {what}"))
        } else {
            PeelError::Io(e)
        }
    })
}

fn read_header<R: Read>(r: &mut R, source: &Path) -> Result<(u32, u32, usize)> {
    let mut word = [0u8; 4];
    read_exact_or_corrupt(r, &mut word, source, "header")?;
    let width = i32::from_ne_bytes(word);
    read_exact_or_corrupt(r, &mut word, source, "header")?;
    let height = i32::from_ne_bytes(word);

    let count = pixel_count(i64::from(width), i64::from(height)).map_err(|_| {
        PeelError::corrupt(source, format!("invalid dimensions {width}x{height}"))
    })?;
    // pixel_count rejected non-positive values, so the casts are lossless.
    Ok((width.unsigned_abs(), height.unsigned_abs(), count))
}

/// Bytes in a map body of `count` pixels with `channels` floats each.
///
/// Bodies that could not be held in memory are reported as corrupt.
fn body_len(count: usize, channels: usize, source: &Path) -> Result<usize> {
    count
        .checked_mul(channels * std::mem::size_of::<f32>())
        .filter(|&len| isize::try_from(len).is_ok())
        .ok_or_else(|| PeelError::corrupt(source, format!("{count} pixels do not fit in memory")))
}

// The buffer grows with the bytes actually present, never with the header's claim.
fn read_body<R: Read>(r: &mut R, len: usize, source: &Path, what: &str) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    r.by_ref()
        .take(u64::try_from(len).unwrap_or(u64::MAX))
        .read_to_end(&mut body)?;
    if body.len() < len {
        return Err(PeelError::corrupt(source, format!("truncated {what}")));
    }
    Ok(body)
}

/// Reads a `.height` stream. `source` is only used for error messages.
pub fn decode_height_map<R: Read>(r: &mut R, source: &Path) -> Result<(u32, u32, Vec<f32>)> {
    let (width, height, count) = read_header(r, source)?;
    let len = body_len(count, 1, source)?;
    let body = read_body(r, len, source, "height body")?;
    let heights = body
        .chunks_exact(std::mem::size_of::<f32>())
        .map(bytemuck::pod_read_unaligned::<f32>)
        .collect();
    Ok((width, height, heights))
}

/// Reads a `.normal` stream. `source` is only used for error messages.
pub fn decode_normal_map<R: Read>(r: &mut R, source: &Path) -> Result<(u32, u32, Vec<[f32; 3]>)> {
    let (width, height, count) = read_header(r, source)?;
    let len = body_len(count, 3, source)?;
    let body = read_body(r, len, source, "normal body")?;
    let normals = body
        .chunks_exact(std::mem::size_of::<[f32; 3]>())
        .map(bytemuck::pod_read_unaligned::<[f32; 3]>)
        .collect();
    Ok((width, height, normals))
}

/// Opens `path` and decodes it with `decode`, rejecting files whose length
/// disagrees with their header.
fn decode_file<T>(
    path: &Path,
    channels: usize,
    decode: impl FnOnce(&mut BufReader<File>, &Path) -> Result<(u32, u32, T)>,
) -> Result<(u32, u32, T)> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    let (width, height, data) = decode(&mut BufReader::new(file), path)?;

    let count = u64::from(width) * u64::from(height);
    let expected = HEADER_BYTES + count * (channels * std::mem::size_of::<f32>()) as u64;
    if file_len != expected {
        return Err(PeelError::corrupt(
            path,
            format!("file is {file_len} bytes but its {width}x{height} header needs {expected}"),
        ));
    }
    Ok((width, height, data))
}

/// Writes `<base>.height` and `<base>.normal`.
pub fn write_layer(base: &Path, layer: &LayerData) -> Result<()> {
    let mut out = BufWriter::new(File::create(height_path(base))?);
    encode_height_map(&mut out, layer)?;
    out.flush()?;

    let mut out = BufWriter::new(File::create(normal_path(base))?);
    encode_normal_map(&mut out, layer)?;
    out.flush()?;

    log::debug!(
        "[layer_format] wrote {} ({}x{})",
        base.display(),
        layer.width,
        layer.height
    );
    Ok(())
}

/// Reads `<base>.height` and `<base>.normal` back into a [`LayerData`].
///
/// Fails with [`PeelError::DataCorruption`] if either file is truncated,
/// longer than its header says, or the two headers disagree.
pub fn read_layer(base: &Path) -> Result<LayerData> {
    let (width, height, heights) = decode_file(&height_path(base), 1, decode_height_map)?;

    let path = normal_path(base);
    let (n_width, n_height, normals) = decode_file(&path, 3, decode_normal_map)?;

    if (n_width, n_height) != (width, height) {
        return Err(PeelError::corrupt(
            path,
            format!("normal map is {n_width}x{n_height} but height map is {width}x{height}"),
        ));
    }

    LayerData::new(width, height, heights, normals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    fn sample_rgba() -> Vec<f32> {
        vec![
            0.0, 0.1, 0.2, 0.3, // background
            0.25, 0.0, 0.0, 1.0, //
            1.0, -1.0, 0.0, 0.0, //
            0.75, 0.5, 0.5, 0.7, //
            0.5, 0.0, 1.0, 0.0, //
            0.125, 0.6, 0.8, 0.0, //
        ]
    }

    fn temp_base(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("peelview_format_{}_{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("layer1")
    }

    #[test]
    fn test_height_from_raw() {
        assert_eq!(height_from_raw(0.0).to_bits(), 0.0f32.to_bits());
        assert!((height_from_raw(0.25) - 0.75).abs() < 1e-7);
        assert!((height_from_raw(1.0)).abs() < 1e-7);
        assert!((height_from_raw(-1000.0) - 1001.0).abs() < 1e-3);
    }

    #[test]
    fn test_from_rgba_splits_channels() {
        let layer = LayerData::from_rgba(3, 2, &sample_rgba()).unwrap();
        assert_eq!(layer.pixel_count(), 6);
        assert_eq!(layer.heights()[0], 0.0);
        assert_eq!(layer.heights()[1], 1.0 - 0.25);
        assert_eq!(layer.heights()[2], 0.0);
        assert_eq!(layer.normals()[0], [0.1, 0.2, 0.3]);
        assert_eq!(layer.normals()[3], [0.5, 0.5, 0.7]);
    }

    #[test]
    fn test_from_rgba_size_mismatch() {
        let err = LayerData::from_rgba(4, 2, &sample_rgba()).unwrap_err();
        assert!(matches!(err, PeelError::SizeMismatch { expected: 32, actual: 24 }));
    }

    #[test]
    fn test_new_rejects_zero_dimensions() {
        let err = LayerData::new(0, 3, vec![], vec![]).unwrap_err();
        assert!(matches!(err, PeelError::InvalidDimensions { .. }));
    }

    #[test]
    fn test_header_layout() {
        let layer = LayerData::from_rgba(3, 2, &sample_rgba()).unwrap();
        let mut bytes = Vec::new();
        encode_height_map(&mut bytes, &layer).unwrap();
        assert_eq!(bytes.len(), 8 + 6 * 4);
        assert_eq!(i32::from_ne_bytes(bytes[0..4].try_into().unwrap()), 3);
        assert_eq!(i32::from_ne_bytes(bytes[4..8].try_into().unwrap()), 2);
        assert_eq!(f32::from_ne_bytes(bytes[12..16].try_into().unwrap()), 0.75);

        let mut bytes = Vec::new();
        encode_normal_map(&mut bytes, &layer).unwrap();
        assert_eq!(bytes.len(), 8 + 6 * 12);
        assert_eq!(f32::from_ne_bytes(bytes[8..12].try_into().unwrap()), 0.1);
    }

    #[test]
    fn test_truncated_height_body_is_corrupt() {
        let layer = LayerData::from_rgba(3, 2, &sample_rgba()).unwrap();
        let mut bytes = Vec::new();
        encode_height_map(&mut bytes, &layer).unwrap();
        bytes.truncate(bytes.len() - 2);
        let err = decode_height_map(&mut Cursor::new(bytes), Path::new("x.height")).unwrap_err();
        assert!(matches!(err, PeelError::DataCorruption { .. }));
    }

    #[test]
    fn test_truncated_header_is_corrupt() {
        let err = decode_normal_map(&mut Cursor::new(vec![1u8, 0, 0]), Path::new("x.normal"))
            .unwrap_err();
        assert!(matches!(err, PeelError::DataCorruption { .. }));
    }

    #[test]
    fn test_negative_dimensions_are_corrupt() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(-3i32).to_ne_bytes());
        bytes.extend_from_slice(&2i32.to_ne_bytes());
        let err = decode_height_map(&mut Cursor::new(bytes), Path::new("x.height")).unwrap_err();
        assert!(matches!(err, PeelError::DataCorruption { .. }));
    }

    fn header(width: i32, height: i32) -> Vec<u8> {
        let mut bytes = width.to_ne_bytes().to_vec();
        bytes.extend_from_slice(&height.to_ne_bytes());
        bytes
    }

    #[test]
    fn test_oversized_header_is_corrupt() {
        let bytes = header(i32::MAX, i32::MAX);
        let err = decode_height_map(&mut Cursor::new(bytes.clone()), Path::new("x.height"))
            .unwrap_err();
        assert!(matches!(err, PeelError::DataCorruption { .. }));
        let err = decode_normal_map(&mut Cursor::new(bytes), Path::new("x.normal")).unwrap_err();
        assert!(matches!(err, PeelError::DataCorruption { .. }));
    }

    #[test]
    fn test_large_header_without_body_is_corrupt() {
        let err = decode_normal_map(&mut Cursor::new(header(65536, 65536)), Path::new("x.normal"))
            .unwrap_err();
        assert!(matches!(err, PeelError::DataCorruption { .. }));
    }

    #[test]
    fn test_trailing_bytes_are_corrupt() {
        let base = temp_base("trailing");
        let layer = LayerData::from_rgba(3, 2, &sample_rgba()).unwrap();
        write_layer(&base, &layer).unwrap();

        let mut bytes = std::fs::read(height_path(&base)).unwrap();
        bytes.extend_from_slice(&[0u8; 4]);
        std::fs::write(height_path(&base), bytes).unwrap();

        let err = read_layer(&base).unwrap_err();
        assert!(matches!(err, PeelError::DataCorruption { .. }));
        let _ = std::fs::remove_dir_all(base.parent().unwrap());
    }

    #[test]
    fn test_file_round_trip() {
        let base = temp_base("round_trip");
        let layer = LayerData::from_rgba(3, 2, &sample_rgba()).unwrap();
        write_layer(&base, &layer).unwrap();

        assert!(height_path(&base).exists());
        assert!(normal_path(&base).exists());

        let loaded = read_layer(&base).unwrap();
        assert_eq!(loaded, layer);
        let _ = std::fs::remove_dir_all(base.parent().unwrap());
    }

    #[test]
    fn test_mismatched_headers_are_corrupt() {
        let base = temp_base("mismatch");
        let a = LayerData::from_rgba(3, 2, &sample_rgba()).unwrap();
        let b = LayerData::from_rgba(2, 3, &sample_rgba()).unwrap();
        write_layer(&base, &a).unwrap();

        let mut out = File::create(normal_path(&base)).unwrap();
        encode_normal_map(&mut out, &b).unwrap();
        drop(out);

        let err = read_layer(&base).unwrap_err();
        assert!(matches!(err, PeelError::DataCorruption { .. }));
        let _ = std::fs::remove_dir_all(base.parent().unwrap());
    }

    #[test]
    fn test_suffix_keeps_dots_in_base() {
        let base = Path::new("out/scan.v2/layer3");
        assert_eq!(height_path(base), PathBuf::from("out/scan.v2/layer3.height"));
        assert_eq!(normal_path(base), PathBuf::from("out/scan.v2/layer3.normal"));
    }

    proptest! {
        #[test]
        fn prop_stream_round_trip_is_bit_exact(
            (width, height, rgba) in (1u32..6, 1u32..6).prop_flat_map(|(w, h)| {
                let n = (w * h) as usize * RGBA_CHANNELS;
                (Just(w), Just(h), proptest::collection::vec(-2.0f32..2.0, n))
            })
        ) {
            let layer = LayerData::from_rgba(width, height, &rgba).unwrap();

            let mut bytes = Vec::new();
            encode_height_map(&mut bytes, &layer).unwrap();
            let (w, h, heights) = decode_height_map(&mut Cursor::new(bytes), Path::new("p")).unwrap();
            prop_assert_eq!((w, h), (width, height));

            let mut bytes = Vec::new();
            encode_normal_map(&mut bytes, &layer).unwrap();
            let (_, _, normals) = decode_normal_map(&mut Cursor::new(bytes), Path::new("p")).unwrap();

            for (i, px) in rgba.chunks_exact(RGBA_CHANNELS).enumerate() {
                let expected = if px[0] == 0.0 { 0.0 } else { 1.0 - px[0] };
                prop_assert_eq!(heights[i].to_bits(), expected.to_bits());
                prop_assert_eq!(normals[i][0].to_bits(), px[1].to_bits());
                prop_assert_eq!(normals[i][1].to_bits(), px[2].to_bits());
                prop_assert_eq!(normals[i][2].to_bits(), px[3].to_bits());
            }
        }
    }
}
