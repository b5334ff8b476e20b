//! Loading layer files back for ray-cast reconstruction.

use std::path::{Path, PathBuf};

use peelview_core::{read_layer, LayerData, LayerFileName, PeelError};

use crate::error::RenderResult;
use crate::shader::ShaderSetup;

/// Receives decoded layers and makes them available to the renderer.
pub trait LayerUploader {
    /// Uploads the height field as a single-channel float texture at `binding`.
    fn upload_height(&mut self, binding: u32, layer: &LayerData) -> RenderResult<()>;

    /// Uploads the normal field as a four-channel float texture at `binding`.
    fn upload_normal(&mut self, binding: u32, layer: &LayerData) -> RenderResult<()>;
}

/// A layer that was uploaded and registered with the ray-cast shader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedLayer {
    /// Layer id parsed from the file name.
    pub id: u32,
    /// Base path the files were read from.
    pub base: PathBuf,
    /// Binding of the height texture.
    pub height_binding: u32,
    /// Binding of the normal texture.
    pub normal_binding: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Reads layer files, uploads them, and registers their bindings.
///
/// Layer `N` goes to height binding `N` and normal binding `N + offset`; the
/// ray-cast shader setup receives `u_hm<N>` and `u_normal<N>` with those
/// binding numbers.
pub struct LayerLoader<U: LayerUploader> {
    uploader: U,
    normal_binding_offset: u32,
}

impl<U: LayerUploader> LayerLoader<U> {
    /// Creates a loader with the given normal binding offset.
    pub fn new(uploader: U, normal_binding_offset: u32) -> Self {
        Self {
            uploader,
            normal_binding_offset,
        }
    }

    /// The uploader.
    #[must_use]
    pub fn uploader(&self) -> &U {
        &self.uploader
    }

    /// Consumes the loader, returning the uploader.
    pub fn into_uploader(self) -> U {
        self.uploader
    }

    /// Loads the layer named by `path` (either of its two files, or the base).
    pub fn load_layer(&mut self, path: &Path, shader: &mut ShaderSetup) -> RenderResult<LoadedLayer> {
        let name = LayerFileName::parse(path)?;
        // Bindings must also fit the shader's signed integers.
        let invalid = || PeelError::InvalidLayerFilename(path.display().to_string());
        let height_binding = name.id;
        let normal_binding = name
            .id
            .checked_add(self.normal_binding_offset)
            .ok_or_else(invalid)?;
        let height_value = i32::try_from(height_binding).map_err(|_| invalid())?;
        let normal_value = i32::try_from(normal_binding).map_err(|_| invalid())?;

        let layer = read_layer(&name.base)?;
        self.uploader.upload_height(height_binding, &layer)?;
        self.uploader.upload_normal(normal_binding, &layer)?;

        shader.set_int(format!("u_hm{}", name.id_text), height_value);
        shader.set_int(format!("u_normal{}", name.id_text), normal_value);

        log::info!(
            "[layers] loaded {} ({}x{}) at bindings {height_binding}/{normal_binding}",
            name.base.display(),
            layer.width(),
            layer.height()
        );

        Ok(LoadedLayer {
            id: name.id,
            base: name.base,
            height_binding,
            normal_binding,
            width: layer.width(),
            height: layer.height(),
        })
    }

    /// Loads every path, logging and skipping the ones that fail.
    pub fn load_layers<'p>(
        &mut self,
        paths: impl IntoIterator<Item = &'p Path>,
        shader: &mut ShaderSetup,
    ) -> Vec<LoadedLayer> {
        let mut loaded = Vec::new();
        for path in paths {
            match self.load_layer(path, shader) {
                Ok(layer) => loaded.push(layer),
                Err(e) => log::warn!("[layers] skipping {}: {e}", path.display()),
            }
        }
        loaded
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use peelview_core::write_layer;

    #[derive(Default)]
    struct RecordingUploader {
        heights: Vec<(u32, Vec<f32>)>,
        normals: Vec<(u32, Vec<[f32; 4]>)>,
    }

    impl LayerUploader for RecordingUploader {
        fn upload_height(&mut self, binding: u32, layer: &LayerData) -> RenderResult<()> {
            self.heights.push((binding, layer.heights().to_vec()));
            Ok(())
        }

        fn upload_normal(&mut self, binding: u32, layer: &LayerData) -> RenderResult<()> {
            self.normals.push((binding, layer.normals_rgba()));
            Ok(())
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("peelview_loader_{}_{name}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample_layer() -> LayerData {
        LayerData::new(
            2,
            1,
            vec![0.25, 0.0],
            vec![[0.0, 0.0, 1.0], [1.0, 0.0, 0.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_load_binds_by_id() {
        let dir = temp_dir("binds");
        write_layer(&dir.join("layer3"), &sample_layer()).unwrap();

        let mut loader = LayerLoader::new(RecordingUploader::default(), 6);
        let mut shader = ShaderSetup::new("ray cast");
        let loaded = loader
            .load_layer(&dir.join("layer3.height"), &mut shader)
            .unwrap();

        assert_eq!(loaded.id, 3);
        assert_eq!(loaded.height_binding, 3);
        assert_eq!(loaded.normal_binding, 9);
        assert_eq!(shader.int("u_hm3"), Some(3));
        assert_eq!(shader.int("u_normal3"), Some(9));

        let uploader = loader.into_uploader();
        assert_eq!(uploader.heights, vec![(3, vec![0.25, 0.0])]);
        assert_eq!(uploader.normals[0].0, 9);
        assert_eq!(uploader.normals[0].1[1], [1.0, 0.0, 0.0, 0.0]);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_load_without_id_fails() {
        let dir = temp_dir("no_id");
        let mut loader = LayerLoader::new(RecordingUploader::default(), 6);
        let mut shader = ShaderSetup::new("ray cast");
        let err = loader
            .load_layer(&dir.join("layer.height"), &mut shader)
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::Layer(PeelError::InvalidLayerFilename(_))
        ));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_batch_skips_bad_files() {
        let dir = temp_dir("batch");
        write_layer(&dir.join("layer1"), &sample_layer()).unwrap();
        write_layer(&dir.join("layer2"), &sample_layer()).unwrap();
        // Truncate the second layer's normal file.
        std::fs::write(dir.join("layer2.normal"), [0u8; 5]).unwrap();

        let paths = [
            dir.join("layer1.height"),
            dir.join("layer2.height"),
            dir.join("nonsense.height"),
        ];
        let mut loader = LayerLoader::new(RecordingUploader::default(), 6);
        let mut shader = ShaderSetup::new("ray cast");
        let loaded = loader.load_layers(paths.iter().map(PathBuf::as_path), &mut shader);

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, 1);
        assert_eq!(shader.int("u_hm2"), None);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_out_of_range_ids_are_rejected() {
        let dir = temp_dir("huge_id");
        write_layer(&dir.join("layer1"), &sample_layer()).unwrap();
        write_layer(&dir.join("layer4294967295"), &sample_layer()).unwrap();

        let mut loader = LayerLoader::new(RecordingUploader::default(), 6);
        let mut shader = ShaderSetup::new("ray cast");
        let err = loader
            .load_layer(&dir.join("layer4294967295.height"), &mut shader)
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::Layer(PeelError::InvalidLayerFilename(_))
        ));

        // Past i32::MAX the shader integer cannot hold the binding.
        let paths = [
            dir.join("layer4294967295.height"),
            dir.join("layer2147483647.height"),
            dir.join("layer1.height"),
        ];
        let loaded = loader.load_layers(paths.iter().map(PathBuf::as_path), &mut shader);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, 1);
        assert!(loader.uploader().heights.iter().all(|(b, _)| *b == 1));

        std::fs::remove_dir_all(dir).unwrap();
    }
}
