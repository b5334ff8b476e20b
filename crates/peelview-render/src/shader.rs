//! Shader management.
//!
//! A [`ShaderSetup`] names a shader program (a pair of WGSL files, or an
//! embedded source) together with named integer and float uniforms. The
//! uniforms reach the GPU as pipeline-overridable constants, so a shader
//! consumes them through `override` declarations.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{RenderError, RenderResult};

/// Default depth peeling shader used for layer extraction.
pub const PEEL_SHADER_SOURCE: &str = include_str!("shaders/create_layers.wgsl");

/// Where a shader program comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderProgram {
    /// No program set.
    None,
    /// Source compiled into the binary.
    Embedded(&'static str),
    /// Vertex and fragment stages read from disk.
    Files {
        /// Vertex stage file.
        vertex: PathBuf,
        /// Fragment stage file.
        fragment: PathBuf,
    },
}

/// A shader program plus its named uniforms.
#[derive(Debug, Clone)]
pub struct ShaderSetup {
    label: String,
    default_program: ShaderProgram,
    program: ShaderProgram,
    vertex_source: Option<String>,
    fragment_source: Option<String>,
    vertex_entry: String,
    fragment_entry: String,
    ints: BTreeMap<String, i32>,
    floats: BTreeMap<String, f32>,
    enabled: bool,
}

impl ShaderSetup {
    /// Creates an enabled setup with no program.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            default_program: ShaderProgram::None,
            program: ShaderProgram::None,
            vertex_source: None,
            fragment_source: None,
            vertex_entry: "vs_main".to_string(),
            fragment_entry: "fs_main".to_string(),
            ints: BTreeMap::new(),
            floats: BTreeMap::new(),
            enabled: true,
        }
    }

    /// Uses `source` as both stages, and as the program restored by [`Self::reset`].
    #[must_use]
    pub fn with_embedded(mut self, source: &'static str) -> Self {
        self.default_program = ShaderProgram::Embedded(source);
        self.program = ShaderProgram::Embedded(source);
        self.vertex_source = Some(source.to_string());
        self.fragment_source = Some(source.to_string());
        self
    }

    /// The layer extraction setup, backed by [`PEEL_SHADER_SOURCE`].
    #[must_use]
    pub fn peel() -> Self {
        Self::new("create layers").with_embedded(PEEL_SHADER_SOURCE)
    }

    /// Sets the vertex shader entry point.
    #[must_use]
    pub fn with_vertex_entry(mut self, entry: impl Into<String>) -> Self {
        self.vertex_entry = entry.into();
        self
    }

    /// Sets the fragment shader entry point.
    #[must_use]
    pub fn with_fragment_entry(mut self, entry: impl Into<String>) -> Self {
        self.fragment_entry = entry.into();
        self
    }

    /// Debug label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current program.
    #[must_use]
    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    /// Vertex shader entry point.
    #[must_use]
    pub fn vertex_entry(&self) -> &str {
        &self.vertex_entry
    }

    /// Fragment shader entry point.
    #[must_use]
    pub fn fragment_entry(&self) -> &str {
        &self.fragment_entry
    }

    /// Switches to a program read from `vertex` and `fragment`, loading both.
    pub fn set_program(
        &mut self,
        vertex: impl Into<PathBuf>,
        fragment: impl Into<PathBuf>,
    ) -> RenderResult<()> {
        self.program = ShaderProgram::Files {
            vertex: vertex.into(),
            fragment: fragment.into(),
        };
        self.reload()
    }

    /// Switches to a single WGSL file holding both stages.
    pub fn set_program_file(&mut self, path: impl Into<PathBuf>) -> RenderResult<()> {
        let path = path.into();
        self.set_program(path.clone(), path)
    }

    /// Sets a named integer uniform.
    pub fn set_int(&mut self, name: impl Into<String>, value: i32) {
        self.ints.insert(name.into(), value);
    }

    /// Sets a named float uniform.
    pub fn set_float(&mut self, name: impl Into<String>, value: f32) {
        self.floats.insert(name.into(), value);
    }

    /// Returns a named integer uniform.
    #[must_use]
    pub fn int(&self, name: &str) -> Option<i32> {
        self.ints.get(name).copied()
    }

    /// Returns a named float uniform.
    #[must_use]
    pub fn float(&self, name: &str) -> Option<f32> {
        self.floats.get(name).copied()
    }

    /// Enables the setup.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Disables the setup; the renderer skips disabled programs.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Returns whether the setup is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Restores the default program, clears all uniforms and enables the setup.
    pub fn reset(&mut self) {
        self.program = self.default_program.clone();
        self.ints.clear();
        self.floats.clear();
        self.enabled = true;
        match &self.program {
            ShaderProgram::Embedded(source) => {
                self.vertex_source = Some((*source).to_string());
                self.fragment_source = Some((*source).to_string());
            }
            ShaderProgram::None | ShaderProgram::Files { .. } => {
                self.vertex_source = None;
                self.fragment_source = None;
            }
        }
    }

    /// Re-reads the program sources from disk.
    ///
    /// Embedded programs are left as they are. On failure the previously
    /// loaded sources are kept.
    pub fn reload(&mut self) -> RenderResult<()> {
        let ShaderProgram::Files { vertex, fragment } = &self.program else {
            return Ok(());
        };
        let vertex_source = read_source(vertex)?;
        let fragment_source = if fragment == vertex {
            vertex_source.clone()
        } else {
            read_source(fragment)?
        };
        log::info!(
            "[{}] loaded shader {} / {}",
            self.label,
            vertex.display(),
            fragment.display()
        );
        self.vertex_source = Some(vertex_source);
        self.fragment_source = Some(fragment_source);
        Ok(())
    }

    /// Returns the WGSL source for the program.
    ///
    /// When both stages come from the same source it is returned once,
    /// otherwise the stages are concatenated.
    pub fn source(&self) -> RenderResult<String> {
        let vertex = self.vertex_source.as_ref().ok_or_else(|| {
            RenderError::ShaderCompilationFailed(format!("[{}] missing vertex shader", self.label))
        })?;
        let fragment = self.fragment_source.as_ref().ok_or_else(|| {
            RenderError::ShaderCompilationFailed(format!("[{}] missing fragment shader", self.label))
        })?;

        if vertex == fragment {
            return Ok(vertex.clone());
        }
        Ok(format!("{vertex}\n\n{fragment}"))
    }

    /// Uniforms as pipeline-overridable constants, sorted by name.
    #[must_use]
    pub fn constants(&self) -> Vec<(String, f64)> {
        self.ints
            .iter()
            .map(|(name, v)| (name.clone(), f64::from(*v)))
            .chain(self.floats.iter().map(|(name, v)| (name.clone(), f64::from(*v))))
            .collect()
    }

    /// Compiles the program, reporting WGSL validation errors.
    pub fn build_module(&self, device: &wgpu::Device) -> RenderResult<wgpu::ShaderModule> {
        let source = self.source()?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&self.label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::ShaderCompilationFailed(format!(
                "[{}] {error}",
                self.label
            )));
        }

        Ok(module)
    }
}

fn read_source(path: &Path) -> RenderResult<String> {
    std::fs::read_to_string(path).map_err(|source| RenderError::ShaderSourceMissing {
        path: path.to_path_buf(),
        source,
    })
}
