use std::fmt;
use std::path::Path;

use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, NagaModuleDescriptor,
    ShaderLanguage, ShaderType,
};

use super::{ShaderError, ShaderSource, ShaderStage};

/// Wraps `naga_oil::compose::Composer` to compile single stages with
/// `#import` support.
///
/// Shared WGSL modules (files carrying a `#define_import_path`) are
/// registered once; every stage compiled afterwards may `#import` them.
/// Compilation produces validated `naga::Module` IR directly.
pub struct ShaderCompiler {
    composer: Composer,
}

impl Default for ShaderCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ShaderCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderCompiler").finish_non_exhaustive()
    }
}

impl ShaderCompiler {
    /// Compiler with no shared modules.
    #[must_use]
    pub fn new() -> Self {
        Self {
            composer: Composer::default(),
        }
    }

    /// Register a shared module from source text.
    ///
    /// # Errors
    ///
    /// Returns [`ShaderError::Module`] with the composer diagnostic if the
    /// module does not parse or lacks a `#define_import_path`.
    pub fn register_module(
        &mut self,
        source: &str,
        file_path: &str,
    ) -> Result<(), ShaderError> {
        let result = self
            .composer
            .add_composable_module(ComposableModuleDescriptor {
                source,
                file_path,
                language: ShaderLanguage::Wgsl,
                ..Default::default()
            })
            .map(|_| ());
        result.map_err(|e| ShaderError::Module {
            file_path: file_path.to_owned(),
            diagnostic: e.emit_to_string(&self.composer),
        })?;
        log::debug!("registered shader module `{file_path}`");
        Ok(())
    }

    /// Read and register a shared module file.
    ///
    /// # Errors
    ///
    /// Returns [`ShaderError::ModuleIo`] if the file cannot be read and
    /// [`ShaderError::Module`] if, as for
    /// [`register_module`](Self::register_module), it does not compose.
    pub fn register_file(&mut self, path: &Path) -> Result<(), ShaderError> {
        let text = std::fs::read_to_string(path).map_err(|source| {
            ShaderError::ModuleIo {
                path: path.to_path_buf(),
                source,
            }
        })?;
        self.register_module(&text, &path.display().to_string())
    }

    /// Compile one stage into validated IR.
    ///
    /// # Errors
    ///
    /// Returns a [`CompileWarning`] carrying the stage tag and the full
    /// diagnostic if parsing, import resolution or validation fails.
    pub fn compile(
        &mut self,
        source: &ShaderSource,
    ) -> Result<CompiledStage, CompileWarning> {
        let label = source.label();
        let result = self.composer.make_naga_module(NagaModuleDescriptor {
            source: source.text(),
            file_path: &label,
            shader_type: ShaderType::Wgsl,
            ..Default::default()
        });
        match result {
            Ok(module) => Ok(CompiledStage {
                stage: source.stage(),
                label,
                module,
            }),
            Err(e) => Err(CompileWarning {
                stage: source.stage(),
                label,
                diagnostic: e.emit_to_string(&self.composer),
            }),
        }
    }
}

/// One successfully compiled stage.
///
/// Consumed by linking, so it never outlives program construction.
#[derive(Debug)]
pub struct CompiledStage {
    pub(crate) stage: ShaderStage,
    pub(crate) label: String,
    pub(crate) module: naga::Module,
}

impl CompiledStage {
    /// Stage kind.
    #[must_use]
    pub const fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Validated IR for this stage.
    #[must_use]
    pub const fn module(&self) -> &naga::Module {
        &self.module
    }
}

/// A stage that failed to compile.
///
/// Not fatal to construction, but a program holding one never links.
#[derive(Debug, Clone)]
pub struct CompileWarning {
    stage: ShaderStage,
    label: String,
    diagnostic: String,
}

impl CompileWarning {
    /// Stage that failed.
    #[must_use]
    pub const fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Source path or label of the failed stage.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Full compiler diagnostic.
    #[must_use]
    pub fn diagnostic(&self) -> &str {
        &self.diagnostic
    }
}

impl fmt::Display for CompileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} shader `{}` failed to compile:\n{}",
            self.stage, self.label, self.diagnostic
        )
    }
}

impl std::error::Error for CompileWarning {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::test_sources;

    #[test]
    fn valid_stage_compiles() {
        let mut compiler = ShaderCompiler::new();
        let source = ShaderSource::from_text(
            ShaderStage::Vertex,
            "triangle.vert.wgsl",
            test_sources::VERTEX,
        );
        let stage = compiler.compile(&source).unwrap();
        assert_eq!(stage.stage(), ShaderStage::Vertex);
        assert_eq!(stage.module().entry_points.len(), 1);
    }

    #[test]
    fn syntax_error_reports_stage_tag() {
        let mut compiler = ShaderCompiler::new();
        let source = ShaderSource::from_text(
            ShaderStage::Vertex,
            "broken.vert.wgsl",
            test_sources::VERTEX_SYNTAX_ERROR,
        );
        let warning = compiler.compile(&source).unwrap_err();
        assert_eq!(warning.stage(), ShaderStage::Vertex);
        assert!(!warning.diagnostic().is_empty());
        let shown = warning.to_string();
        assert!(shown.contains("VERTEX"), "{shown}");
        assert!(shown.contains("broken.vert.wgsl"), "{shown}");
    }

    #[test]
    fn stages_can_import_shared_modules() {
        let mut compiler = ShaderCompiler::new();
        compiler
            .register_module(
                r"
#define_import_path primer::transform

fn apply_transform(m: mat4x4<f32>, p: vec3<f32>) -> vec4<f32> {
    return m * vec4<f32>(p, 1.0);
}
",
                "common/transform.wgsl",
            )
            .unwrap();

        let source = ShaderSource::from_text(
            ShaderStage::Vertex,
            "imports.vert.wgsl",
            r"
#import primer::transform::apply_transform

@group(0) @binding(0) var<uniform> transform: mat4x4<f32>;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return apply_transform(transform, position);
}
",
        );
        let stage = compiler.compile(&source).unwrap();
        assert_eq!(stage.module().entry_points[0].name, "vs_main");
    }

    #[test]
    fn missing_module_file_keeps_the_io_error() {
        let mut compiler = ShaderCompiler::new();
        let path = Path::new("no/such/common/module.wgsl");
        let err = compiler.register_file(path).unwrap_err();
        assert!(
            matches!(
                &err,
                ShaderError::ModuleIo { path: reported, source }
                    if reported == path
                        && source.kind() == std::io::ErrorKind::NotFound
            ),
            "{err:?}"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
