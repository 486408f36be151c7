//! Shader-program lifecycle: read → compile → link → set uniforms.
//!
//! A [`ShaderProgram`] is built from one vertex and one fragment WGSL
//! source. Reading is fail-fast; per-stage compile failures are kept as
//! [`CompileWarning`]s; linking either yields a usable program or leaves it
//! in the [`ProgramState::LinkFailed`] state with a [`LinkError`].

mod compiler;
mod error;
mod link;
mod program;
mod reflect;
pub(crate) mod uniforms;

use std::fmt;
use std::path::{Path, PathBuf};

pub use compiler::{CompileWarning, CompiledStage, ShaderCompiler};
pub use error::ShaderError;
pub use link::{LinkError, LinkedProgram};
pub use program::{ProgramId, ProgramState, ShaderProgram};
pub use reflect::{
    ProgramLayout, ResourceKind, ResourceSlot, UniformKind, UniformSlot,
    UniformTable,
};

/// One programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Per-vertex stage.
    Vertex,
    /// Per-fragment stage.
    Fragment,
}

impl ShaderStage {
    /// Upper-case tag used in diagnostics (`VERTEX`, `FRAGMENT`).
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Vertex => "VERTEX",
            Self::Fragment => "FRAGMENT",
        }
    }

    pub(crate) fn naga_stage(self) -> naga::ShaderStage {
        match self {
            Self::Vertex => naga::ShaderStage::Vertex,
            Self::Fragment => naga::ShaderStage::Fragment,
        }
    }

    pub(crate) fn visibility(self) -> wgpu::ShaderStages {
        match self {
            Self::Vertex => wgpu::ShaderStages::VERTEX,
            Self::Fragment => wgpu::ShaderStages::FRAGMENT,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Raw text of one stage, alive only while a program is being built.
#[derive(Debug, Clone)]
pub struct ShaderSource {
    stage: ShaderStage,
    path: PathBuf,
    text: String,
}

impl ShaderSource {
    /// Read a stage from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ShaderError::Io`] if the file cannot be opened or is not
    /// valid UTF-8.
    pub fn read(stage: ShaderStage, path: &Path) -> Result<Self, ShaderError> {
        let text =
            std::fs::read_to_string(path).map_err(|source| ShaderError::Io {
                stage,
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            stage,
            path: path.to_path_buf(),
            text,
        })
    }

    /// Wrap in-memory text. `label` stands in for the file path in
    /// diagnostics.
    #[must_use]
    pub fn from_text(
        stage: ShaderStage,
        label: impl Into<PathBuf>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            stage,
            path: label.into(),
            text: text.into(),
        }
    }

    /// Stage this source belongs to.
    #[must_use]
    pub const fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Path (or label) the source was read from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The WGSL text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn label(&self) -> String {
        self.path.display().to_string()
    }
}
