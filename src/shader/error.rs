use std::fmt;
use std::path::PathBuf;

use super::{LinkError, ProgramId, ShaderStage};

/// Errors raised while building or using a [`ShaderProgram`].
///
/// [`ShaderProgram`]: super::ShaderProgram
#[derive(Debug)]
pub enum ShaderError {
    /// A stage source could not be read. Nothing was compiled.
    Io {
        /// Stage whose file failed.
        stage: ShaderStage,
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// A shared `#import` module file could not be read.
    ModuleIo {
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// A shared `#import` module could not be registered.
    Module {
        /// Path or label of the module.
        file_path: String,
        /// Full composer diagnostic.
        diagnostic: String,
    },
    /// Linking failed (returned by [`ShaderProgram::require_linked`]).
    ///
    /// [`ShaderProgram::require_linked`]: super::ShaderProgram::require_linked
    Link(LinkError),
    /// The program is not in the `Linked` state and cannot be used.
    NotLinked {
        /// Program label.
        program: String,
        /// Collected compile and link diagnostics.
        report: String,
    },
    /// The program has no GPU pipeline yet; call `realize` first.
    NotRealized {
        /// Program label.
        program: String,
    },
    /// A draw was issued with a program that is not the bound one.
    ProgramNotBound {
        /// The program passed to the draw.
        program: ProgramId,
        /// The program currently bound, if any.
        bound: Option<ProgramId>,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io {
                stage,
                path,
                source,
            } => write!(
                f,
                "cannot read {stage} shader `{}`: {source}",
                path.display()
            ),
            Self::ModuleIo { path, source } => {
                write!(f, "cannot read shader module `{}`: {source}", path.display())
            }
            Self::Module {
                file_path,
                diagnostic,
            } => {
                write!(f, "cannot register module `{file_path}`:\n{diagnostic}")
            }
            Self::Link(e) => write!(f, "link failed: {e}"),
            Self::NotLinked { program, report } => {
                write!(f, "program `{program}` is not linked:\n{report}")
            }
            Self::NotRealized { program } => {
                write!(f, "program `{program}` has no GPU pipeline")
            }
            Self::ProgramNotBound { program, bound } => match bound {
                Some(bound) => write!(
                    f,
                    "draw with program {program} while {bound} is bound"
                ),
                None => {
                    write!(f, "draw with program {program} while none is bound")
                }
            },
        }
    }
}

impl std::error::Error for ShaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } | Self::ModuleIo { source, .. } => {
                Some(source)
            }
            Self::Link(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LinkError> for ShaderError {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}
