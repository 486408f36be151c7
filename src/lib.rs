// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Function signature hygiene
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]

//! Small wgpu tutorial toolkit built around a shader-program helper.
//!
//! The tutorials under `src/bin/` each open a window, compile one WGSL
//! program, upload a static buffer and draw it every frame. The only
//! reusable piece with real behavior is [`shader::ShaderProgram`]:
//!
//! - read the vertex and fragment sources (fail fast on I/O)
//! - compile each stage, keeping a [`shader::CompileWarning`] per failure
//! - link the stages, checking their interface and shared resources
//! - set uniforms by name for the next draw
//!
//! Everything under [`gpu`] is thin wgpu glue: the [`gpu::RenderContext`]
//! owning device and queue, the per-frame [`gpu::Frame`] that tracks the
//! bound program, static [`gpu::Mesh`] buffers and decoded
//! [`gpu::Texture`]s.
//!
//! ```no_run
//! # use gpu_primer::shader::ShaderProgram;
//! # fn demo() -> Result<(), gpu_primer::shader::ShaderError> {
//! let mut program =
//!     ShaderProgram::from_files("shaders/triangle.vert.wgsl", "shaders/triangle.frag.wgsl")?
//!         .require_linked()?;
//! program.set_float("green", 0.5);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod gpu;
pub mod options;
pub mod shader;
pub mod util;
#[cfg(feature = "viewer")]
pub mod viewer;

pub use error::PrimerError;
pub use gpu::{Frame, Mesh, PipelineDesc, RenderContext, Texture};
pub use options::Options;
pub use shader::{ShaderCompiler, ShaderProgram};
#[cfg(feature = "viewer")]
pub use viewer::{Scene, Viewer};
