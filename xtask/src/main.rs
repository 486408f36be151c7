//! Workspace tasks. Run with `cargo xtask <command>`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use gpu_primer::shader::{ProgramState, ShaderCompiler, ShaderProgram};

/// Vertex/fragment pairs the tutorials build.
const PROGRAMS: &[(&str, &str)] = &[
    ("triangle.vert.wgsl", "triangle.frag.wgsl"),
    ("triangle.vert.wgsl", "uniforms.frag.wgsl"),
    ("textured.vert.wgsl", "textured.frag.wgsl"),
    ("transform.vert.wgsl", "transform.frag.wgsl"),
];

#[derive(Parser)]
#[command(name = "xtask", about = "gpu-primer workspace tasks")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile and link every tutorial shader program without a GPU.
    CheckShaders {
        /// Directory holding the stage sources.
        #[arg(long, default_value = "shaders")]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    match Cli::parse().command {
        Command::CheckShaders { dir } => check_shaders(&dir),
    }
}

fn check_shaders(dir: &Path) -> Result<()> {
    let mut compiler = ShaderCompiler::new();
    let common = dir.join("common");
    if common.is_dir() {
        for entry in std::fs::read_dir(&common)
            .with_context(|| format!("reading {}", common.display()))?
        {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "wgsl") {
                compiler.register_file(&path)?;
                println!("module  {}", path.display());
            }
        }
    }

    let mut failures = 0;
    for (vertex, fragment) in PROGRAMS {
        let program = ShaderProgram::from_files_with(
            &mut compiler,
            dir.join(vertex),
            dir.join(fragment),
        )?;
        match program.state() {
            ProgramState::Linked => {
                let layout = program
                    .linked()
                    .map(|linked| linked.layout().uniforms().names().join(", "))
                    .unwrap_or_default();
                println!("ok      {} [{layout}]", program.label());
            }
            ProgramState::LinkFailed => {
                failures += 1;
                println!("FAILED  {}", program.label());
                for warning in program.compile_warnings() {
                    println!("{warning}");
                }
                if let Some(e) = program.link_error() {
                    println!("{e}");
                }
            }
        }
    }

    if failures > 0 {
        bail!("{failures} shader program(s) failed to link");
    }
    Ok(())
}
