use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Mat4, Vec2, Vec3, Vec4};

use super::link::{self, LinkError, LinkedProgram};
use super::reflect::UniformKind;
use super::uniforms::{Ignored, UniformStorage};
use super::{
    CompileWarning, ShaderCompiler, ShaderError, ShaderSource, ShaderStage,
};
use crate::gpu::bindings::BindingState;
use crate::gpu::program::{GpuProgram, PipelineDesc};
use crate::gpu::render_context::RenderContext;
use crate::gpu::texture::Texture;

static NEXT_PROGRAM_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`ShaderProgram`]. Never reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(u64);

impl ProgramId {
    fn next() -> Self {
        Self(NEXT_PROGRAM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Terminal construction state of a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramState {
    /// Both stages compiled and linked; the program is usable.
    Linked,
    /// A stage failed to compile or linking failed; the program must not
    /// be used.
    LinkFailed,
}

#[derive(Debug)]
enum LinkState {
    Linked(Box<LinkedProgram>),
    LinkFailed(LinkError),
}

/// A vertex + fragment program with by-name uniform setters.
///
/// Construction never aborts on bad shader code: compile failures are kept
/// as [`CompileWarning`]s and a failed link leaves the program in
/// [`ProgramState::LinkFailed`]. Anything that would bind such a program
/// ([`activate`](Self::activate), [`realize`](Self::realize),
/// [`Frame::use_program`](crate::gpu::Frame::use_program)) fails with
/// [`ShaderError::NotLinked`]. Use [`require_linked`](Self::require_linked)
/// to turn a failed link into an error right away.
#[derive(Debug)]
pub struct ShaderProgram {
    id: ProgramId,
    label: String,
    state: LinkState,
    warnings: Vec<CompileWarning>,
    uniforms: UniformStorage,
    gpu: Option<GpuProgram>,
}

impl ShaderProgram {
    /// Read, compile and link two WGSL files.
    ///
    /// # Errors
    ///
    /// Returns [`ShaderError::Io`] if either file cannot be read; nothing is
    /// compiled in that case. Compile and link failures do not error, see
    /// [`state`](Self::state).
    pub fn from_files(
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> Result<Self, ShaderError> {
        Self::from_files_with(
            &mut ShaderCompiler::new(),
            vertex_path,
            fragment_path,
        )
    }

    /// As [`from_files`](Self::from_files), compiling with `compiler` so the
    /// stages may `#import` its registered modules.
    ///
    /// # Errors
    ///
    /// Returns [`ShaderError::Io`] if either file cannot be read.
    pub fn from_files_with(
        compiler: &mut ShaderCompiler,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> Result<Self, ShaderError> {
        let vertex =
            ShaderSource::read(ShaderStage::Vertex, vertex_path.as_ref())?;
        let fragment =
            ShaderSource::read(ShaderStage::Fragment, fragment_path.as_ref())?;
        Ok(Self::from_sources(compiler, &vertex, &fragment))
    }

    /// Compile and link in-memory sources.
    pub fn from_sources(
        compiler: &mut ShaderCompiler,
        vertex: &ShaderSource,
        fragment: &ShaderSource,
    ) -> Self {
        let label = format!("{} + {}", vertex.label(), fragment.label());
        let mut warnings = Vec::new();
        let mut compile = |source: &ShaderSource| match compiler.compile(source)
        {
            Ok(stage) => Some(stage),
            Err(warning) => {
                log::warn!("{warning}");
                warnings.push(warning);
                None
            }
        };
        let vertex = compile(vertex);
        let fragment = compile(fragment);

        let state = match link::link(vertex, fragment) {
            Ok(linked) => {
                log::debug!(
                    "linked `{label}` ({} uniform names, {} resources)",
                    linked.layout().uniforms().len(),
                    linked.layout().resources().len()
                );
                LinkState::Linked(Box::new(linked))
            }
            Err(e) => {
                log::error!("failed to link `{label}`: {e}");
                LinkState::LinkFailed(e)
            }
        };
        let uniforms = match &state {
            LinkState::Linked(linked) => UniformStorage::new(linked.layout()),
            LinkState::LinkFailed(_) => UniformStorage::default(),
        };

        Self {
            id: ProgramId::next(),
            label,
            state,
            warnings,
            uniforms,
            gpu: None,
        }
    }

    /// Keep the program only if it linked.
    ///
    /// # Errors
    ///
    /// Returns [`ShaderError::Link`] with the link diagnostic otherwise.
    pub fn require_linked(self) -> Result<Self, ShaderError> {
        match &self.state {
            LinkState::Linked(_) => Ok(self),
            LinkState::LinkFailed(e) => Err(ShaderError::Link(e.clone())),
        }
    }

    /// Process-unique identity.
    #[must_use]
    pub const fn id(&self) -> ProgramId {
        self.id
    }

    /// `"<vertex path> + <fragment path>"`.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Terminal construction state.
    #[must_use]
    pub const fn state(&self) -> ProgramState {
        match self.state {
            LinkState::Linked(_) => ProgramState::Linked,
            LinkState::LinkFailed(_) => ProgramState::LinkFailed,
        }
    }

    /// Whether the program linked.
    #[must_use]
    pub const fn is_linked(&self) -> bool {
        matches!(self.state, LinkState::Linked(_))
    }

    /// Stages that failed to compile.
    #[must_use]
    pub fn compile_warnings(&self) -> &[CompileWarning] {
        &self.warnings
    }

    /// Why linking failed, if it did.
    #[must_use]
    pub const fn link_error(&self) -> Option<&LinkError> {
        match &self.state {
            LinkState::Linked(_) => None,
            LinkState::LinkFailed(e) => Some(e),
        }
    }

    /// Linked IR and layout, if linking succeeded.
    #[must_use]
    pub fn linked(&self) -> Option<&LinkedProgram> {
        match &self.state {
            LinkState::Linked(linked) => Some(linked.as_ref()),
            LinkState::LinkFailed(_) => None,
        }
    }

    fn ensure_linked(&self) -> Result<&LinkedProgram, ShaderError> {
        match &self.state {
            LinkState::Linked(linked) => Ok(linked.as_ref()),
            LinkState::LinkFailed(e) => {
                let mut report: Vec<String> =
                    self.warnings.iter().map(ToString::to_string).collect();
                report.push(e.to_string());
                Err(ShaderError::NotLinked {
                    program: self.label.clone(),
                    report: report.join("\n"),
                })
            }
        }
    }

    /// Make this the bound program in `bindings`, replacing any other.
    ///
    /// # Errors
    ///
    /// Returns [`ShaderError::NotLinked`] for a program that did not link;
    /// `bindings` is left untouched.
    pub fn activate(
        &self,
        bindings: &mut BindingState,
    ) -> Result<(), ShaderError> {
        let _ = self.ensure_linked()?;
        let _ = bindings.bind(self.id);
        Ok(())
    }

    // -- Uniforms ---------------------------------------------------------

    fn write_uniform(
        &mut self,
        name: &str,
        accepts: &[UniformKind],
        bytes: &[u8],
    ) {
        if !self.is_linked() {
            let label = &self.label;
            self.uniforms.warnings().warn(Ignored::NotLinked, name, || {
                format!("uniform `{name}` ignored: `{label}` is not linked")
            });
            return;
        }
        self.uniforms.write(name, accepts, bytes);
    }

    /// Set an `i32` (or `u32`) uniform.
    pub fn set_int(&mut self, name: &str, value: i32) {
        self.write_uniform(
            name,
            &[UniformKind::Int, UniformKind::Uint],
            &value.to_le_bytes(),
        );
    }

    /// Set a `u32` (or `i32`) uniform.
    pub fn set_uint(&mut self, name: &str, value: u32) {
        self.write_uniform(
            name,
            &[UniformKind::Uint, UniformKind::Int],
            &value.to_le_bytes(),
        );
    }

    /// Set an integer uniform to `1` or `0`. WGSL has no host-shareable
    /// `bool`, so flags live in `i32`/`u32` slots.
    pub fn set_bool(&mut self, name: &str, value: bool) {
        self.set_int(name, i32::from(value));
    }

    /// Set an `f32` uniform.
    pub fn set_float(&mut self, name: &str, value: f32) {
        self.write_uniform(name, &[UniformKind::Float], &value.to_le_bytes());
    }

    /// Set a `vec2<f32>` uniform.
    pub fn set_vec2(&mut self, name: &str, value: Vec2) {
        self.write_uniform(
            name,
            &[UniformKind::Vec2],
            bytemuck::cast_slice(&value.to_array()),
        );
    }

    /// Set a `vec3<f32>` uniform.
    pub fn set_vec3(&mut self, name: &str, value: Vec3) {
        self.write_uniform(
            name,
            &[UniformKind::Vec3],
            bytemuck::cast_slice(&value.to_array()),
        );
    }

    /// Set a `vec4<f32>` uniform.
    pub fn set_vec4(&mut self, name: &str, value: Vec4) {
        self.write_uniform(
            name,
            &[UniformKind::Vec4],
            bytemuck::cast_slice(&value.to_array()),
        );
    }

    /// Set a `mat4x4<f32>` uniform, written column-major.
    pub fn set_mat4(&mut self, name: &str, value: Mat4) {
        self.write_uniform(
            name,
            &[UniformKind::Mat4],
            bytemuck::cast_slice(&value.to_cols_array()),
        );
    }

    /// Bytes of a uniform exactly as the next draw will see them.
    #[must_use]
    pub fn uniform_bytes(&self, name: &str) -> Option<&[u8]> {
        self.uniforms.value_bytes(name)
    }

    // -- GPU --------------------------------------------------------------

    /// Build the wgpu pipeline, bind group layouts and uniform buffers.
    /// Calling it again replaces the previous pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`ShaderError::NotLinked`] for a program that did not link.
    pub fn realize(
        &mut self,
        ctx: &RenderContext,
        desc: &PipelineDesc<'_>,
    ) -> Result<(), ShaderError> {
        let gpu = {
            let linked = self.ensure_linked()?;
            GpuProgram::new(ctx, linked, &self.label, desc)
        };
        self.gpu = Some(gpu);
        Ok(())
    }

    /// Whether [`realize`](Self::realize) has run.
    #[must_use]
    pub const fn is_realized(&self) -> bool {
        self.gpu.is_some()
    }

    fn gpu_mut(&mut self) -> Result<&mut GpuProgram, ShaderError> {
        let label = &self.label;
        self.gpu.as_mut().ok_or_else(|| ShaderError::NotRealized {
            program: label.clone(),
        })
    }

    /// Bind `texture` to the texture variable `name`. Unknown names warn
    /// once and are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ShaderError::NotRealized`] before [`realize`](Self::realize).
    pub fn set_texture(
        &mut self,
        name: &str,
        texture: &Texture,
    ) -> Result<(), ShaderError> {
        let gpu = self.gpu.as_mut().ok_or_else(|| ShaderError::NotRealized {
            program: self.label.clone(),
        })?;
        if !gpu.set_texture(name, texture.view.clone()) {
            self.uniforms.warnings().warn(Ignored::UnknownTexture, name, || {
                format!("texture `{name}` does not exist in this program")
            });
        }
        Ok(())
    }

    /// Bind `sampler` to the sampler variable `name`. Unknown names warn
    /// once and are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ShaderError::NotRealized`] before [`realize`](Self::realize).
    pub fn set_sampler(
        &mut self,
        name: &str,
        sampler: &wgpu::Sampler,
    ) -> Result<(), ShaderError> {
        let gpu = self.gpu.as_mut().ok_or_else(|| ShaderError::NotRealized {
            program: self.label.clone(),
        })?;
        if !gpu.set_sampler(name, sampler.clone()) {
            self.uniforms.warnings().warn(Ignored::UnknownSampler, name, || {
                format!("sampler `{name}` does not exist in this program")
            });
        }
        Ok(())
    }

    pub(crate) fn encode_use(
        &mut self,
        pass: &mut wgpu::RenderPass<'_>,
    ) -> Result<(), ShaderError> {
        self.gpu_mut()?.set_pipeline(pass);
        Ok(())
    }

    pub(crate) fn encode_draw(
        &mut self,
        ctx: &RenderContext,
        frame_index: u64,
        pass: &mut wgpu::RenderPass<'_>,
    ) -> Result<(), ShaderError> {
        let gpu = self.gpu.as_mut().ok_or_else(|| ShaderError::NotRealized {
            program: self.label.clone(),
        })?;
        gpu.bind_groups(ctx, frame_index, &mut self.uniforms, pass);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::shader::test_sources;

    fn program(vertex: &str, fragment: &str) -> ShaderProgram {
        ShaderProgram::from_sources(
            &mut ShaderCompiler::new(),
            &ShaderSource::from_text(ShaderStage::Vertex, "test.vert.wgsl", vertex),
            &ShaderSource::from_text(
                ShaderStage::Fragment,
                "test.frag.wgsl",
                fragment,
            ),
        )
    }

    fn write_temp(name: &str, text: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "gpu-primer-{}-{name}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::File::create(&path)
            .unwrap()
            .write_all(text.as_bytes())
            .unwrap();
        path
    }

    #[test]
    fn valid_sources_link() {
        let program = program(test_sources::VERTEX, test_sources::FRAGMENT);
        assert_eq!(program.state(), ProgramState::Linked);
        assert!(program.compile_warnings().is_empty());
        assert!(program.link_error().is_none());

        let mut bindings = BindingState::default();
        program.activate(&mut bindings).unwrap();
        assert_eq!(bindings.current(), Some(program.id()));
    }

    #[test]
    fn vertex_syntax_error_is_a_warning_not_an_abort() {
        let program =
            program(test_sources::VERTEX_SYNTAX_ERROR, test_sources::FRAGMENT);
        assert_eq!(program.compile_warnings().len(), 1);
        let warning = &program.compile_warnings()[0];
        assert_eq!(warning.stage(), ShaderStage::Vertex);
        assert!(warning.to_string().contains("VERTEX"));
        assert_eq!(program.state(), ProgramState::LinkFailed);
        assert_eq!(
            program.link_error(),
            Some(&LinkError::StageNotCompiled {
                stage: ShaderStage::Vertex
            })
        );
    }

    #[test]
    fn link_failure_blocks_activation() {
        let program =
            program(test_sources::VERTEX, test_sources::FRAGMENT_MISMATCHED);
        assert_eq!(program.state(), ProgramState::LinkFailed);

        let mut bindings = BindingState::default();
        let err = program.activate(&mut bindings).unwrap_err();
        assert!(matches!(err, ShaderError::NotLinked { .. }));
        assert!(err.to_string().contains("@location(0)"));
        assert_eq!(bindings.current(), None);

        let err = program.require_linked().unwrap_err();
        assert!(matches!(
            err,
            ShaderError::Link(LinkError::VaryingTypeMismatch { .. })
        ));
    }

    #[test]
    fn integer_texture_slot_fails_to_link() {
        let program =
            program(test_sources::VERTEX, test_sources::FRAGMENT_UINT_TEXTURE);
        assert_eq!(program.state(), ProgramState::LinkFailed);
        assert!(matches!(
            program.link_error(),
            Some(LinkError::UnsupportedResource { name, group: 1, binding: 0 })
                if name == "lut"
        ));
        assert!(matches!(
            program.require_linked().unwrap_err(),
            ShaderError::Link(LinkError::UnsupportedResource { .. })
        ));
    }

    #[test]
    fn activating_another_program_replaces_the_bound_one() {
        let a = program(test_sources::VERTEX, test_sources::FRAGMENT);
        let b = program(test_sources::VERTEX, test_sources::FRAGMENT);
        assert_ne!(a.id(), b.id());

        let mut bindings = BindingState::default();
        a.activate(&mut bindings).unwrap();
        b.activate(&mut bindings).unwrap();
        assert_eq!(bindings.current(), Some(b.id()));
    }

    #[test]
    fn unknown_uniform_changes_nothing() {
        let mut program = program(test_sources::VERTEX, test_sources::FRAGMENT);
        let before: Vec<u8> = program.uniforms.block(1, 0).unwrap().to_vec();
        program.set_int("nonexistent_uniform", 0);
        assert_eq!(program.uniforms.block(1, 0).unwrap(), before.as_slice());
        assert!(program.uniform_bytes("nonexistent_uniform").is_none());
    }

    #[test]
    fn mat4_reaches_the_block_unmodified_and_column_major() {
        let mut program = program(test_sources::VERTEX, test_sources::FRAGMENT);

        let m = Mat4::from_translation(Vec3::new(0.5, -0.5, 0.0));
        program.set_mat4("model", m);
        let staged = program.uniform_bytes("model").unwrap();
        assert_eq!(staged, bytemuck::cast_slice::<f32, u8>(&m.to_cols_array()));
        // Translation lives in the last column: floats 12..15.
        let floats: &[f32] = bytemuck::cast_slice(staged);
        assert_eq!(&floats[12..15], &[0.5, -0.5, 0.0]);

        let m2 = Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2);
        program.set_mat4("transforms.model", m2);
        assert_eq!(
            program.uniform_bytes("model").unwrap(),
            bytemuck::cast_slice::<f32, u8>(&m2.to_cols_array())
        );
    }

    #[test]
    fn scalar_and_vector_setters_write_their_slots() {
        let mut program = program(test_sources::VERTEX, test_sources::FRAGMENT);
        program.set_float("green", 0.25);
        program.set_bool("mode", true);
        program.set_vec4("tint", Vec4::new(1.0, 0.5, 0.25, 1.0));

        assert_eq!(program.uniform_bytes("green").unwrap(), &0.25_f32.to_le_bytes());
        assert_eq!(program.uniform_bytes("mode").unwrap(), &1_i32.to_le_bytes());
        let tint: &[f32] =
            bytemuck::cast_slice(program.uniform_bytes("tint").unwrap());
        assert_eq!(tint, &[1.0, 0.5, 0.25, 1.0]);

        // Wrong kind: ignored.
        program.set_float("mode", 3.0);
        assert_eq!(program.uniform_bytes("mode").unwrap(), &1_i32.to_le_bytes());
    }

    #[test]
    fn setters_on_unlinked_program_are_ignored() {
        let mut program =
            program(test_sources::VERTEX, test_sources::FRAGMENT_MISMATCHED);
        program.set_float("green", 1.0);
        assert!(program.uniform_bytes("green").is_none());
    }

    #[test]
    fn missing_file_fails_before_compiling() {
        let fragment = write_temp("ok.frag.wgsl", test_sources::FRAGMENT);
        let err = ShaderProgram::from_files("does/not/exist.vert.wgsl", &fragment)
            .unwrap_err();
        match err {
            ShaderError::Io { stage, path, .. } => {
                assert_eq!(stage, ShaderStage::Vertex);
                assert!(path.ends_with("exist.vert.wgsl"));
            }
            other => panic!("expected Io, got {other:?}"),
        }
    }

    #[test]
    fn files_on_disk_link() {
        let vertex = write_temp("disk.vert.wgsl", test_sources::VERTEX);
        let fragment = write_temp("disk.frag.wgsl", test_sources::FRAGMENT);
        let program = ShaderProgram::from_files(&vertex, &fragment)
            .unwrap()
            .require_linked()
            .unwrap();
        assert!(program.label().contains("disk.vert.wgsl"));
        assert!(!program.is_realized());
    }
}
