//! The per-frame context handle.

use super::bindings::BindingState;
use super::mesh::Mesh;
use super::render_context::RenderContext;
use crate::shader::{ProgramId, ShaderError, ShaderProgram};

/// One frame being recorded: a command encoder with a single render pass
/// and the binding state for that pass.
///
/// At most one program is bound at a time. [`draw`](Self::draw) refuses a
/// program that is not the bound one.
pub struct Frame<'a> {
    ctx: &'a RenderContext,
    bindings: BindingState,
    pass: wgpu::RenderPass<'static>,
    encoder: wgpu::CommandEncoder,
    surface_texture: Option<wgpu::SurfaceTexture>,
    index: u64,
}

impl std::fmt::Debug for Frame<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("index", &self.index)
            .field("bound", &self.bindings.current())
            .finish_non_exhaustive()
    }
}

impl<'a> Frame<'a> {
    pub(crate) fn new(
        ctx: &'a RenderContext,
        view: &wgpu::TextureView,
        clear: wgpu::Color,
        index: u64,
        surface_texture: Option<wgpu::SurfaceTexture>,
    ) -> Self {
        let mut encoder = ctx.create_encoder();
        let pass = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Frame Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            })
            .forget_lifetime();
        Self {
            ctx,
            bindings: BindingState::default(),
            pass,
            encoder,
            surface_texture,
            index,
        }
    }

    /// Monotonic frame counter of the owning context.
    #[must_use]
    pub const fn index(&self) -> u64 {
        self.index
    }

    /// The context this frame records for.
    #[must_use]
    pub const fn context(&self) -> &'a RenderContext {
        self.ctx
    }

    /// The currently bound program.
    #[must_use]
    pub const fn bound_program(&self) -> Option<ProgramId> {
        self.bindings.current()
    }

    /// Bind `program` for subsequent draws, replacing any bound program.
    ///
    /// # Errors
    ///
    /// Returns [`ShaderError::NotLinked`] for a program that did not link
    /// and [`ShaderError::NotRealized`] for one without a pipeline. The
    /// previous binding is kept in both cases.
    pub fn use_program(
        &mut self,
        program: &mut ShaderProgram,
    ) -> Result<(), ShaderError> {
        let mut next = self.bindings.clone();
        program.activate(&mut next)?;
        program.encode_use(&mut self.pass)?;
        self.bindings = next;
        Ok(())
    }

    /// Draw `mesh` with the bound `program`, snapshotting its current
    /// uniform values for this draw.
    ///
    /// # Errors
    ///
    /// Returns [`ShaderError::ProgramNotBound`] if `program` is not the
    /// bound program.
    pub fn draw(
        &mut self,
        program: &mut ShaderProgram,
        mesh: &Mesh,
    ) -> Result<(), ShaderError> {
        if !self.bindings.is_bound(program.id()) {
            return Err(ShaderError::ProgramNotBound {
                program: program.id(),
                bound: self.bindings.current(),
            });
        }
        program.encode_draw(self.ctx, self.index, &mut self.pass)?;
        mesh.draw(&mut self.pass);
        Ok(())
    }

    /// End the pass, submit, and present if the frame came from the
    /// swapchain.
    pub fn finish(self) {
        let Self {
            ctx,
            pass,
            encoder,
            surface_texture,
            ..
        } = self;
        drop(pass);
        ctx.submit(encoder);
        if let Some(texture) = surface_texture {
            texture.present();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::PipelineDesc;
    use crate::shader::{test_sources, ShaderCompiler, ShaderSource, ShaderStage};
    use glam::{Mat4, Vec4};

    #[repr(C)]
    #[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
    struct Vertex {
        position: [f32; 3],
        color: [f32; 3],
    }

    const TRIANGLE: [Vertex; 3] = [
        Vertex {
            position: [-0.5, -0.5, 0.0],
            color: [1.0, 0.0, 0.0],
        },
        Vertex {
            position: [0.5, -0.5, 0.0],
            color: [0.0, 1.0, 0.0],
        },
        Vertex {
            position: [0.0, 0.5, 0.0],
            color: [0.0, 0.0, 1.0],
        },
    ];

    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    fn context() -> Option<RenderContext> {
        pollster::block_on(RenderContext::headless(64, 64)).ok()
    }

    fn program(fragment: &str) -> ShaderProgram {
        ShaderProgram::from_sources(
            &mut ShaderCompiler::new(),
            &ShaderSource::from_text(ShaderStage::Vertex, "test.vert.wgsl", test_sources::VERTEX),
            &ShaderSource::from_text(ShaderStage::Fragment, "test.frag.wgsl", fragment),
        )
    }

    fn realize(ctx: &RenderContext, program: &mut ShaderProgram) {
        let layouts = [wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }];
        program.realize(ctx, &PipelineDesc::new(&layouts)).unwrap();
    }

    #[test]
    fn linked_program_draws_without_validation_errors() {
        let Some(ctx) = context() else {
            return;
        };
        let target = ctx.create_render_target();
        let mesh = Mesh::new(&ctx.device, "triangle", &TRIANGLE);
        let mut program = program(test_sources::FRAGMENT);
        realize(&ctx, &mut program);

        ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
        for _ in 0..2 {
            let mut frame = ctx.begin_frame_on(&target.view, wgpu::Color::BLACK);
            frame.use_program(&mut program).unwrap();
            assert_eq!(frame.bound_program(), Some(program.id()));

            program.set_mat4("model", Mat4::IDENTITY);
            program.set_vec4("tint", Vec4::ONE);
            program.set_float("green", 0.25);
            frame.draw(&mut program, &mesh).unwrap();

            // Second draw in the same pass with different values.
            program.set_mat4("model", Mat4::from_scale(glam::Vec3::splat(0.5)));
            program.set_float("green", 0.75);
            frame.draw(&mut program, &mesh).unwrap();

            // Unchanged values reuse the last snapshot.
            frame.draw(&mut program, &mesh).unwrap();
            frame.finish();
        }
        let error = pollster::block_on(ctx.device.pop_error_scope());
        assert!(error.is_none(), "{error:?}");
    }

    #[test]
    fn each_draw_renders_with_its_own_matrix() {
        let Some(ctx) = context() else {
            return;
        };
        let target = ctx.create_render_target();
        let white = [1.0, 1.0, 1.0];
        let quad = [
            Vertex { position: [-0.2, -0.2, 0.0], color: white },
            Vertex { position: [0.2, -0.2, 0.0], color: white },
            Vertex { position: [0.2, 0.2, 0.0], color: white },
            Vertex { position: [-0.2, 0.2, 0.0], color: white },
        ];
        let mesh = Mesh::indexed(&ctx.device, "quad", &quad, &[0, 1, 2, 0, 2, 3]);
        let mut program = program(test_sources::FRAGMENT);
        realize(&ctx, &mut program);

        let mut frame = ctx.begin_frame_on(&target.view, wgpu::Color::BLACK);
        frame.use_program(&mut program).unwrap();
        program.set_vec4("tint", Vec4::ONE);
        program.set_mat4("model", Mat4::from_translation(glam::Vec3::new(-0.5, 0.0, 0.0)));
        frame.draw(&mut program, &mesh).unwrap();
        program.set_mat4("model", Mat4::from_translation(glam::Vec3::new(0.5, 0.0, 0.0)));
        frame.draw(&mut program, &mesh).unwrap();
        frame.finish();

        // 64x64 target: NDC x = -0.5, 0.0, 0.5 land on columns 16, 32, 48.
        let red = |x| target.read_pixel(&ctx.device, &ctx.queue, x, 32).unwrap()[0];
        assert_eq!(red(16), 255, "left quad missing");
        assert_eq!(red(32), 0, "center should stay clear");
        assert_eq!(red(48), 255, "right quad missing");
    }

    #[test]
    fn draw_requires_the_bound_program() {
        let Some(ctx) = context() else {
            return;
        };
        let target = ctx.create_render_target();
        let mesh = Mesh::new(&ctx.device, "triangle", &TRIANGLE);
        let mut a = program(test_sources::FRAGMENT);
        let mut b = program(test_sources::FRAGMENT);
        realize(&ctx, &mut a);
        realize(&ctx, &mut b);

        let mut frame = ctx.begin_frame_on(&target.view, wgpu::Color::BLACK);
        let err = frame.draw(&mut a, &mesh).unwrap_err();
        assert!(matches!(err, ShaderError::ProgramNotBound { bound: None, .. }));

        frame.use_program(&mut a).unwrap();
        frame.use_program(&mut b).unwrap();
        let err = frame.draw(&mut a, &mesh).unwrap_err();
        assert!(matches!(
            err,
            ShaderError::ProgramNotBound { bound: Some(id), .. } if id == b.id()
        ));
        frame.draw(&mut b, &mesh).unwrap();
        frame.finish();
    }

    #[test]
    fn unlinked_or_unrealized_programs_cannot_be_used() {
        let Some(ctx) = context() else {
            return;
        };
        let target = ctx.create_render_target();
        let mut broken = program(test_sources::FRAGMENT_MISMATCHED);
        let layouts = [];
        let err = broken
            .realize(&ctx, &PipelineDesc::new(&layouts))
            .unwrap_err();
        assert!(matches!(err, ShaderError::NotLinked { .. }));

        let mut unrealized = program(test_sources::FRAGMENT);
        let mut frame = ctx.begin_frame_on(&target.view, wgpu::Color::BLACK);
        assert!(matches!(
            frame.use_program(&mut broken).unwrap_err(),
            ShaderError::NotLinked { .. }
        ));
        assert!(matches!(
            frame.use_program(&mut unrealized).unwrap_err(),
            ShaderError::NotRealized { .. }
        ));
        assert_eq!(frame.bound_program(), None);
        frame.finish();
    }
}
