//! A textured quad, scaled and spinning, positioned by a `mat4x4` uniform.
//!
//! The vertex stage imports its transform helper from a shared module in
//! `shaders/common/`.

use glam::{Mat4, Quat, Vec3};
use gpu_primer::viewer::run_tutorial;
use gpu_primer::{
    Frame, Mesh, Options, PipelineDesc, PrimerError, RenderContext, Scene,
    ShaderCompiler, ShaderProgram, Texture,
};

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    uv: [f32; 2],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

    const fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

const VERTICES: [Vertex; 4] = [
    Vertex {
        position: [0.5, 0.5, 0.0],
        uv: [1.0, 0.0],
    },
    Vertex {
        position: [0.5, -0.5, 0.0],
        uv: [1.0, 1.0],
    },
    Vertex {
        position: [-0.5, -0.5, 0.0],
        uv: [0.0, 1.0],
    },
    Vertex {
        position: [-0.5, 0.5, 0.0],
        uv: [0.0, 0.0],
    },
];

const INDICES: [u16; 6] = [0, 3, 1, 1, 3, 2];

struct Transformations {
    program: ShaderProgram,
    mesh: Mesh,
}

impl Scene for Transformations {
    fn init(ctx: &RenderContext, options: &Options) -> Result<Self, PrimerError> {
        let mut compiler = ShaderCompiler::new();
        compiler.register_file(&options.assets.shader_module_dir.join("transform.wgsl"))?;
        let mut program = ShaderProgram::from_files_with(
            &mut compiler,
            options.assets.shader("transform.vert.wgsl"),
            options.assets.shader("transform.frag.wgsl"),
        )?
        .require_linked()?;
        program.realize(ctx, &PipelineDesc::new(&[Vertex::layout()]))?;

        match Texture::from_path(
            &ctx.device,
            &ctx.queue,
            options.assets.texture("checker.png"),
        ) {
            Ok(texture) => program.set_texture("diffuse", &texture)?,
            Err(e) => log::error!("{e}"),
        }

        let mesh = Mesh::indexed(&ctx.device, "Quad", &VERTICES, &INDICES);
        Ok(Self { program, mesh })
    }

    fn render(&mut self, frame: &mut Frame<'_>, elapsed: f32) -> Result<(), PrimerError> {
        let aspect = frame.context().aspect();
        let transform = Mat4::from_scale(Vec3::new(1.0 / aspect, 1.0, 1.0))
            * Mat4::from_scale_rotation_translation(
                Vec3::splat(0.75),
                Quat::from_rotation_z(elapsed),
                Vec3::new(0.5, -0.5, 0.0),
            );

        frame.use_program(&mut self.program)?;
        self.program.set_mat4("transform", transform);
        frame.draw(&mut self.program, &self.mesh)?;
        Ok(())
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = run_tutorial::<Transformations>("transformations") {
        log::error!("{e}");
        std::process::exit(-1);
    }
}
