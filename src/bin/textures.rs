//! A textured quad drawn from an indexed vertex buffer.
//!
//! A missing or unreadable image is logged and the quad falls back to
//! plain vertex colors.

use gpu_primer::viewer::run_tutorial;
use gpu_primer::{
    Frame, Mesh, Options, PipelineDesc, PrimerError, RenderContext, Scene,
    ShaderProgram, Texture,
};

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    color: [f32; 3],
    uv: [f32; 2],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    const fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

// Texture rows are uploaded top row first, so v grows downwards.
const VERTICES: [Vertex; 4] = [
    Vertex {
        position: [0.5, 0.5, 0.0],
        color: [1.0, 0.0, 0.0],
        uv: [1.0, 0.0],
    },
    Vertex {
        position: [0.5, -0.5, 0.0],
        color: [0.0, 1.0, 0.0],
        uv: [1.0, 1.0],
    },
    Vertex {
        position: [-0.5, -0.5, 0.0],
        color: [0.0, 0.0, 1.0],
        uv: [0.0, 1.0],
    },
    Vertex {
        position: [-0.5, 0.5, 0.0],
        color: [1.0, 1.0, 0.0],
        uv: [0.0, 0.0],
    },
];

const INDICES: [u16; 6] = [0, 3, 1, 1, 3, 2];

struct Textures {
    program: ShaderProgram,
    mesh: Mesh,
}

impl Scene for Textures {
    fn init(ctx: &RenderContext, options: &Options) -> Result<Self, PrimerError> {
        let mut program = ShaderProgram::from_files(
            options.assets.shader("textured.vert.wgsl"),
            options.assets.shader("textured.frag.wgsl"),
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

    fn render(&mut self, frame: &mut Frame<'_>, _elapsed: f32) -> Result<(), PrimerError> {
        frame.use_program(&mut self.program)?;
        frame.draw(&mut self.program, &self.mesh)?;
        Ok(())
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = run_tutorial::<Textures>("textures") {
        log::error!("{e}");
        std::process::exit(-1);
    }
}
