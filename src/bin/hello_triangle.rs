//! Draws one vertex-colored triangle from a static vertex buffer.

use gpu_primer::viewer::run_tutorial;
use gpu_primer::{
    Frame, Mesh, Options, PipelineDesc, PrimerError, RenderContext, Scene,
    ShaderProgram,
};

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    color: [f32; 3],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    const fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

const VERTICES: [Vertex; 3] = [
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

struct HelloTriangle {
    program: ShaderProgram,
    mesh: Mesh,
}

impl Scene for HelloTriangle {
    fn init(ctx: &RenderContext, options: &Options) -> Result<Self, PrimerError> {
        let mut program = ShaderProgram::from_files(
            options.assets.shader("triangle.vert.wgsl"),
            options.assets.shader("triangle.frag.wgsl"),
        )?
        .require_linked()?;
        program.realize(ctx, &PipelineDesc::new(&[Vertex::layout()]))?;
        let mesh = Mesh::new(&ctx.device, "Triangle", &VERTICES);
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
    if let Err(e) = run_tutorial::<HelloTriangle>("hello_triangle") {
        log::error!("{e}");
        std::process::exit(-1);
    }
}
