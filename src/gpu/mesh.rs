//! Static vertex and index buffers.

use wgpu::util::DeviceExt;

/// Vertex data (and optional `u16` indices) uploaded once.
#[derive(Debug)]
pub struct Mesh {
    vertices: wgpu::Buffer,
    vertex_count: u32,
    indices: Option<(wgpu::Buffer, u32)>,
}

impl Mesh {
    /// Upload `vertices` for a non-indexed draw.
    pub fn new<V: bytemuck::Pod>(
        device: &wgpu::Device,
        label: &str,
        vertices: &[V],
    ) -> Self {
        Self {
            vertices: vertex_buffer(device, label, vertices),
            vertex_count: count(vertices.len()),
            indices: None,
        }
    }

    /// Upload `vertices` plus `indices` for an indexed draw.
    pub fn indexed<V: bytemuck::Pod>(
        device: &wgpu::Device,
        label: &str,
        vertices: &[V],
        indices: &[u16],
    ) -> Self {
        let index_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Indices")),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        Self {
            vertices: vertex_buffer(device, label, vertices),
            vertex_count: count(vertices.len()),
            indices: Some((index_buffer, count(indices.len()))),
        }
    }

    /// Number of vertices.
    #[must_use]
    pub const fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Number of indices, for an indexed mesh.
    #[must_use]
    pub fn index_count(&self) -> Option<u32> {
        self.indices.as_ref().map(|&(_, n)| n)
    }

    pub(crate) fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertices.slice(..));
        match &self.indices {
            Some((buffer, n)) => {
                pass.set_index_buffer(buffer.slice(..), wgpu::IndexFormat::Uint16);
                pass.draw_indexed(0..*n, 0, 0..1);
            }
            None => pass.draw(0..self.vertex_count, 0..1),
        }
    }
}

fn vertex_buffer<V: bytemuck::Pod>(
    device: &wgpu::Device,
    label: &str,
    vertices: &[V],
) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{label} Vertices")),
        contents: bytemuck::cast_slice(vertices),
        usage: wgpu::BufferUsages::VERTEX,
    })
}

fn count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}
