//! GPU resource management.
//!
//! Provides wgpu device/surface initialization, the per-frame context
//! handle, realized shader programs, textures and static meshes.

/// Tracking of the bound program.
pub mod bindings;
/// Per-frame recording handle.
pub mod frame;
/// Static vertex/index buffers.
pub mod mesh;
/// Shared wgpu layout and sampler helpers.
pub mod pipeline_helpers;
/// Pipeline state and realized programs.
pub mod program;
/// wgpu device, surface, and queue initialization.
pub mod render_context;
/// Sampled textures and render targets.
pub mod texture;
/// Dynamic-offset uniform buffers.
pub mod uniform_arena;

pub use bindings::BindingState;
pub use frame::Frame;
pub use mesh::Mesh;
pub use program::PipelineDesc;
pub use render_context::{RenderContext, RenderContextError};
pub use texture::{RenderTarget, Texture, TextureError};
