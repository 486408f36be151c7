//! GPU side of a linked shader program: pipeline, bind group layouts and
//! per-draw resource binding.

use std::borrow::Cow;

use super::pipeline_helpers;
use super::render_context::RenderContext;
use super::texture::Texture;
use super::uniform_arena::UniformArena;
use crate::shader::{LinkedProgram, ResourceKind, ResourceSlot};
use crate::shader::uniforms::{Ignored, UniformStorage};

/// Fixed-function state a program is realized with.
#[derive(Debug, Clone)]
pub struct PipelineDesc<'a> {
    /// Vertex buffer layouts, slot 0 first.
    pub vertex_buffers: &'a [wgpu::VertexBufferLayout<'a>],
    /// Color target format; `None` uses the context's surface format.
    pub color_format: Option<wgpu::TextureFormat>,
    /// Color blending.
    pub blend: Option<wgpu::BlendState>,
    /// Topology, culling and winding.
    pub primitive: wgpu::PrimitiveState,
}

impl<'a> PipelineDesc<'a> {
    /// Opaque triangle list reading `vertex_buffers`.
    #[must_use]
    pub fn new(vertex_buffers: &'a [wgpu::VertexBufferLayout<'a>]) -> Self {
        Self {
            vertex_buffers,
            color_format: None,
            blend: Some(wgpu::BlendState::REPLACE),
            primitive: wgpu::PrimitiveState::default(),
        }
    }

    /// Render into `format` instead of the surface format.
    #[must_use]
    pub const fn with_color_format(mut self, format: wgpu::TextureFormat) -> Self {
        self.color_format = Some(format);
        self
    }

    /// Use `blend` for the color target.
    #[must_use]
    pub const fn with_blend(mut self, blend: Option<wgpu::BlendState>) -> Self {
        self.blend = blend;
        self
    }

    /// Use `primitive` state.
    #[must_use]
    pub const fn with_primitive(mut self, primitive: wgpu::PrimitiveState) -> Self {
        self.primitive = primitive;
        self
    }
}

#[derive(Debug)]
enum Entry {
    Uniform {
        binding: u32,
        arena: UniformArena,
    },
    Texture {
        binding: u32,
        name: String,
        view: Option<wgpu::TextureView>,
    },
    Sampler {
        binding: u32,
        name: String,
        sampler: wgpu::Sampler,
    },
}

#[derive(Debug)]
struct Group {
    index: u32,
    layout: wgpu::BindGroupLayout,
    entries: Vec<Entry>,
    /// Rebuilt when a resource changes or an arena reallocates.
    bind_group: Option<wgpu::BindGroup>,
}

/// Realized pipeline plus one bind group per group index.
#[derive(Debug)]
pub(crate) struct GpuProgram {
    label: String,
    pipeline: wgpu::RenderPipeline,
    groups: Vec<Group>,
    fallback: Texture,
}

impl GpuProgram {
    pub(crate) fn new(
        ctx: &RenderContext,
        linked: &LinkedProgram,
        label: &str,
        desc: &PipelineDesc<'_>,
    ) -> Self {
        let device = &ctx.device;
        let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{label} (vertex)")),
            source: wgpu::ShaderSource::Naga(Cow::Owned(linked.vertex.clone())),
        });
        let fragment = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{label} (fragment)")),
            source: wgpu::ShaderSource::Naga(Cow::Owned(
                linked.fragment.clone(),
            )),
        });

        let resources = linked.layout().resources();
        let groups: Vec<Group> = (0..linked.layout().group_count())
            .map(|index| {
                let slots: Vec<&ResourceSlot> =
                    resources.iter().filter(|r| r.group == index).collect();
                create_group(device, label, index, &slots)
            })
            .collect();

        let layouts: Vec<&wgpu::BindGroupLayout> =
            groups.iter().map(|g| &g.layout).collect();
        let pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&format!("{label} Pipeline Layout")),
                bind_group_layouts: &layouts,
                push_constant_ranges: &[],
            });
        let pipeline =
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&format!("{label} Pipeline")),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vertex,
                    entry_point: Some(linked.vertex_entry()),
                    buffers: desc.vertex_buffers,
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fragment,
                    entry_point: Some(linked.fragment_entry()),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: desc.color_format.unwrap_or(ctx.format()),
                        blend: desc.blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: desc.primitive,
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        log::debug!("realized `{label}` with {} bind groups", groups.len());
        Self {
            label: label.to_owned(),
            pipeline,
            groups,
            fallback: Texture::solid(
                device,
                &ctx.queue,
                "Fallback Texture",
                [255; 4],
            ),
        }
    }

    /// Attach `view` to the texture variable `name`. Returns `false` if no
    /// such texture exists.
    pub(crate) fn set_texture(
        &mut self,
        name: &str,
        view: wgpu::TextureView,
    ) -> bool {
        for group in &mut self.groups {
            for entry in &mut group.entries {
                if let Entry::Texture { name: n, view: v, .. } = entry {
                    if n == name {
                        *v = Some(view);
                        group.bind_group = None;
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Attach `sampler` to the sampler variable `name`. Returns `false` if
    /// no such sampler exists.
    pub(crate) fn set_sampler(
        &mut self,
        name: &str,
        sampler: wgpu::Sampler,
    ) -> bool {
        for group in &mut self.groups {
            for entry in &mut group.entries {
                if let Entry::Sampler { name: n, sampler: s, .. } = entry {
                    if n == name {
                        *s = sampler;
                        group.bind_group = None;
                        return true;
                    }
                }
            }
        }
        false
    }

    pub(crate) fn set_pipeline(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_pipeline(&self.pipeline);
    }

    /// Snapshot staged uniforms into the arenas and set every bind group.
    pub(crate) fn bind_groups(
        &mut self,
        ctx: &RenderContext,
        frame_index: u64,
        uniforms: &mut UniformStorage,
        pass: &mut wgpu::RenderPass<'_>,
    ) {
        let Self {
            label,
            groups,
            fallback,
            ..
        } = self;
        for group in groups.iter_mut() {
            let mut offsets = Vec::new();
            let mut rebuild = group.bind_group.is_none();
            for entry in &mut group.entries {
                if let Entry::Uniform { binding, arena } = entry {
                    let changed = uniforms.is_dirty(group.index, *binding);
                    let bytes = uniforms.block(group.index, *binding).unwrap_or(&[]);
                    let (offset, reallocated) = arena.push(
                        &ctx.device,
                        &ctx.queue,
                        frame_index,
                        bytes,
                        changed,
                    );
                    uniforms.mark_clean(group.index, *binding);
                    rebuild |= reallocated;
                    offsets.push(offset);
                }
            }

            if rebuild {
                for entry in &group.entries {
                    if let Entry::Texture {
                        name, view: None, ..
                    } = entry
                    {
                        uniforms.warnings().warn(Ignored::UnsetTexture, name, || {
                            format!(
                                "texture `{name}` of `{label}` was never set; \
                                 using the white fallback"
                            )
                        });
                    }
                }
                group.bind_group =
                    Some(create_bind_group(&ctx.device, label, group, fallback));
            }
            if let Some(bind_group) = &group.bind_group {
                pass.set_bind_group(group.index, bind_group, &offsets);
            }
        }
    }
}

fn create_group(
    device: &wgpu::Device,
    label: &str,
    index: u32,
    slots: &[&ResourceSlot],
) -> Group {
    let layout_entries: Vec<wgpu::BindGroupLayoutEntry> = slots
        .iter()
        .map(|slot| pipeline_helpers::layout_entry(slot))
        .collect();
    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(&format!("{label} Group {index} Layout")),
        entries: &layout_entries,
    });
    let entries = slots
        .iter()
        .map(|slot| match &slot.kind {
            ResourceKind::UniformBuffer { size } => Entry::Uniform {
                binding: slot.binding,
                arena: UniformArena::new(
                    device,
                    &format!("{label} `{}` Uniforms", slot.name),
                    u64::from(*size),
                ),
            },
            ResourceKind::Texture { .. } => Entry::Texture {
                binding: slot.binding,
                name: slot.name.clone(),
                view: None,
            },
            ResourceKind::Sampler(ty) => Entry::Sampler {
                binding: slot.binding,
                name: slot.name.clone(),
                sampler: default_sampler(device, *ty),
            },
        })
        .collect();
    Group {
        index,
        layout,
        entries,
        bind_group: None,
    }
}

fn default_sampler(
    device: &wgpu::Device,
    ty: wgpu::SamplerBindingType,
) -> wgpu::Sampler {
    match ty {
        wgpu::SamplerBindingType::Filtering => {
            pipeline_helpers::linear_sampler(device, "Default Sampler")
        }
        wgpu::SamplerBindingType::NonFiltering => {
            pipeline_helpers::nearest_sampler(device, "Default Sampler")
        }
        wgpu::SamplerBindingType::Comparison => {
            pipeline_helpers::comparison_sampler(device, "Default Sampler")
        }
    }
}

fn create_bind_group(
    device: &wgpu::Device,
    label: &str,
    group: &Group,
    fallback: &Texture,
) -> wgpu::BindGroup {
    let entries: Vec<wgpu::BindGroupEntry<'_>> = group
        .entries
        .iter()
        .map(|entry| match entry {
            Entry::Uniform { binding, arena } => wgpu::BindGroupEntry {
                binding: *binding,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: arena.buffer(),
                    offset: 0,
                    size: arena.binding_size(),
                }),
            },
            Entry::Texture { binding, view, .. } => wgpu::BindGroupEntry {
                binding: *binding,
                resource: wgpu::BindingResource::TextureView(
                    view.as_ref().unwrap_or(&fallback.view),
                ),
            },
            Entry::Sampler {
                binding, sampler, ..
            } => wgpu::BindGroupEntry {
                binding: *binding,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        })
        .collect();
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&format!("{label} Group {}", group.index)),
        layout: &group.layout,
        entries: &entries,
    })
}
