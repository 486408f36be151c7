//! Resource and uniform reflection over linked naga IR.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use naga::{
    AddressSpace, Handle, ImageClass, ImageDimension, Scalar, ScalarKind,
    Type, TypeInner, VectorSize,
};
use rustc_hash::FxHashMap;

use super::{LinkError, ShaderStage};

/// Value shape of a settable uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    /// `i32`
    Int,
    /// `u32`
    Uint,
    /// `f32`
    Float,
    /// `vec2<f32>`
    Vec2,
    /// `vec3<f32>`
    Vec3,
    /// `vec4<f32>`
    Vec4,
    /// `mat4x4<f32>`, column-major.
    Mat4,
    /// Anything else (arrays, integer vectors, other matrices); not settable.
    Other,
}

impl UniformKind {
    fn of(inner: &TypeInner) -> Self {
        match *inner {
            TypeInner::Scalar(scalar) => match (scalar.kind, scalar.width) {
                (ScalarKind::Sint, 4) => Self::Int,
                (ScalarKind::Uint, 4) => Self::Uint,
                (ScalarKind::Float, 4) => Self::Float,
                _ => Self::Other,
            },
            TypeInner::Vector { size, scalar } if scalar == Scalar::F32 => {
                match size {
                    VectorSize::Bi => Self::Vec2,
                    VectorSize::Tri => Self::Vec3,
                    VectorSize::Quad => Self::Vec4,
                }
            }
            TypeInner::Matrix {
                columns: VectorSize::Quad,
                rows: VectorSize::Quad,
                scalar,
            } if scalar == Scalar::F32 => Self::Mat4,
            _ => Self::Other,
        }
    }
}

/// Where a named uniform lives: which buffer, and where inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformSlot {
    /// Value shape.
    pub kind: UniformKind,
    /// Bind group index of the owning buffer.
    pub group: u32,
    /// Binding index of the owning buffer.
    pub binding: u32,
    /// Byte offset inside the buffer.
    pub offset: u32,
    /// Byte size of the value.
    pub size: u32,
}

/// Name → slot table resolved once at link time.
///
/// Every uniform is reachable by its qualified path (`var` or
/// `var.member.sub`). Struct members are also reachable by their path
/// without the variable prefix when that path is unique in the program.
#[derive(Debug, Clone, Default)]
pub struct UniformTable {
    slots: FxHashMap<String, UniformSlot>,
}

impl UniformTable {
    /// Look up a uniform by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&UniformSlot> {
        self.slots.get(name)
    }

    /// Number of resolvable names (qualified and bare).
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the program declares no uniforms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// All resolvable names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> =
            self.slots.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Kind of a bindable resource.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceKind {
    /// `var<uniform>` buffer; `size` is padded to 16 bytes.
    UniformBuffer {
        /// Buffer size in bytes.
        size: u32,
    },
    /// Sampled or depth texture.
    Texture {
        /// Sample type as wgpu sees it.
        sample_type: wgpu::TextureSampleType,
        /// View dimension.
        view_dimension: wgpu::TextureViewDimension,
        /// Multisampled texture.
        multisampled: bool,
    },
    /// Sampler.
    Sampler(wgpu::SamplerBindingType),
}

/// A resource binding declared by the program.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSlot {
    /// Variable name (first stage that declared it).
    pub name: String,
    /// Bind group index.
    pub group: u32,
    /// Binding index inside the group.
    pub binding: u32,
    /// What is bound there.
    pub kind: ResourceKind,
    /// Stages that declare this binding.
    pub visibility: wgpu::ShaderStages,
}

/// Everything the GPU side needs to lay out a linked program.
#[derive(Debug, Clone, Default)]
pub struct ProgramLayout {
    resources: Vec<ResourceSlot>,
    uniforms: UniformTable,
}

impl ProgramLayout {
    /// Resources sorted by `(group, binding)`.
    #[must_use]
    pub fn resources(&self) -> &[ResourceSlot] {
        &self.resources
    }

    /// Uniform name table.
    #[must_use]
    pub const fn uniforms(&self) -> &UniformTable {
        &self.uniforms
    }

    /// Find a texture or sampler resource by variable name.
    #[must_use]
    pub fn resource(&self, name: &str) -> Option<&ResourceSlot> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Number of bind groups the pipeline layout needs (highest used group
    /// plus one).
    #[must_use]
    pub fn group_count(&self) -> u32 {
        self.resources.iter().map(|r| r.group + 1).max().unwrap_or(0)
    }
}

/// One leaf value inside a uniform buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UniformField {
    /// Path inside the variable; `None` when the variable itself is the
    /// value.
    member: Option<String>,
    kind: UniformKind,
    offset: u32,
    size: u32,
}

/// A resource as declared by a single stage.
#[derive(Debug)]
pub(crate) struct StageResource {
    slot: ResourceSlot,
    aliases: Vec<String>,
    fields: Vec<UniformField>,
}

/// Collect the resources one stage declares.
pub(crate) fn reflect_stage(
    module: &naga::Module,
    stage: ShaderStage,
) -> Result<Vec<StageResource>, LinkError> {
    let mut out = Vec::new();
    for (_, var) in module.global_variables.iter() {
        let Some(binding) = var.binding.as_ref() else {
            continue;
        };
        let (group, binding) = (binding.group, binding.binding);
        let name = var
            .name
            .clone()
            .unwrap_or_else(|| format!("group{group}_binding{binding}"));
        let unsupported = || LinkError::UnsupportedResource {
            name: name.clone(),
            group,
            binding,
        };

        let inner = &module.types[var.ty].inner;
        let (kind, fields) = match var.space {
            AddressSpace::Uniform => {
                let mut fields = Vec::new();
                flatten(module, var.ty, None, 0, &mut fields);
                let size = inner.size(module.to_ctx()).next_multiple_of(16);
                (ResourceKind::UniformBuffer { size }, fields)
            }
            AddressSpace::Handle => {
                let kind = handle_kind(inner).ok_or_else(unsupported)?;
                (kind, Vec::new())
            }
            AddressSpace::Storage { .. } => {
                return Err(unsupported());
            }
            _ => continue,
        };

        out.push(StageResource {
            slot: ResourceSlot {
                name,
                group,
                binding,
                kind,
                visibility: stage.visibility(),
            },
            aliases: Vec::new(),
            fields,
        });
    }
    Ok(out)
}

fn handle_kind(inner: &TypeInner) -> Option<ResourceKind> {
    match *inner {
        TypeInner::Sampler { comparison } => {
            Some(ResourceKind::Sampler(if comparison {
                wgpu::SamplerBindingType::Comparison
            } else {
                wgpu::SamplerBindingType::Filtering
            }))
        }
        // Slots are filled from `Texture`, which is always a filterable
        // float 2D view, so every other image class can never be bound.
        TypeInner::Image {
            dim: ImageDimension::D2,
            arrayed: false,
            class:
                ImageClass::Sampled {
                    kind: ScalarKind::Float,
                    multi: false,
                },
        } => Some(ResourceKind::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        }),
        _ => None,
    }
}

fn flatten(
    module: &naga::Module,
    ty: Handle<Type>,
    member: Option<String>,
    offset: u32,
    out: &mut Vec<UniformField>,
) {
    let inner = &module.types[ty].inner;
    if let TypeInner::Struct { members, .. } = inner {
        for m in members {
            let name = m.name.clone().unwrap_or_default();
            let path = match &member {
                Some(parent) => format!("{parent}.{name}"),
                None => name,
            };
            flatten(module, m.ty, Some(path), offset + m.offset, out);
        }
    } else {
        out.push(UniformField {
            member,
            kind: UniformKind::of(inner),
            offset,
            size: inner.size(module.to_ctx()),
        });
    }
}

/// Merge the resources of both stages and resolve uniform names.
pub(crate) fn build_layout(
    vertex: Vec<StageResource>,
    fragment: Vec<StageResource>,
) -> Result<ProgramLayout, LinkError> {
    let mut merged: BTreeMap<(u32, u32), StageResource> = BTreeMap::new();
    for res in vertex.into_iter().chain(fragment) {
        match merged.entry((res.slot.group, res.slot.binding)) {
            Entry::Vacant(e) => {
                let _ = e.insert(res);
            }
            Entry::Occupied(mut e) => {
                let existing = e.get_mut();
                if existing.slot.kind != res.slot.kind
                    || existing.fields != res.fields
                {
                    return Err(LinkError::ResourceConflict {
                        group: res.slot.group,
                        binding: res.slot.binding,
                        first: existing.slot.name.clone(),
                        second: res.slot.name,
                    });
                }
                existing.slot.visibility |= res.slot.visibility;
                if existing.slot.name != res.slot.name {
                    existing.aliases.push(res.slot.name);
                }
            }
        }
    }

    let mut slots: FxHashMap<String, UniformSlot> = FxHashMap::default();
    // `None` marks a bare member path shared by several variables.
    let mut bare: FxHashMap<String, Option<UniformSlot>> =
        FxHashMap::default();

    for res in merged.values() {
        if !matches!(res.slot.kind, ResourceKind::UniformBuffer { .. }) {
            continue;
        }
        let names = std::iter::once(&res.slot.name).chain(&res.aliases);
        for var_name in names {
            for field in &res.fields {
                let slot = UniformSlot {
                    kind: field.kind,
                    group: res.slot.group,
                    binding: res.slot.binding,
                    offset: field.offset,
                    size: field.size,
                };
                let qualified = match &field.member {
                    Some(m) => format!("{var_name}.{m}"),
                    None => var_name.clone(),
                };
                if let Some(previous) = slots.insert(qualified.clone(), slot) {
                    if previous != slot {
                        return Err(LinkError::UniformNameClash {
                            name: qualified,
                        });
                    }
                }
                if let Some(m) = &field.member {
                    let entry = bare.entry(m.clone()).or_insert(Some(slot));
                    if *entry != Some(slot) {
                        *entry = None;
                    }
                }
            }
        }
    }

    for (name, slot) in bare {
        match slot {
            Some(slot) if !slots.contains_key(&name) => {
                let _ = slots.insert(name, slot);
            }
            Some(_) => {}
            None => log::debug!(
                "uniform member `{name}` is declared by several variables; \
                 only its qualified names resolve"
            ),
        }
    }

    Ok(ProgramLayout {
        resources: merged.into_values().map(|r| r.slot).collect(),
        uniforms: UniformTable { slots },
    })
}

/// Human-readable WGSL-ish name of a type, for diagnostics.
pub(crate) fn describe_type(module: &naga::Module, ty: Handle<Type>) -> String {
    fn scalar_name(scalar: Scalar) -> String {
        let prefix = match scalar.kind {
            ScalarKind::Sint => "i",
            ScalarKind::Uint => "u",
            ScalarKind::Float => "f",
            ScalarKind::Bool => return "bool".to_owned(),
            _ => "abstract",
        };
        format!("{prefix}{}", u32::from(scalar.width) * 8)
    }

    match module.types[ty].inner {
        TypeInner::Scalar(scalar) => scalar_name(scalar),
        TypeInner::Vector { size, scalar } => {
            format!("vec{}<{}>", size as u8, scalar_name(scalar))
        }
        TypeInner::Matrix {
            columns,
            rows,
            scalar,
        } => format!(
            "mat{}x{}<{}>",
            columns as u8,
            rows as u8,
            scalar_name(scalar)
        ),
        ref other => format!("{other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> naga::Module {
        naga::front::wgsl::parse_str(source).unwrap()
    }

    fn layout_of(vertex: &str, fragment: &str) -> Result<ProgramLayout, LinkError> {
        let v = reflect_stage(&parse(vertex), ShaderStage::Vertex)?;
        let f = reflect_stage(&parse(fragment), ShaderStage::Fragment)?;
        build_layout(v, f)
    }

    const TRIVIAL_FS: &str = r"
@fragment
fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }
";

    #[test]
    fn struct_members_resolve_bare_and_qualified() {
        let layout = layout_of(
            r"
struct Camera { view: mat4x4<f32>, projection: mat4x4<f32>, exposure: f32 };
@group(0) @binding(0) var<uniform> camera: Camera;
@vertex
fn vs_main() -> @builtin(position) vec4<f32> {
    return camera.projection * camera.view * vec4<f32>(camera.exposure);
}
",
            TRIVIAL_FS,
        )
        .unwrap();

        let table = layout.uniforms();
        let bare = table.get("projection").unwrap();
        assert_eq!(table.get("camera.projection"), Some(bare));
        assert_eq!(bare.kind, UniformKind::Mat4);
        assert_eq!(bare.offset, 64);
        assert_eq!(bare.size, 64);

        let exposure = table.get("exposure").unwrap();
        assert_eq!(exposure.kind, UniformKind::Float);
        assert_eq!(exposure.offset, 128);

        assert_eq!(
            layout.resources()[0].kind,
            ResourceKind::UniformBuffer { size: 144 }
        );
    }

    #[test]
    fn plain_uniform_resolves_by_variable_name() {
        let layout = layout_of(
            r"
@group(0) @binding(0) var<uniform> transform: mat4x4<f32>;
@vertex
fn vs_main() -> @builtin(position) vec4<f32> {
    return transform * vec4<f32>(0.0, 0.0, 0.0, 1.0);
}
",
            TRIVIAL_FS,
        )
        .unwrap();
        let slot = layout.uniforms().get("transform").unwrap();
        assert_eq!(slot.kind, UniformKind::Mat4);
        assert_eq!(slot.offset, 0);
        assert_eq!(layout.uniforms().len(), 1);
    }

    #[test]
    fn shared_member_names_need_qualification() {
        let layout = layout_of(
            r"
struct A { scale: f32 };
@group(0) @binding(0) var<uniform> a: A;
@vertex
fn vs_main() -> @builtin(position) vec4<f32> { return vec4<f32>(a.scale); }
",
            r"
struct B { scale: f32 };
@group(0) @binding(1) var<uniform> b: B;
@fragment
fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(b.scale); }
",
        )
        .unwrap();
        let table = layout.uniforms();
        assert!(table.get("scale").is_none());
        assert_eq!(table.get("a.scale").unwrap().binding, 0);
        assert_eq!(table.get("b.scale").unwrap().binding, 1);
        assert_eq!(
            layout.resources()[0].visibility,
            wgpu::ShaderStages::VERTEX
        );
    }

    #[test]
    fn binding_shared_by_both_stages_merges_visibility() {
        let shared = r"
struct Globals { time: f32 };
@group(0) @binding(0) var<uniform> globals: Globals;
";
        let layout = layout_of(
            &format!(
                "{shared}
@vertex
fn vs_main() -> @builtin(position) vec4<f32> {{ return vec4<f32>(globals.time); }}"
            ),
            &format!(
                "{shared}
@fragment
fn fs_main() -> @location(0) vec4<f32> {{ return vec4<f32>(globals.time); }}"
            ),
        )
        .unwrap();
        assert_eq!(layout.resources().len(), 1);
        assert_eq!(
            layout.resources()[0].visibility,
            wgpu::ShaderStages::VERTEX_FRAGMENT
        );
        assert!(layout.uniforms().get("time").is_some());
    }

    #[test]
    fn textures_and_samplers_are_reflected() {
        let layout = layout_of(
            r"
@vertex
fn vs_main() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }
",
            r"
@group(0) @binding(0) var diffuse: texture_2d<f32>;
@group(0) @binding(1) var diffuse_sampler: sampler;
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return textureSample(diffuse, diffuse_sampler, vec2<f32>(0.5));
}
",
        )
        .unwrap();
        assert_eq!(layout.group_count(), 1);
        assert!(matches!(
            layout.resource("diffuse").unwrap().kind,
            ResourceKind::Texture {
                view_dimension: wgpu::TextureViewDimension::D2,
                ..
            }
        ));
        assert_eq!(
            layout.resource("diffuse_sampler").unwrap().kind,
            ResourceKind::Sampler(wgpu::SamplerBindingType::Filtering)
        );
        assert!(layout.uniforms().is_empty());
    }

    #[test]
    fn unbindable_texture_kinds_are_rejected() {
        let declarations = [
            "texture_2d<u32>",
            "texture_2d<i32>",
            "texture_depth_2d",
            "texture_multisampled_2d<f32>",
            "texture_1d<f32>",
            "texture_3d<f32>",
            "texture_cube<f32>",
            "texture_2d_array<f32>",
        ];
        for declaration in declarations {
            let fragment = format!(
                "@group(1) @binding(0) var lut: {declaration};
@fragment
fn fs_main() -> @location(0) vec4<f32> {{ return vec4<f32>(1.0); }}"
            );
            let err = layout_of(
                r"
@vertex
fn vs_main() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }
",
                &fragment,
            )
            .unwrap_err();
            assert!(
                matches!(
                    err,
                    LinkError::UnsupportedResource { ref name, group: 1, binding: 0 }
                        if name == "lut"
                ),
                "{declaration} linked: {err:?}"
            );
        }
    }

    #[test]
    fn storage_buffers_are_rejected() {
        let err = layout_of(
            r"
@group(0) @binding(0) var<storage, read> data: array<f32>;
@vertex
fn vs_main(@builtin(vertex_index) i: u32) -> @builtin(position) vec4<f32> {
    return vec4<f32>(data[i]);
}
",
            TRIVIAL_FS,
        )
        .unwrap_err();
        assert!(matches!(err, LinkError::UnsupportedResource { .. }));
    }
}
