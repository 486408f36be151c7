use std::fmt;

use naga::{Binding, EntryPoint, Handle, Type, TypeInner};

use super::reflect::{self, ProgramLayout};
use super::{CompiledStage, ShaderStage};

/// Why two stages could not be combined into a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// A stage failed to compile, so there is nothing to link.
    StageNotCompiled {
        /// The missing stage.
        stage: ShaderStage,
    },
    /// A stage source has no entry point of its own kind.
    MissingEntryPoint {
        /// Stage that lacks an entry point.
        stage: ShaderStage,
        /// Source path or label.
        label: String,
    },
    /// The fragment stage reads a location the vertex stage never writes.
    MissingVertexOutput {
        /// Offending `@location`.
        location: u32,
    },
    /// Both stages use a location with different types.
    VaryingTypeMismatch {
        /// Offending `@location`.
        location: u32,
        /// Type written by the vertex stage.
        vertex: String,
        /// Type read by the fragment stage.
        fragment: String,
    },
    /// Both stages declare the same `(group, binding)` with different
    /// types.
    ResourceConflict {
        /// Bind group index.
        group: u32,
        /// Binding index.
        binding: u32,
        /// Variable name in the first stage.
        first: String,
        /// Variable name in the second stage.
        second: String,
    },
    /// One uniform name resolves to two different slots.
    UniformNameClash {
        /// The clashing name.
        name: String,
    },
    /// Storage resources, and textures other than `texture_2d<f32>`, are
    /// not supported.
    UnsupportedResource {
        /// Variable name.
        name: String,
        /// Bind group index.
        group: u32,
        /// Binding index.
        binding: u32,
    },
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StageNotCompiled { stage } => {
                write!(f, "{stage} stage did not compile")
            }
            Self::MissingEntryPoint { stage, label } => {
                write!(f, "`{label}` has no {stage} entry point")
            }
            Self::MissingVertexOutput { location } => write!(
                f,
                "fragment input @location({location}) is not written by \
                 the vertex stage"
            ),
            Self::VaryingTypeMismatch {
                location,
                vertex,
                fragment,
            } => write!(
                f,
                "@location({location}) is {vertex} in the vertex stage but \
                 {fragment} in the fragment stage"
            ),
            Self::ResourceConflict {
                group,
                binding,
                first,
                second,
            } => write!(
                f,
                "@group({group}) @binding({binding}) is declared as `{first}` \
                 and `{second}` with different types"
            ),
            Self::UniformNameClash { name } => {
                write!(f, "uniform `{name}` names two different slots")
            }
            Self::UnsupportedResource {
                name,
                group,
                binding,
            } => write!(
                f,
                "`{name}` at @group({group}) @binding({binding}) is not a \
                 uniform buffer, texture_2d<f32> or sampler"
            ),
        }
    }
}

impl std::error::Error for LinkError {}

/// The linked program: both stages' IR plus the resolved resource layout.
#[derive(Debug)]
pub struct LinkedProgram {
    pub(crate) vertex: naga::Module,
    pub(crate) vertex_entry: String,
    pub(crate) fragment: naga::Module,
    pub(crate) fragment_entry: String,
    layout: ProgramLayout,
}

impl LinkedProgram {
    /// Resolved resources and uniform table.
    #[must_use]
    pub const fn layout(&self) -> &ProgramLayout {
        &self.layout
    }

    /// Name of the vertex entry point.
    #[must_use]
    pub fn vertex_entry(&self) -> &str {
        &self.vertex_entry
    }

    /// Name of the fragment entry point.
    #[must_use]
    pub fn fragment_entry(&self) -> &str {
        &self.fragment_entry
    }
}

/// Link two compiled stages. The stages are consumed whatever the outcome.
pub(crate) fn link(
    vertex: Option<CompiledStage>,
    fragment: Option<CompiledStage>,
) -> Result<LinkedProgram, LinkError> {
    let vertex = vertex.ok_or(LinkError::StageNotCompiled {
        stage: ShaderStage::Vertex,
    })?;
    let fragment = fragment.ok_or(LinkError::StageNotCompiled {
        stage: ShaderStage::Fragment,
    })?;

    let vs = entry_point(&vertex)?;
    let fs = entry_point(&fragment)?;
    check_interface(&vertex.module, vs, &fragment.module, fs)?;
    let vertex_entry = vs.name.clone();
    let fragment_entry = fs.name.clone();

    let layout = reflect::build_layout(
        reflect::reflect_stage(&vertex.module, ShaderStage::Vertex)?,
        reflect::reflect_stage(&fragment.module, ShaderStage::Fragment)?,
    )?;

    Ok(LinkedProgram {
        vertex: vertex.module,
        vertex_entry,
        fragment: fragment.module,
        fragment_entry,
        layout,
    })
}

fn entry_point(stage: &CompiledStage) -> Result<&EntryPoint, LinkError> {
    let wanted = stage.stage.naga_stage();
    stage
        .module
        .entry_points
        .iter()
        .find(|ep| ep.stage == wanted)
        .ok_or_else(|| LinkError::MissingEntryPoint {
            stage: stage.stage,
            label: stage.label.clone(),
        })
}

/// Every fragment input location must be written by the vertex stage with
/// the same type. Extra vertex outputs are fine.
fn check_interface(
    vertex: &naga::Module,
    vs: &EntryPoint,
    fragment: &naga::Module,
    fs: &EntryPoint,
) -> Result<(), LinkError> {
    let mut outputs = Vec::new();
    if let Some(result) = &vs.function.result {
        collect_locations(vertex, result.ty, result.binding.as_ref(), &mut outputs);
    }
    let mut inputs = Vec::new();
    for arg in &fs.function.arguments {
        collect_locations(fragment, arg.ty, arg.binding.as_ref(), &mut inputs);
    }

    for (location, fs_ty) in inputs {
        let vs_ty = outputs
            .iter()
            .find(|(l, _)| *l == location)
            .map(|&(_, ty)| ty)
            .ok_or(LinkError::MissingVertexOutput { location })?;
        let vertex_name = reflect::describe_type(vertex, vs_ty);
        let fragment_name = reflect::describe_type(fragment, fs_ty);
        if vertex_name != fragment_name {
            return Err(LinkError::VaryingTypeMismatch {
                location,
                vertex: vertex_name,
                fragment: fragment_name,
            });
        }
    }
    Ok(())
}

fn collect_locations(
    module: &naga::Module,
    ty: Handle<Type>,
    binding: Option<&Binding>,
    out: &mut Vec<(u32, Handle<Type>)>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => out.push((*location, ty)),
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(
                        module,
                        member.ty,
                        member.binding.as_ref(),
                        out,
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::{test_sources, ShaderCompiler, ShaderSource};

    fn compile(stage: ShaderStage, text: &str) -> CompiledStage {
        ShaderCompiler::new()
            .compile(&ShaderSource::from_text(stage, "test.wgsl", text))
            .unwrap()
    }

    #[test]
    fn compatible_stages_link() {
        let linked = link(
            Some(compile(ShaderStage::Vertex, test_sources::VERTEX)),
            Some(compile(ShaderStage::Fragment, test_sources::FRAGMENT)),
        )
        .unwrap();
        assert_eq!(linked.vertex_entry(), "vs_main");
        assert_eq!(linked.fragment_entry(), "fs_main");
        assert_eq!(linked.layout().group_count(), 2);
        assert!(linked.layout().uniforms().get("model").is_some());
        assert!(linked.layout().uniforms().get("material.green").is_some());
    }

    #[test]
    fn mismatched_varying_type_fails() {
        let err = link(
            Some(compile(ShaderStage::Vertex, test_sources::VERTEX)),
            Some(compile(
                ShaderStage::Fragment,
                test_sources::FRAGMENT_MISMATCHED,
            )),
        )
        .unwrap_err();
        assert_eq!(
            err,
            LinkError::VaryingTypeMismatch {
                location: 0,
                vertex: "vec3<f32>".to_owned(),
                fragment: "vec4<f32>".to_owned(),
            }
        );
    }

    #[test]
    fn unwritten_fragment_input_fails() {
        let err = link(
            Some(compile(ShaderStage::Vertex, test_sources::VERTEX)),
            Some(compile(
                ShaderStage::Fragment,
                test_sources::FRAGMENT_MISSING_INPUT,
            )),
        )
        .unwrap_err();
        assert_eq!(err, LinkError::MissingVertexOutput { location: 3 });
    }

    #[test]
    fn missing_stage_fails() {
        let err = link(
            None,
            Some(compile(ShaderStage::Fragment, test_sources::FRAGMENT)),
        )
        .unwrap_err();
        assert_eq!(
            err,
            LinkError::StageNotCompiled {
                stage: ShaderStage::Vertex
            }
        );
    }

    #[test]
    fn fragment_source_in_vertex_slot_has_no_entry_point() {
        let err = link(
            Some(compile(ShaderStage::Vertex, test_sources::FRAGMENT)),
            Some(compile(ShaderStage::Fragment, test_sources::FRAGMENT)),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LinkError::MissingEntryPoint {
                stage: ShaderStage::Vertex,
                ..
            }
        ));
    }

    #[test]
    fn conflicting_shared_binding_fails() {
        let vertex = r"
@group(0) @binding(0) var<uniform> scale: f32;
@vertex
fn vs_main() -> @builtin(position) vec4<f32> { return vec4<f32>(scale); }
";
        let fragment = r"
@group(0) @binding(0) var<uniform> tint: vec4<f32>;
@fragment
fn fs_main() -> @location(0) vec4<f32> { return tint; }
";
        let err = link(
            Some(compile(ShaderStage::Vertex, vertex)),
            Some(compile(ShaderStage::Fragment, fragment)),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LinkError::ResourceConflict {
                group: 0,
                binding: 0,
                ..
            }
        ));
    }
}
