//! Which program is current on a context.

use crate::shader::ProgramId;

/// Tracks the single program bound on a context. Binding is not reentrant:
/// binding a program while another is bound replaces it.
#[derive(Debug, Default, Clone)]
pub struct BindingState {
    current: Option<ProgramId>,
}

impl BindingState {
    /// Make `program` current, returning whatever was bound before.
    pub fn bind(&mut self, program: ProgramId) -> Option<ProgramId> {
        let previous = self.current.replace(program);
        if let Some(prev) = previous.filter(|p| *p != program) {
            log::trace!("program {program} replaces {prev}");
        }
        previous
    }

    /// The bound program, if any.
    #[must_use]
    pub const fn current(&self) -> Option<ProgramId> {
        self.current
    }

    /// Whether `program` is the bound one.
    #[must_use]
    pub fn is_bound(&self, program: ProgramId) -> bool {
        self.current == Some(program)
    }

    /// Clear the binding.
    pub fn unbind(&mut self) -> Option<ProgramId> {
        self.current.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::{test_sources, ShaderCompiler, ShaderProgram, ShaderSource, ShaderStage};

    fn program_id() -> ProgramId {
        ShaderProgram::from_sources(
            &mut ShaderCompiler::new(),
            &ShaderSource::from_text(ShaderStage::Vertex, "v.wgsl", test_sources::VERTEX),
            &ShaderSource::from_text(ShaderStage::Fragment, "f.wgsl", test_sources::FRAGMENT),
        )
        .id()
    }

    #[test]
    fn starts_unbound() {
        let state = BindingState::default();
        assert_eq!(state.current(), None);
    }

    #[test]
    fn rebinding_replaces_current() {
        let (a, b) = (program_id(), program_id());
        let mut state = BindingState::default();
        assert_eq!(state.bind(a), None);
        assert_eq!(state.bind(b), Some(a));
        assert!(state.is_bound(b));
        assert!(!state.is_bound(a));
        assert_eq!(state.unbind(), Some(b));
        assert_eq!(state.current(), None);
    }
}
