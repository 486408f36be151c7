//! CPU-side staging for uniform buffer contents.

use rustc_hash::{FxHashMap, FxHashSet};

use super::reflect::{ProgramLayout, ResourceKind, UniformKind, UniformTable};

/// Why a name was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Ignored {
    UnknownUniform,
    KindMismatch,
    NotLinked,
    UnknownTexture,
    UnknownSampler,
    UnsetTexture,
}

/// Logs each distinct `(reason, name)` once.
#[derive(Debug, Default)]
pub(crate) struct WarnOnce {
    seen: FxHashSet<(Ignored, String)>,
}

impl WarnOnce {
    pub(crate) fn warn(
        &mut self,
        reason: Ignored,
        name: &str,
        message: impl FnOnce() -> String,
    ) {
        if self.seen.insert((reason, name.to_owned())) {
            log::warn!("{}", message());
        }
    }

    #[cfg(test)]
    pub(crate) fn count(&self) -> usize {
        self.seen.len()
    }
}

/// Staged bytes of one uniform buffer.
#[derive(Debug)]
struct Block {
    bytes: Vec<u8>,
    dirty: bool,
}

/// Staged contents of every uniform buffer of a program, keyed by
/// `(group, binding)`.
#[derive(Debug, Default)]
pub(crate) struct UniformStorage {
    table: UniformTable,
    blocks: FxHashMap<(u32, u32), Block>,
    warnings: WarnOnce,
}

impl UniformStorage {
    pub(crate) fn new(layout: &ProgramLayout) -> Self {
        let blocks = layout
            .resources()
            .iter()
            .filter_map(|r| match r.kind {
                ResourceKind::UniformBuffer { size } => Some((
                    (r.group, r.binding),
                    Block {
                        bytes: vec![0; size as usize],
                        dirty: true,
                    },
                )),
                _ => None,
            })
            .collect();
        Self {
            table: layout.uniforms().clone(),
            blocks,
            warnings: WarnOnce::default(),
        }
    }

    /// Write `bytes` into the slot named `name` if its kind is one of
    /// `accepts`. Unknown names and kind mismatches are no-ops that warn
    /// once per name.
    pub(crate) fn write(
        &mut self,
        name: &str,
        accepts: &[UniformKind],
        bytes: &[u8],
    ) {
        let Some(slot) = self.table.get(name).copied() else {
            self.warnings.warn(Ignored::UnknownUniform, name, || {
                format!("uniform `{name}` does not exist in this program")
            });
            return;
        };
        if !accepts.contains(&slot.kind) {
            self.warnings.warn(Ignored::KindMismatch, name, || {
                format!(
                    "uniform `{name}` is {:?}, which cannot be set from {:?}",
                    slot.kind, accepts
                )
            });
            return;
        }
        let Some(block) = self.blocks.get_mut(&(slot.group, slot.binding))
        else {
            return;
        };
        let start = slot.offset as usize;
        let len = bytes.len().min(slot.size as usize);
        if let Some(dst) = block.bytes.get_mut(start..start + len) {
            dst.copy_from_slice(&bytes[..len]);
            block.dirty = true;
        }
    }

    /// Bytes of a single named value as they are currently staged.
    pub(crate) fn value_bytes(&self, name: &str) -> Option<&[u8]> {
        let slot = self.table.get(name)?;
        let block = self.blocks.get(&(slot.group, slot.binding))?;
        let start = slot.offset as usize;
        block.bytes.get(start..start + slot.size as usize)
    }

    /// Whole staged buffer for `(group, binding)`.
    pub(crate) fn block(&self, group: u32, binding: u32) -> Option<&[u8]> {
        self.blocks.get(&(group, binding)).map(|b| b.bytes.as_slice())
    }

    /// Whether the buffer changed since the last [`mark_clean`](Self::mark_clean).
    pub(crate) fn is_dirty(&self, group: u32, binding: u32) -> bool {
        self.blocks.get(&(group, binding)).is_some_and(|b| b.dirty)
    }

    pub(crate) fn mark_clean(&mut self, group: u32, binding: u32) {
        if let Some(block) = self.blocks.get_mut(&(group, binding)) {
            block.dirty = false;
        }
    }

    pub(crate) fn warnings(&mut self) -> &mut WarnOnce {
        &mut self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::link::link;
    use crate::shader::{test_sources, ShaderCompiler, ShaderSource, ShaderStage};

    fn storage() -> UniformStorage {
        let mut compiler = ShaderCompiler::new();
        let vertex = compiler
            .compile(&ShaderSource::from_text(
                ShaderStage::Vertex,
                "v.wgsl",
                test_sources::VERTEX,
            ))
            .ok();
        let fragment = compiler
            .compile(&ShaderSource::from_text(
                ShaderStage::Fragment,
                "f.wgsl",
                test_sources::FRAGMENT,
            ))
            .ok();
        UniformStorage::new(link(vertex, fragment).unwrap().layout())
    }

    #[test]
    fn blocks_start_zeroed_and_dirty() {
        let storage = storage();
        let block = storage.block(0, 0).unwrap();
        assert_eq!(block.len(), 80);
        assert!(block.iter().all(|&b| b == 0));
        assert!(storage.is_dirty(0, 0));
        assert!(storage.is_dirty(1, 0));
    }

    #[test]
    fn write_lands_at_slot_offset() {
        let mut storage = storage();
        storage.mark_clean(1, 0);
        storage.write("mode", &[UniformKind::Int], &7_i32.to_le_bytes());
        assert!(storage.is_dirty(1, 0));
        assert_eq!(&storage.block(1, 0).unwrap()[4..8], &7_i32.to_le_bytes());
        assert_eq!(storage.value_bytes("material.mode").unwrap(), &7_i32.to_le_bytes());
    }

    #[test]
    fn unknown_name_is_noop_and_warns_once() {
        let mut storage = storage();
        storage.mark_clean(0, 0);
        storage.mark_clean(1, 0);
        for _ in 0..3 {
            storage.write("nonexistent_uniform", &[UniformKind::Int], &0_i32.to_le_bytes());
        }
        assert!(!storage.is_dirty(0, 0));
        assert!(!storage.is_dirty(1, 0));
        assert_eq!(storage.warnings.count(), 1);
    }

    #[test]
    fn kind_mismatch_is_noop() {
        let mut storage = storage();
        storage.write("green", &[UniformKind::Int], &5_i32.to_le_bytes());
        assert_eq!(storage.value_bytes("green").unwrap(), &[0_u8; 4]);
        assert_eq!(storage.warnings.count(), 1);
    }

    #[test]
    fn distinct_reasons_for_one_name_each_warn() {
        let mut storage = storage();
        storage.write("green", &[UniformKind::Int], &5_i32.to_le_bytes());
        storage.write("green", &[UniformKind::Int], &6_i32.to_le_bytes());
        assert_eq!(storage.warnings.count(), 1);

        storage.warnings().warn(Ignored::UnknownTexture, "green", String::new);
        assert_eq!(storage.warnings.count(), 2);
        storage.warnings().warn(Ignored::UnknownTexture, "green", String::new);
        assert_eq!(storage.warnings.count(), 2);
    }
}
