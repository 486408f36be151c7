//! Per-frame uniform buffer arena with dynamic offsets.
//!
//! Every draw appends a snapshot of a uniform block at the next aligned
//! offset, so several draws recorded into one submission each see the
//! values that were current when they were issued. The cursor rewinds at
//! the start of each frame. Capacity grows 2x and never shrinks.

/// Growable uniform buffer handing out aligned slices per draw.
#[derive(Debug)]
pub struct UniformArena {
    buffer: wgpu::Buffer,
    label: String,
    /// Size of one block in bytes.
    block_size: u64,
    /// Distance between consecutive blocks.
    stride: u64,
    capacity: u64,
    cursor: u64,
    frame: u64,
    last_offset: Option<u32>,
}

impl UniformArena {
    /// Blocks preallocated per arena.
    const INITIAL_BLOCKS: u64 = 16;

    /// Arena for blocks of `block_size` bytes.
    pub fn new(device: &wgpu::Device, label: &str, block_size: u64) -> Self {
        let alignment =
            u64::from(device.limits().min_uniform_buffer_offset_alignment);
        let block_size = block_size.max(16);
        let stride = align_to(block_size, alignment);
        let capacity = stride * Self::INITIAL_BLOCKS;
        Self {
            buffer: create(device, label, capacity),
            label: label.to_owned(),
            block_size,
            stride,
            capacity,
            cursor: 0,
            frame: 0,
            last_offset: None,
        }
    }

    /// Copy `bytes` into the next free slot for `frame` and return its
    /// dynamic offset. When the block is unchanged within the same frame the
    /// previous slot is reused.
    ///
    /// The `bool` is `true` if the buffer was reallocated (bind groups need
    /// recreation).
    pub fn push(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        frame: u64,
        bytes: &[u8],
        changed: bool,
    ) -> (u32, bool) {
        if frame != self.frame {
            self.frame = frame;
            self.cursor = 0;
            self.last_offset = None;
        }
        if let (false, Some(offset)) = (changed, self.last_offset) {
            return (offset, false);
        }

        let reallocated = if self.cursor + self.stride > self.capacity {
            // Slots already handed out this frame stay valid in the old
            // buffer until it is dropped, which wgpu defers until the
            // submission completes.
            let new_capacity = (self.capacity * 2).max(self.cursor + self.stride);
            log::debug!(
                "growing uniform arena `{}` to {new_capacity} bytes",
                self.label
            );
            self.buffer = create(device, &self.label, new_capacity);
            self.capacity = new_capacity;
            self.cursor = 0;
            true
        } else {
            false
        };

        let offset = self.cursor;
        let len = (bytes.len() as u64).min(self.block_size) as usize;
        queue.write_buffer(&self.buffer, offset, &bytes[..len]);
        self.cursor += self.stride;
        let offset = u32::try_from(offset).unwrap_or(u32::MAX);
        self.last_offset = Some(offset);
        (offset, reallocated)
    }

    /// The underlying buffer.
    pub const fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Binding size seen by the shader.
    pub fn binding_size(&self) -> Option<wgpu::BufferSize> {
        wgpu::BufferSize::new(self.block_size)
    }

    /// Bytes between two consecutive snapshots.
    pub const fn stride(&self) -> u64 {
        self.stride
    }

    /// Allocated bytes.
    pub const fn capacity(&self) -> u64 {
        self.capacity
    }
}

fn create(device: &wgpu::Device, label: &str, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Round `value` up to a multiple of `alignment` (a power of two).
pub(crate) const fn align_to(value: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        return value;
    }
    value.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_rounds_up_to_multiple() {
        assert_eq!(align_to(0, 256), 0);
        assert_eq!(align_to(1, 256), 256);
        assert_eq!(align_to(256, 256), 256);
        assert_eq!(align_to(257, 256), 512);
        assert_eq!(align_to(80, 0), 80);
    }
}
