//! Memory providers for schema trees
//!
//! Trees are stored as bytes inside one allocator-owned region and refer to
//! each other by offset, so an allocator hands out `Span`s rather than
//! pointers.
//!
//! # Design Principles
//!
//! 1. Every allocation is rounded up to `ALIGNMENT` bytes
//! 2. Fresh allocations are always zero-filled
//! 3. Exhaustion is a returned error, never a panic
//!
//! # Allocators
//!
//! - `HeapAllocator`: growable region with per-size free lists
//! - `BlockAllocator`: bump allocation over one pre-sized block;
//!   `dealloc` is a no-op and the block is released as a whole

mod block;
mod errors;
mod heap;

pub use block::BlockAllocator;
pub use errors::{AllocError, AllocResult};
pub use heap::HeapAllocator;

/// Alignment unit of every allocation.
pub const ALIGNMENT: usize = 8;

/// Rounds `size` up to the allocation unit.
pub const fn fixup_alignment(size: usize) -> usize {
    (size + ALIGNMENT - 1) & !(ALIGNMENT - 1)
}

/// Overflow-checked `fixup_alignment`.
pub(crate) fn checked_fixup(size: usize) -> AllocResult<usize> {
    size.checked_add(ALIGNMENT - 1)
        .map(|s| s & !(ALIGNMENT - 1))
        .ok_or(AllocError::TooLarge { requested: size })
}

/// A region handed out by an allocator: its offset inside the allocator's
/// memory and the requested length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    offset: usize,
    len: usize,
}

impl Span {
    pub(crate) const fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// A provider of zero-filled, 8-byte aligned regions.
pub trait Allocator {
    /// Allocates `size` bytes.
    fn alloc(&mut self, size: usize) -> AllocResult<Span>;

    /// Returns a region. Allocators may ignore this.
    fn dealloc(&mut self, span: Span);

    /// All memory this allocator has handed out, addressed by span offsets.
    fn memory(&self) -> &[u8];

    fn memory_mut(&mut self) -> &mut [u8];

    /// Bytes of one span.
    fn bytes(&self, span: Span) -> &[u8] {
        &self.memory()[span.offset..span.end()]
    }

    fn bytes_mut(&mut self, span: Span) -> &mut [u8] {
        &mut self.memory_mut()[span.offset..span.end()]
    }
}
