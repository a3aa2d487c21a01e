//! General-purpose allocator.

use std::collections::BTreeMap;

use super::{checked_fixup, AllocError, AllocResult, Allocator, Span};

/// A growable region with exact-size free lists.
///
/// Freed regions are kept per rounded size and handed out again, zeroed,
/// to the next allocation of that size.
#[derive(Debug, Default)]
pub struct HeapAllocator {
    memory: Vec<u8>,
    free: BTreeMap<usize, Vec<usize>>,
    live: usize,
}

impl HeapAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-reserves `bytes` of backing memory.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            memory: Vec::with_capacity(bytes),
            ..Self::default()
        }
    }

    /// Bytes currently allocated, rounding included.
    pub fn live_bytes(&self) -> usize {
        self.live
    }

    /// Bytes of backing memory in use, live or free.
    pub fn reserved_bytes(&self) -> usize {
        self.memory.len()
    }
}

impl Allocator for HeapAllocator {
    fn alloc(&mut self, size: usize) -> AllocResult<Span> {
        let rounded = checked_fixup(size)?;
        if rounded == 0 {
            return Ok(Span::new(0, 0));
        }

        if let Some(offset) = self.free.get_mut(&rounded).and_then(Vec::pop) {
            self.memory[offset..offset + rounded].fill(0);
            self.live += rounded;
            return Ok(Span::new(offset, size));
        }

        let offset = self.memory.len();
        self.memory
            .try_reserve(rounded)
            .map_err(|_| AllocError::OutOfMemory { requested: size })?;
        self.memory.resize(offset + rounded, 0);
        self.live += rounded;
        Ok(Span::new(offset, size))
    }

    fn dealloc(&mut self, span: Span) {
        if span.is_empty() {
            return;
        }
        let rounded = super::fixup_alignment(span.len());
        self.free.entry(rounded).or_default().push(span.offset());
        self.live -= rounded;
    }

    fn memory(&self) -> &[u8] {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }
}
