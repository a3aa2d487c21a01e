//! Bump allocator over one pre-sized block.

use super::{checked_fixup, AllocError, AllocResult, Allocator, Span};

/// Serves allocations front to back from a single block.
///
/// Individual regions are never reclaimed; the block is released as a
/// whole by dropping the allocator or calling `reset`. Sizing the block
/// with `TreeSizeCalculator` lets a whole tree fit with no waste.
#[derive(Debug, Clone, Default)]
pub struct BlockAllocator {
    block: Vec<u8>,
    cursor: usize,
}

impl BlockAllocator {
    /// Creates an allocator over a fresh zeroed block of `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            block: vec![0; capacity],
            cursor: 0,
        }
    }

    /// Reuses a caller-owned block. Its contents are cleared.
    pub fn from_block(mut block: Vec<u8>) -> Self {
        block.fill(0);
        Self { block, cursor: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.block.len()
    }

    /// Bytes handed out so far, rounding included.
    pub fn used(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.block.len() - self.cursor
    }

    /// Releases every allocation at once. Spans handed out earlier become
    /// invalid.
    pub fn reset(&mut self) {
        self.block[..self.cursor].fill(0);
        self.cursor = 0;
    }

    /// Gives the block back to the caller.
    pub fn into_block(self) -> Vec<u8> {
        self.block
    }
}

impl Allocator for BlockAllocator {
    fn alloc(&mut self, size: usize) -> AllocResult<Span> {
        let rounded = checked_fixup(size)?;
        if rounded > self.remaining() {
            return Err(AllocError::Exhausted {
                requested: size,
                remaining: self.remaining(),
            });
        }

        let span = Span::new(self.cursor, size);
        self.cursor += rounded;
        Ok(span)
    }

    fn dealloc(&mut self, _span: Span) {}

    fn memory(&self) -> &[u8] {
        &self.block
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bump_allocation_rounds() {
        let mut block = BlockAllocator::with_capacity(32);
        let a = block.alloc(3).unwrap();
        let b = block.alloc(8).unwrap();
        assert_eq!(a.offset(), 0);
        assert_eq!(a.len(), 3);
        assert_eq!(b.offset(), 8);
        assert_eq!(block.used(), 16);
        assert_eq!(block.remaining(), 16);
    }

    #[test]
    fn test_zero_size_allocation_consumes_nothing() {
        let mut block = BlockAllocator::with_capacity(8);
        let span = block.alloc(0).unwrap();
        assert!(span.is_empty());
        assert_eq!(block.used(), 0);
    }

    #[test]
    fn test_exhaustion_keeps_prior_allocations() {
        let mut block = BlockAllocator::with_capacity(16);
        let first = block.alloc(5).unwrap();
        block.bytes_mut(first).copy_from_slice(b"hello");

        let err = block.alloc(9).unwrap_err();
        assert_eq!(
            err,
            AllocError::Exhausted {
                requested: 9,
                remaining: 8
            }
        );
        assert_eq!(block.bytes(first), b"hello");
        assert_eq!(block.used(), 8);
    }

    #[test]
    fn test_dealloc_is_noop() {
        let mut block = BlockAllocator::with_capacity(16);
        let span = block.alloc(8).unwrap();
        block.dealloc(span);
        assert_eq!(block.remaining(), 8);
    }

    #[test]
    fn test_reset_releases_everything() {
        let mut block = BlockAllocator::with_capacity(16);
        let span = block.alloc(16).unwrap();
        block.bytes_mut(span).fill(0xab);
        block.reset();

        assert_eq!(block.remaining(), 16);
        let again = block.alloc(16).unwrap();
        assert!(block.bytes(again).iter().all(|&b| b == 0));
    }

    #[test]
    fn test_from_block_clears_contents() {
        let block = BlockAllocator::from_block(vec![0xff; 8]);
        assert!(block.memory().iter().all(|&b| b == 0));
        assert_eq!(block.into_block().len(), 8);
    }
}
