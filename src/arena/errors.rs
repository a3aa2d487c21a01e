//! Allocation errors

use thiserror::Error;

/// Why an allocation could not be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
    /// A block allocator ran out of room.
    #[error("block exhausted: requested {requested} bytes with {remaining} remaining")]
    Exhausted { requested: usize, remaining: usize },

    /// The general-purpose allocator refused to grow.
    #[error("out of memory: could not reserve {requested} bytes")]
    OutOfMemory { requested: usize },

    /// The size cannot be represented once rounded.
    #[error("allocation of {requested} bytes is too large")]
    TooLarge { requested: usize },
}

/// Result type for allocation
pub type AllocResult<T> = Result<T, AllocError>;
