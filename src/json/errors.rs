//! JSON emitter errors.

use thiserror::Error;

/// Structural misuse detected by a validated `JsonSerializer`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JsonError {
    #[error("key written outside an object")]
    KeyOutsideObject,

    #[error("key written while the previous key still awaits its value")]
    KeyWithoutValue,

    #[error("value written inside an object without a key")]
    MissingKey,

    #[error("second top-level value")]
    MultipleRoots,

    #[error("closed {found} while the innermost open scope is {expected}")]
    MismatchedClose {
        expected: &'static str,
        found: &'static str,
    },

    #[error("document finished with {open} open scope(s)")]
    UnclosedScope { open: usize },

    #[error("document finished without a value")]
    Empty,
}

/// Result type for emitter operations
pub type JsonResult<T> = Result<T, JsonError>;
