//! Codec error types.

use thiserror::Error;

use crate::blob::BlobError;
use crate::json::JsonError;

/// Failure while turning a blob into JSON.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Blob(#[from] BlobError),

    #[error("json emitter: {0}")]
    Json(#[from] JsonError),

    #[error("enum index {index} out of range for {len} choices")]
    EnumOutOfRange { index: u16, len: u16 },

    #[error("schema nests deeper than {max_depth} levels")]
    DepthExceeded { max_depth: usize },

    #[error("variable object array has no element template")]
    MissingTemplate,

    #[error("document does not fit a {capacity} byte buffer")]
    BufferTooSmall { capacity: usize },
}

impl DecodeError {
    /// Whether the stream the blob came from can still be trusted.
    pub fn is_fatal(&self) -> bool {
        match self {
            DecodeError::Blob(err) => err.is_fatal(),
            _ => false,
        }
    }
}

/// Failure while turning a JSON value into a blob.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error(transparent)]
    Blob(#[from] BlobError),

    #[error("{path}: expected {expected}")]
    TypeMismatch { path: String, expected: &'static str },

    #[error("{path}: missing member")]
    MissingMember { path: String },

    #[error("{path}: value is not one of the enum choices")]
    UnknownChoice { path: String },

    #[error("{path}: {len} entries exceed the limit of {max}")]
    TooLong { path: String, len: usize, max: usize },

    #[error("{path}: expected exactly {expected} elements, found {found}")]
    WrongCount {
        path: String,
        expected: usize,
        found: usize,
    },

    #[error("{path}: invalid base64: {reason}")]
    Base64 { path: String, reason: String },

    #[error("{path}: variable object array has no element template")]
    MissingTemplate { path: String },

    #[error("schema nests deeper than {max_depth} levels")]
    DepthExceeded { max_depth: usize },
}

pub type DecodeResult<T> = Result<T, DecodeError>;

pub type EncodeResult<T> = Result<T, EncodeError>;
