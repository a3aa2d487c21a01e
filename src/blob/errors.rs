//! Blob codec error types
//!
//! Error codes:
//! - EVC_BLOB_OUT_OF_SPACE (ERROR severity)
//! - EVC_BLOB_TRUNCATED (ERROR severity)
//! - EVC_BLOB_LENGTH_OVERFLOW (ERROR severity)
//! - EVC_BLOB_VERSION_MISMATCH (FATAL severity)
//! - EVC_BLOB_FRAME_CORRUPTION (FATAL severity)
//! - EVC_BLOB_IO_FAILED (FATAL severity)
//!
//! ERROR means the current event is lost and the caller may move on to the
//! next one. FATAL means the stream the event came from cannot be trusted
//! any further.

use std::fmt;
use std::io;

/// How far the damage of an error reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The current event fails, the stream continues
    Error,
    /// The stream cannot be decoded further
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Blob error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobErrorCode {
    /// A write needed more bytes than the buffer has left
    OutOfSpace,
    /// A read needed more bytes than the blob has left
    Truncated,
    /// A variable-length field exceeded its count limit
    LengthOverflow,
    /// The layout version on the wire is not ours
    VersionMismatch,
    /// An event frame failed its structural or checksum check
    FrameCorruption,
    /// Underlying I/O failed
    IoFailed,
}

impl BlobErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            BlobErrorCode::OutOfSpace => "EVC_BLOB_OUT_OF_SPACE",
            BlobErrorCode::Truncated => "EVC_BLOB_TRUNCATED",
            BlobErrorCode::LengthOverflow => "EVC_BLOB_LENGTH_OVERFLOW",
            BlobErrorCode::VersionMismatch => "EVC_BLOB_VERSION_MISMATCH",
            BlobErrorCode::FrameCorruption => "EVC_BLOB_FRAME_CORRUPTION",
            BlobErrorCode::IoFailed => "EVC_BLOB_IO_FAILED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            BlobErrorCode::OutOfSpace
            | BlobErrorCode::Truncated
            | BlobErrorCode::LengthOverflow => Severity::Error,
            BlobErrorCode::VersionMismatch
            | BlobErrorCode::FrameCorruption
            | BlobErrorCode::IoFailed => Severity::Fatal,
        }
    }
}

impl fmt::Display for BlobErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Blob error with context
#[derive(Debug)]
pub struct BlobError {
    code: BlobErrorCode,
    message: String,
    details: Option<String>,
    source: Option<io::Error>,
}

impl BlobError {
    fn new(code: BlobErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// A write ran past the end of the destination buffer.
    pub fn out_of_space(requested: usize, available: usize, offset: usize) -> Self {
        Self::new(BlobErrorCode::OutOfSpace, "hit end of buffer while writing").with_details(
            format!(
                "tried to write {} bytes at offset {}, with {} available",
                requested, offset, available
            ),
        )
    }

    /// A read ran past the end of the blob.
    pub fn truncated(requested: usize, available: usize, offset: usize) -> Self {
        Self::new(BlobErrorCode::Truncated, "hit end of buffer while reading").with_details(
            format!(
                "tried to read {} bytes at offset {}, with {} available",
                requested, offset, available
            ),
        )
    }

    /// A variable-length field holds more elements than its count allows.
    pub fn length_overflow(len: usize, max: usize) -> Self {
        Self::new(
            BlobErrorCode::LengthOverflow,
            format!("length {} exceeds the limit of {}", len, max),
        )
    }

    /// The layout version found on the wire differs from ours.
    pub fn version_mismatch(expected: u32, found: u32, offset: u64) -> Self {
        Self::new(
            BlobErrorCode::VersionMismatch,
            format!("blob layout version {} is not supported (expected {})", found, expected),
        )
        .with_details(format!("offset {}", offset))
    }

    /// A frame at `offset` is malformed.
    pub fn frame_corruption(offset: u64, reason: impl Into<String>) -> Self {
        Self::new(BlobErrorCode::FrameCorruption, reason).with_details(format!("offset {}", offset))
    }

    /// I/O failed at `offset`.
    pub fn io(offset: u64, context: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: BlobErrorCode::IoFailed,
            message: context.into(),
            details: Some(format!("offset {}", offset)),
            source: Some(source),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> BlobErrorCode {
        self.code
    }

    /// Returns the severity
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// True when the surrounding stream must be abandoned.
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    /// Returns the message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the details, if any
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }
}

impl fmt::Display for BlobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for BlobError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for blob operations
pub type BlobResult<T> = Result<T, BlobError>;
