//! Schema tree error types
//!
//! Error codes:
//! - EVC_TREE_OUT_OF_MEMORY (ERROR severity)
//! - EVC_TREE_LENGTH_OVERFLOW (ERROR severity)
//! - EVC_TREE_FLAGS_REJECTED (ERROR severity)
//! - EVC_TREE_INVALID_DEFINITION (ERROR severity)
//! - EVC_TREE_VERSION_MISMATCH (FATAL severity)
//! - EVC_TREE_IO_FAILED (FATAL severity)

use std::fmt;
use std::io;

use crate::arena::AllocError;
use crate::blob::Severity;

use super::node::NodeFlags;

/// Schema tree error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeErrorCode {
    /// The allocator could not serve a node or payload
    OutOfMemory,
    /// A payload exceeds what a 16-bit length can describe
    LengthOverflow,
    /// A flag combination was refused
    FlagsRejected,
    /// A schema definition cannot be turned into a tree
    InvalidDefinition,
    /// A schema targets another node layout version
    VersionMismatch,
    /// Reading a schema file failed
    IoFailed,
}

impl TreeErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            TreeErrorCode::OutOfMemory => "EVC_TREE_OUT_OF_MEMORY",
            TreeErrorCode::LengthOverflow => "EVC_TREE_LENGTH_OVERFLOW",
            TreeErrorCode::FlagsRejected => "EVC_TREE_FLAGS_REJECTED",
            TreeErrorCode::InvalidDefinition => "EVC_TREE_INVALID_DEFINITION",
            TreeErrorCode::VersionMismatch => "EVC_TREE_VERSION_MISMATCH",
            TreeErrorCode::IoFailed => "EVC_TREE_IO_FAILED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            TreeErrorCode::VersionMismatch | TreeErrorCode::IoFailed => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for TreeErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Schema tree error with context
#[derive(Debug)]
pub struct TreeError {
    code: TreeErrorCode,
    message: String,
    details: Option<String>,
    source: Option<io::Error>,
}

impl TreeError {
    fn new(code: TreeErrorCode, message: impl Into<String>) -> Self {
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

    /// An allocation of `requested` bytes failed.
    pub fn out_of_memory(requested: usize, cause: AllocError) -> Self {
        Self::new(
            TreeErrorCode::OutOfMemory,
            format!("failed to allocate {} bytes", requested),
        )
        .with_details(cause.to_string())
    }

    /// `len` elements do not fit in a node.
    pub fn length_overflow(what: &str, len: usize) -> Self {
        Self::new(
            TreeErrorCode::LengthOverflow,
            format!("{} of length {} exceeds the node limit", what, len),
        )
    }

    /// `flags` were refused for the given reason.
    pub fn flags_rejected(flags: NodeFlags, reason: impl Into<String>) -> Self {
        Self::new(TreeErrorCode::FlagsRejected, reason)
            .with_details(format!("flags 0x{:02x}", flags.bits()))
    }

    /// A schema definition is malformed.
    pub fn invalid_definition(path: &str, reason: impl Into<String>) -> Self {
        Self::new(TreeErrorCode::InvalidDefinition, reason).with_details(format!("at {}", path))
    }

    /// A schema declares a node layout version other than ours.
    pub fn version_mismatch(expected: u32, found: u32) -> Self {
        Self::new(
            TreeErrorCode::VersionMismatch,
            format!("node layout version {} is not supported (expected {})", found, expected),
        )
    }

    /// Reading a schema failed.
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: TreeErrorCode::IoFailed,
            message: format!("failed to read schema {}", path.into()),
            details: Some(source.to_string()),
            source: Some(source),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> TreeErrorCode {
        self.code
    }

    /// Returns the severity
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for TreeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for tree operations
pub type TreeResult<T> = Result<T, TreeError>;
