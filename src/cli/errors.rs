//! CLI-specific error types
//!
//! Every CLI error ends the process with status 1.

use std::fmt;
use std::io;

use crate::blob::{BlobError, BlobErrorCode};
use crate::codec::{DecodeError, EncodeError};
use crate::config::ConfigError;
use crate::json::JsonError;
use crate::tree::TreeError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (files, stdout)
    IoError,
    /// Schema definition could not be loaded
    SchemaError,
    /// An input event could not be packed
    EncodeFailed,
    /// A frame could not be rendered
    DecodeFailed,
    /// The frame stream is corrupt
    FrameError,
    /// `compare` found a difference
    SchemasDiffer,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "EVC_CLI_CONFIG_ERROR",
            Self::IoError => "EVC_CLI_IO_ERROR",
            Self::SchemaError => "EVC_CLI_SCHEMA_ERROR",
            Self::EncodeFailed => "EVC_CLI_ENCODE_FAILED",
            Self::DecodeFailed => "EVC_CLI_DECODE_FAILED",
            Self::FrameError => "EVC_CLI_FRAME_ERROR",
            Self::SchemasDiffer => "EVC_CLI_SCHEMAS_DIFFER",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn schema_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::SchemaError, msg)
    }

    /// An input line that failed to encode.
    pub fn encode_failed(line: usize, msg: impl fmt::Display) -> Self {
        Self::new(CliErrorCode::EncodeFailed, format!("line {}: {}", line, msg))
    }

    pub fn decode_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::DecodeFailed, msg)
    }

    pub fn frame_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::FrameError, msg)
    }

    pub fn schemas_differ() -> Self {
        Self::new(CliErrorCode::SchemasDiffer, "schemas differ")
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::config_error(e.to_string())
    }
}

impl From<TreeError> for CliError {
    fn from(e: TreeError) -> Self {
        Self::schema_error(e.to_string())
    }
}

impl From<BlobError> for CliError {
    fn from(e: BlobError) -> Self {
        match e.code() {
            BlobErrorCode::FrameCorruption | BlobErrorCode::VersionMismatch => {
                Self::frame_error(e.to_string())
            }
            _ => Self::io_error(e.to_string()),
        }
    }
}

impl From<DecodeError> for CliError {
    fn from(e: DecodeError) -> Self {
        Self::decode_failed(e.to_string())
    }
}

impl From<JsonError> for CliError {
    fn from(e: JsonError) -> Self {
        Self::io_error(format!("JSON emitter: {}", e))
    }
}

impl From<EncodeError> for CliError {
    fn from(e: EncodeError) -> Self {
        Self::new(CliErrorCode::EncodeFailed, e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format() {
        let err = CliError::encode_failed(3, "$.id: missing member");
        assert_eq!(err.to_string(), "EVC_CLI_ENCODE_FAILED: line 3: $.id: missing member");
    }

    #[test]
    fn test_fatal_blob_errors_are_frame_errors() {
        let err = CliError::from(BlobError::frame_corruption(32, "checksum mismatch"));
        assert_eq!(err.code(), &CliErrorCode::FrameError);
    }
}
