//! Codec events
//!
//! Every log line the crate writes names one of these.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Schemas
    /// A schema definition was built into a tree
    SchemaLoaded,
    /// A schema definition could not be built
    SchemaRejected,
    /// `set_flags` repaired or accepted a questionable combination
    FlagsAdjusted,
    /// `set_flags` refused a combination
    FlagsRejected,
    /// A tree allocation failed
    ArenaExhausted,

    // Blobs
    /// An event was packed into a blob
    BlobEncoded,
    /// A blob was rendered as JSON
    BlobDecoded,
    /// A blob could not be rendered; the event is skipped
    BlobDecodeFailed,
    /// A frame failed its integrity checks; the stream stops
    FrameCorrupted,
    /// The validation callback was invoked
    ValidationError,

    // Configuration
    ConfigLoaded,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::SchemaLoaded => "SCHEMA_LOADED",
            Event::SchemaRejected => "SCHEMA_REJECTED",
            Event::FlagsAdjusted => "FLAGS_ADJUSTED",
            Event::FlagsRejected => "FLAGS_REJECTED",
            Event::ArenaExhausted => "ARENA_EXHAUSTED",
            Event::BlobEncoded => "BLOB_ENCODED",
            Event::BlobDecoded => "BLOB_DECODED",
            Event::BlobDecodeFailed => "BLOB_DECODE_FAILED",
            Event::FrameCorrupted => "FRAME_CORRUPTED",
            Event::ValidationError => "VALIDATION_ERROR",
            Event::ConfigLoaded => "CONFIG_LOADED",
        }
    }

    /// Events after which the current stream cannot continue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::FrameCorrupted)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
