//! Binary blob codec
//!
//! Packs the non-constant values of one event into a flat byte buffer and
//! unpacks them again. The blob carries no type tags: every decision about
//! what comes next is made by the caller walking a schema.
//!
//! # Design Principles
//!
//! 1. One layout rule for every pass: each primitive is padded to its
//!    natural alignment, measured from the start of the blob
//! 2. Variable-length arrays and strings carry an aligned 16-bit count;
//!    fixed-length ones carry none
//! 3. Readers hand out views into the blob, never copies
//! 4. Validation is a type-level policy (`Validated` / `Unchecked`) so the
//!    unchecked path compiles without any capacity checks
//!
//! # Invariants Enforced
//!
//! - `BlobSizeCalculator::size()` equals the bytes consumed by a
//!   `BlobWriter` fed the same call sequence
//! - Validated writers and readers never touch bytes past the buffer end;
//!   they report through the validation callback and return an error
//! - Unchecked writers and readers perform no capacity checks. A blob that
//!   does not match the walking schema yields garbage values or a panic on
//!   a slice bound, never undefined behavior
//!
//! # Layout Version
//!
//! `BLOB_VERSION` must be bumped on any change to the layout rules above.

mod errors;
mod frame;
mod primitive;
mod reader;
mod size;
mod sink;
mod validation;
mod writer;

pub use errors::{BlobError, BlobErrorCode, BlobResult, Severity};
pub use frame::{FrameReader, FrameWriter, FRAME_HEADER_SIZE, FRAME_MAGIC};
pub use primitive::{align_for, align_up, PackedSlice, Primitive};
pub use reader::{BlobReader, StrArray, StrArrayIter};
pub use size::BlobSizeCalculator;
pub use sink::{pack, pack_with, BlobRecord, BlobSink};
pub use validation::{
    ignore_validation_error, log_validation_error, Unchecked, Validated, Validation,
    ValidationErrorFn,
};
pub use writer::BlobWriter;

/// Version of the blob layout rules.
pub const BLOB_VERSION: u32 = 0;

/// Largest element count a variable-length field can carry.
pub const MAX_BLOB_LEN: usize = u16::MAX as usize;

/// Encoded length of a variable string: its bytes plus a terminator,
/// clamped to what the 16-bit count can express.
pub fn encoded_str_len(len: usize) -> usize {
    len.saturating_add(1).min(MAX_BLOB_LEN)
}

/// Strips the trailing NUL a writer appends to variable strings.
pub(crate) fn strip_terminator(raw: &[u8]) -> &[u8] {
    match raw.split_last() {
        Some((0, rest)) => rest,
        _ => raw,
    }
}

/// Cuts a fixed-length string at its first NUL.
pub(crate) fn until_nul(raw: &[u8]) -> &[u8] {
    match raw.iter().position(|&b| b == 0) {
        Some(end) => &raw[..end],
        None => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoded_str_len_counts_terminator() {
        assert_eq!(encoded_str_len(0), 1);
        assert_eq!(encoded_str_len(5), 6);
    }

    #[test]
    fn test_encoded_str_len_clamps() {
        assert_eq!(encoded_str_len(MAX_BLOB_LEN), MAX_BLOB_LEN);
        assert_eq!(encoded_str_len(usize::MAX), MAX_BLOB_LEN);
    }

    #[test]
    fn test_strip_terminator() {
        assert_eq!(strip_terminator(b"abc\0"), b"abc");
        assert_eq!(strip_terminator(b"abc"), b"abc");
        assert_eq!(strip_terminator(b""), b"");
    }

    #[test]
    fn test_until_nul() {
        assert_eq!(until_nul(b"ab\0\0\0"), b"ab");
        assert_eq!(until_nul(b"abcd"), b"abcd");
    }
}
