//! Blob writer
//!
//! Writes values into a caller-owned buffer in the order a schema walk
//! visits them. Pair every call with the matching `BlobSizeCalculator`
//! call to size the buffer beforehand, or drive both through `BlobSink`.

use std::marker::PhantomData;

use super::errors::{BlobError, BlobResult};
use super::primitive::{align_for, Primitive};
use super::validation::{ignore_validation_error, Unchecked, Validation, ValidationErrorFn};
use super::{encoded_str_len, BLOB_VERSION, MAX_BLOB_LEN};

/// Writes packed values into a borrowed buffer.
///
/// With `Validated` every write checks the remaining capacity and fails
/// with `EVC_BLOB_OUT_OF_SPACE` instead of writing. With `Unchecked` no
/// capacity check is made; an undersized buffer panics on the slice bound.
pub struct BlobWriter<'a, V: Validation = Unchecked> {
    buffer: &'a mut [u8],
    written: usize,
    on_error: ValidationErrorFn,
    _mode: PhantomData<V>,
}

impl<'a, V: Validation> BlobWriter<'a, V> {
    /// Layout version this writer produces.
    pub const VERSION: u32 = BLOB_VERSION;

    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self::with_error_handler(buffer, ignore_validation_error)
    }

    /// Creates a writer that reports failures to `on_error`.
    pub fn with_error_handler(buffer: &'a mut [u8], on_error: ValidationErrorFn) -> Self {
        Self {
            buffer,
            written: 0,
            on_error,
            _mode: PhantomData,
        }
    }

    /// Bytes consumed so far, padding included.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Writes one value at its natural alignment.
    pub fn copy<T: Primitive>(&mut self, value: T) -> BlobResult<()> {
        self.align::<T>();
        self.reserve(T::SIZE)?;
        self.put_raw(value);
        Ok(())
    }

    /// Writes a 16-bit count followed by the elements.
    pub fn copy_array<T: Primitive>(&mut self, values: &[T]) -> BlobResult<()> {
        let len = self.checked_len(values.len(), MAX_BLOB_LEN)?;
        self.copy(len)?;
        if len == 0 {
            return Ok(());
        }

        self.align::<T>();
        self.reserve(values.len() * T::SIZE)?;
        for &value in values {
            self.put_raw(value);
        }
        Ok(())
    }

    /// Writes exactly `fixed_len` elements with no count, zero-filling
    /// past the end of `values`.
    pub fn copy_fixed<T: Primitive>(&mut self, values: &[T], fixed_len: u16) -> BlobResult<()> {
        let fixed = usize::from(fixed_len);
        self.checked_len(values.len(), fixed)?;

        self.align::<T>();
        self.reserve(fixed * T::SIZE)?;
        for &value in values {
            self.put_raw(value);
        }
        self.zero_fill((fixed - values.len()) * T::SIZE);
        Ok(())
    }

    /// Writes a variable-length byte array.
    pub fn copy_bytes(&mut self, bytes: &[u8]) -> BlobResult<()> {
        let len = self.checked_len(bytes.len(), MAX_BLOB_LEN)?;
        self.copy(len)?;
        self.reserve(bytes.len())?;
        self.put_bytes(bytes);
        Ok(())
    }

    /// Writes a NUL-terminated string with its encoded length. Strings that
    /// do not fit the 16-bit count are truncated.
    pub fn copy_str(&mut self, value: &str) -> BlobResult<()> {
        let stored = encoded_str_len(value.len());
        self.copy(stored as u16)?;
        self.reserve(stored)?;
        self.put_terminated(value.as_bytes(), stored);
        Ok(())
    }

    /// Writes a string into a `fixed_len` byte field, truncating so at
    /// least one NUL remains.
    pub fn copy_fixed_str(&mut self, value: &str, fixed_len: u16) -> BlobResult<()> {
        let fixed = usize::from(fixed_len);
        if fixed == 0 {
            return Ok(());
        }

        self.reserve(fixed)?;
        let live = value.len().min(fixed - 1);
        self.put_bytes(&value.as_bytes()[..live]);
        self.zero_fill(fixed - live);
        Ok(())
    }

    /// Writes a count followed by one length-prefixed string per entry.
    /// `None` entries are written with length zero.
    pub fn copy_str_array(&mut self, values: &[Option<&str>]) -> BlobResult<()> {
        let len = self.checked_len(values.len(), MAX_BLOB_LEN)?;
        self.copy(len)?;

        for value in values {
            match value {
                None => self.copy(0u16)?,
                Some(s) => {
                    let stored = encoded_str_len(s.len());
                    self.copy(stored as u16)?;
                    self.reserve(stored)?;
                    self.put_terminated(s.as_bytes(), stored);
                }
            }
        }
        Ok(())
    }

    fn align<T: Primitive>(&mut self) {
        let aligned = align_for::<T>(self.written);
        let end = aligned.min(self.buffer.len());
        if self.written < end {
            self.buffer[self.written..end].fill(0);
        }
        self.written = aligned;
    }

    fn reserve(&self, needed: usize) -> BlobResult<()> {
        if V::ENABLED {
            let available = self.buffer.len().saturating_sub(self.written);
            if needed > available {
                let err = BlobError::out_of_space(needed, available, self.written);
                (self.on_error)(&err.to_string());
                return Err(err);
            }
        }
        Ok(())
    }

    fn checked_len(&self, len: usize, max: usize) -> BlobResult<u16> {
        if len > max {
            let err = BlobError::length_overflow(len, max);
            (self.on_error)(&err.to_string());
            return Err(err);
        }
        Ok(len as u16)
    }

    fn put_raw<T: Primitive>(&mut self, value: T) {
        let end = self.written + T::SIZE;
        value.write_le(&mut self.buffer[self.written..end]);
        self.written = end;
    }

    fn put_bytes(&mut self, bytes: &[u8]) {
        let end = self.written + bytes.len();
        self.buffer[self.written..end].copy_from_slice(bytes);
        self.written = end;
    }

    fn put_terminated(&mut self, bytes: &[u8], stored: usize) {
        self.put_bytes(&bytes[..stored - 1]);
        self.put_raw(0u8);
    }

    fn zero_fill(&mut self, len: usize) {
        let end = self.written + len;
        self.buffer[self.written..end].fill(0);
        self.written = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::{BlobErrorCode, Validated};

    // ==================== Layout Tests ====================

    #[test]
    fn test_scalar_alignment_padding() {
        let mut buffer = [0xaau8; 16];
        let mut writer = BlobWriter::<Validated>::new(&mut buffer);

        writer.copy(1u8).unwrap();
        writer.copy(0x0203u16).unwrap();
        writer.copy(0x0405_0607u32).unwrap();
        assert_eq!(writer.written(), 8);

        assert_eq!(&buffer[..8], &[1, 0, 3, 2, 7, 6, 5, 4]);
    }

    #[test]
    fn test_array_count_prefix() {
        let mut buffer = [0u8; 32];
        let mut writer = BlobWriter::<Validated>::new(&mut buffer);

        writer.copy(true).unwrap();
        writer.copy_array(&[10i32, 20]).unwrap();
        assert_eq!(writer.written(), 12);

        // bool, pad, u16 count, i32 x2
        assert_eq!(&buffer[..4], &[1, 0, 2, 0]);
        assert_eq!(&buffer[4..8], &10i32.to_le_bytes());
        assert_eq!(&buffer[8..12], &20i32.to_le_bytes());
    }

    #[test]
    fn test_empty_array_writes_only_count() {
        let mut buffer = [0u8; 8];
        let mut writer = BlobWriter::<Validated>::new(&mut buffer);

        writer.copy_array::<f64>(&[]).unwrap();
        assert_eq!(writer.written(), 2);
    }

    #[test]
    fn test_fixed_array_zero_fills() {
        let mut buffer = [0xffu8; 16];
        let mut writer = BlobWriter::<Validated>::new(&mut buffer);

        writer.copy_fixed(&[7u32], 3).unwrap();
        assert_eq!(writer.written(), 12);
        assert_eq!(&buffer[..12], &[7, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_fixed_array_rejects_overlong_input() {
        let mut buffer = [0u8; 16];
        let mut writer = BlobWriter::<Validated>::new(&mut buffer);

        let err = writer.copy_fixed(&[1u8, 2, 3], 2).unwrap_err();
        assert_eq!(err.code(), BlobErrorCode::LengthOverflow);
    }

    #[test]
    fn test_string_is_terminated() {
        let mut buffer = [0xffu8; 8];
        let mut writer = BlobWriter::<Validated>::new(&mut buffer);

        writer.copy_str("hi").unwrap();
        assert_eq!(writer.written(), 5);
        assert_eq!(&buffer[..5], &[3, 0, b'h', b'i', 0]);
    }

    #[test]
    fn test_fixed_string_keeps_terminator() {
        let mut buffer = [0xffu8; 4];
        let mut writer = BlobWriter::<Validated>::new(&mut buffer);

        writer.copy_fixed_str("abcdef", 4).unwrap();
        assert_eq!(&buffer, b"abc\0");
    }

    #[test]
    fn test_string_array_null_entry() {
        let mut buffer = [0u8; 16];
        let mut writer = BlobWriter::<Validated>::new(&mut buffer);

        writer.copy_str_array(&[Some("a"), None]).unwrap();
        // count, len 2, "a\0", len 0
        assert_eq!(writer.written(), 8);
        assert_eq!(&buffer[..8], &[2, 0, 2, 0, b'a', 0, 0, 0]);
    }

    // ==================== Validation Tests ====================

    #[test]
    fn test_out_of_space_reported() {
        let mut buffer = [0u8; 6];
        let mut writer = BlobWriter::<Validated>::new(&mut buffer);

        writer.copy(1u32).unwrap();
        let err = writer.copy(2u32).unwrap_err();
        assert_eq!(err.code(), BlobErrorCode::OutOfSpace);
    }

    #[test]
    fn test_out_of_space_invokes_callback() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        fn count(_message: &str) {
            CALLS.fetch_add(1, Ordering::SeqCst);
        }

        let mut buffer = [0u8; 2];
        let mut writer = BlobWriter::<Validated>::with_error_handler(&mut buffer, count);
        assert!(writer.copy_str("too long").is_err());
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_array_count_overflow() {
        let values = vec![0u8; MAX_BLOB_LEN + 1];
        let mut buffer = vec![0u8; values.len() + 2];
        let mut writer = BlobWriter::<Validated>::new(&mut buffer);

        let err = writer.copy_array(&values).unwrap_err();
        assert_eq!(err.code(), BlobErrorCode::LengthOverflow);
    }

    #[test]
    fn test_long_string_truncated() {
        let value = "x".repeat(MAX_BLOB_LEN + 10);
        let mut buffer = vec![0u8; MAX_BLOB_LEN + 2];
        let mut writer = BlobWriter::<Validated>::new(&mut buffer);

        writer.copy_str(&value).unwrap();
        assert_eq!(writer.written(), MAX_BLOB_LEN + 2);
        assert_eq!(buffer[MAX_BLOB_LEN + 1], 0);
    }

    #[test]
    fn test_unchecked_writer_matches_validated_bytes() {
        let mut checked = [0u8; 24];
        let mut unchecked = [0u8; 24];

        let mut a = BlobWriter::<Validated>::new(&mut checked);
        a.copy(3i16).unwrap();
        a.copy_str("ok").unwrap();
        a.copy(2.5f64).unwrap();
        let a_len = a.written();

        let mut b = BlobWriter::<Unchecked>::new(&mut unchecked);
        b.copy(3i16).unwrap();
        b.copy_str("ok").unwrap();
        b.copy(2.5f64).unwrap();
        let b_len = b.written();

        assert_eq!(a_len, b_len);
        assert_eq!(checked, unchecked);
    }

    /// Padding is cleared even when the buffer held older bytes.
    #[test]
    fn test_padding_zeroed_in_reused_buffer() {
        let mut checked = [0xffu8; 8];
        let mut unchecked = [0xffu8; 8];

        let mut a = BlobWriter::<Validated>::new(&mut checked);
        a.copy(1u8).unwrap();
        a.copy(7u32).unwrap();

        let mut b = BlobWriter::<Unchecked>::new(&mut unchecked);
        b.copy(1u8).unwrap();
        b.copy(7u32).unwrap();

        assert_eq!(unchecked, [1, 0, 0, 0, 7, 0, 0, 0]);
        assert_eq!(checked, unchecked);
    }

    #[test]
    #[should_panic]
    fn test_unchecked_overrun_panics() {
        let mut buffer = [0u8; 2];
        let mut writer = BlobWriter::<Unchecked>::new(&mut buffer);
        let _ = writer.copy(1u64);
    }
}
