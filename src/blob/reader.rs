//! Blob reader
//!
//! The mirror of `BlobWriter`. Every read returns a view into the blob, so
//! decoded values live exactly as long as the blob itself.

use std::marker::PhantomData;

use super::errors::{BlobError, BlobResult};
use super::primitive::{align_for, align_up, PackedSlice, Primitive};
use super::validation::{ignore_validation_error, Unchecked, Validation, ValidationErrorFn};
use super::{strip_terminator, until_nul, BLOB_VERSION};

/// Reads packed values out of a borrowed blob.
///
/// With `Validated` every read checks the remaining length and fails with
/// `EVC_BLOB_TRUNCATED`. With `Unchecked` reads trust the schema; a short
/// blob panics on the slice bound.
pub struct BlobReader<'a, V: Validation = Unchecked> {
    buffer: &'a [u8],
    read: usize,
    on_error: ValidationErrorFn,
    _mode: PhantomData<V>,
}

impl<'a, V: Validation> BlobReader<'a, V> {
    /// Layout version this reader understands.
    pub const VERSION: u32 = BLOB_VERSION;

    pub fn new(buffer: &'a [u8]) -> Self {
        Self::with_error_handler(buffer, ignore_validation_error)
    }

    /// Creates a reader that reports failures to `on_error`.
    pub fn with_error_handler(buffer: &'a [u8], on_error: ValidationErrorFn) -> Self {
        Self {
            buffer,
            read: 0,
            on_error,
            _mode: PhantomData,
        }
    }

    /// Offset of the next read, padding included.
    pub fn position(&self) -> usize {
        self.read
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.read)
    }

    /// Reads one value at its natural alignment.
    pub fn read<T: Primitive>(&mut self) -> BlobResult<T> {
        self.read = align_for::<T>(self.read);
        let bytes = self.take(T::SIZE)?;
        Ok(T::read_le(bytes))
    }

    /// Reads a count-prefixed array.
    pub fn read_array<T: Primitive>(&mut self) -> BlobResult<PackedSlice<'a, T>> {
        let len: u16 = self.read()?;
        if len == 0 {
            return Ok(PackedSlice::empty());
        }

        self.read = align_for::<T>(self.read);
        let bytes = self.take(usize::from(len) * T::SIZE)?;
        Ok(PackedSlice::new(bytes))
    }

    /// Reads an array whose length comes from the schema.
    pub fn read_fixed<T: Primitive>(&mut self, fixed_len: u16) -> BlobResult<PackedSlice<'a, T>> {
        self.read = align_for::<T>(self.read);
        let bytes = self.take(usize::from(fixed_len) * T::SIZE)?;
        Ok(PackedSlice::new(bytes))
    }

    /// Reads a count-prefixed byte array.
    pub fn read_bytes(&mut self) -> BlobResult<&'a [u8]> {
        let len: u16 = self.read()?;
        self.take(usize::from(len))
    }

    /// Reads a fixed-length byte array.
    pub fn read_fixed_bytes(&mut self, fixed_len: u16) -> BlobResult<&'a [u8]> {
        self.take(usize::from(fixed_len))
    }

    /// Reads a variable string, without its terminator.
    pub fn read_str(&mut self) -> BlobResult<&'a [u8]> {
        self.read_bytes().map(strip_terminator)
    }

    /// Reads a fixed-length string up to its first NUL.
    pub fn read_fixed_str(&mut self, fixed_len: u16) -> BlobResult<&'a [u8]> {
        self.read_fixed_bytes(fixed_len).map(until_nul)
    }

    /// Reads a string array. The entries are scanned (and checked) here;
    /// iterating the result afterwards cannot fail.
    pub fn read_str_array(&mut self) -> BlobResult<StrArray<'a>> {
        let count: u16 = self.read()?;
        let start = self.read;
        for _ in 0..count {
            let len: u16 = self.read()?;
            self.take(usize::from(len))?;
        }
        Ok(StrArray {
            buffer: self.buffer,
            start,
            count,
        })
    }

    /// Forwards a diagnostic found by the caller to the validation
    /// callback. A no-op on unchecked readers.
    pub fn report_error(&self, message: &str) {
        if V::ENABLED {
            (self.on_error)(message);
        }
    }

    fn take(&mut self, len: usize) -> BlobResult<&'a [u8]> {
        if V::ENABLED {
            let available = self.remaining();
            if len > available {
                let err = BlobError::truncated(len, available, self.read);
                (self.on_error)(&err.to_string());
                return Err(err);
            }
        }

        let start = self.read;
        self.read = start + len;
        Ok(&self.buffer[start..self.read])
    }
}

/// A string array read from a blob.
#[derive(Debug, Clone, Copy)]
pub struct StrArray<'a> {
    buffer: &'a [u8],
    start: usize,
    count: u16,
}

impl<'a> StrArray<'a> {
    pub fn len(&self) -> usize {
        usize::from(self.count)
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Entries in order; `None` for entries written as null.
    pub fn iter(&self) -> StrArrayIter<'a> {
        StrArrayIter {
            buffer: self.buffer,
            offset: self.start,
            remaining: self.count,
        }
    }
}

impl<'a> IntoIterator for StrArray<'a> {
    type Item = Option<&'a [u8]>;
    type IntoIter = StrArrayIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the entries of a `StrArray`.
#[derive(Debug, Clone)]
pub struct StrArrayIter<'a> {
    buffer: &'a [u8],
    offset: usize,
    remaining: u16,
}

impl<'a> Iterator for StrArrayIter<'a> {
    type Item = Option<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        self.offset = align_up(self.offset, u16::SIZE);
        let len = usize::from(u16::read_le(&self.buffer[self.offset..]));
        self.offset += u16::SIZE;
        if len == 0 {
            return Some(None);
        }

        let raw = &self.buffer[self.offset..self.offset + len];
        self.offset += len;
        Some(Some(strip_terminator(raw)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = usize::from(self.remaining);
        (n, Some(n))
    }
}

impl ExactSizeIterator for StrArrayIter<'_> {}
