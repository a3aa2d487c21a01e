//! Dry-run sizing of a blob.

use super::primitive::{align_for, Primitive};
use super::{encoded_str_len, BLOB_VERSION};

/// Computes the exact byte length a sequence of writes will occupy.
///
/// Call the `track_*` methods in the same order as the matching
/// `BlobWriter::copy_*` calls; `size()` then includes every padding byte
/// and length prefix the writer will produce.
#[derive(Debug, Default, Clone)]
pub struct BlobSizeCalculator {
    counter: usize,
}

impl BlobSizeCalculator {
    /// Layout version this calculator measures.
    pub const VERSION: u32 = BLOB_VERSION;

    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes tracked so far.
    pub fn size(&self) -> usize {
        self.counter
    }

    pub fn track<T: Primitive>(&mut self, _value: T) {
        self.track_n::<T>(1);
    }

    pub fn track_array<T: Primitive>(&mut self, values: &[T]) {
        self.track_array_len::<T>(values.len());
    }

    /// Tracks a variable array of `len` elements without the values.
    pub fn track_array_len<T: Primitive>(&mut self, len: usize) {
        self.track_n::<u16>(1);
        if len > 0 {
            self.track_n::<T>(len);
        }
    }

    pub fn track_fixed<T: Primitive>(&mut self, fixed_len: u16) {
        self.track_n::<T>(usize::from(fixed_len));
    }

    pub fn track_bytes(&mut self, bytes: &[u8]) {
        self.track_n::<u16>(1);
        self.counter += bytes.len();
    }

    pub fn track_str(&mut self, value: &str) {
        self.track_n::<u16>(1);
        self.counter += encoded_str_len(value.len());
    }

    pub fn track_fixed_str(&mut self, fixed_len: u16) {
        self.counter += usize::from(fixed_len);
    }

    pub fn track_str_array(&mut self, values: &[Option<&str>]) {
        self.track_n::<u16>(1);
        for value in values {
            self.track_n::<u16>(1);
            if let Some(s) = value {
                self.counter += encoded_str_len(s.len());
            }
        }
    }

    fn track_n<T: Primitive>(&mut self, count: usize) {
        self.counter = align_for::<T>(self.counter) + count * T::SIZE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_size() {
        assert_eq!(BlobSizeCalculator::new().size(), 0);
    }

    #[test]
    fn test_scalar_padding() {
        let mut calc = BlobSizeCalculator::new();
        calc.track(1u8);
        calc.track(1u64);
        assert_eq!(calc.size(), 16);
    }

    #[test]
    fn test_zero_length_array_counts_prefix_only() {
        let mut calc = BlobSizeCalculator::new();
        calc.track(true);
        calc.track_array::<f64>(&[]);
        assert_eq!(calc.size(), 4);
    }

    #[test]
    fn test_string_and_array_sizes() {
        let mut calc = BlobSizeCalculator::new();
        calc.track_str("abc");
        calc.track_array(&[1i32, 2, 3]);
        // count + "abc\0" ends at 6, next count at 6, elements from 8
        assert_eq!(calc.size(), 20);
    }

    #[test]
    fn test_string_array_size() {
        let mut calc = BlobSizeCalculator::new();
        calc.track_str_array(&[Some("a"), None]);
        assert_eq!(calc.size(), 8);
    }

    #[test]
    fn test_fixed_sizes() {
        let mut calc = BlobSizeCalculator::new();
        calc.track_fixed_str(5);
        calc.track_fixed::<u32>(2);
        assert_eq!(calc.size(), 16);
    }
}
