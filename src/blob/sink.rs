//! One walk, two passes.
//!
//! A `BlobRecord` describes its fields once, against a `BlobSink`. Running
//! the same `record` call against the size calculator and then the writer
//! makes it impossible for the measuring pass and the writing pass to
//! disagree on order.

use super::errors::BlobResult;
use super::primitive::Primitive;
use super::size::BlobSizeCalculator;
use super::validation::{ignore_validation_error, Validated, Validation, ValidationErrorFn};
use super::writer::BlobWriter;

/// A destination for a sequence of packed values.
pub trait BlobSink {
    fn put<T: Primitive>(&mut self, value: T) -> BlobResult<()>;

    fn put_array<T: Primitive>(&mut self, values: &[T]) -> BlobResult<()>;

    fn put_fixed<T: Primitive>(&mut self, values: &[T], fixed_len: u16) -> BlobResult<()>;

    fn put_bytes(&mut self, bytes: &[u8]) -> BlobResult<()>;

    fn put_str(&mut self, value: &str) -> BlobResult<()>;

    fn put_fixed_str(&mut self, value: &str, fixed_len: u16) -> BlobResult<()>;

    fn put_str_array(&mut self, values: &[Option<&str>]) -> BlobResult<()>;
}

impl BlobSink for BlobSizeCalculator {
    fn put<T: Primitive>(&mut self, value: T) -> BlobResult<()> {
        self.track(value);
        Ok(())
    }

    fn put_array<T: Primitive>(&mut self, values: &[T]) -> BlobResult<()> {
        self.track_array(values);
        Ok(())
    }

    fn put_fixed<T: Primitive>(&mut self, _values: &[T], fixed_len: u16) -> BlobResult<()> {
        self.track_fixed::<T>(fixed_len);
        Ok(())
    }

    fn put_bytes(&mut self, bytes: &[u8]) -> BlobResult<()> {
        self.track_bytes(bytes);
        Ok(())
    }

    fn put_str(&mut self, value: &str) -> BlobResult<()> {
        self.track_str(value);
        Ok(())
    }

    fn put_fixed_str(&mut self, _value: &str, fixed_len: u16) -> BlobResult<()> {
        self.track_fixed_str(fixed_len);
        Ok(())
    }

    fn put_str_array(&mut self, values: &[Option<&str>]) -> BlobResult<()> {
        self.track_str_array(values);
        Ok(())
    }
}

impl<V: Validation> BlobSink for BlobWriter<'_, V> {
    fn put<T: Primitive>(&mut self, value: T) -> BlobResult<()> {
        self.copy(value)
    }

    fn put_array<T: Primitive>(&mut self, values: &[T]) -> BlobResult<()> {
        self.copy_array(values)
    }

    fn put_fixed<T: Primitive>(&mut self, values: &[T], fixed_len: u16) -> BlobResult<()> {
        self.copy_fixed(values, fixed_len)
    }

    fn put_bytes(&mut self, bytes: &[u8]) -> BlobResult<()> {
        self.copy_bytes(bytes)
    }

    fn put_str(&mut self, value: &str) -> BlobResult<()> {
        self.copy_str(value)
    }

    fn put_fixed_str(&mut self, value: &str, fixed_len: u16) -> BlobResult<()> {
        self.copy_fixed_str(value, fixed_len)
    }

    fn put_str_array(&mut self, values: &[Option<&str>]) -> BlobResult<()> {
        self.copy_str_array(values)
    }
}

/// A value that knows how to lay itself out in a blob.
pub trait BlobRecord {
    fn record<S: BlobSink>(&self, sink: &mut S) -> BlobResult<()>;
}

/// Measures `record`, allocates exactly, and writes it through a
/// validated writer.
pub fn pack<R: BlobRecord + ?Sized>(record: &R) -> BlobResult<Vec<u8>> {
    pack_with(record, ignore_validation_error)
}

/// `pack` with a validation observer.
pub fn pack_with<R: BlobRecord + ?Sized>(
    record: &R,
    on_error: ValidationErrorFn,
) -> BlobResult<Vec<u8>> {
    let mut calc = BlobSizeCalculator::new();
    record.record(&mut calc)?;

    let mut buffer = vec![0u8; calc.size()];
    let written = {
        let mut writer = BlobWriter::<Validated>::with_error_handler(&mut buffer, on_error);
        record.record(&mut writer)?;
        writer.written()
    };
    debug_assert_eq!(written, buffer.len());
    buffer.truncate(written);
    Ok(buffer)
}
