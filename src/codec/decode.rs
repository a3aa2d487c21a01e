//! Tree-to-JSON decoding
//!
//! The schema tree drives the walk. Const values come out of the tree, every
//! other value is read from the blob in schema order, and each value is
//! handed straight to the serializer.

use crate::blob::{
    ignore_validation_error, strip_terminator, BlobReader, Validation, ValidationErrorFn,
};
use crate::json::{
    JsonConfig, JsonConsumer, JsonLengthCounter, JsonPrinter, JsonSerializer, WriteJson,
};
use crate::tree::{Node, NodeKind, NodeScalar};

use super::errors::{DecodeError, DecodeResult};

/// Object nesting allowed before a walk gives up.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Knobs for the blob convenience entry points.
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    /// Nesting ceiling, enforced in both validation modes.
    pub max_depth: usize,
    pub json: JsonConfig,
    /// Receives diagnostics from validated readers.
    pub on_error: ValidationErrorFn,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            json: JsonConfig::default(),
            on_error: ignore_validation_error,
        }
    }
}

/// Serializes `node` with the values `reader` yields for it.
///
/// Does not call `finish`; a caller may embed the result in a larger
/// document.
pub fn serialize_tree<C, S, V>(
    serial: &mut JsonSerializer<'_, C, S>,
    node: Node<'_>,
    reader: &mut BlobReader<'_, V>,
) -> DecodeResult<()>
where
    C: JsonConsumer + ?Sized,
    S: Validation,
    V: Validation,
{
    serialize_tree_with(serial, node, reader, DEFAULT_MAX_DEPTH)
}

/// `serialize_tree` with an explicit nesting ceiling.
pub fn serialize_tree_with<C, S, V>(
    serial: &mut JsonSerializer<'_, C, S>,
    node: Node<'_>,
    reader: &mut BlobReader<'_, V>,
    max_depth: usize,
) -> DecodeResult<()>
where
    C: JsonConsumer + ?Sized,
    S: Validation,
    V: Validation,
{
    Walk {
        serial,
        reader,
        max_depth,
    }
    .value(node, 0)
}

/// Decodes one whole blob as one finished document.
pub fn serialize_blob<C, V>(
    serial: &mut JsonSerializer<'_, C, V>,
    node: Node<'_>,
    blob: &[u8],
    options: &DecodeOptions,
) -> DecodeResult<()>
where
    C: JsonConsumer + ?Sized,
    V: Validation,
{
    let mut reader = BlobReader::<V>::with_error_handler(blob, options.on_error);
    serialize_tree_with(serial, node, &mut reader, options.max_depth)?;
    serial.finish()?;
    Ok(())
}

pub fn decode_to_string<V: Validation>(
    node: Node<'_>,
    blob: &[u8],
    options: &DecodeOptions,
) -> DecodeResult<String> {
    let mut out = String::new();
    let mut serial = JsonSerializer::<_, V>::with_config(&mut out, options.json);
    serialize_blob(&mut serial, node, blob, options)?;
    Ok(out)
}

/// Bytes the document needs, terminator included.
pub fn measure_json<V: Validation>(
    node: Node<'_>,
    blob: &[u8],
    options: &DecodeOptions,
) -> DecodeResult<usize> {
    let mut counter = JsonLengthCounter::new();
    let mut serial = JsonSerializer::<_, V>::with_config(&mut counter, options.json);
    serialize_blob(&mut serial, node, blob, options)?;
    Ok(counter.len())
}

/// Prints the document into `buffer` followed by a NUL and returns the
/// text length. A buffer shorter than `measure_json` reports is an error;
/// its contents are then a truncated prefix.
pub fn decode_into<V: Validation>(
    node: Node<'_>,
    blob: &[u8],
    buffer: &mut [u8],
    options: &DecodeOptions,
) -> DecodeResult<usize> {
    let capacity = buffer.len();
    let mut printer = JsonPrinter::new(buffer);
    let mut serial = JsonSerializer::<_, V>::with_config(&mut printer, options.json);
    serialize_blob(&mut serial, node, blob, options)?;
    if printer.overflowed() {
        return Err(DecodeError::BufferTooSmall { capacity });
    }
    Ok(printer.written())
}

struct Walk<'w, 'c, 'b, C: JsonConsumer + ?Sized, S: Validation, V: Validation> {
    serial: &'w mut JsonSerializer<'c, C, S>,
    reader: &'w mut BlobReader<'b, V>,
    max_depth: usize,
}

impl<C: JsonConsumer + ?Sized, S: Validation, V: Validation> Walk<'_, '_, '_, C, S, V> {
    fn value(&mut self, node: Node<'_>, depth: usize) -> DecodeResult<()> {
        match node.kind() {
            NodeKind::Null => self.serial.write_null()?,
            NodeKind::Bool => self.scalar::<bool>(node)?,
            NodeKind::Int32 => self.scalar::<i32>(node)?,
            NodeKind::Uint32 => self.scalar::<u32>(node)?,
            NodeKind::Int64 => self.scalar::<i64>(node)?,
            NodeKind::Uint64 => self.scalar::<u64>(node)?,
            NodeKind::Float32 => self.scalar::<f32>(node)?,
            NodeKind::Float64 => self.scalar::<f64>(node)?,
            NodeKind::BoolArray => self.array::<bool>(node)?,
            NodeKind::Int32Array => self.array::<i32>(node)?,
            NodeKind::Uint32Array => self.array::<u32>(node)?,
            NodeKind::Int64Array => self.array::<i64>(node)?,
            NodeKind::Uint64Array => self.array::<u64>(node)?,
            NodeKind::Float32Array => self.array::<f32>(node)?,
            NodeKind::Float64Array => self.array::<f64>(node)?,
            NodeKind::Binary => self.binary(node)?,
            NodeKind::String => self.string(node)?,
            NodeKind::StringArray => self.string_array(node)?,
            NodeKind::Object => self.object(node, depth)?,
            NodeKind::ObjectArray => self.object_array(node, depth)?,
        }
        Ok(())
    }

    fn scalar<T: NodeScalar + WriteJson>(&mut self, node: Node<'_>) -> DecodeResult<()> {
        let value = if node.is_const() {
            T::from_data(node.data())
        } else {
            self.reader.read::<T>()?
        };
        value.write_json(self.serial)?;
        Ok(())
    }

    fn array<T: NodeScalar + WriteJson>(&mut self, node: Node<'_>) -> DecodeResult<()> {
        self.serial.open_array()?;
        if node.is_enum() {
            let index = self.enum_index(node)?;
            if let Some(choice) = node.packed::<T>().get(index) {
                choice.write_json(self.serial)?;
            }
        } else {
            let values = if node.is_const() {
                node.packed::<T>()
            } else if node.is_fixed_length() {
                self.reader.read_fixed::<T>(node.len())?
            } else {
                self.reader.read_array::<T>()?
            };
            for value in values.iter() {
                value.write_json(self.serial)?;
            }
        }
        self.serial.close_array()?;
        Ok(())
    }

    fn binary(&mut self, node: Node<'_>) -> DecodeResult<()> {
        let bytes = if node.is_const() {
            node.raw_payload()
        } else if node.is_fixed_length() {
            self.reader.read_fixed_bytes(node.len())?
        } else {
            self.reader.read_bytes()?
        };
        self.serial.write_base64(bytes)?;
        Ok(())
    }

    fn string(&mut self, node: Node<'_>) -> DecodeResult<()> {
        let text = if node.is_const() {
            strip_terminator(node.raw_payload())
        } else if node.is_fixed_length() {
            self.reader.read_fixed_str(node.len())?
        } else {
            self.reader.read_str()?
        };
        self.serial.write_str(text)?;
        Ok(())
    }

    // FixedLength is ignored here: string arrays always carry their count.
    fn string_array(&mut self, node: Node<'_>) -> DecodeResult<()> {
        self.serial.open_array()?;
        if node.is_enum() {
            let index = self.enum_index(node)?;
            self.entry(node.str_table().entry(index))?;
        } else if node.is_const() {
            for entry in node.str_table().iter() {
                self.entry(entry)?;
            }
        } else {
            for entry in self.reader.read_str_array()?.iter() {
                self.entry(entry)?;
            }
        }
        self.serial.close_array()?;
        Ok(())
    }

    fn object(&mut self, node: Node<'_>, depth: usize) -> DecodeResult<()> {
        self.enter(depth)?;
        self.serial.open_object()?;
        for member in node.children() {
            if let Some(name) = member.name_bytes() {
                self.serial.write_key(name)?;
            }
            self.value(member, depth + 1)?;
        }
        self.serial.close_object()?;
        Ok(())
    }

    fn object_array(&mut self, node: Node<'_>, depth: usize) -> DecodeResult<()> {
        self.enter(depth)?;
        self.serial.open_array()?;
        if node.is_fixed_length() {
            for element in node.children() {
                self.value(element, depth + 1)?;
            }
        } else {
            let count: u16 = self.reader.read()?;
            if count > 0 {
                let template = node.child(0).ok_or(DecodeError::MissingTemplate)?;
                for _ in 0..count {
                    self.value(template, depth + 1)?;
                }
            }
        }
        self.serial.close_array()?;
        Ok(())
    }

    fn entry(&mut self, entry: Option<&[u8]>) -> DecodeResult<()> {
        match entry {
            Some(text) => self.serial.write_str(text)?,
            None => self.serial.write_null()?,
        }
        Ok(())
    }

    /// Reads an enum index and checks it against the choice table.
    fn enum_index(&mut self, node: Node<'_>) -> DecodeResult<usize> {
        let index: u16 = self.reader.read()?;
        if index >= node.len() {
            let err = DecodeError::EnumOutOfRange {
                index,
                len: node.len(),
            };
            self.reader.report_error(&err.to_string());
            return Err(err);
        }
        Ok(usize::from(index))
    }

    fn enter(&self, depth: usize) -> DecodeResult<()> {
        if depth >= self.max_depth {
            return Err(DecodeError::DepthExceeded {
                max_depth: self.max_depth,
            });
        }
        Ok(())
    }
}
