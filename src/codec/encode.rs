//! JSON-to-blob encoding
//!
//! The producer side of the codec. A `serde_json::Value` is walked against
//! the schema and every non-const value is handed to a `BlobSink` in schema
//! order, the same order the decoder reads them back in.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;

use crate::blob::{BlobSink, BlobSizeCalculator, BlobWriter, Validated, MAX_BLOB_LEN};
use crate::tree::{json_f32, json_integer, json_nullable_str, Node, NodeKind, NodeScalar};

use super::decode::DEFAULT_MAX_DEPTH;
use super::errors::{EncodeError, EncodeResult};

/// Writes the blob values of `value` into `sink`.
pub fn encode_value<S: BlobSink>(node: Node<'_>, value: &Value, sink: &mut S) -> EncodeResult<()> {
    Encoder {
        sink,
        max_depth: DEFAULT_MAX_DEPTH,
    }
    .value(node, value, &Path::Root, 0)
}

/// Measures `value`, allocates exactly, and writes it through a validated
/// writer.
pub fn encode_to_blob(node: Node<'_>, value: &Value) -> EncodeResult<Vec<u8>> {
    let mut calc = BlobSizeCalculator::new();
    encode_value(node, value, &mut calc)?;

    let mut buffer = vec![0u8; calc.size()];
    let written = {
        let mut writer = BlobWriter::<Validated>::new(&mut buffer);
        encode_value(node, value, &mut writer)?;
        writer.written()
    };
    debug_assert_eq!(written, buffer.len());
    buffer.truncate(written);
    Ok(buffer)
}

/// Where in the input document a value sits, rendered as `$.a[2].b`.
#[derive(Clone, Copy)]
enum Path<'p> {
    Root,
    Key(&'p Path<'p>, &'p str),
    Index(&'p Path<'p>, usize),
}

impl fmt::Display for Path<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Path::Root => write!(f, "$"),
            Path::Key(parent, key) => write!(f, "{}.{}", parent, key),
            Path::Index(parent, index) => write!(f, "{}[{}]", parent, index),
        }
    }
}

/// Scalars that can be read out of a JSON value.
trait FromJson: NodeScalar + PartialEq {
    const EXPECTED: &'static str;

    fn from_json(value: &Value) -> Option<Self>;
}

macro_rules! impl_from_json {
    ($($ty:ty => $expected:literal, $convert:expr;)*) => {
        $(
            impl FromJson for $ty {
                const EXPECTED: &'static str = $expected;

                fn from_json(value: &Value) -> Option<Self> {
                    ($convert)(value)
                }
            }
        )*
    };
}

impl_from_json! {
    bool => "a boolean", Value::as_bool;
    i32 => "a 32-bit integer", json_integer::<i32>;
    u32 => "an unsigned 32-bit integer", json_integer::<u32>;
    i64 => "a 64-bit integer", json_integer::<i64>;
    u64 => "an unsigned 64-bit integer", json_integer::<u64>;
    f32 => "a number", json_f32;
    f64 => "a number", Value::as_f64;
}

fn mismatch(path: &Path<'_>, expected: &'static str) -> EncodeError {
    EncodeError::TypeMismatch {
        path: path.to_string(),
        expected,
    }
}

struct Encoder<'s, S: BlobSink> {
    sink: &'s mut S,
    max_depth: usize,
}

impl<S: BlobSink> Encoder<'_, S> {
    fn value(&mut self, node: Node<'_>, value: &Value, path: &Path<'_>, depth: usize) -> EncodeResult<()> {
        // const values live in the tree; objects ignore the flag
        if node.is_const() && !node.kind().is_object() {
            return Ok(());
        }

        match node.kind() {
            NodeKind::Null => Ok(()),
            NodeKind::Bool => self.scalar::<bool>(value, path),
            NodeKind::Int32 => self.scalar::<i32>(value, path),
            NodeKind::Uint32 => self.scalar::<u32>(value, path),
            NodeKind::Int64 => self.scalar::<i64>(value, path),
            NodeKind::Uint64 => self.scalar::<u64>(value, path),
            NodeKind::Float32 => self.scalar::<f32>(value, path),
            NodeKind::Float64 => self.scalar::<f64>(value, path),
            NodeKind::BoolArray => self.array::<bool>(node, value, path),
            NodeKind::Int32Array => self.array::<i32>(node, value, path),
            NodeKind::Uint32Array => self.array::<u32>(node, value, path),
            NodeKind::Int64Array => self.array::<i64>(node, value, path),
            NodeKind::Uint64Array => self.array::<u64>(node, value, path),
            NodeKind::Float32Array => self.array::<f32>(node, value, path),
            NodeKind::Float64Array => self.array::<f64>(node, value, path),
            NodeKind::Binary => self.binary(node, value, path),
            NodeKind::String => self.string(node, value, path),
            NodeKind::StringArray => self.string_array(node, value, path),
            NodeKind::Object => self.object(node, value, path, depth),
            NodeKind::ObjectArray => self.object_array(node, value, path, depth),
        }
    }

    fn scalar<T: FromJson>(&mut self, value: &Value, path: &Path<'_>) -> EncodeResult<()> {
        let parsed = T::from_json(value).ok_or_else(|| mismatch(path, T::EXPECTED))?;
        self.sink.put(parsed)?;
        Ok(())
    }

    fn array<T: FromJson>(&mut self, node: Node<'_>, value: &Value, path: &Path<'_>) -> EncodeResult<()> {
        if node.is_enum() {
            let wanted = enum_operand(value, path)?;
            let parsed = T::from_json(wanted).ok_or_else(|| mismatch(path, T::EXPECTED))?;
            let index = node.packed::<T>().iter().position(|choice| choice == parsed);
            return self.put_choice(index, path);
        }

        let items = value.as_array().ok_or_else(|| mismatch(path, "an array"))?;
        let values = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                T::from_json(item).ok_or_else(|| mismatch(&Path::Index(path, i), T::EXPECTED))
            })
            .collect::<EncodeResult<Vec<T>>>()?;

        if node.is_fixed_length() {
            check_len(values.len(), usize::from(node.len()), path)?;
            self.sink.put_fixed(&values, node.len())?;
        } else {
            check_len(values.len(), MAX_BLOB_LEN, path)?;
            self.sink.put_array(&values)?;
        }
        Ok(())
    }

    fn binary(&mut self, node: Node<'_>, value: &Value, path: &Path<'_>) -> EncodeResult<()> {
        let text = value
            .as_str()
            .ok_or_else(|| mismatch(path, "base64 text"))?;
        let bytes = STANDARD.decode(text).map_err(|e| EncodeError::Base64 {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        if node.is_fixed_length() {
            check_len(bytes.len(), usize::from(node.len()), path)?;
            self.sink.put_fixed(&bytes, node.len())?;
        } else {
            check_len(bytes.len(), MAX_BLOB_LEN, path)?;
            self.sink.put_bytes(&bytes)?;
        }
        Ok(())
    }

    fn string(&mut self, node: Node<'_>, value: &Value, path: &Path<'_>) -> EncodeResult<()> {
        let text = value.as_str().ok_or_else(|| mismatch(path, "a string"))?;
        if node.is_fixed_length() {
            self.sink.put_fixed_str(text, node.len())?;
        } else {
            self.sink.put_str(text)?;
        }
        Ok(())
    }

    fn string_array(&mut self, node: Node<'_>, value: &Value, path: &Path<'_>) -> EncodeResult<()> {
        if node.is_enum() {
            let wanted = enum_operand(value, path)?;
            let parsed = json_nullable_str(wanted).ok_or_else(|| mismatch(path, "a string or null"))?;
            let index = node
                .str_table()
                .iter()
                .position(|choice| choice == parsed.map(str::as_bytes));
            return self.put_choice(index, path);
        }

        let items = value.as_array().ok_or_else(|| mismatch(path, "an array"))?;
        let entries = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                json_nullable_str(item).ok_or_else(|| mismatch(&Path::Index(path, i), "a string or null"))
            })
            .collect::<EncodeResult<Vec<Option<&str>>>>()?;
        check_len(entries.len(), MAX_BLOB_LEN, path)?;
        self.sink.put_str_array(&entries)?;
        Ok(())
    }

    fn object(&mut self, node: Node<'_>, value: &Value, path: &Path<'_>, depth: usize) -> EncodeResult<()> {
        self.enter(depth)?;
        let members = value.as_object().ok_or_else(|| mismatch(path, "an object"))?;

        for (i, member) in node.children().enumerate() {
            let writes_nothing = member.kind() == NodeKind::Null
                || (member.is_const() && !member.kind().is_object());
            if writes_nothing {
                continue;
            }

            let Some(name) = member.name() else {
                return Err(EncodeError::MissingMember {
                    path: Path::Index(path, i).to_string(),
                });
            };
            let member_path = Path::Key(path, name);
            let item = members.get(name).ok_or_else(|| EncodeError::MissingMember {
                path: member_path.to_string(),
            })?;
            self.value(member, item, &member_path, depth + 1)?;
        }
        Ok(())
    }

    fn object_array(&mut self, node: Node<'_>, value: &Value, path: &Path<'_>, depth: usize) -> EncodeResult<()> {
        self.enter(depth)?;
        let items = value.as_array().ok_or_else(|| mismatch(path, "an array"))?;

        if node.is_fixed_length() {
            let expected = usize::from(node.len());
            if items.len() != expected {
                return Err(EncodeError::WrongCount {
                    path: path.to_string(),
                    expected,
                    found: items.len(),
                });
            }
            for (i, (element, item)) in node.children().zip(items).enumerate() {
                self.value(element, item, &Path::Index(path, i), depth + 1)?;
            }
            return Ok(());
        }

        check_len(items.len(), MAX_BLOB_LEN, path)?;
        self.sink.put(items.len() as u16)?;
        if items.is_empty() {
            return Ok(());
        }
        let template = node.child(0).ok_or_else(|| EncodeError::MissingTemplate {
            path: path.to_string(),
        })?;
        for (i, item) in items.iter().enumerate() {
            self.value(template, item, &Path::Index(path, i), depth + 1)?;
        }
        Ok(())
    }

    fn put_choice(&mut self, index: Option<usize>, path: &Path<'_>) -> EncodeResult<()> {
        let index = index.ok_or_else(|| EncodeError::UnknownChoice {
            path: path.to_string(),
        })?;
        // choice tables never exceed a u16 count
        self.sink.put(index as u16)?;
        Ok(())
    }

    fn enter(&self, depth: usize) -> EncodeResult<()> {
        if depth >= self.max_depth {
            return Err(EncodeError::DepthExceeded {
                max_depth: self.max_depth,
            });
        }
        Ok(())
    }
}

/// An enum takes either the bare choice or a one-element array.
fn enum_operand<'v>(value: &'v Value, path: &Path<'_>) -> EncodeResult<&'v Value> {
    match value {
        Value::Array(items) if items.len() == 1 => Ok(&items[0]),
        Value::Array(items) => Err(EncodeError::WrongCount {
            path: path.to_string(),
            expected: 1,
            found: items.len(),
        }),
        other => Ok(other),
    }
}

fn check_len(len: usize, max: usize, path: &Path<'_>) -> EncodeResult<()> {
    if len > max {
        return Err(EncodeError::TooLong {
            path: path.to_string(),
            len,
            max,
        });
    }
    Ok(())
}
