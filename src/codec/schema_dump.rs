//! Schema dump
//!
//! Renders a tree itself as JSON, one object per node. Used by the
//! `schema` command to inspect what a definition file actually built.

use crate::blob::{PackedSlice, Primitive, Validation};
use crate::json::{JsonConsumer, JsonResult, JsonSerializer, WriteJson};
use crate::tree::{Node, NodeKind, NodeValue};

/// Writes the description of `node` and everything below it.
pub fn serialize_schema<C, V>(serial: &mut JsonSerializer<'_, C, V>, node: Node<'_>) -> JsonResult<()>
where
    C: JsonConsumer + ?Sized,
    V: Validation,
{
    serial.open_object()?;

    serial.write_key(b"type")?;
    serial.write_str(node.kind().type_name().as_bytes())?;

    serial.write_key(b"flags")?;
    serial.open_array()?;
    for (set, label) in [
        (node.is_const(), "const"),
        (node.is_fixed_length(), "fixed_length"),
        (node.is_enum(), "enum"),
    ] {
        if set {
            serial.write_str(label.as_bytes())?;
        }
    }
    serial.close_array()?;

    if node.is_const() && !node.kind().is_object() {
        serial.write_key(b"const")?;
        write_stored(serial, node)?;
    }
    if node.is_enum() {
        serial.write_key(b"enum")?;
        write_stored(serial, node)?;
    }
    if node.is_fixed_length() {
        serial.write_key(b"fixed_length")?;
        serial.write_u32(u32::from(node.len()))?;
    }

    match node.kind() {
        NodeKind::Object => {
            serial.write_key(b"properties")?;
            serial.open_object()?;
            for member in node.children() {
                serial.write_key(member.name_bytes().unwrap_or_default())?;
                serialize_schema(serial, member)?;
            }
            serial.close_object()?;
        }
        NodeKind::ObjectArray => {
            if let Some(template) = node.child(0) {
                serial.write_key(b"items")?;
                serialize_schema(serial, template)?;
            }
        }
        _ => {}
    }

    serial.close_object()
}

/// The value a node holds in the tree, in decoded form.
fn write_stored<C, V>(serial: &mut JsonSerializer<'_, C, V>, node: Node<'_>) -> JsonResult<()>
where
    C: JsonConsumer + ?Sized,
    V: Validation,
{
    match node.value() {
        NodeValue::Null | NodeValue::Object(_) | NodeValue::ObjectArray(_) => serial.write_null(),
        NodeValue::Bool(value) => serial.write_bool(value),
        NodeValue::Int32(value) => serial.write_i32(value),
        NodeValue::Uint32(value) => serial.write_u32(value),
        NodeValue::Int64(value) => serial.write_i64(value),
        NodeValue::Uint64(value) => serial.write_u64(value),
        NodeValue::Float32(value) => serial.write_f32(value),
        NodeValue::Float64(value) => serial.write_f64(value),
        NodeValue::BoolArray(values) => write_packed(serial, values),
        NodeValue::Int32Array(values) => write_packed(serial, values),
        NodeValue::Uint32Array(values) => write_packed(serial, values),
        NodeValue::Int64Array(values) => write_packed(serial, values),
        NodeValue::Uint64Array(values) => write_packed(serial, values),
        NodeValue::Float32Array(values) => write_packed(serial, values),
        NodeValue::Float64Array(values) => write_packed(serial, values),
        NodeValue::Binary(bytes) => serial.write_base64(bytes),
        NodeValue::String(text) => serial.write_str(text),
        NodeValue::StringArray(table) => {
            serial.open_array()?;
            for entry in table.iter() {
                match entry {
                    Some(text) => serial.write_str(text)?,
                    None => serial.write_null()?,
                }
            }
            serial.close_array()
        }
    }
}

fn write_packed<C, V, T>(serial: &mut JsonSerializer<'_, C, V>, values: PackedSlice<'_, T>) -> JsonResult<()>
where
    C: JsonConsumer + ?Sized,
    V: Validation,
    T: Primitive + WriteJson,
{
    serial.open_array()?;
    for value in values.iter() {
        value.write_json(serial)?;
    }
    serial.close_array()
}
