//! JSON schema definitions
//!
//! A `SchemaDef` is the authoring format for schema trees:
//!
//! ```json
//! {"type": "object", "properties": [
//!     {"name": "id", "type": "int32"},
//!     {"name": "level", "type": "string[]", "enum": ["debug", "info", "warn"]},
//!     {"name": "host", "type": "string", "const": "edge-1"},
//!     {"name": "mac", "type": "binary", "fixed_length": 6}
//! ]}
//! ```

use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::arena::{Allocator, BlockAllocator};
use crate::observability::{Event, Logger};

use super::builder::{FlagStrictness, TreeBuilder};
use super::errors::{TreeError, TreeResult};
use super::node::{NodeFlags, NodeId, NodeKind, NODE_VERSION};
use super::schema::SchemaTree;

/// One node of a schema definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDef {
    /// Property name; required for object members.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type")]
    pub kind: NodeKind,

    /// Element count of a fixed-length array, string, binary or object
    /// array.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_length: Option<u16>,

    /// Value stored in the schema instead of the blob. Binary constants are
    /// base64 text.
    #[serde(default, rename = "const", skip_serializing_if = "Option::is_none")]
    pub constant: Option<Value>,

    /// Choice table of an enum array.
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Value>>,

    /// Members of an object, or of each object array element.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<SchemaDef>,

    /// Node layout version the definition targets. Only read at the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

impl SchemaDef {
    pub fn from_json_str(text: &str) -> TreeResult<Self> {
        serde_json::from_str(text).map_err(|e| TreeError::invalid_definition("$", e.to_string()))
    }

    /// Builds the tree into a block sized to fit it exactly.
    pub fn build(&self, strictness: FlagStrictness) -> TreeResult<SchemaTree<BlockAllocator>> {
        if let Some(version) = self.version {
            if version != NODE_VERSION {
                return Err(TreeError::version_mismatch(NODE_VERSION, version));
            }
        }

        let mut scratch = SchemaTree::with_heap()?;
        let root = scratch.root_id();
        build_node(&mut scratch.builder(), root, self, strictness, "$")?;
        SchemaTree::exact_copy(scratch.root())
    }
}

/// Reads and builds a schema definition file.
pub fn load_schema(
    path: impl AsRef<Path>,
    strictness: FlagStrictness,
) -> TreeResult<SchemaTree<BlockAllocator>> {
    let path = path.as_ref();
    let display = path.display().to_string();

    let result = fs::read_to_string(path)
        .map_err(|e| TreeError::io(display.as_str(), e))
        .and_then(|text| SchemaDef::from_json_str(&text))
        .and_then(|def| def.build(strictness));

    match &result {
        Ok(tree) => Logger::info(
            Event::SchemaLoaded.as_str(),
            &[
                ("bytes", &tree.allocator().capacity().to_string()),
                ("path", &display),
            ],
        ),
        Err(err) => Logger::error(
            Event::SchemaRejected.as_str(),
            &[
                ("code", err.code().code()),
                ("error", &err.to_string()),
                ("path", &display),
            ],
        ),
    }
    result
}

fn build_node<A: Allocator + ?Sized>(
    builder: &mut TreeBuilder<'_, A>,
    id: NodeId,
    def: &SchemaDef,
    strictness: FlagStrictness,
    path: &str,
) -> TreeResult<()> {
    builder.set_name(id, def.name.as_deref())?;

    if !def.properties.is_empty() && !def.kind.is_object() {
        return Err(TreeError::invalid_definition(
            path,
            format!("{} nodes take no properties", def.kind),
        ));
    }

    let kind = def.kind;
    match kind {
        NodeKind::Null => {}
        NodeKind::Bool
        | NodeKind::Int32
        | NodeKind::Uint32
        | NodeKind::Int64
        | NodeKind::Uint64
        | NodeKind::Float32
        | NodeKind::Float64 => match &def.constant {
            Some(value) => set_scalar(builder, id, kind, value, path)?,
            None => builder.declare(id, kind),
        },
        NodeKind::BoolArray
        | NodeKind::Int32Array
        | NodeKind::Uint32Array
        | NodeKind::Int64Array
        | NodeKind::Uint64Array
        | NodeKind::Float32Array
        | NodeKind::Float64Array
        | NodeKind::StringArray => match array_payload(def, path)? {
            Some(values) => set_array(builder, id, kind, values, path)?,
            None => declare_sized(builder, id, kind, def.fixed_length)?,
        },
        NodeKind::String => match &def.constant {
            Some(Value::String(text)) => builder.set_str(id, text)?,
            Some(_) => return Err(TreeError::invalid_definition(path, "const string must be a string")),
            None => declare_sized(builder, id, kind, def.fixed_length)?,
        },
        NodeKind::Binary => match &def.constant {
            Some(Value::String(text)) => {
                let bytes = STANDARD.decode(text).map_err(|e| {
                    TreeError::invalid_definition(path, format!("const binary is not base64: {}", e))
                })?;
                builder.set_binary(id, &bytes)?;
            }
            Some(_) => return Err(TreeError::invalid_definition(path, "const binary must be base64 text")),
            None => declare_sized(builder, id, kind, def.fixed_length)?,
        },
        NodeKind::Object => {
            builder.create_object(id, member_count(def, path)?)?;
            build_members(builder, id, def, strictness, path)?;
        }
        NodeKind::ObjectArray => {
            // a variable array keeps one template element
            let len = def.fixed_length.unwrap_or(1);
            builder.create_object_array(id, member_count(def, path)?, len)?;
            for i in 0..usize::from(len) {
                let element = builder.child(id, i);
                build_members(builder, element, def, strictness, &format!("{}[{}]", path, i))?;
            }
        }
    }

    let mut flags = NodeFlags::NONE;
    if def.constant.is_some() {
        flags |= NodeFlags::CONST;
    }
    if def.fixed_length.is_some() {
        flags |= NodeFlags::FIXED_LENGTH;
    }
    if def.choices.is_some() {
        flags |= NodeFlags::ENUM;
    }
    if !flags.is_empty() {
        builder.set_flags(id, flags, strictness).map_err(|e| {
            TreeError::invalid_definition(path, e.message().to_string())
        })?;
    }
    Ok(())
}

fn build_members<A: Allocator + ?Sized>(
    builder: &mut TreeBuilder<'_, A>,
    object: NodeId,
    def: &SchemaDef,
    strictness: FlagStrictness,
    path: &str,
) -> TreeResult<()> {
    for (i, member) in def.properties.iter().enumerate() {
        let Some(name) = member.name.as_deref() else {
            return Err(TreeError::invalid_definition(
                &format!("{}.properties[{}]", path, i),
                "object members need a name",
            ));
        };
        let child = builder.child(object, i);
        build_node(builder, child, member, strictness, &format!("{}.{}", path, name))?;
    }
    Ok(())
}

fn member_count(def: &SchemaDef, path: &str) -> TreeResult<u16> {
    u16::try_from(def.properties.len()).map_err(|_| {
        TreeError::invalid_definition(path, format!("{} properties exceed the node limit", def.properties.len()))
    })
}

/// The stored array of an array node: its enum choices, else its const
/// value.
fn array_payload<'d>(def: &'d SchemaDef, path: &str) -> TreeResult<Option<&'d [Value]>> {
    if let Some(choices) = &def.choices {
        return Ok(Some(choices));
    }
    match &def.constant {
        Some(Value::Array(values)) => Ok(Some(values)),
        Some(_) => Err(TreeError::invalid_definition(path, "const array must be an array")),
        None => Ok(None),
    }
}

fn declare_sized<A: Allocator + ?Sized>(
    builder: &mut TreeBuilder<'_, A>,
    id: NodeId,
    kind: NodeKind,
    fixed_length: Option<u16>,
) -> TreeResult<()> {
    match fixed_length {
        Some(len) => builder.declare_fixed(id, kind, len),
        None => {
            builder.declare(id, kind);
            Ok(())
        }
    }
}

fn set_scalar<A: Allocator + ?Sized>(
    builder: &mut TreeBuilder<'_, A>,
    id: NodeId,
    kind: NodeKind,
    value: &Value,
    path: &str,
) -> TreeResult<()> {
    let mismatch = || TreeError::invalid_definition(path, format!("const value does not fit {}", kind));
    match kind {
        NodeKind::Bool => builder.set_scalar(id, value.as_bool().ok_or_else(mismatch)?),
        NodeKind::Int32 => builder.set_scalar(id, json_integer::<i32>(value).ok_or_else(mismatch)?),
        NodeKind::Uint32 => builder.set_scalar(id, json_integer::<u32>(value).ok_or_else(mismatch)?),
        NodeKind::Int64 => builder.set_scalar(id, json_integer::<i64>(value).ok_or_else(mismatch)?),
        NodeKind::Uint64 => builder.set_scalar(id, json_integer::<u64>(value).ok_or_else(mismatch)?),
        NodeKind::Float32 => builder.set_scalar(id, json_f32(value).ok_or_else(mismatch)?),
        NodeKind::Float64 => builder.set_scalar(id, value.as_f64().ok_or_else(mismatch)?),
        _ => return Err(mismatch()),
    }
    Ok(())
}

fn set_array<A: Allocator + ?Sized>(
    builder: &mut TreeBuilder<'_, A>,
    id: NodeId,
    kind: NodeKind,
    values: &[Value],
    path: &str,
) -> TreeResult<()> {
    let mismatch = || TreeError::invalid_definition(path, format!("array entries do not fit {}", kind));
    match kind {
        NodeKind::BoolArray => builder.set_array(id, &collect(values, Value::as_bool).ok_or_else(mismatch)?),
        NodeKind::Int32Array => builder.set_array(id, &collect(values, json_integer::<i32>).ok_or_else(mismatch)?),
        NodeKind::Uint32Array => builder.set_array(id, &collect(values, json_integer::<u32>).ok_or_else(mismatch)?),
        NodeKind::Int64Array => builder.set_array(id, &collect(values, json_integer::<i64>).ok_or_else(mismatch)?),
        NodeKind::Uint64Array => builder.set_array(id, &collect(values, json_integer::<u64>).ok_or_else(mismatch)?),
        NodeKind::Float32Array => builder.set_array(id, &collect(values, json_f32).ok_or_else(mismatch)?),
        NodeKind::Float64Array => builder.set_array(id, &collect(values, Value::as_f64).ok_or_else(mismatch)?),
        NodeKind::StringArray => {
            let entries = collect(values, json_nullable_str).ok_or_else(mismatch)?;
            builder.set_str_array(id, &entries)
        }
        _ => Err(mismatch()),
    }
}

fn collect<'v, T>(values: &'v [Value], convert: impl Fn(&'v Value) -> Option<T>) -> Option<Vec<T>> {
    values.iter().map(convert).collect()
}

/// An integer JSON number that fits `T`.
pub(crate) fn json_integer<T>(value: &Value) -> Option<T>
where
    T: TryFrom<i64> + TryFrom<u64>,
{
    if let Some(n) = value.as_i64() {
        return <T as TryFrom<i64>>::try_from(n).ok();
    }
    value
        .as_u64()
        .and_then(|n| <T as TryFrom<u64>>::try_from(n).ok())
}

pub(crate) fn json_f32(value: &Value) -> Option<f32> {
    value.as_f64().map(|f| f as f32)
}

/// A string entry; `null` is a null entry.
pub(crate) fn json_nullable_str(value: &Value) -> Option<Option<&str>> {
    match value {
        Value::String(text) => Some(Some(text)),
        Value::Null => Some(None),
        _ => None,
    }
}
