//! Node cell layout, kinds and flags.
//!
//! A node is a 24-byte cell inside an allocator's memory:
//!
//! ```text
//! 0      1       2     4          6     8             16            24
//! | kind | flags | len | name_len | pad | name offset | data        |
//! ```
//!
//! `name_len` counts the terminator; 0 means unnamed. `data` holds the
//! scalar value (bool, i64, u64 or f64 bits) or the offset of the payload.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use crate::blob::Primitive;

/// Version of the node cell layout.
pub const NODE_VERSION: u32 = 0;

/// Size of one node cell.
pub const NODE_SIZE: usize = 24;

/// Size of one string-array table entry.
pub(crate) const STR_ENTRY_SIZE: usize = 8;

pub(crate) const KIND_AT: usize = 0;
pub(crate) const FLAGS_AT: usize = 1;
pub(crate) const LEN_AT: usize = 2;
pub(crate) const NAME_LEN_AT: usize = 4;
pub(crate) const NAME_AT: usize = 8;
pub(crate) const DATA_AT: usize = 16;

/// The kind of value a node describes.
///
/// Discriminants are part of the cell layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeKind {
    #[serde(rename = "null")]
    Null = 0,
    #[serde(rename = "bool")]
    Bool = 1,
    #[serde(rename = "bool[]")]
    BoolArray = 2,
    #[serde(rename = "int32")]
    Int32 = 3,
    #[serde(rename = "int32[]")]
    Int32Array = 4,
    #[serde(rename = "uint32")]
    Uint32 = 5,
    #[serde(rename = "uint32[]")]
    Uint32Array = 6,
    #[serde(rename = "int64")]
    Int64 = 7,
    #[serde(rename = "int64[]")]
    Int64Array = 8,
    #[serde(rename = "uint64")]
    Uint64 = 9,
    #[serde(rename = "uint64[]")]
    Uint64Array = 10,
    #[serde(rename = "float64")]
    Float64 = 11,
    #[serde(rename = "float64[]")]
    Float64Array = 12,
    #[serde(rename = "float32")]
    Float32 = 13,
    #[serde(rename = "float32[]")]
    Float32Array = 14,
    #[serde(rename = "binary")]
    Binary = 15,
    #[serde(rename = "string")]
    String = 16,
    #[serde(rename = "string[]")]
    StringArray = 17,
    #[serde(rename = "object")]
    Object = 18,
    #[serde(rename = "object[]")]
    ObjectArray = 19,
}

impl NodeKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => NodeKind::Null,
            1 => NodeKind::Bool,
            2 => NodeKind::BoolArray,
            3 => NodeKind::Int32,
            4 => NodeKind::Int32Array,
            5 => NodeKind::Uint32,
            6 => NodeKind::Uint32Array,
            7 => NodeKind::Int64,
            8 => NodeKind::Int64Array,
            9 => NodeKind::Uint64,
            10 => NodeKind::Uint64Array,
            11 => NodeKind::Float64,
            12 => NodeKind::Float64Array,
            13 => NodeKind::Float32,
            14 => NodeKind::Float32Array,
            15 => NodeKind::Binary,
            16 => NodeKind::String,
            17 => NodeKind::StringArray,
            18 => NodeKind::Object,
            19 => NodeKind::ObjectArray,
            _ => return None,
        })
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Name used in schema definitions and schema dumps.
    pub fn type_name(self) -> &'static str {
        match self {
            NodeKind::Null => "null",
            NodeKind::Bool => "bool",
            NodeKind::BoolArray => "bool[]",
            NodeKind::Int32 => "int32",
            NodeKind::Int32Array => "int32[]",
            NodeKind::Uint32 => "uint32",
            NodeKind::Uint32Array => "uint32[]",
            NodeKind::Int64 => "int64",
            NodeKind::Int64Array => "int64[]",
            NodeKind::Uint64 => "uint64",
            NodeKind::Uint64Array => "uint64[]",
            NodeKind::Float64 => "float64",
            NodeKind::Float64Array => "float64[]",
            NodeKind::Float32 => "float32",
            NodeKind::Float32Array => "float32[]",
            NodeKind::Binary => "binary",
            NodeKind::String => "string",
            NodeKind::StringArray => "string[]",
            NodeKind::Object => "object",
            NodeKind::ObjectArray => "object[]",
        }
    }

    /// Single-value kinds stored inline in the cell.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            NodeKind::Bool
                | NodeKind::Int32
                | NodeKind::Uint32
                | NodeKind::Int64
                | NodeKind::Uint64
                | NodeKind::Float32
                | NodeKind::Float64
        )
    }

    /// Array kinds other than object arrays; the only kinds that may be
    /// enums.
    pub fn is_value_array(self) -> bool {
        matches!(
            self,
            NodeKind::BoolArray
                | NodeKind::Int32Array
                | NodeKind::Uint32Array
                | NodeKind::Int64Array
                | NodeKind::Uint64Array
                | NodeKind::Float32Array
                | NodeKind::Float64Array
                | NodeKind::StringArray
        )
    }

    pub fn is_object(self) -> bool {
        matches!(self, NodeKind::Object | NodeKind::ObjectArray)
    }

    /// Bytes per payload element for kinds with a flat payload, 0 otherwise.
    pub(crate) fn element_size(self) -> usize {
        match self {
            NodeKind::BoolArray | NodeKind::Binary | NodeKind::String => 1,
            NodeKind::Int32Array | NodeKind::Uint32Array | NodeKind::Float32Array => 4,
            NodeKind::Int64Array | NodeKind::Uint64Array | NodeKind::Float64Array => 8,
            NodeKind::StringArray => STR_ENTRY_SIZE,
            NodeKind::Object | NodeKind::ObjectArray => NODE_SIZE,
            _ => 0,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Node flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeFlags(u8);

impl NodeFlags {
    pub const NONE: NodeFlags = NodeFlags(0);
    /// The value lives in the node, never in the blob.
    pub const CONST: NodeFlags = NodeFlags(0x01);
    /// The length comes from the schema; the blob carries no count.
    pub const FIXED_LENGTH: NodeFlags = NodeFlags(0x02);
    /// The blob carries a u16 index into the node's own array.
    pub const ENUM: NodeFlags = NodeFlags(0x04);

    const KNOWN: u8 = 0x07;

    /// Keeps every bit, known or not.
    pub const fn from_bits_retain(bits: u8) -> Self {
        NodeFlags(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: NodeFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: NodeFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: NodeFlags) {
        self.0 &= !other.0;
    }

    /// Bits no released layout defines.
    pub const fn unknown_bits(self) -> u8 {
        self.0 & !Self::KNOWN
    }
}

impl BitOr for NodeFlags {
    type Output = NodeFlags;

    fn bitor(self, rhs: NodeFlags) -> NodeFlags {
        NodeFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for NodeFlags {
    fn bitor_assign(&mut self, rhs: NodeFlags) {
        self.0 |= rhs.0;
    }
}

/// Handle to a node cell inside an allocator's memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Offset of the cell in allocator memory.
    pub fn offset(self) -> usize {
        self.0
    }
}

/// Scalar types a node can hold directly or as an array.
pub trait NodeScalar: Primitive {
    const SCALAR_KIND: NodeKind;
    const ARRAY_KIND: NodeKind;

    /// Encoding in the cell's data slot.
    fn to_data(self) -> u64;

    fn from_data(data: u64) -> Self;
}

impl NodeScalar for bool {
    const SCALAR_KIND: NodeKind = NodeKind::Bool;
    const ARRAY_KIND: NodeKind = NodeKind::BoolArray;

    fn to_data(self) -> u64 {
        u64::from(self)
    }

    fn from_data(data: u64) -> Self {
        data != 0
    }
}

impl NodeScalar for i32 {
    const SCALAR_KIND: NodeKind = NodeKind::Int32;
    const ARRAY_KIND: NodeKind = NodeKind::Int32Array;

    fn to_data(self) -> u64 {
        i64::from(self) as u64
    }

    fn from_data(data: u64) -> Self {
        data as i64 as i32
    }
}

impl NodeScalar for u32 {
    const SCALAR_KIND: NodeKind = NodeKind::Uint32;
    const ARRAY_KIND: NodeKind = NodeKind::Uint32Array;

    fn to_data(self) -> u64 {
        u64::from(self)
    }

    fn from_data(data: u64) -> Self {
        data as u32
    }
}

impl NodeScalar for i64 {
    const SCALAR_KIND: NodeKind = NodeKind::Int64;
    const ARRAY_KIND: NodeKind = NodeKind::Int64Array;

    fn to_data(self) -> u64 {
        self as u64
    }

    fn from_data(data: u64) -> Self {
        data as i64
    }
}

impl NodeScalar for u64 {
    const SCALAR_KIND: NodeKind = NodeKind::Uint64;
    const ARRAY_KIND: NodeKind = NodeKind::Uint64Array;

    fn to_data(self) -> u64 {
        self
    }

    fn from_data(data: u64) -> Self {
        data
    }
}

// Float32 shares the f64 slot.
impl NodeScalar for f32 {
    const SCALAR_KIND: NodeKind = NodeKind::Float32;
    const ARRAY_KIND: NodeKind = NodeKind::Float32Array;

    fn to_data(self) -> u64 {
        f64::from(self).to_bits()
    }

    fn from_data(data: u64) -> Self {
        f64::from_bits(data) as f32
    }
}

impl NodeScalar for f64 {
    const SCALAR_KIND: NodeKind = NodeKind::Float64;
    const ARRAY_KIND: NodeKind = NodeKind::Float64Array;

    fn to_data(self) -> u64 {
        self.to_bits()
    }

    fn from_data(data: u64) -> Self {
        f64::from_bits(data)
    }
}

pub(crate) fn read_u16(memory: &[u8], at: usize) -> u16 {
    u16::read_le(&memory[at..])
}

pub(crate) fn read_u32(memory: &[u8], at: usize) -> u32 {
    u32::read_le(&memory[at..])
}

pub(crate) fn read_u64(memory: &[u8], at: usize) -> u64 {
    u64::read_le(&memory[at..])
}

pub(crate) fn write_u16(memory: &mut [u8], at: usize, value: u16) {
    value.write_le(&mut memory[at..]);
}

pub(crate) fn write_u32(memory: &mut [u8], at: usize, value: u32) {
    value.write_le(&mut memory[at..]);
}

pub(crate) fn write_u64(memory: &mut [u8], at: usize, value: u64) {
    value.write_le(&mut memory[at..]);
}
