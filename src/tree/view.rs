//! Read-only views over built trees.

use std::fmt;

use crate::blob::{PackedSlice, Primitive};

use super::node::{
    read_u16, read_u32, read_u64, NodeFlags, NodeId, NodeKind, NodeScalar, DATA_AT, FLAGS_AT,
    KIND_AT, LEN_AT, NAME_AT, NAME_LEN_AT, NODE_SIZE, STR_ENTRY_SIZE,
};

/// A borrowed view of one node.
///
/// Views are `Copy` and only read, so any number of them may walk the same
/// tree at once, from any thread.
#[derive(Clone, Copy)]
pub struct Node<'a> {
    memory: &'a [u8],
    at: usize,
}

impl<'a> Node<'a> {
    pub(crate) fn new(memory: &'a [u8], id: NodeId) -> Self {
        Self { memory, at: id.0 }
    }

    pub fn id(&self) -> NodeId {
        NodeId(self.at)
    }

    /// The node's kind. Cells with an unknown kind byte read as `Null`.
    pub fn kind(&self) -> NodeKind {
        NodeKind::from_u8(self.memory[self.at + KIND_AT]).unwrap_or(NodeKind::Null)
    }

    pub fn flags(&self) -> NodeFlags {
        NodeFlags::from_bits_retain(self.memory[self.at + FLAGS_AT])
    }

    /// Element count for arrays and objects, encoded length for strings,
    /// 1 for scalars.
    pub fn len(&self) -> u16 {
        read_u16(self.memory, self.at + LEN_AT)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_const(&self) -> bool {
        self.flags().contains(NodeFlags::CONST)
    }

    pub fn is_fixed_length(&self) -> bool {
        self.flags().contains(NodeFlags::FIXED_LENGTH)
    }

    pub fn is_enum(&self) -> bool {
        self.flags().contains(NodeFlags::ENUM)
    }

    /// The property name, without terminator.
    pub fn name_bytes(&self) -> Option<&'a [u8]> {
        let stored = usize::from(read_u16(self.memory, self.at + NAME_LEN_AT));
        if stored == 0 {
            return None;
        }
        let offset = read_u64(self.memory, self.at + NAME_AT) as usize;
        Some(&self.memory[offset..offset + stored - 1])
    }

    pub fn name(&self) -> Option<&'a str> {
        self.name_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    pub(crate) fn data(&self) -> u64 {
        read_u64(self.memory, self.at + DATA_AT)
    }

    fn payload_offset(&self) -> usize {
        self.data() as usize
    }

    /// The raw payload bytes of kinds with a flat payload.
    pub(crate) fn raw_payload(&self) -> &'a [u8] {
        let len = usize::from(self.len()) * self.kind().element_size();
        if len == 0 {
            return &[];
        }
        let offset = self.payload_offset();
        &self.memory[offset..offset + len]
    }

    pub(crate) fn packed<T: Primitive>(&self) -> PackedSlice<'a, T> {
        PackedSlice::new(self.raw_payload())
    }

    fn scalar<T: NodeScalar>(&self) -> T {
        T::from_data(self.data())
    }

    /// The node's value, one variant per kind.
    pub fn value(&self) -> NodeValue<'a> {
        match self.kind() {
            NodeKind::Null => NodeValue::Null,
            NodeKind::Bool => NodeValue::Bool(self.scalar()),
            NodeKind::Int32 => NodeValue::Int32(self.scalar()),
            NodeKind::Uint32 => NodeValue::Uint32(self.scalar()),
            NodeKind::Int64 => NodeValue::Int64(self.scalar()),
            NodeKind::Uint64 => NodeValue::Uint64(self.scalar()),
            NodeKind::Float32 => NodeValue::Float32(self.scalar()),
            NodeKind::Float64 => NodeValue::Float64(self.scalar()),
            NodeKind::BoolArray => NodeValue::BoolArray(self.packed()),
            NodeKind::Int32Array => NodeValue::Int32Array(self.packed()),
            NodeKind::Uint32Array => NodeValue::Uint32Array(self.packed()),
            NodeKind::Int64Array => NodeValue::Int64Array(self.packed()),
            NodeKind::Uint64Array => NodeValue::Uint64Array(self.packed()),
            NodeKind::Float32Array => NodeValue::Float32Array(self.packed()),
            NodeKind::Float64Array => NodeValue::Float64Array(self.packed()),
            NodeKind::Binary => NodeValue::Binary(self.raw_payload()),
            NodeKind::String => NodeValue::String(crate::blob::strip_terminator(self.raw_payload())),
            NodeKind::StringArray => NodeValue::StringArray(self.str_table()),
            NodeKind::Object => NodeValue::Object(self.children()),
            NodeKind::ObjectArray => NodeValue::ObjectArray(self.children()),
        }
    }

    pub(crate) fn str_table(&self) -> StrTable<'a> {
        StrTable {
            memory: self.memory,
            table: self.payload_offset(),
            len: usize::from(self.len()),
        }
    }

    /// Members of an object, or elements of an object array. Empty for
    /// every other kind.
    pub fn children(&self) -> Children<'a> {
        let count = if self.kind().is_object() {
            usize::from(self.len())
        } else {
            0
        };
        Children {
            memory: self.memory,
            first: self.payload_offset(),
            index: 0,
            count,
        }
    }

    pub fn child(&self, index: usize) -> Option<Node<'a>> {
        self.children().nth(index)
    }

    /// The first member named `name`.
    pub fn find(&self, name: &str) -> Option<Node<'a>> {
        self.children()
            .find(|child| child.name_bytes() == Some(name.as_bytes()))
    }
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind())
            .field("flags", &self.flags())
            .field("len", &self.len())
            .field("name", &self.name())
            .finish()
    }
}

/// The value of a node. Exactly one variant per `NodeKind`.
#[derive(Debug, Clone)]
pub enum NodeValue<'a> {
    Null,
    Bool(bool),
    Int32(i32),
    Uint32(u32),
    Int64(i64),
    Uint64(u64),
    Float32(f32),
    Float64(f64),
    BoolArray(PackedSlice<'a, bool>),
    Int32Array(PackedSlice<'a, i32>),
    Uint32Array(PackedSlice<'a, u32>),
    Int64Array(PackedSlice<'a, i64>),
    Uint64Array(PackedSlice<'a, u64>),
    Float32Array(PackedSlice<'a, f32>),
    Float64Array(PackedSlice<'a, f64>),
    /// Raw bytes.
    Binary(&'a [u8]),
    /// String bytes without the terminator.
    String(&'a [u8]),
    StringArray(StrTable<'a>),
    Object(Children<'a>),
    ObjectArray(Children<'a>),
}

/// Contiguous child cells of an object or object array.
#[derive(Clone)]
pub struct Children<'a> {
    memory: &'a [u8],
    first: usize,
    index: usize,
    count: usize,
}

impl<'a> Iterator for Children<'a> {
    type Item = Node<'a>;

    fn next(&mut self) -> Option<Node<'a>> {
        if self.index >= self.count {
            return None;
        }
        let id = NodeId(self.first + self.index * NODE_SIZE);
        self.index += 1;
        Some(Node::new(self.memory, id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.count - self.index;
        (n, Some(n))
    }

    fn nth(&mut self, n: usize) -> Option<Node<'a>> {
        self.index = self.index.saturating_add(n).min(self.count);
        self.next()
    }
}

impl ExactSizeIterator for Children<'_> {}

impl fmt::Debug for Children<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

/// A string array payload: a table of `(offset u32, len u16, pad)` entries.
/// Entries with length 0 are null.
#[derive(Clone, Copy)]
pub struct StrTable<'a> {
    memory: &'a [u8],
    table: usize,
    len: usize,
}

impl<'a> StrTable<'a> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Entry `index` including its terminator, or `None` if null.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub(crate) fn raw_entry(&self, index: usize) -> Option<&'a [u8]> {
        assert!(index < self.len, "string array index {} out of range", index);
        let at = self.table + index * STR_ENTRY_SIZE;
        let stored = usize::from(read_u16(self.memory, at + 4));
        if stored == 0 {
            return None;
        }
        let offset = read_u32(self.memory, at) as usize;
        Some(&self.memory[offset..offset + stored])
    }

    /// Entry `index` without its terminator, or `None` if null.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn entry(&self, index: usize) -> Option<&'a [u8]> {
        self.raw_entry(index).map(crate::blob::strip_terminator)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = Option<&'a [u8]>> + 'a {
        let table = *self;
        (0..self.len).map(move |i| table.entry(i))
    }
}

impl fmt::Debug for StrTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|e| e.map(String::from_utf8_lossy)))
            .finish()
    }
}
