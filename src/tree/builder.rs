//! Tree construction
//!
//! `TreeBuilder` populates node cells inside an allocator. Every payload
//! (child cells, arrays, strings, names) is copied into allocator memory,
//! so a finished tree borrows nothing from its inputs.
//!
//! Setters expect an empty node (`Null`, length 0). Populating a node twice
//! is a programmer error and panics. Allocation failure is returned.

use crate::arena::{Allocator, Span};
use crate::blob::strip_terminator;
use crate::observability::{Event, Logger};

use super::errors::{TreeError, TreeResult};
use super::node::{
    read_u16, read_u32, read_u64, write_u16, write_u32, write_u64, NodeFlags, NodeId, NodeKind,
    NodeScalar, DATA_AT, FLAGS_AT, KIND_AT, LEN_AT, NAME_AT, NAME_LEN_AT, NODE_SIZE,
    STR_ENTRY_SIZE,
};
use super::view::Node;

/// How `set_flags` treats combinations that are legal but meaningless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlagStrictness {
    /// Repair or accept them and log a warning.
    #[default]
    Lenient,
    /// Reject them. For schema authoring tools.
    Strict,
}

/// Builds and tears down nodes inside an allocator.
pub struct TreeBuilder<'a, A: Allocator + ?Sized> {
    alloc: &'a mut A,
}

impl<'a, A: Allocator + ?Sized> TreeBuilder<'a, A> {
    pub fn new(alloc: &'a mut A) -> Self {
        Self { alloc }
    }

    /// Read-only view of a node.
    pub fn node(&self, id: NodeId) -> Node<'_> {
        Node::new(self.alloc.memory(), id)
    }

    /// Allocates a detached, empty node to serve as a root.
    pub fn alloc_root(&mut self) -> TreeResult<NodeId> {
        let span = self.allocate(NODE_SIZE)?;
        Ok(NodeId(span.offset()))
    }

    /// Child `index` of an object, or element `index` of an object array.
    ///
    /// # Panics
    ///
    /// Panics if the node has no such child.
    pub fn child(&self, id: NodeId, index: usize) -> NodeId {
        let node = self.node(id);
        assert!(
            node.kind().is_object() && index < usize::from(node.len()),
            "{} node has no child {}",
            node.kind(),
            index
        );
        NodeId(node.data() as usize + index * NODE_SIZE)
    }

    /// Turns an empty node into an object with `property_count` empty
    /// members.
    pub fn create_object(&mut self, id: NodeId, property_count: u16) -> TreeResult<()> {
        self.assert_empty(id);
        let span = self.allocate(NODE_SIZE * usize::from(property_count))?;
        self.write_cell(id, NodeKind::Object, property_count, span.offset() as u64);
        Ok(())
    }

    /// Turns an empty node into an array of `len` objects with
    /// `property_count` members each.
    ///
    /// Element cells and all of their member cells come from a single
    /// allocation: elements first, then each element's members in turn.
    pub fn create_object_array(
        &mut self,
        id: NodeId,
        property_count: u16,
        len: u16,
    ) -> TreeResult<()> {
        self.assert_empty(id);
        let props = usize::from(property_count);
        let count = usize::from(len);
        let span = self.allocate(NODE_SIZE * (props + 1) * count)?;

        let base = span.offset();
        let members = base + NODE_SIZE * count;
        for i in 0..count {
            let element = NodeId(base + i * NODE_SIZE);
            let first = members + i * props * NODE_SIZE;
            self.write_cell(element, NodeKind::Object, property_count, first as u64);
        }
        self.write_cell(id, NodeKind::ObjectArray, len, base as u64);
        Ok(())
    }

    /// Gives an empty node a kind without a value: the schema of a field
    /// whose value comes from the blob.
    ///
    /// # Panics
    ///
    /// Panics for object kinds; use `create_object` or
    /// `create_object_array`.
    pub fn declare(&mut self, id: NodeId, kind: NodeKind) {
        self.assert_empty(id);
        assert!(!kind.is_object(), "{} nodes are built with create_object", kind);
        let len = if kind.is_scalar() { 1 } else { 0 };
        self.write_cell(id, kind, len, 0);
    }

    /// Gives an empty node a kind and a zero-filled payload of `len`
    /// elements: the schema of a fixed-length field.
    ///
    /// # Panics
    ///
    /// Panics for kinds without a flat payload.
    pub fn declare_fixed(&mut self, id: NodeId, kind: NodeKind, len: u16) -> TreeResult<()> {
        self.assert_empty(id);
        let size = kind.element_size();
        assert!(size > 0 && !kind.is_object(), "{} nodes have no flat payload", kind);
        self.alloc_payload(id, kind, len, usize::from(len) * size)
            .map(|_| ())
    }

    pub fn set_scalar<T: NodeScalar>(&mut self, id: NodeId, value: T) {
        self.assert_empty(id);
        self.write_cell(id, T::SCALAR_KIND, 1, value.to_data());
    }

    pub fn set_array<T: NodeScalar>(&mut self, id: NodeId, values: &[T]) -> TreeResult<()> {
        self.assert_empty(id);
        let len = checked_len("array", values.len())?;
        let span = self.alloc_payload(id, T::ARRAY_KIND, len, values.len() * T::SIZE)?;

        let out = self.alloc.bytes_mut(span);
        for (chunk, &value) in out.chunks_exact_mut(T::SIZE).zip(values) {
            value.write_le(chunk);
        }
        Ok(())
    }

    pub fn set_binary(&mut self, id: NodeId, bytes: &[u8]) -> TreeResult<()> {
        self.assert_empty(id);
        let len = checked_len("binary", bytes.len())?;
        let span = self.alloc_payload(id, NodeKind::Binary, len, bytes.len())?;
        self.alloc.bytes_mut(span).copy_from_slice(bytes);
        Ok(())
    }

    /// Stores a string with its terminator; the node's length counts it.
    pub fn set_str(&mut self, id: NodeId, value: &str) -> TreeResult<()> {
        self.assert_empty(id);
        self.set_terminated(id, value.as_bytes())
    }

    /// Stores a string array. `None` entries stay null.
    pub fn set_str_array(&mut self, id: NodeId, values: &[Option<&str>]) -> TreeResult<()> {
        self.assert_empty(id);
        self.fill_str_array(
            id,
            values.iter().map(|v| v.map(str::as_bytes)),
            values.len(),
        )
    }

    /// Replaces the node's name. `None` removes it.
    pub fn set_name(&mut self, id: NodeId, name: Option<&str>) -> TreeResult<()> {
        self.set_name_bytes(id, name.map(str::as_bytes))
    }

    /// Sets the node's flags after checking the combination.
    ///
    /// Unknown bits, `ENUM` on anything but a non-empty value array, and
    /// (under `Strict`) every questionable combination are rejected without
    /// touching the node. Under `Lenient`, `CONST | FIXED_LENGTH` is kept
    /// with a warning (readers check `CONST` first) and `ENUM | CONST`
    /// loses `CONST`.
    pub fn set_flags(
        &mut self,
        id: NodeId,
        flags: NodeFlags,
        strictness: FlagStrictness,
    ) -> TreeResult<()> {
        let node = self.node(id);
        let kind = node.kind();
        let len = node.len();
        let mut flags = flags;

        if flags.unknown_bits() != 0 {
            return Err(reject(kind, flags, "unknown flag bits"));
        }

        if flags.contains(NodeFlags::CONST | NodeFlags::FIXED_LENGTH) {
            if strictness == FlagStrictness::Strict {
                return Err(reject(kind, flags, "const and fixed-length are mutually exclusive"));
            }
            adjusted(kind, flags, "const and fixed-length together; const takes precedence");
        }

        if flags.contains(NodeFlags::ENUM | NodeFlags::CONST) {
            if strictness == FlagStrictness::Strict {
                return Err(reject(kind, flags, "enum and const are mutually exclusive"));
            }
            flags.remove(NodeFlags::CONST);
            adjusted(kind, flags, "dropped const from an enum node");
        }

        if flags.contains(NodeFlags::ENUM) {
            if len == 0 {
                return Err(reject(kind, flags, "enum requires a non-empty choice array"));
            }
            if !kind.is_value_array() {
                return Err(reject(kind, flags, "enum is only valid on non-object arrays"));
            }
        }

        let fixed = flags.contains(NodeFlags::FIXED_LENGTH);
        let constant = flags.contains(NodeFlags::CONST);
        let ineffective = match kind {
            NodeKind::Object => fixed || constant,
            NodeKind::ObjectArray => constant,
            _ => fixed && (kind.is_scalar() || kind == NodeKind::Null),
        };
        if ineffective {
            let reason = format!("flags have no effect on {} nodes", kind);
            if strictness == FlagStrictness::Strict {
                return Err(reject(kind, flags, reason));
            }
            adjusted(kind, flags, &reason);
        }

        self.write_flags(id, flags);
        Ok(())
    }

    /// Recursively copies `src` (from any tree) into the empty node `dest`.
    ///
    /// On failure `dest` is torn down to an empty node with every partial
    /// allocation released.
    pub fn deep_copy(&mut self, src: Node<'_>, dest: NodeId) -> TreeResult<()> {
        self.assert_empty(dest);
        let result = self.copy_node(src, dest);
        if result.is_err() {
            self.clear(dest);
        }
        result
    }

    /// Releases every payload reachable from `id`, children first, and
    /// resets the node to empty.
    pub fn clear(&mut self, id: NodeId) {
        let (kind, len, data) = {
            let node = self.node(id);
            (node.kind(), usize::from(node.len()), node.data() as usize)
        };

        match kind {
            NodeKind::Null
            | NodeKind::Bool
            | NodeKind::Int32
            | NodeKind::Uint32
            | NodeKind::Int64
            | NodeKind::Uint64
            | NodeKind::Float32
            | NodeKind::Float64 => {}
            NodeKind::BoolArray
            | NodeKind::Int32Array
            | NodeKind::Uint32Array
            | NodeKind::Int64Array
            | NodeKind::Uint64Array
            | NodeKind::Float32Array
            | NodeKind::Float64Array
            | NodeKind::Binary
            | NodeKind::String => {
                if len > 0 {
                    self.alloc
                        .dealloc(Span::new(data, len * kind.element_size()));
                }
            }
            NodeKind::StringArray => {
                if len > 0 {
                    for i in 0..len {
                        let at = data + i * STR_ENTRY_SIZE;
                        let memory = self.alloc.memory();
                        let stored = usize::from(read_u16(memory, at + 4));
                        if stored > 0 {
                            let offset = read_u32(memory, at) as usize;
                            self.alloc.dealloc(Span::new(offset, stored));
                        }
                    }
                    self.alloc.dealloc(Span::new(data, len * STR_ENTRY_SIZE));
                }
            }
            NodeKind::Object => {
                for i in 0..len {
                    self.clear(NodeId(data + i * NODE_SIZE));
                }
                self.alloc.dealloc(Span::new(data, len * NODE_SIZE));
            }
            NodeKind::ObjectArray => {
                // members belong to the array's single allocation
                let props = if len > 0 {
                    usize::from(read_u16(self.alloc.memory(), data + LEN_AT))
                } else {
                    0
                };
                for i in 0..len {
                    let element = NodeId(data + i * NODE_SIZE);
                    let first = read_u64(self.alloc.memory(), element.0 + DATA_AT) as usize;
                    for j in 0..props {
                        self.clear(NodeId(first + j * NODE_SIZE));
                    }
                    self.release_name(element);
                }
                self.alloc
                    .dealloc(Span::new(data, NODE_SIZE * (props + 1) * len));
            }
        }

        self.release_name(id);
        self.alloc.memory_mut()[id.0..id.0 + NODE_SIZE].fill(0);
    }

    fn copy_node(&mut self, src: Node<'_>, dest: NodeId) -> TreeResult<()> {
        self.set_name_bytes(dest, src.name_bytes())?;

        let kind = src.kind();
        match kind {
            NodeKind::Null => {}
            NodeKind::Bool
            | NodeKind::Int32
            | NodeKind::Uint32
            | NodeKind::Int64
            | NodeKind::Uint64
            | NodeKind::Float32
            | NodeKind::Float64 => self.write_cell(dest, kind, src.len(), src.data()),
            NodeKind::BoolArray
            | NodeKind::Int32Array
            | NodeKind::Uint32Array
            | NodeKind::Int64Array
            | NodeKind::Uint64Array
            | NodeKind::Float32Array
            | NodeKind::Float64Array
            | NodeKind::Binary
            | NodeKind::String => {
                let raw = src.raw_payload();
                let span = self.alloc_payload(dest, kind, src.len(), raw.len())?;
                self.alloc.bytes_mut(span).copy_from_slice(raw);
            }
            NodeKind::StringArray => {
                let table = src.str_table();
                let entries = (0..table.len()).map(|i| table.raw_entry(i).map(strip_terminator));
                self.fill_str_array(dest, entries, table.len())?;
            }
            NodeKind::Object => {
                self.create_object(dest, src.len())?;
                for (i, member) in src.children().enumerate() {
                    let target = self.child(dest, i);
                    self.copy_node(member, target)?;
                }
            }
            NodeKind::ObjectArray => {
                let props = src.child(0).map_or(0, |element| element.len());
                self.create_object_array(dest, props, src.len())?;
                for (i, element) in src.children().enumerate() {
                    let target = self.child(dest, i);
                    self.set_name_bytes(target, element.name_bytes())?;
                    self.write_flags(target, element.flags());
                    for (j, member) in element.children().enumerate() {
                        let member_target = self.child(target, j);
                        self.copy_node(member, member_target)?;
                    }
                }
            }
        }

        self.write_flags(dest, src.flags());
        Ok(())
    }

    fn set_terminated(&mut self, id: NodeId, bytes: &[u8]) -> TreeResult<()> {
        let stored = bytes.len() + 1;
        let len = checked_len("string", stored)?;
        let span = self.alloc_payload(id, NodeKind::String, len, stored)?;
        let out = self.alloc.bytes_mut(span);
        out[..bytes.len()].copy_from_slice(bytes);
        out[bytes.len()] = 0;
        Ok(())
    }

    fn fill_str_array<'s>(
        &mut self,
        id: NodeId,
        entries: impl Iterator<Item = Option<&'s [u8]>>,
        count: usize,
    ) -> TreeResult<()> {
        let len = checked_len("string array", count)?;
        let table = self.alloc_payload(id, NodeKind::StringArray, len, count * STR_ENTRY_SIZE)?;

        for (i, entry) in entries.enumerate() {
            let Some(bytes) = entry else {
                continue;
            };
            if let Err(err) = self.store_str_entry(table, i, bytes) {
                self.clear(id);
                return Err(err);
            }
        }
        Ok(())
    }

    fn store_str_entry(&mut self, table: Span, index: usize, bytes: &[u8]) -> TreeResult<()> {
        let stored = checked_len("string", bytes.len() + 1)?;
        let span = self.allocate(bytes.len() + 1)?;
        let offset = match u32::try_from(span.offset()) {
            Ok(offset) => offset,
            Err(_) => {
                self.alloc.dealloc(span);
                return Err(TreeError::length_overflow("string table offset", span.offset()));
            }
        };

        let memory = self.alloc.memory_mut();
        memory[span.offset()..span.offset() + bytes.len()].copy_from_slice(bytes);
        let at = table.offset() + index * STR_ENTRY_SIZE;
        write_u32(memory, at, offset);
        write_u16(memory, at + 4, stored);
        Ok(())
    }

    fn set_name_bytes(&mut self, id: NodeId, name: Option<&[u8]>) -> TreeResult<()> {
        self.release_name(id);
        let Some(bytes) = name else {
            return Ok(());
        };

        let stored = checked_len("name", bytes.len() + 1)?;
        let span = self.allocate(bytes.len() + 1)?;
        let memory = self.alloc.memory_mut();
        memory[span.offset()..span.offset() + bytes.len()].copy_from_slice(bytes);
        write_u16(memory, id.0 + NAME_LEN_AT, stored);
        write_u64(memory, id.0 + NAME_AT, span.offset() as u64);
        Ok(())
    }

    fn release_name(&mut self, id: NodeId) {
        let memory = self.alloc.memory();
        let stored = usize::from(read_u16(memory, id.0 + NAME_LEN_AT));
        if stored == 0 {
            return;
        }
        let offset = read_u64(memory, id.0 + NAME_AT) as usize;
        self.alloc.dealloc(Span::new(offset, stored));

        let memory = self.alloc.memory_mut();
        write_u16(memory, id.0 + NAME_LEN_AT, 0);
        write_u64(memory, id.0 + NAME_AT, 0);
    }

    /// Allocates `bytes` of payload (none when zero) and points the node
    /// at it.
    fn alloc_payload(
        &mut self,
        id: NodeId,
        kind: NodeKind,
        len: u16,
        bytes: usize,
    ) -> TreeResult<Span> {
        let span = if bytes == 0 {
            Span::new(0, 0)
        } else {
            self.allocate(bytes)?
        };
        self.write_cell(id, kind, len, span.offset() as u64);
        Ok(span)
    }

    fn allocate(&mut self, size: usize) -> TreeResult<Span> {
        self.alloc.alloc(size).map_err(|cause| {
            Logger::error(
                Event::ArenaExhausted.as_str(),
                &[
                    ("reason", &cause.to_string()),
                    ("requested", &size.to_string()),
                ],
            );
            TreeError::out_of_memory(size, cause)
        })
    }

    fn assert_empty(&self, id: NodeId) {
        let node = self.node(id);
        assert!(
            node.kind() == NodeKind::Null && node.len() == 0,
            "node at offset {} is already populated as {}",
            id.0,
            node.kind()
        );
    }

    fn write_cell(&mut self, id: NodeId, kind: NodeKind, len: u16, data: u64) {
        let memory = self.alloc.memory_mut();
        memory[id.0 + KIND_AT] = kind.as_u8();
        write_u16(memory, id.0 + LEN_AT, len);
        write_u64(memory, id.0 + DATA_AT, data);
    }

    fn write_flags(&mut self, id: NodeId, flags: NodeFlags) {
        self.alloc.memory_mut()[id.0 + FLAGS_AT] = flags.bits();
    }
}

fn checked_len(what: &str, len: usize) -> TreeResult<u16> {
    u16::try_from(len).map_err(|_| TreeError::length_overflow(what, len))
}

fn reject(kind: NodeKind, flags: NodeFlags, reason: impl Into<String>) -> TreeError {
    let reason = reason.into();
    Logger::error(
        Event::FlagsRejected.as_str(),
        &[
            ("flags", &format!("0x{:02x}", flags.bits())),
            ("kind", kind.type_name()),
            ("reason", &reason),
        ],
    );
    TreeError::flags_rejected(flags, reason)
}

fn adjusted(kind: NodeKind, flags: NodeFlags, reason: &str) {
    Logger::warn(
        Event::FlagsAdjusted.as_str(),
        &[
            ("flags", &format!("0x{:02x}", flags.bits())),
            ("kind", kind.type_name()),
            ("reason", reason),
        ],
    );
}
