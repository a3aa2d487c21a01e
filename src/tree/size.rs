//! Tree size calculation.
//!
//! Mirrors the allocations `TreeBuilder` makes so that a tree can be built
//! or copied into a `BlockAllocator` of exactly the right size.

use crate::arena::fixup_alignment;

use super::node::{NodeKind, NodeScalar, NODE_SIZE, STR_ENTRY_SIZE};
use super::view::Node;

/// Accumulates the aligned size of the allocations a tree needs.
#[derive(Debug, Clone, Default)]
pub struct TreeSizeCalculator {
    size: usize,
}

impl TreeSizeCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total bytes tracked so far.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn track_root(&mut self) {
        self.add(NODE_SIZE);
    }

    pub fn track_object(&mut self, property_count: u16) {
        self.add(NODE_SIZE * usize::from(property_count));
    }

    pub fn track_object_array(&mut self, property_count: u16, len: u16) {
        self.add(NODE_SIZE * (usize::from(property_count) + 1) * usize::from(len));
    }

    pub fn track_name(&mut self, name: &str) {
        self.add(name.len() + 1);
    }

    pub fn track_str(&mut self, value: &str) {
        self.add(value.len() + 1);
    }

    pub fn track_array<T: NodeScalar>(&mut self, len: usize) {
        self.add(len * T::SIZE);
    }

    pub fn track_binary(&mut self, len: usize) {
        self.add(len);
    }

    pub fn track_str_array(&mut self, values: &[Option<&str>]) {
        self.track_str_entries(values.iter().map(|v| v.map(str::len)), values.len());
    }

    /// Everything a deep copy of `node` allocates, its name included but
    /// not its own cell.
    pub fn track_node(&mut self, node: Node<'_>) {
        if let Some(name) = node.name_bytes() {
            self.add(name.len() + 1);
        }

        match node.kind() {
            NodeKind::StringArray => {
                let table = node.str_table();
                self.track_str_entries(table.iter().map(|e| e.map(<[u8]>::len)), table.len());
            }
            NodeKind::Object => {
                self.track_object(node.len());
                for member in node.children() {
                    self.track_node(member);
                }
            }
            NodeKind::ObjectArray => {
                let props = node.child(0).map_or(0, |element| element.len());
                self.track_object_array(props, node.len());
                for element in node.children() {
                    if let Some(name) = element.name_bytes() {
                        self.add(name.len() + 1);
                    }
                    for member in element.children() {
                        self.track_node(member);
                    }
                }
            }
            _ => self.add(node.raw_payload().len()),
        }
    }

    fn track_str_entries(&mut self, lens: impl Iterator<Item = Option<usize>>, count: usize) {
        if count == 0 {
            return;
        }
        self.add(count * STR_ENTRY_SIZE);
        for len in lens.flatten() {
            self.add(len + 1);
        }
    }

    fn add(&mut self, bytes: usize) {
        self.size += fixup_alignment(bytes);
    }
}
