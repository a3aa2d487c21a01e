//! Owned schema trees.

use std::fmt;

use crate::arena::{Allocator, BlockAllocator, HeapAllocator};

use super::builder::TreeBuilder;
use super::errors::TreeResult;
use super::node::NodeId;
use super::size::TreeSizeCalculator;
use super::view::Node;

/// A tree together with the allocator that holds it.
///
/// Once built, a tree is only read; `&SchemaTree` can be shared across
/// decoding threads.
pub struct SchemaTree<A: Allocator = HeapAllocator> {
    alloc: A,
    root: NodeId,
}

impl<A: Allocator> SchemaTree<A> {
    /// Allocates an empty root in `alloc`.
    pub fn new(mut alloc: A) -> TreeResult<Self> {
        let root = TreeBuilder::new(&mut alloc).alloc_root()?;
        Ok(Self { alloc, root })
    }

    pub fn root(&self) -> Node<'_> {
        Node::new(self.alloc.memory(), self.root)
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Node<'_> {
        Node::new(self.alloc.memory(), id)
    }

    pub fn builder(&mut self) -> TreeBuilder<'_, A> {
        TreeBuilder::new(&mut self.alloc)
    }

    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    pub fn into_allocator(self) -> A {
        self.alloc
    }
}

impl SchemaTree<HeapAllocator> {
    /// An empty tree on a fresh `HeapAllocator`.
    pub fn with_heap() -> TreeResult<Self> {
        Self::new(HeapAllocator::new())
    }
}

impl SchemaTree<BlockAllocator> {
    /// Deep-copies `src` into a block sized to fit it exactly.
    pub fn exact_copy(src: Node<'_>) -> TreeResult<Self> {
        let mut calc = TreeSizeCalculator::new();
        calc.track_root();
        calc.track_node(src);

        let mut tree = Self::new(BlockAllocator::with_capacity(calc.size()))?;
        let root = tree.root;
        tree.builder().deep_copy(src, root)?;
        Ok(tree)
    }
}

impl<A: Allocator> fmt::Debug for SchemaTree<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaTree")
            .field("root", &self.root())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{compare_trees, CompareFuzz, NodeKind};

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_trees_are_shareable() {
        assert_send_sync::<SchemaTree>();
        assert_send_sync::<SchemaTree<BlockAllocator>>();
    }

    #[test]
    fn test_exact_copy_fills_block() {
        let mut tree = SchemaTree::with_heap().unwrap();
        let root = tree.root_id();
        let mut builder = tree.builder();
        builder.create_object(root, 2).unwrap();
        let name = builder.child(root, 0);
        builder.set_name(name, Some("name")).unwrap();
        builder.declare(name, NodeKind::String);
        let sizes = builder.child(root, 1);
        builder.set_name(sizes, Some("sizes")).unwrap();
        builder.set_array(sizes, &[1u64, 2, 3]).unwrap();

        let copy = SchemaTree::exact_copy(tree.root()).unwrap();
        assert_eq!(copy.allocator().remaining(), 0);
        assert!(compare_trees(tree.root(), copy.root(), CompareFuzz::Strict));
    }
}
