//! Structural tree comparison.

use super::node::NodeKind;
use super::view::Node;

/// How much member reordering `compare_trees` tolerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompareFuzz {
    /// Members must appear in the same order.
    #[default]
    Strict,
    /// Const members may appear in any order; the rest keep theirs.
    NoConstOrder,
    /// Members may appear in any order.
    NoOrder,
}

/// Whether two trees describe the same wire shape and constant values.
///
/// Kind, flags, length and name are compared first, then the payload.
/// Floats compare by bit pattern. The fuzz mode applies at every nesting
/// level, to object members and object array elements alike.
pub fn compare_trees(a: Node<'_>, b: Node<'_>, fuzz: CompareFuzz) -> bool {
    if a.kind() != b.kind()
        || a.flags() != b.flags()
        || a.len() != b.len()
        || a.name_bytes() != b.name_bytes()
    {
        return false;
    }

    match a.kind() {
        NodeKind::Null => true,
        NodeKind::Bool
        | NodeKind::Int32
        | NodeKind::Uint32
        | NodeKind::Int64
        | NodeKind::Uint64
        | NodeKind::Float32
        | NodeKind::Float64 => a.data() == b.data(),
        NodeKind::BoolArray
        | NodeKind::Int32Array
        | NodeKind::Uint32Array
        | NodeKind::Int64Array
        | NodeKind::Uint64Array
        | NodeKind::Float32Array
        | NodeKind::Float64Array
        | NodeKind::Binary
        | NodeKind::String => a.raw_payload() == b.raw_payload(),
        NodeKind::StringArray => a.str_table().iter().eq(b.str_table().iter()),
        NodeKind::Object | NodeKind::ObjectArray => compare_members(a, b, fuzz),
    }
}

fn compare_members(a: Node<'_>, b: Node<'_>, fuzz: CompareFuzz) -> bool {
    match fuzz {
        CompareFuzz::Strict => in_order(a.children(), b.children(), fuzz),
        CompareFuzz::NoConstOrder => {
            let (a_const, a_rest): (Vec<_>, Vec<_>) = a.children().partition(Node::is_const);
            let (b_const, b_rest): (Vec<_>, Vec<_>) = b.children().partition(Node::is_const);
            a_rest.len() == b_rest.len()
                && in_order(a_rest.into_iter(), b_rest.into_iter(), fuzz)
                && matched(&a_const, &b_const, fuzz)
        }
        CompareFuzz::NoOrder => {
            let a_all: Vec<_> = a.children().collect();
            let b_all: Vec<_> = b.children().collect();
            matched(&a_all, &b_all, fuzz)
        }
    }
}

fn in_order<'a, 'b>(
    mut a: impl Iterator<Item = Node<'a>>,
    mut b: impl Iterator<Item = Node<'b>>,
    fuzz: CompareFuzz,
) -> bool {
    loop {
        match (a.next(), b.next()) {
            (Some(x), Some(y)) if compare_trees(x, y, fuzz) => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Greedy matching: each member of `a` takes the first unused equal
/// member of `b`.
fn matched(a: &[Node<'_>], b: &[Node<'_>], fuzz: CompareFuzz) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    a.iter().all(|&x| {
        match (0..b.len()).find(|&j| !used[j] && compare_trees(x, b[j], fuzz)) {
            Some(j) => {
                used[j] = true;
                true
            }
            None => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{FlagStrictness, NodeFlags, SchemaTree};

    /// `{level: const, host: const, seq: u64}` with members in the given
    /// order.
    fn record(order: &[&str]) -> SchemaTree {
        let mut tree = SchemaTree::with_heap().unwrap();
        let root = tree.root_id();
        let mut builder = tree.builder();
        builder.create_object(root, order.len() as u16).unwrap();
        for (i, name) in order.iter().enumerate() {
            let member = builder.child(root, i);
            builder.set_name(member, Some(name)).unwrap();
            match *name {
                "level" => {
                    builder.set_scalar(member, 3u32);
                    builder
                        .set_flags(member, NodeFlags::CONST, FlagStrictness::Strict)
                        .unwrap();
                }
                "host" => {
                    builder.set_str(member, "edge-1").unwrap();
                    builder
                        .set_flags(member, NodeFlags::CONST, FlagStrictness::Strict)
                        .unwrap();
                }
                _ => builder.declare(member, NodeKind::Uint64),
            }
        }
        tree
    }

    #[test]
    fn test_identical_trees_equal() {
        let a = record(&["level", "host", "seq"]);
        let b = record(&["level", "host", "seq"]);
        assert!(compare_trees(a.root(), b.root(), CompareFuzz::Strict));
    }

    #[test]
    fn test_const_reorder() {
        let a = record(&["level", "host", "seq"]);
        let b = record(&["host", "level", "seq"]);
        assert!(!compare_trees(a.root(), b.root(), CompareFuzz::Strict));
        assert!(compare_trees(a.root(), b.root(), CompareFuzz::NoConstOrder));
        assert!(compare_trees(a.root(), b.root(), CompareFuzz::NoOrder));
    }

    #[test]
    fn test_value_reorder_needs_no_order() {
        let a = record(&["seq", "level", "host"]);
        let b = record(&["level", "seq", "host"]);
        // the const members keep their relative order, but seq moves
        assert!(!compare_trees(a.root(), b.root(), CompareFuzz::Strict));
        assert!(compare_trees(a.root(), b.root(), CompareFuzz::NoConstOrder));

        let c = record(&["seq", "extra", "level"]);
        let d = record(&["extra", "seq", "level"]);
        assert!(!compare_trees(c.root(), d.root(), CompareFuzz::NoConstOrder));
        assert!(compare_trees(c.root(), d.root(), CompareFuzz::NoOrder));
    }

    /// Object array of `{id: u32}` elements holding the given ids.
    fn rows(ids: &[u32]) -> SchemaTree {
        let mut tree = SchemaTree::with_heap().unwrap();
        let root = tree.root_id();
        let mut builder = tree.builder();
        builder.create_object_array(root, 1, ids.len() as u16).unwrap();
        for (i, &id) in ids.iter().enumerate() {
            let member = builder.child(builder.child(root, i), 0);
            builder.set_name(member, Some("id")).unwrap();
            builder.set_scalar(member, id);
        }
        tree
    }

    #[test]
    fn test_object_array_elements_reorder() {
        let a = rows(&[1, 2]);
        let b = rows(&[2, 1]);
        assert!(!compare_trees(a.root(), b.root(), CompareFuzz::Strict));
        // elements are not const, so they keep their order here
        assert!(!compare_trees(a.root(), b.root(), CompareFuzz::NoConstOrder));
        assert!(compare_trees(a.root(), b.root(), CompareFuzz::NoOrder));

        let c = rows(&[1, 3]);
        assert!(!compare_trees(a.root(), c.root(), CompareFuzz::NoOrder));
    }

    #[test]
    fn test_float_bitwise() {
        let mut a = SchemaTree::with_heap().unwrap();
        let mut b = SchemaTree::with_heap().unwrap();
        let (ra, rb) = (a.root_id(), b.root_id());
        a.builder().set_scalar(ra, 0.0f64);
        b.builder().set_scalar(rb, -0.0f64);
        assert!(!compare_trees(a.root(), b.root(), CompareFuzz::Strict));
    }

    #[test]
    fn test_name_difference() {
        let a = record(&["seq"]);
        let b = record(&["other"]);
        assert!(!compare_trees(a.root(), b.root(), CompareFuzz::NoOrder));
    }
}
