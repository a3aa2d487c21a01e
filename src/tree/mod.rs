//! Schema trees
//!
//! A schema tree describes the shape of one kind of event: which values
//! it carries, in which order, and which of them are constants stored in
//! the tree rather than the blob.
//!
//! # Design Principles
//!
//! 1. Nodes are 24-byte cells inside one allocator region, addressed by
//!    `NodeId` offsets; there are no pointers to fix up when a tree moves
//! 2. Every walk dispatches on `NodeKind` with an exhaustive match
//! 3. Building and measuring follow the same allocation sequence, so a
//!    measured tree fits a `BlockAllocator` exactly
//! 4. Built trees are immutable and freely shared between readers
//!
//! # Invariants Enforced
//!
//! - `ENUM` and `CONST` never coexist; `CONST | FIXED_LENGTH` only under
//!   `Lenient`, where `CONST` takes precedence
//! - `ENUM` only appears on non-empty, non-object arrays
//! - A failed `deep_copy` leaves its destination empty with every partial
//!   allocation returned
//! - Object array elements and their members come from one allocation

mod builder;
mod compare;
mod definition;
mod errors;
mod node;
mod schema;
mod size;
mod view;

pub use builder::{FlagStrictness, TreeBuilder};
pub use compare::{compare_trees, CompareFuzz};
pub use definition::{load_schema, SchemaDef};
pub use errors::{TreeError, TreeErrorCode, TreeResult};
pub use node::{NodeFlags, NodeId, NodeKind, NodeScalar, NODE_SIZE, NODE_VERSION};
pub use schema::SchemaTree;
pub use size::TreeSizeCalculator;
pub use view::{Children, Node, NodeValue, StrTable};

pub(crate) use definition::{json_f32, json_integer, json_nullable_str};
