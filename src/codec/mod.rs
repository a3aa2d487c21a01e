//! Schema-driven codec
//!
//! Ties the pieces together: a schema tree says what an event looks like,
//! the blob layer moves its values, the JSON layer prints them.
//!
//! # Design Principles
//!
//! 1. The schema walk is the only source of order. Encoder and decoder
//!    visit members in tree order and skip const nodes the same way
//! 2. Decoding streams: values go from the blob view to the consumer
//!    without an intermediate document
//! 3. The validation mode is chosen by the caller's type parameter; the
//!    walk itself has no runtime mode switch
//!
//! # Invariants Enforced
//!
//! - A blob produced by `encode_to_blob` for a tree decodes against the
//!   same tree
//! - Enum indices are range-checked in both modes
//! - Nesting never exceeds `DecodeOptions::max_depth`

mod decode;
mod encode;
mod errors;
mod schema_dump;

pub use decode::{
    decode_into, decode_to_string, measure_json, serialize_blob, serialize_tree,
    serialize_tree_with, DecodeOptions, DEFAULT_MAX_DEPTH,
};
pub use encode::{encode_to_blob, encode_value};
pub use errors::{DecodeError, DecodeResult, EncodeError, EncodeResult};
pub use schema_dump::serialize_schema;
