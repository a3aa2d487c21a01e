//! eventcodec - schema-driven binary blobs for structured log events
//!
//! A producer packs only the changing values of an event into a flat blob.
//! A consumer holding the schema tree turns the blob back into JSON.

pub mod arena;
pub mod blob;
pub mod cli;
pub mod codec;
pub mod config;
pub mod json;
pub mod observability;
pub mod tree;
