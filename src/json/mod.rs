//! JSON text emission
//!
//! `JsonSerializer` writes one document as a stream of fragments into a
//! `JsonConsumer`. Nothing is buffered beyond the current number, so the
//! same walk can measure a document (`JsonLengthCounter`), print it into a
//! fixed buffer (`JsonPrinter`) or collect it (`String`, `Vec<u8>`).
//!
//! # Invariants Enforced
//!
//! - Output is valid UTF-8 and every string is escaped
//! - Under `Validated`, structural misuse is an error and nothing further
//!   is written for the failing call

mod consumer;
mod errors;
mod serializer;

pub use consumer::{JsonConsumer, JsonLengthCounter, JsonPrinter};
pub use errors::{JsonError, JsonResult};
pub use serializer::{JsonConfig, JsonSerializer, WriteJson};
