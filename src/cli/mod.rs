//! CLI module for eventcodec
//!
//! Provides command-line interface for:
//! - encode: JSON lines to a frame file
//! - decode: frame file to JSON documents on stdout
//! - schema: dump the tree a definition builds
//! - compare: structural comparison of two definitions

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, FuzzArg};
pub use commands::{compare, decode, dump_schema, encode, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
