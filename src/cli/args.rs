//! CLI argument definitions using clap
//!
//! Commands:
//! - eventcodec encode --schema <path> --input <jsonl> --output <frames>
//! - eventcodec decode --schema <path> --input <frames> [--config <path>] [--pretty]
//! - eventcodec schema --schema <path>
//! - eventcodec compare --left <path> --right <path> [--fuzz <mode>]

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::tree::CompareFuzz;

/// eventcodec - schema-driven binary event blobs
#[derive(Parser, Debug)]
#[command(name = "eventcodec")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Pack JSON lines into a frame file
    Encode {
        /// Schema definition file
        #[arg(long)]
        schema: PathBuf,

        /// One JSON event per line
        #[arg(long)]
        input: PathBuf,

        /// Frame file to create
        #[arg(long)]
        output: PathBuf,

        /// Codec configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print every frame of a frame file as JSON
    Decode {
        /// Schema definition file
        #[arg(long)]
        schema: PathBuf,

        /// Frame file to read
        #[arg(long)]
        input: PathBuf,

        /// Codec configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Pretty-print the documents
        #[arg(long)]
        pretty: bool,
    },

    /// Dump the tree a schema definition builds
    Schema {
        /// Schema definition file
        #[arg(long)]
        schema: PathBuf,

        /// Codec configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Compare two schema definitions
    Compare {
        #[arg(long)]
        left: PathBuf,

        #[arg(long)]
        right: PathBuf,

        /// How much member reordering to tolerate
        #[arg(long, value_enum, default_value_t = FuzzArg::Strict)]
        fuzz: FuzzArg,
    },
}

/// Command-line spelling of `CompareFuzz`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FuzzArg {
    Strict,
    NoConstOrder,
    NoOrder,
}

impl From<FuzzArg> for CompareFuzz {
    fn from(arg: FuzzArg) -> Self {
        match arg {
            FuzzArg::Strict => CompareFuzz::Strict,
            FuzzArg::NoConstOrder => CompareFuzz::NoConstOrder,
            FuzzArg::NoOrder => CompareFuzz::NoOrder,
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
