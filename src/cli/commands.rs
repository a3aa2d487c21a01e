//! CLI command implementations
//!
//! Each command loads its schema once, then streams: encode packs one
//! input line per frame, decode prints one document per frame.
//!
//! A decode failure confined to one event is logged and the frame skipped.
//! A corrupt frame stream stops the command.

use std::io::{self, Write};
use std::path::Path;

use crate::blob::{Unchecked, Validated};
use crate::codec::{decode_to_string, encode_to_blob, serialize_schema, DecodeError};
use crate::config::CodecConfig;
use crate::json::JsonSerializer;
use crate::observability::{log_event, CodecMetrics, Event, Logger, MetricsSnapshot};
use crate::tree::{compare_trees, load_schema, CompareFuzz, FlagStrictness};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{create_frames, open_frames, read_json_lines, write_document};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cmd {
        Command::Encode {
            schema,
            input,
            output,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            encode(&schema, &input, &output, &config).map(|_| ())
        }
        Command::Decode {
            schema,
            input,
            config,
            pretty,
        } => {
            let mut config = load_config(config.as_deref())?;
            config.pretty |= pretty;
            decode(&schema, &input, &config, &mut out).map(|_| ())
        }
        Command::Schema { schema, config } => {
            let config = load_config(config.as_deref())?;
            dump_schema(&schema, &config, &mut out)
        }
        Command::Compare { left, right, fuzz } => {
            if compare(&left, &right, fuzz.into(), &mut out)? {
                Ok(())
            } else {
                Err(CliError::schemas_differ())
            }
        }
    }
}

fn load_config(path: Option<&Path>) -> CliResult<CodecConfig> {
    let config = match path {
        Some(path) => CodecConfig::load(path)?,
        None => CodecConfig::default(),
    };
    Logger::set_min_severity(config.log_level);
    Ok(config)
}

/// Packs every line of `input` into one frame of `output`.
///
/// The first line that does not fit the schema stops the command.
pub fn encode(
    schema: &Path,
    input: &Path,
    output: &Path,
    config: &CodecConfig,
) -> CliResult<MetricsSnapshot> {
    let tree = load_schema(schema, config.flag_strictness())?;
    let mut frames = create_frames(output)?;
    let metrics = CodecMetrics::new();

    for item in read_json_lines(input)? {
        let (line, value) = item?;
        let blob = encode_to_blob(tree.root(), &value).map_err(|e| CliError::encode_failed(line, e))?;
        frames.write_frame(&blob)?;
        metrics.record_encoded(blob.len());
        Logger::trace(
            Event::BlobEncoded.as_str(),
            &[("bytes", &blob.len().to_string()), ("line", &line.to_string())],
        );
    }
    frames.flush()?;

    let snapshot = metrics.snapshot();
    log_summary(Event::BlobEncoded, &snapshot);
    Ok(snapshot)
}

/// Writes one JSON document per frame of `input` to `out`.
pub fn decode<W: Write>(
    schema: &Path,
    input: &Path,
    config: &CodecConfig,
    out: &mut W,
) -> CliResult<MetricsSnapshot> {
    let tree = load_schema(schema, config.flag_strictness())?;
    let options = config.decode_options();
    let mut frames = open_frames(input)?;
    let metrics = CodecMetrics::new();

    let mut index: u64 = 0;
    loop {
        let offset = frames.offset();
        let payload = match frames.read_next() {
            Ok(Some(payload)) => payload,
            Ok(None) => break,
            Err(e) => {
                log_event(
                    Event::FrameCorrupted,
                    &[("error", &e.to_string()), ("offset", &offset.to_string())],
                );
                return Err(e.into());
            }
        };

        let result = if config.validate {
            decode_to_string::<Validated>(tree.root(), &payload, &options)
        } else {
            decode_to_string::<Unchecked>(tree.root(), &payload, &options)
        };

        match result {
            Ok(text) => {
                write_document(out, &text)?;
                metrics.record_decoded(payload.len());
                Logger::trace(
                    Event::BlobDecoded.as_str(),
                    &[("bytes", &payload.len().to_string()), ("frame", &index.to_string())],
                );
            }
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                metrics.record_decode_failure();
                if config.validate && matches!(e, DecodeError::Blob(_) | DecodeError::EnumOutOfRange { .. }) {
                    metrics.record_validation_error();
                }
                Logger::warn(
                    Event::BlobDecodeFailed.as_str(),
                    &[("error", &e.to_string()), ("frame", &index.to_string())],
                );
            }
        }
        index += 1;
    }
    out.flush()?;

    let snapshot = metrics.snapshot();
    log_summary(Event::BlobDecoded, &snapshot);
    Ok(snapshot)
}

/// Writes the tree a definition builds.
pub fn dump_schema<W: Write>(schema: &Path, config: &CodecConfig, out: &mut W) -> CliResult<()> {
    let tree = load_schema(schema, config.flag_strictness())?;

    let mut text = String::new();
    let mut serial = JsonSerializer::<_, Validated>::with_config(&mut text, config.json_config());
    serialize_schema(&mut serial, tree.root())?;
    serial.finish()?;

    write_document(out, &text)?;
    out.flush()?;
    Ok(())
}

/// Writes `{"equal": bool}` and returns the verdict.
pub fn compare<W: Write>(left: &Path, right: &Path, fuzz: CompareFuzz, out: &mut W) -> CliResult<bool> {
    let a = load_schema(left, FlagStrictness::Lenient)?;
    let b = load_schema(right, FlagStrictness::Lenient)?;
    let equal = compare_trees(a.root(), b.root(), fuzz);

    let mut text = String::new();
    let mut serial = JsonSerializer::<_, Validated>::new(&mut text);
    serial.open_object()?;
    serial.write_key(b"equal")?;
    serial.write_bool(equal)?;
    serial.close_object()?;
    serial.finish()?;

    write_document(out, &text)?;
    out.flush()?;
    Ok(equal)
}

fn log_summary(event: Event, snapshot: &MetricsSnapshot) {
    let fields = snapshot.to_fields();
    let borrowed: Vec<(&str, &str)> = fields.iter().map(|(key, value)| (*key, value.as_str())).collect();
    Logger::info(event.as_str(), &borrowed);
}
