//! File and stream handling for the CLI
//!
//! - Encode input: one JSON value per line, blank lines skipped
//! - Frame files: `FrameWriter` / `FrameReader` over buffered files
//! - Output: documents and reports on stdout, UTF-8 only

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde_json::Value;

use crate::blob::{FrameReader, FrameWriter};

use super::errors::{CliError, CliResult};

/// Reads JSON lines, yielding each value with its 1-based line number.
pub fn read_json_lines(path: &Path) -> CliResult<impl Iterator<Item = CliResult<(usize, Value)>>> {
    let file = File::open(path)
        .map_err(|e| CliError::io_error(format!("failed to open {}: {}", path.display(), e)))?;

    let lines = BufReader::new(file).lines().enumerate().filter_map(|(i, line)| {
        let number = i + 1;
        let line = match line {
            Ok(line) => line,
            Err(e) => return Some(Err(CliError::from(e))),
        };
        if line.trim().is_empty() {
            return None;
        }
        Some(
            serde_json::from_str(&line)
                .map(|value| (number, value))
                .map_err(|e| CliError::encode_failed(number, e)),
        )
    });
    Ok(lines)
}

pub fn open_frames(path: &Path) -> CliResult<FrameReader<BufReader<File>>> {
    let file = File::open(path)
        .map_err(|e| CliError::io_error(format!("failed to open {}: {}", path.display(), e)))?;
    Ok(FrameReader::new(BufReader::new(file)))
}

pub fn create_frames(path: &Path) -> CliResult<FrameWriter<BufWriter<File>>> {
    let file = File::create(path)
        .map_err(|e| CliError::io_error(format!("failed to create {}: {}", path.display(), e)))?;
    Ok(FrameWriter::new(BufWriter::new(file)))
}

/// Writes one document, adding a newline unless it already ends with one.
pub fn write_document<W: Write>(out: &mut W, text: &str) -> CliResult<()> {
    out.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_json_lines_skip_blanks_and_keep_numbers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.jsonl");
        fs::write(&path, "{\"id\":1}\n\n{\"id\":2}\n").unwrap();

        let values: Vec<_> = read_json_lines(&path)
            .unwrap()
            .collect::<CliResult<Vec<_>>>()
            .unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].0, 1);
        assert_eq!(values[1].0, 3);
        assert_eq!(values[1].1["id"], 2);
    }

    #[test]
    fn test_bad_line_reports_number() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.jsonl");
        fs::write(&path, "{\"id\":1}\n{oops\n").unwrap();

        let results: Vec<_> = read_json_lines(&path).unwrap().collect();
        let err = results[1].as_ref().unwrap_err();
        assert!(err.message().starts_with("line 2:"));
    }

    #[test]
    fn test_write_document_single_newline() {
        let mut out = Vec::new();
        write_document(&mut out, "{}").unwrap();
        write_document(&mut out, "{\n}\n").unwrap();
        assert_eq!(out, b"{}\n{\n}\n");
    }
}
