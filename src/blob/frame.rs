//! Event frames
//!
//! A frame stores one blob on disk or on the wire:
//!
//! ```text
//! | magic "EVCB" | blob version u32 | payload len u32 | crc32 u32 | payload |
//! ```
//!
//! All header integers are little-endian. The checksum covers the payload.
//! A bad magic, checksum or length is corruption; an unknown version is a
//! version mismatch. Both stop the stream.

use std::io::{self, Read, Write};

use crc32fast::Hasher;

use super::errors::{BlobError, BlobResult};
use super::BLOB_VERSION;

/// Leading bytes of every frame.
pub const FRAME_MAGIC: [u8; 4] = *b"EVCB";

/// Size of the frame header in bytes.
pub const FRAME_HEADER_SIZE: usize = 16;

fn checksum(payload: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(payload);
    hasher.finalize()
}

/// Appends framed blobs to a writer.
pub struct FrameWriter<W: Write> {
    inner: W,
    offset: u64,
    frames: u64,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            offset: 0,
            frames: 0,
        }
    }

    /// Writes one frame around `payload`.
    pub fn write_frame(&mut self, payload: &[u8]) -> BlobResult<()> {
        let len = u32::try_from(payload.len())
            .map_err(|_| BlobError::length_overflow(payload.len(), u32::MAX as usize))?;

        let mut header = [0u8; FRAME_HEADER_SIZE];
        header[0..4].copy_from_slice(&FRAME_MAGIC);
        header[4..8].copy_from_slice(&BLOB_VERSION.to_le_bytes());
        header[8..12].copy_from_slice(&len.to_le_bytes());
        header[12..16].copy_from_slice(&checksum(payload).to_le_bytes());

        self.inner
            .write_all(&header)
            .and_then(|_| self.inner.write_all(payload))
            .map_err(|e| BlobError::io(self.offset, "failed to write frame", e))?;

        self.offset += (FRAME_HEADER_SIZE + payload.len()) as u64;
        self.frames += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> BlobResult<()> {
        self.inner
            .flush()
            .map_err(|e| BlobError::io(self.offset, "failed to flush frames", e))
    }

    /// Frames written so far.
    pub fn frames_written(&self) -> u64 {
        self.frames
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Reads framed blobs back, in order.
pub struct FrameReader<R: Read> {
    inner: R,
    offset: u64,
    failed: bool,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            offset: 0,
            failed: false,
        }
    }

    /// Offset of the next frame.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Reads the next frame's payload.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(payload))` when a frame was read and verified
    /// - `Ok(None)` at a clean end of input
    /// - `Err` on corruption, version mismatch or I/O failure
    pub fn read_next(&mut self) -> BlobResult<Option<Vec<u8>>> {
        let mut header = [0u8; FRAME_HEADER_SIZE];
        let filled = self.fill(&mut header)?;
        if filled == 0 {
            return Ok(None);
        }
        if filled < FRAME_HEADER_SIZE {
            return Err(BlobError::frame_corruption(
                self.offset,
                format!(
                    "truncated frame header: {} of {} bytes",
                    filled, FRAME_HEADER_SIZE
                ),
            ));
        }

        if header[0..4] != FRAME_MAGIC {
            return Err(BlobError::frame_corruption(self.offset, "bad frame magic"));
        }

        let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if version != BLOB_VERSION {
            return Err(BlobError::version_mismatch(BLOB_VERSION, version, self.offset));
        }

        let len = u32::from_le_bytes([header[8], header[9], header[10], header[11]]) as usize;
        let expected = u32::from_le_bytes([header[12], header[13], header[14], header[15]]);

        // untrusted until the checksum passes; grow only as bytes arrive
        let mut payload = Vec::new();
        let got = self
            .inner
            .by_ref()
            .take(len as u64)
            .read_to_end(&mut payload)
            .map_err(|e| BlobError::io(self.offset, "failed to read frame", e))?;
        if got < len {
            return Err(BlobError::frame_corruption(
                self.offset,
                format!("truncated frame payload: {} of {} bytes", got, len),
            ));
        }

        let actual = checksum(&payload);
        if actual != expected {
            return Err(BlobError::frame_corruption(
                self.offset,
                format!(
                    "checksum mismatch: expected {:08x}, computed {:08x}",
                    expected, actual
                ),
            ));
        }

        self.offset += (FRAME_HEADER_SIZE + len) as u64;
        Ok(Some(payload))
    }

    /// Reads until `buf` is full or the input ends; returns bytes read.
    fn fill(&mut self, buf: &mut [u8]) -> BlobResult<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(BlobError::io(self.offset, "failed to read frame", e)),
            }
        }
        Ok(filled)
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = BlobResult<Vec<u8>>;

    /// Stops after the first error.
    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_next() {
            Ok(Some(payload)) => Some(Ok(payload)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
