//! Blob Layout Tests
//!
//! Public-API tests for the blob layer:
//! - A record packed with `pack` reads back field by field
//! - Validated and unchecked readers agree on well-formed blobs
//! - Validated readers refuse to run past the end and report it
//! - Frames carry blobs through a file unchanged

use std::sync::atomic::{AtomicUsize, Ordering};

use eventcodec::blob::{
    pack, pack_with, BlobErrorCode, BlobReader, BlobRecord, BlobResult, BlobSink, FrameReader,
    FrameWriter, Unchecked, Validated,
};

// =============================================================================
// Helper Types
// =============================================================================

struct Reading<'a> {
    sensor: &'a str,
    seq: u64,
    ok: bool,
    samples: Vec<f32>,
    labels: Vec<Option<&'a str>>,
    mac: [u8; 6],
}

impl BlobRecord for Reading<'_> {
    fn record<S: BlobSink>(&self, sink: &mut S) -> BlobResult<()> {
        sink.put_fixed_str(self.sensor, 8)?;
        sink.put(self.seq)?;
        sink.put(self.ok)?;
        sink.put_array(&self.samples)?;
        sink.put_str_array(&self.labels)?;
        sink.put_fixed(&self.mac, 6)?;
        Ok(())
    }
}

fn sample() -> Reading<'static> {
    Reading {
        sensor: "node-03",
        seq: 42,
        ok: true,
        samples: vec![1.0, -2.5, 3.25],
        labels: vec![Some("warm"), None, Some("")],
        mac: [0xde, 0xad, 0xbe, 0xef, 0x00, 0x01],
    }
}

// =============================================================================
// Packing Tests
// =============================================================================

/// Every field comes back from a validated reader in write order.
#[test]
fn test_pack_reads_back() {
    let blob = pack(&sample()).unwrap();
    let mut reader = BlobReader::<Validated>::new(&blob);

    assert_eq!(reader.read_fixed_str(8).unwrap(), b"node-03");
    assert_eq!(reader.read::<u64>().unwrap(), 42);
    assert!(reader.read::<bool>().unwrap());
    assert_eq!(reader.read_array::<f32>().unwrap().to_vec(), vec![1.0, -2.5, 3.25]);

    let labels: Vec<_> = reader.read_str_array().unwrap().iter().collect();
    assert_eq!(labels, vec![Some(&b"warm"[..]), None, Some(&b""[..])]);

    assert_eq!(reader.read_fixed_bytes(6).unwrap(), &[0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]);
    assert_eq!(reader.remaining(), 0);
}

/// The sensor name is padded to 8 bytes, then the u64 sits at offset 8.
#[test]
fn test_fixed_string_then_aligned_scalar() {
    let blob = pack(&sample()).unwrap();
    assert_eq!(&blob[..8], b"node-03\0");
    assert_eq!(&blob[8..16], &42u64.to_le_bytes());
}

/// On a well-formed blob the unchecked reader returns the same values.
#[test]
fn test_unchecked_reader_agrees() {
    let blob = pack(&sample()).unwrap();
    let mut checked = BlobReader::<Validated>::new(&blob);
    let mut unchecked = BlobReader::<Unchecked>::new(&blob);

    assert_eq!(checked.read_fixed_str(8).unwrap(), unchecked.read_fixed_str(8).unwrap());
    assert_eq!(checked.read::<u64>().unwrap(), unchecked.read::<u64>().unwrap());
    assert_eq!(checked.read::<bool>().unwrap(), unchecked.read::<bool>().unwrap());
    assert_eq!(
        checked.read_array::<f32>().unwrap(),
        unchecked.read_array::<f32>().unwrap()
    );
    assert_eq!(checked.position(), unchecked.position());
}

// =============================================================================
// Validation Tests
// =============================================================================

static REPORTED: AtomicUsize = AtomicUsize::new(0);

fn count_report(_message: &str) {
    REPORTED.fetch_add(1, Ordering::SeqCst);
}

/// Reading past the end fails with TRUNCATED and reaches the callback.
#[test]
fn test_truncated_read_is_reported() {
    let blob = pack(&sample()).unwrap();
    let short = &blob[..12];

    let before = REPORTED.load(Ordering::SeqCst);
    let mut reader = BlobReader::<Validated>::with_error_handler(short, count_report);
    reader.read_fixed_str(8).unwrap();
    let err = reader.read::<u64>().unwrap_err();

    assert_eq!(err.code(), BlobErrorCode::Truncated);
    assert!(!err.is_fatal());
    assert_eq!(REPORTED.load(Ordering::SeqCst), before + 1);
}

/// A fixed array longer than its field is refused by the writer.
#[test]
fn test_overlong_fixed_field_rejected() {
    struct TooLong;
    impl BlobRecord for TooLong {
        fn record<S: BlobSink>(&self, sink: &mut S) -> BlobResult<()> {
            sink.put_fixed(&[1u16, 2, 3], 2)
        }
    }

    let err = pack_with(&TooLong, count_report).unwrap_err();
    assert_eq!(err.code(), BlobErrorCode::LengthOverflow);
}

// =============================================================================
// Frame Tests
// =============================================================================

/// Blobs survive a frame file byte for byte.
#[test]
fn test_frames_through_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("readings.bin");

    let first = pack(&sample()).unwrap();
    let mut second_reading = sample();
    second_reading.seq = 43;
    second_reading.labels.clear();
    let second = pack(&second_reading).unwrap();

    {
        let mut writer = FrameWriter::new(std::fs::File::create(&path).unwrap());
        writer.write_frame(&first).unwrap();
        writer.write_frame(&second).unwrap();
        writer.flush().unwrap();
        assert_eq!(writer.frames_written(), 2);
    }

    let file = std::fs::File::open(&path).unwrap();
    let payloads: Vec<Vec<u8>> = FrameReader::new(file).collect::<BlobResult<_>>().unwrap();
    assert_eq!(payloads, vec![first, second]);
}
