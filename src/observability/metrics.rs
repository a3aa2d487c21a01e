//! Codec counters
//!
//! - Counters only, monotonic
//! - Lock-free; Relaxed ordering is enough for counts

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters for one encoding or decoding session.
#[derive(Debug, Default)]
pub struct CodecMetrics {
    blobs_encoded: AtomicU64,
    bytes_encoded: AtomicU64,
    blobs_decoded: AtomicU64,
    bytes_decoded: AtomicU64,
    decode_failures: AtomicU64,
    validation_errors: AtomicU64,
}

impl CodecMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_encoded(&self, bytes: usize) {
        self.blobs_encoded.fetch_add(1, Ordering::Relaxed);
        self.bytes_encoded.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_decoded(&self, bytes: usize) {
        self.blobs_decoded.fetch_add(1, Ordering::Relaxed);
        self.bytes_decoded.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_validation_error(&self) {
        self.validation_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            blobs_encoded: self.blobs_encoded.load(Ordering::Relaxed),
            bytes_encoded: self.bytes_encoded.load(Ordering::Relaxed),
            blobs_decoded: self.blobs_decoded.load(Ordering::Relaxed),
            bytes_decoded: self.bytes_decoded.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            validation_errors: self.validation_errors.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub blobs_encoded: u64,
    pub bytes_encoded: u64,
    pub blobs_decoded: u64,
    pub bytes_decoded: u64,
    pub decode_failures: u64,
    pub validation_errors: u64,
}

impl MetricsSnapshot {
    /// Fields for a summary log line.
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("blobs_decoded", self.blobs_decoded.to_string()),
            ("blobs_encoded", self.blobs_encoded.to_string()),
            ("bytes_decoded", self.bytes_decoded.to_string()),
            ("bytes_encoded", self.bytes_encoded.to_string()),
            ("decode_failures", self.decode_failures.to_string()),
            ("validation_errors", self.validation_errors.to_string()),
        ]
    }
}
