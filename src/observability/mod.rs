//! Observability
//!
//! - Structured logging (JSON lines on stderr)
//! - Typed events
//! - Monotonic codec counters
//!
//! # Principles
//!
//! 1. Observability is read-only: it never changes a codec result
//! 2. No background threads, no buffering
//! 3. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use eventcodec::observability::{CodecMetrics, Event, Logger};
//!
//! Logger::info(Event::BlobDecoded.as_str(), &[("bytes", "24")]);
//!
//! let metrics = CodecMetrics::new();
//! metrics.record_decoded(24);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{CodecMetrics, MetricsSnapshot};

/// Logs `event` at INFO, or FATAL for fatal events.
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_fatal() {
        Severity::Fatal
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}
