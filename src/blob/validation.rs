//! Type-level choice between the validated and unchecked codec paths.

use std::fmt;

use crate::observability::{Event, Logger};

mod sealed {
    pub trait Sealed {}
}

/// Selects whether capacity and structure checks are compiled in.
///
/// Every check in the codec is guarded by `V::ENABLED`, a constant, so the
/// `Unchecked` instantiation carries no check at all.
pub trait Validation:
    sealed::Sealed + Copy + Default + fmt::Debug + Send + Sync + 'static
{
    /// True when checks are performed.
    const ENABLED: bool;

    /// Name used in logs.
    const NAME: &'static str;
}

/// Checks every buffer access and every structural rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Validated;

/// Skips every check. Only for producer/consumer pairs known to agree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Unchecked;

impl sealed::Sealed for Validated {}
impl sealed::Sealed for Unchecked {}

impl Validation for Validated {
    const ENABLED: bool = true;
    const NAME: &'static str = "validated";
}

impl Validation for Unchecked {
    const ENABLED: bool = false;
    const NAME: &'static str = "unchecked";
}

/// Observer for validation failures. It performs no recovery; the failing
/// call still returns its error.
pub type ValidationErrorFn = fn(&str);

/// Default observer: drops the message.
pub fn ignore_validation_error(_message: &str) {}

/// Observer that forwards the message to the structured logger.
pub fn log_validation_error(message: &str) {
    Logger::warn(Event::ValidationError.as_str(), &[("message", message)]);
}
