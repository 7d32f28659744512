//! Error types for alarm setup and timeout validation

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort the program before an alarm is armed.
///
/// Every variant is fatal: it is logged once and the process exits
/// with code 1. Failures after arming (audio device gone, notification
/// bus unreachable) are warnings, not variants here.
#[derive(Debug, Error)]
pub enum AlarmError {
    /// No `--timeout` was given.
    #[error("Timeout is required")]
    MissingTimeout,

    /// The timeout string matched none of the accepted forms.
    #[error("Invalid timeout value: {raw}")]
    InvalidTimeout { raw: String },

    /// The timeout parsed but resolved to a moment that is not in the
    /// future. Carries the computed millisecond delta for diagnostics.
    #[error("Invalid timeout value: {raw}, ms: {ms}")]
    ElapsedTimeout { raw: String, ms: i64 },

    /// The configured sound file does not exist.
    #[error("File not found: {path}")]
    SoundNotFound { path: PathBuf },
}
