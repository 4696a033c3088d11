//! Error types for the subscription engine.

use crate::hal::HalError;
use crate::types::PropertyKey;
use thiserror::Error;

/// Main error type for engine operations.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("Invalid sample rate: {0} Hz")]
    InvalidSampleRate(f32),

    #[error("Invalid resolution: {0} (must be 0 or an integer power of ten)")]
    InvalidResolution(f32),

    #[error("Property {0} has no areas to subscribe")]
    EmptyAreaList(i32),

    #[error("Empty key list")]
    EmptyKeyList,

    /// The hardware collaborator rejected a call. The code and message are
    /// forwarded verbatim, never reinterpreted.
    #[error("Hardware rejected {key}: {source}")]
    Hardware {
        key: PropertyKey,
        #[source]
        source: HalError,
    },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, BusError>;
