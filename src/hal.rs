//! Hardware collaborator contract.
//!
//! The engine never talks to real devices; it is handed an implementation of
//! [`PropertyHal`] and calls it while holding the engine lock. The contract
//! therefore requires every call to be fast and non-blocking. A hardware
//! layer that must block on I/O cannot implement this trait directly and
//! needs its own queueing in front of it.

use crate::types::PropertyKey;
use std::sync::Arc;
use thiserror::Error;

/// Error reported by the hardware collaborator.
///
/// Carried through to callers verbatim; the engine never reinterprets the
/// code or message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("hardware error {code}: {message}")]
pub struct HalError {
    pub code: i32,
    pub message: String,
}

impl HalError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Result type for hardware calls.
pub type HalResult = std::result::Result<(), HalError>;

/// The data source underneath the engine.
///
/// All three operations must be idempotent: unsubscribing an already
/// unsubscribed key, or re-subscribing a key with identical parameters,
/// succeeds with no effect. The engine relies on this to make retries of a
/// partially applied batch safe.
pub trait PropertyHal: Send + Sync {
    /// Start (or reconfigure) sample production for `key`.
    ///
    /// `sample_rate_hz` 0 means on-change delivery. `enable_vur` asks the
    /// hardware to suppress repeated identical samples at the source.
    fn subscribe(
        &self,
        key: PropertyKey,
        sample_rate_hz: f32,
        resolution: f32,
        enable_vur: bool,
    ) -> HalResult;

    /// Stop sample production for `key`.
    fn unsubscribe(&self, key: PropertyKey) -> HalResult;

    /// Change only the sample rate of an existing subscription.
    fn update_sample_rate(&self, key: PropertyKey, sample_rate_hz: f32) -> HalResult;
}

impl<H: PropertyHal + ?Sized> PropertyHal for Arc<H> {
    fn subscribe(
        &self,
        key: PropertyKey,
        sample_rate_hz: f32,
        resolution: f32,
        enable_vur: bool,
    ) -> HalResult {
        (**self).subscribe(key, sample_rate_hz, resolution, enable_vur)
    }

    fn unsubscribe(&self, key: PropertyKey) -> HalResult {
        (**self).unsubscribe(key)
    }

    fn update_sample_rate(&self, key: PropertyKey, sample_rate_hz: f32) -> HalResult {
        (**self).update_sample_rate(key, sample_rate_hz)
    }
}
