//! Shared test fixtures: a hardware recorder and small builders.
#![allow(dead_code)]

use parking_lot::Mutex;
use propbus::{HalError, HalResult, PropertyHal, PropertyKey, SampleValue, Timestamp};
use std::sync::Arc;

/// Hardware stand-in that records every call and can fail on command.
///
/// Failures are one-shot: `fail_next_*` arms a single rejection for the next
/// matching call, mirroring a transient bus error.
#[derive(Default)]
pub struct RecordingHal {
    calls: Mutex<Vec<String>>,
    fail_subscribe: Mutex<Option<HalError>>,
    fail_unsubscribe: Mutex<Option<HalError>>,
    fail_update: Mutex<Option<HalError>>,
}

impl RecordingHal {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    pub fn fail_next_subscribe(&self, error: HalError) {
        *self.fail_subscribe.lock() = Some(error);
    }

    pub fn fail_next_unsubscribe(&self, error: HalError) {
        *self.fail_unsubscribe.lock() = Some(error);
    }

    pub fn fail_next_update(&self, error: HalError) {
        *self.fail_update.lock() = Some(error);
    }
}

impl PropertyHal for RecordingHal {
    fn subscribe(
        &self,
        key: PropertyKey,
        sample_rate_hz: f32,
        resolution: f32,
        enable_vur: bool,
    ) -> HalResult {
        if let Some(error) = self.fail_subscribe.lock().take() {
            return Err(error);
        }
        self.calls.lock().push(format!(
            "subscribe({}, {}, {}, {})",
            key, sample_rate_hz, resolution, enable_vur
        ));
        Ok(())
    }

    fn unsubscribe(&self, key: PropertyKey) -> HalResult {
        if let Some(error) = self.fail_unsubscribe.lock().take() {
            return Err(error);
        }
        self.calls.lock().push(format!("unsubscribe({})", key));
        Ok(())
    }

    fn update_sample_rate(&self, key: PropertyKey, sample_rate_hz: f32) -> HalResult {
        if let Some(error) = self.fail_update.lock().take() {
            return Err(error);
        }
        self.calls
            .lock()
            .push(format!("update_sample_rate({}, {})", key, sample_rate_hz));
        Ok(())
    }
}

pub fn key(property_id: i32, area_id: i32) -> PropertyKey {
    PropertyKey::new(property_id, area_id)
}

pub fn sample(key: PropertyKey, value: f64, t: i64) -> SampleValue {
    SampleValue::numeric(key, Timestamp(t), vec![value])
}
