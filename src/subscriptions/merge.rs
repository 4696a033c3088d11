//! Merge policy and validation for continuous subscriptions.
//!
//! A continuous key has one hardware subscription shared by every client.
//! The helpers here combine the per-client requests into the single triple
//! the hardware sees, and validate requests before any state changes.

use crate::error::{BusError, Result};
use crate::types::PropertyKey;

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// A client's requested delivery parameters for one key.
///
/// Owned by exactly one (client, key) pair; replaced wholesale when the same
/// client re-subscribes to the key.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClientConfig {
    pub sample_rate_hz: f32,
    pub resolution: f32,
    pub enable_vur: bool,
}

/// One expanded `(property, area)` subscription request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubscribeOption {
    pub key: PropertyKey,
    pub sample_rate_hz: f32,
    pub resolution: f32,
    pub enable_vur: bool,
}

impl SubscribeOption {
    /// Request for an on-change key: no rate, no rounding, no suppression.
    pub fn on_change(key: PropertyKey) -> Self {
        Self {
            key,
            sample_rate_hz: 0.0,
            resolution: 0.0,
            enable_vur: false,
        }
    }

    /// Request for a continuous key.
    pub fn continuous(
        key: PropertyKey,
        sample_rate_hz: f32,
        resolution: f32,
        enable_vur: bool,
    ) -> Self {
        Self {
            key,
            sample_rate_hz,
            resolution,
            enable_vur,
        }
    }

    /// Expand one per-property request into one option per concrete area.
    ///
    /// The engine never interprets area wildcards; transports call this to
    /// flatten a request before subscribing. An empty area list is rejected.
    pub fn expand(
        property_id: i32,
        area_ids: &[i32],
        sample_rate_hz: f32,
        resolution: f32,
        enable_vur: bool,
    ) -> Result<Vec<SubscribeOption>> {
        if area_ids.is_empty() {
            return Err(BusError::EmptyAreaList(property_id));
        }

        Ok(area_ids
            .iter()
            .map(|&area_id| SubscribeOption {
                key: PropertyKey::new(property_id, area_id),
                sample_rate_hz,
                resolution,
                enable_vur,
            })
            .collect())
    }

    pub(crate) fn client_config(&self) -> ClientConfig {
        ClientConfig {
            sample_rate_hz: self.sample_rate_hz,
            resolution: self.resolution,
            enable_vur: self.enable_vur,
        }
    }
}

/// The combined rate/resolution/VUR triple presented to the hardware on
/// behalf of every subscriber of one continuous key.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MergedConfig {
    /// Fastest consumer wins; a slower one never starves a faster one.
    pub max_sample_rate_hz: f32,

    /// Finest granularity wins. 0 means "no rounding" and is the most
    /// precise value, so it dominates the min.
    pub min_resolution: f32,

    /// Hardware-side duplicate suppression only when every client asked.
    pub all_clients_want_vur: bool,
}

/// Combine client configs into the merged triple. `None` for an empty set —
/// a merged config for a key with no subscribers never exists.
pub fn merge_configs<'a, I>(configs: I) -> Option<MergedConfig>
where
    I: IntoIterator<Item = &'a ClientConfig>,
{
    let mut merged: Option<MergedConfig> = None;

    for config in configs {
        merged = Some(match merged {
            None => MergedConfig {
                max_sample_rate_hz: config.sample_rate_hz,
                min_resolution: config.resolution,
                all_clients_want_vur: config.enable_vur,
            },
            Some(m) => MergedConfig {
                max_sample_rate_hz: m.max_sample_rate_hz.max(config.sample_rate_hz),
                min_resolution: m.min_resolution.min(config.resolution),
                all_clients_want_vur: m.all_clients_want_vur && config.enable_vur,
            },
        });
    }

    merged
}

/// Sampling interval implied by `sample_rate_hz`, in nanoseconds.
///
/// `None` when the rate is non-positive, non-finite, or the interval does
/// not fit: above `i64::MAX` nanoseconds or below a single nanosecond.
pub fn interval_nanos(sample_rate_hz: f32) -> Option<i64> {
    if !sample_rate_hz.is_finite() || sample_rate_hz <= 0.0 {
        return None;
    }

    let nanos = NANOS_PER_SECOND / sample_rate_hz as f64;
    if nanos < 1.0 || nanos > i64::MAX as f64 {
        return None;
    }

    Some(nanos as i64)
}

/// Whether `hz` is a usable continuous sample rate.
pub fn is_valid_sample_rate(hz: f32) -> bool {
    interval_nanos(hz).is_some()
}

/// Whether `r` is a usable resolution: 0 (no rounding) or an exact integer
/// power of ten (`10`, `1`, `0.1`, ...).
pub fn is_valid_resolution(r: f32) -> bool {
    if r == 0.0 {
        return true;
    }
    if !r.is_finite() || r < 0.0 {
        return false;
    }

    let log = (r as f64).log10();
    (log - log.round()).abs() < f32::EPSILON as f64
}

/// Batch validation for a continuous subscribe option.
pub(crate) fn validate_continuous(option: &SubscribeOption) -> Result<()> {
    if !is_valid_sample_rate(option.sample_rate_hz) {
        return Err(BusError::InvalidSampleRate(option.sample_rate_hz));
    }
    if !is_valid_resolution(option.resolution) {
        return Err(BusError::InvalidResolution(option.resolution));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(rate: f32, resolution: f32, vur: bool) -> ClientConfig {
        ClientConfig {
            sample_rate_hz: rate,
            resolution,
            enable_vur: vur,
        }
    }

    #[test]
    fn test_merge_empty_is_none() {
        let configs: Vec<ClientConfig> = Vec::new();
        assert_eq!(merge_configs(&configs), None);
    }

    #[test]
    fn test_merge_triple() {
        let configs = [config(10.0, 1.0, false), config(5.0, 0.1, true)];
        let merged = merge_configs(&configs).unwrap();

        assert_eq!(merged.max_sample_rate_hz, 10.0);
        assert_eq!(merged.min_resolution, 0.1);
        assert!(!merged.all_clients_want_vur);
    }

    #[test]
    fn test_merge_zero_resolution_dominates() {
        let configs = [config(1.0, 0.01, true), config(1.0, 0.0, true)];
        let merged = merge_configs(&configs).unwrap();

        assert_eq!(merged.min_resolution, 0.0);
        assert!(merged.all_clients_want_vur);
    }

    #[test]
    fn test_interval_nanos() {
        assert_eq!(interval_nanos(10.0), Some(100_000_000));
        assert_eq!(interval_nanos(1.0), Some(1_000_000_000));
        assert_eq!(interval_nanos(0.0), None);
        assert_eq!(interval_nanos(-5.0), None);
        assert_eq!(interval_nanos(f32::NAN), None);
        assert_eq!(interval_nanos(f32::INFINITY), None);
        // Faster than one sample per nanosecond doesn't fit.
        assert_eq!(interval_nanos(1e10), None);
        // Slower than one sample per ~292 years doesn't fit either.
        assert_eq!(interval_nanos(1e-12), None);
    }

    #[test]
    fn test_valid_resolutions() {
        for r in [0.0, 0.001, 0.01, 0.1, 1.0, 10.0, 100.0] {
            assert!(is_valid_resolution(r), "expected {} to be valid", r);
        }
        for r in [0.03, 0.5, 2.0, 3.0, -0.1, -1.0, f32::NAN, f32::INFINITY] {
            assert!(!is_valid_resolution(r), "expected {} to be invalid", r);
        }
    }

    #[test]
    fn test_expand_rejects_empty_area_list() {
        let result = SubscribeOption::expand(100, &[], 1.0, 0.0, false);
        assert!(matches!(result, Err(BusError::EmptyAreaList(100))));
    }

    #[test]
    fn test_expand_one_option_per_area() {
        let options = SubscribeOption::expand(100, &[1, 2, 4], 5.0, 0.1, true).unwrap();
        assert_eq!(options.len(), 3);
        assert_eq!(options[0].key, PropertyKey::new(100, 1));
        assert_eq!(options[2].key, PropertyKey::new(100, 4));
        assert!(options.iter().all(|o| o.sample_rate_hz == 5.0));
    }
}
