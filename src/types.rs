//! Core types for the property bus.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Identifies one subscribable entity: a property within one of its areas.
///
/// Ordered so tables and test assertions can iterate deterministically.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PropertyKey {
    pub property_id: i32,
    pub area_id: i32,
}

impl PropertyKey {
    pub fn new(property_id: i32, area_id: i32) -> Self {
        Self {
            property_id,
            area_id,
        }
    }

    /// Key for a global (area-less) property. Area 0 is the whole-device area.
    pub fn global(property_id: i32) -> Self {
        Self::new(property_id, 0)
    }
}

impl fmt::Debug for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({}, {})", self.property_id, self.area_id)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.property_id, self.area_id)
    }
}

/// Stable identity of a remote client.
///
/// Allocated by the transport layer (session id, interned handle). The engine
/// only needs equality and hashing; it never dereferences a connection.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClientId(pub u64);

impl fmt::Debug for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientId({})", self.0)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of the delivery callback a client registered.
///
/// Delivery plans are grouped by callback so the transport can batch one RPC
/// per client. Distinct clients never share a callback.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CallbackId(pub u64);

impl fmt::Debug for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallbackId({})", self.0)
    }
}

/// Nanoseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards");
        Timestamp(duration.as_nanos() as i64)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// Health of a delivered sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleStatus {
    Available,
    Unavailable,
    Error,
}

impl Default for SampleStatus {
    fn default() -> Self {
        SampleStatus::Available
    }
}

/// One produced sample flowing from the hardware toward subscribed clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampleValue {
    pub key: PropertyKey,

    /// When the hardware produced the sample.
    pub timestamp: Timestamp,

    pub status: SampleStatus,

    /// Numeric channels; per-client resolution rounding applies to each.
    pub numbers: Vec<f64>,

    /// Opaque payload, delivered untouched.
    pub bytes: Vec<u8>,
}

impl SampleValue {
    /// A purely numeric sample with `Available` status and no raw bytes.
    pub fn numeric(key: PropertyKey, timestamp: Timestamp, numbers: Vec<f64>) -> Self {
        Self {
            key,
            timestamp,
            status: SampleStatus::Available,
            numbers,
            bytes: Vec::new(),
        }
    }

    /// Copy of this sample with every numeric channel rounded to `resolution`.
    ///
    /// Resolution 0 means no rounding. Rounding is `round(v / res) * res`,
    /// ties away from zero.
    pub fn with_resolution(&self, resolution: f32) -> Self {
        let mut out = self.clone();
        if resolution != 0.0 {
            let res = resolution as f64;
            for n in &mut out.numbers {
                *n = (*n / res).round() * res;
            }
        }
        out
    }

    /// Whether two samples carry the same reading: status, raw bytes, and
    /// bit-identical numeric channels. Timestamps are not compared.
    pub fn same_reading(&self, other: &SampleValue) -> bool {
        self.status == other.status
            && self.bytes == other.bytes
            && self.numbers.len() == other.numbers.len()
            && self
                .numbers
                .iter()
                .zip(&other.numbers)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

/// Async failure of a set operation, reported back to the client that issued
/// the set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetError {
    pub key: PropertyKey,

    /// The client whose set failed.
    pub client: ClientId,

    /// Hardware-defined error code, forwarded as-is.
    pub code: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ordering() {
        let a = PropertyKey::new(100, 0);
        let b = PropertyKey::new(100, 1);
        let c = PropertyKey::new(200, 0);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_resolution_rounding() {
        let value = SampleValue::numeric(PropertyKey::global(1), Timestamp(0), vec![12.34]);

        let rounded = value.with_resolution(0.1);
        assert!((rounded.numbers[0] - 12.3).abs() < 1e-9);

        let tens = value.with_resolution(10.0);
        assert!((tens.numbers[0] - 10.0).abs() < 1e-9);

        let untouched = value.with_resolution(0.0);
        assert_eq!(untouched.numbers[0], 12.34);
    }

    #[test]
    fn test_same_reading_ignores_timestamp() {
        let a = SampleValue::numeric(PropertyKey::global(1), Timestamp(100), vec![1.0, 2.0]);
        let mut b = a.clone();
        b.timestamp = Timestamp(200);
        assert!(a.same_reading(&b));

        b.numbers[1] = 2.5;
        assert!(!a.same_reading(&b));
    }

    #[test]
    fn test_same_reading_compares_status_and_bytes() {
        let a = SampleValue::numeric(PropertyKey::global(1), Timestamp(0), vec![1.0]);

        let mut b = a.clone();
        b.status = SampleStatus::Unavailable;
        assert!(!a.same_reading(&b));

        let mut c = a.clone();
        c.bytes = vec![1, 2, 3];
        assert!(!a.same_reading(&c));
    }
}
