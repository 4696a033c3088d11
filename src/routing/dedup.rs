//! Last-delivered-value cache for client-side duplicate suppression.
//!
//! Used only when a client asked for duplicate suppression but the merged
//! hardware subscription does not honor it (some other client on the key
//! wants every sample). Rows are keyed by callback identity, never by key
//! alone, so two clients cannot share a row.

use crate::types::{CallbackId, PropertyKey, SampleValue};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Outcome of offering a sanitized sample to the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Offer {
    /// New reading; deliver it.
    Deliver,
    /// Identical to the last delivered reading; suppress.
    Duplicate,
    /// Older than the last delivered reading; drop without touching the row.
    Stale,
}

/// Per-(callback, key) record of the last delivered payload.
///
/// Rows exist only for keys the callback's client currently subscribes to:
/// unsubscribing a key evicts its row, and a full client unsubscribe evicts
/// every row the client accumulated.
#[derive(Default)]
pub struct DedupCache {
    rows: HashMap<(CallbackId, PropertyKey), SampleValue>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether `sanitized` should reach `callback`, updating the row
    /// accordingly.
    ///
    /// A duplicate reading still refreshes the row's timestamp, so the next
    /// genuinely changed sample is compared against the most recent delivery
    /// attempt rather than a stale one.
    pub(crate) fn offer(&mut self, callback: CallbackId, sanitized: &SampleValue) -> Offer {
        match self.rows.entry((callback, sanitized.key)) {
            Entry::Vacant(entry) => {
                entry.insert(sanitized.clone());
                Offer::Deliver
            }
            Entry::Occupied(mut entry) => {
                let row = entry.get_mut();
                if row.timestamp > sanitized.timestamp {
                    return Offer::Stale;
                }
                if row.same_reading(sanitized) {
                    row.timestamp = sanitized.timestamp;
                    return Offer::Duplicate;
                }
                *row = sanitized.clone();
                Offer::Deliver
            }
        }
    }

    /// Drop the row for one (callback, key).
    pub(crate) fn evict_key(&mut self, callback: CallbackId, key: PropertyKey) {
        self.rows.remove(&(callback, key));
    }

    /// Number of live rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
