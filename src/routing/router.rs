//! Pure fan-out over a subscription table snapshot.
//!
//! Each function consumes one hardware-originated batch and produces a
//! per-callback delivery plan; the transport turns each map entry into one
//! RPC. The caller holds the engine lock for the whole call, so the snapshot
//! is consistent with concurrent subscribe/unsubscribe traffic.

use crate::routing::dedup::{DedupCache, Offer};
use crate::subscriptions::SubscriptionTable;
use crate::types::{CallbackId, PropertyKey, SampleValue, SetError};
use std::collections::HashMap;
use tracing::trace;

/// Fan a batch of value updates out to subscribed callbacks.
///
/// Per client: the payload is cloned and rounded to the client's requested
/// resolution, then duplicate suppression is applied when the client asked
/// for it and the hardware-level merged subscription is not already
/// suppressing for everyone.
pub(crate) fn route_updates(
    table: &SubscriptionTable,
    dedup: &mut DedupCache,
    values: Vec<SampleValue>,
) -> HashMap<CallbackId, Vec<SampleValue>> {
    let mut plan: HashMap<CallbackId, Vec<SampleValue>> = HashMap::new();

    for value in values {
        let Some(subscribers) = table.subscribers(value.key) else {
            continue;
        };
        let continuous = table.continuous_state(value.key);
        let hw_vur = continuous.map_or(false, |state| state.merged.all_clients_want_vur);

        for (&client, &callback) in subscribers {
            let config = continuous.and_then(|state| state.configs.get(&client));

            let sanitized = match config {
                Some(config) => value.with_resolution(config.resolution),
                // On-change keys carry no per-client config; deliver as-is.
                None => value.clone(),
            };

            let wants_vur = config.map_or(false, |config| config.enable_vur);
            if wants_vur && !hw_vur {
                match dedup.offer(callback, &sanitized) {
                    Offer::Deliver => {}
                    Offer::Duplicate => {
                        trace!(key = %value.key, %client, "suppressed duplicate sample");
                        continue;
                    }
                    Offer::Stale => {
                        trace!(key = %value.key, %client, "dropped out-of-order sample");
                        continue;
                    }
                }
            }

            plan.entry(callback).or_default().push(sanitized);
        }
    }

    plan
}

/// Fan set-failure events out. Each event reaches only the client that
/// issued the failing set, and only while that client subscribes to the key.
pub(crate) fn route_set_errors(
    table: &SubscriptionTable,
    events: &[SetError],
) -> HashMap<CallbackId, Vec<SetError>> {
    let mut plan: HashMap<CallbackId, Vec<SetError>> = HashMap::new();

    for event in events {
        if let Some(callback) = table.callback_of(event.key, event.client) {
            plan.entry(callback).or_default().push(event.clone());
        }
    }

    plan
}

/// Fan capability-change notifications out to every subscriber of each
/// changed key.
pub(crate) fn route_supported_value_changes(
    table: &SubscriptionTable,
    keys: &[PropertyKey],
) -> HashMap<CallbackId, Vec<PropertyKey>> {
    let mut plan: HashMap<CallbackId, Vec<PropertyKey>> = HashMap::new();

    for &key in keys {
        let Some(subscribers) = table.subscribers(key) else {
            continue;
        };
        for &callback in subscribers.values() {
            plan.entry(callback).or_default().push(key);
        }
    }

    plan
}
