//! Subscription manager: validation, merge recomputation, hardware calls.

use crate::error::{BusError, Result};
use crate::hal::PropertyHal;
use crate::routing::{self, DedupCache};
use crate::subscriptions::merge::{validate_continuous, MergedConfig, SubscribeOption};
use crate::subscriptions::table::SubscriptionTable;
use crate::types::{CallbackId, ClientId, PropertyKey, SampleValue, SetError};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Everything mutable, behind the one engine lock.
struct EngineState {
    /// Value-update subscriptions, plus merge state for continuous keys.
    table: SubscriptionTable,

    /// Capability-change subscriptions. Same shape, no merge state; a client
    /// may watch a key's capabilities without subscribing to its values.
    supported: SubscriptionTable,

    /// Last delivered payload per (callback, key).
    dedup: DedupCache,
}

/// Orchestrates client subscriptions over one hardware property source.
///
/// One mutex guards the whole state, and hardware calls are issued while it
/// is held: the hardware contract requires `subscribe`/`unsubscribe`/
/// `update_sample_rate` to be fast and non-blocking, and keeping the lock
/// across them means no thread can observe a table that disagrees with what
/// the hardware was told. A blocking hardware layer must not implement
/// [`PropertyHal`] directly.
///
/// Batches are atomic with respect to the `route_*` readers. A hardware
/// rejection mid-batch aborts the remaining options and is returned as-is;
/// options already applied stay applied, and retrying the whole batch is
/// safe because every hardware operation is idempotent.
pub struct SubscriptionManager<H: PropertyHal> {
    hal: H,
    state: Mutex<EngineState>,
}

impl<H: PropertyHal> SubscriptionManager<H> {
    pub fn new(hal: H) -> Self {
        Self {
            hal,
            state: Mutex::new(EngineState {
                table: SubscriptionTable::new(),
                supported: SubscriptionTable::new(),
                dedup: DedupCache::new(),
            }),
        }
    }

    // --- Subscribe / unsubscribe ---

    /// Subscribe `client` to every option in the batch.
    ///
    /// The batch is all-continuous or all-on-change (`is_continuous`); keys
    /// keep one classification for their whole life, supplied by the caller
    /// from property metadata. Options must already be expanded to concrete
    /// `(property, area)` keys — see [`SubscribeOption::expand`].
    ///
    /// Validation failures reject the whole batch before any mutation.
    pub fn subscribe(
        &self,
        client: ClientId,
        callback: CallbackId,
        options: &[SubscribeOption],
        is_continuous: bool,
    ) -> Result<()> {
        if options.is_empty() {
            return Err(BusError::EmptyKeyList);
        }
        if is_continuous {
            for option in options {
                validate_continuous(option)?;
            }
        }

        let mut state = self.state.lock();
        for option in options {
            if is_continuous {
                self.subscribe_continuous(&mut state, client, option)?;
            } else {
                self.subscribe_on_change(&state, option.key)?;
            }

            // A replaced callback keeps no suppression history.
            if let Some(old) = state.table.callback_of(option.key, client) {
                if old != callback {
                    state.dedup.evict_key(old, option.key);
                }
            }
            state.table.insert(option.key, client, callback);
        }
        Ok(())
    }

    /// Merge this client's config into `key` and reconcile the hardware.
    ///
    /// The table is only touched after the hardware accepted the new merged
    /// triple, so a rejection leaves this option entirely unapplied.
    fn subscribe_continuous(
        &self,
        state: &mut EngineState,
        client: ClientId,
        option: &SubscribeOption,
    ) -> Result<()> {
        let key = option.key;
        let config = option.client_config();

        let old = state.table.merged_config(key).copied();
        let new = state.table.merged_with(key, client, config);

        if old != Some(new) {
            self.push_merged(key, old, new)?;
            debug!(%key, rate = new.max_sample_rate_hz, "merged subscription updated");
        }
        state.table.apply_continuous(key, client, config, new);
        Ok(())
    }

    /// First subscriber of an on-change key starts hardware delivery.
    fn subscribe_on_change(&self, state: &EngineState, key: PropertyKey) -> Result<()> {
        if !state.table.contains_key(key) {
            self.hal
                .subscribe(key, 0.0, 0.0, false)
                .map_err(|source| BusError::Hardware { key, source })?;
        }
        Ok(())
    }

    /// Tell the hardware about a changed merged triple.
    fn push_merged(
        &self,
        key: PropertyKey,
        old: Option<MergedConfig>,
        new: MergedConfig,
    ) -> Result<()> {
        let hw = |source| BusError::Hardware { key, source };

        // A zero merged rate can only appear transiently through merge edge
        // cases; the hardware subscription is dropped rather than asked for
        // a nonsensical rate.
        if new.max_sample_rate_hz == 0.0 {
            return self.hal.unsubscribe(key).map_err(hw);
        }

        let rate_changed =
            old.map_or(true, |old| old.max_sample_rate_hz != new.max_sample_rate_hz);
        if rate_changed && old.is_some() {
            self.hal
                .update_sample_rate(key, new.max_sample_rate_hz)
                .map_err(hw)?;
        }
        self.hal
            .subscribe(
                key,
                new.max_sample_rate_hz,
                new.min_resolution,
                new.all_clients_want_vur,
            )
            .map_err(hw)
    }

    /// Remove `client` from the listed keys.
    ///
    /// Removing a key the client never subscribed to is a successful no-op:
    /// remote clients race disconnects with explicit unsubscribes.
    pub fn unsubscribe(&self, client: ClientId, keys: &[PropertyKey]) -> Result<()> {
        if keys.is_empty() {
            return Err(BusError::EmptyKeyList);
        }

        let mut state = self.state.lock();
        for &key in keys {
            self.unsubscribe_one(&mut state, client, key)?;
        }
        Ok(())
    }

    /// Remove every subscription `client` holds: value updates, capability
    /// changes, and its suppression history. Called by the transport for
    /// disconnects and deaths.
    pub fn unsubscribe_client(&self, client: ClientId) -> Result<()> {
        let mut state = self.state.lock();

        let mut keys: Vec<PropertyKey> = state
            .table
            .keys_of(client)
            .map(|keys| keys.iter().copied().collect())
            .unwrap_or_default();
        keys.sort();
        for key in keys {
            self.unsubscribe_one(&mut state, client, key)?;
        }

        let supported: Vec<PropertyKey> = state
            .supported
            .keys_of(client)
            .map(|keys| keys.iter().copied().collect())
            .unwrap_or_default();
        for key in supported {
            state.supported.remove(key, client);
        }

        debug!(%client, "client fully unsubscribed");
        Ok(())
    }

    fn unsubscribe_one(
        &self,
        state: &mut EngineState,
        client: ClientId,
        key: PropertyKey,
    ) -> Result<()> {
        if state.table.callback_of(key, client).is_none() {
            return Ok(());
        }

        if state.table.continuous_state(key).is_some() {
            let old = state.table.merged_config(key).copied();
            let new = state.table.merged_without(key, client);
            match new {
                None => {
                    // Last client for a continuous key tears the hardware down.
                    self.hal
                        .unsubscribe(key)
                        .map_err(|source| BusError::Hardware { key, source })?;
                    debug!(%key, "hardware subscription torn down");
                }
                Some(merged) if Some(merged) != old => {
                    self.push_merged(key, old, merged)?;
                }
                Some(_) => {}
            }
            state.table.remove_continuous(key, client, new);
        } else if state.table.subscribers(key).map_or(false, |s| s.len() == 1) {
            // Last on-change subscriber.
            self.hal
                .unsubscribe(key)
                .map_err(|source| BusError::Hardware { key, source })?;
        }

        if let Some(callback) = state.table.remove(key, client) {
            state.dedup.evict_key(callback, key);
        }
        Ok(())
    }

    // --- Capability-change subscriptions ---

    /// Subscribe `client` to supported-value changes for `keys`. Purely
    /// engine-local; the hardware pushes capability changes unsolicited.
    pub fn subscribe_supported_value_change(
        &self,
        client: ClientId,
        callback: CallbackId,
        keys: &[PropertyKey],
    ) -> Result<()> {
        if keys.is_empty() {
            return Err(BusError::EmptyKeyList);
        }

        let mut state = self.state.lock();
        for &key in keys {
            state.supported.insert(key, client, callback);
        }
        Ok(())
    }

    /// Drop `client`'s supported-value-change subscriptions for `keys`.
    /// Unknown pairs are a successful no-op.
    pub fn unsubscribe_supported_value_change(
        &self,
        client: ClientId,
        keys: &[PropertyKey],
    ) -> Result<()> {
        if keys.is_empty() {
            return Err(BusError::EmptyKeyList);
        }

        let mut state = self.state.lock();
        for &key in keys {
            state.supported.remove(key, client);
        }
        Ok(())
    }

    // --- Fan-out ingress ---

    /// Fan a hardware batch of value updates out into per-callback delivery
    /// plans. See [`routing`] for the sanitization and suppression rules.
    pub fn route_updates(&self, values: Vec<SampleValue>) -> HashMap<CallbackId, Vec<SampleValue>> {
        let mut state = self.state.lock();
        let EngineState { table, dedup, .. } = &mut *state;
        routing::route_updates(table, dedup, values)
    }

    /// Fan async set failures out to the clients that issued them.
    pub fn route_set_errors(&self, events: &[SetError]) -> HashMap<CallbackId, Vec<SetError>> {
        let state = self.state.lock();
        routing::route_set_errors(&state.table, events)
    }

    /// Fan capability-change notifications out to their watchers.
    pub fn route_supported_value_changes(
        &self,
        keys: &[PropertyKey],
    ) -> HashMap<CallbackId, Vec<PropertyKey>> {
        let state = self.state.lock();
        routing::route_supported_value_changes(&state.supported, keys)
    }

    // --- Diagnostics ---

    /// Distinct clients holding any subscription, value or capability.
    pub fn subscribed_client_count(&self) -> usize {
        let state = self.state.lock();
        let clients: HashSet<ClientId> = state
            .table
            .client_ids()
            .chain(state.supported.client_ids())
            .collect();
        clients.len()
    }

    /// Keys with at least one value subscriber.
    pub fn subscribed_key_count(&self) -> usize {
        self.state.lock().table.key_count()
    }

    pub fn is_empty(&self) -> bool {
        let state = self.state.lock();
        state.table.is_empty() && state.supported.is_empty()
    }

    /// Merged triple currently presented to the hardware for `key`, if any.
    pub fn merged_config(&self, key: PropertyKey) -> Option<MergedConfig> {
        self.state.lock().table.merged_config(key).copied()
    }

    /// Verify every table invariant; exposed for tests.
    pub fn check_invariants(&self) -> bool {
        let state = self.state.lock();
        state.table.check_consistency() && state.supported.check_consistency()
    }
}
