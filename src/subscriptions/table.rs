//! Bidirectional subscription index.

use crate::subscriptions::merge::{merge_configs, ClientConfig, MergedConfig};
use crate::types::{CallbackId, ClientId, PropertyKey};
use std::collections::{HashMap, HashSet};

/// State kept for a continuous key while it has subscribers.
#[derive(Clone, Debug)]
pub(crate) struct ContinuousState {
    /// Contributing per-client configs, one per subscribed client.
    pub configs: HashMap<ClientId, ClientConfig>,

    /// Triple most recently presented to the hardware.
    pub merged: MergedConfig,
}

/// Subscription index, keyed both ways.
///
/// Invariants, outside a mutation in progress:
/// 1. A key entry is never present with an empty client map.
/// 2. A client entry is never present with an empty key set.
/// 3. `clients_by_key[key][client]` exists iff `keys_by_client[client]`
///    contains `key`.
/// 4. A continuous entry for `key` exists iff `clients_by_key[key]` exists
///    (for continuous keys), and its config set names exactly those clients.
///
/// Both indices mutate only through [`insert`](Self::insert) and
/// [`remove`](Self::remove), so callers cannot cause divergence; debug
/// builds re-check the invariants after every mutation.
#[derive(Default)]
pub struct SubscriptionTable {
    /// key -> client -> delivery callback.
    clients_by_key: HashMap<PropertyKey, HashMap<ClientId, CallbackId>>,

    /// client -> keys it subscribes to.
    keys_by_client: HashMap<ClientId, HashSet<PropertyKey>>,

    /// Per-key merge state, continuous keys only.
    continuous: HashMap<PropertyKey, ContinuousState>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Queries ---

    /// Whether any client subscribes to `key`.
    pub fn contains_key(&self, key: PropertyKey) -> bool {
        self.clients_by_key.contains_key(&key)
    }

    /// Subscribers of `key`, as `client -> callback`.
    pub(crate) fn subscribers(
        &self,
        key: PropertyKey,
    ) -> Option<&HashMap<ClientId, CallbackId>> {
        self.clients_by_key.get(&key)
    }

    /// Keys `client` subscribes to.
    pub fn keys_of(&self, client: ClientId) -> Option<&HashSet<PropertyKey>> {
        self.keys_by_client.get(&client)
    }

    /// Callback registered for `(key, client)`.
    pub fn callback_of(&self, key: PropertyKey, client: ClientId) -> Option<CallbackId> {
        self.clients_by_key.get(&key)?.get(&client).copied()
    }

    /// Number of distinct subscribed clients.
    pub fn client_count(&self) -> usize {
        self.keys_by_client.len()
    }

    /// Distinct subscribed clients.
    pub(crate) fn client_ids(&self) -> impl Iterator<Item = ClientId> + '_ {
        self.keys_by_client.keys().copied()
    }

    /// Number of keys with at least one subscriber.
    pub fn key_count(&self) -> usize {
        self.clients_by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients_by_key.is_empty()
    }

    /// Merged triple currently presented to the hardware for `key`.
    pub fn merged_config(&self, key: PropertyKey) -> Option<&MergedConfig> {
        self.continuous.get(&key).map(|state| &state.merged)
    }

    pub(crate) fn continuous_state(&self, key: PropertyKey) -> Option<&ContinuousState> {
        self.continuous.get(&key)
    }

    /// Merged triple if `client`'s config for `key` became `config`.
    pub(crate) fn merged_with(
        &self,
        key: PropertyKey,
        client: ClientId,
        config: ClientConfig,
    ) -> MergedConfig {
        let mut configs: Vec<&ClientConfig> = Vec::new();
        if let Some(state) = self.continuous.get(&key) {
            configs.extend(state.configs.iter().filter(|(c, _)| **c != client).map(|(_, cfg)| cfg));
        }
        configs.push(&config);

        // Non-empty by construction.
        merge_configs(configs).expect("merge over at least one config")
    }

    /// Merged triple over the remaining configs if `client` dropped out of
    /// `key`. `None` when no contributor would remain.
    pub(crate) fn merged_without(
        &self,
        key: PropertyKey,
        client: ClientId,
    ) -> Option<MergedConfig> {
        let state = self.continuous.get(&key)?;
        merge_configs(
            state
                .configs
                .iter()
                .filter(|(c, _)| **c != client)
                .map(|(_, cfg)| cfg),
        )
    }

    // --- Mutation ---

    /// Record `(client, key) -> callback` in both indices.
    pub(crate) fn insert(&mut self, key: PropertyKey, client: ClientId, callback: CallbackId) {
        self.clients_by_key
            .entry(key)
            .or_default()
            .insert(client, callback);
        self.keys_by_client.entry(client).or_default().insert(key);

        #[cfg(debug_assertions)]
        self.debug_check();
    }

    /// Remove the `(client, key)` pair from both indices, dropping entries
    /// that become empty. Returns the callback that was registered, or
    /// `None` if the pair was not present.
    pub(crate) fn remove(&mut self, key: PropertyKey, client: ClientId) -> Option<CallbackId> {
        let callback = match self.clients_by_key.get_mut(&key) {
            Some(clients) => {
                let callback = clients.remove(&client);
                if clients.is_empty() {
                    self.clients_by_key.remove(&key);
                }
                callback
            }
            None => None,
        };

        if callback.is_some() {
            if let Some(keys) = self.keys_by_client.get_mut(&client) {
                keys.remove(&key);
                if keys.is_empty() {
                    self.keys_by_client.remove(&client);
                }
            }
        }

        #[cfg(debug_assertions)]
        self.debug_check();

        callback
    }

    /// Insert or replace `client`'s continuous config for `key` and store
    /// the merged triple the hardware was just told about.
    pub(crate) fn apply_continuous(
        &mut self,
        key: PropertyKey,
        client: ClientId,
        config: ClientConfig,
        merged: MergedConfig,
    ) {
        let state = self.continuous.entry(key).or_insert_with(|| ContinuousState {
            configs: HashMap::new(),
            merged,
        });
        state.configs.insert(client, config);
        state.merged = merged;
    }

    /// Drop `client`'s continuous config for `key`. Stores `new_merged` for
    /// the remaining contributors, or deletes the entry when none remain.
    pub(crate) fn remove_continuous(
        &mut self,
        key: PropertyKey,
        client: ClientId,
        new_merged: Option<MergedConfig>,
    ) {
        match new_merged {
            Some(merged) => {
                if let Some(state) = self.continuous.get_mut(&key) {
                    state.configs.remove(&client);
                    state.merged = merged;
                }
            }
            None => {
                self.continuous.remove(&key);
            }
        }
    }

    // --- Consistency ---

    /// Verify every table invariant. Exposed for tests; debug builds run it
    /// after each index mutation.
    pub fn check_consistency(&self) -> bool {
        for (key, clients) in &self.clients_by_key {
            if clients.is_empty() {
                return false;
            }
            for client in clients.keys() {
                match self.keys_by_client.get(client) {
                    Some(keys) if keys.contains(key) => {}
                    _ => return false,
                }
            }
        }

        for (client, keys) in &self.keys_by_client {
            if keys.is_empty() {
                return false;
            }
            for key in keys {
                match self.clients_by_key.get(key) {
                    Some(clients) if clients.contains_key(client) => {}
                    _ => return false,
                }
            }
        }

        for (key, state) in &self.continuous {
            let Some(clients) = self.clients_by_key.get(key) else {
                return false;
            };
            if state.configs.len() != clients.len()
                || !state.configs.keys().all(|c| clients.contains_key(c))
            {
                return false;
            }
            match merge_configs(state.configs.values()) {
                Some(merged) if merged == state.merged => {}
                _ => return false,
            }
        }

        true
    }

    #[cfg(debug_assertions)]
    fn debug_check(&self) {
        // The continuous map lags the indices inside a compound mutation, so
        // only the index invariants are checked here.
        debug_assert!(
            self.clients_by_key.values().all(|clients| !clients.is_empty()),
            "key entry with empty client map"
        );
        debug_assert!(
            self.keys_by_client.values().all(|keys| !keys.is_empty()),
            "client entry with empty key set"
        );
    }
}
