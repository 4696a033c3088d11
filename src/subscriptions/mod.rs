//! Subscription state and orchestration.
//!
//! A subscription ties a client to a `(property, area)` key with delivery
//! parameters. Continuous keys carry one merged hardware subscription shared
//! by all of their clients:
//! - fastest requested rate wins,
//! - finest requested resolution wins,
//! - hardware-side duplicate suppression only when every client asked.
//!
//! [`SubscriptionManager`] is the only entry point for mutation; it owns the
//! engine lock and reconciles the hardware inside it.

mod manager;
mod merge;
mod table;

pub use manager::SubscriptionManager;
pub use merge::{
    interval_nanos, is_valid_resolution, is_valid_sample_rate, merge_configs, ClientConfig,
    MergedConfig, SubscribeOption,
};
pub use table::SubscriptionTable;
