//! # Property Bus
//!
//! Subscription merging and notification fan-out for a keyed telemetry
//! source: many remote clients, one hardware subscription per key, each
//! client served at its own rate, precision, and duplicate-suppression
//! policy.
//!
//! ## Core Concepts
//!
//! - **Keys**: a `(property_id, area_id)` pair names one subscribable entity
//! - **Merged subscriptions**: continuous keys present one combined
//!   rate/resolution/VUR triple to the hardware for all of their clients
//! - **Fan-out**: hardware batches become per-callback delivery plans, with
//!   per-client rounding and duplicate suppression applied on the way out
//! - **Idempotence**: hardware calls and unsubscribes are safe to retry
//!
//! ## Example
//!
//! ```ignore
//! use propbus::{ClientId, CallbackId, PropertyKey, SubscribeOption, SubscriptionManager};
//!
//! let manager = SubscriptionManager::new(hal);
//!
//! // One client wants speed at 10 Hz rounded to whole units.
//! let options = SubscribeOption::expand(VEHICLE_SPEED, &[0], 10.0, 1.0, false)?;
//! manager.subscribe(ClientId(1), CallbackId(1), &options, true)?;
//!
//! // Hardware delivered a batch; hand each client its tailored samples.
//! for (callback, samples) in manager.route_updates(batch) {
//!     transport.deliver(callback, samples);
//! }
//! ```

pub mod error;
pub mod hal;
pub mod routing;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use error::{BusError, Result};
pub use hal::{HalError, HalResult, PropertyHal};
pub use routing::DedupCache;
pub use subscriptions::{
    interval_nanos, is_valid_resolution, is_valid_sample_rate, merge_configs, ClientConfig,
    MergedConfig, SubscribeOption, SubscriptionManager, SubscriptionTable,
};
pub use types::*;
