//! Notification fan-out.
//!
//! The router consumes hardware-originated batches (value updates, set
//! failures, capability changes) together with the subscription table and
//! produces per-callback delivery plans; the transport turns each plan entry
//! into one RPC. Value updates additionally pass through per-client
//! resolution rounding and the duplicate-suppression cache.

mod dedup;
mod router;

pub use dedup::DedupCache;

pub(crate) use router::{route_set_errors, route_supported_value_changes, route_updates};
