//! Searchlane Metrics Collection
//!
//! Thread-safe counters for a Searchlane client: how many physical attempts
//! went to each host (and how many failed), and how many logical calls of each
//! category completed, with latency percentiles.
//!
//! # Architecture
//!
//! - [`ClientMetrics`]: lock-free counters plus `RwLock`-guarded key maps
//! - [`MetricsSnapshot`]: serializable point-in-time copy
//!
//! The request executor owns one `ClientMetrics` behind an `Arc` and records
//! into it on every attempt and every call. Nothing here spawns tasks or
//! exports data; callers read snapshots when they want them.
//!
//! # Usage Example
//!
//! ```rust
//! use searchlane_metrics::ClientMetrics;
//! use std::time::Instant;
//!
//! let metrics = ClientMetrics::new();
//! let start = Instant::now();
//! metrics.record_attempt("https://app-1.searchlane.net", true);
//! metrics.record_call("read", start, true);
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.hosts["https://app-1.searchlane.net"].attempt_count, 1);
//! ```

mod registry;
mod snapshot;

pub use registry::ClientMetrics;
pub use snapshot::{CallTypeMetrics, HostMetrics, MetricsSnapshot};
