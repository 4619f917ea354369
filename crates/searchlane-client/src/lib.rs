//! Searchlane Client
//!
//! Asynchronous client for a hosted search service reachable through several
//! interchangeable hosts.
//!
//! # Architecture
//!
//! ```text
//! SearchClient / Index
//!   ├─ DisjunctiveFacetPlanner ─┐
//!   │                           ├─ one multi-query call ─┐
//!   ├─ ResultAggregator ────────┘                        │
//!   ├─ TaskWaiter ── polls task status ─────────────────┤
//!   └─ RequestExecutor ◄────────────────────────────────┘
//!        ├─ HostPool (up/down per host)
//!        ├─ HeaderProvider (credentials)
//!        └─ Transport (reqwest by default)
//! ```
//!
//! - **[`HostPool`]**: hosts in failover order; failed hosts move to the back
//! - **[`RequestExecutor`]**: walks the hosts until one answers; a 4xx ends the walk
//! - **[`TaskWaiter`]**: waits for a write to be published, with cancellation
//! - **[`faceting`]**: disjunctive faceting over a single multi-query request
//!
//! # Example
//!
//! ```no_run
//! use searchlane_client::{ClientConfig, Refinements, SearchClient};
//! use searchlane_common::SearchQuery;
//!
//! # #[tokio::main]
//! # async fn main() -> searchlane_common::Result<()> {
//! let client = SearchClient::new(ClientConfig::new("APP", "api-key"))?;
//! let hotels = client.index("hotels");
//!
//! let mut refinements = Refinements::new();
//! refinements.insert("stars".to_string(), vec!["****".to_string()]);
//!
//! let result = hotels
//!     .search_disjunctive_faceting(&SearchQuery::new("paris"), ["stars"], &refinements)
//!     .await?;
//! println!("{} hits, stars: {:?}", result.nb_hits(), result.disjunctive_facet("stars"));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod executor;
pub mod faceting;
pub mod headers;
pub mod hosts;
pub mod paths;
pub mod task;

pub use client::{Index, SearchClient};
pub use config::{ClientConfig, Timeouts, DEFAULT_HOST_DOMAIN};
pub use executor::{ParsedResponse, RequestExecutor, RequestOptions, RequestOutcome};
pub use faceting::{
    AggregatedFacetResult, DisjunctiveFacetPlanner, FacetQueryPlan, Refinements, ResultAggregator,
    SiblingQuery,
};
pub use headers::{ApiKeyHeaders, HeaderProvider};
pub use hosts::{Host, HostPool, HostSpec, HostStatus};
pub use task::{TaskWaiter, WaitOptions};

pub use searchlane_metrics::MetricsSnapshot;
pub use tokio_util::sync::CancellationToken;
