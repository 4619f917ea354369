//! Searchlane Common Types and Transport
//!
//! This crate provides the wire protocol records and the HTTP transport seam
//! shared by the Searchlane client crates.
//!
//! # Overview
//!
//! Searchlane talks to a hosted multi-tenant search service over HTTPS. Every
//! logical call is a JSON request against one of several redundant hosts.
//! This crate contains the pieces that do not depend on how hosts are picked:
//!
//! - **Protocol Layer**: search queries, filter expressions, responses, task
//!   status records and the [`SearchError`] taxonomy
//! - **Transport Layer**: the [`Transport`](transport::Transport) trait and its
//!   `reqwest`-backed implementation
//!
//! # Example
//!
//! ```
//! use searchlane_common::{FilterClause, FilterExpression, SearchQuery};
//!
//! let filters = FilterExpression::new()
//!     .and(FilterClause::any_of("stars", ["*", "**"]))
//!     .and(FilterClause::equals("city", "Paris"));
//!
//! let query = SearchQuery::new("hotel")
//!     .with_hits_per_page(20)
//!     .with_filter_expression(&filters);
//!
//! assert!(query.to_params().contains("hitsPerPage=20"));
//! ```

pub mod protocol;
pub mod transport;

pub use protocol::*;
