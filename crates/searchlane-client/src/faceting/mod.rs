//! Disjunctive faceting.
//!
//! A faceted search is planned into one primary query plus one count query
//! per disjunctive facet, sent as a single multi-query batch, and merged back
//! into an [`AggregatedFacetResult`].

pub mod aggregator;
pub mod planner;

pub use aggregator::{AggregatedFacetResult, ResultAggregator};
pub use planner::{DisjunctiveFacetPlanner, FacetQueryPlan, Refinements, SiblingQuery};
