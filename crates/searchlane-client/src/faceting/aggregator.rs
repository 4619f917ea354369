//! Merging of a faceted search's responses.

use searchlane_common::{FacetCounts, Result, SearchError, SearchResponse};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::planner::FacetQueryPlan;

/// Hits of the primary query plus counts for every disjunctive facet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedFacetResult {
    /// Primary response, unchanged.
    pub response: SearchResponse,
    /// Counts that ignore the facet's own refinement. Every refined value has
    /// an entry, 0 when the service returned none.
    pub disjunctive_facets: BTreeMap<String, FacetCounts>,
}

impl AggregatedFacetResult {
    pub fn hits(&self) -> &[Value] {
        &self.response.hits
    }

    pub fn nb_hits(&self) -> u64 {
        self.response.nb_hits
    }

    /// Conjunctive facet counts from the primary response.
    pub fn facets(&self) -> &BTreeMap<String, FacetCounts> {
        &self.response.facets
    }

    pub fn disjunctive_facet(&self, facet: &str) -> Option<&FacetCounts> {
        self.disjunctive_facets.get(facet)
    }
}

/// Combines the responses of a [`FacetQueryPlan`].
pub struct ResultAggregator;

impl ResultAggregator {
    /// `responses` must be in sub-query order: primary first, then one per
    /// sibling. Position is the only link between a response and its query.
    pub fn aggregate(
        plan: &FacetQueryPlan,
        responses: Vec<SearchResponse>,
    ) -> Result<AggregatedFacetResult> {
        if responses.len() != plan.len() {
            return Err(SearchError::InvalidResponse(format!(
                "expected {} responses for faceted search, got {}",
                plan.len(),
                responses.len()
            )));
        }

        let mut responses = responses.into_iter();
        let response = responses.next().ok_or_else(|| {
            SearchError::InvalidResponse("missing primary response".to_string())
        })?;

        let mut disjunctive_facets = BTreeMap::new();
        for (sibling, mut sibling_response) in plan.siblings().iter().zip(responses) {
            let counts = sibling_response
                .facets
                .remove(&sibling.facet)
                .unwrap_or_default();
            disjunctive_facets.insert(sibling.facet.clone(), counts);
        }

        for facet in plan.disjunctive_facets() {
            let counts = disjunctive_facets.entry(facet.clone()).or_default();
            for value in plan.refined_values(facet) {
                counts.entry(value.clone()).or_insert(0);
            }
        }

        Ok(AggregatedFacetResult {
            response,
            disjunctive_facets,
        })
    }
}
