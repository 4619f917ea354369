//! Request bodies sent to the service.

use serde::{Deserialize, Serialize};

use super::query::SearchQuery;

/// Body of a single-index search: `{"params": "<url-encoded>"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchRequestBody {
    pub params: String,
}

impl SearchRequestBody {
    pub fn new(query: &SearchQuery) -> Self {
        Self {
            params: query.to_params(),
        }
    }
}

/// One entry of a multi-query batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndexQuery {
    pub index_name: String,
    pub params: String,
}

impl IndexQuery {
    pub fn new(index_name: impl Into<String>, query: &SearchQuery) -> Self {
        Self {
            index_name: index_name.into(),
            params: query.to_params(),
        }
    }
}

/// How the service should run the queries of a batch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MultiQueryStrategy {
    /// Run every query.
    None,
    /// Skip the remaining queries once one returns enough hits.
    StopIfEnoughMatches,
}

/// Body of `POST /1/indexes/*/queries`.
///
/// Results come back in the same order as `requests`; position is the only
/// correlation key the protocol offers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MultiQueryRequest {
    pub requests: Vec<IndexQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<MultiQueryStrategy>,
}

impl MultiQueryRequest {
    pub fn new(requests: Vec<IndexQuery>) -> Self {
        Self {
            requests,
            strategy: None,
        }
    }

    pub fn with_strategy(mut self, strategy: MultiQueryStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

/// Body of `POST /1/indexes/{index}/operation`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexOperation {
    pub operation: String,
    pub destination: String,
}

impl IndexOperation {
    pub fn move_to(destination: impl Into<String>) -> Self {
        Self {
            operation: "move".to_string(),
            destination: destination.into(),
        }
    }
}
