//! Searchlane Response Types
//!
//! Typed views over the JSON bodies the service returns. Unknown fields of a
//! search response are preserved in [`SearchResponse::extra`] so that
//! aggregation can hand the primary response back verbatim.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Facet value → hit count.
pub type FacetCounts = BTreeMap<String, u64>;

/// Result of a single search.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: Vec<Value>,
    #[serde(default)]
    pub nb_hits: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub nb_pages: u32,
    #[serde(default)]
    pub hits_per_page: u32,
    #[serde(default, rename = "processingTimeMS")]
    pub processing_time_ms: u64,
    #[serde(default)]
    pub facets: BTreeMap<String, FacetCounts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl SearchResponse {
    /// Counts for one facet, if the service returned any.
    pub fn facet(&self, name: &str) -> Option<&FacetCounts> {
        self.facets.get(name)
    }
}

/// Result of `POST /1/indexes/*/queries`, positionally aligned with the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MultiQueryResponse {
    #[serde(default)]
    pub results: Vec<SearchResponse>,
}

/// Body of `GET /1/indexes/{index}/task/{taskID}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusResponse {
    pub status: String,
    #[serde(default)]
    pub pending_task: bool,
}

impl TaskStatusResponse {
    /// The only status value that means a write is visible.
    pub const PUBLISHED: &'static str = "published";

    pub fn is_published(&self) -> bool {
        self.status == Self::PUBLISHED
    }
}

/// Acknowledgement of a write operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    #[serde(rename = "taskID")]
    pub task_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Identifies an asynchronous write so its completion can be awaited.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskHandle {
    pub index_name: String,
    pub task_id: u64,
}

impl TaskHandle {
    pub fn new(index_name: impl Into<String>, task_id: u64) -> Self {
        Self {
            index_name: index_name.into(),
            task_id,
        }
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.index_name, self.task_id)
    }
}
