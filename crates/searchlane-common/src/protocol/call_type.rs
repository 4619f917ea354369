//! Call categories.
//!
//! Every logical call is classified as a read, a write or a search. The
//! category picks the timeout tier and the subset of hosts that may serve it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a logical API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    /// Metadata reads such as task status or settings.
    Read,
    /// Mutations; these return a task identifier.
    Write,
    /// Queries, including batched multi-queries.
    Search,
}

impl CallType {
    /// All categories, in declaration order.
    pub const ALL: [CallType; 3] = [CallType::Read, CallType::Write, CallType::Search];

    pub fn as_str(&self) -> &'static str {
        match self {
            CallType::Read => "read",
            CallType::Write => "write",
            CallType::Search => "search",
        }
    }

    /// Returns `true` for the short timeout tier (reads and searches).
    pub fn is_read_like(&self) -> bool {
        !matches!(self, CallType::Write)
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
