// Copyright 2025 Searchlane Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metrics for one call category (read, write, search).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallTypeMetrics {
    pub call_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub avg_latency_us: u64,
    pub p50_latency_us: u64,
    pub p95_latency_us: u64,
    pub p99_latency_us: u64,
}

/// Physical attempts made against one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostMetrics {
    pub host: String,
    pub attempt_count: u64,
    pub failure_count: u64,
    pub last_attempt_ms: u64,
}

impl HostMetrics {
    pub fn new(host: String) -> Self {
        Self {
            host,
            attempt_count: 0,
            failure_count: 0,
            last_attempt_ms: 0,
        }
    }
}

/// Point-in-time view of a client's metrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub total_attempts: u64,
    pub uptime_ms: u64,
    pub call_types: HashMap<String, CallTypeMetrics>,
    pub hosts: HashMap<String, HostMetrics>,
}
