//! The public client facade.

use searchlane_common::transport::{HttpMethod, ReqwestTransport, Transport};
use searchlane_common::{
    CallType, IndexOperation, IndexQuery, MultiQueryRequest, MultiQueryResponse,
    MultiQueryStrategy, Result, SearchError, SearchQuery, SearchRequestBody, SearchResponse,
    TaskHandle, TaskInfo, TaskStatusResponse,
};
use searchlane_metrics::MetricsSnapshot;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::ClientConfig;
use crate::executor::{ParsedResponse, RequestExecutor, RequestOptions};
use crate::faceting::{AggregatedFacetResult, DisjunctiveFacetPlanner, Refinements, ResultAggregator};
use crate::headers::ApiKeyHeaders;
use crate::hosts::HostPool;
use crate::paths;
use crate::task::{TaskWaiter, WaitOptions};

/// Client for one Searchlane application.
///
/// Cloning is cheap; clones share hosts, connections and metrics.
#[derive(Clone)]
pub struct SearchClient {
    executor: Arc<RequestExecutor>,
    waiter: TaskWaiter,
}

impl SearchClient {
    /// Creates a client using the default HTTP transport.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.timeouts().connect)
            .map_err(|e| SearchError::Configuration(e.to_string()))?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Creates a client that sends every request through `transport`.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;

        let pool = HostPool::with_rng(
            &config.app_id,
            &config.api_key,
            config.hosts.clone(),
            &config.host_domain,
            &mut rand::thread_rng(),
        )?;
        let headers = ApiKeyHeaders::new(config.app_id.as_str(), config.api_key.as_str())
            .with_headers(config.default_headers.clone());

        let executor = RequestExecutor::new(Arc::new(pool), transport, Arc::new(headers))
            .with_timeouts(config.timeouts())
            .with_user_agent(config.user_agent.as_str());

        Ok(Self::from_executor(executor))
    }

    /// Wraps a fully assembled executor.
    pub fn from_executor(executor: RequestExecutor) -> Self {
        let executor = Arc::new(executor);
        Self {
            waiter: TaskWaiter::new(Arc::clone(&executor)),
            executor,
        }
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Sends an arbitrary API call with host failover.
    pub async fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        call_type: CallType,
        options: Option<&RequestOptions>,
    ) -> Result<ParsedResponse> {
        self.executor
            .execute(method, path, body, call_type, options)
            .await
    }

    /// Runs several queries in one request. Results are in request order.
    pub async fn multiple_queries(
        &self,
        queries: &[IndexQuery],
        strategy: Option<MultiQueryStrategy>,
    ) -> Result<MultiQueryResponse> {
        let mut request = MultiQueryRequest::new(queries.to_vec());
        if let Some(strategy) = strategy {
            request = request.with_strategy(strategy);
        }
        let body = serde_json::to_value(&request)?;

        self.executor
            .execute(
                HttpMethod::Post,
                paths::MULTI_QUERY_PATH,
                Some(&body),
                CallType::Search,
                None,
            )
            .await?
            .into_json()
    }

    /// Handle on one index. Does not contact the service.
    pub fn index(&self, name: impl Into<String>) -> Index {
        Index {
            client: self.clone(),
            name: name.into(),
        }
    }

    pub async fn task_status(&self, task: &TaskHandle) -> Result<TaskStatusResponse> {
        self.waiter.task_status(task).await
    }

    /// See [`TaskWaiter::wait_for_completion`].
    pub async fn wait_for_completion(
        &self,
        task: &TaskHandle,
        options: &WaitOptions,
        cancel: Option<&CancellationToken>,
    ) -> Result<()> {
        self.waiter.wait_for_completion(task, options, cancel).await
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.executor.metrics().snapshot()
    }
}

/// Operations scoped to one index.
#[derive(Clone)]
pub struct Index {
    client: SearchClient,
    name: String,
}

impl Index {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        let body = serde_json::to_value(SearchRequestBody::new(query))?;
        self.client
            .execute(
                HttpMethod::Post,
                &paths::query_path(&self.name),
                Some(&body),
                CallType::Search,
                None,
            )
            .await?
            .into_json()
    }

    /// Searches with OR semantics inside each of `disjunctive_facets`.
    ///
    /// Hits come from the fully refined query. Counts of each disjunctive
    /// facet are computed as if that facet were not refined, so unselected
    /// values still show how many hits selecting them would add.
    pub async fn search_disjunctive_faceting<I, S>(
        &self,
        query: &SearchQuery,
        disjunctive_facets: I,
        refinements: &Refinements,
    ) -> Result<AggregatedFacetResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let plan = DisjunctiveFacetPlanner::plan(query, disjunctive_facets, refinements);
        debug!(
            "Faceted search on {} planned as {} queries",
            self.name,
            plan.len()
        );

        let queries: Vec<IndexQuery> = plan
            .sub_queries()
            .iter()
            .map(|q| IndexQuery::new(self.name.as_str(), q))
            .collect();
        let response = self.client.multiple_queries(&queries, None).await?;

        ResultAggregator::aggregate(&plan, response.results)
    }

    pub fn task(&self, task_id: u64) -> TaskHandle {
        TaskHandle::new(self.name.as_str(), task_id)
    }

    pub async fn task_status(&self, task_id: u64) -> Result<TaskStatusResponse> {
        self.client.task_status(&self.task(task_id)).await
    }

    pub async fn wait_task(
        &self,
        task_id: u64,
        options: &WaitOptions,
        cancel: Option<&CancellationToken>,
    ) -> Result<()> {
        self.client
            .wait_for_completion(&self.task(task_id), options, cancel)
            .await
    }

    /// Renames this index to `destination`, replacing any index of that name.
    ///
    /// The returned task belongs to this index; the returned [`Index`] is a
    /// handle on the destination. `self` keeps pointing at the old name.
    pub async fn move_to(&self, destination: impl Into<String>) -> Result<(TaskHandle, Index)> {
        let destination = destination.into();
        if destination.trim().is_empty() {
            return Err(SearchError::InvalidRequest(
                "destination index name must not be blank".to_string(),
            ));
        }

        let body = serde_json::to_value(IndexOperation::move_to(destination.as_str()))?;
        let info: TaskInfo = self
            .client
            .execute(
                HttpMethod::Post,
                &paths::operation_path(&self.name),
                Some(&body),
                CallType::Write,
                None,
            )
            .await?
            .into_json()?;

        Ok((self.task(info.task_id), self.client.index(destination)))
    }
}
