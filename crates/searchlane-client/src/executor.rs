//! Request execution with host failover.
//!
//! A logical call walks the candidate hosts of its call type one at a time.
//! Transport failures and 5xx responses move on to the next host; a 4xx stops
//! the walk because every host would reject the same request.

use searchlane_common::transport::{HttpMethod, HttpRequest, HttpResponse, Transport};
use searchlane_common::{CallType, Result, SearchError};
use searchlane_metrics::ClientMetrics;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::{default_user_agent, Timeouts};
use crate::headers::HeaderProvider;
use crate::hosts::{Host, HostPool};

/// Per-call overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Sent after the client's own headers.
    pub headers: Vec<(String, String)>,
    /// Appended to the URL query string.
    pub query_params: Vec<(String, String)>,
    /// Replaces the call type's request timeout.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((name.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Successful result of [`RequestExecutor::execute`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub body: Value,
    /// Base URL of the host that answered.
    pub host: String,
    /// Physical calls made, the successful one included.
    pub attempts: usize,
}

impl ParsedResponse {
    /// Deserializes the body into a typed record.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T> {
        serde_json::from_value(self.body).map_err(|e| {
            SearchError::InvalidResponse(format!("unexpected response from {}: {}", self.host, e))
        })
    }
}

/// Classification of one physical call.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    Success(Value),
    /// The host could not serve the call; another host may.
    RetryableFailure(String),
    /// The service rejected the request itself.
    FatalFailure { status: u16, message: String },
}

impl RequestOutcome {
    pub fn from_response(response: &HttpResponse) -> Self {
        let status = response.status;

        if response.is_success() {
            if response.body.iter().all(u8::is_ascii_whitespace) {
                return RequestOutcome::Success(Value::Null);
            }
            return match serde_json::from_slice(&response.body) {
                Ok(body) => RequestOutcome::Success(body),
                Err(e) => RequestOutcome::RetryableFailure(format!(
                    "HTTP {} with invalid JSON body: {}",
                    status, e
                )),
            };
        }

        if response.is_client_error() {
            return RequestOutcome::FatalFailure {
                status,
                message: error_message(response),
            };
        }

        if response.is_server_error() {
            return RequestOutcome::RetryableFailure(format!(
                "HTTP {}: {}",
                status,
                error_message(response)
            ));
        }

        RequestOutcome::RetryableFailure(format!("unexpected HTTP status {}", status))
    }
}

/// `message` from a JSON error body, or the canonical reason phrase.
fn error_message(response: &HttpResponse) -> String {
    serde_json::from_slice::<Value>(&response.body)
        .ok()
        .and_then(|body| body.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| canonical_reason(response.status))
}

fn canonical_reason(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status))
}

/// A failed physical call, kept for the exhaustion report.
#[derive(Debug)]
struct CallAttempt {
    host: String,
    method: HttpMethod,
    path: String,
    started_at: Instant,
    reason: String,
}

/// Sends logical calls across the host pool.
///
/// Safe to share between tasks: all mutable state lives in the pool's atomics
/// and the metrics registry.
pub struct RequestExecutor {
    pool: Arc<HostPool>,
    transport: Arc<dyn Transport>,
    headers: Arc<dyn HeaderProvider>,
    timeouts: Timeouts,
    user_agent: String,
    metrics: Arc<ClientMetrics>,
}

impl RequestExecutor {
    pub fn new(
        pool: Arc<HostPool>,
        transport: Arc<dyn Transport>,
        headers: Arc<dyn HeaderProvider>,
    ) -> Self {
        Self {
            pool,
            transport,
            headers,
            timeouts: Timeouts::default(),
            user_agent: default_user_agent(),
            metrics: Arc::new(ClientMetrics::new()),
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<ClientMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn host_pool(&self) -> &Arc<HostPool> {
        &self.pool
    }

    pub fn metrics(&self) -> &Arc<ClientMetrics> {
        &self.metrics
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Runs one logical call, failing over between hosts.
    ///
    /// `path` is relative to the host base URL and must start with `/`.
    /// `body` is only sent for POST and PUT.
    pub async fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        call_type: CallType,
        options: Option<&RequestOptions>,
    ) -> Result<ParsedResponse> {
        let start_time = Instant::now();
        let result = self
            .execute_with_failover(method, path, body, call_type, options)
            .await;
        self.metrics
            .record_call(call_type.as_str(), start_time, result.is_ok());
        result
    }

    async fn execute_with_failover(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        call_type: CallType,
        options: Option<&RequestOptions>,
    ) -> Result<ParsedResponse> {
        let payload = match body {
            Some(body) if method.carries_body() => Some(serde_json::to_vec(body)?),
            _ => None,
        };
        let path_and_query = build_path_and_query(path, options)?;
        let timeout = options
            .and_then(|o| o.timeout)
            .unwrap_or_else(|| self.timeouts.for_call(call_type));

        let candidates = self.pool.hosts(call_type);
        if candidates.is_empty() {
            return Err(SearchError::Configuration(format!(
                "no host serves {} calls",
                call_type
            )));
        }

        let mut failures: Vec<CallAttempt> = Vec::with_capacity(candidates.len());

        for (index, host) in candidates.iter().enumerate() {
            let attempt = index + 1;
            debug!(
                "{} {} via {} (attempt {}/{})",
                method,
                path,
                host.base_url(),
                attempt,
                candidates.len()
            );

            let started_at = Instant::now();
            let request = self.build_request(host, method, &path_and_query, payload.clone(), timeout, options);
            let outcome = match self.transport.send(request).await {
                Ok(response) => RequestOutcome::from_response(&response),
                Err(e) => RequestOutcome::RetryableFailure(e.to_string()),
            };

            match outcome {
                RequestOutcome::Success(body) => {
                    self.pool.mark_up(host);
                    self.metrics.record_attempt(host.base_url(), true);
                    if attempt > 1 {
                        info!(
                            "{} {} succeeded on {} after {} failed host(s)",
                            method,
                            path,
                            host.base_url(),
                            failures.len()
                        );
                    }
                    return Ok(ParsedResponse {
                        body,
                        host: host.base_url().to_string(),
                        attempts: attempt,
                    });
                }
                RequestOutcome::FatalFailure { status, message } => {
                    // The host answered; only the request is at fault.
                    self.metrics.record_attempt(host.base_url(), true);
                    debug!(
                        "{} {} rejected by {} with {}: {}",
                        method,
                        path,
                        host.base_url(),
                        status,
                        message
                    );
                    return Err(SearchError::api(status, message));
                }
                RequestOutcome::RetryableFailure(reason) => {
                    self.pool.mark_down(host);
                    self.metrics.record_attempt(host.base_url(), false);
                    let failure = CallAttempt {
                        host: host.base_url().to_string(),
                        method,
                        path: path.to_string(),
                        started_at,
                        reason,
                    };
                    warn!(
                        "{} {} failed on {} after {}ms: {}",
                        failure.method,
                        failure.path,
                        failure.host,
                        failure.started_at.elapsed().as_millis(),
                        failure.reason
                    );
                    failures.push(failure);
                }
            }
        }

        Err(exhausted(failures))
    }

    fn build_request(
        &self,
        host: &Host,
        method: HttpMethod,
        path_and_query: &str,
        payload: Option<Vec<u8>>,
        timeout: Duration,
        options: Option<&RequestOptions>,
    ) -> HttpRequest {
        let mut request = HttpRequest::new(method, format!("{}{}", host.base_url(), path_and_query))
            .with_timeout(timeout)
            .with_header("Content-Type", "application/json")
            .with_header("User-Agent", self.user_agent.as_str());

        for (name, value) in self.headers.headers() {
            request = request.with_header(name, value);
        }
        if let Some(options) = options {
            for (name, value) in &options.headers {
                request = request.with_header(name.as_str(), value.as_str());
            }
        }
        if let Some(payload) = payload {
            request = request.with_body(payload);
        }

        request
    }
}

fn build_path_and_query(path: &str, options: Option<&RequestOptions>) -> Result<String> {
    if !path.starts_with('/') {
        return Err(SearchError::InvalidRequest(format!(
            "path must start with '/': {:?}",
            path
        )));
    }

    let params = match options {
        Some(options) if !options.query_params.is_empty() => &options.query_params,
        _ => return Ok(path.to_string()),
    };

    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter())
        .finish();
    let separator = if path.contains('?') { '&' } else { '?' };
    Ok(format!("{}{}{}", path, separator, query))
}

fn exhausted(failures: Vec<CallAttempt>) -> SearchError {
    let attempted_hosts = failures.iter().map(|f| f.host.clone()).collect();
    let per_host_errors: HashMap<String, String> = failures
        .into_iter()
        .map(|f| (f.host, f.reason))
        .collect();

    SearchError::NetworkExhausted {
        attempted_hosts,
        per_host_errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::ApiKeyHeaders;
    use crate::hosts::HostSpec;
    use async_trait::async_trait;
    use searchlane_common::transport::TransportError;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned results in order and records every request.
    #[derive(Default)]
    struct ScriptedTransport {
        script: Mutex<VecDeque<std::result::Result<HttpResponse, TransportError>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<std::result::Result<HttpResponse, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
            self.requests.lock().unwrap().push(request);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Other("script exhausted".into())))
        }
    }

    fn executor(transport: Arc<ScriptedTransport>, hosts: &[&str]) -> RequestExecutor {
        let specs = hosts.iter().map(|h| HostSpec::new(*h)).collect();
        let pool = Arc::new(HostPool::new("APP", "secret", Some(specs)).unwrap());
        RequestExecutor::new(pool, transport, Arc::new(ApiKeyHeaders::new("APP", "secret")))
    }

    fn ok(body: Value) -> std::result::Result<HttpResponse, TransportError> {
        Ok(HttpResponse::new(200, serde_json::to_vec(&body).unwrap()))
    }

    // ============================================================================
    // Classification Tests
    // ============================================================================

    #[test]
    fn test_classify_success() {
        let outcome = RequestOutcome::from_response(&HttpResponse::new(200, r#"{"a":1}"#));
        assert_eq!(outcome, RequestOutcome::Success(json!({"a": 1})));

        let empty = RequestOutcome::from_response(&HttpResponse::new(204, ""));
        assert_eq!(empty, RequestOutcome::Success(Value::Null));
    }

    #[test]
    fn test_classify_invalid_json_is_retryable() {
        let outcome = RequestOutcome::from_response(&HttpResponse::new(200, "<html>"));
        assert!(matches!(outcome, RequestOutcome::RetryableFailure(_)));
    }

    #[test]
    fn test_classify_client_errors() {
        let outcome = RequestOutcome::from_response(&HttpResponse::new(
            403,
            r#"{"message":"Invalid Application-ID or API key","status":403}"#,
        ));
        assert_eq!(
            outcome,
            RequestOutcome::FatalFailure {
                status: 403,
                message: "Invalid Application-ID or API key".to_string()
            }
        );

        let outcome = RequestOutcome::from_response(&HttpResponse::new(404, "not json"));
        assert_eq!(
            outcome,
            RequestOutcome::FatalFailure {
                status: 404,
                message: "Not Found".to_string()
            }
        );

        let outcome = RequestOutcome::from_response(&HttpResponse::new(429, ""));
        assert!(matches!(outcome, RequestOutcome::FatalFailure { status: 429, .. }));
    }

    #[test]
    fn test_classify_server_and_unexpected_statuses() {
        let outcome = RequestOutcome::from_response(&HttpResponse::new(503, ""));
        assert_eq!(
            outcome,
            RequestOutcome::RetryableFailure("HTTP 503: Service Unavailable".to_string())
        );

        let outcome = RequestOutcome::from_response(&HttpResponse::new(302, ""));
        assert!(matches!(outcome, RequestOutcome::RetryableFailure(_)));
    }

    #[test]
    fn test_path_and_query() {
        assert_eq!(build_path_and_query("/1/indexes", None).unwrap(), "/1/indexes");

        let options = RequestOptions::new()
            .with_query_param("forwardToReplicas", "true")
            .with_query_param("q", "a b");
        assert_eq!(
            build_path_and_query("/1/indexes/x/settings", Some(&options)).unwrap(),
            "/1/indexes/x/settings?forwardToReplicas=true&q=a+b"
        );
        assert_eq!(
            build_path_and_query("/1/x?a=1", Some(&options)).unwrap(),
            "/1/x?a=1&forwardToReplicas=true&q=a+b"
        );

        assert!(matches!(
            build_path_and_query("1/indexes", None),
            Err(SearchError::InvalidRequest(_))
        ));
    }

    // ============================================================================
    // Execution Tests
    // ============================================================================

    #[tokio::test]
    async fn test_request_shape() {
        let transport = ScriptedTransport::new(vec![ok(json!({"results": []}))]);
        let executor = executor(transport.clone(), &["http://h1"]);
        let options = RequestOptions::new().with_header("X-Trace", "abc");

        let response = executor
            .execute(
                HttpMethod::Post,
                "/1/indexes/*/queries",
                Some(&json!({"requests": []})),
                CallType::Search,
                Some(&options),
            )
            .await
            .unwrap();
        assert_eq!(response.attempts, 1);
        assert_eq!(response.host, "http://h1");

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.url, "http://h1/1/indexes/*/queries");
        assert_eq!(request.timeout, Duration::from_secs(5));
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("x-application-id"), Some("APP"));
        assert_eq!(request.header("X-API-Key"), Some("secret"));
        assert_eq!(request.header("X-Trace"), Some("abc"));
        assert!(request.header("User-Agent").unwrap().starts_with("searchlane-rust/"));
        assert_eq!(request.body.as_deref(), Some(br#"{"requests":[]}"#.as_slice()));
    }

    #[tokio::test]
    async fn test_get_sends_no_body_and_uses_timeout_override() {
        let transport = ScriptedTransport::new(vec![ok(json!({"status": "published"}))]);
        let executor = executor(transport.clone(), &["http://h1"]);
        let options = RequestOptions::new().with_timeout(Duration::from_millis(250));

        executor
            .execute(
                HttpMethod::Get,
                "/1/indexes/a/task/1",
                Some(&json!({"ignored": true})),
                CallType::Read,
                Some(&options),
            )
            .await
            .unwrap();

        let request = &transport.requests()[0];
        assert!(request.body.is_none());
        assert_eq!(request.timeout, Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_write_uses_write_timeout() {
        let transport = ScriptedTransport::new(vec![ok(json!({"taskID": 1}))]);
        let executor = executor(transport.clone(), &["http://h1"]);

        executor
            .execute(HttpMethod::Post, "/1/indexes/a/operation", None, CallType::Write, None)
            .await
            .unwrap();
        assert_eq!(transport.requests()[0].timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_failover_marks_hosts() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::Connect("refused".into())),
            Ok(HttpResponse::new(502, "")),
            ok(json!({"ok": true})),
        ]);
        let executor = executor(transport.clone(), &["http://h1", "http://h2", "http://h3"]);

        let response = executor
            .execute(HttpMethod::Get, "/1/indexes", None, CallType::Read, None)
            .await
            .unwrap();
        assert_eq!(response.attempts, 3);
        assert_eq!(response.host, "http://h3");

        let pool = executor.host_pool();
        let statuses: Vec<bool> = pool.all().iter().map(|h| h.is_up()).collect();
        assert_eq!(statuses, vec![false, false, true]);

        // the healthy host is tried first next time
        let order = pool.hosts(CallType::Read);
        let order: Vec<&str> = order.iter().map(|h| h.base_url()).collect();
        assert_eq!(order, vec!["http://h3", "http://h1", "http://h2"]);

        let snapshot = executor.metrics().snapshot();
        assert_eq!(snapshot.total_calls, 1);
        assert_eq!(snapshot.successful_calls, 1);
        assert_eq!(snapshot.total_attempts, 3);
        assert_eq!(snapshot.hosts["http://h1"].failure_count, 1);
    }

    #[tokio::test]
    async fn test_api_error_stops_failover() {
        let transport = ScriptedTransport::new(vec![Ok(HttpResponse::new(
            400,
            r#"{"message":"Unknown parameter: foo"}"#,
        ))]);
        let executor = executor(transport.clone(), &["http://h1", "http://h2"]);

        let err = executor
            .execute(HttpMethod::Get, "/1/indexes", None, CallType::Read, None)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(400));
        assert_eq!(err.to_string(), "API error (400): Unknown parameter: foo");
        assert_eq!(transport.requests().len(), 1);
        assert!(executor.host_pool().all()[0].is_up());
    }

    #[tokio::test]
    async fn test_exhaustion_reports_every_host() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::Timeout(5000)),
            Ok(HttpResponse::new(500, r#"{"message":"boom"}"#)),
        ]);
        let executor = executor(transport, &["http://h1", "http://h2"]);

        let err = executor
            .execute(HttpMethod::Get, "/1/indexes", None, CallType::Read, None)
            .await
            .unwrap_err();
        match err {
            SearchError::NetworkExhausted {
                attempted_hosts,
                per_host_errors,
            } => {
                assert_eq!(attempted_hosts, vec!["http://h1", "http://h2"]);
                assert_eq!(per_host_errors["http://h1"], "request timed out after 5000ms");
                assert_eq!(per_host_errors["http://h2"], "HTTP 500: boom");
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }

        let snapshot = executor.metrics().snapshot();
        assert_eq!(snapshot.failed_calls, 1);
        assert_eq!(snapshot.call_types["read"].failure_count, 1);
    }

    #[tokio::test]
    async fn test_no_host_for_call_type() {
        let pool = Arc::new(
            HostPool::new("APP", "secret", Some(vec![HostSpec::read_only("http://h1")])).unwrap(),
        );
        let executor = RequestExecutor::new(
            pool,
            ScriptedTransport::new(vec![]),
            Arc::new(ApiKeyHeaders::new("APP", "secret")),
        );

        let err = executor
            .execute(HttpMethod::Post, "/1/indexes/a/operation", None, CallType::Write, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Configuration(_)));
    }

    #[test]
    fn test_into_json_reports_shape_errors() {
        let response = ParsedResponse {
            body: json!({"taskID": "not a number"}),
            host: "http://h1".to_string(),
            attempts: 1,
        };
        let err = response
            .into_json::<searchlane_common::TaskInfo>()
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidResponse(_)));
    }
}
