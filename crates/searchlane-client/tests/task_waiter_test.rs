//! Task Waiter Tests
//!
//! The status endpoint is served by an in-memory transport and the tokio clock
//! is paused, so sleeps complete instantly while still advancing virtual time.

use async_trait::async_trait;
use searchlane_client::{CancellationToken, ClientConfig, SearchClient, WaitOptions};
use searchlane_common::transport::{HttpRequest, HttpResponse, Transport, TransportError};
use searchlane_common::{SearchError, TaskHandle};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Replays task statuses; once the script runs out it keeps answering `notPublished`.
struct StatusService {
    script: Mutex<VecDeque<(u16, &'static str)>>,
    polls: Mutex<Vec<(Instant, String)>>,
}

impl StatusService {
    fn new(script: Vec<(u16, &'static str)>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            polls: Mutex::new(Vec::new()),
        })
    }

    fn poll_count(&self) -> usize {
        self.polls.lock().unwrap().len()
    }

    fn poll_times(&self) -> Vec<Instant> {
        self.polls.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }
}

#[async_trait]
impl Transport for StatusService {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.polls
            .lock()
            .unwrap()
            .push((Instant::now(), request.url.clone()));

        let (status, body) = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or((200, r#"{"status": "notPublished", "pendingTask": true}"#));
        Ok(HttpResponse::new(status, body))
    }
}

fn client(service: Arc<StatusService>) -> SearchClient {
    let config = ClientConfig::new("APP", "key").with_hosts(["http://status.test"]);
    SearchClient::with_transport(config, service).unwrap()
}

const BUILDING: (u16, &str) = (200, r#"{"status": "notPublished", "pendingTask": true}"#);
const PUBLISHED: (u16, &str) = (200, r#"{"status": "published", "pendingTask": false}"#);

#[tokio::test(start_paused = true)]
async fn test_polls_until_published_with_backoff() {
    let service = StatusService::new(vec![BUILDING, BUILDING, PUBLISHED]);
    let client = client(service.clone());

    client
        .wait_for_completion(&TaskHandle::new("hotels", 42), &WaitOptions::default(), None)
        .await
        .unwrap();

    assert_eq!(service.poll_count(), 3);

    let times = service.poll_times();
    let first_delay = times[1] - times[0];
    let second_delay = times[2] - times[1];
    assert!(first_delay >= Duration::from_millis(100));
    assert!(second_delay >= first_delay * 2, "{:?} vs {:?}", second_delay, first_delay);

    let urls: Vec<String> = service.polls.lock().unwrap().iter().map(|(_, u)| u.clone()).collect();
    assert!(urls.iter().all(|u| u == "http://status.test/1/indexes/hotels/task/42"));
}

#[tokio::test(start_paused = true)]
async fn test_first_poll_is_immediate() {
    let service = StatusService::new(vec![PUBLISHED]);
    let client = client(service.clone());
    let started = Instant::now();

    client
        .index("hotels")
        .wait_task(1, &WaitOptions::default(), None)
        .await
        .unwrap();

    assert_eq!(service.poll_count(), 1);
    assert_eq!(service.poll_times()[0], started);
}

#[tokio::test(start_paused = true)]
async fn test_interval_is_capped() {
    let mut script = vec![BUILDING; 5];
    script.push(PUBLISHED);
    let service = StatusService::new(script);
    let client = client(service.clone());

    let options = WaitOptions::new(Duration::from_millis(100), Duration::from_millis(300));
    client
        .wait_for_completion(&TaskHandle::new("hotels", 7), &options, None)
        .await
        .unwrap();

    let times = service.poll_times();
    let delays: Vec<u128> = times.windows(2).map(|w| (w[1] - w[0]).as_millis()).collect();
    assert_eq!(delays, vec![100, 200, 300, 300, 300]);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_sleep() {
    let service = StatusService::new(vec![]);
    let client = client(service.clone());
    let token = CancellationToken::new();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(250)).await;
        canceller.cancel();
    });

    let err = client
        .wait_for_completion(&TaskHandle::new("hotels", 9), &WaitOptions::default(), Some(&token))
        .await
        .unwrap_err();

    assert!(matches!(err, SearchError::Cancelled));
    // polled at 0ms and 100ms, cancelled at 250ms before the 300ms poll
    assert_eq!(service.poll_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_already_cancelled_token_skips_polling() {
    let service = StatusService::new(vec![PUBLISHED]);
    let client = client(service.clone());
    let token = CancellationToken::new();
    token.cancel();

    let err = client
        .wait_for_completion(&TaskHandle::new("hotels", 9), &WaitOptions::default(), Some(&token))
        .await
        .unwrap_err();

    assert!(matches!(err, SearchError::Cancelled));
    assert_eq!(service.poll_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_status_error_ends_wait() {
    let service = StatusService::new(vec![
        BUILDING,
        (404, r#"{"message": "Index does not exist"}"#),
        PUBLISHED,
    ]);
    let client = client(service.clone());

    let err = client
        .wait_for_completion(&TaskHandle::new("missing", 3), &WaitOptions::default(), None)
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(404));
    assert_eq!(err.to_string(), "API error (404): Index does not exist");
    assert_eq!(service.poll_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_caller_supplied_deadline() {
    let service = StatusService::new(vec![]);
    let client = client(service.clone());

    let result = tokio::time::timeout(
        Duration::from_secs(1),
        client.wait_for_completion(&TaskHandle::new("hotels", 5), &WaitOptions::default(), None),
    )
    .await;

    assert!(result.is_err());
    // 0, 100, 300, 700ms
    assert_eq!(service.poll_count(), 4);
}
