//! Waiting for asynchronous writes to become visible.

use searchlane_common::transport::HttpMethod;
use searchlane_common::{CallType, Result, SearchError, TaskHandle, TaskStatusResponse};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::executor::RequestExecutor;
use crate::paths;

/// Polling cadence for [`TaskWaiter::wait_for_completion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Delay after the first unpublished status.
    pub initial_interval: Duration,
    /// Upper bound for the doubling delay.
    pub max_interval: Duration,
}

impl WaitOptions {
    /// `max_interval` is raised to `initial_interval` if it is smaller.
    pub fn new(initial_interval: Duration, max_interval: Duration) -> Self {
        Self {
            initial_interval,
            max_interval: max_interval.max(initial_interval),
        }
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(10),
        }
    }
}

/// Polls task status until the service reports the task published.
#[derive(Clone)]
pub struct TaskWaiter {
    executor: Arc<RequestExecutor>,
}

impl TaskWaiter {
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    /// Fetches the current status record of a task.
    pub async fn task_status(&self, task: &TaskHandle) -> Result<TaskStatusResponse> {
        self.executor
            .execute(
                HttpMethod::Get,
                &paths::task_path(&task.index_name, task.task_id),
                None,
                CallType::Read,
                None,
            )
            .await?
            .into_json()
    }

    /// Polls until the task is published.
    ///
    /// The first status check is immediate. Between checks the waiter sleeps,
    /// doubling the delay up to `max_interval`. Errors from a status check end
    /// the wait; the waiter itself never retries. There is no deadline: wrap
    /// the future in `tokio::time::timeout` to bound it.
    ///
    /// Returns [`SearchError::Cancelled`] if `cancel` fires before a check or
    /// while sleeping.
    pub async fn wait_for_completion(
        &self,
        task: &TaskHandle,
        options: &WaitOptions,
        cancel: Option<&CancellationToken>,
    ) -> Result<()> {
        let mut interval = options.initial_interval;
        let mut polls: u32 = 0;

        loop {
            if cancel.is_some_and(|token| token.is_cancelled()) {
                debug!("Wait for task {} cancelled after {} polls", task, polls);
                return Err(SearchError::Cancelled);
            }

            let status = self.task_status(task).await?;
            polls += 1;

            if status.is_published() {
                info!("Task {} published after {} polls", task, polls);
                return Ok(());
            }

            debug!(
                "Task {} is {}, next check in {}ms",
                task,
                status.status,
                interval.as_millis()
            );

            match cancel {
                Some(token) => {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => {
                            debug!("Wait for task {} cancelled after {} polls", task, polls);
                            return Err(SearchError::Cancelled);
                        }
                        _ = tokio::time::sleep(interval) => {}
                    }
                }
                None => tokio::time::sleep(interval).await,
            }

            interval = next_interval(interval, options.max_interval);
        }
    }
}

fn next_interval(current: Duration, max: Duration) -> Duration {
    current.saturating_mul(2).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = WaitOptions::default();
        assert_eq!(options.initial_interval, Duration::from_millis(100));
        assert_eq!(options.max_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_max_interval_not_below_initial() {
        let options = WaitOptions::new(Duration::from_secs(2), Duration::from_secs(1));
        assert_eq!(options.max_interval, Duration::from_secs(2));
    }

    #[test]
    fn test_interval_doubles_up_to_cap() {
        let max = Duration::from_secs(10);
        let mut interval = Duration::from_millis(100);
        let mut seen = Vec::new();
        for _ in 0..10 {
            seen.push(interval.as_millis());
            interval = next_interval(interval, max);
        }
        assert_eq!(
            seen,
            vec![100, 200, 400, 800, 1600, 3200, 6400, 10000, 10000, 10000]
        );
    }

    #[test]
    fn test_interval_saturates() {
        assert_eq!(
            next_interval(Duration::MAX, Duration::from_secs(1)),
            Duration::from_secs(1)
        );
    }
}
