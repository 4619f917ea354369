//! Host pool with per-host up/down tracking.
//!
//! The pool is built once per client. Hosts are never removed: a host that
//! failed is only pushed to the back of the candidate order, so a request
//! can still succeed when every host has been marked down at some point.

use rand::seq::SliceRandom;
use rand::Rng;
use searchlane_common::{CallType, Result, SearchError};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use url::Url;

use crate::config::{ensure_not_blank, validate_host_specs, DEFAULT_HOST_DOMAIN};

/// Number of hosts derived from the application id.
const DEFAULT_HOST_COUNT: usize = 3;

fn all_call_types() -> Vec<CallType> {
    CallType::ALL.to_vec()
}

/// A host address and the call categories it may serve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSpec {
    /// `host[:port]` or a full base URL. `https://` is assumed without a scheme.
    pub address: String,
    #[serde(default = "all_call_types")]
    pub call_types: Vec<CallType>,
}

impl HostSpec {
    /// A host serving reads, writes and searches.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            call_types: all_call_types(),
        }
    }

    /// A replica that only serves reads and searches.
    pub fn read_only(address: impl Into<String>) -> Self {
        Self::new(address).with_call_types([CallType::Read, CallType::Search])
    }

    /// A primary that only accepts writes.
    pub fn write_only(address: impl Into<String>) -> Self {
        Self::new(address).with_call_types([CallType::Write])
    }

    pub fn with_call_types<I>(mut self, call_types: I) -> Self
    where
        I: IntoIterator<Item = CallType>,
    {
        self.call_types = call_types.into_iter().collect();
        self
    }
}

/// Health as last observed by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStatus {
    Up,
    Down,
}

/// One member of a [`HostPool`].
#[derive(Debug)]
pub struct Host {
    base_url: String,
    call_types: Vec<CallType>,
    down: AtomicBool,
    /// Pool-wide failure sequence number of the last `mark_down`; 0 if never failed.
    last_failure: AtomicU64,
}

impl Host {
    fn from_spec(spec: &HostSpec) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base_url(&spec.address)?,
            call_types: spec.call_types.clone(),
            down: AtomicBool::new(false),
            last_failure: AtomicU64::new(0),
        })
    }

    /// Scheme, host and optional port, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn accepts(&self, call_type: CallType) -> bool {
        self.call_types.contains(&call_type)
    }

    pub fn status(&self) -> HostStatus {
        if self.down.load(Ordering::Acquire) {
            HostStatus::Down
        } else {
            HostStatus::Up
        }
    }

    pub fn is_up(&self) -> bool {
        self.status() == HostStatus::Up
    }
}

pub(crate) fn normalize_base_url(address: &str) -> Result<String> {
    let address = address.trim();
    ensure_not_blank(address, "host address")?;

    let candidate = if address.contains("://") {
        address.to_string()
    } else {
        format!("https://{}", address)
    };

    let url = Url::parse(&candidate).map_err(|e| {
        SearchError::Configuration(format!("invalid host address {:?}: {}", address, e))
    })?;
    if url.host_str().is_none() {
        return Err(SearchError::Configuration(format!(
            "host address {:?} has no host name",
            address
        )));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// The hosts of one application, shared by every call of a client.
#[derive(Debug)]
pub struct HostPool {
    hosts: Vec<Arc<Host>>,
    failure_clock: AtomicU64,
}

impl HostPool {
    /// Builds a pool, deriving default hosts under `searchlane.net` when `hosts` is `None`.
    pub fn new(app_id: &str, api_key: &str, hosts: Option<Vec<HostSpec>>) -> Result<Self> {
        Self::with_rng(
            app_id,
            api_key,
            hosts,
            DEFAULT_HOST_DOMAIN,
            &mut rand::thread_rng(),
        )
    }

    /// Builds a pool using `rng` to shuffle the default hosts.
    ///
    /// Default hosts are shuffled once so that clients spread their load
    /// across the application's cluster. An explicit host list keeps the
    /// caller's order.
    pub fn with_rng<R>(
        app_id: &str,
        api_key: &str,
        hosts: Option<Vec<HostSpec>>,
        domain: &str,
        rng: &mut R,
    ) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        ensure_not_blank(app_id, "application id")?;
        ensure_not_blank(api_key, "API key")?;

        let specs = match hosts {
            Some(specs) => specs,
            None => {
                ensure_not_blank(domain, "host domain")?;
                let mut specs = default_hosts(app_id.trim(), domain.trim());
                specs.shuffle(rng);
                specs
            }
        };
        validate_host_specs(&specs)?;

        let hosts = specs
            .iter()
            .map(|spec| Host::from_spec(spec).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            hosts,
            failure_clock: AtomicU64::new(0),
        })
    }

    /// Candidate hosts for `call_type`, in the order they should be tried.
    ///
    /// Up hosts come first in pool order, followed by down hosts with the
    /// least recently failed first.
    pub fn hosts(&self, call_type: CallType) -> Vec<Arc<Host>> {
        let mut up = Vec::with_capacity(self.hosts.len());
        let mut down = Vec::new();

        for host in self.hosts.iter().filter(|h| h.accepts(call_type)) {
            if host.is_up() {
                up.push(Arc::clone(host));
            } else {
                down.push((host.last_failure.load(Ordering::Acquire), Arc::clone(host)));
            }
        }

        down.sort_by_key(|(stamp, _)| *stamp);
        up.extend(down.into_iter().map(|(_, host)| host));
        up
    }

    pub fn mark_down(&self, host: &Host) {
        let stamp = self.failure_clock.fetch_add(1, Ordering::AcqRel) + 1;
        host.last_failure.store(stamp, Ordering::Release);
        host.down.store(true, Ordering::Release);
    }

    pub fn mark_up(&self, host: &Host) {
        host.down.store(false, Ordering::Release);
    }

    /// Marks every host up.
    pub fn reset(&self) {
        for host in &self.hosts {
            self.mark_up(host);
        }
    }

    /// All hosts in pool order, regardless of status.
    pub fn all(&self) -> &[Arc<Host>] {
        &self.hosts
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

/// `{app_id}-1.{domain}` through `{app_id}-3.{domain}`.
pub fn default_hosts(app_id: &str, domain: &str) -> Vec<HostSpec> {
    (1..=DEFAULT_HOST_COUNT)
        .map(|n| HostSpec::new(format!("{}-{}.{}", app_id, n, domain)))
        .collect()
}
