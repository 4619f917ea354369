//! Client configuration.
//!
//! [`ClientConfig`] can be built in code with the `with_*` builders,
//! deserialized from any serde format, or read from the environment with
//! [`ClientConfig::from_env`]. Timeouts are stored in milliseconds so the
//! serialized form stays flat.

use searchlane_common::{CallType, Result, SearchError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use crate::hosts::{normalize_base_url, HostSpec};

/// Domain the default hosts are derived from.
pub const DEFAULT_HOST_DOMAIN: &str = "searchlane.net";

pub const ENV_APP_ID: &str = "SEARCHLANE_APP_ID";
pub const ENV_API_KEY: &str = "SEARCHLANE_API_KEY";
pub const ENV_HOSTS: &str = "SEARCHLANE_HOSTS";

fn default_host_domain() -> String {
    DEFAULT_HOST_DOMAIN.to_string()
}

fn default_connect_timeout_ms() -> u64 {
    2_000
}

fn default_read_timeout_ms() -> u64 {
    5_000
}

fn default_write_timeout_ms() -> u64 {
    30_000
}

pub(crate) fn default_user_agent() -> String {
    format!("searchlane-rust/{}", env!("CARGO_PKG_VERSION"))
}

/// Settings for a [`SearchClient`](crate::SearchClient).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub app_id: String,
    pub api_key: String,
    /// Explicit host list. `None` derives three hosts from `app_id` and `host_domain`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosts: Option<Vec<HostSpec>>,
    #[serde(default = "default_host_domain")]
    pub host_domain: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Applies to read and search calls.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Sent with every request, after the credential headers.
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
}

impl ClientConfig {
    pub fn new(app_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            api_key: api_key.into(),
            hosts: None,
            host_domain: default_host_domain(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
            user_agent: default_user_agent(),
            default_headers: BTreeMap::new(),
        }
    }

    /// Reads `SEARCHLANE_APP_ID`, `SEARCHLANE_API_KEY` and the optional
    /// comma separated `SEARCHLANE_HOSTS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ClientConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_id = lookup(ENV_APP_ID)
            .ok_or_else(|| SearchError::Configuration(format!("{} is not set", ENV_APP_ID)))?;
        let api_key = lookup(ENV_API_KEY)
            .ok_or_else(|| SearchError::Configuration(format!("{} is not set", ENV_API_KEY)))?;

        let mut config = Self::new(app_id, api_key);
        if let Some(hosts) = lookup(ENV_HOSTS) {
            let hosts: Vec<&str> = hosts
                .split(',')
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .collect();
            config = config.with_hosts(hosts);
        }

        config.validate()?;
        Ok(config)
    }

    /// Replaces the default hosts with addresses serving every call type.
    pub fn with_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hosts = Some(hosts.into_iter().map(HostSpec::new).collect());
        self
    }

    pub fn with_host_specs(mut self, hosts: Vec<HostSpec>) -> Self {
        self.hosts = Some(hosts);
        self
    }

    pub fn with_host_domain(mut self, domain: impl Into<String>) -> Self {
        self.host_domain = domain.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            connect: Duration::from_millis(self.connect_timeout_ms),
            read: Duration::from_millis(self.read_timeout_ms),
            write: Duration::from_millis(self.write_timeout_ms),
        }
    }

    /// Checks credentials, hosts and timeouts.
    pub fn validate(&self) -> Result<()> {
        ensure_not_blank(&self.app_id, "application id")?;
        ensure_not_blank(&self.api_key, "API key")?;

        match &self.hosts {
            Some(hosts) => validate_host_specs(hosts)?,
            None => ensure_not_blank(&self.host_domain, "host domain")?,
        }

        for (name, value) in [
            ("connect timeout", self.connect_timeout_ms),
            ("read timeout", self.read_timeout_ms),
            ("write timeout", self.write_timeout_ms),
        ] {
            if value == 0 {
                return Err(SearchError::Configuration(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }

        Ok(())
    }
}

/// Timeout tiers resolved from a [`ClientConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Time allowed to establish a connection.
    pub connect: Duration,
    pub read: Duration,
    pub write: Duration,
}

impl Timeouts {
    /// Request timeout for a call category.
    pub fn for_call(&self, call_type: CallType) -> Duration {
        if call_type.is_read_like() {
            self.read
        } else {
            self.write
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_millis(default_connect_timeout_ms()),
            read: Duration::from_millis(default_read_timeout_ms()),
            write: Duration::from_millis(default_write_timeout_ms()),
        }
    }
}

pub(crate) fn ensure_not_blank(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SearchError::Configuration(format!("{} must not be blank", what)));
    }
    Ok(())
}

pub(crate) fn validate_host_specs(hosts: &[HostSpec]) -> Result<()> {
    if hosts.is_empty() {
        return Err(SearchError::Configuration(
            "host list must not be empty".to_string(),
        ));
    }
    let mut seen = HashSet::with_capacity(hosts.len());
    for host in hosts {
        ensure_not_blank(&host.address, "host address")?;
        if host.call_types.is_empty() {
            return Err(SearchError::Configuration(format!(
                "host {} serves no call type",
                host.address
            )));
        }
        let base_url = normalize_base_url(&host.address)?;
        if !seen.insert(base_url) {
            return Err(SearchError::Configuration(format!(
                "host {} is listed more than once",
                host.address.trim()
            )));
        }
    }
    Ok(())
}
