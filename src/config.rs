//! Run configuration: endpoint, pacing, time budgets and the profile table.
//!
//! ```json
//! {
//!   "endpoint": "https://collect.example/api/submit-fingerprints",
//!   "pacing_ms": 750,
//!   "provider_timeout_ms": null,
//!   "profiles": [
//!     {"label": "01_Irish_Base", "timezone": "Europe/Dublin", "languages": ["en-IE"]}
//!   ]
//! }
//! ```
//!
//! Omitted keys keep their defaults. `provider_timeout_ms: null` disables
//! the per-provider time budget.

use crate::error::{Result, SamplerError};
use crate::profiles::ProfileTable;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000/api/submit-fingerprints";
pub const DEFAULT_PACING_MS: u64 = 500;
pub const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplerConfig {
    /// Where the batch is posted
    pub endpoint: Url,
    /// Delay between iterations, none after the last
    pub pacing_ms: u64,
    /// Per-provider time budget; `None` waits indefinitely
    pub provider_timeout_ms: Option<u64>,
    /// Budget for the single submission request
    pub request_timeout_ms: u64,
    /// Page URL whose `device`/`browser` query parameters tag the session
    pub invocation_url: Option<Url>,
    pub profiles: ProfileTable,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid url"),
            pacing_ms: DEFAULT_PACING_MS,
            provider_timeout_ms: Some(DEFAULT_PROVIDER_TIMEOUT_MS),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            invocation_url: None,
            profiles: ProfileTable::default(),
        }
    }
}

impl SamplerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SamplerError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing_ms = millis(pacing);
        self
    }

    pub fn with_provider_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.provider_timeout_ms = timeout.map(millis);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = millis(timeout);
        self
    }

    pub fn with_invocation_url(mut self, url: Url) -> Self {
        self.invocation_url = Some(url);
        self
    }

    pub fn with_profiles(mut self, profiles: ProfileTable) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn provider_timeout(&self) -> Option<Duration> {
        self.provider_timeout_ms.map(Duration::from_millis)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
