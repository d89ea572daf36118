//! Explicit client session (endpoint + credentials).

use std::fmt;
use std::time::Duration;

use zeroize::Zeroizing;

/// Default Exbitron v1 REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.exbitron.digital/api/v1";

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection parameters and credentials for one client.
///
/// The API key is wiped from memory when the session is dropped and is
/// never printed by `Debug`.
#[derive(Clone)]
pub struct ClientSession {
    base_url: String,
    api_key: Zeroizing<String>,
    timeout: Duration,
}

impl ClientSession {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: Zeroizing::new(api_key.into()),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Full URL for an API path (`/balances`, ...).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSession")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}
