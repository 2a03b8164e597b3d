//! Connection settings for `GameClient`.

use std::time::Duration;

use serde::Deserialize;

/// Where the service lives and how long the transport may wait on it.
///
/// Deserializable so hosts can embed it in their own configuration files.
/// Missing fields fall back to `Default`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    /// Scheme and host, e.g. `http://127.0.0.1`. A trailing `/` is ignored.
    pub host: String,
    pub port: u16,
    /// Connect timeout. `None` waits indefinitely.
    pub timeout_connect: Option<Duration>,
    /// Upper bound on a whole round trip. `None` waits indefinitely.
    pub timeout_global: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "http://127.0.0.1".to_string(),
            port: 8080,
            timeout_connect: None,
            timeout_global: None,
        }
    }
}

impl ClientConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            ..Self::default()
        }
    }

    /// Base URL of the API: `{host}:{port}/api`.
    pub fn base_url(&self) -> String {
        format!("{}:{}/api", self.host.trim_end_matches('/'), self.port)
    }
}
