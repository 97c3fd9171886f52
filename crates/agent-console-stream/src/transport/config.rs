use std::time::Duration;

use crate::errors::ConfigError;

const DEFAULT_CHAT_PATH: &str = "/api/agent/chat";
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;

/// Configuration for [`super::HttpTransport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpTransportConfig {
    /// Base URL of the backend, for example `http://localhost:3000`.
    pub base_url: String,
    /// Path of the streaming chat endpoint.
    pub chat_path: String,
    /// Optional bearer token.
    pub api_key: Option<String>,
    /// Limit on connecting and on the silence between two body chunks. The
    /// stream itself may run for any length of time.
    pub idle_timeout: Duration,
}

impl HttpTransportConfig {
    /// Creates a config with the default path and idle timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            api_key: None,
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
        }
    }

    /// Builds a config from the process environment.
    ///
    /// - `AGENT_CONSOLE_BASE_URL` (required)
    /// - `AGENT_CONSOLE_API_KEY` (optional)
    /// - `AGENT_CONSOLE_IDLE_TIMEOUT_SECS` (optional, default 300)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Self::from_env`], reading variables through `lookup`.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let base_url = lookup("AGENT_CONSOLE_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::Missing("AGENT_CONSOLE_BASE_URL".into()))?;
        let mut config = Self::new(base_url.trim());
        if let Some(key) = lookup("AGENT_CONSOLE_API_KEY").filter(|v| !v.trim().is_empty()) {
            config = config.api_key(key);
        }
        if let Some(raw) = lookup("AGENT_CONSOLE_IDLE_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!(
                    "AGENT_CONSOLE_IDLE_TIMEOUT_SECS must be seconds, got {raw:?}"
                ))
            })?;
            config = config.idle_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }

    /// Overrides the chat endpoint path.
    pub fn chat_path(mut self, path: impl Into<String>) -> Self {
        self.chat_path = path.into();
        self
    }

    /// Sets the bearer token.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Overrides the connect and between-chunks timeout.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub(crate) fn chat_url(&self) -> String {
        let path = self.chat_path.trim_start_matches('/');
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn chat_url_joins_base_and_path_once() {
        let config = HttpTransportConfig::new("http://localhost:3000/").chat_path("api/chat");
        assert_eq!(config.chat_url(), "http://localhost:3000/api/chat");
        let config = HttpTransportConfig::new("http://localhost:3000");
        assert_eq!(config.chat_url(), "http://localhost:3000/api/agent/chat");
    }

    #[test]
    fn from_lookup_requires_base_url() {
        let err = HttpTransportConfig::from_lookup(lookup(&[])).expect_err("missing url");
        assert_eq!(err, ConfigError::Missing("AGENT_CONSOLE_BASE_URL".into()));
    }

    #[test]
    fn from_lookup_reads_optional_settings() {
        let config = HttpTransportConfig::from_lookup(lookup(&[
            ("AGENT_CONSOLE_BASE_URL", " http://agent:8080 "),
            ("AGENT_CONSOLE_API_KEY", "secret"),
            ("AGENT_CONSOLE_IDLE_TIMEOUT_SECS", "45"),
        ]))
        .expect("config");
        assert_eq!(config.base_url, "http://agent:8080");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.idle_timeout, Duration::from_secs(45));
    }

    #[test]
    fn from_lookup_rejects_bad_timeout() {
        let err = HttpTransportConfig::from_lookup(lookup(&[
            ("AGENT_CONSOLE_BASE_URL", "http://agent"),
            ("AGENT_CONSOLE_IDLE_TIMEOUT_SECS", "soon"),
        ]))
        .expect_err("bad timeout");
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("TIMEOUT")));
    }
}
