use futures::StreamExt as _;
use tracing::debug;

use super::config::HttpTransportConfig;
use super::{AgentRequest, AgentTransport, ChunkStream};
use crate::errors::{ConfigError, TransportError};

/// Streams agent responses over HTTP with `reqwest`.
pub struct HttpTransport {
    client: reqwest::Client,
    config: HttpTransportConfig,
}

impl HttpTransport {
    /// Creates a transport from explicit configuration.
    pub fn new(config: HttpTransportConfig) -> Result<Self, ConfigError> {
        if config.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("base_url must not be empty".into()));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(config.idle_timeout)
            .read_timeout(config.idle_timeout)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates a transport from `AGENT_CONSOLE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(HttpTransportConfig::from_env()?)
    }

    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl AgentTransport for HttpTransport {
    async fn open(&self, request: AgentRequest) -> Result<ChunkStream, TransportError> {
        let url = self.config.chat_url();
        debug!(session_id = %request.session_id, mode = ?request.mode, %url, "opening agent stream");

        let mut http_req = self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&request);
        if let Some(key) = &self.config.api_key {
            http_req = http_req.bearer_auth(key);
        }

        let response = http_req
            .send()
            .await
            .map_err(|e| TransportError::request(format!("agent request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransportError::read(e.to_string())));
        Ok(Box::pin(chunks))
    }
}
