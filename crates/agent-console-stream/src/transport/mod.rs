//! Backend agent transport.
//!
//! The turn controller only sees [`AgentTransport`]; the HTTP client lives in
//! [`HttpTransport`] so tests can swap in scripted producers.
mod config;
mod http;

use std::pin::Pin;

pub use config::HttpTransportConfig;
pub use http::HttpTransport;

use crate::errors::TransportError;

/// Raw response body chunks, in arrival order.
pub type ChunkStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, TransportError>> + Send + 'static>>;

/// Agent mode sent with every request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Build,
    Plan,
}

/// Descriptor for a file uploaded out of band.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Attachment {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Attachment {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }
}

/// Body of the single request that starts a turn.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRequest {
    pub message: String,
    pub session_id: uuid::Uuid,
    pub mode: Mode,
    pub attachments: Vec<Attachment>,
}

/// Opens the streamed response for one turn.
#[async_trait::async_trait]
pub trait AgentTransport: Send + Sync {
    /// Sends `request` and returns the response body as a chunk stream.
    ///
    /// Errors here mean the turn never started streaming.
    async fn open(&self, request: AgentRequest) -> Result<ChunkStream, TransportError>;
}
