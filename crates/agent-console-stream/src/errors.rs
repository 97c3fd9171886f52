/// Errors raised while opening or reading the agent response stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request could not be sent or the connection failed.
    #[error("request failed: {message}")]
    Request { message: String },
    /// The backend answered with a non-success status.
    #[error("agent responded with status {status}: {body}")]
    Status { status: u16, body: String },
    /// Reading the streamed body failed after the response started.
    #[error("stream read failed: {message}")]
    Read { message: String },
}

impl TransportError {
    /// Creates a request-level error.
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
        }
    }

    /// Creates a read-level error.
    pub fn read(message: impl Into<String>) -> Self {
        Self::Read {
            message: message.into(),
        }
    }
}

/// Reasons a `submit_message` call is refused without creating a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitRejected {
    /// The message was empty or whitespace only.
    #[error("message must not be empty")]
    EmptyMessage,
    /// Another turn is still running in this session.
    #[error("a turn is already running")]
    TurnInProgress,
}

/// Errors returned by the session facade outside of a turn's own lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The turn task ended without reporting its finalized turn.
    #[error("turn task ended without a final turn ({turn_id})")]
    TurnTaskLost { turn_id: uuid::Uuid },
}

/// Invalid or missing configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required setting was not provided.
    #[error("missing configuration: {0}")]
    Missing(String),
    /// A setting was present but could not be used.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
