//! Common imports for typical console usage.
pub use crate::{
    AbortHandle, AgentTask, AgentTransport, Attachment, BuiltModule, ConfigError,
    ConversationTurn, HttpTransport, HttpTransportConfig, Mode, Session, SessionError,
    SessionState, SubmitRejected, TaskStatus, ToolCallRecord, ToolCallStatus, TransportError,
    TurnHandle, TurnOutcome, TurnPhase,
};
