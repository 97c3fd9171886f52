//! Agent activity streaming coordinator.
//!
//! Consumes the line-delimited event stream a backend agent produces while it
//! builds an application, and folds it into a [`SessionState`] a console can
//! render: conversation turns, tool calls, the task list, and live text.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use agent_console_stream::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Session::new(Arc::new(HttpTransport::from_env()?));
//! session.on_module_built(|module| println!("built {}", module.name));
//!
//! let turn = session
//!     .submit_message("Build a todo app with auth", Vec::new(), Mode::Build)
//!     .await?
//!     .finish()
//!     .await?;
//! println!("{}", turn.assistant_text);
//! # Ok(())
//! # }
//! ```

/// Error types.
pub mod errors;
/// Decoded stream event types.
pub mod event;
/// Frame payload to typed event decoding.
pub mod decode;
/// Line framing over a chunked byte stream.
pub mod frame;
/// Process-wide tracing setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// State transitions for the session model.
pub mod reduce;
/// Session facade.
pub mod session;
/// Session model types.
pub mod state;
/// Backend agent transport.
pub mod transport;
/// Turn lifecycle: streaming, cancellation, finalization.
pub mod turn;

pub use errors::{ConfigError, SessionError, SubmitRejected, TransportError};
pub use event::{BuiltModule, EventPayload, StreamEvent};
pub use frame::FrameParser;
pub use reduce::Effect;
pub use session::Session;
pub use state::{
    AgentTask, ConversationTurn, SessionState, TaskStatus, ToolCallRecord, ToolCallStatus, TurnId,
    TurnOutcome, TurnPhase,
};
pub use transport::{
    AgentRequest, AgentTransport, Attachment, ChunkStream, HttpTransport, HttpTransportConfig,
    Mode,
};
pub use turn::{AbortHandle, TurnHandle};
