use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::AgentTask;

/// One decoded event from the agent stream.
///
/// Events are immutable once decoded and are applied to the session exactly
/// once, in arrival order.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamEvent {
    /// Typed payload selected by the wire `type` tag.
    pub payload: EventPayload,
    /// Producer timestamp, or the arrival time when the producer sent none.
    pub timestamp: DateTime<Utc>,
}

impl StreamEvent {
    /// Creates an event stamped with the given time.
    pub fn new(payload: EventPayload, timestamp: DateTime<Utc>) -> Self {
        Self { payload, timestamp }
    }

    /// Returns the wire `type` tag of this event.
    pub fn kind(&self) -> &str {
        self.payload.kind()
    }
}

/// Payload variants keyed by the wire `type` tag.
#[derive(Clone, Debug, PartialEq)]
pub enum EventPayload {
    Thinking(ThinkingData),
    ToolCall(ToolCallData),
    ToolResult(ToolResultData),
    TaskUpdate(TaskUpdateData),
    Message(TextData),
    TextDelta(TextData),
    Complete(CompleteData),
    Error(ErrorData),
    Done,
    /// A `type` this client does not know yet. Forwarded so the reducer can
    /// decide what to do with it.
    Unknown {
        kind: String,
        data: serde_json::Value,
    },
}

impl EventPayload {
    /// Returns the wire `type` tag for this payload.
    pub fn kind(&self) -> &str {
        match self {
            Self::Thinking(_) => "thinking",
            Self::ToolCall(_) => "tool_call",
            Self::ToolResult(_) => "tool_result",
            Self::TaskUpdate(_) => "task_update",
            Self::Message(_) => "message",
            Self::TextDelta(_) => "text_delta",
            Self::Complete(_) => "complete",
            Self::Error(_) => "error",
            Self::Done => "done",
            Self::Unknown { kind, .. } => kind,
        }
    }
}

/// Status update while the agent is working.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingData {
    /// Human-readable status line.
    #[serde(default, alias = "status")]
    pub message: Option<String>,
    /// Set when `partial_text` is a preview of the response being streamed.
    #[serde(default)]
    pub streaming: bool,
    /// Preview text that replaces the assistant buffer.
    #[serde(default, alias = "partial_text")]
    pub partial_text: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallData {
    /// Correlation id, when the producer sends one.
    #[serde(default, alias = "tool_call_id", alias = "toolCallId")]
    pub id: Option<String>,
    #[serde(alias = "name")]
    pub tool: String,
    /// Free-form detail such as the file path being written.
    #[serde(default, alias = "path", alias = "file")]
    pub detail: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultData {
    #[serde(default, alias = "tool_call_id", alias = "toolCallId")]
    pub id: Option<String>,
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default, alias = "result")]
    pub output: Option<serde_json::Value>,
}

fn default_success() -> bool {
    true
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskAction {
    Added,
    Updated,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskUpdateData {
    pub action: TaskAction,
    pub task: AgentTask,
}

/// Text appended to the assistant buffer by `message` and `text_delta`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextData {
    #[serde(default, alias = "content", alias = "delta")]
    pub text: String,
}

/// A module the agent reports as built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltModule {
    pub name: String,
    pub status: String,
}

impl BuiltModule {
    /// Only completed modules are announced to collaborators.
    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteData {
    /// Authoritative final assistant message.
    #[serde(default, alias = "content")]
    pub message: String,
    #[serde(default)]
    pub modules: Vec<BuiltModule>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorData {
    #[serde(default, alias = "error")]
    pub message: String,
}
