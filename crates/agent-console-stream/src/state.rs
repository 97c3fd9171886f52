//! Session model folded from the agent event stream.
//!
//! Only the reducer in [`crate::reduce`] writes these values; everything
//! else reads snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::transport::Attachment;

/// Identifier of one conversation turn.
pub type TurnId = uuid::Uuid;

/// Lifecycle phase of the session's turn controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    #[default]
    Idle,
    Opening,
    Streaming,
    Finalizing,
}

/// How a finalized turn ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// The response stream ended normally.
    Completed,
    /// Opening or reading the stream failed.
    Failed { message: String },
    /// The caller aborted the turn.
    Cancelled,
    /// The turn task was torn down before it could finish.
    Interrupted,
}

impl TurnOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    Running,
    Completed,
    Error,
}

/// One tool invocation observed on the stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Producer correlation id, when one was sent.
    pub id: Option<String>,
    pub tool: String,
    pub detail: Option<String>,
    pub status: ToolCallStatus,
    pub created_at: DateTime<Utc>,
}

impl ToolCallRecord {
    pub fn is_running(&self) -> bool {
        self.status == ToolCallStatus::Running
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// A planning-level unit of work tracked by id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentTask {
    pub id: String,
    #[serde(alias = "title")]
    pub content: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// One user message and the agent's full response to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: TurnId,
    pub user_message: String,
    pub attachments: Vec<Attachment>,
    /// Accumulated assistant text.
    pub assistant_text: String,
    /// Transient status line from `thinking` events.
    pub status_text: Option<String>,
    pub tool_calls: Vec<ToolCallRecord>,
    pub started_at: DateTime<Utc>,
    /// Set exactly once, when the turn finalizes.
    pub ended_at: Option<DateTime<Utc>>,
    pub outcome: Option<TurnOutcome>,
    pub is_expanded: bool,
}

impl ConversationTurn {
    pub fn new(
        id: TurnId,
        user_message: impl Into<String>,
        attachments: Vec<Attachment>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_message: user_message.into(),
            attachments,
            assistant_text: String::new(),
            status_text: None,
            tool_calls: Vec::new(),
            started_at,
            ended_at: None,
            outcome: None,
            is_expanded: true,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Finds the running tool call a result belongs to: the one carrying
    /// `id`, or the most recent running call when no id was sent.
    pub fn running_tool_call_mut(&mut self, id: Option<&str>) -> Option<&mut ToolCallRecord> {
        let mut running = self.tool_calls.iter_mut().rev().filter(|call| call.is_running());
        match id {
            Some(id) => running.find(|call| call.id.as_deref() == Some(id)),
            None => running.next(),
        }
    }
}

/// Aggregate state for one console session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Generated once and sent with every turn.
    pub session_id: uuid::Uuid,
    /// Append-only list of turns, oldest first.
    pub turns: Vec<ConversationTurn>,
    /// Session-wide task list, upserted by id.
    pub tasks: Vec<AgentTask>,
    pub is_running: bool,
    pub phase: TurnPhase,
}

impl SessionState {
    pub fn new(session_id: uuid::Uuid) -> Self {
        Self {
            session_id,
            turns: Vec::new(),
            tasks: Vec::new(),
            is_running: false,
            phase: TurnPhase::Idle,
        }
    }

    pub fn turn(&self, id: TurnId) -> Option<&ConversationTurn> {
        self.turns.iter().find(|turn| turn.id == id)
    }

    pub(crate) fn turn_mut(&mut self, id: TurnId) -> Option<&mut ConversationTurn> {
        self.turns.iter_mut().rev().find(|turn| turn.id == id)
    }

    pub fn current_turn(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    pub fn task(&self, id: &str) -> Option<&AgentTask> {
        self.tasks.iter().find(|task| task.id == id)
    }
}
