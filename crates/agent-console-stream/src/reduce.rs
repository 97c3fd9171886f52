//! Session reducer: folds decoded stream events into [`SessionState`].
//!
//! Every write to the session model goes through this module. Functions take
//! the state by `&mut`, apply one transition, and hand side effects back to
//! the caller as [`Effect`] values instead of performing them.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::event::{
    BuiltModule, CompleteData, EventPayload, StreamEvent, TaskAction, TaskUpdateData,
    ThinkingData, ToolCallData, ToolResultData,
};
use crate::state::{
    ConversationTurn, SessionState, ToolCallRecord, ToolCallStatus, TurnId, TurnOutcome,
    TurnPhase,
};

const ERROR_PREFIX: &str = "Error: ";
const CANCELLED_NOTE: &str = "Turn cancelled.";
const INTERRUPTED_NOTE: &str = "Turn interrupted.";

/// Side effects requested by a reduce step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// A module finished building and collaborators should be told.
    ModuleBuilt(BuiltModule),
}

/// Applies one event to the turn `turn_id`.
///
/// Task updates touch the session-wide task list; everything else touches
/// the turn. Events for a turn that does not exist or has already finalized
/// are dropped.
pub fn apply(state: &mut SessionState, turn_id: TurnId, event: StreamEvent) -> Vec<Effect> {
    let StreamEvent { payload, timestamp } = event;

    if let EventPayload::TaskUpdate(update) = payload {
        apply_task_update(state, update);
        return Vec::new();
    }

    let Some(turn) = state.turn_mut(turn_id) else {
        warn!(turn_id = %turn_id, kind = payload.kind(), "event for unknown turn dropped");
        return Vec::new();
    };
    if turn.is_finalized() {
        warn!(turn_id = %turn_id, kind = payload.kind(), "event after finalization dropped");
        return Vec::new();
    }

    match payload {
        EventPayload::Thinking(data) => apply_thinking(turn, data),
        EventPayload::ToolCall(data) => apply_tool_call(turn, data, timestamp),
        EventPayload::ToolResult(data) => apply_tool_result(turn, data),
        EventPayload::Message(data) | EventPayload::TextDelta(data) => {
            turn.assistant_text.push_str(&data.text);
        }
        EventPayload::Complete(data) => return apply_complete(turn, data),
        EventPayload::Error(data) => {
            append_error(turn, &data.message);
            turn.status_text = None;
        }
        EventPayload::Done => turn.status_text = None,
        EventPayload::Unknown { kind, .. } => {
            debug!(turn_id = %turn_id, kind = %kind, "ignoring unknown event type");
        }
        EventPayload::TaskUpdate(_) => {}
    }
    Vec::new()
}

fn apply_thinking(turn: &mut ConversationTurn, data: ThinkingData) {
    if let Some(message) = data.message {
        turn.status_text = Some(message);
    }
    // preview channel: replaces the buffer, never appends
    if data.streaming
        && let Some(partial) = data.partial_text
    {
        turn.assistant_text = partial;
    }
}

fn apply_tool_call(turn: &mut ConversationTurn, data: ToolCallData, created_at: DateTime<Utc>) {
    turn.tool_calls.push(ToolCallRecord {
        id: data.id,
        tool: data.tool,
        detail: data.detail,
        status: ToolCallStatus::Running,
        created_at,
    });
}

fn apply_tool_result(turn: &mut ConversationTurn, data: ToolResultData) {
    let turn_id = turn.id;
    let Some(call) = turn.running_tool_call_mut(data.id.as_deref()) else {
        debug!(turn_id = %turn_id, id = ?data.id, "tool_result with no matching running tool call");
        return;
    };
    call.status = if data.success {
        ToolCallStatus::Completed
    } else {
        ToolCallStatus::Error
    };
}

fn apply_task_update(state: &mut SessionState, update: TaskUpdateData) {
    let TaskUpdateData { action, task } = update;
    let existing = state.tasks.iter().position(|t| t.id == task.id);
    match (action, existing) {
        (TaskAction::Added, Some(_)) => {
            debug!(task_id = %task.id, "task already present, add ignored");
        }
        (TaskAction::Updated, Some(index)) => {
            if let Some(slot) = state.tasks.get_mut(index) {
                *slot = task;
            }
        }
        (_, None) => state.tasks.push(task),
    }
}

fn apply_complete(turn: &mut ConversationTurn, data: CompleteData) -> Vec<Effect> {
    turn.assistant_text = data.message;
    turn.status_text = None;
    data.modules
        .into_iter()
        .filter(BuiltModule::is_completed)
        .map(Effect::ModuleBuilt)
        .collect()
}

fn append_error(turn: &mut ConversationTurn, message: &str) {
    append_note(turn, &format!("{ERROR_PREFIX}{message}"));
}

fn append_note(turn: &mut ConversationTurn, note: &str) {
    if !turn.assistant_text.is_empty() {
        turn.assistant_text.push_str("\n\n");
    }
    turn.assistant_text.push_str(note);
}

/// Opens a new turn if none is running. Returns `false` when a turn is
/// already in flight, leaving the state untouched.
pub fn open_turn(state: &mut SessionState, turn: ConversationTurn) -> bool {
    if state.is_running {
        return false;
    }
    state.turns.push(turn);
    state.is_running = true;
    state.phase = TurnPhase::Opening;
    true
}

/// Moves the session into the streaming phase.
pub fn begin_streaming(state: &mut SessionState, turn_id: TurnId) {
    if state.current_turn().is_some_and(|turn| turn.id == turn_id) {
        state.phase = TurnPhase::Streaming;
    }
}

/// Moves the session into the finalizing phase. Returns `false` if the turn
/// is unknown or already finalized.
pub fn begin_finalizing(state: &mut SessionState, turn_id: TurnId) -> bool {
    if state.turn(turn_id).is_none_or(ConversationTurn::is_finalized) {
        return false;
    }
    state.phase = TurnPhase::Finalizing;
    true
}

/// Finalizes `turn_id` and returns the session to idle.
///
/// The end time is written only once; finalizing an already finalized turn
/// changes nothing and returns `false`.
pub fn finalize_turn(
    state: &mut SessionState,
    turn_id: TurnId,
    outcome: TurnOutcome,
    ended_at: DateTime<Utc>,
) -> bool {
    let Some(turn) = state.turn_mut(turn_id) else {
        return false;
    };
    if turn.is_finalized() {
        return false;
    }

    match &outcome {
        TurnOutcome::Completed => {}
        TurnOutcome::Failed { message } => {
            fail_running_tool_calls(turn);
            append_error(turn, message);
        }
        TurnOutcome::Cancelled => {
            fail_running_tool_calls(turn);
            append_note(turn, CANCELLED_NOTE);
        }
        TurnOutcome::Interrupted => {
            fail_running_tool_calls(turn);
            append_note(turn, INTERRUPTED_NOTE);
        }
    }
    turn.status_text = None;
    turn.ended_at = Some(ended_at);
    turn.outcome = Some(outcome);

    state.is_running = false;
    state.phase = TurnPhase::Idle;
    true
}

fn fail_running_tool_calls(turn: &mut ConversationTurn) {
    for call in turn.tool_calls.iter_mut().filter(|call| call.is_running()) {
        call.status = ToolCallStatus::Error;
    }
}

/// Sets the display-only expanded flag of a turn.
pub fn set_expanded(state: &mut SessionState, turn_id: TurnId, expanded: bool) -> bool {
    match state.turn_mut(turn_id) {
        Some(turn) if turn.is_expanded != expanded => {
            turn.is_expanded = expanded;
            true
        }
        _ => false,
    }
}
