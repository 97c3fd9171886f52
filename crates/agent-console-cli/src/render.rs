use agent_console_stream::{
    AgentTask, ConversationTurn, SessionState, TaskStatus, ToolCallRecord, ToolCallStatus,
};

/// Turns successive session snapshots into console lines.
///
/// Keeps just enough memory of the previous snapshot to print each change
/// once.
#[derive(Debug, Default)]
pub struct Renderer {
    printed_calls: Vec<(usize, ToolCallStatus)>,
    status: Option<String>,
    tasks: Vec<AgentTask>,
}

impl Renderer {
    /// Returns the lines describing what changed since the last snapshot.
    pub fn diff(&mut self, state: &SessionState) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(turn) = state.current_turn() {
            self.diff_turn(turn, &mut lines);
        }
        for task in &state.tasks {
            if !self.tasks.contains(task) {
                lines.push(format!("  [{}] {}", task_marker(task.status), task.content));
            }
        }
        self.tasks.clone_from(&state.tasks);
        lines
    }

    fn diff_turn(&mut self, turn: &ConversationTurn, lines: &mut Vec<String>) {
        if turn.status_text != self.status {
            if let Some(status) = &turn.status_text {
                lines.push(format!("… {status}"));
            }
            self.status.clone_from(&turn.status_text);
        }
        for (index, call) in turn.tool_calls.iter().enumerate() {
            let seen = self.printed_calls.iter().find(|(i, _)| *i == index);
            if seen.is_some_and(|(_, status)| *status == call.status) {
                continue;
            }
            lines.push(tool_line(call));
            self.printed_calls.retain(|(i, _)| *i != index);
            self.printed_calls.push((index, call.status));
        }
    }
}

fn tool_line(call: &ToolCallRecord) -> String {
    let marker = match call.status {
        ToolCallStatus::Running => "→",
        ToolCallStatus::Completed => "✓",
        ToolCallStatus::Error => "✗",
    };
    match &call.detail {
        Some(detail) => format!("{marker} {} {detail}", call.tool),
        None => format!("{marker} {}", call.tool),
    }
}

fn task_marker(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => " ",
        TaskStatus::InProgress => "~",
        TaskStatus::Completed => "x",
        TaskStatus::Failed => "!",
    }
}
