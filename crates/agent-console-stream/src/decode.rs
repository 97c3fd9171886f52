use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::event::{EventPayload, StreamEvent};

const DONE_SENTINEL: &str = "[DONE]";

#[derive(Deserialize)]
struct WireEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
    #[serde(default)]
    timestamp: serde_json::Value,
}

/// Why a frame produced no event.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("frame is not a valid event envelope: {0}")]
    Envelope(serde_json::Error),
    #[error("invalid `{kind}` payload: {source}")]
    Payload {
        kind: String,
        source: serde_json::Error,
    },
}

/// Decodes one frame payload, stamping `received_at` when the producer sent
/// no usable timestamp.
///
/// Unknown `type` values decode to [`EventPayload::Unknown`].
pub fn parse_event(payload: &str, received_at: DateTime<Utc>) -> Result<StreamEvent, DecodeError> {
    let wire: WireEvent = serde_json::from_str(payload).map_err(DecodeError::Envelope)?;
    let timestamp = parse_timestamp(&wire.timestamp).unwrap_or(received_at);
    let payload = match wire.kind.as_str() {
        "thinking" => EventPayload::Thinking(typed(&wire)?),
        "tool_call" => EventPayload::ToolCall(typed(&wire)?),
        "tool_result" => EventPayload::ToolResult(typed(&wire)?),
        "task_update" => EventPayload::TaskUpdate(typed(&wire)?),
        "message" => EventPayload::Message(typed(&wire)?),
        "text_delta" => EventPayload::TextDelta(typed(&wire)?),
        "complete" => EventPayload::Complete(typed(&wire)?),
        "error" => EventPayload::Error(typed(&wire)?),
        "done" => EventPayload::Done,
        _ => EventPayload::Unknown {
            kind: wire.kind,
            data: wire.data,
        },
    };
    Ok(StreamEvent::new(payload, timestamp))
}

/// Decodes one frame into zero or one event.
///
/// A frame that fails to decode is logged and skipped; it never ends the
/// stream.
pub fn decode_frame(payload: &str) -> Option<StreamEvent> {
    let trimmed = payload.trim();
    if trimmed.is_empty() || trimmed == DONE_SENTINEL {
        return None;
    }
    match parse_event(trimmed, Utc::now()) {
        Ok(event) => {
            debug!(kind = event.kind(), "decoded stream event");
            Some(event)
        }
        Err(err) => {
            warn!(error = %err, frame_len = trimmed.len(), "skipping undecodable frame");
            None
        }
    }
}

fn typed<T: DeserializeOwned>(wire: &WireEvent) -> Result<T, DecodeError> {
    // `null` stands in for an omitted payload so all-default types still decode
    let data = if wire.data.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        wire.data.clone()
    };
    serde_json::from_value(data).map_err(|source| DecodeError::Payload {
        kind: wire.kind.clone(),
        source,
    })
}

fn parse_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::String(text) => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|ts| ts.with_timezone(&Utc)),
        serde_json::Value::Number(number) => {
            number.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{TaskAction, ToolCallData};
    use crate::state::TaskStatus;

    fn received() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000).expect("ts")
    }

    #[test]
    fn decodes_tool_call_with_aliases() {
        let event = parse_event(
            r#"{"type":"tool_call","data":{"name":"write_file","path":"src/app.ts"},"timestamp":1700000001000}"#,
            received(),
        )
        .expect("event");
        assert_eq!(
            event.payload,
            EventPayload::ToolCall(ToolCallData {
                id: None,
                tool: "write_file".into(),
                detail: Some("src/app.ts".into()),
            })
        );
        assert_eq!(event.timestamp.timestamp_millis(), 1_700_000_001_000);
    }

    #[test]
    fn decodes_rfc3339_timestamp_and_falls_back_to_arrival_time() {
        let stamped = parse_event(
            r#"{"type":"done","data":null,"timestamp":"2024-05-01T10:00:00Z"}"#,
            received(),
        )
        .expect("event");
        assert_eq!(stamped.timestamp.to_rfc3339(), "2024-05-01T10:00:00+00:00");

        let unstamped = parse_event(r#"{"type":"done"}"#, received()).expect("event");
        assert_eq!(unstamped.timestamp, received());
    }

    #[test]
    fn decodes_task_update_and_complete_modules() {
        let task = parse_event(
            r#"{"type":"task_update","data":{"action":"updated","task":{"id":"t1","content":"Schema","status":"completed","result":"ok"}}}"#,
            received(),
        )
        .expect("task");
        let EventPayload::TaskUpdate(update) = task.payload else {
            panic!("expected task update");
        };
        assert_eq!(update.action, TaskAction::Updated);
        assert_eq!(update.task.status, TaskStatus::Completed);
        assert_eq!(update.task.result.as_deref(), Some("ok"));

        let complete = parse_event(
            r#"{"type":"complete","data":{"message":"Done.","modules":[{"name":"auth","status":"completed"}]}}"#,
            received(),
        )
        .expect("complete");
        let EventPayload::Complete(data) = complete.payload else {
            panic!("expected complete");
        };
        assert_eq!(data.message, "Done.");
        assert_eq!(data.modules.len(), 1);
        assert!(data.modules[0].is_completed());
    }

    #[test]
    fn text_events_accept_content_and_delta_fields() {
        let message = parse_event(r#"{"type":"message","data":{"content":"Hi"}}"#, received())
            .expect("message");
        assert!(matches!(message.payload, EventPayload::Message(ref t) if t.text == "Hi"));
        let delta = parse_event(r#"{"type":"text_delta","data":{"delta":"!"}}"#, received())
            .expect("delta");
        assert!(matches!(delta.payload, EventPayload::TextDelta(ref t) if t.text == "!"));
    }

    #[test]
    fn unknown_type_is_forwarded() {
        let event = parse_event(
            r#"{"type":"usage","data":{"tokens":12}}"#,
            received(),
        )
        .expect("event");
        assert_eq!(event.kind(), "usage");
        assert!(matches!(
            event.payload,
            EventPayload::Unknown { ref data, .. } if data["tokens"] == 12
        ));
    }

    #[test]
    fn malformed_frames_are_skipped() {
        assert!(decode_frame("{not json").is_none());
        assert!(decode_frame(r#"{"data":{}}"#).is_none());
        assert!(decode_frame(r#"{"type":"tool_call","data":{"detail":"x"}}"#).is_none());
        assert!(decode_frame("[DONE]").is_none());
        assert!(decode_frame("   ").is_none());
        assert!(decode_frame(r#"{"type":"done"}"#).is_some());
    }

    #[test]
    fn thinking_payload_defaults_when_data_missing() {
        let event = parse_event(r#"{"type":"thinking"}"#, received()).expect("thinking");
        assert!(matches!(
            event.payload,
            EventPayload::Thinking(ref data) if !data.streaming && data.message.is_none()
        ));
    }
}
