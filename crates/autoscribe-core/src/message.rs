use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The role of the participant that authored a [`MessageData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A human end-user.
    User,
    /// The AI assistant.
    Assistant,
}

/// Execution state attached to a tool-call part.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolState {
    /// Host-reported status (`running`, `completed`, `error`, ...).
    pub status: String,
    /// JSON arguments the tool was invoked with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    /// Textual output produced by the tool, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Human-readable title the host assigned to the invocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Error text when the invocation failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One typed segment of a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PartData {
    /// Plain text content.
    Text {
        /// The text body.
        text: String,
    },
    /// A tool invocation with its status and payloads.
    Tool {
        /// Name of the invoked tool.
        tool: String,
        /// Invocation state (status, input, output, error).
        state: ToolState,
    },
    /// A file attachment, possibly an inline-encoded image.
    File {
        /// Original filename, when the host provided one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
        /// Remote URL or inline `data:` URL.
        url: String,
        /// Declared MIME type.
        mime: String,
        /// Relative path to the extracted image file, set by the image
        /// extraction pass once the inline payload has been written to disk.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        local_path: Option<String>,
    },
    /// Model reasoning text.
    Reasoning {
        /// The reasoning body.
        text: String,
    },
    /// Any part type the pipeline does not specifically handle.
    Other {
        /// The host's type tag, kept for rendering.
        part_type: String,
    },
}

/// A single message of a session transcript, reduced to the fields the
/// formatter needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageData {
    /// Host-assigned message id.
    pub id: String,
    /// The role of the message author.
    pub role: Role,
    /// Ordered message parts.
    pub parts: Vec<PartData>,
    /// Creation time, defaulting to now when the host omits it.
    pub created_at: DateTime<Utc>,
}

impl MessageData {
    /// Converts one raw host message into a [`MessageData`].
    ///
    /// Lenient by design: missing fields default, unknown part types become
    /// [`PartData::Other`], and a message without an id or role yields
    /// `None` (the host contract treats such messages as noise).
    pub fn from_json(raw: &Value) -> Option<Self> {
        let id = raw.get("id")?.as_str()?.to_string();
        let role = match raw.get("role")?.as_str()? {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            _ => return None,
        };
        let parts = raw
            .get("parts")
            .and_then(Value::as_array)
            .map(|parts| parts.iter().filter_map(part_from_json).collect())
            .unwrap_or_default();
        let created_at = raw
            .get("time")
            .and_then(|t| t.get("created"))
            .and_then(Value::as_i64)
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or_else(Utc::now);
        Some(Self {
            id,
            role,
            parts,
            created_at,
        })
    }
}

fn part_from_json(raw: &Value) -> Option<PartData> {
    let part_type = raw.get("type")?.as_str()?;
    let part = match part_type {
        "text" => PartData::Text {
            text: str_field(raw, "text"),
        },
        "tool" => PartData::Tool {
            tool: raw
                .get("tool")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            state: tool_state_from_json(raw.get("state")),
        },
        "file" => PartData::File {
            filename: opt_str_field(raw, "filename"),
            url: str_field(raw, "url"),
            mime: raw
                .get("mime")
                .and_then(Value::as_str)
                .unwrap_or("application/octet-stream")
                .to_string(),
            local_path: None,
        },
        "reasoning" => PartData::Reasoning {
            text: str_field(raw, "text"),
        },
        other => PartData::Other {
            part_type: other.to_string(),
        },
    };
    Some(part)
}

fn tool_state_from_json(raw: Option<&Value>) -> ToolState {
    let Some(raw) = raw else {
        return ToolState {
            status: "unknown".to_string(),
            ..ToolState::default()
        };
    };
    ToolState {
        status: raw
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string(),
        input: raw.get("input").cloned(),
        output: opt_str_field(raw, "output"),
        title: opt_str_field(raw, "title"),
        error: opt_str_field(raw, "error"),
    }
}

fn str_field(raw: &Value, key: &str) -> String {
    raw.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn opt_str_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_text_and_tool_parts() {
        let raw = json!({
            "id": "msg_1",
            "role": "assistant",
            "time": { "created": 1_700_000_000_000_i64 },
            "parts": [
                { "type": "text", "text": "hello" },
                {
                    "type": "tool",
                    "tool": "bash",
                    "state": { "status": "completed", "output": "ok" }
                }
            ]
        });
        let msg = MessageData::from_json(&raw).unwrap();
        assert_eq!(msg.id, "msg_1");
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.parts.len(), 2);
        assert!(matches!(&msg.parts[0], PartData::Text { text } if text == "hello"));
        match &msg.parts[1] {
            PartData::Tool { tool, state } => {
                assert_eq!(tool, "bash");
                assert_eq!(state.status, "completed");
                assert_eq!(state.output.as_deref(), Some("ok"));
            }
            other => panic!("expected tool part, got {other:?}"),
        }
    }

    #[test]
    fn unknown_part_type_becomes_other() {
        let raw = json!({
            "id": "msg_2",
            "role": "user",
            "parts": [{ "type": "step-start" }]
        });
        let msg = MessageData::from_json(&raw).unwrap();
        assert!(
            matches!(&msg.parts[0], PartData::Other { part_type } if part_type == "step-start")
        );
    }

    #[test]
    fn missing_timestamp_defaults_to_now() {
        let raw = json!({ "id": "msg_3", "role": "user" });
        let msg = MessageData::from_json(&raw).unwrap();
        assert!((Utc::now() - msg.created_at).num_seconds() < 5);
    }

    #[test]
    fn message_without_role_is_dropped() {
        let raw = json!({ "id": "msg_4" });
        assert!(MessageData::from_json(&raw).is_none());
    }
}
