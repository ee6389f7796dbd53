use serde_json::Value;

/// A session lifecycle event as observed on the host's event stream.
///
/// Events for a single session arrive in host order; events for different
/// sessions carry no ordering guarantee, so a child's `Created` may precede
/// its parent's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A session was created. `parent_id` is set for subagent sessions.
    Created {
        /// Host session id.
        id: String,
        /// Parent session id for subagent sessions.
        parent_id: Option<String>,
        /// Initial title, often a placeholder.
        title: Option<String>,
    },
    /// A session's metadata changed; only title changes are of interest.
    Updated {
        /// Host session id.
        id: String,
        /// New title, when one was set.
        title: Option<String>,
    },
    /// The session stopped receiving input; a debounced flush should follow.
    Idle {
        /// Host session id.
        session_id: String,
    },
    /// The session was deleted; flush immediately, then forget it.
    Deleted {
        /// Host session id.
        id: String,
    },
}

impl SessionEvent {
    /// Parses a raw host event. Unknown event types and malformed payloads
    /// yield `None`; the caller treats those as no-ops.
    pub fn from_json(raw: &Value) -> Option<Self> {
        let props = raw.get("properties")?;
        match raw.get("type")?.as_str()? {
            "session.created" => {
                let info = props.get("info")?;
                Some(Self::Created {
                    id: info.get("id")?.as_str()?.to_string(),
                    parent_id: str_opt(info, "parentID"),
                    title: str_opt(info, "title"),
                })
            }
            "session.updated" => {
                let info = props.get("info")?;
                Some(Self::Updated {
                    id: info.get("id")?.as_str()?.to_string(),
                    title: str_opt(info, "title"),
                })
            }
            "session.idle" => Some(Self::Idle {
                session_id: props.get("sessionID")?.as_str()?.to_string(),
            }),
            "session.deleted" => {
                let info = props.get("info")?;
                Some(Self::Deleted {
                    id: info.get("id")?.as_str()?.to_string(),
                })
            }
            _ => None,
        }
    }
}

fn str_opt(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_created_with_parent() {
        let raw = json!({
            "type": "session.created",
            "properties": { "info": { "id": "ses_b", "parentID": "ses_a" } }
        });
        assert_eq!(
            SessionEvent::from_json(&raw),
            Some(SessionEvent::Created {
                id: "ses_b".to_string(),
                parent_id: Some("ses_a".to_string()),
                title: None,
            })
        );
    }

    #[test]
    fn parses_idle() {
        let raw = json!({
            "type": "session.idle",
            "properties": { "sessionID": "ses_a" }
        });
        assert_eq!(
            SessionEvent::from_json(&raw),
            Some(SessionEvent::Idle {
                session_id: "ses_a".to_string()
            })
        );
    }

    #[test]
    fn unknown_event_type_is_ignored() {
        let raw = json!({ "type": "message.updated", "properties": {} });
        assert!(SessionEvent::from_json(&raw).is_none());
    }

    #[test]
    fn malformed_event_is_ignored() {
        let raw = json!({ "type": "session.deleted", "properties": { "info": {} } });
        assert!(SessionEvent::from_json(&raw).is_none());
    }
}
