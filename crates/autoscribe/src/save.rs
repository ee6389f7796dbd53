use crate::debounce::FlushScheduler;
use crate::filename::{extract_topic, generate_filename};
use crate::format::{format_session, ChildTranscript};
use crate::images::ImagePass;
use crate::persist::{ensure_dir, write_atomic, write_secondary};
use crate::registry::{Session, SessionRegistry};
use crate::source::MessageSource;
use autoscribe_core::{AutosaveConfig, MessageData, PartData, Role, SessionEvent};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default title for subagent sessions registered without one.
const SUBAGENT_TITLE: &str = "Subagent";

/// The autosave pipeline: session lifecycle tracking plus debounced
/// transcript persistence.
///
/// One instance per host process. Feed it the host's session lifecycle
/// events via [`Autoscribe::handle_event`] (or raw JSON via
/// [`Autoscribe::handle_raw_event`]); it tracks sessions and their
/// parent/child links, coalesces idle signals per session, and writes each
/// root session's rendered transcript atomically on flush. No error ever
/// escapes the event entry points; failures are logged and the affected
/// flush waits for its next trigger.
#[derive(Clone)]
pub struct Autoscribe {
    shared: Arc<Shared>,
}

struct Shared {
    registry: Mutex<SessionRegistry>,
    scheduler: FlushScheduler,
    source: Arc<dyn MessageSource>,
    config: AutosaveConfig,
    primary_root: PathBuf,
}

impl Autoscribe {
    /// Creates the pipeline rooted at `base_dir` (the host project root).
    ///
    /// Transcripts go under `base_dir` joined with the configured save
    /// directory. Both save roots are created up front, best-effort: a
    /// failure here is logged and individual writes will retry directory
    /// creation on their own.
    pub async fn new(
        base_dir: impl AsRef<Path>,
        source: Arc<dyn MessageSource>,
        config: AutosaveConfig,
    ) -> Self {
        let primary_root = base_dir.as_ref().join(&config.save_directory);
        ensure_dir(&primary_root).await;
        if let Some(secondary_root) = &config.secondary_root {
            ensure_dir(secondary_root).await;
        }
        Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(SessionRegistry::new()),
                scheduler: FlushScheduler::new(),
                source,
                config,
                primary_root,
            }),
        }
    }

    /// Parses and dispatches one raw host event. Unknown and malformed
    /// events are no-ops.
    pub async fn handle_raw_event(&self, raw: &serde_json::Value) {
        if let Some(event) = SessionEvent::from_json(raw) {
            self.handle_event(event).await;
        }
    }

    /// Dispatches one session lifecycle event.
    ///
    /// `Created` and `Updated` mutate the registry synchronously. `Idle`
    /// arms the per-session debounce timer; the eventual flush runs on a
    /// background task and this call does not wait for it. `Deleted`
    /// flushes immediately and removes the session only after that flush
    /// attempt completes.
    pub async fn handle_event(&self, event: SessionEvent) {
        match event {
            SessionEvent::Created {
                id,
                parent_id,
                title,
            } => {
                let title = match (&parent_id, title) {
                    (_, Some(title)) => title,
                    (Some(_), None) => SUBAGENT_TITLE.to_string(),
                    (None, None) => String::new(),
                };
                self.shared
                    .registry
                    .lock()
                    .register(&id, &title, parent_id.as_deref());
            }
            SessionEvent::Updated { id, title } => {
                if let Some(title) = title {
                    self.shared.registry.lock().update_title(&id, &title);
                }
            }
            SessionEvent::Idle { session_id } => {
                let shared = Arc::clone(&self.shared);
                let flush_id = session_id.clone();
                self.shared.scheduler.on_idle(
                    &session_id,
                    self.shared.config.debounce,
                    move || flush_session(shared, flush_id),
                );
            }
            SessionEvent::Deleted { id } => {
                let shared = Arc::clone(&self.shared);
                let flush_id = id.clone();
                self.shared
                    .scheduler
                    .on_delete(&id, move || flush_session(shared, flush_id))
                    .await;
                self.shared.registry.lock().remove(&id);
            }
        }
    }

    /// Flushes a session immediately, outside the debounce machinery.
    /// Exposed for hosts that want a final sweep before shutdown.
    pub async fn flush(&self, session_id: &str) {
        flush_session(Arc::clone(&self.shared), session_id.to_string()).await;
    }

    /// Snapshot of a tracked session, if registered. Exposed for tests and
    /// host diagnostics.
    pub fn session(&self, id: &str) -> Option<Session> {
        self.shared.registry.lock().get(id).cloned()
    }

    /// The resolved primary save root.
    pub fn primary_root(&self) -> &Path {
        &self.shared.primary_root
    }
}

/// Renders and persists the root ancestor of `id`.
///
/// Safe to re-run at any time: the output path is fixed on first
/// assignment, and every run overwrites that path with the current message
/// superset, so interleaved flushes for the same session converge instead
/// of duplicating files. Registry locks are never held across an await.
async fn flush_session(shared: Arc<Shared>, id: String) {
    // Children are never written standalone; resolve the root first.
    let snapshot = {
        let registry = shared.registry.lock();
        match registry.resolve_root(&id) {
            Some(root) if root.is_root() => root.clone(),
            Some(orphan) => {
                tracing::debug!(session = %orphan.id, "Skipping flush, parent chain unresolved");
                return;
            }
            None => return,
        }
    };
    let root_id = snapshot.id;

    let mut messages = match shared.source.messages(&root_id).await {
        Ok(messages) => messages,
        Err(e) => {
            tracing::warn!(session = %root_id, error = %e, "Failed to fetch messages");
            return;
        }
    };
    if messages.is_empty() {
        return;
    }

    let mut title = snapshot.title;
    if is_placeholder_title(&title) {
        if let Some(text) = first_user_text(&messages) {
            title = extract_topic(text, shared.config.max_topic_length);
            shared.registry.lock().update_title(&root_id, &title);
        }
    }

    let candidate = shared.primary_root.join(generate_filename(
        &title,
        snapshot.created_at,
        shared.config.max_topic_length,
    ));
    let Some(path) = shared.registry.lock().assign_file_path(&root_id, candidate) else {
        // Deleted while this flush was in flight.
        return;
    };

    let children = shared.registry.lock().children_of(&root_id);
    let mut child_transcripts = Vec::with_capacity(children.len());
    for child in children {
        match shared.source.messages(&child.id).await {
            Ok(child_messages) => child_transcripts.push(ChildTranscript {
                title: child.title,
                created_at: child.created_at,
                messages: child_messages,
            }),
            Err(e) => {
                tracing::warn!(session = %child.id, error = %e, "Failed to fetch child messages");
                return;
            }
        }
    }

    // Image extraction must finish before formatting: the formatter renders
    // whatever reference each part carries.
    let mut image_pass = ImagePass::new(
        &path,
        &title,
        snapshot.created_at,
        &shared.primary_root,
        shared.config.secondary_root.as_deref(),
    );
    image_pass.process(&mut messages).await;
    for child in &mut child_transcripts {
        image_pass.process(&mut child.messages).await;
    }

    let content = format_session(&title, snapshot.created_at, &messages, &child_transcripts);

    if !write_atomic(&path, &content).await {
        return;
    }
    if let Some(secondary_root) = &shared.config.secondary_root {
        write_secondary(&path, &shared.primary_root, secondary_root, &content).await;
    }
    tracing::debug!(session = %root_id, path = %path.display(), "Transcript saved");
}

fn is_placeholder_title(title: &str) -> bool {
    title.is_empty() || title.starts_with("New session") || title.starts_with("New-session-")
}

fn first_user_text(messages: &[MessageData]) -> Option<&str> {
    messages
        .iter()
        .find(|m| m.role == Role::User)?
        .parts
        .iter()
        .find_map(|part| match part {
            PartData::Text { text } => Some(text.as_str()),
            _ => None,
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_titles_are_detected() {
        assert!(is_placeholder_title(""));
        assert!(is_placeholder_title("New session"));
        assert!(is_placeholder_title("New-session-20240307"));
        assert!(!is_placeholder_title("Fix parser"));
    }

    #[test]
    fn first_user_text_skips_assistant_and_non_text() {
        let messages = vec![
            MessageData {
                id: "m1".to_string(),
                role: Role::Assistant,
                parts: vec![PartData::Text {
                    text: "greeting".to_string(),
                }],
                created_at: chrono::Utc::now(),
            },
            MessageData {
                id: "m2".to_string(),
                role: Role::User,
                parts: vec![
                    PartData::Other {
                        part_type: "step-start".to_string(),
                    },
                    PartData::Text {
                        text: "fix the parser".to_string(),
                    },
                ],
                created_at: chrono::Utc::now(),
            },
        ];
        assert_eq!(first_user_text(&messages), Some("fix the parser"));
    }
}
