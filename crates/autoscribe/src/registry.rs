use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// Upper bound on the parent-chain walk in [`SessionRegistry::resolve_root`].
/// The host never nests subagents anywhere near this deep; the cap turns a
/// corrupt parent chain into a bounded walk instead of a hang.
const MAX_PARENT_DEPTH: usize = 64;

/// One tracked conversational session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Host-assigned session id, stable for the process lifetime.
    pub id: String,
    /// Parent session id; `None` for root sessions.
    pub parent_id: Option<String>,
    /// Display title, initially a placeholder, later a derived topic.
    pub title: String,
    /// Destination transcript path. Unset until the first flush, then fixed
    /// for the session's lifetime.
    pub file_path: Option<PathBuf>,
    /// Registration time.
    pub created_at: DateTime<Utc>,
    /// Ids of currently-registered sessions whose parent is this session.
    pub child_session_ids: Vec<String>,
}

impl Session {
    /// Whether this session is a unit of persistence (has no parent).
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// In-memory registry of sessions and their parent/child links.
///
/// Also owns the pending-children buffer that papers over event-ordering
/// nondeterminism: a child whose `Created` event arrives before its parent's
/// is parked here and adopted the moment the parent registers. All
/// operations are plain map operations; unknown ids are no-ops, never
/// errors.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, Session>,
    pending_children: HashMap<String, Vec<String>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session, overwriting any previous registration of the
    /// same id (the host contract leaves re-registration undefined; the
    /// latest registration wins).
    ///
    /// Child links resolve in both directions: a child with a known parent
    /// is appended to that parent's child list immediately, a child with an
    /// unknown parent is parked in the pending buffer, and a new root adopts
    /// any children already waiting for it.
    pub fn register(&mut self, id: &str, title: &str, parent_id: Option<&str>) -> &Session {
        let mut session = Session {
            id: id.to_string(),
            parent_id: parent_id.map(str::to_string),
            title: title.to_string(),
            file_path: None,
            created_at: Utc::now(),
            child_session_ids: Vec::new(),
        };

        match parent_id {
            Some(parent_id) => {
                if let Some(parent) = self.sessions.get_mut(parent_id) {
                    if !parent.child_session_ids.iter().any(|c| c == id) {
                        parent.child_session_ids.push(id.to_string());
                    }
                } else {
                    let pending = self.pending_children.entry(parent_id.to_string()).or_default();
                    if !pending.iter().any(|c| c == id) {
                        pending.push(id.to_string());
                    }
                }
            }
            None => {
                // Rebuild the child list from the sessions that already
                // point at us (covers both pending children and survivors
                // of a re-registration), in registration order.
                let mut linked: Vec<(DateTime<Utc>, String)> = self
                    .sessions
                    .values()
                    .filter(|s| s.parent_id.as_deref() == Some(id))
                    .map(|s| (s.created_at, s.id.clone()))
                    .collect();
                linked.sort();
                session.child_session_ids = linked.into_iter().map(|(_, id)| id).collect();
                self.pending_children.remove(id);
            }
        }

        self.sessions.insert(id.to_string(), session);
        // Inserted just above, so indexing cannot miss.
        &self.sessions[id]
    }

    /// Looks up a session by id.
    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// Removes a session, detaching it from its parent's child list and from
    /// the pending buffer. Children of the removed session are not removed;
    /// the host deletes them independently.
    pub fn remove(&mut self, id: &str) {
        let Some(session) = self.sessions.remove(id) else {
            return;
        };
        if let Some(parent_id) = &session.parent_id {
            if let Some(parent) = self.sessions.get_mut(parent_id) {
                parent.child_session_ids.retain(|c| c != id);
            }
            if let Some(pending) = self.pending_children.get_mut(parent_id) {
                pending.retain(|c| c != id);
                if pending.is_empty() {
                    self.pending_children.remove(parent_id);
                }
            }
        }
    }

    /// Updates a session's title in place; no-op for unknown ids.
    pub fn update_title(&mut self, id: &str, title: &str) {
        if let Some(session) = self.sessions.get_mut(id) {
            session.title = title.to_string();
        }
    }

    /// Fixes a session's transcript path. Only the first assignment sticks;
    /// later calls are ignored so repeated flushes never fork a second file.
    pub fn assign_file_path(&mut self, id: &str, path: PathBuf) -> Option<PathBuf> {
        let session = self.sessions.get_mut(id)?;
        if session.file_path.is_none() {
            session.file_path = Some(path);
        }
        session.file_path.clone()
    }

    /// Resolves the child sessions of `parent_id` in registration order,
    /// silently dropping ids that no longer resolve.
    pub fn children_of(&self, parent_id: &str) -> Vec<Session> {
        let Some(parent) = self.sessions.get(parent_id) else {
            return Vec::new();
        };
        parent
            .child_session_ids
            .iter()
            .filter_map(|id| self.sessions.get(id))
            .cloned()
            .collect()
    }

    /// Walks the parent chain from `id` to the topmost resolvable session.
    ///
    /// The walk is bounded by [`MAX_PARENT_DEPTH`] and a visited set, so a
    /// corrupt chain (cycle or absurd depth) terminates at the last session
    /// reached rather than looping.
    pub fn resolve_root(&self, id: &str) -> Option<&Session> {
        let mut current = self.sessions.get(id)?;
        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(&current.id);
        for _ in 0..MAX_PARENT_DEPTH {
            let Some(parent_id) = &current.parent_id else {
                return Some(current);
            };
            let Some(parent) = self.sessions.get(parent_id) else {
                // Parent was removed (or never arrived); the chain ends here.
                return Some(current);
            };
            if !visited.insert(&parent.id) {
                tracing::warn!(session = %id, "Parent chain contains a cycle");
                return Some(current);
            }
            current = parent;
        }
        tracing::warn!(session = %id, "Parent chain exceeds depth bound");
        Some(current)
    }

    /// Number of pending-buffer entries still waiting for a parent.
    /// Exposed for tests; steady state is zero once all parents arrive.
    pub fn pending_parent_count(&self) -> usize {
        self.pending_children.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn child_after_parent_links_immediately() {
        let mut reg = SessionRegistry::new();
        reg.register("a", "Main", None);
        reg.register("b", "Subagent", Some("a"));
        let children = reg.children_of("a");
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, "b");
        assert_eq!(reg.pending_parent_count(), 0);
    }

    #[test]
    fn child_before_parent_is_adopted_on_arrival() {
        let mut reg = SessionRegistry::new();
        reg.register("b", "Subagent", Some("a"));
        assert_eq!(reg.pending_parent_count(), 1);
        reg.register("a", "Main", None);
        let children = reg.children_of("a");
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, "b");
        assert_eq!(reg.pending_parent_count(), 0);
    }

    #[test]
    fn multiple_pending_children_all_adopted_once() {
        let mut reg = SessionRegistry::new();
        reg.register("b", "Subagent", Some("a"));
        reg.register("c", "Subagent", Some("a"));
        reg.register("a", "Main", None);
        let ids: Vec<_> = reg.children_of("a").into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn reregister_root_keeps_live_children() {
        let mut reg = SessionRegistry::new();
        reg.register("a", "Main", None);
        reg.register("b", "Subagent", Some("a"));
        reg.register("a", "Main again", None);
        let children = reg.children_of("a");
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, "b");
        assert_eq!(reg.get("a").unwrap().title, "Main again");
    }

    #[test]
    fn remove_detaches_from_parent() {
        let mut reg = SessionRegistry::new();
        reg.register("a", "Main", None);
        reg.register("b", "Subagent", Some("a"));
        reg.remove("b");
        assert!(reg.children_of("a").is_empty());
        assert!(reg.get("a").unwrap().child_session_ids.is_empty());
    }

    #[test]
    fn remove_pending_child_clears_buffer() {
        let mut reg = SessionRegistry::new();
        reg.register("b", "Subagent", Some("a"));
        reg.remove("b");
        assert_eq!(reg.pending_parent_count(), 0);
        reg.register("a", "Main", None);
        assert!(reg.children_of("a").is_empty());
    }

    #[test]
    fn children_of_drops_removed_ids() {
        let mut reg = SessionRegistry::new();
        reg.register("a", "Main", None);
        reg.register("b", "Subagent", Some("a"));
        reg.register("c", "Subagent", Some("a"));
        // Simulate a stale list entry by removing the session map entry only.
        reg.sessions.remove("b");
        let ids: Vec<_> = reg.children_of("a").into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["c"]);
    }

    #[test]
    fn resolve_root_walks_chain() {
        let mut reg = SessionRegistry::new();
        reg.register("a", "Main", None);
        reg.register("b", "Subagent", Some("a"));
        reg.register("c", "Nested", Some("b"));
        assert_eq!(reg.resolve_root("c").unwrap().id, "a");
        assert_eq!(reg.resolve_root("a").unwrap().id, "a");
    }

    #[test]
    fn resolve_root_with_missing_parent_stops_at_child() {
        let mut reg = SessionRegistry::new();
        reg.register("b", "Subagent", Some("a"));
        assert_eq!(reg.resolve_root("b").unwrap().id, "b");
    }

    #[test]
    fn resolve_root_terminates_on_cycle() {
        let mut reg = SessionRegistry::new();
        reg.register("a", "A", Some("b"));
        reg.register("b", "B", Some("a"));
        // Either endpoint is acceptable; the walk must simply terminate.
        assert!(reg.resolve_root("a").is_some());
    }

    #[test]
    fn file_path_assignment_is_once_only() {
        let mut reg = SessionRegistry::new();
        reg.register("a", "Main", None);
        let first = reg.assign_file_path("a", PathBuf::from("/tmp/first.md"));
        let second = reg.assign_file_path("a", PathBuf::from("/tmp/second.md"));
        assert_eq!(first, Some(PathBuf::from("/tmp/first.md")));
        assert_eq!(second, Some(PathBuf::from("/tmp/first.md")));
    }

    #[test]
    fn update_title_on_unknown_id_is_noop() {
        let mut reg = SessionRegistry::new();
        reg.update_title("ghost", "Title");
        assert!(reg.get("ghost").is_none());
    }
}
