use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Per-session debounce scheduler.
///
/// Coalesces bursts of idle signals for the same session into a single
/// deferred flush: each new signal cancels the previous timer, so only the
/// last signal within any quiet window fires. Deletion cancels the timer
/// and runs the action immediately. Timers for distinct session ids are
/// fully independent.
#[derive(Default)]
pub struct FlushScheduler {
    timers: Arc<Mutex<HashMap<String, TimerSlot>>>,
    generation: AtomicU64,
}

struct TimerSlot {
    generation: u64,
    // Filled in right after spawn; the slot is reserved first so the timer
    // task always finds its own entry even for a zero delay.
    handle: Option<JoinHandle<()>>,
}

impl TimerSlot {
    fn abort(self) {
        if let Some(handle) = self.handle {
            handle.abort();
        }
    }
}

impl FlushScheduler {
    /// Creates a scheduler with no armed timers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms (or re-arms) the debounce timer for `id`.
    ///
    /// Any previous timer for the same id is cancelled first. When the
    /// timer expires it removes its map entry and runs `action` on the
    /// timer task; the scheduler does not await the action's completion.
    pub fn on_idle<F, Fut>(&self, id: &str, delay: Duration, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;

        if let Some(previous) = self.timers.lock().insert(
            id.to_string(),
            TimerSlot {
                generation,
                handle: None,
            },
        ) {
            previous.abort();
        }

        let timers = Arc::clone(&self.timers);
        let task_id = id.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Drop the slot only if it is still ours; a reschedule may have
            // replaced it while this task was waiting to run.
            {
                let mut timers = timers.lock();
                match timers.get(&task_id) {
                    Some(slot) if slot.generation == generation => {
                        timers.remove(&task_id);
                    }
                    _ => return,
                }
            }
            action().await;
        });

        let mut timers = self.timers.lock();
        match timers.get_mut(id) {
            Some(slot) if slot.generation == generation => slot.handle = Some(handle),
            // A newer signal claimed the id while spawning; it could not
            // abort a handle it never saw, so drop this timer here.
            Some(_) => handle.abort(),
            // Slot gone: either this timer already fired and consumed it
            // (aborting now would kill the in-flight action) or a delete
            // cleared it (the task cancels itself on wake). Leave it alone.
            None => {}
        }
    }

    /// Cancels any pending timer for `id` and runs `action` immediately.
    pub async fn on_delete<F, Fut>(&self, id: &str, action: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()>,
    {
        let previous = self.timers.lock().remove(id);
        if let Some(slot) = previous {
            slot.abort();
        }
        action().await;
    }

    /// Number of currently armed timers. Exposed for tests.
    pub fn armed_count(&self) -> usize {
        self.timers.lock().len()
    }
}
