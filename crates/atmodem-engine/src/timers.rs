//! Named, cancelable timers.
//!
//! The dispatch engine needs two kinds of delays: per-task timeouts and the
//! inter-command pacing window. Both are backed by [`TimerRegistry`], a map
//! of active timers keyed by string, owned by the engine instance so that
//! two engines never collide on timer keys.
//!
//! Canceling a timer prevents its handle from ever resolving -- it is not
//! merely marked late. This matters for task timeouts: the timer for an
//! already-settled task must never fire afterwards and attempt a second
//! settle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// A registry of active named timers.
///
/// Cloning the registry shares the underlying timer map. Entries are
/// removed on both natural fire and cancellation. Scheduling a key that is
/// already registered cancels and replaces the existing timer, so there is
/// never more than one live timer per key.
#[derive(Clone, Default)]
pub struct TimerRegistry {
    inner: Arc<Mutex<Timers>>,
}

#[derive(Default)]
struct Timers {
    /// Monotonic id source, used to tell a replaced timer from its successor.
    next_id: u64,
    active: HashMap<String, TimerEntry>,
}

struct TimerEntry {
    id: u64,
    token: CancellationToken,
}

/// Handle to one scheduled timer.
///
/// Await [`TimerHandle::wait`] to observe the fire; it returns `false` if
/// the timer was canceled instead.
pub struct TimerHandle {
    key: String,
    fired: oneshot::Receiver<()>,
}

impl TimerHandle {
    /// The key this timer was scheduled under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Resolve when the timer fires; `false` means it was canceled.
    pub async fn wait(&mut self) -> bool {
        (&mut self.fired).await.is_ok()
    }

    /// Whether the timer has already fired.
    pub fn already_fired(&mut self) -> bool {
        matches!(self.fired.try_recv(), Ok(()))
    }
}

impl TimerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Timers> {
        // A panic while holding this very short-lived lock is already fatal
        // to the engine; recover the data rather than poisoning cascades.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Schedule a timer under `key`, canceling and replacing any existing
    /// timer with the same key.
    pub fn schedule(&self, key: impl Into<String>, delay: Duration) -> TimerHandle {
        let key = key.into();
        let token = CancellationToken::new();
        let id;
        {
            let mut timers = self.lock();
            timers.next_id += 1;
            id = timers.next_id;
            if let Some(prev) = timers.active.insert(
                key.clone(),
                TimerEntry {
                    id,
                    token: token.clone(),
                },
            ) {
                trace!(key = %key, "replacing existing timer");
                prev.token.cancel();
            }
        }

        let (tx, rx) = oneshot::channel();
        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    // Remove our own entry, but only if it has not been
                    // replaced by a newer timer under the same key.
                    let mut timers = inner.lock().unwrap_or_else(|e| e.into_inner());
                    if timers.active.get(&task_key).is_some_and(|e| e.id == id) {
                        timers.active.remove(&task_key);
                    }
                    drop(timers);
                    let _ = tx.send(());
                }
                _ = token.cancelled() => {
                    // Entry was removed by cancel(); dropping `tx` resolves
                    // the handle as canceled.
                }
            }
        });

        TimerHandle { key, fired: rx }
    }

    /// Cancel the timer registered under `key`. No-op if the key does not
    /// exist; idempotent.
    pub fn cancel(&self, key: &str) {
        let entry = self.lock().active.remove(key);
        if let Some(entry) = entry {
            trace!(key = %key, "canceling timer");
            entry.token.cancel();
        }
    }

    /// Cancel every currently registered timer whose key starts with
    /// `prefix`.
    pub fn cancel_by_prefix(&self, prefix: &str) {
        let mut timers = self.lock();
        let keys: Vec<String> = timers
            .active
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        for key in keys {
            if let Some(entry) = timers.active.remove(&key) {
                trace!(key = %key, "canceling timer by prefix");
                entry.token.cancel();
            }
        }
    }

    /// The number of currently registered timers.
    pub fn active(&self) -> usize {
        self.lock().active.len()
    }

    /// Whether a timer is registered under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.lock().active.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn timer_fires_after_delay() {
        let registry = TimerRegistry::new();
        let mut handle = registry.schedule("t", Duration::from_millis(20));

        let start = tokio::time::Instant::now();
        assert!(handle.wait().await);
        assert!(start.elapsed() >= Duration::from_millis(20));

        // Entry removed on natural fire.
        assert_eq!(registry.active(), 0);
    }

    #[tokio::test]
    async fn cancel_prevents_fire() {
        let registry = TimerRegistry::new();
        let mut handle = registry.schedule("t", Duration::from_millis(10));

        registry.cancel("t");
        assert_eq!(registry.active(), 0);

        // The handle resolves as canceled, never as fired -- even well
        // after the original deadline.
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!handle.wait().await);
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let registry = TimerRegistry::new();
        registry.schedule("t", Duration::from_millis(10));
        registry.cancel("t");
        registry.cancel("t");
        registry.cancel("never_existed");
        assert_eq!(registry.active(), 0);
    }

    #[tokio::test]
    async fn schedule_same_key_replaces() {
        let registry = TimerRegistry::new();
        let mut first = registry.schedule("t", Duration::from_millis(5));
        let mut second = registry.schedule("t", Duration::from_millis(5));

        assert_eq!(registry.active(), 1);
        assert!(!first.wait().await);
        assert!(second.wait().await);
    }

    #[tokio::test]
    async fn cancel_by_prefix_is_exact() {
        let registry = TimerRegistry::new();
        let mut a = registry.schedule("AT+CSQ_timeout", Duration::from_millis(15));
        let mut b = registry.schedule("AT+CMGR=1_timeout", Duration::from_millis(15));
        let mut keep = registry.schedule("pacing", Duration::from_millis(15));

        registry.cancel_by_prefix("AT+");

        assert!(!a.wait().await);
        assert!(!b.wait().await);
        assert!(keep.wait().await);
    }

    #[tokio::test]
    async fn already_fired_observed_without_await() {
        let registry = TimerRegistry::new();
        let mut handle = registry.schedule("t", Duration::from_millis(5));

        assert!(!handle.already_fired());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(handle.already_fired());
    }

    #[tokio::test]
    async fn registries_do_not_share_keys() {
        let one = TimerRegistry::new();
        let two = TimerRegistry::new();

        let mut handle = one.schedule("t", Duration::from_millis(10));
        two.cancel("t");

        // Canceling on an unrelated registry must not affect ours.
        assert!(handle.wait().await);
    }
}
