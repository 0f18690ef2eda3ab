use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Trailing-edge debouncer built on a single rescheduled tokio timer.
///
/// Each [`schedule`](Self::schedule) aborts the pending timer and starts a new one, so a
/// burst of requests runs the action once, `delay` after the last request. When the timer
/// fires the action is spawned as its own task; a later `schedule` or [`cancel`](Self::cancel)
/// only ever aborts the wait, never an action that has already started.
#[derive(Debug)]
pub struct Debouncer {
    name: &'static str,
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(name: &'static str, delay: Duration) -> Self {
        Self {
            name,
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Restart the timer with `action` as the trailing call.
    ///
    /// Returns `false` when called outside a Tokio runtime; the action is dropped.
    pub fn schedule<F>(&self, action: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(handle) = Handle::try_current() else {
            tracing::warn!("No async runtime, dropping {} request", self.name);
            return false;
        };

        let delay = self.delay;
        let name = self.name;
        let timer = handle.spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::debug!("{} timer fired", name);
            tokio::spawn(action);
        });

        let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(previous) = pending.replace(timer) {
            previous.abort();
        }
        true
    }

    /// Abort the pending timer. Returns whether one was still waiting.
    pub fn cancel(&self) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        match pending.take() {
            Some(timer) if !timer.is_finished() => {
                timer.abort();
                tracing::debug!("Cancelled pending {}", self.name);
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        let pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        pending.as_ref().is_some_and(|timer| !timer.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(timer) = pending.take() {
                timer.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_action(counter: &Arc<AtomicU32>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_runs_once_after_last_request() {
        let debouncer = Debouncer::new("test", Duration::from_millis(300));
        let counter = Arc::new(AtomicU32::new(0));

        for _ in 0..5 {
            assert!(debouncer.schedule(counting_action(&counter)));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_action() {
        let debouncer = Debouncer::new("test", Duration::from_millis(500));
        let counter = Arc::new(AtomicU32::new(0));

        debouncer.schedule(counting_action(&counter));
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_schedule_without_runtime_is_dropped() {
        let debouncer = Debouncer::new("test", Duration::from_millis(10));
        assert!(!debouncer.schedule(async {}));
        assert!(!debouncer.is_pending());
    }
}
