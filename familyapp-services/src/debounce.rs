//! Last-call-wins debounce for search-as-you-type lookups.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

pub const DEFAULT_DELAY: Duration = Duration::from_millis(300);

/// Each `call` waits out `delay` and then runs only if no newer call was
/// made meanwhile. Work that has already started is left to finish.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Resolves to `None` if superseded before the delay elapsed.
    pub fn call<F, T>(&self, work: F) -> JoinHandle<Option<T>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::clone(&self.generation);
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if generation.load(Ordering::SeqCst) != ticket {
                return None;
            }
            Some(work.await)
        })
    }

    /// Supersede any pending call without scheduling new work.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test(start_paused = true)]
    async fn only_the_last_keystroke_fires() {
        let d = Debouncer::default();
        let a = d.call(async { "p" });
        tokio::time::sleep(Duration::from_millis(100)).await;
        let b = d.call(async { "pa" });
        tokio::time::sleep(Duration::from_millis(100)).await;
        let c = d.call(async { "par" });

        assert_eq!(a.await.unwrap(), None);
        assert_eq!(b.await.unwrap(), None);
        assert_eq!(c.await.unwrap(), Some("par"));
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_work_is_not_cancelled() {
        let d = Debouncer::new(Duration::from_millis(50));
        let (tx, rx) = oneshot::channel::<&'static str>();
        let first = d.call(async move { rx.await.unwrap_or("dropped") });

        // let the first call pass its delay and start waiting on the channel
        tokio::time::sleep(Duration::from_millis(60)).await;
        let second = d.call(async { "second" });
        tx.send("first").unwrap();

        assert_eq!(first.await.unwrap(), Some("first"));
        assert_eq!(second.await.unwrap(), Some("second"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_call() {
        let d = Debouncer::default();
        let h = d.call(async { 1 });
        d.cancel();
        assert_eq!(h.await.unwrap(), None);
    }
}
