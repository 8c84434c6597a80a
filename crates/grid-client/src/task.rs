//! Cancellable request slot
//!
//! A [`CancellableTask`] owns at most one pending timer and one in-flight
//! request. Starting a new request aborts the previous one; restarting the
//! timer aborts only the timer, so a request that is already out keeps running
//! until the timer actually fires.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};

#[derive(Debug, Default)]
struct Slots {
    timer: Option<AbortHandle>,
    in_flight: Option<AbortHandle>,
    epoch: u64,
}

/// One timer plus one in-flight request
///
/// Must be used from inside a tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct CancellableTask {
    slots: Arc<Mutex<Slots>>,
}

impl CancellableTask {
    /// Empty slot
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `make()` after `delay`, replacing any pending timer
    ///
    /// When the timer fires, its request becomes the in-flight one and the
    /// previous in-flight request is aborted.
    pub fn schedule<F, Fut, T>(&self, delay: Duration, make: F) -> JoinHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let mut slots = self.slots.lock();
        if let Some(timer) = slots.timer.take() {
            timer.abort();
        }
        slots.epoch += 1;
        let epoch = slots.epoch;
        let shared = Arc::clone(&self.slots);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut slots = shared.lock();
                if slots.epoch == epoch {
                    if let Some(previous) = slots.in_flight.take() {
                        previous.abort();
                    }
                    slots.in_flight = slots.timer.take();
                }
            }
            make().await
        });
        slots.timer = Some(handle.abort_handle());
        handle
    }

    /// Start `request` now, aborting both the timer and the in-flight request
    pub fn run_now<Fut, T>(&self, request: Fut) -> JoinHandle<T>
    where
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let mut slots = self.slots.lock();
        Self::abort_all(&mut slots);
        let handle = tokio::spawn(request);
        slots.in_flight = Some(handle.abort_handle());
        handle
    }

    /// Abort everything
    pub fn cancel(&self) {
        Self::abort_all(&mut self.slots.lock());
    }

    /// Whether a timer is waiting to fire
    #[must_use]
    pub fn has_pending_timer(&self) -> bool {
        self.slots.lock().timer.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn abort_all(slots: &mut Slots) {
        for handle in [slots.timer.take(), slots.in_flight.take()].into_iter().flatten() {
            handle.abort();
        }
        slots.epoch += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn rescheduling_cancels_the_earlier_timer() {
        let task = CancellableTask::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let first = {
            let fired = fired.clone();
            task.schedule(Duration::from_millis(300), move || async move {
                fired.fetch_add(1, Ordering::SeqCst);
                1
            })
        };
        tokio::time::advance(Duration::from_millis(100)).await;
        let second = {
            let fired = fired.clone();
            task.schedule(Duration::from_millis(300), move || async move {
                fired.fetch_add(10, Ordering::SeqCst);
                2
            })
        };

        assert_eq!(second.await.unwrap(), 2);
        assert!(first.await.unwrap_err().is_cancelled());
        assert_eq!(fired.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn run_now_aborts_in_flight_request() {
        let task = CancellableTask::new();
        let slow = task.run_now(async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "slow"
        });
        let fast = task.run_now(async { "fast" });

        assert_eq!(fast.await.unwrap(), "fast");
        assert!(slow.await.unwrap_err().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn fired_timer_becomes_the_in_flight_request() {
        let task = CancellableTask::new();
        let fired = task.schedule(Duration::from_millis(10), || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!task.has_pending_timer());

        task.cancel();
        assert!(fired.await.unwrap_err().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_the_timer_leaves_the_request_running() {
        let task = CancellableTask::new();
        let first = task.schedule(Duration::from_millis(10), || async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            "first"
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = task.schedule(Duration::from_millis(300), || async { "second" });
        assert_eq!(first.await.unwrap(), "first");
        assert_eq!(second.await.unwrap(), "second");
    }
}
