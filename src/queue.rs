//! Rate-limited FIFO request queue.
//!
//! One queue is shared by every adapter; adapters that need stricter
//! politeness wrap their own fetches in a second queue, so both limits
//! apply to those requests.

use crate::config::QueueConfig;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, Semaphore};

/// FIFO queue that bounds concurrency and start rate of its tasks.
pub struct RequestQueue {
    /// Held while a task waits for admission; tokio's mutex is fair, so
    /// tasks are admitted in submission order.
    admission: Mutex<()>,
    slots: Semaphore,
    limiter: DefaultDirectRateLimiter,
    pending: AtomicUsize,
}

impl RequestQueue {
    /// Creates a queue admitting `interval_cap` tasks per interval.
    pub fn new(config: &QueueConfig) -> Self {
        let cap = NonZeroU32::new(config.interval_cap).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(config.interval() / cap.get())
            .map(|quota| quota.allow_burst(cap))
            .unwrap_or_else(|| Quota::per_second(cap));

        Self {
            admission: Mutex::new(()),
            slots: Semaphore::new(config.concurrency.max(1)),
            limiter: RateLimiter::direct(quota),
            pending: AtomicUsize::new(0),
        }
    }

    /// Creates a one-at-a-time queue admitting `per_second` tasks per second.
    pub fn per_second(per_second: u32) -> Self {
        Self::new(&QueueConfig::per_second(per_second))
    }

    /// Number of tasks submitted but not yet finished.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Runs `task` once the queue admits it and returns its output.
    ///
    /// Dropping the returned future releases its place in the queue.
    pub async fn run<F, T>(&self, task: F) -> T
    where
        F: Future<Output = T>,
    {
        let _pending = PendingGuard::new(&self.pending);

        let _permit = {
            let _turn = self.admission.lock().await;
            let permit = self.slots.acquire().await.ok();
            self.limiter.until_ready().await;
            permit
        };

        tracing::trace!(pending = self.pending(), "Queue task admitted");
        task.await
    }
}

/// Counts a task as pending until it finishes or is dropped.
struct PendingGuard<'a>(&'a AtomicUsize);

impl<'a> PendingGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
