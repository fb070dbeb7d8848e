//! A priority-ordered admission gate over a bounded concurrency budget.
//!
//! Spec.md §4.8 describes two OS-level thread pools; the idiomatic async
//! translation (SPEC_FULL.md §5, Design Notes' "coroutine translation"
//! rule) is a `tokio::sync::Semaphore` bounding concurrent work plus a
//! small priority queue deciding *which* waiting task claims the next free
//! permit. Higher integer priority runs first; ties are FIFO by submission
//! order, matching spec.md §4.8's "priority-ordered FIFO within a kind".

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use tokio::sync::{oneshot, Notify, OwnedSemaphorePermit, Semaphore};

struct QueueEntry {
    priority: i32,
    seq: u64,
    tx: oneshot::Sender<OwnedSemaphorePermit>,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}
impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: higher priority first, and among equal
        // priorities the *lower* sequence number (submitted earlier) should
        // come out first, so it sorts "greater".
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// One admission-controlled pool (the scheduler owns one CPU pool and one
/// I/O pool).
pub struct Pool {
    pub name: &'static str,
    semaphore: Arc<Semaphore>,
    queue: Arc<parking_lot::Mutex<BinaryHeap<QueueEntry>>>,
    notify: Arc<Notify>,
    next_seq: AtomicU64,
    original_size: usize,
}

impl Pool {
    #[must_use]
    pub fn new(name: &'static str, size: usize) -> Arc<Self> {
        let size = size.max(1);
        let pool = Arc::new(Self {
            name,
            semaphore: Arc::new(Semaphore::new(size)),
            queue: Arc::new(parking_lot::Mutex::new(BinaryHeap::new())),
            notify: Arc::new(Notify::new()),
            next_seq: AtomicU64::new(0),
            original_size: size,
        });
        pool.clone().spawn_dispatcher();
        pool
    }

    /// Number of permits currently available (for diagnostics/tests).
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// The pool's size at construction, before any [`Self::shrink_by`] call.
    #[must_use]
    pub fn original_size(&self) -> usize {
        self.original_size
    }

    /// Fraction of the pool's original capacity currently claimed by
    /// in-flight or queued work, `[0.0, 1.0]`.
    #[must_use]
    pub fn saturation(&self) -> f64 {
        let in_use = self.original_size.saturating_sub(self.available_permits());
        in_use as f64 / self.original_size as f64
    }

    /// Reduce the effective pool size by forgetting permits, used under
    /// `high` CPU load per spec.md §4.8's decision table ("halve pool
    /// size"). Irreversible for the monitor's lifetime, matching a
    /// lightweight backpressure signal rather than a reconfigurable pool.
    pub fn shrink_by(&self, permits: usize) {
        self.semaphore.forget_permits(permits);
    }

    /// Enqueue a request for admission at `priority`, returning the permit
    /// once granted. FIFO among equal priorities.
    pub async fn acquire(&self, priority: i32) -> OwnedSemaphorePermit {
        let (tx, rx) = oneshot::channel();
        let seq = self.next_seq.fetch_add(1, AtomicOrdering::Relaxed);
        self.queue.lock().push(QueueEntry { priority, seq, tx });
        self.notify.notify_one();
        rx.await.expect("pool dispatcher dropped without granting a permit")
    }

    fn spawn_dispatcher(self: Arc<Self>) {
        tokio::spawn(async move {
            loop {
                let entry = loop {
                    if let Some(entry) = self.queue.lock().pop() {
                        break entry;
                    }
                    self.notify.notified().await;
                };
                let Ok(permit) = self.semaphore.clone().acquire_owned().await else {
                    break;
                };
                // A dropped receiver (caller gave up) just drops the permit
                // back to the semaphore immediately.
                let _ = entry.tx.send(permit);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn saturation_reflects_held_permits() {
        let pool = Pool::new("test", 4);
        assert!((pool.saturation() - 0.0).abs() < f64::EPSILON);
        let held = pool.acquire(0).await;
        let _held2 = pool.acquire(0).await;
        assert!((pool.saturation() - 0.5).abs() < f64::EPSILON);
        drop(held);
    }

    #[tokio::test]
    async fn higher_priority_is_admitted_first() {
        let pool = Pool::new("test", 1);
        // Hold the only permit so both requests queue up.
        let held = pool.acquire(0).await;

        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let pool_a = Arc::clone(&pool);
        let order_a = Arc::clone(&order);
        let low = tokio::spawn(async move {
            let _permit = pool_a.acquire(1).await;
            order_a.lock().push("low");
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        let pool_b = Arc::clone(&pool);
        let order_b = Arc::clone(&order);
        let high = tokio::spawn(async move {
            let _permit = pool_b.acquire(10).await;
            order_b.lock().push("high");
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(held);
        let _ = tokio::join!(low, high);
        assert_eq!(*order.lock(), vec!["high", "low"]);
    }
}
