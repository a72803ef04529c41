//! Deadline-driven auto-close scheduling.
//!
//! One background loop owns a min-heap of `(deadline, generation, id)`
//! entries. Each give-away has at most one armed entry; arming again or
//! cancelling tombstones the previous one, and tombstoned entries are
//! skipped when they surface.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Notify;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Entry {
    deadline: DateTime<Utc>,
    generation: u64,
    id: String,
}

/// Min-heap of pending closes plus the index of live (non-tombstoned) entries.
#[derive(Default)]
struct Queue {
    heap: BinaryHeap<Reverse<Entry>>,
    armed: HashMap<String, u64>,
}

/// Schedules exactly one close callback per armed give-away.
#[derive(Default)]
pub struct CloseScheduler {
    queue: Mutex<Queue>,
    next_generation: AtomicU64,
    wake: Notify,
}

impl CloseScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) the close of `id` at `deadline`.
    pub fn schedule(&self, id: &str, deadline: DateTime<Utc>) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        {
            let mut queue = self.queue.lock();
            queue.armed.insert(id.to_string(), generation);
            queue.heap.push(Reverse(Entry {
                deadline,
                generation,
                id: id.to_string(),
            }));
        }
        debug!(giveaway = %id, %deadline, "Close scheduled");
        self.wake.notify_one();
    }

    /// Disarm the pending close of `id`. Returns false if nothing was armed.
    pub fn cancel(&self, id: &str) -> bool {
        let removed = self.queue.lock().armed.remove(id).is_some();
        if removed {
            debug!(giveaway = %id, "Close cancelled");
        }
        removed
    }

    pub fn is_armed(&self, id: &str) -> bool {
        self.queue.lock().armed.contains_key(id)
    }

    /// Number of armed closes.
    pub fn pending(&self) -> usize {
        self.queue.lock().armed.len()
    }

    /// Pop every armed entry whose deadline is at or before `now`.
    ///
    /// Each returned ID is disarmed, so it is yielded at most once.
    pub fn pop_due(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut queue = self.queue.lock();
        let mut due = Vec::new();

        while let Some(Reverse(top)) = queue.heap.peek() {
            if top.deadline > now {
                break;
            }
            let Some(Reverse(entry)) = queue.heap.pop() else {
                break;
            };
            if queue.armed.get(&entry.id) == Some(&entry.generation) {
                queue.armed.remove(&entry.id);
                due.push(entry.id);
            }
        }
        due
    }

    /// Earliest deadline still in the heap (may belong to a tombstone).
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.queue.lock().heap.peek().map(|Reverse(e)| e.deadline)
    }

    /// Run the scheduling loop forever, spawning `on_due(id)` for each close.
    pub async fn run<F, Fut>(self: Arc<Self>, on_due: F)
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        info!("Close scheduler started");
        loop {
            for id in self.pop_due(Utc::now()) {
                debug!(giveaway = %id, "Deadline reached");
                tokio::spawn(on_due(id));
            }

            match self.next_deadline() {
                Some(deadline) => {
                    let wait = (deadline - Utc::now()).to_std().unwrap_or_default();
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {}
                        _ = self.wake.notified() => {}
                    }
                }
                None => self.wake.notified().await,
            }
        }
    }
}
