use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

use super::QueueStore;
use crate::error::Result;
use crate::task::Task;

/// In-process queue store.
///
/// Shares the semantics of the redis store within a single process: useful
/// for tests and single machine runs.
pub struct MemoryQueue {
    tasks: Mutex<VecDeque<Task>>,
    notify: Notify,
    pushed: AtomicU64,
    popped: AtomicU64,
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            pushed: AtomicU64::new(0),
            popped: AtomicU64::new(0),
        }
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let queue = Self::new();
        queue.pushed.store(tasks.len() as u64, Ordering::SeqCst);
        *queue.tasks.lock() = tasks.into();
        queue
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of tasks ever pushed.
    pub fn total_pushed(&self) -> u64 {
        self.pushed.load(Ordering::SeqCst)
    }

    /// Total number of tasks ever popped.
    pub fn total_popped(&self) -> u64 {
        self.popped.load(Ordering::SeqCst)
    }

    fn try_pop(&self) -> Option<Task> {
        let task = self.tasks.lock().pop_front();
        if task.is_some() {
            self.popped.fetch_add(1, Ordering::SeqCst);
        }
        task
    }
}

#[async_trait]
impl QueueStore for MemoryQueue {
    async fn push(&self, tasks: Vec<Task>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }
        {
            let mut queue = self.tasks.lock();
            self.pushed.fetch_add(tasks.len() as u64, Ordering::SeqCst);
            queue.extend(tasks);
        }
        self.notify.notify_waiters();
        Ok(())
    }

    async fn blocking_pop(&self, timeout: Duration) -> Result<Option<Task>> {
        let deadline = Instant::now() + timeout;
        loop {
            // Register interest before looking at the queue so a push landing
            // in between still wakes us up.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(task) = self.try_pop() {
                return Ok(Some(task));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(self.try_pop());
            }
        }
    }
}
