use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::task::Task;

pub mod memory;
pub mod redis_store;

/// Shared FIFO of pending tasks.
///
/// A popped task is removed from the store for good; what happens to it next
/// is the popping worker's business. Errors mean the store itself is
/// unreachable and are fatal to the caller.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Appends tasks to the tail, keeping their relative order.
    async fn push(&self, tasks: Vec<Task>) -> Result<()>;

    /// Waits up to `timeout` for a task. Returns `None` if nothing arrived.
    async fn blocking_pop(&self, timeout: Duration) -> Result<Option<Task>>;
}
