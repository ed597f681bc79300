use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::time::Instant;

use super::QueueStore;
use crate::error::Result;
use crate::task::Task;

/// Smallest wait handed to BLPOP. A zero timeout would block forever.
const MIN_BLOCK_SECS: f64 = 0.01;

/// Queue store backed by a redis list: RPUSH at the tail, BLPOP at the head.
///
/// Every instance owns its own connection. Create one per worker so that
/// blocking pops don't queue up behind each other.
///
/// Needs redis 6.0 or later: BLPOP is sent fractional timeouts, which older
/// servers reject.
pub struct RedisQueue {
    conn: MultiplexedConnection,
    key: String,
}

impl RedisQueue {
    pub async fn connect(redis_url: &str, key: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        log::debug!("[queue] connected to {} (list {})", redis_url, key);
        Ok(Self { conn, key: key.to_owned() })
    }

}

/// Decodes a popped list entry. Malformed entries are logged and skipped.
fn decode_entry(payload: &str) -> Option<Task> {
    match Task::decode(payload) {
        Ok(task) => Some(task),
        Err(e) => {
            log::warn!("[queue] skipping malformed entry {:?}: {}", payload, e);
            None
        }
    }
}

#[async_trait]
impl QueueStore for RedisQueue {
    async fn push(&self, tasks: Vec<Task>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }
        let payloads = tasks
            .iter()
            .map(Task::encode)
            .collect::<Result<Vec<_>>>()?;
        let mut conn = self.conn.clone();
        conn.rpush::<_, _, ()>(&self.key, payloads).await?;
        Ok(())
    }

    async fn blocking_pop(&self, timeout: Duration) -> Result<Option<Task>> {
        let deadline = Instant::now() + timeout;
        let mut conn = self.conn.clone();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let wait = remaining.as_secs_f64().max(MIN_BLOCK_SECS);
            let popped: Option<(String, String)> = redis::cmd("BLPOP")
                .arg(&self.key)
                .arg(wait)
                .query_async(&mut conn)
                .await?;

            let Some((_, payload)) = popped else {
                return Ok(None);
            };
            if let Some(task) = decode_entry(&payload) {
                return Ok(Some(task));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
        }
    }
}
