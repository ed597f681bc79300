use std::io::Write;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::error::{CrawlError, Result};
use crate::item::NormalizedItem;

/// Downstream storage for extracted records. Called once per item.
#[async_trait]
pub trait ItemSink: Send + Sync {
    async fn emit(&self, item: NormalizedItem) -> Result<()>;
}

/// Writes one JSON object per line, flushed after every record.
///
/// Writes block the calling worker. Records are small and written one at a
/// time, so stdout or a local file keeps up with the crawl.
pub struct JsonLinesSink<W: Write + Send> {
    out: parking_lot::Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: parking_lot::Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

#[async_trait]
impl<W: Write + Send> ItemSink for JsonLinesSink<W> {
    async fn emit(&self, item: NormalizedItem) -> Result<()> {
        let line = serde_json::to_string(&item)?;
        let mut out = self.out.lock();
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }
}

/// Appends serialized items to a redis list.
pub struct RedisSink {
    conn: MultiplexedConnection,
    key: String,
}

impl RedisSink {
    pub async fn connect(redis_url: &str, key: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self { conn, key: key.to_owned() })
    }
}

#[async_trait]
impl ItemSink for RedisSink {
    async fn emit(&self, item: NormalizedItem) -> Result<()> {
        let payload = serde_json::to_string(&item)?;
        let mut conn = self.conn.clone();
        conn.rpush::<_, _, ()>(&self.key, payload)
            .await
            .map_err(|e| CrawlError::Sink(e.to_string()))
    }
}
