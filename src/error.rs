use thiserror::Error;

pub type Result<T> = std::result::Result<T, CrawlError>;

#[derive(Debug, Error)]
pub enum CrawlError {
    /// Seed injector was asked for a range whose first page comes after the
    /// last one.
    #[error("invalid page range: first page {first} is after last page {last}")]
    InvalidRange { first: u32, last: u32 },

    #[error("invalid path template {template:?}: {reason}")]
    InvalidTemplate { template: String, reason: &'static str },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The shared work queue could not be reached.
    #[error("queue store unavailable: {0}")]
    Queue(#[from] redis::RedisError),

    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("failed to emit item: {0}")]
    Sink(String),

    /// A worker task ended without returning, e.g. after repeated panics.
    #[error("worker stopped abnormally: {0}")]
    Worker(String),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
