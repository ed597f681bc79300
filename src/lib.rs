mod config;
mod downloader;
mod engine;
mod error;
mod item;
mod spider;
mod stats;
mod task;
mod util;

pub mod pipeline;
pub mod producer;
pub mod queue;
pub mod sink;
pub mod spiders;

// (Re) Exports
pub use config::Config;
pub use downloader::{Downloader, Fetcher, Page};
pub use engine::{CrawlWorker, Engine, PoolReport, WorkerFailure, WorkerReport, WorkerState};
pub use error::{CrawlError, Result};
pub use item::{NormalizedItem, RawItem};
pub use pipeline::NormalizationPipeline;
pub use producer::{PathTemplate, TaskProducer};
pub use spider::Spider;
pub use stats::Stats;
pub use task::{Task, TaskKind};

use std::sync::Arc;

use sink::ItemSink;

/// Engine for the site named in `config`, fetching over HTTP.
pub fn engine(config: Config, sink: Arc<dyn ItemSink>) -> Result<Engine> {
    config.sanity_check()?;
    let fetcher = Downloader::new(&config.bot_name, config.fetch_timeout())?;
    engine_with_fetcher(config, Arc::new(fetcher), sink)
}

pub fn engine_with_fetcher(
    config: Config,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn ItemSink>,
) -> Result<Engine> {
    let spider = config.site.spider();
    Engine::new(config, spider, fetcher, sink)
}
