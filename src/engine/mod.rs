use std::sync::Arc;

use tokio::sync::broadcast;

mod guard_robot;
mod reporting_task;
mod worker_pool;
mod worker_task;

use crate::downloader::Fetcher;
use crate::error::{CrawlError, Result};
use crate::pipeline::NormalizationPipeline;
use crate::queue::QueueStore;
use crate::sink::ItemSink;
use crate::spider::Spider;
use crate::stats::Stats;
use crate::Config;

use guard_robot::GuardRobot;
use reporting_task::start_reporting_thread;
use worker_pool::WorkerPool;

pub use worker_pool::{PoolReport, WorkerFailure};
pub use worker_task::{CrawlWorker, WorkerReport, WorkerState};

/// Everything a worker needs besides its queue connection.
///
/// Read-only after construction, so it's shared between workers without
/// locking. The counters in `stats` are atomics.
pub(crate) struct EngineState {
    config: Arc<Config>,
    spider: Arc<dyn Spider + Send + Sync>,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn ItemSink>,
    pipeline: NormalizationPipeline,
    guard_robot: GuardRobot,
    stats: Arc<Stats>,
}

pub struct Engine {
    config: Config,
    spider: Arc<dyn Spider + Send + Sync>,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn ItemSink>,
    pipeline: NormalizationPipeline,
    stats: Arc<Stats>,
}

impl Engine {
    pub fn new(
        config: Config,
        spider: Arc<dyn Spider + Send + Sync>,
        fetcher: Arc<dyn Fetcher>,
        sink: Arc<dyn ItemSink>,
    ) -> Result<Self> {
        config.sanity_check()?;
        Ok(Self {
            config,
            spider,
            fetcher,
            sink,
            pipeline: NormalizationPipeline::default(),
            stats: Arc::new(Stats::new()),
        })
    }

    /// Replaces the default normalization pipeline.
    pub fn with_pipeline(mut self, pipeline: NormalizationPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Counters updated by the workers while the engine runs.
    pub fn stats(&self) -> Arc<Stats> {
        self.stats.clone()
    }

    fn into_state(self) -> Arc<EngineState> {
        let config = Arc::new(self.config);
        Arc::new(EngineState {
            config: config.clone(),
            spider: self.spider,
            fetcher: self.fetcher.clone(),
            sink: self.sink,
            pipeline: self.pipeline,
            guard_robot: GuardRobot::new(config, self.fetcher),
            stats: self.stats,
        })
    }

    /// Builds a standalone worker bound to `queue`.
    pub fn worker(self, worker_id: u32, queue: Arc<dyn QueueStore>) -> CrawlWorker {
        CrawlWorker::new(worker_id, self.into_state(), queue)
    }

    /// Runs one worker per queue connection until every worker has
    /// terminated.
    ///
    /// Workers stop on their own once the queue has been silent for
    /// `max_idle_time`; there's no other stop signal.
    pub async fn run(self, queues: Vec<Arc<dyn QueueStore>>) -> Result<PoolReport> {
        if queues.is_empty() {
            return Err(CrawlError::InvalidConfig(
                "engine needs at least one queue connection".to_owned(),
            ));
        }
        let state = self.into_state();
        log::info!(
            "[engine] starting {} workers with spider {}",
            queues.len(),
            state.spider.name()
        );

        let (stop_tx, _) = broadcast::channel::<()>(1);
        let reporting = start_reporting_thread(state.clone(), stop_tx.clone());

        let report = WorkerPool::new(state.clone(), queues).run().await;

        let _ = stop_tx.send(());
        if let Err(e) = reporting.await {
            log::error!("[engine] reporting task failed: {}", e);
        }

        log::info!(
            "[engine] done: {} pages crawled, {} dropped, {} items emitted",
            state.stats.total_crawled(),
            state.stats.total_dropped(),
            state.stats.total_emitted(),
        );
        Ok(report)
    }
}
