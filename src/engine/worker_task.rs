use std::sync::Arc;

use scraper::Html;
use tokio::time::Instant;

use crate::error::Result;
use crate::queue::QueueStore;
use crate::task::{Task, TaskKind};
use crate::util;

use super::EngineState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Running,
    /// The last poll came back empty; counting idle time.
    IdleWaiting,
    Terminated,
}

/// Per worker counters, returned when the worker terminates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker_id: u32,
    /// Tasks popped from the queue.
    pub popped: u64,
    /// Tasks dropped because their page couldn't be fetched.
    pub dropped: u64,
    /// Detail tasks pushed back to the queue.
    pub enqueued: u64,
    pub emitted: u64,
}

/// The crawl loop of a single worker.
///
/// Pops tasks until the queue has been silent for `max_idle_time`. Listing
/// pages feed detail tasks back to the queue, detail pages produce items for
/// the sink. The idle exit is a local guess at global exhaustion: a worker
/// may leave while another one is still about to push work.
pub struct CrawlWorker {
    worker_id: u32,
    state: Arc<EngineState>,
    queue: Arc<dyn QueueStore>,
    status: WorkerState,
    idle_since: Option<Instant>,
    last_fetch: Option<Instant>,
    report: WorkerReport,
}

impl CrawlWorker {
    pub(crate) fn new(worker_id: u32, state: Arc<EngineState>, queue: Arc<dyn QueueStore>) -> Self {
        Self {
            worker_id,
            state,
            queue,
            status: WorkerState::Running,
            idle_since: None,
            last_fetch: None,
            report: WorkerReport {
                worker_id,
                ..WorkerReport::default()
            },
        }
    }

    pub fn status(&self) -> WorkerState {
        self.status
    }

    /// Runs until the worker terminates.
    ///
    /// Only queue and sink failures end the loop with an error; fetch
    /// failures and extraction misses are absorbed.
    pub async fn run(mut self) -> Result<WorkerReport> {
        log::debug!("[worker-{}] start", self.worker_id);
        while self.status != WorkerState::Terminated {
            if let Err(e) = self.step().await {
                log::error!("[worker-{}] giving up: {}", self.worker_id, e);
                return Err(e);
            }
        }
        log::info!(
            "[worker-{}] queue idle for {:?}, exiting after {} tasks",
            self.worker_id,
            self.state.config.max_idle_time(),
            self.report.popped,
        );
        Ok(self.report)
    }

    /// One poll of the queue and the handling of whatever it returned.
    pub async fn step(&mut self) -> Result<WorkerState> {
        let config = self.state.config.clone();
        let poll_started = Instant::now();

        match self.queue.blocking_pop(config.idle_timeout()).await? {
            Some(task) => {
                self.status = WorkerState::Running;
                self.idle_since = None;
                self.report.popped += 1;
                self.process(task).await?;
            }
            None => {
                let idle_since = *self.idle_since.get_or_insert(poll_started);
                let idle = idle_since.elapsed();
                self.status = if idle >= config.max_idle_time() {
                    WorkerState::Terminated
                } else {
                    log::trace!("[worker-{}] idle for {:?}", self.worker_id, idle);
                    WorkerState::IdleWaiting
                };
            }
        }
        Ok(self.status)
    }

    async fn process(&mut self, task: Task) -> Result<()> {
        log::info!("[worker-{}] {:?} {}", self.worker_id, task.kind, &task.url);

        self.wait_download_delay().await;
        let page = match self.state.fetcher.get(&task.url).await {
            Ok(page) => page,
            Err(e) => {
                // Best effort crawl: the task is gone.
                log::warn!("[worker-{}] dropping task: {}", self.worker_id, e);
                self.state.stats.incr_total_dropped();
                self.report.dropped += 1;
                return Ok(());
            }
        };
        self.state.stats.incr_total_crawled();

        match task.kind {
            TaskKind::Listing => {
                let links = {
                    let document = Html::parse_document(&page.body);
                    self.state.spider.extract_listing(&document)
                };
                let urls = util::normalize_urls(&page.url, links);

                let mut tasks = Vec::with_capacity(urls.len());
                for url in urls {
                    if self.state.guard_robot.is_allowed(&url).await {
                        tasks.push(Task::detail(url));
                    }
                }
                if tasks.is_empty() {
                    log::debug!("[worker-{}] no follow links on {}", self.worker_id, page.url);
                    return Ok(());
                }

                let count = tasks.len() as u64;
                self.queue.push(tasks).await?;
                self.state.stats.add_total_enqueued(count);
                self.report.enqueued += count;
            }
            TaskKind::Detail => {
                let raw = {
                    let document = Html::parse_document(&page.body);
                    self.state.spider.extract_detail(&document)
                };
                let Some(raw) = raw else {
                    log::debug!("[worker-{}] nothing to extract on {}", self.worker_id, page.url);
                    return Ok(());
                };

                let item = self.state.pipeline.normalize(raw);
                self.state.sink.emit(item).await?;
                self.state.stats.incr_total_emitted();
                self.report.emitted += 1;
            }
        }
        Ok(())
    }

    async fn wait_download_delay(&mut self) {
        let delay = self.state.config.download_delay();
        if !delay.is_zero() {
            if let Some(last_fetch) = self.last_fetch {
                tokio::time::sleep_until(last_fetch + delay).await;
            }
        }
        self.last_fetch = Some(Instant::now());
    }
}
