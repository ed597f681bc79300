use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use propcrawl::pipeline::{Field, NormalizationPipeline, Stage, Value};
use propcrawl::queue::memory::MemoryQueue;
use propcrawl::queue::QueueStore;
use propcrawl::sink::ItemSink;
use propcrawl::{
    Config, CrawlError, Fetcher, NormalizedItem, Page, PathTemplate, Task, TaskProducer,
    WorkerState,
};
use tokio::time::Instant;

const DETAIL: &str = include_str!("fixtures/detail.html");
const DETAIL_NO_PRICE: &str = include_str!("fixtures/detail_no_price.html");
const LISTING_EMPTY: &str = include_str!("fixtures/listing_empty.html");
const NOT_FOUND: &str = include_str!("fixtures/not_found.html");

/// Serves pages from memory. Unknown urls fail like a 404 would.
#[derive(Default)]
struct FixtureFetcher {
    pages: HashMap<String, String>,
    panic_once_on: Option<String>,
    panicked: AtomicBool,
}

impl FixtureFetcher {
    fn page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }
}

#[async_trait]
impl Fetcher for FixtureFetcher {
    async fn get(&self, url: &str) -> propcrawl::Result<Page> {
        if self.panic_once_on.as_deref() == Some(url) && !self.panicked.swap(true, Ordering::SeqCst) {
            panic!("fixture fetcher blew up on {url}");
        }
        match self.pages.get(url) {
            Some(body) => Ok(Page {
                url: url.to_owned(),
                body: body.clone(),
            }),
            None => Err(CrawlError::Fetch {
                url: url.to_owned(),
                reason: "status 404 Not Found".to_owned(),
            }),
        }
    }
}

#[derive(Default)]
struct CollectSink {
    items: Mutex<Vec<NormalizedItem>>,
}

#[async_trait]
impl ItemSink for CollectSink {
    async fn emit(&self, item: NormalizedItem) -> propcrawl::Result<()> {
        self.items.lock().push(item);
        Ok(())
    }
}

/// A store whose backend is gone.
struct UnreachableQueue;

#[async_trait]
impl QueueStore for UnreachableQueue {
    async fn push(&self, _tasks: Vec<Task>) -> propcrawl::Result<()> {
        Err(unreachable_error())
    }

    async fn blocking_pop(&self, _timeout: Duration) -> propcrawl::Result<Option<Task>> {
        Err(unreachable_error())
    }
}

fn unreachable_error() -> CrawlError {
    redis::RedisError::from((redis::ErrorKind::IoError, "connection refused")).into()
}

fn template() -> PathTemplate {
    PathTemplate::new("https://mogi.vn/{type}?cp={page}")
        .unwrap()
        .with_property_type("mua-nha-dat")
}

fn listing_page(page: u32, links: &[String]) -> String {
    let cards: String = links
        .iter()
        .map(|href| {
            format!(r#"<li><div class="prop-info"><a class="link-overlay" href="{href}"></a></div></li>"#)
        })
        .collect();
    format!(r#"<html><body><h1>Trang {page}</h1><ul class="props">{cards}</ul></body></html>"#)
}

/// Listing pages `1..=pages`, each linking to two detail pages.
fn catalog(pages: u32) -> FixtureFetcher {
    let mut fetcher = FixtureFetcher::default();
    for page in 1..=pages {
        let links: Vec<String> = (1..=2).map(|n| format!("/nha-dat-id{page}0{n}")).collect();
        fetcher = fetcher.page(template().page_url(page), listing_page(page, &links));
        for link in links {
            fetcher = fetcher.page(format!("https://mogi.vn{link}"), DETAIL);
        }
    }
    fetcher
}

fn config() -> Config {
    Config {
        worker_count: 1,
        idle_timeout_secs: 1.0,
        max_idle_time_secs: 7.0,
        robotstxt_obey: false,
        ..Config::default()
    }
}

async fn seeded_queue(first: u32, last: u32) -> Arc<MemoryQueue> {
    let queue = Arc::new(MemoryQueue::new());
    TaskProducer::new(queue.clone())
        .enqueue_range(&template(), first, last)
        .await
        .unwrap();
    queue
}

#[tokio::test(start_paused = true)]
async fn three_listing_pages_yield_six_items() {
    let queue = seeded_queue(1, 3).await;
    let sink = Arc::new(CollectSink::default());
    let engine = propcrawl::engine_with_fetcher(config(), Arc::new(catalog(3)), sink.clone()).unwrap();
    let stats = engine.stats();

    let start = Instant::now();
    let report = engine.run(vec![queue.clone() as Arc<dyn QueueStore>]).await.unwrap();
    let elapsed = start.elapsed();

    let items = sink.items.lock();
    assert_eq!(items.len(), 6);
    assert!(items.iter().all(|item| item.price.as_deref() == Some("35 tỷ 500 triệu")));
    assert!(items.iter().all(|item| item.content.lines().count() == 3));

    assert!(queue.is_empty());
    assert_eq!(queue.total_pushed(), 9);
    assert_eq!(queue.total_popped(), queue.total_pushed());

    assert!(report.failed.is_empty());
    assert_eq!(report.finished.len(), 1);
    let worker = &report.finished[0];
    assert_eq!((worker.popped, worker.enqueued, worker.emitted, worker.dropped), (9, 6, 6, 0));
    assert_eq!(stats.total_crawled(), 9);
    assert_eq!(stats.total_emitted(), 6);

    // Fetching takes no time here, so the run is just the idle budget.
    let max_idle = Duration::from_secs(7);
    assert!(elapsed >= max_idle, "left after {elapsed:?}");
    assert!(elapsed <= max_idle + Duration::from_secs(1), "left after {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn idle_worker_terminates_without_error() {
    let queue: Arc<dyn QueueStore> = Arc::new(MemoryQueue::new());
    let engine = propcrawl::engine_with_fetcher(
        config(),
        Arc::new(FixtureFetcher::default()),
        Arc::new(CollectSink::default()),
    )
    .unwrap();
    let mut worker = engine.worker(1, queue);
    assert_eq!(worker.status(), WorkerState::Running);

    let start = Instant::now();
    let mut polls = 0;
    loop {
        let state = worker.step().await.unwrap();
        polls += 1;
        if state == WorkerState::Terminated {
            break;
        }
        assert_eq!(state, WorkerState::IdleWaiting);
    }
    assert_eq!(polls, 7);
    assert!(start.elapsed() >= Duration::from_secs(7));
}

#[tokio::test(start_paused = true)]
async fn work_arriving_resets_the_idle_clock() {
    let queue = Arc::new(MemoryQueue::new());
    let sink = Arc::new(CollectSink::default());
    let fetcher = FixtureFetcher::default().page("https://mogi.vn/late-id1", DETAIL);
    let engine = propcrawl::engine_with_fetcher(config(), Arc::new(fetcher), sink.clone()).unwrap();

    let late = queue.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        late.push(vec![Task::detail("https://mogi.vn/late-id1")]).await.unwrap();
    });

    let start = Instant::now();
    let report = engine.run(vec![queue.clone() as Arc<dyn QueueStore>]).await.unwrap();

    assert_eq!(report.total_emitted(), 1);
    assert_eq!(sink.items.lock().len(), 1);
    assert!(start.elapsed() >= Duration::from_secs(12));
}

#[tokio::test(start_paused = true)]
async fn download_delay_spaces_out_fetches() {
    let urls = ["https://mogi.vn/a-id1", "https://mogi.vn/b-id2", "https://mogi.vn/c-id3"];
    let queue = Arc::new(MemoryQueue::with_tasks(urls.iter().map(|u| Task::detail(*u)).collect()));
    let fetcher = urls.iter().fold(FixtureFetcher::default(), |f, u| f.page(*u, DETAIL));
    let config = Config { download_delay: 2.0, ..config() };
    let sink = Arc::new(CollectSink::default());
    let engine = propcrawl::engine_with_fetcher(config, Arc::new(fetcher), sink.clone()).unwrap();

    let start = Instant::now();
    let report = engine.run(vec![queue.clone() as Arc<dyn QueueStore>]).await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(report.total_emitted(), 3);
    // Fetches at 0s, 2s and 4s, then the 7s idle budget.
    assert!(elapsed >= Duration::from_secs(11), "left after {elapsed:?}");
    assert!(elapsed <= Duration::from_secs(12), "left after {elapsed:?}");
}

/// Tags every present title with the site it came from.
struct SiteTag;

impl Stage for SiteTag {
    fn name(&self) -> &'static str {
        "site-tag"
    }

    fn apply(&self, field: Field, value: Value) -> Value {
        match (field, value) {
            (Field::Title, Value::Text(title)) => Value::Text(format!("[mogi] {title}")),
            (_, value) => value,
        }
    }
}

#[tokio::test(start_paused = true)]
async fn custom_pipeline_shapes_emitted_items() {
    let queue = seeded_queue(1, 1).await;
    let sink = Arc::new(CollectSink::default());
    let pipeline = NormalizationPipeline::default().with_stage(SiteTag);
    let engine = propcrawl::engine_with_fetcher(config(), Arc::new(catalog(1)), sink.clone())
        .unwrap()
        .with_pipeline(pipeline);

    engine.run(vec![queue as Arc<dyn QueueStore>]).await.unwrap();

    let items = sink.items.lock();
    assert_eq!(items.len(), 2);
    for item in items.iter() {
        assert_eq!(item.title.as_deref(), Some("[mogi] Nhà mặt tiền Nguyễn Huệ, Quận 1"));
        assert_eq!(item.content.lines().count(), 3);
    }
}

#[tokio::test(start_paused = true)]
async fn failed_fetches_and_empty_pages_are_not_errors() {
    let queue = Arc::new(MemoryQueue::with_tasks(vec![
        Task::listing("https://mogi.vn/mua-nha-dat?cp=99"),
        Task::listing("https://mogi.vn/mua-nha-dat?cp=100"),
        Task::detail("https://mogi.vn/gone-id1"),
        Task::detail("https://mogi.vn/not-a-property"),
        Task::detail("https://mogi.vn/no-price-id2"),
    ]));
    let fetcher = FixtureFetcher::default()
        .page("https://mogi.vn/mua-nha-dat?cp=99", LISTING_EMPTY)
        .page("https://mogi.vn/not-a-property", NOT_FOUND)
        .page("https://mogi.vn/no-price-id2", DETAIL_NO_PRICE);
    let sink = Arc::new(CollectSink::default());
    let engine = propcrawl::engine_with_fetcher(config(), Arc::new(fetcher), sink.clone()).unwrap();

    let report = engine.run(vec![queue.clone() as Arc<dyn QueueStore>]).await.unwrap();

    assert!(report.failed.is_empty());
    let worker = &report.finished[0];
    assert_eq!(worker.popped, 5);
    assert_eq!(worker.dropped, 2);
    assert_eq!(worker.enqueued, 0);

    let items = sink.items.lock();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].price, None);
    assert_eq!(items[0].title.as_deref(), Some("Căn hộ Võ Văn Tần"));
    assert_eq!(items[0].content, "Căn hộ mới bàn giao.");
}

#[tokio::test(start_paused = true)]
async fn workers_share_one_queue() {
    let queue = seeded_queue(1, 10).await;
    let sink = Arc::new(CollectSink::default());
    let config = Config { worker_count: 4, ..config() };
    let engine = propcrawl::engine_with_fetcher(config, Arc::new(catalog(10)), sink.clone()).unwrap();

    let queues: Vec<Arc<dyn QueueStore>> = (0..4).map(|_| queue.clone() as Arc<dyn QueueStore>).collect();
    let report = engine.run(queues).await.unwrap();

    assert_eq!(report.finished.len(), 4);
    assert_eq!(report.total_emitted(), 20);
    assert_eq!(sink.items.lock().len(), 20);
    assert_eq!(report.finished.iter().map(|r| r.popped).sum::<u64>(), 30);
    assert_eq!(queue.total_popped(), queue.total_pushed());
}

#[tokio::test(start_paused = true)]
async fn robots_disallowed_links_are_not_followed() {
    let queue = Arc::new(MemoryQueue::with_tasks(vec![Task::listing(template().page_url(1))]));
    let links = vec!["/nha-dat-id1".to_owned(), "/private/nha-dat-id2".to_owned()];
    let fetcher = FixtureFetcher::default()
        .page("https://mogi.vn/robots.txt", "User-agent: *\nDisallow: /private/\n")
        .page(template().page_url(1), listing_page(1, &links))
        .page("https://mogi.vn/nha-dat-id1", DETAIL)
        .page("https://mogi.vn/private/nha-dat-id2", DETAIL);
    let config = Config { robotstxt_obey: true, ..config() };
    let sink = Arc::new(CollectSink::default());
    let engine = propcrawl::engine_with_fetcher(config, Arc::new(fetcher), sink.clone()).unwrap();

    let report = engine.run(vec![queue.clone() as Arc<dyn QueueStore>]).await.unwrap();

    assert_eq!(report.finished[0].enqueued, 1);
    assert_eq!(sink.items.lock().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn unreachable_queue_is_fatal_to_the_worker() {
    let engine = propcrawl::engine_with_fetcher(
        config(),
        Arc::new(FixtureFetcher::default()),
        Arc::new(CollectSink::default()),
    )
    .unwrap();

    let report = engine.run(vec![Arc::new(UnreachableQueue) as Arc<dyn QueueStore>]).await.unwrap();

    assert!(report.finished.is_empty());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].worker_id, 1);
    assert!(matches!(report.failed[0].error, CrawlError::Queue(_)));
}

#[tokio::test(start_paused = true)]
async fn panicked_worker_is_restarted() {
    let queue = seeded_queue(1, 2).await;
    let mut fetcher = catalog(2);
    fetcher.panic_once_on = Some("https://mogi.vn/nha-dat-id101".to_owned());
    let sink = Arc::new(CollectSink::default());
    let engine = propcrawl::engine_with_fetcher(config(), Arc::new(fetcher), sink.clone()).unwrap();

    let report = engine.run(vec![queue.clone() as Arc<dyn QueueStore>]).await.unwrap();

    assert_eq!(report.restarts, 1);
    assert!(report.failed.is_empty());
    // The task in flight during the panic is lost.
    assert_eq!(sink.items.lock().len(), 3);
}

#[test]
fn engine_rejects_insane_config() {
    let config = Config { worker_count: 0, ..config() };
    let result = propcrawl::engine_with_fetcher(
        config,
        Arc::new(FixtureFetcher::default()),
        Arc::new(CollectSink::default()),
    );
    assert!(matches!(result, Err(CrawlError::InvalidConfig(_))));
}
