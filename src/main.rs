use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use propcrawl::queue::redis_store::RedisQueue;
use propcrawl::queue::QueueStore;
use propcrawl::sink::{ItemSink, JsonLinesSink, RedisSink};
use propcrawl::{Config, PathTemplate, TaskProducer};

/// Distributed property listing crawler
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Optional yaml configuration file
    #[arg(env = "PROPCRAWL_CONFIG", long, global = true)]
    config: Option<PathBuf>,
    /// Override the redis url
    #[arg(env = "REDIS_URL", long, global = true)]
    redis_url: Option<String>,
    #[command(subcommand)]
    cmd: SubCommand,
}

#[derive(Debug, clap::Subcommand)]
enum SubCommand {
    Seed(SeedArgs),
    Crawl(CrawlArgs),
}

/// Push listing pages of a property type into the work queue
#[derive(Debug, clap::Args)]
struct SeedArgs {
    /// Property type path segment, e.g. mua-nha-dat
    property_type: String,
    /// First page to crawl
    first: u32,
    /// Last page to crawl (inclusive)
    last: u32,
}

/// Run crawl workers until the queue has been drained
#[derive(Debug, clap::Args)]
struct CrawlArgs {
    /// Override the number of workers
    #[arg(long, short)]
    workers: Option<u32>,
    /// Write items to this file instead of stdout
    #[arg(long, short, conflicts_with = "redis_items")]
    output_file: Option<PathBuf>,
    /// Push items to the configured redis items list instead of stdout
    #[arg(long)]
    redis_items: bool,
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_yaml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(redis_url) = &args.redis_url {
        config.redis_url = redis_url.clone();
    }
    if let SubCommand::Crawl(CrawlArgs { workers: Some(workers), .. }) = &args.cmd {
        config.worker_count = *workers;
    }
    config.sanity_check()?;
    Ok(config)
}

async fn seed(config: &Config, args: &SeedArgs) -> anyhow::Result<()> {
    if args.first > args.last {
        Args::command()
            .error(
                ErrorKind::ValueValidation,
                format!(
                    "first page ({}) must not be after last page ({})",
                    args.first, args.last
                ),
            )
            .exit();
    }

    let template = PathTemplate::new(&config.path_template)?.with_property_type(&args.property_type);
    let queue = RedisQueue::connect(&config.redis_url, &config.queue_key)
        .await
        .context("connecting to the queue store")?;
    let count = TaskProducer::new(Arc::new(queue))
        .enqueue_range(&template, args.first, args.last)
        .await?;
    println!("queued {count} listing pages");
    Ok(())
}

async fn crawl(config: Config, args: &CrawlArgs) -> anyhow::Result<()> {
    let sink: Arc<dyn ItemSink> = if args.redis_items {
        Arc::new(RedisSink::connect(&config.redis_url, &config.items_key).await?)
    } else if let Some(path) = &args.output_file {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        Arc::new(JsonLinesSink::new(io::BufWriter::new(file)))
    } else {
        Arc::new(JsonLinesSink::new(io::stdout()))
    };

    let mut queues: Vec<Arc<dyn QueueStore>> = vec![];
    for _ in 0..config.worker_count {
        let queue = RedisQueue::connect(&config.redis_url, &config.queue_key)
            .await
            .context("connecting to the queue store")?;
        queues.push(Arc::new(queue));
    }

    let engine = propcrawl::engine(config, sink)?;
    let report = engine.run(queues).await?;
    log::info!(
        "{} workers finished, {} items emitted, {} restarts",
        report.finished.len(),
        report.total_emitted(),
        report.restarts,
    );

    if !report.failed.is_empty() {
        for failure in &report.failed {
            log::error!("[worker-{}] {}", failure.worker_id, failure.error);
        }
        bail!("{} workers failed", report.failed.len());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = load_config(&args)?;
    match &args.cmd {
        SubCommand::Seed(seed_args) => seed(&config, seed_args).await,
        SubCommand::Crawl(crawl_args) => crawl(config, crawl_args).await,
    }
}
