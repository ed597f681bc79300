use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CrawlError, Result};
use crate::producer::PathTemplate;
use crate::spiders::Site;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Bot name / user agent
    #[serde(default = "default_bot_name")]
    pub bot_name: String,
    /// The number of crawl workers run by this process.
    #[serde(default = "default_worker_count")]
    pub worker_count: u32,
    /// How long (in secs) a single queue poll waits for a task.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: f32,
    /// Cumulative idle time (in secs) after which a worker assumes the queue
    /// is exhausted and exits.
    #[serde(default = "default_max_idle_time_secs")]
    pub max_idle_time_secs: f32,
    /// Listing url pattern. `{type}` is replaced by the property type and
    /// `{page}` by the page number.
    #[serde(default = "default_path_template")]
    pub path_template: String,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Redis list holding pending tasks.
    #[serde(default = "default_queue_key")]
    pub queue_key: String,
    /// Redis list receiving extracted items when the redis sink is used.
    #[serde(default = "default_items_key")]
    pub items_key: String,
    /// The amount of time (in secs) a worker waits between two consecutive
    /// downloads.
    #[serde(default = "default_download_delay")]
    pub download_delay: f32,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: f32,
    /// If enabled, follow links disallowed by robots.txt are not enqueued.
    #[serde(default = "default_robotstxt_obey")]
    pub robotstxt_obey: bool,
    /// Which site extractor to use.
    #[serde(default)]
    pub site: Site,
    /// Interval between two throughput reports in the log.
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,
}

fn default_bot_name() -> String {
    "propcrawlbot".to_owned()
}

fn default_worker_count() -> u32 {
    4
}

fn default_idle_timeout_secs() -> f32 {
    1.0
}

fn default_max_idle_time_secs() -> f32 {
    7.0
}

fn default_path_template() -> String {
    "https://mogi.vn/{type}?cp={page}".to_owned()
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_owned()
}

fn default_queue_key() -> String {
    "mogi_vn_queue:start_urls".to_owned()
}

fn default_items_key() -> String {
    "mogi_vn:items".to_owned()
}

fn default_download_delay() -> f32 {
    0.0
}

fn default_fetch_timeout_secs() -> f32 {
    30.0
}

fn default_robotstxt_obey() -> bool {
    true
}

fn default_report_interval_secs() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_name: default_bot_name(),
            worker_count: default_worker_count(),
            idle_timeout_secs: default_idle_timeout_secs(),
            max_idle_time_secs: default_max_idle_time_secs(),
            path_template: default_path_template(),
            redis_url: default_redis_url(),
            queue_key: default_queue_key(),
            items_key: default_items_key(),
            download_delay: default_download_delay(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            robotstxt_obey: default_robotstxt_obey(),
            site: Site::default(),
            report_interval_secs: default_report_interval_secs(),
        }
    }
}

impl Config {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        serde_yaml::from_reader(file)
            .map_err(|e| CrawlError::InvalidConfig(format!("{}: {e}", path.display())))
    }

    pub fn sanity_check(&self) -> Result<()> {
        if self.worker_count == 0 {
            return invalid("workerCount cannot be zero");
        }
        let idle_timeout = duration("idleTimeoutSecs", self.idle_timeout_secs)?;
        let max_idle_time = duration("maxIdleTimeSecs", self.max_idle_time_secs)?;
        duration("downloadDelay", self.download_delay)?;
        let fetch_timeout = duration("fetchTimeoutSecs", self.fetch_timeout_secs)?;
        if idle_timeout.is_zero() {
            return invalid("idleTimeoutSecs must be positive");
        }
        if max_idle_time < idle_timeout {
            return invalid("maxIdleTimeSecs must be at least idleTimeoutSecs");
        }
        if fetch_timeout.is_zero() {
            return invalid("fetchTimeoutSecs must be positive");
        }
        if self.report_interval_secs == 0 {
            return invalid("reportIntervalSecs cannot be zero");
        }
        PathTemplate::new(&self.path_template)?;
        Ok(())
    }

    // The getters below assume `sanity_check` passed.

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs_f32(self.idle_timeout_secs)
    }

    pub fn max_idle_time(&self) -> Duration {
        Duration::from_secs_f32(self.max_idle_time_secs)
    }

    pub fn download_delay(&self) -> Duration {
        Duration::from_secs_f32(self.download_delay)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs_f32(self.fetch_timeout_secs)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }
}

fn invalid(reason: &str) -> Result<()> {
    Err(CrawlError::InvalidConfig(reason.to_owned()))
}

/// Seconds as a `Duration`, rejecting NaN, negative and overflowing values.
fn duration(name: &str, secs: f32) -> Result<Duration> {
    Duration::try_from_secs_f32(secs)
        .map_err(|e| CrawlError::InvalidConfig(format!("{name} = {secs}: {e}")))
}
