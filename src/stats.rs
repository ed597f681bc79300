use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{NaiveDateTime, Utc};

/// Process wide crawl counters, shared by all workers of a pool.
pub struct Stats {
    total_crawled: AtomicU64,
    total_dropped: AtomicU64,
    total_enqueued: AtomicU64,
    total_emitted: AtomicU64,
    start_time: NaiveDateTime,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    pub fn new() -> Self {
        Self {
            total_crawled: AtomicU64::new(0),
            total_dropped: AtomicU64::new(0),
            total_enqueued: AtomicU64::new(0),
            total_emitted: AtomicU64::new(0),
            start_time: Utc::now().naive_utc(),
        }
    }

    pub fn incr_total_crawled(&self) {
        self.total_crawled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_total_dropped(&self) {
        self.total_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_total_enqueued(&self, value: u64) {
        self.total_enqueued.fetch_add(value, Ordering::Relaxed);
    }

    pub fn incr_total_emitted(&self) {
        self.total_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_crawled(&self) -> u64 {
        self.total_crawled.load(Ordering::Relaxed)
    }

    pub fn total_dropped(&self) -> u64 {
        self.total_dropped.load(Ordering::Relaxed)
    }

    pub fn total_enqueued(&self) -> u64 {
        self.total_enqueued.load(Ordering::Relaxed)
    }

    pub fn total_emitted(&self) -> u64 {
        self.total_emitted.load(Ordering::Relaxed)
    }

    pub fn crawled_per_minute(&self) -> u64 {
        per_minute(self.total_crawled(), self.elapsed_time())
    }

    pub fn emitted_per_minute(&self) -> u64 {
        per_minute(self.total_emitted(), self.elapsed_time())
    }

    /// Elapsed time since the pool started, in seconds
    pub fn elapsed_time(&self) -> i64 {
        let now = Utc::now().naive_utc();
        (now - self.start_time).num_seconds()
    }
}

fn per_minute(count: u64, elapsed_secs: i64) -> u64 {
    let elapsed = (elapsed_secs / 60) as u64;
    if elapsed > 0 {
        count / elapsed
    } else {
        0
    }
}
