use std::sync::Arc;

use crate::error::{CrawlError, Result};
use crate::queue::QueueStore;
use crate::task::Task;

const TYPE_PLACEHOLDER: &str = "{type}";
const PAGE_PLACEHOLDER: &str = "{page}";

/// Listing url pattern, e.g. `https://mogi.vn/{type}?cp={page}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate(String);

impl PathTemplate {
    pub fn new(template: &str) -> Result<Self> {
        if !template.contains(PAGE_PLACEHOLDER) {
            return Err(CrawlError::InvalidTemplate {
                template: template.to_owned(),
                reason: "missing {page} placeholder",
            });
        }
        Ok(Self(template.to_owned()))
    }

    /// Substitutes the property type path segment.
    pub fn with_property_type(&self, property_type: &str) -> Self {
        Self(self.0.replace(TYPE_PLACEHOLDER, property_type.trim_matches('/')))
    }

    pub fn page_url(&self, page: u32) -> String {
        self.0.replace(PAGE_PLACEHOLDER, &page.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Pushes listing seeds into the shared queue.
pub struct TaskProducer {
    queue: Arc<dyn QueueStore>,
}

impl TaskProducer {
    pub fn new(queue: Arc<dyn QueueStore>) -> Self {
        Self { queue }
    }

    /// Enqueues one listing task per page in `[first, last]`, in page order.
    ///
    /// Returns the number of tasks pushed.
    pub async fn enqueue_range(
        &self,
        template: &PathTemplate,
        first: u32,
        last: u32,
    ) -> Result<usize> {
        let tasks = listing_tasks(template, first, last)?;
        let count = tasks.len();
        self.queue.push(tasks).await?;
        log::info!(
            "[producer] enqueued {} listing pages ({}..={}) from {}",
            count,
            first,
            last,
            template.as_str(),
        );
        Ok(count)
    }
}

/// Builds the listing seeds for an inclusive page range.
pub fn listing_tasks(template: &PathTemplate, first: u32, last: u32) -> Result<Vec<Task>> {
    if first > last {
        return Err(CrawlError::InvalidRange { first, last });
    }
    Ok((first..=last).map(|page| Task::listing(template.page_url(page))).collect())
}
