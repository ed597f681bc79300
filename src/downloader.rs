use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::USER_AGENT;

use crate::error::{CrawlError, Result};

/// A downloaded page.
#[derive(Debug, Clone)]
pub struct Page {
    /// Final url, after redirects. Relative links resolve against it.
    pub url: String,
    pub body: String,
}

/// HTTP fetch capability used by the workers.
///
/// Any network error or non-2xx status is reported as
/// [`CrawlError::Fetch`]; retry policy, if any, lives behind this trait.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<Page>;
}

/// reqwest based fetcher.
#[derive(Clone)]
pub struct Downloader {
    client: reqwest::Client,
    user_agent: String,
}

impl Downloader {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CrawlError::InvalidConfig(format!("http client: {e}")))?;
        Ok(Self {
            client,
            user_agent: user_agent.to_owned(),
        })
    }
}

#[async_trait]
impl Fetcher for Downloader {
    async fn get(&self, url: &str) -> Result<Page> {
        let fetch_err = |reason: String| CrawlError::Fetch {
            url: url.to_owned(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_err(format!("status {status}")));
        }

        let final_url = response.url().to_string();
        let body = response.text().await.map_err(|e| fetch_err(e.to_string()))?;
        Ok(Page {
            url: final_url,
            body,
        })
    }
}
