use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use texting_robots::Robot;

use crate::downloader::Fetcher;
use crate::util;
use crate::Config;

/// Filters follow links through each host's robots.txt.
///
/// robots.txt is fetched once per host with the crawl fetcher. A host whose
/// robots.txt can't be fetched or parsed is treated as allowing everything.
pub struct GuardRobot {
    config: Arc<Config>,
    fetcher: Arc<dyn Fetcher>,
    robots: Mutex<HashMap<String, Option<Arc<Robot>>>>,
}

impl GuardRobot {
    pub fn new(config: Arc<Config>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            config,
            fetcher,
            robots: Mutex::new(HashMap::new()),
        }
    }

    pub async fn is_allowed(&self, url: &str) -> bool {
        if !self.config.robotstxt_obey {
            return true;
        }

        // Robot rules don't apply without a host or robots url
        let (Some(host), Some(robot_url)) = (util::get_host(url), util::get_robot_url(url)) else {
            return true;
        };

        let cached = self.robots.lock().get(&host).cloned();
        let robot = match cached {
            Some(robot) => robot,
            None => {
                let robot = self.fetch_robot(&robot_url).await;
                // Two workers may race on the first fetch, keep whichever
                // landed first.
                self.robots.lock().entry(host).or_insert(robot).clone()
            }
        };

        match robot {
            Some(robot) => robot.allowed(url),
            None => true,
        }
    }

    async fn fetch_robot(&self, robot_url: &str) -> Option<Arc<Robot>> {
        let page = match self.fetcher.get(robot_url).await {
            Ok(page) => page,
            Err(e) => {
                log::debug!("[robots] no robots.txt: {}", e);
                return None;
            }
        };
        match Robot::new(&self.config.bot_name, page.body.as_bytes()) {
            Ok(robot) => Some(Arc::new(robot)),
            Err(e) => {
                log::warn!("[robots] unparsable {}: {}", robot_url, e);
                None
            }
        }
    }
}
