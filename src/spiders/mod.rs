use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::spider::Spider;

pub mod mogi;

pub use mogi::MogiSpider;

/// Sites with an extractor implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    #[default]
    Mogi,
}

impl Site {
    pub fn spider(&self) -> Arc<dyn Spider + Send + Sync> {
        match self {
            Site::Mogi => Arc::new(MogiSpider::new()),
        }
    }
}
