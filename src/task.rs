use serde::{Deserialize, Serialize};

/// What kind of page a task points at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Paginated index page linking to detail pages. Seeds written by older
    /// injectors carry only a url, so this is the default.
    #[default]
    Listing,
    /// A single property page.
    Detail,
}

/// A unit of crawl work. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub url: String,
    #[serde(default)]
    pub kind: TaskKind,
}

impl Task {
    pub fn listing(url: impl Into<String>) -> Self {
        Self { url: url.into(), kind: TaskKind::Listing }
    }

    pub fn detail(url: impl Into<String>) -> Self {
        Self { url: url.into(), kind: TaskKind::Detail }
    }

    /// Serialize to the queue wire format.
    pub fn encode(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a queue entry. Unknown fields are ignored.
    pub fn decode(payload: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }
}
