use serde::{Deserialize, Serialize};

/// Fields as scraped from a detail page, before any cleanup.
///
/// Every field is optional because page structure varies; an absent field is
/// a normal outcome, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawItem {
    pub title: Option<String>,
    pub address: Option<String>,
    /// Human formatted, e.g. "3 tỷ 500 triệu".
    pub price: Option<String>,
    /// One entry per content block, in page order.
    pub content: Vec<String>,
    /// Flattened label/value tokens, in page order.
    pub additional_info: Vec<String>,
}

impl RawItem {
    /// True when no field matched at all.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.address.is_none()
            && self.price.is_none()
            && self.content.is_empty()
            && self.additional_info.is_empty()
    }
}

/// A [`RawItem`] after whitespace and join canonicalization. This is the
/// record handed to the storage sink.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedItem {
    pub title: Option<String>,
    pub address: Option<String>,
    pub price: Option<String>,
    /// Content blocks joined with `\n`. Empty when the page had none.
    pub content: String,
    pub additional_info: Vec<String>,
}

impl From<NormalizedItem> for RawItem {
    fn from(item: NormalizedItem) -> Self {
        Self {
            title: item.title,
            address: item.address,
            price: item.price,
            content: if item.content.is_empty() {
                vec![]
            } else {
                vec![item.content]
            },
            additional_info: item.additional_info,
        }
    }
}
