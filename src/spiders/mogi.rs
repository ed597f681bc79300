use scraper::{ElementRef, Html, Selector};

use crate::item::RawItem;
use crate::spider::Spider;

const LISTING_LINKS: &str = "ul.props li div.prop-info a.link-overlay";
const TITLE: &str = "div.main-info div.title h1";
const ADDRESS: &str = "div.main-info div.address";
const PRICE: &str = "div.main-info div.price";
const CONTENT: &str = "div.main-info div.info-content-body";
const ADDITIONAL_INFO: &str = "div.main-info div.info-attrs div.info-attr span";

/// Extractor for mogi.vn listing and property pages.
pub struct MogiSpider {
    listing_links: Selector,
    title: Selector,
    address: Selector,
    price: Selector,
    content: Selector,
    additional_info: Selector,
}

impl Default for MogiSpider {
    fn default() -> Self {
        Self::new()
    }
}

impl MogiSpider {
    pub fn new() -> Self {
        Self {
            listing_links: selector(LISTING_LINKS),
            title: selector(TITLE),
            address: selector(ADDRESS),
            price: selector(PRICE),
            content: selector(CONTENT),
            additional_info: selector(ADDITIONAL_INFO),
        }
    }
}

impl Spider for MogiSpider {
    fn name(&self) -> &str {
        "mogi_vn"
    }

    fn extract_listing(&self, page: &Html) -> Vec<String> {
        page.select(&self.listing_links)
            .filter_map(|a| a.value().attr("href"))
            .map(str::to_owned)
            .collect()
    }

    fn extract_detail(&self, page: &Html) -> Option<RawItem> {
        let item = RawItem {
            title: first_text(page, &self.title),
            address: first_text(page, &self.address),
            price: first_text(page, &self.price),
            content: all_text(page, &self.content),
            additional_info: all_text(page, &self.additional_info),
        };
        if item.is_empty() {
            None
        } else {
            Some(item)
        }
    }
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css:?}: {e:?}"))
}

/// Text nodes that are direct children of the element.
fn own_text(el: ElementRef<'_>) -> impl Iterator<Item = String> + '_ {
    el.children()
        .filter_map(|node| node.value().as_text())
        .map(|text| text.to_string())
}

fn first_text(page: &Html, sel: &Selector) -> Option<String> {
    page.select(sel).flat_map(own_text).next()
}

fn all_text(page: &Html, sel: &Selector) -> Vec<String> {
    page.select(sel).flat_map(own_text).collect()
}
