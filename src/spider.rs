use scraper::Html;

use crate::item::RawItem;

/// Site extraction interface.
///
/// Both operations are pure functions of the parsed page: no network, no
/// side effects, so they can be checked against fixed HTML fixtures.
pub trait Spider {
    /// Get spider name, used as a log label.
    fn name(&self) -> &str;

    /// Returns the detail page links found on a listing page, as written in
    /// the page (possibly relative).
    ///
    /// A page without links yields an empty list; that is how pagination
    /// drains once the last page has been passed.
    fn extract_listing(&self, page: &Html) -> Vec<String>;

    /// Extracts a property record from a detail page.
    ///
    /// Each field is extracted independently. Returns `None` only when not a
    /// single field could be found.
    fn extract_detail(&self, page: &Html) -> Option<RawItem>;
}
