//! Paged query results and page-number navigation.
//!
//! `PagedView<'a, R>` holds the full ordered match list for a query (the
//! "visible set" used by navigation) together with the clamped page window.
//! It implements `Deref` to [`PaginationMeta`], so `.page`, `.total_pages`,
//! `.total` are available directly.
//!
//! ```rust
//! use gallery::paged::{PageMarker, page_numbers};
//!
//! let markers = page_numbers(5, 10);
//! assert_eq!(markers.first(), Some(&PageMarker::Page(1)));
//! assert_eq!(markers.last(), Some(&PageMarker::Page(10)));
//! ```
//!
use std::{fmt, ops::Deref};

use serde::{Serialize, Serializer, ser::SerializeStruct};

/// Page counts and position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationMeta {
    /// Current page, 1-based, clamped to `1..=total_pages`
    pub page: usize,
    /// Items per page
    pub page_size: usize,
    /// Total matches across all pages
    pub total: usize,
    /// Number of pages, at least 1
    pub total_pages: usize,
}

impl PaginationMeta {
    /// Computes page count and clamps the requested page.
    pub fn new(requested_page: usize, page_size: usize, total: usize) -> Self {
        let total_pages = page_count(total, page_size);
        Self {
            page: requested_page.clamp(1, total_pages),
            page_size,
            total,
            total_pages,
        }
    }

    /// Index range into the match list for the current page
    pub fn window(&self) -> std::ops::Range<usize> {
        let start = (self.page - 1).saturating_mul(self.page_size).min(self.total);
        let end = start.saturating_add(self.page_size).min(self.total);
        start..end
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Number of pages for `total` items; an empty list still has one page.
pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    total.div_ceil(page_size).max(1)
}

/// Ordered matches for a query and the current page window.
pub struct PagedView<'a, R> {
    matches: Vec<&'a R>,
    pagination: PaginationMeta,
}

impl<'a, R> PagedView<'a, R> {
    pub(crate) fn new(matches: Vec<&'a R>, requested_page: usize, page_size: usize) -> Self {
        let pagination = PaginationMeta::new(requested_page, page_size, matches.len());
        Self {
            matches,
            pagination,
        }
    }

    /// Records on the current page
    pub fn page_items(&self) -> &[&'a R] {
        &self.matches[self.pagination.window()]
    }

    /// All matches in order, across every page
    pub fn visible(&self) -> &[&'a R] {
        &self.matches
    }

    pub fn pagination(&self) -> PaginationMeta {
        self.pagination
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Page-number markers for the pager
    pub fn page_numbers(&self) -> Vec<PageMarker> {
        page_numbers(self.pagination.page, self.pagination.total_pages)
    }
}

impl<R> Deref for PagedView<'_, R> {
    type Target = PaginationMeta;

    fn deref(&self) -> &Self::Target {
        &self.pagination
    }
}

impl<R> fmt::Debug for PagedView<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagedView")
            .field("matches", &self.matches.len())
            .field("pagination", &self.pagination)
            .finish()
    }
}

impl<R: Serialize> Serialize for PagedView<'_, R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PagedView", 2)?;
        state.serialize_field("items", self.page_items())?;
        state.serialize_field("pagination", &self.pagination)?;
        state.end()
    }
}

/// Entry in a pager: a page number or an elided gap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PageMarker {
    Page(usize),
    Gap,
}

impl fmt::Display for PageMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page(n) => write!(f, "{n}"),
            Self::Gap => f.write_str("..."),
        }
    }
}

/// Pager markers: every page when `total <= 7`; otherwise first, last, the
/// neighbors of `current`, and a gap wherever pages are skipped.
pub fn page_numbers(current: usize, total: usize) -> Vec<PageMarker> {
    if total <= 7 {
        return (1..=total).map(PageMarker::Page).collect();
    }
    let mut markers = vec![PageMarker::Page(1)];
    if current > 3 {
        markers.push(PageMarker::Gap);
    }
    let low = current.saturating_sub(1).max(2);
    let high = current.saturating_add(1).min(total - 1);
    markers.extend((low..=high).map(PageMarker::Page));
    if current.saturating_add(2) < total {
        markers.push(PageMarker::Gap);
    }
    markers.push(PageMarker::Page(total));
    markers
}

#[cfg(test)]
mod tests {
    use super::*;
    use PageMarker::{Gap, Page};

    #[test]
    fn test_page_numbers_small() {
        assert_eq!(page_numbers(1, 1), vec![Page(1)]);
        assert_eq!(
            page_numbers(4, 7),
            (1..=7).map(Page).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_page_numbers_gaps() {
        assert_eq!(
            page_numbers(5, 10),
            vec![Page(1), Gap, Page(4), Page(5), Page(6), Gap, Page(10)]
        );
        assert_eq!(
            page_numbers(1, 10),
            vec![Page(1), Page(2), Gap, Page(10)]
        );
        assert_eq!(
            page_numbers(10, 10),
            vec![Page(1), Gap, Page(9), Page(10)]
        );
        assert_eq!(
            page_numbers(3, 10),
            vec![Page(1), Page(2), Page(3), Page(4), Gap, Page(10)]
        );
        assert_eq!(
            page_numbers(8, 10),
            vec![Page(1), Gap, Page(7), Page(8), Page(9), Page(10)]
        );
    }

    #[test]
    fn test_page_numbers_far_out_of_range() {
        assert_eq!(page_numbers(usize::MAX, 10), vec![Page(1), Gap, Page(10)]);
    }

    #[test]
    fn test_page_count_and_clamp() {
        assert_eq!(page_count(0, 12), 1);
        assert_eq!(page_count(12, 12), 1);
        assert_eq!(page_count(13, 12), 2);
        assert_eq!(page_count(30, 24), 2);

        let meta = PaginationMeta::new(3, 12, 10);
        assert_eq!(meta.page, 1);
        assert_eq!(meta.window(), 0..10);
        let meta = PaginationMeta::new(0, 12, 30);
        assert_eq!(meta.page, 1);
        let meta = PaginationMeta::new(3, 12, 30);
        assert_eq!(meta.window(), 24..30);
        assert!(meta.has_previous());
        assert!(!meta.has_next());
    }

    #[test]
    fn test_paged_view_window() {
        let items: Vec<u32> = (0..30).collect();
        let refs: Vec<&u32> = items.iter().collect();
        let view = PagedView::new(refs, 2, 12);
        assert_eq!(view.page, 2);
        assert_eq!(view.total_pages, 3);
        assert_eq!(view.page_items().len(), 12);
        assert_eq!(*view.page_items()[0], 12);
        assert_eq!(view.visible().len(), 30);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["pagination"]["total"], 30);
        assert_eq!(json["items"].as_array().map(Vec::len), Some(12));
    }
}
