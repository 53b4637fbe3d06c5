//! Pagination state.

use serde::{Deserialize, Serialize};

use crate::impl_domain_label_conversions;

/// How a list endpoint addresses pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationStyle {
    /// `offset` + `limit` query parameters; the response reports a total.
    #[default]
    Offset,
    /// Opaque continuation token returned with each page.
    Cursor,
}

impl_domain_label_conversions!(PaginationStyle {
    Offset => "offset",
    Cursor => "cursor",
});

/// Position of the next page to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagePosition {
    Offset(u64),
    /// `None` requests the first page.
    Cursor(Option<String>),
}

/// Mutable iteration state owned by a paginator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    pub position: PagePosition,
    pub page_size: u32,
    pub total_seen: u64,
    pub pages_fetched: u32,
    exhausted: bool,
}

impl PageCursor {
    pub const fn start(style: PaginationStyle, page_size: u32) -> Self {
        let position = match style {
            PaginationStyle::Offset => PagePosition::Offset(0),
            PaginationStyle::Cursor => PagePosition::Cursor(None),
        };
        Self { position, page_size, total_seen: 0, pages_fetched: 0, exhausted: false }
    }

    pub const fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Record a fetched page and decide whether another one exists.
    ///
    /// Iteration ends on an empty page, when `total` has been reached, when a
    /// cursor page carries no continuation token, or when an offset page
    /// without a reported total comes back short.
    pub fn advance(&mut self, records: usize, total: Option<u64>, next_cursor: Option<String>) {
        let records = records as u64;
        self.pages_fetched += 1;
        self.total_seen += records;

        if records == 0 {
            self.exhausted = true;
            return;
        }

        match &mut self.position {
            PagePosition::Offset(offset) => {
                *offset += records;
                self.exhausted = match total {
                    Some(total) => self.total_seen >= total,
                    None => records < u64::from(self.page_size),
                };
            }
            PagePosition::Cursor(cursor) => {
                let next = next_cursor.filter(|token| !token.is_empty());
                self.exhausted = next.is_none() || total.is_some_and(|t| self.total_seen >= t);
                *cursor = next;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_cursor_stops_at_reported_total() {
        let mut cursor = PageCursor::start(PaginationStyle::Offset, 10);
        cursor.advance(10, Some(25), None);
        assert_eq!(cursor.position, PagePosition::Offset(10));
        assert!(!cursor.is_exhausted());

        cursor.advance(10, Some(25), None);
        cursor.advance(5, Some(25), None);
        assert_eq!(cursor.total_seen, 25);
        assert_eq!(cursor.pages_fetched, 3);
        assert!(cursor.is_exhausted());
    }

    #[test]
    fn offset_without_total_stops_on_short_page() {
        let mut cursor = PageCursor::start(PaginationStyle::Offset, 10);
        cursor.advance(10, None, None);
        assert!(!cursor.is_exhausted());
        cursor.advance(3, None, None);
        assert!(cursor.is_exhausted());
    }

    #[test]
    fn cursor_style_follows_continuation_token() {
        let mut cursor = PageCursor::start(PaginationStyle::Cursor, 2);
        cursor.advance(2, None, Some("abc".into()));
        assert_eq!(cursor.position, PagePosition::Cursor(Some("abc".into())));
        assert!(!cursor.is_exhausted());

        cursor.advance(2, None, Some(String::new()));
        assert!(cursor.is_exhausted());
    }

    #[test]
    fn empty_page_always_ends_iteration() {
        let mut cursor = PageCursor::start(PaginationStyle::Cursor, 5);
        cursor.advance(0, Some(100), Some("more".into()));
        assert!(cursor.is_exhausted());
    }

    #[test]
    fn style_parses_from_label() {
        assert_eq!("Cursor".parse::<PaginationStyle>().unwrap(), PaginationStyle::Cursor);
        assert_eq!(PaginationStyle::Offset.to_string(), "offset");
    }
}
