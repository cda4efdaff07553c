//! Page-based pagination options and derived page metadata.

use serde::{Deserialize, Serialize};

/// Largest page size a caller may request.
pub const MAX_TAKE: i64 = 50;
const DEFAULT_TAKE: i64 = 10;

/// Query parameters for paginated listings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PageOptions {
    /// 1-based page number (default: 1).
    #[serde(default = "default_page")]
    pub page: i64,
    /// Page size (default: 10, max: 50).
    #[serde(default = "default_take")]
    pub take: i64,
    /// Optional free-text filter.
    #[serde(default)]
    pub q: Option<String>,
}

fn default_page() -> i64 {
    1
}

fn default_take() -> i64 {
    DEFAULT_TAKE
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            page: default_page(),
            take: default_take(),
            q: None,
        }
    }
}

impl PageOptions {
    pub fn new(page: i64, take: i64) -> Self {
        Self {
            page,
            take,
            q: None,
        }
    }

    pub fn with_query(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    /// Returns the page number, floored at 1.
    pub fn page(&self) -> i64 {
        self.page.max(1)
    }

    /// Returns a clamped page size (1..=50).
    pub fn take(&self) -> i64 {
        self.take.clamp(1, MAX_TAKE)
    }

    /// Number of records preceding the requested page. Saturates for
    /// absurdly large pages, which then simply come back empty.
    pub fn skip(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.take())
    }

    /// The free-text filter, ignoring blank input.
    pub fn query(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

/// Summary of where a page sits within the full result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub page: i64,
    pub take: i64,
    pub item_count: i64,
    pub page_count: i64,
    pub has_previous_page: bool,
    pub has_next_page: bool,
}

impl PageMeta {
    /// Derives page metadata from the options and the total number of matching
    /// records. Pages past the end are allowed and simply report no next page.
    pub fn compute(options: &PageOptions, item_count: i64) -> Self {
        let page = options.page();
        let take = options.take();
        let item_count = item_count.max(0);
        let page_count = item_count / take + i64::from(item_count % take != 0);

        Self {
            page,
            take,
            item_count,
            page_count,
            has_previous_page: page > 1,
            has_next_page: page < page_count,
        }
    }
}

/// One page of records together with its metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T: Serialize> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T: Serialize> Page<T> {
    pub fn new(data: Vec<T>, meta: PageMeta) -> Self {
        Self { data, meta }
    }

    pub fn map<U: Serialize>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}
