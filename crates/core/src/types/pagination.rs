//! Page-based pagination for list endpoints.

use serde::{Deserialize, Serialize};

/// Errors raised when a page request is out of range.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    /// Pages are 1-based.
    #[error("page must be at least 1")]
    PageOutOfRange,
    /// Limit outside `1..=MAX_LIMIT`.
    #[error("limit must be between 1 and {max}")]
    LimitOutOfRange {
        /// Largest accepted limit.
        max: u32,
    },
}

/// A validated, 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    /// Default page size.
    pub const DEFAULT_LIMIT: u32 = 10;
    /// Largest page size a caller may ask for.
    pub const MAX_LIMIT: u32 = 100;

    /// Validate a page request.
    ///
    /// # Errors
    ///
    /// Returns an error if `page` is zero or `limit` is outside `1..=100`.
    pub const fn new(page: u32, limit: u32) -> Result<Self, PageError> {
        if page == 0 {
            return Err(PageError::PageOutOfRange);
        }
        if limit == 0 || limit > Self::MAX_LIMIT {
            return Err(PageError::LimitOutOfRange {
                max: Self::MAX_LIMIT,
            });
        }
        Ok(Self { page, limit })
    }

    /// Build from optional query parameters, applying defaults.
    ///
    /// # Errors
    ///
    /// Same as [`PageRequest::new`].
    pub fn from_query(page: Option<u32>, limit: Option<u32>) -> Result<Self, PageError> {
        Self::new(page.unwrap_or(1), limit.unwrap_or(Self::DEFAULT_LIMIT))
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Rows to skip: `(page - 1) * limit`.
    #[must_use]
    pub const fn skip(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }

    /// Rows to take.
    #[must_use]
    pub const fn take(&self) -> u64 {
        self.limit as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// Pagination metadata returned alongside a page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total_count: u64,
    pub total_pages: u64,
}

impl PageMeta {
    /// Compute metadata for `total_count` matching rows.
    #[must_use]
    pub const fn new(request: PageRequest, total_count: u64) -> Self {
        Self {
            page: request.page,
            limit: request.limit,
            total_count,
            total_pages: total_count.div_ceil(request.limit as u64),
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub meta: PageMeta,
    pub data: Vec<T>,
}

impl<T> Paginated<T> {
    #[must_use]
    pub const fn new(request: PageRequest, total_count: u64, data: Vec<T>) -> Self {
        Self {
            meta: PageMeta::new(request, total_count),
            data,
        }
    }

    /// Slice an already filtered and ordered collection.
    #[must_use]
    pub fn from_vec(request: PageRequest, items: Vec<T>) -> Self {
        let total = items.len() as u64;
        let skip = usize::try_from(request.skip()).unwrap_or(usize::MAX);
        let take = usize::try_from(request.take()).unwrap_or(usize::MAX);
        let data = items.into_iter().skip(skip).take(take).collect();
        Self::new(request, total, data)
    }

    /// Transform every item, keeping the metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            meta: self.meta,
            data: self.data.into_iter().map(f).collect(),
        }
    }
}

/// Case-insensitive substring match used by list searches.
///
/// A missing or blank needle matches everything.
#[must_use]
pub fn matches_search<'a>(needle: Option<&str>, haystacks: impl IntoIterator<Item = &'a str>) -> bool {
    let Some(needle) = needle.map(str::trim).filter(|n| !n.is_empty()) else {
        return true;
    };
    let needle = needle.to_lowercase();
    haystacks
        .into_iter()
        .any(|h| h.to_lowercase().contains(&needle))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_and_take() {
        let page = PageRequest::new(3, 20).unwrap();
        assert_eq!(page.skip(), 40);
        assert_eq!(page.take(), 20);
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert_eq!(PageRequest::new(0, 10), Err(PageError::PageOutOfRange));
        assert!(matches!(
            PageRequest::new(1, 0),
            Err(PageError::LimitOutOfRange { .. })
        ));
        assert!(PageRequest::new(1, 101).is_err());
    }

    #[test]
    fn test_from_query_defaults() {
        let page = PageRequest::from_query(None, None).unwrap();
        assert_eq!(page, PageRequest::default());
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let page = PageRequest::new(1, 10).unwrap();
        assert_eq!(PageMeta::new(page, 0).total_pages, 0);
        assert_eq!(PageMeta::new(page, 10).total_pages, 1);
        assert_eq!(PageMeta::new(page, 11).total_pages, 2);
    }

    #[test]
    fn test_from_vec_slices() {
        let page = PageRequest::new(2, 2).unwrap();
        let result = Paginated::from_vec(page, vec![1, 2, 3, 4, 5]);
        assert_eq!(result.data, vec![3, 4]);
        assert_eq!(result.meta.total_count, 5);
        assert_eq!(result.meta.total_pages, 3);
    }

    #[test]
    fn test_matches_search() {
        assert!(matches_search(None, ["anything"]));
        assert!(matches_search(Some("  "), ["anything"]));
        assert!(matches_search(Some("ALI"), ["Bob", "alice@example.com"]));
        assert!(!matches_search(Some("carol"), ["Bob", "alice@example.com"]));
    }
}
