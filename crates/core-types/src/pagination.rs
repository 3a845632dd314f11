use serde::{Deserialize, Serialize};

/// Raw `?page=&limit=` query parameters as sent by a client.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// A normalised page request: `page` starts at 1 and `limit` is within bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Normalises a client query using the configured default and maximum limits.
    ///
    /// A missing or zero page becomes 1. A missing limit becomes `default_limit`,
    /// and any limit is clamped into `1..=max_limit`.
    pub fn from_query(query: PageQuery, default_limit: u32, max_limit: u32) -> Self {
        let max_limit = max_limit.max(1);
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(default_limit).clamp(1, max_limit);
        Self { page, limit }
    }

    /// Number of rows to skip for this page.
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }

    pub fn limit_i64(&self) -> i64 {
        i64::from(self.limit)
    }
}

/// The pagination envelope returned by every list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: i64, request: PageRequest) -> Self {
        Self {
            data,
            total,
            page: request.page,
            limit: request.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_query_is_empty() {
        let req = PageRequest::from_query(PageQuery::default(), 20, 100);
        assert_eq!(req, PageRequest { page: 1, limit: 20 });
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn page_zero_and_oversized_limits_are_clamped() {
        let req = PageRequest::from_query(
            PageQuery {
                page: Some(0),
                limit: Some(5_000),
            },
            20,
            100,
        );
        assert_eq!(req, PageRequest { page: 1, limit: 100 });

        let req = PageRequest::from_query(
            PageQuery {
                page: Some(3),
                limit: Some(0),
            },
            20,
            100,
        );
        assert_eq!(req, PageRequest { page: 3, limit: 1 });
    }

    #[test]
    fn offset_skips_previous_pages() {
        let req = PageRequest { page: 4, limit: 25 };
        assert_eq!(req.offset(), 75);
    }

    #[test]
    fn envelope_serializes_with_expected_keys() {
        let page = Page::new(vec![1, 2], 12, PageRequest { page: 2, limit: 2 });
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json, serde_json::json!({ "data": [1, 2], "total": 12, "page": 2, "limit": 2 }));
    }
}
