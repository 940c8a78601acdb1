//! Page/size resolution and the paginated response envelope.

use serde::de::{Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Raw `?page=&size=` query values. Kept as strings so bad input degrades to
/// defaults instead of rejecting the request. A repeated key keeps its first
/// value and unknown keys are ignored.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PageQuery {
    pub page: Option<String>,
    pub size: Option<String>,
}

impl<'de> Deserialize<'de> for PageQuery {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(PageQueryVisitor)
    }
}

struct PageQueryVisitor;

impl<'de> Visitor<'de> for PageQueryVisitor {
    type Value = PageQuery;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("page/size query parameters")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<PageQuery, A::Error> {
        let mut query = PageQuery::default();
        while let Some(key) = map.next_key::<String>()? {
            let slot = match key.as_str() {
                "page" => &mut query.page,
                "size" => &mut query.size,
                _ => {
                    map.next_value::<IgnoredAny>()?;
                    continue;
                }
            };
            let value = map.next_value::<String>()?;
            slot.get_or_insert(value);
        }
        Ok(query)
    }
}

/// A resolved page: `offset == (current_page - 1) * limit`, `limit >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub limit: u32,
    pub offset: u64,
    pub current_page: u32,
}

/// Default and ceiling for the page size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    default_size: u32,
    max_size: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)
    }
}

impl PageLimits {
    pub fn new(default_size: u32, max_size: u32) -> Self {
        let max_size = max_size.max(1);
        Self {
            default_size: default_size.clamp(1, max_size),
            max_size,
        }
    }

    pub fn default_size(&self) -> u32 {
        self.default_size
    }

    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    /// Resolve untrusted page/size values. Never fails: missing, malformed or
    /// non-positive values fall back to page 1 / the default size, and sizes
    /// above the ceiling are clamped to it.
    pub fn resolve(&self, page: Option<&str>, size: Option<&str>) -> PageWindow {
        let current_page = parse_positive(page)
            .map(|p| u32::try_from(p).unwrap_or(u32::MAX))
            .unwrap_or(1);
        let limit = parse_positive(size)
            .map(|s| u32::try_from(s.min(u64::from(self.max_size))).unwrap_or(self.max_size))
            .unwrap_or(self.default_size);

        PageWindow {
            limit,
            offset: u64::from(current_page - 1) * u64::from(limit),
            current_page,
        }
    }

    pub fn resolve_query(&self, query: &PageQuery) -> PageWindow {
        self.resolve(query.page.as_deref(), query.size.as_deref())
    }
}

fn parse_positive(raw: Option<&str>) -> Option<u64> {
    raw?.trim().parse::<u64>().ok().filter(|n| *n >= 1)
}

/// Uniform list response: `{ data, pagination }`
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: PageMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total_items: u64,
    pub total_pages: u64,
    pub current_page: u32,
    pub page_size: u32,
}

impl<T> Paginated<T> {
    pub fn new(total_items: u64, window: &PageWindow, data: Vec<T>) -> Self {
        let page_size = window.limit.max(1);
        Self {
            data,
            pagination: PageMeta {
                total_items,
                total_pages: total_items.div_ceil(u64::from(page_size)),
                current_page: window.current_page,
                page_size,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, None, 1, 10)]
    #[case(Some("3"), Some("20"), 3, 20)]
    #[case(Some(" 2 "), Some(" 5 "), 2, 5)]
    #[case(Some("0"), Some("0"), 1, 10)]
    #[case(Some("-4"), Some("-1"), 1, 10)]
    #[case(Some("abc"), Some("1.5"), 1, 10)]
    #[case(Some(""), Some(""), 1, 10)]
    #[case(Some("1"), Some("101"), 1, 100)]
    #[case(Some("1"), Some("99999999999999"), 1, 100)]
    #[case(Some("99999999999999"), Some("10"), u32::MAX, 10)]
    #[case(Some("1"), Some("1e9999"), 1, 10)]
    fn resolves_untrusted_input(
        #[case] page: Option<&str>,
        #[case] size: Option<&str>,
        #[case] expected_page: u32,
        #[case] expected_limit: u32,
    ) {
        let window = PageLimits::default().resolve(page, size);

        assert_eq!(window.current_page, expected_page);
        assert_eq!(window.limit, expected_limit);
        assert!(window.limit >= 1);
        assert!(window.current_page >= 1);
        assert_eq!(
            window.offset,
            u64::from(window.current_page - 1) * u64::from(window.limit)
        );
    }

    #[test]
    fn query_keeps_first_value_and_ignores_unknown_keys() {
        let query: PageQuery =
            serde_json::from_str(r#"{"page":"2","page":"7","sort":"asc","size":"5"}"#).unwrap();
        assert_eq!(
            query,
            PageQuery {
                page: Some("2".to_string()),
                size: Some("5".to_string()),
            }
        );
        assert_eq!(PageLimits::default().resolve_query(&query).offset, 5);
    }

    #[test]
    fn offset_follows_page() {
        let window = PageLimits::default().resolve(Some("4"), Some("25"));
        assert_eq!(window.offset, 75);
    }

    #[test]
    fn limits_are_normalised() {
        let limits = PageLimits::new(500, 50);
        assert_eq!(limits.default_size(), 50);
        assert_eq!(limits.max_size(), 50);

        let zeroes = PageLimits::new(0, 0);
        assert_eq!(zeroes.default_size(), 1);
        assert_eq!(zeroes.resolve(None, Some("7")).limit, 1);
    }

    #[test]
    fn empty_result_has_zero_pages() {
        let window = PageLimits::default().resolve(Some("1"), Some("10"));
        let envelope = Paginated::<u8>::new(0, &window, Vec::new());
        assert_eq!(envelope.pagination.total_pages, 0);
        assert_eq!(envelope.pagination.total_items, 0);
    }

    #[test]
    fn partial_last_page_rounds_up() {
        let window = PageLimits::default().resolve(Some("2"), Some("10"));
        let envelope = Paginated::new(25, &window, vec![0u8; 10]);
        assert_eq!(
            envelope.pagination,
            PageMeta {
                total_items: 25,
                total_pages: 3,
                current_page: 2,
                page_size: 10,
            }
        );
        assert_eq!(envelope.data.len(), 10);
    }

    #[test]
    fn envelope_serializes_camel_case() {
        let window = PageLimits::default().resolve(None, None);
        let json = serde_json::to_value(Paginated::new(1, &window, vec!["r"])).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "data": ["r"],
                "pagination": {
                    "totalItems": 1,
                    "totalPages": 1,
                    "currentPage": 1,
                    "pageSize": 10
                }
            })
        );
    }
}
