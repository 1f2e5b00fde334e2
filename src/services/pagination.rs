//! Paging and sorting primitives shared by the list endpoints.
//!
//! Pages are 1-indexed. A page past the end is not an error: it comes back
//! with no items and the real `total_count`, so clients can render
//! "page 7 of 3" states without a second request.

use serde::Serialize;

/// Page size bounds, taken from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

/// A validated page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// Normalize raw query values: page defaults to 1, page size to the
    /// configured default, and page size is clamped to `[1, max]`.
    pub fn resolve(page: Option<u32>, page_size: Option<u32>, limits: PageLimits) -> Self {
        let max = limits.max_page_size.max(1);
        let page_size = page_size
            .unwrap_or(limits.default_page_size)
            .clamp(1, max);
        Self {
            page: page.unwrap_or(1).max(1),
            page_size,
        }
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }
}

/// One page of results plus the totals the client needs to render pagers.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total_count: u64) -> Self {
        Self {
            items,
            page: request.page,
            page_size: request.page_size,
            total_count,
            total_pages: total_pages(total_count, request.page_size),
        }
    }

    /// Page over a collection that is already filtered and sorted in memory.
    pub fn from_vec(all: Vec<T>, request: PageRequest) -> Self {
        let total_count = all.len() as u64;
        let items = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.page_size as usize)
            .collect();
        Self::new(items, request, total_count)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_count: self.total_count,
            total_pages: self.total_pages,
        }
    }
}

/// `ceil(total_count / page_size)`, zero for an empty result.
pub fn total_pages(total_count: u64, page_size: u32) -> u64 {
    let page_size = u64::from(page_size.max(1));
    total_count.div_ceil(page_size)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(SortDirection::Asc),
            "desc" | "descending" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// A sortable field of some entity. `DEFAULT` is the primary display field.
pub trait SortKey: Copy + Sized {
    const DEFAULT: Self;

    /// Parse a client-supplied key (e.g. `rating`, `createdAt`)
    fn parse(s: &str) -> Option<Self>;

    /// SQL expression to order by. Must be a trusted constant.
    fn column(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec<K> {
    pub key: K,
    pub direction: SortDirection,
}

impl<K: SortKey> SortSpec<K> {
    /// Resolve client sort parameters. Unknown or missing keys fall back to
    /// the default key in ascending order, whatever direction was asked for.
    pub fn resolve(key: Option<&str>, direction: Option<&str>) -> Self {
        match key.and_then(K::parse) {
            Some(key) => Self {
                key,
                direction: direction
                    .and_then(SortDirection::parse)
                    .unwrap_or_default(),
            },
            None => Self {
                key: K::DEFAULT,
                direction: SortDirection::Asc,
            },
        }
    }

    /// `ORDER BY` clause with nulls last and a stable tie-break on `id`.
    pub fn order_by_sql(&self, table_alias: &str) -> String {
        let column = format!("{}.{}", table_alias, self.key.column());
        format!(
            "ORDER BY ({column} IS NULL) ASC, {column} {dir}, {alias}.id ASC",
            column = column,
            dir = self.direction.as_sql(),
            alias = table_alias,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Key {
        Title,
        Rating,
    }

    impl SortKey for Key {
        const DEFAULT: Self = Key::Title;

        fn parse(s: &str) -> Option<Self> {
            match s {
                "title" => Some(Key::Title),
                "rating" => Some(Key::Rating),
                _ => None,
            }
        }

        fn column(&self) -> &'static str {
            match self {
                Key::Title => "title",
                Key::Rating => "rating",
            }
        }
    }

    #[test]
    fn test_resolve_applies_defaults_and_clamps() {
        let limits = PageLimits::default();
        assert_eq!(
            PageRequest::resolve(None, None, limits),
            PageRequest { page: 1, page_size: 20 }
        );
        assert_eq!(
            PageRequest::resolve(Some(0), Some(0), limits),
            PageRequest { page: 1, page_size: 1 }
        );
        assert_eq!(
            PageRequest::resolve(Some(3), Some(5000), limits),
            PageRequest { page: 3, page_size: 100 }
        );
    }

    #[test]
    fn test_offset_and_limit() {
        let request = PageRequest { page: 3, page_size: 25 };
        assert_eq!(request.offset(), 50);
        assert_eq!(request.limit(), 25);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
    }

    #[test]
    fn test_from_vec_pages_in_memory() {
        let request = PageRequest { page: 2, page_size: 3 };
        let page = Page::from_vec((1..=7).collect::<Vec<_>>(), request);
        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(page.total_count, 7);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn test_page_past_the_end_is_empty_with_totals() {
        let request = PageRequest { page: 9, page_size: 3 };
        let page = Page::from_vec((1..=7).collect::<Vec<_>>(), request);
        assert!(page.items.is_empty());
        assert_eq!(page.page, 9);
        assert_eq!(page.total_count, 7);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn test_page_serializes_camel_case() {
        let page = Page::new(vec!["a"], PageRequest { page: 1, page_size: 10 }, 1);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["pageSize"], 10);
        assert_eq!(json["totalCount"], 1);
        assert_eq!(json["totalPages"], 1);
    }

    #[test]
    fn test_sort_spec_recognized_key_keeps_direction() {
        let spec = SortSpec::<Key>::resolve(Some("rating"), Some("desc"));
        assert_eq!(spec.key, Key::Rating);
        assert_eq!(spec.direction, SortDirection::Desc);

        let spec = SortSpec::<Key>::resolve(Some("rating"), Some("sideways"));
        assert_eq!(spec.direction, SortDirection::Asc);
    }

    #[test]
    fn test_sort_spec_unknown_key_falls_back_ascending() {
        let spec = SortSpec::<Key>::resolve(Some("password_hash"), Some("desc"));
        assert_eq!(spec.key, Key::Title);
        assert_eq!(spec.direction, SortDirection::Asc);

        let spec = SortSpec::<Key>::resolve(None, Some("desc"));
        assert_eq!(spec.key, Key::Title);
        assert_eq!(spec.direction, SortDirection::Asc);
    }

    #[test]
    fn test_order_by_sql() {
        let spec = SortSpec {
            key: Key::Rating,
            direction: SortDirection::Desc,
        };
        assert_eq!(
            spec.order_by_sql("s"),
            "ORDER BY (s.rating IS NULL) ASC, s.rating DESC, s.id ASC"
        );
    }
}
