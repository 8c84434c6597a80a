//! Query parameters
//!
//! [`QueryParams`] is rebuilt on every request from the current view and echoed
//! back into links, forms and history entries. The wire names are `page`,
//! `limit`, `sortBy`, `sortOrder`, `searchField` and `searchTerm`.

use crate::field::{EntityField, SortDirection, SortField};
use serde::{Deserialize, Serialize};

/// Page-size policy applied when decoding requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageLimits {
    /// Page size used when none is given
    pub default_page_size: u32,
    /// Largest accepted page size
    pub max_page_size: u32,
}

impl PageLimits {
    /// Clamp a requested page size into `[1, max_page_size]`
    #[inline]
    #[must_use]
    pub fn clamp(&self, requested: u32) -> u32 {
        requested.clamp(1, self.max_page_size.max(1))
    }
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

/// Undecoded query string, every field optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQueryParams {
    /// 1-based page number
    pub page: Option<String>,
    /// Page size
    pub limit: Option<String>,
    /// Sort field name
    pub sort_by: Option<String>,
    /// `asc` or `desc`
    pub sort_order: Option<String>,
    /// Field searched by `search_term`
    pub search_field: Option<String>,
    /// Substring to search for
    pub search_term: Option<String>,
}

/// Decoded, bounded query parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    /// 1-based page number
    pub page: u32,
    /// Rows per page, at least 1
    pub page_size: u32,
    /// Sort key
    pub sort_field: SortField,
    /// Sort direction
    pub sort_dir: SortDirection,
    /// Field the search term applies to
    pub search_field: EntityField,
    /// Case-insensitive substring; empty matches everything
    pub search_term: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireQuery<'a> {
    page: u32,
    limit: u32,
    sort_by: &'a str,
    sort_order: &'a str,
    search_field: &'a str,
    search_term: &'a str,
}

impl QueryParams {
    /// Defaults under the given limits
    #[must_use]
    pub fn with_limits(limits: &PageLimits) -> Self {
        Self {
            page: 1,
            page_size: limits.clamp(limits.default_page_size),
            sort_field: SortField::default(),
            sort_dir: SortDirection::default(),
            search_field: EntityField::Name,
            search_term: String::new(),
        }
    }

    /// Decode a raw query leniently: unparsable values fall back to defaults,
    /// numeric values are clamped into range.
    #[must_use]
    pub fn from_raw(raw: &RawQueryParams, limits: &PageLimits) -> Self {
        let defaults = Self::with_limits(limits);
        let number = |v: &Option<String>| v.as_deref().and_then(|s| s.trim().parse::<i64>().ok());

        let page = number(&raw.page)
            .map_or(defaults.page, |p| u32::try_from(p.max(1)).unwrap_or(u32::MAX));
        let page_size = number(&raw.limit).map_or(defaults.page_size, |l| {
            limits.clamp(u32::try_from(l.max(1)).unwrap_or(u32::MAX))
        });

        Self {
            page,
            page_size,
            sort_field: raw
                .sort_by
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.sort_field),
            sort_dir: raw
                .sort_order
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.sort_dir),
            search_field: raw
                .search_field
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.search_field),
            search_term: raw.search_term.clone().unwrap_or_default(),
        }
    }

    /// Same view, different page
    #[inline]
    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    /// Same view, different search term; resets to the first page
    #[must_use]
    pub fn with_search_term(mut self, term: impl Into<String>) -> Self {
        self.search_term = term.into();
        self.page = 1;
        self
    }

    /// Sort-header click: the same field flips direction, a new field starts ascending
    #[must_use]
    pub fn toggle_sort(mut self, field: SortField) -> Self {
        if self.sort_field == field {
            self.sort_dir = self.sort_dir.flipped();
        } else {
            self.sort_field = field;
            self.sort_dir = SortDirection::Asc;
        }
        self
    }

    /// Lowercased search needle
    #[inline]
    #[must_use]
    pub fn needle(&self) -> String {
        self.search_term.to_lowercase()
    }

    /// URL-encoded query string, without the leading `?`
    #[must_use]
    pub fn to_query_string(&self) -> String {
        serde_urlencoded::to_string(WireQuery {
            page: self.page,
            limit: self.page_size,
            sort_by: self.sort_field.as_str(),
            sort_order: self.sort_dir.as_str(),
            search_field: self.search_field.as_str(),
            search_term: &self.search_term,
        })
        .unwrap_or_default()
    }

    /// Parse a query string produced by [`QueryParams::to_query_string`]
    #[must_use]
    pub fn from_query_string(query: &str, limits: &PageLimits) -> Self {
        let raw: RawQueryParams =
            serde_urlencoded::from_str(query.trim_start_matches('?')).unwrap_or_default();
        Self::from_raw(&raw, limits)
    }
}

impl Default for QueryParams {
    fn default() -> Self {
        Self::with_limits(&PageLimits::default())
    }
}
