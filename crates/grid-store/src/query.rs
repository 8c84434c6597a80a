//! Query engine: filter → sort → paginate
//!
//! Pure functions over borrowed rows. [`RecordStore::query`] composes them
//! under one read lock and adds the aggregate pass.
//!
//! [`RecordStore::query`]: crate::RecordStore::query

use grid_model::{compare_keys, AggregateTotals, Entity, PageInfo, QueryParams, SortDirection};

/// Page of rows plus the full filtered count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    /// Rows on the requested page
    pub rows: Vec<Entity>,
    /// Full filtered row count
    pub total: usize,
}

/// Everything a table fragment needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    /// Parameters the outcome was computed for
    pub params: QueryParams,
    /// Rows on the requested page
    pub rows: Vec<Entity>,
    /// Pagination metadata
    pub page: PageInfo,
    /// Totals over the full filtered set
    pub totals: AggregateTotals,
}

/// Run filter, sort and pagination over any row set
#[must_use]
pub fn query<'a>(rows: impl IntoIterator<Item = &'a Entity>, params: &QueryParams) -> QueryResult {
    let filtered = filter_sorted(rows, params);
    QueryResult {
        total: filtered.len(),
        rows: paginate(&filtered, params.page, params.page_size)
            .iter()
            .map(|e| (*e).clone())
            .collect(),
    }
}

/// Filter then sort, keeping borrowed rows
///
/// Ties on the sort key fall back to ascending id so the order is total.
#[must_use]
pub fn filter_sorted<'a>(
    rows: impl IntoIterator<Item = &'a Entity>,
    params: &QueryParams,
) -> Vec<&'a Entity> {
    let needle = params.needle();
    let descending = params.sort_dir == SortDirection::Desc;

    let mut keyed: Vec<_> = rows
        .into_iter()
        .filter(|e| e.matches(params.search_field, &needle))
        .map(|e| (e.sort_key(params.sort_field), e))
        .collect();

    keyed.sort_by(|(ka, a), (kb, b)| {
        compare_keys(ka.as_ref(), kb.as_ref(), descending).then_with(|| a.id.cmp(&b.id))
    });

    keyed.into_iter().map(|(_, e)| e).collect()
}

/// Slice out one page; pages past the end are empty
#[must_use]
pub fn paginate<T>(rows: &[T], page: u32, page_size: u32) -> &[T] {
    let size = usize::try_from(page_size.max(1)).unwrap_or(usize::MAX);
    let index = usize::try_from(page.max(1) - 1).unwrap_or(usize::MAX);
    let start = index.saturating_mul(size);
    if start >= rows.len() {
        return &[];
    }
    let end = start.saturating_add(size).min(rows.len());
    &rows[start..end]
}
