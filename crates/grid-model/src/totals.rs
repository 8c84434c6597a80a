//! Aggregate and pagination summaries

use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Summary statistics over a full filtered row set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateTotals {
    /// Σ quantity
    pub total_quantity: u64,
    /// Σ price
    pub total_price: Money,
    /// Σ price × quantity
    pub grand_total: Money,
    /// Mean price, rounded to the cent
    pub average_price: Money,
    /// Number of rows
    pub count: usize,
}

impl AggregateTotals {
    /// Build from exact sums; the average is the only value rounded here
    #[must_use]
    pub fn from_sums(
        count: usize,
        total_quantity: u64,
        total_price_cents: i128,
        grand_total_cents: i128,
    ) -> Self {
        let average = if count == 0 {
            0
        } else {
            let n = i128::try_from(count).unwrap_or(i128::MAX);
            // Half away from zero
            let doubled = total_price_cents * 2;
            let sign = if doubled < 0 { -1 } else { 1 };
            (doubled + sign * n) / (2 * n)
        };
        Self {
            total_quantity,
            total_price: Money::saturating_from_wide(total_price_cents),
            grand_total: Money::saturating_from_wide(grand_total_cents),
            average_price: Money::saturating_from_wide(average),
            count,
        }
    }
}

/// Pagination metadata for one query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Requested page (1-based)
    pub page: u32,
    /// Rows per page
    pub page_size: u32,
    /// Full filtered row count
    pub total: usize,
    /// `ceil(total / page_size)`
    pub total_pages: u32,
    /// `page < total_pages`
    pub has_next: bool,
    /// `page > 1`
    pub has_prev: bool,
}

impl PageInfo {
    /// Derive pagination metadata
    #[must_use]
    pub fn new(page: u32, page_size: u32, total: usize) -> Self {
        let size = usize::try_from(page_size.max(1)).unwrap_or(usize::MAX);
        let total_pages = u32::try_from(total.div_ceil(size)).unwrap_or(u32::MAX);
        Self {
            page,
            page_size,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_rounds_once() {
        // 1.00 + 1.00 + 1.01 = 3.01 / 3 = 1.0033 -> 1.00
        let totals = AggregateTotals::from_sums(3, 0, 301, 0);
        assert_eq!(totals.average_price, Money::from_cents(100));
        // 0.01 + 0.02 = 0.03 / 2 = 0.015 -> 0.02
        let totals = AggregateTotals::from_sums(2, 0, 3, 0);
        assert_eq!(totals.average_price, Money::from_cents(2));
    }

    #[test]
    fn empty_set_has_zero_average() {
        let totals = AggregateTotals::from_sums(0, 0, 0, 0);
        assert_eq!(totals, AggregateTotals::default());
    }

    #[test]
    fn page_info_bounds() {
        let info = PageInfo::new(3, 10, 50);
        assert_eq!(info.total_pages, 5);
        assert!(info.has_next && info.has_prev);

        let last = PageInfo::new(5, 10, 41);
        assert_eq!(last.total_pages, 5);
        assert!(!last.has_next);

        let empty = PageInfo::new(1, 10, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next && !empty.has_prev);
    }
}
