//! Aggregate totals over arbitrary row sets
//!
//! Sums are accumulated exactly in cents; only the average is rounded, once,
//! when the totals are produced.

use grid_model::{AggregateTotals, Entity};

/// Compute totals over any set of rows
#[must_use]
pub fn aggregate<'a>(rows: impl IntoIterator<Item = &'a Entity>) -> AggregateTotals {
    let mut count = 0usize;
    let mut quantity = 0u64;
    let mut price = 0i128;
    let mut grand = 0i128;

    for row in rows {
        count += 1;
        quantity = quantity.saturating_add(row.quantity);
        price += i128::from(row.price.cents());
        grand += row.price.times(row.quantity);
    }

    AggregateTotals::from_sums(count, quantity, price, grand)
}
