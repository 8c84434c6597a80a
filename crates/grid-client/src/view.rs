//! Client view-model
//!
//! [`GridView`] holds what the server last said: the applied query, the page,
//! the rows and the totals baseline. Display values are derived on demand by
//! laying the cells' speculative values over that baseline, so totals are
//! always recomputed from scratch rather than patched incrementally.

use crate::cell::{CellKey, CellMachine};
use crate::fragment::TableFragment;
use grid_model::{AggregateTotals, EditableField, Entity, EntityId, Money, PageInfo, QueryParams};
use std::collections::HashMap;

/// Last server-confirmed view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridView {
    /// Query the server applied
    pub params: QueryParams,
    /// Pagination metadata
    pub page: PageInfo,
    /// Confirmed rows, in display order
    pub rows: Vec<Entity>,
    /// Confirmed totals over the full filtered set
    pub baseline: AggregateTotals,
}

impl Default for GridView {
    fn default() -> Self {
        let params = QueryParams::default();
        Self {
            page: PageInfo::new(params.page, params.page_size, 0),
            params,
            rows: Vec::new(),
            baseline: AggregateTotals::default(),
        }
    }
}

impl From<TableFragment> for GridView {
    fn from(table: TableFragment) -> Self {
        Self {
            params: table.params,
            page: table.page,
            rows: table.rows,
            baseline: table.totals,
        }
    }
}

impl GridView {
    /// Row by id
    #[must_use]
    pub fn row(&self, id: EntityId) -> Option<&Entity> {
        self.rows.iter().find(|r| r.id == id)
    }

    /// Swap in the server's copy of a row; `false` if it is not on this page
    pub fn replace_row(&mut self, entity: Entity) -> bool {
        match self.rows.iter_mut().find(|r| r.id == entity.id) {
            Some(row) => {
                *row = entity;
                true
            }
            None => false,
        }
    }
}

/// A row's numbers with any speculative values applied
///
/// Quantities are signed here: a candidate like `-5` is displayed until the
/// server rejects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveRow {
    /// Price in cents
    pub price_cents: i64,
    /// Quantity, possibly negative
    pub quantity: i64,
}

impl EffectiveRow {
    /// Confirmed numbers of a row
    #[must_use]
    pub fn confirmed(entity: &Entity) -> Self {
        Self {
            price_cents: entity.price.cents(),
            quantity: i64::try_from(entity.quantity).unwrap_or(i64::MAX),
        }
    }

    /// Apply a candidate text; unparsable text leaves the field unchanged
    #[must_use]
    pub fn with_candidate(mut self, field: EditableField, text: &str) -> Self {
        let Some(value) = text.trim().parse::<f64>().ok().filter(|v| v.is_finite()) else {
            return self;
        };
        match field {
            EditableField::Price => {
                if let Some(money) = Money::from_decimal(value) {
                    self.price_cents = money.cents();
                }
            }
            EditableField::Quantity => {
                #[allow(clippy::cast_possible_truncation)]
                let floored = value.floor() as i64;
                self.quantity = floored;
            }
        }
        self
    }

    /// `price × quantity` in cents
    #[inline]
    #[must_use]
    pub fn subtotal_cents(&self) -> i128 {
        i128::from(self.price_cents) * i128::from(self.quantity)
    }

    /// Subtotal as money
    #[must_use]
    pub fn subtotal(&self) -> Money {
        Money::saturating_from_wide(self.subtotal_cents())
    }
}

/// Row numbers with both editable cells' overlays applied
#[must_use]
pub fn effective_row(entity: &Entity, cells: &HashMap<CellKey, CellMachine>) -> EffectiveRow {
    EditableField::ALL
        .iter()
        .fold(EffectiveRow::confirmed(entity), |row, field| {
            match cells
                .get(&CellKey::new(entity.id, *field))
                .and_then(CellMachine::speculative_value)
            {
                Some(candidate) => row.with_candidate(*field, candidate),
                None => row,
            }
        })
}

/// Totals to display: the server baseline shifted by every live overlay on the page
#[must_use]
pub fn display_totals(view: &GridView, cells: &HashMap<CellKey, CellMachine>) -> AggregateTotals {
    let base = &view.baseline;
    let (mut quantity, mut price, mut grand) = (
        i128::from(base.total_quantity),
        i128::from(base.total_price.cents()),
        i128::from(base.grand_total.cents()),
    );
    for entity in &view.rows {
        let confirmed = EffectiveRow::confirmed(entity);
        let shown = effective_row(entity, cells);
        if shown == confirmed {
            continue;
        }
        quantity += i128::from(shown.quantity) - i128::from(confirmed.quantity);
        price += i128::from(shown.price_cents) - i128::from(confirmed.price_cents);
        grand += shown.subtotal_cents() - confirmed.subtotal_cents();
    }
    let quantity = u64::try_from(quantity.max(0)).unwrap_or(u64::MAX);
    AggregateTotals::from_sums(base.count, quantity, price, grand)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CommitDecision;
    use pretty_assertions::assert_eq;

    fn entity(id: u64, cents: i64, quantity: u64) -> Entity {
        Entity {
            id: EntityId(id),
            name: format!("Item {id}"),
            price: Money::from_cents(cents),
            quantity,
            category: "Misc".to_string(),
        }
    }

    fn view() -> GridView {
        let rows = vec![entity(1, 12_000, 3), entity(2, 1_000, 10)];
        GridView {
            params: QueryParams::default(),
            page: PageInfo::new(1, 10, 2),
            baseline: AggregateTotals::from_sums(2, 13, 13_000, 46_000),
            rows,
        }
    }

    fn pending(cells: &mut HashMap<CellKey, CellMachine>, key: CellKey, shown: &str, value: &str) {
        let machine = cells.entry(key).or_insert_with(|| CellMachine::new(key));
        machine.begin(shown).unwrap();
        machine.set_draft(value).unwrap();
        assert!(matches!(
            machine.commit().unwrap(),
            CommitDecision::Dispatch { .. }
        ));
    }

    #[test]
    fn no_overlays_means_baseline() {
        let view = view();
        assert_eq!(display_totals(&view, &HashMap::new()), view.baseline);
    }

    #[test]
    fn price_overlay_shifts_totals() {
        let view = view();
        let mut cells = HashMap::new();
        pending(
            &mut cells,
            CellKey::new(EntityId(1), EditableField::Price),
            "120.00",
            "150.00",
        );
        let row = effective_row(&view.rows[0], &cells);
        assert_eq!(row.subtotal(), Money::from_cents(45_000));

        let totals = display_totals(&view, &cells);
        assert_eq!(totals.grand_total, Money::from_cents(55_000));
        assert_eq!(totals.total_price, Money::from_cents(16_000));
        assert_eq!(totals.average_price, Money::from_cents(8_000));
        assert_eq!(totals.total_quantity, 13);
    }

    #[test]
    fn both_overlays_feed_the_subtotal() {
        let view = view();
        let mut cells = HashMap::new();
        pending(
            &mut cells,
            CellKey::new(EntityId(1), EditableField::Price),
            "120.00",
            "100",
        );
        pending(
            &mut cells,
            CellKey::new(EntityId(1), EditableField::Quantity),
            "3",
            "4.9",
        );
        assert_eq!(
            effective_row(&view.rows[0], &cells),
            EffectiveRow {
                price_cents: 10_000,
                quantity: 4
            }
        );
    }

    #[test]
    fn negative_quantity_is_shown_until_rejected() {
        let view = view();
        let mut cells = HashMap::new();
        pending(
            &mut cells,
            CellKey::new(EntityId(1), EditableField::Quantity),
            "3",
            "-5",
        );
        let totals = display_totals(&view, &cells);
        assert_eq!(totals.total_quantity, 5);
        assert_eq!(totals.grand_total, Money::from_cents(46_000 - 36_000 - 60_000));
    }

    #[test]
    fn unparsable_candidate_keeps_confirmed_number() {
        let view = view();
        let mut cells = HashMap::new();
        pending(
            &mut cells,
            CellKey::new(EntityId(2), EditableField::Price),
            "10.00",
            "abc",
        );
        assert_eq!(display_totals(&view, &cells), view.baseline);
    }

    proptest::proptest! {
        #[test]
        fn overlay_totals_match_recomputing_the_edited_page(
            cents in 1_001_i64..10_000_000,
            quantity in 11_u64..10_000,
        ) {
            let view = view();
            let mut cells = HashMap::new();
            pending(
                &mut cells,
                CellKey::new(EntityId(2), EditableField::Price),
                "10.00",
                &Money::from_cents(cents).to_string(),
            );
            pending(
                &mut cells,
                CellKey::new(EntityId(2), EditableField::Quantity),
                "10",
                &quantity.to_string(),
            );

            let price = 12_000 + i128::from(cents);
            let grand = 36_000 + i128::from(cents) * i128::from(quantity);
            let expected = AggregateTotals::from_sums(2, 3 + quantity, price, grand);
            proptest::prop_assert_eq!(display_totals(&view, &cells), expected);
        }
    }
}
