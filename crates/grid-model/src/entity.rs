//! Table records

use crate::field::{EditableField, EntityField, SortField};
use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Unique, immutable record identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(EntityId)
    }
}

/// One row of the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Identifier
    pub id: EntityId,
    /// Display name
    pub name: String,
    /// Unit price, never negative
    pub price: Money,
    /// Units in stock
    pub quantity: u64,
    /// Category label
    pub category: String,
}

/// Comparable value extracted from an entity for sorting
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey {
    /// Integer-valued column
    Int(i128),
    /// Text column, compared case-insensitively
    Text(String),
}

impl Entity {
    /// `price × quantity` in cents
    #[inline]
    #[must_use]
    pub fn subtotal(&self) -> Money {
        Money::saturating_from_wide(self.price.times(self.quantity))
    }

    /// Textual value of a field, as rendered and searched
    #[must_use]
    pub fn field_text(&self, field: EntityField) -> String {
        match field {
            EntityField::Id => self.id.to_string(),
            EntityField::Name => self.name.clone(),
            EntityField::Price => self.price.to_string(),
            EntityField::Quantity => self.quantity.to_string(),
            EntityField::Category => self.category.clone(),
        }
    }

    /// Editable value as its display text
    #[must_use]
    pub fn editable_text(&self, field: EditableField) -> String {
        self.field_text(field.into())
    }

    /// Sort key for a field; blank text counts as undefined
    #[must_use]
    pub fn sort_key(&self, field: SortField) -> Option<SortKey> {
        let text = |s: &str| {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| SortKey::Text(trimmed.to_lowercase()))
        };
        match field {
            SortField::Id => Some(SortKey::Int(i128::from(self.id.0))),
            SortField::Name => text(&self.name),
            SortField::Price => Some(SortKey::Int(i128::from(self.price.cents()))),
            SortField::Quantity => Some(SortKey::Int(i128::from(self.quantity))),
            SortField::Category => text(&self.category),
            SortField::Subtotal => Some(SortKey::Int(self.price.times(self.quantity))),
        }
    }

    /// Case-insensitive substring match on one field; empty needle matches all
    #[must_use]
    pub fn matches(&self, field: EntityField, needle_lower: &str) -> bool {
        needle_lower.is_empty() || self.field_text(field).to_lowercase().contains(needle_lower)
    }
}

/// Compare two optional keys: undefined sorts first in both directions,
/// and only defined-vs-defined comparisons are flipped by `descending`.
#[must_use]
pub fn compare_keys(a: Option<&SortKey>, b: Option<&SortKey>, descending: bool) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) if descending => y.cmp(x),
        (Some(x), Some(y)) => x.cmp(y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lamp() -> Entity {
        Entity {
            id: EntityId(7),
            name: "Desk Lamp".to_string(),
            price: Money::from_cents(12_000),
            quantity: 3,
            category: String::new(),
        }
    }

    #[test]
    fn subtotal_is_computed_not_stored() {
        assert_eq!(lamp().subtotal(), Money::from_cents(36_000));
        assert_eq!(
            lamp().sort_key(SortField::Subtotal),
            Some(SortKey::Int(36_000))
        );
    }

    #[test]
    fn blank_text_is_undefined() {
        assert_eq!(lamp().sort_key(SortField::Category), None);
    }

    #[test]
    fn undefined_sorts_first_regardless_of_direction() {
        let defined = SortKey::Int(1);
        assert_eq!(compare_keys(None, Some(&defined), false), Ordering::Less);
        assert_eq!(compare_keys(None, Some(&defined), true), Ordering::Less);
        assert_eq!(
            compare_keys(Some(&SortKey::Int(1)), Some(&SortKey::Int(2)), true),
            Ordering::Greater
        );
    }

    #[test]
    fn search_is_case_insensitive() {
        assert!(lamp().matches(EntityField::Name, "lamp"));
        assert!(lamp().matches(EntityField::Price, "120"));
        assert!(!lamp().matches(EntityField::Name, "chair"));
        assert!(lamp().matches(EntityField::Name, ""));
    }
}
