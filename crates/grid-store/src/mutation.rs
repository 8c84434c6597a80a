//! Mutation service
//!
//! Validates and applies single-field writes and deletions. Checks run in a
//! fixed order: unknown id, numeric validation, then the failure sentinel.

use crate::error::{StoreError, Violation};
use crate::store::RecordStore;
use grid_model::{AggregateTotals, EditableField, Entity, EntityId, Money, QueryParams};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Field bounds and the failure sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationPolicy {
    /// Lowest accepted price
    #[serde(rename = "min_price_cents")]
    pub min_price: Money,
    /// Highest accepted price
    #[serde(rename = "max_price_cents")]
    pub max_price: Money,
    /// Highest accepted quantity
    pub max_quantity: u64,
    /// Whole value that always fails with a simulated server error
    pub failure_sentinel: Option<u64>,
}

impl Default for MutationPolicy {
    fn default() -> Self {
        Self {
            min_price: Money::ZERO,
            max_price: Money::from_cents(100_000_000),
            max_quantity: 1_000_000,
            failure_sentinel: Some(999),
        }
    }
}

/// Normalized value ready to be written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldValue {
    Price(Money),
    Quantity(u64),
}

impl MutationPolicy {
    /// Parse and bound-check a raw value for a field
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn normalize(&self, field: EditableField, raw: &str) -> Result<FieldValue, StoreError> {
        let invalid = |violation| StoreError::Validation { field, violation };
        let number = raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| invalid(Violation::NotANumber(raw.to_string())))?;

        match field {
            EditableField::Price => {
                let price = Money::from_decimal(number)
                    .ok_or_else(|| invalid(Violation::NotANumber(raw.to_string())))?;
                if price < self.min_price.max(Money::ZERO) {
                    return Err(invalid(Violation::BelowMinimum {
                        value: price.to_string(),
                        min: self.min_price.max(Money::ZERO).to_string(),
                    }));
                }
                if price > self.max_price {
                    return Err(invalid(Violation::AboveMaximum {
                        value: price.to_string(),
                        max: self.max_price.to_string(),
                    }));
                }
                Ok(FieldValue::Price(price))
            }
            EditableField::Quantity => {
                if number < 0.0 {
                    return Err(invalid(Violation::BelowMinimum {
                        value: raw.trim().to_string(),
                        min: "0".to_string(),
                    }));
                }
                let floored = number.floor();
                let max = self.max_quantity as f64;
                if floored > max {
                    return Err(invalid(Violation::AboveMaximum {
                        value: raw.trim().to_string(),
                        max: self.max_quantity.to_string(),
                    }));
                }
                let quantity = floored as u64;
                Ok(FieldValue::Quantity(quantity))
            }
        }
    }

    fn is_sentinel(&self, value: FieldValue) -> bool {
        let Some(sentinel) = self.failure_sentinel else {
            return false;
        };
        match value {
            FieldValue::Price(price) => {
                i64::try_from(sentinel).is_ok_and(|s| price.cents() == s.saturating_mul(100))
            }
            FieldValue::Quantity(quantity) => quantity == sentinel,
        }
    }
}

/// Validated writes against a shared [`RecordStore`]
#[derive(Debug, Clone)]
pub struct MutationService {
    store: Arc<RecordStore>,
    policy: MutationPolicy,
}

impl MutationService {
    /// Create with the default policy
    #[inline]
    #[must_use]
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self::with_policy(store, MutationPolicy::default())
    }

    /// Create with an explicit policy
    #[inline]
    #[must_use]
    pub fn with_policy(store: Arc<RecordStore>, policy: MutationPolicy) -> Self {
        Self { store, policy }
    }

    /// Active policy
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &MutationPolicy {
        &self.policy
    }

    /// Backing store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// Write one editable field
    ///
    /// # Errors
    /// - `StoreError::NotFound` if `id` is unknown
    /// - `StoreError::Validation` if `raw` is not a number or out of bounds
    /// - `StoreError::SimulatedFailure` if the normalized value is the sentinel
    pub fn update_field(
        &self,
        id: EntityId,
        field: EditableField,
        raw: &str,
    ) -> Result<Entity, StoreError> {
        let result = self.store.modify(id, |current| self.apply(current, field, raw));
        Self::log_update(id, field, raw, result.as_ref());
        result
    }

    /// [`update_field`](Self::update_field), returning the totals over the
    /// rows matching `scope` as they stand right after this write
    ///
    /// # Errors
    /// As [`update_field`](Self::update_field)
    pub fn update_field_in(
        &self,
        id: EntityId,
        field: EditableField,
        raw: &str,
        scope: &QueryParams,
    ) -> Result<(Entity, AggregateTotals), StoreError> {
        let result = self
            .store
            .modify_and_total(id, scope, |current| self.apply(current, field, raw));
        Self::log_update(id, field, raw, result.as_ref().map(|(entity, _)| entity));
        result
    }

    fn apply(&self, current: &Entity, field: EditableField, raw: &str) -> Result<Entity, StoreError> {
        let value = self.policy.normalize(field, raw)?;
        if self.policy.is_sentinel(value) {
            return Err(StoreError::SimulatedFailure {
                field,
                value: match value {
                    FieldValue::Price(p) => p.to_string(),
                    FieldValue::Quantity(q) => q.to_string(),
                },
            });
        }
        let mut updated = current.clone();
        match value {
            FieldValue::Price(price) => updated.price = price,
            FieldValue::Quantity(quantity) => updated.quantity = quantity,
        }
        Ok(updated)
    }

    fn log_update(id: EntityId, field: EditableField, raw: &str, result: Result<&Entity, &StoreError>) {
        match result {
            Ok(entity) => tracing::info!(%id, %field, value = %entity.editable_text(field), "field updated"),
            Err(error) => tracing::warn!(%id, %field, raw, %error, "field update rejected"),
        }
    }

    /// Remove an entity permanently
    ///
    /// # Errors
    /// - `StoreError::NotFound` if `id` is unknown
    pub fn delete_entity(&self, id: EntityId) -> Result<(), StoreError> {
        let removed = self.store.remove(id)?;
        tracing::info!(%id, name = %removed.name, "entity deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> MutationService {
        let store = Arc::new(RecordStore::new(vec![Entity {
            id: EntityId(1),
            name: "Desk Lamp".to_string(),
            price: Money::from_cents(12_000),
            quantity: 3,
            category: "Lighting".to_string(),
        }]));
        MutationService::new(store)
    }

    #[test]
    fn price_update_rounds_to_cents() {
        let svc = service();
        let updated = svc.update_field(EntityId(1), EditableField::Price, "45.678").unwrap();
        assert_eq!(updated.price, Money::from_cents(4_568));
        assert_eq!(svc.store().get(EntityId(1)).unwrap().price, Money::from_cents(4_568));
    }

    #[test]
    fn scoped_update_returns_totals_with_the_write() {
        let svc = service();
        let (updated, totals) = svc
            .update_field_in(EntityId(1), EditableField::Quantity, "5", &QueryParams::default())
            .unwrap();
        assert_eq!(updated.quantity, 5);
        assert_eq!(totals.total_quantity, 5);
        assert_eq!(totals.grand_total, Money::from_cents(60_000));

        assert!(svc
            .update_field_in(EntityId(1), EditableField::Price, "999", &QueryParams::default())
            .is_err());
        assert_eq!(svc.store().get(EntityId(1)).unwrap().price, Money::from_cents(12_000));
    }

    #[test]
    fn quantity_is_floored() {
        let svc = service();
        let updated = svc.update_field(EntityId(1), EditableField::Quantity, "7.9").unwrap();
        assert_eq!(updated.quantity, 7);
    }

    #[test]
    fn unknown_id_is_not_found() {
        let svc = service();
        assert_eq!(
            svc.update_field(EntityId(9), EditableField::Price, "1"),
            Err(StoreError::NotFound(EntityId(9)))
        );
    }

    #[test]
    fn nan_and_garbage_are_rejected() {
        let svc = service();
        for raw in ["NaN", "abc", "", "inf"] {
            let err = svc.update_field(EntityId(1), EditableField::Price, raw).unwrap_err();
            assert!(matches!(
                err,
                StoreError::Validation { violation: Violation::NotANumber(_), .. }
            ));
        }
    }

    #[test]
    fn bounds_are_enforced() {
        let svc = service();
        assert!(svc.update_field(EntityId(1), EditableField::Price, "-0.01").is_err());
        assert!(svc.update_field(EntityId(1), EditableField::Price, "1000000.01").is_err());
        assert!(svc.update_field(EntityId(1), EditableField::Price, "1000000").is_ok());
        assert!(svc.update_field(EntityId(1), EditableField::Quantity, "1000001").is_err());
    }

    #[test]
    fn sentinel_fails_regardless_of_state() {
        let svc = service();
        for raw in ["999", "999.00", "999.001"] {
            let err = svc.update_field(EntityId(1), EditableField::Price, raw).unwrap_err();
            assert!(matches!(err, StoreError::SimulatedFailure { .. }));
            assert!(!err.is_client_error());
        }
        let err = svc
            .update_field(EntityId(1), EditableField::Quantity, "999.5")
            .unwrap_err();
        assert!(matches!(err, StoreError::SimulatedFailure { .. }));
        assert_eq!(svc.store().get(EntityId(1)).unwrap().price, Money::from_cents(12_000));
    }

    #[test]
    fn negative_quantity_fails_before_sentinel_check() {
        let svc = service();
        let err = svc
            .update_field(EntityId(1), EditableField::Quantity, "-999")
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation { violation: Violation::BelowMinimum { .. }, .. }
        ));
        assert!(err.is_client_error());
    }

    #[test]
    fn delete_then_update_is_not_found() {
        let svc = service();
        svc.delete_entity(EntityId(1)).unwrap();
        assert_eq!(svc.delete_entity(EntityId(1)), Err(StoreError::NotFound(EntityId(1))));
        assert!(matches!(
            svc.update_field(EntityId(1), EditableField::Price, "1"),
            Err(StoreError::NotFound(_))
        ));
    }
}
