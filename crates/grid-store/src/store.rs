//! Authoritative in-memory record collection
//!
//! Reads take a shared lock for the whole filter/sort/aggregate pass and writes
//! take the exclusive lock for lookup, validation and assignment, so no reader
//! ever observes a half-applied write.

use crate::aggregate::aggregate;
use crate::error::StoreError;
use crate::query::{filter_sorted, paginate, QueryOutcome};
use grid_model::{AggregateTotals, Entity, EntityId, PageInfo, QueryParams};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// In-memory entity collection keyed by id
#[derive(Debug, Default)]
pub struct RecordStore {
    rows: RwLock<BTreeMap<EntityId, Entity>>,
}

impl RecordStore {
    /// Create a store from seed entities; later duplicates replace earlier ones
    #[must_use]
    pub fn new(entities: impl IntoIterator<Item = Entity>) -> Self {
        Self {
            rows: RwLock::new(entities.into_iter().map(|e| (e.id, e)).collect()),
        }
    }

    /// Number of entities
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Whether the store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Clone of one entity
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<Entity> {
        self.rows.read().get(&id).cloned()
    }

    /// Clone of every entity in id order
    #[must_use]
    pub fn snapshot(&self) -> Vec<Entity> {
        self.rows.read().values().cloned().collect()
    }

    /// Run a full query against one consistent snapshot
    ///
    /// Totals cover the whole filtered set; rows cover the requested page only.
    #[must_use]
    pub fn query(&self, params: &QueryParams) -> QueryOutcome {
        let (rows, total, totals) = {
            let guard = self.rows.read();
            let filtered = filter_sorted(guard.values(), params);
            let rows: Vec<Entity> = paginate(&filtered, params.page, params.page_size)
                .iter()
                .map(|e| (*e).clone())
                .collect();
            let totals = aggregate(filtered.iter().copied());
            (rows, filtered.len(), totals)
        };

        QueryOutcome {
            params: params.clone(),
            rows,
            page: PageInfo::new(params.page, params.page_size, total),
            totals,
        }
    }

    /// Apply `f` to one entity under the write lock
    ///
    /// `f` may reject the change; nothing is written unless it returns `Ok`.
    pub(crate) fn modify<F>(&self, id: EntityId, f: F) -> Result<Entity, StoreError>
    where
        F: FnOnce(&Entity) -> Result<Entity, StoreError>,
    {
        let mut guard = self.rows.write();
        Self::write_locked(&mut guard, id, f)
    }

    /// [`modify`](Self::modify), then total the rows matching `scope`
    ///
    /// Both happen under one write lock, so the totals include exactly this
    /// write and nothing newer.
    pub(crate) fn modify_and_total<F>(
        &self,
        id: EntityId,
        scope: &QueryParams,
        f: F,
    ) -> Result<(Entity, AggregateTotals), StoreError>
    where
        F: FnOnce(&Entity) -> Result<Entity, StoreError>,
    {
        let mut guard = self.rows.write();
        let updated = Self::write_locked(&mut guard, id, f)?;
        let totals = aggregate(filter_sorted(guard.values(), scope).iter().copied());
        Ok((updated, totals))
    }

    fn write_locked<F>(
        rows: &mut BTreeMap<EntityId, Entity>,
        id: EntityId,
        f: F,
    ) -> Result<Entity, StoreError>
    where
        F: FnOnce(&Entity) -> Result<Entity, StoreError>,
    {
        let current = rows.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        let updated = f(current)?;
        debug_assert_eq!(updated.id, id, "entity ids are immutable");
        *current = updated.clone();
        Ok(updated)
    }

    /// Remove an entity permanently
    pub(crate) fn remove(&self, id: EntityId) -> Result<Entity, StoreError> {
        self.rows.write().remove(&id).ok_or(StoreError::NotFound(id))
    }
}
