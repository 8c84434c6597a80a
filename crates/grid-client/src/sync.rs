//! Optimistic edit synchronizer
//!
//! Owns the view-model and one [`CellMachine`] per touched cell, and drives
//! them against a [`GridTransport`]:
//! - commits render the candidate value, row subtotal and totals immediately
//! - each commit's response is matched against the cell's latest ticket, so a
//!   slow response can never overwrite a newer edit
//! - on success the server's row and totals replace the local guess
//! - on failure the cell shows the error, restores its original value after
//!   one delay and clears the indicator after another
//!
//! Whole-table replacements (loads, navigations, deletions) draw from one
//! generation counter; a table is applied only if no later table request was
//! issued.
//!
//! State lives behind one lock; render instructions are collected while it is
//! held and delivered after it is released.

use crate::cell::{
    CellDisplay, CellKey, CellMachine, CellPhase, CommitDecision, Outcome, PendingEdit, Resolution,
    Ticket,
};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::fragment::{parse_row_fragment, parse_table_fragment, RowFragment, TableFragment};
use crate::presenter::{CellObserver, Presenter};
use crate::transport::{classify, GridTransport, HttpResponse};
use crate::view::{display_totals, effective_row, GridView};
use dashmap::DashMap;
use grid_model::{AggregateTotals, EntityId, Money, QueryParams};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Outcome of [`Synchronizer::commit_edit`]
#[derive(Debug)]
pub enum Commit {
    /// The value did not change; nothing was sent
    Unchanged,
    /// A write is in flight
    Dispatched {
        /// Ticket of the write
        ticket: Ticket,
        /// Resolves once the response is absorbed and any revert has run
        task: JoinHandle<Resolution>,
    },
}

#[derive(Debug, Default)]
struct GridState {
    view: GridView,
    cells: HashMap<CellKey, CellMachine>,
}

enum Render {
    Cell(CellKey, CellDisplay),
    Subtotal(EntityId, Money),
    Totals(AggregateTotals),
    View(GridView),
    FocusCell(CellKey),
}

impl GridState {
    fn authoritative(&self, key: CellKey) -> Result<String, ClientError> {
        self.view
            .row(key.row)
            .map(|entity| entity.editable_text(key.field))
            .ok_or(ClientError::UnknownRow(key.row))
    }

    fn cell_display(&self, key: CellKey) -> Option<CellDisplay> {
        let text = self.view.row(key.row)?.editable_text(key.field);
        Some(match self.cells.get(&key) {
            Some(machine) => machine.display(&text),
            None => CellDisplay::Value {
                text,
                speculative: false,
            },
        })
    }

    fn render_cell(&self, key: CellKey, out: &mut Vec<Render>) {
        if let Some(display) = self.cell_display(key) {
            out.push(Render::Cell(key, display));
        }
    }

    fn render_row(&self, row: EntityId, out: &mut Vec<Render>) {
        if let Some(entity) = self.view.row(row) {
            out.push(Render::Subtotal(row, effective_row(entity, &self.cells).subtotal()));
        }
        out.push(Render::Totals(display_totals(&self.view, &self.cells)));
    }
}

struct Inner {
    transport: Arc<dyn GridTransport>,
    presenter: Arc<dyn Presenter>,
    config: ClientConfig,
    state: Mutex<GridState>,
    observers: DashMap<CellKey, CellObserver>,
    generation: AtomicU64,
}

impl Inner {
    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_latest(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn flush(&self, renders: Vec<Render>) {
        for render in renders {
            match render {
                Render::Cell(key, display) => {
                    let observer = self.observers.get(&key).map(|o| Arc::clone(o.value()));
                    if let Some(observer) = observer {
                        observer(key, &display);
                    }
                }
                Render::Subtotal(row, subtotal) => self.presenter.row_subtotal(row, subtotal),
                Render::Totals(totals) => self.presenter.totals(&totals),
                Render::View(view) => self.presenter.replace_view(&view),
                Render::FocusCell(key) => self.presenter.focus_cell(key),
            }
        }
    }

    fn apply_table(&self, generation: u64, table: TableFragment) -> Result<(), ClientError> {
        let observed: Vec<CellKey> = self.observers.iter().map(|entry| *entry.key()).collect();
        let renders = {
            let mut state = self.state.lock();
            if !self.is_latest(generation) {
                debug!(generation, "dropping table for a superseded request");
                return Err(ClientError::RequestSuperseded);
            }
            state.view = GridView::from(table);
            state.cells.retain(|_, machine| !machine.is_idle());

            let mut renders = vec![Render::View(state.view.clone())];
            for key in observed {
                state.render_cell(key, &mut renders);
            }
            for entity in &state.view.rows {
                let shown = effective_row(entity, &state.cells);
                if shown.subtotal() != entity.subtotal() {
                    renders.push(Render::Subtotal(entity.id, shown.subtotal()));
                }
            }
            renders.push(Render::Totals(display_totals(&state.view, &state.cells)));
            renders
        };
        self.flush(renders);
        Ok(())
    }

    async fn delete(&self, id: EntityId, params: &QueryParams) -> Result<(), ClientError> {
        let generation = self.next_generation();
        let response = self.transport.delete(id, params).await;
        let table = match classify(response).and_then(|body| parse_table_fragment(&body)) {
            Ok(table) => table,
            Err(error) => {
                warn!(%id, %error, "delete failed");
                return Err(error);
            }
        };
        info!(%id, "row deleted");
        match self.apply_table(generation, table) {
            Err(ClientError::RequestSuperseded) => {
                debug!(%id, "newer view requested; refreshed table dropped");
                Ok(())
            }
            applied => applied,
        }
    }

    fn confirmed_row(
        key: CellKey,
        response: Result<HttpResponse, ClientError>,
    ) -> Result<RowFragment, ClientError> {
        let row = classify(response).and_then(|body| parse_row_fragment(&body))?;
        if row.entity.id == key.row {
            Ok(row)
        } else {
            Err(ClientError::MalformedResponse(format!(
                "response is for row {}, expected {}",
                row.entity.id, key.row
            )))
        }
    }

    async fn reconcile(
        &self,
        key: CellKey,
        ticket: Ticket,
        params: &QueryParams,
        response: Result<HttpResponse, ClientError>,
    ) -> Resolution {
        let parsed = Self::confirmed_row(key, response);
        let (resolution, renders) = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let shown = state.cell_display(key);
            let Some(machine) = state.cells.get_mut(&key) else {
                return Resolution::Stale;
            };
            if !machine.is_current(ticket) {
                let Ok(row) = parsed else {
                    debug!(%key, ticket = ticket.0, "discarding superseded response");
                    return Resolution::Stale;
                };
                let confirmed = row.entity.editable_text(key.field);
                if machine.resolve(ticket, Outcome::Confirmed(confirmed)) != Resolution::Settled {
                    debug!(%key, ticket = ticket.0, "discarding superseded response");
                    return Resolution::Stale;
                }
                debug!(%key, ticket = ticket.0, "superseded write landed; revert target moved");
                state.view.replace_row(row.entity);
                if state.view.params == *params {
                    state.view.baseline = row.totals;
                }
                let mut renders = Vec::new();
                if state.cell_display(key) != shown {
                    state.render_cell(key, &mut renders);
                    state.render_row(key.row, &mut renders);
                }
                drop(guard);
                self.flush(renders);
                return Resolution::Settled;
            }

            let resolution = match parsed {
                Ok(row) => {
                    let confirmed = row.entity.editable_text(key.field);
                    let resolution = machine.resolve(ticket, Outcome::Confirmed(confirmed));
                    state.view.replace_row(row.entity);
                    if state.view.params == *params {
                        state.view.baseline = row.totals;
                    }
                    info!(%key, ticket = ticket.0, "edit confirmed");
                    resolution
                }
                Err(error) => {
                    warn!(%key, ticket = ticket.0, %error, "edit rejected");
                    machine.resolve(ticket, Outcome::Rejected(error.indicator_text()))
                }
            };

            let mut renders = Vec::new();
            state.render_cell(key, &mut renders);
            state.render_row(key.row, &mut renders);
            (resolution, renders)
        };
        self.flush(renders);

        if resolution == Resolution::Failed {
            self.run_revert(key, ticket).await;
        }
        resolution
    }

    fn revert_step(&self, key: CellKey, step: impl FnOnce(&mut CellMachine) -> bool) {
        let renders = {
            let mut state = self.state.lock();
            let advanced = state.cells.get_mut(&key).is_some_and(step);
            let mut renders = Vec::new();
            if advanced {
                state.render_cell(key, &mut renders);
                state.render_row(key.row, &mut renders);
            }
            renders
        };
        self.flush(renders);
    }

    async fn run_revert(&self, key: CellKey, ticket: Ticket) {
        tokio::time::sleep(self.config.error_display()).await;
        self.revert_step(key, |machine| machine.restore(ticket));
        debug!(%key, "original value restored");

        tokio::time::sleep(self.config.error_clear()).await;
        self.revert_step(key, |machine| machine.clear(ticket));
    }
}

/// Client-side reconciler for one grid
///
/// Cheap to clone; clones share state. Methods that send requests must be
/// called from inside a tokio runtime.
#[derive(Clone)]
pub struct Synchronizer {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Synchronizer")
            .field("params", &state.view.params)
            .field("rows", &state.view.rows.len())
            .field("cells", &state.cells.len())
            .finish_non_exhaustive()
    }
}

impl Synchronizer {
    /// Synchronizer with an empty view
    #[must_use]
    pub fn new(
        transport: Arc<dyn GridTransport>,
        presenter: Arc<dyn Presenter>,
        config: ClientConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                presenter,
                config,
                state: Mutex::new(GridState::default()),
                observers: DashMap::new(),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Transport in use
    #[inline]
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn GridTransport> {
        &self.inner.transport
    }

    /// Presenter in use
    #[inline]
    #[must_use]
    pub fn presenter(&self) -> &Arc<dyn Presenter> {
        &self.inner.presenter
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Bind `observer` to a cell and render it once
    pub fn observe(&self, key: CellKey, observer: CellObserver) {
        self.inner.observers.insert(key, observer);
        let renders = {
            let state = self.inner.state.lock();
            let mut renders = Vec::new();
            state.render_cell(key, &mut renders);
            renders
        };
        self.inner.flush(renders);
    }

    /// Drop a cell's observer
    pub fn unobserve(&self, key: CellKey) {
        self.inner.observers.remove(&key);
    }

    /// Last confirmed view
    #[must_use]
    pub fn view(&self) -> GridView {
        self.inner.state.lock().view.clone()
    }

    /// Query of the last confirmed view
    #[must_use]
    pub fn params(&self) -> QueryParams {
        self.inner.state.lock().view.params.clone()
    }

    /// Coarse state of a cell
    #[must_use]
    pub fn phase(&self, key: CellKey) -> CellPhase {
        self.inner
            .state
            .lock()
            .cells
            .get(&key)
            .map_or(CellPhase::Viewing, CellMachine::phase)
    }

    /// What a cell currently shows; `None` if its row is not in the view
    #[must_use]
    pub fn display(&self, key: CellKey) -> Option<CellDisplay> {
        self.inner.state.lock().cell_display(key)
    }

    /// A cell's overlay, if any
    #[must_use]
    pub fn pending_edit(&self, key: CellKey) -> Option<PendingEdit> {
        self.inner
            .state
            .lock()
            .cells
            .get(&key)
            .and_then(CellMachine::pending_edit)
            .cloned()
    }

    /// Displayed subtotal for a row
    #[must_use]
    pub fn subtotal(&self, row: EntityId) -> Option<Money> {
        let state = self.inner.state.lock();
        state
            .view
            .row(row)
            .map(|entity| effective_row(entity, &state.cells).subtotal())
    }

    /// Displayed totals
    #[must_use]
    pub fn totals(&self) -> AggregateTotals {
        let state = self.inner.state.lock();
        display_totals(&state.view, &state.cells)
    }

    /// Claim a table-request generation, superseding every earlier one
    pub fn next_generation(&self) -> u64 {
        self.inner.next_generation()
    }

    /// Whether no table request was issued after `generation`
    #[must_use]
    pub fn is_latest(&self, generation: u64) -> bool {
        self.inner.is_latest(generation)
    }

    /// Replace the view with a table fetched under `generation`; overlays survive
    ///
    /// # Errors
    /// `RequestSuperseded` if a later table request was issued
    pub fn apply_table(&self, generation: u64, table: TableFragment) -> Result<(), ClientError> {
        self.inner.apply_table(generation, table)
    }

    /// Fetch and show a view
    ///
    /// # Errors
    /// Transport, rejection or parse failures keep the current view;
    /// `RequestSuperseded` if a later table request was issued meanwhile
    pub async fn load(&self, params: &QueryParams) -> Result<(), ClientError> {
        let generation = self.inner.next_generation();
        let response = self.inner.transport.query(params).await;
        let table = classify(response).and_then(|body| parse_table_fragment(&body))?;
        self.inner.apply_table(generation, table)
    }

    /// Open a cell's editor; returns the initial draft
    ///
    /// # Errors
    /// `UnknownRow` if the row is not in the view, `CellBusy` while reverting
    pub fn begin_edit(&self, key: CellKey) -> Result<String, ClientError> {
        let (draft, renders) = {
            let mut state = self.inner.state.lock();
            let authoritative = state.authoritative(key)?;
            let draft = state
                .cells
                .entry(key)
                .or_insert_with(|| CellMachine::new(key))
                .begin(&authoritative)?;
            let mut renders = Vec::new();
            state.render_cell(key, &mut renders);
            (draft, renders)
        };
        self.inner.flush(renders);
        Ok(draft)
    }

    /// Track the editor's text
    ///
    /// # Errors
    /// `NotEditing` unless the editor is open
    pub fn update_draft(&self, key: CellKey, text: &str) -> Result<(), ClientError> {
        self.inner
            .state
            .lock()
            .cells
            .get_mut(&key)
            .ok_or(ClientError::NotEditing(key))?
            .set_draft(text)
    }

    /// Close the editor without a request and refocus the cell
    ///
    /// # Errors
    /// `NotEditing` unless the editor is open
    pub fn cancel_edit(&self, key: CellKey) -> Result<(), ClientError> {
        let renders = {
            let mut state = self.inner.state.lock();
            state
                .cells
                .get_mut(&key)
                .ok_or(ClientError::NotEditing(key))?
                .cancel()?;
            let mut renders = Vec::new();
            state.render_cell(key, &mut renders);
            renders.push(Render::FocusCell(key));
            renders
        };
        self.inner.flush(renders);
        Ok(())
    }

    /// Commit the editor
    ///
    /// A changed value is rendered at once, together with the recomputed
    /// subtotal and totals, and written in the background.
    ///
    /// # Errors
    /// `NotEditing` unless the editor is open
    pub fn commit_edit(&self, key: CellKey) -> Result<Commit, ClientError> {
        let (decision, params, renders) = {
            let mut state = self.inner.state.lock();
            let decision = state
                .cells
                .get_mut(&key)
                .ok_or(ClientError::NotEditing(key))?
                .commit()?;
            let mut renders = Vec::new();
            state.render_cell(key, &mut renders);
            match decision {
                CommitDecision::Unchanged => renders.push(Render::FocusCell(key)),
                CommitDecision::Dispatch { .. } => state.render_row(key.row, &mut renders),
            }
            (decision, state.view.params.clone(), renders)
        };
        self.inner.flush(renders);

        match decision {
            CommitDecision::Unchanged => Ok(Commit::Unchanged),
            CommitDecision::Dispatch {
                ticket,
                value,
                superseded,
            } => {
                if let Some(older) = superseded {
                    debug!(%key, older = older.0, newer = ticket.0, "edit supersedes in-flight write");
                }
                let inner = Arc::clone(&self.inner);
                let task = tokio::spawn(async move {
                    let response = inner.transport.update_field(key, &value, &params).await;
                    inner.reconcile(key, ticket, &params, response).await
                });
                Ok(Commit::Dispatched { ticket, task })
            }
        }
    }

    /// Delete a row and show the refreshed view for the current query
    ///
    /// # Errors
    /// Transport, rejection or parse failures; the current view is kept
    pub async fn delete_row(&self, id: EntityId) -> Result<(), ClientError> {
        let params = self.params();
        self.inner.delete(id, &params).await
    }

    /// Delete a row and show the refreshed view for `params`
    ///
    /// The refreshed table is dropped if a later table request was issued.
    ///
    /// # Errors
    /// Transport, rejection or parse failures; the current view is kept
    pub async fn delete_row_in(&self, id: EntityId, params: &QueryParams) -> Result<(), ClientError> {
        self.inner.delete(id, params).await
    }
}
