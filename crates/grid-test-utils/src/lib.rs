//! Testing utilities for the live grid workspace
//!
//! Shared fixtures, an in-process transport, a transport wrapper that can hold
//! responses back and release them in any order, and a presenter that records
//! everything it is told.

#![allow(missing_docs)]
#![allow(unreachable_pub)]

use async_trait::async_trait;
use grid_client::{
    CellDisplay, CellKey, ClientConfig, ClientError, GridController, GridTransport, GridView,
    HttpResponse, Presenter, Synchronizer,
};
use grid_model::{AggregateTotals, Entity, EntityId, Money, QueryParams};
use grid_server::{routes, AppState, ServerConfig};
use grid_store::RecordStore;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, Notify};
use tokio::time::Instant;

pub fn entity(id: u64, name: &str, cents: i64, quantity: u64, category: &str) -> Entity {
    Entity {
        id: EntityId(id),
        name: name.to_string(),
        price: Money::from_cents(cents),
        quantity,
        category: category.to_string(),
    }
}

/// Six rows; row 1 is priced 120.00 with quantity 3
pub fn fixture_entities() -> Vec<Entity> {
    vec![
        entity(1, "Oak Desk Lamp", 12_000, 3, "Lighting"),
        entity(2, "Steel Floor Lamp", 8_000, 5, "Lighting"),
        entity(3, "Walnut Bookshelf", 25_000, 1, "Furniture"),
        entity(4, "Brass Table Lamp", 4_550, 10, "Lighting"),
        entity(5, "Linen Armchair", 39_999, 2, "Furniture"),
        entity(6, "Ceramic Vase", 1_999, 0, "Decor"),
    ]
}

pub fn fixture_store() -> Arc<RecordStore> {
    Arc::new(RecordStore::new(fixture_entities()))
}

pub fn app_state(store: Arc<RecordStore>) -> AppState {
    AppState::new(store, &ServerConfig::default())
}

pub fn key(row: u64, field: grid_model::EditableField) -> CellKey {
    CellKey::new(EntityId(row), field)
}

fn into_http<B: AsRef<[u8]>>(response: warp::http::Response<B>) -> HttpResponse {
    HttpResponse::new(
        response.status().as_u16(),
        String::from_utf8_lossy(response.body().as_ref()).into_owned(),
    )
}

/// Calls the server's routes in-process
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    state: AppState,
}

impl LoopbackTransport {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl GridTransport for LoopbackTransport {
    async fn query(&self, params: &QueryParams) -> Result<HttpResponse, ClientError> {
        let response = warp::test::request()
            .method("GET")
            .path(&format!("/table?{}", params.to_query_string()))
            .reply(&routes(self.state.clone()))
            .await;
        Ok(into_http(response))
    }

    async fn update_field(
        &self,
        key: CellKey,
        value: &str,
        view: &QueryParams,
    ) -> Result<HttpResponse, ClientError> {
        let body = serde_urlencoded::to_string([("value", value)]).unwrap_or_default();
        let response = warp::test::request()
            .method("PUT")
            .path(&format!(
                "/items/{}/{}?{}",
                key.row,
                key.field,
                view.to_query_string()
            ))
            .header("content-type", "application/x-www-form-urlencoded")
            .body(body)
            .reply(&routes(self.state.clone()))
            .await;
        Ok(into_http(response))
    }

    async fn delete(&self, id: EntityId, view: &QueryParams) -> Result<HttpResponse, ClientError> {
        let response = warp::test::request()
            .method("DELETE")
            .path(&format!("/items/{id}?{}", view.to_query_string()))
            .reply(&routes(self.state.clone()))
            .await;
        Ok(into_http(response))
    }
}

/// One recorded transport call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Query(QueryParams),
    Update { key: CellKey, value: String },
    Delete(EntityId),
}

/// Wraps a transport; can hold responses, fail the link, or substitute bodies
///
/// The wrapped transport runs as soon as a call arrives, so the server sees
/// writes in issue order; only delivery of the response is held back.
pub struct ScriptedTransport {
    inner: Arc<dyn GridTransport>,
    holding: AtomicBool,
    severed: AtomicBool,
    calls: Mutex<Vec<Call>>,
    parked: Mutex<Vec<(usize, oneshot::Sender<()>)>>,
    substitutes: Mutex<VecDeque<HttpResponse>>,
    arrived: Notify,
}

impl ScriptedTransport {
    pub fn new(inner: Arc<dyn GridTransport>) -> Self {
        Self {
            inner,
            holding: AtomicBool::new(false),
            severed: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            parked: Mutex::new(Vec::new()),
            substitutes: Mutex::new(VecDeque::new()),
            arrived: Notify::new(),
        }
    }

    /// Park responses until released
    pub fn hold(&self, holding: bool) {
        self.holding.store(holding, Ordering::SeqCst);
    }

    /// Fail every call with a transport error
    pub fn sever(&self, severed: bool) {
        self.severed.store(severed, Ordering::SeqCst);
    }

    /// Answer the next call with `response` instead of the wrapped transport
    pub fn substitute_next(&self, response: HttpResponse) {
        self.substitutes.lock().push_back(response);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn queries(&self) -> Vec<QueryParams> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Query(params) => Some(params),
                _ => None,
            })
            .collect()
    }

    pub fn updates(&self) -> Vec<(CellKey, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Update { key, value } => Some((key, value)),
                _ => None,
            })
            .collect()
    }

    /// Wait until at least `count` responses are parked
    pub async fn wait_for_parked(&self, count: usize) {
        while self.parked.lock().len() < count {
            self.arrived.notified().await;
        }
    }

    /// Deliver the response to the `call`-th call (0-based, across all calls)
    pub fn release(&self, call: usize) {
        let sender = {
            let mut parked = self.parked.lock();
            let position = parked
                .iter()
                .position(|(index, _)| *index == call)
                .expect("no parked response for that call");
            parked.remove(position).1
        };
        let _ = sender.send(());
    }

    pub fn release_all(&self) {
        for (_, sender) in self.parked.lock().drain(..) {
            let _ = sender.send(());
        }
    }

    async fn deliver(
        &self,
        call: Call,
        response: impl std::future::Future<Output = Result<HttpResponse, ClientError>>,
    ) -> Result<HttpResponse, ClientError> {
        let index = {
            let mut calls = self.calls.lock();
            calls.push(call);
            calls.len() - 1
        };
        if self.severed.load(Ordering::SeqCst) {
            return Err(ClientError::Transport("connection reset".to_string()));
        }
        let substitute = self.substitutes.lock().pop_front();
        let response = match substitute {
            Some(substitute) => Ok(substitute),
            None => response.await,
        };
        if self.holding.load(Ordering::SeqCst) {
            let (sender, receiver) = oneshot::channel();
            self.parked.lock().push((index, sender));
            self.arrived.notify_one();
            let _ = receiver.await;
        }
        response
    }
}

#[async_trait]
impl GridTransport for ScriptedTransport {
    async fn query(&self, params: &QueryParams) -> Result<HttpResponse, ClientError> {
        self.deliver(Call::Query(params.clone()), self.inner.query(params))
            .await
    }

    async fn update_field(
        &self,
        key: CellKey,
        value: &str,
        view: &QueryParams,
    ) -> Result<HttpResponse, ClientError> {
        let call = Call::Update {
            key,
            value: value.to_string(),
        };
        self.deliver(call, self.inner.update_field(key, value, view))
            .await
    }

    async fn delete(&self, id: EntityId, view: &QueryParams) -> Result<HttpResponse, ClientError> {
        self.deliver(Call::Delete(id), self.inner.delete(id, view))
            .await
    }
}

/// Something the presenter was told
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    View(QueryParams),
    Cell(CellKey, CellDisplay),
    Subtotal(EntityId, Money),
    Totals(AggregateTotals),
    FocusCell(CellKey),
    FocusInput(String, usize),
    History(String),
}

/// Presenter that records every instruction with its (tokio) timestamp
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    events: Mutex<Vec<(Instant, Event)>>,
    inputs: Mutex<HashMap<String, String>>,
}

impl RecordingPresenter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn record(&self, event: Event) {
        self.events.lock().push((Instant::now(), event));
    }

    /// Cell observer feeding this presenter's log
    pub fn observer(self: &Arc<Self>) -> grid_client::CellObserver {
        let me = Arc::clone(self);
        Arc::new(move |key, display| me.record(Event::Cell(key, display.clone())))
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn timeline(&self) -> Vec<(Instant, Event)> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    pub fn cell_history(&self, key: CellKey) -> Vec<CellDisplay> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Cell(k, display) if k == key => Some(display),
                _ => None,
            })
            .collect()
    }

    pub fn last_cell(&self, key: CellKey) -> Option<CellDisplay> {
        self.cell_history(key).pop()
    }

    pub fn last_totals(&self) -> Option<AggregateTotals> {
        self.events().into_iter().rev().find_map(|e| match e {
            Event::Totals(totals) => Some(totals),
            _ => None,
        })
    }

    pub fn last_subtotal(&self, row: EntityId) -> Option<Money> {
        self.events().into_iter().rev().find_map(|e| match e {
            Event::Subtotal(r, subtotal) if r == row => Some(subtotal),
            _ => None,
        })
    }

    pub fn views(&self) -> Vec<QueryParams> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::View(params) => Some(params),
                _ => None,
            })
            .collect()
    }

    pub fn history(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::History(query) => Some(query),
                _ => None,
            })
            .collect()
    }

    pub fn focused_inputs(&self) -> Vec<(String, usize)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::FocusInput(field, caret) => Some((field, caret)),
                _ => None,
            })
            .collect()
    }

    pub fn set_input(&self, field: &str, value: &str) {
        self.inputs.lock().insert(field.to_string(), value.to_string());
    }

    pub fn remove_input(&self, field: &str) {
        self.inputs.lock().remove(field);
    }
}

impl Presenter for RecordingPresenter {
    fn replace_view(&self, view: &GridView) {
        self.inputs
            .lock()
            .insert("searchTerm".to_string(), view.params.search_term.clone());
        self.record(Event::View(view.params.clone()));
    }

    fn row_subtotal(&self, row: EntityId, subtotal: Money) {
        self.record(Event::Subtotal(row, subtotal));
    }

    fn totals(&self, totals: &AggregateTotals) {
        self.record(Event::Totals(*totals));
    }

    fn focus_cell(&self, key: CellKey) {
        self.record(Event::FocusCell(key));
    }

    fn focus_input(&self, field: &str, caret: usize) {
        self.record(Event::FocusInput(field.to_string(), caret));
    }

    fn input_value(&self, field: &str) -> Option<String> {
        self.inputs.lock().get(field).cloned()
    }

    fn push_history(&self, query: &str) {
        self.record(Event::History(query.to_string()));
    }
}

/// A full client wired to an in-process server over the fixture rows
pub struct Harness {
    pub store: Arc<RecordStore>,
    pub transport: Arc<ScriptedTransport>,
    pub presenter: Arc<RecordingPresenter>,
    pub sync: Synchronizer,
    pub controller: GridController,
}

impl Harness {
    pub fn new(store: Arc<RecordStore>) -> Self {
        let loopback: Arc<dyn GridTransport> =
            Arc::new(LoopbackTransport::new(app_state(store.clone())));
        let transport = Arc::new(ScriptedTransport::new(loopback));
        let presenter = RecordingPresenter::new();
        let sync = Synchronizer::new(
            transport.clone(),
            presenter.clone(),
            ClientConfig::default(),
        );
        let controller = GridController::new(sync.clone(), QueryParams::default());
        Self {
            store,
            transport,
            presenter,
            sync,
            controller,
        }
    }

    /// Harness over the fixture rows with the first page loaded
    pub async fn loaded() -> Self {
        let harness = Self::new(fixture_store());
        harness
            .sync
            .load(&QueryParams::default())
            .await
            .expect("initial load");
        harness
    }

    /// Observe a cell through the recording presenter
    pub fn observe(&self, key: CellKey) {
        self.sync.observe(key, self.presenter.observer());
    }
}
