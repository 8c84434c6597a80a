//! HTTP routes
//!
//! Query and mutation work is synchronous against the store; each request runs
//! to completion independently and writes are atomic with respect to reads.

use crate::error::ApiError;
use crate::render::{HtmlRenderer, MarkupRenderer};
use crate::ServerConfig;
use grid_model::{EditableField, EntityId, PageLimits, QueryParams, RawQueryParams};
use grid_store::{seed_entities, MutationService, RecordStore};
use serde::Deserialize;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

/// Shared request state
#[derive(Clone)]
pub struct AppState {
    store: Arc<RecordStore>,
    mutations: MutationService,
    renderer: Arc<dyn MarkupRenderer>,
    limits: PageLimits,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("rows", &self.store.len())
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Seed a fresh store from configuration
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        let store = Arc::new(RecordStore::new(seed_entities(config.seed_rows)));
        Self::new(store, config)
    }

    /// Wrap an existing store
    #[must_use]
    pub fn new(store: Arc<RecordStore>, config: &ServerConfig) -> Self {
        Self {
            mutations: MutationService::with_policy(store.clone(), config.mutation),
            store,
            renderer: Arc::new(HtmlRenderer::new()),
            limits: config.page_limits,
        }
    }

    /// Replace the markup renderer
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn MarkupRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Backing store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    fn params(&self, raw: &RawQueryParams) -> QueryParams {
        QueryParams::from_raw(raw, &self.limits)
    }

    fn fail(&self, error: &ApiError) -> Response {
        html(self.renderer.error(&error.to_string()), error.status())
    }
}

#[derive(Debug, Deserialize)]
struct UpdateForm {
    value: String,
}

fn html(body: String, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::html(body), status).into_response()
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn full_page(state: AppState, raw: RawQueryParams) -> Response {
    let outcome = state.store.query(&state.params(&raw));
    html(state.renderer.page(&outcome), StatusCode::OK)
}

fn table(state: AppState, raw: RawQueryParams) -> Response {
    let outcome = state.store.query(&state.params(&raw));
    html(state.renderer.table(&outcome), StatusCode::OK)
}

fn update(state: AppState, id: u64, field: String, raw: RawQueryParams, form: UpdateForm) -> Response {
    let scope = state.params(&raw);
    let result = field
        .parse::<EditableField>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))
        .and_then(|field| {
            Ok(state
                .mutations
                .update_field_in(EntityId(id), field, &form.value, &scope)?)
        });

    match result {
        Ok((entity, totals)) => html(state.renderer.updated_row(&entity, &totals), StatusCode::OK),
        Err(error) => state.fail(&error),
    }
}

fn delete(state: AppState, id: u64, raw: RawQueryParams) -> Response {
    if let Err(error) = state.mutations.delete_entity(EntityId(id)) {
        return state.fail(&ApiError::from(error));
    }
    let params = state.params(&raw);
    let mut outcome = state.store.query(&params);
    // Deleting the only row on the last page moves the view back one page
    if outcome.rows.is_empty() && outcome.page.total_pages > 0 && params.page > outcome.page.total_pages {
        outcome = state.store.query(&params.with_page(outcome.page.total_pages));
    }
    html(state.renderer.table(&outcome), StatusCode::OK)
}

fn health(state: AppState) -> Response {
    warp::reply::json(&serde_json::json!({ "status": "ok", "rows": state.store.len() }))
        .into_response()
}

/// Build the route tree
pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let recover_state = state.clone();

    let page = warp::get()
        .and(warp::path::end())
        .and(with_state(state.clone()))
        .and(warp::query::<RawQueryParams>())
        .map(full_page);

    let table_route = warp::get()
        .and(warp::path!("table"))
        .and(with_state(state.clone()))
        .and(warp::query::<RawQueryParams>())
        .map(table);

    let update_route = warp::put()
        .and(warp::path!("items" / u64 / String))
        .and(warp::query::<RawQueryParams>())
        .and(warp::body::content_length_limit(4 * 1024))
        .and(warp::body::form::<UpdateForm>())
        .and(with_state(state.clone()))
        .map(
            |id: u64, field: String, raw: RawQueryParams, form: UpdateForm, state: AppState| {
                update(state, id, field, raw, form)
            },
        );

    let delete_route = warp::delete()
        .and(warp::path!("items" / u64))
        .and(warp::query::<RawQueryParams>())
        .and(with_state(state.clone()))
        .map(|id: u64, raw: RawQueryParams, state: AppState| delete(state, id, raw));

    let health_route = warp::get()
        .and(warp::path!("health"))
        .and(with_state(state))
        .map(health);

    health_route
        .or(page)
        .unify()
        .or(table_route)
        .unify()
        .or(update_route)
        .unify()
        .or(delete_route)
        .unify()
        .recover(move |rejection: Rejection| {
            let state = recover_state.clone();
            async move { Ok::<_, Infallible>(reject_to_response(&state, &rejection)) }
        })
        .unify()
        .with(warp::trace(|info| {
            let user = info
                .request_headers()
                .get("x-user")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("anonymous");
            tracing::info_span!(
                "request",
                method = %info.method(),
                path = %info.path(),
                user = %user,
            )
        }))
}

fn reject_to_response(state: &AppState, rejection: &Rejection) -> Response {
    let error = if rejection.is_not_found() {
        ApiError::NoRoute
    } else if let Some(e) = rejection.find::<warp::filters::body::BodyDeserializeError>() {
        ApiError::BadRequest(e.to_string())
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        ApiError::NoRoute
    } else {
        ApiError::BadRequest(format!("{rejection:?}"))
    };
    tracing::debug!(%error, "request rejected");
    state.fail(&error)
}

/// Bind the routes, returning the bound address and the server future
///
/// # Errors
/// Returns `warp::Error` if the address cannot be bound
pub fn bind(
    state: AppState,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(SocketAddr, impl Future<Output = ()>), warp::Error> {
    warp::serve(routes(state)).try_bind_with_graceful_shutdown(addr, shutdown)
}
