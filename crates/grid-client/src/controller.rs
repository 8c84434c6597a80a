//! Request controller
//!
//! Turns navigation gestures into table requests:
//! - sort-header clicks toggle direction and go back to page 1
//! - search keystrokes are debounced; Enter sends at once
//! - page links move within `1..=total_pages`
//!
//! Every new request aborts the one before it, and a response is applied only
//! if no newer table request was issued meanwhile; deletions count as table
//! requests too. Navigations are recorded in history; edits and deletions are
//! not.

use crate::error::ClientError;
use crate::focus::FocusToken;
use crate::fragment::parse_table_fragment;
use crate::sync::Synchronizer;
use crate::task::CancellableTask;
use crate::transport::classify;
use grid_model::{EntityField, EntityId, QueryParams, SortField};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Handle to a navigation request
pub type Navigation = JoinHandle<Result<(), ClientError>>;

struct Inner {
    sync: Synchronizer,
    params: Mutex<QueryParams>,
    task: CancellableTask,
}

impl Inner {
    fn fire(
        self: Arc<Self>,
        params: QueryParams,
        focus: Option<FocusToken>,
    ) -> impl std::future::Future<Output = Result<(), ClientError>> + Send + 'static {
        let request = self.sync.next_generation();
        self.perform(request, params, focus)
    }

    async fn perform(
        self: Arc<Self>,
        request: u64,
        params: QueryParams,
        focus: Option<FocusToken>,
    ) -> Result<(), ClientError> {
        debug!(request, query = %params.to_query_string(), "table request");
        let response = self.sync.transport().query(&params).await;
        let table = classify(response).and_then(|body| parse_table_fragment(&body));

        if !self.sync.is_latest(request) {
            debug!(request, "dropping response to superseded request");
            return Err(ClientError::RequestSuperseded);
        }
        let table = match table {
            Ok(table) => table,
            Err(error) => {
                warn!(request, %error, "table request failed");
                return Err(error);
            }
        };

        let query = format!("?{}", table.params.to_query_string());
        self.sync.apply_table(request, table)?;
        let presenter = self.sync.presenter();
        presenter.push_history(&query);
        if let Some(token) = focus {
            token.restore(presenter.as_ref());
        }
        Ok(())
    }
}

/// Drives navigation for one grid
#[derive(Clone)]
pub struct GridController {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for GridController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridController")
            .field("params", &*self.inner.params.lock())
            .finish_non_exhaustive()
    }
}

impl GridController {
    /// Controller starting from `initial`
    #[must_use]
    pub fn new(sync: Synchronizer, initial: QueryParams) -> Self {
        Self {
            inner: Arc::new(Inner {
                sync,
                params: Mutex::new(initial),
                task: CancellableTask::new(),
            }),
        }
    }

    /// Synchronizer this controller feeds
    #[inline]
    #[must_use]
    pub fn synchronizer(&self) -> &Synchronizer {
        &self.inner.sync
    }

    /// Query the next request will use
    #[must_use]
    pub fn params(&self) -> QueryParams {
        self.inner.params.lock().clone()
    }

    fn navigate(&self, params: QueryParams, focus: Option<FocusToken>) -> Navigation {
        *self.inner.params.lock() = params.clone();
        let request = Arc::clone(&self.inner).fire(params, focus);
        self.inner.task.run_now(request)
    }

    /// Load the current query
    pub fn reload(&self) -> Navigation {
        self.navigate(self.params(), None)
    }

    /// Sort-header click
    pub fn sort_by(&self, field: SortField) -> Navigation {
        self.navigate(self.params().toggle_sort(field).with_page(1), None)
    }

    /// Jump to a page
    pub fn go_to_page(&self, page: u32) -> Navigation {
        self.navigate(self.params().with_page(page), None)
    }

    /// Next page, if the view has one
    pub fn next_page(&self) -> Option<Navigation> {
        let page = self.inner.sync.view().page;
        page.has_next.then(|| self.go_to_page(page.page + 1))
    }

    /// Previous page, if the view has one
    pub fn prev_page(&self) -> Option<Navigation> {
        let page = self.inner.sync.view().page;
        page.has_prev.then(|| self.go_to_page(page.page - 1))
    }

    /// Change the searched field; sends at once if a term is set
    pub fn set_search_field(&self, field: EntityField) -> Option<Navigation> {
        let params = {
            let mut params = self.inner.params.lock();
            params.search_field = field;
            params.page = 1;
            params.clone()
        };
        (!params.search_term.is_empty()).then(|| self.navigate(params, None))
    }

    /// Search keystroke: restart the debounce window
    ///
    /// The term sent is whatever the input holds when the window closes.
    pub fn search_input(&self, term: &str, focus: Option<FocusToken>) -> Navigation {
        {
            let mut params = self.inner.params.lock();
            *params = params.clone().with_search_term(term);
        }
        debug!(term, "search debounce restarted");
        let inner = Arc::clone(&self.inner);
        self.inner
            .task
            .schedule(self.inner.sync.config().debounce(), move || {
                let params = inner.params.lock().clone();
                inner.fire(params, focus)
            })
    }

    /// Enter in the search box: send now
    pub fn search_submit(&self, focus: Option<FocusToken>) -> Navigation {
        self.navigate(self.params().with_page(1), focus)
    }

    /// Delete a row and show the refreshed view for the latest query
    ///
    /// Uses the query of the most recent navigation, so a navigation still in
    /// flight is not undone by the refreshed table.
    ///
    /// # Errors
    /// Transport, rejection or parse failures; the current view is kept
    pub async fn delete_row(&self, id: EntityId) -> Result<(), ClientError> {
        let params = self.params();
        self.inner.sync.delete_row_in(id, &params).await
    }

    /// Abort any pending or in-flight navigation
    pub fn cancel(&self) {
        self.inner.task.cancel();
    }
}
