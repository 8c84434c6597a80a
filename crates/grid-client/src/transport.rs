//! Transport to the grid server
//!
//! Success and failure are decided by HTTP status class alone: any status of
//! 400 or above is a failure, whatever the body says.

use crate::cell::CellKey;
use crate::error::ClientError;
use crate::fragment::display_text;
use async_trait::async_trait;
use grid_model::{EntityId, QueryParams};

/// Raw HTTP outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Body text
    pub body: String,
}

impl HttpResponse {
    /// Build a response
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// The three calls the client makes
#[async_trait]
pub trait GridTransport: Send + Sync {
    /// `GET /table`
    async fn query(&self, params: &QueryParams) -> Result<HttpResponse, ClientError>;

    /// `PUT /items/{id}/{field}` with the view's query echoed for totals
    async fn update_field(
        &self,
        key: CellKey,
        value: &str,
        view: &QueryParams,
    ) -> Result<HttpResponse, ClientError>;

    /// `DELETE /items/{id}` with the view's query echoed for the refreshed table
    async fn delete(&self, id: EntityId, view: &QueryParams) -> Result<HttpResponse, ClientError>;
}

/// Split a response into a body to parse or an error
///
/// # Errors
/// `ServerRejected` for 4xx/5xx, `MalformedResponse` for any other non-2xx
pub fn classify(response: Result<HttpResponse, ClientError>) -> Result<String, ClientError> {
    let response = response?;
    match response.status {
        200..=299 => Ok(response.body),
        status if status >= 400 => Err(ClientError::ServerRejected {
            status,
            message: display_text(&response.body),
        }),
        status => Err(ClientError::MalformedResponse(format!(
            "unexpected status {status}"
        ))),
    }
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base: String,
}

impl HttpTransport {
    /// Transport rooted at `base_url`
    ///
    /// # Errors
    /// `Transport` if the URL does not parse
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let url = reqwest::Url::parse(base_url)
            .map_err(|e| ClientError::Transport(format!("bad base url {base_url:?}: {e}")))?;
        Ok(Self {
            client: reqwest::Client::new(),
            base: url.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// Reuse an existing client
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<HttpResponse, ClientError> {
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        tracing::debug!(status, bytes = body.len(), "response received");
        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl GridTransport for HttpTransport {
    async fn query(&self, params: &QueryParams) -> Result<HttpResponse, ClientError> {
        let url = format!("{}/table?{}", self.base, params.to_query_string());
        self.send(self.client.get(url)).await
    }

    async fn update_field(
        &self,
        key: CellKey,
        value: &str,
        view: &QueryParams,
    ) -> Result<HttpResponse, ClientError> {
        let url = format!(
            "{}/items/{}/{}?{}",
            self.base,
            key.row,
            key.field,
            view.to_query_string()
        );
        self.send(self.client.put(url).form(&[("value", value)]))
            .await
    }

    async fn delete(&self, id: EntityId, view: &QueryParams) -> Result<HttpResponse, ClientError> {
        let url = format!("{}/items/{id}?{}", self.base, view.to_query_string());
        self.send(self.client.delete(url)).await
    }
}
