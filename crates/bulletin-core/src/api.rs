//! REST client for the newsletter service.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{ApiError, ApiResult, Operation};
use crate::model::{Newsletter, NewsletterDraft};

/// User-Agent header sent with every request.
pub const USER_AGENT: &str = concat!("bulletin/", env!("CARGO_PKG_VERSION"));

/// Login body for `POST /auth`.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// The REST operations the feed depends on.
pub trait NewsletterApi: Send + Sync {
    fn authenticate(&self, credentials: &Credentials) -> impl Future<Output = ApiResult<()>> + Send;

    /// All newsletters, newest first.
    fn list(&self) -> impl Future<Output = ApiResult<Vec<Newsletter>>> + Send;

    fn create(&self, draft: &NewsletterDraft)
    -> impl Future<Output = ApiResult<Newsletter>> + Send;

    /// Updates a newsletter. `None` means the service acknowledged the change
    /// without echoing the record back.
    fn update(
        &self,
        id: i64,
        draft: &NewsletterDraft,
    ) -> impl Future<Output = ApiResult<Option<Newsletter>>> + Send;
}

/// Builds the HTTP client shared by the REST client and the stream transport.
///
/// The cookie store carries the session cookie set by `POST /auth` to every
/// later request, including the event stream.
///
/// # Errors
/// Returns an error if the TLS backend cannot be initialized.
pub fn build_http_client(connect_timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .cookie_store(true)
        .user_agent(USER_AGENT);
    if let Some(timeout) = connect_timeout {
        builder = builder.connect_timeout(timeout);
    }
    builder.build().context("build HTTP client")
}

/// Newsletter service client over `reqwest`.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The underlying HTTP client (shares the session cookie store).
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(
        &self,
        operation: Operation,
        builder: reqwest::RequestBuilder,
    ) -> ApiResult<String> {
        let response = builder
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(operation, &e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::from_reqwest(operation, &e))?;
        debug!(%operation, status = status.as_u16(), "response received");

        if !status.is_success() {
            return Err(ApiError::http_status(operation, status.as_u16(), &body));
        }
        Ok(body)
    }
}

fn decode_body<T: DeserializeOwned>(operation: Operation, body: &str) -> ApiResult<T> {
    serde_json::from_str(body).map_err(|e| ApiError::parse(operation, &e, body))
}

impl NewsletterApi for ApiClient {
    async fn authenticate(&self, credentials: &Credentials) -> ApiResult<()> {
        let builder = self.http.post(self.url("/auth")).json(credentials);
        self.send(Operation::Authenticate, builder).await?;
        debug!(username = %credentials.username, "authenticated");
        Ok(())
    }

    async fn list(&self) -> ApiResult<Vec<Newsletter>> {
        let builder = self.http.get(self.url("/newsletters"));
        let body = self.send(Operation::List, builder).await?;
        decode_body(Operation::List, &body)
    }

    async fn create(&self, draft: &NewsletterDraft) -> ApiResult<Newsletter> {
        let builder = self.http.post(self.url("/newsletters")).json(draft);
        let body = self.send(Operation::Create, builder).await?;
        decode_body(Operation::Create, &body)
    }

    async fn update(&self, id: i64, draft: &NewsletterDraft) -> ApiResult<Option<Newsletter>> {
        let builder = self
            .http
            .put(self.url(&format!("/newsletters/{id}")))
            .json(draft);
        let body = self.send(Operation::Update, builder).await?;

        let value: Value = decode_body(Operation::Update, &body)?;
        if value.get("id").is_none() {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| ApiError::parse(Operation::Update, &e, &body))
    }
}
