//! reqwest adapter for a PostgREST-style store.

use reqwest::{Method, RequestBuilder, Response};
use shelf_engine::{Bookmark, BookmarkId, Draft, UserId};

use super::{NewRow, RemoteError, RemoteStore, StoreRow};
use crate::config::Config;

/// Authenticated HTTP client for the store's REST and auth endpoints.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    access_token: String,
}

impl HttpClient {
    pub fn new(config: &Config) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.remote_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            access_token: config.access_token.clone(),
        })
    }

    /// Start a request to `{base_url}{path}` carrying both credentials.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.access_token)
    }

    /// Send and turn non-2xx answers into [`RemoteError::Rejected`].
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

const TABLE: &str = "/rest/v1/bookmarks";

/// [`RemoteStore`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    http: HttpClient,
}

impl HttpRemoteStore {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Snapshot query: the user's rows, newest first.
    fn list_request(&self, user: &UserId) -> RequestBuilder {
        let owner = format!("eq.{user}");
        self.http.request(Method::GET, TABLE).query(&[
            ("select", "*"),
            ("user_id", owner.as_str()),
            ("order", "created_at.desc"),
        ])
    }
}

impl RemoteStore for HttpRemoteStore {
    async fn list(&self, user: &UserId) -> Result<Vec<Bookmark>, RemoteError> {
        let request = self.list_request(user);
        let rows: Vec<StoreRow> = self.http.send(request).await?.json().await?;
        Ok(rows.into_iter().map(Bookmark::from).collect())
    }

    async fn insert(&self, draft: &Draft, user: &UserId) -> Result<Bookmark, RemoteError> {
        let request = self
            .http
            .request(Method::POST, TABLE)
            .header("Prefer", "return=representation")
            .json(&NewRow::new(draft, user));

        let rows: Vec<StoreRow> = self.http.send(request).await?.json().await?;
        rows.into_iter()
            .next()
            .map(Bookmark::from)
            .ok_or_else(|| RemoteError::Decode("insert returned no row".to_string()))
    }

    async fn delete(&self, id: &BookmarkId) -> Result<(), RemoteError> {
        let filter = format!("eq.{id}");
        let request = self
            .http
            .request(Method::DELETE, TABLE)
            .query(&[("id", filter.as_str())]);

        self.http.send(request).await?;
        Ok(())
    }
}
