// Async HTTP client for the StationFlow REST API.
//
// Base path: whatever the deployment mounts the API under (e.g. `/api/`).
// Auth: `Authorization: Bearer <token>` once a session is established.
//
// Endpoint groups (stations, requests, auth, feedback) live in their own
// files as inherent `impl StationApiClient` blocks.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

// ── Error response shapes ────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct MessageBody {
    message: String,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the StationFlow backend.
///
/// Cheap to share behind an `Arc`: the bearer token sits in an
/// [`ArcSwapOption`] so sign-in and sign-out never need `&mut self`.
pub struct StationApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: ArcSwapOption<SecretString>,
}

impl StationApiClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client for `base_url` using the given transport settings.
    pub fn new(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(http, base_url)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: Self::normalize_base_url(base_url)?,
            token: ArcSwapOption::empty(),
        })
    }

    /// Ensure the base URL path ends with `/` so relative joins append
    /// rather than replace the last segment.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// The normalized API base URL (always ends with `/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The underlying HTTP client, shared with the push channel.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// URL of the server-sent-events subscription endpoint.
    pub fn push_url(&self) -> Result<Url, Error> {
        self.url("notifications/subscribe")
    }

    // ── Session token ────────────────────────────────────────────────

    /// Attach `token` as the bearer credential on every later request.
    pub fn set_token(&self, token: SecretString) {
        self.token.store(Some(Arc::new(token)));
    }

    /// Drop the bearer credential.
    pub fn clear_token(&self) {
        self.token.store(None);
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.load().is_some()
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative path (e.g. `"stations/abc"`) onto the base URL.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token.load().as_deref() {
            Some(token) => req.bearer_auth(token.expose_secret()),
            None => req,
        }
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.authorize(self.http.get(url)).send().await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.authorize(self.http.post(url)).json(body).send().await?;
        self.handle_response(resp).await
    }

    /// POST without a request body, expecting a JSON response.
    pub(crate) async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.authorize(self.http.post(url)).send().await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("DELETE {url}");

        let resp = self.authorize(self.http.delete(url)).send().await?;
        self.handle_empty(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn handle_empty(&self, resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn parse_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();
        let message = error_message(&raw).unwrap_or_else(|| status.to_string());

        match status {
            reqwest::StatusCode::UNAUTHORIZED => Error::Unauthorized,
            reqwest::StatusCode::FORBIDDEN => Error::Forbidden { message },
            _ => Error::Api {
                status: status.as_u16(),
                message,
            },
        }
    }
}

/// Extract a display message from a backend error body.
///
/// The backend answers either `{"message": "..."}` or, for bean
/// validation failures, a flat `{"field": "message", ...}` map.
pub(crate) fn error_message(raw: &str) -> Option<String> {
    if let Ok(body) = serde_json::from_str::<MessageBody>(raw) {
        return Some(body.message);
    }

    let fields: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw).ok()?;
    let joined = fields
        .values()
        .filter_map(serde_json::Value::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    (!joined.is_empty()).then_some(joined)
}
