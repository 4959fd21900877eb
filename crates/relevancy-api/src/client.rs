// Store REST client
//
// Wraps `reqwest::Client` with store-specific URL construction
// (`<root>/<path>.json`), auth token injection, and error-body unwrapping.
// Reads return `None` for paths that hold no data (the store answers `null`).

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::path::StorePath;
use crate::transport::TransportConfig;

/// The store wraps rule and validation failures as `{"error": "..."}`.
#[derive(serde::Deserialize)]
struct StoreErrorBody {
    error: Option<String>,
}

/// Raw HTTP client for the realtime store's REST surface.
#[derive(Clone)]
pub struct StoreClient {
    http: reqwest::Client,
    root: Url,
    auth: Option<SecretString>,
}

impl std::fmt::Debug for StoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreClient")
            .field("root", &self.root.as_str())
            .field("auth", &self.auth.as_ref().map(|_| "****"))
            .finish_non_exhaustive()
    }
}

impl StoreClient {
    /// Create a client for the database at `root`.
    pub fn new(
        root: Url,
        auth: Option<SecretString>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, root, auth))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, root: Url, auth: Option<SecretString>) -> Self {
        Self { http, root, auth }
    }

    /// The database root URL.
    pub fn root(&self) -> &Url {
        &self.root
    }

    /// Build the full REST URL for `path`, including the auth parameter.
    pub fn url_for(&self, path: &StorePath) -> Result<Url, Error> {
        let mut url = path.to_url(&self.root)?;
        if let Some(ref token) = self.auth {
            url.query_pairs_mut()
                .append_pair("auth", token.expose_secret());
        }
        Ok(url)
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Read the value at `path`. `Ok(None)` when the path holds no data.
    pub async fn get<T: DeserializeOwned>(&self, path: &StorePath) -> Result<Option<T>, Error> {
        let url = self.url_for(path)?;
        debug!(%path, "GET");
        self.fetch(url, path).await
    }

    /// Read the value at `path` in export format, which keeps `.priority`
    /// metadata on every node that has one.
    pub async fn get_with_priority<T: DeserializeOwned>(
        &self,
        path: &StorePath,
    ) -> Result<Option<T>, Error> {
        let mut url = self.url_for(path)?;
        url.query_pairs_mut().append_pair("format", "export");
        debug!(%path, "GET (export)");
        self.fetch(url, path).await
    }

    /// Write `body` at `path`, replacing whatever was there.
    pub async fn put(&self, path: &StorePath, body: &(impl Serialize + Sync)) -> Result<(), Error> {
        let url = self.url_for(path)?;
        debug!(%path, "PUT");

        let resp = self.http.put(url).json(body).send().await?;
        Self::check(resp, path).await?;
        Ok(())
    }

    /// Delete the subtree at `path`. Deleting a missing path succeeds.
    pub async fn delete(&self, path: &StorePath) -> Result<(), Error> {
        let url = self.url_for(path)?;
        debug!(%path, "DELETE");

        let resp = self.http.delete(url).send().await?;
        Self::check(resp, path).await?;
        Ok(())
    }

    // ── Response handling ────────────────────────────────────────────

    async fn fetch<T: DeserializeOwned>(&self, url: Url, path: &StorePath) -> Result<Option<T>, Error> {
        let resp = self.http.get(url).send().await?;
        let body = Self::check(resp, path).await?;
        Self::decode(body)
    }

    /// Map non-success statuses into errors and return the body text.
    async fn check(resp: reqwest::Response, path: &StorePath) -> Result<String, Error> {
        let status = resp.status();
        let body = resp.text().await?;
        trace!(%status, len = body.len(), "store response");

        if status.is_success() {
            return Ok(body);
        }

        let message = serde_json::from_str::<StoreErrorBody>(&body)
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| body.chars().take(200).collect());

        Err(match status {
            reqwest::StatusCode::UNAUTHORIZED => Error::Authentication { message },
            reqwest::StatusCode::FORBIDDEN => Error::PermissionDenied {
                path: path.to_string(),
            },
            _ => Error::Api {
                status: status.as_u16(),
                message,
            },
        })
    }

    fn decode<T: DeserializeOwned>(body: String) -> Result<Option<T>, Error> {
        let value: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.clone(),
            })?;
        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body,
            })
    }
}
