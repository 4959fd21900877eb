use thiserror::Error;

/// Top-level error type for the `relevancy-api` crate.
///
/// Covers every failure mode of the store surfaces: REST transport,
/// authentication, store-reported errors, and the event stream.
/// `relevancy-core` maps these into user-facing variants.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The store rejected the auth token (HTTP 401).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The security rules deny access to this path (HTTP 403).
    #[error("Permission denied for {path}")]
    PermissionDenied { path: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    ///
    /// The wrapped error's URL never carries a query string, so the
    /// `auth` token cannot reach logs or error output.
    #[error("HTTP transport error: {0}")]
    Transport(reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The store root URL cannot carry path segments (e.g. `mailto:`).
    #[error("Store root cannot be used as a base URL: {0}")]
    InvalidRoot(String),

    /// A path segment was empty or otherwise unusable.
    #[error("Invalid store path segment: {0:?}")]
    InvalidPath(String),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Store ───────────────────────────────────────────────────────
    /// Non-success response from the store, with its `error` message if any.
    #[error("Store error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Event stream ────────────────────────────────────────────────
    /// The event stream could not be opened or broke mid-read.
    #[error("Event stream failed: {0}")]
    Stream(String),

    /// The store cancelled the event stream (rules changed, access lost).
    #[error("Event stream cancelled by store: {0}")]
    StreamCancelled(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(redact(err))
    }
}

/// Drop the query (and with it the `auth` token) from the URL reqwest
/// attaches to its errors.
pub(crate) fn redact(err: reqwest::Error) -> reqwest::Error {
    match err.url().cloned() {
        Some(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            err.with_url(url)
        }
        None => err,
    }
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Stream(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the store reported the path as missing.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Api { status: 404, .. } => true,
            _ => false,
        }
    }
}
