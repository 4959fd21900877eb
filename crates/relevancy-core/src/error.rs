// ── Core error types ──
//
// User-facing errors from relevancy-core. Consumers never see HTTP status
// codes or JSON parse failures directly: the `From<relevancy_api::Error>`
// impl translates transport-layer errors into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to store at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Permission denied for {path}")]
    PermissionDenied { path: String },

    #[error("Site session is not connected")]
    SessionClosed,

    #[error("Store request timed out")]
    Timeout,

    // ── Case errors ──────────────────────────────────────────────────
    /// Empty name, or a case with the same lowercased name already exists.
    #[error("Case name {name:?} rejected: please use a different name")]
    CaseNameRejected { name: String },

    #[error("Case not found: {id}")]
    CaseNotFound { id: String },

    // ── Interaction errors ───────────────────────────────────────────
    #[error("Confirmation failed: {message}")]
    Confirmation { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("Store error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<relevancy_api::Error> for CoreError {
    fn from(err: relevancy_api::Error) -> Self {
        use relevancy_api::Error as ApiError;

        match err {
            ApiError::Authentication { message } => CoreError::AuthenticationFailed { message },
            ApiError::PermissionDenied { path } => CoreError::PermissionDenied { path },
            ApiError::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(|u| format!("{}://{}", u.scheme(), u.host_str().unwrap_or("")))
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ApiError::InvalidRoot(root) => CoreError::Config {
                message: format!("Store root cannot be used as a base URL: {root}"),
            },
            ApiError::InvalidPath(segment) => CoreError::Config {
                message: format!("Invalid store path segment: {segment:?}"),
            },
            ApiError::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            ApiError::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            ApiError::Stream(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("Event stream failed: {reason}"),
            },
            ApiError::StreamCancelled(reason) => CoreError::PermissionDenied {
                path: format!("event stream ({reason})"),
            },
            ApiError::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connection_errors_never_show_the_auth_token() {
        let client = relevancy_api::StoreClient::new(
            url::Url::parse("http://127.0.0.1:1").unwrap(),
            Some(secrecy::SecretString::from("TOPSECRET123")),
            &relevancy_api::TransportConfig::default(),
        )
        .unwrap();
        let api_err = client
            .delete(&relevancy_api::StorePath::case("acme", "boots").unwrap())
            .await
            .unwrap_err();

        let err = CoreError::from(api_err);
        assert!(matches!(err, CoreError::ConnectionFailed { .. }));
        assert!(!err.to_string().contains("TOPSECRET123"));
        assert!(!format!("{err:?}").contains("TOPSECRET123"));
    }

    #[test]
    fn store_status_errors_keep_their_status() {
        let err = CoreError::from(relevancy_api::Error::Api {
            status: 500,
            message: "boom".into(),
        });
        assert!(matches!(err, CoreError::Api { status: Some(500), .. }));
    }

    #[test]
    fn auth_and_permission_map_to_domain_variants() {
        let auth = CoreError::from(relevancy_api::Error::Authentication {
            message: "bad token".into(),
        });
        assert!(matches!(auth, CoreError::AuthenticationFailed { .. }));

        let denied = CoreError::from(relevancy_api::Error::PermissionDenied {
            path: "/sites/acme".into(),
        });
        assert!(matches!(denied, CoreError::PermissionDenied { ref path } if path == "/sites/acme"));
    }

    #[test]
    fn rejected_name_message_mentions_the_fix() {
        let err = CoreError::CaseNameRejected {
            name: "Boots".into(),
        };
        assert!(err.to_string().contains("please use a different name"));
    }
}
