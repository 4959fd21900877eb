// ── Runtime session configuration ──
//
// These types describe *how* to reach a site in the store and how the
// case controller behaves. They carry the auth token and connection
// tuning, but never touch disk. The CLI/TUI constructs them and hands
// them in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (local emulators behind self-signed proxies).
    DangerAcceptInvalid,
}

/// Configuration for binding to a single site.
///
/// Built by CLI/TUI, passed to `SiteSession` -- core never reads config files.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Database root URL (e.g., `https://relevancy.example.com`).
    pub root: Url,
    /// Site key under `sites/`.
    pub site: String,
    /// Auth token appended as `?auth=` to every request.
    pub auth_token: Option<SecretString>,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Request timeout (connect timeout for the event stream).
    pub timeout: Duration,
    /// Keep the site mirror live through the store's event stream.
    pub streaming: bool,
}

impl SessionConfig {
    /// A config with default tuning for `site` under `root`.
    pub fn new(root: Url, site: impl Into<String>) -> Self {
        Self {
            root,
            site: site.into(),
            auth_token: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            streaming: true,
        }
    }
}

/// Behavior of the case collection controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseControllerConfig {
    /// How long the success alert stays up after an add.
    pub alert_timeout: Duration,
    /// Write a `.priority` of `-(now_ms)` so the newest case sorts first.
    pub ordering: bool,
}

impl Default for CaseControllerConfig {
    fn default() -> Self {
        Self {
            alert_timeout: Duration::from_millis(5000),
            ordering: true,
        }
    }
}
