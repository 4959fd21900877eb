//! Shared configuration for the relevancy CLI and TUI.
//!
//! TOML profiles, auth token resolution (env + keyring + plaintext),
//! and translation to `relevancy_core::SessionConfig`. Both binaries
//! depend on this crate; the CLI adds `GlobalOpts`-aware wrappers on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use relevancy_core::{CaseControllerConfig, SessionConfig, TlsVerification};

/// Keyring service name for stored auth tokens.
pub const KEYRING_SERVICE: &str = "relevancy";

/// Prefix for environment overrides (`RELEVANCY_DEFAULTS__TIMEOUT=10`).
pub const ENV_PREFIX: &str = "RELEVANCY_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration shared by CLI and TUI.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named store profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the active profile: explicit choice, then `default_profile`.
    pub fn active_profile_name(&self, explicit: Option<&str>) -> String {
        explicit
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound { name: name.into() })
    }

    /// Case controller behavior from the global defaults.
    pub fn controller_config(&self) -> CaseControllerConfig {
        CaseControllerConfig {
            alert_timeout: Duration::from_millis(self.defaults.alert_timeout_ms),
            ordering: self.defaults.ordering,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// How long the "case added" alert stays visible.
    #[serde(default = "default_alert_timeout_ms")]
    pub alert_timeout_ms: u64,

    /// Write a newest-first `.priority` on new cases.
    #[serde(default = "default_true")]
    pub ordering: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
            alert_timeout_ms: default_alert_timeout_ms(),
            ordering: true,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_alert_timeout_ms() -> u64 {
    5000
}
fn default_true() -> bool {
    true
}

/// A named store profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Database root URL (e.g., "https://relevancy.example.com").
    pub root: String,

    /// Site key under `sites/`.
    #[serde(default = "default_site")]
    pub site: String,

    /// Auth token (plaintext -- prefer keyring or env var).
    pub auth_token: Option<String>,

    /// Environment variable name containing the auth token.
    pub auth_token_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    /// Keep the site live via the event stream (TUI). Default: true.
    pub streaming: Option<bool>,
}

fn default_site() -> String {
    "default".into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "relevancy", "relevancy").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("relevancy");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    debug!(path = %path.display(), profiles = config.profiles.len(), "config loaded");
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Auth token resolution (without CLI flags) ───────────────────────

/// Keyring entry holding a profile's auth token.
pub fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/auth-token"),
    )?)
}

/// Resolve a profile's auth token from the credential chain.
///
/// Order: `auth_token_env` variable, system keyring, plaintext in config.
/// `None` means the database is accessed without a token.
pub fn resolve_auth_token(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    // 1. Profile's auth_token_env → env var lookup
    if let Some(ref env_name) = profile.auth_token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    profile
        .auth_token
        .as_ref()
        .map(|token| SecretString::from(token.clone()))
}

/// Parse and check a database root URL.
pub fn parse_root(raw: &str) -> Result<url::Url, ConfigError> {
    let url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
        field: "root".into(),
        reason: format!("invalid URL: {raw}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "root".into(),
            reason: format!("expected an http(s) URL, got '{raw}'"),
        });
    }
    Ok(url)
}

/// Build a `SessionConfig` from a profile -- no CLI flag overrides.
///
/// Suitable for the TUI and other non-CLI consumers; streaming stays on
/// unless the profile turns it off.
pub fn profile_to_session_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<SessionConfig, ConfigError> {
    let root = parse_root(&profile.root)?;

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    Ok(SessionConfig {
        root,
        site: profile.site.clone(),
        auth_token: resolve_auth_token(profile, profile_name),
        tls,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        streaming: profile.streaming.unwrap_or(true),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    fn profile(root: &str) -> Profile {
        Profile {
            root: root.into(),
            site: "acme".into(),
            auth_token: None,
            auth_token_env: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
            streaming: None,
        }
    }

    #[test]
    fn loads_profiles_from_toml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                default_profile = "prod"

                [defaults]
                timeout = 10
                ordering = false

                [profiles.prod]
                root = "https://relevancy.example.com"
                site = "acme"
                "#,
            )?;

            let config = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;

            assert_eq!(config.active_profile_name(None), "prod");
            assert_eq!(config.defaults.timeout, 10);
            assert_eq!(config.defaults.output, "table");
            assert!(!config.controller_config().ordering);
            assert_eq!(
                config.controller_config().alert_timeout,
                Duration::from_millis(5000)
            );
            let prod = config.profile("prod").map_err(|e| e.to_string())?;
            assert_eq!(prod.site, "acme");
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file_values() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[defaults]\ntimeout = 10\n")?;
            jail.set_env("RELEVANCY_DEFAULTS__TIMEOUT", "3");
            jail.set_env("RELEVANCY_DEFAULT_PROFILE", "staging");

            let config = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;

            assert_eq!(config.defaults.timeout, 3);
            assert_eq!(config.default_profile.as_deref(), Some("staging"));
            Ok(())
        });
    }

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|_jail| {
            let config =
                load_config_from(Path::new("does-not-exist.toml")).map_err(|e| e.to_string())?;
            assert!(config.profiles.is_empty());
            assert_eq!(config.defaults.alert_timeout_ms, 5000);
            Ok(())
        });
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config
            .profiles
            .insert("default".into(), profile("https://relevancy.example.com"));
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.profiles["default"].root, "https://relevancy.example.com");
    }

    #[test]
    fn token_env_var_wins_over_plaintext() {
        Jail::expect_with(|jail| {
            jail.set_env("ACME_RELEVANCY_TOKEN", "from-env");
            let mut p = profile("https://relevancy.example.com");
            p.auth_token = Some("from-file".into());
            p.auth_token_env = Some("ACME_RELEVANCY_TOKEN".into());

            let token = resolve_auth_token(&p, "jail-test-profile");
            assert_eq!(token.map(|t| t.expose_secret().to_owned()).as_deref(), Some("from-env"));
            Ok(())
        });
    }

    #[test]
    fn session_config_applies_profile_overrides() {
        let mut p = profile("https://relevancy.example.com/tenant");
        p.insecure = Some(true);
        p.timeout = Some(7);
        p.streaming = Some(false);

        let session = profile_to_session_config(&p, "default", &Defaults::default()).unwrap();

        assert_eq!(session.root.as_str(), "https://relevancy.example.com/tenant");
        assert_eq!(session.site, "acme");
        assert_eq!(session.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(session.timeout, Duration::from_secs(7));
        assert!(!session.streaming);
    }

    #[test]
    fn non_http_root_is_rejected() {
        assert!(matches!(
            parse_root("ftp://example.com"),
            Err(ConfigError::Validation { .. })
        ));
        assert!(matches!(
            parse_root("not a url"),
            Err(ConfigError::Validation { .. })
        ));
    }
}
