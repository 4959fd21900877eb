//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text and a distinct process exit code.

use miette::Diagnostic;
use thiserror::Error;

use relevancy_config::ConfigError;
use relevancy_core::{CaseId, CoreError};

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to the store at {url}")]
    #[diagnostic(
        code(relevancy::connection_failed),
        help(
            "Check that the database root is reachable.\n\
             URL: {url}\n\
             Self-signed certificate? Try --insecure (-k)."
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(relevancy::auth_failed),
        help(
            "Verify the auth token for profile '{profile}'.\n\
             Run: relevancy config set-token --profile {profile}\n\
             Or set RELEVANCY_TOKEN."
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("Permission denied for {path}")]
    #[diagnostic(
        code(relevancy::permission_denied),
        help("The store's security rules refused this request. Check the token's access.")
    )]
    PermissionDenied { path: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(relevancy::not_found),
        help("Run: relevancy {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{resource_type} '{identifier}' already exists")]
    #[diagnostic(
        code(relevancy::conflict),
        help("Case keys are lowercased names; please use a different name.")
    )]
    Conflict {
        resource_type: String,
        identifier: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("Store error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    #[diagnostic(code(relevancy::api_error))]
    ApiError { status: Option<u16>, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(relevancy::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(relevancy::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: relevancy config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No database root configured")]
    #[diagnostic(
        code(relevancy::no_config),
        help(
            "Create a profile with: relevancy config init\n\
             Or pass --root / set RELEVANCY_ROOT.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(relevancy::config))]
    Config(Box<figment::Error>),

    #[error("Keyring error: {0}")]
    #[diagnostic(
        code(relevancy::keyring),
        help("Store the token in the config file or RELEVANCY_TOKEN instead.")
    )]
    Keyring(#[from] keyring::Error),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(relevancy::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out")]
    #[diagnostic(
        code(relevancy::timeout),
        help("Increase timeout with --timeout or check the store's responsiveness.")
    )]
    Timeout,

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(relevancy::output))]
    Output(String),

    #[error("Internal error: {0}")]
    #[diagnostic(code(relevancy::internal))]
    Internal(String),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::PermissionDenied { .. } => exit_code::PERMISSION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                profile: "default".into(),
                message,
            },

            CoreError::PermissionDenied { path } => CliError::PermissionDenied { path },

            CoreError::SessionClosed => CliError::ConnectionFailed {
                url: "(disconnected)".into(),
                source: "Site session is not connected".into(),
            },

            CoreError::Timeout => CliError::Timeout,

            CoreError::CaseNameRejected { name } if name.is_empty() => CliError::Validation {
                field: "name".into(),
                reason: "please use a different name".into(),
            },

            CoreError::CaseNameRejected { name } if !CaseId::from_name(&name).is_storable() => {
                CliError::Validation {
                    field: "name".into(),
                    reason: format!(
                        "'{name}' cannot be used as a case key (no '/', '.', '#', '$', '[' or ']')"
                    ),
                }
            }

            CoreError::CaseNameRejected { name } => CliError::Conflict {
                resource_type: "case".into(),
                identifier: name.to_lowercase(),
            },

            CoreError::CaseNotFound { id } => CliError::NotFound {
                resource_type: "case".into(),
                identifier: id,
                list_command: "cases list".into(),
            },

            CoreError::Confirmation { .. } => CliError::NonInteractiveRequiresYes {
                action: "cases remove".into(),
            },

            CoreError::Api { message, status } => CliError::ApiError { status, message },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::ProfileNotFound { name } => CliError::ProfileNotFound {
                name,
                available: "(none)".into(),
            },
            ConfigError::Keyring(e) => CliError::Keyring(e),
            ConfigError::Serialization(e) => CliError::Output(e.to_string()),
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}
