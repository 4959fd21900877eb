//! CLI configuration -- thin wrapper around `relevancy_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--root, --site, --token, --insecure, --timeout).

use std::time::Duration;

use secrecy::SecretString;

use relevancy_core::{SessionConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use relevancy_config::{
    Config, Profile, config_path, keyring_entry, load_config_or_default, save_config,
};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// Build the session config for one CLI invocation.
///
/// Flags win over the profile; without a profile `--root` is required.
/// The event stream is always off: a CLI run is a single request cycle.
pub fn resolve_session_config(
    global: &GlobalOpts,
    config: &Config,
) -> Result<SessionConfig, CliError> {
    let profile_name = active_profile_name(global, config);
    let profile = config.profiles.get(&profile_name);

    if global.profile.is_some() && profile.is_none() {
        return Err(CliError::ProfileNotFound {
            name: profile_name,
            available: available_profiles(config),
        });
    }

    // 1. Root (flag > env > profile)
    let root_str = global
        .root
        .as_deref()
        .or(profile.map(|p| p.root.as_str()))
        .ok_or_else(|| CliError::NoConfig {
            path: config_path().display().to_string(),
        })?;
    let root = relevancy_config::parse_root(root_str)?;

    // 2. Site
    let site = global
        .site
        .clone()
        .or_else(|| profile.map(|p| p.site.clone()))
        .unwrap_or_else(|| "default".into());
    if site.is_empty() || site.contains('/') {
        return Err(CliError::Validation {
            field: "site".into(),
            reason: format!("'{site}' is not a valid site key"),
        });
    }

    // 3. Auth token (flag > profile chain)
    let auth_token = global
        .token
        .as_ref()
        .map(|t| SecretString::from(t.clone()))
        .or_else(|| profile.and_then(|p| relevancy_config::resolve_auth_token(p, &profile_name)));

    // 4. TLS verification
    let insecure = global.insecure
        || profile
            .and_then(|p| p.insecure)
            .unwrap_or(config.defaults.insecure);
    let tls = if insecure {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ca_path) = profile.and_then(|p| p.ca_cert.clone()) {
        TlsVerification::CustomCa(ca_path)
    } else {
        TlsVerification::SystemDefaults
    };

    Ok(SessionConfig {
        root,
        site,
        auth_token,
        tls,
        timeout: Duration::from_secs(global.timeout),
        streaming: false,
    })
}

/// Comma-separated profile names for help text.
pub fn available_profiles(config: &Config) -> String {
    let mut names: Vec<&str> = config.profiles.keys().map(String::as_str).collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort_unstable();
    names.join(", ")
}
