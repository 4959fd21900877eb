//! `relevancy-tui` -- terminal UI for a site's relevancy test cases.
//!
//! Binds to `sites/<site>` in the realtime store and keeps the case list
//! live through the store's event stream. Type a name and press Enter to
//! add a case; select one and press `d` to delete it after confirmation.
//!
//! Logs are written to a file (default `/tmp/relevancy-tui.log`) to avoid
//! corrupting the terminal UI.

mod action;
mod app;
mod component;
mod data_bridge;
mod dialog;
mod event;
mod screens;
mod theme;
mod tui;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use secrecy::SecretString;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use relevancy_config::Config;
use relevancy_core::{SessionConfig, SiteSession};

use crate::app::App;

/// Terminal UI for curating a site's relevancy test cases.
#[derive(Parser, Debug)]
#[command(name = "relevancy-tui", version, about)]
struct Cli {
    /// Config profile to use
    #[arg(short = 'p', long, env = "RELEVANCY_PROFILE")]
    profile: Option<String>,

    /// Database root URL (overrides profile)
    #[arg(short = 'r', long, env = "RELEVANCY_ROOT")]
    root: Option<String>,

    /// Site key under `sites/` (overrides profile)
    #[arg(short = 's', long, env = "RELEVANCY_SITE")]
    site: Option<String>,

    /// Auth token appended to store requests
    #[arg(long, env = "RELEVANCY_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Log file path (defaults to /tmp/relevancy-tui.log)
    #[arg(long, default_value = "/tmp/relevancy-tui.log")]
    log_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// File-based tracing; stdout/stderr belong to the terminal UI. The guard
/// must outlive the app so buffered lines get flushed.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "relevancy_tui={log_level},relevancy_core={log_level},relevancy_api={log_level}"
        ))
    });

    let log_dir = cli
        .log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(std::path::Path::new("/tmp"));
    let log_filename = cli
        .log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("relevancy-tui.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();

    guard
}

/// Merge command-line overrides over the config profile.
///
/// An explicit `--root` works without any config file; otherwise the
/// active profile must exist.
fn resolve_session_config(cli: &Cli, cfg: &Config) -> Result<SessionConfig> {
    let profile_name = cfg.active_profile_name(cli.profile.as_deref());
    let profile = cfg.profiles.get(&profile_name);

    if cli.profile.is_some() && profile.is_none() {
        return Err(eyre!("profile '{profile_name}' not found in config"));
    }

    let mut session = match (&cli.root, profile) {
        (Some(root), _) => {
            let mut session = SessionConfig::new(relevancy_config::parse_root(root)?, "default");
            if let Some(profile) = profile {
                let from_profile =
                    relevancy_config::profile_to_session_config(profile, &profile_name, &cfg.defaults)?;
                session = SessionConfig {
                    root: session.root,
                    ..from_profile
                };
            }
            session
        }
        (None, Some(profile)) => {
            relevancy_config::profile_to_session_config(profile, &profile_name, &cfg.defaults)?
        }
        (None, None) => {
            return Err(eyre!(
                "no database root configured; pass --root or run `relevancy config init`"
            ));
        }
    };

    if let Some(ref site) = cli.site {
        session.site.clone_from(site);
    }
    if session.site.is_empty() || session.site.contains('/') {
        return Err(eyre!("invalid site key '{}'", session.site));
    }
    if let Some(ref token) = cli.token {
        session.auth_token = Some(SecretString::from(token.clone()));
    }
    session.streaming = true;

    Ok(session)
}

#[tokio::main]
async fn main() -> Result<()> {
    tui::install_hooks()?;

    let cli = Cli::parse();
    let _guard = setup_tracing(&cli);

    let cfg = relevancy_config::load_config_or_default();
    let session_config = resolve_session_config(&cli, &cfg)?;

    info!(
        root = %session_config.root,
        site = %session_config.site,
        "starting relevancy-tui"
    );

    let session = SiteSession::new(session_config);
    let mut app = App::new(session, cfg.controller_config());
    app.run().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use relevancy_config::Profile;
    use secrecy::ExposeSecret;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("relevancy-tui").chain(args.iter().copied())).unwrap()
    }

    fn config_with_profile() -> Config {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile {
                root: "https://relevancy.example.com".into(),
                site: "acme".into(),
                auth_token: Some("secret".into()),
                auth_token_env: None,
                ca_cert: None,
                insecure: None,
                timeout: None,
                streaming: Some(false),
            },
        );
        cfg
    }

    #[test]
    fn explicit_root_needs_no_config() {
        let session =
            resolve_session_config(&cli(&["--root", "http://localhost:9000"]), &Config::default())
                .unwrap();
        assert_eq!(session.root.as_str(), "http://localhost:9000/");
        assert_eq!(session.site, "default");
        assert!(session.streaming);
    }

    #[test]
    fn flags_override_profile() {
        let session = resolve_session_config(
            &cli(&["--site", "globex", "--token", "flag-token"]),
            &config_with_profile(),
        )
        .unwrap();
        assert_eq!(session.root.as_str(), "https://relevancy.example.com/");
        assert_eq!(session.site, "globex");
        assert_eq!(session.auth_token.unwrap().expose_secret(), "flag-token");
        assert!(session.streaming);
    }

    #[test]
    fn missing_root_and_profile_is_an_error() {
        assert!(resolve_session_config(&cli(&[]), &Config::default()).is_err());
        assert!(resolve_session_config(&cli(&["-p", "nope"]), &config_with_profile()).is_err());
    }

    #[test]
    fn nested_site_key_is_rejected() {
        let err = resolve_session_config(&cli(&["-s", "a/b"]), &config_with_profile()).unwrap_err();
        assert!(err.to_string().contains("invalid site key"));
    }
}
