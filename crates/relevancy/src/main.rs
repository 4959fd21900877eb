mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use relevancy_core::SiteSession;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't touch the store
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "relevancy", &mut std::io::stdout());
            Ok(())
        }

        Command::Cases(args) => {
            let cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(&cli.global, &cfg);
            let session_config = config::resolve_session_config(&cli.global, &cfg)?;
            let controller_config = cfg.controller_config();

            tracing::debug!(command = ?args.command, site = %session_config.site, "dispatching command");

            let session = SiteSession::new(session_config);
            session.connect().await.map_err(|e| with_profile(e.into(), &profile_name))?;
            let result =
                commands::cases::handle(&session, controller_config, args, &cli.global).await;
            session.disconnect().await;
            result.map_err(|e| with_profile(e, &profile_name))
        }
    }
}

/// Point auth-failure help text at the profile actually in use.
fn with_profile(err: CliError, profile_name: &str) -> CliError {
    match err {
        CliError::AuthFailed { message, .. } => CliError::AuthFailed {
            profile: profile_name.to_owned(),
            message,
        },
        other => other,
    }
}
