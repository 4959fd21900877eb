//! Shared helpers for command handlers.

use std::io::IsTerminal;

use async_trait::async_trait;

use relevancy_core::{ConfirmOutcome, ConfirmRequest, Confirmation, CoreError};

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}

/// Terminal confirmation surface for the case controller.
///
/// `--yes` answers every prompt; otherwise a dialoguer prompt runs on a
/// blocking thread. Esc or `q` dismisses it.
pub struct PromptConfirmation {
    assume_yes: bool,
    quiet: bool,
}

impl PromptConfirmation {
    pub fn new(assume_yes: bool, quiet: bool) -> Self {
        Self { assume_yes, quiet }
    }
}

#[async_trait]
impl Confirmation for PromptConfirmation {
    async fn confirm(&self, request: &ConfirmRequest) -> Result<ConfirmOutcome, CoreError> {
        if self.assume_yes {
            return Ok(ConfirmOutcome::Confirmed);
        }
        if !std::io::stdin().is_terminal() {
            return Err(CoreError::Confirmation {
                message: "stdin is not a terminal".into(),
            });
        }

        let prompt = request.message.clone();
        let answer = tokio::task::spawn_blocking(move || {
            dialoguer::Confirm::new()
                .with_prompt(prompt)
                .default(false)
                .interact_opt()
        })
        .await
        .map_err(|e| CoreError::Confirmation {
            message: e.to_string(),
        })?
        .map_err(|e| CoreError::Confirmation {
            message: e.to_string(),
        })?;

        Ok(match answer {
            Some(true) => ConfirmOutcome::Confirmed,
            Some(false) => ConfirmOutcome::Cancelled,
            None => ConfirmOutcome::Dismissed,
        })
    }

    async fn acknowledge(&self, message: &str) {
        if !self.quiet {
            eprintln!("✓ {message}");
        }
    }
}
