//! Case command handlers.

use std::fmt::Write;
use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use relevancy_core::{
    Case, CaseController, CaseControllerConfig, CaseId, CoreError, RemoveOutcome, Site,
    SiteSession,
};

use crate::cli::{CasesArgs, CasesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util::PromptConfirmation;

// ── Row / entry types ────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CaseEntry {
    id: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<serde_json::Number>,
}

impl CaseEntry {
    fn new(id: &CaseId, case: &Case) -> Self {
        Self {
            id: id.to_string(),
            name: case.name.clone(),
            priority: case.priority.clone(),
        }
    }
}

#[derive(Tabled)]
struct CaseRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Priority")]
    priority: String,
}

impl From<&CaseEntry> for CaseRow {
    fn from(e: &CaseEntry) -> Self {
        Self {
            id: e.id.clone(),
            name: e.name.clone(),
            priority: e
                .priority
                .as_ref()
                .map_or_else(|| "-".into(), ToString::to_string),
        }
    }
}

fn detail(e: &CaseEntry) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "ID:       {}", e.id);
    let _ = writeln!(out, "Name:     {}", e.name);
    if let Some(ref p) = e.priority {
        let _ = write!(out, "Priority: {p}");
    }
    out.trim_end().to_owned()
}

fn entries(site: &Site) -> Vec<CaseEntry> {
    site.ordered_cases()
        .into_iter()
        .map(|(id, case)| CaseEntry::new(id, case))
        .collect()
}

/// Exact key first, then the lowercased form `cases add` would have produced.
fn resolve_case_id(site: &Site, raw: &str) -> Result<CaseId, CoreError> {
    let exact = CaseId::from(raw);
    if site.contains(&exact) {
        return Ok(exact);
    }
    let lowered = CaseId::from_name(raw);
    if site.contains(&lowered) {
        return Ok(lowered);
    }
    Err(CoreError::CaseNotFound { id: raw.to_owned() })
}

// ── Handler ──────────────────────────────────────────────────────────

pub async fn handle(
    session: &SiteSession,
    controller_config: CaseControllerConfig,
    args: CasesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let controller = CaseController::new(
        Arc::new(session.clone()),
        Arc::new(session.clone()),
        Arc::new(PromptConfirmation::new(global.yes, global.quiet)),
        controller_config,
    );

    match args.command {
        CasesCommand::List => {
            let site = controller.site().latest();
            let data = entries(&site);
            let out = output::render_list(&global.output, &data, |e| CaseRow::from(e), |e| {
                e.id.clone()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CasesCommand::Add { name } => {
            let added = controller.add_case(Some(&name));
            if let Some(alert) = controller.current_alert() {
                output::print_alert(&alert, &global.color, global.quiet);
            }
            let id = added?;
            session.flush().await?;

            let site = controller.site().latest();
            let entry = site.case(&id).map_or_else(
                || CaseEntry {
                    id: id.to_string(),
                    name: name.clone(),
                    priority: None,
                },
                |case| CaseEntry::new(&id, case),
            );
            let out = output::render_single(&global.output, &entry, detail, |e| e.id.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CasesCommand::Remove { id } => {
            let id = resolve_case_id(&controller.site().latest(), &id)?;
            match controller.remove_case(&id).await? {
                RemoveOutcome::Removed => {}
                RemoveOutcome::Kept => {
                    if !global.quiet {
                        eprintln!("Case '{id}' kept");
                    }
                }
            }
            Ok(())
        }
    }
}
