//! Reactive data layer between `relevancy-api` and UI consumers (CLI / TUI).
//!
//! This crate owns the domain model and the case collection controller:
//!
//! - **[`CaseController`]** -- Mediates `add_case` / `remove_case` against a
//!   live site and drives the transient [`Alert`] shown after each add.
//!   Its collaborators ([`LiveSite`], [`CaseRemover`], [`Confirmation`]) are
//!   explicit constructor parameters.
//!
//! - **[`SiteSession`]** -- Full lifecycle for one bound site:
//!   [`connect()`](SiteSession::connect) loads the document, then spawns a
//!   write queue and an event-stream bridge.
//!   [`SiteSession::oneshot()`](SiteSession::oneshot) provides a lightweight
//!   mode for single CLI invocations.
//!
//! - **[`SiteStore`]** -- Mirror of the site document (`watch` channel of
//!   typed [`Site`] snapshots), updated by `put` / `patch` events.
//!
//! - **[`SiteStream`]** -- Subscription handle vended by the store.
//!   Exposes `current()` / `latest()` / `changed()` for reactive rendering.

pub mod binding;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod session;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use binding::{CaseRemover, ConfirmOutcome, ConfirmRequest, Confirmation, LiveSite};
pub use config::{CaseControllerConfig, SessionConfig, TlsVerification};
pub use controller::{CaseController, RemoveOutcome};
pub use error::CoreError;
pub use model::{Alert, AlertClass, AlertType, Case, CaseId, Site};
pub use session::{ConnectionState, SiteSession};
pub use store::SiteStore;
pub use stream::SiteStream;
