// ── Domain model ──

pub mod alert;
pub mod case;
pub mod site;

pub use alert::{Alert, AlertClass, AlertType};
pub use case::{Case, CaseId};
pub use site::Site;
