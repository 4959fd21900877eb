// ── Site domain type ──

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::case::{Case, CaseId};

/// A site document: an optional display name and its cases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// Key under `sites/`.
    pub id: String,
    pub name: Option<String>,
    pub cases: BTreeMap<CaseId, Case>,
}

impl Site {
    /// A site with no data (the store holds `null` at its path).
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Build a typed view of a raw site document.
    ///
    /// Unknown fields are ignored and malformed case entries are skipped,
    /// so one bad record never hides the rest of the site.
    pub fn from_document(id: &str, doc: &serde_json::Value) -> Self {
        let mut site = Self::empty(id);

        let Some(obj) = doc.as_object() else {
            if !doc.is_null() {
                debug!(site = id, "site document is not an object; treating as empty");
            }
            return site;
        };

        site.name = obj
            .get("name")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned);

        if let Some(cases) = obj.get("cases").and_then(serde_json::Value::as_object) {
            for (key, value) in cases {
                match serde_json::from_value::<Case>(value.clone()) {
                    Ok(case) => {
                        site.cases.insert(CaseId::from(key.as_str()), case);
                    }
                    Err(e) => debug!(site = id, case = %key, error = %e, "skipping malformed case"),
                }
            }
        }

        site
    }

    pub fn contains(&self, id: &CaseId) -> bool {
        self.cases.contains_key(id)
    }

    pub fn case(&self, id: &CaseId) -> Option<&Case> {
        self.cases.get(id)
    }

    /// Cases in store priority order: unprioritized first, then ascending
    /// priority (newest first), ties broken by key.
    pub fn ordered_cases(&self) -> Vec<(&CaseId, &Case)> {
        let mut cases: Vec<_> = self.cases.iter().collect();
        // Stable sort keeps the BTreeMap key order within equal priorities.
        cases.sort_by(|(_, a), (_, b)| match (a.priority_value(), b.priority_value()) {
            (None, None) => std::cmp::Ordering::Equal,
            (None, Some(_)) => std::cmp::Ordering::Less,
            (Some(_), None) => std::cmp::Ordering::Greater,
            (Some(x), Some(y)) => x.total_cmp(&y),
        });
        cases
    }

    /// Display label: the site's name when set, its key otherwise.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}
