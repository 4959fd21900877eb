// ── Case identity and record ──
//
// A case lives at `sites/<site>/cases/<id>`, where the id is the lowercased
// display name. Two names differing only in letter case map to the same id.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── CaseId ──────────────────────────────────────────────────────────

/// Key of a case under its site's `cases` map.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseId(String);

impl CaseId {
    /// Derive the id for a user-supplied case name.
    pub fn from_name(name: &str) -> Self {
        Self(name.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the store accepts this id as a single child key: non-empty,
    /// no `/`, none of `. # $ [ ]`, and no control characters.
    pub fn is_storable(&self) -> bool {
        !self.0.is_empty()
            && !self
                .0
                .chars()
                .any(|c| FORBIDDEN_KEY_CHARS.contains(&c) || c.is_control())
    }
}

/// Characters the store refuses in keys.
const FORBIDDEN_KEY_CHARS: [char; 6] = ['/', '.', '#', '$', '[', ']'];

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw keys read back from the store are taken verbatim.
impl From<String> for CaseId {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for CaseId {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

impl FromStr for CaseId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl AsRef<str> for CaseId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ── Case ────────────────────────────────────────────────────────────

/// A named relevancy case. Wire shape: `{"name": ..., ".priority": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    /// Display name exactly as the user typed it.
    pub name: String,
    /// Store ordering value; newer cases carry a smaller (more negative) one.
    #[serde(rename = ".priority", default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<serde_json::Number>,
}

impl Case {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: None,
        }
    }

    /// A case whose priority sorts it ahead of everything created before `now`.
    pub fn newest_first(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            priority: Some(serde_json::Number::from(-now.timestamp_millis())),
        }
    }

    /// Numeric priority, if any.
    pub fn priority_value(&self) -> Option<f64> {
        self.priority.as_ref().and_then(serde_json::Number::as_f64)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn id_is_lowercased_name() {
        assert_eq!(CaseId::from_name("Hiking Boots").as_str(), "hiking boots");
        assert_eq!(CaseId::from_name("ÉTÉ").as_str(), "été");
        assert!(CaseId::from_name("").is_empty());
    }

    #[test]
    fn storable_ids_exclude_store_path_characters() {
        assert!(CaseId::from_name("Hiking Boots").is_storable());
        for bad in ["boots/winter", "v1.2", "a#b", "$x", "[a]", "a]", "tab\there", ""] {
            assert!(!CaseId::from_name(bad).is_storable(), "{bad:?}");
        }
    }

    #[test]
    fn newest_first_uses_negative_millis() {
        let now = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let case = Case::newest_first("Boots", now);
        assert_eq!(
            serde_json::to_value(&case).unwrap(),
            json!({ "name": "Boots", ".priority": -1_700_000_000_123_i64 })
        );
    }

    #[test]
    fn plain_case_omits_priority() {
        let case = Case::new("Boots");
        assert_eq!(serde_json::to_value(&case).unwrap(), json!({ "name": "Boots" }));
    }

    #[test]
    fn float_priority_is_accepted() {
        let case: Case = serde_json::from_value(json!({ "name": "Tents", ".priority": 2.5 })).unwrap();
        assert_eq!(case.priority_value(), Some(2.5));
    }
}
