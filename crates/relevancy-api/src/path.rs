// Store path construction.
//
// A store path is a sequence of child keys below the database root.
// REST URLs append `.json` to the last segment: `<root>/sites/acme.json`.

use std::fmt;

use url::Url;

use crate::error::Error;

/// Characters the realtime store does not allow in a key.
const RESERVED_KEY_CHARS: [char; 6] = ['/', '.', '#', '$', '[', ']'];

/// A slash-separated location in the store, e.g. `sites/acme/cases/boots`.
///
/// Segments are kept raw; percent-encoding happens only when the path is
/// rendered into a URL, so keys containing spaces or unicode survive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    /// The database root.
    pub fn root() -> Self {
        Self::default()
    }

    /// `sites/<site>`
    pub fn site(site: &str) -> Result<Self, Error> {
        Self::root().child("sites")?.child(site)
    }

    /// `sites/<site>/cases`
    pub fn cases(site: &str) -> Result<Self, Error> {
        Self::site(site)?.child("cases")
    }

    /// `sites/<site>/cases/<case>`
    pub fn case(site: &str, case: &str) -> Result<Self, Error> {
        Self::cases(site)?.child(case)
    }

    /// Append one child key. Empty keys, keys containing a store-reserved
    /// character (`/ . # $ [ ]`) and keys with control characters are rejected.
    pub fn child(mut self, segment: &str) -> Result<Self, Error> {
        if segment.is_empty()
            || segment
                .chars()
                .any(|c| RESERVED_KEY_CHARS.contains(&c) || c.is_control())
        {
            return Err(Error::InvalidPath(segment.to_owned()));
        }
        self.segments.push(segment.to_owned());
        Ok(self)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Render the REST URL for this path below `root`.
    ///
    /// Any path already present on `root` is kept as a prefix, so a root of
    /// `https://db.example.com/tenant` yields `https://db.example.com/tenant/sites/acme.json`.
    pub fn to_url(&self, root: &Url) -> Result<Url, Error> {
        let mut url = root.clone();
        url.set_query(None);
        url.set_fragment(None);
        {
            let mut parts = url
                .path_segments_mut()
                .map_err(|()| Error::InvalidRoot(root.to_string()))?;
            parts.pop_if_empty();
            match self.segments.split_last() {
                None => {
                    parts.push(".json");
                }
                Some((last, init)) => {
                    parts.extend(init);
                    parts.push(&format!("{last}.json"));
                }
            }
        }
        Ok(url)
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn root() -> Url {
        Url::parse("https://relevancy.example.com").unwrap()
    }

    #[test]
    fn case_path_renders_rest_url() {
        let path = StorePath::case("acme", "boots").unwrap();
        assert_eq!(path.to_string(), "/sites/acme/cases/boots");
        assert_eq!(
            path.to_url(&root()).unwrap().as_str(),
            "https://relevancy.example.com/sites/acme/cases/boots.json"
        );
    }

    #[test]
    fn root_path_renders_dot_json() {
        assert_eq!(
            StorePath::root().to_url(&root()).unwrap().as_str(),
            "https://relevancy.example.com/.json"
        );
    }

    #[test]
    fn root_prefix_and_trailing_slash_are_kept() {
        let root = Url::parse("https://db.example.com/tenant/?ns=x").unwrap();
        let url = StorePath::site("acme").unwrap().to_url(&root).unwrap();
        assert_eq!(url.as_str(), "https://db.example.com/tenant/sites/acme.json");
    }

    #[test]
    fn segments_are_percent_encoded() {
        let url = StorePath::case("acme", "hiking boots")
            .unwrap()
            .to_url(&root())
            .unwrap();
        assert_eq!(url.path(), "/sites/acme/cases/hiking%20boots.json");
    }

    #[test]
    fn empty_and_nested_segments_are_rejected() {
        assert!(matches!(
            StorePath::case("acme", ""),
            Err(Error::InvalidPath(_))
        ));
        assert!(matches!(
            StorePath::case("acme", "a/b"),
            Err(Error::InvalidPath(_))
        ));
    }

    #[test]
    fn reserved_key_characters_are_rejected() {
        for bad in ["v1.2", "a#b", "$x", "[a", "a]", "line\nbreak"] {
            assert!(
                matches!(StorePath::case("acme", bad), Err(Error::InvalidPath(_))),
                "{bad:?}"
            );
        }
        assert!(StorePath::case("acme", "hiking boots").is_ok());
    }
}
