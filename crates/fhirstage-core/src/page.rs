//! Search result pages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Navigation link of a searchset Bundle.
///
/// Both members are optional on the wire; a link without a `url` is kept but
/// never followed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub relation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Link {
    pub fn new(relation: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            url: Some(url.into()),
        }
    }
}

/// Wire shape of a searchset Bundle, reduced to the members pagination needs.
///
/// Servers omit `entry` when a page has no matches.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Bundle {
    #[serde(default)]
    pub entry: Vec<BundleEntry>,
    #[serde(default)]
    pub link: Vec<Link>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BundleEntry {
    #[serde(default)]
    pub resource: Option<Value>,
}

/// One page of raw resources plus its navigation links.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Raw entry resources in page order. Entries without a `resource`
    /// are kept as `Value::Null` so they surface as malformed records.
    pub entries: Vec<Value>,
    pub links: Vec<Link>,
}

impl Page {
    pub fn new(entries: Vec<Value>, links: Vec<Link>) -> Self {
        Self { entries, links }
    }

    /// URL of the first `next` link that carries a non-empty URL.
    pub fn next_url(&self) -> Option<&str> {
        self.links
            .iter()
            .filter(|l| l.relation == "next")
            .find_map(|l| l.url.as_deref().filter(|url| !url.trim().is_empty()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Bundle> for Page {
    fn from(bundle: Bundle) -> Self {
        let entries = bundle
            .entry
            .into_iter()
            .map(|e| e.resource.unwrap_or(Value::Null))
            .collect();
        Self {
            entries,
            links: bundle.link,
        }
    }
}
