//! Reference id extraction.
//!
//! Staging rows store bare identifiers, so references such as
//! `managingOrganization.reference` or `subject.reference` are reduced to
//! the segment after the first `/`. The type segment is not checked and
//! anything after the id (`/_history/2`, trailing segments) is ignored.
//!
//! Absolute references carry an unknown server base, so for those the id
//! is the last path segment once a `_history` suffix is removed.
//!
//! Contained (`#id`) and URN references carry no id segment and are rejected.
//!
//! ```
//! use fhirstage_core::reference::reference_id;
//!
//! assert_eq!(reference_id("Organization/f1").unwrap(), "f1");
//! assert_eq!(reference_id("organization/f1/extra").unwrap(), "f1");
//! assert!(reference_id("#contained").is_err());
//! ```

use crate::error::CoreError;

/// Returns the id segment of `reference`.
pub fn reference_id(reference: &str) -> Result<String, CoreError> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return Err(CoreError::invalid_reference("empty reference"));
    }
    if trimmed.starts_with('#') || trimmed.starts_with("urn:") {
        return Err(CoreError::invalid_reference(format!(
            "{trimmed} does not name a resource id"
        )));
    }

    let id = match trimmed.split_once("://") {
        Some((_, rest)) => absolute_id(rest),
        None => trimmed
            .trim_start_matches('/')
            .split_once('/')
            .and_then(|(_, rest)| rest.split('/').next()),
    };

    id.filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| CoreError::invalid_reference(format!("{trimmed} has no id segment")))
}

/// `rest` is an absolute URL without its scheme.
fn absolute_id(rest: &str) -> Option<&str> {
    let (_, path) = rest.split_once('/')?;
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if let Some(pos) = segments.iter().rposition(|s| *s == "_history") {
        segments.truncate(pos);
    }
    // Needs at least Type/id after the base
    if segments.len() < 2 {
        return None;
    }
    segments.last().copied()
}
