//! Raw resource → canonical record normalization.
//!
//! Normalizers are pure: they read a raw resource and never perform I/O.
//! Member lookups test presence (member exists and is not JSON `null`), so
//! `false`, `0` and `""` count as present values.

mod observation;
mod patient;

pub use observation::normalize_observation;
pub use patient::normalize_patient;

use serde_json::Value;

/// Returns the member `key` of `value` if it exists and is not `null`.
pub(crate) fn present<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key).filter(|v| !v.is_null())
}

/// Returns the member `key` as a string slice.
pub(crate) fn present_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    present(value, key).and_then(Value::as_str)
}

/// Label used in log lines and errors, e.g. `Observation/o1`.
pub(crate) fn resource_label(value: &Value, fallback_type: &str) -> String {
    let resource_type = present_str(value, "resourceType").unwrap_or(fallback_type);
    match present_str(value, "id") {
        Some(id) => format!("{resource_type}/{id}"),
        None => format!("{resource_type}/<no id>"),
    }
}
