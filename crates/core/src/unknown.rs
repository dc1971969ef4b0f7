//! The "field not exposed by this platform" marker.
//!
//! Classification fields are strings; an absent value is never an empty string
//! or `None` once a record leaves the correlation pass, it is [`UNKNOWN`].
//! Numeric totals do not use the sentinel: a missing measurement counts as zero.

pub const UNKNOWN: &str = "unknown";

pub fn unknown() -> String {
    UNKNOWN.to_string()
}

pub fn is_unknown(value: &str) -> bool {
    value == UNKNOWN
}

/// Returns the trimmed value when it carries information, the sentinel otherwise.
pub fn or_unknown(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => unknown(),
    }
}

/// Replaces `slot` only while it still holds the sentinel and `value` is real.
pub fn fill(slot: &mut String, value: Option<&str>) {
    if !is_unknown(slot) {
        return;
    }
    overwrite(slot, value);
}

/// Writes `value` into `slot` unless it is blank or the sentinel itself.
///
/// Overlays applied later in a pass win over earlier ones, but none of them
/// can put the sentinel back over a value.
pub fn overwrite(slot: &mut String, value: Option<&str>) {
    let Some(value) = value.map(str::trim) else {
        return;
    };
    if value.is_empty() || is_unknown(value) {
        return;
    }
    *slot = value.to_string();
}
