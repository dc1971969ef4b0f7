//! Device identifiers and their canonical form.
//!
//! Bus addresses come back from different tables with different escaping: a
//! PnP id such as `PCI\VEN_10DE&DEV_2204\4&1A2B` may arrive raw from one query
//! and with doubled backslashes from another. Every backslash run of length
//! `n` stands for `ceil(n / 2)` literal backslashes, and the canonical form
//! writes each literal one doubled. That makes the transform idempotent and
//! lets the key go straight into a WQL string literal.

use serde::{Deserialize, Serialize};
use std::fmt;

pub fn canonicalize(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len() + 8);
    let mut run = 0usize;
    for ch in raw.chars() {
        if ch == '\\' {
            run += 1;
            continue;
        }
        push_escaped_run(&mut out, run);
        run = 0;
        out.push(ch);
    }
    push_escaped_run(&mut out, run);
    out
}

fn push_escaped_run(out: &mut String, run: usize) {
    for _ in 0..run.div_ceil(2) {
        out.push_str("\\\\");
    }
}

/// A canonicalized bus/slot/path address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(raw: &str) -> Self {
        Self(canonicalize(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty identifier never joins with anything.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_single_backslashes() {
        assert_eq!(canonicalize(r"BUS\1"), r"BUS\\1");
        assert_eq!(
            canonicalize(r"PCI\VEN_10DE&DEV_2204\4&1A2B"),
            r"PCI\\VEN_10DE&DEV_2204\\4&1A2B"
        );
    }

    #[test]
    fn is_idempotent() {
        for raw in [r"BUS\1", r"BUS\\1", r"A\\\B", r"\", "", "0000:01:00.0", r"x\\\\y\"] {
            let once = canonicalize(raw);
            assert_eq!(canonicalize(&once), once, "input {raw:?}");
        }
    }

    #[test]
    fn escaped_and_raw_spellings_compare_equal() {
        assert_eq!(DeviceId::new(r"BUS\1"), DeviceId::new(r"BUS\\1"));
        assert_ne!(DeviceId::new(r"BUS\1"), DeviceId::new(r"BUS\2"));
    }

    #[test]
    fn degenerate_input_is_unchanged() {
        assert_eq!(canonicalize(""), "");
        assert_eq!(canonicalize("0000:01:00.0"), "0000:01:00.0");
        assert!(DeviceId::new("").is_empty());
    }

    #[test]
    fn trailing_backslash_is_kept() {
        assert_eq!(canonicalize(r"ROOT\"), r"ROOT\\");
    }
}
