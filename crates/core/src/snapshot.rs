use serde::Serialize;
use std::fmt;

/// A loaded, immutable domain result. `Display` is the one-line summary.
pub trait Snapshot: Serialize + fmt::Display {
    /// Top-level key for JSON/YAML output.
    const DOMAIN: &'static str;

    /// Per-record lines printed under the summary in human output.
    fn detail_lines(&self) -> Vec<String> {
        Vec::new()
    }
}
