use anyhow::{Context as _, Result};
use hwscope_core::{now_utc_rfc3339, Snapshot, INVENTORY_SCHEMA_VERSION};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Human,
    Json,
    Yaml,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "human" | "text" => Ok(Format::Human),
            "json" => Ok(Format::Json),
            "yaml" | "yml" => Ok(Format::Yaml),
            other => Err(format!("unknown format: {other}")),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Human => "human",
            Format::Json => "json",
            Format::Yaml => "yaml",
        })
    }
}

pub fn render<S: Snapshot>(snapshot: &S, format: Format, pretty: bool) -> String {
    match format {
        Format::Human => to_human(snapshot),
        Format::Json => to_json(snapshot, pretty),
        Format::Yaml => to_yaml(snapshot),
    }
}

/// Summary line, then one indented line per record.
pub fn to_human<S: Snapshot>(snapshot: &S) -> String {
    let mut out = snapshot.to_string();
    out.push('\n');
    for line in snapshot.detail_lines() {
        out.push_str("  ");
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn keyed<S: Snapshot>(snapshot: &S) -> BTreeMap<&'static str, &S> {
    BTreeMap::from([(S::DOMAIN, snapshot)])
}

/// `{"<domain>": {...}}`; a marshal failure is logged and renders as "".
pub fn to_json<S: Snapshot>(snapshot: &S, pretty: bool) -> String {
    let doc = keyed(snapshot);
    let result = if pretty {
        serde_json::to_string_pretty(&doc)
    } else {
        serde_json::to_string(&doc)
    };
    result.unwrap_or_else(|err| {
        warn!(domain = S::DOMAIN, %err, "failed to marshal JSON");
        String::new()
    })
}

pub fn to_yaml<S: Snapshot>(snapshot: &S) -> String {
    serde_yaml::to_string(&keyed(snapshot)).unwrap_or_else(|err| {
        warn!(domain = S::DOMAIN, %err, "failed to marshal YAML");
        String::new()
    })
}

#[derive(Debug, Serialize)]
pub struct BundlePaths {
    pub run_id: String,
    pub root: PathBuf,
    pub snapshot_json: PathBuf,
    pub run_json: PathBuf,
}

#[derive(Debug, Serialize)]
struct RunMetadata<'a> {
    run_id: &'a str,
    created_at_utc: String,
    schema_version: &'static str,
    domain: &'static str,
    summary: String,
}

/// Writes `reports/<run_id>/<domain>.json` and `run.json` under `base`.
pub fn write_bundle<S: Snapshot>(base: impl AsRef<Path>, snapshot: &S) -> Result<BundlePaths> {
    let run_id = Uuid::new_v4().to_string();
    let root = base.as_ref().join("reports").join(&run_id);
    std::fs::create_dir_all(&root)
        .with_context(|| format!("failed to create {}", root.display()))?;

    let snapshot_json = root.join(format!("{}.json", S::DOMAIN));
    let run_json = root.join("run.json");

    let doc = serde_json::to_string_pretty(&keyed(snapshot))?;
    std::fs::write(&snapshot_json, doc)
        .with_context(|| format!("failed to write {}", snapshot_json.display()))?;

    let meta = RunMetadata {
        run_id: &run_id,
        created_at_utc: now_utc_rfc3339(),
        schema_version: INVENTORY_SCHEMA_VERSION,
        domain: S::DOMAIN,
        summary: snapshot.to_string(),
    };
    std::fs::write(&run_json, serde_json::to_string_pretty(&meta)?)
        .with_context(|| format!("failed to write {}", run_json.display()))?;

    Ok(BundlePaths {
        run_id,
        root,
        snapshot_json,
        run_json,
    })
}
