use crate::{DeviceId, Row};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Logical tables every backend answers. Field names follow the CIM class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Table {
    VideoController,
    PnpEntity,
    PnpSignedDriver,
    PhysicalMemory,
    OperatingSystem,
    ComputerSystemProduct,
}

impl Table {
    pub fn class_name(self) -> &'static str {
        match self {
            Table::VideoController => "Win32_VideoController",
            Table::PnpEntity => "Win32_PnPEntity",
            Table::PnpSignedDriver => "Win32_PnPSignedDriver",
            Table::PhysicalMemory => "Win32_PhysicalMemory",
            Table::OperatingSystem => "Win32_OperatingSystem",
            Table::ComputerSystemProduct => "Win32_ComputerSystemProduct",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Rows whose `field` canonicalizes to one of `values`.
    AnyOf { field: String, values: Vec<DeviceId> },
}

impl Filter {
    pub fn any_of(field: &str, values: impl IntoIterator<Item = DeviceId>) -> Self {
        let mut ids: Vec<DeviceId> = Vec::new();
        for id in values {
            if !id.is_empty() && !ids.contains(&id) {
                ids.push(id);
            }
        }
        Filter::AnyOf {
            field: field.to_string(),
            values: ids,
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Filter::AnyOf { field, values } => row
                .text(field)
                .map(DeviceId::new)
                .is_some_and(|id| values.contains(&id)),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Filter::AnyOf { values, .. } => values.is_empty(),
        }
    }
}

/// The fields one consumer needs from one table.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub table: Table,
    pub fields: Vec<String>,
    pub filter: Option<Filter>,
}

impl QuerySpec {
    pub fn new(table: Table, fields: &[&str]) -> Self {
        Self {
            table,
            fields: fields.iter().map(|field| field.to_string()).collect(),
            filter: None,
        }
    }

    pub fn filtered(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn wants(&self, field: &str) -> bool {
        self.fields.iter().any(|wanted| wanted == field)
    }

    pub fn admits(&self, row: &Row) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter.matches(row))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("{table}: data source unavailable: {reason}")]
    Unavailable { table: Table, reason: String },
    #[error("{table}: permission denied: {reason}")]
    PermissionDenied { table: Table, reason: String },
    #[error("{table}: failed to read {}", .path.display())]
    Io {
        table: Table,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{table}: backend query failed: {message}")]
    Backend { table: Table, message: String },
    #[error("{table}: malformed result set: {message}")]
    Malformed { table: Table, message: String },
}

impl QueryError {
    pub fn io(table: Table, path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::PermissionDenied {
            return QueryError::PermissionDenied {
                table,
                reason: path.display().to_string(),
            };
        }
        QueryError::Io {
            table,
            path,
            source,
        }
    }

    pub fn table(&self) -> Table {
        match self {
            QueryError::Unavailable { table, .. }
            | QueryError::PermissionDenied { table, .. }
            | QueryError::Io { table, .. }
            | QueryError::Backend { table, .. }
            | QueryError::Malformed { table, .. } => *table,
        }
    }
}

/// One backend's raw query mechanism. Implementations issue the query once,
/// without retries or caching, and return rows in the backend's order.
pub trait QuerySource: Send + Sync {
    fn name(&self) -> &'static str;
    fn query(&self, spec: &QuerySpec) -> Result<Vec<Row>, QueryError>;
}

/// Fixed row-sets per table, for fixtures and recorded inventories.
///
/// Applies filters and projects rows onto the requested fields, so a consumer
/// that under-fetches sees the gap here as it would against a live backend.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    tables: HashMap<Table, Vec<Row>>,
    failures: HashMap<Table, String>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, table: Table, rows: Vec<Row>) -> Self {
        self.tables.insert(table, rows);
        self
    }

    pub fn with_failure(mut self, table: Table, message: &str) -> Self {
        self.failures.insert(table, message.to_string());
        self
    }
}

impl QuerySource for StaticSource {
    fn name(&self) -> &'static str {
        "static"
    }

    fn query(&self, spec: &QuerySpec) -> Result<Vec<Row>, QueryError> {
        if let Some(message) = self.failures.get(&spec.table) {
            return Err(QueryError::Backend {
                table: spec.table,
                message: message.clone(),
            });
        }
        let rows = self
            .tables
            .get(&spec.table)
            .ok_or_else(|| QueryError::Unavailable {
                table: spec.table,
                reason: "no rows recorded for this table".to_string(),
            })?;
        Ok(rows
            .iter()
            .filter(|row| spec.admits(row))
            .map(|row| row.project(&spec.fields))
            .collect())
    }
}
