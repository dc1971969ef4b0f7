//! Windows backend: answers the logical tables with CIM queries, run through
//! PowerShell's `Get-CimInstance` and read back as JSON.

use hwscope_core::{QueryError, QuerySource, QuerySpec, Row};
use tracing::debug;

mod classes;
mod shell;
mod wql;

#[cfg(windows)]
mod admin;
#[cfg(not(windows))]
#[path = "admin_stub.rs"]
mod admin;

pub use admin::is_privileged;
pub use classes::properties as cim_properties;
pub use wql::select as wql_select;

/// The WQL for `spec` and the PowerShell pipeline that runs it, both over
/// the same projected field list.
fn pipeline(spec: &QuerySpec) -> (String, String) {
    let fields = classes::project(spec);
    let wql = wql::render(spec, &fields);
    let command = shell::command_for(&wql, &fields);
    (wql, command)
}

#[derive(Debug, Default)]
pub struct CimSource;

impl CimSource {
    pub fn new() -> Self {
        Self
    }
}

impl QuerySource for CimSource {
    fn name(&self) -> &'static str {
        "cim"
    }

    fn query(&self, spec: &QuerySpec) -> Result<Vec<Row>, QueryError> {
        let table = spec.table;
        let (wql, command) = pipeline(spec);
        let raw = shell::run_powershell(&command).map_err(|err| match err {
            shell::ShellError::Spawn(reason) => QueryError::Unavailable { table, reason },
            shell::ShellError::Failed(message) => QueryError::Backend { table, message },
        })?;
        let rows = shell::parse_rows(table, &raw)
            .map_err(|message| QueryError::Malformed { table, message })?;
        debug!(%table, %wql, rows = rows.len(), "cim query");
        Ok(rows)
    }
}
