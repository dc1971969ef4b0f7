use hwscope_core::{Row, Table, Value};
use std::process::Command;
use tracing::debug;

const POWERSHELL_EXE: &str = "powershell.exe";

pub enum ShellError {
    Spawn(String),
    Failed(String),
}

/// Wraps a WQL query in a PowerShell pipeline that emits a JSON array,
/// one object per instance.
pub fn command_for(wql: &str, fields: &[String]) -> String {
    let select = if fields.is_empty() {
        String::new()
    } else {
        format!(" | Select-Object {}", fields.join(","))
    };
    format!(
        "ConvertTo-Json -InputObject @(Get-CimInstance -Query '{}'{}) -Compress -Depth 2",
        wql.replace('\'', "''"),
        select
    )
}

pub fn run_powershell(command: &str) -> Result<String, ShellError> {
    debug!(command, "running powershell");
    let output = Command::new(POWERSHELL_EXE)
        .args(["-NoProfile", "-NonInteractive", "-Command", command])
        .output()
        .map_err(|err| ShellError::Spawn(err.to_string()))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(ShellError::Failed(if stderr.is_empty() {
            format!("powershell exited with {}", output.status)
        } else {
            stderr
        }));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parses `ConvertTo-Json` output into rows. PowerShell 5 collapses a
/// one-element array into a bare object and prints nothing for none.
pub fn parse_rows(table: Table, raw: &str) -> Result<Vec<Row>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    let parsed: serde_json::Value = serde_json::from_str(raw).map_err(|err| err.to_string())?;
    let objects = match parsed {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Null => Vec::new(),
        object @ serde_json::Value::Object(_) => vec![object],
        other => return Err(format!("{table}: expected objects, got {other}")),
    };
    objects
        .into_iter()
        .map(|item| match item {
            serde_json::Value::Object(map) => Ok(map
                .into_iter()
                .map(|(field, value)| (field, to_value(value)))
                .collect::<Row>()),
            other => Err(format!("{table}: expected an object, got {other}")),
        })
        .collect()
}

fn to_value(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(flag) => Value::Bool(flag),
        serde_json::Value::Number(number) => {
            if let Some(unsigned) = number.as_u64() {
                Value::UInt(unsigned)
            } else if let Some(signed) = number.as_i64() {
                Value::Int(signed)
            } else {
                number.as_f64().map_or(Value::Null, Value::Float)
            }
        }
        serde_json::Value::String(text) => Value::Text(text),
        nested => Value::Text(nested.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_doubles_single_quotes() {
        let cmd = command_for(
            r"SELECT Name FROM Win32_PnPEntity WHERE Name = 'a\'b'",
            &["Name".to_string()],
        );
        assert_eq!(
            cmd,
            r"ConvertTo-Json -InputObject @(Get-CimInstance -Query 'SELECT Name FROM Win32_PnPEntity WHERE Name = ''a\''b''' | Select-Object Name) -Compress -Depth 2"
        );
    }

    #[test]
    fn parses_array_of_instances() {
        let raw = r#"[{"DeviceID":"VideoController1","PNPDeviceID":"PCI\\VEN_10DE\\4&1","Index":null},
                      {"DeviceID":"VideoController2","PNPDeviceID":"PCI\\VEN_8086\\3&2"}]"#;
        let rows = parse_rows(Table::VideoController, raw).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text("PNPDeviceID"), Some(r"PCI\VEN_10DE\4&1"));
        assert!(rows[0].get("Index").unwrap().is_null());
        assert_eq!(rows[1].text("DeviceID"), Some("VideoController2"));
    }

    #[test]
    fn single_object_is_one_row() {
        let raw = r#"{"Capacity":8589934592,"BankLabel":"BANK 0"}"#;
        let rows = parse_rows(Table::PhysicalMemory, raw).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].uint("Capacity"), Some(8_589_934_592));
    }

    #[test]
    fn empty_output_is_no_rows() {
        assert!(parse_rows(Table::PnpEntity, "").unwrap().is_empty());
        assert!(parse_rows(Table::PnpEntity, "  \r\n").unwrap().is_empty());
        assert!(parse_rows(Table::PnpEntity, "[]").unwrap().is_empty());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_rows(Table::PnpEntity, "Get-CimInstance : Invalid query").is_err());
        assert!(parse_rows(Table::PnpEntity, "[1, 2]").is_err());
    }

    #[test]
    fn nested_values_become_text() {
        let rows = parse_rows(Table::PnpEntity, r#"{"HardwareID":["a","b"],"Neg":-1,"F":1.5}"#)
            .unwrap();
        assert_eq!(rows[0].text("HardwareID"), Some(r#"["a","b"]"#));
        assert_eq!(rows[0].get("Neg"), Some(&Value::Int(-1)));
        assert_eq!(rows[0].get("F"), Some(&Value::Float(1.5)));
    }
}
