//! Linux backend: answers the logical tables from sysfs and procfs under the
//! context root, so a copied `/sys` + `/proc` tree can be inspected offline.

use hwscope_core::{Context, QueryError, QuerySource, QuerySpec, Row, Table};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

mod memory;
mod pci;
mod product;

pub use memory::{parse_memory_device, MemoryDevice};

pub struct SysfsSource {
    ctx: Arc<Context>,
}

impl SysfsSource {
    pub fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }
}

impl QuerySource for SysfsSource {
    fn name(&self) -> &'static str {
        "sysfs"
    }

    fn query(&self, spec: &QuerySpec) -> Result<Vec<Row>, QueryError> {
        let rows = match spec.table {
            Table::VideoController => pci::video_controllers(&self.ctx)?,
            Table::PnpEntity => pci::pnp_entities(&self.ctx)?,
            Table::PnpSignedDriver => pci::signed_drivers(&self.ctx)?,
            Table::PhysicalMemory => memory::physical_memory(&self.ctx)?,
            Table::OperatingSystem => memory::operating_system(&self.ctx)?,
            Table::ComputerSystemProduct => product::computer_system_product(&self.ctx),
        };
        let rows: Vec<Row> = rows
            .into_iter()
            .filter(|row| spec.admits(row))
            .map(|row| row.project(&spec.fields))
            .collect();
        debug!(table = %spec.table, rows = rows.len(), "sysfs query");
        Ok(rows)
    }
}

/// Effective-uid check; SMBIOS tables and some DMI ids are root-only.
#[cfg(unix)]
pub fn is_privileged() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
pub fn is_privileged() -> bool {
    false
}

fn read_string(path: impl AsRef<Path>) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Hex id files such as `vendor` hold `0x10de`; rows carry `10de`.
fn read_hex_id(path: impl AsRef<Path>) -> Option<String> {
    read_string(path).map(|value| {
        value
            .trim_start_matches("0x")
            .trim_start_matches("0X")
            .to_ascii_lowercase()
    })
}

fn link_name(path: impl AsRef<Path>) -> Option<String> {
    fs::read_link(path)
        .ok()?
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
}

/// Directory entries sorted by name; a missing directory has none.
fn sorted_entries(table: Table, dir: &Path) -> Result<Vec<(String, std::path::PathBuf)>, QueryError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(table = %table, path = %dir.display(), "source directory absent");
            return Ok(Vec::new());
        }
        Err(err) => return Err(QueryError::io(table, dir, err)),
    };
    let mut out = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| QueryError::io(table, dir, err))?;
        out.push((entry.file_name().to_string_lossy().to_string(), entry.path()));
    }
    out.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(out)
}

#[cfg(all(test, unix))]
pub(crate) mod fixture {
    use hwscope_core::{Context, ContextOptions};
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    pub fn context(root: &Path, privileged: bool) -> Arc<Context> {
        Arc::new(Context::new(
            ContextOptions {
                root: Some(root.to_path_buf()),
                ..ContextOptions::default()
            },
            privileged,
        ))
    }

    pub fn write(root: &Path, rel: &str, content: impl AsRef<[u8]>) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    pub fn symlink(root: &Path, rel: &str, target: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::os::unix::fs::symlink(target, path).unwrap();
    }

    /// One PCI function with ids and an optional bound driver.
    pub fn pci_device(root: &Path, addr: &str, vendor: &str, device: &str, class: &str, driver: Option<&str>) {
        let base = format!("sys/bus/pci/devices/{addr}");
        write(root, &format!("{base}/vendor"), format!("0x{vendor}\n"));
        write(root, &format!("{base}/device"), format!("0x{device}\n"));
        write(root, &format!("{base}/subsystem_vendor"), "0x1043\n");
        write(root, &format!("{base}/subsystem_device"), "0x87b3\n");
        write(root, &format!("{base}/class"), format!("0x{class}\n"));
        if let Some(driver) = driver {
            fs::create_dir_all(root.join(format!("sys/bus/pci/drivers/{driver}"))).unwrap();
            symlink(root, &format!("{base}/driver"), &format!("../../drivers/{driver}"));
        }
    }
}
