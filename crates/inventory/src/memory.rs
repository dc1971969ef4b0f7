use crate::{Backend, Domain, InventoryError};
use hwscope_core::units::{size_string, KB};
use hwscope_core::unknown::or_unknown;
use hwscope_core::{Context, MemoryArea, MemoryModule, QuerySpec, Row, Snapshot, Table};
use hwscope_correlate::{reduce_pool, sum_field};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

const SYSTEM_FIELDS: &[&str] = &[
    "TotalVisibleMemorySize",
    "FreePhysicalMemory",
    "FreeVirtualMemory",
    "FreeSpaceInPagingFiles",
    "SupportedPageSizes",
];

const MODULE_FIELDS: &[&str] = &[
    "BankLabel",
    "Capacity",
    "DeviceLocator",
    "Manufacturer",
    "SerialNumber",
];

#[derive(Debug, Clone, Serialize)]
pub struct MemoryInfo {
    #[serde(skip)]
    ctx: Arc<Context>,
    #[serde(flatten)]
    pub area: MemoryArea,
}

impl MemoryInfo {
    pub fn context(&self) -> &Context {
        &self.ctx
    }
}

impl Domain for MemoryInfo {
    fn load(backend: &Backend) -> Result<Self, InventoryError> {
        let system = backend.fetch(
            Self::DOMAIN,
            QuerySpec::new(Table::OperatingSystem, SYSTEM_FIELDS),
        )?;
        let banks = backend.fetch(
            Self::DOMAIN,
            QuerySpec::new(Table::PhysicalMemory, MODULE_FIELDS),
        )?;

        let pool = reduce_pool(&banks, "Capacity", module);
        // the system table counts KiB
        let bytes = |field: &str| sum_field(&system, field).saturating_mul(KB);
        let area = MemoryArea {
            total_physical_bytes: pool.capacity,
            total_usable_bytes: bytes("TotalVisibleMemorySize"),
            free_physical_bytes: bytes("FreePhysicalMemory"),
            free_virtual_bytes: bytes("FreeVirtualMemory"),
            free_paging_file_bytes: bytes("FreeSpaceInPagingFiles"),
            supported_page_sizes: page_sizes(&system),
            modules: pool.units,
        };
        Ok(Self {
            ctx: backend.context().clone(),
            area,
        })
    }
}

/// Comma-separated byte sizes from the first system row that has any.
fn page_sizes(system: &[Row]) -> Vec<u64> {
    system
        .iter()
        .find_map(|row| row.text("SupportedPageSizes"))
        .map(|list| {
            list.split(',')
                .filter_map(|size| size.trim().parse().ok())
                .collect()
        })
        .unwrap_or_default()
}

fn module(row: &Row, size_bytes: u64) -> MemoryModule {
    MemoryModule {
        label: or_unknown(row.text("BankLabel")),
        location: or_unknown(row.text("DeviceLocator")),
        serial_number: or_unknown(row.text("SerialNumber")),
        size_bytes,
        vendor: or_unknown(row.text("Manufacturer")),
    }
}

impl Snapshot for MemoryInfo {
    const DOMAIN: &'static str = "memory";

    fn detail_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.area.modules.iter().map(ToString::to_string).collect();
        lines.push(format!(
            "free: {} physical, {} virtual, {} paging file",
            size_string(self.area.free_physical_bytes),
            size_string(self.area.free_virtual_bytes),
            size_string(self.area.free_paging_file_bytes)
        ));
        if !self.area.supported_page_sizes.is_empty() {
            let sizes: Vec<String> = self
                .area
                .supported_page_sizes
                .iter()
                .map(|size| size_string(*size))
                .collect();
            lines.push(format!("huge pages: {}", sizes.join(", ")));
        }
        lines
    }
}

impl fmt::Display for MemoryInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.area, f)
    }
}
