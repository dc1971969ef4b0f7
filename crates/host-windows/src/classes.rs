use hwscope_core::{QuerySpec, Table};
use tracing::debug;

/// Properties each CIM class actually defines. WMI rejects a `SELECT` that
/// names anything else, so requests are cut down to these before rendering.
pub fn properties(table: Table) -> &'static [&'static str] {
    match table {
        Table::VideoController => &[
            "AdapterRAM",
            "Caption",
            "Description",
            "DeviceID",
            "DriverDate",
            "DriverVersion",
            "InstalledDisplayDrivers",
            "Name",
            "PNPDeviceID",
            "VideoProcessor",
        ],
        Table::PnpEntity => &[
            "Caption",
            "ClassGuid",
            "Description",
            "DeviceID",
            "HardwareID",
            "Manufacturer",
            "Name",
            "PNPClass",
            "PNPDeviceID",
        ],
        Table::PnpSignedDriver => &[
            "Description",
            "DeviceClass",
            "DeviceID",
            "DeviceName",
            "DriverDate",
            "DriverName",
            "DriverProviderName",
            "DriverVersion",
            "FriendlyName",
            "HardWareID",
            "InfName",
            "Manufacturer",
        ],
        Table::PhysicalMemory => &[
            "BankLabel",
            "Capacity",
            "DeviceLocator",
            "Manufacturer",
            "PartNumber",
            "SerialNumber",
            "Speed",
        ],
        Table::OperatingSystem => &[
            "FreePhysicalMemory",
            "FreeSpaceInPagingFiles",
            "FreeVirtualMemory",
            "TotalVirtualMemorySize",
            "TotalVisibleMemorySize",
        ],
        Table::ComputerSystemProduct => &[
            "IdentifyingNumber",
            "Name",
            "SKUNumber",
            "UUID",
            "Vendor",
            "Version",
        ],
    }
}

pub fn defines(table: Table, field: &str) -> bool {
    properties(table)
        .iter()
        .any(|known| known.eq_ignore_ascii_case(field))
}

/// The requested fields the class defines, in request order. Fields another
/// backend answers are dropped here and read back as absent.
pub fn project(spec: &QuerySpec) -> Vec<String> {
    let (kept, dropped): (Vec<&String>, Vec<&String>) = spec
        .fields
        .iter()
        .partition(|field| defines(spec.table, field));
    if !dropped.is_empty() {
        debug!(table = %spec.table, ?dropped, "fields not defined by the class");
    }
    kept.into_iter().cloned().collect()
}
