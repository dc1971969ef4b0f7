use crate::unknown::unknown;
use crate::units::size_string;
use crate::DeviceId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An `(id, name)` pair where either half may be the sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    pub id: String,
    pub name: String,
}

impl Descriptor {
    pub fn unknown() -> Self {
        Self {
            id: unknown(),
            name: unknown(),
        }
    }
}

/// Bus-level classification of one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PciDevice {
    pub address: DeviceId,
    pub vendor: Descriptor,
    pub product: Descriptor,
    pub subsystem: Descriptor,
    pub class: Descriptor,
    pub subclass: Descriptor,
    pub programming_interface: Descriptor,
    pub driver: String,
}

impl PciDevice {
    /// Every field starts as the sentinel; correlation overlays replace them.
    pub fn blank(address: DeviceId) -> Self {
        Self {
            address,
            vendor: Descriptor::unknown(),
            product: Descriptor::unknown(),
            subsystem: Descriptor::unknown(),
            class: Descriptor::unknown(),
            subclass: Descriptor::unknown(),
            programming_interface: Descriptor::unknown(),
            driver: unknown(),
        }
    }

    pub fn descriptors(&self) -> [(&'static str, &Descriptor); 6] {
        [
            ("vendor", &self.vendor),
            ("product", &self.product),
            ("subsystem", &self.subsystem),
            ("class", &self.class),
            ("subclass", &self.subclass),
            ("programming_interface", &self.programming_interface),
        ]
    }
}

impl fmt::Display for PciDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> driver: '{}' class: '{}' vendor: '{}' product: '{}'",
            self.address, self.driver, self.class.name, self.vendor.name, self.product.name
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphicsCard {
    /// Controller id as the video table reports it, e.g. `VideoController1`.
    pub address: String,
    /// Position on the bus; 0 when the backend cannot tell.
    pub index: u32,
    /// Adapter name the video table reports.
    pub name: String,
    pub pci: PciDevice,
}

impl GraphicsCard {
    pub fn blank(id: DeviceId) -> Self {
        Self {
            address: unknown(),
            index: 0,
            name: unknown(),
            pci: PciDevice::blank(id),
        }
    }
}

impl fmt::Display for GraphicsCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "card #{} @{} '{}' {}",
            self.index, self.address, self.name, self.pci
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    pub address: String,
    pub index: u32,
    pub name: String,
    pub version: String,
    pub provider: String,
    pub pci: PciDevice,
}

impl Driver {
    pub fn blank(id: DeviceId) -> Self {
        Self {
            address: unknown(),
            index: 0,
            name: unknown(),
            version: unknown(),
            provider: unknown(),
            pci: PciDevice::blank(id),
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "driver '{}' version '{}' from '{}' @{}",
            self.name, self.version, self.provider, self.pci.address
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryModule {
    pub label: String,
    pub location: String,
    pub serial_number: String,
    pub size_bytes: u64,
    pub vendor: String,
}

impl fmt::Display for MemoryModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "module '{}' @{} {} vendor: '{}'",
            self.label,
            self.location,
            size_string(self.size_bytes),
            self.vendor
        )
    }
}

/// Machine-wide memory totals plus the installed modules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryArea {
    pub total_physical_bytes: u64,
    pub total_usable_bytes: u64,
    pub free_physical_bytes: u64,
    pub free_virtual_bytes: u64,
    pub free_paging_file_bytes: u64,
    /// Huge page sizes in bytes; empty where the backend does not report them.
    pub supported_page_sizes: Vec<u64>,
    pub modules: Vec<MemoryModule>,
}

impl fmt::Display for MemoryArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "memory ({} physical, {} usable)",
            size_string(self.total_physical_bytes),
            size_string(self.total_usable_bytes)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemProduct {
    pub family: String,
    pub name: String,
    pub vendor: String,
    pub serial_number: String,
    pub uuid: String,
    pub sku: String,
    pub version: String,
}

impl SystemProduct {
    pub fn blank() -> Self {
        Self {
            family: unknown(),
            name: unknown(),
            vendor: unknown(),
            serial_number: unknown(),
            uuid: unknown(),
            sku: unknown(),
            version: unknown(),
        }
    }
}

impl fmt::Display for SystemProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "product family={} name={} vendor={} sku={} version={}",
            self.family, self.name, self.vendor, self.sku, self.version
        )
    }
}
