use hwscope_core::{Context, QueryError, Row, Table};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const MEMINFO: &str = "/proc/meminfo";
const HUGEPAGES_DIR: &str = "/sys/kernel/mm/hugepages";
const DMI_ENTRIES_DIR: &str = "/sys/firmware/dmi/entries";
const SMBIOS_MEMORY_DEVICE: u8 = 17;

/// Answers `Win32_OperatingSystem` memory counters (KiB) from `/proc/meminfo`,
/// plus `SupportedPageSizes`, which only this backend reports.
pub(crate) fn operating_system(ctx: &Context) -> Result<Vec<Row>, QueryError> {
    let path = ctx.path(MEMINFO);
    let data =
        fs::read_to_string(&path).map_err(|err| QueryError::io(Table::OperatingSystem, &path, err))?;
    let field = |name: &str| -> Option<u64> {
        data.lines().find_map(|line| {
            let rest = line.strip_prefix(name)?.strip_prefix(':')?;
            rest.split_whitespace().next()?.parse().ok()
        })
    };
    let total = field("MemTotal").ok_or_else(|| QueryError::Malformed {
        table: Table::OperatingSystem,
        message: format!("{} has no MemTotal line", path.display()),
    })?;
    let free = field("MemFree");
    let swap_free = field("SwapFree");
    let free_virtual = match (free, swap_free) {
        (None, None) => None,
        (free, swap) => Some(free.unwrap_or(0).saturating_add(swap.unwrap_or(0))),
    };
    let page_sizes = hugepage_sizes(ctx)
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(",");
    Ok(vec![Row::new()
        .with("TotalVisibleMemorySize", total)
        .with("FreePhysicalMemory", free)
        .with("FreeSpaceInPagingFiles", swap_free)
        .with("FreeVirtualMemory", free_virtual)
        .with("SupportedPageSizes", (!page_sizes.is_empty()).then_some(page_sizes))])
}

/// Huge page sizes in bytes, ascending, from the `hugepages-<N>kB`
/// directories the kernel exposes. Empty when huge pages are unsupported.
fn hugepage_sizes(ctx: &Context) -> Vec<u64> {
    let dir = ctx.path(HUGEPAGES_DIR);
    let pattern = format!("{}/hugepages-*kB", glob::Pattern::escape(&dir.to_string_lossy()));
    let entries = match glob::glob(&pattern) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(%err, "bad huge page pattern");
            return Vec::new();
        }
    };
    let mut sizes: Vec<u64> = readable(entries)
        .iter()
        .filter_map(|path| hugepage_size(path))
        .collect();
    sizes.sort_unstable();
    sizes.dedup();
    sizes
}

fn hugepage_size(path: &Path) -> Option<u64> {
    let kib: u64 = path
        .file_name()?
        .to_str()?
        .strip_prefix("hugepages-")?
        .strip_suffix("kB")?
        .parse()
        .ok()?;
    Some(kib.saturating_mul(1024))
}

/// Paths a glob walk could read; the rest are logged and skipped.
fn readable<E: fmt::Display>(
    entries: impl IntoIterator<Item = Result<PathBuf, E>>,
) -> Vec<PathBuf> {
    entries
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(err) => {
                warn!(%err, "skipping unreadable entry");
                None
            }
        })
        .collect()
}

/// One SMBIOS type 17 structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryDevice {
    /// `Some(0)` is an empty slot, `None` a size the firmware does not know.
    pub size_bytes: Option<u64>,
    pub device_locator: Option<String>,
    pub bank_locator: Option<String>,
    pub manufacturer: Option<String>,
    pub serial_number: Option<String>,
}

fn word(raw: &[u8], offset: usize) -> Option<u16> {
    Some(u16::from_le_bytes([*raw.get(offset)?, *raw.get(offset + 1)?]))
}

fn dword(raw: &[u8], offset: usize) -> Option<u32> {
    let bytes = raw.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn size_bytes(raw: &[u8], length: usize) -> Option<u64> {
    const MIB: u64 = 1024 * 1024;
    match word(raw, 0x0C)? {
        0 => Some(0),
        0xFFFF => None,
        0x7FFF if length >= 0x20 => Some(u64::from(dword(raw, 0x1C)? & 0x7FFF_FFFF) * MIB),
        0x7FFF => None,
        size if size & 0x8000 != 0 => Some(u64::from(size & 0x7FFF) * 1024),
        size => Some(u64::from(size) * MIB),
    }
}

/// Parses the `raw` file of a `/sys/firmware/dmi/entries/17-*` directory:
/// the formatted area followed by its string set.
pub fn parse_memory_device(raw: &[u8]) -> Option<MemoryDevice> {
    if raw.len() < 2 || raw[0] != SMBIOS_MEMORY_DEVICE {
        return None;
    }
    let length = usize::from(raw[1]);
    if length < 0x15 || raw.len() < length {
        return None;
    }
    let strings: Vec<String> = raw[length..]
        .split(|byte| *byte == 0)
        .take_while(|chunk| !chunk.is_empty())
        .map(|chunk| String::from_utf8_lossy(chunk).trim().to_string())
        .collect();
    let string_at = |offset: usize| -> Option<String> {
        let index = usize::from(*raw.get(offset).filter(|_| offset < length)?);
        let value = strings.get(index.checked_sub(1)?)?;
        (!value.is_empty()).then(|| value.clone())
    };
    Some(MemoryDevice {
        size_bytes: size_bytes(raw, length),
        device_locator: string_at(0x10),
        bank_locator: string_at(0x11),
        manufacturer: string_at(0x17),
        serial_number: string_at(0x18),
    })
}

/// Answers `Win32_PhysicalMemory` from SMBIOS memory device entries.
pub(crate) fn physical_memory(ctx: &Context) -> Result<Vec<Row>, QueryError> {
    let table = Table::PhysicalMemory;
    if !ctx.is_privileged() {
        warn!("memory modules need root to read SMBIOS tables; listing none");
        return Ok(Vec::new());
    }
    let dir = ctx.path(DMI_ENTRIES_DIR);
    let pattern = format!(
        "{}/{}-*/raw",
        glob::Pattern::escape(&dir.to_string_lossy()),
        SMBIOS_MEMORY_DEVICE
    );
    let entries = glob::glob(&pattern).map_err(|err| QueryError::Backend {
        table,
        message: err.to_string(),
    })?;
    let mut paths = readable(entries);
    paths.sort_by_key(|path| entry_number(path));

    let mut rows = Vec::new();
    for path in paths {
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
            Err(err) => return Err(QueryError::io(table, &path, err)),
        };
        let Some(device) = parse_memory_device(&raw) else {
            debug!(path = %path.display(), "skipping malformed SMBIOS entry");
            continue;
        };
        if device.size_bytes == Some(0) {
            continue;
        }
        rows.push(
            Row::new()
                .with("BankLabel", device.bank_locator)
                .with("DeviceLocator", device.device_locator)
                .with("Manufacturer", device.manufacturer)
                .with("SerialNumber", device.serial_number)
                .with("Capacity", device.size_bytes),
        );
    }
    Ok(rows)
}

/// `.../17-3/raw` sorts as 3 so slot order survives more than ten entries.
fn entry_number(path: &Path) -> u32 {
    path.parent()
        .and_then(|dir| dir.file_name())
        .and_then(|name| name.to_str())
        .and_then(|name| name.split_once('-'))
        .and_then(|(_, number)| number.parse().ok())
        .unwrap_or(u32::MAX)
}

#[cfg(test)]
pub(crate) fn memory_device_entry(size: u16, extended_mib: u32, strings: &[&str]) -> Vec<u8> {
    let length = 0x22usize;
    let mut raw = vec![0u8; length];
    raw[0] = SMBIOS_MEMORY_DEVICE;
    raw[1] = length as u8;
    raw[0x0C..0x0E].copy_from_slice(&size.to_le_bytes());
    raw[0x10] = 1;
    raw[0x11] = 2;
    raw[0x17] = 3;
    raw[0x18] = 4;
    raw[0x1C..0x20].copy_from_slice(&extended_mib.to_le_bytes());
    for value in strings {
        raw.extend_from_slice(value.as_bytes());
        raw.push(0);
    }
    raw.push(0);
    raw
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::fixture::*;

    const GIB: u64 = 1024 * 1024 * 1024;

    #[test]
    fn decodes_sizes() {
        let dimm = memory_device_entry(16384, 0, &["DIMM A1", "BANK 0", "Samsung", "0x1234"]);
        let device = parse_memory_device(&dimm).unwrap();
        assert_eq!(device.size_bytes, Some(16 * GIB));
        assert_eq!(device.device_locator.as_deref(), Some("DIMM A1"));
        assert_eq!(device.bank_locator.as_deref(), Some("BANK 0"));
        assert_eq!(device.manufacturer.as_deref(), Some("Samsung"));
        assert_eq!(device.serial_number.as_deref(), Some("0x1234"));

        let extended = memory_device_entry(0x7FFF, 65536, &[]);
        assert_eq!(parse_memory_device(&extended).unwrap().size_bytes, Some(64 * GIB));

        let kib = memory_device_entry(0x8000 | 512, 0, &[]);
        assert_eq!(parse_memory_device(&kib).unwrap().size_bytes, Some(512 * 1024));

        let unknown = memory_device_entry(0xFFFF, 0, &[]);
        assert_eq!(parse_memory_device(&unknown).unwrap().size_bytes, None);
    }

    #[test]
    fn missing_strings_are_none() {
        let device = parse_memory_device(&memory_device_entry(8192, 0, &["DIMM B1"])).unwrap();
        assert_eq!(device.device_locator.as_deref(), Some("DIMM B1"));
        assert_eq!(device.manufacturer, None);
    }

    #[test]
    fn rejects_other_structures() {
        let mut raw = memory_device_entry(8192, 0, &[]);
        raw[0] = 16;
        assert!(parse_memory_device(&raw).is_none());
        assert!(parse_memory_device(&[17, 0x22, 0]).is_none());
    }

    #[test]
    fn lists_installed_modules_when_privileged() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "sys/firmware/dmi/entries/17-0/raw",
            memory_device_entry(16384, 0, &["DIMM A1", "BANK 0", "Samsung", "S1"]),
        );
        write(
            root,
            "sys/firmware/dmi/entries/17-1/raw",
            memory_device_entry(0, 0, &["DIMM A2", "BANK 1"]),
        );
        write(
            root,
            "sys/firmware/dmi/entries/17-2/raw",
            memory_device_entry(0xFFFF, 0, &["DIMM B1", "BANK 2", "Hynix", "S2"]),
        );
        write(root, "sys/firmware/dmi/entries/16-0/raw", [16u8, 0x17]);

        let rows = physical_memory(&context(root, true)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].uint("Capacity"), Some(16 * GIB));
        assert_eq!(rows[0].text("BankLabel"), Some("BANK 0"));
        assert_eq!(rows[1].text("Manufacturer"), Some("Hynix"));
        assert_eq!(rows[1].uint("Capacity"), None);

        assert!(physical_memory(&context(root, false)).unwrap().is_empty());
    }

    #[test]
    fn reads_meminfo_counters() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "proc/meminfo",
            "MemTotal:       32657380 kB\nMemFree:         1000000 kB\nMemAvailable:   20000000 kB\nSwapTotal:       8388604 kB\nSwapFree:        8000000 kB\n",
        );
        let rows = operating_system(&context(dir.path(), false)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].uint("TotalVisibleMemorySize"), Some(32_657_380));
        assert_eq!(rows[0].uint("FreePhysicalMemory"), Some(1_000_000));
        assert_eq!(rows[0].uint("FreeSpaceInPagingFiles"), Some(8_000_000));
        assert_eq!(rows[0].uint("FreeVirtualMemory"), Some(9_000_000));
    }

    #[test]
    fn huge_counters_saturate() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "proc/meminfo",
            format!("MemTotal: 1 kB\nMemFree: {} kB\nSwapFree: 2 kB\n", u64::MAX),
        );
        let rows = operating_system(&context(dir.path(), false)).unwrap();
        assert_eq!(rows[0].uint("FreeVirtualMemory"), Some(u64::MAX));
    }

    #[test]
    fn lists_huge_page_sizes_in_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "proc/meminfo", "MemTotal: 1024 kB\n");
        let rows = operating_system(&context(root, false)).unwrap();
        assert!(rows[0].get("SupportedPageSizes").map_or(true, |value| value.is_null()));

        write(root, "sys/kernel/mm/hugepages/hugepages-1048576kB/nr_hugepages", "0\n");
        write(root, "sys/kernel/mm/hugepages/hugepages-2048kB/nr_hugepages", "0\n");
        write(root, "sys/kernel/mm/hugepages/README", "not a size\n");
        let rows = operating_system(&context(root, false)).unwrap();
        assert_eq!(rows[0].text("SupportedPageSizes"), Some("2097152,1073741824"));
    }

    #[test]
    fn unreadable_glob_entries_are_skipped() {
        let entries = vec![
            Ok(PathBuf::from("17-0/raw")),
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "17-1")),
            Ok(PathBuf::from("17-2/raw")),
        ];
        assert_eq!(
            readable(entries),
            vec![PathBuf::from("17-0/raw"), PathBuf::from("17-2/raw")]
        );
    }

    #[test]
    fn missing_meminfo_is_a_query_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = operating_system(&context(dir.path(), false)).unwrap_err();
        assert_eq!(err.table(), Table::OperatingSystem);

        write(dir.path(), "proc/meminfo", "MemFree: 1 kB\n");
        assert!(matches!(
            operating_system(&context(dir.path(), false)),
            Err(QueryError::Malformed { .. })
        ));
    }
}
