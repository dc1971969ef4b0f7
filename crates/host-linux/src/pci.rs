use crate::{link_name, read_hex_id, read_string, sorted_entries};
use hwscope_core::{Context, QueryError, Row, Table};
use std::path::Path;

const DRM_DIR: &str = "/sys/class/drm";
const PCI_DEVICES_DIR: &str = "/sys/bus/pci/devices";

/// `card0`, `card1`, ... but not connectors like `card0-HDMI-A-1`.
fn card_index(name: &str) -> Option<u32> {
    name.strip_prefix("card")?.parse().ok()
}

fn driver_version(ctx: &Context, driver: &str) -> Option<String> {
    read_string(ctx.path(format!("/sys/module/{driver}/version")))
}

pub(crate) fn video_controllers(ctx: &Context) -> Result<Vec<Row>, QueryError> {
    let mut cards: Vec<(u32, Row)> = Vec::new();
    for (name, path) in sorted_entries(Table::VideoController, &ctx.path(DRM_DIR))? {
        let Some(index) = card_index(&name) else {
            continue;
        };
        let Some(address) = link_name(path.join("device")) else {
            continue;
        };
        let driver = link_name(ctx.path(PCI_DEVICES_DIR).join(&address).join("driver"));
        let version = driver.as_deref().and_then(|driver| driver_version(ctx, driver));
        let row = Row::new()
            .with("DeviceID", name.as_str())
            .with("Index", u64::from(index))
            .with("PNPDeviceID", address)
            .with("DriverName", driver)
            .with("DriverVersion", version);
        cards.push((index, row));
    }
    cards.sort_by_key(|(index, _)| *index);
    Ok(cards.into_iter().map(|(_, row)| row).collect())
}

fn class_code(path: &Path) -> Option<String> {
    read_hex_id(path.join("class")).map(|code| format!("{:0>6}", code))
}

pub(crate) fn pnp_entities(ctx: &Context) -> Result<Vec<Row>, QueryError> {
    let mut rows = Vec::new();
    for (address, path) in sorted_entries(Table::PnpEntity, &ctx.path(PCI_DEVICES_DIR))? {
        rows.push(
            Row::new()
                .with("PNPDeviceID", address.as_str())
                .with("VendorID", read_hex_id(path.join("vendor")))
                .with("ProductID", read_hex_id(path.join("device")))
                .with("SubsystemVendorID", read_hex_id(path.join("subsystem_vendor")))
                .with("SubsystemID", read_hex_id(path.join("subsystem_device")))
                .with("ClassCode", class_code(&path)),
        );
    }
    Ok(rows)
}

pub(crate) fn signed_drivers(ctx: &Context) -> Result<Vec<Row>, QueryError> {
    let mut rows = Vec::new();
    for (address, path) in sorted_entries(Table::PnpSignedDriver, &ctx.path(PCI_DEVICES_DIR))? {
        let Some(driver) = link_name(path.join("driver")) else {
            continue;
        };
        let version = driver_version(ctx, &driver);
        rows.push(
            Row::new()
                .with("DeviceID", address.as_str())
                .with("DriverName", driver.as_str())
                .with("DriverVersion", version),
        );
    }
    Ok(rows)
}
