use crate::{plural, pnp, Backend, Domain, InventoryError};
use hwscope_core::unknown::overwrite;
use hwscope_core::{Context, Driver, QuerySpec, Row, Snapshot, Table};
use hwscope_correlate::{Correlation, RowSet};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

const KEY: &str = "DeviceID";

const DRIVER_FIELDS: &[&str] = &[
    KEY,
    "DeviceName",
    "DeviceClass",
    "DriverName",
    "DriverVersion",
    "DriverProviderName",
];

#[derive(Debug, Clone, Serialize)]
pub struct DriverInfo {
    #[serde(skip)]
    ctx: Arc<Context>,
    pub drivers: Vec<Driver>,
}

impl DriverInfo {
    pub fn context(&self) -> &Context {
        &self.ctx
    }
}

impl Domain for DriverInfo {
    fn load(backend: &Backend) -> Result<Self, InventoryError> {
        let signed = backend.fetch(
            Self::DOMAIN,
            QuerySpec::new(Table::PnpSignedDriver, DRIVER_FIELDS),
        )?;
        let primary = RowSet::new("signed drivers", &signed, KEY);
        let entities = backend.fetch_matching(Self::DOMAIN, pnp::spec(), pnp::KEY, primary.ids())?;

        let lookup = backend.lookup();
        let drivers = Correlation::new(primary)
            .join(
                RowSet::new("pnp entities", &entities, pnp::KEY),
                |driver: &mut Driver, row: &Row| pnp::overlay(&mut driver.pci, row, lookup),
            )
            .run(Driver::blank, signed_driver_overlay);

        Ok(Self {
            ctx: backend.context().clone(),
            drivers,
        })
    }
}

/// The signed-driver row wins over the PnP entity where both speak.
fn signed_driver_overlay(driver: &mut Driver, row: &Row) {
    overwrite(&mut driver.address, row.text(KEY));
    overwrite(&mut driver.name, row.text("DriverName"));
    overwrite(&mut driver.version, row.text("DriverVersion"));
    overwrite(&mut driver.provider, row.text("DriverProviderName"));
    overwrite(&mut driver.pci.driver, row.text("DriverName"));
    overwrite(&mut driver.pci.product.name, row.text("DeviceName"));
    overwrite(&mut driver.pci.class.name, row.text("DeviceClass"));
}

impl Snapshot for DriverInfo {
    const DOMAIN: &'static str = "driver";

    fn detail_lines(&self) -> Vec<String> {
        self.drivers.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for DriverInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "driver ({})", plural(self.drivers.len(), "driver"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::backend;
    use crate::load;
    use hwscope_core::{StaticSource, UNKNOWN};

    fn signed(id: &str, name: &str) -> Row {
        Row::new()
            .with("DeviceID", id)
            .with("DriverName", name)
            .with("DriverVersion", "10.0.19041.1")
            .with("DriverProviderName", "Microsoft")
            .with("DeviceName", "Standard SATA AHCI Controller")
    }

    #[test]
    fn signed_drivers_join_their_devices() {
        let source = StaticSource::new()
            .with_rows(
                Table::PnpSignedDriver,
                vec![
                    signed(r"PCI\VEN_8086&DEV_A352\3&1", "storahci.inf"),
                    signed(r"ROOT\LEGACY\0000", "legacy.inf"),
                ],
            )
            .with_rows(
                Table::PnpEntity,
                vec![Row::new()
                    .with("PNPDeviceID", r"PCI\VEN_8086&DEV_A352\3&1")
                    .with("Manufacturer", "Standard SATA AHCI Controller")
                    .with("Name", "Intel AHCI")
                    .with("Description", "AHCI controller")],
            );
        let info: DriverInfo = load(&backend(source)).unwrap();
        assert_eq!(info.drivers.len(), 2);

        let ahci = &info.drivers[0];
        assert_eq!(ahci.address, r"PCI\VEN_8086&DEV_A352\3&1");
        assert_eq!(ahci.pci.address.as_str(), r"PCI\\VEN_8086&DEV_A352\\3&1");
        assert_eq!(ahci.name, "storahci.inf");
        assert_eq!(ahci.provider, "Microsoft");
        assert_eq!(ahci.index, 0);
        assert_eq!(ahci.pci.vendor.name, "Standard SATA AHCI Controller");
        assert_eq!(ahci.pci.product.id, "Intel AHCI");
        // the signed-driver row is applied last
        assert_eq!(ahci.pci.product.name, "Standard SATA AHCI Controller");

        let legacy = &info.drivers[1];
        assert_eq!(legacy.pci.vendor.id, UNKNOWN);
        assert_eq!(legacy.pci.subsystem.name, UNKNOWN);
        assert_eq!(legacy.version, "10.0.19041.1");
        assert_eq!(info.to_string(), "driver (2 drivers)");
    }

    #[test]
    fn missing_fields_stay_unknown() {
        let source = StaticSource::new()
            .with_rows(
                Table::PnpSignedDriver,
                vec![Row::new().with("DeviceID", "0000:00:1f.3").with("DriverName", "snd_hda_intel")],
            )
            .with_rows(Table::PnpEntity, Vec::new());
        let info: DriverInfo = load(&backend(source)).unwrap();
        let driver = &info.drivers[0];
        assert_eq!(driver.name, "snd_hda_intel");
        assert_eq!(driver.version, UNKNOWN);
        assert_eq!(driver.provider, UNKNOWN);
        assert_eq!(driver.pci.driver, "snd_hda_intel");
    }

    #[test]
    fn primary_failure_fails_the_domain() {
        let source = StaticSource::new().with_failure(Table::PnpSignedDriver, "access denied");
        let err = load::<DriverInfo>(&backend(source)).unwrap_err();
        assert_eq!(err.domain(), "driver");
        assert_eq!(err.table(), Table::PnpSignedDriver);
    }
}
