use hwscope_core::unknown::overwrite;
use hwscope_core::{DeviceLookup, PciDevice, QuerySpec, Row, Table};

pub(crate) const KEY: &str = "PNPDeviceID";

/// CIM exposes names only; sysfs exposes numeric ids that go through the
/// lookup. A backend answers whichever half it has.
const FIELDS: &[&str] = &[
    KEY,
    "Manufacturer",
    "Name",
    "Description",
    "VendorID",
    "ProductID",
    "SubsystemID",
    "ClassCode",
];

pub(crate) fn spec() -> QuerySpec {
    QuerySpec::new(Table::PnpEntity, FIELDS)
}

/// Replaces the sentinel classification of `pci` with what `row` reports.
pub(crate) fn overlay(pci: &mut PciDevice, row: &Row, lookup: &dyn DeviceLookup) {
    overwrite(&mut pci.vendor.id, row.text("Manufacturer"));
    overwrite(&mut pci.vendor.name, row.text("Manufacturer"));
    overwrite(&mut pci.product.id, row.text("Name"));
    overwrite(&mut pci.product.name, row.text("Description"));

    if let Some(vendor_id) = row.text("VendorID") {
        let product_id = row.text("ProductID");
        let (vendor_name, product_name) = lookup.lookup(vendor_id, product_id.unwrap_or_default());
        overwrite(&mut pci.vendor.id, Some(vendor_id));
        overwrite(&mut pci.vendor.name, Some(vendor_name.as_str()));
        overwrite(&mut pci.product.id, product_id);
        overwrite(&mut pci.product.name, Some(product_name.as_str()));
    }
    overwrite(&mut pci.subsystem.id, row.text("SubsystemID"));

    if let Some((class, subclass, prog_if)) = row.text("ClassCode").and_then(split_class_code) {
        let (class_name, subclass_name, prog_if_name) = lookup.class_names(class, subclass, prog_if);
        overwrite(&mut pci.class.id, Some(class));
        overwrite(&mut pci.class.name, Some(class_name.as_str()));
        overwrite(&mut pci.subclass.id, Some(subclass));
        overwrite(&mut pci.subclass.name, Some(subclass_name.as_str()));
        overwrite(&mut pci.programming_interface.id, Some(prog_if));
        overwrite(&mut pci.programming_interface.name, Some(prog_if_name.as_str()));
    }
}

/// `030000` -> (`03`, `00`, `00`).
fn split_class_code(code: &str) -> Option<(&str, &str, &str)> {
    if code.len() != 6 || !code.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    Some((&code[0..2], &code[2..4], &code[4..6]))
}
