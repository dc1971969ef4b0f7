use crate::read_string;
use hwscope_core::{Context, Row};

const DMI_ID_DIR: &str = "/sys/class/dmi/id";

/// `(dmi id file, Win32_ComputerSystemProduct property)`.
const FIELDS: [(&str, &str); 7] = [
    ("sys_vendor", "Vendor"),
    ("product_name", "Name"),
    ("product_serial", "IdentifyingNumber"),
    ("product_uuid", "UUID"),
    ("product_sku", "SKUNumber"),
    ("product_version", "Version"),
    ("product_family", "Family"),
];

/// Always one row; files that are absent or root-only leave their field out.
pub(crate) fn computer_system_product(ctx: &Context) -> Vec<Row> {
    let dir = ctx.path(DMI_ID_DIR);
    let mut row = Row::new();
    for (file, field) in FIELDS {
        if let Some(value) = read_string(dir.join(file)) {
            row.insert(field, value);
        }
    }
    vec![row]
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::fixture::*;

    #[test]
    fn maps_dmi_files_to_product_fields() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "sys/class/dmi/id/sys_vendor", "LENOVO\n");
        write(dir.path(), "sys/class/dmi/id/product_name", "21CB0073GE\n");
        write(dir.path(), "sys/class/dmi/id/product_family", "ThinkPad X1 Carbon Gen 10\n");
        write(dir.path(), "sys/class/dmi/id/product_sku", "\n");

        let rows = computer_system_product(&context(dir.path(), false));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text("Vendor"), Some("LENOVO"));
        assert_eq!(rows[0].text("Name"), Some("21CB0073GE"));
        assert_eq!(rows[0].text("Family"), Some("ThinkPad X1 Carbon Gen 10"));
        assert!(rows[0].get("SKUNumber").is_none());
        assert!(rows[0].get("UUID").is_none());
    }
}
