//! Vendor, device and class names from a `pci.ids` database.

use anyhow::{Context as _, Result};
use hwscope_core::unknown::{or_unknown, unknown};
use hwscope_core::{Context, DeviceLookup};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const SEARCH_PATHS: [&str; 3] = [
    "/usr/share/hwdata/pci.ids",
    "/usr/share/misc/pci.ids",
    "/usr/share/pci.ids",
];

#[derive(Debug, Clone, Default)]
struct VendorEntry {
    name: String,
    products: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
struct SubclassEntry {
    name: String,
    prog_ifs: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
struct ClassEntry {
    name: String,
    subclasses: HashMap<String, SubclassEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct PciIds {
    vendors: HashMap<String, VendorEntry>,
    classes: HashMap<String, ClassEntry>,
}

enum Section {
    Vendors,
    Classes,
}

impl PciIds {
    pub fn parse(text: &str) -> Self {
        let mut db = PciIds::default();
        let mut section = Section::Vendors;
        let mut vendor: Option<String> = None;
        let mut class: Option<String> = None;
        let mut subclass: Option<String> = None;

        for line in text.lines() {
            let line = line.trim_end();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let depth = line.chars().take_while(|ch| *ch == '\t').count();
            let body = &line[depth..];

            if depth == 0 {
                if let Some(rest) = body.strip_prefix("C ") {
                    section = Section::Classes;
                    let Some((id, name)) = split_entry(rest) else {
                        continue;
                    };
                    db.classes.insert(
                        id.clone(),
                        ClassEntry {
                            name,
                            subclasses: HashMap::new(),
                        },
                    );
                    class = Some(id);
                    subclass = None;
                    continue;
                }
                section = Section::Vendors;
                let Some((id, name)) = split_entry(body) else {
                    continue;
                };
                db.vendors.insert(
                    id.clone(),
                    VendorEntry {
                        name,
                        products: HashMap::new(),
                    },
                );
                vendor = Some(id);
                continue;
            }

            let Some((id, name)) = split_entry(body) else {
                continue;
            };
            match (&section, depth) {
                (Section::Vendors, 1) => {
                    if let Some(entry) = vendor.as_ref().and_then(|key| db.vendors.get_mut(key)) {
                        entry.products.insert(id, name);
                    }
                }
                (Section::Classes, 1) => {
                    if let Some(entry) = class.as_ref().and_then(|key| db.classes.get_mut(key)) {
                        entry.subclasses.insert(
                            id.clone(),
                            SubclassEntry {
                                name,
                                prog_ifs: HashMap::new(),
                            },
                        );
                        subclass = Some(id);
                    }
                }
                (Section::Classes, 2) => {
                    let entry = class
                        .as_ref()
                        .and_then(|key| db.classes.get_mut(key))
                        .and_then(|class| subclass.as_ref().and_then(|key| class.subclasses.get_mut(key)));
                    if let Some(entry) = entry {
                        entry.prog_ifs.insert(id, name);
                    }
                }
                // Subsystem lines are not indexed.
                _ => {}
            }
        }
        db
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?;
        let db = Self::parse(&text);
        debug!(
            path = %path.display(),
            vendors = db.vendors.len(),
            classes = db.classes.len(),
            "loaded pci.ids"
        );
        Ok(db)
    }

    /// First readable database under the context root.
    pub fn discover(ctx: &Context) -> Option<Self> {
        let candidates: Vec<PathBuf> = SEARCH_PATHS.iter().map(|path| ctx.path(path)).collect();
        for candidate in &candidates {
            if !candidate.is_file() {
                continue;
            }
            match Self::load(candidate) {
                Ok(db) => return Some(db),
                Err(err) => warn!(error = %err, "skipping pci.ids candidate"),
            }
        }
        debug!(root = %ctx.root().display(), "no pci.ids database found");
        None
    }

    pub fn vendor_count(&self) -> usize {
        self.vendors.len()
    }
}

impl DeviceLookup for PciIds {
    fn lookup(&self, vendor_id: &str, product_id: &str) -> (String, String) {
        let Some(vendor) = self.vendors.get(&normalize_id(vendor_id)) else {
            return (unknown(), unknown());
        };
        let product = vendor.products.get(&normalize_id(product_id));
        (vendor.name.clone(), or_unknown(product.map(String::as_str)))
    }

    fn class_names(&self, class_id: &str, subclass_id: &str, prog_if_id: &str) -> (String, String, String) {
        let Some(class) = self.classes.get(&normalize_id(class_id)) else {
            return (unknown(), unknown(), unknown());
        };
        let Some(subclass) = class.subclasses.get(&normalize_id(subclass_id)) else {
            return (class.name.clone(), unknown(), unknown());
        };
        let prog_if = subclass.prog_ifs.get(&normalize_id(prog_if_id));
        (
            class.name.clone(),
            subclass.name.clone(),
            or_unknown(prog_if.map(String::as_str)),
        )
    }
}

fn split_entry(body: &str) -> Option<(String, String)> {
    let (id, name) = body.split_once(char::is_whitespace)?;
    let name = name.trim();
    if id.is_empty() || name.is_empty() {
        return None;
    }
    Some((normalize_id(id), name.to_string()))
}

fn normalize_id(id: &str) -> String {
    let id = id.trim();
    let id = id
        .strip_prefix("0x")
        .or_else(|| id.strip_prefix("0X"))
        .unwrap_or(id);
    id.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwscope_core::{ContextOptions, UNKNOWN};

    const SAMPLE: &str = "\
# pci.ids sample
10de  NVIDIA Corporation
\t2204  GA102 [GeForce RTX 3090]
\t\t10de 147d  GeForce RTX 3090 Founders Edition
8086  Intel Corporation
\t46a6  Alder Lake-P GT2 [Iris Xe Graphics]

C 03  Display controller
\t00  VGA compatible controller
\t\t00  VGA controller
\t\t01  8514 controller
\t02  3D controller
C 0c  Serial bus controller
\t03  USB controller
\t\t30  XHCI
";

    #[test]
    fn resolves_vendor_and_product() {
        let db = PciIds::parse(SAMPLE);
        assert_eq!(db.vendor_count(), 2);
        assert_eq!(
            db.lookup("0x10DE", "2204"),
            ("NVIDIA Corporation".to_string(), "GA102 [GeForce RTX 3090]".to_string())
        );
        assert_eq!(
            db.lookup("8086", "ffff"),
            ("Intel Corporation".to_string(), UNKNOWN.to_string())
        );
        assert_eq!(db.lookup("1234", "5678"), (UNKNOWN.to_string(), UNKNOWN.to_string()));
    }

    #[test]
    fn resolves_class_hierarchy() {
        let db = PciIds::parse(SAMPLE);
        assert_eq!(
            db.class_names("03", "00", "00"),
            (
                "Display controller".to_string(),
                "VGA compatible controller".to_string(),
                "VGA controller".to_string()
            )
        );
        assert_eq!(
            db.class_names("03", "02", "00"),
            ("Display controller".to_string(), "3D controller".to_string(), UNKNOWN.to_string())
        );
        assert_eq!(db.class_names("0c", "03", "30").2, "XHCI");
        assert_eq!(db.class_names("ff", "00", "00").0, UNKNOWN);
    }

    #[test]
    fn subsystem_lines_do_not_replace_products() {
        let db = PciIds::parse(SAMPLE);
        assert_eq!(db.lookup("10de", "10de").1, UNKNOWN);
    }

    #[test]
    fn discovers_database_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usr/share/misc");
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("pci.ids"), SAMPLE).unwrap();

        let ctx = Context::new(
            ContextOptions {
                root: Some(dir.path().to_path_buf()),
                ..ContextOptions::default()
            },
            false,
        );
        let db = PciIds::discover(&ctx).expect("database under root");
        assert_eq!(db.lookup("8086", "46a6").0, "Intel Corporation");
    }

    #[test]
    fn missing_database_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::new(
            ContextOptions {
                root: Some(dir.path().to_path_buf()),
                ..ContextOptions::default()
            },
            false,
        );
        assert!(PciIds::discover(&ctx).is_none());
        assert!(PciIds::load(dir.path().join("nope")).is_err());
    }
}
