use crate::{Backend, Domain, InventoryError};
use hwscope_core::unknown::fill;
use hwscope_core::{Context, QuerySpec, Row, Snapshot, SystemProduct, Table};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

const PRODUCT_FIELDS: &[&str] = &[
    "Family",
    "Name",
    "Vendor",
    "IdentifyingNumber",
    "UUID",
    "SKUNumber",
    "Version",
];

#[derive(Debug, Clone, Serialize)]
pub struct ProductInfo {
    #[serde(skip)]
    ctx: Arc<Context>,
    #[serde(flatten)]
    pub product: SystemProduct,
}

impl ProductInfo {
    pub fn context(&self) -> &Context {
        &self.ctx
    }
}

impl Domain for ProductInfo {
    fn load(backend: &Backend) -> Result<Self, InventoryError> {
        let rows = backend.fetch(
            Self::DOMAIN,
            QuerySpec::new(Table::ComputerSystemProduct, PRODUCT_FIELDS),
        )?;
        if rows.len() > 1 {
            debug!(rows = rows.len(), "several product rows; keeping the first");
        }
        let mut product = SystemProduct::blank();
        if let Some(row) = rows.first() {
            apply(&mut product, row);
        }
        Ok(Self {
            ctx: backend.context().clone(),
            product,
        })
    }
}

fn apply(product: &mut SystemProduct, row: &Row) {
    fill(&mut product.family, row.text("Family"));
    fill(&mut product.name, row.text("Name"));
    fill(&mut product.vendor, row.text("Vendor"));
    fill(&mut product.serial_number, row.text("IdentifyingNumber"));
    fill(&mut product.uuid, row.text("UUID"));
    fill(&mut product.sku, row.text("SKUNumber"));
    fill(&mut product.version, row.text("Version"));
}

impl Snapshot for ProductInfo {
    const DOMAIN: &'static str = "product";
}

impl fmt::Display for ProductInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.product, f)
    }
}
