use crate::{plural, pnp, Backend, Domain, InventoryError};
use hwscope_core::unknown::overwrite;
use hwscope_core::{Context, GraphicsCard, QuerySpec, Row, Snapshot, Table};
use hwscope_correlate::{Correlation, RowSet};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

const CONTROLLER_FIELDS: &[&str] = &[
    "DeviceID",
    "Name",
    "PNPDeviceID",
    "DriverName",
    "DriverVersion",
    "Index",
];

#[derive(Debug, Clone, Serialize)]
pub struct GpuInfo {
    #[serde(skip)]
    ctx: Arc<Context>,
    pub graphics_cards: Vec<GraphicsCard>,
}

impl GpuInfo {
    pub fn context(&self) -> &Context {
        &self.ctx
    }
}

impl Domain for GpuInfo {
    fn load(backend: &Backend) -> Result<Self, InventoryError> {
        let controllers = backend.fetch(
            Self::DOMAIN,
            QuerySpec::new(Table::VideoController, CONTROLLER_FIELDS),
        )?;
        let primary = RowSet::new("video controllers", &controllers, pnp::KEY);
        let entities = backend.fetch_matching(Self::DOMAIN, pnp::spec(), pnp::KEY, primary.ids())?;

        let lookup = backend.lookup();
        let graphics_cards = Correlation::new(primary)
            .join(
                RowSet::new("pnp entities", &entities, pnp::KEY),
                |card: &mut GraphicsCard, row: &Row| pnp::overlay(&mut card.pci, row, lookup),
            )
            .run(GraphicsCard::blank, controller_overlay);

        Ok(Self {
            ctx: backend.context().clone(),
            graphics_cards,
        })
    }
}

fn controller_overlay(card: &mut GraphicsCard, row: &Row) {
    overwrite(&mut card.address, row.text("DeviceID"));
    overwrite(&mut card.name, row.text("Name"));
    card.index = row
        .uint("Index")
        .and_then(|index| u32::try_from(index).ok())
        .unwrap_or(0);
    overwrite(
        &mut card.pci.driver,
        row.text("DriverVersion").or_else(|| row.text("DriverName")),
    );
}

impl Snapshot for GpuInfo {
    const DOMAIN: &'static str = "gpu";

    fn detail_lines(&self) -> Vec<String> {
        self.graphics_cards.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for GpuInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gpu ({})", plural(self.graphics_cards.len(), "graphics card"))
    }
}
