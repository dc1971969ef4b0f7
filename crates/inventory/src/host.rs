use crate::{
    error_chain, load, Backend, Domain, DriverInfo, GpuInfo, InventoryError, MemoryInfo,
    ProductInfo,
};
use hwscope_core::{now_utc_rfc3339, Snapshot, Table, INVENTORY_SCHEMA_VERSION};
use serde::Serialize;
use std::fmt;
use tracing::warn;
use uuid::Uuid;

/// A domain that failed while the error policy said to carry on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainFailure {
    pub domain: &'static str,
    pub table: Table,
    pub error: String,
}

/// Every domain of one host, loaded concurrently.
#[derive(Debug, Clone, Serialize)]
pub struct HostInventory {
    pub inventory_id: String,
    pub schema_version: String,
    pub generated_at_utc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu: Option<GpuInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<DriverInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<DomainFailure>,
}

impl Domain for HostInventory {
    /// Domains share nothing mutable, so they load side by side. Under the
    /// abort policy the first failure in declared order (memory, gpu, driver,
    /// product) is returned; under collect it is recorded and skipped.
    fn load(backend: &Backend) -> Result<Self, InventoryError> {
        let ((memory, gpu), (driver, product)) = rayon::join(
            || rayon::join(|| load::<MemoryInfo>(backend), || load::<GpuInfo>(backend)),
            || rayon::join(|| load::<DriverInfo>(backend), || load::<ProductInfo>(backend)),
        );

        let abort = backend.context().aborts_on_error();
        let mut failures = Vec::new();
        Ok(Self {
            inventory_id: Uuid::new_v4().to_string(),
            schema_version: INVENTORY_SCHEMA_VERSION.to_string(),
            generated_at_utc: now_utc_rfc3339(),
            memory: settle(memory, abort, &mut failures)?,
            gpu: settle(gpu, abort, &mut failures)?,
            driver: settle(driver, abort, &mut failures)?,
            product: settle(product, abort, &mut failures)?,
            failures,
        })
    }
}

fn settle<D>(
    result: Result<D, InventoryError>,
    abort: bool,
    failures: &mut Vec<DomainFailure>,
) -> Result<Option<D>, InventoryError> {
    match result {
        Ok(snapshot) => Ok(Some(snapshot)),
        Err(err) if abort => Err(err),
        Err(err) => {
            let error = error_chain(&err);
            warn!(domain = err.domain(), %error, "domain failed; continuing");
            failures.push(DomainFailure {
                domain: err.domain(),
                table: err.table(),
                error,
            });
            Ok(None)
        }
    }
}

impl HostInventory {
    fn loaded(&self) -> usize {
        [
            self.memory.is_some(),
            self.gpu.is_some(),
            self.driver.is_some(),
            self.product.is_some(),
        ]
        .into_iter()
        .filter(|loaded| *loaded)
        .count()
    }
}

impl Snapshot for HostInventory {
    const DOMAIN: &'static str = "inventory";

    fn detail_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(memory) = &self.memory {
            lines.push(memory.to_string());
        }
        if let Some(gpu) = &self.gpu {
            lines.push(gpu.to_string());
            lines.extend(gpu.detail_lines().into_iter().map(|line| format!("  {line}")));
        }
        if let Some(driver) = &self.driver {
            lines.push(driver.to_string());
        }
        if let Some(product) = &self.product {
            lines.push(product.to_string());
        }
        for failure in &self.failures {
            lines.push(format!("{} failed: {}", failure.domain, failure.error));
        }
        lines
    }
}

impl fmt::Display for HostInventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "inventory {} ({} of 4 domains loaded)",
            self.inventory_id,
            self.loaded()
        )
    }
}
