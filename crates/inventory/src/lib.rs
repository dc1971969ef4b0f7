//! Per-domain info façades.
//!
//! A façade starts [`Unloaded`] and is consumed by [`Unloaded::load`], which
//! runs the domain's queries once, correlates them and hands back an
//! immutable snapshot. A failed load yields no snapshot at all.

use hwscope_core::{
    Context, DeviceId, DeviceLookup, Filter, QueryError, QuerySource, QuerySpec, Row, Snapshot,
    Table,
};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info};

mod driver;
mod gpu;
mod host;
mod memory;
mod pnp;
mod product;

pub use driver::DriverInfo;
pub use gpu::GpuInfo;
pub use host::{DomainFailure, HostInventory};
pub use memory::MemoryInfo;
pub use product::ProductInfo;

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("{domain}: query on {} failed", .source.table())]
    Query {
        domain: &'static str,
        #[source]
        source: QueryError,
    },
}

impl InventoryError {
    pub fn domain(&self) -> &'static str {
        match self {
            InventoryError::Query { domain, .. } => *domain,
        }
    }

    pub fn table(&self) -> Table {
        match self {
            InventoryError::Query { source, .. } => source.table(),
        }
    }
}

/// Everything a façade needs from the platform: the shared context, the
/// query adapter and the vendor lookup. Cheap to clone.
#[derive(Clone)]
pub struct Backend {
    ctx: Arc<Context>,
    source: Arc<dyn QuerySource>,
    lookup: Arc<dyn DeviceLookup>,
}

impl Backend {
    pub fn new(
        ctx: Arc<Context>,
        source: Arc<dyn QuerySource>,
        lookup: Arc<dyn DeviceLookup>,
    ) -> Self {
        Self {
            ctx,
            source,
            lookup,
        }
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.ctx
    }

    pub fn lookup(&self) -> &dyn DeviceLookup {
        self.lookup.as_ref()
    }

    fn fetch(&self, domain: &'static str, spec: QuerySpec) -> Result<Vec<Row>, InventoryError> {
        let rows = self
            .source
            .query(&spec)
            .map_err(|source| InventoryError::Query { domain, source })?;
        debug!(
            domain,
            backend = self.source.name(),
            table = %spec.table,
            rows = rows.len(),
            "fetched"
        );
        Ok(rows)
    }

    /// Issues a dependent query restricted to `ids`. With no ids there is
    /// nothing to ask for, so no query is issued.
    fn fetch_matching(
        &self,
        domain: &'static str,
        spec: QuerySpec,
        key: &str,
        ids: Vec<DeviceId>,
    ) -> Result<Vec<Row>, InventoryError> {
        let filter = Filter::any_of(key, ids);
        if filter.is_empty() {
            debug!(domain, table = %spec.table, "no ids to match; skipping query");
            return Ok(Vec::new());
        }
        self.fetch(domain, spec.filtered(filter))
    }
}

/// A domain whose snapshot can be built from a [`Backend`].
pub trait Domain: Snapshot + Sized {
    fn load(backend: &Backend) -> Result<Self, InventoryError>;
}

/// A façade that has not queried anything yet.
pub struct Unloaded<D> {
    backend: Backend,
    domain: PhantomData<fn() -> D>,
}

impl<D: Domain> Unloaded<D> {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            domain: PhantomData,
        }
    }

    pub fn load(self) -> Result<D, InventoryError> {
        let snapshot = D::load(&self.backend)?;
        info!(domain = D::DOMAIN, "{}", snapshot);
        Ok(snapshot)
    }
}

pub fn load<D: Domain>(backend: &Backend) -> Result<D, InventoryError> {
    Unloaded::<D>::new(backend.clone()).load()
}

/// The error and every source below it, joined for display.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut cause = err.source();
    while let Some(inner) = cause {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        cause = inner.source();
    }
    message
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

#[cfg(test)]
pub(crate) mod fixture {
    use super::*;
    use hwscope_core::{ContextOptions, ErrorPolicy, StaticSource, UNKNOWN};

    /// Resolves ids from a tiny in-memory table, missing everything else.
    pub struct TableLookup;

    impl DeviceLookup for TableLookup {
        fn lookup(&self, vendor_id: &str, product_id: &str) -> (String, String) {
            let vendor = match vendor_id {
                "10de" => "NVIDIA Corporation",
                "8086" => "Intel Corporation",
                _ => UNKNOWN,
            };
            let product = match (vendor_id, product_id) {
                ("10de", "1c82") => "GP107 [GeForce GTX 1050 Ti]",
                _ => UNKNOWN,
            };
            (vendor.to_string(), product.to_string())
        }

        fn class_names(&self, class: &str, subclass: &str, prog_if: &str) -> (String, String, String) {
            match (class, subclass, prog_if) {
                ("03", "00", "00") => (
                    "Display controller".to_string(),
                    "VGA compatible controller".to_string(),
                    "VGA controller".to_string(),
                ),
                _ => (UNKNOWN.to_string(), UNKNOWN.to_string(), UNKNOWN.to_string()),
            }
        }
    }

    pub fn backend(source: StaticSource) -> Backend {
        backend_with(source, ErrorPolicy::Abort)
    }

    pub fn backend_with(source: StaticSource, policy: ErrorPolicy) -> Backend {
        let options = ContextOptions {
            error_policy: Some(policy),
            ..ContextOptions::default()
        };
        Backend::new(
            Arc::new(Context::new(options, false)),
            Arc::new(source),
            Arc::new(TableLookup),
        )
    }
}
