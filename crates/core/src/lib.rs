//! Shared model and contracts for hwscope.
//!
//! Backends produce [`Row`]s for a [`QuerySpec`]; the correlation crate joins
//! them into the records defined here; the inventory crate wraps those records
//! in immutable per-domain snapshots.

use time::format_description::well_known::Rfc3339;

mod context;
mod ident;
mod lookup;
mod model;
mod query;
mod row;
mod snapshot;
pub mod unknown;
pub mod units;

pub use context::{Context, ContextOptions, ErrorPolicy};
pub use ident::{canonicalize, DeviceId};
pub use lookup::{DeviceLookup, UnknownLookup};
pub use model::{
    Descriptor, Driver, GraphicsCard, MemoryArea, MemoryModule, PciDevice, SystemProduct,
};
pub use query::{Filter, QueryError, QuerySource, QuerySpec, StaticSource, Table};
pub use row::{Row, Value};
pub use snapshot::Snapshot;
pub use unknown::UNKNOWN;

pub const INVENTORY_SCHEMA_VERSION: &str = "1.0.0";

pub fn now_utc_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
