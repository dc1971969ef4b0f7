//! Joins row-sets from independent backend queries into normalized records,
//! and reduces pools of physical units into machine-wide totals.

mod engine;
mod reduce;

pub use engine::{Correlation, RowSet};
pub use reduce::{reduce_pool, sum_field, Pool};
