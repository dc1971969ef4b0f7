use hwscope_core::Row;

/// Per-unit records of a pool domain and their summed capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool<U> {
    pub units: Vec<U>,
    pub capacity: u64,
}

/// Builds one unit per row and sums `capacity_field` across them.
///
/// A row that does not report the field yields a unit of capacity zero and
/// adds zero to the total; totals never carry the sentinel.
pub fn reduce_pool<U>(rows: &[Row], capacity_field: &str, unit: impl Fn(&Row, u64) -> U) -> Pool<U> {
    let mut pool = Pool {
        units: Vec::with_capacity(rows.len()),
        capacity: 0,
    };
    for row in rows {
        let size = row.uint(capacity_field).unwrap_or(0);
        pool.capacity = pool.capacity.saturating_add(size);
        pool.units.push(unit(row, size));
    }
    pool
}

pub fn sum_field<'a>(rows: impl IntoIterator<Item = &'a Row>, field: &str) -> u64 {
    rows.into_iter()
        .fold(0u64, |total, row| total.saturating_add(row.uint(field).unwrap_or(0)))
}
