use hwscope_core::{canonicalize, DeviceId, Row};
use tracing::debug;

/// Rows from one table together with the field that identifies a device.
#[derive(Debug, Clone, Copy)]
pub struct RowSet<'a> {
    pub name: &'static str,
    pub rows: &'a [Row],
    pub key: &'static str,
}

impl<'a> RowSet<'a> {
    pub fn new(name: &'static str, rows: &'a [Row], key: &'static str) -> Self {
        Self { name, rows, key }
    }

    /// Canonical ids of every row, in row order, skipping rows without one.
    pub fn ids(&self) -> Vec<DeviceId> {
        self.rows
            .iter()
            .filter_map(|row| row.text(self.key))
            .map(DeviceId::new)
            .collect()
    }

    /// First row whose key canonicalizes to `id`. Later rows with the same id
    /// are ignored.
    fn first_match(&self, id: &DeviceId) -> Option<&'a Row> {
        if id.is_empty() {
            return None;
        }
        let mut matches = self.rows.iter().filter(|row| {
            row.text(self.key)
                .is_some_and(|raw| canonicalize(raw) == id.as_str())
        });
        let first = matches.next()?;
        let ignored = matches.count();
        if ignored > 0 {
            debug!(table = self.name, %id, ignored, "several rows share an id; keeping the first");
        }
        Some(first)
    }
}

type Overlay<'a, T> = Box<dyn Fn(&mut T, &Row) + 'a>;

/// One correlation pass: a primary row-set decides how many records come out
/// and in what order; each secondary row-set is joined on canonical id.
///
/// Per primary row the record is built as: blank record (all sentinel), then
/// each secondary overlay in the order the joins were declared, then the
/// primary overlay. A secondary without a matching row contributes nothing,
/// so its fields stay the sentinel.
pub struct Correlation<'a, T> {
    primary: RowSet<'a>,
    joins: Vec<(RowSet<'a>, Overlay<'a, T>)>,
}

impl<'a, T> Correlation<'a, T> {
    pub fn new(primary: RowSet<'a>) -> Self {
        Self {
            primary,
            joins: Vec::new(),
        }
    }

    pub fn join(mut self, set: RowSet<'a>, overlay: impl Fn(&mut T, &Row) + 'a) -> Self {
        self.joins.push((set, Box::new(overlay)));
        self
    }

    pub fn run(&self, blank: impl Fn(DeviceId) -> T, primary_overlay: impl Fn(&mut T, &Row)) -> Vec<T> {
        let mut records = Vec::with_capacity(self.primary.rows.len());
        let mut gaps = 0usize;
        for row in self.primary.rows {
            let id = DeviceId::new(row.text(self.primary.key).unwrap_or_default());
            let mut record = blank(id.clone());
            for (set, overlay) in &self.joins {
                match set.first_match(&id) {
                    Some(matched) => overlay(&mut record, matched),
                    None => {
                        gaps += 1;
                        debug!(table = set.name, %id, "no matching row; its fields stay unknown");
                    }
                }
            }
            primary_overlay(&mut record, row);
            records.push(record);
        }
        debug!(
            primary = self.primary.name,
            records = records.len(),
            gaps,
            "correlation pass complete"
        );
        records
    }
}
