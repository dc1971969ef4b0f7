use crate::classes;
use hwscope_core::{Filter, QuerySpec};

/// Renders `spec` as a WQL `SELECT` over the fields its class defines.
pub fn select(spec: &QuerySpec) -> String {
    render(spec, &classes::project(spec))
}

/// Filter values are already canonical device ids, so each backslash is
/// doubled exactly once; only quotes need escaping on top.
pub(crate) fn render(spec: &QuerySpec, fields: &[String]) -> String {
    let fields = if fields.is_empty() {
        "*".to_string()
    } else {
        fields.join(", ")
    };
    let mut query = format!("SELECT {} FROM {}", fields, spec.table.class_name());
    if let Some(clause) = spec.filter.as_ref().and_then(where_clause) {
        query.push_str(" WHERE ");
        query.push_str(&clause);
    }
    query
}

fn where_clause(filter: &Filter) -> Option<String> {
    match filter {
        Filter::AnyOf { field, values } => {
            if values.is_empty() {
                return None;
            }
            let terms: Vec<String> = values
                .iter()
                .map(|id| format!("{} = {}", field, literal(id.as_str())))
                .collect();
            Some(terms.join(" OR "))
        }
    }
}

fn literal(canonical: &str) -> String {
    format!("'{}'", canonical.replace('\'', "\\'"))
}
