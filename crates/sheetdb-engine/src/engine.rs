//! Query engine
//!
//! Applies a [`QuerySpec`] to a record sequence in four fixed stages:
//! filter, project, order, limit.

use crate::coerce::{loose_eq, parse_number};
use sheetdb_core::{Columns, Direction, Filter, FilterOp, OrderBy, QuerySpec, Record, Result};
use std::cmp::Ordering;

/// Pure, synchronous query executor over in-memory records.
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryEngine;

impl QueryEngine {
    pub fn new() -> Self {
        Self
    }

    /// Execute a spec against a materialized record sequence.
    ///
    /// The input order is preserved except where `order` dictates
    /// otherwise; ties under ordering keep their input order.
    pub fn execute(&self, records: Vec<Record>, spec: &QuerySpec) -> Result<Vec<Record>> {
        spec.validate()?;

        let mut records = apply_filters(records, &spec.filters);
        records = apply_projection(records, &spec.columns);
        apply_order(&mut records, spec.order.as_ref());
        apply_limit(&mut records, spec.limit);
        Ok(records)
    }
}

fn apply_filters(records: Vec<Record>, filters: &[Filter]) -> Vec<Record> {
    if filters.is_empty() {
        return records;
    }
    records
        .into_iter()
        .filter(|record| filters.iter().all(|filter| matches_filter(record, filter)))
        .collect()
}

fn matches_filter(record: &Record, filter: &Filter) -> bool {
    let field_value = record.get(&filter.field);

    match &filter.operator {
        FilterOp::Eq => loose_eq(field_value, &filter.value),
        FilterOp::Neq => !loose_eq(field_value, &filter.value),
        FilterOp::Gt => compare_numeric(field_value, &filter.value, |ord| ord == Ordering::Greater),
        FilterOp::Gte => compare_numeric(field_value, &filter.value, |ord| ord != Ordering::Less),
        FilterOp::Lt => compare_numeric(field_value, &filter.value, |ord| ord == Ordering::Less),
        FilterOp::Lte => compare_numeric(field_value, &filter.value, |ord| ord != Ordering::Greater),
        FilterOp::Like => {
            // Null field values match like an empty string
            let field = field_value.unwrap_or("").to_lowercase();
            let pattern = filter.value.to_lowercase();
            field.contains(&pattern)
        }
        FilterOp::Other(name) => {
            tracing::warn!(operator = %name, "unknown filter operator, record passes");
            true
        }
    }
}

/// Numeric comparison; either side failing to parse fails the comparison.
fn compare_numeric(field: Option<&str>, filter: &str, check: impl Fn(Ordering) -> bool) -> bool {
    let (Some(a), Some(b)) = (field.and_then(parse_number), parse_number(filter)) else {
        return false;
    };
    a.partial_cmp(&b).is_some_and(check)
}

fn apply_projection(records: Vec<Record>, columns: &Columns) -> Vec<Record> {
    let Columns::Named(names) = columns else {
        return records;
    };
    records
        .into_iter()
        .map(|record| {
            names
                .iter()
                .map(|col| (col.clone(), record.get(col).map(String::from)))
                .collect()
        })
        .collect()
}

fn apply_order(records: &mut [Record], order: Option<&OrderBy>) {
    let Some(order) = order else {
        return;
    };
    records.sort_by(|a, b| {
        let cmp = compare_values(a.get(&order.field), b.get(&order.field));
        // Reverse the comparison, not the sorted sequence, so equal keys
        // keep their stable input order under desc as well
        match order.direction {
            Direction::Asc => cmp,
            Direction::Desc => cmp.reverse(),
        }
    });
}

/// Compare two field values: numerically when both parse, as strings
/// otherwise, with null reading as the empty string.
fn compare_values(a: Option<&str>, b: Option<&str>) -> Ordering {
    let (sa, sb) = (a.unwrap_or(""), b.unwrap_or(""));
    match (parse_number(sa), parse_number(sb)) {
        (Some(na), Some(nb)) => na.partial_cmp(&nb).unwrap_or(Ordering::Equal),
        _ => sa.cmp(sb),
    }
}

fn apply_limit(records: &mut Vec<Record>, limit: Option<i64>) {
    if let Some(limit) = limit {
        if limit > 0 {
            records.truncate(limit as usize);
        }
    }
}
