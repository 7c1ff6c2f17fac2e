//! Query specification and fluent builder
//!
//! A [`QuerySpec`] is an immutable description of a filter/projection/
//! order/limit request against one table. Specs are constructed through
//! [`QueryBuilder`], which holds a mutable draft and yields the immutable
//! spec from a single fallible `build()` step.

use crate::error::{Error, Result};
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Filter comparison operator.
///
/// `Other` carries an operator name the engine does not know; evaluation
/// treats it as a no-op with a warning. Boundaries parsing untrusted input
/// should use [`FilterOp::from_str`], which rejects unknown names instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    Other(String),
}

impl FilterOp {
    /// Wire name of the operator
    pub fn as_str(&self) -> &str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::Like => "like",
            FilterOp::Other(name) => name,
        }
    }
}

impl FromStr for FilterOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "eq" => Ok(FilterOp::Eq),
            "neq" => Ok(FilterOp::Neq),
            "gt" => Ok(FilterOp::Gt),
            "gte" => Ok(FilterOp::Gte),
            "lt" => Ok(FilterOp::Lt),
            "lte" => Ok(FilterOp::Lte),
            "like" => Ok(FilterOp::Like),
            other => Err(Error::validation(format!("unknown operator: {other}"))),
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FilterOp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One conjunctive filter clause.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Filter {
    pub field: String,
    pub operator: FilterOp,
    pub value: String,
}

impl Filter {
    pub fn new(field: impl Into<String>, operator: FilterOp, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            other => Err(Error::validation(format!("unknown sort direction: {other}"))),
        }
    }
}

/// Ordering clause: stable sort by one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Projection: everything, or an explicit ordered column list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Columns {
    #[default]
    All,
    Named(Vec<String>),
}

impl Columns {
    /// Parse a select expression: `"*"` or a comma-separated column list
    pub fn parse(select: &str) -> Self {
        if select.trim() == "*" {
            return Columns::All;
        }
        Columns::Named(
            select
                .split(',')
                .map(|col| col.trim().to_string())
                .filter(|col| !col.is_empty())
                .collect(),
        )
    }
}

impl Serialize for Columns {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Columns::All => {
                let mut seq = serializer.serialize_seq(Some(1))?;
                seq.serialize_element("*")?;
                seq.end()
            }
            Columns::Named(cols) => {
                let mut seq = serializer.serialize_seq(Some(cols.len()))?;
                for col in cols {
                    seq.serialize_element(col)?;
                }
                seq.end()
            }
        }
    }
}

/// Immutable description of a query over one table.
///
/// Filters are always conjunctive. `limit` values of zero or below impose
/// no limit. Serialization order is fixed by field declaration, which is
/// what makes cache-key derivation construction-order insensitive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySpec {
    pub table: String,
    pub columns: Columns,
    pub filters: Vec<Filter>,
    pub order: Option<OrderBy>,
    pub limit: Option<i64>,
}

impl QuerySpec {
    /// Start building a spec for the given table
    pub fn builder(table: impl Into<String>) -> QueryBuilder {
        QueryBuilder::new().from(table)
    }

    /// The caller error of an unset table, checked before any fetch
    pub fn validate(&self) -> Result<()> {
        if self.table.is_empty() {
            return Err(Error::validation("a table must be specified with from()"));
        }
        Ok(())
    }
}

/// Fluent builder holding a mutable query draft.
///
/// Mirrors the chained style `from("flowers").select("*").eq("type",
/// "roses").order("name", Direction::Asc).build()`. The draft is private;
/// only `build()` hands out a spec, after validating it.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    table: Option<String>,
    columns: Columns,
    filters: Vec<Filter>,
    order: Option<OrderBy>,
    limit: Option<i64>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target table (sheet) of the query
    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Columns to project: `"*"` or `"name, country"`
    pub fn select(mut self, columns: &str) -> Self {
        self.columns = Columns::parse(columns);
        self
    }

    /// Push an arbitrary filter clause
    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: impl Into<String>) -> Self {
        self.filters.push(Filter::new(field, op, value));
        self
    }

    /// Field equals value (loose, string-or-numeric equality)
    pub fn eq(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter(field, FilterOp::Eq, value)
    }

    /// Field differs from value
    pub fn neq(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter(field, FilterOp::Neq, value)
    }

    /// Field numerically greater than value
    pub fn gt(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter(field, FilterOp::Gt, value)
    }

    /// Field numerically greater than or equal to value
    pub fn gte(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter(field, FilterOp::Gte, value)
    }

    /// Field numerically less than value
    pub fn lt(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter(field, FilterOp::Lt, value)
    }

    /// Field numerically less than or equal to value
    pub fn lte(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter(field, FilterOp::Lte, value)
    }

    /// Field contains the pattern, case-insensitive
    pub fn like(self, field: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.filter(field, FilterOp::Like, pattern)
    }

    /// Sort by a field
    pub fn order(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Cap the result length; zero or negative means unlimited
    pub fn limit(mut self, count: i64) -> Self {
        self.limit = Some(count);
        self
    }

    /// Validate the draft and produce the immutable spec
    pub fn build(self) -> Result<QuerySpec> {
        let table = self
            .table
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::validation("a table must be specified with from()"))?;

        Ok(QuerySpec {
            table,
            columns: self.columns,
            filters: self.filters,
            order: self.order,
            limit: self.limit,
        })
    }
}
