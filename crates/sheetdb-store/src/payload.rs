//! Request/response payload contract
//!
//! The JSON shapes the request-handling layer exchanges with the store.
//! Boundary validation happens here: untrusted input with a missing
//! table, a malformed filter or an unknown operator/strategy is rejected
//! with a validation error before anything touches the transport.

use crate::store::IdOptions;
use serde::{Deserialize, Serialize};
use sheetdb_core::{Direction, Error, QueryBuilder, QuerySpec, Record, Result};
use sheetdb_id::IdStrategy;

/// Query request: `{table, select?, filters?, order?, limit?}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryRequest {
    pub table: Option<String>,
    pub select: Option<String>,
    pub filters: Option<Vec<FilterPayload>>,
    pub order: Option<OrderPayload>,
    pub limit: Option<i64>,
}

/// One filter clause as it arrives on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterPayload {
    pub field: Option<String>,
    pub op: Option<String>,
    pub value: Option<String>,
}

/// Ordering clause as it arrives on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderPayload {
    pub field: Option<String>,
    pub direction: Option<String>,
}

impl QueryRequest {
    /// Validate the payload and build the immutable spec.
    pub fn into_spec(self) -> Result<QuerySpec> {
        let table = self
            .table
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::validation("the 'table' field is required"))?;

        let mut builder = QueryBuilder::new().from(table);

        if let Some(select) = &self.select {
            builder = builder.select(select);
        }

        for filter in self.filters.unwrap_or_default() {
            let (Some(field), Some(op), Some(value)) = (filter.field, filter.op, filter.value)
            else {
                return Err(Error::validation(
                    "invalid filter: field, op and value are required",
                ));
            };
            // Unknown operators are rejected here, not deferred to the engine
            builder = builder.filter(field, op.parse()?, value);
        }

        if let Some(order) = self.order {
            if let Some(field) = order.field {
                let direction = match order.direction.as_deref() {
                    Some(direction) => direction.parse()?,
                    None => Direction::Asc,
                };
                builder = builder.order(field, direction);
            }
        }

        if let Some(limit) = self.limit {
            builder = builder.limit(limit);
        }

        builder.build()
    }
}

/// Identifier allocation settings for inserts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdConfig {
    #[serde(rename = "type")]
    pub id_type: Option<String>,
    pub prefix: Option<String>,
}

impl IdConfig {
    /// Validate the strategy name; unknown names are rejected.
    pub fn into_options(self) -> Result<IdOptions> {
        let strategy = match self.id_type.as_deref() {
            Some(name) => name.parse::<IdStrategy>()?,
            None => IdStrategy::default(),
        };
        Ok(IdOptions {
            strategy,
            prefix: self.prefix,
        })
    }
}

/// Insert request: `{table, data, idConfig?}`.
#[derive(Debug, Clone, Deserialize)]
pub struct InsertRequest {
    pub table: String,
    pub data: Record,
    #[serde(rename = "idConfig")]
    pub id_config: Option<IdConfig>,
}

/// Update request: `{table, id, data}`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRequest {
    pub table: String,
    pub id: String,
    pub data: Record,
}

/// Delete request: `{table, id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteRequest {
    pub table: String,
    pub id: String,
}

/// Successful query response: `{success: true, data, count}`.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub success: bool,
    pub data: Vec<Record>,
    pub count: usize,
}

impl QueryResponse {
    pub fn new(data: Vec<Record>) -> Self {
        let count = data.len();
        Self {
            success: true,
            data,
            count,
        }
    }
}

/// Successful write response echoing the finalized record.
#[derive(Debug, Clone, Serialize)]
pub struct RecordResponse {
    pub success: bool,
    pub id: Option<String>,
    pub data: Record,
}

impl RecordResponse {
    pub fn new(record: Record) -> Self {
        Self {
            success: true,
            id: record.get(sheetdb_core::ID_FIELD).map(String::from),
            data: record,
        }
    }
}

/// Failure response: `{success: false, error}`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl From<&Error> for ErrorResponse {
    fn from(err: &Error) -> Self {
        Self {
            success: false,
            error: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetdb_core::{Columns, FilterOp};

    fn filter(field: &str, op: &str, value: &str) -> FilterPayload {
        FilterPayload {
            field: Some(field.to_string()),
            op: Some(op.to_string()),
            value: Some(value.to_string()),
        }
    }

    #[test]
    fn test_full_request_builds_spec() {
        let request = QueryRequest {
            table: Some("flowers".to_string()),
            select: Some("name, price".to_string()),
            filters: Some(vec![filter("type", "eq", "roses"), filter("price", "gt", "5")]),
            order: Some(OrderPayload {
                field: Some("price".to_string()),
                direction: Some("desc".to_string()),
            }),
            limit: Some(10),
        };

        let spec = request.into_spec().unwrap();
        assert_eq!(spec.table, "flowers");
        assert_eq!(
            spec.columns,
            Columns::Named(vec!["name".to_string(), "price".to_string()])
        );
        assert_eq!(spec.filters[1].operator, FilterOp::Gt);
        assert_eq!(spec.order.unwrap().direction, Direction::Desc);
        assert_eq!(spec.limit, Some(10));
    }

    #[test]
    fn test_missing_table_is_rejected() {
        let err = QueryRequest::default().into_spec().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_malformed_filter_is_rejected() {
        let request = QueryRequest {
            table: Some("flowers".to_string()),
            filters: Some(vec![FilterPayload {
                field: Some("type".to_string()),
                op: None,
                value: Some("roses".to_string()),
            }]),
            ..Default::default()
        };
        assert!(request.into_spec().is_err());
    }

    #[test]
    fn test_unknown_operator_is_rejected_at_boundary() {
        let request = QueryRequest {
            table: Some("flowers".to_string()),
            filters: Some(vec![filter("price", "between", "1")]),
            ..Default::default()
        };
        let err = request.into_spec().unwrap_err();
        assert!(err.to_string().contains("unknown operator"));
    }

    #[test]
    fn test_order_direction_defaults_to_asc() {
        let request = QueryRequest {
            table: Some("flowers".to_string()),
            order: Some(OrderPayload {
                field: Some("name".to_string()),
                direction: None,
            }),
            ..Default::default()
        };
        let spec = request.into_spec().unwrap();
        assert_eq!(spec.order.unwrap().direction, Direction::Asc);
    }

    #[test]
    fn test_id_config_parsing() {
        let options = IdConfig {
            id_type: Some("readable".to_string()),
            prefix: Some("order".to_string()),
        }
        .into_options()
        .unwrap();
        assert_eq!(options.strategy, IdStrategy::Readable);
        assert_eq!(options.prefix.as_deref(), Some("order"));

        assert!(IdConfig {
            id_type: Some("snowflake".to_string()),
            prefix: None,
        }
        .into_options()
        .is_err());

        let options = IdConfig::default().into_options().unwrap();
        assert_eq!(options.strategy, IdStrategy::Uuid);
    }

    #[test]
    fn test_requests_deserialize_from_wire_json() {
        let request: InsertRequest = serde_json::from_str(
            r#"{"table": "flowers", "data": {"name": "Rosa"}, "idConfig": {"type": "short"}}"#,
        )
        .unwrap();
        assert_eq!(request.table, "flowers");
        assert_eq!(request.data.get("name"), Some("Rosa"));
        assert_eq!(request.id_config.unwrap().id_type.as_deref(), Some("short"));

        let request: QueryRequest = serde_json::from_str(
            r#"{"table": "flowers", "filters": [{"field": "type", "op": "eq", "value": "roses"}]}"#,
        )
        .unwrap();
        assert!(request.into_spec().is_ok());
    }

    #[test]
    fn test_response_shapes() {
        let response = QueryResponse::new(vec![Record::new().with("id", "1")]);
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""success":true"#));
        assert!(json.contains(r#""count":1"#));

        let response = RecordResponse::new(Record::new().with("id", "rose-1"));
        assert_eq!(response.id.as_deref(), Some("rose-1"));

        let err = Error::validation("the 'table' field is required");
        let response = ErrorResponse::from(&err);
        assert!(!response.success);
        assert!(response.error.contains("table"));
    }
}
