//! Core types for the sheetdb table store
//!
//! Defines the dynamic [`Record`] row representation, the immutable
//! [`QuerySpec`] with its fluent [`QueryBuilder`], and the shared error
//! taxonomy used across the workspace.

pub mod error;
pub mod query;
pub mod record;

pub use error::{Error, Result};
pub use query::{Columns, Direction, Filter, FilterOp, OrderBy, QueryBuilder, QuerySpec};
pub use record::{Record, ID_FIELD};
