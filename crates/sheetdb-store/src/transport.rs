//! Row transport boundary
//!
//! The transport collaborator materializes and mutates table rows against
//! the backing spreadsheet service. Mutations address rows by position: a
//! zero-based index into the sequence the most recent `fetch_all`
//! returned. How a transport maps positions to physical rows is its own
//! concern.

use async_trait::async_trait;
use parking_lot::RwLock;
use sheetdb_core::{Error, Record, Result};
use std::collections::HashMap;

/// Asynchronous access to table rows.
#[async_trait]
pub trait RowTransport: Send + Sync {
    /// Materialize every row of a table. An empty or unknown table yields
    /// an empty sequence, never an error.
    async fn fetch_all(&self, table: &str) -> Result<Vec<Record>>;

    /// Append one row to the end of a table
    async fn append_record(&self, table: &str, record: &Record) -> Result<()>;

    /// Replace the row at the given position
    async fn update_record(&self, table: &str, position: usize, record: &Record) -> Result<()>;

    /// Remove the row at the given position
    async fn clear_record(&self, table: &str, position: usize) -> Result<()>;
}

/// In-memory transport for tests and embedded use.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    tables: RwLock<HashMap<String, Vec<Record>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a table with rows, replacing any existing content
    pub fn with_table(self, table: impl Into<String>, rows: Vec<Record>) -> Self {
        self.tables.write().insert(table.into(), rows);
        self
    }

    /// Number of rows currently held for a table
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, Vec::len)
    }
}

#[async_trait]
impl RowTransport for MemoryTransport {
    async fn fetch_all(&self, table: &str) -> Result<Vec<Record>> {
        Ok(self.tables.read().get(table).cloned().unwrap_or_default())
    }

    async fn append_record(&self, table: &str, record: &Record) -> Result<()> {
        self.tables
            .write()
            .entry(table.to_string())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn update_record(&self, table: &str, position: usize, record: &Record) -> Result<()> {
        let mut tables = self.tables.write();
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| Error::store(format!("table '{table}' does not exist")))?;
        let slot = rows.get_mut(position).ok_or_else(|| {
            Error::store(format!("row {position} out of range for table '{table}'"))
        })?;
        *slot = record.clone();
        Ok(())
    }

    async fn clear_record(&self, table: &str, position: usize) -> Result<()> {
        let mut tables = self.tables.write();
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| Error::store(format!("table '{table}' does not exist")))?;
        if position >= rows.len() {
            return Err(Error::store(format!(
                "row {position} out of range for table '{table}'"
            )));
        }
        rows.remove(position);
        Ok(())
    }
}
