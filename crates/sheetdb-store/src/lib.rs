//! Cache-first table store over a row transport
//!
//! Wires the query engine, result cache and id allocator around an
//! abstract [`RowTransport`]: queries consult the cache before the
//! transport, writes allocate missing identifiers and invalidate the
//! affected table's cache entries after the transport confirms them.
//!
//! The transport against the real backing spreadsheet lives outside this
//! workspace; [`MemoryTransport`] covers tests and embedded use.

pub mod payload;
pub mod store;
pub mod transport;

pub use payload::{
    DeleteRequest, ErrorResponse, FilterPayload, IdConfig, InsertRequest, OrderPayload,
    QueryRequest, QueryResponse, RecordResponse, UpdateRequest,
};
pub use store::{IdOptions, TableStore};
pub use transport::{MemoryTransport, RowTransport};
