// Persistence collaborator: the remote table store.

use async_trait::async_trait;
use gridcrm_core::{RowId, TableId};
use gridcrm_engine::{Column, Row, RowValues, Table};

#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Table or row does not exist in the store
    NotFound(String),
    /// Store refused the request (bad values, unknown column)
    Rejected(String),
    /// Transport failure
    Network(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound(what) => write!(f, "Not found: {}", what),
            StoreError::Rejected(msg) => write!(f, "Rejected: {}", msg),
            StoreError::Network(msg) => write!(f, "Network error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Where tables live once they leave the grid.
///
/// Created rows get a store-assigned id; the caller is responsible for
/// rewriting its local placeholder id to it.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn create_row(&self, table: &TableId, values: RowValues) -> Result<Row, StoreError>;

    /// Partial update: only the given columns are written.
    async fn update_row(&self, table: &TableId, row: &RowId, values: RowValues) -> Result<(), StoreError>;

    async fn delete_row(&self, table: &TableId, row: &RowId) -> Result<(), StoreError>;

    /// Replace the ordered column list.
    async fn update_table(&self, table: &TableId, columns: Vec<Column>) -> Result<(), StoreError>;

    async fn get_table(&self, table: &TableId) -> Result<Table, StoreError>;
}
