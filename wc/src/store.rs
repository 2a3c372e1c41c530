//! Store client contract

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::StoreError;
use crate::types::{ConditionalMutation, Mutation, Row, RowKey, RowSet};

/// Forward-only stream of rows in ascending key order
pub type RowStream = BoxStream<'static, Result<Row, StoreError>>;

/// Client for a wide-column store
///
/// Every call is a single request against the named table. Implementations
/// must be safe to share across tasks.
#[async_trait]
pub trait WideColumnStore: Send + Sync {
    /// Apply a mutation atomically to one row
    async fn apply(&self, table: &str, row_key: &str, mutation: Mutation) -> Result<(), StoreError>;

    /// Apply one branch of a conditional mutation
    ///
    /// Returns whether the predicate matched the existing row.
    async fn apply_conditional(
        &self,
        table: &str,
        row_key: &str,
        mutation: ConditionalMutation,
    ) -> Result<bool, StoreError>;

    /// Apply one mutation per row in a single call
    ///
    /// The outer error fails the whole call; the returned list carries one
    /// result per entry, in input order.
    async fn apply_bulk(
        &self,
        table: &str,
        entries: Vec<(RowKey, Mutation)>,
    ) -> Result<Vec<Result<(), StoreError>>, StoreError>;

    /// Read a single row
    async fn read_row(&self, table: &str, row_key: &str) -> Result<Option<Row>, StoreError>;

    /// Read every row in the set
    async fn read_rows(&self, table: &str, rows: RowSet) -> Result<RowStream, StoreError>;

    /// Remove every cell of a row
    async fn delete_row(&self, table: &str, row_key: &str) -> Result<(), StoreError> {
        self.apply(table, row_key, Mutation::delete_row()).await
    }
}
