//! Repository trait and common functionality
//!
//! This module defines the record store contract that every entity's
//! persistence goes through. Reads hide soft-deleted rows unless the criteria
//! opt in; deletes only ever set the tombstone.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::AppError;
use crate::models::entity::Entity;
use crate::repositories::criteria::{Criteria, Scope};

/// Outcome of a bulk write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct UpdateResult {
    /// Rows that matched the criteria and were written.
    pub matched: u64,
}

impl UpdateResult {
    pub fn new(matched: u64) -> Self {
        Self { matched }
    }

    pub fn is_empty(&self) -> bool {
        self.matched == 0
    }
}

/// Generic persistence operations over one entity type.
///
/// Every call takes the connection explicitly. Passing a transaction's
/// connection makes the call part of that transaction.
#[cfg_attr(test, mockall::automock(type Conn = ();))]
#[async_trait]
pub trait RecordStore<E: Entity>: Send + Sync {
    /// Connection handle the store executes on.
    type Conn: Send;

    /// Find a single record by ID; `None` when absent.
    async fn find_by_id(
        &self,
        conn: &mut Self::Conn,
        id: E::Id,
        scope: Scope,
    ) -> Result<Option<E>, AppError>;

    /// First record matching the criteria in their ordering.
    async fn find_one(&self, conn: &mut Self::Conn, criteria: Criteria)
        -> Result<Option<E>, AppError>;

    /// All records matching the criteria.
    async fn find(&self, conn: &mut Self::Conn, criteria: Criteria) -> Result<Vec<E>, AppError>;

    /// Number of records matching the criteria.
    async fn count(&self, conn: &mut Self::Conn, criteria: Criteria) -> Result<i64, AppError>;

    /// One window of the ordered result set.
    async fn find_page(
        &self,
        conn: &mut Self::Conn,
        criteria: Criteria,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<E>, AppError>;

    /// Create a new record, assigning its id and timestamps.
    async fn create(&self, conn: &mut Self::Conn, draft: E::Draft) -> Result<E, AppError>;

    /// Create several records in one statement; either all are written or none.
    async fn create_many(
        &self,
        conn: &mut Self::Conn,
        drafts: Vec<E::Draft>,
    ) -> Result<Vec<E>, AppError>;

    /// Apply the changes to every matching record and refresh `updated_at`.
    async fn update_many(
        &self,
        conn: &mut Self::Conn,
        criteria: Criteria,
        changes: E::Changes,
    ) -> Result<UpdateResult, AppError>;

    /// Tombstone every matching live record. Already deleted rows keep their
    /// original `deleted_at`.
    async fn soft_delete(
        &self,
        conn: &mut Self::Conn,
        criteria: Criteria,
    ) -> Result<UpdateResult, AppError>;

    /// Clear the tombstone on every matching deleted record.
    async fn restore(&self, conn: &mut Self::Conn, criteria: Criteria)
        -> Result<UpdateResult, AppError>;
}
