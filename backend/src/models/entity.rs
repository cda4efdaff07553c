//! Columns and behaviour shared by every persisted record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::FromRow;
use std::fmt::Debug;
use uuid::Uuid;

use crate::repositories::criteria::Value;

/// Bookkeeping columns present on every table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RecordMeta {
    /// Creation timestamp, set once by the store.
    pub created_at: DateTime<Utc>,
    /// Refreshed by the store on every mutating write.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker; storage form of [`Lifecycle`].
    pub deleted_at: Option<DateTime<Utc>>,
}

impl RecordMeta {
    pub fn lifecycle(&self) -> Lifecycle {
        match self.deleted_at {
            None => Lifecycle::Live,
            Some(at) => Lifecycle::Deleted { at },
        }
    }
}

/// Whether a record is visible or tombstoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Live,
    Deleted { at: DateTime<Utc> },
}

impl Lifecycle {
    pub fn is_live(&self) -> bool {
        matches!(self, Lifecycle::Live)
    }
}

/// A set of column assignments used for INSERT and UPDATE statements.
///
/// Drafts (create payloads) must always emit the same columns in the same
/// order so that batches can share one column list.
pub trait Changeset {
    fn into_assignments(self) -> Vec<(&'static str, Value)>;
}

/// A table-backed record with the common bookkeeping columns.
pub trait Entity:
    for<'r> FromRow<'r, PgRow> + Clone + Debug + Send + Sync + Unpin + 'static
{
    /// Target table name.
    const TABLE: &'static str;
    /// Columns matched by the free-text page filter.
    const SEARCH_COLUMNS: &'static [&'static str] = &[];

    type Id: Copy + Debug + PartialEq + Send + Sync + From<Uuid> + Into<Value> + 'static;
    /// Payload for creating a record.
    type Draft: Changeset + Debug + Send + Sync + 'static;
    /// Partial update; unset fields are left alone.
    type Changes: Changeset + Debug + Default + Send + Sync + 'static;

    fn id(&self) -> Self::Id;

    fn meta(&self) -> &RecordMeta;

    fn lifecycle(&self) -> Lifecycle {
        self.meta().lifecycle()
    }
}
