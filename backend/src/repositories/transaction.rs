//! Transaction management utilities for repositories.
//!
//! Transactions are opened on an explicit connection. Beginning a transaction
//! on a connection that is already inside one creates a savepoint, so nested
//! units of work roll back independently and only the outermost commit makes
//! anything durable.

use futures::future::BoxFuture;
use sqlx::{Connection, PgConnection, Postgres, Transaction};

use crate::error::AppError;

/// Transaction handle bound to a borrowed connection.
pub type PgTx<'c> = Transaction<'c, Postgres>;

/// Begin a new database transaction (or savepoint, when already inside one).
///
/// On success, the transaction can be committed via [`commit_transaction`].
/// On failure, the transaction can be rolled back via [`rollback_transaction`].
pub async fn begin_transaction(conn: &mut PgConnection) -> Result<PgTx<'_>, AppError> {
    conn.begin()
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))
}

/// Commit a transaction.
pub async fn commit_transaction(tx: PgTx<'_>) -> Result<(), AppError> {
    tx.commit()
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))
}

/// Rollback a transaction.
///
/// Undoes all changes made within the transaction since it began.
pub async fn rollback_transaction(tx: PgTx<'_>) -> Result<(), AppError> {
    tx.rollback()
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))
}

/// Run `work` as one atomic unit on `conn`.
///
/// Commits when `work` returns `Ok`. On `Err` the transaction is rolled back
/// and the original error is returned; a failing rollback is only logged.
///
/// ```ignore
/// let book = with_transaction(&mut conn, move |tx| {
///     Box::pin(async move { books.create_book(tx, author, payload).await })
/// })
/// .await?;
/// ```
pub async fn with_transaction<T, F>(conn: &mut PgConnection, work: F) -> Result<T, AppError>
where
    T: Send,
    F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T, AppError>> + Send,
{
    let mut tx = begin_transaction(conn).await?;

    match work(&mut *tx).await {
        Ok(value) => {
            commit_transaction(tx).await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = rollback_transaction(tx).await {
                tracing::error!(error = %rollback_err, "Failed to roll back transaction");
            }
            tracing::debug!(error = %err, "Transaction rolled back");
            Err(err)
        }
    }
}
