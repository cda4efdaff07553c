//! PostgreSQL implementation of [`RecordStore`].

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use std::fmt;
use std::marker::PhantomData;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::entity::{Changeset, Entity};
use crate::repositories::criteria::{Criteria, Scope, Value};
use crate::repositories::repository::{RecordStore, UpdateResult};

/// Stateless record store for one entity table. All state lives in the
/// connection passed to each call.
pub struct PgStore<E> {
    _entity: PhantomData<fn() -> E>,
}

impl<E> PgStore<E> {
    pub const fn new() -> Self {
        Self {
            _entity: PhantomData,
        }
    }
}

impl<E> Default for PgStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for PgStore<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for PgStore<E> {}

impl<E: Entity> fmt::Debug for PgStore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgStore").field("table", &E::TABLE).finish()
    }
}

fn select<'args>(table: &str, criteria: &Criteria) -> QueryBuilder<'args, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT * FROM {}", table));
    criteria.push_where(&mut builder);
    builder
}

fn push_assignments(builder: &mut QueryBuilder<'_, Postgres>, assignments: Vec<(&'static str, Value)>) {
    for (column, value) in assignments {
        builder.push(", ").push(column).push(" = ");
        value.push_bind(builder);
    }
}

#[async_trait]
impl<E: Entity> RecordStore<E> for PgStore<E> {
    type Conn = PgConnection;

    async fn find_by_id(
        &self,
        conn: &mut PgConnection,
        id: E::Id,
        scope: Scope,
    ) -> Result<Option<E>, AppError> {
        self.find_one(conn, Criteria::by_id(id).with_scope(scope))
            .await
    }

    async fn find_one(
        &self,
        conn: &mut PgConnection,
        criteria: Criteria,
    ) -> Result<Option<E>, AppError> {
        let mut builder = select(E::TABLE, &criteria);
        criteria.push_order(&mut builder);
        builder.push(" LIMIT 1");

        let record = builder
            .build_query_as::<E>()
            .fetch_optional(&mut *conn)
            .await?;
        Ok(record)
    }

    async fn find(&self, conn: &mut PgConnection, criteria: Criteria) -> Result<Vec<E>, AppError> {
        let mut builder = select(E::TABLE, &criteria);
        criteria.push_order(&mut builder);

        let records = builder.build_query_as::<E>().fetch_all(&mut *conn).await?;
        Ok(records)
    }

    async fn count(&self, conn: &mut PgConnection, criteria: Criteria) -> Result<i64, AppError> {
        let mut builder = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", E::TABLE));
        criteria.push_where(&mut builder);

        let total = builder
            .build_query_scalar::<i64>()
            .fetch_one(&mut *conn)
            .await?;
        Ok(total)
    }

    async fn find_page(
        &self,
        conn: &mut PgConnection,
        criteria: Criteria,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<E>, AppError> {
        let mut builder = select(E::TABLE, &criteria);
        criteria.push_order(&mut builder);
        builder.push(" LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let records = builder.build_query_as::<E>().fetch_all(&mut *conn).await?;
        Ok(records)
    }

    async fn create(&self, conn: &mut PgConnection, draft: E::Draft) -> Result<E, AppError> {
        let mut created = self.create_many(conn, vec![draft]).await?;
        created
            .pop()
            .ok_or_else(|| AppError::InternalServerError(anyhow!("insert returned no row")))
    }

    async fn create_many(
        &self,
        conn: &mut PgConnection,
        drafts: Vec<E::Draft>,
    ) -> Result<Vec<E>, AppError> {
        if drafts.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<Vec<(&'static str, Value)>> =
            drafts.into_iter().map(Changeset::into_assignments).collect();
        let columns: Vec<&'static str> = rows[0].iter().map(|(column, _)| *column).collect();

        let mut builder =
            QueryBuilder::new(format!("INSERT INTO {} (id, created_at, updated_at", E::TABLE));
        for column in &columns {
            builder.push(", ").push(*column);
        }
        builder.push(") VALUES ");

        let now = Utc::now();
        let row_count = rows.len();
        for (index, row) in rows.into_iter().enumerate() {
            let row_columns: Vec<&'static str> = row.iter().map(|(column, _)| *column).collect();
            if row_columns != columns {
                return Err(AppError::InternalServerError(anyhow!(
                    "inconsistent columns in batch insert into {}",
                    E::TABLE
                )));
            }
            if index > 0 {
                builder.push(", ");
            }
            builder.push("(");
            builder.push_bind(Uuid::new_v4());
            builder.push(", ");
            builder.push_bind(now);
            builder.push(", ");
            builder.push_bind(now);
            for (_, value) in row {
                builder.push(", ");
                value.push_bind(&mut builder);
            }
            builder.push(")");
        }
        builder.push(" RETURNING *");

        let records = builder.build_query_as::<E>().fetch_all(&mut *conn).await?;
        tracing::debug!(table = E::TABLE, rows = row_count, "Inserted records");
        Ok(records)
    }

    async fn update_many(
        &self,
        conn: &mut PgConnection,
        criteria: Criteria,
        changes: E::Changes,
    ) -> Result<UpdateResult, AppError> {
        let mut builder = QueryBuilder::new(format!("UPDATE {} SET updated_at = ", E::TABLE));
        builder.push_bind(Utc::now());
        push_assignments(&mut builder, changes.into_assignments());
        criteria.push_where(&mut builder);

        let result = builder.build().execute(&mut *conn).await?;
        tracing::debug!(
            table = E::TABLE,
            matched = result.rows_affected(),
            "Updated records"
        );
        Ok(UpdateResult::new(result.rows_affected()))
    }

    async fn soft_delete(
        &self,
        conn: &mut PgConnection,
        criteria: Criteria,
    ) -> Result<UpdateResult, AppError> {
        let now = Utc::now();
        let mut builder = QueryBuilder::new(format!("UPDATE {} SET deleted_at = ", E::TABLE));
        builder.push_bind(now);
        builder.push(", updated_at = ");
        builder.push_bind(now);
        criteria.with_scope(Scope::Live).push_where(&mut builder);

        let result = builder.build().execute(&mut *conn).await?;
        tracing::debug!(
            table = E::TABLE,
            matched = result.rows_affected(),
            "Soft-deleted records"
        );
        Ok(UpdateResult::new(result.rows_affected()))
    }

    async fn restore(
        &self,
        conn: &mut PgConnection,
        criteria: Criteria,
    ) -> Result<UpdateResult, AppError> {
        let mut builder = QueryBuilder::new(format!(
            "UPDATE {} SET deleted_at = NULL, updated_at = ",
            E::TABLE
        ));
        builder.push_bind(Utc::now());
        criteria.with_scope(Scope::DeletedOnly).push_where(&mut builder);

        let result = builder.build().execute(&mut *conn).await?;
        tracing::debug!(
            table = E::TABLE,
            matched = result.rows_affected(),
            "Restored records"
        );
        Ok(UpdateResult::new(result.rows_affected()))
    }
}
