//! Generic CRUD, pagination and soft-delete operations shared by every resource.
//!
//! A resource service owns a [`RecordStore`] for one entity type. Domain
//! services such as [`crate::services::book::BookService`] hold one of these
//! and add their own checks on top.

use serde::Serialize;
use std::marker::PhantomData;

use crate::error::AppError;
use crate::models::entity::Entity;
use crate::models::pagination::{Page, PageMeta, PageOptions};
use crate::repositories::criteria::{Criteria, Scope};
use crate::repositories::repository::{RecordStore, UpdateResult};

pub struct ResourceService<E, S> {
    store: S,
    _entity: PhantomData<fn() -> E>,
}

impl<E, S: Clone> Clone for ResourceService<E, S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity, S: RecordStore<E>> ResourceService<E, S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Live record by id.
    pub async fn find_by_id(&self, conn: &mut S::Conn, id: E::Id) -> Result<Option<E>, AppError> {
        tracing::debug!(table = E::TABLE, ?id, "Finding record by id");
        self.store.find_by_id(conn, id, Scope::Live).await
    }

    /// Record by id whether or not it has been soft-deleted.
    pub async fn find_by_id_with_deleted(
        &self,
        conn: &mut S::Conn,
        id: E::Id,
    ) -> Result<Option<E>, AppError> {
        tracing::debug!(table = E::TABLE, ?id, "Finding record by id including deleted");
        self.store.find_by_id(conn, id, Scope::WithDeleted).await
    }

    pub async fn find_one(
        &self,
        conn: &mut S::Conn,
        criteria: Criteria,
    ) -> Result<Option<E>, AppError> {
        tracing::debug!(table = E::TABLE, "Finding one record");
        self.store.find_one(conn, criteria).await
    }

    pub async fn find(&self, conn: &mut S::Conn, criteria: Criteria) -> Result<Vec<E>, AppError> {
        tracing::debug!(table = E::TABLE, "Finding records");
        self.store.find(conn, criteria).await
    }

    /// Returns the first match for `criteria`, creating one from `draft`
    /// when nothing matches. The flag is `true` when a record was created.
    ///
    /// The lookup and the insert are separate statements, so two callers
    /// racing on the same criteria can both create.
    pub async fn find_or_create(
        &self,
        conn: &mut S::Conn,
        criteria: Criteria,
        draft: E::Draft,
    ) -> Result<(E, bool), AppError> {
        if let Some(existing) = self.store.find_one(conn, criteria).await? {
            tracing::debug!(table = E::TABLE, id = ?existing.id(), "Found existing record");
            return Ok((existing, false));
        }

        let created = self.store.create(conn, draft).await?;
        tracing::debug!(table = E::TABLE, id = ?created.id(), "Created record on lookup miss");
        Ok((created, true))
    }

    /// One page of records matching `criteria`, filtered by the options'
    /// free-text query over the entity's search columns.
    ///
    /// Count and fetch run as two statements and are not snapshot
    /// consistent with each other.
    pub async fn paginate(
        &self,
        conn: &mut S::Conn,
        criteria: Criteria,
        options: &PageOptions,
    ) -> Result<Page<E>, AppError>
    where
        E: Serialize,
    {
        let criteria = match options.query() {
            Some(q) => criteria.search(E::SEARCH_COLUMNS, q),
            None => criteria,
        };

        let item_count = self.store.count(conn, criteria.clone()).await?;
        let items = self
            .store
            .find_page(conn, criteria, options.skip(), options.take())
            .await?;
        let meta = PageMeta::compute(options, item_count);

        tracing::debug!(
            table = E::TABLE,
            page = meta.page,
            take = meta.take,
            item_count,
            "Fetched page"
        );
        Ok(Page::new(items, meta))
    }

    pub async fn create_record(&self, conn: &mut S::Conn, draft: E::Draft) -> Result<E, AppError> {
        let record = self.store.create(conn, draft).await?;
        tracing::debug!(table = E::TABLE, id = ?record.id(), "Created record");
        Ok(record)
    }

    pub async fn create_many(
        &self,
        conn: &mut S::Conn,
        drafts: Vec<E::Draft>,
    ) -> Result<Vec<E>, AppError> {
        tracing::debug!(table = E::TABLE, count = drafts.len(), "Creating records");
        self.store.create_many(conn, drafts).await
    }

    /// Updates the live record with `id`. A missing id is reported as zero
    /// matches, not as an error.
    pub async fn update_by_id(
        &self,
        conn: &mut S::Conn,
        id: E::Id,
        changes: E::Changes,
    ) -> Result<UpdateResult, AppError> {
        tracing::debug!(table = E::TABLE, ?id, "Updating record");
        self.store
            .update_many(conn, Criteria::by_id(id), changes)
            .await
    }

    pub async fn update_many(
        &self,
        conn: &mut S::Conn,
        criteria: Criteria,
        changes: E::Changes,
    ) -> Result<UpdateResult, AppError> {
        tracing::debug!(table = E::TABLE, "Updating records");
        self.store.update_many(conn, criteria, changes).await
    }

    /// Soft-deletes the record with `id`. Deleting twice is a no-op.
    pub async fn delete_by_id(
        &self,
        conn: &mut S::Conn,
        id: E::Id,
    ) -> Result<UpdateResult, AppError> {
        tracing::debug!(table = E::TABLE, ?id, "Soft-deleting record");
        self.store.soft_delete(conn, Criteria::by_id(id)).await
    }

    pub async fn delete(
        &self,
        conn: &mut S::Conn,
        criteria: Criteria,
    ) -> Result<UpdateResult, AppError> {
        tracing::debug!(table = E::TABLE, "Soft-deleting records");
        self.store.soft_delete(conn, criteria).await
    }

    /// Restores the record with `id`. Restoring a live record is a no-op.
    pub async fn restore_by_id(
        &self,
        conn: &mut S::Conn,
        id: E::Id,
    ) -> Result<UpdateResult, AppError> {
        tracing::debug!(table = E::TABLE, ?id, "Restoring record");
        self.store.restore(conn, Criteria::by_id(id)).await
    }

    pub async fn restore(
        &self,
        conn: &mut S::Conn,
        criteria: Criteria,
    ) -> Result<UpdateResult, AppError> {
        tracing::debug!(table = E::TABLE, "Restoring records");
        self.store.restore(conn, criteria).await
    }
}
