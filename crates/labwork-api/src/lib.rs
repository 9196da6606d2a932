use std::path::PathBuf;

use labwork_core::{
    aggregate, assign_top_hardest, CountResult, DeleteResult, Discipline, DomainError, Entity, Id,
    LabWork, LabWorkView, Project, SumResult, TOP_HARDEST_LIMIT,
};
use labwork_store_sqlite::{IntegrityReport, SchemaStatus, SqlEntity, SqliteStore};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub mod ops;
pub mod requests;

pub use requests::{
    CreateCoordinatesRequest, CreateDisciplineRequest, CreateLabWorkRequest, CreateLocationRequest,
    CreatePersonRequest, CreateRequest, DecreaseDifficultyRequest, UpdateCoordinatesRequest,
    UpdateDisciplineRequest, UpdateLabWorkRequest, UpdateLocationRequest, UpdatePersonRequest,
    UpdateRequest,
};

pub const API_CONTRACT_VERSION: &str = "api.v1";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// The database could not be opened, migrated or probed.
    #[error("{0:#}")]
    Open(anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MigrateResult {
    pub dry_run: bool,
    pub current_version: i64,
    pub target_version: i64,
    pub would_apply_versions: Vec<i64>,
    pub after_version: Option<i64>,
    pub up_to_date: Option<bool>,
}

/// Operation facade over one database file. Every call opens the store, brings
/// the schema up to date and runs one operation in one transaction.
#[derive(Debug, Clone)]
pub struct LabWorkApi {
    db_path: PathBuf,
}

impl LabWorkApi {
    #[must_use]
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }

    fn open_raw(&self) -> ApiResult<SqliteStore> {
        SqliteStore::open(&self.db_path).map_err(ApiError::Open)
    }

    fn open_store(&self) -> ApiResult<SqliteStore> {
        let mut store = self.open_raw()?;
        store.migrate().map_err(ApiError::Open)?;
        Ok(store)
    }

    /// Inspect schema status without mutating data.
    ///
    /// # Errors
    /// Returns an error when the `SQLite` database cannot be opened or queried.
    pub fn schema_status(&self) -> ApiResult<SchemaStatus> {
        let store = self.open_raw()?;
        store.schema_status().map_err(ApiError::Open)
    }

    /// Apply pending migrations, or return planned versions for dry-run mode.
    ///
    /// # Errors
    /// Returns an error when migration planning or execution fails.
    pub fn migrate(&self, dry_run: bool) -> ApiResult<MigrateResult> {
        let mut store = self.open_raw()?;
        let before = store.schema_status().map_err(ApiError::Open)?;
        if dry_run {
            return Ok(MigrateResult {
                dry_run: true,
                current_version: before.current_version,
                target_version: before.target_version,
                would_apply_versions: before.pending_versions,
                after_version: None,
                up_to_date: None,
            });
        }

        let planned_versions = before.pending_versions;
        store.migrate().map_err(ApiError::Open)?;
        let after = store.schema_status().map_err(ApiError::Open)?;
        tracing::info!(
            from = before.current_version,
            to = after.current_version,
            "database migrated"
        );
        Ok(MigrateResult {
            dry_run: false,
            current_version: before.current_version,
            target_version: before.target_version,
            would_apply_versions: planned_versions,
            after_version: Some(after.current_version),
            up_to_date: Some(after.pending_versions.is_empty()),
        })
    }

    /// Run `SQLite` integrity probes.
    ///
    /// # Errors
    /// Returns an error when the database cannot be opened or a probe fails.
    pub fn integrity_check(&self) -> ApiResult<IntegrityReport> {
        let store = self.open_store()?;
        store.integrity_check().map_err(ApiError::Open)
    }

    /// Shallow views of every `E` row.
    ///
    /// # Errors
    /// Returns an error when the store cannot be opened or read.
    pub fn list<E: Project + SqlEntity>(&self) -> ApiResult<Vec<E::Shallow>> {
        let store = self.open_store()?;
        Ok(store.read(|tx| ops::list::<E, _>(tx))?)
    }

    /// Full views of every `E` row.
    ///
    /// # Errors
    /// Returns an error when the store cannot be opened or read.
    pub fn list_full<E: Project + SqlEntity>(&self) -> ApiResult<Vec<E::Full>> {
        let store = self.open_store()?;
        Ok(store.read(|tx| ops::list_full::<E, _>(tx))?)
    }

    /// # Errors
    /// Returns [`DomainError::NotFound`] when no row has `id`.
    pub fn get<E: Project + SqlEntity>(&self, id: Id<E>) -> ApiResult<E::Shallow> {
        let store = self.open_store()?;
        Ok(store.read(|tx| ops::get(tx, id))?)
    }

    /// # Errors
    /// Returns [`DomainError::NotFound`] when no row has `id`.
    pub fn get_full<E: Project + SqlEntity>(&self, id: Id<E>) -> ApiResult<E::Full> {
        let store = self.open_store()?;
        Ok(store.read(|tx| ops::get_full(tx, id))?)
    }

    /// Create one row; a lab work gets `creation_date = now`.
    ///
    /// # Errors
    /// Returns a [`DomainError`] for invalid input or unknown references.
    pub fn create<R>(&self, request: R) -> ApiResult<<R::Entity as Project>::Shallow>
    where
        R: CreateRequest,
        R::Entity: SqlEntity,
    {
        let mut store = self.open_store()?;
        let now = OffsetDateTime::now_utc();
        Ok(store.transaction(|tx| ops::create(tx, request, now))?)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    /// Returns a [`DomainError`] for a missing row, invalid input or unknown references.
    pub fn update<R>(
        &self,
        id: Id<R::Entity>,
        request: R,
    ) -> ApiResult<<R::Entity as Project>::Shallow>
    where
        R: UpdateRequest,
        R::Entity: SqlEntity,
    {
        let mut store = self.open_store()?;
        Ok(store.transaction(|tx| ops::update(tx, id, request))?)
    }

    /// # Errors
    /// Returns [`DomainError::NotFound`] or [`DomainError::Conflict`] when the row
    /// is missing or still referenced.
    pub fn delete<E: Entity + SqlEntity>(&self, id: Id<E>) -> ApiResult<()> {
        let mut store = self.open_store()?;
        Ok(store.transaction(|tx| ops::delete(tx, id))?)
    }

    /// # Errors
    /// Returns an error when the store cannot be opened or read.
    pub fn sum_minimal_point(&self) -> ApiResult<SumResult> {
        let store = self.open_store()?;
        Ok(store.read(|tx| aggregate::sum_minimal_point(tx))?)
    }

    /// # Errors
    /// Returns an error when the store cannot be opened or read.
    pub fn count_by_author_id_greater_than(&self, author_id: i64) -> ApiResult<CountResult> {
        let store = self.open_store()?;
        Ok(store.read(|tx| aggregate::count_by_author_id_greater_than(tx, author_id))?)
    }

    /// # Errors
    /// Returns an error when the store cannot be opened or the delete fails.
    pub fn delete_by_minimal_point(&self, value: i64) -> ApiResult<DeleteResult> {
        let mut store = self.open_store()?;
        let result = store.transaction(|tx| aggregate::delete_by_minimal_point(tx, value))?;
        tracing::info!(minimal_point = value, affected = result.affected, "bulk deleted lab works");
        Ok(result)
    }

    /// # Errors
    /// Returns [`DomainError::InvalidArgument`] when `steps < 1`, or
    /// [`DomainError::NotFound`] when the lab work is missing.
    pub fn decrease_difficulty(&self, id: Id<LabWork>, steps: i64) -> ApiResult<LabWorkView> {
        let mut store = self.open_store()?;
        Ok(store.transaction(|tx| ops::decrease_difficulty(tx, id, steps))?)
    }

    /// Link the hardest lab works to `discipline_id`.
    ///
    /// # Errors
    /// Returns [`DomainError::NotFound`] when the discipline is missing.
    pub fn assign_top_hardest(&self, discipline_id: Id<Discipline>) -> ApiResult<Vec<LabWorkView>> {
        let mut store = self.open_store()?;
        let assigned =
            store.transaction(|tx| assign_top_hardest(tx, discipline_id, TOP_HARDEST_LIMIT))?;
        tracing::info!(
            discipline_id = %discipline_id,
            assigned = assigned.len(),
            "assigned hardest lab works"
        );
        Ok(assigned)
    }
}
