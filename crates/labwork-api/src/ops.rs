//! One function per operation, written against any [`EntityStore`].
//!
//! Callers run each function inside exactly one transaction scope of their adapter.

use labwork_core::{
    guard_delete, resolve_required, Difficulty, DomainResult, Entity, EntityStore, Id, LabWork,
    LabWorkView, Project, Repository,
};
use time::OffsetDateTime;

use crate::requests::{CreateRequest, UpdateRequest};

/// Shallow views of every row, ascending by id.
///
/// # Errors
/// Propagates store failures and dangling references.
pub fn list<E, S>(store: &S) -> DomainResult<Vec<E::Shallow>>
where
    E: Project,
    S: EntityStore + Repository<E> + ?Sized,
{
    let rows = <S as Repository<E>>::find_all(store)?;
    tracing::debug!(kind = E::KIND.as_str(), rows = rows.len(), "listed entities");
    rows.iter().map(|row| E::to_shallow(row, store)).collect()
}

/// Full views of every row, ascending by id.
///
/// # Errors
/// Propagates store failures and dangling references.
pub fn list_full<E, S>(store: &S) -> DomainResult<Vec<E::Full>>
where
    E: Project,
    S: EntityStore + Repository<E> + ?Sized,
{
    let rows = <S as Repository<E>>::find_all(store)?;
    tracing::debug!(kind = E::KIND.as_str(), rows = rows.len(), "listed entities in full");
    rows.iter().map(|row| E::to_full(row, store)).collect()
}

/// # Errors
/// Returns `NotFound` when no row has `id`.
pub fn get<E, S>(store: &S, id: Id<E>) -> DomainResult<E::Shallow>
where
    E: Project,
    S: EntityStore + Repository<E> + ?Sized,
{
    let row = resolve_required(store, id)?;
    E::to_shallow(&row, store)
}

/// # Errors
/// Returns `NotFound` when no row has `id`.
pub fn get_full<E, S>(store: &S, id: Id<E>) -> DomainResult<E::Full>
where
    E: Project,
    S: EntityStore + Repository<E> + ?Sized,
{
    let row = resolve_required(store, id)?;
    E::to_full(&row, store)
}

/// Validates `request`, resolves its references and inserts the new row.
///
/// # Errors
/// Returns `InvalidArgument`, `NotFound` for an unknown reference, or a store failure.
pub fn create<R, S>(
    store: &mut S,
    request: R,
    now: OffsetDateTime,
) -> DomainResult<<R::Entity as Project>::Shallow>
where
    R: CreateRequest,
    S: EntityStore + Repository<R::Entity> + ?Sized,
{
    let entity = request.build(&*store, now)?;
    let row = <S as Repository<R::Entity>>::insert(store, entity)?;
    tracing::info!(kind = <R::Entity as Entity>::KIND.as_str(), id = %row.id, "created entity");
    <R::Entity as Project>::to_shallow(&row, &*store)
}

/// Applies a partial update to the row `id`.
///
/// # Errors
/// Returns `NotFound` when the row or a newly named reference is missing, or `InvalidArgument`.
pub fn update<R, S>(
    store: &mut S,
    id: Id<R::Entity>,
    request: R,
) -> DomainResult<<R::Entity as Project>::Shallow>
where
    R: UpdateRequest,
    S: EntityStore + Repository<R::Entity> + ?Sized,
{
    let mut row = resolve_required(&*store, id)?;
    request.apply(&mut row.entity, &*store)?;
    <S as Repository<R::Entity>>::update(store, &row)?;
    tracing::info!(kind = <R::Entity as Entity>::KIND.as_str(), id = %row.id, "updated entity");
    <R::Entity as Project>::to_shallow(&row, &*store)
}

/// Deletes the row `id` once nothing references it.
///
/// # Errors
/// Returns `NotFound` when no row has `id`, or `Conflict` naming the blocking relation.
pub fn delete<E, S>(store: &mut S, id: Id<E>) -> DomainResult<()>
where
    E: Entity,
    S: EntityStore + Repository<E> + ?Sized,
{
    resolve_required(&*store, id)?;
    if let Err(err) = guard_delete(&*store, id) {
        tracing::warn!(kind = E::KIND.as_str(), id = %id, error = %err, "refused delete");
        return Err(err);
    }
    <S as Repository<E>>::delete_by_id(store, id)?;
    tracing::info!(kind = E::KIND.as_str(), id = %id, "deleted entity");
    Ok(())
}

/// Lowers the difficulty of one lab work by `steps` levels.
///
/// # Errors
/// Returns `InvalidArgument` when `steps < 1` and `NotFound` when the lab work is missing.
pub fn decrease_difficulty<S: EntityStore + ?Sized>(
    store: &mut S,
    id: Id<LabWork>,
    steps: i64,
) -> DomainResult<LabWorkView> {
    Difficulty::check_steps(steps)?;
    let mut row = resolve_required(&*store, id)?;
    row.entity.difficulty = row.entity.difficulty.decrease(steps)?;
    <S as Repository<LabWork>>::update(store, &row)?;
    tracing::info!(id = %id, difficulty = row.entity.difficulty.as_str(), "decreased difficulty");
    LabWork::to_shallow(&row, &*store)
}
