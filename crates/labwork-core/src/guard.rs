use crate::error::{DomainError, DomainResult};
use crate::model::{Entity, Id, Stored};
use crate::store::{EntityStore, ForeignKey, Repository};

/// Resolves an id that must exist: an operation target or a mandatory reference.
///
/// # Errors
/// Returns [`DomainError::NotFound`] when no row has `id`.
pub fn resolve_required<E, S>(store: &S, id: Id<E>) -> DomainResult<Stored<E>>
where
    E: Entity,
    S: Repository<E> + ?Sized,
{
    <S as Repository<E>>::find_by_id(store, id)?.ok_or_else(|| not_found::<E>(id))
}

/// Resolves an optional reference. An absent id resolves to `None`; a given id must exist.
///
/// # Errors
/// Returns [`DomainError::NotFound`] when `id` is given but no row has it.
pub fn resolve_optional<E, S>(store: &S, id: Option<Id<E>>) -> DomainResult<Option<Stored<E>>>
where
    E: Entity,
    S: Repository<E> + ?Sized,
{
    id.map(|id| resolve_required(store, id)).transpose()
}

/// Refuses a delete while any row still references `id`.
///
/// # Errors
/// Returns [`DomainError::Conflict`] naming the first blocking relation.
pub fn guard_delete<E, S>(store: &S, id: Id<E>) -> DomainResult<()>
where
    E: Entity,
    S: EntityStore + ?Sized,
{
    for fk in ForeignKey::referencing(E::KIND) {
        if store.exists_by_foreign_key(fk, id.get())? {
            return Err(DomainError::Conflict(fk.blocked_delete_reason().to_string()));
        }
    }
    Ok(())
}

/// Error for an id that does not resolve.
#[must_use]
pub fn not_found<E: Entity>(id: Id<E>) -> DomainError {
    DomainError::NotFound(format!("{} with id {id} not found", E::KIND))
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;
    use crate::difficulty::Difficulty;
    use crate::memory::MemoryStore;
    use crate::model::{Color, Coordinates, Discipline, LabWork, Location, Person};

    struct Fixture {
        store: MemoryStore,
        coordinates: Id<Coordinates>,
        location: Id<Location>,
        discipline: Id<Discipline>,
        person: Id<Person>,
        lab_work: Id<LabWork>,
    }

    fn fixture() -> DomainResult<Fixture> {
        let mut store = MemoryStore::new();
        let coordinates = store.insert(Coordinates { x: 0.5, y: 0.5 })?.id;
        let location = store.insert(Location { x: 1.0, y: 2, name: "Room 101".to_string() })?.id;
        let discipline = store
            .insert(Discipline {
                name: "Compilers".to_string(),
                practice_hours: 48,
                labs_count: 6,
            })?
            .id;
        let person = store
            .insert(Person {
                name: "Grace".to_string(),
                eye_color: None,
                hair_color: Color::Black,
                weight: 61.0,
                nationality: None,
                location: Some(location),
            })?
            .id;
        let lab_work = store
            .insert(LabWork {
                name: "Register allocation".to_string(),
                description: None,
                difficulty: Difficulty::Hopeless,
                minimal_point: 20,
                creation_date: OffsetDateTime::UNIX_EPOCH,
                coordinates,
                author: Some(person),
                discipline: Some(discipline),
            })?
            .id;
        Ok(Fixture { store, coordinates, location, discipline, person, lab_work })
    }

    fn assert_conflict(outcome: DomainResult<()>, needle: &str) {
        match outcome {
            Err(DomainError::Conflict(message)) => {
                assert!(message.contains(needle), "unexpected message: {message}");
            }
            other => panic!("expected conflict containing {needle:?}, got {other:?}"),
        }
    }

    #[test]
    fn resolve_required_reports_missing_row() {
        let store = MemoryStore::new();
        match resolve_required::<LabWork, _>(&store, Id::new(3)) {
            Err(DomainError::NotFound(message)) => {
                assert_eq!(message, "LabWork with id 3 not found");
            }
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[test]
    fn resolve_optional_passes_through_absent_id() -> DomainResult<()> {
        let fx = fixture()?;
        assert!(resolve_optional::<Person, _>(&fx.store, None)?.is_none());
        assert!(resolve_optional(&fx.store, Some(fx.person))?.is_some());
        assert!(matches!(
            resolve_optional::<Person, _>(&fx.store, Some(Id::new(404))),
            Err(DomainError::NotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn guard_delete_blocks_every_referenced_parent() -> DomainResult<()> {
        let fx = fixture()?;
        assert_conflict(
            guard_delete(&fx.store, fx.coordinates),
            "Coordinates are used by LabWork(s)",
        );
        assert_conflict(guard_delete(&fx.store, fx.discipline), "Discipline is used by LabWork(s)");
        assert_conflict(guard_delete(&fx.store, fx.person), "as author");
        assert_conflict(guard_delete(&fx.store, fx.location), "Delete persons first.");
        guard_delete(&fx.store, fx.lab_work)
    }

    #[test]
    fn guard_delete_allows_once_dependents_are_gone() -> DomainResult<()> {
        let mut fx = fixture()?;
        assert!(fx.store.delete_by_id(fx.lab_work)?);

        for outcome in [
            guard_delete(&fx.store, fx.coordinates),
            guard_delete(&fx.store, fx.discipline),
            guard_delete(&fx.store, fx.person),
        ] {
            outcome?;
        }
        assert_conflict(guard_delete(&fx.store, fx.location), "in use by one or more persons");

        assert!(fx.store.delete_by_id(fx.person)?);
        guard_delete(&fx.store, fx.location)?;
        assert!(fx.store.delete_by_id(fx.location)?);
        assert!(!fx.store.exists_by_id(fx.location)?);
        Ok(())
    }
}
