use std::collections::BTreeMap;

use crate::error::{StoreError, StoreResult};
use crate::model::{
    Coordinates, Discipline, Entity, EntityKind, Id, LabWork, Location, Person, Stored,
};
use crate::store::{rank_rows, EntityStore, ForeignKey, OrderTerm, Repository};

#[derive(Debug, Clone)]
struct Arena<E> {
    rows: BTreeMap<i64, E>,
    next_id: i64,
}

impl<E> Default for Arena<E> {
    fn default() -> Self {
        Self { rows: BTreeMap::new(), next_id: 1 }
    }
}

impl<E: Entity> Arena<E> {
    fn references(&self, fk: ForeignKey, parent_id: i64) -> bool {
        self.rows.values().any(|entity| entity.references().contains(&(fk, parent_id)))
    }
}

/// Id-indexed arenas enforcing the same foreign-key rules as the relational schema.
///
/// Ids are assigned per kind starting at 1 and are never reused.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    coordinates: Arena<Coordinates>,
    locations: Arena<Location>,
    disciplines: Arena<Discipline>,
    persons: Arena<Person>,
    lab_works: Arena<LabWork>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against a working copy that replaces the live state only when `f` succeeds.
    ///
    /// # Errors
    /// Propagates the error returned by `f`; the store is left untouched.
    pub fn transaction<T, E>(
        &mut self,
        f: impl FnOnce(&mut MemoryStore) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut working = self.clone();
        let output = f(&mut working)?;
        *self = working;
        Ok(output)
    }

    fn contains(&self, kind: EntityKind, raw: i64) -> bool {
        match kind {
            EntityKind::Coordinates => self.coordinates.rows.contains_key(&raw),
            EntityKind::Location => self.locations.rows.contains_key(&raw),
            EntityKind::Discipline => self.disciplines.rows.contains_key(&raw),
            EntityKind::Person => self.persons.rows.contains_key(&raw),
            EntityKind::LabWork => self.lab_works.rows.contains_key(&raw),
        }
    }

    fn check_references(&self, references: &[(ForeignKey, i64)]) -> StoreResult<()> {
        for (fk, parent_id) in references {
            if !self.contains(fk.parent(), *parent_id) {
                return Err(StoreError::IntegrityViolation(format!(
                    "FOREIGN KEY constraint failed: {}.{} -> {} {parent_id}",
                    fk.owner().as_str(),
                    fk.column(),
                    fk.parent()
                )));
            }
        }
        Ok(())
    }

    fn check_unreferenced(&self, kind: EntityKind, raw: i64) -> StoreResult<()> {
        for fk in ForeignKey::referencing(kind) {
            if self.exists_by_foreign_key(fk, raw)? {
                return Err(StoreError::IntegrityViolation(format!(
                    "FOREIGN KEY constraint failed: {kind} {raw} is referenced by {}.{}",
                    fk.owner().as_str(),
                    fk.column()
                )));
            }
        }
        Ok(())
    }
}

macro_rules! arena_repository {
    ($entity:ty, $arena:ident) => {
        impl Repository<$entity> for MemoryStore {
            fn find_all(&self) -> StoreResult<Vec<Stored<$entity>>> {
                Ok(self
                    .$arena
                    .rows
                    .iter()
                    .map(|(id, entity)| Stored::new(Id::new(*id), entity.clone()))
                    .collect())
            }

            fn find_by_id(&self, id: Id<$entity>) -> StoreResult<Option<Stored<$entity>>> {
                Ok(self.$arena.rows.get(&id.get()).map(|entity| Stored::new(id, entity.clone())))
            }

            fn insert(&mut self, entity: $entity) -> StoreResult<Stored<$entity>> {
                self.check_references(&entity.references())?;
                let id = self.$arena.next_id;
                self.$arena.next_id += 1;
                self.$arena.rows.insert(id, entity.clone());
                Ok(Stored::new(Id::new(id), entity))
            }

            fn update(&mut self, row: &Stored<$entity>) -> StoreResult<()> {
                self.check_references(&row.entity.references())?;
                match self.$arena.rows.get_mut(&row.id.get()) {
                    Some(slot) => {
                        *slot = row.entity.clone();
                        Ok(())
                    }
                    None => Err(StoreError::Backend(format!(
                        "no {} row with id {} to update",
                        <$entity as Entity>::KIND.as_str(),
                        row.id
                    ))),
                }
            }

            fn delete_by_id(&mut self, id: Id<$entity>) -> StoreResult<bool> {
                if !self.$arena.rows.contains_key(&id.get()) {
                    return Ok(false);
                }
                self.check_unreferenced(<$entity as Entity>::KIND, id.get())?;
                Ok(self.$arena.rows.remove(&id.get()).is_some())
            }
        }
    };
}

arena_repository!(Coordinates, coordinates);
arena_repository!(Location, locations);
arena_repository!(Discipline, disciplines);
arena_repository!(Person, persons);
arena_repository!(LabWork, lab_works);

impl EntityStore for MemoryStore {
    fn exists_by_foreign_key(&self, fk: ForeignKey, parent_id: i64) -> StoreResult<bool> {
        Ok(match fk.owner() {
            EntityKind::LabWork => self.lab_works.references(fk, parent_id),
            EntityKind::Person => self.persons.references(fk, parent_id),
            EntityKind::Coordinates | EntityKind::Location | EntityKind::Discipline => false,
        })
    }

    fn sum_minimal_point(&self) -> StoreResult<i64> {
        self.lab_works
            .rows
            .values()
            .try_fold(0_i64, |sum, lab_work| sum.checked_add(lab_work.minimal_point))
            .ok_or_else(|| StoreError::Backend("minimal_point sum overflows i64".to_string()))
    }

    fn count_by_author_id_greater_than(&self, author_id: i64) -> StoreResult<u64> {
        let count = self
            .lab_works
            .rows
            .values()
            .filter(|lab_work| lab_work.author.is_some_and(|author| author.get() > author_id))
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    fn delete_by_minimal_point(&mut self, value: i64) -> StoreResult<u64> {
        let before = self.lab_works.rows.len();
        self.lab_works.rows.retain(|_, lab_work| lab_work.minimal_point != value);
        let removed = before - self.lab_works.rows.len();
        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }

    fn find_ranked(&self, order: &[OrderTerm], limit: usize) -> StoreResult<Vec<Stored<LabWork>>> {
        let rows = Repository::<LabWork>::find_all(self)?;
        Ok(rank_rows(rows, order, limit))
    }
}
