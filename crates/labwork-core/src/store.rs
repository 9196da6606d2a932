use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::model::{
    Coordinates, Discipline, Entity, EntityKind, Id, LabWork, Location, Person, Stored,
};

/// Per-kind persistence. `find_all` returns rows in ascending id order.
pub trait Repository<E: Entity> {
    /// # Errors
    /// Returns a [`crate::StoreError`] when the backend cannot be read.
    fn find_all(&self) -> StoreResult<Vec<Stored<E>>>;

    /// # Errors
    /// Returns a [`crate::StoreError`] when the backend cannot be read.
    fn find_by_id(&self, id: Id<E>) -> StoreResult<Option<Stored<E>>>;

    /// # Errors
    /// Returns a [`crate::StoreError`] when the backend cannot be read.
    fn exists_by_id(&self, id: Id<E>) -> StoreResult<bool> {
        Ok(self.find_by_id(id)?.is_some())
    }

    /// Persists a new row and returns it with the assigned id.
    ///
    /// # Errors
    /// Returns [`crate::StoreError::IntegrityViolation`] when a backend constraint rejects the row.
    fn insert(&mut self, entity: E) -> StoreResult<Stored<E>>;

    /// Overwrites every field of an existing row.
    ///
    /// # Errors
    /// Returns [`crate::StoreError::IntegrityViolation`] when a backend constraint rejects the row.
    fn update(&mut self, row: &Stored<E>) -> StoreResult<()>;

    /// Returns whether a row was removed.
    ///
    /// # Errors
    /// Returns [`crate::StoreError::IntegrityViolation`] when the row is still referenced.
    fn delete_by_id(&mut self, id: Id<E>) -> StoreResult<bool>;
}

/// The full relational store: one repository per entity kind plus the
/// cross-kind and aggregate queries.
pub trait EntityStore:
    Repository<Coordinates>
    + Repository<Location>
    + Repository<Discipline>
    + Repository<Person>
    + Repository<LabWork>
{
    /// Whether any `fk.owner()` row references the `fk.parent()` row `parent_id`.
    ///
    /// # Errors
    /// Returns a [`crate::StoreError`] when the backend cannot be read.
    fn exists_by_foreign_key(&self, fk: ForeignKey, parent_id: i64) -> StoreResult<bool>;

    /// # Errors
    /// Returns a [`crate::StoreError`] when the backend cannot be read or the sum overflows.
    fn sum_minimal_point(&self) -> StoreResult<i64>;

    /// Lab works with a non-null author whose id is strictly greater than `author_id`.
    ///
    /// # Errors
    /// Returns a [`crate::StoreError`] when the backend cannot be read.
    fn count_by_author_id_greater_than(&self, author_id: i64) -> StoreResult<u64>;

    /// # Errors
    /// Returns a [`crate::StoreError`] when the backend rejects the delete.
    fn delete_by_minimal_point(&mut self, value: i64) -> StoreResult<u64>;

    /// At most `limit` lab works sorted by `order`.
    ///
    /// # Errors
    /// Returns a [`crate::StoreError`] when the backend cannot be read.
    fn find_ranked(&self, order: &[OrderTerm], limit: usize) -> StoreResult<Vec<Stored<LabWork>>>;
}

/// Every foreign key in the model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ForeignKey {
    LabWorkCoordinates,
    LabWorkAuthor,
    LabWorkDiscipline,
    PersonLocation,
}

impl ForeignKey {
    pub const ALL: [Self; 4] = [
        Self::LabWorkCoordinates,
        Self::LabWorkAuthor,
        Self::LabWorkDiscipline,
        Self::PersonLocation,
    ];

    /// Kind holding the key.
    #[must_use]
    pub fn owner(self) -> EntityKind {
        match self {
            Self::LabWorkCoordinates | Self::LabWorkAuthor | Self::LabWorkDiscipline => {
                EntityKind::LabWork
            }
            Self::PersonLocation => EntityKind::Person,
        }
    }

    /// Kind the key points at.
    #[must_use]
    pub fn parent(self) -> EntityKind {
        match self {
            Self::LabWorkCoordinates => EntityKind::Coordinates,
            Self::LabWorkAuthor => EntityKind::Person,
            Self::LabWorkDiscipline => EntityKind::Discipline,
            Self::PersonLocation => EntityKind::Location,
        }
    }

    #[must_use]
    pub fn column(self) -> &'static str {
        match self {
            Self::LabWorkCoordinates => "coordinates_id",
            Self::LabWorkAuthor => "author_id",
            Self::LabWorkDiscipline => "discipline_id",
            Self::PersonLocation => "location_id",
        }
    }

    /// Reason reported when a delete of the parent is refused because of this key.
    #[must_use]
    pub fn blocked_delete_reason(self) -> &'static str {
        match self {
            Self::LabWorkCoordinates => {
                "Coordinates are used by LabWork(s). Delete related LabWorks first."
            }
            Self::LabWorkAuthor => {
                "Person is used by LabWork(s) as author. Delete related LabWorks first."
            }
            Self::LabWorkDiscipline => {
                "Discipline is used by LabWork(s). Delete related LabWorks first."
            }
            Self::PersonLocation => {
                "Location is in use by one or more persons. Delete persons first."
            }
        }
    }

    /// Keys that may reference a row of `parent`.
    pub fn referencing(parent: EntityKind) -> impl Iterator<Item = Self> {
        Self::ALL.into_iter().filter(move |fk| fk.parent() == parent)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RankKey {
    DifficultyRank,
    MinimalPoint,
    Id,
}

impl RankKey {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DifficultyRank => "difficulty_rank",
            Self::MinimalPoint => "minimal_point",
            Self::Id => "id",
        }
    }

    fn value(self, row: &Stored<LabWork>) -> i64 {
        match self {
            Self::DifficultyRank => row.entity.difficulty.rank(),
            Self::MinimalPoint => row.entity.minimal_point,
            Self::Id => row.id.get(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub struct OrderTerm {
    pub key: RankKey,
    pub direction: Direction,
}

impl Display for OrderTerm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.key.as_str(), self.direction.as_str())
    }
}

/// Hardest first: difficulty rank, then minimal point, then newest id.
pub const HARDEST_FIRST: [OrderTerm; 3] = [
    OrderTerm { key: RankKey::DifficultyRank, direction: Direction::Desc },
    OrderTerm { key: RankKey::MinimalPoint, direction: Direction::Desc },
    OrderTerm { key: RankKey::Id, direction: Direction::Desc },
];

/// Renders an ordering as `key dir, key dir, ...`.
#[must_use]
pub fn render_order(order: &[OrderTerm]) -> String {
    order.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Compares two lab works under `order`. Ties past the last term fall back to ascending id.
#[must_use]
pub fn compare_ranked(
    lhs: &Stored<LabWork>,
    rhs: &Stored<LabWork>,
    order: &[OrderTerm],
) -> Ordering {
    order
        .iter()
        .fold(Ordering::Equal, |acc, term| {
            acc.then_with(|| {
                let ordering = term.key.value(lhs).cmp(&term.key.value(rhs));
                match term.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            })
        })
        .then_with(|| lhs.id.cmp(&rhs.id))
}

/// Sorts `rows` under `order` and keeps the first `limit`.
#[must_use]
pub fn rank_rows(
    mut rows: Vec<Stored<LabWork>>,
    order: &[OrderTerm],
    limit: usize,
) -> Vec<Stored<LabWork>> {
    rows.sort_by(|lhs, rhs| compare_ranked(lhs, rhs, order));
    rows.truncate(limit);
    rows
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;
    use crate::difficulty::Difficulty;

    fn row(id: i64, difficulty: Difficulty, minimal_point: i64) -> Stored<LabWork> {
        Stored::new(
            Id::new(id),
            LabWork {
                name: format!("lab-{id}"),
                description: None,
                difficulty,
                minimal_point,
                creation_date: OffsetDateTime::UNIX_EPOCH,
                coordinates: Id::new(1),
                author: None,
                discipline: None,
            },
        )
    }

    #[test]
    fn hardest_first_renders_readably() {
        assert_eq!(
            render_order(&HARDEST_FIRST),
            "difficulty_rank desc, minimal_point desc, id desc"
        );
    }

    #[test]
    fn rank_rows_breaks_ties_by_points_then_id() {
        let rows = vec![
            row(1, Difficulty::Easy, 50),
            row(2, Difficulty::Hopeless, 10),
            row(3, Difficulty::Hopeless, 10),
            row(4, Difficulty::Hopeless, 30),
            row(5, Difficulty::VeryEasy, 99),
        ];
        let ranked = rank_rows(rows, &HARDEST_FIRST, 4);
        let ids = ranked.iter().map(|row| row.id.get()).collect::<Vec<_>>();
        assert_eq!(ids, vec![4, 3, 2, 1]);
    }

    #[test]
    fn referencing_lists_keys_per_parent() {
        assert_eq!(
            ForeignKey::referencing(EntityKind::Coordinates).collect::<Vec<_>>(),
            vec![ForeignKey::LabWorkCoordinates]
        );
        assert_eq!(
            ForeignKey::referencing(EntityKind::Location).collect::<Vec<_>>(),
            vec![ForeignKey::PersonLocation]
        );
        assert_eq!(ForeignKey::referencing(EntityKind::LabWork).count(), 0);
        for fk in ForeignKey::ALL {
            assert_ne!(fk.owner(), fk.parent());
        }
    }
}
