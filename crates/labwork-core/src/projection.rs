//! Read-only views of persisted rows.
//!
//! A shallow view names each reference by id (and by name where the referenced
//! kind has one). A full view embeds the referenced rows' own views. Absent
//! optional references are always serialized as `null`.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::difficulty::Difficulty;
use crate::error::{DomainError, DomainResult};
use crate::model::{
    Color, Coordinates, Country, Discipline, Entity, Id, LabWork, Location, Person, Stored,
};
use crate::store::{EntityStore, Repository};

pub trait Project: Entity {
    type Shallow: Serialize + Debug + Clone + PartialEq;
    type Full: Serialize + Debug + Clone + PartialEq;

    /// # Errors
    /// Returns [`DomainError::IntegrityViolation`] when a reference does not resolve.
    fn to_shallow<S: EntityStore + ?Sized>(
        row: &Stored<Self>,
        store: &S,
    ) -> DomainResult<Self::Shallow>;

    /// # Errors
    /// Returns [`DomainError::IntegrityViolation`] when a reference does not resolve.
    fn to_full<S: EntityStore + ?Sized>(row: &Stored<Self>, store: &S) -> DomainResult<Self::Full>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatesView {
    pub id: Id<Coordinates>,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationView {
    pub id: Id<Location>,
    pub x: f64,
    pub y: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisciplineView {
    pub id: Id<Discipline>,
    pub name: String,
    pub practice_hours: i64,
    pub labs_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonView {
    pub id: Id<Person>,
    pub name: String,
    pub eye_color: Option<Color>,
    pub hair_color: Color,
    pub weight: f64,
    pub nationality: Option<Country>,
    pub location_id: Option<Id<Location>>,
    pub location_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonFullView {
    pub id: Id<Person>,
    pub name: String,
    pub eye_color: Option<Color>,
    pub hair_color: Color,
    pub weight: f64,
    pub nationality: Option<Country>,
    pub location: Option<LocationView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabWorkView {
    pub id: Id<LabWork>,
    pub name: String,
    pub description: Option<String>,
    pub difficulty: Difficulty,
    pub minimal_point: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub creation_date: OffsetDateTime,
    pub coordinates_id: Id<Coordinates>,
    pub author_id: Option<Id<Person>>,
    pub author_name: Option<String>,
    pub discipline_id: Option<Id<Discipline>>,
    pub discipline_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabWorkFullView {
    pub id: Id<LabWork>,
    pub name: String,
    pub description: Option<String>,
    pub difficulty: Difficulty,
    pub minimal_point: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub creation_date: OffsetDateTime,
    pub coordinates: CoordinatesView,
    pub author: Option<PersonFullView>,
    pub discipline: Option<DisciplineView>,
}

/// Follows a stored reference; a missing target means the store lost integrity.
fn dereference<O, P, S>(store: &S, owner: &Stored<O>, id: Id<P>) -> DomainResult<Stored<P>>
where
    O: Entity,
    P: Entity,
    S: Repository<P> + ?Sized,
{
    <S as Repository<P>>::find_by_id(store, id)?.ok_or_else(|| {
        DomainError::IntegrityViolation(format!(
            "{} {} references missing {} {id}",
            O::KIND,
            owner.id,
            P::KIND
        ))
    })
}

fn dereference_optional<O, P, S>(
    store: &S,
    owner: &Stored<O>,
    id: Option<Id<P>>,
) -> DomainResult<Option<Stored<P>>>
where
    O: Entity,
    P: Entity,
    S: Repository<P> + ?Sized,
{
    id.map(|id| dereference(store, owner, id)).transpose()
}

fn coordinates_view(row: &Stored<Coordinates>) -> CoordinatesView {
    CoordinatesView { id: row.id, x: row.entity.x, y: row.entity.y }
}

fn location_view(row: &Stored<Location>) -> LocationView {
    LocationView { id: row.id, x: row.entity.x, y: row.entity.y, name: row.entity.name.clone() }
}

fn discipline_view(row: &Stored<Discipline>) -> DisciplineView {
    DisciplineView {
        id: row.id,
        name: row.entity.name.clone(),
        practice_hours: row.entity.practice_hours,
        labs_count: row.entity.labs_count,
    }
}

impl Project for Coordinates {
    type Shallow = CoordinatesView;
    type Full = CoordinatesView;

    fn to_shallow<S: EntityStore + ?Sized>(
        row: &Stored<Self>,
        _store: &S,
    ) -> DomainResult<Self::Shallow> {
        Ok(coordinates_view(row))
    }

    fn to_full<S: EntityStore + ?Sized>(
        row: &Stored<Self>,
        _store: &S,
    ) -> DomainResult<Self::Full> {
        Ok(coordinates_view(row))
    }
}

impl Project for Location {
    type Shallow = LocationView;
    type Full = LocationView;

    fn to_shallow<S: EntityStore + ?Sized>(
        row: &Stored<Self>,
        _store: &S,
    ) -> DomainResult<Self::Shallow> {
        Ok(location_view(row))
    }

    fn to_full<S: EntityStore + ?Sized>(
        row: &Stored<Self>,
        _store: &S,
    ) -> DomainResult<Self::Full> {
        Ok(location_view(row))
    }
}

impl Project for Discipline {
    type Shallow = DisciplineView;
    type Full = DisciplineView;

    fn to_shallow<S: EntityStore + ?Sized>(
        row: &Stored<Self>,
        _store: &S,
    ) -> DomainResult<Self::Shallow> {
        Ok(discipline_view(row))
    }

    fn to_full<S: EntityStore + ?Sized>(
        row: &Stored<Self>,
        _store: &S,
    ) -> DomainResult<Self::Full> {
        Ok(discipline_view(row))
    }
}

impl Project for Person {
    type Shallow = PersonView;
    type Full = PersonFullView;

    fn to_shallow<S: EntityStore + ?Sized>(
        row: &Stored<Self>,
        store: &S,
    ) -> DomainResult<Self::Shallow> {
        let location = dereference_optional(store, row, row.entity.location)?;
        Ok(PersonView {
            id: row.id,
            name: row.entity.name.clone(),
            eye_color: row.entity.eye_color,
            hair_color: row.entity.hair_color,
            weight: row.entity.weight,
            nationality: row.entity.nationality,
            location_id: row.entity.location,
            location_name: location.map(|location| location.entity.name),
        })
    }

    fn to_full<S: EntityStore + ?Sized>(row: &Stored<Self>, store: &S) -> DomainResult<Self::Full> {
        let location = dereference_optional(store, row, row.entity.location)?;
        Ok(PersonFullView {
            id: row.id,
            name: row.entity.name.clone(),
            eye_color: row.entity.eye_color,
            hair_color: row.entity.hair_color,
            weight: row.entity.weight,
            nationality: row.entity.nationality,
            location: location.as_ref().map(location_view),
        })
    }
}

impl Project for LabWork {
    type Shallow = LabWorkView;
    type Full = LabWorkFullView;

    fn to_shallow<S: EntityStore + ?Sized>(
        row: &Stored<Self>,
        store: &S,
    ) -> DomainResult<Self::Shallow> {
        let lab_work = &row.entity;
        let author = dereference_optional(store, row, lab_work.author)?;
        let discipline = dereference_optional(store, row, lab_work.discipline)?;
        Ok(LabWorkView {
            id: row.id,
            name: lab_work.name.clone(),
            description: lab_work.description.clone(),
            difficulty: lab_work.difficulty,
            minimal_point: lab_work.minimal_point,
            creation_date: lab_work.creation_date,
            coordinates_id: lab_work.coordinates,
            author_id: lab_work.author,
            author_name: author.map(|author| author.entity.name),
            discipline_id: lab_work.discipline,
            discipline_name: discipline.map(|discipline| discipline.entity.name),
        })
    }

    fn to_full<S: EntityStore + ?Sized>(row: &Stored<Self>, store: &S) -> DomainResult<Self::Full> {
        let lab_work = &row.entity;
        let coordinates = dereference(store, row, lab_work.coordinates)?;
        let author = match dereference_optional(store, row, lab_work.author)? {
            Some(author) => Some(Person::to_full(&author, store)?),
            None => None,
        };
        let discipline = dereference_optional(store, row, lab_work.discipline)?;
        Ok(LabWorkFullView {
            id: row.id,
            name: lab_work.name.clone(),
            description: lab_work.description.clone(),
            difficulty: lab_work.difficulty,
            minimal_point: lab_work.minimal_point,
            creation_date: lab_work.creation_date,
            coordinates: coordinates_view(&coordinates),
            author,
            discipline: discipline.as_ref().map(discipline_view),
        })
    }
}
