//! Inbound request bodies.
//!
//! Create requests carry every required field; update requests carry only the
//! fields to overwrite. A reference present in a request is resolved against the
//! store before it is written.

use labwork_core::{
    resolve_optional, resolve_required, Color, Coordinates, Country, Difficulty, Discipline,
    DomainResult, Entity, EntityStore, Id, LabWork, Location, Person, Project,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A request that builds a new entity.
pub trait CreateRequest {
    type Entity: Project;

    /// Builds and validates the entity, resolving every reference it names.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for bad field values and `NotFound` for an unknown reference.
    fn build<S: EntityStore + ?Sized>(
        self,
        store: &S,
        now: OffsetDateTime,
    ) -> DomainResult<Self::Entity>;
}

/// A partial update: present fields overwrite, absent fields are kept.
pub trait UpdateRequest {
    type Entity: Project;

    /// # Errors
    /// Returns `InvalidArgument` when the updated entity breaks an invariant and
    /// `NotFound` for an unknown reference.
    fn apply<S: EntityStore + ?Sized>(
        self,
        current: &mut Self::Entity,
        store: &S,
    ) -> DomainResult<()>;
}

fn overwrite<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateCoordinatesRequest {
    pub x: f32,
    #[serde(default)]
    pub y: f32,
}

impl CreateRequest for CreateCoordinatesRequest {
    type Entity = Coordinates;

    fn build<S: EntityStore + ?Sized>(
        self,
        _store: &S,
        _now: OffsetDateTime,
    ) -> DomainResult<Coordinates> {
        let coordinates = Coordinates { x: self.x, y: self.y };
        coordinates.validate()?;
        Ok(coordinates)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpdateCoordinatesRequest {
    pub x: Option<f32>,
    pub y: Option<f32>,
}

impl UpdateRequest for UpdateCoordinatesRequest {
    type Entity = Coordinates;

    fn apply<S: EntityStore + ?Sized>(
        self,
        current: &mut Coordinates,
        _store: &S,
    ) -> DomainResult<()> {
        overwrite(&mut current.x, self.x);
        overwrite(&mut current.y, self.y);
        current.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateLocationRequest {
    pub x: f64,
    pub y: i32,
    pub name: String,
}

impl CreateRequest for CreateLocationRequest {
    type Entity = Location;

    fn build<S: EntityStore + ?Sized>(
        self,
        _store: &S,
        _now: OffsetDateTime,
    ) -> DomainResult<Location> {
        let location = Location { x: self.x, y: self.y, name: self.name };
        location.validate()?;
        Ok(location)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpdateLocationRequest {
    pub x: Option<f64>,
    pub y: Option<i32>,
    pub name: Option<String>,
}

impl UpdateRequest for UpdateLocationRequest {
    type Entity = Location;

    fn apply<S: EntityStore + ?Sized>(
        self,
        current: &mut Location,
        _store: &S,
    ) -> DomainResult<()> {
        overwrite(&mut current.x, self.x);
        overwrite(&mut current.y, self.y);
        overwrite(&mut current.name, self.name);
        current.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateDisciplineRequest {
    pub name: String,
    pub practice_hours: i64,
    pub labs_count: i64,
}

impl CreateRequest for CreateDisciplineRequest {
    type Entity = Discipline;

    fn build<S: EntityStore + ?Sized>(
        self,
        _store: &S,
        _now: OffsetDateTime,
    ) -> DomainResult<Discipline> {
        let discipline = Discipline {
            name: self.name,
            practice_hours: self.practice_hours,
            labs_count: self.labs_count,
        };
        discipline.validate()?;
        Ok(discipline)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UpdateDisciplineRequest {
    pub name: Option<String>,
    pub practice_hours: Option<i64>,
    pub labs_count: Option<i64>,
}

impl UpdateRequest for UpdateDisciplineRequest {
    type Entity = Discipline;

    fn apply<S: EntityStore + ?Sized>(
        self,
        current: &mut Discipline,
        _store: &S,
    ) -> DomainResult<()> {
        overwrite(&mut current.name, self.name);
        overwrite(&mut current.practice_hours, self.practice_hours);
        overwrite(&mut current.labs_count, self.labs_count);
        current.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreatePersonRequest {
    pub name: String,
    #[serde(default)]
    pub eye_color: Option<Color>,
    pub hair_color: Color,
    pub weight: f64,
    #[serde(default)]
    pub nationality: Option<Country>,
    #[serde(default)]
    pub location_id: Option<Id<Location>>,
}

impl CreateRequest for CreatePersonRequest {
    type Entity = Person;

    fn build<S: EntityStore + ?Sized>(
        self,
        store: &S,
        _now: OffsetDateTime,
    ) -> DomainResult<Person> {
        let person = Person {
            name: self.name,
            eye_color: self.eye_color,
            hair_color: self.hair_color,
            weight: self.weight,
            nationality: self.nationality,
            location: self.location_id,
        };
        person.validate()?;
        resolve_optional(store, person.location)?;
        Ok(person)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpdatePersonRequest {
    pub name: Option<String>,
    pub eye_color: Option<Color>,
    pub hair_color: Option<Color>,
    pub weight: Option<f64>,
    pub nationality: Option<Country>,
    pub location_id: Option<Id<Location>>,
}

impl UpdateRequest for UpdatePersonRequest {
    type Entity = Person;

    fn apply<S: EntityStore + ?Sized>(self, current: &mut Person, store: &S) -> DomainResult<()> {
        overwrite(&mut current.name, self.name);
        if self.eye_color.is_some() {
            current.eye_color = self.eye_color;
        }
        overwrite(&mut current.hair_color, self.hair_color);
        overwrite(&mut current.weight, self.weight);
        if self.nationality.is_some() {
            current.nationality = self.nationality;
        }
        current.validate()?;
        if let Some(location) = self.location_id {
            current.location = Some(resolve_required(store, location)?.id);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateLabWorkRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub difficulty: Difficulty,
    pub minimal_point: i64,
    pub coordinates_id: Id<Coordinates>,
    #[serde(default)]
    pub author_id: Option<Id<Person>>,
    #[serde(default)]
    pub discipline_id: Option<Id<Discipline>>,
}

impl CreateRequest for CreateLabWorkRequest {
    type Entity = LabWork;

    fn build<S: EntityStore + ?Sized>(
        self,
        store: &S,
        now: OffsetDateTime,
    ) -> DomainResult<LabWork> {
        let lab_work = LabWork {
            name: self.name,
            description: self.description,
            difficulty: self.difficulty,
            minimal_point: self.minimal_point,
            creation_date: now,
            coordinates: self.coordinates_id,
            author: self.author_id,
            discipline: self.discipline_id,
        };
        lab_work.validate()?;
        resolve_required(store, lab_work.coordinates)?;
        resolve_optional(store, lab_work.author)?;
        resolve_optional(store, lab_work.discipline)?;
        Ok(lab_work)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UpdateLabWorkRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub minimal_point: Option<i64>,
    pub coordinates_id: Option<Id<Coordinates>>,
    pub author_id: Option<Id<Person>>,
    pub discipline_id: Option<Id<Discipline>>,
}

impl UpdateRequest for UpdateLabWorkRequest {
    type Entity = LabWork;

    fn apply<S: EntityStore + ?Sized>(self, current: &mut LabWork, store: &S) -> DomainResult<()> {
        overwrite(&mut current.name, self.name);
        if self.description.is_some() {
            current.description = self.description;
        }
        overwrite(&mut current.difficulty, self.difficulty);
        overwrite(&mut current.minimal_point, self.minimal_point);
        current.validate()?;

        if let Some(coordinates) = self.coordinates_id {
            current.coordinates = resolve_required(store, coordinates)?.id;
        }
        if let Some(author) = self.author_id {
            current.author = Some(resolve_required(store, author)?.id);
        }
        if let Some(discipline) = self.discipline_id {
            current.discipline = Some(resolve_required(store, discipline)?.id);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DecreaseDifficultyRequest {
    pub steps: i64,
}

#[cfg(test)]
mod tests {
    use labwork_core::{DomainError, MemoryStore, Repository};

    use super::*;

    #[test]
    fn absent_update_fields_leave_entity_unchanged() -> DomainResult<()> {
        let store = MemoryStore::new();
        let mut discipline =
            Discipline { name: "Databases".to_string(), practice_hours: 20, labs_count: 5 };
        UpdateDisciplineRequest::default().apply(&mut discipline, &store)?;
        assert_eq!(
            discipline,
            Discipline { name: "Databases".to_string(), practice_hours: 20, labs_count: 5 }
        );

        UpdateDisciplineRequest { labs_count: Some(8), ..UpdateDisciplineRequest::default() }
            .apply(&mut discipline, &store)?;
        assert_eq!(discipline.labs_count, 8);
        assert_eq!(discipline.name, "Databases");
        Ok(())
    }

    #[test]
    fn update_body_parses_with_missing_fields() {
        let parsed: UpdateLabWorkRequest = serde_json::from_str(r#"{"minimal_point": 9}"#)
            .unwrap_or_else(|err| panic!("partial update should parse: {err}"));
        assert_eq!(parsed.minimal_point, Some(9));
        assert_eq!(parsed.author_id, None);
    }

    #[test]
    fn create_lab_work_resolves_references() -> DomainResult<()> {
        let mut store = MemoryStore::new();
        let coordinates = store.insert(Coordinates { x: 1.0, y: 1.0 })?.id;
        let request = CreateLabWorkRequest {
            name: "Scheduler".to_string(),
            description: None,
            difficulty: Difficulty::Insane,
            minimal_point: 11,
            coordinates_id: coordinates,
            author_id: Some(Id::new(5)),
            discipline_id: None,
        };

        match request.clone().build(&store, OffsetDateTime::UNIX_EPOCH) {
            Err(DomainError::NotFound(message)) => assert!(message.starts_with("Person with id 5")),
            other => panic!("expected not found for author, got {other:?}"),
        }

        let built = CreateLabWorkRequest { author_id: None, ..request }
            .build(&store, OffsetDateTime::UNIX_EPOCH)?;
        assert_eq!(built.creation_date, OffsetDateTime::UNIX_EPOCH);
        assert_eq!(built.coordinates, coordinates);
        Ok(())
    }

    #[test]
    fn invalid_fields_are_rejected_before_references() {
        let store = MemoryStore::new();
        let request = CreateLabWorkRequest {
            name: String::new(),
            description: None,
            difficulty: Difficulty::Easy,
            minimal_point: 1,
            coordinates_id: Id::new(1),
            author_id: None,
            discipline_id: None,
        };
        assert!(matches!(
            request.build(&store, OffsetDateTime::UNIX_EPOCH),
            Err(DomainError::InvalidArgument(_))
        ));
    }
}
