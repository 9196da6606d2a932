use std::cmp::Ordering;
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::OffsetDateTime;

use crate::difficulty::Difficulty;
use crate::error::{DomainError, DomainResult};
use crate::store::ForeignKey;

/// Longest accepted lab work description, in characters.
pub const DESCRIPTION_MAX_CHARS: usize = 7529;

/// Store-assigned identifier, typed by the entity kind it names.
///
/// The wire form is the bare integer.
pub struct Id<E> {
    raw: i64,
    _kind: PhantomData<fn() -> E>,
}

impl<E> Id<E> {
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self { raw, _kind: PhantomData }
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.raw
    }
}

impl<E> Clone for Id<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Id<E> {}

impl<E> PartialEq for Id<E> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<E> Eq for Id<E> {}

impl<E> PartialOrd for Id<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Id<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<E> Hash for Id<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<E> Debug for Id<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.raw)
    }
}

impl<E> Display for Id<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl<E> Serialize for Id<E> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.raw)
    }
}

impl<'de, E> Deserialize<'de> for Id<E> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i64::deserialize(deserializer).map(Self::new)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Coordinates,
    Location,
    Discipline,
    Person,
    LabWork,
}

impl EntityKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Coordinates => "coordinates",
            Self::Location => "location",
            Self::Discipline => "discipline",
            Self::Person => "person",
            Self::LabWork => "lab_work",
        }
    }

    /// Name used in human-facing messages.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Coordinates => "Coordinates",
            Self::Location => "Location",
            Self::Discipline => "Discipline",
            Self::Person => "Person",
            Self::LabWork => "LabWork",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A persisted entity kind.
pub trait Entity: Clone + Debug + Serialize {
    const KIND: EntityKind;

    /// Checks field-level invariants. Reference resolution is not part of this.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidArgument`] naming the first offending field.
    fn validate(&self) -> DomainResult<()>;

    /// Foreign keys held by this row, paired with the referenced raw id.
    fn references(&self) -> Vec<(ForeignKey, i64)> {
        Vec::new()
    }
}

/// A row as held by the store: its assigned id next to the entity fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stored<E> {
    pub id: Id<E>,
    #[serde(flatten)]
    pub entity: E,
}

impl<E> Stored<E> {
    #[must_use]
    pub fn new(id: Id<E>, entity: E) -> Self {
        Self { id, entity }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Color {
    Green,
    Red,
    Black,
    Yellow,
    Brown,
}

impl Color {
    pub const ALL: [Self; 5] = [Self::Green, Self::Red, Self::Black, Self::Yellow, Self::Brown];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Green => "GREEN",
            Self::Red => "RED",
            Self::Black => "BLACK",
            Self::Yellow => "YELLOW",
            Self::Brown => "BROWN",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|color| color.as_str() == value)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Country {
    UnitedKingdom,
    Germany,
    France,
    India,
    Japan,
}

impl Country {
    pub const ALL: [Self; 5] =
        [Self::UnitedKingdom, Self::Germany, Self::France, Self::India, Self::Japan];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnitedKingdom => "UNITED_KINGDOM",
            Self::Germany => "GERMANY",
            Self::France => "FRANCE",
            Self::India => "INDIA",
            Self::Japan => "JAPAN",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|country| country.as_str() == value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f32,
    #[serde(default)]
    pub y: f32,
}

impl Entity for Coordinates {
    const KIND: EntityKind = EntityKind::Coordinates;

    fn validate(&self) -> DomainResult<()> {
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(invalid("coordinates x and y MUST be finite"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: i32,
    pub name: String,
}

impl Entity for Location {
    const KIND: EntityKind = EntityKind::Location;

    fn validate(&self) -> DomainResult<()> {
        if !self.x.is_finite() {
            return Err(invalid("location x MUST be finite"));
        }
        require_name("location", &self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discipline {
    pub name: String,
    pub practice_hours: i64,
    pub labs_count: i64,
}

impl Entity for Discipline {
    const KIND: EntityKind = EntityKind::Discipline;

    fn validate(&self) -> DomainResult<()> {
        require_name("discipline", &self.name)?;
        if self.practice_hours < 0 {
            return Err(invalid("discipline practice_hours MUST be >= 0"));
        }
        if self.labs_count < 0 {
            return Err(invalid("discipline labs_count MUST be >= 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub eye_color: Option<Color>,
    pub hair_color: Color,
    pub weight: f64,
    pub nationality: Option<Country>,
    pub location: Option<Id<Location>>,
}

impl Entity for Person {
    const KIND: EntityKind = EntityKind::Person;

    fn validate(&self) -> DomainResult<()> {
        require_name("person", &self.name)?;
        if !self.weight.is_finite() || self.weight <= 0.0 {
            return Err(invalid("person weight MUST be > 0"));
        }
        Ok(())
    }

    fn references(&self) -> Vec<(ForeignKey, i64)> {
        self.location.map(|id| (ForeignKey::PersonLocation, id.get())).into_iter().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabWork {
    pub name: String,
    pub description: Option<String>,
    pub difficulty: Difficulty,
    pub minimal_point: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub creation_date: OffsetDateTime,
    pub coordinates: Id<Coordinates>,
    pub author: Option<Id<Person>>,
    pub discipline: Option<Id<Discipline>>,
}

impl Entity for LabWork {
    const KIND: EntityKind = EntityKind::LabWork;

    fn validate(&self) -> DomainResult<()> {
        require_name("labwork", &self.name)?;
        if let Some(description) = &self.description {
            if description.chars().count() > DESCRIPTION_MAX_CHARS {
                return Err(invalid(&format!(
                    "labwork description MUST be at most {DESCRIPTION_MAX_CHARS} characters"
                )));
            }
        }
        if self.minimal_point <= 0 {
            return Err(invalid("labwork minimal_point MUST be > 0"));
        }
        Ok(())
    }

    fn references(&self) -> Vec<(ForeignKey, i64)> {
        let mut references = vec![(ForeignKey::LabWorkCoordinates, self.coordinates.get())];
        if let Some(author) = self.author {
            references.push((ForeignKey::LabWorkAuthor, author.get()));
        }
        if let Some(discipline) = self.discipline {
            references.push((ForeignKey::LabWorkDiscipline, discipline.get()));
        }
        references
    }
}

fn require_name(entity: &str, name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(invalid(&format!("{entity} name MUST be non-blank")));
    }
    Ok(())
}

fn invalid(message: &str) -> DomainError {
    DomainError::InvalidArgument(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invalid_contains<E: Entity>(entity: &E, needle: &str) {
        match entity.validate() {
            Err(DomainError::InvalidArgument(message)) => {
                assert!(message.contains(needle), "unexpected message: {message}");
            }
            other => panic!("expected invalid argument containing {needle:?}, got {other:?}"),
        }
    }

    fn fixture_labwork() -> LabWork {
        LabWork {
            name: "Sorting networks".to_string(),
            description: Some("Batcher odd-even merge".to_string()),
            difficulty: Difficulty::Insane,
            minimal_point: 12,
            creation_date: OffsetDateTime::UNIX_EPOCH,
            coordinates: Id::new(1),
            author: None,
            discipline: Some(Id::new(4)),
        }
    }

    #[test]
    fn id_serializes_as_bare_integer() {
        let id: Id<LabWork> = Id::new(42);
        let json = serde_json::to_string(&id)
            .unwrap_or_else(|err| panic!("id should serialize: {err}"));
        assert_eq!(json, "42");
        let back: Id<LabWork> = serde_json::from_str(&json)
            .unwrap_or_else(|err| panic!("id should deserialize: {err}"));
        assert_eq!(back, id);
    }

    #[test]
    fn stored_flattens_entity_fields_next_to_id() {
        let row = Stored::new(Id::new(7), Coordinates { x: 1.5, y: -2.0 });
        let value = serde_json::to_value(&row)
            .unwrap_or_else(|err| panic!("row should serialize: {err}"));
        assert_eq!(value, serde_json::json!({"id": 7, "x": 1.5, "y": -2.0}));
    }

    #[test]
    fn labwork_validation_rejects_bad_fields() {
        let mut blank = fixture_labwork();
        blank.name = "   ".to_string();
        assert_invalid_contains(&blank, "name MUST be non-blank");

        let mut zero = fixture_labwork();
        zero.minimal_point = 0;
        assert_invalid_contains(&zero, "minimal_point MUST be > 0");

        let mut long = fixture_labwork();
        long.description = Some("x".repeat(DESCRIPTION_MAX_CHARS + 1));
        assert_invalid_contains(&long, "description MUST be at most 7529");

        let mut boundary = fixture_labwork();
        boundary.description = Some("é".repeat(DESCRIPTION_MAX_CHARS));
        assert_eq!(boundary.validate(), Ok(()));
    }

    #[test]
    fn person_and_discipline_validation() {
        let person = Person {
            name: "Ada".to_string(),
            eye_color: None,
            hair_color: Color::Brown,
            weight: 0.0,
            nationality: Some(Country::UnitedKingdom),
            location: None,
        };
        assert_invalid_contains(&person, "weight MUST be > 0");

        let discipline =
            Discipline { name: "Algorithms".to_string(), practice_hours: -1, labs_count: 3 };
        assert_invalid_contains(&discipline, "practice_hours MUST be >= 0");

        let location = Location { x: f64::NAN, y: 1, name: "Lab".to_string() };
        assert_invalid_contains(&location, "x MUST be finite");
    }

    #[test]
    fn labwork_references_list_present_keys_only() {
        let references = fixture_labwork().references();
        assert_eq!(
            references,
            vec![(ForeignKey::LabWorkCoordinates, 1), (ForeignKey::LabWorkDiscipline, 4)]
        );
    }

    #[test]
    fn enum_names_parse_back() {
        for color in Color::ALL {
            assert_eq!(Color::parse(color.as_str()), Some(color));
        }
        for country in Country::ALL {
            assert_eq!(Country::parse(country.as_str()), Some(country));
        }
        assert_eq!(Country::parse("ATLANTIS"), None);
    }

    #[test]
    fn coordinates_y_defaults_to_zero() {
        let parsed: Coordinates = serde_json::from_str(r#"{"x": 3.0}"#)
            .unwrap_or_else(|err| panic!("coordinates should parse: {err}"));
        assert_eq!(parsed, Coordinates { x: 3.0, y: 0.0 });
    }
}
