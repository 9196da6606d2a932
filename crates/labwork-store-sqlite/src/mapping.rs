use labwork_core::{
    Color, Coordinates, Country, Difficulty, Discipline, Entity, Id, LabWork, Location, Person,
};
use rusqlite::types::{Type, Value};
use rusqlite::Row;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Column mapping for an entity table. The table name is `Entity::KIND.as_str()`
/// and every table has an `INTEGER PRIMARY KEY` column named `id`.
pub trait SqlEntity: Entity {
    /// Columns other than `id`, in the order used by [`SqlEntity::to_params`].
    const COLUMNS: &'static [&'static str];

    /// Decodes a row selected as `id, COLUMNS...`.
    ///
    /// # Errors
    /// Returns a conversion error when a stored value is out of domain.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// # Errors
    /// Returns a conversion error when a field cannot be encoded.
    fn to_params(&self) -> rusqlite::Result<Vec<Value>>;
}

impl SqlEntity for Coordinates {
    const COLUMNS: &'static [&'static str] = &["x", "y"];

    #[allow(clippy::cast_possible_truncation)]
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        // Written from f32, so narrowing is exact.
        Ok(Self { x: row.get::<_, f64>(1)? as f32, y: row.get::<_, f64>(2)? as f32 })
    }

    fn to_params(&self) -> rusqlite::Result<Vec<Value>> {
        Ok(vec![Value::Real(f64::from(self.x)), Value::Real(f64::from(self.y))])
    }
}

impl SqlEntity for Location {
    const COLUMNS: &'static [&'static str] = &["x", "y", "name"];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self { x: row.get(1)?, y: row.get(2)?, name: row.get(3)? })
    }

    fn to_params(&self) -> rusqlite::Result<Vec<Value>> {
        Ok(vec![
            Value::Real(self.x),
            Value::Integer(i64::from(self.y)),
            Value::Text(self.name.clone()),
        ])
    }
}

impl SqlEntity for Discipline {
    const COLUMNS: &'static [&'static str] = &["name", "practice_hours", "labs_count"];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self { name: row.get(1)?, practice_hours: row.get(2)?, labs_count: row.get(3)? })
    }

    fn to_params(&self) -> rusqlite::Result<Vec<Value>> {
        Ok(vec![
            Value::Text(self.name.clone()),
            Value::Integer(self.practice_hours),
            Value::Integer(self.labs_count),
        ])
    }
}

impl SqlEntity for Person {
    const COLUMNS: &'static [&'static str] =
        &["name", "eye_color", "hair_color", "weight", "nationality", "location_id"];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get(1)?,
            eye_color: optional_enum(row, 2, Color::parse)?,
            hair_color: required_enum(row, 3, Color::parse)?,
            weight: row.get(4)?,
            nationality: optional_enum(row, 5, Country::parse)?,
            location: row.get::<_, Option<i64>>(6)?.map(Id::new),
        })
    }

    fn to_params(&self) -> rusqlite::Result<Vec<Value>> {
        Ok(vec![
            Value::Text(self.name.clone()),
            optional_text(self.eye_color.map(Color::as_str)),
            Value::Text(self.hair_color.as_str().to_string()),
            Value::Real(self.weight),
            optional_text(self.nationality.map(Country::as_str)),
            optional_integer(self.location.map(Id::get)),
        ])
    }
}

impl SqlEntity for LabWork {
    const COLUMNS: &'static [&'static str] = &[
        "name",
        "description",
        "difficulty",
        "minimal_point",
        "creation_date",
        "coordinates_id",
        "author_id",
        "discipline_id",
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let creation_date_raw: String = row.get(5)?;
        let creation_date = OffsetDateTime::parse(&creation_date_raw, &Rfc3339)
            .map_err(|err| {
                rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(err))
            })?;

        Ok(Self {
            name: row.get(1)?,
            description: row.get(2)?,
            difficulty: required_enum(row, 3, Difficulty::parse)?,
            minimal_point: row.get(4)?,
            creation_date,
            coordinates: Id::new(row.get(6)?),
            author: row.get::<_, Option<i64>>(7)?.map(Id::new),
            discipline: row.get::<_, Option<i64>>(8)?.map(Id::new),
        })
    }

    fn to_params(&self) -> rusqlite::Result<Vec<Value>> {
        let creation_date = self
            .creation_date
            .format(&Rfc3339)
            .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))?;

        Ok(vec![
            Value::Text(self.name.clone()),
            self.description.clone().map_or(Value::Null, Value::Text),
            Value::Text(self.difficulty.as_str().to_string()),
            Value::Integer(self.minimal_point),
            Value::Text(creation_date),
            Value::Integer(self.coordinates.get()),
            optional_integer(self.author.map(Id::get)),
            optional_integer(self.discipline.map(Id::get)),
        ])
    }
}

/// `CASE` expression ranking the `difficulty` column, generated from [`Difficulty::ALL`].
#[must_use]
pub fn difficulty_rank_sql() -> String {
    let arms = Difficulty::ALL
        .iter()
        .map(|level| format!("WHEN '{}' THEN {}", level.as_str(), level.rank()))
        .collect::<Vec<_>>()
        .join(" ");
    format!("(CASE difficulty {arms} END)")
}

fn required_enum<T>(
    row: &Row<'_>,
    index: usize,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let raw: String = row.get(index)?;
    parse(&raw).ok_or_else(|| invalid_text(index, &raw))
}

fn optional_enum<T>(
    row: &Row<'_>,
    index: usize,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<Option<T>> {
    match row.get::<_, Option<String>>(index)? {
        Some(raw) => parse(&raw).map(Some).ok_or_else(|| invalid_text(index, &raw)),
        None => Ok(None),
    }
}

fn invalid_text(index: usize, raw: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        index,
        Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("unknown enum value in column {index}: {raw}"),
        )),
    )
}

fn optional_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |text| Value::Text(text.to_string()))
}

fn optional_integer(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_rank_sql_lists_every_level_in_order() {
        assert_eq!(
            difficulty_rank_sql(),
            "(CASE difficulty WHEN 'VERY_EASY' THEN 0 WHEN 'EASY' THEN 1 \
             WHEN 'INSANE' THEN 2 WHEN 'HOPELESS' THEN 3 END)"
        );
    }

    #[test]
    fn params_match_declared_columns() -> rusqlite::Result<()> {
        let person = Person {
            name: "Linus".to_string(),
            eye_color: None,
            hair_color: Color::Yellow,
            weight: 80.0,
            nationality: Some(Country::France),
            location: None,
        };
        let params = person.to_params()?;
        assert_eq!(params.len(), Person::COLUMNS.len());
        assert_eq!(params[1], Value::Null);
        assert_eq!(params[4], Value::Text("FRANCE".to_string()));

        let lab_work = LabWork {
            name: "Paging".to_string(),
            description: None,
            difficulty: Difficulty::Easy,
            minimal_point: 3,
            creation_date: OffsetDateTime::UNIX_EPOCH,
            coordinates: Id::new(2),
            author: None,
            discipline: Some(Id::new(5)),
        };
        let params = lab_work.to_params()?;
        assert_eq!(params.len(), LabWork::COLUMNS.len());
        assert_eq!(params[4], Value::Text("1970-01-01T00:00:00Z".to_string()));
        assert_eq!(params[7], Value::Integer(5));
        Ok(())
    }
}
