use labwork_core::{
    render_order, EntityStore, ForeignKey, Id, LabWork, OrderTerm, RankKey, Repository,
    StoreError, StoreResult, Stored,
};
use rusqlite::{params, params_from_iter, ErrorCode, Row, Transaction};

use crate::mapping::{difficulty_rank_sql, SqlEntity};

/// One open transaction. Dropping it without [`SqliteTx::commit`] rolls back.
pub struct SqliteTx<'c> {
    tx: Transaction<'c>,
}

impl<'c> SqliteTx<'c> {
    pub(crate) fn new(tx: Transaction<'c>) -> Self {
        Self { tx }
    }

    pub(crate) fn commit(self) -> StoreResult<()> {
        self.tx.commit().map_err(store_err)
    }
}

/// Maps a driver error, keeping constraint failures apart from other backend failures.
pub(crate) fn store_err(err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(code, message)
            if code.code == ErrorCode::ConstraintViolation =>
        {
            StoreError::IntegrityViolation(message.unwrap_or_else(|| code.to_string()))
        }
        other => StoreError::Backend(other.to_string()),
    }
}

fn decode_stored<E: SqlEntity>(row: &Row<'_>) -> rusqlite::Result<Stored<E>> {
    Ok(Stored::new(Id::new(row.get(0)?), E::from_row(row)?))
}

fn select_sql<E: SqlEntity>() -> String {
    format!("SELECT id, {} FROM {}", E::COLUMNS.join(", "), E::KIND.as_str())
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl<E: SqlEntity> Repository<E> for SqliteTx<'_> {
    fn find_all(&self) -> StoreResult<Vec<Stored<E>>> {
        let sql = format!("{} ORDER BY id ASC", select_sql::<E>());
        let mut stmt = self.tx.prepare(&sql).map_err(store_err)?;
        let rows = stmt.query_map([], decode_stored::<E>).map_err(store_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(store_err)
    }

    fn find_by_id(&self, id: Id<E>) -> StoreResult<Option<Stored<E>>> {
        let sql = format!("{} WHERE id = ?1", select_sql::<E>());
        let mut stmt = self.tx.prepare(&sql).map_err(store_err)?;
        let mut rows = stmt.query_map(params![id.get()], decode_stored::<E>).map_err(store_err)?;
        rows.next().transpose().map_err(store_err)
    }

    fn exists_by_id(&self, id: Id<E>) -> StoreResult<bool> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)", E::KIND.as_str());
        self.tx.query_row(&sql, params![id.get()], |row| row.get::<_, bool>(0)).map_err(store_err)
    }

    fn insert(&mut self, entity: E) -> StoreResult<Stored<E>> {
        let placeholders =
            (1..=E::COLUMNS.len()).map(|index| format!("?{index}")).collect::<Vec<_>>().join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            E::KIND.as_str(),
            E::COLUMNS.join(", ")
        );
        let values = entity.to_params().map_err(store_err)?;
        self.tx.execute(&sql, params_from_iter(values)).map_err(store_err)?;
        Ok(Stored::new(Id::new(self.tx.last_insert_rowid()), entity))
    }

    fn update(&mut self, row: &Stored<E>) -> StoreResult<()> {
        let assignments = E::COLUMNS
            .iter()
            .enumerate()
            .map(|(index, column)| format!("{column} = ?{}", index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {assignments} WHERE id = ?{}",
            E::KIND.as_str(),
            E::COLUMNS.len() + 1
        );
        let mut values = row.entity.to_params().map_err(store_err)?;
        values.push(rusqlite::types::Value::Integer(row.id.get()));
        let changed = self.tx.execute(&sql, params_from_iter(values)).map_err(store_err)?;
        if changed == 0 {
            return Err(StoreError::Backend(format!(
                "no {} row with id {} to update",
                E::KIND.as_str(),
                row.id
            )));
        }
        Ok(())
    }

    fn delete_by_id(&mut self, id: Id<E>) -> StoreResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", E::KIND.as_str());
        let changed = self.tx.execute(&sql, params![id.get()]).map_err(store_err)?;
        Ok(changed > 0)
    }
}

impl EntityStore for SqliteTx<'_> {
    fn exists_by_foreign_key(&self, fk: ForeignKey, parent_id: i64) -> StoreResult<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1)",
            fk.owner().as_str(),
            fk.column()
        );
        self.tx.query_row(&sql, params![parent_id], |row| row.get::<_, bool>(0)).map_err(store_err)
    }

    fn sum_minimal_point(&self) -> StoreResult<i64> {
        self.tx
            .query_row("SELECT COALESCE(SUM(minimal_point), 0) FROM lab_work", [], |row| {
                row.get::<_, i64>(0)
            })
            .map_err(store_err)
    }

    fn count_by_author_id_greater_than(&self, author_id: i64) -> StoreResult<u64> {
        let count = self
            .tx
            .query_row(
                "SELECT COUNT(*) FROM lab_work WHERE author_id IS NOT NULL AND author_id > ?1",
                params![author_id],
                |row| row.get::<_, i64>(0),
            )
            .map_err(store_err)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn delete_by_minimal_point(&mut self, value: i64) -> StoreResult<u64> {
        let changed = self
            .tx
            .execute("DELETE FROM lab_work WHERE minimal_point = ?1", params![value])
            .map_err(store_err)?;
        Ok(u64::try_from(changed).unwrap_or(u64::MAX))
    }

    fn find_ranked(&self, order: &[OrderTerm], limit: usize) -> StoreResult<Vec<Stored<LabWork>>> {
        tracing::debug!(order = %render_order(order), limit, "ranked lab work query");
        let sql = format!(
            "{} ORDER BY {} LIMIT ?1",
            select_sql::<LabWork>(),
            order_by_sql(order)
        );
        let mut stmt = self.tx.prepare(&sql).map_err(store_err)?;
        let rows = stmt
            .query_map(params![to_i64(limit)], decode_stored::<LabWork>)
            .map_err(store_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(store_err)
    }
}

/// Renders an ordering as SQL. Without an `id` term it ends with `id ASC`, the
/// in-memory comparator's fallback.
pub(crate) fn order_by_sql(order: &[OrderTerm]) -> String {
    let mut terms = order
        .iter()
        .map(|term| {
            let expression = match term.key {
                RankKey::DifficultyRank => difficulty_rank_sql(),
                RankKey::MinimalPoint => "minimal_point".to_string(),
                RankKey::Id => "id".to_string(),
            };
            format!("{expression} {}", term.direction.as_str().to_uppercase())
        })
        .collect::<Vec<_>>();
    if !order.iter().any(|term| term.key == RankKey::Id) {
        terms.push("id ASC".to_string());
    }
    terms.join(", ")
}

#[cfg(test)]
mod tests {
    use labwork_core::{Direction, HARDEST_FIRST};

    use super::*;

    #[test]
    fn order_by_sql_renders_hardest_first() {
        let sql = order_by_sql(&HARDEST_FIRST);
        assert!(sql.starts_with("(CASE difficulty WHEN 'VERY_EASY' THEN 0"));
        assert!(sql.ends_with("END) DESC, minimal_point DESC, id DESC"));
    }

    #[test]
    fn order_by_sql_appends_id_fallback_only_without_id_term() {
        let by_points = [OrderTerm { key: RankKey::MinimalPoint, direction: Direction::Asc }];
        assert_eq!(order_by_sql(&by_points), "minimal_point ASC, id ASC");

        let by_id = [OrderTerm { key: RankKey::Id, direction: Direction::Desc }];
        assert_eq!(order_by_sql(&by_id), "id DESC");
    }

    #[test]
    fn constraint_failures_map_to_integrity_violation() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY),
            Some("FOREIGN KEY constraint failed".to_string()),
        );
        assert_eq!(
            store_err(err),
            StoreError::IntegrityViolation("FOREIGN KEY constraint failed".to_string())
        );
        assert!(matches!(store_err(rusqlite::Error::QueryReturnedNoRows), StoreError::Backend(_)));
    }
}
