use std::path::Path;

use anyhow::{anyhow, Context, Result};
use labwork_core::StoreError;
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

mod mapping;
mod tx;

pub use mapping::{difficulty_rank_sql, SqlEntity};
pub use tx::SqliteTx;

use tx::store_err;

const LATEST_SCHEMA_VERSION: i64 = 1;

const CREATE_SCHEMA_MIGRATIONS_SQL: &str = r"
CREATE TABLE IF NOT EXISTS schema_migrations (
  version INTEGER PRIMARY KEY,
  applied_at TEXT NOT NULL
);
";

const MIGRATION_001_SQL: &str = r"
CREATE TABLE IF NOT EXISTS coordinates (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  x REAL NOT NULL,
  y REAL NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS location (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  x REAL NOT NULL,
  y INTEGER NOT NULL,
  name TEXT NOT NULL CHECK (length(trim(name)) > 0)
);

CREATE TABLE IF NOT EXISTS discipline (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL CHECK (length(trim(name)) > 0),
  practice_hours INTEGER NOT NULL CHECK (practice_hours >= 0),
  labs_count INTEGER NOT NULL CHECK (labs_count >= 0)
);

CREATE TABLE IF NOT EXISTS person (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL CHECK (length(trim(name)) > 0),
  eye_color TEXT CHECK (eye_color IN ('GREEN','RED','BLACK','YELLOW','BROWN')),
  hair_color TEXT NOT NULL CHECK (hair_color IN ('GREEN','RED','BLACK','YELLOW','BROWN')),
  weight REAL NOT NULL CHECK (weight > 0),
  nationality TEXT CHECK (nationality IN ('UNITED_KINGDOM','GERMANY','FRANCE','INDIA','JAPAN')),
  location_id INTEGER,
  FOREIGN KEY (location_id) REFERENCES location(id) ON DELETE RESTRICT
);

CREATE TABLE IF NOT EXISTS lab_work (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL CHECK (length(trim(name)) > 0),
  description TEXT CHECK (description IS NULL OR length(description) <= 7529),
  difficulty TEXT NOT NULL CHECK (difficulty IN ('VERY_EASY','EASY','INSANE','HOPELESS')),
  minimal_point INTEGER NOT NULL CHECK (minimal_point > 0),
  creation_date TEXT NOT NULL,
  coordinates_id INTEGER NOT NULL,
  author_id INTEGER,
  discipline_id INTEGER,
  FOREIGN KEY (coordinates_id) REFERENCES coordinates(id) ON DELETE RESTRICT,
  FOREIGN KEY (author_id) REFERENCES person(id) ON DELETE RESTRICT,
  FOREIGN KEY (discipline_id) REFERENCES discipline(id) ON DELETE RESTRICT
);

CREATE INDEX IF NOT EXISTS idx_person_location ON person(location_id);
CREATE INDEX IF NOT EXISTS idx_lab_work_coordinates ON lab_work(coordinates_id);
CREATE INDEX IF NOT EXISTS idx_lab_work_author ON lab_work(author_id);
CREATE INDEX IF NOT EXISTS idx_lab_work_discipline ON lab_work(discipline_id);
CREATE INDEX IF NOT EXISTS idx_lab_work_minimal_point ON lab_work(minimal_point);
";

pub struct SqliteStore {
    conn: Connection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaStatus {
    pub current_version: i64,
    pub target_version: i64,
    pub pending_versions: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForeignKeyViolation {
    pub table: String,
    pub rowid: i64,
    pub parent: String,
    pub fk_index: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntegrityReport {
    pub quick_check_ok: bool,
    pub quick_check_message: String,
    pub foreign_key_violations: Vec<ForeignKeyViolation>,
    pub schema_status: SchemaStatus,
}

impl SqliteStore {
    /// Open a SQLite-backed entity store and configure required runtime pragmas.
    ///
    /// # Errors
    /// Returns an error when the database cannot be opened or pragmas cannot be applied.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open sqlite database at {}", path.display()))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to configure sqlite pragmas")?;

        Ok(Self { conn })
    }

    /// Report current and target schema versions plus pending migrations.
    ///
    /// # Errors
    /// Returns an error when schema metadata cannot be read or initialized.
    pub fn schema_status(&self) -> Result<SchemaStatus> {
        self.conn
            .execute_batch(CREATE_SCHEMA_MIGRATIONS_SQL)
            .context("failed to apply schema_migrations table")?;
        let current_version = current_schema_version(&self.conn)?;
        let pending_versions = if current_version < LATEST_SCHEMA_VERSION {
            ((current_version + 1)..=LATEST_SCHEMA_VERSION).collect::<Vec<_>>()
        } else {
            Vec::new()
        };

        Ok(SchemaStatus {
            current_version,
            target_version: LATEST_SCHEMA_VERSION,
            pending_versions,
        })
    }

    /// Apply all forward migrations up to the latest supported schema version.
    ///
    /// # Errors
    /// Returns an error when a migration step fails or the database is newer than this build.
    pub fn migrate(&mut self) -> Result<()> {
        self.conn
            .execute_batch(CREATE_SCHEMA_MIGRATIONS_SQL)
            .context("failed to apply schema_migrations table")?;

        let version = current_schema_version(&self.conn)?;
        if version > LATEST_SCHEMA_VERSION {
            return Err(anyhow!(
                "unsupported schema version {version}; expected {LATEST_SCHEMA_VERSION}"
            ));
        }

        if version < 1 {
            let tx = self.conn.transaction().context("failed to start migration v1 transaction")?;
            tx.execute_batch(MIGRATION_001_SQL).context("failed to apply migration v1")?;
            record_schema_version(&tx, 1)?;
            tx.commit().context("failed to commit migration v1")?;
            tracing::debug!(version = 1, "applied schema migration");
        }

        Ok(())
    }

    /// Run `f` inside a write transaction (`BEGIN IMMEDIATE`).
    ///
    /// The transaction commits only when `f` returns `Ok`; any other exit rolls it back.
    ///
    /// # Errors
    /// Propagates the error of `f`, or a [`StoreError`] when the transaction cannot
    /// be started or committed.
    pub fn transaction<T, E>(
        &mut self,
        f: impl FnOnce(&mut SqliteTx<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(store_err)?;
        let mut scope = SqliteTx::new(tx);
        let output = f(&mut scope)?;
        scope.commit()?;
        Ok(output)
    }

    /// Run `f` inside a deferred read transaction so it sees one consistent snapshot.
    ///
    /// # Errors
    /// Propagates the error of `f`, or a [`StoreError`] when the transaction cannot be started.
    pub fn read<T, E>(&self, f: impl FnOnce(&SqliteTx<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Deferred)
            .map_err(store_err)?;
        let scope = SqliteTx::new(tx);
        let output = f(&scope)?;
        scope.commit()?;
        Ok(output)
    }

    /// Run quick-check, foreign-key-check, and schema status health probes.
    ///
    /// # Errors
    /// Returns an error when any integrity probe query fails.
    pub fn integrity_check(&self) -> Result<IntegrityReport> {
        let quick_check_message: String = self
            .conn
            .query_row("PRAGMA quick_check", [], |row| row.get::<_, String>(0))
            .context("failed to run PRAGMA quick_check")?;

        let mut stmt = self
            .conn
            .prepare("PRAGMA foreign_key_check")
            .context("failed to prepare PRAGMA foreign_key_check")?;
        let rows = stmt.query_map([], |row| {
            Ok(ForeignKeyViolation {
                table: row.get(0)?,
                rowid: row.get(1)?,
                parent: row.get(2)?,
                fk_index: row.get(3)?,
            })
        })?;

        let mut foreign_key_violations = Vec::new();
        for row in rows {
            foreign_key_violations.push(row?);
        }

        let schema_status = self.schema_status()?;
        Ok(IntegrityReport {
            quick_check_ok: quick_check_message == "ok",
            quick_check_message,
            foreign_key_violations,
            schema_status,
        })
    }
}

fn current_schema_version(conn: &Connection) -> Result<i64> {
    let version = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_migrations", [], |row| {
            row.get::<_, i64>(0)
        })
        .context("failed to read current schema version")?;
    Ok(version)
}

fn record_schema_version(conn: &Connection, version: i64) -> Result<()> {
    let now = now_rfc3339()?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations(version, applied_at) VALUES (?1, ?2)",
        params![version, now],
    )
    .with_context(|| format!("failed to record migration version {version}"))?;
    Ok(())
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .context("failed to format RFC3339 timestamp")
}
