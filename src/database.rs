//! SQLite-backed run repository
//!
//! One `runs` table keyed by surrogate id; enumerations are persisted as
//! their string codes and decimal columns as TEXT so values round-trip
//! exactly.

use std::path::Path;

use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;

use crate::error::{Result, RunLogError};
use crate::models::{DistanceUnit, Run, RunType};
use crate::stats;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Database connection and run persistence
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create or open a database at the specified path
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Open an in-memory database, used by tests and dry runs
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "synchronous", "NORMAL")?;

        self.conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                distance TEXT NOT NULL,
                unit TEXT NOT NULL,
                duration TEXT NOT NULL,
                heart_rate TEXT,
                elevation_gain TEXT,
                pace TEXT,
                run_type TEXT NOT NULL,
                location TEXT,
                notes TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_runs_date ON runs (date)",
            [],
        )?;

        Ok(())
    }

    /// Insert a run and return it with its assigned id
    pub fn add_run(&mut self, run: &Run) -> Result<Run> {
        run.validate()?;

        self.conn.execute(
            r#"
            INSERT INTO runs (
                date, distance, unit, duration, heart_rate, elevation_gain,
                pace, run_type, location, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                run.date.format(DATE_FORMAT).to_string(),
                run.distance.to_string(),
                run.unit.code(),
                run.duration.to_string(),
                run.heart_rate.map(|v| v.to_string()),
                run.elevation_gain.map(|v| v.to_string()),
                run.pace.map(|v| v.to_string()),
                run.run_type.code(),
                run.location,
                run.notes,
            ],
        )?;

        let mut stored = run.clone();
        stored.id = Some(self.conn.last_insert_rowid());
        Ok(stored)
    }

    /// Load a run by id
    pub fn get_run_by_id(&self, id: i64) -> Result<Option<Run>> {
        let run = self
            .conn
            .query_row(
                r#"
                SELECT id, date, distance, unit, duration, heart_rate,
                       elevation_gain, pace, run_type, location, notes
                FROM runs
                WHERE id = ?1
                "#,
                params![id],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }

    /// List all runs ordered by date
    pub fn list_runs(&self) -> Result<Vec<Run>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, date, distance, unit, duration, heart_rate,
                   elevation_gain, pace, run_type, location, notes
            FROM runs
            ORDER BY date, id
            "#,
        )?;

        let run_iter = stmt.query_map([], run_from_row)?;

        let mut runs = Vec::new();
        for run in run_iter {
            runs.push(run?);
        }

        Ok(runs)
    }

    /// List runs matching the given filters, ordered by date
    pub fn list_runs_filtered(&self, filters: &RunFilters) -> Result<Vec<Run>> {
        let mut runs: Vec<Run> = self
            .list_runs()?
            .into_iter()
            .filter(|run| filters.matches(run))
            .collect();

        if let Some(limit) = filters.limit {
            runs.truncate(limit);
        }

        Ok(runs)
    }

    /// Replace the named fields of an existing run
    ///
    /// The merged record is re-validated before anything is written, so an
    /// update can never leave an invalid run in the store.
    pub fn update_run(&mut self, id: i64, changes: &RunUpdate) -> Result<Run> {
        let current = self
            .get_run_by_id(id)?
            .ok_or(RunLogError::NotFound { id })?;

        let updated = changes.apply(&current);
        updated.validate()?;

        self.conn.execute(
            r#"
            UPDATE runs SET
                date = ?1, distance = ?2, unit = ?3, duration = ?4,
                heart_rate = ?5, elevation_gain = ?6, pace = ?7,
                run_type = ?8, location = ?9, notes = ?10,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?11
            "#,
            params![
                updated.date.format(DATE_FORMAT).to_string(),
                updated.distance.to_string(),
                updated.unit.code(),
                updated.duration.to_string(),
                updated.heart_rate.map(|v| v.to_string()),
                updated.elevation_gain.map(|v| v.to_string()),
                updated.pace.map(|v| v.to_string()),
                updated.run_type.code(),
                updated.location,
                updated.notes,
                id,
            ],
        )?;

        // Read back so the caller sees exactly what was stored
        self.get_run_by_id(id)?
            .ok_or(RunLogError::NotFound { id })
    }

    /// Delete a run by id; deletion is always an explicit operation
    pub fn delete_run(&mut self, id: i64) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM runs WHERE id = ?1", params![id])?;

        if deleted == 0 {
            return Err(RunLogError::NotFound { id });
        }
        Ok(())
    }

    /// The fastest stored run, delegating ranking to the aggregation engine
    pub fn best_run(&self) -> Result<Option<Run>> {
        let runs = self.list_runs()?;
        Ok(stats::best_run(&runs).cloned())
    }

    /// Number of stored runs
    pub fn count_runs(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Run listing filters; `None` fields match everything
#[derive(Debug, Default, Clone)]
pub struct RunFilters {
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub run_type: Option<RunType>,
    pub limit: Option<usize>,
}

impl RunFilters {
    fn matches(&self, run: &Run) -> bool {
        if let Some(start) = self.start_date {
            if run.date < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if run.date > end {
                return false;
            }
        }
        if let Some(run_type) = self.run_type {
            if run.run_type != run_type {
                return false;
            }
        }
        true
    }
}

/// Field changes for an update operation; `None` keeps the stored value
#[derive(Debug, Default, Clone)]
pub struct RunUpdate {
    pub date: Option<NaiveDateTime>,
    pub distance: Option<Decimal>,
    pub unit: Option<DistanceUnit>,
    pub duration: Option<Decimal>,
    pub heart_rate: Option<Decimal>,
    pub elevation_gain: Option<Decimal>,
    pub pace: Option<Decimal>,
    pub run_type: Option<RunType>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

impl RunUpdate {
    /// Merge the changes onto an existing run
    pub fn apply(&self, run: &Run) -> Run {
        let mut updated = run.clone();
        if let Some(date) = self.date {
            updated.date = date;
        }
        if let Some(distance) = self.distance {
            updated.distance = distance;
        }
        if let Some(unit) = self.unit {
            updated.unit = unit;
        }
        if let Some(duration) = self.duration {
            updated.duration = duration;
        }
        if let Some(heart_rate) = self.heart_rate {
            updated.heart_rate = Some(heart_rate);
        }
        if let Some(elevation_gain) = self.elevation_gain {
            updated.elevation_gain = Some(elevation_gain);
        }
        if let Some(pace) = self.pace {
            updated.pace = Some(pace);
        }
        if let Some(run_type) = self.run_type {
            updated.run_type = run_type;
        }
        if let Some(ref location) = self.location {
            updated.location = Some(location.clone());
        }
        if let Some(ref notes) = self.notes {
            updated.notes = Some(notes.clone());
        }
        updated
    }
}

fn run_from_row(row: &Row) -> rusqlite::Result<Run> {
    Ok(Run {
        id: Some(row.get("id")?),
        date: parse_column(row, 1, |s| {
            NaiveDateTime::parse_from_str(s, DATE_FORMAT).map_err(Into::into)
        })?,
        distance: parse_column(row, 2, parse_decimal)?,
        unit: parse_column(row, 3, |s| DistanceUnit::from_code(s).map_err(Into::into))?,
        duration: parse_column(row, 4, parse_decimal)?,
        heart_rate: parse_optional_column(row, 5, parse_decimal)?,
        elevation_gain: parse_optional_column(row, 6, parse_decimal)?,
        pace: parse_optional_column(row, 7, parse_decimal)?,
        run_type: parse_column(row, 8, |s| RunType::from_code(s).map_err(Into::into))?,
        location: row.get("location")?,
        notes: row.get("notes")?,
    })
}

type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

fn parse_decimal(s: &str) -> std::result::Result<Decimal, BoxedError> {
    s.parse::<Decimal>().map_err(Into::into)
}

fn parse_column<T>(
    row: &Row,
    idx: usize,
    parse: impl Fn(&str) -> std::result::Result<T, BoxedError>,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e))
}

fn parse_optional_column<T>(
    row: &Row,
    idx: usize,
    parse: impl Fn(&str) -> std::result::Result<T, BoxedError>,
) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        Some(s) => parse(&s)
            .map(Some)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn sample_run() -> Run {
        Run::new(
            NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(7, 0, 0)
                .unwrap(),
            dec!(10),
            DistanceUnit::Miles,
            dec!(60),
            RunType::Long,
        )
        .unwrap()
        .with_heart_rate(Some(dec!(148)))
        .with_notes(Some("Good run".to_string()))
    }

    #[test]
    fn test_add_and_get_round_trip() {
        let mut db = Database::open_in_memory().unwrap();
        let stored = db.add_run(&sample_run()).unwrap();

        let id = stored.id.expect("id assigned on add");
        let loaded = db.get_run_by_id(id).unwrap().expect("run persisted");
        assert_eq!(loaded, stored);
    }

    #[test]
    fn test_get_missing_run_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_run_by_id(99).unwrap().is_none());
    }

    #[test]
    fn test_list_runs_ordered_by_date() {
        let mut db = Database::open_in_memory().unwrap();

        let later = Run::new(
            NaiveDate::from_ymd_opt(2025, 2, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
            dec!(5),
            DistanceUnit::Miles,
            dec!(40),
            RunType::Recovery,
        )
        .unwrap();

        db.add_run(&later).unwrap();
        db.add_run(&sample_run()).unwrap();

        let runs = db.list_runs().unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs[0].date < runs[1].date);
    }

    #[test]
    fn test_list_runs_filtered() {
        let mut db = Database::open_in_memory().unwrap();

        let recovery = Run::new(
            NaiveDate::from_ymd_opt(2025, 2, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
            dec!(5),
            DistanceUnit::Miles,
            dec!(40),
            RunType::Recovery,
        )
        .unwrap();

        db.add_run(&sample_run()).unwrap();
        db.add_run(&recovery).unwrap();

        let by_type = db
            .list_runs_filtered(&RunFilters {
                run_type: Some(RunType::Recovery),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_type.len(), 1);
        assert_eq!(by_type[0].run_type, RunType::Recovery);

        let from_february = db
            .list_runs_filtered(&RunFilters {
                start_date: NaiveDate::from_ymd_opt(2025, 1, 15)
                    .unwrap()
                    .and_hms_opt(0, 0, 0),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(from_february.len(), 1);
        assert_eq!(from_february[0].distance, dec!(5));

        let limited = db
            .list_runs_filtered(&RunFilters {
                limit: Some(1),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(limited.len(), 1);
        // Limit applies after the date ordering
        assert_eq!(limited[0].run_type, RunType::Long);
    }

    #[test]
    fn test_update_run_replaces_named_fields() {
        let mut db = Database::open_in_memory().unwrap();
        let stored = db.add_run(&sample_run()).unwrap();
        let id = stored.id.unwrap();

        let changes = RunUpdate {
            distance: Some(dec!(12)),
            notes: Some("Extended loop".to_string()),
            ..Default::default()
        };

        let updated = db.update_run(id, &changes).unwrap();
        assert_eq!(updated.distance, dec!(12));
        assert_eq!(updated.notes.as_deref(), Some("Extended loop"));
        // Untouched fields keep their stored values
        assert_eq!(updated.duration, dec!(60));
        assert_eq!(updated.heart_rate, Some(dec!(148)));
    }

    #[test]
    fn test_update_rejects_invalid_merge() {
        let mut db = Database::open_in_memory().unwrap();
        let stored = db.add_run(&sample_run()).unwrap();
        let id = stored.id.unwrap();

        let changes = RunUpdate {
            distance: Some(dec!(-3)),
            ..Default::default()
        };
        assert!(matches!(
            db.update_run(id, &changes),
            Err(RunLogError::Validation { field: "distance", .. })
        ));

        // Stored run unchanged after the rejected update
        let loaded = db.get_run_by_id(id).unwrap().unwrap();
        assert_eq!(loaded.distance, dec!(10));
    }

    #[test]
    fn test_update_missing_run_not_found() {
        let mut db = Database::open_in_memory().unwrap();
        let result = db.update_run(7, &RunUpdate::default());
        assert!(matches!(result, Err(RunLogError::NotFound { id: 7 })));
    }

    #[test]
    fn test_delete_run() {
        let mut db = Database::open_in_memory().unwrap();
        let stored = db.add_run(&sample_run()).unwrap();
        let id = stored.id.unwrap();

        db.delete_run(id).unwrap();
        assert!(db.get_run_by_id(id).unwrap().is_none());
        assert!(matches!(
            db.delete_run(id),
            Err(RunLogError::NotFound { .. })
        ));
    }

    #[test]
    fn test_best_run_delegates_to_engine() {
        let mut db = Database::open_in_memory().unwrap();
        assert!(db.best_run().unwrap().is_none());

        let slow = sample_run(); // 6.0 min/mi
        let fast = Run::new(
            NaiveDate::from_ymd_opt(2025, 1, 3)
                .unwrap()
                .and_hms_opt(7, 0, 0)
                .unwrap(),
            dec!(5),
            DistanceUnit::Miles,
            dec!(27.5),
            RunType::Tempo,
        )
        .unwrap(); // 5.5 min/mi

        db.add_run(&slow).unwrap();
        let stored_fast = db.add_run(&fast).unwrap();

        let best = db.best_run().unwrap().unwrap();
        assert_eq!(best.id, stored_fast.id);
    }

    #[test]
    fn test_count_runs() {
        let mut db = Database::open_in_memory().unwrap();
        assert_eq!(db.count_runs().unwrap(), 0);
        db.add_run(&sample_run()).unwrap();
        assert_eq!(db.count_runs().unwrap(), 1);
    }

    #[test]
    fn test_add_rejects_invalid_run() {
        let mut db = Database::open_in_memory().unwrap();
        let mut bad = sample_run();
        bad.duration = dec!(-5);
        assert!(db.add_run(&bad).is_err());
        assert_eq!(db.count_runs().unwrap(), 0);
    }
}
