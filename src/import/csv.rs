//! CSV run importer
//!
//! Header-driven parsing with partial-failure semantics: every row is
//! attempted, valid rows become runs, and bad rows are reported with their
//! original values. Required numeric fields reject the row on parse
//! failure; optional fields only reject when present but unparseable.

use std::collections::HashMap;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::{ReaderBuilder, StringRecord};
use rust_decimal::Decimal;

use crate::error::{Result, RunLogError};
use crate::import::{ImportFormat, ImportReport, RejectedRow};
use crate::models::{DistanceUnit, Run, RunType};

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// CSV importer for run logs
pub struct CsvImporter;

impl CsvImporter {
    pub fn new() -> Self {
        Self
    }

    fn parse_date(value: &str) -> Result<NaiveDateTime> {
        for format in &DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
                return Ok(dt);
            }
        }
        for format in &DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(value, format) {
                return Ok(date.and_time(NaiveTime::MIN));
            }
        }
        Err(RunLogError::Validation {
            field: "date",
            reason: format!("unable to parse date: {value:?}"),
        })
    }

    fn parse_required_decimal(field: &'static str, value: Option<&str>) -> Result<Decimal> {
        let raw = value.ok_or(RunLogError::Validation {
            field,
            reason: "missing required value".to_string(),
        })?;
        raw.parse::<Decimal>().map_err(|_| RunLogError::Validation {
            field,
            reason: format!("not a number: {raw:?}"),
        })
    }

    fn parse_optional_decimal(field: &'static str, value: Option<&str>) -> Result<Option<Decimal>> {
        match value {
            None => Ok(None),
            Some(raw) => raw
                .parse::<Decimal>()
                .map(Some)
                .map_err(|_| RunLogError::Validation {
                    field,
                    reason: format!("not a number: {raw:?}"),
                }),
        }
    }

    fn parse_row(columns: &HashMap<String, usize>, record: &StringRecord) -> Result<Run> {
        let field = |name: &str| -> Option<&str> {
            columns
                .get(name)
                .and_then(|&idx| record.get(idx))
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let date_raw = field("date").ok_or(RunLogError::Validation {
            field: "date",
            reason: "missing required value".to_string(),
        })?;
        let date = Self::parse_date(date_raw)?;

        let distance = Self::parse_required_decimal("distance", field("distance"))?;
        let duration = Self::parse_required_decimal("duration", field("duration"))?;

        // Unit falls back to kilometers when the column is absent or empty
        let unit = match field("unit") {
            Some(code) => DistanceUnit::from_code(code)?,
            None => DistanceUnit::Kilometers,
        };

        let run_type_raw = field("run_type").ok_or(RunLogError::Validation {
            field: "run_type",
            reason: "missing required value".to_string(),
        })?;
        let run_type = RunType::from_code(run_type_raw)?;

        let run = Run::new(date, distance, unit, duration, run_type)?
            .with_heart_rate(Self::parse_optional_decimal("heart_rate", field("heart_rate"))?)
            .with_elevation_gain(Self::parse_optional_decimal(
                "elevation_gain",
                field("elevation_gain"),
            )?)
            .with_pace(Self::parse_optional_decimal("pace", field("pace"))?)
            .with_location(field("location").map(str::to_string))
            .with_notes(field("notes").map(str::to_string));

        run.validate()?;
        Ok(run)
    }
}

impl Default for CsvImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportFormat for CsvImporter {
    fn can_import(&self, file_path: &Path) -> bool {
        file_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false)
    }

    fn import_file(&self, file_path: &Path) -> Result<ImportReport> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(file_path)
            .map_err(|e| RunLogError::Import(e.to_string()))?;

        let headers = reader
            .headers()
            .map_err(|e| RunLogError::Import(e.to_string()))?
            .clone();

        let columns: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.trim().to_lowercase(), idx))
            .collect();

        let mut report = ImportReport::default();

        // Header occupies line 1; data rows start at line 2. Line numbers
        // come from the reader position so quoted fields spanning several
        // physical lines do not shift later rows.
        for (row_idx, result) in reader.records().enumerate() {
            let fallback_line = row_idx + 2;
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    report.rejected.push(RejectedRow {
                        line: e
                            .position()
                            .map(|p| p.line() as usize)
                            .unwrap_or(fallback_line),
                        raw: String::new(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            let line = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(fallback_line);

            match Self::parse_row(&columns, &record) {
                Ok(run) => report.runs.push(run),
                Err(e) => {
                    tracing::warn!(line, error = %e, "skipping invalid CSV row");
                    report.rejected.push(RejectedRow {
                        line,
                        raw: record.iter().collect::<Vec<_>>().join(","),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    fn format_name(&self) -> &'static str {
        "CSV"
    }
}
