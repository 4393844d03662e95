//! FIT file importer
//!
//! Parses record messages with `fitparser` and condenses them into a
//! single summarized run: distance from the last recorded distance (FIT
//! stores meters), duration from the first and last timestamps, and the
//! mean of the sampled heart rates.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::{DateTime, Local, NaiveDateTime};
use fitparser::profile::MesgNum;
use fitparser::{FitDataRecord, Value};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::{Result, RunLogError};
use crate::import::{ImportFormat, ImportReport};
use crate::models::{DistanceUnit, Run, RunType};

/// FIT file importer for device-recorded runs
pub struct FitImporter;

/// Summary of the raw record messages in a FIT file, for inspection
#[derive(Debug, Clone, PartialEq)]
pub struct FitSummary {
    pub record_count: usize,
    pub first_timestamp: Option<NaiveDateTime>,
    pub last_timestamp: Option<NaiveDateTime>,
    /// Total distance in meters, as recorded by the device
    pub total_distance_meters: f64,
    pub avg_heart_rate: Option<Decimal>,
}

#[derive(Debug, Default)]
struct RecordAccumulator {
    record_count: usize,
    first_timestamp: Option<DateTime<Local>>,
    last_timestamp: Option<DateTime<Local>>,
    last_distance_meters: f64,
    heart_rate_sum: f64,
    heart_rate_samples: usize,
}

impl RecordAccumulator {
    fn feed(&mut self, record: &FitDataRecord) {
        self.record_count += 1;

        for data_field in record.fields() {
            match data_field.name() {
                "timestamp" => {
                    if let Value::Timestamp(ts) = data_field.value() {
                        if self.first_timestamp.is_none() {
                            self.first_timestamp = Some(*ts);
                        }
                        self.last_timestamp = Some(*ts);
                    }
                }
                "distance" => {
                    if let Some(meters) = value_as_f64(data_field.value()) {
                        self.last_distance_meters = self.last_distance_meters.max(meters);
                    }
                }
                "heart_rate" => {
                    if let Some(bpm) = value_as_f64(data_field.value()) {
                        self.heart_rate_sum += bpm;
                        self.heart_rate_samples += 1;
                    }
                }
                _ => {}
            }
        }
    }

    fn avg_heart_rate(&self) -> Option<Decimal> {
        if self.heart_rate_samples == 0 {
            return None;
        }
        let avg = self.heart_rate_sum / self.heart_rate_samples as f64;
        Some(Decimal::try_from(avg).unwrap_or(Decimal::ZERO).round_dp(1))
    }

    fn duration_minutes(&self) -> Decimal {
        match (self.first_timestamp, self.last_timestamp) {
            (Some(first), Some(last)) => {
                let seconds = (last - first).num_seconds().max(0);
                Decimal::from(seconds) / dec!(60)
            }
            _ => Decimal::ZERO,
        }
    }

    fn into_summary(self) -> FitSummary {
        FitSummary {
            record_count: self.record_count,
            first_timestamp: self.first_timestamp.map(|ts| ts.naive_local()),
            last_timestamp: self.last_timestamp.map(|ts| ts.naive_local()),
            total_distance_meters: self.last_distance_meters,
            avg_heart_rate: self.avg_heart_rate(),
        }
    }
}

impl FitImporter {
    pub fn new() -> Self {
        Self
    }

    fn accumulate(file_path: &Path) -> Result<RecordAccumulator> {
        let file = File::open(file_path)?;
        let mut reader = BufReader::new(file);

        let records: Vec<FitDataRecord> = fitparser::from_reader(&mut reader)
            .map_err(|e| RunLogError::Import(format!("Failed to parse FIT file: {e:?}")))?;

        let mut acc = RecordAccumulator::default();
        for record in records.iter().filter(|r| r.kind() == MesgNum::Record) {
            acc.feed(record);
        }

        if acc.record_count == 0 {
            return Err(RunLogError::Import(format!(
                "No record messages found in FIT file: {}",
                file_path.display()
            )));
        }

        Ok(acc)
    }

    /// Summarize the record messages of a FIT file without building a run
    pub fn summarize_file(file_path: &Path) -> Result<FitSummary> {
        Ok(Self::accumulate(file_path)?.into_summary())
    }
}

impl Default for FitImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportFormat for FitImporter {
    fn can_import(&self, file_path: &Path) -> bool {
        file_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("fit"))
            .unwrap_or(false)
    }

    fn import_file(&self, file_path: &Path) -> Result<ImportReport> {
        let acc = Self::accumulate(file_path)?;

        let date = acc
            .first_timestamp
            .map(|ts| ts.naive_local())
            .ok_or_else(|| {
                RunLogError::Import("FIT record messages carry no timestamps".to_string())
            })?;

        let distance_km = Decimal::try_from(acc.last_distance_meters / 1000.0)
            .unwrap_or(Decimal::ZERO)
            .round_dp(3);

        let run = Run::new(
            date,
            distance_km,
            DistanceUnit::Kilometers,
            acc.duration_minutes().round_dp(2),
            RunType::Easy,
        )?
        .with_heart_rate(acc.avg_heart_rate())
        .with_notes(Some(format!(
            "Imported from FIT: {}",
            file_path.file_name().unwrap_or_default().to_string_lossy()
        )));

        Ok(ImportReport {
            runs: vec![run],
            rejected: Vec::new(),
        })
    }

    fn format_name(&self) -> &'static str {
        "FIT"
    }
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::SInt8(v) => Some(f64::from(*v)),
        Value::UInt8(v) | Value::UInt8z(v) | Value::Byte(v) => Some(f64::from(*v)),
        Value::SInt16(v) => Some(f64::from(*v)),
        Value::UInt16(v) | Value::UInt16z(v) => Some(f64::from(*v)),
        Value::SInt32(v) => Some(f64::from(*v)),
        Value::UInt32(v) | Value::UInt32z(v) => Some(f64::from(*v)),
        Value::SInt64(v) => Some(*v as f64),
        Value::UInt64(v) | Value::UInt64z(v) => Some(*v as f64),
        Value::Float32(v) => Some(f64::from(*v)),
        Value::Float64(v) => Some(*v),
        _ => None,
    }
}
