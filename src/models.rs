use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RunLogError};

/// Unit of measurement for distance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistanceUnit {
    #[serde(rename = "mi")]
    Miles,
    #[serde(rename = "km")]
    Kilometers,
}

impl DistanceUnit {
    /// String code used for persistence and display ("mi" / "km")
    pub fn code(&self) -> &'static str {
        match self {
            DistanceUnit::Miles => "mi",
            DistanceUnit::Kilometers => "km",
        }
    }

    /// Parse from a string code, rejecting anything outside the closed set
    pub fn from_code(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mi" | "mile" | "miles" => Ok(DistanceUnit::Miles),
            "km" | "kilometer" | "kilometers" => Ok(DistanceUnit::Kilometers),
            _ => Err(RunLogError::InvalidEnumValue {
                field: "unit",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Run types for categorizing training sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunType {
    Easy,
    Long,
    Interval,
    Tempo,
    Race,
    Recovery,
}

impl RunType {
    /// String code used for persistence ("Easy" / "Long" / ...)
    pub fn code(&self) -> &'static str {
        match self {
            RunType::Easy => "Easy",
            RunType::Long => "Long",
            RunType::Interval => "Interval",
            RunType::Tempo => "Tempo",
            RunType::Race => "Race",
            RunType::Recovery => "Recovery",
        }
    }

    /// Parse from a string code, rejecting anything outside the closed set
    pub fn from_code(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(RunType::Easy),
            "long" => Ok(RunType::Long),
            "interval" => Ok(RunType::Interval),
            "tempo" => Ok(RunType::Tempo),
            "race" => Ok(RunType::Race),
            "recovery" => Ok(RunType::Recovery),
            _ => Err(RunLogError::InvalidEnumValue {
                field: "run_type",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for RunType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// One logged run
///
/// The aggregation engine treats runs as read-only; mutation happens only
/// through the repository's explicit update operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Unique identifier, assigned by the store on creation
    pub id: Option<i64>,

    /// Calendar timestamp of the run (date + optional time-of-day)
    pub date: NaiveDateTime,

    /// Distance covered, in `unit`
    pub distance: Decimal,

    /// Unit of measurement (mi/km)
    pub unit: DistanceUnit,

    /// Duration in minutes
    pub duration: Decimal,

    /// Average heart rate in bpm
    pub heart_rate: Option<Decimal>,

    /// Elevation gain (same distance unit family)
    pub elevation_gain: Option<Decimal>,

    /// Recorded pace in minutes per unit distance; derivable from
    /// duration/distance when absent
    pub pace: Option<Decimal>,

    /// Type of run
    pub run_type: RunType,

    /// Run location
    pub location: Option<String>,

    /// Free-text notes
    pub notes: Option<String>,
}

impl Run {
    /// Construct a validated run with the required fields; optional fields
    /// start empty and can be attached with the `with_*` builders.
    pub fn new(
        date: NaiveDateTime,
        distance: Decimal,
        unit: DistanceUnit,
        duration: Decimal,
        run_type: RunType,
    ) -> Result<Self> {
        let run = Run {
            id: None,
            date,
            distance,
            unit,
            duration,
            heart_rate: None,
            elevation_gain: None,
            pace: None,
            run_type,
            location: None,
            notes: None,
        };
        run.validate()?;
        Ok(run)
    }

    pub fn with_heart_rate(mut self, heart_rate: Option<Decimal>) -> Self {
        self.heart_rate = heart_rate;
        self
    }

    pub fn with_elevation_gain(mut self, elevation_gain: Option<Decimal>) -> Self {
        self.elevation_gain = elevation_gain;
        self
    }

    pub fn with_pace(mut self, pace: Option<Decimal>) -> Self {
        self.pace = pace;
        self
    }

    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    /// Check numeric field invariants
    ///
    /// Called at every construction boundary (import, CLI input, repository
    /// update) so invalid values are rejected rather than silently stored.
    pub fn validate(&self) -> Result<()> {
        if self.distance < Decimal::ZERO {
            return Err(RunLogError::Validation {
                field: "distance",
                reason: format!("must be non-negative, got {}", self.distance),
            });
        }
        if self.duration < Decimal::ZERO {
            return Err(RunLogError::Validation {
                field: "duration",
                reason: format!("must be non-negative, got {}", self.duration),
            });
        }
        if let Some(hr) = self.heart_rate {
            if hr < Decimal::ZERO {
                return Err(RunLogError::Validation {
                    field: "heart_rate",
                    reason: format!("must be non-negative, got {}", hr),
                });
            }
        }
        if let Some(pace) = self.pace {
            if pace < Decimal::ZERO {
                return Err(RunLogError::Validation {
                    field: "pace",
                    reason: format!("must be non-negative, got {}", pace),
                });
            }
        }
        Ok(())
    }

    /// Pace in minutes per unit distance, derived from duration and distance
    ///
    /// A zero-distance record carries no pace information, so it reports 0
    /// and is excluded from pace-based rankings by the callers.
    pub fn calculated_pace(&self) -> Decimal {
        if self.distance > Decimal::ZERO {
            self.duration / self.distance
        } else {
            Decimal::ZERO
        }
    }
}
