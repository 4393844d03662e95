// Library interface for runlog modules
// This allows integration tests to access the core functionality

pub mod config;
pub mod database;
pub mod display;
pub mod error;
pub mod import;
pub mod logging;
pub mod models;
pub mod stats;

// Re-export commonly used types for convenience
pub use config::AppConfig;
pub use database::{Database, RunFilters, RunUpdate};
pub use error::{Result, RunLogError};
pub use import::fit::{FitImporter, FitSummary};
pub use import::{ImportManager, ImportReport, RejectedRow};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use models::{DistanceUnit, Run, RunType};
pub use stats::{PeriodKey, PeriodSummary, RunSummary};
