//! Presentation helpers for the CLI
//!
//! Turns engine output into text; no computation happens here. Unit labels
//! come from the records themselves, so the engine stays unit-agnostic.

use std::collections::BTreeMap;

use colored::*;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::import::fit::FitSummary;
use crate::models::Run;
use crate::stats::{PeriodKey, PeriodSummary, RunSummary};

const BAR_WIDTH: usize = 30;

/// Single-line rendering for run listings
pub fn run_line(run: &Run) -> String {
    format!(
        "{}. {} - {} {} in {} mins ({})",
        run.id.map_or_else(|| "-".to_string(), |id| id.to_string()),
        run.date.format("%Y-%m-%d"),
        run.distance,
        run.unit,
        run.duration,
        run.run_type,
    )
}

/// Multi-line rendering of every field of a run
pub fn run_details(run: &Run) -> String {
    let optional = |v: &Option<Decimal>| v.map_or_else(|| "-".to_string(), |d| d.to_string());
    let text = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());

    format!(
        "  Date: {}\n  Distance: {} {}\n  Duration: {} mins\n  Heart Rate: {}\n  \
         Elevation Gain: {}\n  Pace: {}\n  Run Type: {}\n  Location: {}\n  Notes: {}",
        run.date.format("%Y-%m-%d %H:%M"),
        run.distance,
        run.unit,
        run.duration,
        optional(&run.heart_rate),
        optional(&run.elevation_gain),
        optional(&run.pace),
        run.run_type,
        text(&run.location),
        text(&run.notes),
    )
}

/// Rendering for the overall summary
pub fn summary_text(summary: &RunSummary, unit_label: &str) -> String {
    format!(
        "{}\n  Total Runs: {}\n  Total Distance: {} {unit_label}\n  \
         Total Duration: {} mins\n  Average Distance: {:.2} {unit_label}\n  \
         Average Duration: {:.2} mins\n  Average Pace: {:.2} min/{unit_label}",
        "Run Summary:".bold(),
        summary.total_runs,
        summary.total_distance,
        summary.total_duration,
        summary.avg_distance,
        summary.avg_duration,
        summary.avg_pace,
    )
}

/// Rendering for the raw record summary of a FIT file
pub fn fit_summary_text(summary: &FitSummary, file_label: &str) -> String {
    let timestamp = |v: &Option<chrono::NaiveDateTime>| {
        v.map_or_else(
            || "-".to_string(),
            |ts| ts.format("%Y-%m-%d %H:%M:%S").to_string(),
        )
    };
    let heart_rate = summary
        .avg_heart_rate
        .map_or_else(|| "-".to_string(), |hr| hr.to_string());

    format!(
        "{}\n  Records: {}\n  First Timestamp: {}\n  Last Timestamp: {}\n  \
         Total Distance: {:.1} m\n  Average Heart Rate: {}",
        format!("FIT file {file_label}:").bold(),
        summary.record_count,
        timestamp(&summary.first_timestamp),
        timestamp(&summary.last_timestamp),
        summary.total_distance_meters,
        heart_rate,
    )
}

/// Per-bucket rows with a proportional distance bar
pub fn period_table(
    buckets: &BTreeMap<PeriodKey, PeriodSummary>,
    period_label: &str,
    unit_label: &str,
) -> String {
    let max_distance = buckets
        .values()
        .map(|b| b.total_distance)
        .max()
        .unwrap_or(Decimal::ZERO);

    let mut lines = vec![format!(
        "{:<10} {:>5} {:>12} {:>12} {:>10}",
        period_label.bold(),
        "runs",
        format!("dist ({unit_label})"),
        "dur (min)",
        "pace"
    )];

    for (key, bucket) in buckets {
        lines.push(format!(
            "{:<10} {:>5} {:>12} {:>12} {:>10.2}  {}",
            key.to_string(),
            bucket.runs,
            bucket.total_distance.to_string(),
            bucket.total_duration.to_string(),
            bucket.avg_pace,
            distance_bar(bucket.total_distance, max_distance).cyan(),
        ));
    }

    lines.join("\n")
}

fn distance_bar(distance: Decimal, max_distance: Decimal) -> String {
    if max_distance <= Decimal::ZERO {
        return String::new();
    }
    let ratio = distance / max_distance;
    let width = (ratio * Decimal::from(BAR_WIDTH))
        .round()
        .to_usize()
        .unwrap_or(0);
    "█".repeat(width.min(BAR_WIDTH))
}
