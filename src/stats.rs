//! Run statistics aggregation engine
//!
//! Pure functions over a slice of runs: totals, averages, extremum
//! selection, and weekly/monthly bucketed summaries. Nothing here touches
//! storage or I/O; callers fetch records from the repository and hand them
//! in as a slice.
//!
//! Records with zero distance are treated as "not a completed run": they
//! still count toward totals, but are excluded from every pace-based and
//! extremum ranking.

use std::collections::BTreeMap;

use chrono::Datelike;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{Result, RunLogError};
use crate::models::Run;

/// Aggregate statistics over a set of runs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub total_runs: usize,
    pub total_distance: Decimal,
    pub total_duration: Decimal,
    pub avg_distance: Decimal,
    pub avg_duration: Decimal,
    /// Distance-weighted average pace (total duration / total distance)
    pub avg_pace: Decimal,
}

/// Key for a weekly or monthly bucket
///
/// Orders by `(year, period)` as integers, so week 2 sorts before week 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PeriodKey {
    pub year: i32,
    pub period: u32,
}

impl std::fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.year, self.period)
    }
}

/// Per-bucket totals for weekly/monthly summaries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub runs: usize,
    pub total_distance: Decimal,
    pub total_duration: Decimal,
    /// Distance-weighted average pace; 0 when the bucket has no distance
    pub avg_pace: Decimal,
}

/// Pace of a single run in minutes per unit distance; 0 for zero-distance
/// records
pub fn calculated_pace(run: &Run) -> Decimal {
    run.calculated_pace()
}

/// Summarize totals and averages over all runs
///
/// Fails with `EmptyInput` on an empty slice: per-run averages are
/// undefined there and callers own the empty-state messaging.
pub fn summarize(runs: &[Run]) -> Result<RunSummary> {
    if runs.is_empty() {
        return Err(RunLogError::EmptyInput { operation: "summary" });
    }

    let total_runs = runs.len();
    let total_distance: Decimal = runs.iter().map(|r| r.distance).sum();
    let total_duration: Decimal = runs.iter().map(|r| r.duration).sum();
    let count = Decimal::from(total_runs);

    Ok(RunSummary {
        total_runs,
        total_distance,
        total_duration,
        avg_distance: total_distance / count,
        avg_duration: total_duration / count,
        avg_pace: weighted_pace(total_distance, total_duration),
    })
}

/// Distance-weighted average pace: total duration divided by total distance
///
/// This is the pace of the aggregate, not the arithmetic mean of per-run
/// paces; the two differ whenever run distances differ. Returns 0 when the
/// total distance is zero.
pub fn average_pace(runs: &[Run]) -> Decimal {
    let total_distance: Decimal = runs.iter().map(|r| r.distance).sum();
    let total_duration: Decimal = runs.iter().map(|r| r.duration).sum();
    weighted_pace(total_distance, total_duration)
}

/// The run with the fastest calculated pace among positive-distance runs
///
/// Ties break to the first occurrence in input order. Returns `None` when
/// no record has positive distance; that is a normal empty result, not an
/// error.
pub fn best_run(runs: &[Run]) -> Option<&Run> {
    select(runs, |candidate, current| {
        candidate.calculated_pace() < current.calculated_pace()
    })
}

/// The positive-distance run covering the greatest distance; ties break to
/// first occurrence
pub fn longest_run(runs: &[Run]) -> Option<&Run> {
    select(runs, |candidate, current| candidate.distance > current.distance)
}

/// The positive-distance run covering the least distance; ties break to
/// first occurrence
pub fn shortest_run(runs: &[Run]) -> Option<&Run> {
    select(runs, |candidate, current| candidate.distance < current.distance)
}

/// The run with the slowest calculated pace among positive-distance runs;
/// ties break to first occurrence
pub fn slowest_run(runs: &[Run]) -> Option<&Run> {
    select(runs, |candidate, current| {
        candidate.calculated_pace() > current.calculated_pace()
    })
}

/// Partition runs by ISO week of year and summarize each bucket
pub fn weekly_summary(runs: &[Run]) -> BTreeMap<PeriodKey, PeriodSummary> {
    bucket_summary(runs, |run| {
        let week = run.date.date().iso_week();
        PeriodKey {
            year: week.year(),
            period: week.week(),
        }
    })
}

/// Partition runs by calendar month and summarize each bucket
pub fn monthly_summary(runs: &[Run]) -> BTreeMap<PeriodKey, PeriodSummary> {
    bucket_summary(runs, |run| PeriodKey {
        year: run.date.year(),
        period: run.date.month(),
    })
}

fn weighted_pace(total_distance: Decimal, total_duration: Decimal) -> Decimal {
    if total_distance > Decimal::ZERO {
        total_duration / total_distance
    } else {
        Decimal::ZERO
    }
}

/// Pick a run by strict comparison so earlier records win ties
fn select<'a, F>(runs: &'a [Run], better: F) -> Option<&'a Run>
where
    F: Fn(&Run, &Run) -> bool,
{
    let mut selected: Option<&Run> = None;
    for run in runs.iter().filter(|r| r.distance > Decimal::ZERO) {
        match selected {
            None => selected = Some(run),
            Some(current) if better(run, current) => selected = Some(run),
            _ => {}
        }
    }
    selected
}

fn bucket_summary<F>(runs: &[Run], key_of: F) -> BTreeMap<PeriodKey, PeriodSummary>
where
    F: Fn(&Run) -> PeriodKey,
{
    let mut buckets: BTreeMap<PeriodKey, PeriodSummary> = BTreeMap::new();

    for run in runs {
        let entry = buckets.entry(key_of(run)).or_insert(PeriodSummary {
            runs: 0,
            total_distance: Decimal::ZERO,
            total_duration: Decimal::ZERO,
            avg_pace: Decimal::ZERO,
        });
        entry.runs += 1;
        entry.total_distance += run.distance;
        entry.total_duration += run.duration;
    }

    for summary in buckets.values_mut() {
        summary.avg_pace = weighted_pace(summary.total_distance, summary.total_duration);
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DistanceUnit, RunType};
    use chrono::{NaiveDate, NaiveDateTime};
    use rust_decimal_macros::dec;

    fn run_on(date: NaiveDateTime, distance: Decimal, duration: Decimal) -> Run {
        Run::new(date, distance, DistanceUnit::Miles, duration, RunType::Easy).unwrap()
    }

    fn day(year: i32, month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_calculated_pace_matches_ratio() {
        let run = run_on(day(2025, 1, 1), dec!(5), dec!(25));
        assert_eq!(calculated_pace(&run), dec!(5));
    }

    #[test]
    fn test_calculated_pace_zero_distance_is_zero() {
        let run = run_on(day(2025, 1, 1), dec!(0), dec!(25));
        assert_eq!(calculated_pace(&run), Decimal::ZERO);
    }

    #[test]
    fn test_summarize() {
        let runs = vec![
            run_on(day(2025, 1, 1), dec!(10), dec!(60)),
            run_on(day(2025, 1, 2), dec!(5), dec!(30)),
        ];
        let summary = summarize(&runs).unwrap();
        assert_eq!(summary.total_runs, 2);
        assert_eq!(summary.total_distance, dec!(15));
        assert_eq!(summary.total_duration, dec!(90));
        assert_eq!(summary.avg_distance, dec!(7.5));
        assert_eq!(summary.avg_duration, dec!(45));
        assert_eq!(summary.avg_pace, dec!(6));
    }

    #[test]
    fn test_summarize_empty_fails() {
        let result = summarize(&[]);
        assert!(matches!(
            result,
            Err(RunLogError::EmptyInput { operation: "summary" })
        ));
    }

    #[test]
    fn test_summarize_zero_total_distance_reports_zero_pace() {
        let runs = vec![run_on(day(2025, 1, 1), dec!(0), dec!(20))];
        let summary = summarize(&runs).unwrap();
        assert_eq!(summary.avg_pace, Decimal::ZERO);
    }

    #[test]
    fn test_average_pace_is_distance_weighted() {
        // A: 10mi in 60min (6.0 min/mi), B: 5mi in 60min (12.0 min/mi)
        let runs = vec![
            run_on(day(2025, 1, 1), dec!(10), dec!(60)),
            run_on(day(2025, 1, 2), dec!(5), dec!(60)),
        ];

        let weighted = average_pace(&runs);
        assert_eq!(weighted, dec!(8)); // 120 / 15

        let naive_mean: Decimal = runs
            .iter()
            .map(calculated_pace)
            .sum::<Decimal>()
            / Decimal::from(runs.len());
        assert_eq!(naive_mean, dec!(9)); // (6 + 12) / 2

        assert_ne!(weighted, naive_mean);
    }

    #[test]
    fn test_average_pace_empty_is_zero() {
        assert_eq!(average_pace(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_best_run_excludes_zero_distance() {
        let zero = run_on(day(2025, 1, 1), dec!(0), dec!(0));
        let real = run_on(day(2025, 1, 2), dec!(5), dec!(25));
        let runs = vec![zero, real.clone()];

        let best = best_run(&runs).unwrap();
        assert_eq!(best, &real);
    }

    #[test]
    fn test_best_run_none_without_positive_distance() {
        let runs = vec![run_on(day(2025, 1, 1), dec!(0), dec!(30))];
        assert!(best_run(&runs).is_none());
        assert!(best_run(&[]).is_none());
    }

    #[test]
    fn test_best_run_picks_fastest_pace() {
        let runs = vec![
            run_on(day(2025, 1, 1), dec!(5), dec!(40)), // 8.0
            run_on(day(2025, 1, 2), dec!(10), dec!(65)), // 6.5
            run_on(day(2025, 1, 3), dec!(3), dec!(21)), // 7.0
        ];
        let best = best_run(&runs).unwrap();
        assert_eq!(best.calculated_pace(), dec!(6.5));
    }

    #[test]
    fn test_longest_run_tie_breaks_to_first_occurrence() {
        let first = run_on(day(2025, 1, 1), dec!(10), dec!(70));
        let second = run_on(day(2025, 1, 8), dec!(10), dec!(80));
        let runs = vec![first.clone(), second];

        let longest = longest_run(&runs).unwrap();
        assert_eq!(longest, &first);
    }

    #[test]
    fn test_shortest_run_excludes_zero_distance() {
        let runs = vec![
            run_on(day(2025, 1, 1), dec!(0), dec!(0)),
            run_on(day(2025, 1, 2), dec!(3), dec!(20)),
            run_on(day(2025, 1, 3), dec!(8), dec!(60)),
        ];
        let shortest = shortest_run(&runs).unwrap();
        assert_eq!(shortest.distance, dec!(3));
    }

    #[test]
    fn test_slowest_run_tie_breaks_to_first_occurrence() {
        let first = run_on(day(2025, 1, 1), dec!(5), dec!(50)); // 10.0
        let second = run_on(day(2025, 1, 2), dec!(4), dec!(40)); // 10.0
        let faster = run_on(day(2025, 1, 3), dec!(5), dec!(30)); // 6.0
        let runs = vec![first.clone(), second, faster];

        let slowest = slowest_run(&runs).unwrap();
        assert_eq!(slowest, &first);
    }

    #[test]
    fn test_weekly_summary_buckets_by_iso_week() {
        // 2025-01-06 is in ISO week 2; 2025-03-04 is in ISO week 10
        let runs = vec![
            run_on(day(2025, 1, 6), dec!(5), dec!(30)),
            run_on(day(2025, 1, 7), dec!(5), dec!(40)),
            run_on(day(2025, 3, 4), dec!(10), dec!(60)),
        ];

        let weekly = weekly_summary(&runs);
        assert_eq!(weekly.len(), 2);

        let week2 = &weekly[&PeriodKey { year: 2025, period: 2 }];
        assert_eq!(week2.runs, 2);
        assert_eq!(week2.total_distance, dec!(10));
        assert_eq!(week2.total_duration, dec!(70));
        assert_eq!(week2.avg_pace, dec!(7));

        let week10 = &weekly[&PeriodKey { year: 2025, period: 10 }];
        assert_eq!(week10.runs, 1);
        assert_eq!(week10.avg_pace, dec!(6));
    }

    #[test]
    fn test_period_keys_sort_numerically_not_lexicographically() {
        let runs = vec![
            run_on(day(2025, 3, 4), dec!(10), dec!(60)), // week 10
            run_on(day(2025, 1, 6), dec!(5), dec!(30)),  // week 2
        ];

        let keys: Vec<String> = weekly_summary(&runs)
            .keys()
            .map(|k| k.to_string())
            .collect();
        // "2025-2" before "2025-10" even though lexicographic order disagrees
        assert_eq!(keys, vec!["2025-2", "2025-10"]);
    }

    #[test]
    fn test_monthly_summary() {
        let runs = vec![
            run_on(day(2025, 1, 5), dec!(5), dec!(30)),
            run_on(day(2025, 1, 20), dec!(7), dec!(42)),
            run_on(day(2025, 2, 3), dec!(10), dec!(80)),
        ];

        let monthly = monthly_summary(&runs);
        assert_eq!(monthly.len(), 2);

        let january = &monthly[&PeriodKey { year: 2025, period: 1 }];
        assert_eq!(january.runs, 2);
        assert_eq!(january.total_distance, dec!(12));
        assert_eq!(january.avg_pace, dec!(6));

        let february = &monthly[&PeriodKey { year: 2025, period: 2 }];
        assert_eq!(february.avg_pace, dec!(8));
    }

    #[test]
    fn test_bucket_with_zero_distance_reports_zero_pace() {
        let runs = vec![run_on(day(2025, 4, 1), dec!(0), dec!(15))];
        let monthly = monthly_summary(&runs);
        let april = &monthly[&PeriodKey { year: 2025, period: 4 }];
        assert_eq!(april.runs, 1);
        assert_eq!(april.avg_pace, Decimal::ZERO);
    }

    #[test]
    fn test_weekly_summary_uses_iso_week_year() {
        // 2024-12-30 falls in ISO week 1 of 2025
        let runs = vec![run_on(day(2024, 12, 30), dec!(5), dec!(30))];
        let weekly = weekly_summary(&runs);
        assert!(weekly.contains_key(&PeriodKey { year: 2025, period: 1 }));
    }
}
