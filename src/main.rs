use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::{CommandFactory, Parser, Subcommand};
use colored::*;
use rust_decimal::Decimal;

use runlog::config::{default_config_path, AppConfig};
use runlog::database::{Database, RunFilters, RunUpdate};
use runlog::display;
use runlog::import::fit::FitImporter;
use runlog::import::ImportManager;
use runlog::logging::{self, LogLevel};
use runlog::models::{DistanceUnit, Run, RunType};
use runlog::stats;
use runlog::RunLogError;

/// runlog - Running Data Analyzer
///
/// Stores run records, imports them from CSV/FIT files, and produces
/// summaries, rankings, and weekly/monthly breakdowns.
#[derive(Parser)]
#[command(name = "runlog")]
#[command(version = "0.1.0")]
#[command(about = "Running log analyzer", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Sets a custom database file
    #[arg(long, value_name = "FILE", global = true)]
    db: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import running data from a CSV/FIT file or a directory
    Import {
        /// Input file or directory path
        path: PathBuf,
    },

    /// List runs, optionally filtered
    List {
        /// Only runs on or after this date
        #[arg(long)]
        from: Option<String>,

        /// Only runs on or before this date
        #[arg(long)]
        to: Option<String>,

        /// Only runs of this type
        #[arg(long = "type")]
        run_type: Option<String>,

        /// Show at most this many runs
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show every field of a specific run
    Show {
        /// Run id
        id: i64,
    },

    /// Inspect the raw record messages of a FIT file
    Inspect {
        /// FIT file path
        path: PathBuf,
    },

    /// Record a run directly
    Add {
        /// Run date (YYYY-MM-DD or "YYYY-MM-DD HH:MM:SS")
        #[arg(long)]
        date: String,

        /// Distance covered
        #[arg(long)]
        distance: String,

        /// Distance unit (mi/km); defaults to the configured unit
        #[arg(long)]
        unit: Option<String>,

        /// Duration in minutes
        #[arg(long)]
        duration: String,

        /// Type of run (Easy, Long, Interval, Tempo, Race, Recovery)
        #[arg(long = "type")]
        run_type: String,

        /// Average heart rate
        #[arg(long)]
        heart_rate: Option<String>,

        /// Elevation gain
        #[arg(long)]
        elevation_gain: Option<String>,

        /// Run location
        #[arg(long)]
        location: Option<String>,

        /// Notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// Update a specific run's data, prompting per field
    Update {
        /// Run id
        id: i64,
    },

    /// Delete a specific run
    Delete {
        /// Run id
        id: i64,
    },

    /// Summary of all runs
    Summary,

    /// Best run (fastest pace)
    Best,

    /// Longest run by distance
    Longest,

    /// Shortest run by distance
    Shortest,

    /// Slowest run by pace
    Slowest,

    /// Average pace overall (distance-weighted)
    AvgPace,

    /// Weekly totals and pace
    Weekly,

    /// Monthly totals and pace
    Monthly,

    /// Start the interactive command loop
    Shell,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config =
        AppConfig::load_or_default(&config_path).context("Failed to load configuration")?;

    let mut log_config = config.log.clone();
    if cli.verbose > 0 {
        log_config.level = LogLevel::from_verbosity(cli.verbose);
    }
    logging::init_logging(&log_config)?;

    let db_path = cli
        .db
        .clone()
        .unwrap_or_else(|| config.settings.database_path.clone());
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut db = Database::open(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

    run_command(&mut db, &config, cli.command)
}

fn run_command(db: &mut Database, config: &AppConfig, command: Commands) -> Result<()> {
    match command {
        Commands::Import { path } => handle_import(db, config, &path),
        Commands::List {
            from,
            to,
            run_type,
            limit,
        } => handle_list(db, from.as_deref(), to.as_deref(), run_type.as_deref(), limit),
        Commands::Show { id } => handle_show(db, id),
        Commands::Inspect { path } => handle_inspect(&path),
        Commands::Add {
            date,
            distance,
            unit,
            duration,
            run_type,
            heart_rate,
            elevation_gain,
            location,
            notes,
        } => handle_add(
            db, config, &date, &distance, unit.as_deref(), &duration, &run_type,
            heart_rate.as_deref(), elevation_gain.as_deref(), location, notes,
        ),
        Commands::Update { id } => handle_update(db, id),
        Commands::Delete { id } => handle_delete(db, id),
        Commands::Summary => handle_summary(db),
        Commands::Best => handle_ranking(db, "Best Run", stats::best_run),
        Commands::Longest => handle_ranking(db, "Longest Run", stats::longest_run),
        Commands::Shortest => handle_ranking(db, "Shortest Run", stats::shortest_run),
        Commands::Slowest => handle_ranking(db, "Slowest Run", stats::slowest_run),
        Commands::AvgPace => handle_avg_pace(db),
        Commands::Weekly => handle_periodic(db, "week", stats::weekly_summary),
        Commands::Monthly => handle_periodic(db, "month", stats::monthly_summary),
        Commands::Shell => command_loop(db, config),
    }
}

/// Fetch all runs, printing the empty-state message when there are none
fn fetch_runs(db: &Database) -> Result<Option<Vec<Run>>> {
    let runs = db.list_runs()?;
    if runs.is_empty() {
        println!("{}", "No runs found in database".yellow());
        return Ok(None);
    }
    Ok(Some(runs))
}

fn handle_import(db: &mut Database, config: &AppConfig, path: &std::path::Path) -> Result<()> {
    let manager = ImportManager::new();
    let report = if path.is_dir() {
        manager.import_directory(path, config.import.show_progress)?
    } else {
        manager.import_file(path)?
    };

    let mut imported = 0;
    for run in &report.runs {
        db.add_run(run)?;
        imported += 1;
    }

    println!(
        "{}",
        format!("✓ Imported {} runs into the database", imported).green()
    );

    if !report.rejected.is_empty() {
        println!(
            "{}",
            format!(
                "The following {} rows were skipped due to invalid data:",
                report.rejected.len()
            )
            .yellow()
        );
        if config.import.report_rejected_rows {
            for rejected in &report.rejected {
                println!("  line {}: {} ({})", rejected.line, rejected.raw, rejected.reason);
            }
        }
    }

    Ok(())
}

fn handle_list(
    db: &Database,
    from: Option<&str>,
    to: Option<&str>,
    run_type: Option<&str>,
    limit: Option<usize>,
) -> Result<()> {
    let mut filters = RunFilters {
        limit,
        ..Default::default()
    };
    if let Some(value) = from {
        filters.start_date = Some(parse_date(value)?);
    }
    if let Some(value) = to {
        let end = parse_date(value)?;
        // A bare date bound covers the whole day
        filters.end_date = Some(if end.time() == NaiveTime::MIN {
            end + chrono::Duration::days(1) - chrono::Duration::seconds(1)
        } else {
            end
        });
    }
    if let Some(value) = run_type {
        filters.run_type = Some(RunType::from_code(value)?);
    }

    let runs = db.list_runs_filtered(&filters)?;
    if runs.is_empty() {
        println!("{}", "No runs found in database".yellow());
        return Ok(());
    }
    for run in &runs {
        println!("{}", display::run_line(run));
    }
    Ok(())
}

fn handle_show(db: &Database, id: i64) -> Result<()> {
    match db.get_run_by_id(id)? {
        Some(run) => {
            println!("{}", "Run details:".bold());
            println!("{}", display::run_details(&run));
        }
        None => println!("{}", format!("Run with id {} not found", id).yellow()),
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn handle_add(
    db: &mut Database,
    config: &AppConfig,
    date: &str,
    distance: &str,
    unit: Option<&str>,
    duration: &str,
    run_type: &str,
    heart_rate: Option<&str>,
    elevation_gain: Option<&str>,
    location: Option<String>,
    notes: Option<String>,
) -> Result<()> {
    let unit = match unit {
        Some(code) => DistanceUnit::from_code(code)?,
        None => config.settings.default_unit,
    };

    let run = Run::new(
        parse_date(date)?,
        parse_decimal("distance", distance)?,
        unit,
        parse_decimal("duration", duration)?,
        RunType::from_code(run_type)?,
    )?
    .with_heart_rate(heart_rate.map(|v| parse_decimal("heart_rate", v)).transpose()?)
    .with_elevation_gain(
        elevation_gain
            .map(|v| parse_decimal("elevation_gain", v))
            .transpose()?,
    )
    .with_location(location)
    .with_notes(notes);

    let stored = db.add_run(&run)?;
    println!(
        "{}",
        format!("✓ Recorded run {}", stored.id.unwrap_or_default()).green()
    );
    Ok(())
}

fn handle_inspect(path: &std::path::Path) -> Result<()> {
    let summary = FitImporter::summarize_file(path)?;
    let label = path.file_name().unwrap_or_default().to_string_lossy();
    println!("{}", display::fit_summary_text(&summary, &label));
    Ok(())
}

fn handle_update(db: &mut Database, id: i64) -> Result<()> {
    let run = match db.get_run_by_id(id)? {
        Some(run) => run,
        None => {
            println!("{}", format!("Run with id {} not found", id).yellow());
            return Ok(());
        }
    };

    println!("{}", "Current run details:".bold());
    println!("{}", display::run_details(&run));
    println!("Press Enter to keep the current value.");

    let changes = RunUpdate {
        date: prompt_parsed("New date", &run.date.format("%Y-%m-%d %H:%M:%S").to_string(), |v| {
            parse_date(v)
        })?,
        distance: prompt_parsed("New distance", &run.distance.to_string(), |v| {
            parse_decimal("distance", v)
        })?,
        unit: prompt_parsed("New unit", run.unit.code(), DistanceUnit::from_code)?,
        duration: prompt_parsed("New duration (mins)", &run.duration.to_string(), |v| {
            parse_decimal("duration", v)
        })?,
        heart_rate: prompt_optional_decimal("New heart rate", &run.heart_rate)?,
        elevation_gain: prompt_optional_decimal("New elevation gain", &run.elevation_gain)?,
        pace: prompt_optional_decimal("New pace", &run.pace)?,
        run_type: prompt_parsed("New run type", run.run_type.code(), RunType::from_code)?,
        location: prompt_text("New location", &run.location)?,
        notes: prompt_text("New notes", &run.notes)?,
    };

    db.update_run(id, &changes)?;
    println!("{}", format!("✓ Run {} updated successfully", id).green());
    Ok(())
}

fn handle_delete(db: &mut Database, id: i64) -> Result<()> {
    match db.delete_run(id) {
        Ok(()) => println!("{}", format!("✓ Run {} deleted", id).green()),
        Err(e @ RunLogError::NotFound { .. }) => println!("{}", e.user_message().yellow()),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn handle_summary(db: &Database) -> Result<()> {
    let runs = match fetch_runs(db)? {
        Some(runs) => runs,
        None => return Ok(()),
    };

    let summary = stats::summarize(&runs)?;
    println!("{}", display::summary_text(&summary, runs[0].unit.code()));
    Ok(())
}

fn handle_ranking(
    db: &Database,
    title: &str,
    rank: fn(&[Run]) -> Option<&Run>,
) -> Result<()> {
    let runs = match fetch_runs(db)? {
        Some(runs) => runs,
        None => return Ok(()),
    };

    match rank(&runs) {
        Some(run) => {
            println!("{}", format!("{title}:").bold());
            println!("{}", display::run_details(run));
            println!(
                "  Calculated Pace: {:.2} min/{}",
                run.calculated_pace(),
                run.unit
            );
        }
        None => println!(
            "{}",
            "No valid runs found with distance greater than zero".yellow()
        ),
    }
    Ok(())
}

fn handle_avg_pace(db: &Database) -> Result<()> {
    let runs = match fetch_runs(db)? {
        Some(runs) => runs,
        None => return Ok(()),
    };

    let pace = stats::average_pace(&runs);
    println!("Average Pace: {:.2} min per {}", pace, runs[0].unit);
    Ok(())
}

fn handle_periodic(
    db: &Database,
    period_label: &str,
    bucket: fn(&[Run]) -> std::collections::BTreeMap<stats::PeriodKey, stats::PeriodSummary>,
) -> Result<()> {
    let runs = match fetch_runs(db)? {
        Some(runs) => runs,
        None => return Ok(()),
    };

    let buckets = bucket(&runs);
    println!(
        "{}",
        display::period_table(&buckets, period_label, runs[0].unit.code())
    );
    Ok(())
}

/// Interactive command loop: reads a line, re-dispatches it through the
/// same argument parser as the CLI
fn command_loop(db: &mut Database, config: &AppConfig) -> Result<()> {
    println!("Welcome to the Running Data Analyzer! Type 'help' for commands or 'exit' to quit.");

    let stdin = io::stdin();
    loop {
        print!(">>> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim();

        match line {
            "" => continue,
            "exit" | "quit" => {
                println!("Goodbye!");
                break;
            }
            "help" => print_shell_help(),
            _ => {
                let mut argv = vec!["runlog".to_string()];
                argv.extend(split_command_line(line));
                match Cli::try_parse_from(argv) {
                    Ok(cli) => {
                        if matches!(cli.command, Commands::Shell) {
                            println!("Already in interactive mode");
                            continue;
                        }
                        if let Err(e) = run_command(db, config, cli.command) {
                            println!("{}", format!("Error: {e}").red());
                        }
                    }
                    Err(e) => println!("{e}"),
                }
            }
        }
    }

    Ok(())
}

fn print_shell_help() {
    println!("Available commands:");
    for subcommand in Cli::command().get_subcommands() {
        if subcommand.get_name() == "shell" {
            continue;
        }
        println!(
            " - {} : {}",
            subcommand.get_name(),
            subcommand
                .get_about()
                .map(|a| a.to_string())
                .unwrap_or_else(|| "No description".to_string())
        );
    }
    println!(" - exit : Leave the interactive loop");
    println!("Quote arguments containing spaces, e.g. add --notes \"hill repeats\"");
}

/// Split a shell line into arguments, honoring single and double quotes
fn split_command_line(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None => match c {
                '"' | '\'' => quote = Some(c),
                c if c.is_whitespace() => {
                    if !current.is_empty() {
                        words.push(std::mem::take(&mut current));
                    }
                }
                _ => current.push(c),
            },
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn parse_date(value: &str) -> runlog::Result<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt);
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN));
    }
    Err(RunLogError::Validation {
        field: "date",
        reason: format!("unable to parse date: {value:?}"),
    })
}

fn parse_decimal(field: &'static str, value: &str) -> runlog::Result<Decimal> {
    value
        .trim()
        .parse::<Decimal>()
        .map_err(|_| RunLogError::Validation {
            field,
            reason: format!("not a number: {value:?}"),
        })
}

fn prompt(label: &str, default: &str) -> Result<String> {
    print!("  {} [{}]: ", label, default);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let value = line.trim();
    if value.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(value.to_string())
    }
}

fn prompt_parsed<T>(
    label: &str,
    default: &str,
    parse: impl Fn(&str) -> runlog::Result<T>,
) -> Result<Option<T>> {
    let value = prompt(label, default)?;
    Ok(Some(parse(&value)?))
}

fn prompt_optional_decimal(label: &str, current: &Option<Decimal>) -> Result<Option<Decimal>> {
    let default = current.map(|v| v.to_string()).unwrap_or_default();
    let value = prompt(label, &default)?;
    if value.is_empty() {
        return Ok(None);
    }
    Ok(Some(parse_decimal("value", &value)?))
}

fn prompt_text(label: &str, current: &Option<String>) -> Result<Option<String>> {
    let default = current.clone().unwrap_or_default();
    let value = prompt(label, &default)?;
    if value.is_empty() {
        Ok(None)
    } else {
        Ok(Some(value))
    }
}
