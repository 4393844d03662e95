use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use crate::error::{Result, RunLogError};
use crate::models::Run;

pub mod csv;
pub mod fit;

/// A single row that failed parsing during batch import
///
/// Row failures are collected, not raised: the whole file is scanned and
/// the original raw values are retained for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRow {
    /// 1-based line number in the source file
    pub line: usize,
    /// Original raw values, joined as they appeared
    pub raw: String,
    /// Why the row was rejected
    pub reason: String,
}

/// Result of a batch import: valid records and rejected rows, side by side
#[derive(Debug, Default)]
pub struct ImportReport {
    pub runs: Vec<Run>,
    pub rejected: Vec<RejectedRow>,
}

impl ImportReport {
    pub fn merge(&mut self, mut other: ImportReport) {
        self.runs.append(&mut other.runs);
        self.rejected.append(&mut other.rejected);
    }
}

/// Trait for importing run data from different file formats
pub trait ImportFormat {
    /// Check if this importer can handle the given file
    fn can_import(&self, file_path: &Path) -> bool;

    /// Import run data from the file
    fn import_file(&self, file_path: &Path) -> Result<ImportReport>;

    /// Get the format name for this importer
    fn format_name(&self) -> &'static str;
}

/// Manager for coordinating different import formats
pub struct ImportManager {
    importers: Vec<Box<dyn ImportFormat>>,
}

impl ImportManager {
    /// Create a new import manager with all available importers
    pub fn new() -> Self {
        let importers: Vec<Box<dyn ImportFormat>> = vec![
            Box::new(csv::CsvImporter::new()),
            Box::new(fit::FitImporter::new()),
        ];

        Self { importers }
    }

    /// Import a single file, auto-detecting the format
    pub fn import_file(&self, file_path: &Path) -> Result<ImportReport> {
        for importer in &self.importers {
            if importer.can_import(file_path) {
                tracing::info!(
                    file = %file_path.display(),
                    format = importer.format_name(),
                    "importing run data"
                );
                return importer.import_file(file_path);
            }
        }

        Err(RunLogError::Import(format!(
            "No importer found for file: {}",
            file_path.display()
        )))
    }

    /// Import all supported files from a directory
    ///
    /// `show_progress` controls the terminal progress bar; per-file status
    /// lines are suppressed along with it.
    pub fn import_directory(&self, dir_path: &Path, show_progress: bool) -> Result<ImportReport> {
        let files = self.collect_importable_files(dir_path)?;
        let mut report = ImportReport::default();

        if files.is_empty() {
            warn!(dir = %dir_path.display(), "no importable files found");
            return Ok(report);
        }

        let pb = if show_progress {
            let pb = ProgressBar::new(files.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({msg})",
                    )
                    .map_err(|e| RunLogError::Import(e.to_string()))?
                    .progress_chars("#>-"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        for file_path in files {
            pb.set_message(format!(
                "Processing {}",
                file_path.file_name().unwrap_or_default().to_string_lossy()
            ));

            match self.import_file(&file_path) {
                Ok(file_report) => {
                    pb.println(format!(
                        "✓ {} runs, {} rejected rows from {}",
                        file_report.runs.len(),
                        file_report.rejected.len(),
                        file_path.file_name().unwrap_or_default().to_string_lossy()
                    ));
                    report.merge(file_report);
                }
                Err(e) => {
                    pb.println(format!(
                        "✗ Failed to import {}: {}",
                        file_path.file_name().unwrap_or_default().to_string_lossy(),
                        e
                    ));
                }
            }

            pb.inc(1);
        }

        pb.finish_with_message("Import complete");
        Ok(report)
    }

    /// Check if this manager can import a given file
    pub fn can_import_file(&self, file_path: &Path) -> bool {
        self.importers
            .iter()
            .any(|importer| importer.can_import(file_path))
    }

    fn collect_importable_files(&self, dir_path: &Path) -> Result<Vec<std::path::PathBuf>> {
        let mut files = Vec::new();

        if !dir_path.is_dir() {
            return Err(RunLogError::Import(format!(
                "Path is not a directory: {}",
                dir_path.display()
            )));
        }

        for entry in std::fs::read_dir(dir_path)? {
            let path = entry?.path();
            if path.is_file() && self.can_import_file(&path) {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }
}

impl Default for ImportManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_manager_detects_formats_by_extension() {
        let manager = ImportManager::new();
        assert!(manager.can_import_file(&PathBuf::from("runs.csv")));
        assert!(manager.can_import_file(&PathBuf::from("workout.FIT")));
        assert!(!manager.can_import_file(&PathBuf::from("notes.txt")));
    }

    #[test]
    fn test_unknown_format_is_an_error() {
        let manager = ImportManager::new();
        let result = manager.import_file(&PathBuf::from("notes.txt"));
        assert!(matches!(result, Err(RunLogError::Import(_))));
    }

    #[test]
    fn test_directory_import_without_progress_bar() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("runs.csv"),
            "date,distance,unit,duration,run_type\n2025-01-06,5,mi,30,Easy\n",
        )
        .unwrap();

        let report = ImportManager::new()
            .import_directory(dir.path(), false)
            .unwrap();
        assert_eq!(report.runs.len(), 1);
        assert!(report.rejected.is_empty());
    }

    #[test]
    fn test_report_merge() {
        let mut report = ImportReport::default();
        report.merge(ImportReport {
            runs: Vec::new(),
            rejected: vec![RejectedRow {
                line: 3,
                raw: "bad,row".to_string(),
                reason: "test".to_string(),
            }],
        });
        assert_eq!(report.rejected.len(), 1);
        assert!(report.runs.is_empty());
    }
}
