// src/pipeline.rs
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::family::{FamilyProfile, TIMESTAMP_COLUMN};
use crate::process::{load_artifact, normalize_headers, select_table, MappingReport, Selection};
use crate::quality::{scan_table, AnomalyRecord};
use crate::table::SourceTable;
use crate::walk::{Candidate, FileSelector, Screened};

/// Every admitted file's normalized rows, in processing order, plus every
/// anomaly raised while scanning them.
#[derive(Debug, Clone, Default)]
pub struct CombinedDataset {
    pub table: SourceTable,
    pub anomalies: Vec<AnomalyRecord>,
}

impl CombinedDataset {
    fn with_columns(columns: Vec<String>) -> Self {
        Self {
            table: SourceTable::new(columns),
            anomalies: Vec::new(),
        }
    }

    fn append(&mut self, file: FileResult) {
        self.table.rows.extend(file.table.rows);
        self.anomalies.extend(file.anomalies);
    }
}

/// Result of processing one file.
#[derive(Debug, Clone)]
pub struct FileResult {
    pub candidate: Candidate,
    pub table_name: String,
    pub selection: Selection,
    pub mapping: MappingReport,
    pub table: SourceTable,
    pub anomalies: Vec<AnomalyRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub files_scanned: usize,
    pub files_matched: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    pub rows: usize,
    pub anomalies: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Files scanned:  {}", self.files_scanned)?;
        writeln!(f, "Files matched:  {}", self.files_matched)?;
        writeln!(f, "Files skipped:  {}", self.files_skipped)?;
        writeln!(f, "Files failed:   {}", self.files_failed)?;
        writeln!(f, "Rows combined:  {}", self.rows)?;
        write!(f, "Anomalies:      {}", self.anomalies)
    }
}

/// How a run ended. None of these is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    /// nothing under the root passed the walker
    NoMatchingFiles,
    /// files were admitted but every one of them failed
    AllFilesFailed,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Completed => write!(f, "completed"),
            RunOutcome::NoMatchingFiles => write!(f, "no data: zero files matched"),
            RunOutcome::AllFilesFailed => write!(f, "no data: every matched file failed"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub dataset: CombinedDataset,
    pub summary: RunSummary,
    pub outcome: RunOutcome,
}

/// Walker → table selector → header normalizer → rule engine, per file.
pub struct Pipeline {
    config: PipelineConfig,
    profile: FamilyProfile,
    selector: FileSelector,
}

impl Pipeline {
    /// Checks the configuration; nothing is read until [`Pipeline::run`].
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let profile = config.profile()?;
        let selector = FileSelector::from_config(&config, &profile);
        Ok(Self {
            config,
            profile,
            selector,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn profile(&self) -> &FamilyProfile {
        &self.profile
    }

    /// Process every admitted file. Per-file failures are logged and
    /// counted; only a walk that cannot start is returned as an error.
    pub fn run(&self) -> Result<RunReport> {
        let t0 = Instant::now();
        let mut summary = RunSummary::default();
        let mut dataset = CombinedDataset::with_columns(self.profile.schema.columns().to_vec());

        let screened = self.selector.walk()?;
        let admitted = screened.filter_map(|s| {
            summary.files_scanned += 1;
            match s {
                Screened::Admitted(c) => Some(c),
                Screened::Skipped { .. } => {
                    summary.files_skipped += 1;
                    None
                }
            }
        });

        if self.config.parallel {
            // completion order is arbitrary; fix the order before processing
            let mut candidates: Vec<Candidate> = admitted.collect();
            candidates.sort_by(|a, b| (a.date, &a.file_name).cmp(&(b.date, &b.file_name)));
            summary.files_matched = candidates.len();
            let results: Vec<(Candidate, Result<FileResult>)> = candidates
                .into_par_iter()
                .map(|c| {
                    let r = self.process_file(&c);
                    (c, r)
                })
                .collect();
            for (candidate, result) in results {
                self.absorb(&mut dataset, &mut summary, &candidate, result);
            }
        } else {
            let candidates: Vec<Candidate> = admitted.collect();
            summary.files_matched = candidates.len();
            for candidate in candidates {
                let result = self.process_file(&candidate);
                self.absorb(&mut dataset, &mut summary, &candidate, result);
            }
        }

        summary.rows = dataset.table.len();
        summary.anomalies = dataset.anomalies.len();
        let outcome = if summary.files_matched == 0 {
            RunOutcome::NoMatchingFiles
        } else if summary.files_failed == summary.files_matched {
            RunOutcome::AllFilesFailed
        } else {
            RunOutcome::Completed
        };

        match outcome {
            RunOutcome::Completed => info!(
                rows = summary.rows,
                anomalies = summary.anomalies,
                elapsed = ?t0.elapsed(),
                "run complete"
            ),
            _ => warn!(%outcome, "run produced no data"),
        }
        Ok(RunReport {
            dataset,
            summary,
            outcome,
        })
    }

    fn absorb(
        &self,
        dataset: &mut CombinedDataset,
        summary: &mut RunSummary,
        candidate: &Candidate,
        result: Result<FileResult>,
    ) {
        match result {
            Ok(file) => dataset.append(file),
            Err(e) => {
                summary.files_failed += 1;
                error!(file = %candidate.path.display(), "skipping file: {:#}", e);
            }
        }
    }

    /// Read one admitted file and turn it into normalized rows and anomalies.
    #[instrument(level = "info", skip(self, candidate), fields(file = %candidate.file_name))]
    pub fn process_file(&self, candidate: &Candidate) -> Result<FileResult> {
        // 1) read every table in the artifact
        let artifact = load_artifact(&candidate.path)
            .with_context(|| format!("reading {}", candidate.path.display()))?;

        // 2) pick one
        let (named, selection) =
            select_table(&artifact, self.config.preferred_table.as_deref())
                .ok_or_else(|| PipelineError::NoTables(candidate.path.clone()))?;
        info!(table = %named.name, ?selection, rows = named.table.len(), "table selected");

        // 3) map headers onto the family schema
        let (mut table, mapping) =
            normalize_headers(&named.table, &self.profile.aliases, &self.profile.schema);
        if !mapping.filled.is_empty() {
            info!(missing = ?mapping.filled, "canonical columns absent, filled with missing");
        }

        // 4) timestamps
        let unparsed = table.coerce_timestamps(TIMESTAMP_COLUMN);
        if unparsed > 0 {
            warn!(unparsed, "rows with an unreadable timestamp");
        }

        // 5) rules
        let anomalies = scan_table(&table, &self.profile.rules, TIMESTAMP_COLUMN);
        info!(rows = table.len(), anomalies = anomalies.len(), "file processed");

        Ok(FileResult {
            candidate: candidate.clone(),
            table_name: named.name.clone(),
            selection,
            mapping,
            table,
            anomalies,
        })
    }
}
