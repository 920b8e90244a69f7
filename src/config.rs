// src/config.rs
//! Run parameters. The pipeline takes a fully resolved [`PipelineConfig`];
//! YAML files and command-line flags are layered into a [`RawConfig`] first.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::PipelineError;
use crate::family::{DataFamily, FamilyProfile};
use crate::logging::LogConfig;
use crate::process::PREFERRED_TABLE;

/// Inclusive calendar-date range used to admit files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, PipelineError> {
        if end < start {
            return Err(PipelineError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// one workbook with `PT data` and `Bad data` sheets
    #[default]
    Xlsx,
    /// a pair of parquet files
    Parquet,
}

pub fn default_extensions() -> Vec<String> {
    vec!["csv".into(), "xlsx".into(), "xls".into()]
}

pub fn default_temp_prefixes() -> Vec<String> {
    vec!["~$".into(), ".~lock.".into()]
}

/// Fully resolved run parameters.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineConfig {
    pub input_directory: PathBuf,
    pub window: DateWindow,
    /// free-text label, only used for output titling
    pub station_name: String,
    /// output path prefix, without extension
    pub output: PathBuf,
    pub family: DataFamily,
    pub format: OutputFormat,
    pub timestamp_suffix: bool,
    pub parallel: bool,
    pub extensions: Vec<String>,
    /// `None` means the family's built-in list
    pub exclusions: Option<Vec<String>>,
    pub temp_prefixes: Vec<String>,
    pub preferred_table: Option<String>,
    pub extra_aliases: BTreeMap<String, String>,
    pub log: LogConfig,
}

impl PipelineConfig {
    /// Minimal config with defaults for everything optional.
    pub fn new(
        input_directory: impl Into<PathBuf>,
        window: DateWindow,
        family: DataFamily,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input_directory: input_directory.into(),
            window,
            station_name: String::new(),
            output: output.into(),
            family,
            format: OutputFormat::default(),
            timestamp_suffix: true,
            parallel: false,
            extensions: default_extensions(),
            exclusions: None,
            temp_prefixes: default_temp_prefixes(),
            preferred_table: Some(PREFERRED_TABLE.to_string()),
            extra_aliases: BTreeMap::new(),
            log: LogConfig::default(),
        }
    }

    /// Family profile with configured aliases and exclusions layered on,
    /// then checked.
    pub fn profile(&self) -> Result<FamilyProfile, PipelineError> {
        let mut profile = self.family.profile();
        profile.aliases.merge(&self.extra_aliases);
        if let Some(exclusions) = &self.exclusions {
            profile.exclusions = exclusions.clone();
        }
        profile.validate()?;
        Ok(profile)
    }

    /// Title line for the anomaly log: requested start date plus station.
    pub fn title(&self) -> String {
        format!(
            "{} {}",
            self.window.start.format("%m.%d.%Y"),
            self.station_name
        )
        .trim_end()
        .to_string()
    }

    /// Everything that must hold before the first file is read.
    pub fn validate(&self) -> Result<(), PipelineError> {
        DateWindow::new(self.window.start, self.window.end)?;
        if !self.input_directory.is_dir() {
            return Err(PipelineError::InputDirectoryMissing(
                self.input_directory.clone(),
            ));
        }
        if self.extensions.is_empty() {
            return Err(PipelineError::Config("extension allow-list is empty".into()));
        }
        self.profile()?;
        probe_writable(&self.output)?;
        Ok(())
    }
}

/// Make sure the output directory exists and accepts new files.
fn probe_writable(output: &Path) -> Result<(), PipelineError> {
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let unwritable = |reason: String| PipelineError::OutputNotWritable {
        path: dir.clone(),
        reason,
    };
    fs::create_dir_all(&dir).map_err(|e| unwritable(e.to_string()))?;
    let probe = tempfile::Builder::new()
        .prefix(".hydroflag-probe")
        .tempfile_in(&dir)
        .map_err(|e| unwritable(e.to_string()))?;
    debug!(probe = %probe.path().display(), "output directory is writable");
    Ok(())
}

/// Partially specified parameters, as read from YAML or the command line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub input_directory: Option<PathBuf>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub station_name: Option<String>,
    pub output: Option<PathBuf>,
    pub family: Option<DataFamily>,
    pub format: Option<OutputFormat>,
    pub timestamp_suffix: Option<bool>,
    pub parallel: Option<bool>,
    pub extensions: Option<Vec<String>>,
    pub exclusions: Option<Vec<String>>,
    pub temp_prefixes: Option<Vec<String>>,
    pub preferred_table: Option<String>,
    #[serde(default)]
    pub extra_aliases: BTreeMap<String, String>,
    pub log_file: Option<PathBuf>,
    pub console: Option<bool>,
    pub log_filter: Option<String>,
}

impl RawConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("parsing YAML configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading configuration {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Values set in `other` replace ours; aliases are merged.
    pub fn overlay(mut self, other: RawConfig) -> Self {
        macro_rules! take {
            ($($field:ident),*) => {
                $( if other.$field.is_some() { self.$field = other.$field; } )*
            };
        }
        take!(
            input_directory,
            start_date,
            end_date,
            station_name,
            output,
            family,
            format,
            timestamp_suffix,
            parallel,
            extensions,
            exclusions,
            temp_prefixes,
            preferred_table,
            log_file,
            console,
            log_filter
        );
        self.extra_aliases.extend(other.extra_aliases);
        self
    }

    /// Fill defaults and insist on the required parameters.
    pub fn resolve(self) -> Result<PipelineConfig, PipelineError> {
        let missing = |name: &str| PipelineError::Config(format!("`{}` is required", name));
        let input_directory = self.input_directory.ok_or_else(|| missing("input_directory"))?;
        let start = self.start_date.ok_or_else(|| missing("start_date"))?;
        let end = self.end_date.ok_or_else(|| missing("end_date"))?;
        let output = self.output.ok_or_else(|| missing("output"))?;
        let window = DateWindow::new(start, end)?;

        let mut cfg = PipelineConfig::new(
            input_directory,
            window,
            self.family.unwrap_or(DataFamily::WeatherStation),
            output,
        );
        cfg.station_name = self.station_name.unwrap_or_default();
        cfg.format = self.format.unwrap_or_default();
        cfg.timestamp_suffix = self.timestamp_suffix.unwrap_or(true);
        cfg.parallel = self.parallel.unwrap_or(false);
        cfg.extensions = self
            .extensions
            .unwrap_or_else(default_extensions)
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        cfg.exclusions = self.exclusions;
        cfg.temp_prefixes = self.temp_prefixes.unwrap_or_else(default_temp_prefixes);
        if let Some(t) = self.preferred_table {
            // an empty name disables the preference
            cfg.preferred_table = (!t.is_empty()).then_some(t);
        }
        cfg.extra_aliases = self.extra_aliases;
        cfg.log = LogConfig {
            file: self.log_file.or(cfg.log.file),
            console: self.console.unwrap_or(cfg.log.console),
            filter: self.log_filter,
        };
        Ok(cfg)
    }
}
