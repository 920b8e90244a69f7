// src/walk.rs
use anyhow::{Context, Result};
use chrono::NaiveDate;
use glob::{glob, Pattern};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::{DateWindow, PipelineConfig};
use crate::family::FamilyProfile;
use crate::process::extract_date_from_filename;

/// A file the walker admitted, with the date read from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub file_name: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Extension,
    Excluded,
    Temporary,
    NoDate,
    OutOfWindow(NaiveDate),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Extension => write!(f, "extension not allowed"),
            SkipReason::Excluded => write!(f, "on the exclusion list"),
            SkipReason::Temporary => write!(f, "temporary or lock file"),
            SkipReason::NoDate => write!(f, "no date in file name"),
            SkipReason::OutOfWindow(d) => write!(f, "date {} outside window", d),
        }
    }
}

/// Verdict on one file found under the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screened {
    Admitted(Candidate),
    Skipped { path: PathBuf, reason: SkipReason },
}

/// Enumerates candidate files under a root directory.
#[derive(Debug, Clone)]
pub struct FileSelector {
    root: PathBuf,
    extensions: HashSet<String>,
    exclusions: HashSet<String>,
    temp_prefixes: Vec<String>,
    window: DateWindow,
}

impl FileSelector {
    pub fn new(
        root: impl Into<PathBuf>,
        extensions: &[String],
        exclusions: HashSet<String>,
        temp_prefixes: Vec<String>,
        window: DateWindow,
    ) -> Self {
        Self {
            root: root.into(),
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            exclusions,
            temp_prefixes,
            window,
        }
    }

    /// Root, extensions and window from `cfg`; exclusions from the resolved
    /// family profile.
    pub fn from_config(cfg: &PipelineConfig, profile: &FamilyProfile) -> Self {
        Self::new(
            &cfg.input_directory,
            &cfg.extensions,
            profile.exclusions.iter().cloned().collect(),
            cfg.temp_prefixes.clone(),
            cfg.window,
        )
    }

    /// Decide on a single path without touching its contents.
    pub fn screen(&self, path: &Path) -> Screened {
        let skipped = |reason| Screened::Skipped {
            path: path.to_path_buf(),
            reason,
        };
        let file_name = match path.file_name() {
            Some(n) => n.to_string_lossy().to_string(),
            None => return skipped(SkipReason::NoDate),
        };

        // 1) extension
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if !self.extensions.contains(&ext) {
            return skipped(SkipReason::Extension);
        }
        // 2) known-bad names, regardless of date
        if self.exclusions.contains(&file_name) {
            return skipped(SkipReason::Excluded);
        }
        // 3) editor lock / temp files
        if self.temp_prefixes.iter().any(|p| file_name.starts_with(p.as_str())) {
            return skipped(SkipReason::Temporary);
        }
        // 4) date window
        match extract_date_from_filename(&file_name) {
            None => skipped(SkipReason::NoDate),
            Some(date) if !self.window.contains(date) => skipped(SkipReason::OutOfWindow(date)),
            Some(date) => Screened::Admitted(Candidate {
                path: path.to_path_buf(),
                file_name,
                date,
            }),
        }
    }

    /// Lazily walk every regular file under the root and screen it. Order is
    /// whatever the traversal yields.
    pub fn walk(&self) -> Result<impl Iterator<Item = Screened> + '_> {
        let root = self
            .root
            .to_str()
            .with_context(|| format!("input path is not valid UTF-8: {}", self.root.display()))?;
        let pattern = format!("{}/**/*", Pattern::escape(root));
        let paths = glob(&pattern).with_context(|| format!("bad glob pattern {}", pattern))?;

        Ok(paths
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!("cannot read directory entry: {}", e);
                    None
                }
            })
            .filter(|path| path.is_file())
            .map(move |path| {
                let verdict = self.screen(&path);
                match &verdict {
                    Screened::Admitted(c) => {
                        info!(file = %c.file_name, date = %c.date, "file matched")
                    }
                    Screened::Skipped { path, reason } => {
                        info!(path = %path.display(), %reason, "file skipped")
                    }
                }
                verdict
            }))
    }

    /// Only the admitted files.
    pub fn candidates(&self) -> Result<impl Iterator<Item = Candidate> + '_> {
        Ok(self.walk()?.filter_map(|s| match s {
            Screened::Admitted(c) => Some(c),
            Screened::Skipped { .. } => None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn selector(root: &Path, exclusions: &[&str]) -> FileSelector {
        FileSelector::new(
            root,
            &["csv".to_string(), "xlsx".to_string()],
            exclusions.iter().map(|s| s.to_string()).collect(),
            vec!["~$".into(), ".~lock.".into()],
            DateWindow::new(d(2024, 1, 10), d(2024, 1, 20)).unwrap(),
        )
    }

    #[test]
    fn window_boundaries_are_inclusive() {
        let s = selector(Path::new("."), &[]);
        for (name, admitted) in [
            ("Poloa_1.10.2024.csv", true),
            ("Poloa_1.20.2024.csv", true),
            ("Poloa_1.9.2024.csv", false),
            ("Poloa_1.21.2024.csv", false),
        ] {
            let got = matches!(s.screen(Path::new(name)), Screened::Admitted(_));
            assert_eq!(got, admitted, "{}", name);
        }
    }

    #[test]
    fn screening_reasons() {
        let s = selector(Path::new("."), &["Bad_1.15.2024.csv"]);
        let reason = |name: &str| match s.screen(Path::new(name)) {
            Screened::Skipped { reason, .. } => Some(reason),
            Screened::Admitted(_) => None,
        };
        assert_eq!(reason("Bad_1.15.2024.csv"), Some(SkipReason::Excluded));
        assert_eq!(reason("notes_1.15.2024.txt"), Some(SkipReason::Extension));
        assert_eq!(reason("~$Poloa_1.15.2024.xlsx"), Some(SkipReason::Temporary));
        assert_eq!(reason(".~lock.Poloa_1.15.2024.csv"), Some(SkipReason::Temporary));
        assert_eq!(reason("Poloa.csv"), Some(SkipReason::NoDate));
        assert_eq!(reason("Poloa_2.30.2024.csv"), Some(SkipReason::NoDate));
        assert_eq!(
            reason("Poloa_2.1.2024.csv"),
            Some(SkipReason::OutOfWindow(d(2024, 2, 1)))
        );
        assert_eq!(reason("Poloa_1.15.2024.XLSX"), None);
    }

    #[test]
    fn walk_recurses_and_skips_directories() -> Result<()> {
        let dir = tempdir()?;
        fs::create_dir_all(dir.path().join("Jan 2024/raw"))?;
        fs::create_dir_all(dir.path().join("1.12.2024.csv"))?; // a directory, not a file
        fs::write(dir.path().join("Jan 2024/raw/Poloa_1.12.2024.csv"), "a\n")?;
        fs::write(dir.path().join("Poloa_1.15.2024.csv"), "a\n")?;
        fs::write(dir.path().join("Poloa_3.15.2024.csv"), "a\n")?;

        let s = selector(dir.path(), &[]);
        let mut names: Vec<String> = s.candidates()?.map(|c| c.file_name).collect();
        names.sort();
        assert_eq!(names, vec!["Poloa_1.12.2024.csv", "Poloa_1.15.2024.csv"]);
        assert_eq!(s.walk()?.count(), 3);
        Ok(())
    }

    #[test]
    fn exclusions_come_from_the_resolved_profile() -> Result<()> {
        use crate::family::DataFamily;
        let window = DateWindow::new(d(2024, 1, 10), d(2024, 1, 20))?;
        let mut cfg = PipelineConfig::new(".", window, DataFamily::StreamGauge, "out");

        let s = FileSelector::from_config(&cfg, &cfg.profile()?);
        let excluded = |s: &FileSelector, name: &str| {
            matches!(
                s.screen(Path::new(name)),
                Screened::Skipped { reason: SkipReason::Excluded, .. }
            )
        };
        assert!(excluded(&s, "Nuuuli_ALL_SG_data.xlsx"));
        assert!(!excluded(&s, "Nuuuli_1.15.2024.csv"));

        // a configured list replaces the built-in one
        cfg.exclusions = Some(vec!["Nuuuli_1.15.2024.csv".into()]);
        let s = FileSelector::from_config(&cfg, &cfg.profile()?);
        assert!(excluded(&s, "Nuuuli_1.15.2024.csv"));
        assert!(!excluded(&s, "Nuuuli_ALL_SG_data.xlsx"));
        Ok(())
    }
}
