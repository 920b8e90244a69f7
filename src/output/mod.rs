// src/output/mod.rs
//! Writes a run's combined dataset and anomaly log.

pub mod columnar;
pub mod workbook;

use anyhow::Result;
use chrono::NaiveDateTime;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{OutputFormat, PipelineConfig};
use crate::pipeline::CombinedDataset;
use crate::quality::AnomalyRecord;

/// Sheet holding the combined dataset.
pub const DATA_TABLE: &str = "PT data";
/// Sheet holding the anomaly log.
pub const ANOMALY_TABLE: &str = "Bad data";

/// Anomaly log header. `No data from` / `To` stay blank; the field crew fills
/// them in by hand.
pub const ANOMALY_HEADERS: [&str; 6] = [
    "Bad data Start",
    "Bad data End",
    "Data affected",
    "No data from",
    "To",
    "Notes",
];

const BASE_FALLBACK: &str = "combined_data";

/// Output path prefix with a known extension stripped and, if requested, a
/// `_YYYYMMDD_HHMMSS` generation stamp appended.
pub fn output_base(prefix: &Path, timestamp_suffix: bool, now: NaiveDateTime) -> PathBuf {
    let mut name = prefix
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| BASE_FALLBACK.to_string());
    for ext in [".xlsx", ".parquet"] {
        if let Some(stripped) = name.strip_suffix(ext) {
            name = stripped.to_string();
        }
    }
    if timestamp_suffix {
        name = format!("{}_{}", name, now.format("%Y%m%d_%H%M%S"));
    }
    if prefix.file_name().is_some() {
        prefix.with_file_name(name)
    } else {
        prefix.join(name)
    }
}

/// One anomaly as a row of the log table.
pub fn anomaly_row(record: &AnomalyRecord) -> [String; 6] {
    [
        record.start.to_string(),
        record.end.to_string(),
        record.column.clone(),
        String::new(),
        String::new(),
        record.notes.to_string(),
    ]
}

/// Sibling path the writers fill before renaming into place.
pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write everything for `dataset` under the configured format. Returns the
/// files written.
const XLSX_SUFFIX: &str = ".xlsx";
const DATA_SUFFIX: &str = ".pt_data.parquet";
const ANOMALY_SUFFIX: &str = ".bad_data.parquet";

/// Paths a run started at `now` writes to, in the order they are written.
pub fn planned_outputs(cfg: &PipelineConfig, now: NaiveDateTime) -> Vec<PathBuf> {
    let base = output_base(&cfg.output, cfg.timestamp_suffix, now);
    match cfg.format {
        OutputFormat::Xlsx => vec![with_suffix(&base, XLSX_SUFFIX)],
        OutputFormat::Parquet => vec![
            with_suffix(&base, DATA_SUFFIX),
            with_suffix(&base, ANOMALY_SUFFIX),
        ],
    }
}

pub fn write_outputs(
    cfg: &PipelineConfig,
    dataset: &CombinedDataset,
    now: NaiveDateTime,
) -> Result<Vec<PathBuf>> {
    let base = output_base(&cfg.output, cfg.timestamp_suffix, now);
    let title = cfg.title();
    let written = match cfg.format {
        OutputFormat::Xlsx => {
            let path = with_suffix(&base, XLSX_SUFFIX);
            workbook::write_workbook(&path, dataset, &title)?;
            vec![path]
        }
        OutputFormat::Parquet => {
            let data = with_suffix(&base, DATA_SUFFIX);
            let bad = with_suffix(&base, ANOMALY_SUFFIX);
            columnar::write_dataset(&data, &dataset.table)?;
            columnar::write_anomalies(&bad, &dataset.anomalies, &title)?;
            vec![data, bad]
        }
    };
    for p in &written {
        info!(path = %p.display(), "output written");
    }
    Ok(written)
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::{AnomalyTime, Flag};
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(9, 7, 2)
            .unwrap()
    }

    #[test]
    fn base_name_gets_a_generation_stamp() {
        assert_eq!(
            output_base(Path::new("out/poloa.xlsx"), true, now()),
            PathBuf::from("out/poloa_20240305_090702")
        );
        assert_eq!(
            output_base(Path::new("out/poloa"), false, now()),
            PathBuf::from("out/poloa")
        );
    }

    #[test]
    fn planned_paths_match_what_gets_written() -> Result<()> {
        use crate::config::DateWindow;
        use crate::family::DataFamily;
        let dir = tempfile::tempdir()?;
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut cfg = PipelineConfig::new(
            dir.path(),
            DateWindow::new(day, day)?,
            DataFamily::StreamGauge,
            dir.path().join("out/nuuuli"),
        );
        std::fs::create_dir_all(dir.path().join("out"))?;
        let dataset = CombinedDataset {
            table: crate::table::SourceTable::new(vec!["Date/Time".to_string()]),
            anomalies: Vec::new(),
        };
        for format in [OutputFormat::Xlsx, OutputFormat::Parquet] {
            cfg.format = format;
            let planned = planned_outputs(&cfg, now());
            assert!(planned.iter().all(|p| !p.exists()));
            assert_eq!(write_outputs(&cfg, &dataset, now())?, planned);
            assert!(planned.iter().all(|p| p.exists()));
        }
        Ok(())
    }

    #[test]
    fn tmp_is_a_sibling() {
        assert_eq!(
            tmp_path(Path::new("out/a.xlsx")),
            PathBuf::from("out/a.xlsx.tmp")
        );
    }

    #[test]
    fn anomaly_row_layout() {
        let rec = AnomalyRecord {
            start: AnomalyTime::Invalid,
            end: AnomalyTime::Invalid,
            column: "RH_Avg".into(),
            notes: Flag::OutOfRange,
        };
        assert_eq!(
            anomaly_row(&rec),
            [
                "Invalid Date/Time".to_string(),
                "Invalid Date/Time".to_string(),
                "RH_Avg".to_string(),
                String::new(),
                String::new(),
                "Out of range".to_string(),
            ]
        );
    }
}
