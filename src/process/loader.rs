// src/process/loader.rs
use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Data, DataType, Reader};
use csv::ReaderBuilder;
use std::path::Path;
use tracing::{debug, instrument};

use crate::error::PipelineError;
use crate::process::date_parser::parse_timestamp;
use crate::process::utils::{clean_str, is_blank_row, parse_cell};
use crate::table::{NamedTable, SourceArtifact, SourceTable, Value};

/// Header cells that mark the start of the real header line.
const DATETIME_HEADERS: &[&str] = &["Date/Time", "Date and Time", "Timestamp", "TIMESTAMP"];

/// How far down a sheet the header line may sit.
const HEADER_SCAN_ROWS: usize = 20;

/// Rows between the header and the data in a Campbell TOA5 file (units, processing).
const TOA5_META_ROWS: usize = 2;

/// Which reader handles a file, decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Delimited,
    Workbook,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" | "dat" | "txt" => Some(SourceKind::Delimited),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Some(SourceKind::Workbook),
            _ => None,
        }
    }
}

/// Read every table out of `path`.
#[instrument(level = "debug", fields(path = %path.display()))]
pub fn load_artifact(path: &Path) -> Result<SourceArtifact> {
    match SourceKind::from_path(path) {
        Some(SourceKind::Delimited) => load_delimited(path),
        Some(SourceKind::Workbook) => load_workbook(path),
        None => Err(PipelineError::UnsupportedExtension(path.to_path_buf()).into()),
    }
}

/// A delimited export holds exactly one table, named after the file stem.
pub fn load_delimited(path: &Path) -> Result<SourceArtifact> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // preamble lines are shorter than data lines
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut grid = Vec::new();
    for (idx, result) in rdr.byte_records().enumerate() {
        let record =
            result.with_context(|| format!("CSV parse error in {} at record {}", path.display(), idx))?;
        // exports from older loggers are Latin-1; keep going with replacement chars
        let row: Vec<Value> = record
            .iter()
            .map(|field| parse_cell(&String::from_utf8_lossy(field)))
            .collect();
        grid.push(row);
    }

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let table = grid_to_table(grid);
    debug!(table = %name, rows = table.len(), "read delimited table");
    Ok(SourceArtifact {
        tables: vec![NamedTable { name, table }],
    })
}

/// A workbook yields one table per sheet, in stored order.
pub fn load_workbook(path: &Path) -> Result<SourceArtifact> {
    let mut workbook =
        open_workbook_auto(path).with_context(|| format!("opening workbook {}", path.display()))?;

    let mut tables = Vec::new();
    for sheet in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&sheet)
            .with_context(|| format!("reading sheet `{}` of {}", sheet, path.display()))?;
        let grid: Vec<Vec<Value>> = range
            .rows()
            .map(|row| row.iter().map(cell_value).collect())
            .collect();
        let table = grid_to_table(grid);
        debug!(sheet = %sheet, rows = table.len(), "read sheet");
        tables.push(NamedTable { name: sheet, table });
    }
    Ok(SourceArtifact { tables })
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Int(i) => Value::Number(*i as f64),
        Data::Float(f) if f.is_finite() => Value::Number(*f),
        Data::Float(_) => Value::Missing,
        Data::String(s) => parse_cell(s),
        Data::Bool(b) => Value::Text(b.to_string()),
        Data::DateTime(_) => cell
            .as_datetime()
            .map(Value::Timestamp)
            .unwrap_or(Value::Missing),
        Data::DateTimeIso(s) => parse_timestamp(s)
            .map(Value::Timestamp)
            .unwrap_or_else(|| Value::Text(s.clone())),
        Data::DurationIso(s) => Value::Text(s.clone()),
        Data::Error(_) | Data::Empty => Value::Missing,
    }
}

/// Locate the header line, drop logger preamble and metadata rows, and build
/// the table from what follows.
pub fn grid_to_table(grid: Vec<Vec<Value>>) -> SourceTable {
    if grid.is_empty() {
        return SourceTable::default();
    }

    let is_toa5 = matches!(grid[0].first(), Some(Value::Text(t)) if t == "TOA5");
    let header_idx = find_header_row(&grid).unwrap_or(0);
    let skip_after = if is_toa5 { TOA5_META_ROWS } else { 0 };

    let mut rows = grid.into_iter().skip(header_idx);
    let header = rows.next().unwrap_or_default();
    let columns: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, cell)| match clean_str(&cell.to_string()) {
            s if s.is_empty() => format!("Unnamed: {}", i),
            s => s,
        })
        .collect();

    let mut table = SourceTable::new(columns);
    for row in rows.skip(skip_after) {
        if is_blank_row(&row) {
            continue;
        }
        table.push_row(row);
    }
    table
}

fn find_header_row(grid: &[Vec<Value>]) -> Option<usize> {
    grid.iter().take(HEADER_SCAN_ROWS).position(|row| {
        row.iter().any(|cell| match cell {
            Value::Text(t) => is_datetime_header(t),
            _ => false,
        })
    })
}

fn is_datetime_header(cell: &str) -> bool {
    let cell = cell.trim();
    DATETIME_HEADERS.contains(&cell) || cell.starts_with("Date Time")
}
