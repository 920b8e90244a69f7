// src/output/workbook.rs
use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::fs;
use std::path::Path;
use tracing::debug;

use super::{anomaly_row, tmp_path, ANOMALY_HEADERS, ANOMALY_TABLE, DATA_TABLE};
use crate::pipeline::CombinedDataset;
use crate::process::date_parser::format_timestamp;
use crate::table::Value;

/// One workbook: `PT data` with the combined rows, `Bad data` with the title
/// in A1 and the anomaly table from row 2.
pub fn write_workbook(path: &Path, dataset: &CombinedDataset, title: &str) -> Result<()> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(DATA_TABLE)?;
        for (c, name) in dataset.table.columns.iter().enumerate() {
            sheet.write_string_with_format(0, c as u16, name.as_str(), &bold)?;
        }
        for (r, row) in dataset.table.rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                write_value(sheet, r as u32 + 1, c as u16, value)
                    .with_context(|| format!("writing data row {}", r + 1))?;
            }
        }
    }

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(ANOMALY_TABLE)?;
        sheet.write_string_with_format(0, 0, title, &bold)?;
        for (c, name) in ANOMALY_HEADERS.iter().enumerate() {
            sheet.write_string_with_format(1, c as u16, *name, &bold)?;
        }
        for (r, record) in dataset.anomalies.iter().enumerate() {
            for (c, cell) in anomaly_row(record).iter().enumerate() {
                if !cell.is_empty() {
                    sheet.write_string(r as u32 + 2, c as u16, cell.as_str())?;
                }
            }
        }
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    let tmp = tmp_path(path);
    workbook
        .save(&tmp)
        .with_context(|| format!("saving workbook {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to rename `{}` to `{}`", tmp.display(), path.display()))?;
    debug!(
        rows = dataset.table.len(),
        anomalies = dataset.anomalies.len(),
        "workbook saved"
    );
    Ok(())
}

fn write_value(sheet: &mut Worksheet, row: u32, col: u16, value: &Value) -> Result<()> {
    match value {
        Value::Number(n) => {
            sheet.write_number(row, col, *n)?;
        }
        Value::Text(s) => {
            sheet.write_string(row, col, s.as_str())?;
        }
        Value::Timestamp(ts) => {
            sheet.write_string(row, col, format_timestamp(ts))?;
        }
        Value::Missing => {}
    }
    Ok(())
}
