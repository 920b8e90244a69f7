// src/output/columnar.rs
use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use parquet::format::KeyValue;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use super::{anomaly_row, tmp_path, ANOMALY_HEADERS};
use crate::quality::AnomalyRecord;
use crate::table::{SourceTable, Value};

/// Combined dataset as one parquet file. A column is Float64 when every
/// present cell is numeric, Utf8 otherwise.
pub fn write_dataset(path: &Path, table: &SourceTable) -> Result<()> {
    let mut fields = Vec::with_capacity(table.columns.len());
    let mut arrays = Vec::with_capacity(table.columns.len());
    for (idx, name) in table.columns.iter().enumerate() {
        let (dtype, array) = column_array(table, idx);
        fields.push(Field::new(name, dtype, true));
        arrays.push(array);
    }
    write_batch(path, Schema::new(fields), arrays, None)
}

/// Anomaly log as one parquet file; the title rides along as key-value
/// metadata under `title`.
pub fn write_anomalies(path: &Path, anomalies: &[AnomalyRecord], title: &str) -> Result<()> {
    let rows: Vec<[String; 6]> = anomalies.iter().map(anomaly_row).collect();
    let mut fields = Vec::with_capacity(ANOMALY_HEADERS.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(ANOMALY_HEADERS.len());
    for (idx, name) in ANOMALY_HEADERS.iter().enumerate() {
        fields.push(Field::new(*name, DataType::Utf8, true));
        let values: Vec<Option<&str>> = rows
            .iter()
            .map(|r| Some(r[idx].as_str()).filter(|s| !s.is_empty()))
            .collect();
        arrays.push(Arc::new(StringArray::from(values)));
    }
    let title_kv = KeyValue::new("title".to_string(), Some(title.to_string()));
    write_batch(path, Schema::new(fields), arrays, Some(vec![title_kv]))
}

fn column_array(table: &SourceTable, idx: usize) -> (DataType, ArrayRef) {
    let cells = table.rows.iter().map(|row| &row[idx]);
    let numeric = cells
        .clone()
        .all(|v| matches!(v, Value::Number(_) | Value::Missing));
    if numeric {
        let values: Vec<Option<f64>> = cells.map(Value::as_number).collect();
        (DataType::Float64, Arc::new(Float64Array::from(values)))
    } else {
        let values: Vec<Option<String>> = cells
            .map(|v| (!v.is_missing()).then(|| v.to_string()))
            .collect();
        (DataType::Utf8, Arc::new(StringArray::from(values)))
    }
}

fn write_batch(
    path: &Path,
    schema: Schema,
    arrays: Vec<ArrayRef>,
    metadata: Option<Vec<KeyValue>>,
) -> Result<()> {
    let schema = Arc::new(schema);
    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building RecordBatch")?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    let tmp = tmp_path(path);
    let file = File::create(&tmp)
        .with_context(|| format!("could not create temporary file `{}`", tmp.display()))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_key_value_metadata(metadata)
        .build();
    let mut writer = ArrowWriter::try_new(BufWriter::new(file), schema, Some(props))
        .context("initializing Parquet writer")?;
    writer.write(&batch).context("writing batch to Parquet")?;
    writer.close().context("closing Parquet writer")?;

    fs::rename(&tmp, path)
        .with_context(|| format!("failed to rename `{}` to `{}`", tmp.display(), path.display()))?;
    debug!(path = %path.display(), rows = batch.num_rows(), "parquet written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::{AnomalyTime, Flag};
    use arrow::array::Array;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use tempfile::tempdir;

    #[test]
    fn dataset_column_types() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("d.pt_data.parquet");
        let mut table = SourceTable::new(vec!["Date/Time".into(), "RH_Avg".into()]);
        table.push_row(vec![Value::Text("garbage".into()), Value::Number(55.0)]);
        table.push_row(vec![Value::Missing, Value::Missing]);
        write_dataset(&path, &table)?;

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path)?)?.build()?;
        let batches: Vec<RecordBatch> = reader.collect::<Result<_, _>>()?;
        let batch = &batches[0];
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().field(0).data_type(), &DataType::Utf8);
        assert_eq!(batch.schema().field(1).data_type(), &DataType::Float64);
        let rh = batch
            .column(1)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(rh.value(0), 55.0);
        assert!(rh.is_null(1));
        Ok(())
    }

    #[test]
    fn anomaly_title_is_in_metadata() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("d.bad_data.parquet");
        let rec = AnomalyRecord {
            start: AnomalyTime::Invalid,
            end: AnomalyTime::Invalid,
            column: "VPD_Avg".into(),
            notes: Flag::Nan,
        };
        write_anomalies(&path, &[rec], "01.01.2024 Poloa")?;

        let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(&path)?)?;
        let kv = builder
            .metadata()
            .file_metadata()
            .key_value_metadata()
            .cloned()
            .unwrap_or_default();
        assert!(kv
            .iter()
            .any(|e| e.key == "title" && e.value.as_deref() == Some("01.01.2024 Poloa")));
        let batches: Vec<RecordBatch> = builder.build()?.collect::<Result<_, _>>()?;
        assert_eq!(batches[0].num_columns(), 6);
        assert!(batches[0].column(3).is_null(0));
        Ok(())
    }

    #[test]
    fn empty_run_still_writes_headers() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("empty.parquet");
        write_anomalies(&path, &[], "t")?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(&path)?)?;
        assert_eq!(builder.schema().fields().len(), 6);
        Ok(())
    }
}
