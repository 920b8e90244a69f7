// src/table.rs
use chrono::NaiveDateTime;
use std::fmt;

use crate::process::date_parser::{format_timestamp, parse_timestamp};

/// A single cell as read from a logger export.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Timestamp(NaiveDateTime),
    Missing,
}

impl Value {
    /// Numeric reading of the cell. Text is parsed leniently; anything that
    /// does not parse is treated as no reading at all.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) if n.is_finite() => Some(*n),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing) || matches!(self, Value::Number(n) if n.is_nan())
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            Value::Text(s) => parse_timestamp(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
            Value::Timestamp(ts) => f.write_str(&format_timestamp(ts)),
            Value::Missing => Ok(()),
        }
    }
}

/// An ordered set of rows sharing one header line.
///
/// Rows are stored positionally against `columns`; column names are the join
/// key and may repeat until the table has been normalized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl SourceTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding short rows with `Missing` and truncating long ones
    /// so every row has one cell per column.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Missing);
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Index of the first column called `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows.iter().map(move |values| RowView {
            columns: &self.columns,
            values,
        })
    }

    /// Turn text cells of `column` into timestamps where they parse. Cells that
    /// do not parse are left untouched.
    pub fn coerce_timestamps(&mut self, column: &str) -> usize {
        let Some(idx) = self.column_index(column) else {
            return 0;
        };
        let mut unparsed = 0;
        for row in &mut self.rows {
            let cell = &mut row[idx];
            if let Value::Text(s) = cell {
                match parse_timestamp(s) {
                    Some(ts) => *cell = Value::Timestamp(ts),
                    None => unparsed += 1,
                }
            } else if !matches!(cell, Value::Timestamp(_)) {
                unparsed += 1;
            }
        }
        unparsed
    }
}

/// Read access to one row, addressed by column name.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> RowView<'a> {
    pub fn new(columns: &'a [String], values: &'a [Value]) -> Self {
        Self { columns, values }
    }

    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|i| self.values.get(i))
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_number)
    }
}

/// One table of a source artifact, under the name it was stored with.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTable {
    pub name: String,
    pub table: SourceTable,
}

/// Everything read out of one input file: a CSV yields a single table, a
/// workbook one table per sheet, in stored order.
#[derive(Debug, Clone, Default)]
pub struct SourceArtifact {
    pub tables: Vec<NamedTable>,
}
