use std::collections::HashSet;
use tracing::debug;

use crate::family::{AliasTable, CanonicalSchema};
use crate::table::{SourceTable, Value};

/// What normalization did to a table's headers, for logging and inspection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingReport {
    /// (source header, canonical name) for every header the alias table renamed
    pub renamed: Vec<(String, String)>,
    /// columns discarded because an earlier column already had the same name
    pub duplicates: Vec<String>,
    /// canonical columns absent from the source, filled with missing values
    pub filled: Vec<String>,
    /// source columns with no canonical counterpart
    pub dropped: Vec<String>,
}

/// Map `table` onto `schema`.
///
/// 1. rename aliased headers, leaving the rest as they are
/// 2. keep only the first column of each name
/// 3. add absent canonical columns as all-missing
/// 4. drop everything not in the schema, emit in schema order
///
/// Running this on its own output changes nothing.
pub fn normalize_headers(
    table: &SourceTable,
    aliases: &AliasTable,
    schema: &CanonicalSchema,
) -> (SourceTable, MappingReport) {
    let mut report = MappingReport::default();

    // 1) rename
    let renamed: Vec<String> = table
        .columns
        .iter()
        .map(|header| match aliases.resolve(header) {
            Some(canonical) => {
                if canonical != header.as_str() {
                    report.renamed.push((header.clone(), canonical.to_string()));
                }
                canonical.to_string()
            }
            None => header.clone(),
        })
        .collect();

    // 2) first occurrence of each name wins
    let mut seen = HashSet::new();
    let mut keep: Vec<(usize, &str)> = Vec::with_capacity(renamed.len());
    for (idx, name) in renamed.iter().enumerate() {
        if seen.insert(name.as_str()) {
            keep.push((idx, name.as_str()));
        } else {
            report.duplicates.push(name.clone());
        }
    }
    for (_, name) in &keep {
        if !schema.contains(name) {
            report.dropped.push(name.to_string());
        }
    }

    // 3) + 4) project onto the schema
    let sources: Vec<Option<usize>> = schema
        .columns()
        .iter()
        .map(|canonical| {
            let found = keep
                .iter()
                .find(|(_, name)| *name == canonical.as_str())
                .map(|(idx, _)| *idx);
            if found.is_none() {
                report.filled.push(canonical.clone());
            }
            found
        })
        .collect();

    let mut out = SourceTable::new(schema.columns().to_vec());
    out.rows = table
        .rows
        .iter()
        .map(|row| {
            sources
                .iter()
                .map(|src| match src {
                    Some(i) => row.get(*i).cloned().unwrap_or(Value::Missing),
                    None => Value::Missing,
                })
                .collect()
        })
        .collect();

    debug!(
        renamed = report.renamed.len(),
        duplicates = report.duplicates.len(),
        filled = ?report.filled,
        dropped = ?report.dropped,
        "normalized headers"
    );
    (out, report)
}
