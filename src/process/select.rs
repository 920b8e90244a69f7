use tracing::{debug, warn};

use crate::table::{NamedTable, SourceArtifact};

/// Sheet the field workbooks keep their logger data on.
pub const PREFERRED_TABLE: &str = "PT data";

/// How a table was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The preferred table exists and was taken as-is, even if empty.
    Preferred,
    /// First non-empty table in stored order.
    FirstNonEmpty,
    /// Every table was empty; the last one scanned is returned.
    AllEmpty,
}

/// Pick the table to extract from `artifact`.
///
/// Returns `None` only when the artifact holds no tables at all. When every
/// table is empty the last one scanned comes back tagged
/// [`Selection::AllEmpty`] so the caller can decide what an empty pick means.
pub fn select_table<'a>(
    artifact: &'a SourceArtifact,
    preferred: Option<&str>,
) -> Option<(&'a NamedTable, Selection)> {
    if let Some(name) = preferred {
        if let Some(t) = artifact.tables.iter().find(|t| t.name == name) {
            debug!(table = %t.name, rows = t.table.len(), "using preferred table");
            return Some((t, Selection::Preferred));
        }
    }

    let mut last = None;
    for t in &artifact.tables {
        if !t.table.is_empty() {
            debug!(table = %t.name, rows = t.table.len(), "using first non-empty table");
            return Some((t, Selection::FirstNonEmpty));
        }
        last = Some(t);
    }

    last.map(|t| {
        warn!(table = %t.name, "all tables are empty, falling back to the last one");
        (t, Selection::AllEmpty)
    })
}
