//! Quality rule engine: turns a normalized table into anomaly records.

pub mod rules;

pub use rules::{zero_unless_saturated, CrossFieldCheck, Flag, Rule, RuleSet};

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

use crate::process::date_parser::format_timestamp;
use crate::table::{RowView, SourceTable};

/// Placeholder written when a row's timestamp cannot be read.
pub const INVALID_TIMESTAMP: &str = "Invalid Date/Time";

/// When an anomaly happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AnomalyTime {
    At(NaiveDateTime),
    Invalid,
}

impl fmt::Display for AnomalyTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyTime::At(ts) => f.write_str(&format_timestamp(ts)),
            AnomalyTime::Invalid => f.write_str(INVALID_TIMESTAMP),
        }
    }
}

impl Serialize for AnomalyTime {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

/// One flagged (row, column) observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnomalyRecord {
    pub start: AnomalyTime,
    pub end: AnomalyTime,
    pub column: String,
    pub notes: Flag,
}

/// Flags raised by a single row, in rule order.
pub fn evaluate_row<'r>(row: &RowView<'_>, rules: &'r RuleSet) -> Vec<(&'r str, Flag)> {
    rules
        .iter()
        .filter(|(column, _)| row.get(column).is_some())
        .filter_map(|(column, rule)| rule.evaluate(row, column).map(|flag| (column, flag)))
        .collect()
}

/// Evaluate every rule-bearing column of every row.
///
/// Rows whose timestamp does not parse are still evaluated; their records
/// carry [`AnomalyTime::Invalid`].
pub fn scan_table(table: &SourceTable, rules: &RuleSet, timestamp_column: &str) -> Vec<AnomalyRecord> {
    let mut records = Vec::new();
    for row in table.iter_rows() {
        let when = row
            .get(timestamp_column)
            .and_then(|v| v.as_timestamp())
            .map(AnomalyTime::At)
            .unwrap_or(AnomalyTime::Invalid);
        for (column, notes) in evaluate_row(&row, rules) {
            records.push(AnomalyRecord {
                start: when,
                end: when,
                column: column.to_string(),
                notes,
            });
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::{DataFamily, TIMESTAMP_COLUMN};
    use crate::table::Value;
    use chrono::NaiveDate;

    fn weather_row(ts: &str, rh: f64, wduv: f64) -> (Vec<String>, Vec<Value>) {
        let profile = DataFamily::WeatherStation.profile();
        let cols = profile.schema.columns().to_vec();
        let mut vals = vec![Value::Number(1.0); cols.len()];
        vals[0] = Value::Text(ts.to_string());
        let rh_idx = cols.iter().position(|c| c == "RH_Avg").unwrap();
        let wd_idx = cols.iter().position(|c| c == "WDuv_Avg").unwrap();
        vals[rh_idx] = Value::Number(rh);
        vals[wd_idx] = Value::Number(wduv);
        (cols, vals)
    }

    fn scan(rows: Vec<(Vec<String>, Vec<Value>)>) -> Vec<AnomalyRecord> {
        let profile = DataFamily::WeatherStation.profile();
        let mut table = SourceTable::new(rows[0].0.clone());
        for (_, vals) in rows {
            table.push_row(vals);
        }
        scan_table(&table, &profile.rules, TIMESTAMP_COLUMN)
    }

    #[test]
    fn humidity_scenarios() {
        let recs = scan(vec![weather_row("01/27/2024 13:15", 0.0, 90.0)]);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].column, "RH_Avg");
        assert_eq!(recs[0].notes, Flag::RecordedZero);

        let recs = scan(vec![weather_row("01/27/2024 13:15", 5.0, 90.0)]);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].notes, Flag::OutOfRange);

        assert!(scan(vec![weather_row("01/27/2024 13:15", 50.0, 90.0)]).is_empty());
    }

    #[test]
    fn wind_direction_scenarios() {
        let recs = scan(vec![weather_row("01/27/2024 13:15", 50.0, 370.0)]);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].column, "WDuv_Avg");
        assert_eq!(recs[0].notes, Flag::OutOfRange);

        let recs = scan(vec![weather_row("01/27/2024 13:15", 50.0, -5.0)]);
        assert_eq!(recs[0].notes, Flag::NegativeNumber);

        assert!(scan(vec![weather_row("01/27/2024 13:15", 50.0, 180.0)]).is_empty());
    }

    #[test]
    fn one_record_per_flagged_column_with_point_times() {
        let recs = scan(vec![weather_row("01/27/2024 13:15", 0.0, 400.0)]);
        assert_eq!(recs.len(), 2);
        let at = NaiveDate::from_ymd_opt(2024, 1, 27)
            .unwrap()
            .and_hms_opt(13, 15, 0)
            .unwrap();
        for r in &recs {
            assert_eq!(r.start, AnomalyTime::At(at));
            assert_eq!(r.start, r.end);
        }
        // schema order: RH_Avg precedes WDuv_Avg
        assert_eq!(recs[0].column, "RH_Avg");
        assert_eq!(recs[1].column, "WDuv_Avg");
    }

    #[test]
    fn bad_timestamp_rows_are_still_evaluated() {
        let recs = scan(vec![weather_row("not a time", 0.0, 90.0)]);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].start, AnomalyTime::Invalid);
        assert_eq!(recs[0].start.to_string(), INVALID_TIMESTAMP);
    }

    #[test]
    fn rules_skip_columns_the_table_lacks() {
        let profile = DataFamily::WeatherStation.profile();
        let mut table = SourceTable::new(vec!["Date/Time".into(), "RH_Avg".into()]);
        table.push_row(vec![Value::Text("01/27/2024 13:15".into()), Value::Missing]);
        let recs = scan_table(&table, &profile.rules, TIMESTAMP_COLUMN);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].notes, Flag::Nan);
    }

    #[test]
    fn stream_gauge_rules() {
        let profile = DataFamily::StreamGauge.profile();
        let cols = profile.schema.columns().to_vec();
        let mut vals = vec![Value::Number(1.0); cols.len()];
        vals[0] = Value::Text("01/15/2024 13:15".into());
        let mut set = |name: &str, v: f64| {
            let idx = cols.iter().position(|c| c == name).unwrap();
            vals[idx] = Value::Number(v);
        };
        set("RHenc", 5.0);
        set("Twt_F_Avg", -3.0);
        set("TCair_Avg", 0.0);

        let row = RowView::new(&cols, &vals);
        let mut flags = evaluate_row(&row, &profile.rules);
        flags.sort();
        assert_eq!(
            flags,
            vec![
                ("RHenc", Flag::OutOfRange),
                ("TCair_Avg", Flag::RecordedZero),
                ("Twt_F_Avg", Flag::NegativeNumber),
            ]
        );

        // presence-only columns flag a gap and nothing else
        let level = cols.iter().position(|c| c == "WTlvl_Avg").unwrap();
        let mut vals = vec![Value::Number(1.0); cols.len()];
        vals[0] = Value::Text("01/15/2024 13:15".into());
        vals[level] = Value::Missing;
        let row = RowView::new(&cols, &vals);
        assert_eq!(
            evaluate_row(&row, &profile.rules),
            vec![("WTlvl_Avg", Flag::Nan)]
        );
        vals[level] = Value::Number(-2.0);
        let row = RowView::new(&cols, &vals);
        assert!(evaluate_row(&row, &profile.rules).is_empty());
    }

    #[test]
    fn evaluation_is_deterministic() {
        let profile = DataFamily::WeatherStation.profile();
        let (cols, vals) = weather_row("01/27/2024 13:15", 0.0, -1.0);
        let row = RowView::new(&cols, &vals);
        let first = evaluate_row(&row, &profile.rules);
        for _ in 0..5 {
            assert_eq!(evaluate_row(&row, &profile.rules), first);
        }
    }
}
