use serde::Serialize;
use std::fmt;

use crate::table::RowView;

/// Classification attached to a flagged observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Flag {
    NegativeNumber,
    RecordedZero,
    Nan,
    OutOfRange,
}

impl Flag {
    /// Tag text as it appears in the anomaly log.
    pub fn as_str(&self) -> &'static str {
        match self {
            Flag::NegativeNumber => "Negative number",
            Flag::RecordedZero => "Recorded 0",
            Flag::Nan => "NAN",
            Flag::OutOfRange => "Out of range",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Flag {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

/// Check that needs other columns of the same row. Receives the row and the
/// name of the column being judged.
pub type CrossFieldCheck = fn(&RowView<'_>, &str) -> Option<Flag>;

/// Validity rule for one canonical column. Conditions are tried in the order
/// listed per variant; the first that holds decides.
#[derive(Debug, Clone)]
pub enum Rule {
    /// missing -> `NAN`
    Presence,
    /// negative -> `Negative number`, zero -> `Recorded 0`, missing -> `NAN`
    NonNegative,
    /// zero -> `Recorded 0`, missing -> `NAN`, outside `[min, max]` -> `Out of range`
    Range { min: f64, max: f64 },
    /// negative -> `Negative number`, above `max` -> `Out of range`, missing -> `NAN`
    Angle { max: f64 },
    /// Arbitrary predicate over the whole row; `reads` names the sibling
    /// column it consults.
    CrossField {
        reads: &'static str,
        check: CrossFieldCheck,
    },
}

impl Rule {
    pub fn evaluate(&self, row: &RowView<'_>, column: &str) -> Option<Flag> {
        let reading = row.number(column);
        match self {
            Rule::Presence => reading.is_none().then_some(Flag::Nan),
            Rule::NonNegative => match reading {
                Some(v) if v < 0.0 => Some(Flag::NegativeNumber),
                Some(v) if v == 0.0 => Some(Flag::RecordedZero),
                Some(_) => None,
                None => Some(Flag::Nan),
            },
            Rule::Range { min, max } => match reading {
                Some(v) if v == 0.0 => Some(Flag::RecordedZero),
                Some(v) if v < *min || v > *max => Some(Flag::OutOfRange),
                Some(_) => None,
                None => Some(Flag::Nan),
            },
            Rule::Angle { max } => match reading {
                Some(v) if v < 0.0 => Some(Flag::NegativeNumber),
                Some(v) if v > *max => Some(Flag::OutOfRange),
                Some(_) => None,
                None => Some(Flag::Nan),
            },
            Rule::CrossField { check, .. } => check(row, column),
        }
    }

    /// Sibling column a cross-field rule consults.
    pub fn reads(&self) -> Option<&'static str> {
        match self {
            Rule::CrossField { reads, .. } => Some(*reads),
            _ => None,
        }
    }
}

/// Column -> rule, kept in evaluation order.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<(String, Rule)>,
}

impl RuleSet {
    pub fn new<I, S>(rules: I) -> Self
    where
        I: IntoIterator<Item = (S, Rule)>,
        S: Into<String>,
    {
        Self {
            rules: rules.into_iter().map(|(c, r)| (c.into(), r)).collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rule)> {
        self.rules.iter().map(|(c, r)| (c.as_str(), r))
    }
}

/// A zero vapor-pressure deficit is expected only while the air is saturated.
pub fn zero_unless_saturated(row: &RowView<'_>, column: &str) -> Option<Flag> {
    match row.number(column) {
        Some(v) if v == 0.0 && row.number("RH_Avg") != Some(100.0) => Some(Flag::RecordedZero),
        Some(_) => None,
        None => Some(Flag::Nan),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    fn eval(rule: &Rule, cols: &[&str], vals: Vec<Value>, column: &str) -> Option<Flag> {
        let cols: Vec<String> = cols.iter().map(|s| s.to_string()).collect();
        rule.evaluate(&RowView::new(&cols, &vals), column)
    }

    fn one(rule: &Rule, v: Value) -> Option<Flag> {
        eval(rule, &["x"], vec![v], "x")
    }

    #[test]
    fn non_negative_priority() {
        let r = Rule::NonNegative;
        assert_eq!(one(&r, Value::Number(-0.1)), Some(Flag::NegativeNumber));
        assert_eq!(one(&r, Value::Number(0.0)), Some(Flag::RecordedZero));
        assert_eq!(one(&r, Value::Missing), Some(Flag::Nan));
        assert_eq!(one(&r, Value::Text("ERR".into())), Some(Flag::Nan));
        assert_eq!(one(&r, Value::Number(21.4)), None);
    }

    #[test]
    fn humidity_range() {
        let r = Rule::Range { min: 10.0, max: 100.0 };
        assert_eq!(one(&r, Value::Number(0.0)), Some(Flag::RecordedZero));
        assert_eq!(one(&r, Value::Number(5.0)), Some(Flag::OutOfRange));
        assert_eq!(one(&r, Value::Number(100.5)), Some(Flag::OutOfRange));
        assert_eq!(one(&r, Value::Number(-2.0)), Some(Flag::OutOfRange));
        assert_eq!(one(&r, Value::Number(50.0)), None);
        assert_eq!(one(&r, Value::Number(10.0)), None);
        assert_eq!(one(&r, Value::Number(100.0)), None);
        assert_eq!(one(&r, Value::Missing), Some(Flag::Nan));
    }

    #[test]
    fn wind_direction() {
        let r = Rule::Angle { max: 360.0 };
        assert_eq!(one(&r, Value::Number(370.0)), Some(Flag::OutOfRange));
        assert_eq!(one(&r, Value::Number(-5.0)), Some(Flag::NegativeNumber));
        assert_eq!(one(&r, Value::Number(180.0)), None);
        assert_eq!(one(&r, Value::Number(0.0)), None);
        assert_eq!(one(&r, Value::Number(360.0)), None);
        assert_eq!(one(&r, Value::Missing), Some(Flag::Nan));
    }

    #[test]
    fn presence_only() {
        let r = Rule::Presence;
        assert_eq!(one(&r, Value::Number(0.0)), None);
        assert_eq!(one(&r, Value::Number(-1.0)), None);
        assert_eq!(one(&r, Value::Missing), Some(Flag::Nan));
    }

    #[test]
    fn vpd_zero_is_fine_when_saturated() {
        let r = Rule::CrossField {
            reads: "RH_Avg",
            check: zero_unless_saturated,
        };
        let cols = ["VPD_Avg", "RH_Avg"];
        let at = |vpd: Value, rh: Value| eval(&r, &cols, vec![vpd, rh], "VPD_Avg");
        assert_eq!(at(Value::Number(0.0), Value::Number(100.0)), None);
        assert_eq!(at(Value::Number(0.0), Value::Number(97.0)), Some(Flag::RecordedZero));
        assert_eq!(at(Value::Number(0.0), Value::Missing), Some(Flag::RecordedZero));
        assert_eq!(at(Value::Missing, Value::Number(100.0)), Some(Flag::Nan));
        assert_eq!(at(Value::Number(0.4), Value::Number(60.0)), None);
        assert_eq!(r.reads(), Some("RH_Avg"));
        assert_eq!(Rule::Presence.reads(), None);
    }

    #[test]
    fn flag_text() {
        assert_eq!(Flag::RecordedZero.to_string(), "Recorded 0");
        assert_eq!(serde_json::to_string(&Flag::Nan).unwrap(), "\"NAN\"");
    }
}
