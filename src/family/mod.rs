//! Data families: the canonical schema, header aliases, exclusion list and
//! quality rules shared by one group of logger exports.

pub mod stream_gauge;
pub mod weather_station;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::PipelineError;
use crate::quality::RuleSet;

/// Canonical name of the timestamp column in every family.
pub const TIMESTAMP_COLUMN: &str = "Date/Time";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DataFamily {
    StreamGauge,
    WeatherStation,
}

impl fmt::Display for DataFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataFamily::StreamGauge => write!(f, "stream-gauge"),
            DataFamily::WeatherStation => write!(f, "weather-station"),
        }
    }
}

impl DataFamily {
    /// Built-in profile for this family.
    pub fn profile(self) -> FamilyProfile {
        match self {
            DataFamily::StreamGauge => stream_gauge::profile(),
            DataFamily::WeatherStation => weather_station::profile(),
        }
    }
}

/// Fixed, ordered column set a family is normalized to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalSchema {
    columns: Vec<String>,
}

impl CanonicalSchema {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Source header spelling -> canonical column name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    map: HashMap<String, String>,
}

impl AliasTable {
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            map: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Canonical name for `header`, if the table knows it.
    pub fn resolve(&self, header: &str) -> Option<&str> {
        self.map.get(header).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Layer `extra` on top of this table; later entries win.
    pub fn merge(&mut self, extra: &BTreeMap<String, String>) {
        for (k, v) in extra {
            self.map.insert(k.clone(), v.clone());
        }
    }

    /// Every target must be a canonical column, and a canonical name may only
    /// alias to itself. The second condition keeps normalization idempotent.
    pub fn validate(&self, schema: &CanonicalSchema) -> Result<(), PipelineError> {
        let mut keys: Vec<&String> = self.map.keys().collect();
        keys.sort();
        for alias in keys {
            let target = &self.map[alias];
            if !schema.contains(target) {
                return Err(PipelineError::InvalidAlias {
                    alias: alias.clone(),
                    target: target.clone(),
                    reason: "target is not a canonical column".into(),
                });
            }
            if schema.contains(alias) && alias != target {
                return Err(PipelineError::InvalidAlias {
                    alias: alias.clone(),
                    target: target.clone(),
                    reason: "a canonical column cannot be renamed".into(),
                });
            }
        }
        Ok(())
    }
}

/// Everything the pipeline needs to know about one data family.
#[derive(Debug, Clone)]
pub struct FamilyProfile {
    pub family: DataFamily,
    pub schema: CanonicalSchema,
    pub aliases: AliasTable,
    pub rules: RuleSet,
    pub exclusions: Vec<String>,
}

impl FamilyProfile {
    /// Aliases must be consistent, and every rule must judge and read
    /// canonical columns only.
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.aliases.validate(&self.schema)?;
        for (column, rule) in self.rules.iter() {
            if !self.schema.contains(column) {
                return Err(PipelineError::Config(format!(
                    "{} rule on unknown column `{}`",
                    self.family, column
                )));
            }
            if let Some(sibling) = rule.reads().filter(|s| !self.schema.contains(s)) {
                return Err(PipelineError::Config(format!(
                    "{} rule on `{}` reads unknown column `{}`",
                    self.family, column, sibling
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_profiles_are_consistent() {
        for family in [DataFamily::StreamGauge, DataFamily::WeatherStation] {
            let p = family.profile();
            assert_eq!(p.family, family);
            assert_eq!(p.schema.columns()[0], TIMESTAMP_COLUMN);
            p.validate().unwrap();
        }
    }

    #[test]
    fn alias_validation_rejects_renaming_canonical_names() {
        let schema = CanonicalSchema::new(["Date/Time", "RH_Avg", "Tair_Avg"]);
        let ok = AliasTable::new([("TIMESTAMP", "Date/Time"), ("RH_Avg", "RH_Avg")]);
        assert!(ok.validate(&schema).is_ok());

        let bad = AliasTable::new([("RH_Avg", "Tair_Avg")]);
        assert!(matches!(
            bad.validate(&schema),
            Err(PipelineError::InvalidAlias { .. })
        ));

        let unknown = AliasTable::new([("Temp", "Nope")]);
        assert!(unknown.validate(&schema).is_err());
    }

    #[test]
    fn cross_field_rule_must_read_a_canonical_column() {
        use crate::quality::{zero_unless_saturated, Rule};
        let mut p = DataFamily::WeatherStation.profile();
        p.rules = RuleSet::new([(
            "VPD_Avg",
            Rule::CrossField {
                reads: "Humidity",
                check: zero_unless_saturated,
            },
        )]);
        assert!(matches!(p.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn merge_overrides() {
        let mut t = AliasTable::new([("Temp", "Tair_Avg")]);
        let mut extra = BTreeMap::new();
        extra.insert("Temp".to_string(), "RH_Avg".to_string());
        extra.insert("Hum".to_string(), "RH_Avg".to_string());
        t.merge(&extra);
        assert_eq!(t.resolve("Temp"), Some("RH_Avg"));
        assert_eq!(t.resolve("Hum"), Some("RH_Avg"));
        assert_eq!(t.len(), 2);
    }
}
