use super::{AliasTable, CanonicalSchema, DataFamily, FamilyProfile, TIMESTAMP_COLUMN};
use crate::quality::{Rule, RuleSet};

pub const COLUMNS: [&str; 9] = [
    TIMESTAMP_COLUMN,
    "WTlvl_Avg",
    "Twt_F_Avg",
    "BattVolt_Avg",
    "BattVolt_Min",
    "Tpanel_Avg",
    "TCair_Avg",
    "RHenc",
    "RF_Tot",
];

/// HOBO pressure-transducer exports and Campbell gauge tables.
const ALIASES: &[(&str, &str)] = &[
    ("Date Time, GMT-11:00", TIMESTAMP_COLUMN),
    ("TIMESTAMP", TIMESTAMP_COLUMN),
    ("Timestamp", TIMESTAMP_COLUMN),
    ("Date and Time", TIMESTAMP_COLUMN),
    ("Abs Pres, psi", "WTlvl_Avg"),
    ("Temp, °F", "Twt_F_Avg"),
    ("Temp, \u{fffd}F", "Twt_F_Avg"),
    ("Batt_Volt_Avg", "BattVolt_Avg"),
    ("Batt_Volt_Min", "BattVolt_Min"),
    ("Panel_Temp", "Tpanel_Avg"),
    ("Air_Temp_C", "TCair_Avg"),
    ("Rel_Humidity", "RHenc"),
    ("Rain_Total_mm", "RF_Tot"),
    ("RF_Tot (mm)", "RF_Tot"),
];

/// Gauge exports known to be unusable; never read even when their name
/// carries an in-window date.
const EXCLUSIONS: &[&str] = &[
    "Nuuuli_4.1.1-2020.12.18.csv",
    "Nuuuli_4.1.1-2022.1.6.csv",
    "Nuuuli_4.1.1-2022.10.19.csv",
    "Nuuuli_4.1.1-2022.11.17.csv",
    "Nuuuli_4.1.1-2022.12.14.csv",
    "Nuuuli_4.1.1-2022.2.8.csv",
    "Nuuuli_4.1.1-2022.4.22.csv",
    "Nuuuli_4.1.1-2022.5.16.csv",
    "Nuuuli_4.1.1-2022.6.16.csv",
    "Nuuuli_4.1.1-2022.7.15.csv",
    "Nuuuli_4.1.1-2022.8.15.csv",
    "Nuuuli_4.1.1-2022.9.15.csv",
    "Nuuuli_4.1.1-2023.1.17.csv",
    "Nuuuli_4.1.1-2023.10.16.csv",
    "Nuuuli_4.1.1-2023.12.15.csv",
    "Nuuuli_4.1.1-2023.2.15.csv",
    "Nuuuli_4.1.1-2023.3.17.csv",
    "Nuuuli_4.1.1-2023.4.14.csv",
    "Nuuuli_4.1.1-2023.5.15.csv",
    "Nuuuli_4.1.1-2023.6.15.csv",
    "Nuuuli_4.1.1-2023.7.14.csv",
    "Nuuuli_4.1.1-2023.8.16.csv",
    "Nuuuli_4.1.1-2023.9.15.csv",
    "Nuuuli_ALL_SG_data.xlsx",
];

pub fn profile() -> FamilyProfile {
    FamilyProfile {
        family: DataFamily::StreamGauge,
        schema: CanonicalSchema::new(COLUMNS),
        aliases: AliasTable::new(ALIASES.iter().copied()),
        rules: RuleSet::new([
            ("WTlvl_Avg", Rule::Presence),
            ("Twt_F_Avg", Rule::NonNegative),
            ("BattVolt_Avg", Rule::Presence),
            ("BattVolt_Min", Rule::Presence),
            ("Tpanel_Avg", Rule::NonNegative),
            ("TCair_Avg", Rule::NonNegative),
            (
                "RHenc",
                Rule::Range {
                    min: 10.0,
                    max: 100.0,
                },
            ),
            ("RF_Tot", Rule::Presence),
        ]),
        exclusions: EXCLUSIONS.iter().map(|s| s.to_string()).collect(),
    }
}
