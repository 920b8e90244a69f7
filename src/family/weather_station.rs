use super::{AliasTable, CanonicalSchema, DataFamily, FamilyProfile, TIMESTAMP_COLUMN};
use crate::quality::{zero_unless_saturated, Rule, RuleSet};

pub const COLUMNS: [&str; 14] = [
    TIMESTAMP_COLUMN,
    "SWin_Avg",
    "Tair_Avg",
    "RH_Avg",
    "VP_Avg",
    "VPsat_Avg",
    "VPD_Avg",
    "WS_Avg",
    "WSrs_Avg",
    "WDuv_Avg",
    "WDrs_Avg",
    "WD_StdY",
    "WD_StdCS",
    "RF_Tot",
];

/// Header spellings seen in Campbell exports and in hand-edited workbooks.
const ALIASES: &[(&str, &str)] = &[
    ("TIMESTAMP", TIMESTAMP_COLUMN),
    ("Timestamp", TIMESTAMP_COLUMN),
    ("Date and Time", TIMESTAMP_COLUMN),
    ("Date Time", TIMESTAMP_COLUMN),
    ("Swin_Avg", "SWin_Avg"),
    ("Swin_Avg (W/m²)", "SWin_Avg"),
    ("SWin_Avg (W/m²)", "SWin_Avg"),
    ("SWin_Avg (W/m^2)", "SWin_Avg"),
    ("Thermocouple C", "Tair_Avg"),
    ("Tair_Avg (C)", "Tair_Avg"),
    ("RH_Avg Percent", "RH_Avg"),
    ("RH_Avg (%)", "RH_Avg"),
    ("RH", "RH_Avg"),
    ("VP_Avg (kPa)", "VP_Avg"),
    ("VPsat_Avg (kPa)", "VPsat_Avg"),
    ("VPD_Avg (kPa)", "VPD_Avg"),
    ("WS_Avg (m/s)", "WS_Avg"),
    ("WSrs_Avg (m/s)", "WSrs_Avg"),
    ("WDuv_Avg (degrees)", "WDuv_Avg"),
    ("WDrs_Avg (degrees)", "WDrs_Avg"),
    ("WD_StdY (degrees)", "WD_StdY"),
    ("WD_StdCS (degrees)", "WD_StdCS"),
    ("RF_Tot (mm)", "RF_Tot"),
    ("Rain_mm_Tot", "RF_Tot"),
];

pub fn profile() -> FamilyProfile {
    FamilyProfile {
        family: DataFamily::WeatherStation,
        schema: CanonicalSchema::new(COLUMNS),
        aliases: AliasTable::new(ALIASES.iter().copied()),
        rules: rules(),
        exclusions: Vec::new(),
    }
}

fn rules() -> RuleSet {
    let percent = Rule::Range {
        min: 10.0,
        max: 100.0,
    };
    let angle = Rule::Angle { max: 360.0 };
    RuleSet::new([
        ("SWin_Avg", Rule::NonNegative),
        ("Tair_Avg", Rule::NonNegative),
        ("RH_Avg", percent),
        ("VP_Avg", Rule::Presence),
        ("VPsat_Avg", Rule::Presence),
        (
            "VPD_Avg",
            Rule::CrossField {
                reads: "RH_Avg",
                check: zero_unless_saturated,
            },
        ),
        ("WS_Avg", Rule::NonNegative),
        ("WSrs_Avg", Rule::NonNegative),
        ("WDuv_Avg", angle.clone()),
        ("WDrs_Avg", Rule::Presence),
        ("WD_StdY", angle),
        ("WD_StdCS", Rule::Presence),
        ("RF_Tot", Rule::Presence),
    ])
}
