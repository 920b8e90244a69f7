use crate::table::Value;

/// Tokens logger firmware writes in place of a reading.
const MISSING_TOKENS: &[&str] = &["", "NAN", "NaN", "nan", "NA", "N/A", "#N/A"];

/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches('\u{feff}');
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Classify a raw text cell: missing token, number, or text.
pub fn parse_cell(raw: &str) -> Value {
    let cleaned = clean_str(raw);
    if MISSING_TOKENS.contains(&cleaned.as_str()) {
        return Value::Missing;
    }
    match cleaned.parse::<f64>() {
        Ok(n) if n.is_finite() => Value::Number(n),
        Ok(_) => Value::Missing,
        Err(_) => Value::Text(cleaned),
    }
}

/// A row with nothing but missing cells carries no observation.
pub fn is_blank_row(row: &[Value]) -> bool {
    row.iter().all(Value::is_missing)
}
