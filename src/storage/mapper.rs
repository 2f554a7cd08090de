// Column helpers shared by every row mapper
// Legacy data uses zero-length blobs, -1 resource numbers and NULL notes as "absent"

use chrono::{NaiveDateTime, SubsecRound};
use rusqlite::Row;

/// Sentinel stored in resource-number columns that reference nothing
pub const NO_RESOURCE: i64 = -1;

/// NULL and zero-length blobs both mean "no image"
pub fn blob_or_absent(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<Vec<u8>>> {
    let bytes: Option<Vec<u8>> = row.get(column)?;
    Ok(bytes.filter(|b| !b.is_empty()))
}

/// Absent blobs are written back as empty, never NULL
pub fn blob_value(bytes: &Option<Vec<u8>>) -> Vec<u8> {
    bytes.clone().unwrap_or_default()
}

/// Free-text columns: NULL reads as the empty string
pub fn text_or_empty(row: &Row<'_>, column: &str) -> rusqlite::Result<String> {
    let text: Option<String> = row.get(column)?;
    Ok(text.unwrap_or_default())
}

pub fn resource_number(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<i64>> {
    let number: Option<i64> = row.get(column)?;
    Ok(number.filter(|n| *n != NO_RESOURCE))
}

pub fn resource_number_value(number: Option<i64>) -> i64 {
    number.unwrap_or(NO_RESOURCE)
}

/// Current local time at whole-second precision, the resolution timestamps are stored at
pub fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local().trunc_subsecs(0)
}

/// Format a decimal the way `#0.###` does: at least one integer digit, at
/// most three fraction digits, no trailing zeros
pub fn format_decimal(value: f64) -> String {
    let text = format!("{:.3}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Spread between two recorded readings, or empty when either is not a number
pub fn format_range(max: &str, min: &str) -> String {
    match (max.trim().parse::<f64>(), min.trim().parse::<f64>()) {
        (Ok(max), Ok(min)) => format_decimal(max - min),
        _ => String::new(),
    }
}
