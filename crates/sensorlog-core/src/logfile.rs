//! # Logbook File Format
//!
//! Plain text, rewritten on every row:
//!
//! ```text
//! # Time             <TAB>title [unit]<TAB>...
//! YYYY-MM-DD HH:MM:SS<TAB>value<TAB>...
//! ```
//!
//! Lines starting with `#` are dropped on read, so the header is always
//! regenerated. At most `max_entries` data rows are kept, oldest dropped
//! first.

use crate::primitives::{TIME_COLUMN_LABEL, VALUE_SIGNIFICANT_DIGITS};
use crate::types::{SensorlogError, Timestamp};
use chrono::{Local, TimeZone};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Header line for the given `(title, unit)` pairs, without newline.
#[must_use]
pub fn header<'a>(columns: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut line = format!("# {TIME_COLUMN_LABEL}");
    for (title, unit) in columns {
        line.push('\t');
        line.push_str(title);
        if !unit.is_empty() {
            line.push_str(" [");
            line.push_str(unit);
            line.push(']');
        }
    }
    line
}

/// Local time of `slot` as `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp(slot: Timestamp) -> Result<String, SensorlogError> {
    let millis = i64::try_from(slot)
        .map_err(|_| SensorlogError::Io(format!("Timestamp out of range: {slot}")))?;
    Local
        .timestamp_millis_opt(millis)
        .earliest()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .ok_or_else(|| SensorlogError::Io(format!("Timestamp out of range: {slot}")))
}

/// Shortest rendering of `value` with at most six significant digits.
///
/// Fixed notation for exponents in `-4..6`, scientific (`1.5e+06`) outside,
/// trailing zeros dropped.
#[must_use]
pub fn format_value(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let precision = VALUE_SIGNIFICANT_DIGITS - 1;
    let scientific = format!("{value:.precision$e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return value.to_string();
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return value.to_string();
    };

    if exponent < -4 || exponent >= VALUE_SIGNIFICANT_DIGITS as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exponent.unsigned_abs())
    } else {
        let decimals = (precision as i32 - exponent) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// Data row: timestamp followed by tab-separated values.
pub fn format_row(slot: Timestamp, values: &[String]) -> Result<String, SensorlogError> {
    let mut line = format_timestamp(slot)?;
    for value in values {
        line.push('\t');
        line.push_str(value);
    }
    Ok(line)
}

/// Data rows of an existing file. A missing file has none.
pub fn read_rows(path: &Path) -> Result<Vec<String>, SensorlogError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    Ok(content
        .lines()
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Rewrite `path` with `header`, the newest retained rows and `row`.
pub fn append_row(
    path: &Path,
    header: &str,
    max_entries: usize,
    row: &str,
) -> Result<(), SensorlogError> {
    let rows = read_rows(path)?;
    let keep = max_entries.saturating_sub(1);
    let skip = rows.len().saturating_sub(keep);

    let mut out = String::with_capacity(header.len() + row.len() + 64 * rows.len());
    out.push_str(header);
    out.push('\n');
    for line in &rows[skip..] {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(row);
    out.push('\n');

    fs::write(path, out)?;
    Ok(())
}
