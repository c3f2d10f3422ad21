//! Decoding of raw cell values into typed values.
//!
//! Numbers are only dates when their number format says so, and Excel's
//! serial dates carry the 1900 leap year bug (serial 60 is the nonexistent
//! 1900-02-29).

use crate::error::{Error, Result};
use crate::model::{CellType, EncodedCell};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Serialize, Serializer};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

/// Serial day of the nonexistent 1900-02-29.
///
/// See <https://support.microsoft.com/en-us/kb/214326>.
const LEAP_YEAR_BUG_SERIAL: f64 = 60.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Substrings that mark a number format as a date or time format.
const DATE_TIME_MARKERS: [&str; 6] = ["e", "d", "h", "m", "s", "yy"];

/// A decoded cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    DateTime(NaiveDateTime),
    /// A time of day without a date.
    Time(TimeDelta),
    /// An error value such as `#DIV/0!`.
    Error(String),
}

impl Value {
    /// Check if this is the null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the text of a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get a numeric value as `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get a date value.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }
}

/// Write a time of day as an ISO 8601 duration, e.g. `PT13H59M0S`.
fn write_duration(f: &mut fmt::Formatter<'_>, delta: &TimeDelta) -> fmt::Result {
    let mut seconds = delta.num_seconds();
    let hours = seconds.div_euclid(3600);
    seconds -= hours * 3600;
    let minutes = seconds.div_euclid(60);
    seconds -= minutes * 60;
    write!(f, "PT{}H{}M{}S", hours, minutes, seconds)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) | Value::Error(s) => f.write_str(s),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            Value::Time(delta) => write_duration(f, delta),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::String(s) | Value::Error(s) => serializer.serialize_str(s),
            Value::DateTime(_) | Value::Time(_) => serializer.collect_str(self),
        }
    }
}

/// Memoized date/time classification of number format codes.
#[derive(Debug, Default)]
pub struct FormatClassifier {
    cache: RefCell<HashMap<String, bool>>,
}

impl FormatClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a number format code formats dates or times.
    ///
    /// Bracketed sections such as `[Red]` or `[$-409]` are removed first, then
    /// the code is searched for any of `e`, `d`, `h`, `m`, `s` or `yy`
    /// (case-sensitive).
    pub fn is_date_time(&self, code: &str) -> bool {
        if let Some(known) = self.cache.borrow().get(code) {
            return *known;
        }

        let stripped = strip_bracketed(code);
        let verdict = DATE_TIME_MARKERS
            .iter()
            .any(|marker| stripped.contains(marker));

        self.cache.borrow_mut().insert(code.to_string(), verdict);
        verdict
    }

    /// Number of distinct codes classified so far.
    pub fn cached(&self) -> usize {
        self.cache.borrow().len()
    }
}

/// Remove `[...]` sections from a format code.
///
/// A section opens at a `[` and closes at the nearest later `]`, neither
/// escaped by a backslash, with at least one character (not a newline) in
/// between. Unmatched brackets are kept.
pub fn strip_bracketed(code: &str) -> String {
    let chars: Vec<char> = code.chars().collect();
    let mut out = String::with_capacity(code.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '[' && (i == 0 || chars[i - 1] != '\\') {
            let mut close = None;
            let mut j = i + 1;
            while j < chars.len() && chars[j] != '\n' {
                if j >= i + 2 && chars[j] == ']' && chars[j - 1] != '\\' {
                    close = Some(j);
                    break;
                }
                j += 1;
            }
            if let Some(j) = close {
                i = j + 1;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }

    out
}

/// Decodes raw cell values into [`Value`]s.
///
/// Holds its own format classification cache; one decoder is shared by all
/// worksheets of a workbook.
#[derive(Debug, Default)]
pub struct Decoder {
    formats: FormatClassifier,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Access the format classifier.
    pub fn formats(&self) -> &FormatClassifier {
        &self.formats
    }

    /// Decode a stored cell.
    pub fn decode(&self, cell: &EncodedCell) -> Result<Value> {
        let value = cell.value.as_deref();

        match CellType::from_tag(cell.cell_type.as_deref()) {
            CellType::Boolean => Ok(Value::Bool(value == Some("1"))),
            CellType::Date => match value {
                Some(text) => parse_iso8601(text)
                    .map(Value::DateTime)
                    .ok_or_else(|| Error::MalformedDate(text.to_string())),
                None => Err(Error::MalformedDate(String::new())),
            },
            CellType::Number => self.decode_number(value, cell.format.as_deref()),
            CellType::SharedString => Ok(cell
                .shared
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null)),
            CellType::Error => Ok(value
                .map(|v| Value::Error(v.to_string()))
                .unwrap_or(Value::Null)),
            CellType::InlineString | CellType::FormulaString | CellType::Other(_) => Ok(value
                .map(|v| Value::String(v.to_string()))
                .unwrap_or(Value::Null)),
        }
    }

    fn decode_number(&self, value: Option<&str>, format: Option<&str>) -> Result<Value> {
        let Some(raw) = value else {
            return Ok(Value::Null);
        };

        if let Some(code) = format {
            if self.formats.is_date_time(code) {
                let serial: f64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| Error::MalformedNumber(raw.to_string()))?;
                return decode_serial(serial)
                    .ok_or_else(|| Error::MalformedNumber(raw.to_string()));
            }
        }

        parse_number(raw)
    }
}

/// Parse a plain number: an integer when there is no decimal point,
/// otherwise a float.
fn parse_number(raw: &str) -> Result<Value> {
    let text = raw.trim();
    if !text.contains('.') {
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Value::Int(i));
        }
    }
    text.parse::<f64>()
        .map(Value::Float)
        .map_err(|_| Error::MalformedNumber(raw.to_string()))
}

/// Decode an Excel serial date/time.
///
/// Serials whose ceiling is above 60 are shifted back one day to skip the
/// phantom 1900-02-29. Values of at least one day become a date and time;
/// smaller values become a time of day. Returns `None` when the serial is
/// not finite or out of range.
pub fn decode_serial(serial: f64) -> Option<Value> {
    if !serial.is_finite() {
        return None;
    }

    let mut value = serial;
    if value.ceil() > LEAP_YEAR_BUG_SERIAL {
        value -= 1.0;
    }

    if value >= 1.0 {
        serial_to_datetime(value).map(Value::DateTime)
    } else {
        serial_to_time(value).map(Value::Time)
    }
}

/// Days counted from 1899-12-31, so that day 1 is 1900-01-01.
fn serial_to_datetime(value: f64) -> Option<NaiveDateTime> {
    let days = value.trunc();
    let seconds = ((value - days) * SECONDS_PER_DAY).round();

    NaiveDate::from_ymd_opt(1899, 12, 31)?
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(TimeDelta::try_days(days as i64)?)?
        .checked_add_signed(TimeDelta::try_seconds(seconds as i64)?)
}

fn serial_to_time(value: f64) -> Option<TimeDelta> {
    let mut seconds = (value * SECONDS_PER_DAY).round();

    let hours = (seconds / 3600.0).floor();
    seconds -= hours * 3600.0;
    let minutes = (seconds / 60.0).floor();
    seconds -= minutes * 60.0;

    TimeDelta::try_hours(hours as i64)?
        .checked_add(&TimeDelta::try_minutes(minutes as i64)?)?
        .checked_add(&TimeDelta::try_seconds(seconds as i64)?)
}

/// Parse the text of a `d` cell.
fn parse_iso8601(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(cell_type: Option<&str>, value: Option<&str>, format: Option<&str>) -> EncodedCell {
        EncodedCell {
            cell_type: cell_type.map(String::from),
            value: value.map(String::from),
            format: format.map(String::from),
            ..Default::default()
        }
    }

    fn datetime(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_boolean() {
        let decoder = Decoder::new();
        assert_eq!(
            decoder.decode(&cell(Some("b"), Some("1"), None)).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            decoder.decode(&cell(Some("b"), Some("0"), None)).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_numbers() {
        let decoder = Decoder::new();
        assert_eq!(
            decoder.decode(&cell(Some("n"), Some("123"), None)).unwrap(),
            Value::Int(123)
        );
        assert_eq!(
            decoder.decode(&cell(None, Some("456.789"), None)).unwrap(),
            Value::Float(456.789)
        );
        assert_eq!(
            decoder.decode(&cell(Some("n"), None, None)).unwrap(),
            Value::Null
        );
        assert!(matches!(
            decoder.decode(&cell(None, Some("abc"), None)),
            Err(Error::MalformedNumber(_))
        ));
    }

    #[test]
    fn test_date_formats() {
        let decoder = Decoder::new();

        assert_eq!(
            decoder
                .decode(&cell(Some("n"), Some("42732"), Some("mm-dd-yy")))
                .unwrap(),
            Value::DateTime(datetime(2016, 12, 28, 0, 0, 0))
        );
        assert_eq!(
            decoder
                .decode(&cell(
                    Some("n"),
                    Some("42732.582638888889"),
                    Some("[$-409]m/d/yy h:mm AM/PM;@")
                ))
                .unwrap(),
            Value::DateTime(datetime(2016, 12, 28, 13, 59, 0))
        );
        assert_eq!(
            decoder
                .decode(&cell(Some("n"), Some("0.58263888888888882"), Some("h:mm AM/PM")))
                .unwrap(),
            Value::Time(TimeDelta::hours(13) + TimeDelta::minutes(59))
        );
    }

    #[test]
    fn test_number_without_format_is_never_a_date() {
        let decoder = Decoder::new();
        assert_eq!(
            decoder.decode(&cell(None, Some("42732"), None)).unwrap(),
            Value::Int(42732)
        );
        assert_eq!(
            decoder.decode(&cell(None, Some("42732"), Some("0.00"))).unwrap(),
            Value::Int(42732)
        );
    }

    #[test]
    fn test_shared_string() {
        let decoder = Decoder::new();
        let mut shared = cell(Some("s"), None, None);
        shared.shared = Some("X".to_string());
        assert_eq!(decoder.decode(&shared).unwrap(), Value::String("X".into()));

        let unresolved = cell(Some("s"), None, None);
        assert_eq!(decoder.decode(&unresolved).unwrap(), Value::Null);
    }

    #[test]
    fn test_passthrough_types() {
        let decoder = Decoder::new();
        assert_eq!(
            decoder.decode(&cell(Some("e"), Some("#DIV/0!"), None)).unwrap(),
            Value::Error("#DIV/0!".into())
        );
        assert_eq!(
            decoder.decode(&cell(Some("str"), Some("abc"), None)).unwrap(),
            Value::String("abc".into())
        );
        assert_eq!(
            decoder
                .decode(&cell(Some("inlineStr"), Some("x"), Some("mm-dd-yy")))
                .unwrap(),
            Value::String("x".into())
        );
    }

    #[test]
    fn test_iso_dates() {
        let decoder = Decoder::new();
        assert_eq!(
            decoder
                .decode(&cell(Some("d"), Some("2016-12-28T13:59:00"), None))
                .unwrap(),
            Value::DateTime(datetime(2016, 12, 28, 13, 59, 0))
        );
        assert_eq!(
            decoder
                .decode(&cell(Some("d"), Some("2016-12-28T13:59:00+0000"), None))
                .unwrap(),
            Value::DateTime(datetime(2016, 12, 28, 13, 59, 0))
        );
        assert!(matches!(
            decoder.decode(&cell(Some("d"), Some("yesterday"), None)),
            Err(Error::MalformedDate(_))
        ));
    }

    #[test]
    fn test_leap_year_bug_boundary() {
        // Not shifted: 1899-12-31 + 59 days
        assert_eq!(
            decode_serial(59.0),
            Some(Value::DateTime(datetime(1900, 2, 28, 0, 0, 0)))
        );
        assert_eq!(
            decode_serial(60.0),
            Some(Value::DateTime(datetime(1900, 3, 1, 0, 0, 0)))
        );
        // Shifted: naive decoding of 61 would be 1900-03-02
        assert_eq!(
            decode_serial(61.0),
            Some(Value::DateTime(datetime(1900, 3, 1, 0, 0, 0)))
        );
        // ceil(59.5) is 60, so no shift
        assert_eq!(
            decode_serial(59.5),
            Some(Value::DateTime(datetime(1900, 2, 28, 12, 0, 0)))
        );
        assert_eq!(
            decode_serial(1.0),
            Some(Value::DateTime(datetime(1900, 1, 1, 0, 0, 0)))
        );
    }

    #[test]
    fn test_time_only() {
        assert_eq!(
            decode_serial(0.5),
            Some(Value::Time(TimeDelta::hours(12)))
        );
        assert_eq!(decode_serial(0.0), Some(Value::Time(TimeDelta::zero())));
        assert_eq!(decode_serial(f64::NAN), None);
    }

    #[test]
    fn test_format_classification() {
        let formats = FormatClassifier::new();
        assert!(formats.is_date_time("mm-dd-yy"));
        assert!(formats.is_date_time("[$-409]m/d/yy h:mm AM/PM;@"));
        assert!(formats.is_date_time("h:mm"));
        assert!(!formats.is_date_time("0.00"));
        assert!(!formats.is_date_time("#,##0 ;[Red](#,##0)"));
        assert!(!formats.is_date_time("[Red]0"));
        // Case-sensitive: upper-case markers do not count
        assert!(!formats.is_date_time("0.00E+00"));
        assert!(!formats.is_date_time("YYYY"));

        assert_eq!(formats.cached(), 8);
        assert!(formats.is_date_time("mm-dd-yy"));
        assert_eq!(formats.cached(), 8);
    }

    #[test]
    fn test_strip_bracketed() {
        assert_eq!(strip_bracketed("[Red]0.00"), "0.00");
        assert_eq!(strip_bracketed("[$-409]m/d/yy"), "m/d/yy");
        assert_eq!(strip_bracketed("[a][b]x"), "x");
        // Escaped brackets survive
        assert_eq!(strip_bracketed("\\[h\\]0"), "\\[h\\]0");
        // Empty brackets need at least one character inside
        assert_eq!(strip_bracketed("[]0"), "[]0");
        assert_eq!(strip_bracketed("[]]0"), "0");
        // Unterminated
        assert_eq!(strip_bracketed("[Red"), "[Red");
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Bool(true).to_string(), "TRUE");
        assert_eq!(
            Value::DateTime(datetime(2016, 12, 28, 13, 59, 0)).to_string(),
            "2016-12-28T13:59:00"
        );
        assert_eq!(
            Value::Time(TimeDelta::hours(13) + TimeDelta::minutes(59)).to_string(),
            "PT13H59M0S"
        );
        assert_eq!(Value::Null.to_string(), "");
    }
}
