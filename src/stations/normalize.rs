//! Turns raw station records into sorted, unit-converted [`DataPoint`]s.

use crate::stations::error::StationError;
use crate::types::data_point::DataPoint;
use crate::types::data_type::DataType;
use crate::units::UnitConverter;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Series with this many points or fewer are rejected as insufficient.
pub const MIN_SERIES_POINTS: usize = 2;

/// Normalizes every record of `raw` (a JSON array of objects) and sorts the result by
/// timestamp. Readings that are missing or non-numeric count as `0` before conversion.
pub(crate) fn normalize_records<F>(
    station: &str,
    raw: &Value,
    data_types: &[DataType],
    timestamp_of: F,
) -> Result<Vec<DataPoint>, StationError>
where
    F: Fn(&Map<String, Value>) -> Result<DateTime<Utc>, StationError>,
{
    let records = raw
        .as_array()
        .ok_or_else(|| StationError::UnexpectedPayload {
            station: station.to_string(),
            message: format!("expected an array of records, got {}", kind_of(raw)),
        })?;

    let mut series = records
        .iter()
        .map(|record| {
            let record = record
                .as_object()
                .ok_or_else(|| StationError::UnexpectedPayload {
                    station: station.to_string(),
                    message: format!("expected a record object, got {}", kind_of(record)),
                })?;
            normalize_record(record, data_types, &timestamp_of)
        })
        .collect::<Result<Vec<_>, _>>()?;

    series.sort_by_key(|point| point.timestamp);
    Ok(series)
}

fn normalize_record<F>(
    record: &Map<String, Value>,
    data_types: &[DataType],
    timestamp_of: &F,
) -> Result<DataPoint, StationError>
where
    F: Fn(&Map<String, Value>) -> Result<DateTime<Utc>, StationError>,
{
    let mut point = DataPoint::new(timestamp_of(record)?);
    for data_type in data_types {
        let reading = parse_reading(record.get(&data_type.source_key));
        let value =
            UnitConverter::convert(reading, &data_type.source_units, &data_type.name_units)?;
        point.values.insert(data_type.name.clone(), value);
    }
    Ok(point)
}

/// Reads a numeric value the way stations encode them: as JSON numbers or as strings
/// with a leading number. Placeholders such as `"None"` or `"NAN"` read as `0`.
pub(crate) fn parse_reading(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => parse_leading_float(text),
        _ => None,
    };
    parsed.filter(|v| !v.is_nan()).unwrap_or(0.0)
}

fn parse_leading_float(text: &str) -> Option<f64> {
    let text = text.trim_start();
    // Only ASCII is accepted, so every prefix length is a char boundary.
    let candidate_len = text
        .bytes()
        .take_while(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
        .count();
    (1..=candidate_len)
        .rev()
        .find_map(|end| text[..end].parse::<f64>().ok())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
