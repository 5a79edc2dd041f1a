//! Content-type dispatch from raw payloads to structured values.
//!
//! | Media type         | Result                                   |
//! |--------------------|------------------------------------------|
//! | `application/json` | any JSON value                           |
//! | `application/yaml` | the YAML document as a JSON value        |
//! | `text/csv`         | array of rows, each an array of strings  |
//! | `application/toml` | the TOML table as a JSON object          |
//! | `text/plain`       | string                                   |

use super::Payload;
use crate::core::DataError;
use crate::source::media::{CSV, JSON, PLAIN_TEXT, TOML, YAML};
use serde_json::Value;

/// Decode a payload according to its media type.
///
/// # Errors
///
/// Returns [`DataError::UnsupportedContentType`] for types without a decoder
/// and [`DataError::Decode`] when the bytes do not parse as their type.
pub fn decode(payload: &Payload) -> Result<Value, DataError> {
    let media_type = &payload.media_type;
    let bytes = payload.bytes.as_slice();

    if media_type.is(JSON) {
        serde_json::from_slice(bytes).map_err(|e| decode_error(JSON, e))
    } else if media_type.is(YAML) {
        decode_yaml(bytes)
    } else if media_type.is(CSV) {
        decode_csv(bytes)
    } else if media_type.is(TOML) {
        decode_toml(bytes)
    } else if media_type.is(PLAIN_TEXT) {
        Ok(Value::String(payload.text().into_owned()))
    } else {
        Err(DataError::UnsupportedContentType {
            media_type: media_type.essence().to_string(),
        })
    }
}

fn decode_error(media_type: &str, reason: impl std::fmt::Display) -> DataError {
    DataError::Decode {
        media_type: media_type.to_string(),
        reason: reason.to_string(),
    }
}

fn decode_yaml(bytes: &[u8]) -> Result<Value, DataError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_yaml::from_slice(bytes).map_err(|e| decode_error(YAML, e))
}

fn decode_csv(bytes: &[u8]) -> Result<Value, DataError> {
    let mut reader = csv::ReaderBuilder::new().has_headers(false).flexible(true).from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| decode_error(CSV, e))?;
        rows.push(Value::Array(record.iter().map(|field| Value::String(field.to_string())).collect()));
    }
    Ok(Value::Array(rows))
}

fn decode_toml(bytes: &[u8]) -> Result<Value, DataError> {
    let text = std::str::from_utf8(bytes).map_err(|e| decode_error(TOML, e))?;
    let table: toml::Table = toml::from_str(text).map_err(|e| decode_error(TOML, e))?;
    Ok(toml_to_json(toml::Value::Table(table)))
}

/// Dates and times become their RFC 3339 strings; non-finite floats become null.
fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(table.into_iter().map(|(k, v)| (k, toml_to_json(v))).collect()),
    }
}
