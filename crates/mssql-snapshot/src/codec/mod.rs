//! Value codec: native cells to and from their snapshot JSON form.
//!
//! Binary, temporal and large-object values are written as tagged objects
//! `{"_type": TAG, "_value": "..."}` so their SQL type survives the trip
//! through JSON. Everything else is a plain JSON scalar.
//!
//! Decoding never fails. A tagged cell is decoded by its tag; a plain cell
//! is reinterpreted according to the destination column's declared type.
//! Whenever a payload cannot be decoded the raw string is passed through.

use std::str::FromStr;

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::core::value::{SqlNullType, SqlValue};

/// Canonical timestamp form, e.g. `2024-03-15 14:30:22.123`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Canonical time-of-day form, e.g. `14:30:22.5`.
pub const TIME_FORMAT: &str = "%H:%M:%S%.f";

/// Canonical date form, e.g. `2024-03-15`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Type tag of an encoded cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueTag {
    Varbinary,
    Timestamp,
    Time,
    Date,
    Text,
    Clob,
    Blob,
    /// A tag written by a newer producer; decoded as its raw string.
    #[serde(other)]
    Unknown,
}

/// A tagged cell as it appears in the archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedValue {
    #[serde(rename = "_type")]
    pub tag: ValueTag,
    /// Payload text; `None` when the producer wrote `"_value": null`.
    #[serde(rename = "_value", default)]
    pub value: Option<String>,
}

/// One encoded cell of a snapshot row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EncodedValue {
    Tagged(TaggedValue),
    Plain(Value),
}

impl EncodedValue {
    fn tagged(tag: ValueTag, value: impl Into<String>) -> Self {
        EncodedValue::Tagged(TaggedValue {
            tag,
            value: Some(value.into()),
        })
    }

    /// Check if this cell is a JSON null.
    pub fn is_null(&self) -> bool {
        matches!(self, EncodedValue::Plain(Value::Null))
    }
}

impl From<Value> for EncodedValue {
    fn from(value: Value) -> Self {
        EncodedValue::Plain(value)
    }
}

#[derive(Debug, Error)]
enum CodecError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid {kind} literal '{raw}'")]
    Literal { kind: &'static str, raw: String },
}

type CodecResult<T> = std::result::Result<T, CodecError>;

/// Encode a native value for the snapshot document.
pub fn encode(value: &SqlValue) -> EncodedValue {
    match value {
        SqlValue::Null(_) => EncodedValue::Plain(Value::Null),
        SqlValue::Bool(v) => EncodedValue::Plain(Value::Bool(*v)),
        SqlValue::U8(v) => EncodedValue::Plain(Value::from(*v)),
        SqlValue::I16(v) => EncodedValue::Plain(Value::from(*v)),
        SqlValue::I32(v) => EncodedValue::Plain(Value::from(*v)),
        SqlValue::I64(v) => EncodedValue::Plain(Value::from(*v)),
        SqlValue::F32(v) => EncodedValue::Plain(Value::from(*v)),
        SqlValue::F64(v) => EncodedValue::Plain(Value::from(*v)),
        SqlValue::Decimal(v) => EncodedValue::Plain(Value::String(v.to_string())),
        SqlValue::Uuid(v) => EncodedValue::Plain(Value::String(v.to_string())),
        SqlValue::String(v) => EncodedValue::Plain(Value::String(v.clone())),
        SqlValue::DateTimeOffset(v) => EncodedValue::Plain(Value::String(v.to_rfc3339())),
        SqlValue::LongText(v) => EncodedValue::tagged(ValueTag::Text, v.as_str()),
        SqlValue::Clob(v) => EncodedValue::tagged(ValueTag::Clob, v.as_str()),
        SqlValue::Blob(v) => EncodedValue::tagged(ValueTag::Blob, general_purpose::STANDARD.encode(v)),
        SqlValue::Bytes(v) => {
            EncodedValue::tagged(ValueTag::Varbinary, general_purpose::STANDARD.encode(v))
        }
        SqlValue::DateTime(v) => {
            EncodedValue::tagged(ValueTag::Timestamp, v.format(TIMESTAMP_FORMAT).to_string())
        }
        SqlValue::Time(v) => EncodedValue::tagged(ValueTag::Time, v.format(TIME_FORMAT).to_string()),
        SqlValue::Date(v) => EncodedValue::tagged(ValueTag::Date, v.format(DATE_FORMAT).to_string()),
    }
}

/// Decode a snapshot cell for a destination column of `declared_type`.
pub fn decode(value: &EncodedValue, declared_type: &str) -> SqlValue {
    match value {
        EncodedValue::Tagged(tagged) => decode_tagged(tagged, &declared_type.trim().to_lowercase()),
        EncodedValue::Plain(plain) => decode_plain(plain, &declared_type.trim().to_lowercase()),
    }
}

fn decode_tagged(tagged: &TaggedValue, declared: &str) -> SqlValue {
    let Some(raw) = tagged.value.as_deref() else {
        return SqlValue::Null(SqlNullType::for_declared_type(declared));
    };
    let decoded = match tagged.tag {
        ValueTag::Varbinary => decode_base64(raw).map(SqlValue::Bytes),
        ValueTag::Blob => decode_base64(raw).map(SqlValue::Blob),
        ValueTag::Timestamp => parse_timestamp(raw).map(SqlValue::DateTime),
        ValueTag::Time => parse_time(raw).map(SqlValue::Time),
        ValueTag::Date => parse_date(raw).map(SqlValue::Date),
        ValueTag::Text => Ok(SqlValue::LongText(raw.to_string())),
        ValueTag::Clob => Ok(SqlValue::Clob(raw.to_string())),
        ValueTag::Unknown => Ok(SqlValue::String(raw.to_string())),
    };
    passthrough_on_error(decoded, raw)
}

fn decode_plain(value: &Value, declared: &str) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null(SqlNullType::for_declared_type(declared)),
        Value::Bool(b) => SqlValue::Bool(*b),
        Value::Number(n) => narrow_number(n, declared),
        Value::String(s) => reinterpret_string(s, declared),
        other => SqlValue::String(other.to_string()),
    }
}

/// Best-effort reinterpretation of an untagged string by declared type.
fn reinterpret_string(raw: &str, declared: &str) -> SqlValue {
    let decoded = match declared {
        "binary" | "varbinary" | "image" if looks_like_base64(raw) => {
            decode_base64(raw).map(SqlValue::Bytes)
        }
        "datetime" | "datetime2" | "smalldatetime" => parse_timestamp(raw).map(SqlValue::DateTime),
        "datetimeoffset" => DateTime::parse_from_rfc3339(raw)
            .map(SqlValue::DateTimeOffset)
            .map_err(|_| literal_error("datetimeoffset", raw)),
        "time" => parse_time(raw).map(SqlValue::Time),
        "date" => parse_date(raw).map(SqlValue::Date),
        "uniqueidentifier" => Uuid::parse_str(raw)
            .map(SqlValue::Uuid)
            .map_err(|_| literal_error("uniqueidentifier", raw)),
        "decimal" | "numeric" | "money" | "smallmoney" => parse_decimal(raw).map(SqlValue::Decimal),
        "text" | "ntext" => Ok(SqlValue::LongText(raw.to_string())),
        _ => Ok(SqlValue::String(raw.to_string())),
    };
    passthrough_on_error(decoded, raw)
}

/// Narrow a JSON number to the destination's SQL numeric type.
fn narrow_number(n: &serde_json::Number, declared: &str) -> SqlValue {
    let as_i64 = n.as_i64();
    let narrowed = match declared {
        "bit" => as_i64.map(|v| SqlValue::Bool(v != 0)),
        "tinyint" => as_i64.and_then(|v| u8::try_from(v).ok()).map(SqlValue::U8),
        "smallint" => as_i64.and_then(|v| i16::try_from(v).ok()).map(SqlValue::I16),
        "int" => as_i64.and_then(|v| i32::try_from(v).ok()).map(SqlValue::I32),
        "bigint" => as_i64.map(SqlValue::I64),
        "real" => n.as_f64().map(|v| SqlValue::F32(v as f32)),
        "float" => n.as_f64().map(SqlValue::F64),
        "decimal" | "numeric" | "money" | "smallmoney" => {
            parse_decimal(&n.to_string()).ok().map(SqlValue::Decimal)
        }
        _ => None,
    };

    narrowed.unwrap_or_else(|| match as_i64 {
        Some(v) => SqlValue::I64(v),
        None => SqlValue::F64(n.as_f64().unwrap_or_default()),
    })
}

fn passthrough_on_error(decoded: CodecResult<SqlValue>, raw: &str) -> SqlValue {
    decoded.unwrap_or_else(|e| {
        debug!("Passing value through undecoded: {}", e);
        SqlValue::String(raw.to_string())
    })
}

fn literal_error(kind: &'static str, raw: &str) -> CodecError {
    CodecError::Literal {
        kind,
        raw: raw.to_string(),
    }
}

fn decode_base64(raw: &str) -> CodecResult<Vec<u8>> {
    Ok(general_purpose::STANDARD.decode(raw)?)
}

/// Check whether a string has the shape of padded standard base64.
pub fn looks_like_base64(raw: &str) -> bool {
    if raw.len() % 4 != 0 {
        return false;
    }
    let body = raw.trim_end_matches('=');
    raw.len() - body.len() <= 2
        && body
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
}

/// Parse a canonical timestamp; the ISO `T` separator is also accepted.
fn parse_timestamp(raw: &str) -> CodecResult<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .map_err(|_| literal_error("timestamp", raw))
}

fn parse_time(raw: &str) -> CodecResult<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), TIME_FORMAT).map_err(|_| literal_error("time", raw))
}

fn parse_date(raw: &str) -> CodecResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| literal_error("date", raw))
}

fn parse_decimal(raw: &str) -> CodecResult<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| literal_error("decimal", raw))
}
