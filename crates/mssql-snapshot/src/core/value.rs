//! Native SQL value types read from and bound to SQL Server.
//!
//! [`SqlValue`] is the in-memory form of one cell. It is exhaustive over the
//! shapes the value codec distinguishes, so encoding and binding are checked
//! `match`es rather than runtime type inspection.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Type hint for NULL values so they bind with the destination column's type.
///
/// SQL Server refuses an implicit `nvarchar` NULL for a `varbinary` column,
/// so a NULL carries the SQL type it stands in for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlNullType {
    Bool,
    U8,
    I16,
    I32,
    I64,
    F32,
    F64,
    String,
    Bytes,
    Uuid,
    Decimal,
    DateTime,
    DateTimeOffset,
    Date,
    Time,
}

impl SqlNullType {
    /// Pick the NULL type for a declared SQL Server column type.
    pub fn for_declared_type(data_type: &str) -> Self {
        match data_type.trim().to_lowercase().as_str() {
            "bit" => SqlNullType::Bool,
            "tinyint" => SqlNullType::U8,
            "smallint" => SqlNullType::I16,
            "int" => SqlNullType::I32,
            "bigint" => SqlNullType::I64,
            "real" => SqlNullType::F32,
            "float" => SqlNullType::F64,
            "decimal" | "numeric" | "money" | "smallmoney" => SqlNullType::Decimal,
            "uniqueidentifier" => SqlNullType::Uuid,
            "binary" | "varbinary" | "image" => SqlNullType::Bytes,
            "datetime" | "datetime2" | "smalldatetime" => SqlNullType::DateTime,
            "datetimeoffset" => SqlNullType::DateTimeOffset,
            "date" => SqlNullType::Date,
            "time" => SqlNullType::Time,
            _ => SqlNullType::String,
        }
    }
}

/// One native column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL with type hint for correct parameter binding.
    Null(SqlNullType),

    /// Boolean value (bit).
    Bool(bool),

    /// Unsigned 8-bit integer (tinyint).
    U8(u8),

    /// 16-bit signed integer (smallint).
    I16(i16),

    /// 32-bit signed integer (int).
    I32(i32),

    /// 64-bit signed integer (bigint).
    I64(i64),

    /// 32-bit floating point (real).
    F32(f32),

    /// 64-bit floating point (float).
    F64(f64),

    /// Decimal value with arbitrary precision.
    Decimal(Decimal),

    /// UUID/GUID value.
    Uuid(Uuid),

    /// Bounded character data.
    String(String),

    /// Legacy long text (`text`, `ntext`).
    LongText(String),

    /// Character large object (`varchar(max)`, `nvarchar(max)`, `xml`).
    Clob(String),

    /// Binary large object (`varbinary(max)`).
    Blob(Vec<u8>),

    /// Bounded binary data (`binary`, `varbinary(n)`, `image`, `rowversion`).
    Bytes(Vec<u8>),

    /// Timestamp without timezone.
    DateTime(NaiveDateTime),

    /// Timestamp with timezone offset.
    DateTimeOffset(DateTime<FixedOffset>),

    /// Date without time component.
    Date(NaiveDate),

    /// Time without date component.
    Time(NaiveTime),
}

impl SqlValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null(_))
    }

    /// Get the SqlNullType for this value (for type-aware NULL binding).
    #[must_use]
    pub fn null_type(&self) -> SqlNullType {
        match self {
            SqlValue::Null(t) => *t,
            SqlValue::Bool(_) => SqlNullType::Bool,
            SqlValue::U8(_) => SqlNullType::U8,
            SqlValue::I16(_) => SqlNullType::I16,
            SqlValue::I32(_) => SqlNullType::I32,
            SqlValue::I64(_) => SqlNullType::I64,
            SqlValue::F32(_) => SqlNullType::F32,
            SqlValue::F64(_) => SqlNullType::F64,
            SqlValue::Decimal(_) => SqlNullType::Decimal,
            SqlValue::Uuid(_) => SqlNullType::Uuid,
            SqlValue::String(_) | SqlValue::LongText(_) | SqlValue::Clob(_) => {
                SqlNullType::String
            }
            SqlValue::Blob(_) | SqlValue::Bytes(_) => SqlNullType::Bytes,
            SqlValue::DateTime(_) => SqlNullType::DateTime,
            SqlValue::DateTimeOffset(_) => SqlNullType::DateTimeOffset,
            SqlValue::Date(_) => SqlNullType::Date,
            SqlValue::Time(_) => SqlNullType::Time,
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::I32(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::F64(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::String(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::String(v.to_string())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::DateTime(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

impl From<NaiveTime> for SqlValue {
    fn from(v: NaiveTime) -> Self {
        SqlValue::Time(v)
    }
}
