use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::DriverError;

/// Values that can be stored in a table cell or bound to a parameter.
///
/// `Null` is the "no value" marker every backend binds in place of a missing
/// value:
/// ```rust
/// use sql_provider::prelude::*;
///
/// let values = vec![
///     DbValue::Int(1),
///     DbValue::Text("alice".into()),
///     DbValue::from(None::<i64>),
/// ];
/// assert!(values[2].is_null());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl DbValue {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            DbValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Float cells, and integers widened the way float columns widen them.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            DbValue::Float(value) => Some(*value),
            DbValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            DbValue::Text(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DbValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            DbValue::Timestamp(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            DbValue::Blob(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Short name of the variant, used in type mismatch messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            DbValue::Int(_) => "int",
            DbValue::Float(_) => "float",
            DbValue::Text(_) => "text",
            DbValue::Bool(_) => "bool",
            DbValue::Timestamp(_) => "timestamp",
            DbValue::Null => "null",
            DbValue::JSON(_) => "json",
            DbValue::Blob(_) => "blob",
        }
    }
}

/// Literal text form, as spliced by positional substitution. `Null` renders empty.
impl fmt::Display for DbValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbValue::Int(i) => write!(f, "{i}"),
            DbValue::Float(v) => write!(f, "{v}"),
            DbValue::Text(s) => f.write_str(s),
            DbValue::Bool(b) => write!(f, "{b}"),
            DbValue::Timestamp(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.f")),
            DbValue::Null => Ok(()),
            DbValue::JSON(js) => write!(f, "{js}"),
            DbValue::Blob(bytes) => {
                f.write_str("0x")?;
                for b in bytes {
                    write!(f, "{b:02X}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<i64> for DbValue {
    fn from(value: i64) -> Self {
        DbValue::Int(value)
    }
}

impl From<i32> for DbValue {
    fn from(value: i32) -> Self {
        DbValue::Int(i64::from(value))
    }
}

impl From<f64> for DbValue {
    fn from(value: f64) -> Self {
        DbValue::Float(value)
    }
}

impl From<bool> for DbValue {
    fn from(value: bool) -> Self {
        DbValue::Bool(value)
    }
}

impl From<String> for DbValue {
    fn from(value: String) -> Self {
        DbValue::Text(value)
    }
}

impl From<&str> for DbValue {
    fn from(value: &str) -> Self {
        DbValue::Text(value.to_string())
    }
}

impl From<NaiveDateTime> for DbValue {
    fn from(value: NaiveDateTime) -> Self {
        DbValue::Timestamp(value)
    }
}

impl From<JsonValue> for DbValue {
    fn from(value: JsonValue) -> Self {
        DbValue::JSON(value)
    }
}

impl From<Vec<u8>> for DbValue {
    fn from(value: Vec<u8>) -> Self {
        DbValue::Blob(value)
    }
}

impl<T: Into<DbValue>> From<Option<T>> for DbValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(DbValue::Null, Into::into)
    }
}

/// The backend family a provider talks to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    /// SQL Server over its native protocol
    #[default]
    SqlServer,
    /// Any driver reachable through an ODBC driver manager
    Odbc,
    /// OLE DB style provider
    OleDb,
}

impl ProviderType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderType::SqlServer => "sql_server",
            ProviderType::Odbc => "odbc",
            ProviderType::OleDb => "ole_db",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "sqlserver" | "mssql" => Ok(ProviderType::SqlServer),
            "odbc" => Ok(ProviderType::Odbc),
            "oledb" => Ok(ProviderType::OleDb),
            other => Err(DriverError::ConfigError(format!(
                "unknown provider type `{other}`"
            ))),
        }
    }
}

/// How the statement text of a command is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandKind {
    /// Free-form SQL text
    #[default]
    Text,
    /// Name of a stored procedure
    StoredProcedure,
}

/// Role of a parameter within a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterDirection {
    #[default]
    Input,
    Output,
    InputOutput,
    ReturnValue,
}

impl ParameterDirection {
    /// Whether the backend writes a value back into the parameter.
    #[must_use]
    pub fn is_output(self) -> bool {
        !matches!(self, ParameterDirection::Input)
    }
}

/// Runtime type of a materialized table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int,
    Float,
    Text,
    Bool,
    Timestamp,
    Json,
    Blob,
    /// Any value; for columns whose cells carry their own type (`sql_variant`).
    Variant,
}

impl DataType {
    /// Check a cell value against this column type.
    ///
    /// `Null` fits every column, variant columns take any value, and integers
    /// widen into float columns.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::TypeMismatch` when the value does not fit.
    pub fn coerce(self, column: &str, value: DbValue) -> Result<DbValue, DriverError> {
        match (self, value) {
            (_, DbValue::Null) => Ok(DbValue::Null),
            (DataType::Variant, v) => Ok(v),
            (DataType::Int, v @ DbValue::Int(_))
            | (DataType::Float, v @ DbValue::Float(_))
            | (DataType::Text, v @ DbValue::Text(_))
            | (DataType::Bool, v @ DbValue::Bool(_))
            | (DataType::Timestamp, v @ DbValue::Timestamp(_))
            | (DataType::Json, v @ DbValue::JSON(_))
            | (DataType::Blob, v @ DbValue::Blob(_)) => Ok(v),
            #[allow(clippy::cast_precision_loss)]
            (DataType::Float, DbValue::Int(i)) => Ok(DbValue::Float(i as f64)),
            (expected, other) => Err(DriverError::TypeMismatch {
                column: column.to_string(),
                expected: format!("{expected:?}").to_ascii_lowercase(),
                actual: other.kind_name().to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_maps_to_null_marker() {
        assert_eq!(DbValue::from(None::<String>), DbValue::Null);
        assert_eq!(DbValue::from(Some(5_i32)), DbValue::Int(5));
    }

    #[test]
    fn display_is_literal() {
        assert_eq!(DbValue::Text("O'Brien".into()).to_string(), "O'Brien");
        assert_eq!(DbValue::Null.to_string(), "");
        assert_eq!(DbValue::Blob(vec![0xde, 0x01]).to_string(), "0xDE01");
    }

    #[test]
    fn provider_type_parses_config_spellings() {
        assert_eq!("SqlServer".parse::<ProviderType>().ok(), Some(ProviderType::SqlServer));
        assert_eq!("ole_db".parse::<ProviderType>().ok(), Some(ProviderType::OleDb));
        assert_eq!("ODBC".parse::<ProviderType>().ok(), Some(ProviderType::Odbc));
        assert!("oracle".parse::<ProviderType>().is_err());
    }

    #[test]
    fn coerce_widens_int_to_float_only() {
        assert_eq!(
            DataType::Float.coerce("x", DbValue::Int(2)).ok(),
            Some(DbValue::Float(2.0))
        );
        assert!(matches!(
            DataType::Int.coerce("x", DbValue::Text("2".into())),
            Err(DriverError::TypeMismatch { .. })
        ));
        assert_eq!(DataType::Blob.coerce("x", DbValue::Null).ok(), Some(DbValue::Null));
        assert_eq!(
            DataType::Variant.coerce("x", DbValue::Text("2".into())).ok(),
            Some(DbValue::Text("2".into()))
        );
    }

    #[test]
    fn accessors_match_their_variant() {
        assert_eq!(DbValue::Int(3).as_int(), Some(3));
        assert_eq!(DbValue::Int(3).as_float(), Some(3.0));
        assert_eq!(DbValue::Int(1).as_bool(), None);
        assert_eq!(DbValue::Text("2024-01-01 00:00:00".into()).as_timestamp(), None);
        assert_eq!(DbValue::Text("a".into()).as_text(), Some("a"));
        assert_eq!(DbValue::Blob(vec![1]).as_blob(), Some(&[1_u8][..]));
        assert_eq!(DbValue::Null.as_int(), None);
    }
}
