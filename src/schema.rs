use std::collections::HashMap;

use crate::error::DriverError;
use crate::types::DataType;

/// Column metadata reported by a backend reader for the current result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaColumn {
    pub name: String,
    /// Declared type name as the driver reports it, e.g. `nvarchar(50)` or `System.Int32`.
    pub type_name: String,
}

impl SchemaColumn {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

const DEFAULT_TYPES: &[(&str, DataType)] = &[
    ("int", DataType::Int),
    ("integer", DataType::Int),
    ("bigint", DataType::Int),
    ("smallint", DataType::Int),
    ("tinyint", DataType::Int),
    ("system.byte", DataType::Int),
    ("system.int16", DataType::Int),
    ("system.int32", DataType::Int),
    ("system.int64", DataType::Int),
    ("float", DataType::Float),
    ("real", DataType::Float),
    ("double", DataType::Float),
    ("decimal", DataType::Float),
    ("numeric", DataType::Float),
    ("money", DataType::Float),
    ("smallmoney", DataType::Float),
    ("system.single", DataType::Float),
    ("system.double", DataType::Float),
    ("system.decimal", DataType::Float),
    ("char", DataType::Text),
    ("nchar", DataType::Text),
    ("varchar", DataType::Text),
    ("nvarchar", DataType::Text),
    ("text", DataType::Text),
    ("ntext", DataType::Text),
    ("xml", DataType::Text),
    ("time", DataType::Text),
    ("uniqueidentifier", DataType::Text),
    ("string", DataType::Text),
    ("system.string", DataType::Text),
    ("system.guid", DataType::Text),
    ("bit", DataType::Bool),
    ("bool", DataType::Bool),
    ("boolean", DataType::Bool),
    ("system.boolean", DataType::Bool),
    ("date", DataType::Timestamp),
    ("datetime", DataType::Timestamp),
    ("datetime2", DataType::Timestamp),
    ("smalldatetime", DataType::Timestamp),
    ("timestamp", DataType::Timestamp),
    ("datetimeoffset", DataType::Timestamp),
    ("system.datetime", DataType::Timestamp),
    ("json", DataType::Json),
    ("binary", DataType::Blob),
    ("varbinary", DataType::Blob),
    ("image", DataType::Blob),
    ("blob", DataType::Blob),
    ("system.byte[]", DataType::Blob),
    ("sql_variant", DataType::Variant),
    ("system.object", DataType::Variant),
];

/// Maps backend type names onto the runtime column types of materialized tables.
///
/// Lookups ignore case and any `(length)` / `(precision, scale)` suffix.
/// A name that is not registered is a hard error: it means the driver and
/// this registry disagree, and silently defaulting would hide that.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: HashMap<String, DataType>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        let types = DEFAULT_TYPES
            .iter()
            .map(|(name, data_type)| ((*name).to_string(), *data_type))
            .collect();
        Self { types }
    }
}

impl TypeRegistry {
    /// A registry with no names at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            types: HashMap::new(),
        }
    }

    /// Add or override a type name.
    pub fn register(&mut self, type_name: &str, data_type: DataType) -> &mut Self {
        self.types.insert(normalize(type_name), data_type);
        self
    }

    /// Resolve a backend type name.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::UnknownType` when the name is not registered.
    pub fn resolve(&self, type_name: &str) -> Result<DataType, DriverError> {
        self.types
            .get(&normalize(type_name))
            .copied()
            .ok_or_else(|| DriverError::UnknownType(type_name.to_string()))
    }
}

fn normalize(type_name: &str) -> String {
    let base = match type_name.find('(') {
        Some(idx) => &type_name[..idx],
        None => type_name,
    };
    base.trim().to_ascii_lowercase()
}
