use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{DataType, DbValue};

/// A named, typed column of a [`DataTable`](super::DataTable).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataColumn {
    pub name: String,
    pub data_type: DataType,
}

impl DataColumn {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// A row of a materialized table.
///
/// The column list is shared by every row of the same table.
#[derive(Debug, Clone)]
pub struct DataRow {
    columns: Arc<Vec<DataColumn>>,
    values: Vec<DbValue>,
    // name -> index, shared across the rows of one table
    column_index_cache: Arc<HashMap<String, usize>>,
}

impl DataRow {
    pub(crate) fn new(
        columns: Arc<Vec<DataColumn>>,
        column_index_cache: Arc<HashMap<String, usize>>,
        values: Vec<DbValue>,
    ) -> Self {
        Self {
            columns,
            values,
            column_index_cache,
        }
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        if let Some(&idx) = self.column_index_cache.get(column_name) {
            return Some(idx);
        }

        self.columns.iter().position(|col| col.name == column_name)
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&DbValue> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&DbValue> {
        self.values.get(index)
    }

    #[must_use]
    pub fn values(&self) -> &[DbValue] {
        &self.values
    }

    #[must_use]
    pub fn columns(&self) -> &[DataColumn] {
        &self.columns
    }
}

impl PartialEq for DataRow {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns && self.values == other.values
    }
}
