use std::collections::HashMap;
use std::sync::Arc;

use super::row::{DataColumn, DataRow};
use crate::error::DriverError;
use crate::types::DbValue;

/// A single tabular result: ordered rows over named, typed columns.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTable {
    name: String,
    columns: Arc<Vec<DataColumn>>,
    rows: Vec<DataRow>,
    column_index_cache: Arc<HashMap<String, usize>>,
}

impl Default for DataTable {
    fn default() -> Self {
        Self::new("Table", Vec::new())
    }
}

impl DataTable {
    /// Create an empty table with the given columns.
    pub fn new(name: impl Into<String>, columns: Vec<DataColumn>) -> Self {
        let column_index_cache = Arc::new(
            columns
                .iter()
                .enumerate()
                .map(|(i, col)| (col.name.clone(), i))
                .collect::<HashMap<_, _>>(),
        );
        Self {
            name: name.into(),
            columns: Arc::new(columns),
            rows: Vec::new(),
            column_index_cache,
        }
    }

    /// Append a row, checking each value against its column type.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::ExecutionError` if the value count does not match
    /// the column count, or `DriverError::TypeMismatch` for a value that does
    /// not fit its column.
    pub fn add_row(&mut self, values: Vec<DbValue>) -> Result<(), DriverError> {
        if values.len() != self.columns.len() {
            return Err(DriverError::ExecutionError(format!(
                "row has {} values but table `{}` has {} columns",
                values.len(),
                self.name,
                self.columns.len()
            )));
        }

        let mut checked = Vec::with_capacity(values.len());
        for (column, value) in self.columns.iter().zip(values) {
            checked.push(column.data_type.coerce(&column.name, value)?);
        }

        self.rows.push(DataRow::new(
            self.columns.clone(),
            self.column_index_cache.clone(),
            checked,
        ));
        Ok(())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    #[must_use]
    pub fn columns(&self) -> &[DataColumn] {
        &self.columns
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&DataColumn> {
        self.column_index_cache
            .get(name)
            .and_then(|&idx| self.columns.get(idx))
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn rows(&self) -> &[DataRow] {
        &self.rows
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Ordered collection of named tables, in the order the backend returned them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSet {
    tables: Vec<DataTable>,
}

impl DataSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a table. Tables without a name get the next `Table`, `Table1`, … name.
    pub fn add_table(&mut self, mut table: DataTable) {
        if table.name().is_empty() {
            table.set_name(Self::table_name(self.tables.len()));
        }
        self.tables.push(table);
    }

    /// Default name of the table at `index`.
    #[must_use]
    pub fn table_name(index: usize) -> String {
        if index == 0 {
            "Table".to_string()
        } else {
            format!("Table{index}")
        }
    }

    #[must_use]
    pub fn tables(&self) -> &[DataTable] {
        &self.tables
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<&DataTable> {
        self.tables.iter().find(|t| t.name() == name)
    }

    #[must_use]
    pub fn table_at(&self, index: usize) -> Option<&DataTable> {
        self.tables.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn into_tables(self) -> Vec<DataTable> {
        self.tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    fn users() -> DataTable {
        DataTable::new(
            "Users",
            vec![
                DataColumn::new("Id", DataType::Int),
                DataColumn::new("Name", DataType::Text),
            ],
        )
    }

    #[test]
    fn rows_are_looked_up_by_name_and_index() -> Result<(), DriverError> {
        let mut table = users();
        table.add_row(vec![DbValue::Int(1), DbValue::Text("Ada".into())])?;

        let row = &table.rows()[0];
        assert_eq!(row.get("Name").and_then(DbValue::as_text), Some("Ada"));
        assert_eq!(row.get_by_index(0), Some(&DbValue::Int(1)));
        assert_eq!(row.get("Missing"), None);
        assert_eq!(table.column("Id").map(|c| c.data_type), Some(DataType::Int));
        Ok(())
    }

    #[test]
    fn add_row_rejects_wrong_width_and_type() {
        let mut table = users();
        assert!(table.add_row(vec![DbValue::Int(1)]).is_err());
        assert!(matches!(
            table.add_row(vec![DbValue::Text("1".into()), DbValue::Null]),
            Err(DriverError::TypeMismatch { column, .. }) if column == "Id"
        ));
        assert!(table.is_empty());
    }

    #[test]
    fn data_set_names_unnamed_tables_in_order() {
        let mut set = DataSet::new();
        set.add_table(DataTable::new("", Vec::new()));
        set.add_table(DataTable::new("", Vec::new()));
        set.add_table(users());
        let names: Vec<&str> = set.tables().iter().map(DataTable::name).collect();
        assert_eq!(names, ["Table", "Table1", "Users"]);
        assert!(set.table("Table1").is_some());
    }
}
