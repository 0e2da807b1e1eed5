use super::{DataProvider, write_back};
use crate::backend::{Connection, ConnectionGuard, read_table};
use crate::command::{Command, Parameter};
use crate::error::{DataProviderError, DriverError};
use crate::formatting::format_positional;
use crate::results::{DataSet, DataTable};
use crate::types::{CommandKind, DbValue};

impl DataProvider {
    /// Run `command` on an open connection and materialize its first result.
    ///
    /// Columns come from the reader's schema metadata, in order, each type
    /// name resolved through the provider's [`TypeRegistry`](crate::TypeRegistry);
    /// rows are copied value by value.
    ///
    /// # Errors
    /// Returns `DataProviderError` if execution fails or a column type cannot be resolved.
    pub fn get_data_table(
        &self,
        connection: &mut dyn Connection,
        command: &mut Command,
    ) -> Result<DataTable, DataProviderError> {
        self.boundary("get_data_table", || self.read_data_table(connection, command))
    }

    /// Fetch a single table from a query template filled by positional substitution.
    ///
    /// # Security
    ///
    /// `values` are spliced into the text with no quoting or escaping (see
    /// [`format_positional`]). Only use this with trusted, caller-controlled
    /// values; prefer [`execute_data_table`](Self::execute_data_table).
    ///
    /// # Errors
    /// Returns `DataProviderError` on any formatting, connection or execution failure.
    pub fn execute_data_table_unchecked(
        &self,
        connection_string: &str,
        query: &str,
        values: &[DbValue],
    ) -> Result<DataTable, DataProviderError> {
        self.boundary("execute_data_table_unchecked", || {
            let query = format_positional(query, values)?;
            self.fetch_table(connection_string, CommandKind::Text, &query, &[], &mut [], None)
        })
    }

    /// Fetch a single table from a query with bound parameters.
    ///
    /// # Errors
    /// Returns `DataProviderError` on any connection, execution or materialization failure.
    pub fn execute_data_table(
        &self,
        connection_string: &str,
        query: &str,
        params: &[Parameter],
    ) -> Result<DataTable, DataProviderError> {
        self.boundary("execute_data_table", || {
            self.fetch_table(connection_string, CommandKind::Text, query, params, &mut [], None)
        })
    }

    /// Fetch a single table from a stored procedure.
    ///
    /// Output and return values are written back into `params_out` and `param_return`.
    ///
    /// # Errors
    /// Returns `DataProviderError` on any connection, execution or materialization failure.
    pub fn execute_data_table_procedure(
        &self,
        connection_string: &str,
        procedure_name: &str,
        params_in: &[Parameter],
        params_out: &mut [Parameter],
        param_return: Option<&mut Parameter>,
    ) -> Result<DataTable, DataProviderError> {
        self.boundary("execute_data_table_procedure", || {
            self.fetch_table(
                connection_string,
                CommandKind::StoredProcedure,
                procedure_name,
                params_in,
                params_out,
                param_return,
            )
        })
    }

    fn fetch_table(
        &self,
        connection_string: &str,
        kind: CommandKind,
        text: &str,
        params_in: &[Parameter],
        params_out: &mut [Parameter],
        param_return: Option<&mut Parameter>,
    ) -> Result<DataTable, DriverError> {
        let mut connection = ConnectionGuard::new(self.backend.open_connection(connection_string)?);
        let mut command = Command::new();
        self.configure_command(
            &mut command,
            None,
            kind,
            text,
            params_in,
            params_out,
            param_return.as_deref(),
        );

        connection.open()?;
        let table = self.read_data_table(connection.connection(), &mut command)?;
        connection.close()?;
        write_back(&command, params_in.len(), params_out, param_return);
        Ok(table)
    }

    pub(super) fn read_data_table(
        &self,
        connection: &mut dyn Connection,
        command: &mut Command,
    ) -> Result<DataTable, DriverError> {
        let mut reader = connection.execute_reader(command)?;
        read_table(reader.as_mut(), &self.types, &DataSet::table_name(0))
    }
}
