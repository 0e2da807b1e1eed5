use super::{DataProvider, write_back};
use crate::backend::ConnectionGuard;
use crate::command::{Command, Parameter};
use crate::error::{DataProviderError, DriverError};
use crate::formatting::format_positional;
use crate::results::DataSet;
use crate::types::{CommandKind, DbValue};

impl DataProvider {
    /// Fetch every result table of a query template filled by positional substitution.
    ///
    /// # Security
    ///
    /// `values` are spliced into the text with no quoting or escaping (see
    /// [`format_positional`]). Only use this with trusted, caller-controlled values.
    ///
    /// # Errors
    /// Returns `DataProviderError` on any formatting, connection or execution failure.
    pub fn execute_data_set_unchecked(
        &self,
        connection_string: &str,
        query: &str,
        values: &[DbValue],
    ) -> Result<DataSet, DataProviderError> {
        self.boundary("execute_data_set_unchecked", || {
            let query = format_positional(query, values)?;
            self.fill_data_set(connection_string, CommandKind::Text, &query, &[], &mut [], None)
        })
    }

    /// Fetch every result table of a query with bound parameters.
    ///
    /// # Errors
    /// Returns `DataProviderError` on any connection, execution or materialization failure.
    pub fn execute_data_set(
        &self,
        connection_string: &str,
        query: &str,
        params: &[Parameter],
    ) -> Result<DataSet, DataProviderError> {
        self.boundary("execute_data_set", || {
            self.fill_data_set(connection_string, CommandKind::Text, query, params, &mut [], None)
        })
    }

    /// Fetch every result table of a stored procedure.
    ///
    /// # Errors
    /// Returns `DataProviderError` on any connection, execution or materialization failure.
    pub fn execute_data_set_procedure(
        &self,
        connection_string: &str,
        procedure_name: &str,
        params_in: &[Parameter],
        params_out: &mut [Parameter],
        param_return: Option<&mut Parameter>,
    ) -> Result<DataSet, DataProviderError> {
        self.boundary("execute_data_set_procedure", || {
            self.fill_data_set(
                connection_string,
                CommandKind::StoredProcedure,
                procedure_name,
                params_in,
                params_out,
                param_return,
            )
        })
    }

    // The adapter opens and closes the connection itself; the guard only
    // catches a connection an adapter left open.
    fn fill_data_set(
        &self,
        connection_string: &str,
        kind: CommandKind,
        text: &str,
        params_in: &[Parameter],
        params_out: &mut [Parameter],
        param_return: Option<&mut Parameter>,
    ) -> Result<DataSet, DriverError> {
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

        let mut data_set = DataSet::new();
        {
            let mut adapter = self
                .backend
                .create_data_adapter(connection.connection(), &mut command)?;
            adapter.fill(&self.types, &mut data_set)?;
        }
        connection.close()?;

        write_back(&command, params_in.len(), params_out, param_return);
        Ok(data_set)
    }
}
