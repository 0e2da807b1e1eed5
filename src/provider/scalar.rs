use super::{DataProvider, write_back};
use crate::backend::ConnectionGuard;
use crate::command::{Command, Parameter};
use crate::error::{DataProviderError, DriverError};
use crate::formatting::format_positional;
use crate::types::{CommandKind, DbValue};

impl DataProvider {
    /// Fetch a single value from a query template filled by positional substitution.
    ///
    /// # Security
    ///
    /// `values` are spliced into the text with no quoting or escaping (see
    /// [`format_positional`]). Only use this with trusted, caller-controlled values.
    ///
    /// # Errors
    /// Returns `DataProviderError` on any formatting, connection or execution failure.
    pub fn execute_scalar_unchecked(
        &self,
        connection_string: &str,
        query: &str,
        values: &[DbValue],
    ) -> Result<Option<DbValue>, DataProviderError> {
        self.boundary("execute_scalar_unchecked", || {
            let query = format_positional(query, values)?;
            self.run_scalar(connection_string, CommandKind::Text, &query, &[], &mut [], None)
        })
    }

    /// First column of the first row, `None` when the query returns no rows.
    ///
    /// A SQL `NULL` in that cell comes back as `Some(DbValue::Null)`.
    ///
    /// # Errors
    /// Returns `DataProviderError` on any connection or execution failure.
    pub fn execute_scalar(
        &self,
        connection_string: &str,
        query: &str,
        params: &[Parameter],
    ) -> Result<Option<DbValue>, DataProviderError> {
        self.boundary("execute_scalar", || {
            self.run_scalar(connection_string, CommandKind::Text, query, params, &mut [], None)
        })
    }

    /// First column of the first row returned by a stored procedure.
    ///
    /// # Errors
    /// Returns `DataProviderError` on any connection or execution failure.
    pub fn execute_scalar_procedure(
        &self,
        connection_string: &str,
        procedure_name: &str,
        params_in: &[Parameter],
        params_out: &mut [Parameter],
        param_return: Option<&mut Parameter>,
    ) -> Result<Option<DbValue>, DataProviderError> {
        self.boundary("execute_scalar_procedure", || {
            self.run_scalar(
                connection_string,
                CommandKind::StoredProcedure,
                procedure_name,
                params_in,
                params_out,
                param_return,
            )
        })
    }

    fn run_scalar(
        &self,
        connection_string: &str,
        kind: CommandKind,
        text: &str,
        params_in: &[Parameter],
        params_out: &mut [Parameter],
        param_return: Option<&mut Parameter>,
    ) -> Result<Option<DbValue>, DriverError> {
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
        let value = connection.connection().execute_scalar(&mut command)?;
        connection.close()?;
        write_back(&command, params_in.len(), params_out, param_return);
        Ok(value)
    }
}
