use super::{DataProvider, write_back};
use crate::backend::ConnectionGuard;
use crate::command::{Command, Parameter};
use crate::error::{DataProviderError, DriverError};
use crate::formatting::format_positional;
use crate::types::{CommandKind, DbValue};

impl DataProvider {
    /// Execute a statement template filled by positional substitution.
    ///
    /// # Security
    ///
    /// `values` are spliced into the text with no quoting or escaping (see
    /// [`format_positional`]). Only use this with trusted, caller-controlled
    /// values; prefer [`execute_non_query`](Self::execute_non_query).
    ///
    /// # Errors
    /// Returns `DataProviderError` on any formatting, connection or execution failure.
    pub fn execute_non_query_unchecked(
        &self,
        connection_string: &str,
        query: &str,
        values: &[DbValue],
    ) -> Result<i64, DataProviderError> {
        self.boundary("execute_non_query_unchecked", || {
            let query = format_positional(query, values)?;
            self.run_non_query(connection_string, CommandKind::Text, &query, &[], &mut [], None)
        })
    }

    /// Execute a statement with bound parameters and return the affected-row count.
    ///
    /// The count is whatever the backend reports, `-1` included.
    ///
    /// # Errors
    /// Returns `DataProviderError` on any connection or execution failure.
    pub fn execute_non_query(
        &self,
        connection_string: &str,
        query: &str,
        params: &[Parameter],
    ) -> Result<i64, DataProviderError> {
        self.boundary("execute_non_query", || {
            self.run_non_query(connection_string, CommandKind::Text, query, params, &mut [], None)
        })
    }

    /// Execute a stored procedure and return the affected-row count.
    ///
    /// Output and return values are written back into `params_out` and
    /// `param_return`. On SQL Server a procedure called with output or return
    /// parameters reports `-1`: its values come back in a trailing row, and
    /// that batch carries no usable row count.
    ///
    /// # Errors
    /// Returns `DataProviderError` on any connection or execution failure.
    pub fn execute_non_query_procedure(
        &self,
        connection_string: &str,
        procedure_name: &str,
        params_in: &[Parameter],
        params_out: &mut [Parameter],
        param_return: Option<&mut Parameter>,
    ) -> Result<i64, DataProviderError> {
        self.boundary("execute_non_query_procedure", || {
            self.run_non_query(
                connection_string,
                CommandKind::StoredProcedure,
                procedure_name,
                params_in,
                params_out,
                param_return,
            )
        })
    }

    fn run_non_query(
        &self,
        connection_string: &str,
        kind: CommandKind,
        text: &str,
        params_in: &[Parameter],
        params_out: &mut [Parameter],
        param_return: Option<&mut Parameter>,
    ) -> Result<i64, DriverError> {
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
        let affected = connection.connection().execute_non_query(&mut command)?;
        connection.close()?;
        write_back(&command, params_in.len(), params_out, param_return);
        tracing::debug!(affected, "non-query completed");
        Ok(affected)
    }
}
