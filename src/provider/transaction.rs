use super::{DataProvider, write_back};
use crate::backend::{Connection, ConnectionGuard};
use crate::command::{Command, Parameter, TransactionHandle};
use crate::error::DataProviderError;
use crate::results::DataTable;
use crate::types::{CommandKind, DbValue};

/// Commands issued inside [`DataProvider::execute_in_transaction`].
///
/// Every command runs on the transaction's connection with the transaction
/// attached.
pub struct TransactionScope<'s> {
    provider: &'s DataProvider,
    connection: &'s mut dyn Connection,
    transaction: TransactionHandle,
}

impl TransactionScope<'_> {
    #[must_use]
    pub fn transaction(&self) -> TransactionHandle {
        self.transaction
    }

    /// # Errors
    /// Returns `DataProviderError` if execution fails.
    pub fn execute_non_query(
        &mut self,
        query: &str,
        params: &[Parameter],
    ) -> Result<i64, DataProviderError> {
        let mut command = self.command(CommandKind::Text, query, params, &[], None);
        self.provider.boundary("transaction.execute_non_query", || {
            self.connection.execute_non_query(&mut command)
        })
    }

    /// # Errors
    /// Returns `DataProviderError` if execution fails.
    pub fn execute_scalar(
        &mut self,
        query: &str,
        params: &[Parameter],
    ) -> Result<Option<DbValue>, DataProviderError> {
        let mut command = self.command(CommandKind::Text, query, params, &[], None);
        self.provider.boundary("transaction.execute_scalar", || {
            self.connection.execute_scalar(&mut command)
        })
    }

    /// # Errors
    /// Returns `DataProviderError` if execution or materialization fails.
    pub fn execute_data_table(
        &mut self,
        query: &str,
        params: &[Parameter],
    ) -> Result<DataTable, DataProviderError> {
        let mut command = self.command(CommandKind::Text, query, params, &[], None);
        self.provider.boundary("transaction.execute_data_table", || {
            self.provider
                .read_data_table(&mut *self.connection, &mut command)
        })
    }

    /// # Errors
    /// Returns `DataProviderError` if execution fails.
    pub fn execute_non_query_procedure(
        &mut self,
        procedure_name: &str,
        params_in: &[Parameter],
        params_out: &mut [Parameter],
        param_return: Option<&mut Parameter>,
    ) -> Result<i64, DataProviderError> {
        let mut command = self.command(
            CommandKind::StoredProcedure,
            procedure_name,
            params_in,
            params_out,
            param_return.as_deref(),
        );
        let affected = self
            .provider
            .boundary("transaction.execute_non_query_procedure", || {
                self.connection.execute_non_query(&mut command)
            })?;
        write_back(&command, params_in.len(), params_out, param_return);
        Ok(affected)
    }

    fn command(
        &self,
        kind: CommandKind,
        text: &str,
        params_in: &[Parameter],
        params_out: &[Parameter],
        param_return: Option<&Parameter>,
    ) -> Command {
        let mut command = Command::new();
        self.provider.configure_command(
            &mut command,
            Some(self.transaction),
            kind,
            text,
            params_in,
            params_out,
            param_return,
        );
        command
    }
}

impl DataProvider {
    /// Run `work` inside one backend transaction.
    ///
    /// The connection is opened, a transaction begun, and `work` receives a
    /// [`TransactionScope`]. `Ok` commits, `Err` rolls back and is returned as
    /// is. The connection is closed on every path.
    ///
    /// ```rust,no_run
    /// use sql_provider::prelude::*;
    ///
    /// # fn demo(provider: &DataProvider) -> Result<(), DataProviderError> {
    /// let id = provider.create_parameter("@id", Some(DbValue::Int(7)))?;
    /// provider.execute_in_transaction("Server=.;Database=app", |tx| {
    ///     tx.execute_non_query("DELETE FROM Orders WHERE CustomerId = @id", std::slice::from_ref(&id))?;
    ///     tx.execute_non_query("DELETE FROM Customers WHERE Id = @id", std::slice::from_ref(&id))
    /// })?;
    /// # Ok(()) }
    /// ```
    ///
    /// # Errors
    /// Returns `DataProviderError` if the connection, begin, or commit fails, or
    /// the error `work` returned.
    pub fn execute_in_transaction<T, F>(
        &self,
        connection_string: &str,
        work: F,
    ) -> Result<T, DataProviderError>
    where
        F: FnOnce(&mut TransactionScope<'_>) -> Result<T, DataProviderError>,
    {
        let mut connection = self.boundary("execute_in_transaction", || {
            let mut connection =
                ConnectionGuard::new(self.backend.open_connection(connection_string)?);
            connection.open()?;
            Ok(connection)
        })?;
        let transaction = self.boundary("begin_transaction", || {
            connection.connection().begin_transaction()
        })?;

        let mut scope = TransactionScope {
            provider: self,
            connection: connection.connection(),
            transaction,
        };

        match work(&mut scope) {
            Ok(value) => {
                self.boundary("commit", || scope.connection.commit(transaction))?;
                self.boundary("close", || connection.close())?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = scope.connection.rollback(transaction) {
                    tracing::warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}
