//! The capability contract every backend adapter implements, plus the shared
//! pieces adapters build on: a reader-driven data adapter, an in-memory reader,
//! and the scope guard that closes connections.

use std::collections::VecDeque;

use crate::command::{Command, Parameter, TransactionHandle};
use crate::error::DriverError;
use crate::results::{DataColumn, DataSet, DataTable};
use crate::schema::{SchemaColumn, TypeRegistry};
use crate::types::{DbValue, ProviderType};

/// A concrete backend: creates connections, data adapters and parameters for
/// one wire protocol.
pub trait BackendProvider: Send + Sync {
    fn provider_type(&self) -> ProviderType;

    /// Create a connection for `connection_string` without opening it.
    ///
    /// # Errors
    ///
    /// Returns `DriverError` if the connection string is rejected or the
    /// backend is not available in this build.
    fn open_connection(&self, connection_string: &str) -> Result<Box<dyn Connection>, DriverError>;

    /// Wrap a configured command so a fill can materialize its result tables.
    ///
    /// # Errors
    ///
    /// Returns `DriverError` if the backend cannot build an adapter for the command.
    fn create_data_adapter<'c>(
        &self,
        connection: &'c mut dyn Connection,
        command: &'c mut Command,
    ) -> Result<Box<dyn DataAdapter + 'c>, DriverError> {
        Ok(Box::new(ReaderAdapter::new(connection, command)))
    }

    /// Create a parameter; `None` binds the backend null marker.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::ParameterError` if the name is not acceptable to the backend.
    fn create_parameter(&self, name: &str, value: Option<DbValue>) -> Result<Parameter, DriverError>;
}

/// A backend connection. Created closed; opened either by the engine or by a
/// data adapter.
pub trait Connection {
    /// # Errors
    /// Returns `DriverError` if the backend cannot be reached.
    fn open(&mut self) -> Result<(), DriverError>;

    /// # Errors
    /// Returns `DriverError` if the backend fails to release the session.
    fn close(&mut self) -> Result<(), DriverError>;

    fn is_open(&self) -> bool;

    /// Run `command` and stream its results.
    ///
    /// # Errors
    /// Returns `DriverError` if execution fails.
    fn execute_reader<'a>(
        &'a mut self,
        command: &'a mut Command,
    ) -> Result<Box<dyn DataReader + 'a>, DriverError>;

    /// Run `command` and return the backend's affected-row count (`-1` when it reports none).
    ///
    /// # Errors
    /// Returns `DriverError` if execution fails.
    fn execute_non_query(&mut self, command: &mut Command) -> Result<i64, DriverError>;

    /// First column of the first row, or `None` when there are no rows.
    ///
    /// # Errors
    /// Returns `DriverError` if execution fails.
    fn execute_scalar(&mut self, command: &mut Command) -> Result<Option<DbValue>, DriverError> {
        let mut reader = self.execute_reader(command)?;
        Ok(reader.read()?.and_then(|row| row.into_iter().next()))
    }

    /// # Errors
    /// Returns `DriverError::Unimplemented` unless the backend supports transactions.
    fn begin_transaction(&mut self) -> Result<TransactionHandle, DriverError> {
        Err(DriverError::Unimplemented(
            "transactions are not supported by this backend".to_string(),
        ))
    }

    /// # Errors
    /// Returns `DriverError` if the commit fails.
    fn commit(&mut self, _transaction: TransactionHandle) -> Result<(), DriverError> {
        Err(DriverError::Unimplemented(
            "transactions are not supported by this backend".to_string(),
        ))
    }

    /// # Errors
    /// Returns `DriverError` if the rollback fails.
    fn rollback(&mut self, _transaction: TransactionHandle) -> Result<(), DriverError> {
        Err(DriverError::Unimplemented(
            "transactions are not supported by this backend".to_string(),
        ))
    }
}

/// Forward-only reader over one or more result tables.
pub trait DataReader {
    /// Column metadata of the current result.
    ///
    /// # Errors
    /// Returns `DriverError` if the driver cannot describe the result.
    fn schema(&self) -> Result<Vec<SchemaColumn>, DriverError>;

    /// Next row of the current result.
    ///
    /// # Errors
    /// Returns `DriverError` if fetching fails.
    fn read(&mut self) -> Result<Option<Vec<DbValue>>, DriverError>;

    /// Advance to the next result; `false` when there is none.
    ///
    /// # Errors
    /// Returns `DriverError` if fetching fails.
    fn next_result(&mut self) -> Result<bool, DriverError>;
}

/// Executes a command and materializes every result table it produces.
pub trait DataAdapter {
    /// Append one table per result with columns to `data_set`; returns the number of rows added.
    ///
    /// # Errors
    /// Returns `DriverError` if execution or materialization fails.
    fn fill(&mut self, types: &TypeRegistry, data_set: &mut DataSet) -> Result<usize, DriverError>;
}

/// Read the current result of `reader` into a table.
///
/// Columns follow the schema order; each declared type is resolved through
/// `types`, and rows are copied value by value.
///
/// # Errors
/// Returns `DriverError::UnknownType` for an unresolvable column type, or any
/// error the reader raises.
pub fn read_table(
    reader: &mut dyn DataReader,
    types: &TypeRegistry,
    name: &str,
) -> Result<DataTable, DriverError> {
    let columns = reader
        .schema()?
        .into_iter()
        .map(|col| -> Result<DataColumn, DriverError> {
            let data_type = types.resolve(&col.type_name)?;
            Ok(DataColumn::new(col.name, data_type))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut table = DataTable::new(name, columns);
    while let Some(values) = reader.read()? {
        table.add_row(values)?;
    }
    Ok(table)
}

/// Data adapter built on [`Connection::execute_reader`].
///
/// Opens the connection only if it is closed, and closes only a connection it
/// opened itself, on every exit path.
pub struct ReaderAdapter<'c> {
    connection: &'c mut dyn Connection,
    command: &'c mut Command,
}

impl<'c> ReaderAdapter<'c> {
    pub fn new(connection: &'c mut dyn Connection, command: &'c mut Command) -> Self {
        Self {
            connection,
            command,
        }
    }
}

impl DataAdapter for ReaderAdapter<'_> {
    fn fill(&mut self, types: &TypeRegistry, data_set: &mut DataSet) -> Result<usize, DriverError> {
        let opened_here = !self.connection.is_open();
        if opened_here {
            self.connection.open()?;
        }

        let outcome = fill_from_reader(&mut *self.connection, &mut *self.command, types, data_set);

        if opened_here {
            let closed = self.connection.close();
            // the fill error wins over a close error
            let rows = outcome?;
            closed?;
            return Ok(rows);
        }
        outcome
    }
}

fn fill_from_reader(
    connection: &mut dyn Connection,
    command: &mut Command,
    types: &TypeRegistry,
    data_set: &mut DataSet,
) -> Result<usize, DriverError> {
    let mut reader = connection.execute_reader(command)?;
    let mut rows = 0;
    loop {
        // a result without columns (no result set at all, or a bare row count) adds no table
        if !reader.schema()?.is_empty() {
            let table = read_table(reader.as_mut(), types, &DataSet::table_name(data_set.len()))?;
            rows += table.row_count();
            data_set.add_table(table);
        }
        if !reader.next_result()? {
            break;
        }
    }
    Ok(rows)
}

/// One fully fetched result table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferedResult {
    pub columns: Vec<SchemaColumn>,
    pub rows: Vec<Vec<DbValue>>,
}

impl BufferedResult {
    #[must_use]
    pub fn new(columns: Vec<SchemaColumn>, rows: Vec<Vec<DbValue>>) -> Self {
        Self { columns, rows }
    }
}

/// In-memory [`DataReader`] for drivers that hand back whole results at once.
#[derive(Debug, Default)]
pub struct BufferedReader {
    current: Option<(Vec<SchemaColumn>, VecDeque<Vec<DbValue>>)>,
    remaining: VecDeque<BufferedResult>,
}

impl BufferedReader {
    #[must_use]
    pub fn new(results: Vec<BufferedResult>) -> Self {
        let mut remaining: VecDeque<BufferedResult> = results.into();
        let current = remaining
            .pop_front()
            .map(|r| (r.columns, VecDeque::from(r.rows)));
        Self { current, remaining }
    }
}

impl DataReader for BufferedReader {
    fn schema(&self) -> Result<Vec<SchemaColumn>, DriverError> {
        Ok(self
            .current
            .as_ref()
            .map(|(columns, _)| columns.clone())
            .unwrap_or_default())
    }

    fn read(&mut self) -> Result<Option<Vec<DbValue>>, DriverError> {
        Ok(self.current.as_mut().and_then(|(_, rows)| rows.pop_front()))
    }

    fn next_result(&mut self) -> Result<bool, DriverError> {
        match self.remaining.pop_front() {
            Some(next) => {
                self.current = Some((next.columns, VecDeque::from(next.rows)));
                Ok(true)
            }
            None => {
                self.current = None;
                Ok(false)
            }
        }
    }
}

/// Owns a connection for the length of one call.
///
/// A call that succeeds ends with [`ConnectionGuard::close`], so a failed close
/// becomes the call's error. A call that fails leaves the guard to close on
/// drop; that close failure is only logged, and the call's own error wins.
pub struct ConnectionGuard {
    connection: Box<dyn Connection>,
}

impl ConnectionGuard {
    #[must_use]
    pub fn new(connection: Box<dyn Connection>) -> Self {
        Self { connection }
    }

    /// Open the connection unless it already is.
    ///
    /// # Errors
    /// Returns `DriverError` if the backend cannot be reached.
    pub fn open(&mut self) -> Result<(), DriverError> {
        if self.connection.is_open() {
            return Ok(());
        }
        self.connection.open()
    }

    pub fn connection(&mut self) -> &mut dyn Connection {
        self.connection.as_mut()
    }

    /// Close the connection if it is still open.
    ///
    /// # Errors
    /// Returns `DriverError` if the backend fails to release the session.
    pub fn close(&mut self) -> Result<(), DriverError> {
        if self.connection.is_open() {
            self.connection.close()?;
        }
        Ok(())
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.connection.is_open()
            && let Err(e) = self.connection.close()
        {
            tracing::warn!(error = %e, "failed to close connection");
        }
    }
}
