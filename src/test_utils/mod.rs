//! In-memory backend for exercising [`DataProvider`](crate::DataProvider)
//! without a database.
//!
//! [`FakeBackend`] serves scripted result sets, affected-row counts and output
//! values, records what the engine asked of it, and can be told to fail at any
//! stage. Clones share state, so keep one clone to inspect after handing the
//! other to the provider:
//!
//! ```rust
//! use sql_provider::prelude::*;
//! use sql_provider::test_utils::FakeBackend;
//!
//! let backend = FakeBackend::new().with_result(
//!     &[("Id", "int"), ("Name", "nvarchar(50)")],
//!     vec![vec![DbValue::Int(1), DbValue::Text("Ada".into())]],
//! );
//! let provider = DataProvider::new(backend.clone());
//! let table = provider.execute_data_table("fake", "SELECT Id, Name FROM Users", &[])?;
//! assert_eq!(table.row_count(), 1);
//! assert_eq!(backend.opens(), backend.closes());
//! # Ok::<(), DataProviderError>(())
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::backend::{
    BackendProvider, BufferedReader, BufferedResult, Connection, DataReader,
};
use crate::command::{Command, Parameter, TransactionHandle};
use crate::error::DriverError;
use crate::schema::SchemaColumn;
use crate::types::{DbValue, ProviderType};

/// Stage at which the fake backend raises an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    CreateConnection,
    CreateParameter,
    Open,
    Execute,
    Read,
    Close,
    Begin,
    Commit,
    Rollback,
}

/// Transaction calls seen by the fake backend, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionEvent {
    Begin(TransactionHandle),
    Commit(TransactionHandle),
    Rollback(TransactionHandle),
}

#[derive(Debug, Default)]
struct FakeState {
    results: Vec<BufferedResult>,
    non_query_count: i64,
    outputs: Vec<DbValue>,
    fail_at: Option<FailAt>,
    connections_created: usize,
    opens: usize,
    closes: usize,
    readers_opened: usize,
    readers_dropped: usize,
    commands: Vec<Command>,
    transactions: Vec<TransactionEvent>,
    next_transaction: u64,
}

impl FakeState {
    fn check(&self, stage: FailAt) -> Result<(), DriverError> {
        if self.fail_at != Some(stage) {
            return Ok(());
        }
        let message = format!("injected failure at {stage:?}");
        Err(match stage {
            FailAt::CreateConnection | FailAt::Open | FailAt::Close => {
                DriverError::ConnectionError(message)
            }
            FailAt::CreateParameter => DriverError::ParameterError(message),
            FailAt::Execute | FailAt::Read | FailAt::Begin | FailAt::Commit | FailAt::Rollback => {
                DriverError::ExecutionError(message)
            }
        })
    }
}

type Shared = Arc<Mutex<FakeState>>;

fn lock(state: &Shared) -> MutexGuard<'_, FakeState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scripted, observable backend. See the [module docs](self).
#[derive(Debug, Clone)]
pub struct FakeBackend {
    provider: ProviderType,
    state: Shared,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    /// A SQL Server flavored fake with no results and an affected count of 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            provider: ProviderType::SqlServer,
            state: Arc::default(),
        }
    }

    #[must_use]
    pub fn with_provider_type(mut self, provider: ProviderType) -> Self {
        self.provider = provider;
        self
    }

    /// Append a result set served by every reader. Columns are `(name, type name)`.
    #[must_use]
    pub fn with_result(self, columns: &[(&str, &str)], rows: Vec<Vec<DbValue>>) -> Self {
        let columns = columns
            .iter()
            .map(|(name, type_name)| SchemaColumn::new(*name, *type_name))
            .collect();
        lock(&self.state)
            .results
            .push(BufferedResult::new(columns, rows));
        self
    }

    #[must_use]
    pub fn with_non_query_count(self, count: i64) -> Self {
        lock(&self.state).non_query_count = count;
        self
    }

    /// Values written, in order, into the output and return parameters of
    /// every executed command.
    #[must_use]
    pub fn with_outputs(self, outputs: Vec<DbValue>) -> Self {
        lock(&self.state).outputs = outputs;
        self
    }

    #[must_use]
    pub fn failing_at(self, stage: FailAt) -> Self {
        self.set_failure(Some(stage));
        self
    }

    /// Change (or clear) the injected failure after the provider was built.
    pub fn set_failure(&self, stage: Option<FailAt>) {
        lock(&self.state).fail_at = stage;
    }

    #[must_use]
    pub fn connections_created(&self) -> usize {
        lock(&self.state).connections_created
    }

    #[must_use]
    pub fn opens(&self) -> usize {
        lock(&self.state).opens
    }

    #[must_use]
    pub fn closes(&self) -> usize {
        lock(&self.state).closes
    }

    #[must_use]
    pub fn readers_opened(&self) -> usize {
        lock(&self.state).readers_opened
    }

    #[must_use]
    pub fn readers_dropped(&self) -> usize {
        lock(&self.state).readers_dropped
    }

    /// The most recently executed command, as the engine configured it.
    #[must_use]
    pub fn last_command(&self) -> Option<Command> {
        lock(&self.state).commands.last().cloned()
    }

    /// Every executed command, oldest first.
    #[must_use]
    pub fn commands(&self) -> Vec<Command> {
        lock(&self.state).commands.clone()
    }

    #[must_use]
    pub fn transaction_log(&self) -> Vec<TransactionEvent> {
        lock(&self.state).transactions.clone()
    }
}

impl BackendProvider for FakeBackend {
    fn provider_type(&self) -> ProviderType {
        self.provider
    }

    fn open_connection(&self, _connection_string: &str) -> Result<Box<dyn Connection>, DriverError> {
        let mut state = lock(&self.state);
        state.check(FailAt::CreateConnection)?;
        state.connections_created += 1;
        Ok(Box::new(FakeConnection {
            state: Arc::clone(&self.state),
            open: false,
        }))
    }

    fn create_parameter(&self, name: &str, value: Option<DbValue>) -> Result<Parameter, DriverError> {
        lock(&self.state).check(FailAt::CreateParameter)?;
        Ok(Parameter::new(self.provider, name, value))
    }
}

struct FakeConnection {
    state: Shared,
    open: bool,
}

impl FakeConnection {
    // Record the command, fill its outputs, and honour an injected execute failure.
    fn run(&self, command: &mut Command) -> Result<(), DriverError> {
        if !self.open {
            return Err(DriverError::ConnectionClosed);
        }
        let mut state = lock(&self.state);
        state.check(FailAt::Execute)?;

        let targets = command
            .parameters_mut()
            .iter_mut()
            .filter(|p| p.direction().is_output());
        for (param, value) in targets.zip(state.outputs.iter()) {
            param.set_value(value.clone());
        }
        state.commands.push(command.clone());
        Ok(())
    }
}

impl Connection for FakeConnection {
    fn open(&mut self) -> Result<(), DriverError> {
        if self.open {
            return Err(DriverError::ConnectionError(
                "connection is already open".to_string(),
            ));
        }
        let mut state = lock(&self.state);
        state.check(FailAt::Open)?;
        state.opens += 1;
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), DriverError> {
        if !self.open {
            return Ok(());
        }
        let mut state = lock(&self.state);
        state.closes += 1;
        self.open = false;
        state.check(FailAt::Close)
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn execute_reader<'a>(
        &'a mut self,
        command: &'a mut Command,
    ) -> Result<Box<dyn DataReader + 'a>, DriverError> {
        self.run(command)?;
        let mut state = lock(&self.state);
        state.readers_opened += 1;
        Ok(Box::new(FakeReader {
            inner: BufferedReader::new(state.results.clone()),
            state: Arc::clone(&self.state),
        }))
    }

    fn execute_non_query(&mut self, command: &mut Command) -> Result<i64, DriverError> {
        self.run(command)?;
        Ok(lock(&self.state).non_query_count)
    }

    fn begin_transaction(&mut self) -> Result<TransactionHandle, DriverError> {
        let mut state = lock(&self.state);
        state.check(FailAt::Begin)?;
        state.next_transaction += 1;
        let handle = TransactionHandle::new(state.next_transaction);
        state.transactions.push(TransactionEvent::Begin(handle));
        Ok(handle)
    }

    fn commit(&mut self, transaction: TransactionHandle) -> Result<(), DriverError> {
        let mut state = lock(&self.state);
        state.check(FailAt::Commit)?;
        state.transactions.push(TransactionEvent::Commit(transaction));
        Ok(())
    }

    fn rollback(&mut self, transaction: TransactionHandle) -> Result<(), DriverError> {
        let mut state = lock(&self.state);
        state.check(FailAt::Rollback)?;
        state
            .transactions
            .push(TransactionEvent::Rollback(transaction));
        Ok(())
    }
}

struct FakeReader {
    inner: BufferedReader,
    state: Shared,
}

impl DataReader for FakeReader {
    fn schema(&self) -> Result<Vec<SchemaColumn>, DriverError> {
        self.inner.schema()
    }

    fn read(&mut self) -> Result<Option<Vec<DbValue>>, DriverError> {
        lock(&self.state).check(FailAt::Read)?;
        self.inner.read()
    }

    fn next_result(&mut self) -> Result<bool, DriverError> {
        self.inner.next_result()
    }
}

impl Drop for FakeReader {
    fn drop(&mut self) {
        lock(&self.state).readers_dropped += 1;
    }
}
