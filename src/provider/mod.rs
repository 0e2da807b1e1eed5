//! The execution engine: one contract for tabular, multi-table, scalar and
//! non-query calls over whichever backend was injected.
//!
//! Every public operation runs behind a single failure boundary: whatever goes
//! wrong underneath (connection, parameters, execution, materialization) comes
//! back as one [`DataProviderError`] whose source is the original failure.
//! Nothing is retried here.

mod non_query;
mod scalar;
mod set;
mod table;
mod transaction;

pub use transaction::TransactionScope;

use std::fmt;

use crate::backend::{BackendProvider, Connection};
use crate::command::{Command, Parameter, TransactionHandle};
use crate::error::{DataProviderError, DriverError};
use crate::schema::TypeRegistry;
use crate::types::{CommandKind, DbValue, ProviderType};

/// Default command timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u32 = 30;

/// Backend-agnostic data provider.
///
/// Holds the injected backend, the command timeout (seconds, `0` = none) and
/// the registry used to type materialized columns. Configure it once, then
/// share it by reference; calls only need `&self`.
pub struct DataProvider {
    backend: Box<dyn BackendProvider>,
    timeout: u32,
    types: TypeRegistry,
}

impl fmt::Debug for DataProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataProvider")
            .field("provider", &self.backend.provider_type())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl DataProvider {
    pub fn new(backend: impl BackendProvider + 'static) -> Self {
        Self::from_boxed(Box::new(backend))
    }

    #[must_use]
    pub fn from_boxed(backend: Box<dyn BackendProvider>) -> Self {
        Self {
            backend,
            timeout: DEFAULT_TIMEOUT_SECS,
            types: TypeRegistry::default(),
        }
    }

    /// Replace the registry used to resolve column type names.
    #[must_use]
    pub fn with_type_registry(mut self, types: TypeRegistry) -> Self {
        self.types = types;
        self
    }

    #[must_use]
    pub fn type_registry(&self) -> &TypeRegistry {
        &self.types
    }

    #[must_use]
    pub fn provider_type(&self) -> ProviderType {
        self.backend.provider_type()
    }

    /// Command timeout in seconds; `0` means no timeout.
    #[must_use]
    pub fn timeout(&self) -> u32 {
        self.timeout
    }

    /// Set the command timeout for every call issued after this one.
    pub fn set_timeout(&mut self, seconds: u32) {
        self.timeout = seconds;
    }

    /// Create (but do not open) a backend connection.
    ///
    /// # Errors
    /// Returns `DataProviderError` wrapping the backend failure.
    pub fn create_connection(
        &self,
        connection_string: &str,
    ) -> Result<Box<dyn Connection>, DataProviderError> {
        self.boundary("create_connection", || {
            self.backend.open_connection(connection_string)
        })
    }

    /// Create a backend parameter; `None` binds the backend null marker.
    ///
    /// # Errors
    /// Returns `DataProviderError` wrapping the backend failure.
    pub fn create_parameter(
        &self,
        name: &str,
        value: Option<DbValue>,
    ) -> Result<Parameter, DataProviderError> {
        self.boundary("create_parameter", || {
            self.backend.create_parameter(name, value)
        })
    }

    /// Create one parameter per `(name, value)` pair, keeping their order.
    ///
    /// # Errors
    /// Returns `DataProviderError` for the first parameter the backend rejects.
    pub fn create_parameters<I, N>(&self, values: I) -> Result<Vec<Parameter>, DataProviderError>
    where
        I: IntoIterator<Item = (N, Option<DbValue>)>,
        N: AsRef<str>,
    {
        self.boundary("create_parameters", || {
            values
                .into_iter()
                .map(|(name, value)| self.backend.create_parameter(name.as_ref(), value))
                .collect()
        })
    }

    /// Fill `command` for one call.
    ///
    /// Sets the text and kind, the current timeout, the transaction if any,
    /// then appends input parameters, output parameters and the return
    /// parameter, each group in caller order. Nothing is validated here; a bad
    /// statement fails when the backend runs it.
    #[allow(clippy::too_many_arguments)]
    pub fn configure_command(
        &self,
        command: &mut Command,
        transaction: Option<TransactionHandle>,
        kind: CommandKind,
        text: &str,
        params_in: &[Parameter],
        params_out: &[Parameter],
        param_return: Option<&Parameter>,
    ) {
        command.set_text(text);
        command.set_kind(kind);
        command.set_timeout(self.timeout);
        if let Some(tx) = transaction {
            command.set_transaction(tx);
        }
        for p in params_in.iter().chain(params_out).chain(param_return) {
            command.push_parameter(p.clone());
        }

        tracing::debug!(
            provider = %self.provider_type(),
            kind = ?kind,
            timeout = self.timeout,
            parameters = command.parameters().len(),
            "configured command"
        );
        tracing::trace!(statement = text, "command text");
    }

    fn boundary<T>(
        &self,
        operation: &'static str,
        call: impl FnOnce() -> Result<T, DriverError>,
    ) -> Result<T, DataProviderError> {
        tracing::debug!(operation, provider = %self.provider_type(), "data provider call");
        call().map_err(|e| self.fail(operation, e))
    }

    fn fail(&self, operation: &'static str, err: DriverError) -> DataProviderError {
        tracing::error!(
            operation,
            provider = %self.provider_type(),
            error = %err,
            "data provider call failed"
        );
        DataProviderError::wrap(err)
    }
}

/// Copy the values the backend left in the configured output and return
/// parameters back into the caller's parameters.
fn write_back(
    command: &Command,
    params_in: usize,
    params_out: &mut [Parameter],
    param_return: Option<&mut Parameter>,
) {
    let configured = command.parameters().get(params_in..).unwrap_or_default();
    for (caller, bound) in params_out.iter_mut().zip(configured) {
        caller.set_value(bound.value().clone());
    }
    if let (Some(caller), Some(bound)) = (param_return, configured.get(params_out.len())) {
        caller.set_value(bound.value().clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParameterDirection;

    struct NoopBackend;

    impl BackendProvider for NoopBackend {
        fn provider_type(&self) -> ProviderType {
            ProviderType::Odbc
        }

        fn open_connection(&self, _: &str) -> Result<Box<dyn Connection>, DriverError> {
            Err(DriverError::Unimplemented("no connections".into()))
        }

        fn create_parameter(
            &self,
            name: &str,
            value: Option<DbValue>,
        ) -> Result<Parameter, DriverError> {
            Ok(Parameter::new(ProviderType::Odbc, name, value))
        }
    }

    fn param(provider: &DataProvider, name: &str) -> Parameter {
        provider
            .create_parameter(name, Some(DbValue::Int(0)))
            .unwrap_or_else(|_| Parameter::new(ProviderType::Odbc, name, None))
    }

    #[test]
    fn configure_orders_in_out_return() {
        let provider = DataProvider::new(NoopBackend);
        let a = param(&provider, "A");
        let b = param(&provider, "B");
        let c = param(&provider, "C").into_output();
        let r = param(&provider, "R").into_return_value();

        let mut command = Command::new();
        provider.configure_command(
            &mut command,
            None,
            CommandKind::StoredProcedure,
            "usp_thing",
            &[a, b],
            &[c],
            Some(&r),
        );

        let names: Vec<&str> = command.parameters().iter().map(Parameter::name).collect();
        assert_eq!(names, ["A", "B", "C", "R"]);
        assert_eq!(command.kind(), CommandKind::StoredProcedure);
        assert_eq!(command.text(), "usp_thing");
        assert_eq!(command.timeout(), DEFAULT_TIMEOUT_SECS);
        assert_eq!(command.transaction(), None);
        assert_eq!(
            command.parameters()[3].direction(),
            ParameterDirection::ReturnValue
        );
    }

    #[test]
    fn configure_uses_current_timeout_and_transaction() {
        let mut provider = DataProvider::new(NoopBackend);
        provider.set_timeout(0);
        let mut command = Command::new();
        provider.configure_command(
            &mut command,
            Some(TransactionHandle::new(9)),
            CommandKind::Text,
            "select 1",
            &[],
            &[],
            None,
        );
        assert_eq!(command.timeout(), 0);
        assert_eq!(command.transaction().map(TransactionHandle::id), Some(9));
        assert!(command.parameters().is_empty());
    }

    #[test]
    fn write_back_fills_out_and_return() {
        let provider = DataProvider::new(NoopBackend);
        let input = param(&provider, "in");
        let mut outs = vec![param(&provider, "out").into_output()];
        let mut ret = param(&provider, "ret").into_return_value();

        let mut command = Command::new();
        provider.configure_command(
            &mut command,
            None,
            CommandKind::StoredProcedure,
            "p",
            std::slice::from_ref(&input),
            &outs,
            Some(&ret),
        );
        command.parameters_mut()[1].set_value(DbValue::Text("done".into()));
        command.parameters_mut()[2].set_value(DbValue::Int(42));

        write_back(&command, 1, &mut outs, Some(&mut ret));
        assert_eq!(outs[0].value(), &DbValue::Text("done".into()));
        assert_eq!(ret.value(), &DbValue::Int(42));
    }

    #[test]
    fn create_connection_failure_is_wrapped() {
        let provider = DataProvider::new(NoopBackend);
        let err = provider
            .create_connection("DSN=x")
            .err()
            .map(|e| e.downcast_source::<DriverError>().is_some());
        assert_eq!(err, Some(true));
    }
}
