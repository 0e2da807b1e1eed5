use thiserror::Error;

/// Boxed cause carried by [`DataProviderError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures raised beneath the provider boundary: by a backend, by the
/// configurator, or while materializing results.
///
/// Callers of [`DataProvider`](crate::DataProvider) never receive this type
/// directly; it is the `source()` of the [`DataProviderError`] they get.
#[derive(Debug, Error)]
pub enum DriverError {
    #[cfg(feature = "mssql")]
    #[error(transparent)]
    Tiberius(#[from] tiberius::error::Error),

    #[cfg(feature = "odbc")]
    #[error(transparent)]
    Odbc(#[from] odbc_api::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Format error: {0}")]
    FormatError(String),

    #[error("Unknown column type `{0}`")]
    UnknownType(String),

    #[error("Column `{column}` expects {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },

    #[error("Connection is closed")]
    ConnectionClosed,

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),

    #[error(transparent)]
    Other(BoxError),
}

/// The single error kind surfaced by the execution engine.
///
/// Every failure from connection creation, command configuration, parameter
/// creation, execution, or result materialization is rethrown as this type.
/// The message is the cause's message and the cause itself is kept as the
/// [`source`](std::error::Error::source).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct DataProviderError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl DataProviderError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Wrap an underlying failure, keeping its message and the failure itself.
    pub fn wrap(cause: impl Into<BoxError>) -> Self {
        let cause = cause.into();
        Self {
            message: cause.to_string(),
            source: Some(cause),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Borrow the original cause as a concrete type, if it is one.
    #[must_use]
    pub fn downcast_source<T: std::error::Error + 'static>(&self) -> Option<&T> {
        self.source.as_deref().and_then(|e| e.downcast_ref::<T>())
    }
}

impl From<DriverError> for DataProviderError {
    fn from(err: DriverError) -> Self {
        DataProviderError::wrap(err)
    }
}
