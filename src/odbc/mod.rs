// ODBC backend
//
// - connection: odbc-api backed `Connection` (needs the `odbc` feature)
//
// Parameters bind positionally (`?`), so names are kept as given and only
// serve to identify output values.

#[cfg(feature = "odbc")]
mod connection;

#[cfg(feature = "odbc")]
pub use connection::OdbcConnection;

use crate::backend::{BackendProvider, Connection};
use crate::command::Parameter;
use crate::error::DriverError;
use crate::types::{DbValue, ProviderType};

/// Backend for any driver reachable through an ODBC driver manager.
///
/// Connection strings are passed to the driver manager untouched, e.g.
/// `Driver={ODBC Driver 18 for SQL Server};Server=localhost;Database=app;UID=sa;PWD=...`
/// or `DSN=reporting`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OdbcProvider;

impl BackendProvider for OdbcProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Odbc
    }

    #[cfg(feature = "odbc")]
    fn open_connection(&self, connection_string: &str) -> Result<Box<dyn Connection>, DriverError> {
        Ok(Box::new(OdbcConnection::new(connection_string)?))
    }

    #[cfg(not(feature = "odbc"))]
    fn open_connection(&self, _connection_string: &str) -> Result<Box<dyn Connection>, DriverError> {
        Err(DriverError::Unimplemented(
            "ODBC is not enabled in the current build (enable the `odbc` feature)".to_string(),
        ))
    }

    fn create_parameter(&self, name: &str, value: Option<DbValue>) -> Result<Parameter, DriverError> {
        if name.trim().is_empty() {
            return Err(DriverError::ParameterError(
                "ODBC parameter names cannot be empty".to_string(),
            ));
        }
        Ok(Parameter::new(ProviderType::Odbc, name, value))
    }
}
