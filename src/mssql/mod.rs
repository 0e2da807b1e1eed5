// SQL Server backend
//
// - connection: tiberius-backed `Connection` (needs the `mssql` feature)
// - query: statement building, parameter binding and value extraction
//
// The provider itself is always available so parameters can be built and the
// factory can hand it out; only opening a connection needs the feature.

#[cfg(feature = "mssql")]
mod connection;
#[cfg(feature = "mssql")]
mod query;

#[cfg(feature = "mssql")]
pub use connection::SqlServerConnection;

use crate::backend::{BackendProvider, Connection};
use crate::command::Parameter;
use crate::error::DriverError;
use crate::types::{DbValue, ProviderType};

/// Backend for SQL Server's native protocol.
///
/// Connection strings use the ADO.NET form, e.g.
/// `Server=tcp:localhost,1433;Database=app;User Id=sa;Password=...;TrustServerCertificate=true`.
/// Statement text refers to bound parameters by position as `@P1`, `@P2`, …;
/// the `@name` of a parameter is used for stored procedure arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerProvider;

impl BackendProvider for SqlServerProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::SqlServer
    }

    #[cfg(feature = "mssql")]
    fn open_connection(&self, connection_string: &str) -> Result<Box<dyn Connection>, DriverError> {
        Ok(Box::new(SqlServerConnection::new(connection_string)?))
    }

    #[cfg(not(feature = "mssql"))]
    fn open_connection(&self, _connection_string: &str) -> Result<Box<dyn Connection>, DriverError> {
        Err(DriverError::Unimplemented(
            "SQL Server is not enabled in the current build (enable the `mssql` feature)"
                .to_string(),
        ))
    }

    fn create_parameter(&self, name: &str, value: Option<DbValue>) -> Result<Parameter, DriverError> {
        let name = name.trim();
        if name.trim_start_matches('@').is_empty() {
            return Err(DriverError::ParameterError(
                "SQL Server parameter names cannot be empty".to_string(),
            ));
        }
        let name = if name.starts_with('@') {
            name.to_string()
        } else {
            format!("@{name}")
        };
        Ok(Parameter::new(ProviderType::SqlServer, name, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_names_get_at_prefix() -> Result<(), DriverError> {
        let provider = SqlServerProvider;
        assert_eq!(provider.create_parameter("id", None)?.name(), "@id");
        assert_eq!(provider.create_parameter("@id", None)?.name(), "@id");
        assert!(provider.create_parameter(" @ ", None).is_err());
        Ok(())
    }

    #[test]
    fn null_value_binds_null_marker() -> Result<(), DriverError> {
        let p = SqlServerProvider.create_parameter("name", None)?;
        assert!(p.is_db_null());
        assert_eq!(p.provider(), ProviderType::SqlServer);
        Ok(())
    }
}
