use crate::backend::{BackendProvider, Connection};
use crate::command::Parameter;
use crate::error::DriverError;
use crate::types::{DbValue, ProviderType};

/// OLE DB provider.
///
/// There is no OLE DB client for Rust, so this backend can build parameters
/// (positional, names kept as given) but every attempt to open a connection
/// fails with `DriverError::Unimplemented`. Route OLE DB sources through
/// their ODBC driver instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct OleDbProvider;

impl BackendProvider for OleDbProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::OleDb
    }

    fn open_connection(&self, _connection_string: &str) -> Result<Box<dyn Connection>, DriverError> {
        Err(DriverError::Unimplemented(
            "OLE DB connections are not supported; use the ODBC provider".to_string(),
        ))
    }

    fn create_parameter(&self, name: &str, value: Option<DbValue>) -> Result<Parameter, DriverError> {
        if name.trim().is_empty() {
            return Err(DriverError::ParameterError(
                "OLE DB parameter names cannot be empty".to_string(),
            ));
        }
        Ok(Parameter::new(ProviderType::OleDb, name, value))
    }
}
