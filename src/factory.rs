use crate::backend::BackendProvider;
use crate::mssql::SqlServerProvider;
use crate::odbc::OdbcProvider;
use crate::oledb::OleDbProvider;
use crate::provider::DataProvider;
use crate::types::ProviderType;

/// Picks the backend for a [`DataProvider`] once, at construction time.
///
/// Selection never touches the network and never fails; a backend that is
/// compiled out reports that when a connection is first opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderFactory;

impl ProviderFactory {
    /// A provider for the default backend, SQL Server.
    #[must_use]
    pub fn get_instance() -> DataProvider {
        Self::get_instance_of(ProviderType::default())
    }

    #[must_use]
    pub fn get_instance_of(provider: ProviderType) -> DataProvider {
        DataProvider::from_boxed(backend_for(provider))
    }
}

fn backend_for(provider: ProviderType) -> Box<dyn BackendProvider> {
    match provider {
        ProviderType::SqlServer => Box::new(SqlServerProvider),
        ProviderType::Odbc => Box::new(OdbcProvider),
        ProviderType::OleDb => Box::new(OleDbProvider),
    }
}

impl From<ProviderType> for DataProvider {
    fn from(provider: ProviderType) -> Self {
        ProviderFactory::get_instance_of(provider)
    }
}
