//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::backend::{BackendProvider, Connection, DataAdapter, DataReader};
pub use crate::command::{Command, Parameter, TransactionHandle};
pub use crate::config::{ProviderConfig, ProviderConfigBuilder};
pub use crate::error::{DataProviderError, DriverError};
pub use crate::factory::ProviderFactory;
pub use crate::formatting::format_positional;
pub use crate::provider::{DataProvider, TransactionScope};
pub use crate::results::{DataColumn, DataRow, DataSet, DataTable};
pub use crate::schema::TypeRegistry;
pub use crate::types::{CommandKind, DataType, DbValue, ParameterDirection, ProviderType};
