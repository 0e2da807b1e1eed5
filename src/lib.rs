//! Backend-agnostic data access for synchronous code.
//!
//! A [`DataProvider`] wraps one backend (SQL Server, ODBC, OLE DB) chosen once
//! through [`ProviderFactory`] or [`ProviderConfig`], and runs tabular,
//! multi-table, scalar and non-query commands against it. Every call opens its
//! own connection, closes it on every path, and reports any failure as a
//! single [`DataProviderError`].
//!
//! ```rust,no_run
//! use sql_provider::prelude::*;
//!
//! # fn main() -> Result<(), DataProviderError> {
//! let provider = ProviderFactory::get_instance();
//! let cs = "Server=tcp:localhost,1433;Database=app;User Id=sa;Password=...;TrustServerCertificate=true";
//! let id = provider.create_parameter("@id", Some(DbValue::Int(7)))?;
//! let users = provider.execute_data_table(cs, "SELECT Id, Name FROM Users WHERE Id = @P1", &[id])?;
//! for row in users.rows() {
//!     println!("{:?}", row.get("Name"));
//! }
//! # Ok(()) }
//! ```

pub mod backend;
pub mod command;
pub mod config;
pub mod error;
pub mod factory;
pub mod formatting;
pub mod mssql;
pub mod odbc;
pub mod oledb;
pub mod prelude;
pub mod provider;
pub mod results;
pub mod schema;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use command::{Command, Parameter, TransactionHandle};
pub use config::{ProviderConfig, ProviderConfigBuilder};
pub use error::{DataProviderError, DriverError};
pub use factory::ProviderFactory;
pub use provider::{DataProvider, TransactionScope};
pub use results::{DataColumn, DataRow, DataSet, DataTable};
pub use schema::TypeRegistry;
pub use types::{CommandKind, DataType, DbValue, ParameterDirection, ProviderType};
