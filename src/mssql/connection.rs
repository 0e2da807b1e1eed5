use std::future::Future;
use std::time::Duration;

use futures_util::TryStreamExt;
use tiberius::{Client, Config, QueryItem, SqlBrowser};
use tokio::net::TcpStream;
use tokio::runtime::{Builder, Runtime};
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use super::query::{BoundCommand, apply_outputs, bind_command, column_data_to_value, schema_column};
use crate::backend::{BufferedReader, BufferedResult, Connection, DataReader};
use crate::command::{Command, TransactionHandle};
use crate::error::DriverError;

type SqlServerClient = Client<Compat<TcpStream>>;

/// A tiberius session driven from synchronous code.
///
/// The connection owns a current-thread tokio runtime for as long as it is
/// open and blocks on it for every round trip, so it must not be used from
/// inside another async runtime.
pub struct SqlServerConnection {
    config: Config,
    session: Option<Session>,
    next_transaction: u64,
}

struct Session {
    runtime: Runtime,
    client: SqlServerClient,
}

impl Session {
    fn run<'s, T, F>(
        &'s mut self,
        timeout: u32,
        call: impl FnOnce(&'s mut SqlServerClient) -> F,
    ) -> Result<T, DriverError>
    where
        F: Future<Output = Result<T, DriverError>> + 's,
    {
        let Session { runtime, client } = self;
        let fut = call(client);
        if timeout == 0 {
            return runtime.block_on(fut);
        }
        runtime.block_on(async {
            tokio::time::timeout(Duration::from_secs(u64::from(timeout)), fut)
                .await
                .map_err(|_| {
                    DriverError::ExecutionError(format!("command timed out after {timeout}s"))
                })?
        })
    }
}

impl std::fmt::Debug for SqlServerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlServerConnection")
            .field("addr", &self.config.get_addr())
            .field("open", &self.session.is_some())
            .finish()
    }
}

impl SqlServerConnection {
    /// Parse an ADO.NET connection string. Nothing is contacted until [`Connection::open`].
    ///
    /// # Errors
    ///
    /// Returns `DriverError::ConfigError` if the connection string cannot be parsed.
    pub fn new(connection_string: &str) -> Result<Self, DriverError> {
        let config = Config::from_ado_string(connection_string)
            .map_err(|e| DriverError::ConfigError(format!("invalid SQL Server connection string: {e}")))?;
        Ok(Self {
            config,
            session: None,
            next_transaction: 0,
        })
    }

    fn session(&mut self) -> Result<&mut Session, DriverError> {
        self.session.as_mut().ok_or(DriverError::ConnectionClosed)
    }
}

impl Connection for SqlServerConnection {
    #[tracing::instrument(skip(self), fields(addr = %self.config.get_addr()))]
    fn open(&mut self) -> Result<(), DriverError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(DriverError::ConnectionError(
                "SQL Server connections block and cannot be opened inside an async runtime"
                    .to_string(),
            ));
        }

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DriverError::ConnectionError(format!("failed to create runtime: {e}")))?;

        let config = self.config.clone();
        let client = runtime.block_on(async move {
            let tcp = TcpStream::connect_named(&config).await?;
            tcp.set_nodelay(true)?;
            Client::connect(config, tcp.compat_write()).await
        })?;

        tracing::debug!("SQL Server connection established");
        self.session = Some(Session { runtime, client });
        Ok(())
    }

    fn close(&mut self) -> Result<(), DriverError> {
        if let Some(Session { runtime, client }) = self.session.take() {
            runtime.block_on(client.close())?;
            tracing::debug!("SQL Server connection closed");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.session.is_some()
    }

    fn execute_reader<'a>(
        &'a mut self,
        command: &'a mut Command,
    ) -> Result<Box<dyn DataReader + 'a>, DriverError> {
        let BoundCommand {
            query,
            returns_outputs,
        } = bind_command(command);
        let mut results = self.session()?.run(command.timeout(), |client| async move {
            let mut stream = query.query(client).await?;
            let mut results: Vec<BufferedResult> = Vec::new();
            while let Some(item) = stream.try_next().await? {
                match item {
                    QueryItem::Metadata(meta) => {
                        let columns = meta.columns().iter().map(schema_column).collect();
                        results.push(BufferedResult::new(columns, Vec::new()));
                    }
                    QueryItem::Row(row) => {
                        let values = row
                            .into_iter()
                            .map(column_data_to_value)
                            .collect::<Result<Vec<_>, _>>()?;
                        if let Some(current) = results.last_mut() {
                            current.rows.push(values);
                        }
                    }
                }
            }
            Ok::<_, DriverError>(results)
        })?;

        if returns_outputs && let Some(outputs) = results.pop() {
            apply_outputs(command, outputs.rows.into_iter().next().unwrap_or_default());
        }
        Ok(Box::new(BufferedReader::new(results)))
    }

    fn execute_non_query(&mut self, command: &mut Command) -> Result<i64, DriverError> {
        let BoundCommand {
            query,
            returns_outputs,
        } = bind_command(command);

        if returns_outputs {
            // the output row rides in the result stream, which carries no row counts
            drop(self.execute_reader(command)?);
            return Ok(-1);
        }

        let affected = self.session()?.run(command.timeout(), |client| async move {
            let result = query.execute(client).await?;
            Ok::<u64, DriverError>(result.rows_affected().iter().sum())
        })?;
        i64::try_from(affected)
            .map_err(|e| DriverError::ExecutionError(format!("invalid rows affected count: {e}")))
    }

    fn begin_transaction(&mut self) -> Result<TransactionHandle, DriverError> {
        self.session()?.run(0, |client| async move {
            client.simple_query("BEGIN TRANSACTION").await?.into_results().await?;
            Ok::<_, DriverError>(())
        })?;
        self.next_transaction += 1;
        Ok(TransactionHandle::new(self.next_transaction))
    }

    fn commit(&mut self, _transaction: TransactionHandle) -> Result<(), DriverError> {
        self.session()?.run(0, |client| async move {
            client.simple_query("COMMIT TRANSACTION").await?.into_results().await?;
            Ok::<_, DriverError>(())
        })
    }

    fn rollback(&mut self, _transaction: TransactionHandle) -> Result<(), DriverError> {
        self.session()?.run(0, |client| async move {
            client.simple_query("ROLLBACK TRANSACTION").await?.into_results().await?;
            Ok::<_, DriverError>(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ado_string_without_connecting() {
        let conn = SqlServerConnection::new(
            "Server=tcp:localhost,1433;Database=app;User Id=sa;Password=pw;TrustServerCertificate=true",
        );
        assert!(conn.is_ok_and(|c| !c.is_open()));
    }

    #[test]
    fn closed_connection_refuses_commands() {
        let Ok(mut conn) = SqlServerConnection::new("Server=tcp:localhost,1433") else {
            panic!("connection string should parse");
        };
        let mut command = Command::new();
        assert!(matches!(
            conn.execute_non_query(&mut command),
            Err(DriverError::ConnectionClosed)
        ));
        assert!(conn.close().is_ok());
    }
}
