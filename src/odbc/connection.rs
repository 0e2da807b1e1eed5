use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};
use odbc_api::parameter::InputParameter;
use odbc_api::{
    Bit, ConnectionOptions, Cursor, CursorRow, DataType as OdbcType, Environment, IntoParameter,
};

use crate::backend::{BufferedReader, BufferedResult, Connection, DataReader};
use crate::command::{Command, TransactionHandle};
use crate::error::DriverError;
use crate::schema::SchemaColumn;
use crate::types::{CommandKind, DbValue};

static ENVIRONMENT: OnceLock<Environment> = OnceLock::new();

// One driver-manager environment per process; connections borrow it.
fn environment() -> Result<&'static Environment, DriverError> {
    if let Some(env) = ENVIRONMENT.get() {
        return Ok(env);
    }
    let env = Environment::new()?;
    Ok(ENVIRONMENT.get_or_init(|| env))
}

/// A connection through the ODBC driver manager.
///
/// Every result set of a statement is fetched before the reader is handed back.
pub struct OdbcConnection {
    connection_string: String,
    connection: Option<odbc_api::Connection<'static>>,
    next_transaction: u64,
}

impl std::fmt::Debug for OdbcConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OdbcConnection")
            .field("open", &self.connection.is_some())
            .finish_non_exhaustive()
    }
}

impl OdbcConnection {
    /// # Errors
    ///
    /// Returns `DriverError::ConfigError` for an empty connection string.
    pub fn new(connection_string: &str) -> Result<Self, DriverError> {
        if connection_string.trim().is_empty() {
            return Err(DriverError::ConfigError(
                "ODBC connection string cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            connection_string: connection_string.to_string(),
            connection: None,
            next_transaction: 0,
        })
    }

    fn connection(&self) -> Result<&odbc_api::Connection<'static>, DriverError> {
        self.connection.as_ref().ok_or(DriverError::ConnectionClosed)
    }
}

impl Connection for OdbcConnection {
    #[tracing::instrument(skip(self))]
    fn open(&mut self) -> Result<(), DriverError> {
        let connection = environment()?
            .connect_with_connection_string(&self.connection_string, ConnectionOptions::default())?;
        tracing::debug!("ODBC connection established");
        self.connection = Some(connection);
        Ok(())
    }

    fn close(&mut self) -> Result<(), DriverError> {
        if self.connection.take().is_some() {
            tracing::debug!("ODBC connection closed");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    fn execute_reader<'a>(
        &'a mut self,
        command: &'a mut Command,
    ) -> Result<Box<dyn DataReader + 'a>, DriverError> {
        let text = statement_text(command)?;
        let params = bind_parameters(command);
        let first = self
            .connection()?
            .execute(&text, params.as_slice(), query_timeout(command))?;
        let results = collect_results(first, |cursor| read_result(cursor), |cursor| {
            Ok(cursor.more_results()?)
        })?;
        Ok(Box::new(BufferedReader::new(results)))
    }

    fn execute_non_query(&mut self, command: &mut Command) -> Result<i64, DriverError> {
        let text = statement_text(command)?;
        let params = bind_parameters(command);
        let mut statement = self.connection()?.preallocate()?;
        if let Some(seconds) = query_timeout(command) {
            statement.set_query_timeout_sec(seconds)?;
        }
        statement.execute(&text, params.as_slice())?;
        match statement.row_count()? {
            Some(count) => i64::try_from(count).map_err(|e| {
                DriverError::ExecutionError(format!("invalid rows affected count: {e}"))
            }),
            None => Ok(-1),
        }
    }

    fn begin_transaction(&mut self) -> Result<TransactionHandle, DriverError> {
        self.connection()?.set_autocommit(false)?;
        self.next_transaction += 1;
        Ok(TransactionHandle::new(self.next_transaction))
    }

    fn commit(&mut self, _transaction: TransactionHandle) -> Result<(), DriverError> {
        let connection = self.connection()?;
        connection.commit()?;
        connection.set_autocommit(true)?;
        Ok(())
    }

    fn rollback(&mut self, _transaction: TransactionHandle) -> Result<(), DriverError> {
        let connection = self.connection()?;
        connection.rollback()?;
        connection.set_autocommit(true)?;
        Ok(())
    }
}

fn query_timeout(command: &Command) -> Option<usize> {
    match command.timeout() {
        0 => None,
        seconds => usize::try_from(seconds).ok(),
    }
}

// Procedures go through the ODBC call escape: `{call name(?, ?)}`.
fn statement_text(command: &Command) -> Result<String, DriverError> {
    match command.kind() {
        CommandKind::Text => Ok(command.text().to_string()),
        CommandKind::StoredProcedure => {
            if let Some(p) = command.parameters().iter().find(|p| p.direction().is_output()) {
                return Err(DriverError::Unimplemented(format!(
                    "ODBC output and return parameters are not supported (`{}`)",
                    p.name()
                )));
            }
            let marks = vec!["?"; command.parameters().len()].join(", ");
            Ok(format!("{{call {}({marks})}}", command.text()))
        }
    }
}

fn bind_parameters(command: &Command) -> Vec<Box<dyn InputParameter>> {
    command.input_values().map(to_parameter).collect()
}

fn to_parameter(value: &DbValue) -> Box<dyn InputParameter> {
    match value {
        DbValue::Int(i) => Box::new(*i),
        DbValue::Float(f) => Box::new(*f),
        DbValue::Bool(b) => Box::new(Bit::from_bool(*b)),
        DbValue::Text(s) => Box::new(s.clone().into_parameter()),
        DbValue::Timestamp(dt) => Box::new(
            dt.format("%Y-%m-%d %H:%M:%S%.f")
                .to_string()
                .into_parameter(),
        ),
        DbValue::JSON(jsval) => Box::new(jsval.to_string().into_parameter()),
        DbValue::Blob(bytes) => Box::new(bytes.clone().into_parameter()),
        DbValue::Null => Box::new(Option::<String>::None.into_parameter()),
    }
}

fn type_name(data_type: OdbcType) -> &'static str {
    match data_type {
        OdbcType::Integer => "int",
        OdbcType::SmallInt => "smallint",
        OdbcType::TinyInt => "tinyint",
        OdbcType::BigInt => "bigint",
        OdbcType::Bit => "bit",
        OdbcType::Real => "real",
        OdbcType::Float { .. } => "float",
        OdbcType::Double => "double",
        OdbcType::Numeric { .. } => "numeric",
        OdbcType::Decimal { .. } => "decimal",
        OdbcType::Char { .. } => "char",
        OdbcType::WChar { .. } => "nchar",
        OdbcType::Varchar { .. } => "varchar",
        OdbcType::WVarchar { .. } => "nvarchar",
        OdbcType::LongVarchar { .. } => "text",
        OdbcType::WLongVarchar { .. } => "ntext",
        OdbcType::Date => "date",
        OdbcType::Time { .. } => "time",
        OdbcType::Timestamp { .. } => "timestamp",
        OdbcType::Binary { .. } => "binary",
        OdbcType::Varbinary { .. } | OdbcType::LongVarbinary { .. } => "varbinary",
        // unknown and driver-specific types are fetched as text
        _ => "varchar",
    }
}

fn is_binary(data_type: OdbcType) -> bool {
    matches!(
        data_type,
        OdbcType::Binary { .. } | OdbcType::Varbinary { .. } | OdbcType::LongVarbinary { .. }
    )
}

// Drain a statement's cursors in order; `advance` yields the next result, if any.
fn collect_results<C>(
    first: Option<C>,
    mut read: impl FnMut(&mut C) -> Result<BufferedResult, DriverError>,
    mut advance: impl FnMut(C) -> Result<Option<C>, DriverError>,
) -> Result<Vec<BufferedResult>, DriverError> {
    let mut results = Vec::new();
    let mut next = first;
    while let Some(mut cursor) = next {
        results.push(read(&mut cursor)?);
        next = advance(cursor)?;
    }
    Ok(results)
}

fn read_result(cursor: &mut impl Cursor) -> Result<BufferedResult, DriverError> {
    let count = u16::try_from(cursor.num_result_cols()?)
        .map_err(|e| DriverError::ExecutionError(format!("invalid column count: {e}")))?;

    let mut columns = Vec::with_capacity(usize::from(count));
    let mut kinds = Vec::with_capacity(usize::from(count));
    for col in 1..=count {
        let data_type = cursor.col_data_type(col)?;
        columns.push(SchemaColumn::new(cursor.col_name(col)?, type_name(data_type)));
        kinds.push(data_type);
    }

    let mut rows = Vec::new();
    let mut buf = Vec::new();
    while let Some(mut row) = cursor.next_row()? {
        let mut values = Vec::with_capacity(kinds.len());
        for (col, kind) in (1..=count).zip(&kinds) {
            values.push(read_cell(&mut row, col, *kind, &mut buf)?);
        }
        rows.push(values);
    }
    Ok(BufferedResult::new(columns, rows))
}

// Cells are fetched as text (or bytes) and parsed by the column's ODBC type.
fn read_cell(
    row: &mut CursorRow<'_>,
    col: u16,
    kind: OdbcType,
    buf: &mut Vec<u8>,
) -> Result<DbValue, DriverError> {
    buf.clear();
    if is_binary(kind) {
        return Ok(if row.get_binary(col, buf)? {
            DbValue::Blob(buf.clone())
        } else {
            DbValue::Null
        });
    }
    if !row.get_text(col, buf)? {
        return Ok(DbValue::Null);
    }

    let text = String::from_utf8_lossy(buf);
    parse_cell(col, kind, &text)
}

fn parse_cell(col: u16, kind: OdbcType, text: &str) -> Result<DbValue, DriverError> {
    let bad = |e: &dyn std::fmt::Display| {
        DriverError::ExecutionError(format!("column {col}: cannot parse `{text}`: {e}"))
    };
    let trimmed = text.trim();
    match kind {
        OdbcType::Integer | OdbcType::SmallInt | OdbcType::TinyInt | OdbcType::BigInt => trimmed
            .parse::<i64>()
            .map(DbValue::Int)
            .map_err(|e| bad(&e)),
        OdbcType::Real
        | OdbcType::Float { .. }
        | OdbcType::Double
        | OdbcType::Numeric { .. }
        | OdbcType::Decimal { .. } => trimmed
            .parse::<f64>()
            .map(DbValue::Float)
            .map_err(|e| bad(&e)),
        OdbcType::Bit => Ok(DbValue::Bool(trimmed == "1")),
        OdbcType::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .map_err(|e| bad(&e))?
            .and_hms_opt(0, 0, 0)
            .map(DbValue::Timestamp)
            .ok_or_else(|| bad(&"midnight out of range")),
        OdbcType::Timestamp { .. } => NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f")
            .map(DbValue::Timestamp)
            .map_err(|e| bad(&e)),
        _ => Ok(DbValue::Text(text.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Parameter;
    use crate::schema::TypeRegistry;
    use crate::types::ProviderType;

    #[test]
    fn procedures_use_call_escape() -> Result<(), DriverError> {
        let mut command = Command::new();
        command.set_kind(CommandKind::StoredProcedure);
        command.set_text("usp_orders");
        command.push_parameter(Parameter::new(ProviderType::Odbc, "a", Some(DbValue::Int(1))));
        command.push_parameter(Parameter::new(ProviderType::Odbc, "b", None));
        assert_eq!(statement_text(&command)?, "{call usp_orders(?, ?)}");

        command.push_parameter(Parameter::new(ProviderType::Odbc, "r", None).into_return_value());
        assert!(matches!(
            statement_text(&command),
            Err(DriverError::Unimplemented(_))
        ));
        Ok(())
    }

    #[test]
    fn zero_timeout_is_no_timeout() {
        let mut command = Command::new();
        command.set_timeout(0);
        assert_eq!(query_timeout(&command), None);
        command.set_timeout(15);
        assert_eq!(query_timeout(&command), Some(15));
    }

    #[test]
    fn cells_parse_by_column_type() -> Result<(), DriverError> {
        assert_eq!(parse_cell(1, OdbcType::Integer, " 42")?, DbValue::Int(42));
        assert_eq!(parse_cell(1, OdbcType::Bit, "1")?, DbValue::Bool(true));
        assert_eq!(parse_cell(1, OdbcType::Double, "2.5")?, DbValue::Float(2.5));
        assert!(matches!(
            parse_cell(1, OdbcType::Date, "2024-02-29")?,
            DbValue::Timestamp(_)
        ));
        assert!(parse_cell(1, OdbcType::Integer, "forty").is_err());
        Ok(())
    }

    #[test]
    fn reported_types_resolve_in_the_default_registry() {
        let registry = TypeRegistry::default();
        for kind in [
            OdbcType::Unknown,
            OdbcType::Integer,
            OdbcType::SmallInt,
            OdbcType::TinyInt,
            OdbcType::BigInt,
            OdbcType::Bit,
            OdbcType::Real,
            OdbcType::Double,
            OdbcType::Date,
            OdbcType::WLongVarchar { length: None },
            OdbcType::Varchar { length: None },
        ] {
            let name = type_name(kind);
            assert!(registry.resolve(name).is_ok(), "{kind:?} maps to unregistered `{name}`");
        }
        assert_eq!(type_name(OdbcType::WLongVarchar { length: None }), "ntext");
    }

    #[test]
    fn every_result_of_a_statement_is_collected() -> Result<(), DriverError> {
        let results = collect_results(
            Some(0_usize),
            |n| {
                Ok(BufferedResult::new(
                    vec![SchemaColumn::new(format!("c{n}"), "int")],
                    vec![vec![DbValue::Int(i64::try_from(*n).unwrap_or_default())]],
                ))
            },
            |n| Ok((n < 2).then_some(n + 1)),
        )?;
        let names: Vec<&str> = results.iter().map(|r| r.columns[0].name.as_str()).collect();
        assert_eq!(names, ["c0", "c1", "c2"]);

        let none = collect_results(None::<usize>, |_| Ok(BufferedResult::default()), |_| Ok(None))?;
        assert!(none.is_empty());
        Ok(())
    }

    #[test]
    fn empty_connection_string_is_rejected() {
        assert!(matches!(
            OdbcConnection::new(" "),
            Err(DriverError::ConfigError(_))
        ));
    }
}
