use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tiberius::{Column, ColumnData, ColumnType, FromSql, Query};

use crate::command::Command;
use crate::error::DriverError;
use crate::schema::SchemaColumn;
use crate::types::{CommandKind, DbValue, ParameterDirection};

/// A tiberius query plus whether it ends with the output-parameter row.
pub(super) struct BoundCommand {
    pub query: Query<'static>,
    pub returns_outputs: bool,
}

/// Build a tiberius query for `command`, binding its input values in order.
pub(super) fn bind_command(command: &Command) -> BoundCommand {
    let (text, returns_outputs) = match command.kind() {
        CommandKind::Text => (command.text().to_string(), false),
        CommandKind::StoredProcedure => exec_statement(command),
    };

    let mut query = Query::new(text);
    for value in command.input_values() {
        bind_value(&mut query, value);
    }
    BoundCommand {
        query,
        returns_outputs,
    }
}

// tiberius has no RPC output binding, so a procedure call becomes a batch:
//
//   DECLARE @__ret int; DECLARE @__out1 sql_variant = @P2;
//   EXEC @__ret = name @a = @P1, @b = @__out1 OUTPUT;
//   SELECT CAST(@__out1 AS nvarchar(max)), @__ret;
//
// The trailing row carries output values in parameter order.
fn exec_statement(command: &Command) -> (String, bool) {
    let mut declares = String::new();
    let mut args = Vec::new();
    let mut outputs = Vec::new();
    let mut return_target = "";
    let mut position = 0;

    for (i, p) in command.parameters().iter().enumerate() {
        match p.direction() {
            ParameterDirection::Input => {
                position += 1;
                args.push(format!("{} = @P{position}", p.name()));
            }
            ParameterDirection::Output | ParameterDirection::InputOutput => {
                position += 1;
                declares.push_str(&format!("DECLARE @__out{i} sql_variant = @P{position}; "));
                args.push(format!("{} = @__out{i} OUTPUT", p.name()));
                outputs.push(format!("CAST(@__out{i} AS nvarchar(max))"));
            }
            ParameterDirection::ReturnValue => {
                declares.push_str("DECLARE @__ret int; ");
                return_target = "@__ret = ";
                outputs.push("@__ret".to_string());
            }
        }
    }

    let mut text = format!("{declares}EXEC {return_target}{}", command.text());
    if !args.is_empty() {
        text.push(' ');
        text.push_str(&args.join(", "));
    }
    if outputs.is_empty() {
        return (text, false);
    }
    text.push_str("; SELECT ");
    text.push_str(&outputs.join(", "));
    (text, true)
}

/// Store the trailing output row into the command's output and return parameters.
pub(super) fn apply_outputs(command: &mut Command, values: Vec<DbValue>) {
    let targets = command
        .parameters_mut()
        .iter_mut()
        .filter(|p| p.direction().is_output());
    for (param, value) in targets.zip(values) {
        param.set_value(value);
    }
}

fn bind_value(query: &mut Query<'static>, value: &DbValue) {
    match value {
        DbValue::Int(i) => query.bind(*i),
        DbValue::Float(f) => query.bind(*f),
        DbValue::Text(s) => query.bind(s.clone()),
        DbValue::Bool(b) => query.bind(*b),
        DbValue::Timestamp(dt) => {
            query.bind(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
        }
        DbValue::Null => query.bind(Option::<String>::None),
        DbValue::JSON(jsval) => query.bind(jsval.to_string()),
        DbValue::Blob(bytes) => query.bind(bytes.clone()),
    }
}

/// Describe a result column with the SQL Server type name the registry knows.
pub(super) fn schema_column(column: &Column) -> SchemaColumn {
    SchemaColumn::new(column.name(), type_name(column.column_type()))
}

fn type_name(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::Bit | ColumnType::Bitn => "bit",
        ColumnType::Int1 => "tinyint",
        ColumnType::Int2 => "smallint",
        ColumnType::Int4 | ColumnType::Intn => "int",
        ColumnType::Int8 => "bigint",
        ColumnType::Float4 => "real",
        ColumnType::Float8 | ColumnType::Floatn => "float",
        ColumnType::Money | ColumnType::Money4 => "money",
        ColumnType::Decimaln | ColumnType::Numericn => "decimal",
        ColumnType::Daten => "date",
        ColumnType::Timen => "time",
        ColumnType::Datetime | ColumnType::Datetime4 | ColumnType::Datetimen => "datetime",
        ColumnType::Datetime2 => "datetime2",
        ColumnType::DatetimeOffsetn => "datetimeoffset",
        ColumnType::Guid => "uniqueidentifier",
        ColumnType::BigVarChar | ColumnType::BigChar | ColumnType::Text => "varchar",
        ColumnType::NVarchar | ColumnType::NChar | ColumnType::NText => "nvarchar",
        ColumnType::Xml => "xml",
        ColumnType::BigVarBin | ColumnType::BigBinary | ColumnType::Image => "varbinary",
        // untyped NULL columns and UDTs carry whatever cell type the server sends
        ColumnType::Null | ColumnType::Udt | ColumnType::SSVariant => "sql_variant",
    }
}

/// Convert one cell into a `DbValue`.
pub(super) fn column_data_to_value(data: ColumnData<'static>) -> Result<DbValue, DriverError> {
    let value = match data {
        ColumnData::Bit(v) => v.map(DbValue::Bool),
        ColumnData::U8(v) => v.map(|v| DbValue::Int(i64::from(v))),
        ColumnData::I16(v) => v.map(|v| DbValue::Int(i64::from(v))),
        ColumnData::I32(v) => v.map(|v| DbValue::Int(i64::from(v))),
        ColumnData::I64(v) => v.map(DbValue::Int),
        ColumnData::F32(v) => v.map(|v| DbValue::Float(f64::from(v))),
        ColumnData::F64(v) => v.map(DbValue::Float),
        ColumnData::String(v) => v.map(|s| DbValue::Text(s.into_owned())),
        ColumnData::Guid(v) => v.map(|g| DbValue::Text(g.to_string())),
        ColumnData::Binary(v) => v.map(|b| DbValue::Blob(b.into_owned())),
        ColumnData::Xml(v) => v.map(|x| DbValue::Text(x.into_owned().into_string())),
        #[allow(clippy::cast_precision_loss)]
        ColumnData::Numeric(v) => v.map(|n| {
            DbValue::Float(n.value() as f64 / 10f64.powi(i32::from(n.scale())))
        }),
        ref temporal @ (ColumnData::DateTime(_)
        | ColumnData::SmallDateTime(_)
        | ColumnData::DateTime2(_)) => {
            NaiveDateTime::from_sql(temporal)?.map(DbValue::Timestamp)
        }
        ref date @ ColumnData::Date(_) => NaiveDate::from_sql(date)?
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(DbValue::Timestamp),
        ref time @ ColumnData::Time(_) => {
            NaiveTime::from_sql(time)?.map(|t| DbValue::Text(t.format("%H:%M:%S%.f").to_string()))
        }
        ref offset @ ColumnData::DateTimeOffset(_) => {
            DateTime::<Utc>::from_sql(offset)?.map(|dt| DbValue::Timestamp(dt.naive_utc()))
        }
    };
    Ok(value.unwrap_or(DbValue::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Parameter;
    use crate::schema::TypeRegistry;
    use crate::types::{DataType, ProviderType};

    fn param(name: &str, value: Option<DbValue>) -> Parameter {
        Parameter::new(ProviderType::SqlServer, name, value)
    }

    fn procedure(params: Vec<Parameter>) -> Command {
        let mut command = Command::new();
        command.set_kind(CommandKind::StoredProcedure);
        command.set_text("dbo.usp_orders");
        for p in params {
            command.push_parameter(p);
        }
        command
    }

    #[test]
    fn procedure_without_outputs_is_a_plain_exec() {
        let command = procedure(vec![
            param("@id", Some(DbValue::Int(1))),
            param("@name", Some(DbValue::Text("x".into()))),
        ]);
        let (text, outputs) = exec_statement(&command);
        assert_eq!(text, "EXEC dbo.usp_orders @id = @P1, @name = @P2");
        assert!(!outputs);
    }

    #[test]
    fn outputs_and_return_are_selected_after_exec() {
        let command = procedure(vec![
            param("@id", Some(DbValue::Int(1))),
            param("@total", None).into_output(),
            param("@rc", None).into_return_value(),
        ]);
        let (text, outputs) = exec_statement(&command);
        assert!(outputs);
        assert_eq!(
            text,
            "DECLARE @__out1 sql_variant = @P2; DECLARE @__ret int; \
             EXEC @__ret = dbo.usp_orders @id = @P1, @total = @__out1 OUTPUT; \
             SELECT CAST(@__out1 AS nvarchar(max)), @__ret"
        );
    }

    #[test]
    fn output_row_lands_in_parameter_order() {
        let mut command = procedure(vec![
            param("@id", Some(DbValue::Int(1))),
            param("@total", None).into_output(),
            param("@rc", None).into_return_value(),
        ]);
        apply_outputs(
            &mut command,
            vec![DbValue::Text("12.50".into()), DbValue::Int(0)],
        );
        let values: Vec<&DbValue> = command.parameters().iter().map(Parameter::value).collect();
        assert_eq!(
            values,
            [&DbValue::Int(1), &DbValue::Text("12.50".into()), &DbValue::Int(0)]
        );
    }

    #[test]
    fn text_commands_pass_through() {
        let mut command = Command::new();
        command.set_text("SELECT 1");
        let bound = bind_command(&command);
        assert!(!bound.returns_outputs);
    }

    #[test]
    fn every_column_type_resolves_in_the_default_registry() {
        let all = [
            ColumnType::Null,
            ColumnType::Bit,
            ColumnType::Int1,
            ColumnType::Int2,
            ColumnType::Int4,
            ColumnType::Int8,
            ColumnType::Datetime4,
            ColumnType::Float4,
            ColumnType::Float8,
            ColumnType::Money,
            ColumnType::Datetime,
            ColumnType::Money4,
            ColumnType::Guid,
            ColumnType::Intn,
            ColumnType::Bitn,
            ColumnType::Decimaln,
            ColumnType::Numericn,
            ColumnType::Floatn,
            ColumnType::Datetimen,
            ColumnType::Daten,
            ColumnType::Timen,
            ColumnType::Datetime2,
            ColumnType::DatetimeOffsetn,
            ColumnType::BigVarBin,
            ColumnType::BigVarChar,
            ColumnType::BigBinary,
            ColumnType::BigChar,
            ColumnType::NVarchar,
            ColumnType::NChar,
            ColumnType::Xml,
            ColumnType::Udt,
            ColumnType::Text,
            ColumnType::Image,
            ColumnType::NText,
            ColumnType::SSVariant,
        ];
        let registry = TypeRegistry::default();
        for column_type in all {
            let name = type_name(column_type);
            assert!(registry.resolve(name).is_ok(), "{column_type:?} maps to unregistered `{name}`");
        }
        assert_eq!(registry.resolve(type_name(ColumnType::Null)).ok(), Some(DataType::Variant));
    }
}
