use sql_provider::prelude::*;
use sql_provider::test_utils::FakeBackend;

const CS: &str = "Server=fake;Database=app";

fn params(provider: &DataProvider) -> Result<(Vec<Parameter>, Vec<Parameter>, Parameter), DataProviderError> {
    let inputs = provider.create_parameters([
        ("@A", Some(DbValue::Int(1))),
        ("@B", Some(DbValue::Text("b".into()))),
    ])?;
    let outputs = vec![provider.create_parameter("@C", None)?.into_output()];
    let ret = provider.create_parameter("@R", None)?.into_return_value();
    Ok((inputs, outputs, ret))
}

#[test]
fn parameters_are_ordered_in_out_return() -> Result<(), DataProviderError> {
    let backend = FakeBackend::new().with_non_query_count(1);
    let provider = DataProvider::new(backend.clone());
    let (inputs, mut outputs, mut ret) = params(&provider)?;

    provider.execute_non_query_procedure(CS, "dbo.usp_touch", &inputs, &mut outputs, Some(&mut ret))?;

    let command = backend.last_command().ok_or_else(|| DataProviderError::new("no command"))?;
    assert_eq!(command.kind(), CommandKind::StoredProcedure);
    assert_eq!(command.text(), "dbo.usp_touch");
    let names: Vec<&str> = command.parameters().iter().map(Parameter::name).collect();
    assert_eq!(names, ["@A", "@B", "@C", "@R"]);
    let directions: Vec<ParameterDirection> =
        command.parameters().iter().map(Parameter::direction).collect();
    assert_eq!(
        directions,
        [
            ParameterDirection::Input,
            ParameterDirection::Input,
            ParameterDirection::Output,
            ParameterDirection::ReturnValue,
        ]
    );
    Ok(())
}

#[test]
fn output_and_return_values_are_written_back() -> Result<(), DataProviderError> {
    let backend = FakeBackend::new()
        .with_outputs(vec![DbValue::Text("done".into()), DbValue::Int(0)]);
    let provider = DataProvider::new(backend);
    let (inputs, mut outputs, mut ret) = params(&provider)?;

    provider.execute_non_query_procedure(CS, "dbo.usp_touch", &inputs, &mut outputs, Some(&mut ret))?;

    assert_eq!(outputs[0].value(), &DbValue::Text("done".into()));
    assert_eq!(ret.value(), &DbValue::Int(0));
    assert_eq!(inputs[0].value(), &DbValue::Int(1));
    Ok(())
}

#[test]
fn unknown_count_with_outputs_still_writes_back() -> Result<(), DataProviderError> {
    let backend = FakeBackend::new()
        .with_non_query_count(-1)
        .with_outputs(vec![DbValue::Text("7".into()), DbValue::Int(0)]);
    let provider = DataProvider::new(backend);
    let (inputs, mut outputs, mut ret) = params(&provider)?;

    let affected =
        provider.execute_non_query_procedure(CS, "dbo.usp_touch", &inputs, &mut outputs, Some(&mut ret))?;

    assert_eq!(affected, -1);
    assert_eq!(outputs[0].value(), &DbValue::Text("7".into()));
    assert_eq!(ret.value(), &DbValue::Int(0));
    Ok(())
}

#[test]
fn procedure_table_set_and_scalar_share_the_contract() -> Result<(), DataProviderError> {
    let backend = FakeBackend::new()
        .with_result(&[("Id", "int")], vec![vec![DbValue::Int(5)]])
        .with_outputs(vec![DbValue::Int(11)]);
    let provider = DataProvider::new(backend.clone());
    let id = provider.create_parameter("@id", Some(DbValue::Int(5)))?;

    let mut outputs = vec![provider.create_parameter("@count", None)?.into_output()];
    let table = provider.execute_data_table_procedure(
        CS,
        "dbo.usp_find",
        std::slice::from_ref(&id),
        &mut outputs,
        None,
    )?;
    assert_eq!(table.row_count(), 1);
    assert_eq!(outputs[0].value(), &DbValue::Int(11));

    let mut outputs = vec![provider.create_parameter("@count", None)?.into_output()];
    let set = provider.execute_data_set_procedure(
        CS,
        "dbo.usp_find",
        std::slice::from_ref(&id),
        &mut outputs,
        None,
    )?;
    assert_eq!(set.len(), 1);
    assert_eq!(outputs[0].value(), &DbValue::Int(11));

    let mut ret = provider.create_parameter("@rc", None)?.into_return_value();
    let value = provider.execute_scalar_procedure(
        CS,
        "dbo.usp_find",
        std::slice::from_ref(&id),
        &mut [],
        Some(&mut ret),
    )?;
    assert_eq!(value, Some(DbValue::Int(5)));
    assert_eq!(ret.value(), &DbValue::Int(11));

    assert_eq!(backend.commands().len(), 3);
    assert_eq!(backend.opens(), 3);
    assert_eq!(backend.closes(), 3);
    Ok(())
}

#[test]
fn procedure_without_parameters() -> Result<(), DataProviderError> {
    let backend = FakeBackend::new();
    let provider = DataProvider::new(backend.clone());

    provider.execute_non_query_procedure(CS, "dbo.usp_nightly", &[], &mut [], None)?;

    let command = backend.last_command().ok_or_else(|| DataProviderError::new("no command"))?;
    assert!(command.parameters().is_empty());
    assert_eq!(command.kind(), CommandKind::StoredProcedure);
    Ok(())
}

#[test]
fn timeout_is_captured_per_call() -> Result<(), DataProviderError> {
    let backend = FakeBackend::new();
    let mut provider = DataProvider::new(backend.clone());

    provider.execute_non_query(CS, "UPDATE Users SET Seen = 1", &[])?;
    assert_eq!(backend.last_command().map(|c| c.timeout()), Some(30));

    provider.set_timeout(0);
    assert_eq!(provider.timeout(), 0);
    provider.execute_non_query(CS, "UPDATE Users SET Seen = 1", &[])?;
    assert_eq!(backend.last_command().map(|c| c.timeout()), Some(0));
    Ok(())
}

#[test]
fn input_output_parameter_keeps_its_role() -> Result<(), DataProviderError> {
    let backend = FakeBackend::new().with_outputs(vec![DbValue::Int(2)]);
    let provider = DataProvider::new(backend.clone());
    let mut counter = vec![provider
        .create_parameter("@counter", Some(DbValue::Int(1)))?
        .into_input_output()];

    provider.execute_non_query_procedure(CS, "dbo.usp_bump", &[], &mut counter, None)?;

    assert_eq!(counter[0].value(), &DbValue::Int(2));
    assert_eq!(counter[0].direction(), ParameterDirection::InputOutput);
    let command = backend.last_command().ok_or_else(|| DataProviderError::new("no command"))?;
    assert_eq!(command.parameters()[0].direction(), ParameterDirection::InputOutput);
    Ok(())
}
