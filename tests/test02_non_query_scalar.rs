use sql_provider::prelude::*;
use sql_provider::test_utils::FakeBackend;

const CS: &str = "Server=fake;Database=app";

#[test]
fn non_query_returns_affected_rows() -> Result<(), DataProviderError> {
    let backend = FakeBackend::new().with_non_query_count(3);
    let provider = DataProvider::new(backend.clone());
    let flag = provider.create_parameter("@active", Some(DbValue::Bool(false)))?;

    let affected =
        provider.execute_non_query(CS, "UPDATE Users SET Active = @P1 WHERE Id < 4", &[flag])?;

    assert_eq!(affected, 3);
    assert_eq!(backend.opens(), 1);
    assert_eq!(backend.closes(), 1);
    Ok(())
}

#[test]
fn negative_count_passes_through() -> Result<(), DataProviderError> {
    let provider = DataProvider::new(FakeBackend::new().with_non_query_count(-1));
    assert_eq!(provider.execute_non_query(CS, "SET NOCOUNT ON", &[])?, -1);
    Ok(())
}

#[test]
fn non_query_unchecked_substitutes() -> Result<(), DataProviderError> {
    let backend = FakeBackend::new().with_non_query_count(1);
    let provider = DataProvider::new(backend.clone());

    provider.execute_non_query_unchecked(
        CS,
        "DELETE FROM Users WHERE Id = {0}",
        &[DbValue::Int(9)],
    )?;
    let text = backend.last_command().map(|c| c.text().to_string());
    assert_eq!(text.as_deref(), Some("DELETE FROM Users WHERE Id = 9"));
    Ok(())
}

#[test]
fn scalar_returns_first_cell() -> Result<(), DataProviderError> {
    let backend = FakeBackend::new().with_result(
        &[("Total", "bigint"), ("Other", "int")],
        vec![
            vec![DbValue::Int(42), DbValue::Int(0)],
            vec![DbValue::Int(7), DbValue::Int(0)],
        ],
    );
    let provider = DataProvider::new(backend.clone());

    let value = provider.execute_scalar(CS, "SELECT COUNT(*), 0 FROM Users", &[])?;
    assert_eq!(value, Some(DbValue::Int(42)));
    assert_eq!(backend.readers_opened(), 1);
    assert_eq!(backend.readers_dropped(), 1);
    assert_eq!(backend.opens(), backend.closes());
    Ok(())
}

#[test]
fn scalar_without_rows_is_none() -> Result<(), DataProviderError> {
    let provider =
        DataProvider::new(FakeBackend::new().with_result(&[("Name", "nvarchar")], vec![]));
    assert_eq!(provider.execute_scalar(CS, "SELECT Name FROM Users WHERE 1 = 0", &[])?, None);
    Ok(())
}

#[test]
fn scalar_null_is_distinct_from_no_rows() -> Result<(), DataProviderError> {
    let provider = DataProvider::new(
        FakeBackend::new().with_result(&[("Name", "nvarchar")], vec![vec![DbValue::Null]]),
    );
    assert_eq!(
        provider.execute_scalar(CS, "SELECT MAX(Name) FROM Users", &[])?,
        Some(DbValue::Null)
    );
    Ok(())
}

#[test]
fn scalar_unchecked_substitutes() -> Result<(), DataProviderError> {
    let backend = FakeBackend::new().with_result(&[("n", "int")], vec![vec![DbValue::Int(1)]]);
    let provider = DataProvider::new(backend.clone());

    let value = provider.execute_scalar_unchecked(
        CS,
        "SELECT COUNT(*) FROM {0} WHERE Flag = {1}",
        &[DbValue::Text("Users".into()), DbValue::Bool(true)],
    )?;
    assert_eq!(value, Some(DbValue::Int(1)));
    let text = backend.last_command().map(|c| c.text().to_string());
    assert_eq!(text.as_deref(), Some("SELECT COUNT(*) FROM Users WHERE Flag = true"));
    Ok(())
}
