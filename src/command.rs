use crate::types::{CommandKind, DbValue, ParameterDirection, ProviderType};

/// Opaque handle to a transaction opened on a backend connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionHandle(u64);

impl TransactionHandle {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn id(self) -> u64 {
        self.0
    }
}

/// A named value bound to a command.
///
/// Parameters are created by a [`BackendProvider`](crate::backend::BackendProvider)
/// so their naming stays backend-specific; the engine only moves them around.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    value: DbValue,
    direction: ParameterDirection,
    provider: ProviderType,
}

impl Parameter {
    /// Used by backend adapters. A `None` value becomes [`DbValue::Null`].
    pub fn new(
        provider: ProviderType,
        name: impl Into<String>,
        value: Option<DbValue>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.unwrap_or(DbValue::Null),
            direction: ParameterDirection::Input,
            provider,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> &DbValue {
        &self.value
    }

    pub fn set_value(&mut self, value: DbValue) {
        self.value = value;
    }

    #[must_use]
    pub fn direction(&self) -> ParameterDirection {
        self.direction
    }

    #[must_use]
    pub fn provider(&self) -> ProviderType {
        self.provider
    }

    /// True when the value is the backend null marker.
    #[must_use]
    pub fn is_db_null(&self) -> bool {
        self.value.is_null()
    }

    #[must_use]
    pub fn with_direction(mut self, direction: ParameterDirection) -> Self {
        self.direction = direction;
        self
    }

    #[must_use]
    pub fn into_output(self) -> Self {
        self.with_direction(ParameterDirection::Output)
    }

    #[must_use]
    pub fn into_input_output(self) -> Self {
        self.with_direction(ParameterDirection::InputOutput)
    }

    #[must_use]
    pub fn into_return_value(self) -> Self {
        self.with_direction(ParameterDirection::ReturnValue)
    }
}

/// Everything a backend needs to run one statement.
///
/// Built fresh for every call by the provider's configurator and dropped when
/// the call returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Command {
    text: String,
    kind: CommandKind,
    timeout: u32,
    transaction: Option<TransactionHandle>,
    parameters: Vec<Parameter>,
}

impl Command {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Command timeout in seconds, `0` for none.
    #[must_use]
    pub fn timeout(&self) -> u32 {
        self.timeout
    }

    #[must_use]
    pub fn transaction(&self) -> Option<TransactionHandle> {
        self.transaction
    }

    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Backends write output and return values here.
    pub fn parameters_mut(&mut self) -> &mut [Parameter] {
        &mut self.parameters
    }

    /// Values of the input-side parameters, in binding order.
    pub fn input_values(&self) -> impl Iterator<Item = &DbValue> {
        self.parameters
            .iter()
            .filter(|p| p.direction() != ParameterDirection::ReturnValue)
            .map(Parameter::value)
    }

    pub(crate) fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub(crate) fn set_kind(&mut self, kind: CommandKind) {
        self.kind = kind;
    }

    pub(crate) fn set_timeout(&mut self, seconds: u32) {
        self.timeout = seconds;
    }

    pub(crate) fn set_transaction(&mut self, transaction: TransactionHandle) {
        self.transaction = Some(transaction);
    }

    pub(crate) fn push_parameter(&mut self, parameter: Parameter) {
        self.parameters.push(parameter);
    }
}
