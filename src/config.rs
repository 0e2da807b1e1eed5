use serde::{Deserialize, Serialize};

use crate::error::DriverError;
use crate::factory::ProviderFactory;
use crate::provider::{DEFAULT_TIMEOUT_SECS, DataProvider};
use crate::types::ProviderType;

/// Application-level provider settings, usually read from a config file.
///
/// ```json
/// { "provider": "odbc", "connection_string": "DSN=reporting", "timeout_secs": 60 }
/// ```
///
/// Missing fields fall back to SQL Server and a 30 second timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub provider: ProviderType,
    #[serde(default)]
    pub connection_string: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u32,
}

fn default_timeout_secs() -> u32 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: ProviderType::default(),
            connection_string: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ProviderConfig {
    #[must_use]
    pub fn builder() -> ProviderConfigBuilder {
        ProviderConfigBuilder::new()
    }

    /// Parse settings from JSON.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::ConfigError` if the text is not a valid config object.
    pub fn from_json_str(json: &str) -> Result<Self, DriverError> {
        serde_json::from_str(json)
            .map_err(|e| DriverError::ConfigError(format!("invalid provider config: {e}")))
    }

    /// Build the provider these settings describe, with the timeout applied.
    #[must_use]
    pub fn build(&self) -> DataProvider {
        let mut provider = ProviderFactory::get_instance_of(self.provider);
        provider.set_timeout(self.timeout_secs);
        provider
    }
}

/// Fluent builder for [`ProviderConfig`].
#[derive(Debug, Clone, Default)]
pub struct ProviderConfigBuilder {
    config: ProviderConfig,
}

impl ProviderConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn provider(mut self, provider: ProviderType) -> Self {
        self.config.provider = provider;
        self
    }

    #[must_use]
    pub fn connection_string(mut self, connection_string: impl Into<String>) -> Self {
        self.config.connection_string = connection_string.into();
        self
    }

    #[must_use]
    pub fn timeout_secs(mut self, timeout_secs: u32) -> Self {
        self.config.timeout_secs = timeout_secs;
        self
    }

    #[must_use]
    pub fn finish(self) -> ProviderConfig {
        self.config
    }

    /// Shortcut for `finish().build()`.
    #[must_use]
    pub fn build(self) -> DataProvider {
        self.finish().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() -> Result<(), DriverError> {
        let config = ProviderConfig::from_json_str("{}")?;
        assert_eq!(config, ProviderConfig::default());
        assert_eq!(config.provider, ProviderType::SqlServer);
        assert_eq!(config.timeout_secs, 30);
        Ok(())
    }

    #[test]
    fn reads_provider_and_timeout() -> Result<(), DriverError> {
        let config = ProviderConfig::from_json_str(
            r#"{ "provider": "ole_db", "connection_string": "Provider=SQLOLEDB", "timeout_secs": 0 }"#,
        )?;
        assert_eq!(config.provider, ProviderType::OleDb);
        assert_eq!(config.connection_string, "Provider=SQLOLEDB");

        let provider = config.build();
        assert_eq!(provider.provider_type(), ProviderType::OleDb);
        assert_eq!(provider.timeout(), 0);
        Ok(())
    }

    #[test]
    fn rejects_unknown_provider() {
        assert!(matches!(
            ProviderConfig::from_json_str(r#"{ "provider": "oracle" }"#),
            Err(DriverError::ConfigError(_))
        ));
    }

    #[test]
    fn builder_sets_every_field() {
        let config = ProviderConfig::builder()
            .provider(ProviderType::Odbc)
            .connection_string("DSN=reporting")
            .timeout_secs(90)
            .finish();
        assert_eq!(
            config,
            ProviderConfig {
                provider: ProviderType::Odbc,
                connection_string: "DSN=reporting".to_string(),
                timeout_secs: 90,
            }
        );
        assert_eq!(ProviderConfig::builder().timeout_secs(5).build().timeout(), 5);
    }
}
