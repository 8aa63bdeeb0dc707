//! Framework configuration is represented by [ApplicationConfig], which
//! [Application](crate::application::Application) uses to configure itself. The config is also
//! registered as the [APPLICATION_CONFIG] resource, so producers and commands can depend on it.
//!
//! By default, the config is created with opinionated default values, which can then be overwritten
//! by environment variables prefixed with `STRAPP_` or `strapp.json` file.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use strapp_di::resource::ResourceKey;

const CONFIG_ENV_PREFIX: &str = "STRAPP";

/// Name of the default config file.
pub const CONFIG_FILE: &str = "strapp.json";

/// Resource under which the active [ApplicationConfig] is available.
pub const APPLICATION_CONFIG: ResourceKey<ApplicationConfig> =
    ResourceKey::new("application_config");

/// Framework configuration.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApplicationConfig {
    /// Should a default tracing logger be installed in the scope of the application.
    pub install_tracing_logger: bool,
    /// Should CLI usage errors be forwarded to the error reporter.
    pub capture_usage_errors: bool,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            install_tracing_logger: true,
            capture_usage_errors: false,
        }
    }
}

impl From<OptionalApplicationConfig> for ApplicationConfig {
    fn from(value: OptionalApplicationConfig) -> Self {
        let default = Self::default();
        Self {
            install_tracing_logger: value
                .install_tracing_logger
                .unwrap_or(default.install_tracing_logger),
            capture_usage_errors: value
                .capture_usage_errors
                .unwrap_or(default.capture_usage_errors),
        }
    }
}

impl ApplicationConfig {
    /// Reads the config from [CONFIG_FILE] and the environment.
    pub fn init_from_environment() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(CONFIG_ENV_PREFIX))
            .build()
            .and_then(Self::from_config)
    }

    /// Converts already loaded config, using defaults for missing keys.
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        config
            .try_deserialize::<OptionalApplicationConfig>()
            .map(|config| config.into())
    }
}

#[derive(Deserialize)]
struct OptionalApplicationConfig {
    install_tracing_logger: Option<bool>,
    capture_usage_errors: Option<bool>,
}

#[cfg(test)]
mod tests {
    use crate::config::ApplicationConfig;
    use config::Config;

    #[test]
    fn should_use_defaults_for_missing_keys() {
        let config = ApplicationConfig::from_config(Config::default()).unwrap();
        assert_eq!(config, ApplicationConfig::default());
    }

    #[test]
    fn should_override_defaults() {
        let config = Config::builder()
            .set_override("install_tracing_logger", false)
            .unwrap()
            .set_override("capture_usage_errors", "true")
            .unwrap()
            .build()
            .unwrap();

        let config = ApplicationConfig::from_config(config).unwrap();
        assert!(!config.install_tracing_logger);
        assert!(config.capture_usage_errors);
    }
}
