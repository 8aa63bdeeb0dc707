//! Core application framework functionality.

use crate::cli::Cli;
use crate::config::{ApplicationConfig, APPLICATION_CONFIG};
use crate::logging::install_tracing_logger;
use config::ConfigError;
use derive_more::Constructor;
use std::error::Error;
use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Error reading configuration: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Error installing tracing logger: {0}")]
    LoggerError(Box<dyn Error + Send + Sync>),
    #[error("Error writing output: {0}")]
    OutputError(#[from] std::io::Error),
}

/// Main entrypoint for the application. Configures supporting infrastructure and dispatches
/// command line arguments to the [Cli].
#[derive(Constructor)]
pub struct Application {
    cli: Cli,
    config: ApplicationConfig,
}

impl Application {
    /// Creates an application with config read from the environment. Usage error capture is
    /// enabled if configured.
    pub fn create_default(cli: Cli) -> Result<Self, ApplicationError> {
        let config = ApplicationConfig::init_from_environment()?;
        let cli = cli.with_usage_error_capture(config.capture_usage_errors);
        Ok(Self::new(cli, config))
    }

    #[inline]
    pub fn config(&self) -> &ApplicationConfig {
        &self.config
    }

    #[inline]
    pub fn cli(&mut self) -> &mut Cli {
        &mut self.cli
    }

    /// Runs the application with process arguments and standard streams. Installs the tracing
    /// logger first, if configured.
    pub fn run(&mut self) -> Result<ExitCode, ApplicationError> {
        if self.config.install_tracing_logger {
            install_tracing_logger(EnvFilter::from_default_env())
                .map_err(ApplicationError::LoggerError)?;
        }

        let code = self.run_with(
            std::env::args_os(),
            &mut std::io::stdout().lock(),
            &mut std::io::stderr().lock(),
        )?;

        Ok(ExitCode::from(u8::try_from(code).unwrap_or(u8::MAX)))
    }

    /// Runs the application with given arguments, returning the exit code. Command output goes to
    /// `output`, error messages to `error_output`.
    pub fn run_with<I, T>(
        &mut self,
        args: I,
        output: &mut dyn Write,
        error_output: &mut dyn Write,
    ) -> Result<i32, ApplicationError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        self.cli
            .resolver()
            .register_value(APPLICATION_CONFIG.name(), self.config.clone());

        info!("Running application...");

        match self.cli.run(args, output) {
            Ok(()) => Ok(0),
            Err(error) => {
                debug!(%error, "Application finished with error.");
                error.report(error_output)?;
                Ok(error.exit_code())
            }
        }
    }
}
