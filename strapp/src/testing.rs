//! Helpers for testing CLI applications. [CliRunner] invokes a [Cli] in-process and captures
//! everything it writes, including error messages.
//!
//! ```
//! use clap::Command;
//! use strapp::cli::{Cli, CliError};
//! use strapp::testing::CliRunner;
//! use strapp_di::resolver::ResolverBuilder;
//! use strapp_di::resource::Signature;
//!
//! let mut cli = Cli::new(ResolverBuilder::new().build().unwrap());
//! let root = cli.group(None, Command::new("app"), Signature::empty(), |_| Ok(()));
//! cli.command(root, Command::new("abort"), Signature::empty(), |_| {
//!     Err(CliError::Abort.into())
//! });
//!
//! let result = CliRunner::new(&mut cli).invoke(["abort"]);
//! result.assert_unsuccessful();
//! assert_eq!(result.output, "Aborted!\n");
//! ```

use crate::cli::{Cli, DispatchError};
use std::ffi::OsString;
use std::iter::once;
use strapp_di::value::ResourceValue;
use tracing::warn;

/// Invokes a [Cli] with given arguments, as if run from the command line.
pub struct CliRunner<'c> {
    cli: &'c mut Cli,
}

impl<'c> CliRunner<'c> {
    #[inline]
    pub fn new(cli: &'c mut Cli) -> Self {
        Self { cli }
    }

    /// Replaces a resource with given value for subsequent invocations, until the resolver cache
    /// is reset.
    pub fn with_value<N: AsRef<str>, T: ResourceValue>(self, name: N, value: T) -> Self {
        self.cli.resolver().register_value(name, value);
        self
    }

    /// Runs the CLI with given arguments, excluding the program name.
    pub fn invoke<I, T>(&mut self, args: I) -> InvocationResult
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let program = OsString::from(self.cli.root_name().unwrap_or_default());
        let args = once(program).chain(args.into_iter().map(Into::<OsString>::into));

        let mut output = Vec::new();
        let error = self.cli.run(args, &mut output).err();

        if let Some(error) = &error {
            if let Err(write_error) = error.report(&mut output) {
                warn!(%write_error, "Cannot capture error message.");
            }
        }

        InvocationResult {
            exit_code: error.as_ref().map(DispatchError::exit_code).unwrap_or(0),
            output: String::from_utf8_lossy(&output).into_owned(),
            error,
        }
    }
}

/// Outcome of a [CliRunner] invocation.
#[derive(Debug)]
pub struct InvocationResult {
    pub exit_code: i32,
    /// Everything written by handlers, followed by the error message, if any.
    pub output: String,
    pub error: Option<DispatchError>,
}

impl InvocationResult {
    #[inline]
    pub fn is_successful(&self) -> bool {
        self.exit_code == 0
    }

    /// Asserts a zero exit code, logging the output otherwise.
    #[track_caller]
    pub fn assert_successful(&self) {
        if !self.is_successful() {
            warn!(output = %self.output, "Invocation failed.");
        }

        assert_eq!(self.exit_code, 0, "{}", self.output);
    }

    #[track_caller]
    pub fn assert_unsuccessful(&self) {
        assert_ne!(self.exit_code, 0, "{}", self.output);
    }
}
