//! Unexpected command failures are forwarded to an [ErrorReporter], which is the integration point
//! for external error tracking services. [Cli](crate::cli::Cli) uses a [NoopErrorReporter] unless
//! told otherwise.

use itertools::Itertools;
#[cfg(test)]
use mockall::automock;
use std::error::Error;
use std::fmt::{Display, Formatter};
use strapp_di::value::MaybeSendSync;

pub type ErrorReporterPtr = Box<dyn ErrorReporter>;

/// Identifier assigned to a captured error by the reporting service.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct EventId(pub String);

impl Display for EventId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot of an error and its whole `source()` chain.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ErrorEvent {
    pub message: String,
    pub causes: Vec<String>,
}

impl ErrorEvent {
    pub fn from_error(error: &(dyn Error + 'static)) -> Self {
        let mut causes = vec![];
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        Self {
            message: error.to_string(),
            causes,
        }
    }

    /// Multiline report with the message followed by numbered causes.
    pub fn report(&self) -> String {
        if self.causes.is_empty() {
            return self.message.clone();
        }

        format!(
            "{}\n\nCaused by:\n{}",
            self.message,
            self.causes
                .iter()
                .enumerate()
                .map(|(index, cause)| format!("    {index}: {cause}"))
                .join("\n")
        )
    }
}

impl Display for ErrorEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        for cause in &self.causes {
            write!(f, ": {cause}")?;
        }

        Ok(())
    }
}

/// Error tracking service collaborator.
#[cfg_attr(test, automock)]
pub trait ErrorReporter: MaybeSendSync {
    /// Captures an error, returning its event id if the service assigned one.
    fn capture_error(&self, event: &ErrorEvent) -> Option<EventId>;
}

/// Reporter discarding all errors.
#[derive(Copy, Clone, Default, Debug)]
pub struct NoopErrorReporter;

impl ErrorReporter for NoopErrorReporter {
    #[inline]
    fn capture_error(&self, _event: &ErrorEvent) -> Option<EventId> {
        None
    }
}

#[cfg(test)]
mod tests {
    use crate::error_reporting::ErrorEvent;
    use thiserror::Error;

    #[derive(Error, Debug)]
    #[error("connection refused")]
    struct ConnectionError;

    #[derive(Error, Debug)]
    #[error("cannot load users")]
    struct QueryError(#[source] ConnectionError);

    #[test]
    fn should_collect_error_chain() {
        let event = ErrorEvent::from_error(&QueryError(ConnectionError));

        assert_eq!(event.message, "cannot load users");
        assert_eq!(event.causes, vec!["connection refused".to_string()]);
        assert_eq!(event.to_string(), "cannot load users: connection refused");
        assert_eq!(
            event.report(),
            "cannot load users\n\nCaused by:\n    0: connection refused"
        );
    }

    #[test]
    fn should_report_single_message() {
        let event = ErrorEvent::from_error(&ConnectionError);

        assert!(event.causes.is_empty());
        assert_eq!(event.report(), "connection refused");
    }
}
