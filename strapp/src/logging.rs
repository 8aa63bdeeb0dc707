//! Logging support based on [tracing]. Applications usually map a `-v` flag count to log levels of
//! particular dependencies, e.g. keeping an HTTP client at `INFO` until `-vvv`. [PackageVerbosity]
//! describes such progressions and turns them into filter directives.

use itertools::Itertools;
use tracing::{warn, Level};
use tracing_subscriber::EnvFilter;

/// Per-package log level progressions, indexed by verbosity.
#[derive(Clone, Default, Debug)]
pub struct PackageVerbosity {
    packages: Vec<(String, Vec<Level>)>,
}

impl PackageVerbosity {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a package with levels for subsequent verbosity values. Verbosity beyond the last level
    /// keeps the last level.
    pub fn with_package<P, L>(mut self, package: P, levels: L) -> Self
    where
        P: ToString,
        L: IntoIterator<Item = Level>,
    {
        self.packages
            .push((package.to_string(), levels.into_iter().collect()));
        self
    }

    /// Returns the level of each package for given verbosity, in definition order. Packages
    /// without any levels get the `default` one.
    pub fn levels(&self, verbosity: usize, default: Level) -> Vec<(&str, Level)> {
        self.packages
            .iter()
            .map(|(package, levels)| {
                let level = levels
                    .get(verbosity.min(levels.len().saturating_sub(1)))
                    .copied()
                    .unwrap_or_else(|| {
                        warn!(package, verbosity, "Missing log levels for package.");
                        default
                    });

                (package.as_str(), level)
            })
            .collect()
    }

    /// Returns comma-separated `package=level` filter directives.
    pub fn directives(&self, verbosity: usize, default: Level) -> String {
        self.levels(verbosity, default)
            .into_iter()
            .map(|(package, level)| format!("{package}={}", level.as_str().to_ascii_lowercase()))
            .join(",")
    }

    /// Creates a filter from `RUST_LOG`, extended with package directives.
    pub fn env_filter(&self, verbosity: usize, default: Level) -> EnvFilter {
        self.levels(verbosity, default).into_iter().fold(
            EnvFilter::from_default_env(),
            |filter, (package, level)| match format!("{package}={level}").parse() {
                Ok(directive) => filter.add_directive(directive),
                Err(error) => {
                    warn!(package, %error, "Ignoring invalid log directive.");
                    filter
                }
            },
        )
    }
}

/// Installs a global formatting subscriber with given filter. Fails if a global subscriber is
/// already set.
pub fn install_tracing_logger(
    filter: EnvFilter,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    tracing_subscriber::fmt().with_env_filter(filter).try_init()
}
