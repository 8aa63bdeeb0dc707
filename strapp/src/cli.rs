//! Composition of resolved resources with [clap] commands.
//!
//! A [Cli] is a tree of groups and commands. Each of them consists of a regular [Command], which
//! is passed to clap unmodified, the [Parameters] its handler accepts, and the handler itself.
//! When a group or command gets invoked, its parameters are resolved with the [Resolver], merged
//! with values of bound CLI options (which win on name collision) and handed to the handler
//! through a [CommandContext].
//!
//! Handlers signal expected failures with [CliError]. Any other error returned by a command
//! handler is considered unexpected: it gets logged along with its causes, forwarded to the
//! [ErrorReporter] and then converted to [CliError::Failure], so the user sees a regular error
//! message instead of an internal one. Group handler errors are never converted.

use crate::error_reporting::{ErrorEvent, ErrorReporter, ErrorReporterPtr, NoopErrorReporter};
use clap::{ArgMatches, Command};
use fxhash::FxHashMap;
use itertools::Itertools;
use std::any::Any;
use std::error::Error;
use std::ffi::OsString;
use std::fmt::Display;
use std::io::Write;
use strapp_di::resolver::Resolver;
use strapp_di::resource::Signature;
use strapp_di::value::{
    erase, Arguments, MaybeSendSync, ResourcePtr, ResourceValue, ResourceValuePtr,
};
use strapp_di::ResolverError;
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

/// Exit code for errors the application did not expect.
pub const UNHANDLED_ERROR_EXIT_CODE: i32 = 70;

/// Expected errors, which are shown to the user as they are.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Aborted!")]
    Abort,
    #[error("{0}")]
    Failure(String),
    #[error(transparent)]
    Usage(clap::Error),
}

impl CliError {
    #[inline]
    pub fn failure<M: ToString>(message: M) -> Self {
        Self::Failure(message.to_string())
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(error) => error.exit_code(),
            Self::Abort | Self::Failure(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Cli(#[from] CliError),
    #[error("Cannot resolve arguments: {0}")]
    Resolver(#[from] ResolverError),
    #[error("{0}")]
    Unhandled(HandlerError),
    #[error("Missing handler for command: {0}")]
    MissingHandler(String),
    #[error("No root group defined")]
    MissingRootGroup,
    #[error("Cannot write output: {0}")]
    Output(#[from] std::io::Error),
}

impl DispatchError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Cli(error) => error.exit_code(),
            _ => UNHANDLED_ERROR_EXIT_CODE,
        }
    }

    /// Writes a user-facing message for this error.
    pub fn report(&self, output: &mut dyn Write) -> std::io::Result<()> {
        match self {
            Self::Cli(CliError::Abort) => writeln!(output, "Aborted!"),
            Self::Cli(CliError::Failure(message)) => writeln!(output, "Error: {message}"),
            Self::Cli(CliError::Usage(error)) => write!(output, "{}", error.render()),
            Self::Unhandled(error) => {
                writeln!(output, "{}", ErrorEvent::from_error(&**error).report())
            }
            error => writeln!(output, "Error: {error}"),
        }
    }
}

pub type HandlerError = Box<dyn Error + Send + Sync>;
pub type HandlerResult = Result<(), HandlerError>;

/// Group or command logic.
pub trait Handler: Fn(&mut CommandContext<'_>) -> HandlerResult + MaybeSendSync {}

impl<T> Handler for T where T: Fn(&mut CommandContext<'_>) -> HandlerResult + MaybeSendSync {}

type HandlerPtr = Box<dyn Handler>;

type OptionExtractor = fn(&ArgMatches, &str) -> Option<ResourceValuePtr>;

fn extract_one<T: Any + Clone + Send + Sync>(
    matches: &ArgMatches,
    id: &str,
) -> Option<ResourceValuePtr> {
    match matches.try_get_one::<T>(id) {
        Ok(value) => value.cloned().map(erase),
        Err(error) => {
            warn!(option = id, %error, "Cannot read option value.");
            None
        }
    }
}

fn extract_many<T: Any + Clone + Send + Sync>(
    matches: &ArgMatches,
    id: &str,
) -> Option<ResourceValuePtr> {
    match matches.try_get_many::<T>(id) {
        Ok(values) => values.map(|values| erase(values.cloned().collect_vec())),
        Err(error) => {
            warn!(option = id, %error, "Cannot read option values.");
            None
        }
    }
}

/// Parameters of a handler: a [Signature] of resources to resolve and CLI options bound to some
/// of them.
#[derive(Clone, Default)]
pub struct Parameters {
    signature: Signature,
    options: Vec<(String, OptionExtractor)>,
}

impl Parameters {
    #[inline]
    pub fn new(signature: Signature) -> Self {
        Self {
            signature,
            options: vec![],
        }
    }

    /// Binds a parameter to the value of the clap argument with the same id. Absent options do
    /// not override resolved values.
    pub fn with_option<T: Any + Clone + Send + Sync>(self, name: &str) -> Self {
        self.with_extractor(name, extract_one::<T>)
    }

    /// Binds a parameter to all values of a multi-value clap argument, as `Vec<T>`.
    pub fn with_options<T: Any + Clone + Send + Sync>(self, name: &str) -> Self {
        self.with_extractor(name, extract_many::<T>)
    }

    fn with_extractor(mut self, name: &str, extractor: OptionExtractor) -> Self {
        self.signature = self.signature.with_external(name);
        self.options.push((name.to_string(), extractor));
        self
    }

    #[inline]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    fn call_time_arguments(&self, matches: &ArgMatches) -> Arguments {
        self.options
            .iter()
            .filter_map(|(name, extract)| extract(matches, name).map(|value| (name, value)))
            .collect()
    }
}

impl From<Signature> for Parameters {
    fn from(value: Signature) -> Self {
        Self::new(value)
    }
}

impl<N: ToString, const S: usize> From<[N; S]> for Parameters {
    fn from(value: [N; S]) -> Self {
        Self::new(value.into())
    }
}

/// Everything a handler gets when invoked.
pub struct CommandContext<'a> {
    arguments: Arguments,
    matches: &'a ArgMatches,
    resolver: &'a mut Resolver,
    output: &'a mut dyn Write,
}

impl CommandContext<'_> {
    /// Resolved values merged with option values.
    #[inline]
    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    #[inline]
    pub fn value<T: ResourceValue>(&self, name: &str) -> Result<ResourcePtr<T>, ResolverError> {
        self.arguments.value_typed(name)
    }

    #[inline]
    pub fn value_option<T: ResourceValue>(
        &self,
        name: &str,
    ) -> Result<Option<ResourcePtr<T>>, ResolverError> {
        self.arguments.value_option(name)
    }

    /// Raw clap matches of the invoked group or command.
    #[inline]
    pub fn matches(&self) -> &ArgMatches {
        self.matches
    }

    #[inline]
    pub fn resolver(&mut self) -> &mut Resolver {
        &mut *self.resolver
    }

    /// Makes a value available to subsequently invoked handlers and producers.
    pub fn register_value<N: AsRef<str>, T: ResourceValue>(&mut self, name: N, value: T) {
        self.resolver.register_value(name, value);
    }

    /// Writes a line to the output.
    pub fn echo<M: Display>(&mut self, message: M) -> std::io::Result<()> {
        writeln!(self.output, "{message}")
    }

    #[inline]
    pub fn output(&mut self) -> &mut dyn Write {
        &mut *self.output
    }
}

/// Handle to a group, used to attach subgroups and commands.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct GroupId(usize);

enum NodeKind {
    Group { children: FxHashMap<String, usize> },
    Command,
}

struct Node {
    command: Command,
    parameters: Parameters,
    handler: HandlerPtr,
    kind: NodeKind,
}

/// Tree of groups and commands with dependency resolution for their handlers.
pub struct Cli {
    resolver: Resolver,
    nodes: Vec<Node>,
    root: Option<usize>,
    error_reporter: ErrorReporterPtr,
    capture_usage_errors: bool,
}

impl Cli {
    pub fn new(resolver: Resolver) -> Self {
        Self {
            resolver,
            nodes: vec![],
            root: None,
            error_reporter: Box::new(NoopErrorReporter),
            capture_usage_errors: false,
        }
    }

    /// Sets the reporter for unexpected command failures.
    pub fn with_error_reporter(mut self, error_reporter: ErrorReporterPtr) -> Self {
        self.error_reporter = error_reporter;
        self
    }

    /// Forward usage errors, like unknown subcommands, to the error reporter.
    pub fn with_usage_error_capture(mut self, capture_usage_errors: bool) -> Self {
        self.capture_usage_errors = capture_usage_errors;
        self
    }

    #[inline]
    pub fn resolver(&mut self) -> &mut Resolver {
        &mut self.resolver
    }

    /// Name of the root group, if defined.
    pub fn root_name(&self) -> Option<&str> {
        self.root
            .map(|index| self.nodes[index].command.get_name())
    }

    /// Defines a group. A group without a parent becomes the root, unless a root is already
    /// defined - such groups are unreachable.
    pub fn group<P, F>(
        &mut self,
        parent: Option<GroupId>,
        command: Command,
        parameters: P,
        handler: F,
    ) -> GroupId
    where
        P: Into<Parameters>,
        F: Fn(&mut CommandContext<'_>) -> HandlerResult + MaybeSendSync + 'static,
    {
        let index = self.add_node(
            parent,
            Node {
                command,
                parameters: parameters.into(),
                handler: Box::new(handler),
                kind: NodeKind::Group {
                    children: Default::default(),
                },
            },
        );

        GroupId(index)
    }

    /// Defines a command within given group.
    pub fn command<P, F>(&mut self, group: GroupId, command: Command, parameters: P, handler: F)
    where
        P: Into<Parameters>,
        F: Fn(&mut CommandContext<'_>) -> HandlerResult + MaybeSendSync + 'static,
    {
        self.add_node(
            Some(group),
            Node {
                command,
                parameters: parameters.into(),
                handler: Box::new(handler),
                kind: NodeKind::Command,
            },
        );
    }

    fn add_node(&mut self, parent: Option<GroupId>, node: Node) -> usize {
        let index = self.nodes.len();
        let name = node.command.get_name().to_string();
        self.nodes.push(node);

        match parent {
            Some(GroupId(parent)) => {
                if let Some(Node {
                    kind: NodeKind::Group { children },
                    ..
                }) = self.nodes.get_mut(parent)
                {
                    children.insert(name, index);
                }
            }
            None if self.root.is_none() => self.root = Some(index),
            None => warn!(group = %name, "Root group already defined."),
        }

        index
    }

    fn build_command(&self, index: usize) -> Command {
        let node = &self.nodes[index];
        match &node.kind {
            NodeKind::Group { children } => children
                .values()
                .sorted()
                .fold(node.command.clone(), |command, child| {
                    command.subcommand(self.build_command(*child))
                }),
            NodeKind::Command => node.command.clone(),
        }
    }

    /// Parses given arguments (including the program name) and runs the matched groups and
    /// command. Help and version requests are written to `output` and are not errors.
    pub fn run<I, T>(&mut self, args: I, output: &mut dyn Write) -> Result<(), DispatchError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let root = self.root.ok_or(DispatchError::MissingRootGroup)?;
        let matches = match self.build_command(root).try_get_matches_from(args) {
            Ok(matches) => matches,
            Err(error) if !error.use_stderr() => {
                write!(output, "{}", error.render())?;
                return Ok(());
            }
            Err(error) => {
                if self.capture_usage_errors {
                    debug!(%error, "Capturing usage error.");
                    self.error_reporter
                        .capture_error(&ErrorEvent::from_error(&error));
                }

                return Err(CliError::Usage(error).into());
            }
        };

        let mut current = root;
        let mut current_matches = &matches;
        let mut path = vec![];

        loop {
            let node = &self.nodes[current];
            path.push(node.command.get_name());

            let children = match &node.kind {
                NodeKind::Group { children } => children,
                NodeKind::Command => {
                    info!(command = %path.iter().join(" "), "Running command.");
                    return invoke_command(
                        node,
                        current_matches,
                        &mut self.resolver,
                        self.error_reporter.as_ref(),
                        output,
                    );
                }
            };

            let Some((name, sub_matches)) = current_matches.subcommand() else {
                trace!(group = %path.iter().join(" "), "No subcommand given.");
                let mut help = self.build_command(current).bin_name(path.iter().join(" "));
                write!(output, "{}", help.render_help())?;
                return Ok(());
            };

            info!(group = %path.iter().join(" "), "Running group.");
            invoke_group(node, current_matches, &mut self.resolver, &mut *output)?;

            current = *children
                .get(name)
                .ok_or_else(|| DispatchError::MissingHandler(name.to_string()))?;
            current_matches = sub_matches;
        }
    }
}

fn call_handler(
    node: &Node,
    matches: &ArgMatches,
    resolver: &mut Resolver,
    output: &mut dyn Write,
) -> Result<HandlerResult, ResolverError> {
    let arguments = resolver
        .resolve(node.parameters.signature())?
        .merge(node.parameters.call_time_arguments(matches));

    debug!(?arguments, "Invoking handler.");

    let mut context = CommandContext {
        arguments,
        matches,
        resolver,
        output,
    };

    Ok((node.handler)(&mut context))
}

fn invoke_group(
    node: &Node,
    matches: &ArgMatches,
    resolver: &mut Resolver,
    output: &mut dyn Write,
) -> Result<(), DispatchError> {
    call_handler(node, matches, resolver, output)?.map_err(|error| {
        match error.downcast::<CliError>() {
            Ok(error) => DispatchError::Cli(*error),
            Err(error) => DispatchError::Unhandled(error),
        }
    })
}

fn invoke_command(
    node: &Node,
    matches: &ArgMatches,
    resolver: &mut Resolver,
    error_reporter: &dyn ErrorReporter,
    output: &mut dyn Write,
) -> Result<(), DispatchError> {
    let error = match call_handler(node, matches, resolver, &mut *output)? {
        Ok(()) => return Ok(()),
        Err(error) => error,
    };

    let error = match error.downcast::<CliError>() {
        Ok(error) => return Err(DispatchError::Cli(*error)),
        Err(error) => error,
    };

    let event = ErrorEvent::from_error(&*error);
    error!(command = node.command.get_name(), error = %event, "Unexpected command failure.");

    if let Some(event_id) = error_reporter.capture_error(&event) {
        debug!(%event_id, "Command failure reported.");
    }

    if let Err(write_error) = writeln!(output, "{}", event.report()) {
        warn!(%write_error, "Cannot write command failure.");
    }

    Err(CliError::Failure(error.to_string()).into())
}

#[cfg(test)]
mod tests {
    use crate::cli::{
        Cli, CliError, CommandContext, DispatchError, HandlerResult, Parameters,
        UNHANDLED_ERROR_EXIT_CODE,
    };
    use crate::error_reporting::{ErrorEvent, EventId, MockErrorReporter};
    use clap::{Arg, ArgAction, Command};
    use std::io::{ErrorKind, Write};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use strapp_di::resolver::{Resolver, ResolverBuilder};
    use strapp_di::resource::Signature;
    use strapp_di::value::{convert_error, erase, Arguments};
    use thiserror::Error;

    #[derive(Error, Debug)]
    #[error("connection refused")]
    struct ConnectionError;

    #[derive(Error, Debug)]
    #[error("cannot load users")]
    struct QueryError(#[source] ConnectionError);

    struct ClosedOutput;

    impl Write for ClosedOutput {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn resolver(counter: Arc<AtomicUsize>) -> Resolver {
        ResolverBuilder::new()
            .with_producer("config", Signature::empty(), move |_: &Arguments| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(erase("production".to_string()))
            })
            .with_producer("broken", Signature::empty(), |_: &Arguments| {
                Err(convert_error(ConnectionError))
            })
            .build()
            .unwrap()
    }

    fn cli_with_command<F>(handler: F) -> Cli
    where
        F: Fn(&mut CommandContext<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        let mut cli = Cli::new(resolver(Default::default()));
        let root = cli.group(None, Command::new("app"), Signature::empty(), |_| Ok(()));
        cli.command(root, Command::new("run"), Signature::empty(), handler);
        cli
    }

    fn run(cli: &mut Cli, args: &[&str]) -> (Result<(), DispatchError>, String) {
        let mut output = Vec::new();
        let result = cli.run(args.iter().copied(), &mut output);
        (result, String::from_utf8(output).unwrap())
    }

    #[test]
    fn should_inject_resolved_and_option_values() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut cli = Cli::new(resolver(counter.clone()));
        let root = cli.group(None, Command::new("app"), Signature::empty(), |_| Ok(()));
        cli.command(
            root,
            Command::new("show")
                .arg(Arg::new("name").long("name").action(ArgAction::Set))
                .arg(Arg::new("tag").long("tag").action(ArgAction::Append)),
            Parameters::from(["config", "unknown"])
                .with_option::<String>("name")
                .with_options::<String>("tag"),
            |context| {
                let config = context.value::<String>("config")?;
                let name = context.value::<String>("name")?;
                let tags = context.value::<Vec<String>>("tag")?;
                assert!(!context.arguments().contains("unknown"));
                context.echo(format!("{config} {name} {}", tags.join(",")))?;
                Ok(())
            },
        );

        let (result, output) = run(
            &mut cli,
            &["app", "show", "--name", "users", "--tag", "a", "--tag", "b"],
        );

        result.unwrap();
        assert_eq!(output, "production users a,b\n");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn should_prefer_option_values() {
        let mut cli = Cli::new(resolver(Default::default()));
        let root = cli.group(None, Command::new("app"), Signature::empty(), |_| Ok(()));
        cli.command(
            root,
            Command::new("show").arg(Arg::new("config").long("config").action(ArgAction::Set)),
            Parameters::from(["config"]).with_option::<String>("config"),
            |context| {
                let config = context.value::<String>("config")?;
                context.echo(config)?;
                Ok(())
            },
        );

        let (result, output) = run(&mut cli, &["app", "show", "--config", "staging"]);
        result.unwrap();
        assert_eq!(output, "staging\n");

        let (result, output) = run(&mut cli, &["app", "show"]);
        result.unwrap();
        assert_eq!(output, "production\n");
    }

    #[test]
    fn should_keep_first_root_group() {
        let mut cli = cli_with_command(|_| Ok(()));
        let other = cli.group(None, Command::new("other"), Signature::empty(), |_| Ok(()));
        cli.command(other, Command::new("run"), Signature::empty(), |_| {
            Err(CliError::Abort.into())
        });

        assert_eq!(cli.root_name(), Some("app"));

        let (result, _) = run(&mut cli, &["app", "run"]);
        result.unwrap();
    }

    #[test]
    fn should_run_groups_before_command() {
        let calls = Arc::new(Mutex::new(vec![]));
        let mut cli = Cli::new(resolver(Default::default()));

        let root = cli.group(
            None,
            Command::new("app").arg(
                Arg::new("verbose")
                    .short('v')
                    .action(ArgAction::Count),
            ),
            Parameters::default().with_option::<u8>("verbose"),
            {
                let calls = calls.clone();
                move |context| {
                    calls.lock().unwrap().push("app".to_string());
                    let verbose = context.value::<u8>("verbose")?;
                    context.register_value("verbosity", *verbose);
                    Ok(())
                }
            },
        );

        let database = cli.group(Some(root), Command::new("database"), Signature::empty(), {
            let calls = calls.clone();
            move |_| {
                calls.lock().unwrap().push("database".to_string());
                Ok(())
            }
        });

        cli.command(database, Command::new("migrate"), ["verbosity"], {
            let calls = calls.clone();
            move |context| {
                let verbosity = context.value::<u8>("verbosity")?;
                calls
                    .lock()
                    .unwrap()
                    .push(format!("migrate {verbosity}"));
                Ok(())
            }
        });

        let (result, _) = run(&mut cli, &["app", "-vv", "database", "migrate"]);
        result.unwrap();

        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                "app".to_string(),
                "database".to_string(),
                "migrate 2".to_string()
            ]
        );
    }

    #[test]
    fn should_print_help_for_group_without_subcommand() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut cli = Cli::new(resolver(Default::default()));
        let root = cli.group(None, Command::new("app"), Signature::empty(), {
            let calls = calls.clone();
            move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        let database = cli.group(Some(root), Command::new("database"), Signature::empty(), |_| {
            Ok(())
        });
        cli.command(
            database,
            Command::new("migrate").about("Runs migrations"),
            Signature::empty(),
            |_| Ok(()),
        );

        let (result, output) = run(&mut cli, &["app"]);
        result.unwrap();
        assert!(output.contains("Usage: app"));
        assert!(output.contains("database"));

        let (result, output) = run(&mut cli, &["app", "database"]);
        result.unwrap();
        assert!(output.contains("Usage: app database"));
        assert!(output.contains("Runs migrations"));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn should_write_help_on_request() {
        let mut cli = cli_with_command(|_| Ok(()));

        let (result, output) = run(&mut cli, &["app", "--help"]);
        result.unwrap();
        assert!(output.contains("Usage: app"));
    }

    #[test]
    fn should_convert_unexpected_command_errors() {
        let mut error_reporter = MockErrorReporter::new();
        error_reporter
            .expect_capture_error()
            .withf(|event: &ErrorEvent| {
                event.message == "cannot load users"
                    && event.causes == vec!["connection refused".to_string()]
            })
            .times(1)
            .return_const(Some(EventId("event".to_string())));

        let mut cli = cli_with_command(|_| Err(QueryError(ConnectionError).into()))
            .with_error_reporter(Box::new(error_reporter));

        let (result, output) = run(&mut cli, &["app", "run"]);
        let error = result.unwrap_err();

        assert!(matches!(
            &error,
            DispatchError::Cli(CliError::Failure(message)) if message == "cannot load users"
        ));
        assert_eq!(error.exit_code(), 1);
        assert!(output.contains("cannot load users"));
        assert!(output.contains("0: connection refused"));
    }

    #[test]
    fn should_report_command_errors_with_closed_output() {
        let mut error_reporter = MockErrorReporter::new();
        error_reporter
            .expect_capture_error()
            .withf(|event: &ErrorEvent| event.message == "cannot load users")
            .times(1)
            .return_const(None::<EventId>);

        let mut cli = cli_with_command(|_| Err(QueryError(ConnectionError).into()))
            .with_error_reporter(Box::new(error_reporter));

        let error = cli.run(["app", "run"], &mut ClosedOutput).unwrap_err();

        assert!(matches!(
            &error,
            DispatchError::Cli(CliError::Failure(message)) if message == "cannot load users"
        ));
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn should_pass_through_abort() {
        let mut error_reporter = MockErrorReporter::new();
        error_reporter.expect_capture_error().times(0);

        let mut cli = cli_with_command(|_| Err(CliError::Abort.into()))
            .with_error_reporter(Box::new(error_reporter));

        let (result, output) = run(&mut cli, &["app", "run"]);
        let error = result.unwrap_err();

        assert!(matches!(error, DispatchError::Cli(CliError::Abort)));
        assert_eq!(error.exit_code(), 1);
        assert!(output.is_empty());
    }

    #[test]
    fn should_pass_through_expected_failures() {
        let mut error_reporter = MockErrorReporter::new();
        error_reporter.expect_capture_error().times(0);

        let mut cli = cli_with_command(|_| Err(CliError::failure("no such user").into()))
            .with_error_reporter(Box::new(error_reporter));

        let (result, _) = run(&mut cli, &["app", "run"]);
        let error = result.unwrap_err();

        let mut output = Vec::new();
        error.report(&mut output).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "Error: no such user\n");
    }

    #[test]
    fn should_not_convert_group_errors() {
        let mut error_reporter = MockErrorReporter::new();
        error_reporter.expect_capture_error().times(0);

        let mut cli = Cli::new(resolver(Default::default()))
            .with_error_reporter(Box::new(error_reporter));
        let root = cli.group(None, Command::new("app"), Signature::empty(), |_| {
            Err(ConnectionError.into())
        });
        cli.command(root, Command::new("run"), Signature::empty(), |_| Ok(()));

        let (result, _) = run(&mut cli, &["app", "run"]);
        let error = result.unwrap_err();

        assert!(matches!(error, DispatchError::Unhandled(_)));
        assert_eq!(error.exit_code(), UNHANDLED_ERROR_EXIT_CODE);
    }

    #[test]
    fn should_pass_through_group_abort() {
        let mut error_reporter = MockErrorReporter::new();
        error_reporter.expect_capture_error().times(0);

        let calls = Arc::new(AtomicUsize::new(0));
        let mut cli = Cli::new(resolver(Default::default()))
            .with_error_reporter(Box::new(error_reporter));
        let root = cli.group(None, Command::new("app"), Signature::empty(), |_| {
            Err(CliError::Abort.into())
        });
        cli.command(root, Command::new("run"), Signature::empty(), {
            let calls = calls.clone();
            move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let (result, output) = run(&mut cli, &["app", "run"]);
        let error = result.unwrap_err();

        assert!(matches!(error, DispatchError::Cli(CliError::Abort)));
        assert_eq!(error.exit_code(), 1);
        assert!(output.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn should_pass_through_group_failure() {
        let mut error_reporter = MockErrorReporter::new();
        error_reporter.expect_capture_error().times(0);

        let mut cli = Cli::new(resolver(Default::default()))
            .with_error_reporter(Box::new(error_reporter));
        let root = cli.group(None, Command::new("app"), Signature::empty(), |_| {
            Err(CliError::failure("invalid workspace").into())
        });
        cli.command(root, Command::new("run"), Signature::empty(), |_| Ok(()));

        let (result, _) = run(&mut cli, &["app", "run"]);
        let error = result.unwrap_err();

        assert!(matches!(
            &error,
            DispatchError::Cli(CliError::Failure(message)) if message == "invalid workspace"
        ));
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn should_propagate_producer_errors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut cli = Cli::new(resolver(Default::default()));
        let root = cli.group(None, Command::new("app"), Signature::empty(), |_| Ok(()));
        cli.command(root, Command::new("run"), ["broken"], {
            let calls = calls.clone();
            move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let (result, _) = run(&mut cli, &["app", "run"]);

        assert!(matches!(result.unwrap_err(), DispatchError::Resolver(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn should_capture_usage_errors() {
        let mut error_reporter = MockErrorReporter::new();
        error_reporter
            .expect_capture_error()
            .times(1)
            .return_const(None::<EventId>);

        let mut cli = cli_with_command(|_| Ok(()))
            .with_error_reporter(Box::new(error_reporter))
            .with_usage_error_capture(true);

        let (result, _) = run(&mut cli, &["app", "unknown"]);
        let error = result.unwrap_err();

        assert!(matches!(error, DispatchError::Cli(CliError::Usage(_))));
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn should_not_capture_usage_errors_by_default() {
        let mut error_reporter = MockErrorReporter::new();
        error_reporter.expect_capture_error().times(0);

        let mut cli =
            cli_with_command(|_| Ok(())).with_error_reporter(Box::new(error_reporter));

        let (result, _) = run(&mut cli, &["app", "run", "--unknown"]);
        assert_eq!(result.unwrap_err().exit_code(), 2);
    }

    #[test]
    fn should_fail_without_root_group() {
        let mut cli = Cli::new(resolver(Default::default()));

        let (result, _) = run(&mut cli, &["app"]);
        assert!(matches!(
            result.unwrap_err(),
            DispatchError::MissingRootGroup
        ));
    }
}
