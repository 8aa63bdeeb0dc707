use clap::{Arg, ArgAction, Command};
use std::process::ExitCode;
use strapp::application::Application;
use strapp::cli::{Cli, Parameters};
use strapp::logging::{install_tracing_logger, PackageVerbosity};
use strapp_di::producer;
use strapp_di::resolver::ResolverBuilder;
use strapp_di::value::ResourcePtr;
use tracing::{info, Level};

struct Settings {
    greeting: String,
}

// producers are discovered automatically; parameter names are the names of their dependencies
#[producer]
fn settings() -> Settings {
    Settings {
        greeting: "Hello".to_string(),
    }
}

#[producer]
fn greeting(settings: &Settings, name: ResourcePtr<String>) -> String {
    format!("{}, {}!", settings.greeting, name)
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() -> ExitCode {
    let resolver = ResolverBuilder::new()
        .with_static_producers()
        .with_value("name", "world".to_string())
        .build()
        .expect("invalid producers");

    let mut cli = Cli::new(resolver);
    let root = cli.group(
        None,
        Command::new("hello").arg(Arg::new("verbose").short('v').action(ArgAction::Count)),
        Parameters::default().with_option::<u8>("verbose"),
        |context| {
            let verbose = context.value::<u8>("verbose")?;
            let verbosity = PackageVerbosity::new()
                .with_package("strapp", [Level::WARN, Level::INFO, Level::DEBUG])
                .with_package("00_basic_cli", [Level::INFO]);

            // the built-in logger is disabled below, so the verbosity can be applied here
            install_tracing_logger(verbosity.env_filter(*verbose as usize, Level::INFO))?;
            Ok(())
        },
    );

    cli.command(
        root,
        Command::new("greet").arg(Arg::new("name").long("name").action(ArgAction::Set)),
        Parameters::from(["greeting"]).with_option::<String>("name"),
        |context| {
            // "name" from the command line only overrides the argument, not the dependency of
            // the "greeting" producer
            let greeting = context.value::<String>("greeting")?;
            info!("Greeting resolved.");
            context.echo(greeting)?;
            Ok(())
        },
    );

    let mut config = strapp::config::ApplicationConfig::init_from_environment()
        .expect("unable to read config");
    config.install_tracing_logger = false;

    // prints "Hello, world!" for `hello greet`
    Application::new(cli, config)
        .run()
        .expect("error running application")
}
