//! CLI application framework based on [strapp_di] dependency resolution.
//!
//! Command line tools tend to share a lot of infrastructure between their commands: configuration,
//! database handles, API clients. Instead of creating all of it up front in `main()`, every piece
//! becomes a named resource produced on demand, and every command simply declares which resources
//! it needs. This crate connects such resources with [clap] commands through [Cli](cli::Cli),
//! reports unexpected command failures to an [ErrorReporter](error_reporting::ErrorReporter) and
//! provides an [Application](application::Application) entrypoint, which also configures additional
//! supporting infrastructure, e.g. logging.
//!
//! ```
//! use clap::{Arg, ArgAction, Command};
//! use strapp::cli::{Cli, Parameters};
//! use strapp_di::resolver::ResolverBuilder;
//! use strapp_di::resource::Signature;
//! use strapp_di::value::erase;
//!
//! let resolver = ResolverBuilder::new()
//!     .with_producer("greeting", Signature::empty(), |_| Ok(erase("Hello".to_string())))
//!     .build()
//!     .unwrap();
//!
//! let mut cli = Cli::new(resolver);
//! let root = cli.group(None, Command::new("app"), Signature::empty(), |_| Ok(()));
//! cli.command(
//!     root,
//!     Command::new("greet").arg(Arg::new("name").long("name").action(ArgAction::Set)),
//!     Parameters::from(Signature::from(["greeting"])).with_option::<String>("name"),
//!     |context| {
//!         let greeting = context.value::<String>("greeting")?;
//!         let name = context.value::<String>("name")?;
//!         context.echo(format!("{greeting}, {name}!"))?;
//!         Ok(())
//!     },
//! );
//!
//! let mut output = Vec::new();
//! cli.run(["app", "greet", "--name", "world"], &mut output).unwrap();
//! assert_eq!(String::from_utf8(output).unwrap(), "Hello, world!\n");
//! ```
//!
//! ### Features
//!
//! * `threadsafe` - use threadsafe pointers and `Send + Sync` trait bounds

pub mod application;
pub mod cli;
pub mod config;
pub mod error_reporting;
pub mod logging;
pub mod testing;
