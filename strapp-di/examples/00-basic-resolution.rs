use strapp_di::producer;
use strapp_di::resolver::ResolverBuilder;
use strapp_di::resource::Signature;
use strapp_di::value::{ErrorPtr, ResourcePtr};

struct Config {
    url: String,
}

struct Engine {
    config: ResourcePtr<Config>,
}

// a producer without dependencies; the resource is named after the function
#[producer]
fn config() -> Config {
    Config {
        url: "sqlite://memory".to_string(),
    }
}

// parameter names are resource names; references and pointers are both supported
#[producer(name = "engine")]
fn create_engine(config: ResourcePtr<Config>) -> Result<Engine, ErrorPtr> {
    Ok(Engine { config })
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    let mut resolver = ResolverBuilder::new()
        .with_static_producers()
        .build()
        .expect("invalid producers");

    // "verbose" is unknown, so it is simply not resolved
    let arguments = resolver
        .resolve(&Signature::from(["engine", "verbose"]))
        .expect("error resolving arguments");

    let engine = arguments
        .value_typed::<Engine>("engine")
        .expect("missing engine");

    // prints "Connecting to sqlite://memory"
    println!("Connecting to {}", engine.config.url);
}
