//! A small dependency resolver which injects named resources into functions.
//!
//! Resources are created by producers - functions which can themselves depend on other resources.
//! Each producer declares the names of its dependencies, which makes it possible to resolve the
//! whole dependency graph on demand and memoize every created value, so each producer runs at most
//! once. This is typically used to provide commands of a CLI application with shared
//! infrastructure, like configuration or database handles, without global state.
//!
//! ```
//! use strapp_di::resolver::ResolverBuilder;
//! use strapp_di::resource::{ResourceKey, Signature};
//!
//! const BASE: ResourceKey<u32> = ResourceKey::new("base");
//! const DOUBLED: ResourceKey<u32> = ResourceKey::new("doubled");
//!
//! let mut resolver = ResolverBuilder::new()
//!     .with_typed_producer(BASE, Signature::empty(), |_| Ok(21))
//!     .with_typed_producer(DOUBLED, ["base"], |arguments| {
//!         arguments.required::<u32>("base").map(|base| *base * 2)
//!     })
//!     .build()
//!     .unwrap();
//!
//! let arguments = resolver.resolve(&Signature::from(["doubled", "unknown"])).unwrap();
//! assert_eq!(*arguments.get_key(&DOUBLED).unwrap(), 42);
//! assert!(!arguments.contains("unknown"));
//! ```
//!
//! ### Features
//!
//! * `threadsafe` - use threadsafe pointers and `Send + Sync` trait bounds
//! * `derive` - the `#[producer]` attribute

pub mod cache;
mod error;
pub mod producer_registry;
pub mod resolver;
pub mod resource;
pub mod value;

pub use error::{ProducerRegistryError, ResolverError};

#[cfg(feature = "derive")]
pub use strapp_di_derive::producer;
