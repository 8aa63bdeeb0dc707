//! The basic block of resolution is a named resource: a lazily computed value identified by a
//! name, created by a producer. Producers declare the names of resources they depend on with a
//! [Signature], which the [Resolver](crate::resolver::Resolver) uses to resolve their arguments
//! before invoking them.
//!
//! ## Declaring producers
//!
//! Producers can be registered manually on a
//! [ResolverBuilder](crate::resolver::ResolverBuilder), or automatically with the `#[producer]`
//! attribute if the `derive` feature is enabled. The attribute uses function parameter names as
//! dependency names. Each parameter must be either a [ResourcePtr](crate::value::ResourcePtr) or a
//! plain reference to the resource type:
//!
//! ```
//! use strapp_di::producer;
//! use strapp_di::value::{ErrorPtr, ResourcePtr};
//!
//! struct Config {
//!     url: String,
//! }
//!
//! struct DatabaseEngine;
//!
//! #[producer]
//! fn config() -> Config {
//!     Config {
//!         url: "sqlite://".to_string(),
//!     }
//! }
//!
//! #[producer]
//! fn database_engine(config: ResourcePtr<Config>) -> Result<DatabaseEngine, ErrorPtr> {
//!     let _ = &config.url;
//!     Ok(DatabaseEngine)
//! }
//! ```
//!
//! ### Supported `#[producer]` configuration
//!
//! * `name = "name"` - register the resource under given name instead of the function name
//!
//! ## Typed keys
//!
//! Resources are stored type-erased. A [ResourceKey] ties a name to a type, so lookups through it
//! are checked at compile time instead of relying on turbofish annotations at every call site.

use fxhash::FxHashSet;
use itertools::Itertools;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

/// Names of parameters a producer or handler accepts, in declaration order.
///
/// Parameters marked as external are supplied by the caller, e.g. bound to CLI options, and are
/// never reported as unknown by a strict [Resolver](crate::resolver::Resolver).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Signature {
    parameters: Vec<String>,
    external: FxHashSet<String>,
}

impl Signature {
    /// Creates a signature with given parameters. Repeated names are kept once.
    pub fn new<I, N>(parameters: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: ToString,
    {
        Self {
            parameters: parameters
                .into_iter()
                .map(|parameter| parameter.to_string())
                .unique()
                .collect(),
            external: Default::default(),
        }
    }

    /// Signature without any parameters.
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Adds a parameter which is not injected by the resolver.
    pub fn with_external<N: ToString>(mut self, name: N) -> Self {
        let name = name.to_string();
        if !self.parameters.contains(&name) {
            self.parameters.push(name.clone());
        }

        self.external.insert(name);
        self
    }

    #[inline]
    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(String::as_str)
    }

    #[inline]
    pub fn is_external(&self, name: &str) -> bool {
        self.external.contains(name)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

impl<N: ToString, const S: usize> From<[N; S]> for Signature {
    fn from(value: [N; S]) -> Self {
        Self::new(value)
    }
}

/// Name of a resource bound to the type of its value.
pub struct ResourceKey<T: ?Sized> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T: ?Sized> ResourceKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T: ?Sized> Clone for ResourceKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for ResourceKey<T> {}

impl<T: ?Sized> Debug for ResourceKey<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ResourceKey").field(&self.name).finish()
    }
}
