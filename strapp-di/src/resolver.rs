//! Core functionality for resolving resources and the arguments of functions depending on them.

use crate::cache::{MemoizingCache, ValueCachePtr};
use crate::error::{ProducerRegistryError, ResolverError};
use crate::producer_registry::{
    static_definitions, validate_definitions, ProducerDefinition, ProducerRegistry,
    StaticProducerRegistry,
};
use crate::resource::{ResourceKey, Signature};
use crate::value::{
    erase, Arguments, ErrorPtr, MaybeSendSync, ResourcePtr, ResourceValue, ResourceValuePtr,
};
use fxhash::FxHashMap;
use std::any::type_name;
use tracing::{debug, trace};

pub type ProducerRegistryPtr = Box<dyn ProducerRegistry>;

/// What to do with a parameter which has neither a cached value nor a producer.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum UnknownParameterPolicy {
    /// Leave the parameter out of resolved arguments. The caller is expected to supply it.
    #[default]
    Skip,
    /// Fail with [ResolverError::UnknownResource], unless the parameter is declared as external
    /// in the [Signature].
    Strict,
}

/// Generic provider for resources.
pub trait ResourceProvider {
    /// Returns the value of a resource, creating it if needed. Returns `None` if the resource is
    /// unknown.
    fn resource(&mut self, name: &str) -> Result<Option<ResourceValuePtr>, ResolverError>;
}

/// Helper trait for [ResourceProvider] providing strongly-typed access.
pub trait TypedResourceProvider {
    /// Typesafe version of [ResourceProvider::resource], failing on unknown resources.
    fn resource_typed<T: ResourceValue>(
        &mut self,
        name: &str,
    ) -> Result<ResourcePtr<T>, ResolverError>;

    /// Tries to get a resource like [TypedResourceProvider::resource_typed] does, but returns
    /// `None` on unknown resource.
    fn resource_option<T: ResourceValue>(
        &mut self,
        name: &str,
    ) -> Result<Option<ResourcePtr<T>>, ResolverError>;

    /// Gets a resource identified by a typed key.
    fn resource_by_key<T: ResourceValue>(
        &mut self,
        key: &ResourceKey<T>,
    ) -> Result<ResourcePtr<T>, ResolverError> {
        self.resource_typed(key.name())
    }
}

impl<P: ResourceProvider + ?Sized> TypedResourceProvider for P {
    fn resource_typed<T: ResourceValue>(
        &mut self,
        name: &str,
    ) -> Result<ResourcePtr<T>, ResolverError> {
        self.resource_option(name)?
            .ok_or_else(|| ResolverError::UnknownResource(name.to_string()))
    }

    fn resource_option<T: ResourceValue>(
        &mut self,
        name: &str,
    ) -> Result<Option<ResourcePtr<T>>, ResolverError> {
        self.resource(name)?
            .map(|value| {
                value
                    .downcast::<T>()
                    .map_err(|_| ResolverError::IncompatibleValue {
                        name: name.to_string(),
                        type_name: type_name::<T>(),
                    })
            })
            .transpose()
    }
}

/// Builder for [Resolver] with sensible defaults, for easy construction.
pub struct ResolverBuilder {
    producer_registry: ProducerRegistryPtr,
    cache: ValueCachePtr,
    constants: FxHashMap<String, ResourceValuePtr>,
    unknown_parameter_policy: UnknownParameterPolicy,
    registration_error: Option<ProducerRegistryError>,
}

impl Default for ResolverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverBuilder {
    /// Creates a new builder with an empty registry and a [MemoizingCache].
    pub fn new() -> Self {
        Self {
            producer_registry: Box::new(StaticProducerRegistry::new(false)),
            cache: Box::<MemoizingCache>::default(),
            constants: Default::default(),
            unknown_parameter_policy: Default::default(),
            registration_error: None,
        }
    }

    /// Sets new [ProducerRegistry]. Producers registered so far are not carried over.
    pub fn with_producer_registry(mut self, producer_registry: ProducerRegistryPtr) -> Self {
        self.producer_registry = producer_registry;
        self
    }

    /// Sets new [ValueCache](crate::cache::ValueCache).
    pub fn with_cache(mut self, cache: ValueCachePtr) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_unknown_parameter_policy(mut self, policy: UnknownParameterPolicy) -> Self {
        self.unknown_parameter_policy = policy;
        self
    }

    /// Adds a producer definition. Registration errors are reported by [ResolverBuilder::build].
    pub fn with_definition(mut self, definition: ProducerDefinition) -> Self {
        if self.registration_error.is_none() {
            self.registration_error = self
                .producer_registry
                .register_producer(definition)
                .err();
        }

        self
    }

    /// Adds a producer of a type-erased value.
    pub fn with_producer<N, S, F>(self, name: N, signature: S, producer: F) -> Self
    where
        N: ToString,
        S: Into<Signature>,
        F: Fn(&Arguments) -> Result<ResourceValuePtr, ErrorPtr> + MaybeSendSync + 'static,
    {
        self.with_definition(ProducerDefinition::new(name, signature.into(), producer))
    }

    /// Adds a producer of a value of known type.
    pub fn with_typed_producer<T, S, F>(
        self,
        key: ResourceKey<T>,
        signature: S,
        producer: F,
    ) -> Self
    where
        T: ResourceValue,
        S: Into<Signature>,
        F: Fn(&Arguments) -> Result<T, ErrorPtr> + MaybeSendSync + 'static,
    {
        self.with_producer(key.name(), signature, move |arguments| {
            producer(arguments).map(erase)
        })
    }

    /// Adds an already resolved value. Such values survive [Resolver::reset_cache], since there
    /// is no producer to recompute them.
    pub fn with_value<N: ToString, T: ResourceValue>(mut self, name: N, value: T) -> Self {
        self.constants.insert(name.to_string(), erase(value));
        self
    }

    /// Adds all producers registered with the `#[producer]` attribute.
    pub fn with_static_producers(self) -> Self {
        static_definitions().fold(self, |builder, definition| {
            builder.with_definition(definition)
        })
    }

    /// Builds resulting [Resolver], after checking the producer graph for cycles.
    pub fn build(self) -> Result<Resolver, ProducerRegistryError> {
        if let Some(error) = self.registration_error {
            return Err(error);
        }

        validate_definitions(&self.producer_registry.all_definitions())?;

        let mut resolver = Resolver::new(self.producer_registry, self.cache);
        resolver.constants = self.constants;
        resolver.unknown_parameter_policy = self.unknown_parameter_policy;
        resolver.seed_constants();

        Ok(resolver)
    }
}

/// Resolves arguments of functions by name, using producers from a [ProducerRegistry] and
/// storing created values in a [ValueCache](crate::cache::ValueCache) for reuse.
pub struct Resolver {
    producer_registry: ProducerRegistryPtr,
    cache: ValueCachePtr,
    constants: FxHashMap<String, ResourceValuePtr>,
    unknown_parameter_policy: UnknownParameterPolicy,
    names_under_construction: Vec<String>,
}

impl Resolver {
    /// Creates a new resolver with given registry and cache. The registry is not checked for
    /// cycles - they are detected during resolution instead.
    pub fn new(producer_registry: ProducerRegistryPtr, cache: ValueCachePtr) -> Self {
        Self {
            producer_registry,
            cache,
            constants: Default::default(),
            unknown_parameter_policy: Default::default(),
            names_under_construction: Default::default(),
        }
    }

    #[inline]
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::new()
    }

    /// Adds already resolved values, overwriting existing ones. Typically used for values
    /// available only at a later point, e.g. parsed from command line arguments.
    pub fn register_values<I, N>(&mut self, values: I)
    where
        I: IntoIterator<Item = (N, ResourceValuePtr)>,
        N: AsRef<str>,
    {
        for (name, value) in values {
            debug!(resource = name.as_ref(), "Registering value.");
            self.cache.store_value(name.as_ref(), value);
        }
    }

    /// Adds a single already resolved value.
    #[inline]
    pub fn register_value<N: AsRef<str>, T: ResourceValue>(&mut self, name: N, value: T) {
        self.register_values([(name, erase(value))]);
    }

    /// Removes all resolved values, so every resource gets recomputed on next resolution. Values
    /// given at construction are restored.
    pub fn reset_cache(&mut self) {
        debug!("Resetting resolved values.");
        self.cache.clear();
        self.seed_constants();
    }

    /// Checks if a value for given name is already present.
    #[inline]
    pub fn is_resolved(&self, name: &str) -> bool {
        self.cache.value(name).is_some()
    }

    /// Resolves all known parameters of given signature. Parameters without a value or producer
    /// are skipped, unless [UnknownParameterPolicy::Strict] is used.
    pub fn resolve(&mut self, signature: &Signature) -> Result<Arguments, ResolverError> {
        let mut arguments = Arguments::default();

        for name in signature.parameters() {
            match self.resolve_parameter(name)? {
                Some(value) => arguments.insert(name, value),
                None if self.unknown_parameter_policy == UnknownParameterPolicy::Strict
                    && !signature.is_external(name) =>
                {
                    return Err(ResolverError::UnknownResource(name.to_string()));
                }
                None => trace!(resource = name, "Skipping unknown parameter."),
            }
        }

        Ok(arguments)
    }

    fn resolve_parameter(
        &mut self,
        name: &str,
    ) -> Result<Option<ResourceValuePtr>, ResolverError> {
        if let Some(value) = self.cache.value(name) {
            trace!(resource = name, "Using resolved value.");
            return Ok(Some(value));
        }

        let Some(definition) = self.producer_registry.producer_by_name(name) else {
            return Ok(None);
        };

        if let Some(start) = self
            .names_under_construction
            .iter()
            .position(|entry| entry == name)
        {
            let mut cycle = self.names_under_construction[start..].to_vec();
            cycle.push(name.to_string());
            return Err(ResolverError::DependencyCycle(cycle));
        }

        self.names_under_construction.push(name.to_string());
        let value = self.resolve(&definition.signature).and_then(|arguments| {
            debug!(resource = name, "Invoking producer.");
            (definition.producer)(&arguments).map_err(ResolverError::Producer)
        });
        self.names_under_construction.pop();

        let value = value?;
        self.cache.store_value(name, value.clone());

        Ok(Some(value))
    }

    fn seed_constants(&mut self) {
        for (name, value) in &self.constants {
            self.cache.store_value(name, value.clone());
        }
    }
}

impl ResourceProvider for Resolver {
    fn resource(&mut self, name: &str) -> Result<Option<ResourceValuePtr>, ResolverError> {
        self.resolve_parameter(name)
    }
}
