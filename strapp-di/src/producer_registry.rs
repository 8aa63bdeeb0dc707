//! Functionality related to registering producer definitions. The
//! [Resolver](crate::resolver::Resolver) invokes producers based on those definitions, which can
//! be registered automatically or manually.

use crate::error::ProducerRegistryError;
use crate::resource::Signature;
use crate::value::{Arguments, ErrorPtr, MaybeSendSync, ResourcePtr, ResourceValuePtr};
use derivative::Derivative;
use fxhash::FxHashMap;
use itertools::Itertools;
#[cfg(test)]
use mockall::automock;
use tracing::debug;

/// Type-erased producer function.
pub trait ProducerFunction:
    Fn(&Arguments) -> Result<ResourceValuePtr, ErrorPtr> + MaybeSendSync
{
}
impl<F: Fn(&Arguments) -> Result<ResourceValuePtr, ErrorPtr> + MaybeSendSync> ProducerFunction
    for F
{
}

pub type ProducerPtr = ResourcePtr<dyn ProducerFunction>;

/// Definition for a producer registered in a registry.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct ProducerDefinition {
    /// Name of the resource created by the producer.
    pub name: String,

    /// Names of resources the producer depends on.
    pub signature: Signature,

    /// Function creating the resource from resolved dependencies.
    #[derivative(Debug = "ignore")]
    pub producer: ProducerPtr,
}

impl ProducerDefinition {
    pub fn new<N, F>(name: N, signature: Signature, producer: F) -> Self
    where
        N: ToString,
        F: Fn(&Arguments) -> Result<ResourceValuePtr, ErrorPtr> + MaybeSendSync + 'static,
    {
        Self {
            name: name.to_string(),
            signature,
            producer: ResourcePtr::new(producer) as ProducerPtr,
        }
    }
}

/// A registry of producer definitions used when resolving resources.
#[cfg_attr(test, automock)]
pub trait ProducerRegistry: MaybeSendSync {
    /// Adds a new definition. Handling of duplicate names is registry-dependent.
    fn register_producer(
        &mut self,
        definition: ProducerDefinition,
    ) -> Result<(), ProducerRegistryError>;

    /// Returns a definition with given name.
    fn producer_by_name(&self, name: &str) -> Option<ProducerDefinition>;

    /// Checks if there's a definition with given name.
    fn is_name_registered(&self, name: &str) -> bool;

    /// Returns a copy of the whole registry as a map.
    fn all_definitions(&self) -> FxHashMap<String, ProducerDefinition>;
}

/// Registry of producer definitions, optionally initialized from statically registered
/// definitions.
#[derive(Clone, Debug, Default)]
pub struct StaticProducerRegistry {
    definitions: FxHashMap<String, ProducerDefinition>,
    allow_definition_overriding: bool,
}

impl StaticProducerRegistry {
    /// Creates an empty registry.
    pub fn new(allow_definition_overriding: bool) -> Self {
        Self {
            definitions: Default::default(),
            allow_definition_overriding,
        }
    }

    /// Creates a registry containing all producers registered with the `#[producer]` attribute.
    pub fn with_static_producers(
        allow_definition_overriding: bool,
    ) -> Result<Self, ProducerRegistryError> {
        let mut registry = Self::new(allow_definition_overriding);
        registry.register_static_producers()?;
        Ok(registry)
    }

    /// Adds all producers registered with the `#[producer]` attribute.
    pub fn register_static_producers(&mut self) -> Result<(), ProducerRegistryError> {
        static_definitions().try_for_each(|definition| self.register_producer(definition))
    }
}

impl ProducerRegistry for StaticProducerRegistry {
    fn register_producer(
        &mut self,
        definition: ProducerDefinition,
    ) -> Result<(), ProducerRegistryError> {
        if !self.allow_definition_overriding && self.definitions.contains_key(&definition.name) {
            return Err(ProducerRegistryError::DuplicateProducerName(
                definition.name,
            ));
        }

        debug!(producer = %definition.name, "Registering producer.");

        self.definitions.insert(definition.name.clone(), definition);
        Ok(())
    }

    #[inline]
    fn producer_by_name(&self, name: &str) -> Option<ProducerDefinition> {
        self.definitions.get(name).cloned()
    }

    #[inline]
    fn is_name_registered(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    #[inline]
    fn all_definitions(&self) -> FxHashMap<String, ProducerDefinition> {
        self.definitions.clone()
    }
}

/// Returns definitions of all producers registered with the `#[producer]` attribute, sorted by
/// name.
pub fn static_definitions() -> impl Iterator<Item = ProducerDefinition> {
    inventory::iter::<internal::ProducerRegisterer>
        .into_iter()
        .map(|registerer| (registerer.register)())
        .sorted_by(|left, right| left.name.cmp(&right.name))
}

/// Checks if the dependency graph formed by given definitions is acyclic. Dependencies on names
/// without a producer are ignored, since they can be satisfied by registered values. External
/// parameters are not: the resolver still uses a producer for them when one exists.
pub fn validate_definitions(
    definitions: &FxHashMap<String, ProducerDefinition>,
) -> Result<(), ProducerRegistryError> {
    graph::find_cycle(definitions)
        .map(|cycle| Err(ProducerRegistryError::DependencyCycle(cycle)))
        .unwrap_or(Ok(()))
}

mod graph {
    use crate::producer_registry::ProducerDefinition;
    use fxhash::{FxHashMap, FxHashSet};
    use itertools::Itertools;

    struct CycleSearch<'a> {
        definitions: &'a FxHashMap<String, ProducerDefinition>,
        visited: FxHashSet<&'a str>,
        path: Vec<&'a str>,
    }

    impl<'a> CycleSearch<'a> {
        fn visit(&mut self, name: &'a str) -> Option<Vec<String>> {
            if let Some(start) = self.path.iter().position(|entry| *entry == name) {
                return Some(
                    self.path[start..]
                        .iter()
                        .chain([&name])
                        .map(|entry| entry.to_string())
                        .collect(),
                );
            }

            if !self.visited.insert(name) {
                return None;
            }

            let definitions = self.definitions;
            let definition = definitions.get(name)?;

            self.path.push(name);
            let cycle = definition
                .signature
                .parameters()
                .filter(|dependency| definitions.contains_key(*dependency))
                .find_map(|dependency| self.visit(dependency));
            self.path.pop();

            cycle
        }
    }

    pub(super) fn find_cycle(
        definitions: &FxHashMap<String, ProducerDefinition>,
    ) -> Option<Vec<String>> {
        let mut search = CycleSearch {
            definitions,
            visited: Default::default(),
            path: Default::default(),
        };

        definitions
            .keys()
            .map(String::as_str)
            .sorted()
            .find_map(|name| search.visit(name))
    }
}

#[doc(hidden)]
pub mod internal {
    use crate::producer_registry::ProducerDefinition;
    use inventory::collect;
    pub use inventory::submit;

    pub struct ProducerRegisterer {
        pub register: fn() -> ProducerDefinition,
    }

    collect!(ProducerRegisterer);
}
