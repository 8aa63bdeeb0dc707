//! Type-erased resource values and the [Arguments] handed to producers and handlers.

use crate::error::ResolverError;
use crate::resource::ResourceKey;
use fxhash::FxHashMap;
use itertools::Itertools;
use std::any::{type_name, Any};
use std::error::Error;
use std::fmt::{Debug, Formatter};
#[cfg(not(feature = "threadsafe"))]
use std::rc::Rc;
#[cfg(feature = "threadsafe")]
use std::sync::Arc;

#[cfg(not(feature = "threadsafe"))]
pub type ResourcePtr<T> = Rc<T>;
#[cfg(feature = "threadsafe")]
pub type ResourcePtr<T> = Arc<T>;

#[cfg(not(feature = "threadsafe"))]
pub type ResourceValuePtr = ResourcePtr<dyn Any + 'static>;
#[cfg(feature = "threadsafe")]
pub type ResourceValuePtr = ResourcePtr<dyn Any + Send + Sync + 'static>;

#[cfg(not(feature = "threadsafe"))]
pub type ErrorPtr = ResourcePtr<dyn Error + 'static>;
#[cfg(feature = "threadsafe")]
pub type ErrorPtr = ResourcePtr<dyn Error + Send + Sync + 'static>;

/// Marker for types which need to be `Send + Sync` with the `threadsafe` feature.
#[cfg(feature = "threadsafe")]
pub trait MaybeSendSync: Send + Sync {}
#[cfg(feature = "threadsafe")]
impl<T: Send + Sync + ?Sized> MaybeSendSync for T {}

/// Marker for types which need to be `Send + Sync` with the `threadsafe` feature.
#[cfg(not(feature = "threadsafe"))]
pub trait MaybeSendSync {}
#[cfg(not(feature = "threadsafe"))]
impl<T: ?Sized> MaybeSendSync for T {}

/// Marker for types which can be stored as resources.
pub trait ResourceValue: Any + MaybeSendSync {}
impl<T: Any + MaybeSendSync> ResourceValue for T {}

/// Wraps any error in an [ErrorPtr].
#[cfg(feature = "threadsafe")]
pub fn convert_error<E: Error + Send + Sync + 'static>(error: E) -> ErrorPtr {
    Arc::new(error) as ErrorPtr
}

/// Wraps any error in an [ErrorPtr].
#[cfg(not(feature = "threadsafe"))]
pub fn convert_error<E: Error + 'static>(error: E) -> ErrorPtr {
    Rc::new(error) as ErrorPtr
}

/// Wraps a concrete value in a type-erased [ResourceValuePtr].
#[inline]
pub fn erase<T: ResourceValue>(value: T) -> ResourceValuePtr {
    ResourcePtr::new(value) as ResourceValuePtr
}

fn downcast<T: ResourceValue>(
    name: &str,
    value: &ResourceValuePtr,
) -> Result<ResourcePtr<T>, ResolverError> {
    value
        .clone()
        .downcast::<T>()
        .map_err(|_| ResolverError::IncompatibleValue {
            name: name.to_string(),
            type_name: type_name::<T>(),
        })
}

/// Mapping from argument name to resolved value. Produced by
/// [Resolver::resolve](crate::resolver::Resolver::resolve) and passed to producers and
/// command handlers.
#[derive(Clone, Default)]
pub struct Arguments {
    values: FxHashMap<String, ResourceValuePtr>,
}

impl Arguments {
    /// Inserts a value, replacing any previous one with the same name.
    #[inline]
    pub fn insert<N: ToString>(&mut self, name: N, value: ResourceValuePtr) {
        self.values.insert(name.to_string(), value);
    }

    /// Inserts a concrete value.
    #[inline]
    pub fn insert_value<N: ToString, T: ResourceValue>(&mut self, name: N, value: T) {
        self.insert(name, erase(value));
    }

    /// Merges `other` into this mapping. Values from `other` take precedence on collision.
    pub fn merge(mut self, other: Arguments) -> Self {
        self.values.extend(other.values);
        self
    }

    /// Returns the raw value for given name.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&ResourceValuePtr> {
        self.values.get(name)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns all argument names in alphabetical order.
    pub fn names(&self) -> Vec<&str> {
        self.values.keys().map(String::as_str).sorted().collect()
    }

    /// Returns a value downcast to `T`. Fails with [ResolverError::UnknownResource] when missing
    /// and with [ResolverError::IncompatibleValue] when the stored value is of a different type.
    pub fn value_typed<T: ResourceValue>(
        &self,
        name: &str,
    ) -> Result<ResourcePtr<T>, ResolverError> {
        self.values
            .get(name)
            .ok_or_else(|| ResolverError::UnknownResource(name.to_string()))
            .and_then(|value| downcast(name, value))
    }

    /// Like [Arguments::value_typed], but returns `None` on a missing value.
    pub fn value_option<T: ResourceValue>(
        &self,
        name: &str,
    ) -> Result<Option<ResourcePtr<T>>, ResolverError> {
        self.values
            .get(name)
            .map(|value| downcast(name, value))
            .transpose()
    }

    /// Typesafe access with a [ResourceKey].
    #[inline]
    pub fn get_key<T: ResourceValue>(
        &self,
        key: &ResourceKey<T>,
    ) -> Result<ResourcePtr<T>, ResolverError> {
        self.value_typed(key.name())
    }

    /// Variant of [Arguments::value_typed] for producer bodies, which need an [ErrorPtr].
    #[inline]
    pub fn required<T: ResourceValue>(&self, name: &str) -> Result<ResourcePtr<T>, ErrorPtr> {
        self.value_typed(name).map_err(convert_error)
    }
}

impl Debug for Arguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

impl<N: ToString> FromIterator<(N, ResourceValuePtr)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (N, ResourceValuePtr)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }
}

impl IntoIterator for Arguments {
    type Item = (String, ResourceValuePtr);
    type IntoIter = std::collections::hash_map::IntoIter<String, ResourceValuePtr>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}
