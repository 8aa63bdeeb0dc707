//! Resolved resources are kept in a [ValueCache], which decides when to reuse a value. The
//! resolver uses a single cache for its whole lifetime, so every resource behaves like a lazily
//! initialized singleton until the cache is reset.

use crate::value::{MaybeSendSync, ResourceValuePtr};
use fxhash::FxHashMap;
#[cfg(test)]
use mockall::automock;

pub type ValueCachePtr = Box<dyn ValueCache>;

/// A cache containing resolved resource values.
#[cfg_attr(test, automock)]
pub trait ValueCache: MaybeSendSync {
    /// Gets a value for the given resource name, if available.
    fn value(&self, name: &str) -> Option<ResourceValuePtr>;

    /// Stores given value, replacing any previous one.
    fn store_value(&mut self, name: &str, value: ResourceValuePtr);

    /// Removes all values.
    fn clear(&mut self);
}

/// Cache keeping every value until explicitly cleared.
#[derive(Default)]
pub struct MemoizingCache {
    values: FxHashMap<String, ResourceValuePtr>,
}

impl ValueCache for MemoizingCache {
    #[inline]
    fn value(&self, name: &str) -> Option<ResourceValuePtr> {
        self.values.get(name).cloned()
    }

    #[inline]
    fn store_value(&mut self, name: &str, value: ResourceValuePtr) {
        self.values.insert(name.to_string(), value);
    }

    #[inline]
    fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::{MemoizingCache, ValueCache};
    use crate::value::erase;

    #[test]
    fn should_store_values() {
        let mut cache = MemoizingCache::default();
        cache.store_value("config", erase(1));

        assert!(cache.value("config").is_some());
        assert!(cache.value("engine").is_none());
    }

    #[test]
    fn should_replace_values() {
        let mut cache = MemoizingCache::default();
        cache.store_value("config", erase(1));
        cache.store_value("config", erase(2));

        let value = cache.value("config").unwrap().downcast::<i32>().unwrap();
        assert_eq!(*value, 2);
    }

    #[test]
    fn should_clear_values() {
        let mut cache = MemoizingCache::default();
        cache.store_value("config", erase(1));
        cache.clear();

        assert!(cache.value("config").is_none());
    }
}
