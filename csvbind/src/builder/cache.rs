//! Model Cache - Build each record model once and share it
//!
//! Models are keyed by record type and the set of active groups.

use once_cell::sync::Lazy;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use super::mapping::RecordModel;
use crate::directive::Group;
use crate::error::ConfigError;
use crate::logs::log_info;

type CacheKey = (TypeId, Vec<Group>);
type CachedModel = Arc<dyn Any + Send + Sync>;

static GLOBAL_CACHE: Lazy<RecordModelCache> = Lazy::new(RecordModelCache::new);

/// Hit and build counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub builds: u64,
    pub entries: usize,
}

/// Shared record models, safe to use from many threads.
///
/// Builds run outside the lock. When two threads build the same model,
/// the first one inserted is kept and handed to both.
#[derive(Default)]
pub struct RecordModelCache {
    models: RwLock<HashMap<CacheKey, CachedModel>>,
    hits: AtomicU64,
    builds: AtomicU64,
}

impl RecordModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide cache used by `RecordModel::for_type`
    pub fn global() -> &'static RecordModelCache {
        &GLOBAL_CACHE
    }

    /// Cached model of `T` for `groups`, building it with `build` on a miss.
    pub fn get_or_build<T, F>(
        &self,
        groups: &[Group],
        build: F,
    ) -> Result<Arc<RecordModel<T>>, ConfigError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Result<RecordModel<T>, ConfigError>,
    {
        let key = cache_key::<T>(groups);

        if let Some(model) = self.lookup::<T>(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(model);
        }

        let built = Arc::new(build()?);
        self.builds.fetch_add(1, Ordering::Relaxed);
        log_info(format!("Cached record model '{}'", built.name()));

        let mut models = self.models.write().unwrap_or_else(|e| e.into_inner());
        let entry = models
            .entry(key)
            .or_insert_with(|| Arc::clone(&built) as CachedModel);
        Ok(Arc::clone(entry).downcast::<RecordModel<T>>().unwrap_or(built))
    }

    fn lookup<T: Send + Sync + 'static>(&self, key: &CacheKey) -> Option<Arc<RecordModel<T>>> {
        let models = self.models.read().unwrap_or_else(|e| e.into_inner());
        models
            .get(key)
            .and_then(|m| Arc::clone(m).downcast::<RecordModel<T>>().ok())
    }

    pub fn contains<T: 'static>(&self, groups: &[Group]) -> bool {
        let models = self.models.read().unwrap_or_else(|e| e.into_inner());
        models.contains_key(&cache_key::<T>(groups))
    }

    pub fn clear(&self) {
        self.models.write().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            builds: self.builds.load(Ordering::Relaxed),
            entries: self.models.read().unwrap_or_else(|e| e.into_inner()).len(),
        }
    }
}

/// Group order and repetition do not matter.
fn cache_key<T: 'static>(groups: &[Group]) -> CacheKey {
    let mut groups = groups.to_vec();
    groups.sort();
    groups.dedup();
    (TypeId::of::<T>(), groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::mapping::build_record_model;
    use crate::builder::schema::{ColumnDef, FieldAccess, RecordSchema};
    use crate::config::Configuration;
    use crate::models::{DynamicRecord, ValueType};
    use std::thread;

    fn schema() -> RecordSchema<DynamicRecord> {
        RecordSchema::new("Cached").column(ColumnDef::new(
            1,
            "id",
            ValueType::Integer,
            FieldAccess::dynamic("id"),
        ))
    }

    fn build() -> Result<RecordModel<DynamicRecord>, ConfigError> {
        build_record_model(&schema(), &Configuration::standard(), &[])
    }

    #[test]
    fn test_second_lookup_hits() {
        let cache = RecordModelCache::new();
        let first = cache.get_or_build::<DynamicRecord, _>(&[], build).unwrap();
        let second = cache
            .get_or_build::<DynamicRecord, _>(&[], || panic!("must not rebuild"))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats(), CacheStats { hits: 1, builds: 1, entries: 1 });
    }

    #[test]
    fn test_group_order_ignored() {
        let cache = RecordModelCache::new();
        let a = Group::new("a");
        let b = Group::new("b");
        cache.get_or_build::<DynamicRecord, _>(&[a.clone(), b.clone()], build).unwrap();
        assert!(cache.contains::<DynamicRecord>(&[b, a]));
        assert!(!cache.contains::<DynamicRecord>(&[]));
    }

    #[test]
    fn test_concurrent_builds_share_one_model() {
        let cache = Arc::new(RecordModelCache::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.get_or_build::<DynamicRecord, _>(&[], build).unwrap())
            })
            .collect();
        let models: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(models.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(cache.stats().entries, 1);
    }

    #[test]
    fn test_build_error_not_cached() {
        let cache = RecordModelCache::new();
        let err = cache
            .get_or_build::<DynamicRecord, _>(&[], || {
                let schema = RecordSchema::<DynamicRecord>::new("Empty");
                build_record_model(&schema, &Configuration::standard(), &[])
            })
            .unwrap_err();
        assert_eq!(err, ConfigError::NoColumns("Empty".to_string()));
        assert_eq!(cache.stats().entries, 0);
    }
}
