// Derived-data cache (dashboard aggregates and the like) keyed by record type
// and reporting year, invalidated by the workflow after committed transitions.

use async_trait::async_trait;
use moka::future::Cache;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::CacheConfig;
use crate::error::HookError;
use crate::workflow::hooks::{CacheInvalidator, CacheScope};
use crate::workflow::record::RecordType;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub record_type: &'static str,
    pub year: i32,
}

#[derive(Clone)]
pub struct DerivedCache {
    entries: Cache<CacheKey, Arc<Value>>,
    enabled: bool,
}

impl DerivedCache {
    pub fn new(config: &CacheConfig) -> Self {
        let entries = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(Duration::from_secs(config.ttl_seconds))
            .support_invalidation_closures()
            .build();
        Self {
            entries,
            enabled: config.enabled,
        }
    }

    pub async fn get(&self, record_type: &RecordType, year: i32) -> Option<Arc<Value>> {
        if !self.enabled {
            return None;
        }
        self.entries
            .get(&CacheKey {
                record_type: record_type.key,
                year,
            })
            .await
    }

    pub async fn insert(&self, record_type: &RecordType, year: i32, value: Value) {
        if !self.enabled {
            return;
        }
        self.entries
            .insert(
                CacheKey {
                    record_type: record_type.key,
                    year,
                },
                Arc::new(value),
            )
            .await;
    }
}

#[async_trait]
impl CacheInvalidator for DerivedCache {
    async fn invalidate(&self, record_type: &RecordType, scope: CacheScope) -> Result<(), HookError> {
        debug!(record_type = %record_type.key, scope = ?scope, "Invalidating derived cache");
        match scope {
            CacheScope::Year(year) => {
                self.entries
                    .invalidate(&CacheKey {
                        record_type: record_type.key,
                        year,
                    })
                    .await;
            }
            CacheScope::AllYears => {
                let key = record_type.key;
                self.entries
                    .invalidate_entries_if(move |cached, _| cached.record_type == key)
                    .map_err(|e| HookError::Cache(e.to_string()))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::record::{FOREST_FIRE, REFORESTATION};
    use serde_json::json;

    fn cache() -> DerivedCache {
        DerivedCache::new(&CacheConfig::default())
    }

    #[tokio::test]
    async fn test_year_scope_only_drops_that_year() {
        let cache = cache();
        cache.insert(&REFORESTATION, 2023, json!({"hectares": 10})).await;
        cache.insert(&REFORESTATION, 2024, json!({"hectares": 12})).await;

        cache.invalidate(&REFORESTATION, CacheScope::Year(2024)).await.unwrap();

        assert!(cache.get(&REFORESTATION, 2024).await.is_none());
        assert_eq!(
            cache.get(&REFORESTATION, 2023).await.as_deref(),
            Some(&json!({"hectares": 10}))
        );
    }

    #[tokio::test]
    async fn test_all_years_scope_is_per_record_type() {
        let cache = cache();
        cache.insert(&REFORESTATION, 2023, json!(1)).await;
        cache.insert(&REFORESTATION, 2024, json!(2)).await;
        cache.insert(&FOREST_FIRE, 2024, json!(3)).await;

        cache.invalidate(&REFORESTATION, CacheScope::AllYears).await.unwrap();
        // Predicate invalidation is applied lazily on read.
        assert!(cache.get(&REFORESTATION, 2023).await.is_none());
        assert!(cache.get(&REFORESTATION, 2024).await.is_none());
        assert!(cache.get(&FOREST_FIRE, 2024).await.is_some());
    }

    #[tokio::test]
    async fn test_disabled_cache_stores_nothing() {
        let cache = DerivedCache::new(&CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        });
        cache.insert(&REFORESTATION, 2024, json!(1)).await;
        assert!(cache.get(&REFORESTATION, 2024).await.is_none());
    }
}
