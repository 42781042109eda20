mod disk;
mod key;
mod memory;

pub use disk::DiskCache;
pub use key::CacheKey;
pub use memory::MemoryCache;

use crate::config::CacheConfig;
use crate::error::Result;

/// Combined translation cache with memory and disk layers.
///
/// Cloning is cheap and shares the underlying stores, so one cache can back
/// many translation clients. The disk layer is optional and persists across
/// runs.
#[derive(Clone)]
pub struct TranslationCache {
    memory: Option<MemoryCache>,
    disk: Option<DiskCache>,
}

impl TranslationCache {
    /// Create a new translation cache from configuration
    pub fn new(config: &CacheConfig) -> Result<Self> {
        let memory = if config.memory_enabled {
            Some(MemoryCache::new(
                config.memory_max_entries,
                config.memory_ttl_seconds,
            ))
        } else {
            None
        };

        let disk = if config.disk_enabled {
            let path = config
                .disk_path
                .clone()
                .unwrap_or_else(crate::util::translation_cache_path);
            Some(DiskCache::new(path)?)
        } else {
            None
        };

        Ok(Self { memory, disk })
    }

    /// Get a cached translation
    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        let key_str = key.as_str();

        if let Some(ref memory) = self.memory
            && let Some(value) = memory.get(key_str).await
        {
            return Some(value);
        }

        if let Some(ref disk) = self.disk
            && let Some(value) = disk.get(key_str)
        {
            // Populate memory cache on disk hit
            if let Some(ref memory) = self.memory {
                memory.insert(key_str.to_string(), value.clone()).await;
            }
            return Some(value);
        }

        None
    }

    /// Store a translation in cache
    pub async fn insert(&self, key: &CacheKey, value: &str) {
        let key_str = key.as_str();

        if let Some(ref memory) = self.memory {
            memory.insert(key_str.to_string(), value.to_string()).await;
        }

        if let Some(ref disk) = self.disk {
            let _ = disk.insert(key_str, value);
        }
    }

    /// Check if a key exists in cache
    pub async fn contains(&self, key: &CacheKey) -> bool {
        self.get(key).await.is_some()
    }

    /// Clear all caches
    pub fn clear(&self) {
        if let Some(ref memory) = self.memory {
            memory.clear();
        }

        if let Some(ref disk) = self.disk {
            let _ = disk.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Lang;

    fn memory_only() -> TranslationCache {
        #[allow(clippy::unwrap_used)]
        TranslationCache::new(&CacheConfig {
            memory_enabled: true,
            disk_enabled: false,
            ..CacheConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let cache = memory_only();
        let key = CacheKey::from_chunk("Hola", "mock", &Lang::new("auto"), &Lang::new("es"));

        assert!(cache.get(&key).await.is_none());
        cache.insert(&key, "Hello").await;
        assert_eq!(cache.get(&key).await.as_deref(), Some("Hello"));
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = memory_only();
        let key = CacheKey::from_chunk("Hola", "mock", &Lang::new("auto"), &Lang::new("es"));

        cache.insert(&key, "Hello").await;
        cache.clear();
        // moka invalidation is lazy but get() must not return stale entries
        assert!(cache.get(&key).await.is_none());
    }
}
