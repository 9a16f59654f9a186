use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use playground_common::Idea;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

struct Entry<T> {
    value: T,
    stored_at: Instant,
}

#[derive(Default)]
struct CacheState {
    ideas: Option<Entry<BTreeMap<String, Idea>>>,
    dimensions: Option<Entry<Value>>,
}

/// Last fetched idea list and dimensions registry.
///
/// Shared between clients through an `Arc`. `PlaygroundClient` fills it on
/// unfiltered reads and clears it after every successful mutation. With a
/// `ttl`, entries older than the ttl are treated as missing.
pub struct ResponseCache {
    ttl: Option<Duration>,
    state: RwLock<CacheState>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCache {
    /// Cache without expiry; entries live until invalidated.
    pub fn new() -> Self {
        Self {
            ttl: None,
            state: RwLock::new(CacheState::default()),
        }
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            state: RwLock::new(CacheState::default()),
        }
    }

    fn fresh<T: Clone>(&self, entry: &Option<Entry<T>>) -> Option<T> {
        let entry = entry.as_ref()?;
        match self.ttl {
            Some(ttl) if entry.stored_at.elapsed() > ttl => None,
            _ => Some(entry.value.clone()),
        }
    }

    pub async fn ideas(&self) -> Option<BTreeMap<String, Idea>> {
        let state = self.state.read().await;
        self.fresh(&state.ideas)
    }

    pub async fn store_ideas(&self, ideas: BTreeMap<String, Idea>) {
        let mut state = self.state.write().await;
        state.ideas = Some(Entry {
            value: ideas,
            stored_at: Instant::now(),
        });
    }

    pub async fn dimensions(&self) -> Option<Value> {
        let state = self.state.read().await;
        self.fresh(&state.dimensions)
    }

    pub async fn store_dimensions(&self, registry: Value) {
        let mut state = self.state.write().await;
        state.dimensions = Some(Entry {
            value: registry,
            stored_at: Instant::now(),
        });
    }

    /// Drop both entries.
    pub async fn invalidate(&self) {
        let mut state = self.state.write().await;
        if state.ideas.is_some() || state.dimensions.is_some() {
            debug!("Invalidating response cache");
        }
        *state = CacheState::default();
    }

    pub async fn is_empty(&self) -> bool {
        let state = self.state.read().await;
        state.ideas.is_none() && state.dimensions.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playground_common::Dimensions;

    fn sample() -> BTreeMap<String, Idea> {
        let idea = Idea {
            title: "Cached".into(),
            content: "c".into(),
            content_json: None,
            dimensions: Dimensions::default(),
            sub_ideas: vec![],
            order: 1,
            created_at: String::new(),
            updated_at: String::new(),
        };
        BTreeMap::from([("a".to_string(), idea)])
    }

    #[tokio::test]
    async fn test_store_and_read_back() {
        let cache = ResponseCache::new();
        assert!(cache.is_empty().await);
        assert!(cache.ideas().await.is_none());

        cache.store_ideas(sample()).await;
        cache.store_dimensions(serde_json::json!({"k": 1})).await;
        assert_eq!(cache.ideas().await, Some(sample()));
        assert_eq!(cache.dimensions().await, Some(serde_json::json!({"k": 1})));
    }

    #[tokio::test]
    async fn test_invalidate_clears_everything() {
        let cache = ResponseCache::new();
        cache.store_ideas(sample()).await;
        cache.store_dimensions(serde_json::json!({})).await;

        cache.invalidate().await;
        assert!(cache.is_empty().await);
        assert!(cache.dimensions().await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entries_are_missing() {
        let cache = ResponseCache::with_ttl(Duration::from_millis(0));
        cache.store_ideas(sample()).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(cache.ideas().await.is_none());
    }
}
