use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Visual style of a text object. Part of the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: u32,
    /// Packed 0xRRGGBB.
    pub color: u32,
    pub bold: bool,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: "monospace".to_string(),
            font_size: 16,
            color: 0xffffff,
            bold: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextKey {
    pub text: String,
    pub style: TextStyle,
}

/// Creates and destroys the host's text objects.
pub trait TextFactory {
    type Handle: Clone;

    fn create(&mut self, text: &str, style: &TextStyle, position: Vec2) -> Self::Handle;

    /// Move an existing object; called on every cache hit.
    fn reposition(&mut self, handle: &Self::Handle, position: Vec2);

    fn destroy(&mut self, handle: Self::Handle);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextCacheConfig {
    pub max_cache_size: usize,
    /// Entries unused for longer than this are recreated on next request.
    pub cache_timeout_ms: f64,
}

impl Default for TextCacheConfig {
    fn default() -> Self {
        Self {
            max_cache_size: 100,
            cache_timeout_ms: 30_000.0,
        }
    }
}

#[derive(Debug)]
struct CachedText<H> {
    handle: H,
    last_used_ms: f64,
    use_count: u64,
    recency: u64,
}

/// Whether a request was served from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLookup {
    Hit,
    Miss,
}

/// LRU cache of text objects keyed by content and style.
pub struct TextCache<F: TextFactory> {
    config: TextCacheConfig,
    factory: F,
    entries: HashMap<TextKey, CachedText<F::Handle>>,
    tick: u64,
    evictions: u64,
}

impl<F: TextFactory> TextCache<F> {
    pub fn new(config: TextCacheConfig, factory: F) -> Self {
        Self {
            config,
            factory,
            entries: HashMap::new(),
            tick: 0,
            evictions: 0,
        }
    }

    /// Fetch or create the text object for `(text, style)` and move it to
    /// `position`.
    pub fn get(
        &mut self,
        text: &str,
        style: &TextStyle,
        position: Vec2,
        now_ms: f64,
    ) -> (F::Handle, CacheLookup) {
        self.tick += 1;
        let key = TextKey {
            text: text.to_string(),
            style: style.clone(),
        };

        let expired = self
            .entries
            .get(&key)
            .is_some_and(|e| now_ms - e.last_used_ms > self.config.cache_timeout_ms);
        if expired {
            if let Some(stale) = self.entries.remove(&key) {
                tracing::debug!(text, "text cache entry expired");
                self.factory.destroy(stale.handle);
            }
        }

        if let Some(entry) = self.entries.get_mut(&key) {
            entry.last_used_ms = now_ms;
            entry.use_count += 1;
            entry.recency = self.tick;
            self.factory.reposition(&entry.handle, position);
            return (entry.handle.clone(), CacheLookup::Hit);
        }

        if self.config.max_cache_size == 0 {
            return (self.factory.create(text, style, position), CacheLookup::Miss);
        }
        while self.entries.len() >= self.config.max_cache_size {
            self.evict_lru();
        }
        let handle = self.factory.create(text, style, position);
        self.entries.insert(
            key,
            CachedText {
                handle: handle.clone(),
                last_used_ms: now_ms,
                use_count: 1,
                recency: self.tick,
            },
        );
        (handle, CacheLookup::Miss)
    }

    /// Create an object without touching the cache. The caller owns it.
    pub fn create_uncached(&mut self, text: &str, style: &TextStyle, position: Vec2) -> F::Handle {
        self.factory.create(text, style, position)
    }

    /// Destroy an object from [`create_uncached`](Self::create_uncached).
    pub fn destroy_uncached(&mut self, handle: F::Handle) {
        self.factory.destroy(handle);
    }

    fn evict_lru(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.recency)
            .map(|(k, _)| k.clone());
        if let Some(key) = oldest {
            if let Some(entry) = self.entries.remove(&key) {
                tracing::debug!(text = %key.text, uses = entry.use_count, "evicting text cache entry");
                self.factory.destroy(entry.handle);
                self.evictions += 1;
            }
        }
    }

    /// Destroy entries unused for longer than the timeout. Returns how many.
    pub fn prune_expired(&mut self, now_ms: f64) -> usize {
        let timeout = self.config.cache_timeout_ms;
        let stale: Vec<TextKey> = self
            .entries
            .iter()
            .filter(|(_, e)| now_ms - e.last_used_ms > timeout)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &stale {
            if let Some(entry) = self.entries.remove(key) {
                self.factory.destroy(entry.handle);
            }
        }
        stale.len()
    }

    /// Destroy every cached object.
    pub fn clear(&mut self) {
        for (_, entry) in self.entries.drain() {
            self.factory.destroy(entry.handle);
        }
    }

    /// Number of cached text objects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `(text, style)` is cached, expired or not.
    pub fn contains(&self, text: &str, style: &TextStyle) -> bool {
        self.entries.contains_key(&TextKey {
            text: text.to_string(),
            style: style.clone(),
        })
    }

    /// Requests served by the cached entry, including the one that created it.
    pub fn use_count(&self, text: &str, style: &TextStyle) -> Option<u64> {
        self.entries
            .get(&TextKey {
                text: text.to_string(),
                style: style.clone(),
            })
            .map(|e| e.use_count)
    }

    /// Entries dropped to make room since construction.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    pub fn config(&self) -> &TextCacheConfig {
        &self.config
    }

    /// The host-side text factory.
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Mutable factory access. Handles destroyed here must not be cached.
    pub fn factory_mut(&mut self) -> &mut F {
        &mut self.factory
    }
}
