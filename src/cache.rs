//! Thread-safe result cache with time-based expiry.
//!
//! Entries are replaced, never mutated. Expired entries are swept lazily: by `put` once the
//! cache passes its sweep ratio, and by every `statistics` call. There is no background timer.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::render::RenderedImage;
use crate::request::GenerationRequest;

/// Source of the current time for expiry checks.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self { base: Instant::now(), offset: Mutex::new(Duration::ZERO) }
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

/// SHA-256 digest of everything that influences the rendered pixels.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    pub fn derive(request: &GenerationRequest) -> Self {
        let mut hasher = Sha256::new();
        hasher.update([request.symbology().tag()]);
        hasher.update(request.correction_level().to_le_bytes());
        hasher.update(request.pixel_density().to_le_bytes());
        // Length prefix keeps the payload boundary unambiguous.
        hasher.update((request.payload().len() as u64).to_le_bytes());
        hasher.update(request.payload());
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0[..8]))
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({self})")
    }
}

struct CacheEntry {
    image: RenderedImage,
    created_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.created_at) > window
    }
}

/// Point-in-time view returned by [`ResultCache::statistics`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStatistics {
    /// Entries present before the sweep, expired ones included.
    pub total: usize,
    pub valid: usize,
    pub expired: usize,
    pub capacity: usize,
    /// `total / capacity` as a percentage.
    pub utilization: f64,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStatistics {
    /// Fraction of lookups served from the cache, in `0.0..=1.0`.
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

impl fmt::Display for CacheStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries ({} valid, {} expired), {:.1}% of {} used, hit ratio {:.2}",
            self.total,
            self.valid,
            self.expired,
            self.utilization,
            self.capacity,
            self.hit_ratio()
        )
    }
}

/// Bounded map from [`CacheKey`] to [`RenderedImage`].
///
/// Readers share the lock; `put`, `clear` and `statistics` take it exclusively. Images are
/// cloned on the way in and on the way out, and the clone on `put` happens before locking.
pub struct ResultCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    capacity: usize,
    expiry: Duration,
    sweep_ratio: f64,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::with_capacity(config.capacity)),
            capacity: config.capacity,
            expiry: config.expiry(),
            sweep_ratio: config.sweep_ratio,
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Returns a copy of the cached image if present and not expired.
    pub fn get(&self, key: &CacheKey) -> Option<RenderedImage> {
        let now = self.clock.now();
        let found = {
            let entries = self.entries.read();
            entries
                .get(key)
                .filter(|entry| !entry.is_expired(now, self.expiry))
                .and_then(|entry| entry.image.try_clone())
        };

        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        debug!(%key, hit = found.is_some(), "cache lookup");
        found
    }

    /// Stores a copy of `image`. Returns `false` if the entry was skipped.
    ///
    /// Once the cache is at the sweep ratio, expired entries are removed first. A full cache
    /// never evicts live entries; the new one is skipped instead.
    pub fn put(&self, key: CacheKey, image: &RenderedImage) -> bool {
        let Some(image) = image.try_clone() else {
            warn!(%key, bytes = image.byte_len(), "could not copy image, skipping cache");
            return false;
        };

        let now = self.clock.now();
        let mut entries = self.entries.write();
        if entries.len() as f64 >= self.capacity as f64 * self.sweep_ratio {
            let removed = Self::sweep(&mut entries, now, self.expiry);
            if removed > 0 {
                debug!(removed, remaining = entries.len(), "swept expired cache entries");
            }
        }

        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            warn!(%key, capacity = self.capacity, "cache full, skipping entry");
            return false;
        }

        entries.insert(key, CacheEntry { image, created_at: now });
        true
    }

    /// Drops every entry. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write();
        let removed = entries.len();
        entries.clear();
        debug!(removed, "cache cleared");
        removed
    }

    /// Counts entries, then removes the expired ones.
    pub fn statistics(&self) -> CacheStatistics {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let total = entries.len();
        let expired = entries.values().filter(|e| e.is_expired(now, self.expiry)).count();
        if expired > 0 {
            Self::sweep(&mut entries, now, self.expiry);
        }

        let utilization = if self.capacity > 0 {
            total as f64 / self.capacity as f64 * 100.0
        } else {
            0.0
        };
        CacheStatistics {
            total,
            valid: total - expired,
            expired,
            capacity: self.capacity,
            utilization,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep(entries: &mut HashMap<CacheKey, CacheEntry>, now: Instant, expiry: Duration) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now, expiry));
        before - entries.len()
    }
}

impl fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::SymbolGrid;
    use crate::render::PixelRenderer;

    fn config(capacity: usize) -> CacheConfig {
        CacheConfig { capacity, expiry_secs: 60, ..CacheConfig::default() }
    }

    fn image(seed: u32) -> RenderedImage {
        let grid = SymbolGrid::from_fn(4, 4, |x, y| (x + y + seed) % 3 == 0);
        PixelRenderer::default().render(&grid).unwrap()
    }

    fn key(text: &str) -> CacheKey {
        CacheKey::derive(&GenerationRequest::from_text(text))
    }

    #[test]
    fn test_key_depends_on_every_input() {
        let base = GenerationRequest::new("abc", 2, 300);
        let k = CacheKey::derive(&base);
        assert_eq!(k, CacheKey::derive(&base.clone()));
        assert_ne!(k, CacheKey::derive(&GenerationRequest::new("abd", 2, 300)));
        assert_ne!(k, CacheKey::derive(&GenerationRequest::new("abc", 1, 300)));
        assert_ne!(k, CacheKey::derive(&GenerationRequest::new("abc", 2, 301)));
        assert_ne!(
            k,
            CacheKey::derive(&base.clone().with_symbology(crate::request::Symbology::Aztec))
        );
        assert_eq!(k.to_string().len(), 16);
    }

    #[test]
    fn test_get_returns_independent_copy() {
        let cache = ResultCache::new(&config(10));
        let original = image(0);
        assert!(cache.put(key("a"), &original));

        let mut first = cache.get(&key("a")).unwrap();
        first.pixels_mut().fill(0x42);
        let second = cache.get(&key("a")).unwrap();
        assert_eq!(second, original);
    }

    #[test]
    fn test_entries_expire_after_window() {
        let clock = Arc::new(ManualClock::new());
        let cache = ResultCache::with_clock(&config(10), clock.clone());
        cache.put(key("a"), &image(0));

        clock.advance(Duration::from_secs(60));
        assert!(cache.get(&key("a")).is_some(), "exactly at the window is still valid");

        clock.advance(Duration::from_secs(1));
        assert!(cache.get(&key("a")).is_none());

        let stats = cache.statistics();
        assert_eq!((stats.total, stats.valid, stats.expired), (1, 0, 1));

        let stats = cache.statistics();
        assert_eq!((stats.total, stats.valid, stats.expired), (0, 0, 0));
    }

    #[test]
    fn test_put_sweeps_expired_entries_near_capacity() {
        let clock = Arc::new(ManualClock::new());
        let cache = ResultCache::with_clock(&config(5), clock.clone());
        for (i, name) in ["a", "b", "c", "d"].iter().enumerate() {
            assert!(cache.put(key(name), &image(i as u32)));
        }
        clock.advance(Duration::from_secs(61));

        // 4 >= 5 * 0.8, so the put sweeps before inserting.
        assert!(cache.put(key("e"), &image(4)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_full_cache_skips_new_keys_but_replaces_existing() {
        let cache = ResultCache::new(&config(2));
        assert!(cache.put(key("a"), &image(0)));
        assert!(cache.put(key("b"), &image(1)));
        assert!(!cache.put(key("c"), &image(2)));
        assert!(cache.get(&key("c")).is_none());

        assert!(cache.put(key("a"), &image(3)));
        assert_eq!(cache.get(&key("a")).unwrap(), image(3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_clear_and_statistics() {
        let cache = ResultCache::new(&config(4));
        cache.put(key("a"), &image(0));
        cache.put(key("b"), &image(1));
        let _ = cache.get(&key("a"));
        let _ = cache.get(&key("zzz"));

        let stats = cache.statistics();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.capacity, 4);
        assert_eq!(stats.utilization, 50.0);
        assert_eq!((stats.hits, stats.misses), (1, 1));
        assert_eq!(stats.hit_ratio(), 0.5);

        assert_eq!(cache.clear(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_puts_and_gets() {
        let cache = Arc::new(ResultCache::new(&config(64)));
        let handles: Vec<_> = (0..8u32)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..32u32 {
                        let k = key(&format!("{}", (t * 32 + i) % 40));
                        cache.put(k, &image(i));
                        let _ = cache.get(&k);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(cache.len() <= 40);
        let stats = cache.statistics();
        assert_eq!(stats.hits + stats.misses, 8 * 32);
    }
}
