//! Recognized-text cache keyed by image fingerprint.
//!
//! Holds normalized text only, never extracted records, so rule changes take
//! effect without re-running OCR. Eviction is insertion-order (FIFO): reading
//! an entry does not refresh its position.
//!
//! # Thread Safety
//!
//! The lookup-insert-evict sequence runs under one `parking_lot::Mutex`.
//! The compute step runs outside the lock so a slow OCR call does not block
//! hits for other images; if two callers race on the same fingerprint the
//! first insert wins and both return the same text.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

/// SHA-256 of raw image bytes, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of `data`.
    pub fn of(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Default)]
struct Entries {
    texts: HashMap<Fingerprint, String>,
    order: VecDeque<Fingerprint>,
}

/// Bounded FIFO cache of normalized text.
pub struct OcrCache {
    entries: Mutex<Entries>,
    capacity: usize,
}

impl OcrCache {
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            capacity: capacity.max(1),
        }
    }

    /// Return the cached text for `fingerprint`, computing it on a miss.
    ///
    /// Errors from `compute` are returned as-is and nothing is cached.
    pub fn get_or_compute<F, E>(&self, fingerprint: &Fingerprint, compute: F) -> Result<String, E>
    where
        F: FnOnce() -> Result<String, E>,
    {
        if let Some(text) = self.get(fingerprint) {
            debug!("Cache hit for {}", fingerprint);
            return Ok(text);
        }

        debug!("Cache miss for {}", fingerprint);
        let text = compute()?;

        let mut entries = self.entries.lock();
        if let Some(existing) = entries.texts.get(fingerprint) {
            return Ok(existing.clone());
        }

        while entries.order.len() >= self.capacity {
            match entries.order.pop_front() {
                Some(oldest) => {
                    debug!("Evicting {}", oldest);
                    entries.texts.remove(&oldest);
                }
                None => break,
            }
        }

        entries.order.push_back(fingerprint.clone());
        entries.texts.insert(fingerprint.clone(), text.clone());

        Ok(text)
    }

    /// Look up without computing.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<String> {
        self.entries.lock().texts.get(fingerprint).cloned()
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.entries.lock().texts.contains_key(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn fp(n: usize) -> Fingerprint {
        Fingerprint::of(format!("image-{n}").as_bytes())
    }

    fn fill(cache: &OcrCache, n: usize) {
        cache
            .get_or_compute(&fp(n), || Ok::<_, Infallible>(format!("text {n}")))
            .unwrap();
    }

    #[test]
    fn test_fingerprint_is_sha256_hex() {
        assert_eq!(
            Fingerprint::of(b"abc").as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(Fingerprint::of(b"abc"), Fingerprint::of(b"abc"));
        assert_ne!(Fingerprint::of(b"abc"), Fingerprint::of(b"abd"));
    }

    #[test]
    fn test_evicts_first_inserted() {
        let capacity = 3;
        let cache = OcrCache::new(capacity);
        for n in 0..=capacity {
            fill(&cache, n);
        }

        assert_eq!(cache.len(), capacity);
        assert!(!cache.contains(&fp(0)));
        for n in 1..=capacity {
            assert!(cache.contains(&fp(n)), "entry {n} should be retained");
        }
    }

    #[test]
    fn test_hit_skips_compute() {
        let cache = OcrCache::new(2);
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>("texto".to_string())
        };

        assert_eq!(cache.get_or_compute(&fp(1), compute).unwrap(), "texto");
        assert_eq!(cache.get_or_compute(&fp(1), compute).unwrap(), "texto");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_hit_does_not_refresh_order() {
        let cache = OcrCache::new(2);
        fill(&cache, 1);
        fill(&cache, 2);
        fill(&cache, 1);
        fill(&cache, 3);

        assert!(!cache.contains(&fp(1)));
        assert!(cache.contains(&fp(2)));
        assert!(cache.contains(&fp(3)));
    }

    #[test]
    fn test_compute_error_is_not_cached() {
        let cache = OcrCache::new(2);
        let result: Result<String, &str> = cache.get_or_compute(&fp(1), || Err("engine down"));
        assert_eq!(result, Err("engine down"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(OcrCache::new(4));
        let calls = Arc::new(AtomicUsize::new(0));

        std::thread::scope(|s| {
            for n in 0..8 {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                s.spawn(move || {
                    let text = cache
                        .get_or_compute(&fp(n % 2), || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Ok::<_, Infallible>(format!("text {}", n % 2))
                        })
                        .unwrap();
                    assert_eq!(text, format!("text {}", n % 2));
                });
            }
        });

        assert_eq!(cache.len(), 2);
        assert!(calls.load(Ordering::SeqCst) >= 2);
    }
}
