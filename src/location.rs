//! Resolution of free-text locations against a reference gazetteer.
//!
//! A resolver owns an immutable candidate list. Lookups are memoized in a
//! [`LocationCache`] owned by the caller; a cache remembers which candidate
//! set filled it and is cleared when handed to a resolver built from a
//! different one.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::debug;

use crate::domain::{CanonicalLocation, LocationTier};

/// Distance assigned to candidates that have no `location` level.
pub const NO_LOCATION_DISTANCE: usize = 1_000;

pub trait EditDistance {
    fn distance(&self, a: &str, b: &str) -> usize;
}

/// Character-level Levenshtein distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct Levenshtein;

impl EditDistance for Levenshtein {
    fn distance(&self, a: &str, b: &str) -> usize {
        levenshtein(a, b)
    }
}

pub fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != *cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    Text(String),
    Depth { location_id: u64, tier: LocationTier },
}

#[derive(Debug, Clone, Default)]
pub struct LocationCache {
    fingerprint: Option<u64>,
    entries: HashMap<CacheKey, Arc<CanonicalLocation>>,
}

impl LocationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.fingerprint = None;
    }

    fn bind(&mut self, fingerprint: u64) {
        if self.fingerprint != Some(fingerprint) {
            if !self.entries.is_empty() {
                debug!(stale = self.entries.len(), "location cache bound to new candidate set");
            }
            self.entries.clear();
            self.fingerprint = Some(fingerprint);
        }
    }

    fn get(&self, key: &CacheKey) -> Option<Arc<CanonicalLocation>> {
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: CacheKey, value: Arc<CanonicalLocation>) {
        self.entries.insert(key, value);
    }
}

pub struct LocationResolver<D: EditDistance = Levenshtein> {
    candidates: Vec<Arc<CanonicalLocation>>,
    fingerprint: u64,
    metric: D,
}

impl LocationResolver<Levenshtein> {
    pub fn new(candidates: impl IntoIterator<Item = CanonicalLocation>) -> Self {
        Self::with_metric(candidates, Levenshtein)
    }
}

impl<D: EditDistance> LocationResolver<D> {
    pub fn with_metric(candidates: impl IntoIterator<Item = CanonicalLocation>, metric: D) -> Self {
        let candidates: Vec<Arc<CanonicalLocation>> =
            candidates.into_iter().map(Arc::new).collect();
        let fingerprint = fingerprint(&candidates);
        Self {
            candidates,
            fingerprint,
            metric,
        }
    }

    pub fn candidates(&self) -> &[Arc<CanonicalLocation>] {
        &self.candidates
    }

    pub fn new_cache(&self) -> LocationCache {
        let mut cache = LocationCache::new();
        cache.bind(self.fingerprint);
        cache
    }

    /// Closest candidate to `text`. An exact `name` match wins outright;
    /// otherwise the smallest edit distance to a candidate's `location`
    /// level wins, ties going to the earliest candidate.
    pub fn resolve(
        &self,
        text: &str,
        cache: Option<&mut LocationCache>,
    ) -> Option<Arc<CanonicalLocation>> {
        if self.candidates.is_empty() {
            return None;
        }
        let key = CacheKey::Text(text.to_string());
        let mut cache = cache;
        if let Some(cache) = cache.as_deref_mut() {
            cache.bind(self.fingerprint);
            if let Some(hit) = cache.get(&key) {
                debug!(text, "location cache hit");
                return Some(hit);
            }
        }

        let best = self.closest(text)?;
        if let Some(cache) = cache {
            cache.insert(key, Arc::clone(&best));
        }
        Some(best)
    }

    /// First candidate that agrees with `search` on every level down to
    /// `max_tier` and has no level deeper than it.
    pub fn resolve_at_depth(
        &self,
        search: &CanonicalLocation,
        max_tier: LocationTier,
        cache: Option<&mut LocationCache>,
    ) -> Option<Arc<CanonicalLocation>> {
        let key = CacheKey::Depth {
            location_id: search.id,
            tier: max_tier,
        };
        let mut cache = cache;
        if let Some(cache) = cache.as_deref_mut() {
            cache.bind(self.fingerprint);
            if let Some(hit) = cache.get(&key) {
                return Some(hit);
            }
        }

        let found = self
            .candidates
            .iter()
            .find(|candidate| {
                LocationTier::ALL.into_iter().all(|tier| {
                    if tier <= max_tier {
                        candidate.level(tier) == search.level(tier)
                    } else {
                        candidate.level(tier).is_none()
                    }
                })
            })
            .cloned()?;
        if let Some(cache) = cache {
            cache.insert(key, Arc::clone(&found));
        }
        Some(found)
    }

    fn closest(&self, text: &str) -> Option<Arc<CanonicalLocation>> {
        if let Some(exact) = self.candidates.iter().find(|c| c.name == text) {
            return Some(Arc::clone(exact));
        }

        let mut best: Option<(usize, &Arc<CanonicalLocation>)> = None;
        for candidate in &self.candidates {
            let distance = match &candidate.location {
                Some(location) => self.metric.distance(text, location),
                None => NO_LOCATION_DISTANCE,
            };
            if best.is_none_or(|(best_distance, _)| distance < best_distance) {
                best = Some((distance, candidate));
            }
        }
        best.map(|(_, candidate)| Arc::clone(candidate))
    }
}

fn fingerprint(candidates: &[Arc<CanonicalLocation>]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for candidate in candidates {
        candidate.id.hash(&mut hasher);
        candidate.name.hash(&mut hasher);
        candidate.location.hash(&mut hasher);
    }
    hasher.finish()
}
