//! Caller-owned cache of derived populations.
//!
//! Derivation is cheap relative to training but is repeated across CV runs
//! and experiments. The cache is an explicit value the caller owns and
//! invalidates; there is no process-wide memoization.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::derive::{derive_features, DerivationMode, DerivedPopulation, DeriveOptions};
use super::raw::RawRecord;
use crate::error::DataError;

/// Identity of a derived population: where it came from, what it contained,
/// and how it was derived.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DatasetKey {
    pub source: String,
    /// CRC32 over the raw records.
    pub fingerprint: u32,
    pub mode: DerivationMode,
    pub seed: u64,
    pub horizon_months: u32,
}

impl DatasetKey {
    pub fn new(source: impl Into<String>, raw: &[RawRecord], options: &DeriveOptions) -> Self {
        let mut hasher = crc32fast::Hasher::new();
        raw.len().hash(&mut hasher);
        for record in raw {
            record.dedup_key().hash(&mut hasher);
        }
        Self {
            source: source.into(),
            fingerprint: hasher.finish() as u32,
            mode: options.mode,
            seed: options.seed,
            horizon_months: options.horizon_months,
        }
    }

    fn options(&self) -> DeriveOptions {
        DeriveOptions {
            mode: self.mode,
            seed: self.seed,
            horizon_months: self.horizon_months,
        }
    }
}

/// Keyed store of derived populations.
#[derive(Debug, Default)]
pub struct FeatureCache {
    entries: BTreeMap<DatasetKey, Arc<DerivedPopulation>>,
}

impl FeatureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached population for `key`, deriving it from `raw` on a miss.
    ///
    /// Derivation options come from the key, so a hit is always consistent
    /// with the options that produced it.
    pub fn get_or_derive(
        &mut self,
        key: DatasetKey,
        raw: &[RawRecord],
    ) -> Result<Arc<DerivedPopulation>, DataError> {
        if let Some(hit) = self.entries.get(&key) {
            tracing::debug!(source = %key.source, "feature cache hit");
            return Ok(Arc::clone(hit));
        }
        let derived = Arc::new(derive_features(raw, &key.options())?);
        tracing::debug!(source = %key.source, rows = derived.snapshots.len(), "feature cache miss");
        self.entries.insert(key, Arc::clone(&derived));
        Ok(derived)
    }

    pub fn get(&self, key: &DatasetKey) -> Option<Arc<DerivedPopulation>> {
        self.entries.get(key).cloned()
    }

    /// Insert a population, returning any entry it replaced.
    pub fn insert(
        &mut self,
        key: DatasetKey,
        population: DerivedPopulation,
    ) -> Option<Arc<DerivedPopulation>> {
        self.entries.insert(key, Arc::new(population))
    }

    /// Drop one entry. Returns whether it was present.
    pub fn invalidate(&mut self, key: &DatasetKey) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(n: usize) -> Vec<RawRecord> {
        (0..n)
            .map(|i| RawRecord { employee_id: Some(format!("E{i}")), ..Default::default() })
            .collect()
    }

    #[test]
    fn derives_once_per_key() {
        let records = raw(10);
        let key = DatasetKey::new("demo", &records, &DeriveOptions::demo(1));
        let mut cache = FeatureCache::new();

        let first = cache.get_or_derive(key.clone(), &records).unwrap();
        let second = cache.get_or_derive(key.clone(), &records).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        assert!(cache.invalidate(&key));
        assert!(cache.get(&key).is_none());
        assert!(!cache.invalidate(&key));
    }

    #[test]
    fn key_tracks_content_and_options() {
        let a = raw(5);
        let mut b = raw(5);
        b[4].team_size = Some(4.0);

        let opts = DeriveOptions::demo(1);
        assert_eq!(DatasetKey::new("s", &a, &opts), DatasetKey::new("s", &a, &opts));
        assert_ne!(DatasetKey::new("s", &a, &opts), DatasetKey::new("s", &b, &opts));
        assert_ne!(
            DatasetKey::new("s", &a, &opts),
            DatasetKey::new("s", &a, &DeriveOptions::demo(2))
        );
    }

    #[test]
    fn strict_failures_are_not_cached() {
        let records = raw(3);
        let key = DatasetKey::new("strict", &records, &DeriveOptions::default());
        let mut cache = FeatureCache::new();
        assert!(cache.get_or_derive(key, &records).is_err());
        assert!(cache.is_empty());
    }
}
