//! Two-tier feature store: durable record field, then TTL cache.
//!
//! A populated `audio_features` field on the track record is
//! authoritative and never recomputed.  Otherwise the TTL tier answers
//! for an hour.  Only a successful computation is written back — failures
//! are not cached, so the next call retries the whole chain.

use tracing::debug;

use crate::cache::{cache_key, TtlCache, TTL_ONE_HOUR};
use crate::error::ResolveError;
use crate::features::FeatureVector;
use crate::track::TrackStore;

pub struct FeatureStore {
    cache: TtlCache<FeatureVector>,
}

impl Default for FeatureStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureStore {
    pub fn new() -> Self {
        FeatureStore {
            cache: TtlCache::new("features", TTL_ONE_HOUR),
        }
    }

    /// Fetch a track's features, computing and persisting them on a full
    /// miss.
    pub fn get_or_compute<F>(
        &self,
        records: &dyn TrackStore,
        track_id: &str,
        compute: F,
    ) -> Result<FeatureVector, ResolveError>
    where
        F: FnOnce() -> Result<FeatureVector, ResolveError>,
    {
        if let Some(features) = records.get(track_id).and_then(|r| r.audio_features) {
            debug!(track_id, "features from track record");
            return Ok(features);
        }

        let key = cache_key("features", track_id, &[]);
        if let Some(features) = self.cache.get(&key) {
            return Ok(features);
        }

        let features = compute()?;

        // Write through to both tiers
        records.set_audio_features(track_id, &features);
        self.cache.insert(key, features);
        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::{MemoryTrackStore, TrackRecord};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn features(seed: f64) -> FeatureVector {
        FeatureVector::from_array([seed; 8])
    }

    fn record(id: &str) -> TrackRecord {
        TrackRecord {
            id: id.to_string(),
            name: "Track".to_string(),
            artist: "Artist".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_populated_record_field_skips_compute() {
        let records = MemoryTrackStore::new();
        let mut rec = record("t1");
        rec.audio_features = Some(features(1.0));
        records.insert(rec);

        let store = FeatureStore::new();
        let calls = AtomicUsize::new(0);
        let got = store
            .get_or_compute(&records, "t1", || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(features(9.0))
            })
            .unwrap();

        assert_eq!(got, features(1.0));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_compute_writes_through_to_both_tiers() {
        let records = MemoryTrackStore::new();
        records.insert(record("t1"));

        let store = FeatureStore::new();
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(features(2.0))
        };

        let first = store.get_or_compute(&records, "t1", compute).unwrap();
        assert_eq!(first, features(2.0));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Record field is now populated; compute must never run again
        assert_eq!(
            records.get("t1").unwrap().audio_features,
            Some(features(2.0))
        );
        let second = store
            .get_or_compute(&records, "t1", || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(features(9.0))
            })
            .unwrap();
        assert_eq!(second, features(2.0));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cache_tier_answers_when_record_cannot_persist() {
        // No record exists, so the durable tier can't hold the result;
        // the TTL tier must still absorb repeat lookups.
        let records = MemoryTrackStore::new();
        let store = FeatureStore::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let got = store
                .get_or_compute(&records, "ghost", || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(features(3.0))
                })
                .unwrap();
            assert_eq!(got, features(3.0));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failure_is_not_cached() {
        let records = MemoryTrackStore::new();
        records.insert(record("t1"));

        let store = FeatureStore::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let result = store.get_or_compute(&records, "t1", || {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ResolveError::NoMatch("t1".to_string()))
            });
            assert!(result.is_err());
        }
        // Negative results retry every time
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(records.get("t1").unwrap().audio_features.is_none());
    }
}
