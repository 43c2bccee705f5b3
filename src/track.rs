//! Track shapes and the domain-record store boundary.
//!
//! [`TrackRef`] is the lightweight denormalized view the primary catalog
//! hands back from history/search lookups — not an authoritative record,
//! it may be reconstructed repeatedly.  [`TrackStore`] is the seam to
//! wherever track records actually live; this crate only reads and writes
//! the persisted feature blob and preview URL through it.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::features::FeatureVector;

/// A track as seen by primary-catalog lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackRef {
    /// Opaque primary-catalog identifier; the cache/store key everywhere.
    pub id: String,
    pub name: String,
    pub artist: String,
    #[serde(default)]
    pub album: String,
    /// Duration in milliseconds, when the lookup carried one.
    #[serde(default)]
    pub duration_ms: Option<u64>,
    /// Play timestamp for recently-played entries.
    #[serde(default)]
    pub played_at: Option<String>,
}

/// The durable per-track record this crate reads and writes through
/// [`TrackStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackRecord {
    pub id: String,
    pub name: String,
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub audio_features: Option<FeatureVector>,
}

/// Read/write access to persisted track records.
pub trait TrackStore: Send + Sync {
    fn get(&self, track_id: &str) -> Option<TrackRecord>;
    fn set_audio_features(&self, track_id: &str, features: &FeatureVector);
    fn set_preview_url(&self, track_id: &str, preview_url: &str);
}

/// In-memory [`TrackStore`], used by tests and the demo binary.
#[derive(Default)]
pub struct MemoryTrackStore {
    records: Mutex<HashMap<String, TrackRecord>>,
}

impl MemoryTrackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: TrackRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.insert(record.id.clone(), record);
        }
    }
}

impl TrackStore for MemoryTrackStore {
    fn get(&self, track_id: &str) -> Option<TrackRecord> {
        self.records.lock().ok()?.get(track_id).cloned()
    }

    fn set_audio_features(&self, track_id: &str, features: &FeatureVector) {
        if let Ok(mut records) = self.records.lock() {
            if let Some(record) = records.get_mut(track_id) {
                record.audio_features = Some(*features);
            }
        }
    }

    fn set_preview_url(&self, track_id: &str, preview_url: &str) {
        if let Ok(mut records) = self.records.lock() {
            if let Some(record) = records.get_mut(track_id) {
                record.preview_url = Some(preview_url.to_string());
            }
        }
    }
}

/// Drop repeated items by key, preserving the first occurrence's position.
pub fn dedup_by_key<T, K, F>(items: Vec<T>, key: F) -> Vec<T>
where
    K: Hash + Eq,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(key(item)))
        .collect()
}

/// Total listening time in hours for a recently-played window.
pub fn listening_time_hours(recently_played: &[TrackRef]) -> f64 {
    let total_ms: u64 = recently_played
        .iter()
        .filter_map(|t| t.duration_ms)
        .sum();
    total_ms as f64 / (1000.0 * 60.0 * 60.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str) -> TrackRef {
        TrackRef {
            id: id.to_string(),
            name: format!("Track {}", id),
            artist: "Artist".to_string(),
            album: String::new(),
            duration_ms: None,
            played_at: None,
        }
    }

    #[test]
    fn test_dedup_preserves_first_occurrence_order() {
        let tracks = vec![track("a"), track("b"), track("a"), track("c"), track("b")];
        let unique = dedup_by_key(tracks, |t| t.id.clone());
        let ids: Vec<&str> = unique.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_dedup_of_unique_input_is_identity() {
        let tracks = vec![track("x"), track("y")];
        let unique = dedup_by_key(tracks, |t| t.id.clone());
        assert_eq!(unique.len(), 2);
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryTrackStore::new();
        store.insert(TrackRecord {
            id: "t1".to_string(),
            name: "So What".to_string(),
            artist: "Miles Davis".to_string(),
            ..Default::default()
        });

        assert!(store.get("t1").is_some());
        assert!(store.get("t2").is_none());

        store.set_preview_url("t1", "https://cdn.example.com/p.mp3");
        assert_eq!(
            store.get("t1").unwrap().preview_url.as_deref(),
            Some("https://cdn.example.com/p.mp3")
        );
    }

    #[test]
    fn test_set_features_on_missing_record_is_noop() {
        let store = MemoryTrackStore::new();
        let features = FeatureVector::from_array([1.0; 8]);
        store.set_audio_features("ghost", &features);
        assert!(store.get("ghost").is_none());
    }

    #[test]
    fn test_listening_time_sums_durations() {
        let mut a = track("a");
        a.duration_ms = Some(30 * 60 * 1000);
        let mut b = track("b");
        b.duration_ms = Some(90 * 60 * 1000);
        let c = track("c"); // no duration → ignored

        let hours = listening_time_hours(&[a, b, c]);
        assert!((hours - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_listening_time_of_empty_history_is_zero() {
        assert_eq!(listening_time_hours(&[]), 0.0);
    }
}
