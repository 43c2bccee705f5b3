//! The fixed 8-dimensional acoustic feature vector.
//!
//! Every track is summarized by the same 8 scalar aggregates, always
//! compared in the same order.  The struct is the single source of truth
//! for that order — map-shaped inputs (e.g. the persisted blob on a track
//! record) go through [`FeatureVector::from_map`], which rejects any key
//! set that does not match exactly.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::ResolveError;

/// Feature names in vectorization order.
pub const FEATURE_KEYS: [&str; 8] = [
    "tempo",
    "chroma_stft_mean",
    "rmse_mean",
    "spectral_centroid_mean",
    "spectral_bandwidth_mean",
    "rolloff_mean",
    "zero_crossing_rate_mean",
    "mfcc_mean",
];

/// Scalar summary of a track's acoustic preview.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Tempo estimate in beats per minute.
    pub tempo: f64,
    /// Mean chroma energy over all pitch classes and frames.
    pub chroma_stft_mean: f64,
    /// Mean root-mean-square energy over all frames.
    pub rmse_mean: f64,
    /// Mean spectral centroid in Hz.
    pub spectral_centroid_mean: f64,
    /// Mean spectral bandwidth in Hz.
    pub spectral_bandwidth_mean: f64,
    /// Mean spectral rolloff frequency in Hz.
    pub rolloff_mean: f64,
    /// Mean zero-crossing rate per sample.
    pub zero_crossing_rate_mean: f64,
    /// Mean MFCC coefficient value over all coefficients and frames.
    pub mfcc_mean: f64,
}

impl FeatureVector {
    /// Values in [`FEATURE_KEYS`] order.
    pub fn to_array(&self) -> [f64; 8] {
        [
            self.tempo,
            self.chroma_stft_mean,
            self.rmse_mean,
            self.spectral_centroid_mean,
            self.spectral_bandwidth_mean,
            self.rolloff_mean,
            self.zero_crossing_rate_mean,
            self.mfcc_mean,
        ]
    }

    /// True when every component is a finite number.
    ///
    /// Extraction must never hand out NaN or infinite values — callers
    /// check this once at the production site and treat a failure as
    /// "no features available".
    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    /// Serialize into the persisted blob shape (one key per feature).
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for (key, value) in FEATURE_KEYS.iter().zip(self.to_array()) {
            let number = Number::from_f64(value).unwrap_or_else(|| Number::from(0));
            map.insert((*key).to_string(), Value::Number(number));
        }
        map
    }

    /// Parse the persisted blob shape back into a vector.
    ///
    /// The key set must match [`FEATURE_KEYS`] exactly — a missing,
    /// extra, or non-numeric entry means the blob was not produced by
    /// this extractor and comparing it would be meaningless.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, ResolveError> {
        if map.len() != FEATURE_KEYS.len() {
            return Err(ResolveError::BadResponse(format!(
                "feature blob has {} keys, expected {}",
                map.len(),
                FEATURE_KEYS.len()
            )));
        }
        let mut values = [0.0f64; 8];
        for (slot, key) in values.iter_mut().zip(FEATURE_KEYS) {
            *slot = map
                .get(key)
                .and_then(Value::as_f64)
                .ok_or_else(|| {
                    ResolveError::BadResponse(format!("feature blob missing \"{}\"", key))
                })?;
        }
        Ok(Self::from_array(values))
    }

    /// Inverse of [`FeatureVector::to_array`].
    pub fn from_array(values: [f64; 8]) -> Self {
        FeatureVector {
            tempo: values[0],
            chroma_stft_mean: values[1],
            rmse_mean: values[2],
            spectral_centroid_mean: values[3],
            spectral_bandwidth_mean: values[4],
            rolloff_mean: values[5],
            zero_crossing_rate_mean: values[6],
            mfcc_mean: values[7],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FeatureVector {
        FeatureVector {
            tempo: 120.0,
            chroma_stft_mean: 0.5,
            rmse_mean: 0.1,
            spectral_centroid_mean: 2000.0,
            spectral_bandwidth_mean: 1500.0,
            rolloff_mean: 3000.0,
            zero_crossing_rate_mean: 0.05,
            mfcc_mean: -5.0,
        }
    }

    #[test]
    fn test_array_round_trip() {
        let v = sample();
        assert_eq!(FeatureVector::from_array(v.to_array()), v);
    }

    #[test]
    fn test_map_round_trip() {
        let v = sample();
        let parsed = FeatureVector::from_map(&v.to_map()).unwrap();
        assert_eq!(parsed, v);
    }

    #[test]
    fn test_map_key_order_is_fixed() {
        let v = sample();
        let array = v.to_array();
        for (i, key) in FEATURE_KEYS.iter().enumerate() {
            assert_eq!(v.to_map().get(*key).and_then(Value::as_f64), Some(array[i]));
        }
    }

    #[test]
    fn test_from_map_rejects_missing_key() {
        let mut map = sample().to_map();
        map.remove("tempo");
        assert!(FeatureVector::from_map(&map).is_err());
    }

    #[test]
    fn test_from_map_rejects_extra_key() {
        let mut map = sample().to_map();
        map.insert("loudness".to_string(), Value::from(0.5));
        assert!(FeatureVector::from_map(&map).is_err());
    }

    #[test]
    fn test_finiteness_check() {
        let mut v = sample();
        assert!(v.is_finite());
        v.rolloff_mean = f64::NAN;
        assert!(!v.is_finite());
        v.rolloff_mean = f64::INFINITY;
        assert!(!v.is_finite());
    }
}
