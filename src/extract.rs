//! Acoustic feature extraction from preview clips.
//!
//! `FeatureExtractor::extract` is a pure function of the audio bytes: the
//! clip is decoded to mono at the analysis rate, run through the STFT
//! pipeline, and aggregated into the fixed 8-feature summary.  Results are
//! memoized per path in a fixed-capacity LRU so re-ranking sessions do not
//! re-decode the same previews.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::cache::LruCache;
use crate::decode;
use crate::dsp::{self, MelBank};
use crate::error::ResolveError;
use crate::features::FeatureVector;

pub struct FeatureExtractor {
    sample_rate: u32,
    memo: Mutex<LruCache<PathBuf, FeatureVector>>,
}

impl FeatureExtractor {
    pub fn new(sample_rate: u32, memo_capacity: usize) -> Self {
        FeatureExtractor {
            sample_rate,
            memo: Mutex::new(LruCache::new(memo_capacity)),
        }
    }

    /// Extract the 8-feature acoustic summary of an audio clip.
    ///
    /// Identical input bytes yield identical output.  All returned values
    /// are finite; a clip that cannot be decoded or is too short to frame
    /// is an error, never a NaN-laden vector.
    pub fn extract(&self, path: &Path) -> Result<FeatureVector, ResolveError> {
        if let Ok(mut memo) = self.memo.lock() {
            if let Some(hit) = memo.get(path) {
                debug!(path = %path.display(), "feature memo hit");
                return Ok(hit);
            }
        }

        let features = self.compute(path)?;

        if let Ok(mut memo) = self.memo.lock() {
            memo.insert(path.to_path_buf(), features);
        }
        Ok(features)
    }

    fn compute(&self, path: &Path) -> Result<FeatureVector, ResolveError> {
        let samples = decode::load_mono(path, self.sample_rate)?;

        let spec = dsp::stft_magnitudes(&samples, self.sample_rate);
        if spec.frames.is_empty() {
            return Err(ResolveError::Decode(format!(
                "clip too short to analyze: {}",
                path.display()
            )));
        }

        let mut centroids = Vec::with_capacity(spec.frames.len());
        let mut bandwidths = Vec::with_capacity(spec.frames.len());
        let mut rolloffs = Vec::with_capacity(spec.frames.len());
        let mut chroma_cells = Vec::with_capacity(spec.frames.len() * 12);
        let mut mfcc_cells = Vec::with_capacity(spec.frames.len() * 20);

        let bank = MelBank::new(self.sample_rate);
        for frame in &spec.frames {
            let centroid = dsp::spectral_centroid(frame, self.sample_rate);
            centroids.push(centroid);
            bandwidths.push(dsp::spectral_bandwidth(frame, self.sample_rate, centroid));
            rolloffs.push(dsp::spectral_rolloff(frame, self.sample_rate));
            chroma_cells.extend_from_slice(&dsp::chroma_frame(frame, self.sample_rate));
            mfcc_cells.extend_from_slice(&bank.mfcc_frame(frame));
        }

        let rms = dsp::frame_rms(&samples);
        let zcr = dsp::frame_zero_crossing_rate(&samples);
        let envelope = dsp::onset_envelope(&spec);

        let features = FeatureVector {
            tempo: dsp::estimate_tempo(&envelope, self.sample_rate),
            chroma_stft_mean: dsp::mean(&chroma_cells),
            rmse_mean: dsp::mean(&rms),
            spectral_centroid_mean: dsp::mean(&centroids),
            spectral_bandwidth_mean: dsp::mean(&bandwidths),
            rolloff_mean: dsp::mean(&rolloffs),
            zero_crossing_rate_mean: dsp::mean(&zcr),
            mfcc_mean: dsp::mean(&mfcc_cells),
        };

        if !features.is_finite() {
            return Err(ResolveError::NonFinite(path.display().to_string()));
        }

        debug!(
            path = %path.display(),
            tempo = features.tempo,
            centroid = features.spectral_centroid_mean,
            "extracted features"
        );
        Ok(features)
    }
}
