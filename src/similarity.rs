//! Cosine-similarity ranking over feature vectors.
//!
//! Candidates are compared to the seed in the fixed 8-feature order and
//! sorted by similarity, best first.  A zero-norm vector carries no
//! direction to compare against, so such candidates are skipped rather
//! than ranked — that is the documented contract, not an accident.

use serde::{Deserialize, Serialize};

use crate::features::FeatureVector;

/// One ranked candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedTrack {
    pub track_id: String,
    /// Cosine similarity to the seed, in [-1, 1].
    pub similarity: f64,
}

/// Cosine similarity between two 8-feature vectors.
///
/// `None` when either vector has zero norm.
pub fn cosine_similarity(a: &FeatureVector, b: &FeatureVector) -> Option<f64> {
    let a = a.to_array();
    let b = b.to_array();

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(&b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a <= 0.0 || norm_b <= 0.0 {
        return None;
    }
    Some(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Rank candidates by similarity to the seed, best first.
///
/// Zero-norm candidates are skipped, so the result may be shorter than
/// both `limit` and the candidate list.  The sort is stable: candidates
/// with exactly equal similarity keep their input order.
pub fn rank(
    seed: &FeatureVector,
    candidates: &[(String, FeatureVector)],
    limit: usize,
) -> Vec<RankedTrack> {
    let mut ranked: Vec<RankedTrack> = candidates
        .iter()
        .filter_map(|(track_id, features)| {
            cosine_similarity(seed, features).map(|similarity| RankedTrack {
                track_id: track_id.clone(),
                similarity,
            })
        })
        .collect();

    ranked.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    ranked.truncate(limit);
    ranked
}
