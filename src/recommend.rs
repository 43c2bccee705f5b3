//! The recommendation orchestrator.
//!
//! Ties the whole pipeline together: seed features come from the feature
//! store (computing through preview resolution + extraction on a miss),
//! every deduplicated candidate resolves the same way, survivors are
//! ranked by cosine similarity, and the final id list is cached for an
//! hour per `(seed, limit)`.
//!
//! Failure policy is decided here, not in the leaves: a candidate that
//! fails any resolution step is skipped with a log line; a seed that
//! fails yields an empty list.

use tracing::{debug, warn};

use crate::cache::{cache_key, TtlCache, TTL_ONE_HOUR};
use crate::config::Settings;
use crate::error::ResolveError;
use crate::extract::FeatureExtractor;
use crate::features::FeatureVector;
use crate::previews::{PreviewResolver, PreviewStore};
use crate::saavn::SaavnClient;
use crate::similarity::{self, RankedTrack};
use crate::store::FeatureStore;
use crate::track::{dedup_by_key, TrackRecord, TrackRef, TrackStore};

/// Hook for rewriting a search query before it hits the secondary
/// catalog (e.g. transliterating a non-Latin title).
pub trait SearchTranslator: Send + Sync {
    fn translate(&self, text: &str) -> String;
}

/// Passes queries through unchanged.
pub struct IdentityTranslator;

impl SearchTranslator for IdentityTranslator {
    fn translate(&self, text: &str) -> String {
        text.to_string()
    }
}

pub struct Recommender {
    recommend_limit: usize,
    resolver: PreviewResolver,
    extractor: FeatureExtractor,
    features: FeatureStore,
    rec_cache: TtlCache<Vec<String>>,
    translator: Box<dyn SearchTranslator>,
}

impl Recommender {
    pub fn new(settings: Settings) -> Self {
        let client = SaavnClient::new(settings.http_timeout);
        Self::with_client(settings, client, Box::new(IdentityTranslator))
    }

    /// Build with an explicit catalog client and translator (tests point
    /// the client at a stub host).
    pub fn with_client(
        settings: Settings,
        client: SaavnClient,
        translator: Box<dyn SearchTranslator>,
    ) -> Self {
        let store = PreviewStore::new(&settings.previews_dir);
        let resolver =
            PreviewResolver::new(client, store, settings.http_timeout, settings.search_limit);
        Recommender {
            recommend_limit: settings.recommend_limit,
            resolver,
            extractor: FeatureExtractor::new(settings.sample_rate, settings.memo_capacity),
            features: FeatureStore::new(),
            rec_cache: TtlCache::new("recommendations", TTL_ONE_HOUR),
            translator,
        }
    }

    /// Recommend up to `limit` tracks acoustically similar to the seed.
    ///
    /// Candidates are deduplicated by id (first occurrence wins) and the
    /// seed itself is never a candidate.  Candidates whose resolution
    /// fails are skipped, so the result may be shorter than `limit`.  An
    /// unresolvable seed yields an empty list.
    pub fn recommend(
        &self,
        records: &dyn TrackStore,
        seed_id: &str,
        candidates: &[TrackRef],
        limit: Option<usize>,
    ) -> Vec<String> {
        let limit = limit.unwrap_or(self.recommend_limit);

        let limit_param = limit.to_string();
        let key = cache_key("recommendations", seed_id, &[limit_param.as_str()]);
        if let Some(cached) = self.rec_cache.get(&key) {
            return cached;
        }

        let seed = match self.seed_features(records, seed_id) {
            Some(features) => features,
            None => return Vec::new(),
        };

        let unique = dedup_by_key(candidates.to_vec(), |c| c.id.clone());
        let mut resolved: Vec<(String, FeatureVector)> = Vec::new();
        for candidate in unique.iter().filter(|c| c.id != seed_id) {
            match self.candidate_features(records, candidate) {
                Ok(features) => resolved.push((candidate.id.clone(), features)),
                Err(e) => {
                    warn!(track_id = %candidate.id, error = %e, "skipping candidate");
                }
            }
        }
        debug!(
            seed_id,
            candidates = unique.len(),
            resolved = resolved.len(),
            "ranking candidates"
        );

        let ranked = self.rank(&seed, &resolved, limit);
        let ids: Vec<String> = ranked.into_iter().map(|r| r.track_id).collect();
        self.rec_cache.insert(key, ids.clone());
        ids
    }

    /// Rank pre-resolved feature vectors against a seed (exposed for
    /// callers that already hold features).
    pub fn rank(
        &self,
        seed: &FeatureVector,
        candidates: &[(String, FeatureVector)],
        limit: usize,
    ) -> Vec<RankedTrack> {
        similarity::rank(seed, candidates, limit)
    }

    fn seed_features(&self, records: &dyn TrackStore, seed_id: &str) -> Option<FeatureVector> {
        let record = match records.get(seed_id) {
            Some(record) => record,
            None => {
                warn!(seed_id, "seed track has no record");
                return None;
            }
        };

        let result = self.features.get_or_compute(records, seed_id, || {
            let query = self.translator.translate(&seed_search_text(&record));
            let preview = self.resolver.resolve_with_query(&query, seed_id)?;
            if record.preview_url.is_none() {
                if let Some(url) = &preview.preview_url {
                    records.set_preview_url(seed_id, url);
                }
            }
            self.extractor.extract(&preview.path)
        });

        match result {
            Ok(features) => Some(features),
            Err(e) => {
                warn!(seed_id, error = %e, "seed unresolvable");
                None
            }
        }
    }

    fn candidate_features(
        &self,
        records: &dyn TrackStore,
        candidate: &TrackRef,
    ) -> Result<FeatureVector, ResolveError> {
        self.features.get_or_compute(records, &candidate.id, || {
            let preview =
                self.resolver
                    .resolve_preview(&candidate.name, &candidate.artist, &candidate.id)?;
            self.extractor.extract(&preview.path)
        })
    }
}

/// Seed search text: name, artist, and album, whitespace-collapsed.
fn seed_search_text(record: &TrackRecord) -> String {
    let text = format!("{} {} {}", record.name, record.artist, record.album);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
