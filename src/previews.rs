//! Preview resolution: catalog search → detail lookup → one-time download.
//!
//! Downloaded clips live at `<previews_dir>/<track_id>.mp3` and are
//! written once: an existing asset is returned as-is with no re-fetch and
//! no integrity check.  Writes go through a temp file and rename so
//! concurrent resolvers never observe a half-written clip.

use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::ResolveError;
use crate::saavn::SaavnClient;

/// Cap on a single preview download; clips are ~30 s of MP3.
const MAX_PREVIEW_BYTES: u64 = 20 * 1024 * 1024;

// ── Preview asset store ──────────────────────────────────────────────────────

/// Directory of downloaded preview clips, keyed by track id.
pub struct PreviewStore {
    dir: PathBuf,
}

impl PreviewStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        PreviewStore { dir: dir.into() }
    }

    /// Canonical asset path for a track id.
    pub fn path_for(&self, track_id: &str) -> PathBuf {
        self.dir.join(format!("{}.mp3", asset_name(track_id)))
    }

    /// The asset, if it has been downloaded before.
    pub fn get(&self, track_id: &str) -> Option<PathBuf> {
        let path = self.path_for(track_id);
        path.exists().then_some(path)
    }

    /// Persist preview bytes for a track id (write-once, atomic rename).
    pub fn save(&self, track_id: &str, bytes: &[u8]) -> Result<PathBuf, ResolveError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(track_id);
        let tmp = self.dir.join(format!(".tmp-{}", asset_name(track_id)));
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(path)
    }
}

/// Track ids come from an external catalog; keep only characters that are
/// safe as a file name.
fn asset_name(track_id: &str) -> String {
    track_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

// ── Resolver ─────────────────────────────────────────────────────────────────

/// Outcome of a successful resolution.
#[derive(Debug)]
pub struct ResolvedPreview {
    /// Local path of the preview clip.
    pub path: PathBuf,
    /// The remote preview URL, when this call performed a fresh lookup
    /// (None when the asset was already on disk).
    pub preview_url: Option<String>,
}

/// Maps a loosely-identified track to a local preview clip.
pub struct PreviewResolver {
    client: SaavnClient,
    store: PreviewStore,
    agent: ureq::Agent,
    search_limit: usize,
}

impl PreviewResolver {
    pub fn new(
        client: SaavnClient,
        store: PreviewStore,
        timeout: Duration,
        search_limit: usize,
    ) -> Self {
        PreviewResolver {
            client,
            store,
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            search_limit,
        }
    }

    /// Resolve a track's preview by display name and artist.
    pub fn resolve_preview(
        &self,
        track_name: &str,
        artist_name: &str,
        track_id: &str,
    ) -> Result<ResolvedPreview, ResolveError> {
        self.resolve_with_query(&format!("{} {}", track_name, artist_name), track_id)
    }

    /// Resolve with a caller-built search string (e.g. a translated seed
    /// query including the album name).
    ///
    /// The first search hit is authoritative — no fuzzy re-ranking.
    pub fn resolve_with_query(
        &self,
        search_text: &str,
        track_id: &str,
    ) -> Result<ResolvedPreview, ResolveError> {
        if let Some(path) = self.store.get(track_id) {
            debug!(track_id, "preview already on disk");
            return Ok(ResolvedPreview {
                path,
                preview_url: None,
            });
        }

        let hits = self.client.search(search_text, self.search_limit)?;
        let first = hits
            .first()
            .ok_or_else(|| ResolveError::NoMatch(search_text.to_string()))?;

        let detail = self.client.track_details(&first.id)?;
        let preview_url = detail
            .preview_url
            .ok_or_else(|| ResolveError::NoPreviewUrl(track_id.to_string()))?;

        let path = self.download(&preview_url, track_id)?;
        Ok(ResolvedPreview {
            path,
            preview_url: Some(preview_url),
        })
    }

    /// Download a preview clip, once per track id.
    ///
    /// An asset already on disk is returned without any network request.
    /// A missing or non-http URL, or a non-success status, is a
    /// resolution failure — never a panic.
    pub fn download(&self, preview_url: &str, track_id: &str) -> Result<PathBuf, ResolveError> {
        if let Some(path) = self.store.get(track_id) {
            return Ok(path);
        }

        if !preview_url.starts_with("http") {
            return Err(ResolveError::NoPreviewUrl(track_id.to_string()));
        }

        let response = self.agent.get(preview_url).call().map_err(|e| match e {
            ureq::Error::Status(code, _) => {
                warn!(track_id, code, "preview download refused");
                ResolveError::DownloadStatus(code)
            }
            other => other.into(),
        })?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_PREVIEW_BYTES)
            .read_to_end(&mut bytes)?;

        debug!(track_id, bytes = bytes.len(), "preview downloaded");
        self.store.save(track_id, &bytes)
    }
}
