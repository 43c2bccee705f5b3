//! JioSaavn catalog client: free-text song search and detail lookup.
//!
//! This is the secondary catalog used solely to locate downloadable
//! preview clips.  It is unauthenticated, so requests go through an
//! adaptive [`RateLimiter`], and both endpoints are cached for an hour
//! (search by exact query + limit, details by song id).

use std::sync::Mutex;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::cache::{cache_key, TtlCache, TTL_ONE_HOUR};
use crate::error::ResolveError;
use crate::rate_limiter::RateLimiter;

const DEFAULT_BASE_URL: &str = "https://www.jiosaavn.com";
const USER_AGENT: &str = "soundalike/0.1";

// ── API response types ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiSearchResponse {
    #[serde(default)]
    songs: ApiSearchSongs,
}

#[derive(Debug, Default, Deserialize)]
struct ApiSearchSongs {
    #[serde(default)]
    data: Vec<ApiSearchSong>,
}

#[derive(Debug, Deserialize)]
struct ApiSearchSong {
    id: String,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct ApiSongDetail {
    id: String,
    #[serde(default)]
    song: String,
    #[serde(default)]
    primary_artists: String,
    #[serde(default)]
    album: String,
    #[serde(default)]
    year: String,
    #[serde(default)]
    image: String,
    #[serde(default)]
    duration: String,
    #[serde(default)]
    vlink: Option<String>,
    #[serde(default)]
    media_preview_url: Option<String>,
}

// ── Public types ─────────────────────────────────────────────────────────────

/// One text-search result (lightweight, before fetching full detail).
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
}

/// Full song detail, including the preview link when the catalog has one.
#[derive(Debug, Clone)]
pub struct TrackDetail {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub album: String,
    pub year: String,
    /// Artwork URL with its dimension token normalized to 500x500.
    pub image_url: String,
    pub duration_ms: u64,
    pub preview_url: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────────────

pub struct SaavnClient {
    agent: ureq::Agent,
    base_url: String,
    limiter: Mutex<RateLimiter>,
    search_cache: TtlCache<Vec<SearchHit>>,
    detail_cache: TtlCache<TrackDetail>,
}

impl SaavnClient {
    pub fn new(timeout: Duration) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    /// Point the client at a different host (used by tests).
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Self {
        SaavnClient {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            base_url: base_url.trim_end_matches('/').to_string(),
            limiter: Mutex::new(RateLimiter::from_millis("saavn", 250)),
            search_cache: TtlCache::new("saavn_search", TTL_ONE_HOUR),
            detail_cache: TtlCache::new("saavn_details", TTL_ONE_HOUR),
        }
    }

    /// Search songs by free text, truncated to `limit` hits.
    ///
    /// An empty query is an empty result, not an error.  Results are
    /// cached by the exact query string and limit.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, ResolveError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let limit_param = limit.to_string();
        let key = cache_key("saavn_search", query, &[limit_param.as_str()]);
        if let Some(hits) = self.search_cache.get(&key) {
            return Ok(hits);
        }

        let url = format!(
            "{}/api.php?__call=autocomplete.get&_format=json&_marker=0&cc=in&includeMetaTags=1&query={}",
            self.base_url,
            urlencoded(query)
        );
        let body = self.get_json(&url)?;
        let hits = parse_search(body, limit)?;

        debug!(query, hits = hits.len(), "saavn search");
        self.search_cache.insert(key, hits.clone());
        Ok(hits)
    }

    /// Fetch full detail for a song id.  Cached per id.
    pub fn track_details(&self, song_id: &str) -> Result<TrackDetail, ResolveError> {
        let key = cache_key("saavn_details", song_id, &[]);
        if let Some(detail) = self.detail_cache.get(&key) {
            return Ok(detail);
        }

        let url = format!(
            "{}/api.php?__call=song.getDetails&cc=in&_marker=0%3F_marker%3D0&_format=json&pids={}",
            self.base_url,
            urlencoded(song_id)
        );
        let body = self.get_json(&url)?;
        let detail = parse_detail(body, song_id)?;

        self.detail_cache.insert(key, detail.clone());
        Ok(detail)
    }

    fn get_json(&self, url: &str) -> Result<Value, ResolveError> {
        if let Ok(mut limiter) = self.limiter.lock() {
            limiter.wait_if_needed();
        }

        let response = self
            .agent
            .get(url)
            .set("User-Agent", USER_AGENT)
            .set("Accept", "application/json")
            .call();

        match response {
            Ok(resp) => {
                let value: Value = resp.into_json().map_err(ResolveError::Io)?;
                if let Ok(mut limiter) = self.limiter.lock() {
                    limiter.report_success();
                }
                Ok(value)
            }
            Err(e) => {
                if let Ok(mut limiter) = self.limiter.lock() {
                    limiter.report_failure();
                }
                Err(e.into())
            }
        }
    }
}

// ── Parsing ──────────────────────────────────────────────────────────────────

fn parse_search(body: Value, limit: usize) -> Result<Vec<SearchHit>, ResolveError> {
    let response: ApiSearchResponse = serde_json::from_value(body)?;
    Ok(response
        .songs
        .data
        .into_iter()
        .take(limit)
        .map(|song| SearchHit {
            id: song.id,
            title: song.title,
        })
        .collect())
}

fn parse_detail(body: Value, song_id: &str) -> Result<TrackDetail, ResolveError> {
    let entry = body
        .get(song_id)
        .cloned()
        .ok_or_else(|| {
            ResolveError::BadResponse(format!("detail response missing id {}", song_id))
        })?;
    let api: ApiSongDetail = serde_json::from_value(entry)?;

    // Prefer the direct preview link, fall back to the media preview
    let preview_url = api
        .vlink
        .filter(|v| !v.is_empty())
        .or(api.media_preview_url.filter(|v| !v.is_empty()));

    let duration_ms = api.duration.trim().parse::<u64>().unwrap_or(0) * 1000;

    Ok(TrackDetail {
        id: api.id,
        name: api.song,
        artist: api.primary_artists,
        album: api.album,
        year: api.year,
        image_url: normalize_image_size(&api.image),
        duration_ms,
        preview_url,
    })
}

/// Replace any `<W>x<H>` dimension token in an artwork URL with `500x500`.
pub fn normalize_image_size(url: &str) -> String {
    let chars: Vec<char> = url.chars().collect();
    let mut out = String::with_capacity(url.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_ascii_digit() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            if i < chars.len() && chars[i] == 'x' {
                let mut j = i + 1;
                while j < chars.len() && chars[j].is_ascii_digit() {
                    j += 1;
                }
                if j > i + 1 {
                    out.push_str("500x500");
                    i = j;
                    continue;
                }
            }
            for &c in &chars[start..i] {
                out.push(c);
            }
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

/// Minimal percent-encoding for query strings.
fn urlencoded(s: &str) -> String {
    s.replace('%', "%25")
        .replace(' ', "%20")
        .replace('&', "%26")
        .replace('=', "%3D")
        .replace('+', "%2B")
        .replace('#', "%23")
        .replace('?', "%3F")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_search_truncates_to_limit() {
        let body = json!({
            "songs": {
                "data": [
                    {"id": "s1", "title": "First Song"},
                    {"id": "s2", "title": "Second Song"},
                    {"id": "s3", "title": "Third Song"}
                ]
            }
        });
        let hits = parse_search(body, 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "s1");
        assert_eq!(hits[1].title, "Second Song");
    }

    #[test]
    fn test_parse_search_tolerates_missing_songs() {
        let hits = parse_search(json!({"albums": {}}), 10).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_parse_detail_prefers_vlink() {
        let body = json!({
            "s1": {
                "id": "s1",
                "song": "Blue in Green",
                "primary_artists": "Miles Davis",
                "album": "Kind of Blue",
                "year": "1959",
                "image": "https://cdn.example.com/art_150x150.jpg",
                "duration": "337",
                "vlink": "https://cdn.example.com/preview.mp4",
                "media_preview_url": "https://cdn.example.com/media.mp4"
            }
        });
        let detail = parse_detail(body, "s1").unwrap();
        assert_eq!(detail.preview_url.as_deref(), Some("https://cdn.example.com/preview.mp4"));
        assert_eq!(detail.duration_ms, 337_000);
        assert_eq!(detail.image_url, "https://cdn.example.com/art_500x500.jpg");
        assert_eq!(detail.artist, "Miles Davis");
    }

    #[test]
    fn test_parse_detail_falls_back_to_media_preview() {
        let body = json!({
            "s1": {
                "id": "s1",
                "song": "Song",
                "duration": "100",
                "vlink": "",
                "media_preview_url": "https://cdn.example.com/media.mp4"
            }
        });
        let detail = parse_detail(body, "s1").unwrap();
        assert_eq!(detail.preview_url.as_deref(), Some("https://cdn.example.com/media.mp4"));
    }

    #[test]
    fn test_parse_detail_no_preview_is_none_not_error() {
        let body = json!({
            "s1": {"id": "s1", "song": "Song", "duration": "100"}
        });
        let detail = parse_detail(body, "s1").unwrap();
        assert_eq!(detail.preview_url, None);
    }

    #[test]
    fn test_parse_detail_missing_id_is_error() {
        let err = parse_detail(json!({"other": {}}), "s1");
        assert!(err.is_err());
    }

    #[test]
    fn test_empty_query_skips_network() {
        // Bogus base URL: a network attempt would fail, an empty query must not
        let client = SaavnClient::with_base_url("http://127.0.0.1:1", Duration::from_millis(100));
        assert!(client.search("", 10).unwrap().is_empty());
        assert!(client.search("   ", 10).unwrap().is_empty());
    }

    #[test]
    fn test_normalize_image_size() {
        assert_eq!(
            normalize_image_size("https://c.saavncdn.com/a/b_150x150.jpg"),
            "https://c.saavncdn.com/a/b_500x500.jpg"
        );
        assert_eq!(
            normalize_image_size("https://cdn.example.com/50x50/art.jpg"),
            "https://cdn.example.com/500x500/art.jpg"
        );
        // No dimension token → unchanged
        assert_eq!(
            normalize_image_size("https://cdn.example.com/art.jpg"),
            "https://cdn.example.com/art.jpg"
        );
        // Bare digits before an x with no trailing digits are left alone
        assert_eq!(normalize_image_size("track12xl.jpg"), "track12xl.jpg");
    }

    #[test]
    fn test_urlencoded_escapes_query_characters() {
        assert_eq!(urlencoded("a b&c=d"), "a%20b%26c%3Dd");
    }
}
