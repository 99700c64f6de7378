//! AniList GraphQL client.

use std::time::Duration;

use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::cache::ResponseCache;
use crate::catalog::{Catalog, CatalogEntry, CatalogRelation, CatalogTitle, CoverImage};
use crate::config::Config;
use crate::error::CatalogError;
use crate::rate_limiter::RateLimiter;

// Constants for retry logic
const BASE_DELAY_MS: u64 = 500;
const MAX_DELAY_MS: u64 = 10000;
// Upper bound on a server-supplied Retry-After
const MAX_RETRY_AFTER_SECS: u64 = 30;

const RATE_LIMIT_IDENTIFIER: &str = "anilist";

const MEDIA_FIELDS: &str = r#"
    id
    title { romaji english native }
    format
    status
    episodes
    season
    seasonYear
    genres
    studios { nodes { name } }
    coverImage { large medium }
    description
    averageScore
    popularity
    synonyms
    startDate { year month day }
    endDate { year month day }
"#;

const RELATION_FIELDS: &str = r#"
    relations {
        edges {
            node { id title { romaji english } }
            relationType
        }
    }
"#;

lazy_static! {
    static ref SEARCH_QUERY: String = format!(
        "query ($search: String, $perPage: Int) {{ Page(page: 1, perPage: $perPage) {{ media(search: $search, type: ANIME) {{ {} }} }} }}",
        MEDIA_FIELDS
    );
    static ref MEDIA_QUERY: String = format!(
        "query ($id: Int) {{ Media(id: $id, type: ANIME) {{ {} {} }} }}",
        MEDIA_FIELDS, RELATION_FIELDS
    );
    static ref HTML_TAG: Regex = Regex::new(r"<[^>]*>").unwrap();
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
    #[serde(default)]
    status: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct PageData {
    #[serde(rename = "Page")]
    page: Option<MediaPage>,
}

#[derive(Debug, Deserialize)]
struct MediaPage {
    #[serde(default)]
    media: Vec<Media>,
}

#[derive(Debug, Deserialize)]
struct MediaData {
    #[serde(rename = "Media")]
    media: Option<Media>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Media {
    id: i64,
    title: Option<MediaTitle>,
    format: Option<String>,
    status: Option<String>,
    episodes: Option<u32>,
    season: Option<String>,
    season_year: Option<i32>,
    genres: Option<Vec<String>>,
    studios: Option<StudioConnection>,
    cover_image: Option<MediaCoverImage>,
    description: Option<String>,
    average_score: Option<u32>,
    popularity: Option<u32>,
    synonyms: Option<Vec<String>>,
    start_date: Option<FuzzyDate>,
    end_date: Option<FuzzyDate>,
    relations: Option<RelationConnection>,
}

#[derive(Debug, Deserialize, Default)]
struct MediaTitle {
    romaji: Option<String>,
    english: Option<String>,
    native: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StudioConnection {
    #[serde(default)]
    nodes: Vec<Studio>,
}

#[derive(Debug, Deserialize)]
struct Studio {
    name: String,
}

#[derive(Debug, Deserialize)]
struct MediaCoverImage {
    large: Option<String>,
    medium: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
struct FuzzyDate {
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RelationConnection {
    #[serde(default)]
    edges: Vec<RelationEdge>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelationEdge {
    node: Option<RelationNode>,
    relation_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RelationNode {
    id: i64,
    title: Option<MediaTitle>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Strips HTML tags and collapses whitespace. Empty results become `None`.
fn clean_description(description: Option<String>) -> Option<String> {
    let raw = description?;
    let stripped = HTML_TAG.replace_all(&raw, "");
    let cleaned = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    (!cleaned.is_empty()).then_some(cleaned)
}

/// `YYYY-MM-DD`, with a missing month or day read as 1. No year, no date.
fn format_date(date: Option<FuzzyDate>) -> Option<String> {
    let date = date?;
    let year = date.year?;
    Some(format!(
        "{:04}-{:02}-{:02}",
        year,
        date.month.unwrap_or(1),
        date.day.unwrap_or(1)
    ))
}

impl From<MediaTitle> for CatalogTitle {
    fn from(title: MediaTitle) -> Self {
        CatalogTitle {
            romaji: non_empty(title.romaji),
            english: non_empty(title.english),
            native: non_empty(title.native),
        }
    }
}

/// Edges without a node are dropped.
fn relation_from_edge(edge: RelationEdge) -> Option<CatalogRelation> {
    let node = edge.node?;
    let title = node.title.unwrap_or_default();
    Some(CatalogRelation {
        id: node.id,
        title: non_empty(title.romaji)
            .or_else(|| non_empty(title.english))
            .unwrap_or_default(),
        kind: edge.relation_type.unwrap_or_default().to_lowercase(),
    })
}

impl From<Media> for CatalogEntry {
    fn from(media: Media) -> Self {
        let cover = media.cover_image.map(|c| CoverImage {
            large: non_empty(c.large),
            medium: non_empty(c.medium),
        });

        CatalogEntry {
            id: media.id,
            title: media.title.map(CatalogTitle::from).unwrap_or_default(),
            format: non_empty(media.format),
            status: non_empty(media.status).map(|s| s.to_lowercase()),
            episodes: media.episodes,
            season: non_empty(media.season),
            year: media
                .season_year
                .or_else(|| media.start_date.and_then(|d| d.year)),
            genres: media.genres.unwrap_or_default(),
            studios: media
                .studios
                .map(|s| s.nodes.into_iter().map(|n| n.name).collect())
                .unwrap_or_default(),
            cover_image: cover.unwrap_or_default(),
            description: clean_description(media.description),
            score: media.average_score,
            popularity: media.popularity,
            synonyms: media
                .synonyms
                .unwrap_or_default()
                .into_iter()
                .filter(|s| !s.trim().is_empty())
                .collect(),
            start_date: format_date(media.start_date),
            end_date: format_date(media.end_date),
            relations: media
                .relations
                .map(|r| r.edges.into_iter().filter_map(relation_from_edge).collect())
                .unwrap_or_default(),
        }
    }
}

/// Outcome of decoding one GraphQL response body.
#[derive(Debug)]
enum Decoded<T> {
    Data(Option<T>),
    NotFound,
}

/// Interprets a raw AniList response.
///
/// 429 and 5xx are reported as [`CatalogError::Status`] so the caller can
/// retry them. A GraphQL `errors` array becomes [`CatalogError::Upstream`]
/// with the first message, except a 404 error which means the id does not
/// exist.
fn decode_response<T: DeserializeOwned>(status: u16, body: &str) -> Result<Decoded<T>, CatalogError> {
    if status == 429 || status >= 500 {
        return Err(CatalogError::Status(status));
    }

    let success = (200..300).contains(&status);
    let response: GraphQlResponse<T> = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(_) if !success => return Err(CatalogError::Status(status)),
        Err(e) => return Err(CatalogError::Decode(e)),
    };

    if let Some(first) = response.errors.first() {
        if first.status == Some(404) {
            return Ok(Decoded::NotFound);
        }
        return Err(CatalogError::Upstream(first.message.clone()));
    }
    if !success {
        return Err(CatalogError::Status(status));
    }

    Ok(Decoded::Data(response.data))
}

/// Delay before retry number `attempt` (1-based): 500ms doubling up to 10s.
fn backoff_delay(attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    Duration::from_millis(BASE_DELAY_MS.saturating_mul(factor).min(MAX_DELAY_MS))
}

struct RawResponse {
    status: u16,
    retry_after: Option<Duration>,
    body: String,
}

pub struct AniListClient {
    client: reqwest::blocking::Client,
    api_url: String,
    page_size: u32,
    max_retries: u32,
    limiter: RateLimiter,
    cache: ResponseCache,
}

/// Build HTTP client with proper timeout
fn build_client(config: &Config) -> Result<reqwest::blocking::Client, reqwest::Error> {
    reqwest::blocking::Client::builder()
        .timeout(config.request_timeout())
        .user_agent(config.user_agent.clone())
        .build()
}

impl AniListClient {
    pub fn new(config: &Config, limiter: RateLimiter, cache: ResponseCache) -> Result<Self, CatalogError> {
        Ok(AniListClient {
            client: build_client(config)?,
            api_url: config.anilist_api_url.clone(),
            page_size: config.search_page_size,
            max_retries: config.max_retries,
            limiter,
            cache,
        })
    }

    /// Client with the configured per-minute limit and on-disk cache.
    pub fn from_config(config: &Config) -> Result<Self, CatalogError> {
        let limiter = RateLimiter::per_minute(config.rate_limit_per_minute as usize);
        let cache = ResponseCache::new(&config.cache_dir, config.cache_ttl(), config.cache_enabled);
        Self::new(config, limiter, cache)
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    fn send(&self, body: &Value) -> Result<RawResponse, CatalogError> {
        let response = self
            .client
            .post(&self.api_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body)
            .send()?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(|secs| Duration::from_secs(secs.min(MAX_RETRY_AFTER_SECS)));
        let body = response.text()?;

        Ok(RawResponse { status, retry_after, body })
    }

    /// Posts one GraphQL query, retrying transport failures, 429 and 5xx
    /// with exponential backoff. Every attempt takes its own rate-limit slot.
    fn execute<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<Decoded<T>, CatalogError> {
        let body = json!({ "query": query, "variables": variables });
        let mut attempt = 0;

        loop {
            let mut retry_after = None;
            let outcome = self.acquire_slot().and_then(|()| self.send(&body)).and_then(|raw| {
                retry_after = raw.retry_after;
                decode_response::<T>(raw.status, &raw.body)
            });

            match outcome {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = retry_after.unwrap_or_else(|| backoff_delay(attempt));
                    warn!(
                        "[ANILIST] {} (attempt {}/{}), retrying in {}ms",
                        e,
                        attempt,
                        self.max_retries + 1,
                        delay.as_millis()
                    );
                    std::thread::sleep(delay);
                }
                Err(e) => {
                    warn!("[ANILIST] Request failed: {}", e);
                    return Err(e);
                }
                Ok(decoded) => return Ok(decoded),
            }
        }
    }

    fn acquire_slot(&self) -> Result<(), CatalogError> {
        if self.limiter.check(RATE_LIMIT_IDENTIFIER) {
            Ok(())
        } else {
            Err(CatalogError::RateLimited { identifier: RATE_LIMIT_IDENTIFIER.to_string() })
        }
    }

    fn store<T: serde::Serialize>(&self, key: &str, value: &T) {
        if let Err(e) = self.cache.set(key, value) {
            warn!("[CACHE] Failed to store '{}': {}", key, e);
        }
    }
}

impl Catalog for AniListClient {
    fn search(&self, query: &str) -> Result<Vec<CatalogEntry>, CatalogError> {
        let cache_key = format!("anilist_search_{}", query);
        if let Some(cached) = self.cache.get::<Vec<CatalogEntry>>(&cache_key) {
            return Ok(cached);
        }

        debug!("[ANILIST] Searching for '{}'", query);

        let decoded = self.execute::<PageData>(
            &SEARCH_QUERY,
            json!({ "search": query, "perPage": self.page_size }),
        )?;
        let media = match decoded {
            Decoded::Data(Some(PageData { page: Some(page) })) => page.media,
            _ => return Ok(Vec::new()),
        };

        let results: Vec<CatalogEntry> = media.into_iter().map(CatalogEntry::from).collect();
        info!("[ANILIST] '{}' returned {} results", query, results.len());
        self.store(&cache_key, &results);
        Ok(results)
    }

    fn get_by_id(&self, id: i64) -> Result<Option<CatalogEntry>, CatalogError> {
        let cache_key = format!("anilist_anime_{}", id);
        if let Some(cached) = self.cache.get::<CatalogEntry>(&cache_key) {
            return Ok(Some(cached));
        }

        debug!("[ANILIST] Fetching media #{}", id);

        let entry = match self.execute::<MediaData>(&MEDIA_QUERY, json!({ "id": id }))? {
            Decoded::Data(Some(MediaData { media: Some(media) })) => CatalogEntry::from(media),
            _ => {
                info!("[ANILIST] Media #{} not found", id);
                return Ok(None);
            }
        };

        self.store(&cache_key, &entry);
        Ok(Some(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use std::io::Read;
    use std::thread;
    use tempfile::TempDir;
    use tiny_http::{Header, Response, Server};

    const SEARCH_BODY: &str = r#"{
        "data": {
            "Page": {
                "media": [
                    {
                        "id": 151807,
                        "title": { "romaji": "Ore dake Level Up na Ken", "english": "Solo Leveling", "native": "俺だけレベルアップな件" },
                        "format": "TV",
                        "status": "FINISHED",
                        "episodes": 12,
                        "season": "WINTER",
                        "seasonYear": 2024,
                        "genres": ["Action", "Fantasy"],
                        "studios": { "nodes": [{ "name": "A-1 Pictures" }] },
                        "coverImage": { "large": "https://img/large.jpg", "medium": null },
                        "description": "Ten years ago, <i>the Gate</i> appeared.<br>\n<br>\nHunters rose.",
                        "averageScore": 82,
                        "popularity": 350000,
                        "synonyms": ["Na Honjaman Level Up", "", " "],
                        "startDate": { "year": 2024, "month": 1, "day": 7 },
                        "endDate": { "year": 2024, "month": 3, "day": null }
                    },
                    {
                        "id": 9,
                        "title": { "romaji": "Untitled", "english": null, "native": null },
                        "format": null,
                        "status": null,
                        "episodes": null,
                        "season": null,
                        "seasonYear": null,
                        "genres": null,
                        "studios": null,
                        "coverImage": null,
                        "description": null,
                        "averageScore": null,
                        "popularity": null,
                        "synonyms": null,
                        "startDate": { "year": 2019, "month": null, "day": null },
                        "endDate": { "year": null, "month": null, "day": null }
                    }
                ]
            }
        }
    }"#;

    fn decode_search(body: &str) -> Vec<CatalogEntry> {
        match decode_response::<PageData>(200, body).unwrap() {
            Decoded::Data(Some(PageData { page: Some(page) })) => {
                page.media.into_iter().map(CatalogEntry::from).collect()
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_search_response_mapping() {
        let entries = decode_search(SEARCH_BODY);
        assert_eq!(entries.len(), 2);

        let solo = &entries[0];
        assert_eq!(solo.id, 151807);
        assert_eq!(solo.display_title(), "Solo Leveling");
        assert_eq!(solo.status.as_deref(), Some("finished"));
        assert_eq!(solo.year, Some(2024));
        assert_eq!(solo.studios, vec!["A-1 Pictures"]);
        assert_eq!(solo.cover_image.large.as_deref(), Some("https://img/large.jpg"));
        assert_eq!(solo.cover_image.medium, None);
        assert_eq!(
            solo.description.as_deref(),
            Some("Ten years ago, the Gate appeared. Hunters rose.")
        );
        assert_eq!(solo.score, Some(82));
        assert_eq!(solo.synonyms, vec!["Na Honjaman Level Up"]);
        assert_eq!(solo.start_date.as_deref(), Some("2024-01-07"));
        assert_eq!(solo.end_date.as_deref(), Some("2024-03-01"));
    }

    #[test]
    fn test_sparse_media_mapping() {
        let entries = decode_search(SEARCH_BODY);
        let sparse = &entries[1];

        assert_eq!(sparse.display_title(), "Untitled");
        assert_eq!(sparse.title.english, None);
        assert_eq!(sparse.year, Some(2019));
        assert_eq!(sparse.start_date.as_deref(), Some("2019-01-01"));
        assert_eq!(sparse.end_date, None);
        assert!(sparse.genres.is_empty());
        assert!(sparse.studios.is_empty());
        assert_eq!(sparse.description, None);
    }

    #[test]
    fn test_relations_mapping() {
        let body = r#"{
            "data": {
                "Media": {
                    "id": 176496,
                    "title": { "romaji": "Ore dake Level Up na Ken Season 2", "english": "", "native": null },
                    "relations": {
                        "edges": [
                            { "node": { "id": 151807, "title": { "romaji": "Ore dake Level Up na Ken", "english": "Solo Leveling" } }, "relationType": "PREQUEL" },
                            { "node": { "id": 5, "title": { "romaji": null, "english": "Solo Leveling: ReAwakening" } }, "relationType": "SIDE_STORY" },
                            { "node": null, "relationType": "OTHER" }
                        ]
                    }
                }
            }
        }"#;

        let entry = match decode_response::<MediaData>(200, body).unwrap() {
            Decoded::Data(Some(MediaData { media: Some(media) })) => CatalogEntry::from(media),
            other => panic!("unexpected {:?}", other),
        };

        // empty english is treated as missing
        assert_eq!(entry.display_title(), "Ore dake Level Up na Ken Season 2");
        assert_eq!(
            entry.relations,
            vec![
                CatalogRelation { id: 151807, title: "Ore dake Level Up na Ken".into(), kind: "prequel".into() },
                CatalogRelation { id: 5, title: "Solo Leveling: ReAwakening".into(), kind: "side_story".into() },
            ]
        );
    }

    #[test]
    fn test_graphql_errors() {
        let body = r#"{ "errors": [{ "message": "Invalid token", "status": 400 }, { "message": "second" }], "data": null }"#;
        let err = decode_response::<PageData>(400, body).unwrap_err();
        assert!(matches!(err, CatalogError::Upstream(ref m) if m == "Invalid token"));

        let not_found = r#"{ "errors": [{ "message": "Not Found.", "status": 404 }], "data": { "Media": null } }"#;
        assert!(matches!(decode_response::<MediaData>(404, not_found).unwrap(), Decoded::NotFound));
    }

    #[test]
    fn test_status_and_decode_errors() {
        assert!(matches!(decode_response::<PageData>(429, ""), Err(CatalogError::Status(429))));
        assert!(matches!(decode_response::<PageData>(502, "<html>"), Err(CatalogError::Status(502))));
        assert!(matches!(decode_response::<PageData>(403, "<html>"), Err(CatalogError::Status(403))));
        assert!(matches!(decode_response::<PageData>(200, "<html>"), Err(CatalogError::Decode(_))));
    }

    #[test]
    fn test_backoff_delay() {
        assert_eq!(backoff_delay(1), Duration::from_millis(500));
        assert_eq!(backoff_delay(2), Duration::from_millis(1000));
        assert_eq!(backoff_delay(3), Duration::from_millis(2000));
        assert_eq!(backoff_delay(6), Duration::from_millis(10000));
        assert_eq!(backoff_delay(64), Duration::from_millis(10000));
    }

    #[test]
    fn test_date_formatting() {
        let date = |year, month, day| Some(FuzzyDate { year, month, day });
        assert_eq!(format_date(date(Some(2024), Some(10), Some(3))).as_deref(), Some("2024-10-03"));
        assert_eq!(format_date(date(Some(2024), None, Some(3))).as_deref(), Some("2024-01-03"));
        assert_eq!(format_date(date(None, Some(10), Some(3))), None);
        assert_eq!(format_date(None), None);
    }

    fn offline_client(dir: &TempDir, limit: usize) -> AniListClient {
        // Port 9 (discard) is never contacted by these tests
        let config = Config {
            anilist_api_url: "http://127.0.0.1:9".to_string(),
            max_retries: 0,
            ..Config::default()
        };
        let cache = ResponseCache::new(dir.path(), ChronoDuration::seconds(3600), true);
        AniListClient::new(&config, RateLimiter::per_minute(limit), cache).unwrap()
    }

    #[test]
    fn test_cache_hit_skips_rate_limiter() {
        let dir = TempDir::new().unwrap();
        let client = offline_client(&dir, 0);

        let cached = CatalogEntry { id: 42, ..Default::default() };
        client.cache().set("anilist_anime_42", &cached).unwrap();
        client.cache().set("anilist_search_Frieren", &vec![cached.clone()]).unwrap();

        assert_eq!(client.get_by_id(42).unwrap(), Some(cached.clone()));
        assert_eq!(client.search("Frieren").unwrap(), vec![cached]);
    }

    #[test]
    fn test_exhausted_limit_sends_nothing() {
        let dir = TempDir::new().unwrap();
        let client = offline_client(&dir, 0);

        let err = client.search("Frieren").unwrap_err();
        assert!(matches!(err, CatalogError::RateLimited { ref identifier } if identifier == "anilist"));
        assert!(matches!(client.get_by_id(1), Err(CatalogError::RateLimited { .. })));
    }

    const MEDIA_BODY: &str = r#"{ "data": { "Media": { "id": 21, "title": { "romaji": "One Piece" } } } }"#;
    const NOT_FOUND_BODY: &str = r#"{ "errors": [{ "message": "Not Found.", "status": 404 }], "data": { "Media": null } }"#;

    /// Answers requests on a local port with `replies` in order, then stops.
    /// The handle yields the request bodies that were received.
    fn serve(replies: Vec<(u16, Option<&'static str>, &'static str)>) -> (String, thread::JoinHandle<Vec<String>>) {
        let server = Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().to_ip().unwrap().port();

        let handle = thread::spawn(move || {
            let mut received = Vec::new();
            for (status, retry_after, body) in replies {
                let mut request = match server.recv_timeout(Duration::from_secs(5)) {
                    Ok(Some(request)) => request,
                    _ => break,
                };
                let mut content = String::new();
                request.as_reader().read_to_string(&mut content).unwrap();
                received.push(content);

                let mut response = Response::from_string(body).with_status_code(status);
                if let Some(secs) = retry_after {
                    response.add_header(Header::from_bytes(&b"Retry-After"[..], secs.as_bytes()).unwrap());
                }
                let _ = request.respond(response);
            }
            received
        });

        (format!("http://127.0.0.1:{}", port), handle)
    }

    fn local_client(dir: &TempDir, url: &str, limit: usize, max_retries: u32) -> AniListClient {
        let config = Config {
            anilist_api_url: url.to_string(),
            max_retries,
            ..Config::default()
        };
        let cache = ResponseCache::new(dir.path(), ChronoDuration::seconds(3600), true);
        let mut client = AniListClient::new(&config, RateLimiter::per_minute(limit), cache).unwrap();
        // loopback only, never through a proxy from the environment
        client.client = reqwest::blocking::Client::builder().no_proxy().build().unwrap();
        client
    }

    #[test]
    fn test_server_errors_are_retried() {
        let dir = TempDir::new().unwrap();
        let (url, server) = serve(vec![
            (503, None, "<html>busy</html>"),
            (503, Some("0"), "<html>busy</html>"),
            (200, None, SEARCH_BODY),
        ]);
        let client = local_client(&dir, &url, 10, 3);

        let results = client.search("Solo Leveling").unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, 151807);
        let received = server.join().unwrap();
        assert_eq!(received.len(), 3);
        assert!(received.iter().all(|b| b.contains(r#""search":"Solo Leveling""#)));
        assert!(client.cache().path_for("anilist_search_Solo Leveling").exists());
    }

    #[test]
    fn test_rate_limited_status_surfaces_after_last_retry() {
        let dir = TempDir::new().unwrap();
        let (url, server) = serve(vec![(429, Some("0"), ""), (429, Some("0"), ""), (429, Some("0"), "")]);
        let client = local_client(&dir, &url, 10, 2);

        let err = client.search("Frieren").unwrap_err();

        assert!(matches!(err, CatalogError::Status(429)));
        assert_eq!(server.join().unwrap().len(), 3);
        assert!(!client.cache().path_for("anilist_search_Frieren").exists());
    }

    #[test]
    fn test_each_attempt_takes_a_rate_limit_slot() {
        let dir = TempDir::new().unwrap();
        let (url, server) = serve(vec![(503, Some("0"), ""), (503, Some("0"), "")]);
        let client = local_client(&dir, &url, 2, 3);

        let err = client.search("Frieren").unwrap_err();

        assert!(matches!(err, CatalogError::RateLimited { .. }));
        assert_eq!(server.join().unwrap().len(), 2);
    }

    #[test]
    fn test_fetched_media_is_cached() {
        let dir = TempDir::new().unwrap();
        let (url, server) = serve(vec![(200, None, MEDIA_BODY)]);
        let client = local_client(&dir, &url, 10, 0);

        let entry = client.get_by_id(21).unwrap().unwrap();

        assert_eq!(entry.display_title(), "One Piece");
        assert_eq!(server.join().unwrap().len(), 1);
        assert_eq!(client.cache().get::<CatalogEntry>("anilist_anime_21"), Some(entry.clone()));
        // served from the cache, no second request
        assert_eq!(client.get_by_id(21).unwrap(), Some(entry));
    }

    #[test]
    fn test_missing_media_is_none_and_not_cached() {
        let dir = TempDir::new().unwrap();
        let (url, server) = serve(vec![
            (404, None, NOT_FOUND_BODY),
            (200, None, r#"{ "data": { "Page": null } }"#),
        ]);
        let client = local_client(&dir, &url, 10, 3);

        assert_eq!(client.get_by_id(999).unwrap(), None);
        assert!(client.search("Nothing Here").unwrap().is_empty());

        assert_eq!(server.join().unwrap().len(), 2);
        assert!(!client.cache().path_for("anilist_anime_999").exists());
        assert!(!client.cache().path_for("anilist_search_Nothing Here").exists());
    }
}
