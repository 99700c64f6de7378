//! Coarse "base" titles with season, episode and bracket noise removed.
//! Only used for equality boosting and the lenient fallback, never as a query.

use lazy_static::lazy_static;
use regex::Regex;

use crate::catalog::CatalogEntry;
use crate::normalizer::collapse_whitespace;

/// Removed from a release title, in order.
pub const TORRENT_BASE_NOISE: &[&str] = &[
    r"(?i)\b(?:S\d+|Season\s*\d+)\b",
    r"(?i)\b(?:E\d+|Episode\s*\d+)\b",
    r"\[.*?\]",
    r"\(.*?\)",
    r"\b\d{3,4}p\b",
];

/// Removed from a catalog title, in order. The second pattern drops a
/// `: Subtitle` / `- Subtitle` clause (separator plus one word).
pub const ENTRY_BASE_NOISE: &[&str] = &[
    r"(?i)\b(?:Season\s*\d+|Part\s*\d+|2nd|3rd|Second|Third)\b",
    r"[-:]\s*\w+",
];

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| Regex::new(p).unwrap()).collect()
}

lazy_static! {
    static ref TORRENT_NOISE: Vec<Regex> = compile(TORRENT_BASE_NOISE);
    static ref ENTRY_NOISE: Vec<Regex> = compile(ENTRY_BASE_NOISE);
    static ref ENTRY_SEASON: Regex = Regex::new(r"(?i)\b(?:season\s*|s)(\d+)\b").unwrap();
    static ref SEASON_INDICATOR: Regex =
        Regex::new(r"(?i)\b(?:season|s\d+|2nd|3rd|second|third)\b").unwrap();
}

fn strip_all(text: &str, patterns: &[Regex]) -> String {
    patterns
        .iter()
        .fold(text.to_string(), |acc, re| re.replace_all(&acc, "").into_owned())
}

pub fn from_torrent(title: &str) -> String {
    collapse_whitespace(&strip_all(title, &TORRENT_NOISE))
}

pub fn from_entry(entry: &CatalogEntry) -> String {
    strip_all(entry.display_title(), &ENTRY_NOISE).trim().to_string()
}

/// Season number written into the entry's display title, if any.
pub fn entry_season(entry: &CatalogEntry) -> Option<u32> {
    let title = entry.display_title().to_lowercase();
    ENTRY_SEASON
        .captures(&title)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// True when the entry is the requested season: the display title names
/// that season, or season 1 is requested and the title carries no season
/// or ordinal indicator at all.
pub fn matches_season(entry: &CatalogEntry, season: u32) -> bool {
    match entry_season(entry) {
        Some(number) => number == season,
        None => season == 1 && !SEASON_INDICATOR.is_match(entry.display_title()),
    }
}
