//! Ordered search strategies. Each strategy derives one query from the
//! parsed title (or declines); the first query that returns anything wins.

use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;

use crate::catalog::{Catalog, CatalogEntry};
use crate::error::CatalogError;
use crate::normalizer::{self, ParsedTitle};

/// Minimum length, in characters, for the loosest fallback queries.
const MIN_FALLBACK_QUERY_LEN: usize = 4;

pub struct SearchStrategy {
    pub name: &'static str,
    pub query: fn(&ParsedTitle) -> Option<String>,
}

pub const STRATEGIES: &[SearchStrategy] = &[
    SearchStrategy { name: "normalized", query: normalized_query },
    SearchStrategy { name: "base title", query: base_title_query },
    SearchStrategy { name: "without season", query: seasonless_query },
    SearchStrategy { name: "raw title", query: raw_query },
    SearchStrategy { name: "leading words", query: leading_words_query },
    SearchStrategy { name: "alternate title", query: alternate_title_query },
];

lazy_static! {
    static ref TRAILING_SEASON: Regex = Regex::new(r"(?i)\s+(?:S\d+|Season\s*\d+).*$").unwrap();
    static ref LEADING_WORDS: Regex =
        Regex::new(r"(?i)^([A-Za-z0-9\s]+?)(?:\s+S\d+|\s+Season|\s*[\[(])").unwrap();
}

fn normalized_query(title: &ParsedTitle) -> Option<String> {
    Some(title.normalized.clone()).filter(|q| !q.is_empty())
}

fn base_title_query(title: &ParsedTitle) -> Option<String> {
    Some(title.base.clone()).filter(|q| !q.is_empty() && *q != title.normalized)
}

fn seasonless_query(title: &ParsedTitle) -> Option<String> {
    let main = TRAILING_SEASON.replace(&title.normalized, "").into_owned();
    Some(main).filter(|q| !q.is_empty() && *q != title.normalized && *q != title.base)
}

fn raw_query(title: &ParsedTitle) -> Option<String> {
    Some(title.raw.clone()).filter(|q| !q.trim().is_empty())
}

fn leading_words_query(title: &ParsedTitle) -> Option<String> {
    let caps = LEADING_WORDS.captures(&title.raw)?;
    let words = caps.get(1)?.as_str().trim();
    (words.chars().count() >= MIN_FALLBACK_QUERY_LEN).then(|| words.to_string())
}

fn alternate_title_query(title: &ParsedTitle) -> Option<String> {
    normalizer::alternate_title(&title.raw).filter(|q| q.chars().count() >= MIN_FALLBACK_QUERY_LEN)
}

/// Every query the pipeline would issue for this title, in order.
pub fn candidate_queries(title: &ParsedTitle) -> Vec<(&'static str, String)> {
    STRATEGIES
        .iter()
        .filter_map(|s| (s.query)(title).map(|q| (s.name, q)))
        .collect()
}

/// Runs the strategies in order and returns the first non-empty result set.
///
/// Strategies run strictly one after another. A catalog error ends the
/// whole resolution immediately.
pub fn resolve<C: Catalog + ?Sized>(
    title: &ParsedTitle,
    catalog: &C,
) -> Result<Vec<CatalogEntry>, CatalogError> {
    for strategy in STRATEGIES {
        let Some(query) = (strategy.query)(title) else {
            debug!("[SEARCH] Strategy '{}' has no query, skipping", strategy.name);
            continue;
        };

        debug!("[SEARCH] Strategy '{}': '{}'", strategy.name, query);
        let results = catalog.search(&query)?;
        if !results.is_empty() {
            info!(
                "[SEARCH] Strategy '{}' found {} candidates for '{}'",
                strategy.name,
                results.len(),
                query
            );
            return Ok(results);
        }
    }

    info!("[SEARCH] All strategies exhausted for '{}'", title.raw);
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{entry, ScriptedCatalog};

    const SOLO_LEVELING: &str = "Solo Leveling S02 1080p CR WEB-DL DUAL AAC2.0 H 264-VARYG (Ore dake Level Up na Ken, Dual-Audio, Multi-Subs)";

    #[test]
    fn test_candidate_queries_order() {
        let parsed = ParsedTitle::parse(SOLO_LEVELING);
        let queries = candidate_queries(&parsed);
        assert_eq!(
            queries,
            vec![
                ("normalized", "Solo Leveling S02 Ore dake Level Up na Ken".to_string()),
                ("base title", "Solo Leveling CR WEB-DL DUAL AAC2.0 H 264-VARYG".to_string()),
                ("without season", "Solo Leveling".to_string()),
                ("raw title", SOLO_LEVELING.to_string()),
                ("leading words", "Solo Leveling".to_string()),
                ("alternate title", "Ore dake Level Up na Ken".to_string()),
            ]
        );
    }

    #[test]
    fn test_duplicate_queries_skipped() {
        let parsed = ParsedTitle::parse("Frieren");
        let names: Vec<_> = candidate_queries(&parsed).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["normalized", "raw title"]);
    }

    #[test]
    fn test_stops_at_first_non_empty_result() {
        let catalog = ScriptedCatalog::new()
            .with_results("Solo Leveling", vec![entry(1, "Ore dake Level Up na Ken", Some("Solo Leveling"))]);
        let parsed = ParsedTitle::parse(SOLO_LEVELING);

        let results = resolve(&parsed, &catalog).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(
            catalog.searches(),
            vec![
                "Solo Leveling S02 Ore dake Level Up na Ken",
                "Solo Leveling CR WEB-DL DUAL AAC2.0 H 264-VARYG",
                "Solo Leveling",
            ]
        );
    }

    #[test]
    fn test_exhausts_all_strategies() {
        let catalog = ScriptedCatalog::new();
        let parsed = ParsedTitle::parse(SOLO_LEVELING);

        assert!(resolve(&parsed, &catalog).unwrap().is_empty());
        assert_eq!(catalog.searches().len(), 6);
    }

    #[test]
    fn test_empty_title_issues_no_search() {
        let catalog = ScriptedCatalog::new();
        let parsed = ParsedTitle::parse("   ");

        assert!(resolve(&parsed, &catalog).unwrap().is_empty());
        assert!(catalog.searches().is_empty());
    }

    #[test]
    fn test_catalog_error_aborts_resolution() {
        let catalog = ScriptedCatalog::new().failing_on("Solo Leveling CR WEB-DL DUAL AAC2.0 H 264-VARYG");
        let parsed = ParsedTitle::parse(SOLO_LEVELING);

        let err = resolve(&parsed, &catalog).unwrap_err();
        assert!(matches!(err, CatalogError::RateLimited { .. }));
        assert_eq!(catalog.searches().len(), 2);
    }

    #[test]
    fn test_short_fallback_queries_rejected() {
        // "Ao S2": leading words "Ao" is too short to search on its own
        let parsed = ParsedTitle::parse("Ao S2 [1080p]");
        let names: Vec<_> = candidate_queries(&parsed).into_iter().map(|(n, _)| n).collect();
        assert!(!names.contains(&"leading words"));
    }
}
