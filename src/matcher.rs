//! Picks the catalog entry a release title refers to.

use log::{debug, info};

use crate::base_title;
use crate::catalog::CatalogEntry;
use crate::normalizer::ParsedTitle;
use crate::similarity::similarity;

pub const SEASON_BOOST: f64 = 1.3;
pub const BASE_TITLE_BOOST: f64 = 1.2;
/// Base-title similarity above which the base-title boost applies.
pub const BASE_TITLE_BOOST_THRESHOLD: f64 = 0.85;
/// Boosted score a best candidate must exceed to be accepted.
pub const ACCEPT_THRESHOLD: f64 = 0.4;
/// Base-title similarity accepted by the lenient fallback.
pub const FALLBACK_THRESHOLD: f64 = 0.7;

/// A catalog entry with the score it earned for one title.
#[derive(Debug, Clone, Copy)]
pub struct MatchCandidate<'a> {
    pub entry: &'a CatalogEntry,
    pub score: f64,
}

/// Best similarity between the normalized title and any of the entry's
/// romaji, english or synonym titles. Zero when the entry has no titles.
pub fn title_score(title: &ParsedTitle, entry: &CatalogEntry) -> f64 {
    let normalized = title.normalized.to_lowercase();
    entry
        .title_variants()
        .into_iter()
        .map(|variant| similarity(&normalized, &variant.to_lowercase()))
        .fold(0.0, f64::max)
}

pub fn base_title_similarity(title: &ParsedTitle, entry: &CatalogEntry) -> f64 {
    similarity(&title.base.to_lowercase(), &base_title::from_entry(entry).to_lowercase())
}

/// Multiplies the raw score by each boost that applies. The result is not
/// clamped and can exceed 1.0.
pub fn apply_boosts(raw_score: f64, season_matches: bool, base_similarity: f64) -> f64 {
    let mut score = raw_score;
    if season_matches {
        score *= SEASON_BOOST;
    }
    if base_similarity > BASE_TITLE_BOOST_THRESHOLD {
        score *= BASE_TITLE_BOOST;
    }
    score
}

pub fn score_candidate<'a>(title: &ParsedTitle, entry: &'a CatalogEntry) -> MatchCandidate<'a> {
    let raw = title_score(title, entry);
    let season_matches = title
        .season
        .map_or(false, |season| base_title::matches_season(entry, season));
    let base_similarity = base_title_similarity(title, entry);
    let score = apply_boosts(raw, season_matches, base_similarity);

    debug!(
        "[MATCH] #{} '{}': raw {:.3}, season match {}, base {:.3} -> {:.3}",
        entry.id,
        entry.display_title(),
        raw,
        season_matches,
        base_similarity,
        score
    );

    MatchCandidate { entry, score }
}

/// Selects the best entry for a title.
///
/// The highest boosted score wins when it exceeds [`ACCEPT_THRESHOLD`].
/// Otherwise the first entry, in catalog order, whose base title is close
/// enough is taken, even if a later one is closer.
pub fn select<'a>(title: &ParsedTitle, candidates: &'a [CatalogEntry]) -> Option<&'a CatalogEntry> {
    let mut best: Option<MatchCandidate<'a>> = None;
    for entry in candidates {
        let candidate = score_candidate(title, entry);
        if candidate.score > best.map_or(0.0, |b| b.score) {
            best = Some(candidate);
        }
    }

    if let Some(best) = best.filter(|b| b.score > ACCEPT_THRESHOLD) {
        info!(
            "[MATCH] '{}' -> #{} '{}' (score {:.3})",
            title.raw,
            best.entry.id,
            best.entry.display_title(),
            best.score
        );
        return Some(best.entry);
    }

    let fallback = candidates
        .iter()
        .find(|entry| base_title_similarity(title, entry) > FALLBACK_THRESHOLD);
    match fallback {
        Some(entry) => info!(
            "[MATCH] '{}' -> #{} '{}' (base-title fallback)",
            title.raw,
            entry.id,
            entry.display_title()
        ),
        None => info!("[MATCH] No acceptable candidate for '{}'", title.raw),
    }
    fallback
}

/// Literal title resemblance of the chosen entry, without boosts. This is
/// the confidence reported to callers, separate from the selection score.
pub fn confidence(title: &ParsedTitle, entry: &CatalogEntry) -> f64 {
    title_score(title, entry)
}
