use chrono::Utc;
use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, CatalogEntry};
use crate::error::CatalogError;
use crate::matcher;
use crate::normalizer::ParsedTitle;
use crate::strategy;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Outcome of mapping one release title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingResult {
    pub torrent_title: String,
    pub anilist_match: Option<CatalogEntry>,
    pub confidence: f64,
    pub matched_at: String,
}

impl MappingResult {
    fn new(torrent_title: &str, anilist_match: Option<CatalogEntry>, confidence: f64) -> Self {
        MappingResult {
            torrent_title: torrent_title.to_string(),
            anilist_match,
            confidence,
            matched_at: Utc::now().format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    pub fn is_match(&self) -> bool {
        self.anilist_match.is_some()
    }
}

/// Maps release titles to catalog entries through one shared catalog.
pub struct Mapper<C> {
    catalog: C,
}

impl<C: Catalog> Mapper<C> {
    pub fn new(catalog: C) -> Self {
        Mapper { catalog }
    }

    /// Maps one title. With an explicit id the title is not matched at all:
    /// the entry is looked up directly and reported with full confidence.
    pub fn map(&self, raw_title: &str, explicit_id: Option<i64>) -> Result<MappingResult, CatalogError> {
        if let Some(id) = explicit_id {
            info!("[MAP] Using explicit id {} for '{}'", id, raw_title);
            let entry = self.catalog.get_by_id(id)?;
            let confidence = if entry.is_some() { 1.0 } else { 0.0 };
            return Ok(MappingResult::new(raw_title, entry, confidence));
        }

        let parsed = ParsedTitle::parse(raw_title);
        info!(
            "[MAP] '{}' -> normalized '{}', base '{}', season {:?}",
            raw_title, parsed.normalized, parsed.base, parsed.season
        );

        let candidates = strategy::resolve(&parsed, &self.catalog)?;
        if candidates.is_empty() {
            return Ok(MappingResult::new(raw_title, None, 0.0));
        }

        let result = match matcher::select(&parsed, &candidates) {
            Some(entry) => {
                let confidence = matcher::confidence(&parsed, entry);
                MappingResult::new(raw_title, Some(entry.clone()), confidence)
            }
            None => MappingResult::new(raw_title, None, 0.0),
        };
        Ok(result)
    }

    /// Maps every title in parallel. Results keep the input order; the first
    /// catalog error fails the whole batch.
    pub fn map_batch<S: AsRef<str> + Sync>(&self, titles: &[S]) -> Result<Vec<MappingResult>, CatalogError> {
        info!("[MAP] Mapping batch of {} titles", titles.len());
        let results: Vec<MappingResult> = titles
            .par_iter()
            .map(|title| self.map(title.as_ref(), None))
            .collect::<Result<_, _>>()?;

        let matched = results.iter().filter(|r| r.is_match()).count();
        info!("[MAP] Batch done: {}/{} matched", matched, results.len());
        Ok(results)
    }
}
