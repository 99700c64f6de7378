use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogTitle {
    #[serde(default)]
    pub romaji: Option<String>,
    #[serde(default)]
    pub english: Option<String>,
    #[serde(default)]
    pub native: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverImage {
    #[serde(default)]
    pub large: Option<String>,
    #[serde(default)]
    pub medium: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogRelation {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Canonical anime record as returned by the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: i64,
    pub title: CatalogTitle,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub episodes: Option<u32>,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub studios: Vec<String>,
    #[serde(default)]
    pub cover_image: CoverImage,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub score: Option<u32>,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub relations: Vec<CatalogRelation>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

impl CatalogEntry {
    pub fn romaji(&self) -> Option<&str> {
        non_empty(&self.title.romaji)
    }

    pub fn english(&self) -> Option<&str> {
        non_empty(&self.title.english)
    }

    /// English title when present, otherwise romaji.
    pub fn display_title(&self) -> &str {
        self.english().or_else(|| self.romaji()).unwrap_or("")
    }

    /// Every title the matcher compares against: romaji, english, then synonyms.
    pub fn title_variants(&self) -> Vec<&str> {
        let mut variants: Vec<&str> = Vec::with_capacity(2 + self.synonyms.len());
        variants.extend(self.romaji());
        variants.extend(self.english());
        variants.extend(
            self.synonyms
                .iter()
                .map(String::as_str)
                .filter(|s| !s.trim().is_empty()),
        );
        variants
    }
}

/// The external catalog the mapper searches.
///
/// Implementations own retries, caching and rate limiting. An empty result
/// is a normal outcome; errors are reserved for failures the caller cannot
/// recover from within one mapping call.
pub trait Catalog: Send + Sync {
    fn search(&self, query: &str) -> Result<Vec<CatalogEntry>, CatalogError>;

    fn get_by_id(&self, id: i64) -> Result<Option<CatalogEntry>, CatalogError>;
}

impl<C: Catalog + ?Sized> Catalog for &C {
    fn search(&self, query: &str) -> Result<Vec<CatalogEntry>, CatalogError> {
        (**self).search(query)
    }

    fn get_by_id(&self, id: i64) -> Result<Option<CatalogEntry>, CatalogError> {
        (**self).get_by_id(id)
    }
}
