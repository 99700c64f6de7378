//! Maps scene-style anime release titles to AniList entries.

pub mod anilist;
pub mod base_title;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod mapper;
pub mod matcher;
pub mod normalizer;
pub mod rate_limiter;
pub mod similarity;
pub mod strategy;

/// In-memory catalog and fixtures shared by unit and integration tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use anilist::AniListClient;
pub use catalog::{Catalog, CatalogEntry};
pub use error::CatalogError;
pub use mapper::{Mapper, MappingResult};
pub use normalizer::ParsedTitle;
