use std::collections::HashMap;
use std::sync::{Mutex, Once};

use crate::catalog::{Catalog, CatalogEntry, CatalogTitle};
use crate::error::CatalogError;

static INIT: Once = Once::new();

pub fn init_logger() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

pub fn entry(id: i64, romaji: &str, english: Option<&str>) -> CatalogEntry {
    CatalogEntry {
        id,
        title: CatalogTitle {
            romaji: Some(romaji.to_string()),
            english: english.map(str::to_string),
            native: None,
        },
        ..Default::default()
    }
}

/// Catalog fake answering from fixed query tables and recording every call.
#[derive(Default)]
pub struct ScriptedCatalog {
    results: HashMap<String, Vec<CatalogEntry>>,
    by_id: HashMap<i64, CatalogEntry>,
    fail_on: Option<String>,
    searches: Mutex<Vec<String>>,
    id_lookups: Mutex<Vec<i64>>,
}

impl ScriptedCatalog {
    pub fn new() -> Self {
        init_logger();
        Self::default()
    }

    pub fn with_results(mut self, query: &str, entries: Vec<CatalogEntry>) -> Self {
        self.results.insert(query.to_string(), entries);
        self
    }

    pub fn with_entry(mut self, entry: CatalogEntry) -> Self {
        self.by_id.insert(entry.id, entry);
        self
    }

    /// Searching for `query` fails as if the rate limit were exhausted.
    pub fn failing_on(mut self, query: &str) -> Self {
        self.fail_on = Some(query.to_string());
        self
    }

    pub fn searches(&self) -> Vec<String> {
        self.searches.lock().unwrap().clone()
    }

    pub fn id_lookups(&self) -> Vec<i64> {
        self.id_lookups.lock().unwrap().clone()
    }
}

impl Catalog for ScriptedCatalog {
    fn search(&self, query: &str) -> Result<Vec<CatalogEntry>, CatalogError> {
        self.searches.lock().unwrap().push(query.to_string());
        if self.fail_on.as_deref() == Some(query) {
            return Err(CatalogError::RateLimited { identifier: "scripted".into() });
        }
        Ok(self.results.get(query).cloned().unwrap_or_default())
    }

    fn get_by_id(&self, id: i64) -> Result<Option<CatalogEntry>, CatalogError> {
        self.id_lookups.lock().unwrap().push(id);
        Ok(self.by_id.get(&id).cloned())
    }
}
