//! Category ordering table
//!
//! Maps a receipt category (by id or name) to a sort key and an optional
//! display heading. The policy is plain data, loaded from JSON:
//!
//! ```json
//! {
//!   "starter": 1,
//!   "main": { "sort_key": 2, "heading": "Mains" },
//!   "beverage": 4
//! }
//! ```
//!
//! Keys match case-insensitively. Categories without an entry sort after every
//! configured one and keep their first-appearance order.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Sort key of categories missing from the table
pub const DEFAULT_SORT_KEY: u32 = u32::MAX;

#[derive(Debug, Error)]
pub enum OrderingError {
    #[error("Failed to read category order file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid category order table: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One table entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryOrder {
    pub sort_key: u32,
    #[serde(default)]
    pub heading: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Key(u32),
    Full(CategoryOrder),
}

impl From<RawEntry> for CategoryOrder {
    fn from(raw: RawEntry) -> Self {
        match raw {
            RawEntry::Key(sort_key) => CategoryOrder {
                sort_key,
                heading: None,
            },
            RawEntry::Full(entry) => entry,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CategoryOrderingTable {
    entries: HashMap<String, CategoryOrder>,
}

fn normalize(key: &str) -> String {
    key.trim().to_lowercase()
}

impl CategoryOrderingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry
    pub fn insert(&mut self, key: &str, sort_key: u32, heading: Option<String>) -> &mut Self {
        self.entries
            .insert(normalize(key), CategoryOrder { sort_key, heading });
        self
    }

    /// Table from `(key, sort_key)` pairs
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, u32)>) -> Self {
        let mut table = Self::new();
        for (key, sort_key) in pairs {
            table.insert(key, sort_key, None);
        }
        table
    }

    pub fn from_json_str(json: &str) -> Result<Self, OrderingError> {
        let raw: HashMap<String, RawEntry> = serde_json::from_str(json)?;
        Ok(Self {
            entries: raw
                .into_iter()
                .map(|(key, entry)| (normalize(&key), entry.into()))
                .collect(),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, OrderingError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| OrderingError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for a category, by id first and then by name
    pub fn lookup(&self, category_id: &str, category_name: Option<&str>) -> Option<&CategoryOrder> {
        self.entries
            .get(&normalize(category_id))
            .or_else(|| category_name.and_then(|name| self.entries.get(&normalize(name))))
    }

    pub fn sort_key(&self, category_id: &str, category_name: Option<&str>) -> u32 {
        self.lookup(category_id, category_name)
            .map_or(DEFAULT_SORT_KEY, |entry| entry.sort_key)
    }

    /// Heading to print: configured heading, else category name, else id
    pub fn heading(&self, category_id: &str, category_name: Option<&str>) -> String {
        self.lookup(category_id, category_name)
            .and_then(|entry| entry.heading.clone())
            .or_else(|| category_name.filter(|n| !n.trim().is_empty()).map(str::to_string))
            .unwrap_or_else(|| category_id.to_string())
    }
}
