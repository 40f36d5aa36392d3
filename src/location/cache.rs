//! File-based geocoding cache at `<data_dir>/geocode.json`.
//!
//! TTL: 30 days. Case-insensitive, whitespace-collapsed keys.

use super::types::{LocationSource, ResolvedAddress};
use crate::zone::Coordinates;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const CACHE_TTL_MS: i64 = 30 * 24 * 3600 * 1000; // 30 days in ms

#[derive(Serialize, Deserialize, Clone)]
struct CacheEntry {
    lat: f64,
    lon: f64,
    name: String,
    timestamp: i64,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default = "default_confidence")]
    confidence: f64,
}

fn default_confidence() -> f64 {
    1.0
}

impl CacheEntry {
    fn to_resolved(&self) -> ResolvedAddress {
        ResolvedAddress {
            name: self.name.clone(),
            coordinates: Coordinates::new(self.lat, self.lon),
            source: LocationSource::Cache,
            display_name: self.display_name.clone(),
            confidence: self.confidence,
        }
    }
}

pub fn cache_key(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

pub struct AddressCache {
    path: PathBuf,
    entries: HashMap<String, CacheEntry>,
}

impl AddressCache {
    /// Load the cache stored under `data_dir`.
    pub fn load(data_dir: &Path) -> Self {
        Self::load_from(data_dir.join("geocode.json"))
    }

    pub fn load_from(path: PathBuf) -> Self {
        let entries = Self::read_file(&path).unwrap_or_default();
        Self { path, entries }
    }

    fn read_file(path: &Path) -> Option<HashMap<String, CacheEntry>> {
        let data = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&data) {
            Ok(entries) => Some(entries),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable geocode cache");
                None
            }
        }
    }

    /// Returns None if missing or expired.
    pub fn get(&self, query: &str) -> Option<ResolvedAddress> {
        let entry = self.entries.get(&cache_key(query))?;
        let now = chrono::Utc::now().timestamp_millis();
        if now - entry.timestamp > CACHE_TTL_MS {
            return None;
        }
        Some(entry.to_resolved())
    }

    /// Store under the original query and persist to disk.
    pub fn put(&mut self, query: &str, resolved: &ResolvedAddress) {
        let entry = CacheEntry {
            lat: resolved.coordinates.lat,
            lon: resolved.coordinates.lon,
            name: resolved.name.clone(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            display_name: resolved.display_name.clone(),
            confidence: resolved.confidence,
        };
        self.entries.insert(cache_key(query), entry);
        self.persist();
    }

    fn persist(&self) {
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let result = serde_json::to_string_pretty(&self.entries)
            .map_err(std::io::Error::other)
            .and_then(|json| fs::write(&self.path, json));
        if let Err(e) = result {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to persist geocode cache");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
