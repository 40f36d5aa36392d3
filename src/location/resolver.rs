//! Address resolver: cache, then Nominatim, then built-in localities.
//!
//! Cache → Nominatim → simplified query → built-in localities → error

use super::cache::AddressCache;
use super::providers;
use super::types::{LocationError, LocationSource, ResolvedAddress};
use crate::zone::Coordinates;
use std::path::Path;

pub struct LocationResolver {
    cache: AddressCache,
    offline: bool,
}

impl LocationResolver {
    /// Resolver backed by the cache under `data_dir`.
    pub fn new(data_dir: &Path) -> Self {
        Self::with_cache(AddressCache::load(data_dir))
    }

    pub fn with_cache(cache: AddressCache) -> Self {
        Self { cache, offline: false }
    }

    /// Offline mode skips network calls.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn resolve_address(&mut self, query: &str) -> Result<ResolvedAddress, LocationError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(LocationError::NoInput);
        }
        if let Some(hit) = self.cached(query) {
            return Ok(hit);
        }
        let loc = lookup_uncached(query, self.offline)?;
        self.remember(query, &loc);
        Ok(loc)
    }

    /// Fresh cache entry for `query`, if any.
    pub fn cached(&self, query: &str) -> Option<ResolvedAddress> {
        let hit = self.cache.get(query.trim())?;
        tracing::debug!(query, "geocode cache hit");
        Some(hit)
    }

    /// Store a network result. Built-in and manual results are not cached.
    pub fn remember(&mut self, query: &str, loc: &ResolvedAddress) {
        if loc.source == LocationSource::Nominatim {
            self.cache.put(query.trim(), loc);
        }
    }

    /// Wrap raw coordinates typed in by the user.
    pub fn from_manual(coordinates: Coordinates) -> ResolvedAddress {
        ResolvedAddress {
            name: format!("{:.4}, {:.4}", coordinates.lat, coordinates.lon),
            coordinates,
            source: LocationSource::Manual,
            display_name: None,
            confidence: 1.0,
        }
    }
}

/// Nominatim (unless offline), simplified query, then built-in localities.
/// Holds no resolver state, so callers can run it without a lock.
pub fn lookup_uncached(query: &str, offline: bool) -> Result<ResolvedAddress, LocationError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(LocationError::NoInput);
    }

    if !offline {
        match providers::nominatim_search(query) {
            Ok(loc) => return Ok(loc),
            Err(e) => tracing::debug!(query, error = %e, "nominatim lookup failed"),
        }

        let simplified = simplify_query(query);
        if simplified != query.to_lowercase() {
            if let Ok(loc) = providers::nominatim_search(&simplified) {
                return Ok(loc);
            }
        }
    }

    if let Some(loc) = providers::builtin_lookup(&simplify_query(query)) {
        return Ok(loc);
    }

    Err(LocationError::NotFound(query.to_string()))
}

/// Lowercase, strip Spanish diacritics, drop apartment markers, collapse spaces.
fn simplify_query(q: &str) -> String {
    q.to_lowercase()
        .replace('á', "a")
        .replace('é', "e")
        .replace('í', "i")
        .replace('ó', "o")
        .replace(['ú', 'ü'], "u")
        .replace('ñ', "n")
        .replace('°', " ")
        .replace('º', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn offline_resolver() -> (LocationResolver, TempDir) {
        let dir = TempDir::new().unwrap();
        let mut resolver = LocationResolver::new(dir.path());
        resolver.set_offline(true);
        (resolver, dir)
    }

    #[test]
    fn test_resolve_builtin_fallback() {
        let (mut resolver, _dir) = offline_resolver();
        let loc = resolver.resolve_address("Quilmes").unwrap();
        assert_eq!(loc.source, LocationSource::Builtin);
        assert!((loc.coordinates.lon + 58.2546).abs() < 0.001);
    }

    #[test]
    fn test_resolve_accented_query() {
        let (mut resolver, _dir) = offline_resolver();
        let loc = resolver.resolve_address("Morón").unwrap();
        assert_eq!(loc.name, "moron");
    }

    #[test]
    fn test_resolve_cache_hit() {
        let dir = TempDir::new().unwrap();
        let mut cache = AddressCache::load(dir.path());
        cache.put("Av. Rivadavia 5000", &ResolvedAddress {
            name: "Avenida Rivadavia".into(),
            coordinates: Coordinates::new(-34.618, -58.435),
            source: LocationSource::Nominatim,
            display_name: None,
            confidence: 0.85,
        });

        let mut resolver = LocationResolver::with_cache(cache);
        resolver.set_offline(true);
        let loc = resolver.resolve_address("av. rivadavia 5000").unwrap();
        assert_eq!(loc.source, LocationSource::Cache);
        assert_eq!(loc.name, "Avenida Rivadavia");
    }

    #[test]
    fn test_resolve_not_found() {
        let (mut resolver, _dir) = offline_resolver();
        assert!(matches!(resolver.resolve_address("qwertyuiop 123"), Err(LocationError::NotFound(_))));
    }

    #[test]
    fn test_resolve_empty() {
        let (mut resolver, _dir) = offline_resolver();
        assert!(matches!(resolver.resolve_address("   "), Err(LocationError::NoInput)));
    }

    #[test]
    fn test_remember_caches_network_results_only() {
        let (mut resolver, _dir) = offline_resolver();
        let builtin = lookup_uncached("Quilmes", true).unwrap();
        resolver.remember("Quilmes", &builtin);
        assert!(resolver.cached("Quilmes").is_none());

        let network = ResolvedAddress {
            name: "Calle 7".into(),
            coordinates: Coordinates::new(-34.92, -57.95),
            source: LocationSource::Nominatim,
            display_name: None,
            confidence: 0.8,
        };
        resolver.remember("  Calle 7, La Plata ", &network);
        let hit = resolver.cached("calle 7, la plata").unwrap();
        assert_eq!(hit.source, LocationSource::Cache);
        assert_eq!(hit.name, "Calle 7");
    }

    #[test]
    fn test_lookup_uncached_offline() {
        assert_eq!(lookup_uncached("Pilar", true).unwrap().source, LocationSource::Builtin);
        assert!(matches!(lookup_uncached(" ", true), Err(LocationError::NoInput)));
    }

    #[test]
    fn test_simplify_query() {
        assert_eq!(simplify_query("Núñez"), "nunez");
        assert_eq!(simplify_query("  Güemes   1234 "), "guemes 1234");
        assert_eq!(simplify_query("Piso 3°B"), "piso 3 b");
    }

    #[test]
    fn test_manual_location() {
        let loc = LocationResolver::from_manual(Coordinates::new(-34.6, -58.4));
        assert_eq!(loc.source, LocationSource::Manual);
        assert_eq!(loc.name, "-34.6000, -58.4000");
    }
}
