//! Geocoding providers: Nominatim and a built-in locality dataset.

use super::types::{LocationError, LocationSource, ResolvedAddress};
use crate::zone::Coordinates;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const USER_AGENT: &str = concat!("Tablero/", env!("CARGO_PKG_VERSION"));

// ─── Built-in dataset ───────────────────────────────────────────

struct BuiltinLocality {
    names: &'static [&'static str], // canonical + aliases
    lat: f64,
    lon: f64,
    partido: &'static str,
}

// Locality centroids across the service area and a few common out-of-area requests.
const BUILTIN_LOCALITIES: &[BuiltinLocality] = &[
    BuiltinLocality { names: &["microcentro", "centro", "san nicolas"], lat: -34.6037, lon: -58.3816, partido: "CABA" },
    BuiltinLocality { names: &["palermo"], lat: -34.5889, lon: -58.4306, partido: "CABA" },
    BuiltinLocality { names: &["belgrano"], lat: -34.5627, lon: -58.4566, partido: "CABA" },
    BuiltinLocality { names: &["caballito"], lat: -34.6186, lon: -58.4420, partido: "CABA" },
    BuiltinLocality { names: &["recoleta"], lat: -34.5875, lon: -58.3974, partido: "CABA" },
    BuiltinLocality { names: &["villa urquiza"], lat: -34.5732, lon: -58.4875, partido: "CABA" },
    BuiltinLocality { names: &["flores"], lat: -34.6280, lon: -58.4630, partido: "CABA" },
    BuiltinLocality { names: &["nuñez", "nunez"], lat: -34.5440, lon: -58.4630, partido: "CABA" },
    BuiltinLocality { names: &["vicente lopez", "olivos"], lat: -34.5261, lon: -58.4794, partido: "Vicente López" },
    BuiltinLocality { names: &["san isidro"], lat: -34.4708, lon: -58.5286, partido: "San Isidro" },
    BuiltinLocality { names: &["moron", "morón"], lat: -34.6534, lon: -58.6198, partido: "Morón" },
    BuiltinLocality { names: &["quilmes"], lat: -34.7206, lon: -58.2546, partido: "Quilmes" },
    BuiltinLocality { names: &["avellaneda"], lat: -34.6627, lon: -58.3652, partido: "Avellaneda" },
    BuiltinLocality { names: &["lanus", "lanús"], lat: -34.7007, lon: -58.3914, partido: "Lanús" },
    BuiltinLocality { names: &["ramos mejia", "ramos mejía"], lat: -34.6405, lon: -58.5652, partido: "La Matanza" },
    BuiltinLocality { names: &["tigre"], lat: -34.4260, lon: -58.5796, partido: "Tigre" },
    BuiltinLocality { names: &["pilar"], lat: -34.4587, lon: -58.9142, partido: "Pilar" },
    BuiltinLocality { names: &["la plata"], lat: -34.9214, lon: -57.9545, partido: "La Plata" },
    BuiltinLocality { names: &["campana"], lat: -34.1633, lon: -58.9592, partido: "Campana" },
    BuiltinLocality { names: &["ezeiza"], lat: -34.8536, lon: -58.5225, partido: "Ezeiza" },
    BuiltinLocality { names: &["mar del plata", "mdq"], lat: -38.0055, lon: -57.5426, partido: "General Pueyrredón" },
    BuiltinLocality { names: &["cordoba", "córdoba"], lat: -31.4201, lon: -64.1888, partido: "Córdoba" },
];

/// Compute edit distance between two strings (Levenshtein).
pub(crate) fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let n = b.len();

    let mut prev = (0..=n).collect::<Vec<_>>();
    let mut curr = vec![0; n + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[n]
}

/// Search the built-in dataset: exact, then substring, then edit distance ≤ 2.
pub fn builtin_lookup(query: &str) -> Option<ResolvedAddress> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return None;
    }

    let exact = BUILTIN_LOCALITIES
        .iter()
        .find(|l| l.names.iter().any(|n| *n == q))
        .map(|l| builtin_to_resolved(l, 0.9));
    if exact.is_some() {
        return exact;
    }

    // "Av. Cabildo 2000, Belgrano" should land on Belgrano.
    let substring = BUILTIN_LOCALITIES
        .iter()
        .filter_map(|l| {
            l.names
                .iter()
                .filter(|n| q.contains(*n) || (q.len() >= 4 && n.contains(q.as_str())))
                .map(|n| n.len())
                .max()
                .map(|len| (l, len))
        })
        .max_by_key(|(_, len)| *len)
        .map(|(l, _)| builtin_to_resolved(l, 0.7));
    if substring.is_some() {
        return substring;
    }

    let q = q.as_str();
    BUILTIN_LOCALITIES
        .iter()
        .flat_map(|l| l.names.iter().map(move |n| (l, edit_distance(q, n))))
        .filter(|(_, d)| *d <= 2)
        .min_by_key(|(_, d)| *d)
        .map(|(l, _)| builtin_to_resolved(l, 0.6))
}

fn builtin_to_resolved(l: &BuiltinLocality, confidence: f64) -> ResolvedAddress {
    ResolvedAddress {
        name: l.names[0].to_string(),
        coordinates: Coordinates::new(l.lat, l.lon),
        source: LocationSource::Builtin,
        display_name: Some(format!("{}, {}", l.names[0], l.partido)),
        confidence,
    }
}

/// A locality entry for the public list API.
#[derive(Debug, Clone, Serialize)]
pub struct LocalityInfo {
    pub name: String,
    pub partido: String,
    pub lat: f64,
    pub lon: f64,
}

pub fn builtin_locality_list() -> Vec<LocalityInfo> {
    BUILTIN_LOCALITIES
        .iter()
        .map(|l| LocalityInfo {
            name: l.names[0].to_string(),
            partido: l.partido.to_string(),
            lat: l.lat,
            lon: l.lon,
        })
        .collect()
}

// ─── Nominatim provider ─────────────────────────────────────────

#[derive(Deserialize, Debug, Clone)]
pub struct NominatimResult {
    pub lat: String,
    pub lon: String,
    pub display_name: String,
    #[serde(default)]
    pub importance: Option<f64>,
}

/// Pick the most important parseable result and convert it.
pub(crate) fn best_candidate(results: &[NominatimResult]) -> Option<ResolvedAddress> {
    results
        .iter()
        .filter_map(|r| {
            let lat = r.lat.parse::<f64>().ok()?;
            let lon = r.lon.parse::<f64>().ok()?;
            let coordinates = Coordinates::checked(lat, lon).ok()?;
            Some((r, coordinates))
        })
        .max_by(|(a, _), (b, _)| {
            a.importance
                .unwrap_or(0.0)
                .partial_cmp(&b.importance.unwrap_or(0.0))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(r, coordinates)| ResolvedAddress {
            name: r.display_name.split(',').next().unwrap_or("").trim().to_string(),
            coordinates,
            source: LocationSource::Nominatim,
            display_name: Some(r.display_name.clone()),
            confidence: (0.5 + r.importance.unwrap_or(0.0) / 2.0).clamp(0.5, 1.0),
        })
}

/// Forward-geocode an address, restricted to Argentina.
pub fn nominatim_search(query: &str) -> Result<ResolvedAddress, LocationError> {
    let url = format!(
        "https://nominatim.openstreetmap.org/search?q={}&format=json&limit=5&countrycodes=ar",
        urlencode(query)
    );

    let response = ureq::get(&url)
        .set("User-Agent", USER_AGENT)
        .timeout(Duration::from_secs(5))
        .call()
        .map_err(|e| LocationError::Network(e.to_string()))?;

    let results: Vec<NominatimResult> = response
        .into_json()
        .map_err(|e| LocationError::InvalidResponse(e.to_string()))?;

    best_candidate(&results).ok_or_else(|| LocationError::NotFound(query.to_string()))
}

fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            b' ' => out.push_str("%20"),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_exact() {
        let loc = builtin_lookup("Palermo").unwrap();
        assert_eq!(loc.name, "palermo");
        assert_eq!(loc.source, LocationSource::Builtin);
        assert!((loc.coordinates.lat + 34.5889).abs() < 0.001);
    }

    #[test]
    fn test_builtin_alias() {
        assert_eq!(builtin_lookup("Olivos").unwrap().name, "vicente lopez");
        assert_eq!(builtin_lookup("MDQ").unwrap().name, "mar del plata");
    }

    #[test]
    fn test_builtin_substring_in_address() {
        let loc = builtin_lookup("Av. Cabildo 2000, Belgrano").unwrap();
        assert_eq!(loc.name, "belgrano");
        assert!(loc.confidence < 0.9);
    }

    #[test]
    fn test_builtin_prefers_longest_match() {
        // "san isidro" beats a shorter accidental hit
        let loc = builtin_lookup("calle 9 de julio, san isidro").unwrap();
        assert_eq!(loc.name, "san isidro");
    }

    #[test]
    fn test_builtin_fuzzy() {
        let loc = builtin_lookup("cabalito").unwrap();
        assert_eq!(loc.name, "caballito");
    }

    #[test]
    fn test_builtin_not_found() {
        assert!(builtin_lookup("xyznonexistent").is_none());
        assert!(builtin_lookup("   ").is_none());
    }

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("quilmes", "quilmez"), 1);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("abc", "abc"), 0);
    }

    #[test]
    fn test_urlencode() {
        assert_eq!(urlencode("Av. Cabildo 2000"), "Av.%20Cabildo%202000");
        assert_eq!(urlencode("Núñez"), "N%C3%BA%C3%B1ez");
        assert_eq!(urlencode("a&b"), "a%26b");
    }

    #[test]
    fn test_best_candidate_by_importance() {
        let results = vec![
            NominatimResult { lat: "-34.60".into(), lon: "-58.38".into(), display_name: "Low, X".into(), importance: Some(0.2) },
            NominatimResult { lat: "-34.56".into(), lon: "-58.45".into(), display_name: "High, Belgrano".into(), importance: Some(0.6) },
            NominatimResult { lat: "bad".into(), lon: "-58.45".into(), display_name: "Broken".into(), importance: Some(0.9) },
        ];
        let best = best_candidate(&results).unwrap();
        assert_eq!(best.name, "High");
        assert!((best.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_best_candidate_empty() {
        assert!(best_candidate(&[]).is_none());
    }

    #[test]
    fn test_locality_list() {
        let list = builtin_locality_list();
        assert!(list.iter().any(|l| l.name == "quilmes" && l.partido == "Quilmes"));
    }
}
