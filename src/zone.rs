//! Service-area zone resolver.
//!
//! Classifies a coordinate into one of the coverage tiers by testing it
//! against three fixed polygons (priority, standard, extended). Anything
//! outside all three lands in the `review` tier.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Build coordinates, rejecting out-of-range or non-finite values.
    pub fn checked(lat: f64, lon: f64) -> Result<Self, ZoneError> {
        let c = Self { lat, lon };
        c.validate()?;
        Ok(c)
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    pub fn validate(&self) -> Result<(), ZoneError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ZoneError::InvalidCoordinates { lat: self.lat, lon: self.lon })
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = if self.lat >= 0.0 { 'N' } else { 'S' };
        let ew = if self.lon >= 0.0 { 'E' } else { 'W' };
        write!(f, "{:.4}\u{00B0}{}, {:.4}\u{00B0}{}", self.lat.abs(), ns, self.lon.abs(), ew)
    }
}

/// Coverage classification for a job site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneTier {
    Priority,
    Standard,
    Extended,
    Review,
}

impl ZoneTier {
    /// Labor multiplier applied for this tier. Review is priced like
    /// extended and flagged for a manual check.
    pub fn multiplier(self) -> f64 {
        match self {
            Self::Priority => 1.00,
            Self::Standard => 1.10,
            Self::Extended | Self::Review => 1.25,
        }
    }

    pub fn requires_review(self) -> bool {
        matches!(self, Self::Review)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Priority => "priority",
            Self::Standard => "standard",
            Self::Extended => "extended",
            Self::Review => "review",
        }
    }
}

impl fmt::Display for ZoneTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ZoneError {
    #[error("invalid coordinates ({lat}, {lon}): lat must be -90..90, lon -180..180")]
    InvalidCoordinates { lat: f64, lon: f64 },
    #[error("polygon needs at least 3 vertices, got {0}")]
    DegeneratePolygon(usize),
}

// ─── Polygon ─────────────────────────────────────────────────────

/// A closed ring; the edge from the last vertex back to the first is implicit.
#[derive(Debug, Clone, Serialize)]
pub struct Polygon {
    vertices: Vec<Coordinates>,
    #[serde(skip)]
    bounds: Bounds,
}

#[derive(Debug, Clone, Copy, Default)]
struct Bounds {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

impl Polygon {
    pub fn new(vertices: Vec<Coordinates>) -> Result<Self, ZoneError> {
        if vertices.len() < 3 {
            return Err(ZoneError::DegeneratePolygon(vertices.len()));
        }
        for v in &vertices {
            v.validate()?;
        }
        let bounds = vertices.iter().fold(
            Bounds {
                min_lat: f64::INFINITY,
                max_lat: f64::NEG_INFINITY,
                min_lon: f64::INFINITY,
                max_lon: f64::NEG_INFINITY,
            },
            |b, v| Bounds {
                min_lat: b.min_lat.min(v.lat),
                max_lat: b.max_lat.max(v.lat),
                min_lon: b.min_lon.min(v.lon),
                max_lon: b.max_lon.max(v.lon),
            },
        );
        Ok(Self { vertices, bounds })
    }

    fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self, ZoneError> {
        Self::new(pairs.iter().map(|&(lat, lon)| Coordinates::new(lat, lon)).collect())
    }

    pub fn vertices(&self) -> &[Coordinates] {
        &self.vertices
    }

    /// Even-odd ray casting in the (lon, lat) plane.
    ///
    /// Edges are half-open on the lower latitude end, so a point sitting on a
    /// shared vertex is counted once and boundary results are deterministic.
    pub fn contains(&self, point: Coordinates) -> bool {
        let b = &self.bounds;
        if point.lat < b.min_lat || point.lat > b.max_lat || point.lon < b.min_lon || point.lon > b.max_lon {
            return false;
        }

        let (x, y) = (point.lon, point.lat);
        let v = &self.vertices;
        let mut inside = false;
        let mut j = v.len() - 1;
        for i in 0..v.len() {
            let (xi, yi) = (v[i].lon, v[i].lat);
            let (xj, yj) = (v[j].lon, v[j].lat);
            if (yi > y) != (yj > y) {
                let x_cross = (xj - xi) * (y - yi) / (yj - yi) + xi;
                if x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

// ─── Service area ────────────────────────────────────────────────

// Buenos Aires metropolitan area, (lat, lon).
const PRIORITY_RING: &[(f64, f64)] = &[
    (-34.527, -58.460),
    (-34.575, -58.365),
    (-34.640, -58.350),
    (-34.660, -58.420),
    (-34.705, -58.460),
    (-34.660, -58.530),
    (-34.600, -58.530),
    (-34.545, -58.500),
];

const STANDARD_RING: &[(f64, f64)] = &[
    (-34.430, -58.600),
    (-34.440, -58.480),
    (-34.560, -58.300),
    (-34.700, -58.200),
    (-34.820, -58.300),
    (-34.830, -58.550),
    (-34.720, -58.720),
    (-34.550, -58.720),
];

const EXTENDED_RING: &[(f64, f64)] = &[
    (-34.100, -59.100),
    (-34.150, -58.700),
    (-34.350, -58.400),
    (-34.700, -58.050),
    (-34.950, -57.850),
    (-35.050, -58.000),
    (-35.000, -58.600),
    (-34.700, -59.000),
    (-34.450, -59.100),
];

/// Result of resolving a point against the service area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneResolution {
    pub tier: ZoneTier,
    pub coordinates: Option<Coordinates>,
    pub multiplier: f64,
    pub requires_review: bool,
}

impl ZoneResolution {
    fn new(tier: ZoneTier, coordinates: Option<Coordinates>) -> Self {
        Self {
            tier,
            coordinates,
            multiplier: tier.multiplier(),
            requires_review: tier.requires_review(),
        }
    }

    /// Resolution used when the job site has no known coordinates.
    pub fn unlocated() -> Self {
        Self::new(ZoneTier::Review, None)
    }
}

/// The three coverage polygons, checked from the innermost tier outwards.
#[derive(Debug, Clone)]
pub struct ServiceArea {
    priority: Polygon,
    standard: Polygon,
    extended: Polygon,
}

impl ServiceArea {
    pub fn new(priority: Polygon, standard: Polygon, extended: Polygon) -> Self {
        Self { priority, standard, extended }
    }

    pub fn resolve(&self, point: Coordinates) -> Result<ZoneResolution, ZoneError> {
        point.validate()?;
        let tier = self.tier_of(point);
        tracing::debug!(lat = point.lat, lon = point.lon, %tier, "zone resolved");
        Ok(ZoneResolution::new(tier, Some(point)))
    }

    /// Resolve an optional location; unknown sites go to review.
    pub fn resolve_opt(&self, point: Option<Coordinates>) -> Result<ZoneResolution, ZoneError> {
        match point {
            Some(p) => self.resolve(p),
            None => Ok(ZoneResolution::unlocated()),
        }
    }

    fn tier_of(&self, point: Coordinates) -> ZoneTier {
        if self.priority.contains(point) {
            ZoneTier::Priority
        } else if self.standard.contains(point) {
            ZoneTier::Standard
        } else if self.extended.contains(point) {
            ZoneTier::Extended
        } else {
            ZoneTier::Review
        }
    }

    pub fn polygon(&self, tier: ZoneTier) -> Option<&Polygon> {
        match tier {
            ZoneTier::Priority => Some(&self.priority),
            ZoneTier::Standard => Some(&self.standard),
            ZoneTier::Extended => Some(&self.extended),
            ZoneTier::Review => None,
        }
    }
}

impl Default for ServiceArea {
    fn default() -> Self {
        // The built-in rings are constants with valid coordinates and > 3 vertices.
        let ring = |pairs: &[(f64, f64)]| Polygon::from_pairs(pairs).unwrap_or_else(|e| unreachable!("built-in ring: {e}"));
        Self::new(ring(PRIORITY_RING), ring(STANDARD_RING), ring(EXTENDED_RING))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area() -> ServiceArea {
        ServiceArea::default()
    }

    fn tier(lat: f64, lon: f64) -> ZoneTier {
        area().resolve(Coordinates::new(lat, lon)).unwrap().tier
    }

    #[test]
    fn test_obelisco_is_priority() {
        assert_eq!(tier(-34.6037, -58.3816), ZoneTier::Priority);
    }

    #[test]
    fn test_palermo_is_priority() {
        assert_eq!(tier(-34.5889, -58.4306), ZoneTier::Priority);
    }

    #[test]
    fn test_suburbs_are_standard() {
        assert_eq!(tier(-34.4708, -58.5286), ZoneTier::Standard); // San Isidro
        assert_eq!(tier(-34.7206, -58.2546), ZoneTier::Standard); // Quilmes
        assert_eq!(tier(-34.6534, -58.6198), ZoneTier::Standard); // Morón
    }

    #[test]
    fn test_outer_ring_is_extended() {
        assert_eq!(tier(-34.9214, -57.9545), ZoneTier::Extended); // La Plata
        assert_eq!(tier(-34.4587, -58.9142), ZoneTier::Extended); // Pilar
        assert_eq!(tier(-34.1633, -58.9592), ZoneTier::Extended); // Campana
    }

    #[test]
    fn test_far_away_is_review() {
        assert_eq!(tier(-38.0055, -57.5426), ZoneTier::Review); // Mar del Plata
        assert_eq!(tier(-31.4201, -64.1888), ZoneTier::Review); // Córdoba
    }

    #[test]
    fn test_invalid_coordinates_rejected() {
        let err = area().resolve(Coordinates::new(95.0, 0.0)).unwrap_err();
        assert!(matches!(err, ZoneError::InvalidCoordinates { .. }));
        assert!(area().resolve(Coordinates::new(f64::NAN, 0.0)).is_err());
        assert!(Coordinates::checked(-34.6, -181.0).is_err());
    }

    #[test]
    fn test_unlocated_goes_to_review() {
        let res = area().resolve_opt(None).unwrap();
        assert_eq!(res.tier, ZoneTier::Review);
        assert!(res.requires_review);
        assert!(res.coordinates.is_none());
    }

    #[test]
    fn test_degenerate_polygon() {
        let err = Polygon::new(vec![Coordinates::new(0.0, 0.0), Coordinates::new(1.0, 1.0)]).unwrap_err();
        assert_eq!(err, ZoneError::DegeneratePolygon(2));
    }

    #[test]
    fn test_square_contains() {
        let square = Polygon::from_pairs(&[(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)]).unwrap();
        assert!(square.contains(Coordinates::new(5.0, 5.0)));
        assert!(!square.contains(Coordinates::new(15.0, 5.0)));
        assert!(!square.contains(Coordinates::new(5.0, -0.1)));
    }

    #[test]
    fn test_edge_and_vertex_points() {
        // Half-open rule: south and west edges are inside, north and east are not.
        let unit = Polygon::from_pairs(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)]).unwrap();
        assert!(unit.contains(Coordinates::new(0.0, 0.5)));
        assert!(!unit.contains(Coordinates::new(1.0, 0.5)));
        assert!(unit.contains(Coordinates::new(0.5, 0.0)));
        assert!(!unit.contains(Coordinates::new(0.5, 1.0)));
        assert!(unit.contains(Coordinates::new(0.0, 0.0)));
        assert!(!unit.contains(Coordinates::new(0.0, 1.0)));
        assert!(!unit.contains(Coordinates::new(1.0, 1.0)));

        // A point on the edge shared by two neighbours belongs to exactly one.
        let east = Polygon::from_pairs(&[(0.0, 1.0), (0.0, 2.0), (1.0, 2.0), (1.0, 1.0)]).unwrap();
        let shared = Coordinates::new(0.5, 1.0);
        assert!(!unit.contains(shared));
        assert!(east.contains(shared));
        let corner = Coordinates::new(0.0, 1.0);
        assert!(!unit.contains(corner));
        assert!(east.contains(corner));
    }

    #[test]
    fn test_concave_polygon() {
        // U shape opening north: the notch between the arms is outside.
        let u = Polygon::from_pairs(&[
            (0.0, 0.0), (10.0, 0.0), (10.0, 3.0), (3.0, 3.0),
            (3.0, 7.0), (10.0, 7.0), (10.0, 10.0), (0.0, 10.0),
        ]).unwrap();
        assert!(u.contains(Coordinates::new(1.0, 5.0)));
        assert!(u.contains(Coordinates::new(8.0, 1.0)));
        assert!(!u.contains(Coordinates::new(8.0, 5.0)));
    }

    #[test]
    fn test_check_order_wins_over_nesting() {
        // Priority polygon deliberately outside the others: order alone decides.
        let sq = |lat: f64, lon: f64| Polygon::from_pairs(&[
            (lat, lon), (lat, lon + 1.0), (lat + 1.0, lon + 1.0), (lat + 1.0, lon),
        ]).unwrap();
        let area = ServiceArea::new(sq(0.0, 0.0), sq(0.0, 0.0), sq(5.0, 5.0));
        let res = area.resolve(Coordinates::new(0.5, 0.5)).unwrap();
        assert_eq!(res.tier, ZoneTier::Priority);
        let res = area.resolve(Coordinates::new(5.5, 5.5)).unwrap();
        assert_eq!(res.tier, ZoneTier::Extended);
    }

    #[test]
    fn test_tier_multipliers() {
        assert_eq!(ZoneTier::Priority.multiplier(), 1.0);
        assert!(ZoneTier::Standard.multiplier() > ZoneTier::Priority.multiplier());
        assert_eq!(ZoneTier::Review.multiplier(), ZoneTier::Extended.multiplier());
        assert!(!ZoneTier::Extended.requires_review());
    }

    #[test]
    fn test_tier_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ZoneTier::Extended).unwrap(), "\"extended\"");
        let t: ZoneTier = serde_json::from_str("\"review\"").unwrap();
        assert_eq!(t, ZoneTier::Review);
    }

    #[test]
    fn test_coordinates_display() {
        let c = Coordinates::new(-34.6037, -58.3816);
        assert_eq!(c.to_string(), "34.6037\u{00B0}S, 58.3816\u{00B0}W");
    }
}
