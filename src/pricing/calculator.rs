//! Quote calculation.
//!
//! Labor = pack base + extra bocas/ambientes + labor items, scaled by
//! urgency × difficulty × zone. Professional items are added flat on top.
//! The result never drops below the catalog minimum.

use super::catalog::{AdditionalItem, Catalog, ItemKind};
use crate::zone::ZoneTier;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    Standard,
    Priority,
    Emergency,
}

impl Urgency {
    pub fn multiplier(self) -> f64 {
        match self {
            Self::Standard => 1.00,
            Self::Priority => 1.20,
            Self::Emergency => 1.50,
        }
    }
}

impl FromStr for Urgency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" | "normal" => Ok(Self::Standard),
            "priority" | "prioritaria" => Ok(Self::Priority),
            "emergency" | "urgente" => Ok(Self::Emergency),
            _ => Err(format!("Unknown urgency '{}'. Use standard, priority or emergency.", s)),
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Priority => write!(f, "priority"),
            Self::Emergency => write!(f, "emergency"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Low,
    Medium,
    High,
}

impl Difficulty {
    pub fn multiplier(self) -> f64 {
        match self {
            Self::Low => 1.00,
            Self::Medium => 1.15,
            Self::High => 1.35,
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" | "baja" => Ok(Self::Low),
            "medium" | "media" => Ok(Self::Medium),
            "high" | "alta" => Ok(Self::High),
            _ => Err(format!("Unknown difficulty '{}'. Use low, medium or high.", s)),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// One requested item and how many units of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSelection {
    pub item_id: String,
    pub quantity: u32,
}

impl LineSelection {
    pub fn new(item_id: impl Into<String>, quantity: u32) -> Self {
        Self { item_id: item_id.into(), quantity }
    }
}

/// Job modifiers collected by the configurator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteSummary {
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub bocas: u32,
    #[serde(default)]
    pub ambientes: u32,
    #[serde(default)]
    pub professional: Vec<LineSelection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub pack_id: String,
    #[serde(default)]
    pub items: Vec<LineSelection>,
    #[serde(default)]
    pub summary: QuoteSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    ExtraBocas,
    ExtraAmbientes,
    Item,
    Professional,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownLine {
    pub code: String,
    pub label: String,
    pub kind: LineKind,
    pub quantity: u32,
    pub unit_price: f64,
    pub amount: f64,
}

/// Full result of a price calculation, every amount rounded to cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub pack_id: String,
    pub pack_name: String,
    pub base_price: f64,
    pub labor_lines: Vec<BreakdownLine>,
    pub labor_subtotal: f64,
    pub urgency: Urgency,
    pub urgency_multiplier: f64,
    pub difficulty: Difficulty,
    pub difficulty_multiplier: f64,
    pub zone: ZoneTier,
    pub zone_multiplier: f64,
    pub adjusted_labor: f64,
    pub professional_lines: Vec<BreakdownLine>,
    pub professional_subtotal: f64,
    /// Amount added to reach the catalog minimum (0 when not applied).
    pub minimum_adjustment: f64,
    pub total: f64,
    pub requires_review: bool,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PricingError {
    #[error("unknown pack '{0}'")]
    UnknownPack(String),
    #[error("unknown item '{0}'")]
    UnknownItem(String),
    #[error("item '{item}' is not available with pack '{pack}'")]
    IncompatibleItem { item: String, pack: String },
    #[error("item '{item}' is a {actual:?} item, expected {expected:?}")]
    WrongItemKind { item: String, expected: ItemKind, actual: ItemKind },
    #[error("item '{item}': quantity {quantity} outside 1..={max}")]
    InvalidQuantity { item: String, quantity: u32, max: u32 },
}

/// Round half away from zero to two decimals.
pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Sum quantities of repeated item ids, keeping first-seen order.
fn merge_selections(selections: &[LineSelection]) -> Vec<LineSelection> {
    let mut merged: Vec<LineSelection> = Vec::with_capacity(selections.len());
    for sel in selections {
        match merged.iter_mut().find(|m| m.item_id == sel.item_id) {
            Some(m) => m.quantity = m.quantity.saturating_add(sel.quantity),
            None => merged.push(sel.clone()),
        }
    }
    merged
}

fn priced_line(
    catalog: &Catalog,
    pack_id: &str,
    sel: &LineSelection,
    expected: ItemKind,
) -> Result<BreakdownLine, PricingError> {
    let item: &AdditionalItem = catalog
        .item(&sel.item_id)
        .ok_or_else(|| PricingError::UnknownItem(sel.item_id.clone()))?;

    if item.kind != expected {
        return Err(PricingError::WrongItemKind {
            item: item.id.clone(),
            expected,
            actual: item.kind,
        });
    }
    if !item.is_compatible_with(pack_id) {
        return Err(PricingError::IncompatibleItem {
            item: item.id.clone(),
            pack: pack_id.to_string(),
        });
    }
    if sel.quantity == 0 || sel.quantity > item.max_quantity {
        return Err(PricingError::InvalidQuantity {
            item: item.id.clone(),
            quantity: sel.quantity,
            max: item.max_quantity,
        });
    }

    Ok(BreakdownLine {
        code: item.id.clone(),
        label: item.name.clone(),
        kind: match expected {
            ItemKind::Labor => LineKind::Item,
            ItemKind::Professional => LineKind::Professional,
        },
        quantity: sel.quantity,
        unit_price: item.unit_price,
        amount: round_currency(item.unit_price * sel.quantity as f64),
    })
}

/// Price a request for a job site in `zone`.
pub fn calculate(catalog: &Catalog, request: &QuoteRequest, zone: ZoneTier) -> Result<Breakdown, PricingError> {
    let pack = catalog
        .pack(&request.pack_id)
        .ok_or_else(|| PricingError::UnknownPack(request.pack_id.clone()))?;
    let summary = &request.summary;

    let mut labor_lines = Vec::new();

    let extra_bocas = summary.bocas.saturating_sub(pack.included_bocas);
    if extra_bocas > 0 {
        labor_lines.push(BreakdownLine {
            code: "bocas".into(),
            label: format!("Bocas adicionales (incluye {})", pack.included_bocas),
            kind: LineKind::ExtraBocas,
            quantity: extra_bocas,
            unit_price: catalog.boca_price,
            amount: round_currency(catalog.boca_price * extra_bocas as f64),
        });
    }

    let extra_ambientes = summary.ambientes.saturating_sub(pack.included_ambientes);
    if extra_ambientes > 0 {
        labor_lines.push(BreakdownLine {
            code: "ambientes".into(),
            label: format!("Ambientes adicionales (incluye {})", pack.included_ambientes),
            kind: LineKind::ExtraAmbientes,
            quantity: extra_ambientes,
            unit_price: catalog.ambiente_price,
            amount: round_currency(catalog.ambiente_price * extra_ambientes as f64),
        });
    }

    for sel in merge_selections(&request.items) {
        labor_lines.push(priced_line(catalog, &pack.id, &sel, ItemKind::Labor)?);
    }

    let professional_lines = merge_selections(&summary.professional)
        .iter()
        .map(|sel| priced_line(catalog, &pack.id, sel, ItemKind::Professional))
        .collect::<Result<Vec<_>, _>>()?;

    let labor_subtotal = round_currency(pack.base_price + labor_lines.iter().map(|l| l.amount).sum::<f64>());
    let urgency_multiplier = summary.urgency.multiplier();
    let difficulty_multiplier = summary.difficulty.multiplier();
    let zone_multiplier = zone.multiplier();
    let adjusted_labor = round_currency(labor_subtotal * urgency_multiplier * difficulty_multiplier * zone_multiplier);

    let professional_subtotal = round_currency(professional_lines.iter().map(|l| l.amount).sum());

    let raw_total = round_currency(adjusted_labor + professional_subtotal);
    let minimum_adjustment = if raw_total < catalog.minimum_total {
        round_currency(catalog.minimum_total - raw_total)
    } else {
        0.0
    };
    let total = round_currency(raw_total + minimum_adjustment);

    tracing::debug!(pack = %pack.id, %zone, labor_subtotal, adjusted_labor, professional_subtotal, total, "quote calculated");

    Ok(Breakdown {
        pack_id: pack.id.clone(),
        pack_name: pack.name.clone(),
        base_price: pack.base_price,
        labor_lines,
        labor_subtotal,
        urgency: summary.urgency,
        urgency_multiplier,
        difficulty: summary.difficulty,
        difficulty_multiplier,
        zone,
        zone_multiplier,
        adjusted_labor,
        professional_lines,
        professional_subtotal,
        minimum_adjustment,
        total,
        requires_review: zone.requires_review(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn request(pack: &str) -> QuoteRequest {
        QuoteRequest {
            pack_id: pack.into(),
            items: vec![],
            summary: QuoteSummary::default(),
        }
    }

    #[test]
    fn test_base_pack_only() {
        let b = calculate(&Catalog::builtin(), &request("starter-residencial"), ZoneTier::Priority).unwrap();
        assert_relative_eq!(b.labor_subtotal, 180_000.0);
        assert_relative_eq!(b.total, 180_000.0);
        assert!(b.labor_lines.is_empty());
        assert!(!b.requires_review);
    }

    #[test]
    fn test_included_bocas_not_charged() {
        let mut req = request("starter-residencial");
        req.summary.bocas = 10;
        req.summary.ambientes = 2;
        let b = calculate(&Catalog::builtin(), &req, ZoneTier::Priority).unwrap();
        assert_relative_eq!(b.total, 180_000.0);
    }

    #[test]
    fn test_extra_bocas_and_ambientes() {
        let mut req = request("starter-residencial");
        req.summary.bocas = 14; // 4 extra × 12 000
        req.summary.ambientes = 3; // 1 extra × 35 000
        let b = calculate(&Catalog::builtin(), &req, ZoneTier::Priority).unwrap();
        assert_eq!(b.labor_lines.len(), 2);
        assert_eq!(b.labor_lines[0].kind, LineKind::ExtraBocas);
        assert_eq!(b.labor_lines[0].quantity, 4);
        assert_relative_eq!(b.labor_subtotal, 180_000.0 + 48_000.0 + 35_000.0);
    }

    #[test]
    fn test_full_formula() {
        let mut req = request("hogar-completo");
        req.items = vec![LineSelection::new("circuito-aire", 2), LineSelection::new("luminaria-led", 10)];
        req.summary = QuoteSummary {
            urgency: Urgency::Priority,
            difficulty: Difficulty::Medium,
            bocas: 27,
            ambientes: 5,
            professional: vec![LineSelection::new("certificado-dci", 1)],
        };
        let b = calculate(&Catalog::builtin(), &req, ZoneTier::Standard).unwrap();

        // 420 000 + 2×12 000 + 2×65 000 + 10×9 500 = 669 000
        assert_relative_eq!(b.labor_subtotal, 669_000.0);
        // 669 000 × 1.20 × 1.15 × 1.10 = 1 015 542
        assert_relative_eq!(b.adjusted_labor, 1_015_542.0, epsilon = 0.01);
        assert_relative_eq!(b.professional_subtotal, 120_000.0);
        assert_relative_eq!(b.total, 1_135_542.0, epsilon = 0.01);
        assert_eq!(b.minimum_adjustment, 0.0);
    }

    #[test]
    fn test_professional_not_scaled() {
        let mut req = request("starter-residencial");
        req.summary.urgency = Urgency::Emergency;
        req.summary.difficulty = Difficulty::High;
        req.summary.professional = vec![LineSelection::new("medicion-pat", 2)];
        let b = calculate(&Catalog::builtin(), &req, ZoneTier::Extended).unwrap();
        assert_relative_eq!(b.professional_subtotal, 110_000.0);
        assert_relative_eq!(b.adjusted_labor, round_currency(180_000.0 * 1.5 * 1.35 * 1.25));
        assert_relative_eq!(b.total, b.adjusted_labor + 110_000.0);
    }

    #[test]
    fn test_zone_review_flags_and_prices_as_extended() {
        let review = calculate(&Catalog::builtin(), &request("tablero-express"), ZoneTier::Review).unwrap();
        let extended = calculate(&Catalog::builtin(), &request("tablero-express"), ZoneTier::Extended).unwrap();
        assert!(review.requires_review);
        assert!(!extended.requires_review);
        assert_relative_eq!(review.total, extended.total);
    }

    #[test]
    fn test_minimum_total_applied() {
        let mut catalog = Catalog::builtin();
        catalog.minimum_total = 100_000.0;
        let b = calculate(&catalog, &request("tablero-express"), ZoneTier::Priority).unwrap();
        assert_relative_eq!(b.minimum_adjustment, 5_000.0);
        assert_relative_eq!(b.total, 100_000.0);
    }

    #[test]
    fn test_unknown_pack() {
        let err = calculate(&Catalog::builtin(), &request("mansion"), ZoneTier::Priority).unwrap_err();
        assert_eq!(err, PricingError::UnknownPack("mansion".into()));
    }

    #[test]
    fn test_unknown_item() {
        let mut req = request("starter-residencial");
        req.items = vec![LineSelection::new("flux-capacitor", 1)];
        let err = calculate(&Catalog::builtin(), &req, ZoneTier::Priority).unwrap_err();
        assert_eq!(err, PricingError::UnknownItem("flux-capacitor".into()));
    }

    #[test]
    fn test_incompatible_item() {
        let mut req = request("starter-residencial");
        req.items = vec![LineSelection::new("tablero-seccional", 1)];
        let err = calculate(&Catalog::builtin(), &req, ZoneTier::Priority).unwrap_err();
        assert!(matches!(err, PricingError::IncompatibleItem { .. }));
    }

    #[test]
    fn test_professional_items_follow_pack_compatibility() {
        let mut req = request("starter-residencial");
        req.summary.professional = vec![LineSelection::new("plano-electrico", 1)];
        let err = calculate(&Catalog::builtin(), &req, ZoneTier::Priority).unwrap_err();
        assert_eq!(err, PricingError::IncompatibleItem {
            item: "plano-electrico".into(),
            pack: "starter-residencial".into(),
        });

        req.pack_id = "hogar-completo".into();
        let b = calculate(&Catalog::builtin(), &req, ZoneTier::Priority).unwrap();
        assert_relative_eq!(b.professional_subtotal, 90_000.0);
    }

    #[test]
    fn test_professional_item_in_labor_list_rejected() {
        let mut req = request("starter-residencial");
        req.items = vec![LineSelection::new("certificado-dci", 1)];
        let err = calculate(&Catalog::builtin(), &req, ZoneTier::Priority).unwrap_err();
        assert!(matches!(err, PricingError::WrongItemKind { expected: ItemKind::Labor, .. }));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let mut req = request("starter-residencial");
        req.items = vec![LineSelection::new("toma-exterior", 0)];
        let err = calculate(&Catalog::builtin(), &req, ZoneTier::Priority).unwrap_err();
        assert!(matches!(err, PricingError::InvalidQuantity { quantity: 0, .. }));
    }

    #[test]
    fn test_duplicates_merged_before_max_check() {
        let mut req = request("starter-residencial");
        // max for puesta-a-tierra is 2
        req.items = vec![LineSelection::new("puesta-a-tierra", 1), LineSelection::new("puesta-a-tierra", 1)];
        let b = calculate(&Catalog::builtin(), &req, ZoneTier::Priority).unwrap();
        assert_eq!(b.labor_lines.len(), 1);
        assert_eq!(b.labor_lines[0].quantity, 2);

        req.items.push(LineSelection::new("puesta-a-tierra", 1));
        let err = calculate(&Catalog::builtin(), &req, ZoneTier::Priority).unwrap_err();
        assert!(matches!(err, PricingError::InvalidQuantity { quantity: 3, max: 2, .. }));
    }

    #[test]
    fn test_round_currency() {
        assert_eq!(round_currency(0.125), 0.13);
        assert_eq!(round_currency(-2.5), -2.5);
        assert_eq!(round_currency(1234.5678), 1234.57);
    }

    #[test]
    fn test_modifier_parsing() {
        assert_eq!("URGENTE".parse::<Urgency>().unwrap(), Urgency::Emergency);
        assert_eq!("media".parse::<Difficulty>().unwrap(), Difficulty::Medium);
        assert!("later".parse::<Urgency>().is_err());
    }

    #[test]
    fn test_request_json_defaults() {
        let req: QuoteRequest = serde_json::from_str(r#"{"pack_id":"starter-residencial"}"#).unwrap();
        assert_eq!(req.summary.urgency, Urgency::Standard);
        assert_eq!(req.summary.difficulty, Difficulty::Low);
        assert!(req.items.is_empty());
    }
}
