//! Configurator entry point: zone lookup plus pricing.
//!
//! Resolves the job site's zone, runs the pricing calculator, and renders
//! the result as JSON or as an ASCII summary box for the terminal.

use crate::pricing::{self, Breakdown, Catalog, LineKind, PricingError, QuoteRequest};
use crate::zone::{Coordinates, ServiceArea, ZoneError, ZoneResolution};
use serde::{Deserialize, Serialize};

/// Full configurator output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteOutput {
    pub currency: String,
    pub zone: ZoneResolution,
    pub breakdown: Breakdown,
}

#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    #[error(transparent)]
    Zone(#[from] ZoneError),
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// Owns the catalog and service area used to price requests.
#[derive(Debug, Clone)]
pub struct Quoter {
    catalog: Catalog,
    area: ServiceArea,
}

impl Quoter {
    pub fn new(catalog: Catalog, area: ServiceArea) -> Self {
        Self { catalog, area }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn area(&self) -> &ServiceArea {
        &self.area
    }

    pub fn resolve_zone(&self, location: Option<Coordinates>) -> Result<ZoneResolution, ZoneError> {
        self.area.resolve_opt(location)
    }

    /// Price `request` for a job site at `location` (unknown site → review tier).
    pub fn quote(&self, request: &QuoteRequest, location: Option<Coordinates>) -> Result<QuoteOutput, QuoteError> {
        let zone = self.resolve_zone(location)?;
        let breakdown = pricing::calculate(&self.catalog, request, zone.tier)?;
        Ok(QuoteOutput {
            currency: self.catalog.currency.clone(),
            zone,
            breakdown,
        })
    }
}

impl Default for Quoter {
    fn default() -> Self {
        Self::new(Catalog::builtin(), ServiceArea::default())
    }
}

// ─── ASCII rendering ────────────────────────────────────────────

const BOX_WIDTH: usize = 62;

/// Format an amount with thousands separators: 1234567.5 → "1.234.567,50".
pub fn format_amount(value: f64) -> String {
    let cents = (value * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    let whole = (cents / 100).to_string();
    let frac = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    format!("{}{},{:02}", sign, grouped, frac)
}

fn row(out: &mut String, label: &str, value: &str) {
    let label_len = label.chars().count();
    let value_len = value.chars().count();
    let pad = BOX_WIDTH.saturating_sub(label_len + value_len + 2).max(1);
    out.push_str(&format!("  ║ {}{}{} ║\n", label, " ".repeat(pad), value));
}

fn rule(out: &mut String, left: char, right: char) {
    out.push_str(&format!("  {}{}{}\n", left, "═".repeat(BOX_WIDTH), right));
}

pub fn render_ascii_breakdown(output: &QuoteOutput) -> String {
    let b = &output.breakdown;
    let cur = &output.currency;
    let mut out = String::new();

    let zone_line = match output.zone.coordinates {
        Some(c) => format!("  Zone: {} (x{:.2}) at {}\n", output.zone.tier, output.zone.multiplier, c),
        None => format!("  Zone: {} (x{:.2}), no site location\n", output.zone.tier, output.zone.multiplier),
    };
    out.push_str(&zone_line);
    rule(&mut out, '╔', '╗');

    row(&mut out, &b.pack_name, &format!("{} {}", cur, format_amount(b.base_price)));
    for line in &b.labor_lines {
        let label = match line.kind {
            LineKind::Item => format!("{} ×{}", line.label, line.quantity),
            _ => format!("{} ({})", line.label, line.quantity),
        };
        row(&mut out, &label, &format_amount(line.amount));
    }
    rule(&mut out, '╠', '╣');
    row(&mut out, "Labor subtotal", &format_amount(b.labor_subtotal));
    row(&mut out, &format!("Urgency ({})", b.urgency), &format!("x{:.2}", b.urgency_multiplier));
    row(&mut out, &format!("Difficulty ({})", b.difficulty), &format!("x{:.2}", b.difficulty_multiplier));
    row(&mut out, &format!("Zone ({})", b.zone), &format!("x{:.2}", b.zone_multiplier));
    row(&mut out, "Adjusted labor", &format_amount(b.adjusted_labor));

    if !b.professional_lines.is_empty() {
        rule(&mut out, '╠', '╣');
        for line in &b.professional_lines {
            row(&mut out, &format!("{} ×{}", line.label, line.quantity), &format_amount(line.amount));
        }
    }
    if b.minimum_adjustment > 0.0 {
        row(&mut out, "Minimum charge adjustment", &format_amount(b.minimum_adjustment));
    }

    rule(&mut out, '╠', '╣');
    row(&mut out, "TOTAL", &format!("{} {}", cur, format_amount(b.total)));
    rule(&mut out, '╚', '╝');

    if b.requires_review {
        out.push_str("  [R] Site outside the service area: quote subject to manual review\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::{LineSelection, QuoteSummary};
    use crate::zone::ZoneTier;

    fn req() -> QuoteRequest {
        QuoteRequest {
            pack_id: "starter-residencial".into(),
            items: vec![LineSelection::new("toma-exterior", 2)],
            summary: QuoteSummary {
                professional: vec![LineSelection::new("certificado-dci", 1)],
                ..QuoteSummary::default()
            },
        }
    }

    #[test]
    fn test_quote_priority_site() {
        let q = Quoter::default();
        let out = q.quote(&req(), Some(Coordinates::new(-34.6037, -58.3816))).unwrap();
        assert_eq!(out.zone.tier, ZoneTier::Priority);
        assert_eq!(out.currency, "ARS");
        assert_eq!(out.breakdown.total, 180_000.0 + 36_000.0 + 120_000.0);
    }

    #[test]
    fn test_quote_without_location_is_review() {
        let out = Quoter::default().quote(&req(), None).unwrap();
        assert_eq!(out.zone.tier, ZoneTier::Review);
        assert!(out.breakdown.requires_review);
    }

    #[test]
    fn test_quote_invalid_location() {
        let err = Quoter::default().quote(&req(), Some(Coordinates::new(0.0, 200.0))).unwrap_err();
        assert!(matches!(err, QuoteError::Zone(_)));
    }

    #[test]
    fn test_quote_pricing_error_propagates() {
        let mut r = req();
        r.pack_id = "missing".into();
        let err = Quoter::default().quote(&r, None).unwrap_err();
        assert!(matches!(err, QuoteError::Pricing(PricingError::UnknownPack(_))));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.0), "0,00");
        assert_eq!(format_amount(999.5), "999,50");
        assert_eq!(format_amount(1234567.891), "1.234.567,89");
        assert_eq!(format_amount(-1000.0), "-1.000,00");
    }

    #[test]
    fn test_ascii_breakdown_contents() {
        let out = Quoter::default().quote(&req(), Some(Coordinates::new(-34.6037, -58.3816))).unwrap();
        let ascii = render_ascii_breakdown(&out);
        println!("{}", ascii);
        assert!(ascii.contains("Starter Residencial"));
        assert!(ascii.contains("Certificado DCI"));
        assert!(ascii.contains("TOTAL"));
        assert!(ascii.contains("ARS 336.000,00"));
        assert!(!ascii.contains("[R]"));
    }

    #[test]
    fn test_ascii_breakdown_review_tag() {
        let out = Quoter::default().quote(&req(), None).unwrap();
        let ascii = render_ascii_breakdown(&out);
        assert!(ascii.contains("[R]"));
        assert!(ascii.contains("no site location"));
    }

    #[test]
    fn test_output_json_roundtrip_fields() {
        let out = Quoter::default().quote(&req(), None).unwrap();
        let json = serde_json::to_string(&out).unwrap();
        assert!(json.contains("\"tier\":\"review\""));
        assert!(json.contains("\"requires_review\":true"));
    }
}
