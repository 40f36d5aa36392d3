//! Pricing subsystem: the catalog of packs/items and the quote calculator.

pub mod calculator;
pub mod catalog;

pub use calculator::{
    calculate, round_currency, Breakdown, BreakdownLine, Difficulty, LineKind, LineSelection,
    PricingError, QuoteRequest, QuoteSummary, Urgency,
};
pub use catalog::{AdditionalItem, Catalog, CatalogError, ItemKind, Pack, PackCategory};
