//! Tablero: quote configurator, service-zone resolver and lead intake for
//! an electrical contracting business.

pub mod config;
pub mod leads;
pub mod location;
pub mod pricing;
pub mod quote;
pub mod server;
pub mod telemetry;
pub mod zone;
