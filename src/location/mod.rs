//! Job-site geocoding.
//!
//! Turns a free-form address into coordinates for zone resolution, with a
//! local cache and a built-in locality dataset for offline use.

pub mod cache;
pub mod providers;
pub mod resolver;
pub mod types;

pub use providers::{builtin_locality_list, LocalityInfo};
pub use resolver::{lookup_uncached, LocationResolver};
pub use types::{LocationError, LocationSource, ResolvedAddress};
