//! Lead intake: contact details plus the quote they were shown.

pub mod store;
pub mod types;

pub use store::LeadStore;
pub use types::{Contact, Lead, LeadError, LeadStatus, NewLead};
