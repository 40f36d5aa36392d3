use crate::config::{ConfigError, Settings};
use crate::leads::{LeadError, LeadStore};
use crate::location::LocationResolver;
use crate::pricing::{Catalog, CatalogError};
use crate::quote::Quoter;
use crate::zone::ServiceArea;
use chrono_tz::Tz;
use std::sync::Mutex;

pub struct AppState {
    pub quoter: Quoter,
    pub resolver: Mutex<LocationResolver>,
    pub leads: Mutex<LeadStore>,
    pub tz: Tz,
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Leads(#[from] LeadError),
}

impl AppState {
    pub fn from_settings(settings: &Settings) -> Result<Self, StartupError> {
        let catalog = Catalog::load_or_builtin(&settings.data_dir)?;
        let mut resolver = LocationResolver::new(&settings.data_dir);
        resolver.set_offline(settings.offline);

        Ok(Self {
            quoter: Quoter::new(catalog, ServiceArea::default()),
            resolver: Mutex::new(resolver),
            leads: Mutex::new(LeadStore::open(&settings.data_dir)?),
            tz: settings.tz()?,
        })
    }
}
