//! Lead records: who asked, where, and what they were quoted.

use crate::quote::QuoteOutput;
use crate::zone::Coordinates;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Contact {
    /// Trim fields and check the minimum needed to call the client back.
    pub fn normalized(self) -> Result<Self, LeadError> {
        let clean = |s: Option<String>| s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let contact = Self {
            name: self.name.trim().to_string(),
            email: clean(self.email),
            phone: clean(self.phone),
        };

        if contact.name.is_empty() {
            return Err(LeadError::InvalidContact("name is required".into()));
        }
        if let Some(email) = &contact.email {
            let valid = email
                .split_once('@')
                .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.'));
            if !valid {
                return Err(LeadError::InvalidContact(format!("invalid email '{}'", email)));
            }
        }
        if contact.email.is_none() && contact.phone.is_none() {
            return Err(LeadError::InvalidContact("email or phone is required".into()));
        }
        Ok(contact)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Quoted,
    Won,
    Lost,
}

impl FromStr for LeadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(Self::New),
            "contacted" => Ok(Self::Contacted),
            "quoted" => Ok(Self::Quoted),
            "won" => Ok(Self::Won),
            "lost" => Ok(Self::Lost),
            _ => Err(format!("Unknown status '{}'. Use new, contacted, quoted, won or lost.", s)),
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::Quoted => "quoted",
            Self::Won => "won",
            Self::Lost => "lost",
        };
        f.pad(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: LeadStatus,
    pub contact: Contact,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    pub quote: QuoteOutput,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Lead {
    /// Creation time in the business time zone, e.g. "2026-03-02 14:05".
    pub fn created_local(&self, tz: Tz) -> String {
        self.created_at.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string()
    }
}

/// Everything needed to register a new lead.
#[derive(Debug, Clone)]
pub struct NewLead {
    pub contact: Contact,
    pub address: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub quote: QuoteOutput,
    pub notes: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum LeadError {
    #[error("lead store I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt lead store {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("lead {0} not found")]
    NotFound(Uuid),
    #[error("invalid contact: {0}")]
    InvalidContact(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(name: &str, email: Option<&str>, phone: Option<&str>) -> Contact {
        Contact {
            name: name.into(),
            email: email.map(Into::into),
            phone: phone.map(Into::into),
        }
    }

    #[test]
    fn test_contact_trimmed() {
        let c = contact("  Ana Pérez ", Some(" ana@example.com "), Some("  ")).normalized().unwrap();
        assert_eq!(c.name, "Ana Pérez");
        assert_eq!(c.email.as_deref(), Some("ana@example.com"));
        assert!(c.phone.is_none());
    }

    #[test]
    fn test_contact_requires_name() {
        assert!(contact(" ", Some("a@b.com"), None).normalized().is_err());
    }

    #[test]
    fn test_contact_requires_channel() {
        let err = contact("Ana", None, None).normalized().unwrap_err();
        assert!(err.to_string().contains("email or phone"));
        assert!(contact("Ana", None, Some("+54 11 5555-0000")).normalized().is_ok());
    }

    #[test]
    fn test_contact_rejects_bad_email() {
        assert!(contact("Ana", Some("ana.example.com"), None).normalized().is_err());
        assert!(contact("Ana", Some("@example.com"), None).normalized().is_err());
        assert!(contact("Ana", Some("ana@localhost"), None).normalized().is_err());
    }

    #[test]
    fn test_status_parse_and_display() {
        assert_eq!("WON".parse::<LeadStatus>().unwrap(), LeadStatus::Won);
        assert_eq!(LeadStatus::Contacted.to_string(), "contacted");
        assert!("archived".parse::<LeadStatus>().is_err());
    }
}
