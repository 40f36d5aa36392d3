//! JSON-file lead store at `<data_dir>/leads.json`.
//!
//! The whole file is rewritten on each mutation through a temp file + rename,
//! so a crash mid-write leaves the previous version intact.

use super::types::{Lead, LeadError, LeadStatus, NewLead};
use chrono::Utc;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub struct LeadStore {
    path: PathBuf,
    leads: Vec<Lead>,
}

impl LeadStore {
    pub fn open(data_dir: &Path) -> Result<Self, LeadError> {
        Self::load_from(data_dir.join("leads.json"))
    }

    /// Load from a specific file; a missing file is an empty store.
    pub fn load_from(path: PathBuf) -> Result<Self, LeadError> {
        let leads = match fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str(&data).map_err(|source| LeadError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(source) => return Err(LeadError::Io { path, source }),
        };
        Ok(Self { path, leads })
    }

    pub fn create(&mut self, new: NewLead) -> Result<Lead, LeadError> {
        let contact = new.contact.normalized()?;
        let now = Utc::now();
        let lead = Lead {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            status: LeadStatus::New,
            contact,
            address: new.address,
            coordinates: new.coordinates,
            quote: new.quote,
            notes: new.notes,
        };
        self.leads.push(lead.clone());
        if let Err(e) = self.persist() {
            self.leads.pop();
            return Err(e);
        }
        tracing::info!(
            id = %lead.id,
            zone = %lead.quote.zone.tier,
            total = lead.quote.breakdown.total,
            "lead created"
        );
        Ok(lead)
    }

    pub fn get(&self, id: Uuid) -> Option<&Lead> {
        self.leads.iter().find(|l| l.id == id)
    }

    /// Newest first, optionally filtered by status.
    pub fn list(&self, status: Option<LeadStatus>) -> Vec<&Lead> {
        let mut out: Vec<&Lead> = self
            .leads
            .iter()
            .filter(|l| status.map_or(true, |s| l.status == s))
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    pub fn set_status(&mut self, id: Uuid, status: LeadStatus) -> Result<Lead, LeadError> {
        let idx = self
            .leads
            .iter()
            .position(|l| l.id == id)
            .ok_or(LeadError::NotFound(id))?;

        let previous = self.leads[idx].clone();
        self.leads[idx].status = status;
        self.leads[idx].updated_at = Utc::now();
        if let Err(e) = self.persist() {
            self.leads[idx] = previous;
            return Err(e);
        }
        tracing::info!(%id, from = %previous.status, to = %status, "lead status changed");
        Ok(self.leads[idx].clone())
    }

    pub fn len(&self) -> usize {
        self.leads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }

    fn persist(&self) -> Result<(), LeadError> {
        let io_err = |source| LeadError::Io { path: self.path.clone(), source };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(&self.leads).map_err(|source| LeadError::Parse {
            path: self.path.clone(),
            source,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        if let Err(e) = write_synced(&tmp, json.as_bytes()).and_then(|()| fs::rename(&tmp, &self.path)) {
            let _ = fs::remove_file(&tmp);
            return Err(io_err(e));
        }
        Ok(())
    }
}

/// Write and flush to disk before the caller renames over the live file.
fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.sync_all()
}
