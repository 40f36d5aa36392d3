//! Price catalog: packs, additional items and per-unit extras.
//!
//! The built-in catalog ships with the binary. An operator can replace it by
//! dropping a `catalog.json` into the data directory; it is validated on load.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackCategory {
    Residential,
    Commercial,
}

/// A fixed-scope labor offering with a base price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pack {
    pub id: String,
    pub name: String,
    pub category: PackCategory,
    pub base_price: f64,
    /// Bocas covered by the base price; extra ones are charged per unit.
    #[serde(default)]
    pub included_bocas: u32,
    #[serde(default)]
    pub included_ambientes: u32,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Scaled by urgency, difficulty and zone.
    Labor,
    /// Certificates and measurements, billed flat.
    Professional,
}

/// An à la carte line item priced per unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditionalItem {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    pub unit: String,
    pub unit_price: f64,
    /// Pack ids this item may be combined with. Empty means any pack.
    #[serde(default)]
    pub compatible_packs: Vec<String>,
    #[serde(default = "default_max_quantity")]
    pub max_quantity: u32,
}

fn default_max_quantity() -> u32 {
    99
}

impl AdditionalItem {
    pub fn is_compatible_with(&self, pack_id: &str) -> bool {
        self.compatible_packs.is_empty() || self.compatible_packs.iter().any(|p| p == pack_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub currency: String,
    pub packs: Vec<Pack>,
    pub items: Vec<AdditionalItem>,
    pub boca_price: f64,
    pub ambiente_price: f64,
    #[serde(default)]
    pub minimum_total: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("cannot read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed catalog {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("duplicate id '{0}' in catalog")]
    DuplicateId(String),
    #[error("'{id}' has a non-positive price")]
    InvalidPrice { id: String },
    #[error("item '{0}' has max_quantity 0 and can never be selected")]
    ZeroMaxQuantity(String),
    #[error("item '{item}' lists unknown compatible pack '{pack}'")]
    UnknownCompatiblePack { item: String, pack: String },
    #[error("catalog has no packs")]
    Empty,
}

impl Catalog {
    pub fn pack(&self, id: &str) -> Option<&Pack> {
        self.packs.iter().find(|p| p.id == id)
    }

    pub fn item(&self, id: &str) -> Option<&AdditionalItem> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Items that may be offered alongside `pack_id`.
    pub fn compatible_items<'a>(&'a self, pack_id: &'a str) -> impl Iterator<Item = &'a AdditionalItem> + 'a {
        self.items.iter().filter(move |i| i.is_compatible_with(pack_id))
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.packs.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        for id in self.packs.iter().map(|p| &p.id).chain(self.items.iter().map(|i| &i.id)) {
            if !seen.insert(id.as_str()) {
                return Err(CatalogError::DuplicateId(id.clone()));
            }
        }

        for p in &self.packs {
            if !(p.base_price.is_finite() && p.base_price > 0.0) {
                return Err(CatalogError::InvalidPrice { id: p.id.clone() });
            }
        }

        for item in &self.items {
            if !(item.unit_price.is_finite() && item.unit_price > 0.0) {
                return Err(CatalogError::InvalidPrice { id: item.id.clone() });
            }
            if item.max_quantity == 0 {
                return Err(CatalogError::ZeroMaxQuantity(item.id.clone()));
            }
            if let Some(pack) = item.compatible_packs.iter().find(|p| self.pack(p).is_none()) {
                return Err(CatalogError::UnknownCompatiblePack {
                    item: item.id.clone(),
                    pack: pack.clone(),
                });
            }
        }

        for (id, price) in [("boca_price", self.boca_price), ("ambiente_price", self.ambiente_price)] {
            if !(price.is_finite() && price > 0.0) {
                return Err(CatalogError::InvalidPrice { id: id.to_string() });
            }
        }
        if !(self.minimum_total.is_finite() && self.minimum_total >= 0.0) {
            return Err(CatalogError::InvalidPrice { id: "minimum_total".into() });
        }

        Ok(())
    }

    /// Read and validate a catalog JSON file.
    pub fn load_from(path: &Path) -> Result<Self, CatalogError> {
        let data = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog: Catalog = serde_json::from_str(&data).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Use `<data_dir>/catalog.json` when present, the built-in catalog otherwise.
    pub fn load_or_builtin(data_dir: &Path) -> Result<Self, CatalogError> {
        let path = data_dir.join("catalog.json");
        if path.exists() {
            let catalog = Self::load_from(&path)?;
            tracing::info!(path = %path.display(), packs = catalog.packs.len(), items = catalog.items.len(), "loaded catalog override");
            Ok(catalog)
        } else {
            Ok(Self::builtin())
        }
    }

    pub fn builtin() -> Self {
        Self {
            currency: "ARS".into(),
            packs: BUILTIN_PACKS.iter().map(BuiltinPack::to_pack).collect(),
            items: BUILTIN_ITEMS.iter().map(BuiltinItem::to_item).collect(),
            boca_price: 12_000.0,
            ambiente_price: 35_000.0,
            minimum_total: 60_000.0,
        }
    }
}

// ─── Built-in dataset ───────────────────────────────────────────

struct BuiltinPack {
    id: &'static str,
    name: &'static str,
    category: PackCategory,
    base_price: f64,
    bocas: u32,
    ambientes: u32,
    description: &'static str,
}

impl BuiltinPack {
    fn to_pack(&self) -> Pack {
        Pack {
            id: self.id.into(),
            name: self.name.into(),
            category: self.category,
            base_price: self.base_price,
            included_bocas: self.bocas,
            included_ambientes: self.ambientes,
            description: self.description.into(),
        }
    }
}

const BUILTIN_PACKS: &[BuiltinPack] = &[
    BuiltinPack {
        id: "starter-residencial", name: "Starter Residencial",
        category: PackCategory::Residential, base_price: 180_000.0, bocas: 10, ambientes: 2,
        description: "Revisión general, recambio de térmica y disyuntor, hasta 10 bocas",
    },
    BuiltinPack {
        id: "hogar-completo", name: "Hogar Completo",
        category: PackCategory::Residential, base_price: 420_000.0, bocas: 25, ambientes: 5,
        description: "Instalación completa de vivienda de hasta 5 ambientes",
    },
    BuiltinPack {
        id: "tablero-express", name: "Tablero Express",
        category: PackCategory::Residential, base_price: 95_000.0, bocas: 0, ambientes: 0,
        description: "Recambio de tablero principal con protecciones",
    },
    BuiltinPack {
        id: "local-comercial", name: "Local Comercial",
        category: PackCategory::Commercial, base_price: 650_000.0, bocas: 30, ambientes: 3,
        description: "Instalación para local u oficina, trifásica opcional",
    },
];

struct BuiltinItem {
    id: &'static str,
    name: &'static str,
    kind: ItemKind,
    unit: &'static str,
    unit_price: f64,
    compatible: &'static [&'static str],
    max_quantity: u32,
}

impl BuiltinItem {
    fn to_item(&self) -> AdditionalItem {
        AdditionalItem {
            id: self.id.into(),
            name: self.name.into(),
            kind: self.kind,
            unit: self.unit.into(),
            unit_price: self.unit_price,
            compatible_packs: self.compatible.iter().map(|s| s.to_string()).collect(),
            max_quantity: self.max_quantity,
        }
    }
}

const BUILTIN_ITEMS: &[BuiltinItem] = &[
    BuiltinItem {
        id: "toma-exterior", name: "Tomacorriente exterior estanco",
        kind: ItemKind::Labor, unit: "unidad", unit_price: 18_000.0, compatible: &[], max_quantity: 20,
    },
    BuiltinItem {
        id: "circuito-aire", name: "Circuito dedicado para aire acondicionado",
        kind: ItemKind::Labor, unit: "circuito", unit_price: 65_000.0,
        compatible: &["starter-residencial", "hogar-completo", "local-comercial"], max_quantity: 6,
    },
    BuiltinItem {
        id: "puesta-a-tierra", name: "Jabalina y puesta a tierra",
        kind: ItemKind::Labor, unit: "unidad", unit_price: 85_000.0, compatible: &[], max_quantity: 2,
    },
    BuiltinItem {
        id: "tablero-seccional", name: "Tablero seccional",
        kind: ItemKind::Labor, unit: "unidad", unit_price: 120_000.0,
        compatible: &["hogar-completo", "local-comercial"], max_quantity: 4,
    },
    BuiltinItem {
        id: "luminaria-led", name: "Luminaria LED instalada",
        kind: ItemKind::Labor, unit: "unidad", unit_price: 9_500.0, compatible: &[], max_quantity: 60,
    },
    BuiltinItem {
        id: "recableado", name: "Recableado",
        kind: ItemKind::Labor, unit: "metro", unit_price: 2_500.0,
        compatible: &["hogar-completo", "local-comercial"], max_quantity: 500,
    },
    BuiltinItem {
        id: "certificado-dci", name: "Certificado DCI",
        kind: ItemKind::Professional, unit: "certificado", unit_price: 120_000.0, compatible: &[], max_quantity: 1,
    },
    BuiltinItem {
        id: "medicion-pat", name: "Protocolo de medición de puesta a tierra",
        kind: ItemKind::Professional, unit: "medición", unit_price: 55_000.0, compatible: &[], max_quantity: 3,
    },
    BuiltinItem {
        id: "plano-electrico", name: "Plano eléctrico firmado",
        kind: ItemKind::Professional, unit: "plano", unit_price: 90_000.0,
        compatible: &["hogar-completo", "local-comercial"], max_quantity: 1,
    },
];
