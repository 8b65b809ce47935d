//! Barcode to product mesh lookup.
//!
//! The fixture is a flat JSON object, `{"<barcode>": "<mesh path>", ...}`,
//! loaded once at startup.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::service::KnowledgeError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct BarcodeMeshMap {
    meshes: HashMap<String, String>,
}

impl BarcodeMeshMap {
    pub fn load(path: &Path) -> Result<Self, KnowledgeError> {
        let raw = fs::read_to_string(path)?;
        let map = Self::from_json_str(&raw)?;
        info!(path = %path.display(), entries = map.len(), "barcode mesh map loaded");
        Ok(map)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, KnowledgeError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Mesh for `barcode`, if the product is known.
    pub fn mesh_for(&self, barcode: &str) -> Option<&str> {
        self.meshes.get(barcode).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}
