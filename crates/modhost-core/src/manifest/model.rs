use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted state of one managed game
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameManifest {
    pub managed: bool,
    pub mods: Vec<Mod>,
}

impl GameManifest {
    pub fn find(&self, mod_id: &str) -> Option<&Mod> {
        self.mods.iter().find(|m| m.id == mod_id)
    }

    pub fn find_mut(&mut self, mod_id: &str) -> Option<&mut Mod> {
        self.mods.iter_mut().find(|m| m.id == mod_id)
    }

    /// Replace the entry with the same id in place, or append
    pub fn upsert(&mut self, entry: Mod) {
        match self.find_mut(&entry.id) {
            Some(existing) => *existing = entry,
            None => self.mods.push(entry),
        }
    }

    pub fn remove(&mut self, mod_id: &str) -> Option<Mod> {
        let index = self.mods.iter().position(|m| m.id == mod_id)?;
        Some(self.mods.remove(index))
    }

    /// Ids of enabled mods, in manifest order
    pub fn enabled_ids(&self) -> Vec<String> {
        self.mods.iter().filter(|m| m.enabled).map(|m| m.id.clone()).collect()
    }
}

/// One installed mod and the exact files its installation created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mod {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "Utc::now")]
    pub installed_at: DateTime<Utc>,
    #[serde(rename = "type", default = "default_mod_type")]
    pub mod_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Created entries in creation order; the only record used to undo
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

fn default_mod_type() -> String {
    "mod".to_string()
}

impl Mod {
    /// A freshly staged, disabled entry
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            author: None,
            description: None,
            image: None,
            enabled: false,
            installed_at: Utc::now(),
            mod_type: default_mod_type(),
            version: None,
            external_id: None,
            source_url: None,
            domain_hint: None,
            note: None,
            files: Vec::new(),
        }
    }
}
