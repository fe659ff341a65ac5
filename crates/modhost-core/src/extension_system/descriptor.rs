use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::extension_system::hooks::Hook;

/// A link the user can follow to obtain mods for a game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModSource {
    pub text: String,
    pub url: String,
}

/// Static description of a loaded extension.
///
/// Immutable once loaded; a reload replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionDescriptor {
    pub id: String,
    pub name: String,
    pub author: Option<String>,
    pub version: Option<String>,
    pub steam_app_id: Option<String>,
    pub executable: Option<String>,
    pub mod_file_extensions: Vec<String>,
    pub mod_sources: Vec<ModSource>,
    /// Opaque presentation hints, passed through untouched
    pub theme: Option<serde_json::Value>,
    #[serde(skip)]
    pub hooks: Vec<Hook>,
    pub location: PathBuf,
}

impl ExtensionDescriptor {
    pub fn implements(&self, hook: &Hook) -> bool {
        self.hooks.contains(hook)
    }

    /// Names of implemented hooks, for display
    pub fn hook_names(&self) -> Vec<String> {
        self.hooks.iter().map(|h| h.name().to_string()).collect()
    }
}

/// Builder for [`ExtensionDescriptor`]
pub struct DescriptorBuilder {
    descriptor: ExtensionDescriptor,
}

impl DescriptorBuilder {
    /// Start a descriptor; the display name defaults to the id
    pub fn new(id: &str, location: &Path) -> Self {
        Self {
            descriptor: ExtensionDescriptor {
                id: id.to_string(),
                name: id.to_string(),
                author: None,
                version: None,
                steam_app_id: None,
                executable: None,
                mod_file_extensions: Vec::new(),
                mod_sources: Vec::new(),
                theme: None,
                hooks: Vec::new(),
                location: location.to_path_buf(),
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.descriptor.name = name.to_string();
        self
    }

    pub fn author(mut self, author: &str) -> Self {
        self.descriptor.author = Some(author.to_string());
        self
    }

    pub fn version(mut self, version: &str) -> Self {
        self.descriptor.version = Some(version.to_string());
        self
    }

    pub fn steam_app_id(mut self, id: &str) -> Self {
        self.descriptor.steam_app_id = Some(id.to_string());
        self
    }

    pub fn executable(mut self, executable: &str) -> Self {
        self.descriptor.executable = Some(executable.to_string());
        self
    }

    pub fn mod_file_extension(mut self, extension: &str) -> Self {
        self.descriptor.mod_file_extensions.push(extension.to_string());
        self
    }

    pub fn mod_source(mut self, text: &str, url: &str) -> Self {
        self.descriptor.mod_sources.push(ModSource {
            text: text.to_string(),
            url: url.to_string(),
        });
        self
    }

    pub fn theme(mut self, theme: serde_json::Value) -> Self {
        self.descriptor.theme = Some(theme);
        self
    }

    pub fn hooks(mut self, hooks: Vec<Hook>) -> Self {
        self.descriptor.hooks = hooks;
        self
    }

    pub fn build(self) -> ExtensionDescriptor {
        self.descriptor
    }
}
