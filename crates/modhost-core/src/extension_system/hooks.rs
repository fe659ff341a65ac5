//! Hook names, the optional-hook table and the typed shapes of hook results.
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::extension_system::capability::Capabilities;
use crate::extension_system::descriptor::ExtensionDescriptor;
use crate::extension_system::error::ExtensionResult;

/// One named, optionally implemented extension operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Hook {
    Detect,
    CheckRequirements,
    DetermineModType,
    AnalyzeArchive,
    PrepareForModding,
    Install,
    CheckUpdate,
    GetToolButtons,
    OnUnmanage,
    /// A tool-specific action named by the extension
    Custom(String),
}

impl Hook {
    /// Every hook the host knows by name
    pub const RECOGNIZED: [Hook; 9] = [
        Hook::Detect,
        Hook::CheckRequirements,
        Hook::DetermineModType,
        Hook::AnalyzeArchive,
        Hook::PrepareForModding,
        Hook::Install,
        Hook::CheckUpdate,
        Hook::GetToolButtons,
        Hook::OnUnmanage,
    ];

    /// The name extensions use for this hook
    pub fn name(&self) -> &str {
        match self {
            Hook::Detect => "detect",
            Hook::CheckRequirements => "checkRequirements",
            Hook::DetermineModType => "determineModType",
            Hook::AnalyzeArchive => "analyzeArchive",
            Hook::PrepareForModding => "prepareForModding",
            Hook::Install => "install",
            Hook::CheckUpdate => "checkUpdate",
            Hook::GetToolButtons => "getToolButtons",
            Hook::OnUnmanage => "onUnmanage",
            Hook::Custom(name) => name,
        }
    }

    /// Map a name to a recognized hook, anything else is a custom action
    pub fn from_name(name: &str) -> Hook {
        Self::RECOGNIZED
            .iter()
            .find(|hook| hook.name() == name)
            .cloned()
            .unwrap_or_else(|| Hook::Custom(name.to_string()))
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Hook::Custom(_))
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A loaded extension, whatever runtime backs it
#[async_trait]
pub trait Extension: Send + Sync {
    fn descriptor(&self) -> &ExtensionDescriptor;

    fn id(&self) -> &str {
        &self.descriptor().id
    }

    fn implements(&self, hook: &Hook) -> bool {
        self.descriptor().implements(hook)
    }

    /// Run `hook` with `caps` as the only host access.
    ///
    /// Resolves to `Ok(None)` when the hook is not implemented or returns
    /// nothing.
    async fn call(
        &self,
        hook: &Hook,
        caps: Arc<Capabilities>,
        args: Vec<Value>,
    ) -> ExtensionResult<Option<Value>>;
}

/// One slot per recognized hook plus named custom actions.
///
/// `F` is whatever the runtime stores per hook: a Lua registry key, a native
/// closure.
#[derive(Debug, Clone)]
pub struct HookTable<F> {
    pub detect: Option<F>,
    pub check_requirements: Option<F>,
    pub determine_mod_type: Option<F>,
    pub analyze_archive: Option<F>,
    pub prepare_for_modding: Option<F>,
    pub install: Option<F>,
    pub check_update: Option<F>,
    pub get_tool_buttons: Option<F>,
    pub on_unmanage: Option<F>,
    pub custom: BTreeMap<String, F>,
}

impl<F> Default for HookTable<F> {
    fn default() -> Self {
        Self {
            detect: None,
            check_requirements: None,
            determine_mod_type: None,
            analyze_archive: None,
            prepare_for_modding: None,
            install: None,
            check_update: None,
            get_tool_buttons: None,
            on_unmanage: None,
            custom: BTreeMap::new(),
        }
    }
}

impl<F> HookTable<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, hook: &Hook) -> Option<&F> {
        match hook {
            Hook::Detect => self.detect.as_ref(),
            Hook::CheckRequirements => self.check_requirements.as_ref(),
            Hook::DetermineModType => self.determine_mod_type.as_ref(),
            Hook::AnalyzeArchive => self.analyze_archive.as_ref(),
            Hook::PrepareForModding => self.prepare_for_modding.as_ref(),
            Hook::Install => self.install.as_ref(),
            Hook::CheckUpdate => self.check_update.as_ref(),
            Hook::GetToolButtons => self.get_tool_buttons.as_ref(),
            Hook::OnUnmanage => self.on_unmanage.as_ref(),
            Hook::Custom(name) => self.custom.get(name),
        }
    }

    /// Fill the slot for `hook`, replacing any previous entry
    pub fn insert(&mut self, hook: Hook, f: F) {
        let slot = match hook {
            Hook::Detect => &mut self.detect,
            Hook::CheckRequirements => &mut self.check_requirements,
            Hook::DetermineModType => &mut self.determine_mod_type,
            Hook::AnalyzeArchive => &mut self.analyze_archive,
            Hook::PrepareForModding => &mut self.prepare_for_modding,
            Hook::Install => &mut self.install,
            Hook::CheckUpdate => &mut self.check_update,
            Hook::GetToolButtons => &mut self.get_tool_buttons,
            Hook::OnUnmanage => &mut self.on_unmanage,
            Hook::Custom(name) => {
                self.custom.insert(name, f);
                return;
            }
        };
        *slot = Some(f);
    }

    pub fn contains(&self, hook: &Hook) -> bool {
        self.get(hook).is_some()
    }

    /// Implemented hooks, recognized ones first then custom actions by name
    pub fn implemented(&self) -> Vec<Hook> {
        Hook::RECOGNIZED
            .iter()
            .filter(|hook| self.contains(hook))
            .cloned()
            .chain(self.custom.keys().map(|name| Hook::Custom(name.clone())))
            .collect()
    }
}

/// Metadata an extension may supply from `determineModType`,
/// `analyzeArchive` or `install`.
///
/// A bare string result is read as the type tag; `true`/`false`/`null`
/// carry nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataPatch {
    pub mod_type: Option<String>,
    pub name: Option<String>,
    pub external_id: Option<String>,
    pub source_url: Option<String>,
    pub version: Option<String>,
    pub author: Option<String>,
    pub note: Option<String>,
    pub domain_hint: Option<String>,
}

impl MetadataPatch {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) if !s.is_empty() => MetadataPatch {
                mod_type: Some(s.clone()),
                ..Default::default()
            },
            Value::Object(map) => {
                let field = |key: &str| map.get(key).and_then(scalar_string);
                MetadataPatch {
                    mod_type: field("type"),
                    name: field("name"),
                    external_id: field("externalId"),
                    source_url: field("sourceUrl"),
                    version: field("version"),
                    author: field("author"),
                    note: field("note"),
                    domain_hint: field("domainHint"),
                }
            }
            _ => MetadataPatch::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == MetadataPatch::default()
    }

    /// Overlay `other` on top of `self`; fields `other` sets win
    pub fn merge(&mut self, other: MetadataPatch) {
        fn take(slot: &mut Option<String>, value: Option<String>) {
            if value.is_some() {
                *slot = value;
            }
        }
        take(&mut self.mod_type, other.mod_type);
        take(&mut self.name, other.name);
        take(&mut self.external_id, other.external_id);
        take(&mut self.source_url, other.source_url);
        take(&mut self.version, other.version);
        take(&mut self.author, other.author);
        take(&mut self.note, other.note);
        take(&mut self.domain_hint, other.domain_hint);
    }
}

/// Strings and numbers both read as text; empty strings read as absent
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequirementLink {
    pub text: String,
    pub url: String,
}

/// Result of `checkRequirements`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RequirementsReport {
    pub valid: bool,
    pub message: Option<String>,
    pub link: Option<String>,
    pub link_text: Option<String>,
    pub links: Vec<RequirementLink>,
}

/// Result of `checkUpdate`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateInfo {
    pub supported: Option<bool>,
    pub update_available: Option<bool>,
    pub latest_version: Option<String>,
    pub download_url: Option<String>,
    pub error: Option<String>,
}

/// One entry of `getToolButtons`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolButton {
    pub label: String,
    pub action: String,
}
