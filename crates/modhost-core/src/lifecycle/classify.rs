//! Mod id derivation, type inference and the metadata merge used by install.
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::extension_system::hooks::MetadataPatch;
use crate::metadata::filename;
use crate::metadata::remote::RemoteModInfo;
use crate::utils::fs::find_files_named;

/// Files whose presence marks an archive as a mod loader
pub const LOADER_FILES: [&str; 4] =
    ["dinput8.dll", "winhttp.dll", "version.dll", "doorstop_config.ini"];

pub const TYPE_MOD: &str = "mod";
pub const TYPE_LOADER: &str = "loader";

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Archive file name without its final extension. Directories keep their
/// whole name.
pub fn archive_stem(archive: &Path) -> Option<String> {
    let name = if archive.is_dir() { archive.file_name() } else { archive.file_stem() };
    name.map(|n| n.to_string_lossy().into_owned())
}

/// Mod id for an archive: trimmed stem with whitespace runs replaced by `_`.
///
/// `None` when that leaves nothing usable as a directory name.
pub fn mod_id_from_archive(archive: &Path) -> Option<String> {
    let stem = archive_stem(archive)?;
    let id = WHITESPACE.replace_all(stem.trim(), "_").into_owned();
    is_valid_mod_id(&id).then_some(id)
}

/// Ids become staging directory names: no separators, not empty, not made
/// of dots only
pub fn is_valid_mod_id(id: &str) -> bool {
    !id.is_empty() && !id.chars().all(|c| c == '.') && !id.contains(['/', '\\', ':', '\0'])
}

/// Type tag when no extension classifies the mod
pub fn infer_mod_type(staging: &Path, archive_name: &str) -> String {
    let has_loader_file = match find_files_named(staging, &LOADER_FILES) {
        Ok(found) => !found.is_empty(),
        Err(e) => {
            log::warn!("Failed to scan {} for loader files: {}", staging.display(), e);
            false
        }
    };
    if has_loader_file || archive_name.to_lowercase().contains(TYPE_LOADER) {
        TYPE_LOADER.to_string()
    } else {
        TYPE_MOD.to_string()
    }
}

/// Caller-supplied install settings; set fields override inferred ones
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    pub name: Option<String>,
    pub mod_type: Option<String>,
    pub version: Option<String>,
    pub external_id: Option<String>,
    pub author: Option<String>,
    pub source_url: Option<String>,
    pub domain_hint: Option<String>,
    pub note: Option<String>,
    /// Enable right after staging
    pub auto_enable: bool,
}

impl InstallOptions {
    pub fn to_patch(&self) -> MetadataPatch {
        MetadataPatch {
            mod_type: self.mod_type.clone(),
            name: self.name.clone(),
            external_id: self.external_id.clone(),
            source_url: self.source_url.clone(),
            version: self.version.clone(),
            author: self.author.clone(),
            note: self.note.clone(),
            domain_hint: self.domain_hint.clone(),
        }
    }
}

/// Merged identity of a mod being installed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModIdentity {
    pub fields: MetadataPatch,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl ModIdentity {
    /// Start from what the archive's file name says
    pub fn from_filename(stem: &str) -> Self {
        let parsed = filename::extract(stem);
        Self {
            fields: MetadataPatch {
                name: Some(parsed.display_name),
                external_id: parsed.external_id,
                version: parsed.version,
                ..Default::default()
            },
            description: None,
            image: None,
        }
    }

    /// Overlay a higher-priority source
    pub fn apply(&mut self, patch: MetadataPatch) {
        self.fields.merge(patch);
    }

    /// Overlay remote metadata, the highest-priority source
    pub fn apply_remote(&mut self, info: RemoteModInfo) {
        self.fields.merge(MetadataPatch {
            name: info.name,
            version: info.version,
            author: info.author,
            ..Default::default()
        });
        if info.summary.is_some() {
            self.description = info.summary;
        }
        if info.picture_url.is_some() {
            self.image = info.picture_url;
        }
    }
}
