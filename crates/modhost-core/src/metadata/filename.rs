//! Best-effort recovery of name, external id and version from an archive
//! file name such as `CoolMod-1108-5`.
//!
//! The split is deliberately shallow: only purely numeric trailing segments
//! are pulled off the name, at most [`MAX_ID_SHIFTS`] times. File names with
//! several numeric groups after the real id are split at the wrong place;
//! that output is the documented behavior and callers rely on it.
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Upper bound on how many times a trailing number moves from the name into
/// the id
pub const MAX_ID_SHIFTS: usize = 5;

static DUPLICATE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" \(\d+\)").expect("valid regex"));
static TIMESTAMP_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-\d{9,}$").expect("valid regex"));
static NAME_ID_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)-(\d+)-(.*)$").expect("valid regex"));
static TRAILING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)-(\d+)$").expect("valid regex"));
static DASHED_NUMBERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(-\d+)*$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilenameMetadata {
    pub display_name: String,
    pub external_id: Option<String>,
    pub version: Option<String>,
}

/// Parse `filename` (without its archive extension)
pub fn extract(filename: &str) -> FilenameMetadata {
    let cleaned = DUPLICATE_MARKER.replacen(filename, 1, "");
    let cleaned = TIMESTAMP_SUFFIX.replace(&cleaned, "");

    let Some(captures) = NAME_ID_VERSION.captures(&cleaned) else {
        return FilenameMetadata {
            display_name: filename.to_string(),
            external_id: None,
            version: None,
        };
    };

    let mut name = captures[1].to_string();
    let mut id = captures[2].to_string();
    let mut version = captures[3].to_string();

    for _ in 0..MAX_ID_SHIFTS {
        let Some(trailing) = TRAILING_NUMBER.captures(&name) else {
            break;
        };
        version = format!("{}-{}", id, version);
        id = trailing[2].to_string();
        name = trailing[1].to_string();
    }

    if DASHED_NUMBERS.is_match(&version) {
        version = version.replace('-', ".");
    }

    FilenameMetadata {
        display_name: name,
        external_id: Some(id),
        version: if version.is_empty() { None } else { Some(version) },
    }
}
