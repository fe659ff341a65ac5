use crate::metadata::filename::{extract, FilenameMetadata};

fn parsed(name: &str, id: Option<&str>, version: Option<&str>) -> FilenameMetadata {
    FilenameMetadata {
        display_name: name.to_string(),
        external_id: id.map(str::to_string),
        version: version.map(str::to_string),
    }
}

#[test]
fn test_name_id_version() {
    assert_eq!(extract("CoolMod-1108-5"), parsed("CoolMod", Some("1108"), Some("5")));
}

#[test]
fn test_multi_numeric_tail_is_split_at_the_last_pair() {
    // The true id 1108 stays inside the name
    assert_eq!(
        extract("Tobey's BepInEx Pack for Subnautica-1108-5-4-23-pack-3-0-0"),
        parsed("Tobey's BepInEx Pack for Subnautica-1108-5-4-23-pack", Some("3"), Some("0.0"))
    );
}

#[test]
fn test_duplicate_marker_is_stripped() {
    assert_eq!(extract("Mod Name (2)-1108-2"), extract("Mod Name-1108-2"));
    assert_eq!(extract("Mod Name (2)-1108-2"), parsed("Mod Name", Some("1108"), Some("2")));
}

#[test]
fn test_timestamp_suffix_is_stripped() {
    assert_eq!(
        extract("SkipIntro-1256-1-2-1699999999"),
        parsed("SkipIntro", Some("1256"), Some("1.2"))
    );
}

#[test]
fn test_numeric_name_segments_move_into_version() {
    assert_eq!(extract("Mod-12-1-0-3"), parsed("Mod", Some("12"), Some("1.0.3")));
}

#[test]
fn test_non_numeric_version_is_kept() {
    assert_eq!(extract("BetterUI-42-1.4.2b"), parsed("BetterUI", Some("42"), Some("1.4.2b")));
}

#[test]
fn test_empty_version() {
    assert_eq!(extract("Thing-77-"), parsed("Thing", Some("77"), None));
}

#[test]
fn test_shift_limit() {
    // Only five shifts happen, so the first number stays in the name
    assert_eq!(extract("N-1-2-3-4-5-6-7-8"), parsed("N-1", Some("2"), Some("3.4.5.6.7.8")));
}

#[test]
fn test_no_match_falls_back_to_whole_name() {
    assert_eq!(extract("JustAName"), parsed("JustAName", None, None));
    assert_eq!(extract("Name-v2"), parsed("Name-v2", None, None));
}
