use std::fs;
use std::path::Path;

use tempfile::tempdir;

use crate::extension_system::hooks::MetadataPatch;
use crate::lifecycle::classify::{
    infer_mod_type, is_valid_mod_id, mod_id_from_archive, InstallOptions, ModIdentity,
};
use crate::metadata::remote::RemoteModInfo;

#[test]
fn test_mod_id_from_archive_name() {
    assert_eq!(
        mod_id_from_archive(Path::new("/dl/CoolMod-1108-5.zip")).as_deref(),
        Some("CoolMod-1108-5")
    );
    assert_eq!(mod_id_from_archive(Path::new("/dl/ Big   Pack .zip")).as_deref(), Some("Big_Pack"));
    assert_eq!(mod_id_from_archive(Path::new("/dl/pack.tar.gz")).as_deref(), Some("pack.tar"));
    assert_eq!(mod_id_from_archive(Path::new("/dl/   .zip")), None);
    assert_eq!(mod_id_from_archive(Path::new("/dl/...zip")), None);
    assert_eq!(mod_id_from_archive(Path::new("/dl/..zip")), None);
}

#[test]
fn test_mod_ids_must_be_plain_names() {
    assert!(is_valid_mod_id("CoolMod-1108-5"));
    assert!(is_valid_mod_id("v1.2..3"));
    for bad in ["", ".", "..", "...", "a/b", "a\\b", "C:", "nul\0"] {
        assert!(!is_valid_mod_id(bad), "{:?}", bad);
    }
}

#[test]
fn test_infer_mod_type() {
    let temp_dir = tempdir().unwrap();
    let staging = temp_dir.path();
    fs::write(staging.join("readme.txt"), "").unwrap();
    assert_eq!(infer_mod_type(staging, "Plain"), "mod");
    assert_eq!(infer_mod_type(staging, "BepInEx-Loader"), "loader");

    fs::create_dir_all(staging.join("nested")).unwrap();
    fs::write(staging.join("nested/WinHttp.DLL"), "").unwrap();
    assert_eq!(infer_mod_type(staging, "Plain"), "loader");
}

#[test]
fn test_identity_layers() {
    let mut identity = ModIdentity::from_filename("CoolMod-1108-5");
    assert_eq!(identity.fields.name.as_deref(), Some("CoolMod"));

    identity.apply(MetadataPatch { version: Some("6".into()), ..Default::default() });
    let options = InstallOptions { name: Some("Renamed".into()), ..Default::default() };
    identity.apply(options.to_patch());
    assert_eq!(identity.fields.name.as_deref(), Some("Renamed"));
    assert_eq!(identity.fields.version.as_deref(), Some("6"));
    assert_eq!(identity.fields.external_id.as_deref(), Some("1108"));

    identity.apply_remote(RemoteModInfo {
        version: Some("7".into()),
        picture_url: Some("https://example.com/p.png".into()),
        ..Default::default()
    });
    assert_eq!(identity.fields.name.as_deref(), Some("Renamed"));
    assert_eq!(identity.fields.version.as_deref(), Some("7"));
    assert_eq!(identity.image.as_deref(), Some("https://example.com/p.png"));
    assert_eq!(identity.description, None);
}
