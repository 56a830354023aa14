//! Copyright © 2025-2026 The Ki Project Developers. All Rights Reserved.
//!
//! This file is part of Ki.

use std::io::Write;
use std::path::Path;

use serde_json::{json, Value};

use kix::descriptor::KiModuleDescriptor;
use kix::errors::KiError;
use kix::value::KiValue;

fn sample_manifest() -> Value {
    json!({
        "key": "scf",
        "name": "SCF",
        "type": "energy",
        "path": "/opt/ki/modules/scf",
        "soname": "libscf.so",
        "version": "1.2.0",
        "authors": ["A. Author", "B. Author"],
        "description": "Self-consistent field module",
        "refs": ["doi:10.0000/example"],
        "options": {
            "maxiter": ["int", 100, false, "positive", "maximum iterations"],
            "basis": ["string", null, true, null, "basis set name"],
        },
    })
}

#[test]
fn test_manifest_parses_all_fields() {
    let descriptor = KiModuleDescriptor::from_manifest(&sample_manifest()).unwrap();

    assert_eq!(descriptor.key(), "scf");
    assert_eq!(descriptor.name(), "SCF");
    assert_eq!(descriptor.kind(), "energy");
    assert_eq!(descriptor.path(), "/opt/ki/modules/scf");
    assert_eq!(descriptor.soname(), Some("libscf.so"));
    assert_eq!(descriptor.version(), "1.2.0");
    assert_eq!(descriptor.authors().len(), 2);
    assert_eq!(descriptor.description(), "Self-consistent field module");
    assert_eq!(descriptor.references(), &["doi:10.0000/example".to_string()]);
    assert_eq!(descriptor.identity(), "SCF-1.2.0");
    assert_eq!(
        descriptor.library_path().unwrap(),
        Path::new("/opt/ki/modules/scf").join("libscf.so")
    );

    let options = descriptor.options();
    assert_eq!(options.len(), 2);
    assert_eq!(options.value("maxiter").unwrap(), &KiValue::Int(100));
    assert!(options.get("basis").unwrap().required());
}

#[test]
fn test_soname_is_optional() {
    let mut manifest = sample_manifest();
    manifest.as_object_mut().unwrap().remove("soname");

    let descriptor = KiModuleDescriptor::from_manifest(&manifest).unwrap();
    assert_eq!(descriptor.soname(), None);
    assert!(descriptor.library_path().is_none());
}

#[test]
fn test_missing_required_field_names_the_field() {
    for field in [
        "key",
        "name",
        "type",
        "path",
        "version",
        "authors",
        "description",
        "refs",
        "options",
    ] {
        let mut manifest = sample_manifest();
        manifest.as_object_mut().unwrap().remove(field);

        let err = KiModuleDescriptor::from_manifest(&manifest).unwrap_err();
        match err {
            KiError::Registry { key, message } => {
                assert_eq!(key, field);
                assert!(message.contains(field));
                assert!(message.contains("KiModuleDescriptor"));
            }
            other => panic!("unexpected error for '{}': {:?}", field, other),
        }
    }
}

#[test]
fn test_non_object_manifest_is_rejected() {
    assert!(KiModuleDescriptor::from_manifest(&json!([1, 2, 3])).is_err());
    assert!(KiModuleDescriptor::from_manifest(&json!("scf")).is_err());
}

#[test]
fn test_author_list_must_hold_strings() {
    let mut manifest = sample_manifest();
    manifest["authors"] = json!(["A. Author", 7]);
    assert!(matches!(
        KiModuleDescriptor::from_manifest(&manifest),
        Err(KiError::Registry { .. })
    ));
}

#[test]
fn test_bad_option_block_propagates() {
    let mut manifest = sample_manifest();
    manifest["options"] = json!({"maxiter": ["int", 100, false]});
    assert!(matches!(
        KiModuleDescriptor::from_manifest(&manifest),
        Err(KiError::Option { .. })
    ));
}

#[test]
fn test_load_manifest_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("module.json");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(sample_manifest().to_string().as_bytes()).unwrap();

    let descriptor = KiModuleDescriptor::load_manifest(&path).unwrap();
    assert_eq!(descriptor.key(), "scf");
}

#[test]
fn test_load_manifest_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = KiModuleDescriptor::load_manifest(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, KiError::Io(_)));
}

#[test]
fn test_load_manifest_malformed_json_is_serde_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = KiModuleDescriptor::load_manifest(&path).unwrap_err();
    assert!(matches!(err, KiError::Serde(_)));
}
