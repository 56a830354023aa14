//! Copyright © 2025-2026 The Ki Project Developers. All Rights Reserved.
//!
//! This file is part of Ki.

use serde_json::json;

use kix::errors::KiError;
use kix::options::{KiNamedValidator, KiOption, KiOptionSet};
use kix::value::{KiValue, KiValueTag};

fn int_option(key: &str, default: i64) -> KiOption {
    KiOption::new(key, false, None, "test option", Some(KiValue::Int(default))).unwrap()
}

#[test]
fn test_required_with_default_is_rejected() {
    let err = KiOption::new(
        "iterations",
        true,
        None,
        "max iterations",
        Some(KiValue::Int(100)),
    )
    .unwrap_err();
    assert!(matches!(err, KiError::Option { .. }));
}

#[test]
fn test_default_failing_validator_is_rejected() {
    let err = KiOption::new(
        "threshold",
        false,
        Some(KiNamedValidator::positive()),
        "convergence threshold",
        Some(KiValue::Float(-1.0)),
    )
    .unwrap_err();
    assert!(matches!(err, KiError::Option { .. }));
}

#[test]
fn test_get_prefers_current_over_default() {
    let mut option = int_option("maxiter", 100);
    assert_eq!(option.get().unwrap(), &KiValue::Int(100));

    option.change(KiValue::Int(50), false).unwrap();
    assert_eq!(option.get().unwrap(), &KiValue::Int(50));

    option.reset_to_default();
    assert_eq!(option.get().unwrap(), &KiValue::Int(100));
}

#[test]
fn test_get_without_value_or_default_fails() {
    let option = KiOption::new("basis", true, None, "basis set name", None).unwrap();
    assert!(!option.has_value());
    assert!(matches!(option.get(), Err(KiError::Option { .. })));
}

#[test]
fn test_declared_tag_rejects_wrong_type() {
    let mut option = int_option("maxiter", 100)
        .with_tag(KiValueTag::Int)
        .unwrap();
    let err = option.change(KiValue::Str("many".into()), false).unwrap_err();
    assert!(matches!(err, KiError::Option { .. }));
    // The slot is untouched by the failed change.
    assert_eq!(option.get().unwrap(), &KiValue::Int(100));
}

#[test]
fn test_declared_tag_must_match_default() {
    let err = int_option("maxiter", 100).with_tag(KiValueTag::Float).unwrap_err();
    assert!(matches!(err, KiError::Option { .. }));
}

#[test]
fn test_validator_rejects_in_normal_mode() {
    let mut option = KiOption::new(
        "maxiter",
        false,
        Some(KiNamedValidator::positive()),
        "max iterations",
        Some(KiValue::Int(100)),
    )
    .unwrap();

    let err = option.change(KiValue::Int(0), false).unwrap_err();
    assert!(matches!(err, KiError::Option { .. }));
    assert_eq!(option.get().unwrap(), &KiValue::Int(100));
}

#[test]
fn test_expert_mode_applies_invalid_value() {
    let mut option = KiOption::new(
        "maxiter",
        false,
        Some(KiNamedValidator::positive()),
        "max iterations",
        Some(KiValue::Int(100)),
    )
    .unwrap();

    // Expert mode downgrades the validator failure to a warning.
    option.change(KiValue::Int(-5), true).unwrap();
    assert_eq!(option.get().unwrap(), &KiValue::Int(-5));

    // Type mismatches stay hard errors even for experts.
    let mut pinned = int_option("maxiter", 100).with_tag(KiValueTag::Int).unwrap();
    assert!(pinned.change(KiValue::Bool(true), true).is_err());
}

#[test]
fn test_is_default_uses_exact_float_equality() {
    let mut option = KiOption::new(
        "threshold",
        false,
        None,
        "convergence threshold",
        Some(KiValue::Float(1e-6)),
    )
    .unwrap();
    assert!(option.is_default());

    option.change(KiValue::Float(1e-6), false).unwrap();
    assert!(option.is_default());

    // One ulp away is not the default.
    option.change(KiValue::Float(1e-6 + f64::EPSILON), false).unwrap();
    assert!(!option.is_default());
}

#[test]
fn test_builtin_validators() {
    assert!((KiNamedValidator::non_negative().check)(&KiValue::Int(0)).is_ok());
    assert!((KiNamedValidator::non_negative().check)(&KiValue::Float(-0.5)).is_err());
    assert!((KiNamedValidator::non_negative().check)(&KiValue::Str("x".into())).is_err());

    assert!((KiNamedValidator::positive().check)(&KiValue::Float(0.5)).is_ok());
    assert!((KiNamedValidator::positive().check)(&KiValue::Int(0)).is_err());

    assert!((KiNamedValidator::non_empty().check)(&KiValue::Str("a".into())).is_ok());
    assert!((KiNamedValidator::non_empty().check)(&KiValue::StrList(Vec::new())).is_err());
    assert!((KiNamedValidator::non_empty().check)(&KiValue::Int(1)).is_err());

    assert!(KiNamedValidator::by_name("positive").is_ok());
    assert!(KiNamedValidator::by_name("prime").is_err());
}

#[test]
fn test_set_lookup_is_case_insensitive() {
    let mut set = KiOptionSet::new();
    set.add(int_option("MaxIter", 100)).unwrap();

    assert!(set.contains("maxiter"));
    assert!(set.contains("MAXITER"));
    assert_eq!(set.value("mAxItEr").unwrap(), &KiValue::Int(100));

    // Display casing is preserved.
    assert_eq!(set.keys(), vec!["MaxIter"]);

    // Differently cased duplicates collide.
    let err = set.add(int_option("MAXITER", 1)).unwrap_err();
    assert!(matches!(err, KiError::Option { .. }));
    assert_eq!(set.len(), 1);
}

#[test]
fn test_set_preserves_insertion_order() {
    let mut set = KiOptionSet::new();
    set.add(int_option("zeta", 1)).unwrap();
    set.add(int_option("alpha", 2)).unwrap();
    set.add(int_option("mu", 3)).unwrap();
    assert_eq!(set.keys(), vec!["zeta", "alpha", "mu"]);
}

#[test]
fn test_set_change_and_reset() {
    let mut set = KiOptionSet::new();
    set.add(int_option("maxiter", 100)).unwrap();

    set.change("MAXITER", KiValue::Int(25)).unwrap();
    assert_eq!(set.value("maxiter").unwrap(), &KiValue::Int(25));

    set.reset_to_default("maxiter").unwrap();
    assert_eq!(set.value("maxiter").unwrap(), &KiValue::Int(100));

    assert!(matches!(
        set.change("unknown", KiValue::Int(1)),
        Err(KiError::Option { .. })
    ));
}

#[test]
fn test_all_required_satisfied() {
    let mut set = KiOptionSet::new();
    set.add(int_option("maxiter", 100)).unwrap();
    set.add(KiOption::new("basis", true, None, "basis set name", None).unwrap())
        .unwrap();

    assert!(!set.all_required_satisfied());
    set.change("basis", KiValue::Str("sto-3g".into())).unwrap();
    assert!(set.all_required_satisfied());
}

#[test]
fn test_enforce_valid_aggregates_findings() {
    let mut set = KiOptionSet::new();
    set.add(KiOption::new("basis", true, None, "basis set name", None).unwrap())
        .unwrap();
    set.add(
        KiOption::new(
            "maxiter",
            false,
            Some(KiNamedValidator::positive()),
            "max iterations",
            None,
        )
        .unwrap(),
    )
    .unwrap();

    // Expert mode let the invalid value in; validate() still sees it.
    set.set_expert(true);
    set.change("maxiter", KiValue::Int(-1)).unwrap();
    set.set_expert(false);

    let issues = set.validate();
    assert_eq!(issues.len(), 2);
    assert_eq!(issues[0].key, "basis");
    assert_eq!(issues[1].key, "maxiter");

    // Both findings land in one aggregated error.
    let err = set.enforce_valid().unwrap_err();
    let text = err.to_string();
    assert!(text.contains("basis"));
    assert!(text.contains("maxiter"));

    // Expert mode accepts the same set.
    set.set_expert(true);
    assert!(set.enforce_valid().is_ok());
}

#[test]
fn test_set_validator_contributes_findings() {
    fn cross_check(set: &KiOptionSet) -> Vec<kix::options::KiOptionIssue> {
        let frozen = set.value("freeze_core").and_then(KiValue::as_bool).unwrap_or(false);
        let natural = set.value("natural_orbitals").and_then(KiValue::as_bool).unwrap_or(false);
        if frozen && natural {
            vec![kix::options::KiOptionIssue {
                key: "freeze_core".to_string(),
                message: "cannot combine frozen core with natural orbitals".to_string(),
            }]
        } else {
            Vec::new()
        }
    }

    let mut set = KiOptionSet::new();
    set.add(
        KiOption::new("freeze_core", false, None, "freeze core orbitals", Some(KiValue::Bool(false)))
            .unwrap(),
    )
    .unwrap();
    set.add(
        KiOption::new("natural_orbitals", false, None, "use natural orbitals", Some(KiValue::Bool(false)))
            .unwrap(),
    )
    .unwrap();
    set.set_validator(cross_check);

    assert!(set.validate().is_empty());
    set.change("freeze_core", KiValue::Bool(true)).unwrap();
    set.change("natural_orbitals", KiValue::Bool(true)).unwrap();
    assert_eq!(set.validate().len(), 1);
    assert!(set.enforce_valid().is_err());
}

#[test]
fn test_clone_isolates_per_instance_changes() {
    let mut canonical = KiOptionSet::new();
    canonical.add(int_option("maxiter", 100)).unwrap();

    let mut instance = canonical.clone();
    instance.change("maxiter", KiValue::Int(5)).unwrap();

    assert_eq!(instance.value("maxiter").unwrap(), &KiValue::Int(5));
    assert_eq!(canonical.value("maxiter").unwrap(), &KiValue::Int(100));
}

#[test]
fn test_narrowed_reads() {
    let mut set = KiOptionSet::new();
    set.add(int_option("maxiter", 100)).unwrap();
    set.add(
        KiOption::new("threshold", false, None, "threshold", Some(KiValue::Float(0.5))).unwrap(),
    )
    .unwrap();

    assert_eq!(set.get("maxiter").unwrap().get_int_as::<u8>().unwrap(), 100);
    assert_eq!(set.get("threshold").unwrap().get_f32().unwrap(), 0.5_f32);

    set.change("maxiter", KiValue::Int(1000)).unwrap();
    assert!(matches!(
        set.get("maxiter").unwrap().get_int_as::<u8>(),
        Err(KiError::NumericConversion { .. })
    ));
}

#[test]
fn test_external_declaration_round_trip() {
    let external = json!({
        "maxiter": ["int", 100, false, "positive", "maximum iterations"],
        "basis": ["string", null, true, null, "basis set name"],
        "damping": ["list-of-float", [0.2, 0.1], false, "non_empty", "damping schedule"],
    });

    let set = KiOptionSet::from_external(&external).unwrap();
    assert_eq!(set.len(), 3);
    assert_eq!(set.value("maxiter").unwrap(), &KiValue::Int(100));
    assert!(set.get("basis").unwrap().required());
    assert_eq!(set.get("maxiter").unwrap().declared_tag(), Some(KiValueTag::Int));
    assert_eq!(set.get("maxiter").unwrap().validator().unwrap().name, "positive");
    assert_eq!(
        set.value("damping").unwrap(),
        &KiValue::FloatList(vec![0.2, 0.1])
    );

    // Declarations survive a round-trip; current values are not part of it.
    let mut mutated = set.clone();
    mutated.change("maxiter", KiValue::Int(7)).unwrap();
    assert_eq!(mutated.to_external(), set.to_external());

    let reparsed = KiOptionSet::from_external(&set.to_external()).unwrap();
    assert_eq!(reparsed.to_external(), set.to_external());
}

#[test]
fn test_external_declaration_errors() {
    // Not a 5-tuple.
    assert!(KiOptionSet::from_external(&json!({"a": ["int", 1, false]})).is_err());
    // Unknown type tag.
    assert!(KiOptionSet::from_external(&json!({"a": ["double", 1.0, false, null, "x"]})).is_err());
    // Unknown validator name.
    assert!(KiOptionSet::from_external(&json!({"a": ["int", 1, false, "prime", "x"]})).is_err());
    // Default of the wrong declared type.
    assert!(KiOptionSet::from_external(&json!({"a": ["int", "one", false, null, "x"]})).is_err());
    // Required option with a default.
    assert!(KiOptionSet::from_external(&json!({"a": ["int", 1, true, null, "x"]})).is_err());
    // Not an object at the top.
    assert!(KiOptionSet::from_external(&json!(["int", 1, false, null, "x"])).is_err());
}
