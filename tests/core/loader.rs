//! Copyright © 2025-2026 The Ki Project Developers. All Rights Reserved.
//!
//! This file is part of Ki.

use std::any::Any;
use std::io::Write;
use std::sync::Arc;

use kix::descriptor::KiModuleDescriptor;
use kix::errors::{KiError, Result};
use kix::loader::{KiNativeLoader, KiScriptCallable, KI_SCRIPT_FACTORY_ARITY};
use kix::module::KiModule;
use kix::options::KiOptionSet;
use kix::registry::KiModuleRegistry;
use kix::value::KiValue;

#[derive(Debug)]
struct EchoModule {
    name: String,
}

impl KiModule for EchoModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn native_descriptor(key: &str, path: &str, soname: Option<&str>) -> KiModuleDescriptor {
    KiModuleDescriptor::new(
        key,
        key.to_ascii_uppercase(),
        "native",
        path,
        soname.map(str::to_string),
        "1.0.0",
        vec!["Test Author".to_string()],
        "test module",
        Vec::new(),
        KiOptionSet::new(),
    )
}

#[test]
fn test_resolve_missing_library_is_module_load_error() {
    let mut loader = KiNativeLoader::new();
    let path = std::path::Path::new("/nonexistent/libghost.so");

    let err = loader.resolve(path).unwrap_err();
    match err {
        KiError::ModuleLoad { path: reported, message } => {
            assert!(reported.contains("libghost.so"));
            assert!(message.contains("cannot open library"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!loader.is_open(path));
    assert_eq!(loader.open_count(), 0);
}

#[test]
fn test_resolve_garbage_file_is_module_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("libgarbage.so");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(b"this is not an ELF shared object").unwrap();

    let mut loader = KiNativeLoader::new();
    let err = loader.resolve(&path).unwrap_err();
    assert!(matches!(err, KiError::ModuleLoad { .. }));
    assert!(err.to_string().contains("libgarbage.so"));
    assert!(!loader.is_open(&path));
}

#[test]
fn test_broken_native_module_registers_but_fails_on_create() {
    // Factory resolution is lazy: a descriptor pointing at a corrupt shared
    // object registers without complaint and fails on the first create.
    let dir = tempfile::tempdir().unwrap();
    let so_path = dir.path().join("libmp2.so");
    std::fs::write(&so_path, b"garbage bytes").unwrap();

    let mut registry = KiModuleRegistry::new();
    registry
        .register(native_descriptor(
            "mp2",
            dir.path().to_str().unwrap(),
            Some("libmp2.so"),
        ))
        .unwrap();
    assert!(registry.contains("mp2"));

    let err = registry.create("mp2", None).unwrap_err();
    match err {
        KiError::ModuleLoad { path, .. } => assert!(path.contains("libmp2.so")),
        other => panic!("unexpected error: {:?}", other),
    }

    // The registration itself survives the failed create.
    assert!(registry.contains("mp2"));
    assert_eq!(registry.instances().live_count(), 0);
}

#[test]
fn test_native_module_without_soname_fails_on_create() {
    let mut registry = KiModuleRegistry::new();
    registry
        .register(native_descriptor("mp2", "/opt/ki/modules/mp2", None))
        .unwrap();

    let err = registry.create("mp2", None).unwrap_err();
    match err {
        KiError::ModuleLoad { message, .. } => {
            assert!(message.contains("no shared-object name"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_script_callable_arity_contract() {
    let good = KiScriptCallable::new(KI_SCRIPT_FACTORY_ARITY, |args| {
        Ok(Box::new(EchoModule {
            name: args.name.to_string(),
        }) as Box<dyn KiModule>)
    });
    assert_eq!(good.arity(), 4);
    good.verify("scf").unwrap();

    let bad = KiScriptCallable::new(2, |args| {
        Ok(Box::new(EchoModule {
            name: args.name.to_string(),
        }) as Box<dyn KiModule>)
    });
    let err = bad.verify("scf").unwrap_err();
    match err {
        KiError::ModuleLoad { path, message } => {
            assert_eq!(path, "script:scf");
            assert!(message.contains("4"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_wrong_arity_callable_is_rejected_at_registration() {
    let mut registry = KiModuleRegistry::new();
    let callable = KiScriptCallable::new(3, |args| {
        Ok(Box::new(EchoModule {
            name: args.name.to_string(),
        }) as Box<dyn KiModule>)
    });

    let descriptor = KiModuleDescriptor::new(
        "pyscf",
        "PySCF",
        "script",
        "/opt/ki/modules/pyscf",
        None,
        "1.0.0",
        Vec::new(),
        "script module",
        Vec::new(),
        KiOptionSet::new(),
    );

    let err = registry.register_script(descriptor, callable).unwrap_err();
    assert!(matches!(err, KiError::ModuleLoad { .. }));
    // Nothing was stored.
    assert!(!registry.contains("pyscf"));
}

#[test]
fn test_script_factory_receives_creation_arguments() {
    let mut registry = KiModuleRegistry::new();
    let callable = KiScriptCallable::new(4, |args| {
        // The factory sees the shared cache before the first member call.
        args.cache
            .lock()
            .unwrap()
            .insert("created_by", KiValue::Str(args.name.to_string()));
        assert_eq!(args.descriptor.kind(), "script");
        Ok(Box::new(EchoModule {
            name: format!("{}#{}", args.name, args.id),
        }) as Box<dyn KiModule>)
    });

    let descriptor = KiModuleDescriptor::new(
        "pyscf",
        "PySCF",
        "script",
        "/opt/ki/modules/pyscf",
        None,
        "1.0.0",
        Vec::new(),
        "script module",
        Vec::new(),
        KiOptionSet::new(),
    );
    registry.register_script(descriptor, callable).unwrap();

    let handle = registry.create("pyscf", None).unwrap();
    let reported = handle.with_module(|module| module.name().to_string()).unwrap();
    assert_eq!(reported, format!("PySCF#{}", handle.id()));
    assert_eq!(
        handle.cache().lock().unwrap().get("created_by"),
        Some(&KiValue::Str("PySCF".to_string()))
    );
    handle.destroy().unwrap();
}

#[test]
fn test_failing_script_factory_is_module_create_error() {
    let mut registry = KiModuleRegistry::new();
    let callable = KiScriptCallable::new(4, |_args| {
        Err(KiError::conversion("interpreter is not available"))
    });

    let descriptor = KiModuleDescriptor::new(
        "pyscf",
        "PySCF",
        "script",
        "/opt/ki/modules/pyscf",
        None,
        "1.0.0",
        Vec::new(),
        "script module",
        Vec::new(),
        KiOptionSet::new(),
    );
    registry.register_script(descriptor, callable).unwrap();

    let err = registry.create("pyscf", None).unwrap_err();
    match err {
        KiError::ModuleCreate { module, message, .. } => {
            assert_eq!(module, "PySCF");
            assert!(message.contains("interpreter is not available"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(registry.instances().live_count(), 0);
}

#[test]
fn test_cloned_callable_shares_one_factory() {
    let callable = KiScriptCallable::new(4, |args| {
        Ok(Box::new(EchoModule {
            name: args.name.to_string(),
        }) as Box<dyn KiModule>)
    });
    let clone = callable.clone();
    assert_eq!(clone.arity(), callable.arity());

    let mut registry = KiModuleRegistry::new();
    registry
        .register_script(
            KiModuleDescriptor::new(
                "a",
                "A",
                "script",
                "/opt/ki/modules/a",
                None,
                "1.0.0",
                Vec::new(),
                "module a",
                Vec::new(),
                KiOptionSet::new(),
            ),
            callable,
        )
        .unwrap();
    registry
        .register_script(
            KiModuleDescriptor::new(
                "b",
                "B",
                "script",
                "/opt/ki/modules/b",
                None,
                "1.0.0",
                Vec::new(),
                "module b",
                Vec::new(),
                KiOptionSet::new(),
            ),
            clone,
        )
        .unwrap();

    let a = registry.create("a", None).unwrap();
    let b = registry.create("b", None).unwrap();
    assert_eq!(a.with_module(|m| m.name().to_string()).unwrap(), "A");
    assert_eq!(b.with_module(|m| m.name().to_string()).unwrap(), "B");

    // Different identities get different caches even with a shared factory.
    assert!(!Arc::ptr_eq(a.cache(), b.cache()));

    a.destroy().unwrap();
    b.destroy().unwrap();
}
