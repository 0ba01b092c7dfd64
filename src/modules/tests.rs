use super::*;
use crate::types::Type;

use std::collections::BTreeSet;

struct Setup {
    interner: Interner,
    manager: ModuleManager,
}

impl Setup {
    fn new() -> Self {
        Setup {
            interner: Interner::new(),
            manager: ModuleManager::new(),
        }
    }

    fn module(&mut self, name: &str) -> NameId {
        let segment = self.interner.get_id(name);
        mangle::add_module(&mut self.interner, None, segment)
    }

    /// Registers a file `<name>.ash` in module `name` importing `imports`.
    fn file(&mut self, name: &str, imports: &[NameId]) -> (NameId, NameId) {
        let file = self.interner.get_id(&format!("{}.ash", name));
        let module = self.module(name);
        self.manager.add_ast(file, Ast::new());
        self.manager
            .add_module(file, module, imports.iter().copied().collect());
        (file, module)
    }

    fn export(&mut self, module: NameId, function: &str, params: &[Type]) -> NameId {
        let callee = self.interner.get_id(function);
        let mangled = mangle::mangle_call(&mut self.interner, Some(module), callee, params);
        self.manager.add_export(module, mangled);
        mangled
    }
}

#[test]
fn test_add_module_strips_own_module_from_imports() {
    let mut s = Setup::new();
    let a = s.module("a");
    let b = s.module("b");
    let file = s.interner.get_id("a.ash");
    s.manager.add_ast(file, Ast::new());
    s.manager
        .add_module(file, a, BTreeSet::from([a, b]));
    assert!(!s.manager.imports_of(file).contains(&a));
    assert!(s.manager.imports_of(file).contains(&b));
}

#[test]
fn test_check_modules_accepts_known_imports() {
    let mut s = Setup::new();
    let (_, b) = s.file("b", &[]);
    s.file("a", &[b]);
    assert!(s.manager.check_modules(&s.interner).is_ok());
}

#[test]
fn test_check_modules_rejects_unknown_import() {
    let mut s = Setup::new();
    let ghost = s.module("ghost");
    s.file("a", &[ghost]);
    let err = s
        .manager
        .check_modules(&s.interner)
        .expect_err("unknown import should fail");
    match err {
        ModuleError::UnknownImport { module, file } => {
            assert_eq!(module, "ghost");
            assert_eq!(file, "a.ash");
        }
        other => panic!("expected unknown import, got {:?}", other),
    }
}

#[test]
fn test_build_order_dependencies_first() {
    let mut s = Setup::new();
    let (file_c, c) = s.file("c", &[]);
    let (file_b, b) = s.file("b", &[c]);
    let (file_a, _) = s.file("a", &[b, c]);

    let order = s
        .manager
        .get_build_files_order(&s.interner)
        .expect("acyclic graph sorts");

    let pos = |f: NameId| order.iter().position(|&x| x == f).expect("file in order");
    assert!(pos(file_c) < pos(file_b));
    assert!(pos(file_b) < pos(file_a));
}

#[test]
fn test_build_order_is_a_valid_topological_sort() {
    // diamond: d; b and c import d; a imports b and c
    let mut s = Setup::new();
    let (_, d) = s.file("d", &[]);
    let (_, b) = s.file("b", &[d]);
    let (_, c) = s.file("c", &[d]);
    let (file_a, _) = s.file("a", &[b, c]);

    let order = s
        .manager
        .get_build_files_order(&s.interner)
        .expect("acyclic graph sorts");
    assert_eq!(order.len(), 4);

    // every file's imports appear fully before it
    for (i, &file) in order.iter().enumerate() {
        for &import in s.manager.imports_of(file) {
            for &other in &order[i..] {
                assert_ne!(
                    s.manager.module_of(other),
                    import,
                    "import must be fully built before its dependents"
                );
            }
        }
    }
    assert_eq!(order[3], file_a);
}

#[test]
fn test_cycle_returns_error_with_both_edges() {
    // scenario: a uses b, b uses a
    let mut s = Setup::new();
    let a = s.module("a");
    let b = s.module("b");
    let file_a = s.interner.get_id("a.ash");
    let file_b = s.interner.get_id("b.ash");
    s.manager.add_ast(file_a, Ast::new());
    s.manager.add_ast(file_b, Ast::new());
    s.manager.add_module(file_a, a, BTreeSet::from([b]));
    s.manager.add_module(file_b, b, BTreeSet::from([a]));

    // imports all exist, so the module check itself passes
    assert!(s.manager.check_modules(&s.interner).is_ok());

    let err = s
        .manager
        .get_build_files_order(&s.interner)
        .expect_err("cycle should fail");
    match err {
        ModuleError::CircularDependencies { edges } => {
            assert_eq!(edges.len(), 2);
            assert!(edges.contains(&("a".to_string(), "b".to_string())));
            assert!(edges.contains(&("b".to_string(), "a".to_string())));
        }
        other => panic!("expected circular dependencies, got {:?}", other),
    }
}

#[test]
fn test_find_function_mangled_in_current_module() {
    let mut s = Setup::new();
    let (file, m) = s.file("m", &[]);
    let mangled = s.export(m, "f", &[Type::default_int()]);
    assert_eq!(
        s.manager.find_function(&mut s.interner, file, mangled, true),
        Some(mangled)
    );
}

#[test]
fn test_find_function_mangled_in_import() {
    let mut s = Setup::new();
    let (_, lib) = s.file("lib", &[]);
    let (file, _) = s.file("app", &[lib]);
    let mangled = s.export(lib, "helper", &[]);
    assert_eq!(
        s.manager.find_function(&mut s.interner, file, mangled, true),
        Some(mangled)
    );
}

#[test]
fn test_find_function_unmangled_completes_against_modules() {
    let mut s = Setup::new();
    let (_, lib) = s.file("lib", &[]);
    let (file, _) = s.file("app", &[lib]);
    let mangled = s.export(lib, "helper", &[Type::Bool]);

    let callee = s.interner.get_id("helper");
    let partial = mangle::mangle_call_bare(&mut s.interner, callee, &[Type::Bool]);
    assert_eq!(
        s.manager
            .find_function(&mut s.interner, file, partial, false),
        Some(mangled)
    );
}

#[test]
fn test_find_function_prefers_current_module() {
    let mut s = Setup::new();
    let (_, lib) = s.file("lib", &[]);
    let (file, app) = s.file("app", &[lib]);
    s.export(lib, "f", &[]);
    let local = s.export(app, "f", &[]);

    let callee = s.interner.get_id("f");
    let partial = mangle::mangle_call_bare(&mut s.interner, callee, &[]);
    assert_eq!(
        s.manager
            .find_function(&mut s.interner, file, partial, false),
        Some(local)
    );
}

#[test]
fn test_find_function_misses_on_wrong_types() {
    let mut s = Setup::new();
    let (file, m) = s.file("m", &[]);
    s.export(m, "f", &[Type::default_int()]);

    let callee = s.interner.get_id("f");
    let partial = mangle::mangle_call_bare(&mut s.interner, callee, &[Type::Bool]);
    assert_eq!(
        s.manager
            .find_function(&mut s.interner, file, partial, false),
        None
    );
}

#[test]
fn test_matching_function_locations() {
    let mut s = Setup::new();
    let (_, lib1) = s.file("lib1", &[]);
    let (_, lib2) = s.file("lib2", &[]);
    let (file, _) = s.file("app", &[lib1, lib2]);
    s.export(lib1, "f", &[Type::default_int()]);
    s.export(lib2, "f", &[Type::default_float()]);
    s.export(lib2, "g", &[]);

    let locations = s.manager.get_matching_function_locations(&s.interner, file, "f");
    assert_eq!(locations.len(), 2);
    assert!(locations.contains(&lib1));
    assert!(locations.contains(&lib2));

    let locations = s.manager.get_matching_function_locations(&s.interner, file, "g");
    assert_eq!(locations, vec![lib2]);
}
