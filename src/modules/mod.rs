//! The module manager.
//!
//! One [`ModuleManager`] per compilation owns every parsed file's AST and
//! the file/module bookkeeping around them: which module each file
//! belongs to, which modules each file imports, and which mangled
//! function ids each module exports.
//!
//! It answers the two questions the later phases ask:
//!
//! - *build order*: a topological sort of the module graph (Kahn's
//!   algorithm), with per-edge diagnostics when the graph has cycles;
//! - *name resolution*: given a call site's file and mangled (or
//!   partially mangled) callee, which exported function id it refers to.
//!
//! Files without a `module` declaration belong to the empty module path,
//! whose id is the bare mangle preamble.
//!
//! # See Also
//!
//! * [`crate::mangle`] - Produces the ids stored in export sets
//! * [`crate::semantic`] - Resolves call sites through this manager

mod error;

#[cfg(test)]
mod tests;

pub use error::ModuleError;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::ast::{Ast, FunctionPrototype};
use crate::interner::{Interner, NameId};
use crate::mangle;

/// Process-wide (per compilation) registry of files, modules, and exports.
#[derive(Debug, Default)]
pub struct ModuleManager {
    /// file id → module id
    file_to_module: HashMap<NameId, NameId>,
    /// file id → AST (exclusive ownership; `take_ast` lends it out)
    asts: HashMap<NameId, Ast>,
    /// module id → files belonging to it
    module_files: BTreeMap<NameId, BTreeSet<NameId>>,
    /// file id → imported modules (never contains the file's own module)
    file_imports: HashMap<NameId, BTreeSet<NameId>>,
    /// module id → union of its files' imports, minus itself
    module_imports: BTreeMap<NameId, BTreeSet<NameId>>,
    /// module id → exported mangled function ids
    exports: HashMap<NameId, BTreeSet<NameId>>,
}

impl ModuleManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        ModuleManager::default()
    }

    /// Takes ownership of a parsed file's AST.
    pub fn add_ast(&mut self, file: NameId, ast: Ast) {
        self.asts.insert(file, ast);
    }

    /// Lends a file's AST out for a phase that mutates it.
    ///
    /// # Panics
    ///
    /// Panics if the file was not added or its AST is already lent out.
    pub fn take_ast(&mut self, file: NameId) -> Ast {
        self.asts
            .remove(&file)
            .expect("file AST is present and not lent out")
    }

    /// Returns a lent-out AST.
    pub fn put_ast(&mut self, file: NameId, ast: Ast) {
        self.asts.insert(file, ast);
    }

    /// Borrows a file's AST.
    pub fn ast(&self, file: NameId) -> Option<&Ast> {
        self.asts.get(&file)
    }

    /// Records a file's module and imports. The file's own module is
    /// stripped from the import set.
    pub fn add_module(&mut self, file: NameId, module: NameId, mut imports: BTreeSet<NameId>) {
        imports.remove(&module);

        self.file_to_module.insert(file, module);
        self.module_files.entry(module).or_default().insert(file);
        self.module_imports
            .entry(module)
            .or_default()
            .extend(imports.iter().copied());
        self.module_imports
            .get_mut(&module)
            .expect("entry just created")
            .remove(&module);
        self.file_imports.insert(file, imports);
        self.exports.entry(module).or_default();
    }

    /// The module a file belongs to.
    ///
    /// # Panics
    ///
    /// Panics if the file was never registered.
    pub fn module_of(&self, file: NameId) -> NameId {
        self.file_to_module[&file]
    }

    /// The modules a file imports.
    pub fn imports_of(&self, file: NameId) -> &BTreeSet<NameId> {
        &self.file_imports[&file]
    }

    /// True if `module` is the file's own module or one of its imports.
    pub fn is_module_available(&self, file: NameId, module: NameId) -> bool {
        self.module_of(file) == module || self.file_imports[&file].contains(&module)
    }

    /// Records an exported (mangled) function id for a module.
    pub fn add_export(&mut self, module: NameId, mangled: NameId) {
        self.exports.entry(module).or_default().insert(mangled);
    }

    /// The exported function ids of a module.
    pub fn exports_of(&self, module: NameId) -> Option<&BTreeSet<NameId>> {
        self.exports.get(&module)
    }

    /// Verifies that every imported module exists in the loaded set.
    pub fn check_modules(&self, interner: &Interner) -> Result<(), ModuleError> {
        for (file, imports) in &self.file_imports {
            for import in imports {
                if !self.module_files.contains_key(import) {
                    return Err(ModuleError::UnknownImport {
                        module: pretty_module(interner, *import),
                        file: interner.get_string(*file).to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Modules that import `module`.
    fn find_dependent_modules(&self, module: NameId) -> Vec<NameId> {
        self.module_imports
            .iter()
            .filter(|(_, imports)| imports.contains(&module))
            .map(|(m, _)| *m)
            .collect()
    }

    /// Topologically sorts the modules so every module's imports come
    /// before it (Kahn's algorithm, smallest-id-first for determinism).
    fn module_order(&self) -> Option<Vec<NameId>> {
        let mut indegree: BTreeMap<NameId, usize> = BTreeMap::new();
        let mut ready: BTreeSet<NameId> = BTreeSet::new();

        for (module, imports) in &self.module_imports {
            indegree.insert(*module, imports.len());
            if imports.is_empty() {
                ready.insert(*module);
            }
        }

        let mut order = Vec::with_capacity(indegree.len());
        while let Some(&module) = ready.iter().next() {
            ready.remove(&module);
            order.push(module);

            for dependent in self.find_dependent_modules(module) {
                let degree = indegree
                    .get_mut(&dependent)
                    .expect("dependent module is registered");
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(dependent);
                }
            }
        }

        (order.len() == indegree.len()).then_some(order)
    }

    /// Enumerates cycle back edges, one DFS per start module.
    pub fn get_circular_dependencies(&self) -> Vec<(NameId, NameId)> {
        let mut edges = Vec::new();

        for &start in self.module_imports.keys() {
            let mut discovered = BTreeSet::new();
            let mut finished = BTreeSet::new();
            self.dfs_cycles(start, &mut discovered, &mut finished, &mut edges);
        }

        edges
    }

    fn dfs_cycles(
        &self,
        module: NameId,
        discovered: &mut BTreeSet<NameId>,
        finished: &mut BTreeSet<NameId>,
        edges: &mut Vec<(NameId, NameId)>,
    ) {
        discovered.insert(module);

        if let Some(imports) = self.module_imports.get(&module) {
            for &import in imports {
                if !self.module_imports.contains_key(&import) {
                    continue;
                }
                if discovered.contains(&import) {
                    edges.push((module, import));
                } else if !finished.contains(&import) {
                    self.dfs_cycles(import, discovered, finished, edges);
                }
            }
        }

        discovered.remove(&module);
        finished.insert(module);
    }

    /// Returns the files in build order: every file of every imported
    /// module before the files of the importing module.
    ///
    /// # Errors
    ///
    /// When the module graph has a cycle, returns one diagnostic per
    /// cycle edge.
    pub fn get_build_files_order(&self, interner: &Interner) -> Result<Vec<NameId>, ModuleError> {
        let Some(order) = self.module_order() else {
            let edges = self
                .get_circular_dependencies()
                .into_iter()
                .map(|(from, to)| {
                    (
                        pretty_module(interner, from),
                        pretty_module(interner, to),
                    )
                })
                .collect();
            return Err(ModuleError::CircularDependencies { edges });
        };

        let mut files = Vec::new();
        for module in order {
            if let Some(members) = self.module_files.get(&module) {
                files.extend(members.iter().copied());
            }
        }
        Ok(files)
    }

    /// Resolves a function at a call site.
    ///
    /// With `is_mangled`, `name` is a full mangled id and the search is an
    /// exact match over the current module's exports, then each imported
    /// module's. Without, `name` is a module-less partial mangle; it is
    /// completed against the current module first, then each import, and
    /// those candidates are searched.
    pub fn find_function(
        &self,
        interner: &mut Interner,
        file: NameId,
        name: NameId,
        is_mangled: bool,
    ) -> Option<NameId> {
        let module = self.module_of(file);
        let mut candidates = vec![module];
        candidates.extend(self.file_imports[&file].iter().copied());

        for candidate in candidates {
            let Some(exports) = self.exports.get(&candidate) else {
                continue;
            };
            let wanted = if is_mangled {
                name
            } else {
                mangle::add_mangled_name(interner, Some(candidate), name)
            };
            if exports.contains(&wanted) {
                return Some(wanted);
            }
        }
        None
    }

    /// Every imported module exporting a function with the given bare
    /// (unmangled) name, used for resolution diagnostics.
    pub fn get_matching_function_locations(
        &self,
        interner: &Interner,
        file: NameId,
        bare_name: &str,
    ) -> Vec<NameId> {
        let mut modules = Vec::new();
        for &import in &self.file_imports[&file] {
            let Some(exports) = self.exports.get(&import) else {
                continue;
            };
            let matches = exports
                .iter()
                .any(|&id| mangle::demangled_function_name(interner, id) == bare_name);
            if matches {
                modules.push(import);
            }
        }
        modules
    }

    /// Locates the file whose global body declares a mangled function id,
    /// by extracting the module prefix and scanning that module's files.
    pub fn find_body(&self, interner: &mut Interner, function: NameId) -> Option<NameId> {
        let module = mangle::extract_module(interner, function);
        let files = self.module_files.get(&module)?;
        for &file in files {
            let ast = self.asts.get(&file)?;
            if ast.body(ast.root()).prototypes.contains_key(&function) {
                return Some(file);
            }
        }
        None
    }

    /// Looks up the prototype behind a resolved (mangled) function id in
    /// whichever file declares it.
    pub fn prototype(
        &self,
        interner: &mut Interner,
        function: NameId,
    ) -> Option<FunctionPrototype> {
        let file = self.find_body(interner, function)?;
        let ast = self.asts.get(&file)?;
        let proto_id = *ast.body(ast.root()).prototypes.get(&function)?;
        Some(ast.proto(proto_id).clone())
    }
}

/// Renders a module id for diagnostics; the empty path becomes `<global>`.
fn pretty_module(interner: &Interner, module: NameId) -> String {
    let pretty = mangle::pretty_modules(interner, Some(module));
    if pretty.is_empty() {
        "<global>".to_string()
    } else {
        pretty
    }
}
