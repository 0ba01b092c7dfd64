//! Module graph error types.

/// An error in the module graph: a missing import or a dependency cycle.
///
/// Module errors have no single source location; they are reported as
/// plain diagnostics without a span.
#[derive(Debug)]
pub enum ModuleError {
    /// A file imports a module that no loaded file declares.
    UnknownImport {
        /// The imported module path, rendered as `a::b`.
        module: String,
        /// The importing file.
        file: String,
    },
    /// The module dependency graph contains at least one cycle.
    CircularDependencies {
        /// One entry per back edge, as (requiring module, required module).
        edges: Vec<(String, String)>,
    },
}

impl std::fmt::Display for ModuleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleError::UnknownImport { module, file } => {
                write!(
                    f,
                    "Using module '{}' does not exist (in file: {})",
                    module, file
                )
            }
            ModuleError::CircularDependencies { edges } => {
                write!(f, "Module graph has circular dependencies:")?;
                for (from, to) in edges {
                    write!(
                        f,
                        "\n\tIn module '{}': requiring '{}' creates a cycle.",
                        from, to
                    )?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ModuleError {}
