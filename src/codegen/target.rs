//! Target machine and output-file handling.
//!
//! Textual IR can be written without a target; object output initializes
//! the native target, stamps the module with its triple and data layout,
//! and writes a host-native object file.

use std::path::Path;

use inkwell::OptimizationLevel;
use inkwell::targets::{
    CodeModel, FileType, InitializationConfig, RelocMode, Target, TargetMachine,
};

use super::{Codegen, CodegenError};

impl<'ctx> Codegen<'ctx> {
    /// Writes the module as textual LLVM IR.
    pub fn write_ir_file(&self, path: &Path) -> Result<(), CodegenError> {
        self.module.print_to_file(path).map_err(|e| {
            CodegenError::target(format!(
                "Failed to write LLVM IR to '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Writes the module as a native object file for the host.
    ///
    /// # Errors
    ///
    /// Returns an error if native target initialization, target machine
    /// creation, or the write itself fails.
    pub fn write_object_file(&self, path: &Path) -> Result<(), CodegenError> {
        Target::initialize_native(&InitializationConfig::default()).map_err(|e| {
            CodegenError::target(format!("Failed to initialize native target: {}", e))
        })?;

        let triple = TargetMachine::get_default_triple();
        let target = Target::from_triple(&triple).map_err(|e| {
            CodegenError::target(format!(
                "Failed to get target for triple '{}': {}",
                triple, e
            ))
        })?;

        let cpu = TargetMachine::get_host_cpu_name();
        let features = TargetMachine::get_host_cpu_features();
        let target_machine = target
            .create_target_machine(
                &triple,
                cpu.to_str().unwrap_or("generic"),
                features.to_str().unwrap_or(""),
                OptimizationLevel::Default,
                RelocMode::Default,
                CodeModel::Default,
            )
            .ok_or_else(|| {
                CodegenError::target(format!(
                    "Failed to create target machine for triple '{}'",
                    triple
                ))
            })?;

        self.module.set_triple(&triple);
        self.module
            .set_data_layout(&target_machine.get_target_data().get_data_layout());

        target_machine
            .write_to_file(&self.module, FileType::Object, path)
            .map_err(|e| {
                CodegenError::target(format!(
                    "Failed to write object file to '{}': {}",
                    path.display(),
                    e
                ))
            })
    }
}
