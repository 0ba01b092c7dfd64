//! LLVM code generation for Ash.
//!
//! Lowers fully type-checked ASTs into an LLVM module through
//! [Inkwell](https://github.com/TheDan64/inkwell). One [`Codegen`] holds
//! the module and builder for a whole compilation; files are emitted in
//! build order in two sweeps, prototypes first:
//!
//! 1. [`Codegen::emit_prototypes`] declares every global-body prototype
//!    of a file, so forward and cross-file references resolve. Internal
//!    functions are declared under their mangled id's string, externs
//!    under their bare (demangled) name.
//! 2. [`Codegen::emit_definitions`] generates the function bodies, each
//!    with the classic entry-block `alloca`+`store` pattern for
//!    parameters and locals.
//!
//! Loop and switch control flow threads two stacks of continue and break
//! target blocks. Constant subtrees are folded by [`consts`] and emitted
//! as single LLVM constants.
//!
//! # Module Structure
//!
//! - [`error`] - Error types
//! - `consts` - Compile-time constant evaluation
//! - `expr` - Expression lowering
//! - `target` - Target machine and object file output
//!
//! # See Also
//!
//! * [`crate::semantic`] - Must run before lowering
//! * [LLVM Language Reference](https://llvm.org/docs/LangRef.html)

mod consts;
mod error;
mod expr;
mod target;


pub use error::{CodegenError, CodegenErrorKind};

use std::collections::HashMap;

use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum};
use inkwell::values::{BasicValueEnum, FunctionValue, PointerValue};

use crate::ast::{Ast, BodyId, FunctionDefinition, FunctionPrototype};
use crate::interner::{Interner, NameId};
use crate::mangle;
use crate::token::Span;
use crate::types::Type;

/// A variable's stack slot: the alloca pointer plus the value type
/// loads must use.
#[derive(Debug, Clone, Copy)]
struct Slot<'ctx> {
    ptr: PointerValue<'ctx>,
    ty: BasicTypeEnum<'ctx>,
}

/// The LLVM code generator for one compilation.
///
/// # Lifetime
///
/// `'ctx` ties the generator to an LLVM [`Context`], which must outlive
/// it. LLVM contexts are not thread-safe; one compilation uses one
/// context on one thread.
pub struct Codegen<'ctx> {
    context: &'ctx Context,
    module: Module<'ctx>,
    builder: Builder<'ctx>,
    /// Stack of continue targets (innermost loop last).
    continue_blocks: Vec<BasicBlock<'ctx>>,
    /// Stack of break targets (innermost loop or switch last).
    break_blocks: Vec<BasicBlock<'ctx>>,
    /// Per-function stack slots, keyed by declaring body and name.
    /// Cleared when each top-level function definition completes.
    slots: HashMap<(BodyId, NameId), Slot<'ctx>>,
}

impl<'ctx> Codegen<'ctx> {
    /// Creates a code generator with a fresh module.
    pub fn new(context: &'ctx Context, module_name: &str) -> Self {
        Codegen {
            context,
            module: context.create_module(module_name),
            builder: context.create_builder(),
            continue_blocks: Vec::new(),
            break_blocks: Vec::new(),
            slots: HashMap::new(),
        }
    }

    /// Serializes the module as textual LLVM IR.
    pub fn print_ir(&self) -> String {
        self.module.print_to_string().to_string()
    }

    /// Declares every prototype of a file's global body.
    pub fn emit_prototypes(&mut self, ast: &Ast, interner: &Interner) -> Result<(), CodegenError> {
        let root = ast.root();
        for (_, &proto_id) in &ast.body(root).prototypes {
            self.generate_prototype(ast.proto(proto_id), interner)?;
        }
        Ok(())
    }

    /// Generates every function definition of a file's global body.
    pub fn emit_definitions(
        &mut self,
        ast: &Ast,
        interner: &Interner,
    ) -> Result<(), CodegenError> {
        let root = ast.root();
        for func in &ast.body(root).functions {
            self.generate_function_definition(ast, interner, func)?;
            // names from one function must not leak into another
            self.slots.clear();
        }
        Ok(())
    }

    /// The LLVM-visible name of a prototype: the bare name for externs,
    /// the mangled id's string otherwise.
    fn symbol_name(&self, proto: &FunctionPrototype, interner: &Interner) -> String {
        if proto.is_extern {
            mangle::demangled_function_name(interner, proto.name)
        } else {
            interner.get_string(proto.name).to_string()
        }
    }

    /// Declares a function signature, reusing an existing declaration
    /// (externs may be declared in several scopes).
    fn generate_prototype(
        &mut self,
        proto: &FunctionPrototype,
        interner: &Interner,
    ) -> Result<FunctionValue<'ctx>, CodegenError> {
        let name = self.symbol_name(proto, interner);
        if let Some(existing) = self.module.get_function(&name) {
            return Ok(existing);
        }

        let param_types: Vec<BasicMetadataTypeEnum<'ctx>> = proto
            .params
            .iter()
            .map(|&ty| self.llvm_type(ty).into())
            .collect();
        let fn_type = match proto.return_type {
            Type::Void => self.context.void_type().fn_type(&param_types, false),
            ty => self.llvm_type(ty).fn_type(&param_types, false),
        };

        let function = self.module.add_function(&name, fn_type, None);
        for (index, &param_name) in proto.param_names.iter().enumerate() {
            if let Some(param) = function.get_nth_param(index as u32) {
                param.set_name(interner.get_string(param_name));
            }
        }
        Ok(function)
    }

    /// Generates one function definition: nested prototypes and
    /// definitions first, then the entry block, parameter slots, and the
    /// body. A trailing return is synthesized when the body falls off the
    /// end.
    fn generate_function_definition(
        &mut self,
        ast: &Ast,
        interner: &Interner,
        func: &FunctionDefinition,
    ) -> Result<(), CodegenError> {
        let body_id = ast.expr_body(func.body);
        let span = ast.expr(func.body).span;

        for (_, &proto_id) in &ast.body(body_id).prototypes {
            self.generate_prototype(ast.proto(proto_id), interner)?;
        }
        for nested in &ast.body(body_id).functions {
            self.generate_function_definition(ast, interner, nested)?;
        }

        let proto = ast.proto(func.prototype);
        let function = self.generate_prototype(proto, interner)?;
        let name = self.symbol_name(proto, interner);

        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);

        for (index, (&param_name, &param_ty)) in proto
            .param_names
            .iter()
            .zip(&proto.params)
            .enumerate()
        {
            let param = function.get_nth_param(index as u32).ok_or_else(|| {
                CodegenError::internal(
                    format!("function '{}' is missing parameter {}", name, index),
                    span,
                )
            })?;
            let ty = self.llvm_type(param_ty);
            let slot = self.create_entry_alloca(
                function,
                ty,
                interner.get_string(param_name),
                span,
            )?;
            self.builder
                .build_store(slot, param)
                .map_err(|e| CodegenError::llvm("store", e, span))?;
            self.slots
                .insert((body_id, param_name), Slot { ptr: slot, ty });
        }

        let body_value = self.generate_expr(ast, interner, func.body)?;

        let has_terminator = self
            .builder
            .get_insert_block()
            .and_then(|block| block.get_terminator())
            .is_some();
        if !has_terminator {
            if proto.return_type == Type::Void {
                self.builder
                    .build_return(None)
                    .map_err(|e| CodegenError::llvm("ret", e, span))?;
            } else if let Some(value) = body_value {
                self.builder
                    .build_return(Some(&value))
                    .map_err(|e| CodegenError::llvm("ret", e, span))?;
            } else {
                return Err(CodegenError::internal(
                    format!("non-void function '{}' has no return value", name),
                    span,
                ));
            }
        }

        if !function.verify(true) {
            return Err(CodegenError::verify(&name));
        }
        Ok(())
    }

    /// Allocates a stack slot in the function's entry block.
    fn create_entry_alloca(
        &self,
        function: FunctionValue<'ctx>,
        ty: BasicTypeEnum<'ctx>,
        name: &str,
        span: Span,
    ) -> Result<PointerValue<'ctx>, CodegenError> {
        let entry = function
            .get_first_basic_block()
            .ok_or_else(|| CodegenError::internal("function has no entry block", span))?;

        let temp = self.context.create_builder();
        match entry.get_first_instruction() {
            Some(first) => temp.position_before(&first),
            None => temp.position_at_end(entry),
        }
        temp.build_alloca(ty, name)
            .map_err(|e| CodegenError::llvm("alloca", e, span))
    }

    /// Maps an Ash type to its LLVM value type.
    ///
    /// # Panics
    ///
    /// Panics on `Void`, which has no value type; callers handle `Void`
    /// before mapping.
    fn llvm_type(&self, ty: Type) -> BasicTypeEnum<'ctx> {
        match ty {
            Type::Int { bits, .. } => self
                .context
                .custom_width_int_type(u32::from(bits))
                .into(),
            Type::Float { bits: 32 } => self.context.f32_type().into(),
            Type::Float { .. } => self.context.f64_type().into(),
            Type::Bool => self.context.bool_type().into(),
            Type::Char => self.context.i8_type().into(),
            Type::Void => panic!("void has no LLVM value type"),
        }
    }

    /// The zero value of a type, used for default-initialized variables.
    fn default_value(&self, ty: Type) -> BasicValueEnum<'ctx> {
        match ty {
            Type::Float { .. } => self.llvm_type(ty).into_float_type().const_zero().into(),
            _ => self.llvm_type(ty).into_int_type().const_zero().into(),
        }
    }

    /// Finds the stack slot for `name`, walking from `body` through the
    /// enclosing bodies.
    fn lookup_slot(&self, ast: &Ast, body: BodyId, name: NameId) -> Option<Slot<'ctx>> {
        let mut current = Some(body);
        while let Some(body_id) = current {
            if let Some(slot) = self.slots.get(&(body_id, name)) {
                return Some(*slot);
            }
            current = ast.body(body_id).parent;
        }
        None
    }

    fn current_block(&self, span: Span) -> Result<BasicBlock<'ctx>, CodegenError> {
        self.builder
            .get_insert_block()
            .ok_or_else(|| CodegenError::internal("builder has no insertion block", span))
    }

    fn current_function(&self, span: Span) -> Result<FunctionValue<'ctx>, CodegenError> {
        self.current_block(span)?
            .get_parent()
            .ok_or_else(|| CodegenError::internal("block has no parent function", span))
    }

    /// True when the current block already ends in a terminator, meaning
    /// no further instructions may be appended to it.
    fn block_terminated(&self) -> bool {
        self.builder
            .get_insert_block()
            .and_then(|block| block.get_terminator())
            .is_some()
    }

    /// Branches the current block to `target` unless it is already
    /// terminated; returns the block the branch was emitted in.
    fn branch_unless_terminated(
        &self,
        target: BasicBlock<'ctx>,
        span: Span,
    ) -> Result<Option<BasicBlock<'ctx>>, CodegenError> {
        if self.block_terminated() {
            return Ok(None);
        }
        let block = self.current_block(span)?;
        self.builder
            .build_unconditional_branch(target)
            .map_err(|e| CodegenError::llvm("br", e, span))?;
        Ok(Some(block))
    }
}
