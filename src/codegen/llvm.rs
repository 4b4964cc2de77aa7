//! LLVM backend
//!
//! Emits real LLVM IR through inkwell. Pointers are opaque, so every object crosses
//! function boundaries as a plain `ptr`.

use std::path::Path;

use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::{Linkage, Module};
use inkwell::targets::{
    CodeModel, FileType, InitializationConfig, RelocMode, Target, TargetMachine,
};
use inkwell::types::{BasicMetadataTypeEnum, FunctionType, PointerType};
use inkwell::values::{BasicMetadataValueEnum, BasicValueEnum, FunctionValue};
use inkwell::{AddressSpace, OptimizationLevel};
use tracing::debug;

use super::backend::{Backend, FunctionSignature, PassBy};

pub struct LlvmBackend<'ctx> {
    context: &'ctx Context,
    builder: Builder<'ctx>,
    module: Module<'ctx>,
    strings: usize,
}

impl<'ctx> LlvmBackend<'ctx> {
    pub fn new(context: &'ctx Context, module: &str) -> Self {
        Self {
            context,
            builder: context.create_builder(),
            module: context.create_module(module),
            strings: 0,
        }
    }

    pub fn module(&self) -> &Module<'ctx> {
        &self.module
    }

    fn pointer(&self) -> PointerType<'ctx> {
        self.context.ptr_type(AddressSpace::default())
    }

    fn function_type(&self, signature: &FunctionSignature) -> FunctionType<'ctx> {
        let parameters: Vec<BasicMetadataTypeEnum> = signature
            .parameters
            .iter()
            .map(|_| self.pointer().into())
            .collect();
        match signature.return_type {
            PassBy::Void => self
                .context
                .void_type()
                .fn_type(&parameters, signature.variadic),
            PassBy::Pointer => self.pointer().fn_type(&parameters, signature.variadic),
        }
    }

    fn add(
        &mut self,
        name: &str,
        signature: &FunctionSignature,
        linkage: Option<Linkage>,
    ) -> Result<FunctionValue<'ctx>, String> {
        if self.module.get_function(name).is_some() {
            return Err(format!("function {name} is declared twice"));
        }
        let ty = self.function_type(signature);
        Ok(self.module.add_function(name, ty, linkage))
    }

    /// Compiles the module for the host machine into an object file at `path`
    pub fn write_object_file(&self, path: &Path) -> Result<(), String> {
        Target::initialize_native(&InitializationConfig::default())?;

        let triple = TargetMachine::get_default_triple();
        let target = Target::from_triple(&triple).map_err(|err| err.to_string())?;
        let machine = target
            .create_target_machine(
                &triple,
                &TargetMachine::get_host_cpu_name().to_string(),
                &TargetMachine::get_host_cpu_features().to_string(),
                OptimizationLevel::Default,
                RelocMode::PIC,
                CodeModel::Default,
            )
            .ok_or_else(|| {
                format!(
                    "no target machine for {}",
                    triple.as_str().to_string_lossy()
                )
            })?;

        self.module.set_triple(&triple);
        self.module
            .set_data_layout(&machine.get_target_data().get_data_layout());

        debug!("writing object file {}", path.display());
        machine
            .write_to_file(&self.module, FileType::Object, path)
            .map_err(|err| err.to_string())
    }
}

impl<'ctx> Backend for LlvmBackend<'ctx> {
    type Function = FunctionValue<'ctx>;
    type Value = BasicValueEnum<'ctx>;

    fn declare_function(
        &mut self,
        name: &str,
        signature: &FunctionSignature,
    ) -> Result<Self::Function, String> {
        self.add(name, signature, None)
    }

    fn declare_external(
        &mut self,
        name: &str,
        signature: &FunctionSignature,
    ) -> Result<Self::Function, String> {
        self.add(name, signature, Some(Linkage::External))
    }

    fn begin_body(&mut self, function: Self::Function) -> Result<(), String> {
        if function.count_basic_blocks() > 0 {
            return Err(String::from("function already has a body"));
        }
        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);
        Ok(())
    }

    fn parameter(&self, function: Self::Function, index: usize) -> Option<Self::Value> {
        function.get_nth_param(u32::try_from(index).ok()?)
    }

    fn emit_call(
        &mut self,
        function: Self::Function,
        arguments: &[Self::Value],
    ) -> Result<Option<Self::Value>, String> {
        let arguments: Vec<BasicMetadataValueEnum> =
            arguments.iter().map(|&argument| argument.into()).collect();
        let name = if function.get_type().get_return_type().is_some() {
            "call"
        } else {
            ""
        };
        let call = self
            .builder
            .build_call(function, &arguments, name)
            .map_err(|err| err.to_string())?;
        Ok(call.try_as_basic_value().left())
    }

    fn emit_global_string(&mut self, value: &str) -> Result<Self::Value, String> {
        let name = format!(".str.{}", self.strings);
        self.strings += 1;
        let global = self
            .builder
            .build_global_string_ptr(value, &name)
            .map_err(|err| err.to_string())?;
        Ok(global.as_pointer_value().into())
    }

    fn null_pointer(&mut self) -> Self::Value {
        self.pointer().const_null().into()
    }

    fn emit_return(&mut self, kind: PassBy) -> Result<(), String> {
        let result = match kind {
            PassBy::Void => self.builder.build_return(None),
            PassBy::Pointer => {
                let null = self.pointer().const_null();
                self.builder.build_return(Some(&null))
            }
        };
        result.map(|_| ()).map_err(|err| err.to_string())
    }

    fn verify_function(&self, function: Self::Function) -> Result<(), String> {
        if function.verify(false) {
            Ok(())
        } else {
            Err(format!(
                "function {} failed verification",
                function.get_name().to_string_lossy()
            ))
        }
    }

    fn verify_module(&self) -> Result<(), String> {
        self.module.verify().map_err(|err| err.to_string())
    }

    fn render(&self) -> String {
        self.module.print_to_string().to_string()
    }
}
