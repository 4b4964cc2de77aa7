//! Code generation
//!
//! [ProgramGenerator] walks a [DeepProgram] in two passes:
//! - declaration: starting from the entry type, every reachable type gets each of its
//!   members declared under a mangled name; types and backbone functions are discovered
//!   through signatures and bodies
//! - definition: every declared function gets its body lowered and verified
//!
//! Instructions go through a [Backend], so the same generator drives the textual
//! backend and LLVM.

pub mod backend;
#[cfg(feature = "llvm")]
pub mod llvm;
pub mod mangle;
pub mod text;

pub use backend::{Backend, FunctionSignature, PassBy};
pub use text::TextBackend;

use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::analysis::builtin::BackboneFunction;
use crate::analysis::surface::{SurfaceCallableType, CONSTRUCTOR};
use crate::analysis::{DeepExpression, DeepProgram, TypeId, ValueType};
use crate::error::{Error, GenerateError, InternalError, Result};

/// What an expression lowers to
enum Lowered<B: Backend> {
    Function(B::Function),
    Value(B::Value),
    Nothing,
}

impl<B: Backend> Clone for Lowered<B> {
    fn clone(&self) -> Self {
        match self {
            Lowered::Function(function) => Lowered::Function(*function),
            Lowered::Value(value) => Lowered::Value(value.clone()),
            Lowered::Nothing => Lowered::Nothing,
        }
    }
}

struct Declared<F> {
    function: F,
    owner: TypeId,
    /// Index into the members of `owner`
    member: usize,
}

type Locals<B> = HashMap<String, Lowered<B>>;

pub struct ProgramGenerator<'p, B: Backend> {
    program: &'p DeepProgram,
    backend: B,
    /// Declared functions by mangled name, in declaration order
    functions: IndexMap<String, Declared<B::Function>>,
    externals: IndexMap<BackboneFunction, B::Function>,
    worklist: VecDeque<TypeId>,
    queued: HashSet<TypeId>,
    generated: HashSet<TypeId>,
    used: bool,
}

impl<'p, B: Backend> ProgramGenerator<'p, B> {
    pub fn new(program: &'p DeepProgram, backend: B) -> Self {
        Self {
            program,
            backend,
            functions: IndexMap::new(),
            externals: IndexMap::new(),
            worklist: VecDeque::new(),
            queued: HashSet::new(),
            generated: HashSet::new(),
            used: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Generates everything reachable from the entry type
    ///
    /// Returns the function of the entry type's constructor. A generator writes once.
    pub fn write(&mut self) -> Result<B::Function> {
        if std::mem::replace(&mut self.used, true) {
            return Err(InternalError::GeneratorIsReused.into());
        }

        let entry = self.program.entry();
        self.enqueue(entry);
        while let Some(id) = self.worklist.pop_front() {
            self.declare_type(id)?;
        }

        let entry_name = mangle::function(
            self.program.surface().name(entry).as_str(),
            CONSTRUCTOR,
            [],
        );
        let entry_function = self
            .functions
            .get(&entry_name)
            .map(|declared| declared.function)
            .ok_or(InternalError::GeneratorMissingEntryPoint { name: entry_name })?;

        let definitions: Vec<_> = self
            .functions
            .values()
            .map(|declared| (declared.function, declared.owner, declared.member))
            .collect();
        for (function, owner, member) in definitions {
            self.define(function, owner, member)?;
        }

        self.backend.verify_module().map_err(verifier_failed)?;
        debug!(
            "generated {} functions for {} types",
            self.functions.len(),
            self.generated.len()
        );
        Ok(entry_function)
    }

    fn enqueue(&mut self, id: TypeId) {
        if self.queued.insert(id) {
            self.worklist.push_back(id);
        }
    }

    fn pass_by(&self, id: TypeId) -> PassBy {
        if self.program.surface().is_void(id) {
            PassBy::Void
        } else {
            PassBy::Pointer
        }
    }

    fn signature(&self, callable: &SurfaceCallableType) -> Result<FunctionSignature> {
        let return_type = self.program.surface().resolve(&callable.return_type)?;
        Ok(FunctionSignature {
            return_type: self.pass_by(return_type),
            parameters: vec![PassBy::Pointer; callable.parameters.len()],
            variadic: false,
        })
    }

    fn mangled(&self, owner: TypeId, member: &str, callable: &SurfaceCallableType) -> String {
        mangle::function(
            self.program.surface().name(owner).as_str(),
            member,
            callable
                .parameters
                .iter()
                .map(|parameter| parameter.ty.name.as_str()),
        )
    }

    fn declare_type(&mut self, id: TypeId) -> Result<()> {
        let program = self.program;
        let ty = program.get(id)?;
        if !self.generated.insert(id) {
            return Err(InternalError::GeneratorTypeGeneratedMultipleTimes {
                name: ty.name.to_string(),
            }
            .into());
        }

        for (index, member) in ty.members.iter().enumerate() {
            let name = self.mangled(id, &member.name, &member.signature);
            if self.functions.contains_key(&name) {
                return Err(GenerateError::MangledNameCollision { name }.into());
            }

            let signature = self.signature(&member.signature)?;
            let function = self
                .backend
                .declare_function(&name, &signature)
                .map_err(backend_failure)?;
            trace!("declared function {name}");
            self.functions.insert(
                name,
                Declared {
                    function,
                    owner: id,
                    member: index,
                },
            );

            self.discover_callable(&member.signature)?;
            self.discover(&member.body)?;
        }

        debug!("declared type {}", ty.name);
        Ok(())
    }

    fn discover_callable(&mut self, callable: &SurfaceCallableType) -> Result<()> {
        let program = self.program;
        let surface = program.surface();
        let references = callable
            .parameters
            .iter()
            .chain(&callable.type_parameters)
            .map(|parameter| &parameter.ty)
            .chain(std::iter::once(&callable.return_type));
        for reference in references {
            let id = surface.resolve(reference)?;
            self.enqueue(id);
        }
        Ok(())
    }

    fn discover_value(&mut self, ty: &ValueType) -> Result<()> {
        match ty {
            ValueType::Object(id) => {
                self.enqueue(*id);
                Ok(())
            }
            ValueType::Callable(callable) => self.discover_callable(callable),
        }
    }

    fn discover(&mut self, expression: &DeepExpression) -> Result<()> {
        match expression {
            DeepExpression::New(id)
            | DeepExpression::ReadStaticType(id)
            | DeepExpression::ReadLiteral { ty: id, .. } => self.enqueue(*id),
            DeepExpression::Scope { statements, ty } => {
                self.enqueue(*ty);
                for statement in statements {
                    self.discover(statement)?;
                }
            }
            DeepExpression::Call {
                target,
                arguments,
                type_arguments,
                ty,
            } => {
                self.discover(target)?;
                for argument in arguments {
                    self.discover(argument)?;
                }
                for id in type_arguments {
                    self.enqueue(*id);
                }
                self.enqueue(*ty);
            }
            DeepExpression::ReadMember {
                parent,
                owner,
                signature,
                ..
            } => {
                self.discover(parent)?;
                self.enqueue(*owner);
                self.discover_callable(signature)?;
            }
            DeepExpression::ReadVariable { ty, .. } => self.discover_value(ty)?,
            DeepExpression::ReadBackbone(function, signature) => {
                self.external(*function, signature)?;
                self.discover_callable(signature)?;
            }
            DeepExpression::Assignment { source, ty, .. } => {
                self.discover(source)?;
                self.discover_value(ty)?;
            }
        }
        Ok(())
    }

    fn external(
        &mut self,
        backbone: BackboneFunction,
        callable: &SurfaceCallableType,
    ) -> Result<()> {
        if self.externals.contains_key(&backbone) {
            return Ok(());
        }

        let signature = FunctionSignature {
            variadic: backbone.is_variadic(),
            ..self.signature(callable)?
        };
        let function = self
            .backend
            .declare_external(backbone.external_name(), &signature)
            .map_err(backend_failure)?;
        trace!("declared external {}", backbone.external_name());
        self.externals.insert(backbone, function);
        Ok(())
    }

    fn function(&self, name: &str) -> Result<B::Function> {
        self.functions
            .get(name)
            .map(|declared| declared.function)
            .ok_or_else(|| {
                InternalError::GeneratorUndeclaredFunction {
                    name: name.to_string(),
                }
                .into()
            })
    }

    fn define(&mut self, function: B::Function, owner: TypeId, index: usize) -> Result<()> {
        let program = self.program;
        let ty = program.get(owner)?;
        let member = ty.members.get(index).ok_or_else(|| {
            InternalError::GeneratorUndeclaredFunction {
                name: format!("{}.{index}", ty.name),
            }
        })?;

        self.backend.begin_body(function).map_err(backend_failure)?;

        let mut locals = Locals::<B>::new();
        for (i, parameter) in member.signature.parameters.iter().enumerate() {
            let value = self.backend.parameter(function, i).ok_or_else(|| {
                InternalError::GeneratorUnboundVariable {
                    name: parameter.name.clone(),
                }
            })?;
            locals.insert(parameter.name.clone(), Lowered::Value(value));
        }

        self.lower(&member.body, &mut locals)?;

        let return_type = program.surface().resolve(&member.signature.return_type)?;
        self.backend
            .emit_return(self.pass_by(return_type))
            .map_err(backend_failure)?;
        self.backend
            .verify_function(function)
            .map_err(verifier_failed)?;

        trace!("defined {}.{}", ty.name, member.name);
        Ok(())
    }

    fn lower(
        &mut self,
        expression: &DeepExpression,
        locals: &mut Locals<B>,
    ) -> Result<Lowered<B>> {
        match expression {
            DeepExpression::New(_) | DeepExpression::ReadStaticType(_) => Ok(Lowered::Nothing),

            DeepExpression::Scope { statements, .. } => {
                let mut last = Lowered::Nothing;
                for statement in statements {
                    last = self.lower(statement, locals)?;
                }
                Ok(last)
            }

            DeepExpression::Call {
                target, arguments, ..
            } => {
                let callee = match self.lower(target, locals)? {
                    Lowered::Function(function) => function,
                    _ => {
                        return Err(InternalError::UnknownTypeClass {
                            detail: String::from("call target is not a function"),
                        }
                        .into())
                    }
                };

                let mut values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    let value = match self.lower(argument, locals)? {
                        Lowered::Value(value) => value,
                        Lowered::Nothing => self.backend.null_pointer(),
                        Lowered::Function(_) => {
                            return Err(InternalError::UnknownTypeClass {
                                detail: String::from("function passed as an argument"),
                            }
                            .into())
                        }
                    };
                    values.push(value);
                }

                let result = self
                    .backend
                    .emit_call(callee, &values)
                    .map_err(backend_failure)?;
                Ok(result.map_or(Lowered::Nothing, Lowered::Value))
            }

            DeepExpression::ReadMember {
                parent,
                owner,
                member,
                signature,
            } => {
                self.lower(parent, locals)?;
                let name = self.mangled(*owner, member, signature);
                Ok(Lowered::Function(self.function(&name)?))
            }

            DeepExpression::ReadVariable { name, ty } => {
                if let Some(value) = locals.get(name) {
                    return Ok(value.clone());
                }
                match ty {
                    ValueType::Callable(callable) if name == CONSTRUCTOR => {
                        let owner = self.program.surface().resolve(&callable.return_type)?;
                        let name = self.mangled(owner, CONSTRUCTOR, callable);
                        Ok(Lowered::Function(self.function(&name)?))
                    }
                    _ => Err(InternalError::GeneratorUnboundVariable { name: name.clone() }.into()),
                }
            }

            DeepExpression::ReadLiteral { value, .. } => {
                let value = self
                    .backend
                    .emit_global_string(value)
                    .map_err(backend_failure)?;
                Ok(Lowered::Value(value))
            }

            DeepExpression::ReadBackbone(backbone, _) => self
                .externals
                .get(backbone)
                .copied()
                .map(Lowered::Function)
                .ok_or_else(|| {
                    InternalError::GeneratorUndeclaredFunction {
                        name: backbone.external_name().to_string(),
                    }
                    .into()
                }),

            DeepExpression::Assignment {
                variable, source, ..
            } => {
                let value = self.lower(source, locals)?;
                locals.insert(variable.clone(), value.clone());
                Ok(value)
            }
        }
    }
}

fn backend_failure(message: String) -> Error {
    InternalError::GeneratorBackendFailure { message }.into()
}

fn verifier_failed(message: String) -> Error {
    InternalError::GeneratorVerifierFailed { message }.into()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::analysis::analyze;
    use crate::parsing::parse;
    use crate::PRELUDE;

    const SYSTEM: &str = "class System { public GetFileSystem Program() { Program.new(); } }";

    fn generate(source: &str) -> Result<String> {
        let program = analyze(
            parse(PRELUDE.as_bytes()).chain(parse(source.as_bytes())),
            "Program",
        )?;
        let mut generator = ProgramGenerator::new(&program, TextBackend::new());
        let entry = generator.write()?;
        let backend = generator.into_backend();
        assert_eq!(backend.function_name(entry), Some("Function_Program_new"));
        Ok(backend.render())
    }

    #[test]
    fn empty_entry_type() {
        assert_eq!(
            generate("class Program { }").unwrap(),
            "define ptr @Function_Program_new() {\n\
             entry:\n  \
             ret ptr null\n\
             }\n"
        );
    }

    #[test]
    fn unreachable_types_are_skipped() {
        let ir = generate("class Unused { } class Program { }").unwrap();
        assert!(!ir.contains("Unused"), "{ir}");
        assert!(!ir.contains("Function_String_new"), "{ir}");
    }

    #[test]
    fn end_to_end_scenario() {
        let ir = generate(&format!(
            "{SYSTEM}
             class Program {{
                 public static New Program(System system) {{
                     system.GetFileSystem();
                 }}
             }}"
        ))
        .unwrap();

        assert!(ir.contains("define ptr @Function_Program_New_System(ptr %0) {"), "{ir}");
        assert!(ir.contains("  %1 = call ptr @Function_System_GetFileSystem()\n"), "{ir}");
        assert!(ir.contains("define ptr @Function_System_GetFileSystem() {"), "{ir}");
        assert!(ir.contains("  %0 = call ptr @Function_Program_new()\n"), "{ir}");
        assert!(ir.contains("define ptr @Function_System_new() {"), "{ir}");
    }

    #[test]
    fn backbone_call_with_literal() {
        let ir = generate(
            "class Program { public static Main Void() { #stderr_print(\"Hello\"); } }",
        )
        .unwrap();

        assert!(ir.starts_with(
            "@.str.0 = private unnamed_addr constant [6 x i8] c\"Hello\\00\"\n\
             \n\
             declare void @stderr_print(ptr, ...)\n"
        ), "{ir}");
        assert!(ir.contains(
            "define void @Function_Program_Main() {\n\
             entry:\n  \
             call void (ptr, ...) @stderr_print(ptr @.str.0)\n  \
             ret void\n\
             }\n"
        ), "{ir}");
        assert!(ir.contains(
            "define void @Function_Void_new() {\n\
             entry:\n  \
             ret void\n\
             }\n"
        ), "{ir}");
        assert!(ir.contains("define ptr @Function_String_new() {"), "{ir}");
    }

    #[test]
    fn assignment_rebinds_the_parameter() {
        let ir = generate(
            "class Program { Swap Void(String a, String b) { a = b; #stderr_print(a); } }",
        )
        .unwrap();
        assert!(ir.contains("define void @Function_Program_Swap_String_String(ptr %0, ptr %1) {"), "{ir}");
        assert!(ir.contains("call void (ptr, ...) @stderr_print(ptr %1)"), "{ir}");
    }

    #[test]
    fn constructor_through_variable() {
        let ir = generate("class Program { Make Program() { new(); } }").unwrap();
        assert!(ir.contains("  %0 = call ptr @Function_Program_new()\n"), "{ir}");
    }

    #[test]
    fn reassigned_constructor_variable() {
        let ir = generate(
            "class Program { Make Program() { Program.new(); } Run Void() { new = Program.Make; new(); } }",
        )
        .unwrap();
        assert!(ir.contains(
            "define void @Function_Program_Run() {\n\
             entry:\n  \
             %0 = call ptr @Function_Program_Make()\n  \
             ret void\n\
             }\n"
        ), "{ir}");
    }

    #[test]
    fn static_type_arguments_become_null() {
        let ir = generate(
            "class Program { Take Void(Program p) { } Run Void() { Program.Take(Program); } }",
        )
        .unwrap();
        assert!(ir.contains("call void @Function_Program_Take_Program(ptr null)"), "{ir}");
    }

    #[test]
    fn identical_overloads_collide() {
        let err = generate("class Program { Run Void(String a) { } Run Void(String b) { } }")
            .unwrap_err();
        assert_eq!(err.code(), "GeneratorMangledNameCollision");
        assert!(!err.is_internal());
    }

    #[test]
    fn generator_is_single_use() {
        let program = analyze(
            parse(PRELUDE.as_bytes()).chain(parse("class Program { }".as_bytes())),
            "Program",
        )
        .unwrap();
        let mut generator = ProgramGenerator::new(&program, TextBackend::new());
        generator.write().unwrap();
        let err = generator.write().unwrap_err();
        assert_eq!(err.code(), "InternalErrorGeneratorIsReused");
        assert!(generator.backend().function_names().count() > 0);
    }
}
