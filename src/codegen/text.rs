//! Textual backend
//!
//! Builds a module in memory and renders it as LLVM flavoured assembly. The verifier
//! checks what the generator relies on: every body ends in exactly one return of the
//! right kind and every call matches the declaration of its callee.

use std::fmt::{self, Write};

use super::backend::{Backend, FunctionSignature, PassBy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextValue {
    Register(usize),
    Global(usize),
    Null,
}

impl fmt::Display for TextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextValue::Register(n) => write!(f, "%{n}"),
            TextValue::Global(n) => write!(f, "@.str.{n}"),
            TextValue::Null => write!(f, "null"),
        }
    }
}

#[derive(Debug, Clone)]
enum Instruction {
    Call {
        callee: FunctionId,
        arguments: Vec<TextValue>,
        result: Option<usize>,
    },
    Return(PassBy),
}

#[derive(Debug)]
struct Function {
    name: String,
    signature: FunctionSignature,
    external: bool,
    body: Option<Vec<Instruction>>,
    next_register: usize,
}

#[derive(Debug, Default)]
pub struct TextBackend {
    functions: Vec<Function>,
    strings: Vec<String>,
    current: Option<FunctionId>,
}

impl TextBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all declared functions, in declaration order
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.iter().map(|function| function.name.as_str())
    }

    pub fn function_name(&self, function: FunctionId) -> Option<&str> {
        self.functions
            .get(function.0)
            .map(|function| function.name.as_str())
    }

    fn declare(
        &mut self,
        name: &str,
        signature: &FunctionSignature,
        external: bool,
    ) -> Result<FunctionId, String> {
        if self.functions.iter().any(|function| function.name == name) {
            return Err(format!("function @{name} is declared twice"));
        }
        if signature.parameters.contains(&PassBy::Void) {
            return Err(format!("function @{name} takes a void parameter"));
        }

        self.functions.push(Function {
            name: name.to_string(),
            signature: signature.clone(),
            external,
            body: None,
            next_register: signature.parameters.len(),
        });
        Ok(FunctionId(self.functions.len() - 1))
    }

    fn open(&mut self) -> Result<&mut Function, String> {
        let id = self.current.ok_or("no function body is open")?;
        self.functions
            .get_mut(id.0)
            .ok_or_else(|| String::from("the open function does not exist"))
    }

    fn push(&mut self, instruction: Instruction) -> Result<(), String> {
        let function = self.open()?;
        match function.body.as_mut() {
            Some(body) => {
                body.push(instruction);
                Ok(())
            }
            None => Err(format!("function @{} has no body", function.name)),
        }
    }

    fn render_signature(signature: &FunctionSignature, named: bool) -> String {
        let mut parameters: Vec<String> = signature
            .parameters
            .iter()
            .enumerate()
            .map(|(i, pass)| {
                if named {
                    format!("{pass} %{i}")
                } else {
                    pass.to_string()
                }
            })
            .collect();
        if signature.variadic {
            parameters.push(String::from("..."));
        }
        parameters.join(", ")
    }

    fn render_instruction(&self, out: &mut String, instruction: &Instruction) -> fmt::Result {
        match instruction {
            Instruction::Call {
                callee,
                arguments,
                result,
            } => {
                let Some(function) = self.functions.get(callee.0) else {
                    return writeln!(out, "  ; call to unknown function");
                };
                let arguments = arguments
                    .iter()
                    .map(|argument| format!("ptr {argument}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                let callee_type = if function.signature.variadic {
                    format!(
                        "{} ({})",
                        function.signature.return_type,
                        Self::render_signature(&function.signature, false)
                    )
                } else {
                    function.signature.return_type.to_string()
                };

                write!(out, "  ")?;
                if let Some(result) = result {
                    write!(out, "%{result} = ")?;
                }
                writeln!(out, "call {callee_type} @{}({arguments})", function.name)
            }
            Instruction::Return(PassBy::Void) => writeln!(out, "  ret void"),
            Instruction::Return(PassBy::Pointer) => writeln!(out, "  ret ptr null"),
        }
    }

    /// Globals, then declarations, then one section per definition
    fn render_module(&self) -> Result<String, fmt::Error> {
        let mut sections = Vec::new();

        let mut globals = String::new();
        for (i, string) in self.strings.iter().enumerate() {
            writeln!(
                globals,
                "@.str.{i} = private unnamed_addr constant [{} x i8] c\"{}\\00\"",
                string.len() + 1,
                escape(string)
            )?;
        }
        sections.push(globals);

        let mut declarations = String::new();
        for function in self.functions.iter().filter(|f| f.body.is_none()) {
            writeln!(
                declarations,
                "declare {} @{}({})",
                function.signature.return_type,
                function.name,
                Self::render_signature(&function.signature, false)
            )?;
        }
        sections.push(declarations);

        for function in &self.functions {
            let Some(body) = &function.body else {
                continue;
            };
            let mut definition = String::new();
            writeln!(
                definition,
                "define {} @{}({}) {{\nentry:",
                function.signature.return_type,
                function.name,
                Self::render_signature(&function.signature, true)
            )?;
            for instruction in body {
                self.render_instruction(&mut definition, instruction)?;
            }
            writeln!(definition, "}}")?;
            sections.push(definition);
        }

        sections.retain(|section| !section.is_empty());
        Ok(sections.join("\n"))
    }
}

/// Escapes a string for a `c"..."` constant
fn escape(value: &str) -> String {
    let mut escaped = String::new();
    for byte in value.bytes() {
        match byte {
            0x20..=0x7e if byte != b'"' && byte != b'\\' => escaped.push(byte as char),
            _ => escaped.push_str(&format!("\\{byte:02X}")),
        }
    }
    escaped
}

impl Backend for TextBackend {
    type Function = FunctionId;
    type Value = TextValue;

    fn declare_function(
        &mut self,
        name: &str,
        signature: &FunctionSignature,
    ) -> Result<FunctionId, String> {
        self.declare(name, signature, false)
    }

    fn declare_external(
        &mut self,
        name: &str,
        signature: &FunctionSignature,
    ) -> Result<FunctionId, String> {
        self.declare(name, signature, true)
    }

    fn begin_body(&mut self, function: FunctionId) -> Result<(), String> {
        let target = self
            .functions
            .get_mut(function.0)
            .ok_or("cannot define an unknown function")?;
        if target.external {
            return Err(format!("external function @{} cannot have a body", target.name));
        }
        if target.body.is_some() {
            return Err(format!("function @{} already has a body", target.name));
        }
        target.body = Some(Vec::new());
        self.current = Some(function);
        Ok(())
    }

    fn parameter(&self, function: FunctionId, index: usize) -> Option<TextValue> {
        let function = self.functions.get(function.0)?;
        (index < function.signature.parameters.len()).then_some(TextValue::Register(index))
    }

    fn emit_call(
        &mut self,
        callee: FunctionId,
        arguments: &[TextValue],
    ) -> Result<Option<TextValue>, String> {
        let returns = self
            .functions
            .get(callee.0)
            .map(|function| function.signature.return_type)
            .ok_or("call to an unknown function")?;

        let result = match returns {
            PassBy::Void => None,
            PassBy::Pointer => {
                let function = self.open()?;
                let register = function.next_register;
                function.next_register += 1;
                Some(register)
            }
        };

        self.push(Instruction::Call {
            callee,
            arguments: arguments.to_vec(),
            result,
        })?;
        Ok(result.map(TextValue::Register))
    }

    fn emit_global_string(&mut self, value: &str) -> Result<TextValue, String> {
        self.strings.push(value.to_string());
        Ok(TextValue::Global(self.strings.len() - 1))
    }

    fn null_pointer(&mut self) -> TextValue {
        TextValue::Null
    }

    fn emit_return(&mut self, kind: PassBy) -> Result<(), String> {
        self.push(Instruction::Return(kind))
    }

    fn verify_function(&self, id: FunctionId) -> Result<(), String> {
        let function = self
            .functions
            .get(id.0)
            .ok_or("cannot verify an unknown function")?;
        let name = &function.name;
        let Some(body) = &function.body else {
            return Err(format!("function @{name} has no body"));
        };

        match body.last() {
            Some(Instruction::Return(kind)) if *kind == function.signature.return_type => {}
            Some(Instruction::Return(kind)) => {
                return Err(format!(
                    "function @{name} returns {kind} but is declared to return {}",
                    function.signature.return_type
                ))
            }
            _ => return Err(format!("function @{name} does not end with a terminator")),
        }

        for instruction in &body[..body.len() - 1] {
            let Instruction::Call {
                callee, arguments, ..
            } = instruction
            else {
                return Err(format!("function @{name} has a terminator in the middle"));
            };
            let Some(target) = self.functions.get(callee.0) else {
                return Err(format!("function @{name} calls an undeclared function"));
            };
            let expected = target.signature.parameters.len();
            let arity_matches = if target.signature.variadic {
                arguments.len() >= expected
            } else {
                arguments.len() == expected
            };
            if !arity_matches {
                return Err(format!(
                    "function @{name} calls @{} with {} arguments, {expected} expected",
                    target.name,
                    arguments.len()
                ));
            }
            for argument in arguments {
                if let TextValue::Global(n) = argument {
                    if *n >= self.strings.len() {
                        return Err(format!("function @{name} uses an undefined string"));
                    }
                }
            }
        }
        Ok(())
    }

    fn verify_module(&self) -> Result<(), String> {
        for (i, function) in self.functions.iter().enumerate() {
            if !function.external && function.body.is_none() {
                return Err(format!("function @{} is never defined", function.name));
            }
            if function.body.is_some() {
                self.verify_function(FunctionId(i))?;
            }
        }
        Ok(())
    }

    fn render(&self) -> String {
        self.render_module().unwrap_or_default()
    }
}
