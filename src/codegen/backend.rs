use std::fmt;

/// How a value crosses a function boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassBy {
    /// Nothing is passed, only valid for return types
    Void,
    /// An opaque pointer
    Pointer,
}

impl fmt::Display for PassBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassBy::Void => write!(f, "void"),
            PassBy::Pointer => write!(f, "ptr"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    pub return_type: PassBy,
    pub parameters: Vec<PassBy>,
    pub variadic: bool,
}

/// The instruction builder code generation writes into
///
/// Errors are plain messages; the generator classifies them.
pub trait Backend {
    type Function: Copy + fmt::Debug;
    type Value: Clone + fmt::Debug;

    fn declare_function(
        &mut self,
        name: &str,
        signature: &FunctionSignature,
    ) -> Result<Self::Function, String>;

    /// A function provided by the runtime
    fn declare_external(
        &mut self,
        name: &str,
        signature: &FunctionSignature,
    ) -> Result<Self::Function, String>;

    /// Direct all following instructions into the body of `function`
    fn begin_body(&mut self, function: Self::Function) -> Result<(), String>;

    fn parameter(&self, function: Self::Function, index: usize) -> Option<Self::Value>;

    /// Returns the call result, `None` for void functions
    fn emit_call(
        &mut self,
        function: Self::Function,
        arguments: &[Self::Value],
    ) -> Result<Option<Self::Value>, String>;

    fn emit_global_string(&mut self, value: &str) -> Result<Self::Value, String>;

    fn null_pointer(&mut self) -> Self::Value;

    /// `ret void` for [PassBy::Void], a null pointer otherwise
    fn emit_return(&mut self, kind: PassBy) -> Result<(), String>;

    fn verify_function(&self, function: Self::Function) -> Result<(), String>;

    fn verify_module(&self) -> Result<(), String>;

    fn render(&self) -> String;
}
