//! Backbone functions
//!
//! Compiler-known functions reachable through `#name(...)` directives. Each one maps to
//! an external symbol of the runtime.

use super::surface::{SurfaceCallableType, SurfaceParameter, SurfaceProgram};
use crate::error::Result;
use crate::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackboneFunction {
    /// `stderr_print(String) -> Void`
    StderrPrint,
}

impl BackboneFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "stderr_print" => Some(Self::StderrPrint),
            _ => None,
        }
    }

    /// The runtime symbol
    pub fn external_name(self) -> &'static str {
        match self {
            Self::StderrPrint => "stderr_print",
        }
    }

    /// Whether the runtime symbol accepts trailing arguments
    pub fn is_variadic(self) -> bool {
        match self {
            Self::StderrPrint => true,
        }
    }

    pub fn signature(
        self,
        program: &SurfaceProgram,
        position: Position,
    ) -> Result<SurfaceCallableType> {
        match self {
            Self::StderrPrint => Ok(SurfaceCallableType {
                return_type: program.reference(program.void()?, position),
                parameters: vec![SurfaceParameter {
                    name: String::from("text"),
                    ty: program.reference(program.string()?, position),
                }],
                type_parameters: Vec::new(),
            }),
        }
    }
}
