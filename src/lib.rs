//! Sable
//!
//! A compiler front-end and code generator for a small class-based language. A program
//! goes through these stages:
//! - [parsing]: bytes to tokens to syntactic types
//! - [analysis]: surface registration of all types, then deep checking of bodies
//! - [codegen]: declarations and bodies emitted through a [codegen::Backend]
//!
//! Every stage fails fast with an [error::Error].

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::debug;

pub mod analysis;
pub mod codegen;
pub mod error;
pub mod parsing;
mod util;

pub use util::{Position, QualifiedName};

use analysis::DeepProgram;
use codegen::{Backend, ProgramGenerator, TextBackend};
use error::{LexError, Result};
use parsing::parse;

/// Basic types every program is compiled against
pub const PRELUDE: &str = include_str!("prelude.sbl");

/// Analyses `source` together with the prelude
pub fn analyze<R: Read>(source: R, entry: &str) -> Result<DeepProgram> {
    analysis::analyze(parse(PRELUDE.as_bytes()).chain(parse(source)), entry)
}

pub fn analyze_source(source: &str, entry: &str) -> Result<DeepProgram> {
    analyze(source.as_bytes(), entry)
}

/// Compiles `source` to textual IR, starting from the type named `entry`
pub fn compile_source(source: &str, entry: &str) -> Result<String> {
    generate(&analyze_source(source, entry)?)
}

/// Like [compile_source], streaming the file at `path`
pub fn compile_file(path: impl AsRef<Path>, entry: &str) -> Result<String> {
    let path = path.as_ref();
    debug!("compiling {}", path.display());
    let file = File::open(path).map_err(|source| LexError::SourceUnreadable { source })?;
    generate(&analyze(file, entry)?)
}

fn generate(program: &DeepProgram) -> Result<String> {
    let mut generator = ProgramGenerator::new(program, TextBackend::new());
    generator.write()?;
    Ok(generator.backend().render())
}
