use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(version, about = None, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Source code input file
    pub input_file: PathBuf,

    /// Execution mode
    #[arg(value_enum)]
    #[arg(short, long)]
    #[arg(default_value_t = Mode::Ir)]
    pub mode: Mode,

    /// Type whose constructor is the entry point
    #[arg(short, long, default_value = "Program")]
    pub entry: String,

    /// Path to the object file
    #[arg(short, long)]
    pub output_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Inspect the syntactic tree of every type
    Parse,

    /// List every analysed type with its member signatures
    Analyze,

    /// Print the generated IR
    Ir,

    /// Compile to an object file through LLVM
    Object,
}
