use std::fs::File;
use std::path::Path;

use clap::Parser;
use miette::{bail, miette, IntoDiagnostic, Report, Result};
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use sable::analysis::DeepProgram;
use sable::codegen::{Backend, ProgramGenerator, TextBackend};
use sable::error::Error;
use sable::parsing;

mod cli;

use cli::{Args, Mode};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().without_time())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();

    if !args.input_file.is_file() {
        bail!("No proper input file: {:?}", args.input_file);
    }

    let source = File::open(&args.input_file).into_diagnostic()?;

    if args.mode == Mode::Parse {
        for ty in parsing::parse(source) {
            ty.map_err(report)?.pretty_print().into_diagnostic()?;
        }
        info!("Parsing successful");
        return Ok(());
    }

    let program = sable::analyze(source, &args.entry).map_err(report)?;
    info!("Analysis successful");

    match args.mode {
        Mode::Analyze => print!("{program}"),
        Mode::Ir => {
            let mut generator = ProgramGenerator::new(&program, TextBackend::new());
            generator.write().map_err(report)?;
            info!("Generation successful");
            print!("{}", generator.backend().render());
        }
        Mode::Object => write_object(&program, &args.input_file, args.output_file.as_deref())?,
        Mode::Parse => {}
    }

    Ok(())
}

/// `<Code> : <details>` for source errors, the full detail for internal ones
fn report(err: Error) -> Report {
    if err.is_internal() {
        miette!("Internal error: {err:?}")
    } else {
        miette!("{} : {err}", err.code())
    }
}

#[cfg(feature = "llvm")]
fn write_object(program: &DeepProgram, input: &Path, output: Option<&Path>) -> Result<()> {
    use inkwell::context::Context;
    use sable::codegen::llvm::LlvmBackend;
    use tracing::warn;

    let context = Context::create();
    let mut generator = ProgramGenerator::new(program, LlvmBackend::new(&context, "program"));
    generator.write().map_err(report)?;
    info!("Generation successful");

    let out = output.map_or_else(|| input.with_extension("o"), Path::to_path_buf);
    if out.exists() {
        warn!("{:?} already exists and will be overridden", &out);
    }

    generator
        .backend()
        .write_object_file(&out)
        .map_err(|message| miette!("Failed to write to file: {message}"))
}

#[cfg(not(feature = "llvm"))]
fn write_object(_program: &DeepProgram, _input: &Path, _output: Option<&Path>) -> Result<()> {
    bail!("object output requires building with the `llvm` feature")
}
