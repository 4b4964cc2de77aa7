#![allow(dead_code)]

pub const ENTRY: &str = "Program";

/// Runs the whole pipeline, panicking with the error code on failure
pub fn run_pipeline(src: &str) -> String {
    match sable::compile_source(src, ENTRY) {
        Ok(ir) => ir,
        Err(err) => panic!("{}", err.code()),
    }
}

pub fn error_code(src: &str) -> String {
    sable::compile_source(src, ENTRY).unwrap_err().code()
}

/// The defined function names, in output order
pub fn definitions(ir: &str) -> Vec<&str> {
    ir.lines()
        .filter_map(|line| line.strip_prefix("define "))
        .filter_map(|line| line.split_once('@'))
        .filter_map(|(_, rest)| rest.split_once('('))
        .map(|(name, _)| name)
        .collect()
}
