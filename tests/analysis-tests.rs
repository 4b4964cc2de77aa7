use pretty_assertions::assert_eq;

use sable::analysis::{DeepExpression, ValueType};
use sable::analyze_source;

#[test]
fn analyze_mode_listing() {
    let program = analyze_source(
        "class Program { public static Make Program(String text) { Program.new(); } }",
        "Program",
    )
    .unwrap();

    assert_eq!(
        program.to_string(),
        "class Void (primitive void)\n    public static new Void()\n\
         class String\n    public static new String()\n\
         class Program\n    public static new Program()\n    public static Make Program(String)\n"
    );
}

#[test]
fn entry_can_be_chosen() {
    let program = analyze_source("class Main { }", "Main").unwrap();
    assert_eq!(program.surface().name(program.entry()).as_str(), "Main");
    assert_eq!(
        analyze_source("class Main { }", "Program").unwrap_err().code(),
        "AnalyzerSoughtTypeDoesNotExist"
    );
}

#[test]
fn types_may_be_used_before_declaration() {
    let program = analyze_source(
        "class Program { Run Later(Later l) { l; } }
         class Later { }",
        "Program",
    )
    .unwrap();
    let later = program.surface().find("Later").unwrap();
    let run = program
        .get(program.entry())
        .unwrap()
        .members_named("Run")
        .next()
        .unwrap();
    assert_eq!(run.body.value_type(), ValueType::Object(later));
}

#[test]
fn duplicated_prelude_type() {
    assert_eq!(
        analyze_source("class Void { } class Program { }", "Program")
            .unwrap_err()
            .code(),
        "AnalyzerMultipleTypesWithTheSameName"
    );
}

#[test]
fn method_values_are_not_objects() {
    let err = analyze_source(
        "class Program { Run Void(String a) { a = Program.Run; } }",
        "Program",
    )
    .unwrap_err();
    assert_eq!(err.code(), "AnalyzerAssignationSourceIncompatibleWithDestination");
}

#[test]
fn discarding_into_void() {
    let program = analyze_source(
        "class Program { Run Void(String a) { a; } }",
        "Program",
    )
    .unwrap();
    let run = program
        .get(program.entry())
        .unwrap()
        .members_named("Run")
        .next()
        .unwrap();
    let DeepExpression::Scope { ty, .. } = &run.body else {
        panic!("expected scope");
    };
    assert_eq!(*ty, program.surface().string().unwrap());
}
