//! Semantic analysis
//!
//! Analysis runs in two phases:
//! - [surface] registers all types and member signatures and resolves type references
//! - [deep] checks every method body against those signatures
//!
//! Splitting the phases lets method bodies use types declared anywhere in the stream.

pub mod builtin;
pub mod deep;
pub mod scope;
pub mod surface;

pub use deep::{DeepAnalyzer, DeepExpression, DeepProgram, Member, ObjectType, ValueType};
pub use surface::{
    SurfaceAnalyzer, SurfaceCallableType, SurfaceObjectType, SurfaceProgram, TypeId,
    TypeReference,
};

use crate::error::Result;
use crate::parsing::ast::SyntacticObjectType;

/// Run both phases over a stream of syntactic types
pub fn analyze<I>(types: I, entry: &str) -> Result<DeepProgram>
where
    I: IntoIterator<Item = Result<SyntacticObjectType>>,
{
    let surface = SurfaceAnalyzer::analyze(types)?;
    DeepAnalyzer::analyze(surface, entry)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parsing::parse;
    use crate::PRELUDE;

    const SYSTEM: &str = "class System { public GetFileSystem Program() { Program.new(); } }";

    fn analyze_with(prelude: &str, source: &str) -> Result<DeepProgram> {
        analyze(
            parse(prelude.as_bytes()).chain(parse(source.as_bytes())),
            "Program",
        )
    }

    fn error_code(body: &str) -> String {
        let source = format!(
            "class Program {{ public static Run Void(System system, String text) {{ {body} }} }}"
        );
        analyze_with(&format!("{PRELUDE}\n{SYSTEM}"), &source)
            .unwrap_err()
            .code()
    }

    fn body_of<'a>(program: &'a DeepProgram, ty: &str, member: &'a str) -> &'a DeepExpression {
        let id = program.surface().find(ty).unwrap();
        &program
            .get(id)
            .unwrap()
            .members_named(member)
            .next()
            .unwrap()
            .body
    }

    #[test]
    fn constructor_is_synthesized_everywhere() {
        let program = analyze_with(PRELUDE, "class Program { }").unwrap();
        for ty in program.types() {
            let new = &ty.members[0];
            assert_eq!(new.name, "new");
            assert!(new.is_public && new.is_static);
            assert_eq!(
                program.surface().resolve(&new.signature.return_type).unwrap(),
                ty.id
            );
            assert_eq!(new.body, DeepExpression::New(ty.id));
        }
    }

    #[test]
    fn missing_entry_type() {
        let err = analyze_with(PRELUDE, "class Other { }").unwrap_err();
        assert_eq!(err.code(), "AnalyzerSoughtTypeDoesNotExist");
    }

    #[test]
    fn missing_basic_types_are_internal() {
        let err = analyze_with("class String { }", "class Program { }").unwrap_err();
        assert_eq!(err.code(), "InternalErrorAnalyzerMissingBasicType");
        assert!(err.is_internal());
    }

    #[test]
    fn directive_call_on_string_literal() {
        let program = analyze_with(
            PRELUDE,
            "class System { }
             class ConsoleSystem { }
             class Program { public Initialize Void<ConsoleSystem Console>(System system) { #stderr_print(\"Test Output\"); } }",
        )
        .unwrap();

        let DeepExpression::Scope { statements, ty } = body_of(&program, "Program", "Initialize")
        else {
            panic!("expected scope");
        };
        assert_eq!(*ty, program.surface().void().unwrap());

        let DeepExpression::Call { target, arguments, .. } = &statements[0] else {
            panic!("expected call");
        };
        assert!(matches!(
            target.as_ref(),
            DeepExpression::ReadBackbone(builtin::BackboneFunction::StderrPrint, _)
        ));
        assert_eq!(
            arguments[0],
            DeepExpression::ReadLiteral {
                value: "Test Output".to_string(),
                ty: program.surface().string().unwrap(),
            }
        );
    }

    #[test]
    fn scope_type_is_last_statement() {
        let program = analyze_with(
            PRELUDE,
            "class Program { public Make Program(String s) { s; Program.new(); } }",
        )
        .unwrap();
        let DeepExpression::Scope { ty, statements } = body_of(&program, "Program", "Make") else {
            panic!("expected scope");
        };
        assert_eq!(*ty, program.entry());
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn assignment_to_parameter() {
        let program = analyze_with(
            PRELUDE,
            "class Program { public Swap Void(String a, String b) { a = b; } }",
        )
        .unwrap();
        let DeepExpression::Scope { statements, .. } = body_of(&program, "Program", "Swap") else {
            panic!("expected scope");
        };
        assert!(matches!(
            &statements[0],
            DeepExpression::Assignment { variable, .. } if variable == "a"
        ));
    }

    #[test]
    fn callable_assignment_checks_return_type() {
        let program = analyze_with(
            PRELUDE,
            "class Program {
                 Make Program() { Program.new(); }
                 Run Void() { new = Program.Make; new(); }
             }",
        )
        .unwrap();
        let DeepExpression::Scope { statements, .. } = body_of(&program, "Program", "Run") else {
            panic!("expected scope");
        };
        assert!(matches!(
            &statements[0],
            DeepExpression::Assignment { variable, .. } if variable == "new"
        ));

        let err = analyze_with(
            PRELUDE,
            "class Program {
                 Other Void() { }
                 Run Void() { new = Program.Other; new(); }
             }",
        )
        .unwrap_err();
        assert_eq!(err.code(), "AnalyzerAssignationSourceIncompatibleWithDestination");
    }

    #[test]
    fn return_type_must_match_body() {
        let err = analyze_with(PRELUDE, "class Program { Make Program(String s) { s; } }")
            .unwrap_err();
        assert_eq!(
            err.code(),
            "AnalyzerMethodImplementationReturnTypeIncompatibleWithDeclaration"
        );
    }

    #[test]
    fn properties_are_not_implemented() {
        let err = analyze_with(PRELUDE, "class Program { Name String = \"x\"; }").unwrap_err();
        assert_eq!(err.code(), "AnalyzerPropertyNotImplemented");
    }

    #[test]
    fn body_errors() {
        let cases = [
            ("#unknown(text);", "AnalyzerUnknownDirective"),
            ("missing;", "AnalyzerUnresolvedVariable"),
            ("system.Absent();", "AnalyzerAttemptedAccessToNonUndefinedMember"),
            ("system.GetFileSystem.x;", "AnalyzerAttemptedAccessToMemberOfAMethod"),
            ("\"text\"();", "AnalyzerCallableIsNotAMember"),
            ("system();", "AnalyzerCallableIsNotAMethod"),
            ("#stderr_print(system.GetFileSystem);", "AnalyzerMethodParameterReturnsAMethod"),
            ("#stderr_print(system);", "AnalyzerMethodCallParametersDoNotMatchMethodDeclaration"),
            ("#stderr_print(text, text);", "AnalyzerMethodCallParametersDoNotMatchMethodDeclaration"),
            ("#stderr_print<\"x\">(text);", "AnalyzerTypeArgumentIsNotAType"),
            ("#stderr_print<String>(text);", "AnalyzerMethodCallParametersDoNotMatchMethodDeclaration"),
            ("system.GetFileSystem = text;", "AnalyzerAssignationDestinationMustBeAVariable"),
            ("other = text;", "AnalyzerAssignationDestinationVariableMustExist"),
            ("text = system;", "AnalyzerAssignationSourceIncompatibleWithDestination"),
            ("system.GetFileSystem;", "AnalyzerMethodReturnsAMethod"),
        ];

        for (body, code) in cases {
            assert_eq!(error_code(body), code, "body: {body}");
        }
    }

    #[test]
    fn overloaded_members_cannot_be_accessed() {
        let err = analyze_with(
            PRELUDE,
            "class Program {
                 Run Void() { Program.Print(); }
                 Print Void() { }
                 Print Void(String s) { }
             }",
        )
        .unwrap_err();
        assert_eq!(err.code(), "AnalyzerAttemptedAccessToOverloadedMember");
    }

    #[test]
    fn end_to_end_scenario() {
        let source = "class Program {
    public static New Program(System system) {
        system.GetFileSystem();
    }
}";
        let program = analyze_with(&format!("{PRELUDE}\n{SYSTEM}"), source).unwrap();
        let DeepExpression::Scope { statements, .. } = body_of(&program, "Program", "New") else {
            panic!("expected scope");
        };
        let DeepExpression::Call { target, .. } = &statements[0] else {
            panic!("expected call");
        };
        let DeepExpression::ReadMember { owner, member, .. } = target.as_ref() else {
            panic!("expected member read");
        };
        assert_eq!(member, "GetFileSystem");
        assert_eq!(*owner, program.surface().find("System").unwrap());

        let err = analyze_with(&format!("{PRELUDE}\nclass System {{ }}"), source).unwrap_err();
        assert_eq!(err.code(), "AnalyzerAttemptedAccessToNonUndefinedMember");
    }
}
