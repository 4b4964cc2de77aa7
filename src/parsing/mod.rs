//! Parsing
//!
//! This module is responsible for turning source text into syntactic types.
//! The main interface is [parse] which takes any byte source and yields one
//! [ast::SyntacticObjectType] per top-level type.
//!
//! Internally, parsing works in two phases:
//! - the [lexer] scans the source in chunks and turns it into a stream of tokens
//! - the [Parser] feeds these tokens through a stack of per-construct frames
//!
//! Both phases are lazy iterators and stop at the first error.

use std::io::Read;

use crate::error::Result;

pub mod ast;
mod declaration;
mod expression;
pub mod lexer;
mod modifier;
mod parser;

pub use lexer::{Lexer, Token, TokenKind};
pub use modifier::Modifier;
pub use parser::{IncrementalParser, Parser};

/// Lex and parse a source lazily
pub fn parse<R: Read>(source: R) -> Parser<Lexer<R>> {
    Parser::new(Lexer::new(source))
}

/// Parse a complete source text
pub fn parse_source(source: &str) -> Result<Vec<ast::SyntacticObjectType>> {
    parse(source.as_bytes()).collect()
}

/// Tokenize a complete source text
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    Lexer::new(source.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::ast::*;
    use super::*;
    use crate::Position;

    fn error_code(source: &str) -> String {
        parse_source(source).unwrap_err().code()
    }

    fn only_method_body(source: &str) -> Vec<Expression> {
        let types = parse_source(source).unwrap();
        match &types[0].members[0].body {
            Expression::Scope(scope) => scope.statements.clone(),
            other => panic!("expected scope, got {other:?}"),
        }
    }

    fn identifier(name: &str, line: usize, column: usize) -> Expression {
        Expression::Variable(VariableAccess {
            kind: VariableKind::Identifier,
            name: name.to_string(),
            position: Position::new(line, column),
        })
    }

    #[test]
    fn type_with_method() {
        let source = "class Program\n{\n    public static New Program(System system)\n    {\n    }\n}\n";
        let types = parse_source(source).unwrap();
        assert_eq!(types.len(), 1);

        let program = &types[0];
        assert_eq!(program.name, "Program");
        assert_eq!(program.modifiers, Modifier::CLASS);
        assert_eq!(program.position, Position::new(0, 6));

        let member = &program.members[0];
        assert_eq!(member.name, "New");
        assert_eq!(member.modifiers, Modifier::PUBLIC | Modifier::STATIC);
        assert_eq!(member.position, Position::new(2, 18));
        assert_eq!(
            member.declaration,
            TypeDeclaration {
                return_type: "Program".to_string(),
                parameters: Some(vec![ParameterDeclaration {
                    type_name: "System".to_string(),
                    name: "system".to_string(),
                    position: Position::new(2, 30),
                }]),
                type_parameters: None,
                position: Position::new(2, 22),
            }
        );
        assert_eq!(
            member.body,
            Expression::Scope(ScopeExpression {
                statements: vec![],
                position: Position::new(3, 4),
            })
        );
    }

    #[test]
    fn several_types_in_order() {
        let types = parse_source("class A {} class B {} #Primitive(\"void\"); class Void {}")
            .unwrap();
        let names: Vec<_> = types.iter().map(|ty| ty.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "Void"]);
        assert_eq!(types[2].metadata.len(), 1);
    }

    #[test]
    fn metadata_is_a_call_on_a_directive() {
        let types = parse_source("#Primitive(\"void\");\nclass Void {}").unwrap();
        let metadata = &types[0].metadata[0];
        assert_eq!(
            *metadata.callee,
            Expression::Variable(VariableAccess {
                kind: VariableKind::Directive,
                name: "Primitive".to_string(),
                position: Position::new(0, 0),
            })
        );
        assert_eq!(
            metadata.parameters,
            vec![Expression::Variable(VariableAccess {
                kind: VariableKind::StringLiteral,
                name: "void".to_string(),
                position: Position::new(0, 11),
            })]
        );
    }

    #[test]
    fn method_type_parameters() {
        let source = "class Program { public Initialize Void<ConsoleSystem Console>(System system) { } }";
        let types = parse_source(source).unwrap();
        let declaration = &types[0].members[0].declaration;

        let type_parameters: Vec<_> = declaration
            .type_parameters
            .iter()
            .flatten()
            .map(|param| (param.type_name.as_str(), param.name.as_str()))
            .collect();
        assert_eq!(type_parameters, vec![("ConsoleSystem", "Console")]);
        assert_eq!(declaration.parameters.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn member_access_call_chain() {
        let statements = only_method_body("class A { Run Void() { system.GetFileSystem().Open(x, \"y\"); } }");
        let Expression::Call(open) = &statements[0] else {
            panic!("expected call");
        };
        assert_eq!(open.parameters.len(), 2);
        assert_eq!(open.position, Position::new(0, 46));

        let Expression::Member(access) = open.callee.as_ref() else {
            panic!("expected member access");
        };
        assert_eq!(access.member, "Open");
        let Expression::Call(inner) = access.parent.as_ref() else {
            panic!("expected inner call");
        };
        let Expression::Member(get) = inner.callee.as_ref() else {
            panic!("expected member access");
        };
        assert_eq!(get.member, "GetFileSystem");
        assert_eq!(*get.parent, identifier("system", 0, 23));
    }

    #[test]
    fn assignments() {
        let statements = only_method_body("class A { Run Void() { a = b = c; f(x = y, z); } }");
        assert_eq!(
            statements[0],
            Expression::Assignment(AssignmentExpression {
                destination: Box::new(identifier("a", 0, 23)),
                source: Box::new(Expression::Assignment(AssignmentExpression {
                    destination: Box::new(identifier("b", 0, 27)),
                    source: Box::new(identifier("c", 0, 31)),
                    position: Position::new(0, 29),
                })),
                position: Position::new(0, 25),
            })
        );

        let Expression::Call(call) = &statements[1] else {
            panic!("expected call");
        };
        assert_eq!(call.parameters.len(), 2);
        assert!(matches!(call.parameters[0], Expression::Assignment(_)));
        assert_eq!(call.parameters[1], identifier("z", 0, 43));
    }

    #[test]
    fn type_arguments_on_calls() {
        let statements = only_method_body("class A { Run Void() { x.Init<Console>(s); } }");
        let Expression::Call(call) = &statements[0] else {
            panic!("expected call");
        };
        assert_eq!(call.type_parameters, vec![identifier("Console", 0, 30)]);
        assert_eq!(call.parameters, vec![identifier("s", 0, 39)]);
    }

    #[test]
    fn nested_scopes_and_directives() {
        let statements =
            only_method_body("class A { Run Void() { { #stderr_print(\"hi\"); } \"lit\"; } }");
        assert_eq!(statements.len(), 2);

        let Expression::Scope(inner) = &statements[0] else {
            panic!("expected scope");
        };
        let Expression::Call(call) = &inner.statements[0] else {
            panic!("expected call");
        };
        assert!(matches!(
            call.callee.as_ref(),
            Expression::Variable(VariableAccess {
                kind: VariableKind::Directive,
                ..
            })
        ));
    }

    #[test]
    fn properties() {
        let types = parse_source("class A { public Name String = \"a\"; }").unwrap();
        let member = &types[0].members[0];
        assert!(!member.is_method());
        assert!(matches!(member.body, Expression::Variable(_)));
    }

    #[test]
    fn declaration_errors() {
        let cases = [
            ("class A", "ParserUnexpectedEndOfInput"),
            ("class A { Run Void() { }", "ParserUnexpectedEndOfInput"),
            ("}", "ParserMismatchedClosingScopeAtRootLevel"),
            ("class {}", "ParserMissingNameInTypeDefinition"),
            ("class class A {}", "ParserDuplicateModifier"),
            ("class A B {}", "ParserTooManyIdentifiersOnType"),
            ("class A ; {}", "ParserIllegalCharacterInTypeDefinition"),
            ("class A { class Run Void() {} }", "ParserIllegalModifierOnMethod"),
            ("class A { public public Run Void() {} }", "ParserDuplicateModifier"),
            ("class A { Run Void static () {} }", "ParserModifierAfterTypeOnMember"),
            ("class A { Run Void Extra() {} }", "ParserTooManyIdentifiersOnMember"),
            ("class A { Run () {} }", "ParserParametersAppliedOnNonTypeOnMember"),
            ("class A { Run Void()() {} }", "ParserParametersAppliedMoreThanOnceOnMember"),
            ("class A { Run Void()<T t> {} }", "ParserTypeParameterListAfterParameterList"),
            ("class A { Run Void<T t><U u>() {} }", "ParserDuplicateTypeParameterDeclaration"),
            ("class A { Run Void {} }", "ParserMissingTypeInMemberDefinition"),
            ("class A { Run {} }", "ParserMemberWithoutReturnType"),
            ("class A { Run Void() = x; }", "ParserParametersAppliedOnNonMethodMember"),
            ("class A { public }", "ParserIncompleteMemberDefinition"),
            ("class A { Run Void(System) {} }", "ParserIncompleteParameterDeclaration"),
            ("class A { Run Void(System s x) {} }", "ParserTooManyIdentifiersInParameterDeclaration"),
            ("class A { Run Void(static System s) {} }", "ParserIllegalModifierOnParameter"),
            ("class A { Run Void(System s,) {} }", "ParserEmptyParameter"),
            ("class A { Run Void(System s> {} }", "ParserMismatchedParameterListTerminator"),
            ("class A { Run Void(System . s) {} }", "ParserIllegalCharacterInParameterDeclaration"),
            ("#Primitive; class A {}", "ParserCompilerDirectiveIsNotCallExpression"),
            ("#Primitive(\"void\").x; class A {}", "ParserCompilerMetadataIsNotCallExpression"),
        ];

        for (source, code) in cases {
            assert_eq!(error_code(source), code, "source: {source}");
        }
    }

    #[test]
    fn statement_errors() {
        let cases = [
            (";", "ParserEmptyStatement"),
            ("= x;", "ParserAssignmentOperatorWithoutTarget"),
            ("a = ;", "ParserNullStatement"),
            ("a b;", "ParserIdentifiersNotSeparatedByOperator"),
            ("a \"b\";", "ParserIllegalOperatorInStatement"),
            ("a };", "ParserIllegalOperatorInStatement"),
            ("a ) ;", "ParserIllegalOperatorInStatement"),
            ("a #b;", "ParserIllegalOperatorInStatement"),
            (".a;", "ParserAccessMemberOperatorOnNullStatement"),
            ("a..b;", "ParserMultipleContiguousOperators"),
            ("a.;", "ParserDanglingOperator"),
            ("(a);", "ParserOpeningParenthesisOnNullStatement"),
            ("f(a, = b);", "ParserAssignationIntoNullStatement"),
            ("f(a,);", "ParserEmptyParameter"),
            ("f(,a);", "ParserEmptyParameter"),
            ("f(a;", "ParserUnclosedParameterList"),
            ("f(a>;", "ParserMismatchedParameterListTerminator"),
            ("f<a);", "ParserMismatchedParameterListTerminator"),
            ("f<A>;", "ParserTypeParametersWithoutCall"),
            ("f<A><B>(x);", "ParserTypeParametersAppliedMoreThanOnce"),
            ("#;", "ParserCompilerDirectiveWithoutName"),
            ("#stderr_print;", "ParserCompilerDirectiveIsNotCallExpression"),
            ("#stderr_print.x;", "ParserCompilerDirectiveIsNotCallExpression"),
            ("public x;", "ParserIllegalModifierOnStatement"),
        ];

        for (statement, code) in cases {
            let source = format!("class A {{ Run Void() {{ {statement} }} }}");
            assert_eq!(error_code(&source), code, "statement: {statement}");
        }
    }

    #[test]
    fn parsing_stops_after_first_error() {
        let mut types = parse("class A {} } class B {}".as_bytes());
        assert_eq!(types.next().unwrap().unwrap().name, "A");
        assert!(types.next().unwrap().is_err());
        assert!(types.next().is_none());
    }

    #[test]
    fn lexer_errors_pass_through() {
        assert_eq!(error_code("class A { $ }"), "LexerIllegalCharacter");
    }
}
