//! Errors
//!
//! Every stage reports failures through [Error]. The outer type separates two families:
//! - [SourceError]: something is wrong with the compiled source, split per stage
//! - [InternalError]: an invariant of the pipeline itself was violated
//!
//! Each variant carries a stable code (see [miette::Diagnostic::code]) which the command
//! line prints in front of the details.

use std::io;

use miette::Diagnostic;
use thiserror::Error;

use crate::parsing::Modifier;
use crate::Position;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Internal(#[from] InternalError),
}

impl Error {
    /// The stable error code, e.g. `ParserEmptyStatement`
    pub fn code(&self) -> String {
        Diagnostic::code(self)
            .map(|code| code.to_string())
            .unwrap_or_default()
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Error::Internal(_))
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum SourceError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Analyze(#[from] AnalyzeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Generate(#[from] GenerateError),
}

macro_rules! stage_into_error {
    ($($stage:ident),* $(,)?) => {
        $(
            impl From<$stage> for Error {
                fn from(err: $stage) -> Self {
                    Error::Source(SourceError::from(err))
                }
            }
        )*
    };
}

stage_into_error!(LexError, ParseError, AnalyzeError, GenerateError);

#[derive(Debug, Error, Diagnostic)]
pub enum LexError {
    #[error("illegal character {character:?} at {position}")]
    #[diagnostic(code(LexerIllegalCharacter))]
    IllegalCharacter { character: char, position: Position },

    #[error("the string literal opened at {position} is never closed")]
    #[diagnostic(code(LexerUnterminatedStringLiteral))]
    UnterminatedStringLiteral { position: Position },

    #[error("the source is not valid UTF-8 after {position}")]
    #[diagnostic(code(LexerInvalidEncoding))]
    InvalidEncoding { position: Position },

    #[error("the source could not be read")]
    #[diagnostic(code(LexerSourceUnreadable))]
    SourceUnreadable {
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("the modifier {modifier} is applied more than once at {position}")]
    #[diagnostic(code(ParserDuplicateModifier))]
    DuplicateModifier { modifier: Modifier, position: Position },

    #[error("character {token} at {position} is illegal in type definition")]
    #[diagnostic(code(ParserIllegalCharacterInTypeDefinition))]
    IllegalCharacterInTypeDefinition { token: String, position: Position },

    #[error("mismatched closing scope character '}}' on file root at {position}")]
    #[diagnostic(code(ParserMismatchedClosingScopeAtRootLevel))]
    MismatchedClosingScopeAtRootLevel { position: Position },

    #[error("missing name in type definition at {position}")]
    #[diagnostic(code(ParserMissingNameInTypeDefinition))]
    MissingNameInTypeDefinition { position: Position },

    #[error("token {token} at {position} follows the type name {name}")]
    #[diagnostic(code(ParserTooManyIdentifiersOnType))]
    TooManyIdentifiersOnType {
        token: String,
        name: String,
        position: Position,
    },

    #[error("the modifier {modifier} is illegal on a member at {position}")]
    #[diagnostic(code(ParserIllegalModifierOnMethod))]
    IllegalModifierOnMethod { modifier: Modifier, position: Position },

    #[error("the modifier {modifier} is illegal inside a statement at {position}")]
    #[diagnostic(code(ParserIllegalModifierOnStatement))]
    IllegalModifierOnStatement { modifier: Modifier, position: Position },

    #[error("the modifier {modifier} is illegal on a parameter at {position}")]
    #[diagnostic(code(ParserIllegalModifierOnParameter))]
    IllegalModifierOnParameter { modifier: Modifier, position: Position },

    #[error("token {token} at {position} was found after member name {name} and return type {return_type}")]
    #[diagnostic(code(ParserTooManyIdentifiersOnMember))]
    TooManyIdentifiersOnMember {
        token: String,
        name: String,
        return_type: String,
        position: Position,
    },

    #[error("modifier {modifier} at {position} should be placed before parameters")]
    #[diagnostic(code(ParserModifierAfterTypeOnMember))]
    ModifierAfterTypeOnMember { modifier: Modifier, position: Position },

    #[error("token {token} at {position} opens a parameter definition, but is not preceded by a type name")]
    #[diagnostic(code(ParserParametersAppliedOnNonTypeOnMember))]
    ParametersAppliedOnNonTypeOnMember { token: String, position: Position },

    #[error("non method members cannot have a parameterized type at {position}")]
    #[diagnostic(code(ParserParametersAppliedOnNonMethodMember))]
    ParametersAppliedOnNonMethodMember { position: Position },

    #[error("missing name in member definition at {position}")]
    #[diagnostic(code(ParserMissingNameInMemberDefinition))]
    MissingNameInMemberDefinition { position: Position },

    #[error("missing return type name in member definition at {position}")]
    #[diagnostic(code(ParserMemberWithoutReturnType))]
    MemberWithoutReturnType { position: Position },

    #[error("missing parameter declaration in method definition at {position}")]
    #[diagnostic(
        code(ParserMissingTypeInMemberDefinition),
        help("methods declare their parameters, even when empty: `Name Type() {{ ... }}`")
    )]
    MissingTypeInMemberDefinition { position: Position },

    #[error("token ( at {position} opens a parameter definition, but one was declared previously on this member")]
    #[diagnostic(code(ParserParametersAppliedMoreThanOnceOnMember))]
    ParametersAppliedMoreThanOnceOnMember { position: Position },

    #[error("token < at {position} opens a type parameter definition after the parameter definition")]
    #[diagnostic(code(ParserTypeParameterListAfterParameterList))]
    TypeParameterListAfterParameterList { position: Position },

    #[error("token < at {position} opens a type parameter definition, but one was declared previously on this member")]
    #[diagnostic(code(ParserDuplicateTypeParameterDeclaration))]
    DuplicateTypeParameterDeclaration { position: Position },

    #[error("the member declared before {position} is incomplete")]
    #[diagnostic(code(ParserIncompleteMemberDefinition))]
    IncompleteMemberDefinition { position: Position },

    #[error("the parameter declaration ending at {position} needs a type and a name")]
    #[diagnostic(code(ParserIncompleteParameterDeclaration))]
    IncompleteParameterDeclaration { position: Position },

    #[error("token {token} at {position} follows a complete parameter declaration")]
    #[diagnostic(code(ParserTooManyIdentifiersInParameterDeclaration))]
    TooManyIdentifiersInParameterDeclaration { token: String, position: Position },

    #[error("character {token} at {position} is illegal in a parameter declaration")]
    #[diagnostic(code(ParserIllegalCharacterInParameterDeclaration))]
    IllegalCharacterInParameterDeclaration { token: String, position: Position },

    #[error("the list at {position} must be closed by {expected}, but found {found}")]
    #[diagnostic(code(ParserMismatchedParameterListTerminator))]
    MismatchedParameterListTerminator {
        expected: &'static str,
        found: String,
        position: Position,
    },

    #[error("an empty statement was found at {position}")]
    #[diagnostic(code(ParserEmptyStatement))]
    EmptyStatement { position: Position },

    #[error("an assignment operator without an assignment target was found at {position}")]
    #[diagnostic(code(ParserAssignmentOperatorWithoutTarget))]
    AssignmentOperatorWithoutTarget { position: Position },

    #[error("the token at {position} closes an empty expression")]
    #[diagnostic(code(ParserNullStatement))]
    NullStatement { position: Position },

    #[error("the token at {position} opens a parameter list without a previous expression to call")]
    #[diagnostic(code(ParserOpeningParenthesisOnNullStatement))]
    OpeningParenthesisOnNullStatement { position: Position },

    #[error("the token at {position} assigns to an empty destination expression")]
    #[diagnostic(code(ParserAssignationIntoNullStatement))]
    AssignationIntoNullStatement { position: Position },

    #[error("the operator at {position} follows another operator")]
    #[diagnostic(code(ParserMultipleContiguousOperators))]
    MultipleContiguousOperators { position: Position },

    #[error("the member access operator at {position} has no expression on its left")]
    #[diagnostic(code(ParserAccessMemberOperatorOnNullStatement))]
    AccessMemberOperatorOnNullStatement { position: Position },

    #[error("the member access operator before {position} is not followed by a member name")]
    #[diagnostic(code(ParserDanglingOperator))]
    DanglingOperator { position: Position },

    #[error("the identifier {token} at {position} follows an expression without an operator")]
    #[diagnostic(code(ParserIdentifiersNotSeparatedByOperator))]
    IdentifiersNotSeparatedByOperator { token: String, position: Position },

    #[error("the token {token} at {position} is illegal where an operator is expected")]
    #[diagnostic(code(ParserIllegalOperatorInStatement))]
    IllegalOperatorInStatement { token: String, position: Position },

    #[error("the parameter list at {position} contains an empty parameter")]
    #[diagnostic(code(ParserEmptyParameter))]
    EmptyParameter { position: Position },

    #[error("the parameter list is still open when the statement ends at {position}")]
    #[diagnostic(code(ParserUnclosedParameterList))]
    UnclosedParameterList { position: Position },

    #[error("the compiler directive marker at {position} is not followed by a name")]
    #[diagnostic(code(ParserCompilerDirectiveWithoutName))]
    CompilerDirectiveWithoutName { position: Position },

    #[error("the compiler directive {name} at {position} must be called")]
    #[diagnostic(code(ParserCompilerDirectiveIsNotCallExpression))]
    CompilerDirectiveIsNotCallExpression { name: String, position: Position },

    #[error("the compiler metadata at {position} does not have the #Name(literal, ...); format")]
    #[diagnostic(code(ParserCompilerMetadataIsNotCallExpression))]
    CompilerMetadataIsNotCallExpression { position: Position },

    #[error("the type parameters at {position} are not followed by a parameter list")]
    #[diagnostic(code(ParserTypeParametersWithoutCall))]
    TypeParametersWithoutCall { position: Position },

    #[error("the type parameter list at {position} is applied more than once")]
    #[diagnostic(code(ParserTypeParametersAppliedMoreThanOnce))]
    TypeParametersAppliedMoreThanOnce { position: Position },

    #[error("the source ended at {position} while a declaration was still open")]
    #[diagnostic(code(ParserUnexpectedEndOfInput))]
    UnexpectedEndOfInput { position: Position },
}

#[derive(Debug, Error, Diagnostic)]
pub enum AnalyzeError {
    #[error("a type of name {name} was found at {position}, but had already been found before")]
    #[diagnostic(code(AnalyzerMultipleTypesWithTheSameName))]
    MultipleTypesWithTheSameName { name: String, position: Position },

    #[error("the type {name} at {position} does not have the class modifier")]
    #[diagnostic(code(AnalyzerNoCategoryModifierOnType))]
    NoCategoryModifierOnType { name: String, position: Position },

    #[error("the type {name} at {position} has the illegal {modifier} modifier")]
    #[diagnostic(code(AnalyzerInvalidModifierOnType))]
    InvalidModifierOnType {
        name: String,
        modifier: Modifier,
        position: Position,
    },

    #[error("the member {name} at {position} has the illegal {modifier} modifier")]
    #[diagnostic(code(AnalyzerInvalidModifierOnMember))]
    InvalidModifierOnMember {
        name: String,
        modifier: Modifier,
        position: Position,
    },

    #[error("the member new at {position} on {type_name} collides with the constructor")]
    #[diagnostic(code(AnalyzerConstructorRedefined))]
    ConstructorRedefined { type_name: String, position: Position },

    #[error("the primitive compiler metadata at {position} has an invalid number of parameters")]
    #[diagnostic(code(AnalyzerPrimitiveCompilerMetadataInvalidParameters))]
    PrimitiveCompilerMetadataInvalidParameters { position: Position },

    #[error("the primitive compiler metadata at {position} must have a single string literal parameter")]
    #[diagnostic(code(AnalyzerPrimitiveCompilerMetadataParameterIsNotStringLiteral))]
    PrimitiveCompilerMetadataParameterIsNotStringLiteral { position: Position },

    #[error("the primitive compiler metadata at {position} declared unknown primitive type {primitive}")]
    #[diagnostic(code(AnalyzerPrimitiveCompilerMetadataUnknownPrimitiveType))]
    PrimitiveCompilerMetadataUnknownPrimitiveType { primitive: String, position: Position },

    #[error("the compiler metadata {name} at {position} is unrecognized")]
    #[diagnostic(code(AnalyzerUnknownCompilerMetadata))]
    UnknownCompilerMetadata { name: String, position: Position },

    #[error("the compiler metadata on {type_name} at {position} does not have a valid #Name(literal, ...); format")]
    #[diagnostic(code(AnalyzerCompilerMetadataExpressionInvalid))]
    CompilerMetadataExpressionInvalid { type_name: String, position: Position },

    #[error("the type {name} at {position} could not be resolved to a declared type")]
    #[diagnostic(code(AnalyzerUnresolvedReference))]
    UnresolvedReference { name: String, position: Position },

    #[error("the sought type {name} was not found")]
    #[diagnostic(code(AnalyzerSoughtTypeDoesNotExist))]
    SoughtTypeDoesNotExist { name: String },

    #[error("the property {name} at {position} cannot be analyzed, properties are not implemented")]
    #[diagnostic(code(AnalyzerPropertyNotImplemented))]
    PropertyNotImplemented { name: String, position: Position },

    #[error("the method {member} at {position} declares return type {declared} which is incompatible with its implementation's {actual} return type")]
    #[diagnostic(code(AnalyzerMethodImplementationReturnTypeIncompatibleWithDeclaration))]
    MethodImplementationReturnTypeIncompatibleWithDeclaration {
        member: String,
        declared: String,
        actual: String,
        position: Position,
    },

    #[error("the scope at {position} cannot return a method itself")]
    #[diagnostic(code(AnalyzerMethodReturnsAMethod))]
    MethodReturnsAMethod { position: Position },

    #[error("the compiler directive {name} at {position} is unknown")]
    #[diagnostic(code(AnalyzerUnknownDirective))]
    UnknownDirective { name: String, position: Position },

    #[error("the variable {name} referenced at {position} does not exist")]
    #[diagnostic(code(AnalyzerUnresolvedVariable))]
    UnresolvedVariable { name: String, position: Position },

    #[error("there is no member {member} to access on a method at {position}")]
    #[diagnostic(code(AnalyzerAttemptedAccessToMemberOfAMethod))]
    AttemptedAccessToMemberOfAMethod { member: String, position: Position },

    #[error("there is no member named {member} on object type {type_name} referenced at {position}")]
    #[diagnostic(code(AnalyzerAttemptedAccessToNonUndefinedMember))]
    AttemptedAccessToNonUndefinedMember {
        member: String,
        type_name: String,
        position: Position,
    },

    #[error("there are multiple members named {member} on object type {type_name} referenced at {position}")]
    #[diagnostic(
        code(AnalyzerAttemptedAccessToOverloadedMember),
        help("overload resolution is not supported, give the members distinct names")
    )]
    AttemptedAccessToOverloadedMember {
        member: String,
        type_name: String,
        position: Position,
    },

    #[error("the method call at {position} must be made on a member or a variable")]
    #[diagnostic(code(AnalyzerCallableIsNotAMember))]
    CallableIsNotAMember { position: Position },

    #[error("the method call at {position} is made on a {type_name} which is not a method")]
    #[diagnostic(code(AnalyzerCallableIsNotAMethod))]
    CallableIsNotAMethod { type_name: String, position: Position },

    #[error("the method call parameter at {position} is a method, it should be a value")]
    #[diagnostic(code(AnalyzerMethodParameterReturnsAMethod))]
    MethodParameterReturnsAMethod { position: Position },

    #[error("the method call at {position} is made using a parameter list ({actual}) which does not match the method declaration ({declared})")]
    #[diagnostic(code(AnalyzerMethodCallParametersDoNotMatchMethodDeclaration))]
    MethodCallParametersDoNotMatchMethodDeclaration {
        actual: String,
        declared: String,
        position: Position,
    },

    #[error("the type parameter at {position} does not name a type")]
    #[diagnostic(code(AnalyzerTypeArgumentIsNotAType))]
    TypeArgumentIsNotAType { position: Position },

    #[error("the destination of the assignation at {position} is not a variable")]
    #[diagnostic(code(AnalyzerAssignationDestinationMustBeAVariable))]
    AssignationDestinationMustBeAVariable { position: Position },

    #[error("the destination variable {name} of the assignation at {position} does not exist")]
    #[diagnostic(code(AnalyzerAssignationDestinationVariableMustExist))]
    AssignationDestinationVariableMustExist { name: String, position: Position },

    #[error("the value assigned to {name} at {position} is incompatible with the variable's type")]
    #[diagnostic(code(AnalyzerAssignationSourceIncompatibleWithDestination))]
    AssignationSourceIncompatibleWithDestination { name: String, position: Position },
}

#[derive(Debug, Error, Diagnostic)]
pub enum GenerateError {
    #[error("several members are generated under the symbol {name}")]
    #[diagnostic(
        code(GeneratorMangledNameCollision),
        help("members sharing a name must differ in their parameter types")
    )]
    MangledNameCollision { name: String },
}

/// Broken invariants of the pipeline, never caused by the compiled source alone
#[derive(Debug, Error, Diagnostic)]
pub enum InternalError {
    #[error("the parser was already completed and cannot be reused for the token at {position}")]
    #[diagnostic(code(InternalErrorParserAttemptingToReuseCompletedTypeParser))]
    ParserAttemptingToReuseCompletedTypeParser { position: Position },

    #[error("the {frame} parser received a node it never requested at {position}")]
    #[diagnostic(code(InternalErrorParserUnexpectedNode))]
    ParserUnexpectedNode { frame: &'static str, position: Position },

    #[error("unresolved reference to {name} was found after the analysis phase")]
    #[diagnostic(code(InternalErrorAnalyzerUnresolvedReferenceAfterAnalysis))]
    AnalyzerUnresolvedReferenceAfterAnalysis { name: String },

    #[error("the basic type {name} is not defined")]
    #[diagnostic(code(InternalErrorAnalyzerMissingBasicType))]
    AnalyzerMissingBasicType { name: String },

    #[error("the surface type {name} has skipped deep analysis")]
    #[diagnostic(code(InternalErrorAnalyzerSurfaceTypeWasNotDeepAnalyzed))]
    AnalyzerSurfaceTypeWasNotDeepAnalyzed { name: String },

    #[error("type was generated multiple times: {name}")]
    #[diagnostic(code(InternalErrorGeneratorTypeGeneratedMultipleTimes))]
    GeneratorTypeGeneratedMultipleTimes { name: String },

    #[error("the generator has already been used and cannot be reused")]
    #[diagnostic(code(InternalErrorGeneratorIsReused))]
    GeneratorIsReused,

    #[error("no entry point function was generated for {name}")]
    #[diagnostic(code(InternalErrorGeneratorMissingEntryPoint))]
    GeneratorMissingEntryPoint { name: String },

    #[error("the function {name} is used before it was declared")]
    #[diagnostic(code(InternalErrorGeneratorUndeclaredFunction))]
    GeneratorUndeclaredFunction { name: String },

    #[error("the variable {name} has no generated value")]
    #[diagnostic(code(InternalErrorGeneratorUnboundVariable))]
    GeneratorUnboundVariable { name: String },

    #[error("backend verification failed with message: {message}")]
    #[diagnostic(code(InternalErrorGeneratorVerifierFailed))]
    GeneratorVerifierFailed { message: String },

    #[error("the backend rejected an instruction: {message}")]
    #[diagnostic(code(InternalErrorGeneratorBackendFailure))]
    GeneratorBackendFailure { message: String },

    #[error("unknown type class: {detail}")]
    #[diagnostic(code(InternalErrorUnknownTypeClass))]
    UnknownTypeClass { detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_the_stage() {
        let err: Error = ParseError::EmptyStatement {
            position: Position::new(2, 4),
        }
        .into();
        assert_eq!(err.code(), "ParserEmptyStatement");
        assert_eq!(err.to_string(), "an empty statement was found at 2:4");
        assert!(!err.is_internal());

        let err: Error = InternalError::GeneratorIsReused.into();
        assert_eq!(err.code(), "InternalErrorGeneratorIsReused");
        assert!(err.is_internal());
    }
}
