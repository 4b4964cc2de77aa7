//! Surface analysis
//!
//! Registers every type with its member signatures before any method body is looked at,
//! so bodies may refer to types declared further down the stream. References are plain
//! names until the [SurfaceProgram] is sealed; only then can they be resolved.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::error::{AnalyzeError, InternalError, Result};
use crate::parsing::ast::{
    CallExpression, Expression, ParameterDeclaration, SyntacticMember, SyntacticObjectType,
    VariableKind,
};
use crate::parsing::Modifier;
use crate::{Position, QualifiedName};

/// Name of the constructor synthesized on every type
pub const CONSTRUCTOR: &str = "new";

/// Index of a type in the [SurfaceProgram] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(usize);

impl TypeId {
    pub fn index(self) -> usize {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }
}

/// A type named in source, resolvable only through [SurfaceProgram::resolve]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeReference {
    pub name: QualifiedName,
    pub position: Position,
}

impl fmt::Display for TypeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Void,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceParameter {
    pub name: String,
    pub ty: TypeReference,
}

/// The type of a method, compared by shape only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceCallableType {
    pub return_type: TypeReference,
    pub parameters: Vec<SurfaceParameter>,
    pub type_parameters: Vec<SurfaceParameter>,
}

impl SurfaceCallableType {
    /// Whether a callable of this shape can stand in where `destination` is expected
    ///
    /// Parameter names and return types never matter: arities must agree and every
    /// parameter and type parameter must be assignable pairwise.
    pub fn is_assignable_to(
        &self,
        destination: &SurfaceCallableType,
        program: &SurfaceProgram,
    ) -> Result<bool> {
        if self.parameters.len() != destination.parameters.len()
            || self.type_parameters.len() != destination.type_parameters.len()
        {
            return Ok(false);
        }

        let pairs = self
            .parameters
            .iter()
            .zip(&destination.parameters)
            .chain(self.type_parameters.iter().zip(&destination.type_parameters))
            .map(|(source, destination)| (&source.ty, &destination.ty));

        for (source, destination) in pairs {
            let source = program.resolve(source)?;
            let destination = program.resolve(destination)?;
            if !program.is_assignable(source, destination) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl fmt::Display for SurfaceCallableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.return_type)?;
        if !self.type_parameters.is_empty() {
            write!(f, "<{}>", join(&self.type_parameters))?;
        }
        write!(f, "({})", join(&self.parameters))
    }
}

fn join(parameters: &[SurfaceParameter]) -> String {
    parameters
        .iter()
        .map(|param| param.ty.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceSignature {
    Callable(SurfaceCallableType),
    Property(TypeReference),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceMember {
    pub name: String,
    pub signature: SurfaceSignature,
    pub is_public: bool,
    pub is_static: bool,
    pub body: Expression,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceObjectType {
    pub name: QualifiedName,
    pub position: Position,
    /// Member name to its overloads, in declaration order
    pub members: IndexMap<String, Vec<SurfaceMember>>,
    pub primitive: Option<Primitive>,
}

/// The sealed arena of surface types
#[derive(Debug)]
pub struct SurfaceProgram {
    types: Vec<SurfaceObjectType>,
    names: HashMap<QualifiedName, TypeId>,
}

impl SurfaceProgram {
    pub fn types(&self) -> impl Iterator<Item = (TypeId, &SurfaceObjectType)> {
        self.types.iter().enumerate().map(|(i, ty)| (TypeId(i), ty))
    }

    pub fn get(&self, id: TypeId) -> &SurfaceObjectType {
        &self.types[id.0]
    }

    pub fn find(&self, name: &str) -> Option<TypeId> {
        self.names.get(&QualifiedName::from(name)).copied()
    }

    pub fn resolve(&self, reference: &TypeReference) -> Result<TypeId> {
        self.names.get(&reference.name).copied().ok_or_else(|| {
            InternalError::AnalyzerUnresolvedReferenceAfterAnalysis {
                name: reference.name.to_string(),
            }
            .into()
        })
    }

    pub fn name(&self, id: TypeId) -> &QualifiedName {
        &self.get(id).name
    }

    /// A reference to an already registered type
    pub fn reference(&self, id: TypeId, position: Position) -> TypeReference {
        TypeReference {
            name: self.name(id).clone(),
            position,
        }
    }

    /// The type tagged `#Primitive("void")`
    pub fn void(&self) -> Result<TypeId> {
        self.types()
            .find(|(_, ty)| ty.primitive == Some(Primitive::Void))
            .map(|(id, _)| id)
            .ok_or_else(|| {
                InternalError::AnalyzerMissingBasicType {
                    name: QualifiedName::VOID.to_string(),
                }
                .into()
            })
    }

    pub fn string(&self) -> Result<TypeId> {
        self.find(QualifiedName::STRING).ok_or_else(|| {
            InternalError::AnalyzerMissingBasicType {
                name: QualifiedName::STRING.to_string(),
            }
            .into()
        })
    }

    pub fn is_void(&self, id: TypeId) -> bool {
        self.get(id).primitive == Some(Primitive::Void)
    }

    /// Object assignability is nominal; anything may be discarded into void
    pub fn is_assignable(&self, source: TypeId, destination: TypeId) -> bool {
        source == destination || self.is_void(destination)
    }

    /// The signature of the constructor every type carries
    pub fn constructor(&self, id: TypeId, position: Position) -> SurfaceCallableType {
        SurfaceCallableType {
            return_type: self.reference(id, position),
            parameters: Vec::new(),
            type_parameters: Vec::new(),
        }
    }
}

/// Builds a [SurfaceProgram] from a stream of syntactic types
#[derive(Debug, Default)]
pub struct SurfaceAnalyzer {
    types: Vec<SurfaceObjectType>,
    names: HashMap<QualifiedName, TypeId>,
    /// Every reference handed out, in creation order
    references: Vec<TypeReference>,
}

impl SurfaceAnalyzer {
    pub fn analyze<I>(types: I) -> Result<SurfaceProgram>
    where
        I: IntoIterator<Item = Result<SyntacticObjectType>>,
    {
        let mut analyzer = Self::default();
        for ty in types {
            analyzer.add(ty?)?;
        }
        analyzer.seal()
    }

    fn reference(&mut self, name: &str, position: Position) -> TypeReference {
        let reference = TypeReference {
            name: QualifiedName::from(name),
            position,
        };
        self.references.push(reference.clone());
        reference
    }

    fn add(&mut self, ty: SyntacticObjectType) -> Result<()> {
        if !ty.modifiers.contains(Modifier::CLASS) {
            return Err(AnalyzeError::NoCategoryModifierOnType {
                name: ty.name,
                position: ty.position,
            }
            .into());
        }
        if let Some(modifier) = (ty.modifiers - Modifier::CLASS).iter().next() {
            return Err(AnalyzeError::InvalidModifierOnType {
                name: ty.name,
                modifier,
                position: ty.position,
            }
            .into());
        }

        let name = QualifiedName::new(&ty.name);
        if self.names.contains_key(&name) {
            return Err(AnalyzeError::MultipleTypesWithTheSameName {
                name: ty.name,
                position: ty.position,
            }
            .into());
        }

        let mut primitive = None;
        for metadata in &ty.metadata {
            if let Some(tag) = Self::metadata(&ty.name, metadata)? {
                primitive = Some(tag);
            }
        }

        let mut members: IndexMap<String, Vec<SurfaceMember>> = IndexMap::new();
        for member in ty.members {
            let member = self.member(&ty.name, member)?;
            members.entry(member.name.clone()).or_default().push(member);
        }

        debug!("surfaced type {name} with {} member names", members.len());
        let id = TypeId(self.types.len());
        self.names.insert(name.clone(), id);
        self.types.push(SurfaceObjectType {
            name,
            position: ty.position,
            members,
            primitive,
        });
        Ok(())
    }

    fn metadata(type_name: &str, metadata: &CallExpression) -> Result<Option<Primitive>> {
        let directive = match metadata.callee.as_ref() {
            Expression::Variable(variable) if variable.kind == VariableKind::Directive => {
                variable
            }
            _ => {
                return Err(AnalyzeError::CompilerMetadataExpressionInvalid {
                    type_name: type_name.to_string(),
                    position: metadata.position,
                }
                .into())
            }
        };

        match directive.name.as_str() {
            "Primitive" => {
                let position = metadata.position;
                let [parameter] = metadata.parameters.as_slice() else {
                    return Err(
                        AnalyzeError::PrimitiveCompilerMetadataInvalidParameters { position }.into(),
                    );
                };
                if !metadata.type_parameters.is_empty() {
                    return Err(
                        AnalyzeError::PrimitiveCompilerMetadataInvalidParameters { position }.into(),
                    );
                }

                let literal = match parameter {
                    Expression::Variable(variable)
                        if variable.kind == VariableKind::StringLiteral =>
                    {
                        variable
                    }
                    _ => {
                        return Err(
                            AnalyzeError::PrimitiveCompilerMetadataParameterIsNotStringLiteral {
                                position: parameter.position(),
                            }
                            .into(),
                        )
                    }
                };

                match literal.name.as_str() {
                    "void" => Ok(Some(Primitive::Void)),
                    other => Err(AnalyzeError::PrimitiveCompilerMetadataUnknownPrimitiveType {
                        primitive: other.to_string(),
                        position: literal.position,
                    }
                    .into()),
                }
            }
            other => Err(AnalyzeError::UnknownCompilerMetadata {
                name: other.to_string(),
                position: metadata.position,
            }
            .into()),
        }
    }

    fn parameters(&mut self, declarations: &[ParameterDeclaration]) -> Vec<SurfaceParameter> {
        declarations
            .iter()
            .map(|param| SurfaceParameter {
                name: param.name.clone(),
                ty: self.reference(&param.type_name, param.position),
            })
            .collect()
    }

    fn member(&mut self, type_name: &str, member: SyntacticMember) -> Result<SurfaceMember> {
        if member.modifiers.contains(Modifier::CLASS) {
            return Err(AnalyzeError::InvalidModifierOnMember {
                name: member.name,
                modifier: Modifier::CLASS,
                position: member.position,
            }
            .into());
        }
        if member.name == CONSTRUCTOR {
            return Err(AnalyzeError::ConstructorRedefined {
                type_name: type_name.to_string(),
                position: member.position,
            }
            .into());
        }

        let declaration = &member.declaration;
        let return_type = self.reference(&declaration.return_type, declaration.position);
        let signature = match &declaration.parameters {
            Some(parameters) => {
                let parameters = self.parameters(parameters);
                let type_parameters = declaration
                    .type_parameters
                    .as_deref()
                    .map(|list| self.parameters(list))
                    .unwrap_or_default();
                SurfaceSignature::Callable(SurfaceCallableType {
                    return_type,
                    parameters,
                    type_parameters,
                })
            }
            None => SurfaceSignature::Property(return_type),
        };

        trace!("surfaced member {type_name}.{}", member.name);
        Ok(SurfaceMember {
            is_public: member.modifiers.contains(Modifier::PUBLIC),
            is_static: member.modifiers.contains(Modifier::STATIC),
            name: member.name,
            signature,
            body: member.body,
            position: member.position,
        })
    }

    fn seal(self) -> Result<SurfaceProgram> {
        if let Some(unresolved) = self
            .references
            .iter()
            .find(|reference| !self.names.contains_key(&reference.name))
        {
            return Err(AnalyzeError::UnresolvedReference {
                name: unresolved.name.to_string(),
                position: unresolved.position,
            }
            .into());
        }

        Ok(SurfaceProgram {
            types: self.types,
            names: self.names,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parsing::parse;
    use crate::PRELUDE;

    fn analyze(source: &str) -> Result<SurfaceProgram> {
        SurfaceAnalyzer::analyze(parse(PRELUDE.as_bytes()).chain(parse(source.as_bytes())))
    }

    fn error_code(source: &str) -> String {
        analyze(source).unwrap_err().code()
    }

    fn callable(program: &SurfaceProgram, ty: &str, member: &str) -> SurfaceCallableType {
        let id = program.find(ty).unwrap();
        match &program.get(id).members[member][0].signature {
            SurfaceSignature::Callable(callable) => callable.clone(),
            other => panic!("expected callable, got {other:?}"),
        }
    }

    #[test]
    fn forward_references_resolve() {
        let program = analyze(
            "class A { Make B(C c) { } }
             class B { }
             class C { }",
        )
        .unwrap();

        let make = callable(&program, "A", "Make");
        assert_eq!(program.resolve(&make.return_type).unwrap(), program.find("B").unwrap());
        assert_eq!(
            program.resolve(&make.parameters[0].ty).unwrap(),
            program.find("C").unwrap()
        );
    }

    #[test]
    fn first_unresolved_reference_is_reported() {
        let err = analyze("class A { Make Missing(Other o) { } }").unwrap_err();
        assert_eq!(err.code(), "AnalyzerUnresolvedReference");
        assert!(err.to_string().contains("Missing"));
    }

    #[test]
    fn primitive_void_is_tagged() {
        let program = analyze("").unwrap();
        let void = program.void().unwrap();
        assert_eq!(program.name(void).as_str(), "Void");
        assert!(program.string().is_ok());
        assert!(program.is_assignable(program.string().unwrap(), void));
        assert!(!program.is_assignable(void, program.string().unwrap()));
    }

    #[test]
    fn type_parameters_are_carried() {
        let program = analyze(
            "class System { }
             class ConsoleSystem { }
             class Program { public Initialize Void<ConsoleSystem Console>(System system) { } }",
        )
        .unwrap();
        let initialize = callable(&program, "Program", "Initialize");
        assert_eq!(initialize.type_parameters.len(), 1);
        assert_eq!(initialize.type_parameters[0].name, "Console");
        assert_eq!(initialize.to_string(), "Void<ConsoleSystem>(System)");
    }

    #[test]
    fn overloads_share_a_name() {
        let program = analyze("class A { Run Void() { } Run Void(String s) { } }").unwrap();
        let a = program.get(program.find("A").unwrap());
        assert_eq!(a.members["Run"].len(), 2);
    }

    #[test]
    fn duck_typed_assignability() {
        let program = analyze(
            "class A { }
             class B { }
             class T {
                 One Void(A first) { }
                 Two Void(A second) { }
                 Other Void(B b) { }
                 Pair Void(A a, A b) { }
                 Returns A(A a) { }
             }",
        )
        .unwrap();
        let one = callable(&program, "T", "One");
        let two = callable(&program, "T", "Two");
        let other = callable(&program, "T", "Other");
        let pair = callable(&program, "T", "Pair");
        let returns = callable(&program, "T", "Returns");

        assert!(one.is_assignable_to(&two, &program).unwrap());
        assert!(!one.is_assignable_to(&other, &program).unwrap());
        assert!(!one.is_assignable_to(&pair, &program).unwrap());
        assert!(returns.is_assignable_to(&one, &program).unwrap());
        assert!(one.is_assignable_to(&returns, &program).unwrap());
    }

    #[test]
    fn type_errors() {
        let cases = [
            ("A { }", "AnalyzerNoCategoryModifierOnType"),
            ("public class A { }", "AnalyzerInvalidModifierOnType"),
            ("class A { } class A { }", "AnalyzerMultipleTypesWithTheSameName"),
            ("class String { }", "AnalyzerMultipleTypesWithTheSameName"),
            ("class A { new A() { } }", "AnalyzerConstructorRedefined"),
            ("#Unknown(\"x\"); class A { }", "AnalyzerUnknownCompilerMetadata"),
            ("#Primitive(\"int\"); class A { }", "AnalyzerPrimitiveCompilerMetadataUnknownPrimitiveType"),
        ];

        for (source, code) in cases {
            assert_eq!(error_code(source), code, "source: {source}");
        }
    }

    #[test]
    fn malformed_primitive_metadata() {
        assert_eq!(
            error_code("#Primitive(\"void\", \"extra\"); class A { }"),
            "AnalyzerPrimitiveCompilerMetadataInvalidParameters"
        );
        assert_eq!(
            error_code("#Primitive(void); class A { }"),
            "AnalyzerPrimitiveCompilerMetadataParameterIsNotStringLiteral"
        );
        assert_eq!(
            error_code("#Primitive(); class A { }"),
            "AnalyzerPrimitiveCompilerMetadataInvalidParameters"
        );
    }
}
