//! Deep analysis
//!
//! Walks every method body of a sealed [SurfaceProgram] and turns it into a typed
//! expression tree. Member lookups go through surface signatures, so the order in
//! which types are analysed never matters.

use std::fmt;

use tracing::{debug, trace};

use super::builtin::BackboneFunction;
use super::scope::Environment;
use super::surface::{
    Primitive, SurfaceCallableType, SurfaceMember, SurfaceParameter, SurfaceProgram,
    SurfaceSignature, TypeId, CONSTRUCTOR,
};
use crate::error::{AnalyzeError, InternalError, Result};
use crate::parsing::ast::{Expression, VariableKind};
use crate::{Position, QualifiedName};

/// The type of a value flowing through an expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    Object(TypeId),
    Callable(SurfaceCallableType),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeepExpression {
    /// Body of the synthesized constructor of a type
    New(TypeId),
    Scope {
        statements: Vec<DeepExpression>,
        ty: TypeId,
    },
    Call {
        target: Box<DeepExpression>,
        arguments: Vec<DeepExpression>,
        type_arguments: Vec<TypeId>,
        ty: TypeId,
    },
    ReadMember {
        parent: Box<DeepExpression>,
        owner: TypeId,
        member: String,
        signature: SurfaceCallableType,
    },
    ReadVariable {
        name: String,
        ty: ValueType,
    },
    ReadLiteral {
        value: String,
        ty: TypeId,
    },
    ReadStaticType(TypeId),
    ReadBackbone(BackboneFunction, SurfaceCallableType),
    Assignment {
        variable: String,
        source: Box<DeepExpression>,
        ty: ValueType,
    },
}

impl DeepExpression {
    pub fn value_type(&self) -> ValueType {
        match self {
            DeepExpression::New(ty)
            | DeepExpression::Scope { ty, .. }
            | DeepExpression::Call { ty, .. }
            | DeepExpression::ReadLiteral { ty, .. }
            | DeepExpression::ReadStaticType(ty) => ValueType::Object(*ty),
            DeepExpression::ReadMember { signature, .. }
            | DeepExpression::ReadBackbone(_, signature) => {
                ValueType::Callable(signature.clone())
            }
            DeepExpression::ReadVariable { ty, .. } | DeepExpression::Assignment { ty, .. } => {
                ty.clone()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub is_public: bool,
    pub is_static: bool,
    pub signature: SurfaceCallableType,
    pub body: DeepExpression,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectType {
    pub id: TypeId,
    pub name: QualifiedName,
    /// The synthesized constructor first, then the declared members in order
    pub members: Vec<Member>,
    pub primitive: Option<Primitive>,
}

impl ObjectType {
    pub fn members_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Member> + 'a {
        self.members.iter().filter(move |member| member.name == name)
    }
}

/// Every analysed type, indexed like the surface arena
#[derive(Debug)]
pub struct DeepProgram {
    types: Vec<ObjectType>,
    surface: SurfaceProgram,
    entry: TypeId,
}

impl DeepProgram {
    pub fn surface(&self) -> &SurfaceProgram {
        &self.surface
    }

    pub fn entry(&self) -> TypeId {
        self.entry
    }

    pub fn types(&self) -> &[ObjectType] {
        &self.types
    }

    pub fn get(&self, id: TypeId) -> Result<&ObjectType> {
        self.types.get(id.index()).ok_or_else(|| {
            InternalError::AnalyzerSurfaceTypeWasNotDeepAnalyzed {
                name: self.surface.name(id).to_string(),
            }
            .into()
        })
    }
}

impl fmt::Display for DeepProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ty in &self.types {
            match ty.primitive {
                Some(Primitive::Void) => writeln!(f, "class {} (primitive void)", ty.name)?,
                None => writeln!(f, "class {}", ty.name)?,
            }
            for member in &ty.members {
                let visibility = if member.is_public { "public" } else { "private" };
                let kind = if member.is_static { " static" } else { "" };
                writeln!(
                    f,
                    "    {visibility}{kind} {} {}",
                    member.name, member.signature
                )?;
            }
        }
        Ok(())
    }
}

/// Turns a [SurfaceProgram] into a [DeepProgram]
pub struct DeepAnalyzer<'a> {
    surface: &'a SurfaceProgram,
    void: TypeId,
    string: TypeId,
}

impl<'a> DeepAnalyzer<'a> {
    /// Analyses every type; `entry` names the type code generation starts from
    pub fn analyze(surface: SurfaceProgram, entry: &str) -> Result<DeepProgram> {
        let Some(entry) = surface.find(entry) else {
            return Err(AnalyzeError::SoughtTypeDoesNotExist {
                name: entry.to_string(),
            }
            .into());
        };

        let types = {
            let analyzer = DeepAnalyzer {
                surface: &surface,
                void: surface.void()?,
                string: surface.string()?,
            };
            surface
                .types()
                .map(|(id, _)| analyzer.object_type(id))
                .collect::<Result<Vec<_>>>()?
        };

        Ok(DeepProgram {
            types,
            surface,
            entry,
        })
    }

    fn object_type(&self, id: TypeId) -> Result<ObjectType> {
        let surface_type = self.surface.get(id);

        let mut members = vec![Member {
            name: CONSTRUCTOR.to_string(),
            is_public: true,
            is_static: true,
            signature: self.surface.constructor(id, surface_type.position),
            body: DeepExpression::New(id),
            position: surface_type.position,
        }];

        for member in surface_type.members.values().flatten() {
            members.push(self.member(id, member)?);
        }

        debug!("analysed type {} deeply", surface_type.name);
        Ok(ObjectType {
            id,
            name: surface_type.name.clone(),
            members,
            primitive: surface_type.primitive,
        })
    }

    fn member(&self, owner: TypeId, member: &SurfaceMember) -> Result<Member> {
        let signature = match &member.signature {
            SurfaceSignature::Callable(signature) => signature,
            SurfaceSignature::Property(_) => {
                return Err(AnalyzeError::PropertyNotImplemented {
                    name: member.name.clone(),
                    position: member.position,
                }
                .into())
            }
        };

        let mut environment = Environment::default();
        environment.bind(
            CONSTRUCTOR,
            ValueType::Callable(self.surface.constructor(owner, member.position)),
        );
        for parameter in &signature.parameters {
            let ty = self.surface.resolve(&parameter.ty)?;
            environment.bind(parameter.name.clone(), ValueType::Object(ty));
        }

        let body = self.expression(&member.body, &environment)?;
        let declared = self.surface.resolve(&signature.return_type)?;
        let actual = match body.value_type() {
            ValueType::Object(actual) => actual,
            ValueType::Callable(_) => {
                return Err(AnalyzeError::MethodReturnsAMethod {
                    position: member.body.position(),
                }
                .into())
            }
        };
        if !self.surface.is_assignable(actual, declared) {
            return Err(
                AnalyzeError::MethodImplementationReturnTypeIncompatibleWithDeclaration {
                    member: member.name.clone(),
                    declared: self.surface.name(declared).to_string(),
                    actual: self.surface.name(actual).to_string(),
                    position: member.position,
                }
                .into(),
            );
        }

        trace!("analysed member {}", member.name);
        Ok(Member {
            name: member.name.clone(),
            is_public: member.is_public,
            is_static: member.is_static,
            signature: signature.clone(),
            body,
            position: member.position,
        })
    }

    fn type_name(&self, ty: &ValueType) -> String {
        match ty {
            ValueType::Object(id) => self.surface.name(*id).to_string(),
            ValueType::Callable(callable) => callable.to_string(),
        }
    }

    fn expression(&self, expression: &Expression, env: &Environment) -> Result<DeepExpression> {
        match expression {
            Expression::Variable(variable) => match variable.kind {
                VariableKind::StringLiteral => Ok(DeepExpression::ReadLiteral {
                    value: variable.name.clone(),
                    ty: self.string,
                }),
                VariableKind::Directive => match BackboneFunction::from_name(&variable.name) {
                    Some(function) => Ok(DeepExpression::ReadBackbone(
                        function,
                        function.signature(self.surface, variable.position)?,
                    )),
                    None => Err(AnalyzeError::UnknownDirective {
                        name: variable.name.clone(),
                        position: variable.position,
                    }
                    .into()),
                },
                VariableKind::Identifier => {
                    if let Some(ty) = env.lookup(&variable.name) {
                        return Ok(DeepExpression::ReadVariable {
                            name: variable.name.clone(),
                            ty: ty.clone(),
                        });
                    }
                    match self.surface.find(&variable.name) {
                        Some(ty) => Ok(DeepExpression::ReadStaticType(ty)),
                        None => Err(AnalyzeError::UnresolvedVariable {
                            name: variable.name.clone(),
                            position: variable.position,
                        }
                        .into()),
                    }
                }
            },

            Expression::Member(access) => {
                let parent = self.expression(&access.parent, env)?;
                let owner = match parent.value_type() {
                    ValueType::Object(owner) => owner,
                    ValueType::Callable(_) => {
                        return Err(AnalyzeError::AttemptedAccessToMemberOfAMethod {
                            member: access.member.clone(),
                            position: access.position,
                        }
                        .into())
                    }
                };
                let signature = self.lookup(owner, &access.member, access.position)?;
                Ok(DeepExpression::ReadMember {
                    parent: Box::new(parent),
                    owner,
                    member: access.member.clone(),
                    signature,
                })
            }

            Expression::Call(call) => {
                let callable_target = match call.callee.as_ref() {
                    Expression::Member(_) => true,
                    Expression::Variable(variable) => variable.kind != VariableKind::StringLiteral,
                    _ => false,
                };
                if !callable_target {
                    return Err(AnalyzeError::CallableIsNotAMember {
                        position: call.position,
                    }
                    .into());
                }

                let target = self.expression(&call.callee, env)?;
                let declared = match target.value_type() {
                    ValueType::Callable(declared) => declared,
                    other => {
                        return Err(AnalyzeError::CallableIsNotAMethod {
                            type_name: self.type_name(&other),
                            position: call.position,
                        }
                        .into())
                    }
                };

                let mut arguments = Vec::with_capacity(call.parameters.len());
                let mut argument_types = Vec::with_capacity(call.parameters.len());
                for parameter in &call.parameters {
                    let argument = self.expression(parameter, env)?;
                    match argument.value_type() {
                        ValueType::Object(ty) => argument_types.push(SurfaceParameter {
                            name: String::new(),
                            ty: self.surface.reference(ty, parameter.position()),
                        }),
                        ValueType::Callable(_) => {
                            return Err(AnalyzeError::MethodParameterReturnsAMethod {
                                position: parameter.position(),
                            }
                            .into())
                        }
                    }
                    arguments.push(argument);
                }

                let mut type_arguments = Vec::with_capacity(call.type_parameters.len());
                let mut type_argument_types = Vec::with_capacity(call.type_parameters.len());
                for type_parameter in &call.type_parameters {
                    let ty = match type_parameter {
                        Expression::Variable(variable)
                            if variable.kind == VariableKind::Identifier =>
                        {
                            self.surface.find(&variable.name)
                        }
                        _ => None,
                    };
                    let Some(ty) = ty else {
                        return Err(AnalyzeError::TypeArgumentIsNotAType {
                            position: type_parameter.position(),
                        }
                        .into());
                    };
                    type_arguments.push(ty);
                    type_argument_types.push(SurfaceParameter {
                        name: String::new(),
                        ty: self.surface.reference(ty, type_parameter.position()),
                    });
                }

                let actual = SurfaceCallableType {
                    return_type: declared.return_type.clone(),
                    parameters: argument_types,
                    type_parameters: type_argument_types,
                };
                if !actual.is_assignable_to(&declared, self.surface)? {
                    return Err(
                        AnalyzeError::MethodCallParametersDoNotMatchMethodDeclaration {
                            actual: names(&actual.parameters),
                            declared: names(&declared.parameters),
                            position: call.position,
                        }
                        .into(),
                    );
                }

                Ok(DeepExpression::Call {
                    target: Box::new(target),
                    arguments,
                    type_arguments,
                    ty: self.surface.resolve(&declared.return_type)?,
                })
            }

            Expression::Assignment(assignment) => {
                let (name, destination) = match assignment.destination.as_ref() {
                    Expression::Variable(variable) if variable.kind == VariableKind::Identifier => {
                        let Some(ty) = env.lookup(&variable.name) else {
                            return Err(AnalyzeError::AssignationDestinationVariableMustExist {
                                name: variable.name.clone(),
                                position: variable.position,
                            }
                            .into());
                        };
                        (variable.name.clone(), ty.clone())
                    }
                    _ => {
                        return Err(AnalyzeError::AssignationDestinationMustBeAVariable {
                            position: assignment.position,
                        }
                        .into())
                    }
                };

                let source = self.expression(&assignment.source, env)?;
                let compatible = match (source.value_type(), &destination) {
                    (ValueType::Object(source), ValueType::Object(destination)) => {
                        self.surface.is_assignable(source, *destination)
                    }
                    (ValueType::Callable(source), ValueType::Callable(destination)) => {
                        source.is_assignable_to(destination, self.surface)?
                            && self.surface.is_assignable(
                                self.surface.resolve(&source.return_type)?,
                                self.surface.resolve(&destination.return_type)?,
                            )
                    }
                    _ => false,
                };
                if !compatible {
                    return Err(AnalyzeError::AssignationSourceIncompatibleWithDestination {
                        name,
                        position: assignment.position,
                    }
                    .into());
                }

                Ok(DeepExpression::Assignment {
                    variable: name,
                    source: Box::new(source),
                    ty: destination,
                })
            }

            Expression::Scope(scope) => {
                let env = env.child();
                let statements = scope
                    .statements
                    .iter()
                    .map(|statement| self.expression(statement, &env))
                    .collect::<Result<Vec<_>>>()?;

                let ty = match statements.last().map(DeepExpression::value_type) {
                    None => self.void,
                    Some(ValueType::Object(ty)) => ty,
                    Some(ValueType::Callable(_)) => {
                        return Err(AnalyzeError::MethodReturnsAMethod {
                            position: scope.position,
                        }
                        .into())
                    }
                };
                Ok(DeepExpression::Scope { statements, ty })
            }
        }
    }

    /// The single callable named `member` on `owner`
    fn lookup(
        &self,
        owner: TypeId,
        member: &str,
        position: Position,
    ) -> Result<SurfaceCallableType> {
        if member == CONSTRUCTOR {
            return Ok(self.surface.constructor(owner, position));
        }

        let ty = self.surface.get(owner);
        let candidates = ty.members.get(member).map(Vec::as_slice).unwrap_or_default();
        match candidates {
            [] => Err(AnalyzeError::AttemptedAccessToNonUndefinedMember {
                member: member.to_string(),
                type_name: ty.name.to_string(),
                position,
            }
            .into()),
            [found] => match &found.signature {
                SurfaceSignature::Callable(signature) => Ok(signature.clone()),
                SurfaceSignature::Property(_) => Err(AnalyzeError::PropertyNotImplemented {
                    name: member.to_string(),
                    position,
                }
                .into()),
            },
            _ => Err(AnalyzeError::AttemptedAccessToOverloadedMember {
                member: member.to_string(),
                type_name: ty.name.to_string(),
                position,
            }
            .into()),
        }
    }
}

fn names(parameters: &[SurfaceParameter]) -> String {
    parameters
        .iter()
        .map(|param| param.ty.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
