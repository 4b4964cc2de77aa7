//! Frames for the declaration level: files, types, members and parameter declarations

use super::ast::{
    CallExpression, Expression, ParameterDeclaration, SyntacticMember, SyntacticObjectType,
    TypeDeclaration,
};
use super::expression::{ExpressionFrame, ScopeFrame};
use super::lexer::Token;
use super::parser::{unexpected, Closer, Frame, Node, Step};
use super::Modifier;
use crate::error::{ParseError, Result};
use crate::Position;

/// Adds `modifier` to `set`, rejecting repetitions
fn add_modifier(set: &mut Modifier, modifier: Modifier, position: Position) -> Result<()> {
    if set.contains(modifier) {
        return Err(ParseError::DuplicateModifier { modifier, position }.into());
    }
    set.insert(modifier);
    Ok(())
}

/// Everything in front of a type body
#[derive(Debug, Default)]
pub(super) struct FileFrame {
    modifiers: Modifier,
    name: Option<(String, Position)>,
    metadata: Vec<CallExpression>,
}

impl FileFrame {
    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty() && self.name.is_none() && self.metadata.is_empty()
    }

    pub fn feed(&mut self, token: &Token) -> Result<Step> {
        let position = token.position;

        if token.is_identifier() {
            if let Some((name, _)) = &self.name {
                return Err(ParseError::TooManyIdentifiersOnType {
                    token: token.text.clone(),
                    name: name.clone(),
                    position,
                }
                .into());
            }

            match Modifier::from_keyword(&token.text) {
                Some(modifier) => add_modifier(&mut self.modifiers, modifier, position)?,
                None => self.name = Some((token.text.clone(), position)),
            }
            return Ok(Step::Consumed);
        }

        match token.symbol() {
            Some('#') => Ok(Step::Delegate(Frame::Expression(ExpressionFrame::statement(
                position,
            )))),
            Some('{') => {
                let Some((name, name_position)) = self.name.take() else {
                    return Err(ParseError::MissingNameInTypeDefinition { position }.into());
                };
                let header = std::mem::take(self);
                Ok(Step::Open(Frame::Type(TypeFrame::new(SyntacticObjectType {
                    name,
                    modifiers: header.modifiers,
                    members: Vec::new(),
                    metadata: header.metadata,
                    position: name_position,
                }))))
            }
            Some('}') => Err(ParseError::MismatchedClosingScopeAtRootLevel { position }.into()),
            _ => Err(ParseError::IllegalCharacterInTypeDefinition {
                token: token.text.clone(),
                position,
            }
            .into()),
        }
    }

    pub fn resume(&mut self, node: Node, position: Position) -> Result<Step> {
        match node {
            Node::Expression(Expression::Call(call)) => {
                self.metadata.push(call);
                Ok(Step::Consumed)
            }
            Node::Expression(other) => Err(ParseError::CompilerMetadataIsNotCallExpression {
                position: other.position(),
            }
            .into()),
            _ => unexpected("file", position),
        }
    }
}

/// A member declaration prefix being accumulated inside a type body
#[derive(Debug, Default)]
struct MemberPrefix {
    modifiers: Modifier,
    name: Option<(String, Position)>,
    return_type: Option<(String, Position)>,
    parameters: Option<Vec<ParameterDeclaration>>,
    type_parameters: Option<Vec<ParameterDeclaration>>,
}

impl MemberPrefix {
    fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
            && self.name.is_none()
            && self.return_type.is_none()
            && self.parameters.is_none()
            && self.type_parameters.is_none()
    }

    /// Turns the prefix into a member header once name and return type are known
    fn into_header(self, position: Position) -> Result<MemberHeader> {
        let Some((name, name_position)) = self.name else {
            return Err(ParseError::MissingNameInMemberDefinition { position }.into());
        };
        let Some((return_type, type_position)) = self.return_type else {
            return Err(ParseError::MemberWithoutReturnType { position }.into());
        };

        Ok(MemberHeader {
            name,
            modifiers: self.modifiers,
            declaration: TypeDeclaration {
                return_type,
                parameters: self.parameters,
                type_parameters: self.type_parameters,
                position: type_position,
            },
            position: name_position,
        })
    }
}

/// A member whose body is still being parsed
#[derive(Debug)]
pub(super) struct MemberHeader {
    name: String,
    modifiers: Modifier,
    declaration: TypeDeclaration,
    position: Position,
}

impl MemberHeader {
    fn with_body(self, body: Expression) -> SyntacticMember {
        SyntacticMember {
            name: self.name,
            modifiers: self.modifiers,
            declaration: self.declaration,
            body,
            position: self.position,
        }
    }
}

#[derive(Debug)]
pub(super) struct TypeFrame {
    ty: SyntacticObjectType,
    prefix: MemberPrefix,
}

impl TypeFrame {
    pub fn new(ty: SyntacticObjectType) -> Self {
        Self {
            ty,
            prefix: MemberPrefix::default(),
        }
    }

    fn feed_identifier(&mut self, token: &Token) -> Result<Step> {
        let position = token.position;
        let prefix = &mut self.prefix;

        if let Some(modifier) = Modifier::from_keyword(&token.text) {
            if prefix.name.is_some() {
                return Err(ParseError::ModifierAfterTypeOnMember { modifier, position }.into());
            }
            if modifier == Modifier::CLASS {
                return Err(ParseError::IllegalModifierOnMethod { modifier, position }.into());
            }
            add_modifier(&mut prefix.modifiers, modifier, position)?;
            return Ok(Step::Consumed);
        }

        if let (Some((name, _)), Some((return_type, _))) = (&prefix.name, &prefix.return_type) {
            return Err(ParseError::TooManyIdentifiersOnMember {
                token: token.text.clone(),
                name: name.clone(),
                return_type: return_type.clone(),
                position,
            }
            .into());
        }

        if prefix.name.is_none() {
            prefix.name = Some((token.text.clone(), position));
        } else {
            prefix.return_type = Some((token.text.clone(), position));
        }
        Ok(Step::Consumed)
    }

    pub fn feed(&mut self, token: &Token) -> Result<Step> {
        if token.is_identifier() {
            return self.feed_identifier(token);
        }

        let position = token.position;
        let prefix = &mut self.prefix;
        match token.symbol() {
            Some('(') => {
                if prefix.return_type.is_none() {
                    return Err(ParseError::ParametersAppliedOnNonTypeOnMember {
                        token: token.text.clone(),
                        position,
                    }
                    .into());
                }
                if prefix.parameters.is_some() {
                    return Err(
                        ParseError::ParametersAppliedMoreThanOnceOnMember { position }.into(),
                    );
                }
                Ok(Step::Open(Frame::ParameterDeclarationList(
                    ParameterDeclarationListFrame::new(Closer::Paren),
                )))
            }
            Some('<') => {
                if prefix.return_type.is_none() {
                    return Err(ParseError::ParametersAppliedOnNonTypeOnMember {
                        token: token.text.clone(),
                        position,
                    }
                    .into());
                }
                if prefix.parameters.is_some() {
                    return Err(ParseError::TypeParameterListAfterParameterList { position }.into());
                }
                if prefix.type_parameters.is_some() {
                    return Err(ParseError::DuplicateTypeParameterDeclaration { position }.into());
                }
                Ok(Step::Open(Frame::ParameterDeclarationList(
                    ParameterDeclarationListFrame::new(Closer::Angle),
                )))
            }
            Some('{') => {
                if prefix.name.is_some()
                    && prefix.return_type.is_some()
                    && prefix.parameters.is_none()
                {
                    return Err(ParseError::MissingTypeInMemberDefinition { position }.into());
                }
                let header = std::mem::take(prefix).into_header(position)?;
                Ok(Step::Delegate(Frame::Method(MethodFrame::new(header))))
            }
            Some('=') => {
                if prefix.parameters.is_some() || prefix.type_parameters.is_some() {
                    return Err(ParseError::ParametersAppliedOnNonMethodMember { position }.into());
                }
                let header = std::mem::take(prefix).into_header(position)?;
                Ok(Step::Open(Frame::Property(PropertyFrame::new(header))))
            }
            Some('}') if prefix.is_empty() => {
                let ty = std::mem::replace(
                    &mut self.ty,
                    SyntacticObjectType {
                        name: String::new(),
                        modifiers: Modifier::empty(),
                        members: Vec::new(),
                        metadata: Vec::new(),
                        position,
                    },
                );
                Ok(Step::Complete(Node::Type(ty)))
            }
            Some('}') => Err(ParseError::IncompleteMemberDefinition { position }.into()),
            _ => Err(ParseError::IllegalCharacterInTypeDefinition {
                token: token.text.clone(),
                position,
            }
            .into()),
        }
    }

    pub fn resume(&mut self, node: Node, position: Position) -> Result<Step> {
        match node {
            Node::ParameterDeclarations(list, Closer::Paren) => {
                self.prefix.parameters = Some(list);
            }
            Node::ParameterDeclarations(list, Closer::Angle) => {
                self.prefix.type_parameters = Some(list);
            }
            Node::Member(member) => self.ty.members.push(member),
            _ => return unexpected("type", position),
        }
        Ok(Step::Consumed)
    }
}

#[derive(Debug)]
pub(super) struct MethodFrame {
    header: Option<MemberHeader>,
    opened: bool,
}

impl MethodFrame {
    fn new(header: MemberHeader) -> Self {
        Self {
            header: Some(header),
            opened: false,
        }
    }

    pub fn feed(&mut self, token: &Token) -> Result<Step> {
        match token.symbol() {
            Some('{') if !self.opened => {
                self.opened = true;
                Ok(Step::Open(Frame::Scope(ScopeFrame::new(token.position))))
            }
            _ => unexpected("method", token.position),
        }
    }

    pub fn resume(&mut self, node: Node, position: Position) -> Result<Step> {
        match (node, self.header.take()) {
            (Node::Expression(body @ Expression::Scope(_)), Some(header)) => {
                Ok(Step::Complete(Node::Member(header.with_body(body))))
            }
            _ => unexpected("method", position),
        }
    }
}

/// `Name Type = initializer;`
#[derive(Debug)]
pub(super) struct PropertyFrame {
    header: Option<MemberHeader>,
}

impl PropertyFrame {
    fn new(header: MemberHeader) -> Self {
        Self {
            header: Some(header),
        }
    }

    pub fn feed(&mut self, token: &Token) -> Result<Step> {
        Ok(Step::Delegate(Frame::Expression(ExpressionFrame::statement(
            token.position,
        ))))
    }

    pub fn resume(&mut self, node: Node, position: Position) -> Result<Step> {
        match (node, self.header.take()) {
            (Node::Expression(body), Some(header)) => {
                Ok(Step::Complete(Node::Member(header.with_body(body))))
            }
            _ => unexpected("property", position),
        }
    }
}

/// `(Type name, ...)` or `<Type name, ...>` on a member declaration
#[derive(Debug)]
pub(super) struct ParameterDeclarationListFrame {
    closer: Closer,
    declarations: Vec<ParameterDeclaration>,
    current: Vec<(String, Position)>,
}

impl ParameterDeclarationListFrame {
    pub fn new(closer: Closer) -> Self {
        Self {
            closer,
            declarations: Vec::new(),
            current: Vec::new(),
        }
    }

    fn close_declaration(&mut self, position: Position) -> Result<()> {
        let mut current = std::mem::take(&mut self.current).into_iter();
        match (current.next(), current.next()) {
            (Some((type_name, type_position)), Some((name, _))) => {
                self.declarations.push(ParameterDeclaration {
                    type_name,
                    name,
                    position: type_position,
                });
                Ok(())
            }
            (Some(_), None) => Err(ParseError::IncompleteParameterDeclaration { position }.into()),
            _ => Err(ParseError::EmptyParameter { position }.into()),
        }
    }

    pub fn feed(&mut self, token: &Token) -> Result<Step> {
        let position = token.position;

        if token.is_identifier() {
            if let Some(modifier) = Modifier::from_keyword(&token.text) {
                return Err(ParseError::IllegalModifierOnParameter { modifier, position }.into());
            }
            if self.current.len() == 2 {
                return Err(ParseError::TooManyIdentifiersInParameterDeclaration {
                    token: token.text.clone(),
                    position,
                }
                .into());
            }
            self.current.push((token.text.clone(), position));
            return Ok(Step::Consumed);
        }

        match token.symbol() {
            Some(',') => {
                self.close_declaration(position)?;
                Ok(Step::Consumed)
            }
            Some(symbol) if symbol == self.closer.symbol() => {
                if !(self.current.is_empty() && self.declarations.is_empty()) {
                    self.close_declaration(position)?;
                }
                let declarations = std::mem::take(&mut self.declarations);
                Ok(Step::Complete(Node::ParameterDeclarations(
                    declarations,
                    self.closer,
                )))
            }
            Some(symbol) if Closer::closing(symbol).is_some() => {
                Err(ParseError::MismatchedParameterListTerminator {
                    expected: self.closer.text(),
                    found: token.text.clone(),
                    position,
                }
                .into())
            }
            _ => Err(ParseError::IllegalCharacterInParameterDeclaration {
                token: token.text.clone(),
                position,
            }
            .into()),
        }
    }
}
