//! Frames for method bodies: scopes, expressions and argument lists

use super::ast::{
    AssignmentExpression, CallExpression, Expression, MemberAccess, ScopeExpression,
    VariableAccess, VariableKind,
};
use super::lexer::{Token, TokenKind};
use super::parser::{unexpected, Closer, Frame, Node, Step};
use super::Modifier;
use crate::error::{ParseError, Result};
use crate::Position;

/// `{ statement; ... }`
#[derive(Debug)]
pub(super) struct ScopeFrame {
    statements: Vec<Expression>,
    position: Position,
}

impl ScopeFrame {
    pub fn new(position: Position) -> Self {
        Self {
            statements: Vec::new(),
            position,
        }
    }

    pub fn feed(&mut self, token: &Token) -> Result<Step> {
        let position = token.position;
        match token.symbol() {
            Some('}') => Ok(Step::Complete(Node::Expression(Expression::Scope(
                ScopeExpression {
                    statements: std::mem::take(&mut self.statements),
                    position: self.position,
                },
            )))),
            Some('{') => Ok(Step::Open(Frame::Scope(ScopeFrame::new(position)))),
            Some(';') => Err(ParseError::EmptyStatement { position }.into()),
            Some('=') => Err(ParseError::AssignmentOperatorWithoutTarget { position }.into()),
            _ => Ok(Step::Delegate(Frame::Expression(ExpressionFrame::statement(
                position,
            )))),
        }
    }

    pub fn resume(&mut self, node: Node, position: Position) -> Result<Step> {
        match node {
            Node::Expression(statement) => {
                self.statements.push(statement);
                Ok(Step::Consumed)
            }
            _ => unexpected("scope", position),
        }
    }
}

/// Where an expression ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    /// Terminated by `;`
    Statement,
    /// Terminated by `,` or the closer of the surrounding list, both forwarded
    Argument(Closer),
}

/// A single expression: operand, pending operator and calls applied to it
#[derive(Debug)]
pub(super) struct ExpressionFrame {
    context: Context,
    operand: Option<Expression>,
    /// Position of a `.` still waiting for its member name
    pending_access: Option<Position>,
    /// Position of a `#` still waiting for the directive name
    pending_directive: Option<Position>,
    /// The operand is a bare directive and must be called next
    directive_needs_call: bool,
    type_arguments: Option<(Vec<Expression>, Position)>,
    /// Destination and `=` position while the source is being parsed
    destination: Option<(Expression, Position)>,
    /// A finished assignment inside an argument, waiting for the forwarded terminator
    assignment: Option<Expression>,
    position: Position,
}

impl ExpressionFrame {
    fn new(context: Context, position: Position) -> Self {
        Self {
            context,
            operand: None,
            pending_access: None,
            pending_directive: None,
            directive_needs_call: false,
            type_arguments: None,
            destination: None,
            assignment: None,
            position,
        }
    }

    pub fn statement(position: Position) -> Self {
        Self::new(Context::Statement, position)
    }

    fn argument(closer: Closer, position: Position) -> Self {
        Self::new(Context::Argument(closer), position)
    }

    fn directive_name(&self) -> String {
        match &self.operand {
            Some(Expression::Variable(variable)) => variable.name.clone(),
            _ => String::new(),
        }
    }

    /// Checks that nothing is left dangling and hands out the operand
    fn conclude(&mut self, position: Position) -> Result<Expression> {
        if self.pending_directive.is_some() {
            return Err(ParseError::CompilerDirectiveWithoutName { position }.into());
        }
        if self.pending_access.is_some() {
            return Err(ParseError::DanglingOperator { position }.into());
        }
        if let Some((_, position)) = self.type_arguments {
            return Err(ParseError::TypeParametersWithoutCall { position }.into());
        }
        if self.directive_needs_call {
            return Err(ParseError::CompilerDirectiveIsNotCallExpression {
                name: self.directive_name(),
                position: self.position,
            }
            .into());
        }

        match (self.operand.take(), self.context) {
            (Some(operand), _) => Ok(operand),
            (None, Context::Statement) => Err(ParseError::NullStatement { position }.into()),
            (None, Context::Argument(_)) => Err(ParseError::EmptyParameter { position }.into()),
        }
    }

    fn feed_word(&mut self, token: &Token) -> Result<Step> {
        let position = token.position;

        if let Some(directive_position) = self.pending_directive.take() {
            if token.kind != TokenKind::Identifier {
                return Err(ParseError::CompilerDirectiveWithoutName { position }.into());
            }
            self.operand = Some(Expression::Variable(VariableAccess {
                kind: VariableKind::Directive,
                name: token.text.clone(),
                position: directive_position,
            }));
            self.directive_needs_call = true;
            return Ok(Step::Consumed);
        }

        if self.directive_needs_call {
            return Err(ParseError::CompilerDirectiveIsNotCallExpression {
                name: self.directive_name(),
                position,
            }
            .into());
        }

        if token.kind == TokenKind::Identifier {
            if let Some(modifier) = Modifier::from_keyword(&token.text) {
                return Err(ParseError::IllegalModifierOnStatement { modifier, position }.into());
            }
        }

        if self.pending_access.take().is_some() {
            if token.kind != TokenKind::Identifier {
                return Err(ParseError::DanglingOperator { position }.into());
            }
            let Some(parent) = self.operand.take() else {
                return Err(ParseError::AccessMemberOperatorOnNullStatement { position }.into());
            };
            self.operand = Some(Expression::Member(MemberAccess {
                parent: Box::new(parent),
                member: token.text.clone(),
                position,
            }));
            return Ok(Step::Consumed);
        }

        if self.operand.is_some() {
            return Err(match token.kind {
                TokenKind::Identifier => ParseError::IdentifiersNotSeparatedByOperator {
                    token: token.text.clone(),
                    position,
                },
                _ => ParseError::IllegalOperatorInStatement {
                    token: token.text.clone(),
                    position,
                },
            }
            .into());
        }

        let variable = match token.kind {
            TokenKind::StringLiteral => VariableAccess {
                kind: VariableKind::StringLiteral,
                name: unquote(&token.text).to_string(),
                position,
            },
            _ => VariableAccess {
                kind: VariableKind::Identifier,
                name: token.text.clone(),
                position,
            },
        };
        self.operand = Some(Expression::Variable(variable));
        Ok(Step::Consumed)
    }

    pub fn feed(&mut self, token: &Token) -> Result<Step> {
        let position = token.position;

        if let Some(assignment) = self.assignment.take() {
            return Ok(Step::CompleteAndForward(Node::Expression(assignment)));
        }

        let Some(symbol) = token.symbol() else {
            return self.feed_word(token);
        };

        if self.pending_directive.is_some() {
            return Err(ParseError::CompilerDirectiveWithoutName { position }.into());
        }
        if self.directive_needs_call && symbol != '(' && symbol != '<' {
            return Err(ParseError::CompilerDirectiveIsNotCallExpression {
                name: self.directive_name(),
                position,
            }
            .into());
        }

        match symbol {
            ';' => match self.context {
                Context::Statement => Ok(Step::Complete(Node::Expression(self.conclude(position)?))),
                Context::Argument(_) => Err(ParseError::UnclosedParameterList { position }.into()),
            },
            ',' => match self.context {
                Context::Argument(_) => Ok(Step::CompleteAndForward(Node::Expression(
                    self.conclude(position)?,
                ))),
                Context::Statement => Err(ParseError::IllegalOperatorInStatement {
                    token: token.text.clone(),
                    position,
                }
                .into()),
            },
            ')' | '>' => match self.context {
                Context::Argument(closer) if closer.symbol() == symbol => Ok(
                    Step::CompleteAndForward(Node::Expression(self.conclude(position)?)),
                ),
                Context::Argument(closer) => Err(ParseError::MismatchedParameterListTerminator {
                    expected: closer.text(),
                    found: token.text.clone(),
                    position,
                }
                .into()),
                Context::Statement => Err(ParseError::IllegalOperatorInStatement {
                    token: token.text.clone(),
                    position,
                }
                .into()),
            },
            '.' => {
                if self.pending_access.is_some() {
                    return Err(ParseError::MultipleContiguousOperators { position }.into());
                }
                if self.operand.is_none() {
                    return Err(ParseError::AccessMemberOperatorOnNullStatement { position }.into());
                }
                if let Some((_, position)) = self.type_arguments {
                    return Err(ParseError::TypeParametersWithoutCall { position }.into());
                }
                self.pending_access = Some(position);
                Ok(Step::Consumed)
            }
            '#' => {
                if self.pending_access.is_some() {
                    return Err(ParseError::DanglingOperator { position }.into());
                }
                if self.operand.is_some() {
                    return Err(ParseError::IllegalOperatorInStatement {
                        token: token.text.clone(),
                        position,
                    }
                    .into());
                }
                self.pending_directive = Some(position);
                Ok(Step::Consumed)
            }
            '(' | '<' => {
                if self.pending_access.is_some() {
                    return Err(ParseError::DanglingOperator { position }.into());
                }
                if self.operand.is_none() {
                    return Err(ParseError::OpeningParenthesisOnNullStatement { position }.into());
                }
                let closer = if symbol == '(' {
                    Closer::Paren
                } else {
                    if self.type_arguments.is_some() {
                        return Err(
                            ParseError::TypeParametersAppliedMoreThanOnce { position }.into()
                        );
                    }
                    Closer::Angle
                };
                Ok(Step::Open(Frame::ParameterList(ParameterListFrame::new(
                    closer,
                ))))
            }
            '=' => {
                if self.pending_access.is_some() {
                    return Err(ParseError::DanglingOperator { position }.into());
                }
                if let Some((_, position)) = self.type_arguments {
                    return Err(ParseError::TypeParametersWithoutCall { position }.into());
                }
                let Some(destination) = self.operand.take() else {
                    return Err(ParseError::AssignationIntoNullStatement { position }.into());
                };
                self.destination = Some((destination, position));
                Ok(Step::Open(Frame::Expression(ExpressionFrame::new(
                    self.context,
                    position,
                ))))
            }
            _ => Err(ParseError::IllegalOperatorInStatement {
                token: token.text.clone(),
                position,
            }
            .into()),
        }
    }

    pub fn resume(&mut self, node: Node, position: Position) -> Result<Step> {
        match node {
            Node::Parameters(arguments, Closer::Angle) => {
                self.type_arguments = Some((arguments, position));
                Ok(Step::Consumed)
            }
            Node::Parameters(arguments, Closer::Paren) => {
                let Some(callee) = self.operand.take() else {
                    return unexpected("expression", position);
                };
                let type_parameters = self
                    .type_arguments
                    .take()
                    .map(|(arguments, _)| arguments)
                    .unwrap_or_default();
                self.directive_needs_call = false;
                self.operand = Some(Expression::Call(CallExpression {
                    position: callee.position(),
                    callee: Box::new(callee),
                    parameters: arguments,
                    type_parameters,
                }));
                Ok(Step::Consumed)
            }
            Node::Expression(source) => {
                let Some((destination, assign_position)) = self.destination.take() else {
                    return unexpected("expression", position);
                };
                let assignment = Expression::Assignment(AssignmentExpression {
                    destination: Box::new(destination),
                    source: Box::new(source),
                    position: assign_position,
                });
                match self.context {
                    Context::Statement => Ok(Step::Complete(Node::Expression(assignment))),
                    Context::Argument(_) => {
                        self.assignment = Some(assignment);
                        Ok(Step::Consumed)
                    }
                }
            }
            _ => unexpected("expression", position),
        }
    }
}

/// Call arguments `( ... )` or type arguments `< ... >`
#[derive(Debug)]
pub(super) struct ParameterListFrame {
    closer: Closer,
    arguments: Vec<Expression>,
    after_separator: bool,
    /// An argument just completed; the forwarded token must separate or close
    after_argument: bool,
}

impl ParameterListFrame {
    fn new(closer: Closer) -> Self {
        Self {
            closer,
            arguments: Vec::new(),
            after_separator: false,
            after_argument: false,
        }
    }

    fn close(&mut self) -> Step {
        Step::Complete(Node::Parameters(
            std::mem::take(&mut self.arguments),
            self.closer,
        ))
    }

    pub fn feed(&mut self, token: &Token) -> Result<Step> {
        let position = token.position;
        let symbol = token.symbol();

        if self.after_argument {
            self.after_argument = false;
            return match symbol {
                Some(',') => {
                    self.after_separator = true;
                    Ok(Step::Consumed)
                }
                Some(symbol) if symbol == self.closer.symbol() => Ok(self.close()),
                _ => Err(ParseError::MismatchedParameterListTerminator {
                    expected: self.closer.text(),
                    found: token.text.clone(),
                    position,
                }
                .into()),
            };
        }

        match symbol {
            Some(',') => Err(ParseError::EmptyParameter { position }.into()),
            Some(symbol) if symbol == self.closer.symbol() => {
                if self.after_separator {
                    return Err(ParseError::EmptyParameter { position }.into());
                }
                Ok(self.close())
            }
            _ => Ok(Step::Delegate(Frame::Expression(ExpressionFrame::argument(
                self.closer,
                position,
            )))),
        }
    }

    pub fn resume(&mut self, node: Node, position: Position) -> Result<Step> {
        match node {
            Node::Expression(argument) => {
                self.arguments.push(argument);
                self.after_argument = true;
                self.after_separator = false;
                Ok(Step::Consumed)
            }
            _ => unexpected("parameter list", position),
        }
    }
}

fn unquote(literal: &str) -> &str {
    literal
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(literal)
}
