use tracing::{debug, trace};

use super::ast::{Expression, ParameterDeclaration, SyntacticMember, SyntacticObjectType};
use super::declaration::{
    FileFrame, MethodFrame, ParameterDeclarationListFrame, PropertyFrame, TypeFrame,
};
use super::expression::{ExpressionFrame, ParameterListFrame, ScopeFrame};
use super::lexer::Token;
use crate::error::{InternalError, ParseError, Result};
use crate::Position;

/// The bracket pair closing a parameter list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Closer {
    /// `( ... )`
    Paren,
    /// `< ... >`
    Angle,
}

impl Closer {
    pub fn symbol(self) -> char {
        match self {
            Closer::Paren => ')',
            Closer::Angle => '>',
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            Closer::Paren => ")",
            Closer::Angle => ">",
        }
    }

    /// The closer for `symbol`, if it closes any list
    pub fn closing(symbol: char) -> Option<Self> {
        match symbol {
            ')' => Some(Closer::Paren),
            '>' => Some(Closer::Angle),
            _ => None,
        }
    }
}

/// What a completed frame hands to its parent
#[derive(Debug)]
pub(super) enum Node {
    Type(SyntacticObjectType),
    Member(SyntacticMember),
    Expression(Expression),
    ParameterDeclarations(Vec<ParameterDeclaration>, Closer),
    Parameters(Vec<Expression>, Closer),
}

/// The transition taken by a frame after a token or a child node
#[derive(Debug)]
pub(super) enum Step {
    /// The token was consumed
    Consumed,
    /// A child frame starts after the consumed token
    Open(Frame),
    /// A child frame starts with the current token
    Delegate(Frame),
    /// The frame is done and the token was its last
    Complete(Node),
    /// The frame is done and the token belongs to the parent
    CompleteAndForward(Node),
}

#[derive(Debug)]
pub(super) enum Frame {
    File(FileFrame),
    Type(TypeFrame),
    Method(MethodFrame),
    Property(PropertyFrame),
    Scope(ScopeFrame),
    Expression(ExpressionFrame),
    ParameterDeclarationList(ParameterDeclarationListFrame),
    ParameterList(ParameterListFrame),
}

impl Frame {
    fn feed(&mut self, token: &Token) -> Result<Step> {
        match self {
            Frame::File(frame) => frame.feed(token),
            Frame::Type(frame) => frame.feed(token),
            Frame::Method(frame) => frame.feed(token),
            Frame::Property(frame) => frame.feed(token),
            Frame::Scope(frame) => frame.feed(token),
            Frame::Expression(frame) => frame.feed(token),
            Frame::ParameterDeclarationList(frame) => frame.feed(token),
            Frame::ParameterList(frame) => frame.feed(token),
        }
    }

    fn resume(&mut self, node: Node, position: Position) -> Result<Step> {
        match self {
            Frame::File(frame) => frame.resume(node, position),
            Frame::Type(frame) => frame.resume(node, position),
            Frame::Method(frame) => frame.resume(node, position),
            Frame::Property(frame) => frame.resume(node, position),
            Frame::Scope(frame) => frame.resume(node, position),
            Frame::Expression(frame) => frame.resume(node, position),
            Frame::ParameterList(frame) => frame.resume(node, position),
            Frame::ParameterDeclarationList(_) => unexpected(self.name(), position),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Frame::File(_) => "file",
            Frame::Type(_) => "type",
            Frame::Method(_) => "method",
            Frame::Property(_) => "property",
            Frame::Scope(_) => "scope",
            Frame::Expression(_) => "expression",
            Frame::ParameterDeclarationList(_) => "parameter declaration list",
            Frame::ParameterList(_) => "parameter list",
        }
    }
}

/// Rejects a node a frame never asked for
pub(super) fn unexpected<T>(frame: &'static str, position: Position) -> Result<T> {
    Err(InternalError::ParserUnexpectedNode { frame, position }.into())
}

/// Token driven parser state
///
/// Tokens are pushed in one at a time with [IncrementalParser::feed]; every completed
/// top-level type is handed back as soon as its closing brace is seen. Once
/// [IncrementalParser::finish] has succeeded the parser refuses further input.
#[derive(Debug)]
pub struct IncrementalParser {
    stack: Vec<Frame>,
    last_position: Position,
    finished: bool,
}

impl Default for IncrementalParser {
    fn default() -> Self {
        Self::new()
    }
}

impl IncrementalParser {
    pub fn new() -> Self {
        Self {
            stack: vec![Frame::File(FileFrame::default())],
            last_position: Position::START,
            finished: false,
        }
    }

    fn top(&mut self) -> Result<&mut Frame> {
        let position = self.last_position;
        self.stack.last_mut().ok_or_else(|| {
            InternalError::ParserUnexpectedNode {
                frame: "file",
                position,
            }
            .into()
        })
    }

    pub fn feed(&mut self, token: &Token) -> Result<Option<SyntacticObjectType>> {
        if self.finished {
            return Err(InternalError::ParserAttemptingToReuseCompletedTypeParser {
                position: token.position,
            }
            .into());
        }

        self.last_position = token.position;
        trace!("feeding {:?} at {}", token.text, token.position);

        let mut forward = false;
        let mut step = self.top()?.feed(token)?;
        loop {
            step = match step {
                Step::Complete(Node::Type(ty)) => {
                    // the file frame stays on the stack for the next type
                    self.stack.pop();
                    debug!("parsed type {}", ty.name);
                    return Ok(Some(ty));
                }
                Step::Consumed if forward => {
                    forward = false;
                    self.top()?.feed(token)?
                }
                Step::Consumed => return Ok(None),
                Step::Open(frame) => {
                    self.stack.push(frame);
                    if !forward {
                        return Ok(None);
                    }
                    forward = false;
                    self.top()?.feed(token)?
                }
                Step::Delegate(frame) => {
                    self.stack.push(frame);
                    self.top()?.feed(token)?
                }
                Step::Complete(node) => self.complete(node, token.position)?,
                Step::CompleteAndForward(node) => {
                    forward = true;
                    self.complete(node, token.position)?
                }
            };
        }
    }

    fn complete(&mut self, node: Node, position: Position) -> Result<Step> {
        let frame = self.stack.pop();
        trace!(
            "completed {} frame",
            frame.as_ref().map(Frame::name).unwrap_or("unknown")
        );

        self.top()?.resume(node, position)
    }

    /// Signals the end of input
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Err(InternalError::ParserAttemptingToReuseCompletedTypeParser {
                position: self.last_position,
            }
            .into());
        }

        match self.stack.as_slice() {
            [Frame::File(file)] if file.is_empty() => {
                self.finished = true;
                Ok(())
            }
            _ => Err(ParseError::UnexpectedEndOfInput {
                position: self.last_position,
            }
            .into()),
        }
    }
}

/// Iterator over the types of a token stream
///
/// Fused: stops after the end of input or after the first error.
pub struct Parser<I> {
    tokens: I,
    state: IncrementalParser,
    done: bool,
}

impl<I> Parser<I>
where
    I: Iterator<Item = Result<Token>>,
{
    pub fn new(tokens: I) -> Self {
        Self {
            tokens,
            state: IncrementalParser::new(),
            done: false,
        }
    }
}

impl<I> Iterator for Parser<I>
where
    I: Iterator<Item = Result<Token>>,
{
    type Item = Result<SyntacticObjectType>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let result = match self.tokens.next() {
                Some(Ok(token)) => match self.state.feed(&token) {
                    Ok(None) => continue,
                    Ok(Some(ty)) => return Some(Ok(ty)),
                    Err(err) => Err(err),
                },
                Some(Err(err)) => Err(err),
                None => self.state.finish(),
            };

            self.done = true;
            return result.err().map(Err);
        }
    }
}
