use std::collections::VecDeque;
use std::fmt;
use std::io::{ErrorKind, Read};

use tracing::trace;

use crate::error::{Error, LexError, Result};
use crate::Position;

const CHUNK_SIZE: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    StringLiteral,
    /// One of `{ } ( ) < > ,`
    Grouper,
    /// One of `. ; = #`
    Operator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }

    /// The character of a grouper or operator token
    pub fn symbol(&self) -> Option<char> {
        match self.kind {
            TokenKind::Grouper | TokenKind::Operator => self.text.chars().next(),
            _ => None,
        }
    }

    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.text.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Whitespace,
    Identifier,
    Grouper,
    Operator,
    StringDelimiter,
}

fn classify(c: char) -> Option<CharClass> {
    match c {
        '{' | '}' | '(' | ')' | '<' | '>' | ',' => Some(CharClass::Grouper),
        '.' | ';' | '=' | '#' => Some(CharClass::Operator),
        '"' => Some(CharClass::StringDelimiter),
        c if c.is_whitespace() => Some(CharClass::Whitespace),
        c if c.is_alphanumeric() || c == '_' => Some(CharClass::Identifier),
        _ => None,
    }
}

/// A token that is still being read
#[derive(Debug)]
struct Partial {
    kind: TokenKind,
    text: String,
    position: Position,
}

/// Streaming tokenizer over any byte source
///
/// The source is read in fixed-size chunks; tokens and UTF-8 sequences cut by a chunk
/// boundary are carried over to the next chunk. The iterator is fused: it yields nothing
/// after the end of input or after its first error.
pub struct Lexer<R> {
    source: R,
    undecoded: Vec<u8>,
    cursor: Position,
    partial: Option<Partial>,
    pending: VecDeque<Token>,
    failure: Option<Error>,
    exhausted: bool,
}

impl<R: Read> Lexer<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            undecoded: Vec::new(),
            cursor: Position::START,
            partial: None,
            pending: VecDeque::new(),
            failure: None,
            exhausted: false,
        }
    }

    fn fail(&mut self, err: impl Into<Error>) {
        self.partial = None;
        self.failure = Some(err.into());
        self.exhausted = true;
    }

    fn fill(&mut self) {
        let mut chunk = [0u8; CHUNK_SIZE];
        let read = loop {
            match self.source.read(&mut chunk) {
                Ok(read) => break read,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(source) => {
                    self.fail(LexError::SourceUnreadable { source });
                    return;
                }
            }
        };

        if read == 0 {
            self.finish();
            return;
        }

        self.undecoded.extend_from_slice(&chunk[..read]);
        let bytes = std::mem::take(&mut self.undecoded);
        let (valid, rest) = match std::str::from_utf8(&bytes) {
            Ok(text) => (text, &[][..]),
            Err(err) => {
                let (valid, rest) = bytes.split_at(err.valid_up_to());
                let valid = std::str::from_utf8(valid).unwrap_or_default();
                if err.error_len().is_some() {
                    self.scan(valid);
                    let position = self.cursor;
                    if self.failure.is_none() {
                        self.fail(LexError::InvalidEncoding { position });
                    }
                    return;
                }
                (valid, rest)
            }
        };

        self.scan(valid);
        self.undecoded = rest.to_vec();
    }

    fn finish(&mut self) {
        self.exhausted = true;

        if !self.undecoded.is_empty() {
            let position = self.cursor;
            self.fail(LexError::InvalidEncoding { position });
            return;
        }

        match self.partial.take() {
            Some(partial) if partial.kind == TokenKind::StringLiteral => {
                self.fail(LexError::UnterminatedStringLiteral {
                    position: partial.position,
                });
            }
            Some(partial) => self.emit(partial),
            None => {}
        }
    }

    fn emit(&mut self, partial: Partial) {
        trace!("token {:?} at {}", partial.text, partial.position);
        self.pending
            .push_back(Token::new(partial.kind, partial.text, partial.position));
    }

    fn scan(&mut self, text: &str) {
        for c in text.chars() {
            if self.failure.is_some() {
                return;
            }
            self.accept(c);
            self.cursor = self.cursor.advance(c);
        }
    }

    fn accept(&mut self, c: char) {
        let position = self.cursor;

        if let Some(partial) = self.partial.as_mut() {
            if partial.kind == TokenKind::StringLiteral {
                partial.text.push(c);
                if c == '"' {
                    if let Some(partial) = self.partial.take() {
                        self.emit(partial);
                    }
                }
                return;
            }
        }

        let Some(class) = classify(c) else {
            self.fail(LexError::IllegalCharacter {
                character: c,
                position,
            });
            return;
        };

        if class == CharClass::Identifier {
            if let Some(partial) = self.partial.as_mut() {
                partial.text.push(c);
                return;
            }
        }

        if let Some(partial) = self.partial.take() {
            self.emit(partial);
        }

        let kind = match class {
            CharClass::Whitespace => return,
            CharClass::Identifier => TokenKind::Identifier,
            CharClass::StringDelimiter => TokenKind::StringLiteral,
            CharClass::Grouper => {
                self.pending
                    .push_back(Token::new(TokenKind::Grouper, c, position));
                return;
            }
            CharClass::Operator => {
                self.pending
                    .push_back(Token::new(TokenKind::Operator, c, position));
                return;
            }
        };

        self.partial = Some(Partial {
            kind,
            text: c.to_string(),
            position,
        });
    }
}

impl<R: Read> Iterator for Lexer<R> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(Ok(token));
            }
            if let Some(err) = self.failure.take() {
                return Some(Err(err));
            }
            if self.exhausted {
                return None;
            }
            self.fill();
        }
    }
}
