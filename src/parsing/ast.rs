//! Syntactic tree
//!
//! The parser produces one [SyntacticObjectType] per top-level type. Nothing here is
//! resolved yet: type names are plain strings.

use std::borrow::Cow;
use std::{fmt, io};

use ptree::{print_tree, Style, TreeItem};

use super::Modifier;
use crate::Position;

#[derive(Debug, Clone, PartialEq)]
pub struct SyntacticObjectType {
    pub name: String,
    pub modifiers: Modifier,
    pub members: Vec<SyntacticMember>,
    /// `#Directive(...);` statements found before the type body
    pub metadata: Vec<CallExpression>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntacticMember {
    pub name: String,
    pub modifiers: Modifier,
    pub declaration: TypeDeclaration,
    /// A scope for methods, the initializer for properties
    pub body: Expression,
    pub position: Position,
}

impl SyntacticMember {
    pub fn is_method(&self) -> bool {
        self.declaration.parameters.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDeclaration {
    pub return_type: String,
    /// `None` for properties
    pub parameters: Option<Vec<ParameterDeclaration>>,
    pub type_parameters: Option<Vec<ParameterDeclaration>>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDeclaration {
    pub type_name: String,
    pub name: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Variable(VariableAccess),
    Member(MemberAccess),
    Call(CallExpression),
    Assignment(AssignmentExpression),
    Scope(ScopeExpression),
}

impl Expression {
    pub fn position(&self) -> Position {
        match self {
            Expression::Variable(e) => e.position,
            Expression::Member(e) => e.position,
            Expression::Call(e) => e.position,
            Expression::Assignment(e) => e.position,
            Expression::Scope(e) => e.position,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Identifier,
    /// The name holds the literal without its quotes
    StringLiteral,
    /// A `#name` compiler directive
    Directive,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableAccess {
    pub kind: VariableKind,
    pub name: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberAccess {
    pub parent: Box<Expression>,
    pub member: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    pub callee: Box<Expression>,
    pub parameters: Vec<Expression>,
    pub type_parameters: Vec<Expression>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentExpression {
    pub destination: Box<Expression>,
    pub source: Box<Expression>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScopeExpression {
    pub statements: Vec<Expression>,
    pub position: Position,
}

impl fmt::Display for VariableAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            VariableKind::Identifier => write!(f, "{}", self.name),
            VariableKind::StringLiteral => write!(f, "{:?}", self.name),
            VariableKind::Directive => write!(f, "#{}", self.name),
        }
    }
}

impl fmt::Display for TypeDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(
            f: &mut fmt::Formatter<'_>,
            open: char,
            close: char,
            params: &[ParameterDeclaration],
        ) -> fmt::Result {
            write!(f, "{open}")?;
            for (i, param) in params.iter().enumerate() {
                if i != 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{} {}", param.type_name, param.name)?;
            }
            write!(f, "{close}")
        }

        write!(f, "{}", self.return_type)?;
        if let Some(type_parameters) = &self.type_parameters {
            list(f, '<', '>', type_parameters)?;
        }
        if let Some(parameters) = &self.parameters {
            list(f, '(', ')', parameters)?;
        }
        Ok(())
    }
}

impl SyntacticObjectType {
    pub fn pretty_print(&self) -> io::Result<()> {
        print_tree(self)
    }
}

impl TreeItem for SyntacticObjectType {
    type Child = SyntacticMember;

    fn write_self<W: io::Write>(&self, f: &mut W, style: &Style) -> io::Result<()> {
        let mut label = format!("{} {}", self.modifiers, self.name);
        for metadata in &self.metadata {
            if let Expression::Variable(callee) = metadata.callee.as_ref() {
                label.push_str(&format!(" [{callee}]"));
            }
        }
        write!(f, "{}", style.paint(label.trim_start().to_string()))
    }

    fn children(&self) -> Cow<[Self::Child]> {
        Cow::from(&self.members[..])
    }
}

impl TreeItem for SyntacticMember {
    type Child = Expression;

    fn write_self<W: io::Write>(&self, f: &mut W, style: &Style) -> io::Result<()> {
        let label = format!("{} {} {}", self.modifiers, self.name, self.declaration);
        write!(f, "{}", style.paint(label.trim_start().to_string()))
    }

    fn children(&self) -> Cow<[Self::Child]> {
        Cow::from(vec![self.body.clone()])
    }
}

impl TreeItem for Expression {
    type Child = Self;

    fn write_self<W: io::Write>(&self, f: &mut W, style: &Style) -> io::Result<()> {
        match self {
            Expression::Variable(v) => write!(f, "{}", style.paint(v)),
            Expression::Member(m) => write!(f, "{}", style.paint(format!(".{}", m.member))),
            Expression::Call(c) if c.type_parameters.is_empty() => {
                write!(f, "{}", style.paint("CALL"))
            }
            Expression::Call(c) => write!(
                f,
                "{}",
                style.paint(format!("CALL <{} type args>", c.type_parameters.len()))
            ),
            Expression::Assignment(_) => write!(f, "{}", style.paint("=")),
            Expression::Scope(_) => write!(f, "{}", style.paint("SCOPE")),
        }
    }

    fn children(&self) -> Cow<[Self::Child]> {
        match self {
            Expression::Variable(_) => Cow::from(vec![]),
            Expression::Member(m) => Cow::from(vec![m.parent.as_ref().clone()]),
            Expression::Call(c) => {
                let mut children = vec![c.callee.as_ref().clone()];
                children.extend(c.type_parameters.iter().cloned());
                children.extend(c.parameters.iter().cloned());
                Cow::from(children)
            }
            Expression::Assignment(a) => Cow::from(vec![
                a.destination.as_ref().clone(),
                a.source.as_ref().clone(),
            ]),
            Expression::Scope(s) => Cow::from(&s.statements[..]),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parsing::parse_source;

    #[test]
    fn tree_rendering() {
        let types =
            parse_source("#Primitive(\"void\");\nclass Void { public Run Void(String s) { s; } }")
                .unwrap();

        let mut out = Vec::new();
        ptree::write_tree(&types[0], &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();

        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], "class Void [#Primitive]");
        assert!(lines[1].ends_with("public Run Void(String s)"), "{out}");
        assert!(lines[2].ends_with("SCOPE"), "{out}");
        assert!(lines[3].ends_with("s"), "{out}");
    }
}
