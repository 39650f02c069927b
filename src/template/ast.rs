//! AST for prompt templates.
//!
//! Every node carries a [`Span`] pointing back into the source it was parsed
//! from.

use miette::SourceSpan;

use super::condition::Condition;

pub type Span = SourceSpan;

pub fn span(offset: usize, len: usize) -> Span {
    SourceSpan::new(offset.into(), len)
}

/// A parsed template body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub body: Vec<Node>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text, emitted unchanged.
    Text(TextNode),
    /// `{{name}}`
    Variable(VariableNode),
    /// An inclusion directive left in the body.
    Include(IncludeNode),
    /// `#if … then … [#else …] #endif`
    Conditional(ConditionalNode),
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Text(n) => n.span,
            Node::Variable(n) => n.span,
            Node::Include(n) => n.span,
            Node::Conditional(n) => n.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableNode {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncludeNode {
    pub path: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalNode {
    pub condition: Condition,
    pub then_body: Vec<Node>,
    /// `None` when the block has no `#else`.
    pub else_body: Option<Vec<Node>>,
    pub span: Span,
}
