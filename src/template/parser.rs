//! Recursive-descent parser from directive tokens to a [`Document`].
//!
//! Each `#if` pairs with its own `#endif`. Pairing runs once over the token
//! stream before parsing: an `#if` that never closes, an `#else` beyond the
//! first in a block, and stray `#else`/`#endif` tokens all become text. Only
//! paired blocks count toward the nesting limit.

use super::ast::{
    span, ConditionalNode, Document, IncludeNode, Node, Span, TextNode, VariableNode,
};
use super::condition::Condition;
use super::lexer::{tokenize, Token, TokenKind};
use crate::error::{PeError, Result};

pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, max_depth: usize) -> Self {
        let mut tokens = tokenize(source);
        demote_unpaired(&mut tokens);
        Self {
            source,
            tokens,
            pos: 0,
            max_depth,
        }
    }

    pub fn parse(mut self) -> Result<Document> {
        let body = self.parse_body(0, false)?;
        Ok(Document {
            body,
            span: span(0, self.source.len()),
        })
    }

    /// Parse nodes until the end of input or, inside a conditional at `level`,
    /// until a closing `#endif` (or `#else` when still in the then-branch).
    fn parse_body(&mut self, level: usize, in_else: bool) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();

        while let Some(token) = self.tokens.get(self.pos).cloned() {
            match token.kind {
                TokenKind::Endif if level > 0 => break,
                TokenKind::Else if level > 0 && !in_else => break,
                TokenKind::If(ref expr) => {
                    let node = self.parse_conditional(expr, token.span, level + 1)?;
                    nodes.push(node);
                }
                TokenKind::Variable(name) => {
                    self.pos += 1;
                    nodes.push(Node::Variable(VariableNode {
                        name,
                        span: token.span,
                    }));
                }
                TokenKind::Include(path) => {
                    self.pos += 1;
                    nodes.push(Node::Include(IncludeNode {
                        path,
                        span: token.span,
                    }));
                }
                TokenKind::Text | TokenKind::Else | TokenKind::Endif => {
                    self.pos += 1;
                    self.push_text(&mut nodes, token.span);
                }
            }
        }

        Ok(nodes)
    }

    /// Parse a paired conditional whose `#if` token is at the current
    /// position.
    fn parse_conditional(&mut self, expr: &str, open: Span, level: usize) -> Result<Node> {
        if level > self.max_depth {
            return Err(PeError::MaxNestingExceeded {
                limit: self.max_depth,
            });
        }
        self.pos += 1;

        let then_body = self.parse_body(level, false)?;

        let else_body = match self.tokens.get(self.pos).map(|t| &t.kind) {
            Some(TokenKind::Else) => {
                self.pos += 1;
                Some(self.parse_body(level, true)?)
            }
            _ => None,
        };

        let end = match self.tokens.get(self.pos) {
            Some(token) if token.kind == TokenKind::Endif => {
                token.span.offset() + token.span.len()
            }
            _ => self.source.len(),
        };
        self.pos += 1;

        Ok(Node::Conditional(ConditionalNode {
            condition: Condition::parse(expr),
            then_body,
            else_body,
            span: span(open.offset(), end - open.offset()),
        }))
    }

    /// Append source text, merging with a preceding text node.
    fn push_text(&self, nodes: &mut Vec<Node>, at: Span) {
        let text = &self.source[at.offset()..at.offset() + at.len()];
        if let Some(Node::Text(last)) = nodes.last_mut() {
            if last.span.offset() + last.span.len() == at.offset() {
                last.text.push_str(text);
                last.span = span(last.span.offset(), last.span.len() + at.len());
                return;
            }
        }
        nodes.push(Node::Text(TextNode {
            text: text.to_string(),
            span: at,
        }));
    }
}

/// Pair every `#if` with its `#else` and `#endif` in a single stack pass and
/// turn every directive left without a partner into plain text.
fn demote_unpaired(tokens: &mut [Token]) {
    // (index of `#if`, index of its first `#else`)
    let mut open: Vec<(usize, Option<usize>)> = Vec::new();
    let mut unpaired = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::If(_) => open.push((i, None)),
            TokenKind::Else => match open.last_mut() {
                Some(block) if block.1.is_none() => block.1 = Some(i),
                _ => unpaired.push(i),
            },
            TokenKind::Endif => {
                if open.pop().is_none() {
                    unpaired.push(i);
                }
            }
            _ => {}
        }
    }
    for (if_idx, else_idx) in open {
        unpaired.push(if_idx);
        unpaired.extend(else_idx);
    }

    for i in unpaired {
        tokens[i].kind = TokenKind::Text;
    }
}

pub fn parse(source: &str, max_depth: usize) -> Result<Document> {
    Parser::new(source, max_depth).parse()
}
