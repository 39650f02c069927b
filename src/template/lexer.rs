//! Lexer for prompt template directives.
//!
//! Splits a template into raw text and directive tokens. Every token carries
//! its [`Span`] in the source so later stages can splice or re-emit the
//! original text.

use super::ast::{span, Span};

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Raw text, including directive-like text that did not parse.
    Text,
    /// `{{name}}`
    Variable(String),
    /// `{{file "path"}}` or `#include "path"`
    Include(String),
    /// `#if <condition> then `
    If(String),
    /// `#else`
    Else,
    /// `#endif`
    Endif,
}

/// Keywords reserved inside `{{…}}`; they never name a variable.
const RESERVED_PREFIXES: [&str; 4] = ["file ", "if ", "else", "endif"];

pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    text_start: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            text_start: 0,
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> Vec<Token> {
        while self.pos < self.source.len() {
            let rest = &self.source[self.pos..];
            let next = rest.find(|c| c == '{' || c == '#');
            let Some(offset) = next else {
                self.pos = self.source.len();
                break;
            };
            self.pos += offset;

            let matched = if self.source[self.pos..].starts_with("{{") {
                self.lex_braces()
            } else {
                self.lex_hash()
            };

            if !matched {
                self.pos += 1;
            }
        }

        self.flush_text(self.source.len());
        self.tokens
    }

    fn flush_text(&mut self, end: usize) {
        if end > self.text_start {
            self.tokens.push(Token {
                kind: TokenKind::Text,
                span: span(self.text_start, end - self.text_start),
            });
        }
    }

    fn emit(&mut self, kind: TokenKind, len: usize) {
        self.flush_text(self.pos);
        self.tokens.push(Token {
            kind,
            span: span(self.pos, len),
        });
        self.pos += len;
        self.text_start = self.pos;
    }

    /// `{{…}}`: inclusion, variable, or literal text for reserved keywords.
    fn lex_braces(&mut self) -> bool {
        let body_src = &self.source[self.pos + 2..];
        let Some(body_len) = closing_offset(body_src) else {
            return false;
        };
        let body = &body_src[..body_len];
        let len = body_len + 4;

        if let Some(path) = legacy_include_path(body) {
            self.emit(TokenKind::Include(path.to_string()), len);
            return true;
        }

        let name = body.trim();
        if name.is_empty() || RESERVED_PREFIXES.iter().any(|p| name.starts_with(p)) {
            // Reserved or blank: keep it as text without re-scanning its body.
            self.pos += len;
            return true;
        }

        self.emit(TokenKind::Variable(name.to_string()), len);
        true
    }

    /// `#include`, `#if`, `#else`, `#endif`.
    fn lex_hash(&mut self) -> bool {
        let rest = &self.source[self.pos..];

        if let Some(after) = rest.strip_prefix("#include") {
            if let Some((path, consumed)) = quoted_after_whitespace(after) {
                let len = "#include".len() + consumed;
                self.emit(TokenKind::Include(path.to_string()), len);
                return true;
            }
            return false;
        }

        if let Some(after) = rest.strip_prefix("#endif") {
            if at_word_boundary(after) {
                self.emit(TokenKind::Endif, "#endif".len());
                return true;
            }
            return false;
        }

        if let Some(after) = rest.strip_prefix("#else") {
            if at_word_boundary(after) {
                let ws = leading_whitespace(after);
                self.emit(TokenKind::Else, "#else".len() + ws);
                return true;
            }
            return false;
        }

        if let Some(after) = rest.strip_prefix("#if") {
            if let Some((condition, consumed)) = if_header(after) {
                self.emit(TokenKind::If(condition.to_string()), "#if".len() + consumed);
                return true;
            }
        }

        false
    }
}

pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}

/// Byte length of a non-empty, brace-free body followed by `}}`.
pub(crate) fn closing_offset(body: &str) -> Option<usize> {
    for (idx, c) in body.char_indices() {
        match c {
            '{' => return None,
            '}' if idx > 0 && body[idx..].starts_with("}}") => return Some(idx),
            '}' => return None,
            _ => {}
        }
    }
    None
}

/// `file "path"` inside a `{{…}}` body.
fn legacy_include_path(body: &str) -> Option<&str> {
    let after = body.trim().strip_prefix("file")?;
    let (path, consumed) = quoted_after_whitespace(after)?;
    after[consumed..].trim().is_empty().then_some(path)
}

/// One or more whitespace characters, then a non-empty `"quoted"` string.
/// Returns the unquoted text and the number of bytes consumed.
fn quoted_after_whitespace(s: &str) -> Option<(&str, usize)> {
    let ws = leading_whitespace(s);
    if ws == 0 {
        return None;
    }
    let quoted = s[ws..].strip_prefix('"')?;
    let close = quoted.find('"')?;
    if close == 0 {
        return None;
    }
    Some((&quoted[..close], ws + close + 2))
}

/// Header of a conditional after `#if`: `<ws><condition><ws>then<ws>`.
///
/// The condition may not contain `#`; the first `then` surrounded by
/// whitespace ends it.
fn if_header(after: &str) -> Option<(&str, usize)> {
    if leading_whitespace(after) == 0 {
        return None;
    }

    let limit = after.find('#').unwrap_or(after.len());
    let mut search_from = 0;

    while let Some(found) = after[search_from..limit].find("then") {
        let then_at = search_from + found;
        let before = &after[..then_at];
        let tail = &after[then_at + "then".len()..];

        let spaced_before = before.ends_with(char::is_whitespace);
        let spaced_after = leading_whitespace(tail) > 0;
        let condition = before.trim();

        if spaced_before && spaced_after && !condition.is_empty() {
            let consumed = then_at + "then".len() + leading_whitespace(tail);
            return Some((condition, consumed));
        }
        search_from = then_at + "then".len();
    }

    None
}

fn leading_whitespace(s: &str) -> usize {
    s.len() - s.trim_start().len()
}

fn at_word_boundary(s: &str) -> bool {
    s.chars()
        .next()
        .map_or(true, |c| !(c.is_alphanumeric() || c == '_'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    fn texts(source: &str) -> Vec<&str> {
        tokenize(source)
            .into_iter()
            .map(|t| &source[t.span.offset()..t.span.offset() + t.span.len()])
            .collect()
    }

    #[test]
    fn test_variables_and_text() {
        assert_eq!(
            kinds("Hello, {{ name }}!"),
            vec![
                TokenKind::Text,
                TokenKind::Variable("name".into()),
                TokenKind::Text
            ]
        );
    }

    #[rstest]
    #[case(r#"{{file "a.txt"}}"#, "a.txt")]
    #[case(r#"{{file   "dir/b.txt"}}"#, "dir/b.txt")]
    #[case(r#"#include "c.txt""#, "c.txt")]
    #[case("#include\t\"/abs/d.txt\"", "/abs/d.txt")]
    fn test_include_forms(#[case] source: &str, #[case] path: &str) {
        assert_eq!(kinds(source), vec![TokenKind::Include(path.into())]);
    }

    #[rstest]
    #[case("#include c.txt")]
    #[case(r#"#include"c.txt""#)]
    #[case(r#"#include """#)]
    fn test_malformed_include_is_text(#[case] source: &str) {
        assert_eq!(kinds(source), vec![TokenKind::Text]);
    }

    #[test]
    fn test_conditional_tokens() {
        let source = "#if show then Hi #else Bye #endif";
        assert_eq!(
            kinds(source),
            vec![
                TokenKind::If("show".into()),
                TokenKind::Text,
                TokenKind::Else,
                TokenKind::Text,
                TokenKind::Endif
            ]
        );
        assert_eq!(
            texts(source),
            vec!["#if show then ", "Hi ", "#else ", "Bye ", "#endif"]
        );
    }

    #[test]
    fn test_condition_with_operator() {
        assert_eq!(
            kinds(r#"#if name == "then" then x #endif"#)[0],
            TokenKind::If(r#"name == "then""#.into())
        );
    }

    #[rstest]
    #[case("#ifx then y")]
    #[case("#if x thenny")]
    #[case("#if # then y")]
    #[case("#elsewhere #endiffy")]
    fn test_near_misses_are_text(#[case] source: &str) {
        assert!(kinds(source).iter().all(|k| *k == TokenKind::Text));
    }

    #[rstest]
    #[case("{{if x}}")]
    #[case("{{else}}")]
    #[case("{{endif}}")]
    #[case("{{   }}")]
    fn test_reserved_braces_are_text(#[case] source: &str) {
        assert_eq!(kinds(source), vec![TokenKind::Text]);
    }

    #[test]
    fn test_triple_brace_matches_inner_pair() {
        assert_eq!(
            kinds("{{{a}}}"),
            vec![
                TokenKind::Text,
                TokenKind::Variable("a".into()),
                TokenKind::Text
            ]
        );
    }
}
