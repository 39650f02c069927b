//! Evaluation of a parsed [`Document`] against a variable set.

use tracing::debug;

use super::ast::{Document, Node};
use super::include::IncludeResolver;
use super::lexer::{tokenize, TokenKind};
use super::parser::parse;
use super::value::{value_to_string, Variables};
use crate::error::{PeError, Result};

/// Renders AST nodes, selecting conditional branches and substituting
/// variables. Inclusion nodes left in the tree are expanded through the
/// resolver.
pub struct Renderer<'a> {
    vars: &'a Variables,
    resolver: &'a mut IncludeResolver,
    max_depth: usize,
}

impl<'a> Renderer<'a> {
    pub fn new(vars: &'a Variables, resolver: &'a mut IncludeResolver, max_depth: usize) -> Self {
        Self {
            vars,
            resolver,
            max_depth,
        }
    }

    pub fn render(&mut self, document: &Document) -> Result<String> {
        let mut out = String::new();
        self.render_nodes(&document.body, &mut out)?;
        Ok(out)
    }

    fn render_nodes(&mut self, nodes: &[Node], out: &mut String) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(&text.text),
                Node::Variable(var) => {
                    let value = lookup(self.vars, &var.name)?;
                    out.push_str(&self.resolver.protect(value));
                }
                Node::Include(include) => {
                    let content = self.resolver.include_file(&include.path)?;
                    let nested = parse(&content, self.max_depth)?;
                    self.render_nodes(&nested.body, out)?;
                }
                Node::Conditional(cond) => {
                    if cond.condition.evaluate(self.vars) {
                        self.render_nodes(&cond.then_body, out)?;
                    } else if let Some(else_body) = &cond.else_body {
                        self.render_nodes(else_body, out)?;
                    } else {
                        debug!(condition = ?cond.condition, "condition false, block dropped");
                    }
                }
            }
        }
        Ok(())
    }
}

fn lookup(vars: &Variables, name: &str) -> Result<String> {
    vars.get(name)
        .map(value_to_string)
        .ok_or_else(|| PeError::MissingVariable {
            name: name.to_string(),
        })
}

/// Replace `{{name}}` references in `text`, leaving every other directive
/// untouched.
pub fn substitute(text: &str, vars: &Variables) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    for token in tokenize(text) {
        match token.kind {
            TokenKind::Variable(name) => out.push_str(&lookup(vars, &name)?),
            _ => {
                let start = token.span.offset();
                out.push_str(&text[start..start + token.span.len()]);
            }
        }
    }
    Ok(out)
}

/// Variable names referenced in `text`, first-seen order, no duplicates.
pub fn extract_variables(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for token in tokenize(text) {
        if let TokenKind::Variable(name) = token.kind {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

/// Referenced variables that are absent from `vars`.
pub fn missing_variables(text: &str, vars: &Variables) -> Vec<String> {
    extract_variables(text)
        .into_iter()
        .filter(|name| !vars.contains_key(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn vars() -> Variables {
        let mut vars = Variables::new();
        vars.insert("name".into(), json!("World"));
        vars.insert("n".into(), json!(7));
        vars.insert("tags".into(), json!(["a", "b"]));
        vars
    }

    #[rstest]
    #[case("Hello, {{name}}!", "Hello, World!")]
    #[case("{{ name }} {{name}}", "World World")]
    #[case("n={{n}} tags={{tags}}", r#"n=7 tags=["a","b"]"#)]
    #[case("#if x then {{name}} #endif", "#if x then World #endif")]
    #[case(r#"{{file "a.txt"}}"#, r#"{{file "a.txt"}}"#)]
    fn test_substitute(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(substitute(text, &vars()).unwrap(), expected);
    }

    #[test]
    fn test_substitute_missing_names_variable() {
        let err = substitute("Hi {{who}}", &vars()).unwrap_err();
        assert!(matches!(err, PeError::MissingVariable { name } if name == "who"));
    }

    #[test]
    fn test_missing_variables_first_seen() {
        let text = "{{b}} {{name}} {{a}} {{b}} {{if x}}";
        assert_eq!(missing_variables(text, &vars()), vec!["b", "a"]);
    }

    #[test]
    fn test_render_document() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut resolver = IncludeResolver::new(dir.path());
        let vars = vars();
        let doc = parse("#if n == 7 then seven:{{n}} #else other #endif", 10).unwrap();

        let out = Renderer::new(&vars, &mut resolver, 10).render(&doc).unwrap();
        assert_eq!(out, "seven:7 ");
    }
}
