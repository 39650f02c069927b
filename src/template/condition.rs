//! Conditional expressions used by `#if`.
//!
//! The grammar is deliberately small: `left == right`, `left != right`, or a
//! bare variable name tested for truthiness. There is no `&&` or `||`.

use tracing::debug;

use super::value::{is_truthy, value_to_string, Variables};

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// `"literal"`, compared as-is.
    Quoted(String),
    /// A variable name if one is defined, otherwise a literal.
    Word(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equals { left: String, right: Operand },
    NotEquals { left: String, right: Operand },
    Truthy(String),
}

impl Condition {
    /// Parse an expression. Never fails: anything that is not a comparison is
    /// treated as a variable name.
    pub fn parse(expr: &str) -> Self {
        if let Some((left, right)) = expr.split_once("==") {
            return Condition::Equals {
                left: left.trim().to_string(),
                right: Operand::parse(right),
            };
        }
        if let Some((left, right)) = expr.split_once("!=") {
            return Condition::NotEquals {
                left: left.trim().to_string(),
                right: Operand::parse(right),
            };
        }
        Condition::Truthy(expr.trim().to_string())
    }

    pub fn evaluate(&self, vars: &Variables) -> bool {
        let result = match self {
            Condition::Equals { left, right } => match vars.get(left) {
                Some(value) => value_to_string(value) == right.resolve(vars),
                None => false,
            },
            Condition::NotEquals { left, right } => match vars.get(left) {
                Some(value) => value_to_string(value) != right.resolve(vars),
                None => true,
            },
            Condition::Truthy(name) => vars.get(name).is_some_and(is_truthy),
        };
        debug!(condition = ?self, result, "evaluated condition");
        result
    }
}

impl Operand {
    fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
        {
            Some(inner) => Operand::Quoted(inner.to_string()),
            None => Operand::Word(raw.to_string()),
        }
    }

    fn resolve(&self, vars: &Variables) -> String {
        match self {
            Operand::Quoted(literal) => literal.clone(),
            Operand::Word(word) => vars
                .get(word)
                .map(value_to_string)
                .unwrap_or_else(|| word.clone()),
        }
    }
}

/// Parse and evaluate `expr` against `vars` in one step.
pub fn evaluate(expr: &str, vars: &Variables) -> bool {
    Condition::parse(expr).evaluate(vars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn vars() -> Variables {
        let mut vars = Variables::new();
        vars.insert("lang".into(), json!("rust"));
        vars.insert("other".into(), json!("rust"));
        vars.insert("count".into(), json!(3));
        vars.insert("zero".into(), json!(0));
        vars.insert("flag".into(), json!(true));
        vars.insert("off".into(), json!(false));
        vars.insert("empty".into(), json!(""));
        vars
    }

    #[rstest]
    #[case(r#"lang == "rust""#, true)]
    #[case(r#"lang == "go""#, false)]
    #[case("lang == other", true)]
    #[case("lang == rust", true)]
    #[case("count == 3", true)]
    #[case(r#"count == "3""#, true)]
    #[case("flag == true", true)]
    #[case("missing == x", false)]
    #[case(r#"lang != "go""#, true)]
    #[case("lang != other", false)]
    #[case("missing != x", true)]
    #[case("flag", true)]
    #[case("off", false)]
    #[case("empty", false)]
    #[case("count", true)]
    #[case("zero", false)]
    #[case("missing", false)]
    #[case("  flag  ", true)]
    fn test_evaluate(#[case] expr: &str, #[case] expected: bool) {
        assert_eq!(evaluate(expr, &vars()), expected);
    }

    #[test]
    fn test_equality_checked_before_inequality() {
        assert_eq!(
            Condition::parse("a == b != c"),
            Condition::Equals {
                left: "a".into(),
                right: Operand::Word("b != c".into())
            }
        );
    }

    #[test]
    fn test_lone_quote_is_a_word() {
        assert_eq!(
            Condition::parse(r#"a == ""#),
            Condition::Equals {
                left: "a".into(),
                right: Operand::Word("\"".into())
            }
        );
    }
}
