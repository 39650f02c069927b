//! Length predicates: an exact number, or comparisons such as `>10` or
//! `>=5,<=20` (every comma-separated part must hold).

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Ge,
    Le,
    Gt,
    Lt,
    Eq,
}

impl Op {
    fn symbol(self) -> &'static str {
        match self {
            Op::Ge => ">=",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Lt => "<",
            Op::Eq => "==",
        }
    }

    fn holds(self, actual: i64, expected: i64) -> bool {
        match self {
            Op::Ge => actual >= expected,
            Op::Le => actual <= expected,
            Op::Gt => actual > expected,
            Op::Lt => actual < expected,
            Op::Eq => actual == expected,
        }
    }
}

/// Longest operators first so `>=` is not read as `>`.
const OPERATORS: [(&str, Op); 6] = [
    (">=", Op::Ge),
    ("<=", Op::Le),
    (">", Op::Gt),
    ("<", Op::Lt),
    ("==", Op::Eq),
    ("=", Op::Eq),
];

fn parse_comparison(part: &str) -> Option<(Op, i64)> {
    let part = part.trim();
    let (op, rest) = OPERATORS
        .iter()
        .find_map(|(prefix, op)| part.strip_prefix(*prefix).map(|rest| (*op, rest)))
        .unwrap_or((Op::Eq, part));
    rest.trim().parse().ok().map(|n| (op, n))
}

/// Check `actual` (a character count) against a length assertion value.
pub(super) fn check_length(value: &Value, actual: usize) -> (bool, Option<String>) {
    match value {
        Value::Number(n) => {
            let expected = n.as_f64().unwrap_or(f64::NAN);
            if actual as f64 == expected {
                (true, None)
            } else {
                (
                    false,
                    Some(format!(
                        "output length {actual} does not match expected length {n}"
                    )),
                )
            }
        }
        Value::String(spec) => check_comparisons(spec, actual),
        other => (
            false,
            Some(format!(
                "length value must be a number or comparison string, got {}",
                type_name(other)
            )),
        ),
    }
}

fn check_comparisons(spec: &str, actual: usize) -> (bool, Option<String>) {
    let actual = i64::try_from(actual).unwrap_or(i64::MAX);

    let mut comparisons = Vec::new();
    for part in spec.split(',') {
        match parse_comparison(part) {
            Some(comparison) => comparisons.push(comparison),
            None => {
                return (
                    false,
                    Some(format!("invalid length comparison: {}", spec.trim())),
                )
            }
        }
    }

    for (op, expected) in comparisons {
        if !op.holds(actual, expected) {
            let reason = match op {
                Op::Eq => format!("output length {actual} does not equal {expected}"),
                _ => format!("output length {actual} is not {} {expected}", op.symbol()),
            };
            return (false, Some(reason));
        }
    }

    (true, None)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
