//! Filter expression parser.
//!
//! Top-down: the expression is split on case-insensitive, whitespace
//! bounded `OR` into AND groups, each group is split on `AND` into
//! conditions, and each condition is `column op literal`. Fragments
//! that fail to parse (no operator, unknown column) are dropped with a
//! diagnostic and compilation continues with whatever survives.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::filter::{looks_numeric, ColumnIndexResolver, CompareOp, Condition, RowFilter};

static OR_SPLIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\s+OR\s+").unwrap());
static AND_SPLIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\s+AND\s+").unwrap());

// Two-character operators come first so `<=` is not read as `<`.
const OPERATORS: [(&str, CompareOp); 6] = [
    ("<=", CompareOp::Le),
    (">=", CompareOp::Ge),
    ("!=", CompareOp::Ne),
    ("=", CompareOp::Eq),
    ("<", CompareOp::Lt),
    (">", CompareOp::Gt),
];

/// Compiles an optional expression; `None` and blank both mean
/// "no filter" (every row passes).
pub fn compile(expression: Option<&str>, resolver: &ColumnIndexResolver) -> Option<RowFilter> {
    expression.and_then(|expr| parse(expr, resolver))
}

/// Parses an expression into a filter tree, or `None` when nothing
/// usable remains.
pub fn parse(expression: &str, resolver: &ColumnIndexResolver) -> Option<RowFilter> {
    let expr = expression.trim();
    if expr.is_empty() {
        return None;
    }

    let mut or_children: Vec<RowFilter> = Vec::new();
    for or_part in OR_SPLIT.split(expr) {
        if let Some(and_group) = build_and_group(or_part, resolver) {
            or_children.push(and_group);
        }
    }

    match or_children.len() {
        0 => None,
        1 => or_children.pop(),
        _ => Some(RowFilter::Or(or_children)),
    }
}

fn build_and_group(expr: &str, resolver: &ColumnIndexResolver) -> Option<RowFilter> {
    let expr = expr.trim();
    if expr.is_empty() {
        return None;
    }

    let mut children: Vec<RowFilter> = Vec::new();
    for and_part in AND_SPLIT.split(expr) {
        if let Some(cond) = parse_condition(and_part, resolver) {
            children.push(RowFilter::Condition(cond));
        }
    }

    match children.len() {
        0 => None,
        1 => children.pop(),
        _ => Some(RowFilter::And(children)),
    }
}

fn parse_condition(fragment: &str, resolver: &ColumnIndexResolver) -> Option<Condition> {
    let trimmed = fragment.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut found = None;
    for (symbol, op) in OPERATORS {
        if let Some(pos) = trimmed.find(symbol) {
            found = Some((pos, symbol, op));
            break;
        }
    }
    let Some((pos, symbol, op)) = found else {
        warn!("unrecognized filter condition: {trimmed}");
        return None;
    };

    let left = trimmed[..pos].trim();
    let right = trimmed[pos + symbol.len()..].trim();

    let column_index = match resolver.index_of(left) {
        Ok(idx) => idx,
        Err(err) => {
            warn!("{err}; condition dropped");
            return None;
        }
    };

    let numeric = looks_numeric(right);
    Some(Condition::new(column_index, op, right.to_string(), numeric))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> ColumnIndexResolver {
        ColumnIndexResolver::new(&["age", "stress", "city"])
    }

    #[test]
    fn test_blank_expression_is_absent_filter() {
        assert!(parse("", &resolver()).is_none());
        assert!(parse("   ", &resolver()).is_none());
        assert!(compile(None, &resolver()).is_none());
    }

    #[test]
    fn test_single_condition() {
        let filter = parse("age >= 18", &resolver()).unwrap();
        assert!(matches!(filter, RowFilter::Condition(_)));
        assert!(filter.matches(&["18", "0", "Y"]));
        assert!(!filter.matches(&["17", "0", "Y"]));
    }

    #[test]
    fn test_or_binds_looser_than_and() {
        let filter = parse("age >= 18 AND stress >= 7 OR city = \"X\"", &resolver()).unwrap();
        assert!(matches!(filter, RowFilter::Or(_)));

        // (age>=18 ∧ stress>=7) ∨ city="X"
        assert!(filter.matches(&["20", "8", "Y"]));
        assert!(filter.matches(&["10", "1", "X"]));
        assert!(!filter.matches(&["20", "1", "Y"]));
        assert!(!filter.matches(&["10", "8", "Y"]));
    }

    #[test]
    fn test_connectives_are_case_insensitive() {
        let filter = parse("age > 1 and stress > 1 or city = Z", &resolver()).unwrap();
        assert!(filter.matches(&["2", "2", "Q"]));
        assert!(filter.matches(&["0", "0", "Z"]));
    }

    #[test]
    fn test_two_char_operators_win_over_one_char() {
        let le = parse("age <= 5", &resolver()).unwrap();
        assert!(le.matches(&["5", "0", ""]));

        let ne = parse("city != \"Roma\"", &resolver()).unwrap();
        assert!(ne.matches(&["0", "0", "Coyoacan"]));
        assert!(!ne.matches(&["0", "0", "Roma"]));
    }

    #[test]
    fn test_unknown_column_drops_condition() {
        // Only condition unknown: the whole filter vanishes
        assert!(parse("nope = \"x\"", &resolver()).is_none());

        // One of two: the AND group collapses to the surviving leaf
        let filter = parse("nope = 1 AND age > 2", &resolver()).unwrap();
        assert!(matches!(filter, RowFilter::Condition(_)));
        assert!(filter.matches(&["3", "0", ""]));
    }

    #[test]
    fn test_condition_without_operator_is_dropped() {
        assert!(parse("age", &resolver()).is_none());
        let filter = parse("garbage OR age > 1", &resolver()).unwrap();
        assert!(matches!(filter, RowFilter::Condition(_)));
    }

    #[test]
    fn test_quoted_literal_is_string_unquoted_number_is_numeric() {
        let quoted = parse("city = \"10\"", &resolver()).unwrap();
        assert!(quoted.matches(&["0", "0", "10"]));
        // "10.0" is not byte-equal to "10" under string comparison
        assert!(!quoted.matches(&["0", "0", "10.0"]));

        let numeric = parse("age = 10", &resolver()).unwrap();
        assert!(numeric.matches(&["10.0", "0", ""]));
    }
}
