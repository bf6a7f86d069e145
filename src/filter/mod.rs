use std::collections::HashMap;

use crate::processor::SieveError;

pub mod parser;

/// Comparison operator of a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

/// A single `column op literal` leaf.
///
/// Evaluation is total: a row that cannot be compared (index out of
/// bounds, unparseable number, unsupported string operator) simply does
/// not match. Malformed rows are the column-count validator's business,
/// not the filter's.
#[derive(Debug, Clone)]
pub struct Condition {
    column_index: usize,
    op: CompareOp,
    literal: String,
    numeric: bool,
}

impl Condition {
    pub fn new(column_index: usize, op: CompareOp, literal: String, numeric: bool) -> Self {
        Condition {
            column_index,
            op,
            literal,
            numeric,
        }
    }

    pub fn matches(&self, columns: &[&str]) -> bool {
        let Some(value) = columns.get(self.column_index) else {
            return false;
        };

        if self.numeric {
            let (Ok(v), Ok(target)) = (
                fast_float::parse::<f64, _>(value.trim()),
                fast_float::parse::<f64, _>(self.literal.as_str()),
            ) else {
                return false;
            };
            match self.op {
                CompareOp::Eq => v == target,
                CompareOp::Ne => v != target,
                CompareOp::Lt => v < target,
                CompareOp::Gt => v > target,
                CompareOp::Le => v <= target,
                CompareOp::Ge => v >= target,
            }
        } else {
            let value = strip_quotes(value);
            let literal = strip_quotes(&self.literal);
            // String comparison only supports equality
            match self.op {
                CompareOp::Eq => value == literal,
                CompareOp::Ne => value != literal,
                _ => false,
            }
        }
    }
}

/// Compiled row filter.
///
/// OR binds looser than AND: `a = 1 AND b = 2 OR c = 3` is
/// `(a=1 ∧ b=2) ∨ c=3`.
#[derive(Debug, Clone)]
pub enum RowFilter {
    And(Vec<RowFilter>),
    Or(Vec<RowFilter>),
    Condition(Condition),
}

impl RowFilter {
    pub fn matches(&self, columns: &[&str]) -> bool {
        match self {
            RowFilter::And(children) => children.iter().all(|f| f.matches(columns)),
            RowFilter::Or(children) => children.iter().any(|f| f.matches(columns)),
            RowFilter::Condition(cond) => cond.matches(columns),
        }
    }
}

/// Maps trimmed header names to 0-based positions.
///
/// Duplicate names keep the last occurrence.
#[derive(Debug)]
pub struct ColumnIndexResolver {
    index_by_name: HashMap<String, usize>,
}

impl ColumnIndexResolver {
    pub fn new<S: AsRef<str>>(header_cols: &[S]) -> Self {
        let mut index_by_name = HashMap::new();
        for (i, name) in header_cols.iter().enumerate() {
            index_by_name.insert(name.as_ref().trim().to_string(), i);
        }
        ColumnIndexResolver { index_by_name }
    }

    pub fn index_of(&self, column_name: &str) -> Result<usize, SieveError> {
        let trimmed = column_name.trim();
        if trimmed.is_empty() {
            return Err(SieveError::ColumnNotFound(column_name.to_string()));
        }
        self.index_by_name
            .get(trimmed)
            .copied()
            .ok_or_else(|| SieveError::ColumnNotFound(column_name.to_string()))
    }

    pub fn has_column(&self, column_name: &str) -> bool {
        self.index_by_name.contains_key(column_name.trim())
    }
}

/// Removes one pair of surrounding double quotes after trimming.
pub(crate) fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// A literal is numeric iff it is unquoted and parses as a double.
pub(crate) fn looks_numeric(s: &str) -> bool {
    let s = s.trim();
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        return false;
    }
    fast_float::parse::<f64, _>(s).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&'static str]) -> Vec<&'static str> {
        cells.to_vec()
    }

    #[test]
    fn test_numeric_condition_operators() {
        let cols = row(&["alice", "30"]);
        let cond = |op| Condition::new(1, op, "18".to_string(), true);

        assert!(cond(CompareOp::Ge).matches(&cols));
        assert!(cond(CompareOp::Gt).matches(&cols));
        assert!(cond(CompareOp::Ne).matches(&cols));
        assert!(!cond(CompareOp::Eq).matches(&cols));
        assert!(!cond(CompareOp::Le).matches(&cols));
        assert!(!cond(CompareOp::Lt).matches(&cols));
    }

    #[test]
    fn test_numeric_condition_rejects_unparseable_cell() {
        let cond = Condition::new(0, CompareOp::Gt, "5".to_string(), true);
        assert!(!cond.matches(&row(&["abc"])));
    }

    #[test]
    fn test_string_condition_strips_quotes_on_both_sides() {
        let eq = Condition::new(1, CompareOp::Eq, "\"Coyoacan\"".to_string(), false);
        assert!(eq.matches(&row(&["a", "Coyoacan"])));
        assert!(eq.matches(&row(&["a", "\"Coyoacan\""])));
        assert!(!eq.matches(&row(&["a", "Roma"])));

        let ne = Condition::new(1, CompareOp::Ne, "Roma".to_string(), false);
        assert!(ne.matches(&row(&["a", "Coyoacan"])));
    }

    #[test]
    fn test_string_condition_rejects_ordering_operators() {
        let cond = Condition::new(0, CompareOp::Lt, "zzz".to_string(), false);
        assert!(!cond.matches(&row(&["abc"])));
    }

    #[test]
    fn test_out_of_bounds_column_never_matches() {
        let cond = Condition::new(7, CompareOp::Eq, "x".to_string(), false);
        assert!(!cond.matches(&row(&["a", "b"])));
    }

    #[test]
    fn test_and_or_short_circuit_semantics() {
        let age_ok = Condition::new(0, CompareOp::Ge, "18".to_string(), true);
        let city_ok = Condition::new(1, CompareOp::Eq, "X".to_string(), false);
        let filter = RowFilter::Or(vec![
            RowFilter::Condition(age_ok),
            RowFilter::Condition(city_ok),
        ]);

        assert!(filter.matches(&row(&["30", "Y"])));
        assert!(filter.matches(&row(&["10", "X"])));
        assert!(!filter.matches(&row(&["10", "Y"])));
    }

    #[test]
    fn test_resolver_trims_and_keeps_last_duplicate() {
        let resolver = ColumnIndexResolver::new(&[" name ", "age", "name"]);
        assert_eq!(resolver.index_of("name").unwrap(), 2);
        assert_eq!(resolver.index_of(" age ").unwrap(), 1);
        assert!(resolver.has_column("age"));
        assert!(!resolver.has_column("city"));
        assert!(resolver.index_of("city").is_err());
        assert!(resolver.index_of("  ").is_err());
    }

    #[test]
    fn test_looks_numeric_classification() {
        assert!(looks_numeric("42"));
        assert!(looks_numeric(" 3.5 "));
        assert!(looks_numeric("-1e3"));
        assert!(!looks_numeric("\"42\""));
        assert!(!looks_numeric("abc"));
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("\"x\""), "x");
        assert_eq!(strip_quotes(" \"x\" "), "x");
        assert_eq!(strip_quotes("\""), "\"");
        assert_eq!(strip_quotes("plain"), "plain");
    }
}
