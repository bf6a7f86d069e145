use crate::filter::{parser, ColumnIndexResolver, RowFilter};
use crate::helpers::line_helpers::{build_filtered_line, parse_column_selection, split_columns};
use crate::processor::SieveError;

/// The compiled, immutable per-run plan.
///
/// Built once from the header line, then shared by reference with every
/// worker; nothing in here changes after construction.
#[derive(Debug)]
pub struct ProcessingContext {
    header: Vec<String>,
    total_columns: usize,
    selected_indexes: Vec<usize>,
    filter: Option<RowFilter>,
}

impl ProcessingContext {
    pub fn build(
        header_line: &str,
        columns_spec: Option<&str>,
        filter_expression: Option<&str>,
        separator: char,
    ) -> Result<Self, SieveError> {
        let header: Vec<String> = split_columns(header_line, separator)
            .into_iter()
            .map(str::to_string)
            .collect();
        let total_columns = header.len();
        let selected_indexes = parse_column_selection(columns_spec, total_columns)?;
        let resolver = ColumnIndexResolver::new(&header);
        let filter = parser::compile(filter_expression, &resolver);

        Ok(ProcessingContext {
            header,
            total_columns,
            selected_indexes,
            filter,
        })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn total_columns(&self) -> usize {
        self.total_columns
    }

    pub fn selected_indexes(&self) -> &[usize] {
        &self.selected_indexes
    }

    pub fn filter(&self) -> Option<&RowFilter> {
        self.filter.as_ref()
    }

    /// The header projected onto the selected columns.
    pub fn filtered_header(&self, separator: char) -> String {
        let cols: Vec<&str> = self.header.iter().map(String::as_str).collect();
        build_filtered_line(&cols, &self.selected_indexes, separator)
    }

    /// Absent filter ⇒ every row passes.
    pub fn matches(&self, columns: &[&str]) -> bool {
        self.filter.as_ref().is_none_or(|f| f.matches(columns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_selects_and_compiles() {
        let ctx =
            ProcessingContext::build("name,age,city", Some("3,1"), Some("age >= 18"), ',').unwrap();
        assert_eq!(ctx.total_columns(), 3);
        assert_eq!(ctx.selected_indexes(), &[2, 0]);
        assert_eq!(ctx.filtered_header(','), "city,name");
        assert!(ctx.filter().is_some());
        assert!(ctx.matches(&["bob", "20", "Roma"]));
        assert!(!ctx.matches(&["bob", "17", "Roma"]));
    }

    #[test]
    fn test_absent_filter_passes_everything() {
        let ctx = ProcessingContext::build("a,b", None, None, ',').unwrap();
        assert!(ctx.matches(&["1", "2"]));
        assert_eq!(ctx.filtered_header(','), "a,b");
    }

    #[test]
    fn test_bad_selection_propagates() {
        assert!(ProcessingContext::build("a,b", Some("9"), None, ',').is_err());
    }
}
