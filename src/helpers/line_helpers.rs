use crate::processor::SieveError;

/// Splits a line on the single-character separator.
///
/// Trailing empty fields are preserved, so `"a,b,"` yields three
/// columns.
pub fn split_columns(line: &str, separator: char) -> Vec<&str> {
    line.split(separator).collect()
}

pub fn count_columns(header_line: &str, separator: char) -> usize {
    split_columns(header_line, separator).len()
}

/// Projects a row onto the selected indices, in selection order.
///
/// An index outside the row renders as an empty field.
pub fn build_filtered_line(cols: &[&str], selected_indexes: &[usize], separator: char) -> String {
    let mut out = String::new();
    for (i, &idx) in selected_indexes.iter().enumerate() {
        if i > 0 {
            out.push(separator);
        }
        if let Some(col) = cols.get(idx) {
            out.push_str(col);
        }
    }
    out
}

/// Interprets a column-selection spec against a header of
/// `total_columns` columns.
///
/// Empty, absent or `"*"` selects every column in header order.
/// Anything else is a comma-separated list of 1-based column numbers,
/// mapped to 0-based indices. Order is preserved and duplicates are
/// allowed, so `"3,1,1"` reorders and repeats columns in the output.
pub fn parse_column_selection(
    spec: Option<&str>,
    total_columns: usize,
) -> Result<Vec<usize>, SieveError> {
    let spec = spec.map(str::trim).unwrap_or("");
    if spec.is_empty() || spec == "*" {
        return Ok((0..total_columns).collect());
    }

    let mut indexes = Vec::new();
    for token in spec.split(',') {
        let token = token.trim();
        let col_num: usize = token
            .parse()
            .map_err(|_| SieveError::BadColumnSpec(format!("not a column number: {token:?}")))?;
        if col_num < 1 || col_num > total_columns {
            return Err(SieveError::BadColumnSpec(format!(
                "column out of range: {col_num} (header has {total_columns})"
            )));
        }
        indexes.push(col_num - 1);
    }
    Ok(indexes)
}
