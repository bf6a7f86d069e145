//! Single-threaded reference engine: read → filter → project → write.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::time::Instant;

use crate::helpers::line_helpers::{build_filtered_line, split_columns};
use crate::processor::context::ProcessingContext;
use crate::processor::report::RunReport;
use crate::processor::{log_path_for, validate_input, RowStats, RunConfig, SieveError};

pub const LABEL: &str = "SEQUENTIAL";

pub fn process_sequential(config: &RunConfig) -> Result<RunReport, SieveError> {
    validate_input(&config.input)?;
    let log_path = log_path_for(&config.output);
    let start = Instant::now();

    let reader = BufReader::new(File::open(&config.input)?);
    let mut lines = reader.lines();
    let header = lines
        .next()
        .ok_or_else(|| SieveError::EmptyInput(config.input.clone()))??;

    let ctx = ProcessingContext::build(
        &header,
        config.columns_spec.as_deref(),
        config.filter_expression.as_deref(),
        config.separator,
    )?;

    let mut output = BufWriter::new(File::create(&config.output)?);
    let mut log = BufWriter::new(File::create(&log_path)?);
    writeln!(output, "{}", ctx.filtered_header(config.separator))?;

    let stats = process_lines(lines, &mut output, &mut log, &ctx, config.separator)?;
    output.flush()?;
    log.flush()?;

    Ok(RunReport {
        label: LABEL,
        input: config.input.clone(),
        output: config.output.clone(),
        log: log_path,
        temp_dir: None,
        elapsed: start.elapsed(),
        stats,
    })
}

fn process_lines(
    lines: Lines<BufReader<File>>,
    output: &mut impl Write,
    log: &mut impl Write,
    ctx: &ProcessingContext,
    separator: char,
) -> Result<RowStats, SieveError> {
    // The header is physical line 1
    let mut line_number: u64 = 1;
    let mut stats = RowStats::default();

    for line in lines {
        let line = line?;
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }

        let cols = split_columns(&line, separator);
        if cols.len() != ctx.total_columns() {
            writeln!(
                log,
                "Line {line_number} invalid columns: {} (expected {})",
                cols.len(),
                ctx.total_columns()
            )?;
            stats.error_lines += 1;
            continue;
        }

        if !ctx.matches(&cols) {
            continue;
        }

        writeln!(
            output,
            "{}",
            build_filtered_line(&cols, ctx.selected_indexes(), separator)
        )?;
        stats.valid_lines += 1;
    }

    Ok(stats)
}
