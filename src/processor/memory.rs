//! In-memory batch concurrent engine.
//!
//! A single reader streams the input and groups data lines into
//! batches handed to a pool of worker threads over a bounded channel
//! (back-pressure: the reader blocks when the pool is saturated).
//! Workers never touch shared files; each returns an immutable
//! [`BatchResult`] whose output and log text the manager appends in
//! batch-number order, so the output order is the input order. This is
//! the fast mode: it trades the file-part engine's split-and-merge I/O
//! for one batch of memory per in-flight task.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::thread;
use std::time::Instant;

use crossbeam_channel::{bounded, Sender};
use tracing::info;

use crate::helpers::line_helpers::{build_filtered_line, split_columns};
use crate::processor::context::ProcessingContext;
use crate::processor::report::RunReport;
use crate::processor::{log_path_for, validate_input, RowStats, RunConfig, SieveError};

pub const LABEL: &str = "CONCURRENT IN-MEMORY";

const READ_BUFFER_SIZE: usize = 1024 * 1024;
const WRITE_BUFFER_SIZE: usize = 1024 * 1024;
const LOG_BUFFER_SIZE: usize = 64 * 1024;

struct Batch {
    number: usize,
    lines: Vec<String>,
}

/// What one worker hands back for one batch.
///
/// `processed_lines` counts only rows that made it into `output_text`.
#[derive(Debug)]
pub struct BatchResult {
    pub batch_number: usize,
    pub output_text: String,
    pub log_text: String,
    pub processed_lines: u64,
    pub error_lines: u64,
}

pub fn process_in_memory(config: &RunConfig) -> Result<RunReport, SieveError> {
    validate_input(&config.input)?;
    let log_path = log_path_for(&config.output);
    let num_workers = config.resolve_parts();
    let batch_lines = config.batch_lines.max(1);
    let start = Instant::now();

    let reader = BufReader::with_capacity(READ_BUFFER_SIZE, File::open(&config.input)?);
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

    let mut output = BufWriter::with_capacity(WRITE_BUFFER_SIZE, File::create(&config.output)?);
    let mut log = BufWriter::with_capacity(LOG_BUFFER_SIZE, File::create(&log_path)?);
    writeln!(output, "{}", ctx.filtered_header(config.separator))?;

    info!(
        cpus = num_cpus::get(),
        workers = num_workers,
        batch_lines,
        "dispatching in-memory batches"
    );

    let stats = run_pipeline(
        lines,
        &ctx,
        config.separator,
        batch_lines,
        num_workers,
        &mut output,
        &mut log,
    )?;
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

fn run_pipeline(
    lines: Lines<BufReader<File>>,
    ctx: &ProcessingContext,
    separator: char,
    batch_lines: usize,
    num_workers: usize,
    output: &mut impl Write,
    log: &mut impl Write,
) -> Result<RowStats, SieveError> {
    thread::scope(|scope| -> Result<RowStats, SieveError> {
        // Bounded submission: the reader blocks once 2×workers batches
        // are queued. Both channels are locals of this closure so that
        // an early error return drops them before the scope joins,
        // letting blocked workers observe the disconnect.
        let (batch_tx, batch_rx) = bounded::<Batch>(num_workers * 2);
        let (result_tx, result_rx) = bounded::<BatchResult>(num_workers * 2);

        let reader_handle = scope.spawn(move || read_batches(lines, batch_tx, batch_lines));

        for _ in 0..num_workers {
            let batch_rx = batch_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                while let Ok(batch) = batch_rx.recv() {
                    let result = process_batch(ctx, &batch, separator);
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
            });
        }
        drop(batch_rx);
        drop(result_tx);

        // Results come back in completion order; the pending map holds
        // them until their batch number is next, so writes happen in
        // submission order
        let mut stats = RowStats::default();
        let mut pending: HashMap<usize, BatchResult> = HashMap::new();
        let mut next_batch = 0usize;
        for result in result_rx.iter() {
            pending.insert(result.batch_number, result);
            while let Some(result) = pending.remove(&next_batch) {
                write_batch(output, log, &result, &mut stats)?;
                next_batch += 1;
            }
        }
        debug_assert!(pending.is_empty());

        match reader_handle.join() {
            Ok(read_result) => read_result?,
            Err(_) => return Err(SieveError::WorkerPanic("batch reader thread".into())),
        }
        Ok(stats)
    })
}

fn read_batches(
    lines: Lines<BufReader<File>>,
    batch_tx: Sender<Batch>,
    batch_lines: usize,
) -> Result<(), SieveError> {
    let mut number = 0usize;
    let mut current: Vec<String> = Vec::with_capacity(batch_lines);

    for line in lines {
        let line = line?;
        // Blank lines are never rows
        if line.trim().is_empty() {
            continue;
        }
        current.push(line);
        if current.len() >= batch_lines {
            let lines = std::mem::replace(&mut current, Vec::with_capacity(batch_lines));
            if batch_tx.send(Batch { number, lines }).is_err() {
                return Ok(());
            }
            number += 1;
        }
    }

    // Trailing partial batch
    if !current.is_empty() {
        let _ = batch_tx.send(Batch {
            number,
            lines: current,
        });
    }
    Ok(())
}

fn process_batch(ctx: &ProcessingContext, batch: &Batch, separator: char) -> BatchResult {
    let mut output_text = String::new();
    let mut log_text = String::new();
    let mut processed_lines = 0u64;
    let mut error_lines = 0u64;

    for line in &batch.lines {
        let cols = split_columns(line, separator);
        if cols.len() != ctx.total_columns() {
            log_text.push_str(&format!(
                "Batch {} - Error in line: invalid columns: {} (expected {}) | Content: {line}\n",
                batch.number,
                cols.len(),
                ctx.total_columns()
            ));
            error_lines += 1;
            continue;
        }

        if !ctx.matches(&cols) {
            continue;
        }

        output_text.push_str(&build_filtered_line(&cols, ctx.selected_indexes(), separator));
        output_text.push('\n');
        processed_lines += 1;
    }

    BatchResult {
        batch_number: batch.number,
        output_text,
        log_text,
        processed_lines,
        error_lines,
    }
}

fn write_batch(
    output: &mut impl Write,
    log: &mut impl Write,
    result: &BatchResult,
    stats: &mut RowStats,
) -> Result<(), SieveError> {
    if !result.output_text.is_empty() {
        output.write_all(result.output_text.as_bytes())?;
    }
    if !result.log_text.is_empty() {
        log.write_all(result.log_text.as_bytes())?;
    }
    stats.valid_lines += result.processed_lines;
    stats.error_lines += result.error_lines;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_batch_counts_and_formats() {
        let ctx = ProcessingContext::build("a,b", None, Some("a >= 2"), ',').unwrap();
        let batch = Batch {
            number: 3,
            lines: vec![
                "1,x".to_string(),
                "2,y".to_string(),
                "bad,row,here".to_string(),
            ],
        };

        let result = process_batch(&ctx, &batch, ',');
        assert_eq!(result.batch_number, 3);
        assert_eq!(result.output_text, "2,y\n");
        assert_eq!(
            result.log_text,
            "Batch 3 - Error in line: invalid columns: 3 (expected 2) | Content: bad,row,here\n"
        );
        assert_eq!(result.processed_lines, 1);
        assert_eq!(result.error_lines, 1);
    }
}
