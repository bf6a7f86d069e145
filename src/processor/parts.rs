//! File-part concurrent engine.
//!
//! The input's data lines are split into N contiguous, equal-sized
//! chunks written as headerless part files under a temp directory next
//! to the output. One Rayon task per part filters and projects its
//! file into `part_i_out.csv`; a single merge pass then concatenates
//! the partial outputs in index order, which preserves input order end
//! to end. The temp directory is removed on every exit path.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use memchr::memchr_iter;
use memmap2::Mmap;
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};
use tracing::warn;

use crate::helpers::line_helpers::{build_filtered_line, split_columns};
use crate::processor::context::ProcessingContext;
use crate::processor::log::ErrorLog;
use crate::processor::report::{file_name, RunReport};
use crate::processor::{log_path_for, validate_input, RowStats, RunConfig, SieveError};

pub const LABEL: &str = "CONCURRENT";

const TEMP_DIR_NAME: &str = "tmp_parts";

pub fn process_in_parts(config: &RunConfig) -> Result<RunReport, SieveError> {
    validate_input(&config.input)?;
    let log_path = log_path_for(&config.output);
    // Truncate any log left over from a previous run; workers append
    File::create(&log_path)?;

    let num_parts = config.resolve_parts();
    let temp_dir = TempDirGuard::create(&config.output)?;
    let temp_path = temp_dir.path().to_path_buf();
    let start = Instant::now();

    let split = split_into_parts(&config.input, temp_dir.path(), num_parts)?;
    let ctx = ProcessingContext::build(
        &split.header_line,
        config.columns_spec.as_deref(),
        config.filter_expression.as_deref(),
        config.separator,
    )?;

    let error_log = ErrorLog::new(&log_path);
    let (part_outputs, stats) = process_parts(
        &split.part_files,
        &ctx,
        &error_log,
        temp_dir.path(),
        config.separator,
    )?;
    merge_outputs(&config.output, &ctx, &part_outputs, config.separator)?;

    Ok(RunReport {
        label: LABEL,
        input: config.input.clone(),
        output: config.output.clone(),
        log: log_path,
        temp_dir: Some(temp_path),
        elapsed: start.elapsed(),
        stats,
    })
}

struct SplitResult {
    header_line: String,
    part_files: Vec<PathBuf>,
}

/// Distributes the non-blank data lines over `num_parts` headerless
/// part files, contiguous chunks in input order: `base = total / N`
/// lines each, one extra for the first `total % N` parts.
fn split_into_parts(
    input: &Path,
    temp_dir: &Path,
    num_parts: usize,
) -> Result<SplitResult, SieveError> {
    if num_parts == 0 {
        return Err(SieveError::InvalidParts);
    }

    let file = File::open(input)?;
    if file.metadata()?.len() == 0 {
        return Err(SieveError::EmptyInput(input.to_path_buf()));
    }

    // Counting pass over the mapped file
    let mmap = unsafe { Mmap::map(&file)? };
    let buf: &[u8] = &mmap;
    let header_end = memchr::memchr(b'\n', buf).unwrap_or(buf.len());
    let header_line = String::from_utf8_lossy(&buf[..header_end])
        .trim_end_matches('\r')
        .to_string();

    let data = &buf[(header_end + 1).min(buf.len())..];
    let mut total_data_lines: u64 = 0;
    let mut line_start = 0;
    for newline in memchr_iter(b'\n', data) {
        if !is_blank(&data[line_start..newline]) {
            total_data_lines += 1;
        }
        line_start = newline + 1;
    }
    if line_start < data.len() && !is_blank(&data[line_start..]) {
        total_data_lines += 1;
    }

    let base = total_data_lines / num_parts as u64;
    let remainder = total_data_lines % num_parts as u64;

    // Distribution pass
    let reader = BufReader::new(File::open(input)?);
    let mut lines = reader.lines();
    lines.next().transpose()?;

    let mut part_files = Vec::with_capacity(num_parts);
    for i in 0..num_parts {
        let lines_this_part = base + u64::from((i as u64) < remainder);
        let part_path = temp_dir.join(format!("part_{i}.csv"));
        let mut writer = BufWriter::new(File::create(&part_path)?);

        let mut written = 0u64;
        while written < lines_this_part {
            let Some(line) = lines.next() else {
                break;
            };
            let line = line?;
            if is_blank(line.as_bytes()) {
                continue;
            }
            writeln!(writer, "{line}")?;
            written += 1;
        }
        writer.flush()?;
        part_files.push(part_path);
    }

    Ok(SplitResult {
        header_line,
        part_files,
    })
}

// Shared by the counting and distribution passes; the quota arithmetic
// only holds if both agree on what a blank line is.
fn is_blank(line: &[u8]) -> bool {
    String::from_utf8_lossy(line).trim().is_empty()
}

/// One task per part. Workers only touch files the manager allocated to
/// them exclusively; the shared log serializes itself.
fn process_parts(
    part_files: &[PathBuf],
    ctx: &ProcessingContext,
    error_log: &ErrorLog,
    temp_dir: &Path,
    separator: char,
) -> Result<(Vec<PathBuf>, RowStats), SieveError> {
    let part_outputs: Vec<PathBuf> = (0..part_files.len())
        .map(|i| temp_dir.join(format!("part_{i}_out.csv")))
        .collect();

    let part_stats = part_files
        .par_iter()
        .zip(part_outputs.par_iter())
        .map(|(part_input, part_output)| {
            process_part(part_input, part_output, ctx, error_log, separator)
        })
        .collect::<Result<Vec<RowStats>, SieveError>>()?;

    let mut stats = RowStats::default();
    for part in part_stats {
        stats.merge(part);
    }
    Ok((part_outputs, stats))
}

fn process_part(
    part_input: &Path,
    part_output: &Path,
    ctx: &ProcessingContext,
    error_log: &ErrorLog,
    separator: char,
) -> Result<RowStats, SieveError> {
    match transform_part(part_input, part_output, ctx, error_log, separator) {
        Ok(stats) => Ok(stats),
        Err(err) => {
            error_log.append(&format!(
                "Error in worker for {}: {err}",
                file_name(part_input)
            ));
            Err(err)
        }
    }
}

fn transform_part(
    part_input: &Path,
    part_output: &Path,
    ctx: &ProcessingContext,
    error_log: &ErrorLog,
    separator: char,
) -> Result<RowStats, SieveError> {
    let reader = BufReader::new(File::open(part_input)?);
    let mut writer = BufWriter::new(File::create(part_output)?);
    let mut stats = RowStats::default();
    let mut line_number: u64 = 0;

    for line in reader.lines() {
        let line = line?;
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }

        let cols = split_columns(&line, separator);
        if cols.len() != ctx.total_columns() {
            error_log.append(&format!(
                "File: {} | Line {line_number} invalid columns: {} (expected {})",
                file_name(part_input),
                cols.len(),
                ctx.total_columns()
            ));
            stats.error_lines += 1;
            continue;
        }

        if !ctx.matches(&cols) {
            continue;
        }

        writeln!(
            writer,
            "{}",
            build_filtered_line(&cols, ctx.selected_indexes(), separator)
        )?;
        stats.valid_lines += 1;
    }

    writer.flush()?;
    Ok(stats)
}

/// Writes the filtered header, then every part output in index order.
fn merge_outputs(
    output: &Path,
    ctx: &ProcessingContext,
    part_outputs: &[PathBuf],
    separator: char,
) -> Result<(), SieveError> {
    let mut writer = BufWriter::new(File::create(output)?);
    writeln!(writer, "{}", ctx.filtered_header(separator))?;

    for part in part_outputs {
        let reader = BufReader::new(File::open(part)?);
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            writeln!(writer, "{line}")?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Temp directory co-located with the output file, removed on drop so
/// every exit path cleans up.
struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn create(output: &Path) -> Result<Self, SieveError> {
        let parent = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let path = parent.join(TEMP_DIR_NAME);
        fs::create_dir_all(&path)?;
        Ok(TempDirGuard { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_dir_all(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    "could not delete temp directory {}: {err}",
                    self.path.display()
                );
            }
        }
    }
}
