use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::processor::RowStats;

/// File name of the execution-history CSV inside the metrics directory.
pub const HISTORY_FILE: &str = "run-history.csv";

/// What a finished run reports back to the caller.
#[derive(Debug)]
pub struct RunReport {
    pub label: &'static str,
    pub input: PathBuf,
    pub output: PathBuf,
    pub log: PathBuf,
    /// Only set by the file-part engine; the directory itself is already
    /// deleted when the report is handed out.
    pub temp_dir: Option<PathBuf>,
    pub elapsed: Duration,
    pub stats: RowStats,
}

impl RunReport {
    pub fn elapsed_millis(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }

    /// Prints the timing and file-path summary to stdout.
    pub fn print_summary(&self) {
        let ms = self.elapsed_millis();
        println!(
            "[{}] Input: {} | Output: {} | Time: {:.2} ms ({:.2} s)",
            self.label,
            file_name(&self.input),
            file_name(&self.output),
            ms,
            ms / 1000.0
        );
        println!("Output file: {}", absolute(&self.output).display());
        println!("Error log: {}", absolute(&self.log).display());
        if let Some(temp_dir) = &self.temp_dir {
            println!("Temp parts: {}", absolute(temp_dir).display());
        }
        println!(
            "Valid lines: {} | Error lines: {}",
            self.stats.valid_lines, self.stats.error_lines
        );
    }
}

/// Appends `timestamp,mode,input,output,millis,seconds` to
/// `<dir>/run-history.csv`, creating the directory and the header row on
/// first use.
pub fn append_history(dir: &Path, report: &RunReport) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    let path = dir.join(HISTORY_FILE);
    let is_new = !path.exists();

    let mut file = fs::OpenOptions::new().create(true).append(true).open(&path)?;
    if is_new {
        writeln!(file, "timestamp,mode,input,output,millis,seconds")?;
    }
    let ms = report.elapsed_millis();
    writeln!(
        file,
        "{},{},{},{},{:.2},{:.2}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        report.label,
        file_name(&report.input),
        file_name(&report.output),
        ms,
        ms / 1000.0
    )
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> RunReport {
        RunReport {
            label: "SEQUENTIAL",
            input: PathBuf::from("data/in.csv"),
            output: PathBuf::from("output/out.csv"),
            log: PathBuf::from("output/out.csv.log"),
            temp_dir: None,
            elapsed: Duration::from_millis(1234),
            stats: RowStats {
                valid_lines: 10,
                error_lines: 2,
            },
        }
    }

    #[test]
    fn test_history_writes_header_once() {
        let dir = tempfile::TempDir::new().unwrap();
        append_history(dir.path(), &report()).unwrap();
        append_history(dir.path(), &report()).unwrap();

        let content = fs::read_to_string(dir.path().join(HISTORY_FILE)).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "timestamp,mode,input,output,millis,seconds");
        assert!(lines[1].contains(",SEQUENTIAL,in.csv,out.csv,1234.00,1.23"));
    }

    #[test]
    fn test_elapsed_millis() {
        assert_eq!(report().elapsed_millis(), 1234.0);
    }
}
