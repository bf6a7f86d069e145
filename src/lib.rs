//! # csv-sieve
//!
//! `csv-sieve` turns a delimited-text CSV into a derived CSV that keeps
//! only the rows matching a filter expression and only the columns the
//! caller selected. It ships three interchangeable engines:
//!
//! - **Sequential**: single-threaded read → filter → project → write,
//!   the reference baseline
//! - **File-part concurrent**: splits the data lines into N temporary
//!   part files, processes them in parallel with Rayon, concatenates the
//!   partial outputs in order
//! - **In-memory batch concurrent**: streams the input into line
//!   batches dispatched to a worker pool, reassembles results in input
//!   order
//!
//! # Features
//!
//! - **Filter expressions**: `age >= 18 AND stress >= 7 OR city = "X"`
//!   (OR binds looser than AND; numeric and quoted-string literals)
//! - **Column projection**: `"*"` or a 1-based index list such as
//!   `"3,1"` (order preserved, duplicates allowed)
//! - **Ordering**: all engines emit accepted rows in input order
//! - **Error log**: malformed rows are dropped and recorded in a
//!   per-run log file, one record per line
//!
//! # Example
//!
//! ```no_run
//! use csv_sieve::processor::{self, RunConfig};
//!
//! fn main() -> Result<(), processor::SieveError> {
//!     let config = RunConfig::new("data/people.csv", "output/adults.csv")
//!         .columns("1,2")
//!         .filter("age >= 18");
//!
//!     let report = processor::memory::process_in_memory(&config)?;
//!     report.print_summary();
//!     Ok(())
//! }
//! ```

mod helpers;
pub mod filter;
pub mod processor;
