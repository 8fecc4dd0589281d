//! `ext-line-sort` is an external merge sort for newline-delimited text.
//!
//! External sorting is a class of sorting algorithms that can handle massive amounts of data. External sorting
//! is required when the data being sorted do not fit into the main memory (RAM) of a computer and instead must be
//! resided in slower external memory, usually a hard disk drive. For more information see
//! [External Sorting](https://en.wikipedia.org/wiki/External_sorting).
//!
//! # Overview
//!
//! Every input line is trimmed and treated as an opaque record, blank lines are dropped and records are ordered
//! lexicographically. Sorting runs in two phases bounded by a single memory budget `M` counted in records:
//!
//! * **Run generation:**
//!   the input is cut into chunks of `M` records, each chunk is sorted in memory and saved as a run file.
//! * **Merging:**
//!   while there are at least `M` runs, consecutive batches of `M - 1` runs are merged into new runs. Once fewer
//!   than `M` runs remain they are merged in one go straight into the output.
//!
//! Intermediate runs live in a work directory that is removed when sorting finishes, whether it succeeds or not,
//! unless it is explicitly retained for inspection.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use ext_line_sort::{ExternalSorter, ExternalSorterBuilder};
//!
//! fn main() {
//!     let sorter: ExternalSorter = ExternalSorterBuilder::new()
//!         .with_memory_budget(100_000)
//!         .with_tmp_dir(Path::new("./"))
//!         .build()
//!         .unwrap();
//!
//!     let stats = sorter.sort_file(Path::new("input.txt"), Path::new("output.txt")).unwrap();
//!     println!("{} records sorted in {} merge passes", stats.records, stats.merge_passes);
//! }
//! ```

pub mod buffer;
pub mod cursor;
pub mod generator;
pub mod heap;
pub mod merger;
pub mod orchestrator;
pub mod run;
pub mod sort;
pub mod workdir;

pub use cursor::Cursor;
pub use generator::RunGenerator;
pub use merger::KWayMerger;
pub use orchestrator::{MergeOrchestrator, MergeSummary};
pub use run::{LineCodec, RmpCodec, Run, RunCodec, RunError};
pub use sort::{sort, ExternalSorter, ExternalSorterBuilder, SortError, SortStats};
pub use workdir::WorkDirectory;
