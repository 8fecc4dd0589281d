//! External sorter.

use log;
use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::fs;
use std::io::{self, prelude::*};
use std::marker::PhantomData;
use std::path::Path;

use crate::generator::RunGenerator;
use crate::orchestrator::MergeOrchestrator;
use crate::run::{LineCodec, Run, RunCodec, RunError};
use crate::workdir::WorkDirectory;

/// Smallest memory budget that lets every merge pass reduce the number of runs.
pub const MIN_MEMORY_BUDGET: usize = 3;
/// Memory budget used when none is configured, in records.
pub const DEFAULT_MEMORY_BUDGET: usize = 65_536;

/// Sorting error.
#[derive(Debug)]
pub enum SortError {
    /// Temporary directory or file creation or removal error.
    TempDir(io::Error),
    /// Common I/O error.
    IO(io::Error),
    /// Input data stream error.
    InputError(io::Error),
    /// Run record serialization error.
    SerializationError(rmp_serde::encode::Error),
    /// Run record deserialization error.
    DeserializationError(rmp_serde::decode::Error),
    /// Memory budget too small to make merge progress.
    InvalidMemoryBudget(usize),
}

impl Error for SortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self {
            SortError::TempDir(err) => Some(err),
            SortError::IO(err) => Some(err),
            SortError::InputError(err) => Some(err),
            SortError::SerializationError(err) => Some(err),
            SortError::DeserializationError(err) => Some(err),
            SortError::InvalidMemoryBudget(_) => None,
        }
    }
}

impl Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            SortError::TempDir(err) => write!(f, "temporary directory or file error: {}", err),
            SortError::IO(err) => write!(f, "I/O operation failed: {}", err),
            SortError::InputError(err) => write!(f, "input data stream error: {}", err),
            SortError::SerializationError(err) => write!(f, "data serialization error: {}", err),
            SortError::DeserializationError(err) => write!(f, "data deserialization error: {}", err),
            SortError::InvalidMemoryBudget(budget) => write!(
                f,
                "memory budget {} is too small, at least {} records required",
                budget, MIN_MEMORY_BUDGET
            ),
        }
    }
}

impl From<RunError> for SortError {
    fn from(err: RunError) -> Self {
        match err {
            RunError::IO(err) => SortError::IO(err),
            RunError::SerializationError(err) => SortError::SerializationError(err),
            RunError::DeserializationError(err) => SortError::DeserializationError(err),
        }
    }
}

/// Sorting statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortStats {
    /// Number of records written to the output.
    pub records: u64,
    /// Number of runs produced from the input.
    pub initial_runs: usize,
    /// Number of intermediate merge passes.
    pub merge_passes: usize,
    /// Number of runs written by intermediate merge passes.
    pub intermediate_runs: usize,
}

/// External sorter builder. Provides methods for [`ExternalSorter`] initialization.
#[derive(Clone)]
pub struct ExternalSorterBuilder<C = LineCodec>
where
    C: RunCodec,
{
    /// Maximum number of records kept in memory.
    memory_budget: usize,
    /// Directory to be used to store temporary data.
    tmp_dir: Option<Box<Path>>,
    /// Keep temporary data after sorting.
    retain_tmp_dir: bool,
    /// Run file read/write buffer size.
    rw_buf_size: Option<usize>,

    /// Run codec type.
    codec: PhantomData<C>,
}

impl<C> ExternalSorterBuilder<C>
where
    C: RunCodec,
{
    /// Creates an instance of a builder with default parameters.
    pub fn new() -> Self {
        ExternalSorterBuilder::default()
    }

    /// Builds an [`ExternalSorter`] instance using provided configuration.
    pub fn build(self) -> Result<ExternalSorter<C>, SortError> {
        ExternalSorter::new(
            self.memory_budget,
            self.tmp_dir.as_deref(),
            self.retain_tmp_dir,
            self.rw_buf_size,
        )
    }

    /// Sets the maximum number of records kept in memory. It bounds both run length and merge fan-in.
    pub fn with_memory_budget(mut self, memory_budget: usize) -> ExternalSorterBuilder<C> {
        self.memory_budget = memory_budget;
        return self;
    }

    /// Sets directory to be used to store temporary data.
    pub fn with_tmp_dir(mut self, path: &Path) -> ExternalSorterBuilder<C> {
        self.tmp_dir = Some(path.into());
        return self;
    }

    /// Keeps temporary data after sorting for inspection.
    pub fn with_retained_tmp_dir(mut self, retain: bool) -> ExternalSorterBuilder<C> {
        self.retain_tmp_dir = retain;
        return self;
    }

    /// Sets run file read/write buffer size.
    pub fn with_rw_buf_size(mut self, buf_size: usize) -> ExternalSorterBuilder<C> {
        self.rw_buf_size = Some(buf_size);
        return self;
    }

    /// Switches the run file encoding keeping the rest of the configuration.
    pub fn with_codec<D: RunCodec>(self) -> ExternalSorterBuilder<D> {
        ExternalSorterBuilder {
            memory_budget: self.memory_budget,
            tmp_dir: self.tmp_dir,
            retain_tmp_dir: self.retain_tmp_dir,
            rw_buf_size: self.rw_buf_size,
            codec: PhantomData,
        }
    }
}

impl<C> Default for ExternalSorterBuilder<C>
where
    C: RunCodec,
{
    fn default() -> Self {
        ExternalSorterBuilder {
            memory_budget: DEFAULT_MEMORY_BUDGET,
            tmp_dir: None,
            retain_tmp_dir: false,
            rw_buf_size: None,
            codec: PhantomData,
        }
    }
}

/// External sorter of text records.
///
/// Every sort call gets its own work directory which is removed when the call returns, successfully or not,
/// unless the sorter was configured to retain it.
pub struct ExternalSorter<C = LineCodec>
where
    C: RunCodec,
{
    /// Maximum number of records kept in memory.
    memory_budget: usize,
    /// Directory to be used to store temporary data.
    tmp_dir: Option<Box<Path>>,
    /// Keep temporary data after sorting.
    retain_tmp_dir: bool,
    /// Run file read/write buffer size.
    rw_buf_size: Option<usize>,

    /// Run codec type.
    codec: PhantomData<C>,
}

impl<C> ExternalSorter<C>
where
    C: RunCodec,
{
    /// Creates a new external sorter instance.
    ///
    /// # Arguments
    /// * `memory_budget` - Maximum number of records kept in memory, at least [`MIN_MEMORY_BUDGET`].
    /// * `tmp_path` - Directory to be used to store temporary data. If paramater is [`None`] default OS temporary
    ///   directory will be used.
    /// * `retain_tmp_dir` - Keep temporary data after sorting.
    /// * `rw_buf_size` - Run files read/write buffer size.
    pub fn new(
        memory_budget: usize,
        tmp_path: Option<&Path>,
        retain_tmp_dir: bool,
        rw_buf_size: Option<usize>,
    ) -> Result<Self, SortError> {
        if memory_budget < MIN_MEMORY_BUDGET {
            return Err(SortError::InvalidMemoryBudget(memory_budget));
        }

        return Ok(ExternalSorter {
            memory_budget,
            tmp_dir: tmp_path.map(Into::into),
            retain_tmp_dir,
            rw_buf_size,
            codec: PhantomData,
        });
    }

    pub fn memory_budget(&self) -> usize {
        self.memory_budget
    }

    /// Sorts input lines and writes them to the output, one newline terminated record per line.
    /// Lines are trimmed and blank lines are dropped.
    ///
    /// # Arguments
    /// * `input` - Input stream data to be fetched from
    /// * `output` - Output the final merge writes to
    pub fn sort<I, W>(&self, input: I, output: &mut W) -> Result<SortStats, SortError>
    where
        I: IntoIterator<Item = io::Result<String>>,
        W: Write,
    {
        let work_dir = self.init_work_dir()?;

        let (runs, mut stats) = self.prepare(&work_dir, input)?;
        stats.records = self.orchestrator(&work_dir).merge_into(&runs, output)?;
        output.flush().map_err(SortError::IO)?;

        work_dir.close().map_err(SortError::TempDir)?;
        log::info!("sorting done ({} records)", stats.records);

        return Ok(stats);
    }

    /// Sorts the lines of the input file into the output file.
    ///
    /// The final merge is staged next to the output file and moved onto it only once complete, so a failed sort
    /// never leaves a truncated output behind.
    pub fn sort_file(&self, input: &Path, output: &Path) -> Result<SortStats, SortError> {
        log::info!("sorting {} into {}", input.display(), output.display());

        let input_file = fs::File::open(input).map_err(SortError::InputError)?;
        let input_reader = match self.rw_buf_size {
            Some(buf_size) => io::BufReader::with_capacity(buf_size, input_file),
            None => io::BufReader::new(input_file),
        };

        let work_dir = self.init_work_dir()?;
        let (runs, mut stats) = self.prepare(&work_dir, input_reader.lines())?;

        let output_dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let staging = tempfile::NamedTempFile::new_in(output_dir).map_err(SortError::TempDir)?;
        let mut output_writer = match self.rw_buf_size {
            Some(buf_size) => io::BufWriter::with_capacity(buf_size, staging),
            None => io::BufWriter::new(staging),
        };

        stats.records = self.orchestrator(&work_dir).merge_into(&runs, &mut output_writer)?;

        let staging = output_writer
            .into_inner()
            .map_err(|err| SortError::IO(err.into_error()))?;
        staging.persist(output).map_err(|err| SortError::IO(err.error))?;

        work_dir.close().map_err(SortError::TempDir)?;
        log::info!("sorting done ({} records)", stats.records);

        return Ok(stats);
    }

    /// Generates runs and merges them down to fewer than `M` runs, ready for the final merge.
    fn prepare<I>(&self, work_dir: &WorkDirectory, input: I) -> Result<(Vec<Run>, SortStats), SortError>
    where
        I: IntoIterator<Item = io::Result<String>>,
    {
        let generator: RunGenerator<C> = RunGenerator::new(work_dir, self.memory_budget, self.rw_buf_size);
        let runs = generator.generate(input)?;
        let initial_runs = runs.len();

        let (runs, summary) = self.orchestrator(work_dir).reduce(runs)?;
        log::debug!("external sort preparation done");

        return Ok((
            runs,
            SortStats {
                records: 0,
                initial_runs,
                merge_passes: summary.passes,
                intermediate_runs: summary.intermediate_runs,
            },
        ));
    }

    fn orchestrator<'a>(&self, work_dir: &'a WorkDirectory) -> MergeOrchestrator<'a, C> {
        MergeOrchestrator::new(work_dir, self.memory_budget, self.rw_buf_size)
    }

    fn init_work_dir(&self) -> Result<WorkDirectory, SortError> {
        WorkDirectory::new(self.tmp_dir.as_deref(), self.retain_tmp_dir).map_err(SortError::TempDir)
    }
}

/// Sorts the lines of `input` into `output` using plain text runs.
///
/// # Arguments
/// * `input` - File to be sorted
/// * `output` - Result file, replaced once sorting succeeds
/// * `memory_budget` - Maximum number of records kept in memory, at least [`MIN_MEMORY_BUDGET`]
/// * `scratch_root` - Directory the work directory is created in
/// * `retain_scratch` - Keep the work directory with intermediate runs after sorting
pub fn sort(
    input: &Path,
    output: &Path,
    memory_budget: usize,
    scratch_root: &Path,
    retain_scratch: bool,
) -> Result<SortStats, SortError> {
    ExternalSorterBuilder::<LineCodec>::new()
        .with_memory_budget(memory_budget)
        .with_tmp_dir(scratch_root)
        .with_retained_tmp_dir(retain_scratch)
        .build()?
        .sort_file(input, output)
}
