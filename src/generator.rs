//! Sorted run generation.

use std::io;
use std::marker::PhantomData;

use crate::buffer::RecordBuffer;
use crate::run::{Run, RunCodec};
use crate::sort::SortError;
use crate::workdir::WorkDirectory;

/// Label of the runs produced from raw input.
pub const INITIAL_RUN_LABEL: &str = "initial";

/// Splits raw input into memory sized chunks, sorts every chunk and saves it as a run.
pub struct RunGenerator<'a, C> {
    work_dir: &'a WorkDirectory,
    memory_budget: usize,
    rw_buf_size: Option<usize>,

    codec: PhantomData<C>,
}

impl<'a, C: RunCodec> RunGenerator<'a, C> {
    /// Creates a run generator.
    ///
    /// # Arguments
    /// * `work_dir` - Directory runs are saved to
    /// * `memory_budget` - Maximum number of records per run
    /// * `rw_buf_size` - Run file write buffer size
    pub fn new(work_dir: &'a WorkDirectory, memory_budget: usize, rw_buf_size: Option<usize>) -> Self {
        RunGenerator {
            work_dir,
            memory_budget,
            rw_buf_size,
            codec: PhantomData,
        }
    }

    /// Consumes input lines and returns the generated runs.
    ///
    /// Lines are trimmed of surrounding whitespace, blank lines are dropped and never count towards the chunk size.
    /// Chunk boundaries follow input order only. An empty input produces no runs, and an input read error aborts
    /// generation.
    pub fn generate<I>(&self, input: I) -> Result<Vec<Run>, SortError>
    where
        I: IntoIterator<Item = io::Result<String>>,
    {
        let mut buffer = RecordBuffer::new(self.memory_budget);
        let mut runs = Vec::new();

        for line in input.into_iter() {
            let line = line.map_err(SortError::InputError)?;
            let record = line.trim();
            if record.is_empty() {
                continue;
            }

            buffer.push(if record.len() == line.len() { line } else { record.to_owned() });
            if buffer.is_full() {
                runs.push(self.save_run(&mut buffer)?);
            }
        }

        if !buffer.is_empty() {
            runs.push(self.save_run(&mut buffer)?);
        }

        log::info!(
            "run generation done ({} records, {} runs)",
            runs.iter().map(Run::len).sum::<u64>(),
            runs.len()
        );

        return Ok(runs);
    }

    fn save_run(&self, buffer: &mut RecordBuffer) -> Result<Run, SortError> {
        log::debug!("sorting chunk data ...");
        buffer.sort();

        let path = self.work_dir.allocate(INITIAL_RUN_LABEL);
        let run = Run::create::<C, _>(path, buffer.drain().map(Ok), self.rw_buf_size)?;
        log::debug!("run {} saved ({} records)", run.path().display(), run.len());

        return Ok(run);
    }
}
