//! Multi-pass run merging.

use std::io::prelude::*;
use std::marker::PhantomData;

use crate::cursor::Cursor;
use crate::merger::KWayMerger;
use crate::run::{Run, RunCodec, RunError, RunReader};
use crate::sort::{SortError, MIN_MEMORY_BUDGET};
use crate::workdir::WorkDirectory;

/// Merge work summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Number of intermediate merge passes.
    pub passes: usize,
    /// Number of runs written by intermediate passes.
    pub intermediate_runs: usize,
    /// Number of records written to the output.
    pub records: u64,
}

/// Drives merge passes over a run set until it fits in a single final merge.
///
/// The memory budget `M` bounds the number of simultaneously open cursors: intermediate passes merge batches of
/// `M - 1` runs, and the final merge starts once fewer than `M` runs remain.
pub struct MergeOrchestrator<'a, C> {
    work_dir: &'a WorkDirectory,
    memory_budget: usize,
    rw_buf_size: Option<usize>,

    codec: PhantomData<C>,
}

impl<'a, C: RunCodec> MergeOrchestrator<'a, C> {
    /// Creates a merge orchestrator.
    ///
    /// # Arguments
    /// * `work_dir` - Directory intermediate runs are saved to
    /// * `memory_budget` - Maximum number of records kept in memory, must be at least [`MIN_MEMORY_BUDGET`]
    /// * `rw_buf_size` - Run file read/write buffer size
    pub fn new(work_dir: &'a WorkDirectory, memory_budget: usize, rw_buf_size: Option<usize>) -> Self {
        MergeOrchestrator {
            work_dir,
            memory_budget,
            rw_buf_size,
            codec: PhantomData,
        }
    }

    /// Returns the number of runs merged together by an intermediate pass.
    pub fn fan_in(&self) -> usize {
        self.memory_budget.saturating_sub(1)
    }

    /// Merges runs into a single ascending stream written to `output`, one newline terminated record per line.
    pub fn merge<W: Write>(&self, runs: Vec<Run>, output: &mut W) -> Result<MergeSummary, SortError> {
        let (runs, mut summary) = self.reduce(runs)?;
        summary.records = self.merge_into(&runs, output)?;

        return Ok(summary);
    }

    /// Runs intermediate merge passes while there are at least `M` runs.
    /// Returns the remaining runs, fewer than `M`, along with the work summary.
    pub fn reduce(&self, mut runs: Vec<Run>) -> Result<(Vec<Run>, MergeSummary), SortError> {
        // a fan-in below 2 turns every pass into a pass-through and the run count never drops
        if self.memory_budget < MIN_MEMORY_BUDGET {
            return Err(SortError::InvalidMemoryBudget(self.memory_budget));
        }

        let mut summary = MergeSummary::default();
        while runs.len() >= self.memory_budget {
            summary.passes += 1;

            let merged = self.merge_pass(summary.passes, &runs)?;
            summary.intermediate_runs += merged.iter().filter(|(_, written)| *written).count();
            log::info!("merge pass {} done ({} runs -> {} runs)", summary.passes, runs.len(), merged.len());

            runs = merged.into_iter().map(|(run, _)| run).collect();
        }

        return Ok((runs, summary));
    }

    /// Merges all runs at once straight into `output`. Returns the number of records written.
    pub fn merge_into<W: Write>(&self, runs: &[Run], output: &mut W) -> Result<u64, SortError> {
        log::debug!("final merge of {} runs", runs.len());

        let merger = KWayMerger::new(self.open_cursors(runs)?);
        let mut records = 0;
        for record in merger {
            let record = record?;
            output.write_all(record.as_bytes()).map_err(SortError::IO)?;
            output.write_all(b"\n").map_err(SortError::IO)?;
            records += 1;
        }

        return Ok(records);
    }

    /// Merges consecutive batches of runs. A batch of one run is passed through untouched.
    /// Every returned run is flagged with whether this pass wrote it.
    fn merge_pass(&self, pass: usize, runs: &[Run]) -> Result<Vec<(Run, bool)>, SortError> {
        let label = format!("pass{}", pass);
        let mut merged = Vec::with_capacity(runs.len() / self.fan_in() + 1);

        for batch in runs.chunks(self.fan_in()) {
            if let [run] = batch {
                log::debug!("run {} passed through", run.path().display());
                merged.push((run.clone(), false));
                continue;
            }

            let merger = KWayMerger::new(self.open_cursors(batch)?);
            let run = Run::create::<C, _>(self.work_dir.allocate(&label), merger, self.rw_buf_size)?;
            log::debug!("{} runs merged into {} ({} records)", batch.len(), run.path().display(), run.len());

            merged.push((run, true));
        }

        return Ok(merged);
    }

    fn open_cursors(&self, runs: &[Run]) -> Result<Vec<Cursor<RunReader<C>>>, RunError> {
        runs.iter()
            .map(|run| Cursor::new(run.open::<C>(self.rw_buf_size)?))
            .collect()
    }
}
