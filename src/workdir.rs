//! Scoped storage for intermediate runs.

use std::cell::Cell;
use std::io;
use std::path::{Path, PathBuf};

const WORK_DIR_PREFIX: &str = "ext-line-sort-";

/// Work directory owning every run file of one sort invocation.
///
/// The directory with all the files in it is removed by [`WorkDirectory::close`] or, on any other exit path,
/// when the value is dropped. Retain mode suppresses removal so that intermediate runs can be inspected afterwards.
pub struct WorkDirectory {
    dir: Option<tempfile::TempDir>,
    path: PathBuf,
    retain: bool,
    next_slot: Cell<usize>,
}

impl WorkDirectory {
    /// Creates a uniquely named work directory.
    ///
    /// # Arguments
    /// * `root` - Directory the work directory is created in. If the parameter is [`None`] default OS temporary
    ///   directory will be used.
    /// * `retain` - Keep the directory and its files after the sort
    pub fn new(root: Option<&Path>, retain: bool) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORK_DIR_PREFIX);

        let dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }?;
        let path = dir.path().to_path_buf();

        log::info!("using {} as a work directory", path.display());

        return Ok(WorkDirectory {
            dir: Some(dir),
            path,
            retain,
            next_slot: Cell::new(0),
        });
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_retained(&self) -> bool {
        self.retain
    }

    /// Returns a fresh run file path. The label becomes the file name prefix.
    pub fn allocate(&self, label: &str) -> PathBuf {
        let slot = self.next_slot.get();
        self.next_slot.set(slot + 1);

        self.path.join(format!("{}-{:06}.run", label, slot))
    }

    /// Removes the work directory reporting removal errors.
    pub fn close(mut self) -> io::Result<()> {
        self.teardown()
    }

    fn teardown(&mut self) -> io::Result<()> {
        let dir = match self.dir.take() {
            Some(dir) => dir,
            None => return Ok(()),
        };

        if self.retain {
            #[allow(deprecated)]
            let path = dir.into_path();
            log::info!("work directory retained at {}", path.display());
            return Ok(());
        }

        log::debug!("removing work directory {}", self.path.display());
        dir.close()
    }
}

impl Drop for WorkDirectory {
    fn drop(&mut self) {
        if let Err(err) = self.teardown() {
            log::warn!("work directory {} not removed: {}", self.path.display(), err);
        }
    }
}
