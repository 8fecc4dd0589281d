//! Sorted runs stored on the file system.

use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::fs;
use std::io;
use std::io::prelude::*;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Run file error.
#[derive(Debug)]
pub enum RunError {
    /// Common I/O error.
    IO(io::Error),
    /// Record serialization error.
    SerializationError(rmp_serde::encode::Error),
    /// Record deserialization error.
    DeserializationError(rmp_serde::decode::Error),
}

impl Error for RunError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(match &self {
            RunError::IO(err) => err,
            RunError::SerializationError(err) => err,
            RunError::DeserializationError(err) => err,
        })
    }
}

impl Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            RunError::IO(err) => write!(f, "run file I/O operation failed: {}", err),
            RunError::SerializationError(err) => write!(f, "record serialization error: {}", err),
            RunError::DeserializationError(err) => write!(f, "record deserialization error: {}", err),
        }
    }
}

impl From<io::Error> for RunError {
    fn from(err: io::Error) -> Self {
        RunError::IO(err)
    }
}

impl From<rmp_serde::encode::Error> for RunError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        RunError::SerializationError(err)
    }
}

impl From<rmp_serde::decode::Error> for RunError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        RunError::DeserializationError(err)
    }
}

/// Run file encoding. Defines how records are written to and read back from a run file.
pub trait RunCodec {
    /// Writes a single record.
    fn encode<W: Write>(writer: &mut W, record: &str) -> Result<(), RunError>;

    /// Reads the next record. Returns [`None`] at the end of the run.
    fn decode<R: BufRead>(reader: &mut R) -> Result<Option<String>, RunError>;
}

/// Plain text run encoding: one newline terminated record per line, the same format the sorted output uses.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineCodec;

impl RunCodec for LineCodec {
    fn encode<W: Write>(writer: &mut W, record: &str) -> Result<(), RunError> {
        writer.write_all(record.as_bytes())?;
        writer.write_all(b"\n")?;

        return Ok(());
    }

    fn decode<R: BufRead>(reader: &mut R) -> Result<Option<String>, RunError> {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
        }

        return Ok(Some(line));
    }
}

/// RMP (Rust MessagePack) run encoding. Every record is stored as a MessagePack string.
/// For more information see https://msgpack.org/.
#[derive(Debug, Clone, Copy, Default)]
pub struct RmpCodec;

impl RunCodec for RmpCodec {
    fn encode<W: Write>(writer: &mut W, record: &str) -> Result<(), RunError> {
        record.serialize(&mut rmp_serde::Serializer::new(writer))?;

        return Ok(());
    }

    fn decode<R: BufRead>(reader: &mut R) -> Result<Option<String>, RunError> {
        if reader.fill_buf()?.is_empty() {
            return Ok(None);
        }

        return Ok(Some(rmp_serde::decode::from_read(reader)?));
    }
}

/// Handle of a sorted run file.
#[derive(Debug, Clone)]
pub struct Run {
    path: PathBuf,
    len: u64,
}

impl Run {
    /// Writes records to a new run file.
    /// Records must already be in ascending order, the first failing record aborts the write.
    ///
    /// # Arguments
    /// * `path` - Run file path, the file must not exist
    /// * `records` - Records to be written
    /// * `buf_size` - Run file write buffer size
    pub fn create<C, I>(path: PathBuf, records: I, buf_size: Option<usize>) -> Result<Self, RunError>
    where
        C: RunCodec,
        I: IntoIterator<Item = Result<String, RunError>>,
    {
        let file = fs::OpenOptions::new().write(true).create_new(true).open(&path)?;
        let mut writer = match buf_size {
            Some(buf_size) => io::BufWriter::with_capacity(buf_size, file),
            None => io::BufWriter::new(file),
        };

        let mut len = 0;
        for record in records {
            C::encode(&mut writer, &record?)?;
            len += 1;
        }
        writer.flush()?;

        return Ok(Run { path, len });
    }

    /// Opens the run for sequential reading.
    pub fn open<C: RunCodec>(&self, buf_size: Option<usize>) -> Result<RunReader<C>, RunError> {
        let file = fs::File::open(&self.path)?;
        let reader = match buf_size {
            Some(buf_size) => io::BufReader::with_capacity(buf_size, file),
            None => io::BufReader::new(file),
        };

        return Ok(RunReader {
            reader,
            codec: PhantomData,
        });
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of records in the run.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Sequential reader over a run file.
pub struct RunReader<C> {
    reader: io::BufReader<fs::File>,

    codec: PhantomData<C>,
}

impl<C: RunCodec> Iterator for RunReader<C> {
    type Item = Result<String, RunError>;

    fn next(&mut self) -> Option<Self::Item> {
        C::decode(&mut self.reader).transpose()
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use rstest::*;

    use super::{LineCodec, RmpCodec, Run, RunCodec, RunError};

    #[fixture]
    fn tmp_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    fn records(items: &[&str]) -> Vec<Result<String, RunError>> {
        items.iter().map(|item| Ok(item.to_string())).collect()
    }

    #[rstest]
    fn test_line_run(tmp_dir: tempfile::TempDir) {
        let path = tmp_dir.path().join("initial-000000.run");
        let saved = vec!["a", "b", "b", "c d"];

        let run = Run::create::<LineCodec, _>(path.clone(), records(&saved), None).unwrap();
        assert_eq!(run.len(), 4);
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\nb\nc d\n");

        let restored: Result<Vec<String>, RunError> = run.open::<LineCodec>(Some(16)).unwrap().collect();
        assert_eq!(restored.unwrap(), saved);
    }

    #[rstest]
    fn test_rmp_run(tmp_dir: tempfile::TempDir) {
        let path = tmp_dir.path().join("initial-000000.run");
        let saved = vec!["", "line\nbreak", "zzz", "\u{444}"];

        let run = Run::create::<RmpCodec, _>(path, records(&saved), Some(8)).unwrap();
        assert_eq!(run.len(), 4);

        let restored: Result<Vec<String>, RunError> = run.open::<RmpCodec>(None).unwrap().collect();
        assert_eq!(restored.unwrap(), saved);
    }

    #[rstest]
    fn test_empty_run(tmp_dir: tempfile::TempDir) {
        let run = Run::create::<LineCodec, _>(tmp_dir.path().join("empty.run"), Vec::new(), None).unwrap();
        assert!(run.is_empty());
        assert_eq!(run.open::<LineCodec>(None).unwrap().count(), 0);
    }

    #[rstest]
    fn test_run_path_taken(tmp_dir: tempfile::TempDir) {
        let path = tmp_dir.path().join("taken.run");
        fs::write(&path, "x\n").unwrap();

        let result = Run::create::<LineCodec, _>(path, records(&["a"]), None);
        assert!(matches!(result, Err(RunError::IO(_))));
    }

    #[rstest]
    fn test_run_record_error(tmp_dir: tempfile::TempDir) {
        let path = tmp_dir.path().join("broken.run");
        let input = vec![
            Ok("a".to_string()),
            Err(RunError::IO(std::io::Error::new(std::io::ErrorKind::Other, "test error"))),
        ];

        let result = Run::create::<LineCodec, _>(path, input, None);
        assert_eq!(result.unwrap_err().to_string(), "run file I/O operation failed: test error");
    }

    #[rstest]
    fn test_rmp_truncated(tmp_dir: tempfile::TempDir) {
        let path = tmp_dir.path().join("truncated.run");
        let mut encoded = Vec::new();
        RmpCodec::encode(&mut encoded, "truncated record").unwrap();
        fs::write(&path, &encoded[..encoded.len() - 3]).unwrap();

        let mut reader = fs::File::open(&path).map(std::io::BufReader::new).unwrap();
        let result = RmpCodec::decode(&mut reader);
        assert!(matches!(result, Err(RunError::DeserializationError(_))));
    }
}
