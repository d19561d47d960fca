use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::Result;

/// An output file written under a temporary name in its target directory.
///
/// Nothing shows up at the target path until [`StagedFile::persist`]; dropping
/// an unpersisted file removes the temporary.
pub struct StagedFile {
    writer: BufWriter<NamedTempFile>,
    target: PathBuf,
}

impl StagedFile {
    pub fn create(dir: &Path, file_name: &str) -> Result<StagedFile> {
        let tmp = tempfile::Builder::new()
            .prefix(&format!(".{}.", file_name))
            .suffix(".tmp")
            .tempfile_in(dir)?;
        log::trace!("staging {} as {}", file_name, tmp.path().display());
        Ok(StagedFile {
            writer: BufWriter::new(tmp),
            target: dir.join(file_name),
        })
    }

    /// Flushes and renames the temporary onto the target path.
    pub fn persist(self) -> Result<PathBuf> {
        let tmp = self.writer.into_inner().map_err(|e| e.into_error())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.target).map_err(|e| e.error)?;
        log::debug!("wrote {}", self.target.display());
        Ok(self.target)
    }
}

impl Write for StagedFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

/// Persists a group of staged files, in order.
pub fn persist_all(files: Vec<StagedFile>) -> Result<Vec<PathBuf>> {
    files.into_iter().map(StagedFile::persist).collect()
}
