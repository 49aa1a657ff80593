use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;
use uuid::Uuid;

/// Readable stream over a file that is removed on close or drop.
#[derive(Debug)]
pub struct ScopedArtifact {
    path: PathBuf,
    reader: Option<BufReader<File>>,
    mark: Option<u64>,
}

impl ScopedArtifact {
    /// Takes ownership of an existing file.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = File::open(&path)?;
        Ok(Self {
            path,
            reader: Some(BufReader::new(file)),
            mark: None,
        })
    }

    /// Writes `contents` to a fresh file under `dir` and hands back a stream
    /// positioned at its start. A failed write leaves no file behind.
    pub fn create_in(dir: &Path, prefix: &str, contents: &[u8]) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("create artifact dir failed: {}", dir.display()))?;
        let path = dir.join(format!("{prefix}-{}", Uuid::new_v4()));
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)
            .with_context(|| format!("create artifact failed: {}", path.display()))?;
        if let Err(e) = file.write_all(contents).and_then(|()| file.rewind()) {
            drop(file);
            remove_artifact(&path);
            return Err(e).with_context(|| format!("write artifact failed: {}", path.display()));
        }
        Ok(Self {
            path,
            reader: Some(BufReader::new(file)),
            mark: None,
        })
    }

    /// Backing file. Renaming it away makes the final delete a no-op.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Discards up to `n` bytes; returns how many were skipped.
    pub fn skip(&mut self, n: u64) -> io::Result<u64> {
        io::copy(&mut self.by_ref().take(n), &mut io::sink())
    }

    /// Remembers the current position for [`reset`](Self::reset).
    pub fn mark(&mut self) -> io::Result<()> {
        let pos = self.reader()?.stream_position()?;
        self.mark = Some(pos);
        Ok(())
    }

    pub fn reset(&mut self) -> io::Result<()> {
        let pos = self.mark.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "reset without a mark")
        })?;
        self.reader()?.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    pub fn close(mut self) {
        self.release();
    }

    fn reader(&mut self) -> io::Result<&mut BufReader<File>> {
        self.reader
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "artifact is closed"))
    }

    fn release(&mut self) {
        // close the handle before unlinking
        if self.reader.take().is_none() {
            return;
        }
        remove_artifact(&self.path);
    }
}

fn remove_artifact(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "artifact deleted"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => debug!(path = %path.display(), error = %e, "artifact delete failed"),
    }
}

impl Read for ScopedArtifact {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader()?.read(buf)
    }
}

impl BufRead for ScopedArtifact {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.reader()?.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        if let Some(r) = self.reader.as_mut() {
            r.consume(amt);
        }
    }
}

impl Seek for ScopedArtifact {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.reader()?.seek(pos)
    }
}

impl Drop for ScopedArtifact {
    fn drop(&mut self) {
        self.release();
    }
}
