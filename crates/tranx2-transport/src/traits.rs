use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// An open serial device, readable and writable.
///
/// Returned by [`SerialPort::open`](crate::SerialPort::open). Reads block
/// according to the `VMIN`/`VTIME` settings the port was opened with.
pub struct SerialStream {
    file: File,
    path: PathBuf,
}

impl Read for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for SerialStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

impl SerialStream {
    pub(crate) fn from_file(file: File, path: PathBuf) -> Self {
        Self { file, path }
    }

    /// Device node this stream was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        let file = self.file.try_clone()?;
        Ok(Self::from_file(file, self.path.clone()))
    }

    /// Borrow the underlying file handle.
    pub fn as_file(&self) -> &File {
        &self.file
    }
}

impl std::fmt::Debug for SerialStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialStream")
            .field("path", &self.path)
            .finish()
    }
}
