//! Reply persistence
//!
//! Decoded replies are pushed one at a time, in request order. Whatever was
//! pushed before a failure stays pushed.

use crate::error::OutputError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Destination for decoded reply values
pub trait ReplySink {
    fn push(&mut self, value: i8) -> Result<(), OutputError>;
}

impl ReplySink for Vec<i8> {
    fn push(&mut self, value: i8) -> Result<(), OutputError> {
        Vec::push(self, value);
        Ok(())
    }
}

/// Newline-delimited reply file, truncated on creation
pub struct ReplyFile {
    path: PathBuf,
    writer: BufWriter<File>,
    lines: usize,
}

impl ReplyFile {
    pub fn create(path: &Path) -> Result<Self, OutputError> {
        let file = File::create(path).map_err(|source| OutputError::Create {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            lines: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Flush buffered lines to disk
    pub fn finish(&mut self) -> Result<(), OutputError> {
        self.writer.flush().map_err(|source| OutputError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

impl ReplySink for ReplyFile {
    fn push(&mut self, value: i8) -> Result<(), OutputError> {
        writeln!(self.writer, "{}", value).map_err(|source| OutputError::Write {
            path: self.path.clone(),
            source,
        })?;
        self.lines += 1;
        Ok(())
    }
}
