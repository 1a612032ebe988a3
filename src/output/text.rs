//! Plain-text output sinks
//!
//! The output artifact is one line per successful entry, in catalog order.
//! Failed entries contribute nothing, not even a blank line.

use crate::output::traits::OutputSink;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes entries to a text file
///
/// Nothing on disk changes until the first write. Entries go to a sibling
/// `<name>.part` file that `finish` renames over the target, so an existing
/// output file is only ever replaced by a complete one. Dropping an
/// unfinished sink removes the partial file.
#[derive(Debug)]
pub struct TextFileSink {
    path: PathBuf,
    partial_path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl TextFileSink {
    /// Targets the file at `path` without touching the filesystem
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut partial_name = path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        partial_name.push(".part");
        let partial_path = path.with_file_name(partial_name);

        Self {
            path,
            partial_path,
            writer: None,
        }
    }

    /// The file the output ends up in
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates missing parent directories and the partial file
    fn open(&self) -> io::Result<BufWriter<File>> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = File::create(&self.partial_path)?;
        tracing::debug!("Writing output to {}", self.partial_path.display());
        Ok(BufWriter::new(file))
    }

    fn writer(&mut self) -> io::Result<&mut BufWriter<File>> {
        if self.writer.is_none() {
            let writer = self.open()?;
            self.writer = Some(writer);
        }
        self.writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "output file is not open"))
    }
}

impl OutputSink for TextFileSink {
    fn write_entry(&mut self, text: &str) -> io::Result<()> {
        let writer = self.writer()?;
        writer.write_all(text.as_bytes())?;
        writer.write_all(b"\n")
    }

    fn finish(&mut self) -> io::Result<()> {
        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => self.open()?,
        };
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&self.partial_path, &self.path)?;
        tracing::debug!("Output saved to {}", self.path.display());
        Ok(())
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

impl Drop for TextFileSink {
    fn drop(&mut self) {
        if self.writer.take().is_some() {
            // Unfinished run; the previous output stays in place
            let _ = fs::remove_file(&self.partial_path);
        }
    }
}

/// Collects entries in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    entries: Vec<String>,
    finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries in the order they were written
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// The text a file sink would have produced
    pub fn contents(&self) -> String {
        self.entries
            .iter()
            .map(|entry| format!("{}\n", entry))
            .collect()
    }

    /// Whether `finish` has been called
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl OutputSink for MemorySink {
    fn write_entry(&mut self, text: &str) -> io::Result<()> {
        self.entries.push(text.to_string());
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.finished = true;
        Ok(())
    }
}
