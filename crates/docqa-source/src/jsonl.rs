//! JSON-lines directory source.
//!
//! Each collection is a file `<directory>/<name>.jsonl` holding one JSON
//! document per line. Blank lines are skipped. A document's bookmark is its
//! zero-based line number, so a scan can restart after any delivered line.
//!
//! A line that is not valid JSON ends the scan with a non-transient error;
//! read failures are reported as transient.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::debug;

use docqa_contracts::document::{ScannedDocument, SourceError, SourceResult};
use docqa_core::traits::{DocumentSource, DocumentStream};

#[derive(Debug, Clone)]
pub struct JsonLinesSource {
    directory: PathBuf,
}

impl JsonLinesSource {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File backing `name`. Names that would escape the directory are refused.
    fn file_for(&self, name: &str) -> SourceResult<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(SourceError::fatal(format!("invalid collection name '{name}'")));
        }
        if !self.directory.is_dir() {
            return Err(SourceError::fatal(format!(
                "data directory '{}' is not accessible",
                self.directory.display()
            )));
        }
        Ok(self.directory.join(format!("{name}.jsonl")))
    }

    fn open(&self, name: &str) -> SourceResult<(PathBuf, BufReader<File>)> {
        let path = self.file_for(name)?;
        let file = File::open(&path).map_err(|e| {
            SourceError::transient(format!("cannot open '{}': {e}", path.display()))
        })?;
        Ok((path, BufReader::new(file)))
    }
}

impl DocumentSource for JsonLinesSource {
    fn collection_exists(&self, name: &str) -> SourceResult<bool> {
        Ok(self.file_for(name)?.is_file())
    }

    fn count(&self, name: &str) -> SourceResult<u64> {
        let (path, reader) = self.open(name)?;
        let mut count = 0u64;
        for line in reader.lines() {
            let line = line.map_err(|e| {
                SourceError::transient(format!("read error in '{}': {e}", path.display()))
            })?;
            if !line.trim().is_empty() {
                count += 1;
            }
        }
        Ok(count)
    }

    fn scan(&self, name: &str, resume_from: Option<u64>) -> SourceResult<DocumentStream<'_>> {
        let (path, reader) = self.open(name)?;
        let skip = resume_from.map_or(0, |b| b as usize + 1);
        debug!(path = %path.display(), skip, "opening JSON-lines cursor");

        let stream = reader
            .lines()
            .enumerate()
            .skip(skip)
            .filter(|(_, line)| !matches!(line, Ok(text) if text.trim().is_empty()))
            .map(move |(n, line)| {
                let text = line.map_err(|e| {
                    SourceError::transient(format!("read error in '{}': {e}", path.display()))
                })?;
                let body = serde_json::from_str(&text).map_err(|e| {
                    SourceError::fatal(format!("{}:{}: invalid JSON: {e}", path.display(), n + 1))
                })?;
                Ok(ScannedDocument::new(n as u64, body))
            });
        Ok(Box::new(stream))
    }
}
