use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only log of every raw line the interpreter read.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `line` followed by a newline, creating the file if needed.
    ///
    /// The line is written as the raw bytes that were read, in a single `write`.
    pub fn append(&self, line: impl AsRef<[u8]>) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("cannot open history file {}", self.path.display()))?;
        let mut record = line.as_ref().to_vec();
        record.push(b'\n');
        file.write_all(&record)
            .with_context(|| format!("cannot write history file {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::serial;
    use std::fs;

    #[test]
    fn lines_are_appended_in_order() {
        let _lock = serial();
        let dir = tempfile::tempdir().unwrap();
        let log = HistoryLog::new(dir.path().join("hist"));
        log.append("ls | wc").unwrap();
        log.append("").unwrap();
        log.append("exit").unwrap();
        assert_eq!(fs::read_to_string(log.path()).unwrap(), "ls | wc\n\nexit\n");
    }

    #[test]
    fn existing_content_is_kept() {
        let _lock = serial();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hist");
        fs::write(&path, "old\n").unwrap();
        HistoryLog::new(&path).append("new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "old\nnew\n");
    }

    #[test]
    fn raw_bytes_are_stored_unchanged() {
        let _lock = serial();
        let dir = tempfile::tempdir().unwrap();
        let log = HistoryLog::new(dir.path().join("hist"));
        log.append(b"echo caf\xe9").unwrap();
        assert_eq!(fs::read(log.path()).unwrap(), b"echo caf\xe9\n");
    }

    #[test]
    fn missing_directory_is_an_error() {
        let _lock = serial();
        let dir = tempfile::tempdir().unwrap();
        let log = HistoryLog::new(dir.path().join("no/such/dir/hist"));
        let err = log.append("ls").unwrap_err();
        assert!(err.to_string().contains("cannot open history file"));
    }
}
