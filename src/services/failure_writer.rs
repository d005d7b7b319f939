//! Failure writer - capability layer
//!
//! Records items whose lookup failed in a plain text file, one
//! `name<TAB>error` line each. The names loader ignores everything after a
//! tab, so the file can be fed back in with `--names`. Each run starts the
//! file afresh.

use anyhow::Result;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use tracing::debug;

use crate::models::item::SearchItem;

/// Failed-item file writer
pub struct FailureWriter {
    path: String,
}

impl FailureWriter {
    pub fn with_path(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Drop failures left by an earlier run
    pub fn reset(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    /// Append one failure as `name<TAB>error`
    pub fn write(&self, company_name: &str, error_message: &str) -> Result<()> {
        debug!("Recording failure: {} | {}", company_name, error_message);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let line = format!(
            "{}\t{}\n",
            company_name.trim(),
            error_message.replace(['\n', '\r'], " ")
        );
        file.write_all(line.as_bytes())?;

        Ok(())
    }

    /// Append every item in error state; returns how many were written
    pub fn write_all<'a, I>(&self, items: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a SearchItem>,
    {
        let mut written = 0;
        for item in items {
            if let Some(message) = item.error_message.as_deref() {
                self.write(&item.input_name, message)?;
                written += 1;
            }
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_failed_items() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failed.txt");
        let writer = FailureWriter::with_path(path.to_str().unwrap());

        let mut failed = SearchItem::pending("row-1", "Công ty ma");
        failed.mark_error("API key not valid\nretry later");
        let ok = SearchItem::pending("row-2", "FPT");

        assert_eq!(writer.write_all([&failed, &ok]).unwrap(), 1);
        writer.write("Beta", "timeout").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "Công ty ma\tAPI key not valid retry later\nBeta\ttimeout\n"
        );
    }

    #[test]
    fn test_reset_starts_afresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failed.txt");
        let writer = FailureWriter::with_path(path.to_str().unwrap());

        writer.reset().unwrap();
        writer.write("Beta", "timeout").unwrap();
        writer.reset().unwrap();
        assert!(!path.exists());

        writer.write("Gamma", "not found").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Gamma\tnot found\n");
    }
}
