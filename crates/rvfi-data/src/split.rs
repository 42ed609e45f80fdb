//! Dataset split lists.
//!
//! Splits ship as plain-text files with one relative path per line,
//! partitioned into train and test sets. Lists are loaded once at dataset
//! construction.

use std::fs;
use std::path::Path;

use crate::error::{DataError, Result};

/// Relative paths from a split file, in file order.
#[derive(Debug, Clone)]
pub struct SplitList {
    entries: Vec<String>,
}

impl SplitList {
    /// Load a split file; blank lines are skipped.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|err| {
            DataError::missing_resource(format!("split list {}: {err}", path.display()))
        })?;
        let entries: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();
        if entries.is_empty() {
            return Err(DataError::EmptySplit(path.display().to_string()));
        }
        Ok(Self { entries })
    }

    /// Build a list from entries already in memory.
    pub fn from_entries(entries: Vec<String>) -> Result<Self> {
        if entries.is_empty() {
            return Err(DataError::EmptySplit("in-memory list".into()));
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Split off the leading `fraction` of entries for training, leaving
    /// the tail for validation (the conventional 95%/5% cut).
    pub fn partition(&self, fraction: f64) -> (SplitList, SplitList) {
        let cut = ((self.entries.len() as f64) * fraction) as usize;
        let cut = cut.clamp(1, self.entries.len().saturating_sub(1).max(1));
        (
            SplitList {
                entries: self.entries[..cut].to_vec(),
            },
            SplitList {
                entries: self.entries[cut..].to_vec(),
            },
        )
    }
}
