// Audiobook Creator - Merge audio files into chaptered M4B audiobooks
// Copyright (C) 2025 Audiobook Creator contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Chapter mapping file (TSV)
//!
//! # Format
//! One entry per line, no header row:
//!
//! ```text
//! 01 - Opening.mp3<TAB>Prologue
//! 02 - Arrakis.mp3<TAB>Chapter One: Arrakis
//! ```
//!
//! - Blank lines are ignored; a UTF-8 BOM and trailing `\r` are stripped
//! - A line without a tab, or with an empty filename, is rejected
//! - Rows with an empty title are skipped with a warning
//! - Columns after the second are ignored
//! - Filenames must be unique

use crate::config::{MAX_INDEX_FILE_SIZE, MAX_INDEX_LINES};
use crate::error::{AudiobookError, Result};
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;

/// Ordered filename → chapter title mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterNameMap {
    /// Entries in file order
    entries: Vec<(String, String)>,
    /// Filename → index into `entries`
    index: HashMap<String, usize>,
}

impl ChapterNameMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, rejecting duplicate filenames
    ///
    /// Returns `false` if the filename was already present.
    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, file_name: K, title: V) -> bool {
        let file_name = file_name.into();
        if self.index.contains_key(&file_name) {
            return false;
        }
        self.index.insert(file_name.clone(), self.entries.len());
        self.entries.push((file_name, title.into()));
        true
    }

    /// Mapped title for a filename (exact match)
    pub fn get(&self, file_name: &str) -> Option<&str> {
        self.index
            .get(file_name)
            .map(|&i| self.entries[i].1.as_str())
    }

    /// Position of a filename in mapping-file order
    pub fn position(&self, file_name: &str) -> Option<usize> {
        self.index.get(file_name).copied()
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.index.contains_key(file_name)
    }

    /// Filenames in mapping-file order
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse mapping file content
    pub fn parse(content: &str) -> Result<Self> {
        let mut map = Self::new();
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);

        for (i, raw_line) in content.lines().enumerate() {
            let line_number = i + 1;
            if line_number > MAX_INDEX_LINES {
                return Err(AudiobookError::mapping(
                    line_number,
                    format!("too many lines (max {})", MAX_INDEX_LINES),
                ));
            }

            let line = raw_line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let mut columns = line.split('\t');
            let file_name = columns.next().unwrap_or_default().trim();
            let title = match columns.next() {
                Some(title) => title.trim(),
                None => {
                    return Err(AudiobookError::mapping(
                        line_number,
                        "expected a tab between filename and chapter title",
                    ))
                }
            };

            if file_name.is_empty() {
                return Err(AudiobookError::mapping(line_number, "empty filename field"));
            }

            if title.is_empty() {
                tracing::warn!("Skipping mapping line {}: empty chapter title", line_number);
                continue;
            }

            if !map.insert(file_name, title) {
                return Err(AudiobookError::mapping(
                    line_number,
                    format!("duplicate filename '{}'", file_name),
                ));
            }
        }

        tracing::info!("Parsed {} chapter mappings from index file", map.len());
        Ok(map)
    }

    /// Load and parse a mapping file from disk
    pub async fn load(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path).await.map_err(|e| {
            AudiobookError::InvalidPath(format!("Index file {}: {}", path.display(), e))
        })?;

        if !metadata.is_file() {
            return Err(AudiobookError::InvalidPath(format!(
                "Index path is not a file: {}",
                path.display()
            )));
        }

        if metadata.len() > MAX_INDEX_FILE_SIZE {
            return Err(AudiobookError::mapping(
                0,
                format!("index file too large: {} bytes", metadata.len()),
            ));
        }

        let bytes = fs::read(path).await.map_err(|e| {
            AudiobookError::FileIoError(format!("read: {} - {}", path.display(), e))
        })?;
        let content = String::from_utf8(bytes)
            .map_err(|_| AudiobookError::mapping(0, "index file is not valid UTF-8"))?;

        Self::parse(&content)
    }
}
