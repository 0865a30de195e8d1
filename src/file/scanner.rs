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


//! Source discovery
//!
//! Scans a single directory (no recursion) for files with a recognized audio
//! extension and returns them sorted by name: case-insensitive lexicographic
//! (so `10.mp3` sorts before `2.mp3`), exact name as tie-break.

use crate::config::{AUDIO_EXTENSIONS, MAX_FILES_COUNT, MAX_FILE_SIZE};
use crate::error::{AudiobookError, Result};
use crate::file::SourceFile;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Check if file has a recognized audio extension
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            AUDIO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Discover audio files directly inside `directory`
///
/// Fails with `Discovery` if the directory is missing, is not a directory,
/// holds more than [`MAX_FILES_COUNT`] entries, or contains no audio files.
/// Files larger than [`MAX_FILE_SIZE`] are skipped with a warning.
pub async fn discover(directory: &Path) -> Result<Vec<SourceFile>> {
    let meta = fs::metadata(directory).await.map_err(|_| {
        AudiobookError::Discovery(format!(
            "Input directory does not exist: {}",
            directory.display()
        ))
    })?;
    if !meta.is_dir() {
        return Err(AudiobookError::Discovery(format!(
            "Input path is not a directory: {}",
            directory.display()
        )));
    }

    // Concat list entries must not depend on FFmpeg's working directory
    let directory = fs::canonicalize(directory).await.map_err(|e| {
        AudiobookError::Discovery(format!("Failed to resolve {}: {}", directory.display(), e))
    })?;

    let mut entries = fs::read_dir(&directory).await.map_err(|e| {
        AudiobookError::Discovery(format!(
            "Failed to read directory {}: {}",
            directory.display(),
            e
        ))
    })?;

    let mut paths: Vec<PathBuf> = Vec::new();
    let mut seen = 0usize;

    while let Some(entry) = entries.next_entry().await.map_err(|e| {
        AudiobookError::Discovery(format!(
            "Failed to read directory entry in {}: {}",
            directory.display(),
            e
        ))
    })? {
        seen += 1;
        if seen > MAX_FILES_COUNT {
            return Err(AudiobookError::Discovery(format!(
                "Too many files in directory (max {})",
                MAX_FILES_COUNT
            )));
        }

        let path = entry.path();
        if !is_audio_file(&path) {
            continue;
        }

        // Follows symlinks, so linked audio files are accepted
        let file_meta = match fs::metadata(&path).await {
            Ok(m) if m.is_file() => m,
            _ => continue,
        };

        if file_meta.len() > MAX_FILE_SIZE {
            tracing::warn!(
                path = %path.display(),
                size = file_meta.len(),
                "skipping file larger than 2 GiB"
            );
            continue;
        }

        paths.push(path);
    }

    let mut files: Vec<SourceFile> = paths.iter().map(|p| SourceFile::new(p, 0)).collect();
    files.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    for (ordinal, file) in files.iter_mut().enumerate() {
        file.ordinal = ordinal;
    }

    if files.is_empty() {
        return Err(AudiobookError::Discovery(format!(
            "No audio files found in {}",
            directory.display()
        )));
    }

    tracing::info!(count = files.len(), dir = %directory.display(), "discovered audio files");
    Ok(files)
}
