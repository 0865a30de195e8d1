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


//! Chapter resolution
//!
//! Turns the discovered files into chapters in playback order.
//!
//! # Ordering
//! Without a mapping file the scan order is kept. With one, mapped files come
//! first in mapping-file order, followed by unmapped files sorted by filename.
//!
//! # Title Priority
//! 1. Mapping file entry
//! 2. Embedded title tag
//! 3. Filename (see [`crate::chapters::title`])
//!
//! # Timing
//! Start offsets are the cumulative sum of the preceding durations. Every file
//! needs a known duration; the first one without fails the whole resolution.

use crate::chapters::name_map::ChapterNameMap;
use crate::chapters::title::{numbered_title, sanitize_chapter_title, title_from_file_name};
use crate::error::{AudiobookError, Result};
use crate::file::SourceFile;

/// Where a chapter title came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleSource {
    Mapping,
    Embedded,
    FileName,
    /// `Chapter {n}` because the other sources sanitized to nothing
    Numbered,
}

/// A resolved chapter
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterEntry {
    pub source: SourceFile,
    pub title: String,
    pub title_source: TitleSource,
    /// 1-based position in playback order
    pub position: usize,
    /// Start offset in milliseconds
    pub start_ms: u64,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl ChapterEntry {
    /// End offset in milliseconds
    pub fn end_ms(&self) -> u64 {
        self.start_ms + self.duration_ms
    }
}

/// Resolve chapters for `files`
///
/// Returns an empty list for empty input. Fails with
/// [`AudiobookError::MetadataIncomplete`] if any file lacks a duration.
pub fn resolve(files: &[SourceFile], name_map: Option<&ChapterNameMap>) -> Result<Vec<ChapterEntry>> {
    let ordered = order_files(files, name_map);

    let mut entries = Vec::with_capacity(ordered.len());
    let mut offset_ms: u64 = 0;

    for (i, file) in ordered.into_iter().enumerate() {
        let position = i + 1;
        let duration_ms = file
            .duration_ms()
            .ok_or_else(|| AudiobookError::MetadataIncomplete {
                path: file.path.clone(),
            })?;

        let (title, title_source) = resolve_title(file, position, name_map);
        tracing::debug!(
            "Chapter {} '{}' from {} at {} ms ({:?})",
            position,
            title,
            file.file_name,
            offset_ms,
            title_source
        );

        entries.push(ChapterEntry {
            source: file.clone(),
            title,
            title_source,
            position,
            start_ms: offset_ms,
            duration_ms,
        });
        offset_ms = offset_ms.saturating_add(duration_ms);
    }

    Ok(entries)
}

/// Playback order for `files`
pub fn order_files<'a>(files: &'a [SourceFile], name_map: Option<&ChapterNameMap>) -> Vec<&'a SourceFile> {
    let map = match name_map {
        Some(map) => map,
        None => return files.iter().collect(),
    };

    let mut mapped: Vec<&SourceFile> = Vec::new();
    let mut unmapped: Vec<&SourceFile> = Vec::new();
    for file in files {
        if map.contains(&file.file_name) {
            mapped.push(file);
        } else {
            unmapped.push(file);
        }
    }

    for name in map.file_names() {
        if !files.iter().any(|f| f.file_name == name) {
            tracing::warn!("File '{}' from index not found in input directory", name);
        }
    }

    mapped.sort_by_key(|f| map.position(&f.file_name));
    unmapped.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    mapped.extend(unmapped);
    mapped
}

fn resolve_title(
    file: &SourceFile,
    position: usize,
    name_map: Option<&ChapterNameMap>,
) -> (String, TitleSource) {
    let candidates = [
        (
            name_map.and_then(|m| m.get(&file.file_name)).map(str::to_string),
            TitleSource::Mapping,
        ),
        (file.embedded_title().map(str::to_string), TitleSource::Embedded),
        (Some(title_from_file_name(&file.file_name)), TitleSource::FileName),
    ];

    // The first present source decides; a value that sanitizes to nothing
    // becomes a numbered title rather than falling through.
    for (candidate, source) in candidates {
        if let Some(raw) = candidate {
            return match sanitize_chapter_title(&raw) {
                Some(title) => (title, source),
                None => (numbered_title(position), TitleSource::Numbered),
            };
        }
    }

    (numbered_title(position), TitleSource::Numbered)
}
