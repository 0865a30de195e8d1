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


//! Book metadata, chapter markers, and cue sheets
//!
//! # Metadata Embedding Strategy
//! - Book-level tags and chapters go into one FFmetadata file that FFmpeg
//!   reads as its last input (`-map_metadata {n}`)
//! - Standard tags: title, artist, album (= title), genre
//! - `media_type=2` marks the container as an audiobook for iTunes/Apple Books
//!
//! # Chapter Markers
//! - Timebase 1/1000, so START/END are plain milliseconds
//! - Stored in the M4B chapter atom by the `ipod` muxer

use crate::audio::probe::EmbeddedTags;
use crate::chapters::ChapterEntry;
use crate::config::{DEFAULT_ARTIST, DEFAULT_GENRE};
use crate::error::{AudiobookError, Result};
use crate::file::paths::cue_path;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Top-level metadata written into the output container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMetadata {
    pub title: String,
    pub artist: String,
    pub genre: String,
}

impl BookMetadata {
    /// Build metadata from the chosen title and the first file's tags
    ///
    /// Artist falls back from `artist` to `album_artist` to "Unknown Artist";
    /// genre falls back to "Audiobook".
    pub fn from_tags(title: String, tags: Option<&EmbeddedTags>) -> Self {
        let artist = tags
            .and_then(|t| t.artist.clone().or_else(|| t.album_artist.clone()))
            .unwrap_or_else(|| DEFAULT_ARTIST.to_string());
        let genre = tags
            .and_then(|t| t.genre.clone())
            .unwrap_or_else(|| DEFAULT_GENRE.to_string());

        Self {
            title,
            artist,
            genre,
        }
    }
}

/// Format timestamp for cue sheet (MM:SS:FF)
/// FF = frames, 75 frames per second
pub fn format_cue_timestamp(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let frames = ((ms % 1000) * 75) / 1000;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", minutes, seconds, frames)
}

/// Format timestamp for display (HH:MM:SS.mmm)
pub fn format_timestamp(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let milliseconds = ms % 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        hours, minutes, seconds, milliseconds
    )
}

/// Escape a value for the FFmetadata format
///
/// `=`, `;`, `#`, `\` and newlines carry meaning in FFmetadata and must be
/// backslash-escaped.
pub fn escape_ffmetadata(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '=' | ';' | '#' | '\\' | '\n') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Generate FFmetadata content with book tags and chapters
pub fn generate_ffmetadata(book: &BookMetadata, entries: &[ChapterEntry]) -> String {
    let mut content = String::from(";FFMETADATA1\n");
    content.push_str(&format!("title={}\n", escape_ffmetadata(&book.title)));
    content.push_str(&format!("artist={}\n", escape_ffmetadata(&book.artist)));
    content.push_str(&format!("album={}\n", escape_ffmetadata(&book.title)));
    content.push_str(&format!("genre={}\n", escape_ffmetadata(&book.genre)));
    content.push_str("media_type=2\n");

    for entry in entries {
        content.push_str("\n[CHAPTER]\n");
        content.push_str("TIMEBASE=1/1000\n");
        content.push_str(&format!("START={}\n", entry.start_ms));
        content.push_str(&format!("END={}\n", entry.end_ms()));
        content.push_str(&format!("title={}\n", escape_ffmetadata(&entry.title)));
    }

    content
}

/// Generate cue sheet content for the merged file
pub fn generate_cue_sheet(book: &BookMetadata, entries: &[ChapterEntry], audio_filename: &str) -> String {
    let mut cue = String::new();

    cue.push_str(&format!("PERFORMER \"{}\"\n", cue_quote(&book.artist)));
    cue.push_str(&format!("TITLE \"{}\"\n", cue_quote(&book.title)));
    cue.push_str(&format!("FILE \"{}\" MP4\n", cue_quote(audio_filename)));

    for entry in entries {
        cue.push_str(&format!("  TRACK {:02} AUDIO\n", entry.position));
        cue.push_str(&format!("    TITLE \"{}\"\n", cue_quote(&entry.title)));
        cue.push_str(&format!(
            "    INDEX 01 {}\n",
            format_cue_timestamp(entry.start_ms)
        ));
    }

    cue
}

/// Cue sheets have no escape syntax; swap double quotes for single ones
fn cue_quote(value: &str) -> String {
    value.replace('"', "'")
}

/// Write a cue sheet next to `audio_file` and return its path
pub async fn save_cue_sheet(
    audio_file: &Path,
    book: &BookMetadata,
    entries: &[ChapterEntry],
) -> Result<PathBuf> {
    let audio_filename = audio_file
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| {
            AudiobookError::InvalidPath(format!(
                "Invalid audio file path: {}",
                audio_file.display()
            ))
        })?;

    let cue_content = generate_cue_sheet(book, entries, audio_filename);
    let cue_path = cue_path(audio_file);

    fs::write(&cue_path, cue_content).await.map_err(|e| {
        AudiobookError::FileIoError(format!("write: {} - {}", cue_path.display(), e))
    })?;

    Ok(cue_path)
}
