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


//! Chapter title derivation and sanitizing
//!
//! # Filename Rule
//! The title is the file stem (name without the final extension). A leading
//! ordinal is dropped when it is one or more ASCII digits followed by at least
//! one separator (whitespace, `.`, `-`, `_`, `)`, `]`), and something remains
//! after it:
//!
//! | File | Title |
//! |------|-------|
//! | `01 - Intro.mp3` | `Intro` |
//! | `02_The_Call.mp3` | `The_Call` |
//! | `3) Finale.mp3` | `Finale` |
//! | `1984.mp3` | `1984` |
//! | `3rd Act.mp3` | `3rd Act` |
//! | `07.mp3` | `07` |

use crate::config::MAX_CHAPTER_TITLE_LEN;
use regex::Regex;
use std::path::Path;

lazy_static::lazy_static! {
    static ref ORDINAL_PREFIX: Regex =
        Regex::new(r"^[0-9]+[\s._\-)\]]+").expect("ordinal prefix pattern is valid");
}

/// Derive a chapter title from a filename
pub fn title_from_file_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());

    strip_ordinal_prefix(&stem).to_string()
}

/// Drop a leading `digits + separators` ordinal if text remains after it
pub fn strip_ordinal_prefix(stem: &str) -> &str {
    match ORDINAL_PREFIX.find(stem) {
        Some(prefix) if prefix.end() < stem.len() => &stem[prefix.end()..],
        _ => stem,
    }
}

/// Clean a chapter title for embedding
///
/// Control characters are removed, whitespace is trimmed, and the result is
/// capped at [`MAX_CHAPTER_TITLE_LEN`] characters. Returns `None` when nothing
/// printable remains.
pub fn sanitize_chapter_title(title: &str) -> Option<String> {
    let cleaned: String = title.chars().filter(|c| !c.is_control()).collect();
    let truncated: String = cleaned.trim().chars().take(MAX_CHAPTER_TITLE_LEN).collect();
    let result = truncated.trim_end();

    if result.is_empty() {
        None
    } else {
        Some(result.to_string())
    }
}

/// Fallback title for a 1-based chapter position
pub fn numbered_title(position: usize) -> String {
    format!("Chapter {}", position)
}
