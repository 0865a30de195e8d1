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


//! Output path rules and filename sanitizing
//!
//! The output must be an `.m4b` file. Only the filename component is
//! sanitized; the directory part is taken as given and created on demand.

use crate::error::{AudiobookError, Result};
use std::path::{Path, PathBuf};

/// Maximum path length (Windows MAX_PATH, Linux PATH_MAX)
#[cfg(target_os = "windows")]
const MAX_PATH_LENGTH: usize = 260;
#[cfg(not(target_os = "windows"))]
const MAX_PATH_LENGTH: usize = 4096;

/// Maximum filename length in bytes
const MAX_COMPONENT_LENGTH: usize = 255;

const OUTPUT_EXTENSION: &str = "m4b";

/// Sanitize a filename so it is valid on every major filesystem
///
/// Characters that are reserved somewhere are swapped for a look-alike or an
/// underscore; leading/trailing whitespace and dots are trimmed.
pub fn sanitize_filename(name: &str) -> String {
    let mut result: String = name.chars().map(replace_char).collect();

    result = result.trim().trim_matches('.').trim().to_string();

    if cfg!(target_os = "windows") {
        result = handle_windows_reserved_names(&result);
    }

    if result.is_empty() {
        result = "audiobook".to_string();
    }

    result
}

/// Replace a reserved character with a safe alternative
fn replace_char(c: char) -> char {
    match c {
        '<' => '＜',  // U+FF1C fullwidth less-than sign
        '>' => '＞',  // U+FF1E fullwidth greater-than sign
        '"' => '＂',  // U+FF02 fullwidth quotation mark
        '|' => '⏐',  // U+23D0 vertical line extension
        '?' => '？',  // U+FF1F fullwidth question mark
        '*' => '✱',  // U+2731 heavy asterisk
        '/' => '∕',  // U+2215 division slash
        ':' | '\\' => '_',
        c if c.is_control() => '_',
        c => c,
    }
}

fn handle_windows_reserved_names(name: &str) -> String {
    let upper = name.to_uppercase();
    let stem = upper.split('.').next().unwrap_or("");
    let reserved = matches!(stem, "CON" | "PRN" | "AUX" | "NUL")
        || ((stem.starts_with("COM") || stem.starts_with("LPT"))
            && stem.len() == 4
            && stem.as_bytes()[3].is_ascii_digit()
            && stem.as_bytes()[3] != b'0');

    if reserved {
        format!("_{}", name)
    } else {
        name.to_string()
    }
}

/// Truncate text to at most `max_bytes`, on a char boundary
pub fn truncate_component(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }

    let mut index = max_bytes;
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    text[..index].to_string()
}

/// Check the output path and return it with a sanitized filename
///
/// The extension must be `.m4b` (any case). Nothing is touched on disk.
pub fn validate_output_path(output: &Path) -> Result<PathBuf> {
    let extension_ok = output
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(OUTPUT_EXTENSION))
        .unwrap_or(false);
    if !extension_ok {
        return Err(AudiobookError::InvalidPath(format!(
            "Output file must have .m4b extension: {}",
            output.display()
        )));
    }

    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| {
            AudiobookError::InvalidPath(format!("Invalid output filename: {}", output.display()))
        })?;

    let max_stem = MAX_COMPONENT_LENGTH - OUTPUT_EXTENSION.len() - 1;
    let safe_stem = truncate_component(&sanitize_filename(stem), max_stem);
    let file_name = format!("{}.{}", safe_stem, OUTPUT_EXTENSION);

    let validated = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(file_name),
        _ => PathBuf::from(file_name),
    };

    if validated.as_os_str().len() > MAX_PATH_LENGTH {
        return Err(AudiobookError::InvalidPath(format!(
            "Output path too long: {} > {}",
            validated.as_os_str().len(),
            MAX_PATH_LENGTH
        )));
    }

    if validated != output {
        tracing::warn!(
            requested = %output.display(),
            using = %validated.display(),
            "output filename sanitized"
        );
    }

    Ok(validated)
}

/// Create the output's parent directory if it does not exist
pub async fn ensure_parent_dir(output: &Path) -> Result<()> {
    let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };

    if tokio::fs::metadata(parent).await.is_ok() {
        return Ok(());
    }

    tokio::fs::create_dir_all(parent).await.map_err(|e| {
        AudiobookError::FileIoError(format!("create_dir: {} - {}", parent.display(), e))
    })?;
    tracing::info!(dir = %parent.display(), "created output directory");
    Ok(())
}

/// Cue sheet path next to an audio file
pub fn cue_path(audio_path: &Path) -> PathBuf {
    audio_path.with_extension("cue")
}

/// Staging path the encoder writes to before the result replaces `output`
///
/// Same directory as `output`, so the final rename never crosses filesystems.
pub fn partial_output_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    output.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("test<>file"), "test＜＞file");
        assert_eq!(sanitize_filename("test:file"), "test_file");
        assert_eq!(sanitize_filename("test|file"), "test⏐file");
        assert_eq!(sanitize_filename("test?file"), "test？file");
        assert_eq!(sanitize_filename("test*file"), "test✱file");
        assert_eq!(sanitize_filename("test\u{7}file"), "test_file");
        assert_eq!(sanitize_filename("Dune: Part One"), "Dune_ Part One");
    }

    #[test]
    fn test_trim_whitespace_and_dots() {
        assert_eq!(sanitize_filename("  book  "), "book");
        assert_eq!(sanitize_filename("..book..."), "book");
        assert_eq!(sanitize_filename(" ... "), "audiobook");
    }

    #[test]
    fn test_truncate_component() {
        let long_text = "é".repeat(300);
        let truncated = truncate_component(&long_text, 255);
        assert!(truncated.len() <= 255);
        assert!(truncated.chars().all(|c| c == 'é'));
        assert_eq!(truncate_component("short", 255), "short");
    }

    #[test]
    fn test_validate_requires_m4b() {
        assert!(matches!(
            validate_output_path(Path::new("/out/book.mp3")),
            Err(AudiobookError::InvalidPath(_))
        ));
        assert!(validate_output_path(Path::new("/out/book")).is_err());
        assert!(validate_output_path(Path::new("/out/book.M4B")).is_ok());
    }

    #[test]
    fn test_validate_sanitizes_filename_only() {
        let path = validate_output_path(Path::new("/out/my:dir/Book?.m4b")).unwrap();
        assert_eq!(path, PathBuf::from("/out/my:dir/Book？.m4b"));

        let path = validate_output_path(Path::new("book.m4b")).unwrap();
        assert_eq!(path, PathBuf::from("book.m4b"));
    }

    #[test]
    fn test_cue_path() {
        assert_eq!(
            cue_path(Path::new("/out/book.m4b")),
            PathBuf::from("/out/book.cue")
        );
    }

    #[test]
    fn test_partial_output_path() {
        assert_eq!(
            partial_output_path(Path::new("/out/book.m4b")),
            PathBuf::from("/out/book.m4b.part")
        );
        assert_eq!(
            partial_output_path(Path::new("Book.M4B")),
            PathBuf::from("Book.M4B.part")
        );
    }

    #[tokio::test]
    async fn test_ensure_parent_dir_creates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("nested/deeper/book.m4b");
        ensure_parent_dir(&output).await.unwrap();
        assert!(dir.path().join("nested/deeper").is_dir());
        // Idempotent
        ensure_parent_dir(&output).await.unwrap();
    }

    #[cfg(target_os = "windows")]
    #[test]
    fn test_windows_reserved_names() {
        assert_eq!(sanitize_filename("CON"), "_CON");
        assert_eq!(sanitize_filename("COM1"), "_COM1");
        assert_eq!(sanitize_filename("CON.txt"), "_CON.txt");
        assert_eq!(sanitize_filename("CONSOLE"), "CONSOLE");
    }
}
