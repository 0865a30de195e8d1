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


//! Run configuration and tool-wide limits

use std::path::{Path, PathBuf};

/// Extensions recognized as audio input (lowercase, without the dot)
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "m4b", "wav", "flac", "aac", "ogg", "opus", "wma"];

/// Maximum number of directory entries examined during discovery
pub const MAX_FILES_COUNT: usize = 1000;
/// Source files above this size are skipped (2 GiB)
pub const MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Mapping file limits
pub const MAX_INDEX_FILE_SIZE: u64 = 10 * 1024 * 1024;
pub const MAX_INDEX_LINES: usize = 10_000;

pub const MAX_CHAPTER_TITLE_LEN: usize = 200;
pub const MAX_TAG_VALUE_LEN: usize = 500;

/// Longest plausible duration of one source file (24 hours)
pub const MAX_SOURCE_DURATION_SECS: f64 = 86_400.0;

/// Quick mode output bitrate, applied without clamping
pub const QUICK_BITRATE_BPS: u32 = 16_000;
/// Lower and upper bound for the selected AAC bitrate
pub const MIN_BITRATE_BPS: u32 = 32_000;
pub const MAX_BITRATE_BPS: u32 = 128_000;
/// Granularity the selected bitrate is rounded to
pub const BITRATE_STEP_BPS: u32 = 8_000;
/// Reference bitrate used for lossless sources
pub const LOSSLESS_REFERENCE_BPS: u32 = 128_000;

pub const DEFAULT_FFMPEG: &str = "ffmpeg";
pub const DEFAULT_FFPROBE: &str = "ffprobe";

pub const DEFAULT_BOOK_TITLE: &str = "Audiobook";
pub const DEFAULT_ARTIST: &str = "Unknown Artist";
pub const DEFAULT_GENRE: &str = "Audiobook";

/// Options for one merge run
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Directory containing the source audio files
    pub input_dir: PathBuf,
    /// Target `.m4b` file
    pub output_path: PathBuf,
    /// Optional TSV file mapping filenames to chapter titles
    pub index_file: Option<PathBuf>,
    /// Book title that bypasses title selection
    pub title_override: Option<String>,
    /// Encode at [`QUICK_BITRATE_BPS`] instead of the analyzed bitrate
    pub quick: bool,
    /// Resolve chapters and bitrate, but skip encoding
    pub dry_run: bool,
    /// Write a cue sheet next to the output
    pub write_cue_sheet: bool,
    /// Encoder thread count
    pub threads: usize,
    /// FFmpeg executable
    pub ffmpeg: PathBuf,
    /// FFprobe executable
    pub ffprobe: PathBuf,
}

impl MergeOptions {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(input_dir: P, output_path: Q) -> Self {
        Self {
            input_dir: input_dir.as_ref().to_path_buf(),
            output_path: output_path.as_ref().to_path_buf(),
            index_file: None,
            title_override: None,
            quick: false,
            dry_run: false,
            write_cue_sheet: false,
            threads: default_threads(),
            ffmpeg: PathBuf::from(DEFAULT_FFMPEG),
            ffprobe: PathBuf::from(DEFAULT_FFPROBE),
        }
    }

    pub fn index_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.index_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set a title override; blank titles are ignored
    pub fn title<S: Into<String>>(mut self, title: S) -> Self {
        let title = title.into();
        let trimmed = title.trim();
        self.title_override = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    pub fn quick(mut self, quick: bool) -> Self {
        self.quick = quick;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn cue_sheet(mut self, write_cue_sheet: bool) -> Self {
        self.write_cue_sheet = write_cue_sheet;
        self
    }

    /// Set the encoder thread count (at least 1)
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn ffmpeg<P: AsRef<Path>>(mut self, program: P) -> Self {
        self.ffmpeg = program.as_ref().to_path_buf();
        self
    }

    pub fn ffprobe<P: AsRef<Path>>(mut self, program: P) -> Self {
        self.ffprobe = program.as_ref().to_path_buf();
        self
    }
}

/// Number of threads handed to FFmpeg when none is configured
pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
