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


//! Discovered source files

use crate::audio::codec::{AudioFormat, CodecFamily};
use crate::audio::probe::ProbeInfo;
use std::path::{Path, PathBuf};

/// One discovered audio input together with its probed metadata
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    /// Absolute path
    pub path: PathBuf,
    /// Filename including extension, as matched against the mapping file
    pub file_name: String,
    /// Format tag taken from the extension
    pub format: AudioFormat,
    /// Position in the alphabetical directory scan (0-based)
    pub ordinal: usize,
    /// Probed metadata; default (all unknown) until probing ran
    pub info: ProbeInfo,
}

impl SourceFile {
    pub fn new<P: AsRef<Path>>(path: P, ordinal: usize) -> Self {
        let path = path.as_ref().to_path_buf();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let format = AudioFormat::from_path(&path);

        Self {
            path,
            file_name,
            format,
            ordinal,
            info: ProbeInfo::default(),
        }
    }

    /// Attach probe results
    pub fn with_info(mut self, info: ProbeInfo) -> Self {
        self.info = info;
        self
    }

    /// Codec family from the probed codec, else from the extension
    pub fn codec_family(&self) -> CodecFamily {
        self.info
            .codec_family()
            .unwrap_or_else(|| self.format.default_codec())
    }

    /// Codec label for log messages
    pub fn codec_label(&self) -> String {
        self.info
            .codec_name
            .clone()
            .unwrap_or_else(|| self.format.to_extension().to_string())
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.info.duration_ms
    }

    /// Embedded title, if present and non-empty
    pub fn embedded_title(&self) -> Option<&str> {
        self.info
            .tags
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Sort key used for alphabetical ordering: case-insensitive, exact name as tiebreak
    pub fn sort_key(&self) -> (String, &str) {
        (self.file_name.to_lowercase(), self.file_name.as_str())
    }
}
