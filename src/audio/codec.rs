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


//! Source formats, codec families, and the codec efficiency table
//!
//! # Efficiency Ratios
//!
//! Multipliers are relative to AAC (1.0) and describe how much AAC bitrate is
//! needed to match a source encoded at a given bitrate. MP3 at 128 kbit/s needs
//! roughly 102 kbit/s of AAC (0.8); Opus is the most efficient common codec, so
//! matching it takes more AAC bitrate (1.3).
//!
//! | Family | Multiplier |
//! |--------|-----------:|
//! | MP3    | 0.8 |
//! | AAC    | 1.0 |
//! | Vorbis | 1.1 |
//! | Opus   | 1.3 |
//! | WMA    | 0.9 |
//!
//! Lossless families carry no multiplier: their bitrate says nothing about
//! perceived quality, so the selector substitutes a fixed reference.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Input file format as indicated by the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioFormat {
    Mp3,
    M4a,
    M4b,
    Aac,
    Wav,
    Flac,
    Ogg,
    Opus,
    Wma,
    /// Unknown or unsupported format
    Unknown,
}

impl AudioFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "mp3" => Self::Mp3,
            "m4a" => Self::M4a,
            "m4b" => Self::M4b,
            "aac" => Self::Aac,
            "wav" => Self::Wav,
            "flac" => Self::Flac,
            "ogg" => Self::Ogg,
            "opus" => Self::Opus,
            "wma" => Self::Wma,
            _ => Self::Unknown,
        }
    }

    /// Detect format from a path's extension
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .map(|ext| Self::from_extension(ext.to_string_lossy().as_ref()))
            .unwrap_or(Self::Unknown)
    }

    /// Get file extension for this format
    pub fn to_extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::M4a => "m4a",
            Self::M4b => "m4b",
            Self::Aac => "aac",
            Self::Wav => "wav",
            Self::Flac => "flac",
            Self::Ogg => "ogg",
            Self::Opus => "opus",
            Self::Wma => "wma",
            Self::Unknown => "bin",
        }
    }

    /// Codec family usually found behind this extension
    pub fn default_codec(&self) -> CodecFamily {
        match self {
            Self::Mp3 => CodecFamily::Mp3,
            Self::M4a | Self::M4b | Self::Aac => CodecFamily::Aac,
            Self::Wav => CodecFamily::Pcm,
            Self::Flac => CodecFamily::Flac,
            Self::Ogg => CodecFamily::Vorbis,
            Self::Opus => CodecFamily::Opus,
            Self::Wma => CodecFamily::Wma,
            Self::Unknown => CodecFamily::Unknown,
        }
    }
}

/// Codec family of a source stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodecFamily {
    Mp3,
    Aac,
    Vorbis,
    Opus,
    Wma,
    Flac,
    Alac,
    /// Uncompressed PCM (WAV, AIFF)
    Pcm,
    WavPack,
    Ape,
    /// Codec not present in the efficiency table
    Unknown,
}

impl CodecFamily {
    /// Map an FFprobe `codec_name` onto a family
    pub fn from_codec_name(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        match name.as_str() {
            "mp3" | "mp3float" | "mp2" => Self::Mp3,
            "aac" | "aac_latm" | "m4a" => Self::Aac,
            "vorbis" | "ogg" => Self::Vorbis,
            "opus" => Self::Opus,
            "wmav1" | "wmav2" | "wmapro" | "wma" => Self::Wma,
            "flac" => Self::Flac,
            "alac" => Self::Alac,
            "wav" => Self::Pcm,
            "wavpack" => Self::WavPack,
            "ape" => Self::Ape,
            n if n.starts_with("pcm_") => Self::Pcm,
            _ => Self::Unknown,
        }
    }

    /// Whether the family is uncompressed or mathematically lossless
    pub fn is_lossless(&self) -> bool {
        matches!(
            self,
            Self::Flac | Self::Alac | Self::Pcm | Self::WavPack | Self::Ape
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "MP3",
            Self::Aac => "AAC",
            Self::Vorbis => "Vorbis",
            Self::Opus => "Opus",
            Self::Wma => "WMA",
            Self::Flac => "FLAC",
            Self::Alac => "ALAC",
            Self::Pcm => "PCM",
            Self::WavPack => "WavPack",
            Self::Ape => "APE",
            Self::Unknown => "Unknown",
        }
    }
}

/// Static codec efficiency table
pub struct EfficiencyTable;

impl EfficiencyTable {
    /// Multiplier of the baseline codec (AAC)
    pub const BASELINE: f64 = 1.0;

    const ENTRIES: &'static [(CodecFamily, f64)] = &[
        (CodecFamily::Mp3, 0.8),
        (CodecFamily::Aac, 1.0),
        (CodecFamily::Vorbis, 1.1),
        (CodecFamily::Opus, 1.3),
        (CodecFamily::Wma, 0.9),
    ];

    /// Multiplier for a lossy family, `None` when the table has no entry
    pub fn multiplier(family: CodecFamily) -> Option<f64> {
        Self::ENTRIES
            .iter()
            .find(|(entry, _)| *entry == family)
            .map(|(_, multiplier)| *multiplier)
    }
}
