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


//! Audio inspection, bitrate choice, and encoding
//!
//! # Module Organization
//!
//! ## codec
//! Container formats (from the extension) and codec families (from the probe),
//! plus the efficiency table relating source bitrates to AAC.
//!
//! ## probe
//! `ffprobe` JSON parsing into `ProbeInfo` (codec, bitrate, duration, tags,
//! cover art presence).
//!
//! ## bitrate
//! `select_bitrate` - one AAC bitrate for the whole book.
//!
//! ## metadata
//! Book tags, FFmetadata chapter file, and cue sheets.
//!
//! ## encoder
//! FFmpeg argument building, concat list, progress parsing.
//!
//! ## toolkit
//! `MediaToolkit` - the async seam around FFmpeg/FFprobe.
//!
//! # FFmpeg Integration
//!
//! FFmpeg and FFprobe must be installed (or passed with `--ffmpeg` /
//! `--ffprobe`):
//! - macOS: `brew install ffmpeg`
//! - Linux: `apt-get install ffmpeg` or `dnf install ffmpeg`
//! - Windows: Download from https://ffmpeg.org/download.html

pub mod bitrate;
pub mod codec;
pub mod encoder;
pub mod metadata;
pub mod probe;
pub mod toolkit;

pub use bitrate::{select_bitrate, BitrateDecision};
pub use codec::{AudioFormat, CodecFamily, EfficiencyTable};
pub use encoder::{EncodeRequest, ProgressCallback};
pub use metadata::{BookMetadata, generate_cue_sheet, generate_ffmetadata, save_cue_sheet};
pub use probe::{EmbeddedTags, ProbeInfo};
pub use toolkit::{FfmpegToolkit, MediaToolkit};
