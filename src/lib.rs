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


//! Merge a directory of audio files into one chaptered M4B audiobook
//!
//! Each source file becomes one chapter. Chapter names come from an optional
//! mapping file, then the file's embedded title, then the filename. The AAC
//! bitrate is chosen from the sources' codecs and bitrates. FFmpeg and
//! FFprobe do the actual media work behind [`audio::MediaToolkit`].

pub mod audio;
pub mod chapters;
pub mod config;
pub mod error;
pub mod file;
pub mod orchestrator;
pub mod workspace;

pub use audio::{BitrateDecision, BookMetadata, EncodeRequest, FfmpegToolkit, MediaToolkit, ProbeInfo};
pub use chapters::{ChapterEntry, ChapterNameMap, TitleSource};
pub use config::MergeOptions;
pub use error::{AudiobookError, Result};
pub use file::SourceFile;
pub use orchestrator::{
    shutdown_signal, DirectoryTitleChooser, MergeReport, Orchestrator, TitleCandidate, TitleChooser,
    TitleOrigin,
};
