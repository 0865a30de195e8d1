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


//! Error types for Audiobook Creator
//!
//! This module defines error types using thiserror for ergonomic error handling.
//! Errors are grouped by the pipeline stage that raises them: discovery of the
//! input directory, parsing of the chapter mapping file, probing of source files,
//! chapter timing, encoding, and the startup dependency check.
//!
//! Unknown codecs are not errors; they are reported through
//! [`crate::audio::BitrateDecision::unknown_codecs`].

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our AudiobookError type
pub type Result<T> = std::result::Result<T, AudiobookError>;

/// Main error type for Audiobook Creator
///
/// Every variant is fatal for the current run. Callers abort without producing
/// partial output; the temporary workspace is released by its owner on drop.
#[derive(Error, Debug)]
pub enum AudiobookError {
    // ===== Discovery / Input Errors =====

    /// Input directory missing, unreadable, or without recognized audio files
    #[error("Discovery failed: {0}")]
    Discovery(String),

    /// Chapter mapping file is present but malformed
    #[error("Invalid mapping file (line {line}): {message}")]
    MappingFile {
        /// 1-based line number, 0 when the file as a whole is rejected
        line: usize,
        message: String,
    },

    /// Invalid file path (output path rules, unreadable index path, ...)
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    // ===== Probe / Metadata Errors =====

    /// A source file could not be probed for metadata
    #[error("Failed to probe '{}': {message}", path.display())]
    Probe { path: PathBuf, message: String },

    /// Duration missing for a file, so chapter marks cannot be computed
    #[error("Missing duration for '{}': chapter times cannot be computed", path.display())]
    MetadataIncomplete { path: PathBuf },

    // ===== Encoding Errors =====

    /// The encoder failed to produce output
    #[error("Encoding failed: {message}")]
    Encode {
        message: String,
        /// Tail of the encoder's diagnostic output
        diagnostics: Option<String>,
    },

    /// Required external tools could not be launched
    #[error("Missing required dependencies: {}", tools.join(", "))]
    DependencyMissing { tools: Vec<String> },

    // ===== General Errors =====

    /// The run was interrupted by a signal
    #[error("Operation interrupted")]
    Interrupted,

    /// File operation failed with context
    #[error("File I/O error: {0}")]
    FileIoError(String),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// Helper methods for creating common errors
impl AudiobookError {
    /// Create a Probe error for a file
    pub fn probe<P: Into<PathBuf>, S: Into<String>>(path: P, message: S) -> Self {
        AudiobookError::Probe {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a MappingFile error for a 1-based line number
    pub fn mapping<S: Into<String>>(line: usize, message: S) -> Self {
        AudiobookError::MappingFile {
            line,
            message: message.into(),
        }
    }

    /// Create an Encode error, optionally carrying the encoder's stderr tail
    pub fn encode<S: Into<String>>(message: S, diagnostics: Option<String>) -> Self {
        AudiobookError::Encode {
            message: message.into(),
            diagnostics,
        }
    }

    /// Check if error is related to file/disk operations
    pub fn is_file_error(&self) -> bool {
        matches!(
            self,
            AudiobookError::Discovery(_)
                | AudiobookError::InvalidPath(_)
                | AudiobookError::FileIoError(_)
                | AudiobookError::IoError(_)
        )
    }

    /// Process exit code for this error
    ///
    /// 130 follows the shell convention for SIGINT; everything else is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            AudiobookError::Interrupted => 130,
            _ => 1,
        }
    }

    /// Get user-friendly error message suitable for display
    pub fn user_message(&self) -> String {
        match self {
            AudiobookError::DependencyMissing { tools } => {
                format!(
                    "Missing required dependencies: {}\n\n{}\n\nAfter installation, restart your terminal and try again.",
                    tools.join(", "),
                    install_guidance()
                )
            }
            AudiobookError::Encode {
                message,
                diagnostics: Some(diagnostics),
            } => {
                format!("Encoding failed: {}\nFFmpeg output:\n{}", message, diagnostics)
            }
            AudiobookError::MetadataIncomplete { path } => {
                format!(
                    "Could not read the duration of '{}'. The file may be damaged or not a supported audio file.",
                    path.display()
                )
            }
            AudiobookError::Interrupted => {
                "Interrupted! Temporary files have been cleaned up.".to_string()
            }
            _ if self.is_file_error() => {
                format!("{}\nCheck that the path exists and is accessible.", self)
            }
            _ => self.to_string(),
        }
    }
}

/// Platform-specific FFmpeg installation instructions
fn install_guidance() -> String {
    if cfg!(target_os = "macos") {
        "Installation instructions (macOS):\n  Using Homebrew: brew install ffmpeg\n  Using MacPorts: sudo port install ffmpeg".to_string()
    } else if cfg!(target_os = "linux") {
        "Installation instructions (Linux):\n  Ubuntu/Debian: sudo apt update && sudo apt install ffmpeg\n  CentOS/RHEL/Fedora: sudo dnf install ffmpeg\n  Arch Linux: sudo pacman -S ffmpeg".to_string()
    } else if cfg!(target_os = "windows") {
        "Installation instructions (Windows):\n  Using Chocolatey: choco install ffmpeg\n  Using Scoop: scoop install ffmpeg\n  Manual: Download from https://ffmpeg.org/download.html".to_string()
    } else {
        "Please install ffmpeg for your system.\nVisit: https://ffmpeg.org/download.html".to_string()
    }
}
