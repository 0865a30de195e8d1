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


//! Input discovery and output path handling
//!
//! - `scanner` - flat directory scan for audio inputs
//! - `source` - `SourceFile`, one discovered input plus its probe results
//! - `paths` - output path validation and filename sanitizing

pub mod paths;
pub mod scanner;
pub mod source;

pub use paths::{
    cue_path, ensure_parent_dir, partial_output_path, sanitize_filename, validate_output_path,
};
pub use scanner::{discover, is_audio_file};
pub use source::SourceFile;
