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


//! Chapter naming, ordering, and timing
//!
//! # Module Organization
//!
//! ## name_map
//! - `ChapterNameMap` - Ordered filename → title mapping parsed from a TSV file
//!
//! ## title
//! - Filename-derived titles and chapter title sanitizing
//!
//! ## resolver
//! - `resolve` - Produces `ChapterEntry` values in playback order with start offsets

pub mod name_map;
pub mod resolver;
pub mod title;

pub use name_map::ChapterNameMap;
pub use resolver::{order_files, resolve, ChapterEntry, TitleSource};
pub use title::{sanitize_chapter_title, title_from_file_name};
