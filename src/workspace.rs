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


//! Scoped scratch directory for one merge run
//!
//! Holds the concat list, the FFmetadata file, and the extracted cover. The
//! directory is removed when the workspace is dropped, so a cancelled or
//! failed pipeline leaves nothing behind.

use crate::error::{AudiobookError, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const WORKSPACE_PREFIX: &str = "audiobook_";
const COVER_FILE_NAME: &str = "cover.jpg";

#[derive(Debug)]
pub struct TempWorkspace {
    dir: TempDir,
}

impl TempWorkspace {
    /// Create a workspace under the system temp directory
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir()
            .map_err(|e| AudiobookError::FileIoError(format!("create temp dir: {}", e)))?;
        tracing::debug!(path = %dir.path().display(), "workspace created");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn cover_path(&self) -> PathBuf {
        self.dir.path().join(COVER_FILE_NAME)
    }

    /// Remove the directory now, reporting failures instead of ignoring them
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(|e| {
            AudiobookError::FileIoError(format!("remove: {} - {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), "workspace removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removed_on_drop() {
        let workspace = TempWorkspace::new().unwrap();
        let path = workspace.path().to_path_buf();
        std::fs::write(workspace.cover_path(), b"jpeg").unwrap();
        assert!(path.is_dir());

        drop(workspace);
        assert!(!path.exists());
    }

    #[test]
    fn test_close() {
        let workspace = TempWorkspace::new().unwrap();
        let path = workspace.path().to_path_buf();
        assert!(path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("audiobook_"))
            .unwrap_or(false));

        workspace.close().unwrap();
        assert!(!path.exists());
    }
}
