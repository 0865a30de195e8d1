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


//! The merge pipeline
//!
//! discovery → probing → chapter resolution → bitrate selection → title
//! choice → cover art → encode → cleanup
//!
//! FFmpeg writes to `<output>.part` in the output directory. Only a verified
//! encode is renamed onto the output path, so an existing audiobook at that
//! path survives a failed or interrupted run.
//!
//! [`Orchestrator::run_until`] races the pipeline against a shutdown future.
//! Losing the race drops the pipeline: the FFmpeg child is killed, the temp
//! workspace is removed, and the `.part` file is deleted.

use crate::audio::bitrate::{select_bitrate, BitrateDecision};
use crate::audio::encoder::EncodeRequest;
use crate::audio::metadata::{save_cue_sheet, BookMetadata};
use crate::audio::toolkit::MediaToolkit;
use crate::chapters::{resolve, sanitize_chapter_title, ChapterEntry, ChapterNameMap};
use crate::config::{MergeOptions, DEFAULT_BOOK_TITLE};
use crate::error::{AudiobookError, Result};
use crate::file::{
    discover, ensure_parent_dir, partial_output_path, validate_output_path, SourceFile,
};
use crate::workspace::TempWorkspace;
use async_trait::async_trait;
use std::future::Future;
use std::path::{Path, PathBuf};

/// Where a candidate book title came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleOrigin {
    /// First file's album tag, else its title tag
    Metadata,
    /// Name of the input directory
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleCandidate {
    pub title: String,
    pub origin: TitleOrigin,
}

/// Picks the book title when both metadata and directory offer one
///
/// Runs inside the pipeline, so an implementation that waits on the user must
/// stay cancellable: it is dropped when shutdown wins.
#[async_trait]
pub trait TitleChooser: Send + Sync {
    /// Index into `candidates`, or `None` to fall back to the directory name
    async fn choose(&self, candidates: &[TitleCandidate]) -> Option<usize>;
}

/// Non-interactive chooser: always the directory name
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryTitleChooser;

#[async_trait]
impl TitleChooser for DirectoryTitleChooser {
    async fn choose(&self, candidates: &[TitleCandidate]) -> Option<usize> {
        candidates
            .iter()
            .position(|c| c.origin == TitleOrigin::Directory)
    }
}

/// Title candidates from the first file's tags and the input directory
pub fn title_candidates(first: Option<&SourceFile>, input_dir: &Path) -> Vec<TitleCandidate> {
    let mut candidates = Vec::new();

    let metadata_title = first.and_then(|f| {
        let tags = &f.info.tags;
        tags.album.as_deref().or(tags.title.as_deref())
    });
    if let Some(title) = metadata_title.and_then(sanitize_chapter_title) {
        candidates.push(TitleCandidate {
            title,
            origin: TitleOrigin::Metadata,
        });
    }

    let dir_title = input_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .and_then(|n| sanitize_chapter_title(&n));
    if let Some(title) = dir_title {
        candidates.push(TitleCandidate {
            title,
            origin: TitleOrigin::Directory,
        });
    }

    candidates
}

/// Apply the title policy
///
/// override > chooser (only asked when there are two candidates) > the single
/// candidate > "Audiobook".
pub async fn choose_book_title(
    title_override: Option<&str>,
    candidates: &[TitleCandidate],
    chooser: &dyn TitleChooser,
) -> String {
    if let Some(title) = title_override.and_then(sanitize_chapter_title) {
        return title;
    }

    match candidates {
        [] => DEFAULT_BOOK_TITLE.to_string(),
        [only] => only.title.clone(),
        _ => {
            let fallback = candidates
                .iter()
                .find(|c| c.origin == TitleOrigin::Directory)
                .unwrap_or(&candidates[0]);
            chooser
                .choose(candidates)
                .await
                .and_then(|i| candidates.get(i))
                .unwrap_or(fallback)
                .title
                .clone()
        }
    }
}

/// Outcome of a merge run (or the plan, for a dry run)
#[derive(Debug, Clone)]
pub struct MergeReport {
    pub output: PathBuf,
    pub metadata: BookMetadata,
    pub bitrate: BitrateDecision,
    pub entries: Vec<ChapterEntry>,
    pub cover_art: bool,
    pub cue_sheet: Option<PathBuf>,
    pub dry_run: bool,
}

impl MergeReport {
    pub fn total_duration_ms(&self) -> u64 {
        self.entries.last().map(|e| e.end_ms()).unwrap_or(0)
    }
}

/// Drives one merge run through a [`MediaToolkit`]
pub struct Orchestrator<'a> {
    toolkit: &'a dyn MediaToolkit,
    chooser: &'a dyn TitleChooser,
}

impl<'a> Orchestrator<'a> {
    pub fn new(toolkit: &'a dyn MediaToolkit, chooser: &'a dyn TitleChooser) -> Self {
        Self { toolkit, chooser }
    }

    /// Run to completion with no cancellation
    pub async fn run(&self, options: &MergeOptions) -> Result<MergeReport> {
        self.run_until(options, std::future::pending::<()>()).await
    }

    /// Run until done or until `shutdown` resolves
    ///
    /// On shutdown the pipeline is dropped and `Interrupted` is returned.
    pub async fn run_until<F>(&self, options: &MergeOptions, shutdown: F) -> Result<MergeReport>
    where
        F: Future<Output = ()>,
    {
        let output = validate_output_path(&options.output_path)?;
        let partial = partial_output_path(&output);

        let mut pipeline = Box::pin(self.pipeline(options, &output, &partial));
        let outcome = tokio::select! {
            result = &mut pipeline => Some(result),
            _ = shutdown => None,
        };
        // Kills FFmpeg and removes the workspace
        drop(pipeline);

        match outcome {
            Some(result) => result,
            None => {
                tracing::warn!("interrupted, cleaning up");
                if !options.dry_run {
                    remove_partial_output(&partial).await;
                }
                Err(AudiobookError::Interrupted)
            }
        }
    }

    async fn pipeline(
        &self,
        options: &MergeOptions,
        output: &Path,
        partial: &Path,
    ) -> Result<MergeReport> {
        self.toolkit.check_dependencies().await?;

        let name_map = match &options.index_file {
            Some(path) => {
                let map = ChapterNameMap::load(path).await?;
                tracing::info!(entries = map.len(), file = %path.display(), "loaded chapter names");
                Some(map)
            }
            None => None,
        };

        let files = self.probe_all(discover(&options.input_dir).await?).await?;

        let entries = resolve(&files, name_map.as_ref())?;
        let bitrate = select_bitrate(&files, options.quick);
        tracing::info!(
            kbps = bitrate.kbps(),
            quick = bitrate.quick,
            reference = ?bitrate.reference_bps,
            "selected bitrate"
        );

        let first = entries.first().map(|e| &e.source);
        // Discovered paths are canonical, so "." still yields a directory name
        let input_dir = first
            .and_then(|f| f.path.parent())
            .unwrap_or(options.input_dir.as_path());
        let candidates = title_candidates(first, input_dir);
        let title =
            choose_book_title(options.title_override.as_deref(), &candidates, self.chooser).await;
        let metadata = BookMetadata::from_tags(title, first.map(|f| &f.info.tags));
        tracing::info!(title = %metadata.title, artist = %metadata.artist, "book metadata");

        if options.dry_run {
            return Ok(MergeReport {
                output: output.to_path_buf(),
                metadata,
                bitrate,
                entries,
                cover_art: files.iter().any(|f| f.info.has_cover_art),
                cue_sheet: None,
                dry_run: true,
            });
        }

        ensure_parent_dir(output).await?;
        let workspace = TempWorkspace::new()?;
        let cover_art = self.extract_cover(&entries, &workspace).await?;

        let request = EncodeRequest {
            entries,
            bitrate,
            metadata,
            cover_art,
            output: partial.to_path_buf(),
            workspace: workspace.path().to_path_buf(),
        };

        tracing::info!(
            chapters = request.entries.len(),
            output = %output.display(),
            "encoding"
        );
        if let Err(e) = self.toolkit.encode_and_mux(&request).await {
            remove_partial_output(partial).await;
            return Err(e);
        }
        if let Err(e) = tokio::fs::rename(partial, output).await {
            remove_partial_output(partial).await;
            return Err(AudiobookError::FileIoError(format!(
                "rename: {} -> {} - {}",
                partial.display(),
                output.display(),
                e
            )));
        }

        let cue_sheet = if options.write_cue_sheet {
            Some(save_cue_sheet(output, &request.metadata, &request.entries).await?)
        } else {
            None
        };

        if let Err(e) = workspace.close() {
            tracing::warn!(error = %e, "failed to remove workspace");
        }

        tracing::info!(output = %output.display(), "audiobook created");
        Ok(MergeReport {
            output: output.to_path_buf(),
            metadata: request.metadata,
            bitrate: request.bitrate,
            entries: request.entries,
            cover_art: request.cover_art.is_some(),
            cue_sheet,
            dry_run: false,
        })
    }

    /// Probe every file in order; the first failure aborts the run
    async fn probe_all(&self, files: Vec<SourceFile>) -> Result<Vec<SourceFile>> {
        let mut probed = Vec::with_capacity(files.len());
        for file in files {
            let info = self.toolkit.probe(&file.path).await?;
            probed.push(file.with_info(info));
        }
        Ok(probed)
    }

    /// First picture that extracts successfully, in chapter order
    async fn extract_cover(
        &self,
        entries: &[ChapterEntry],
        workspace: &TempWorkspace,
    ) -> Result<Option<PathBuf>> {
        let dest = workspace.cover_path();
        for entry in entries.iter().filter(|e| e.source.info.has_cover_art) {
            if self.toolkit.extract_cover_art(&entry.source.path, &dest).await? {
                tracing::info!(source = %entry.source.file_name, "using embedded cover art");
                return Ok(Some(dest));
            }
            tracing::debug!(source = %entry.source.file_name, "cover extraction failed");
        }
        Ok(None)
    }
}

async fn remove_partial_output(partial: &Path) {
    match tokio::fs::remove_file(partial).await {
        Ok(()) => tracing::info!(path = %partial.display(), "removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %partial.display(), error = %e, "failed to remove partial output"),
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
