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


//! The media tool seam
//!
//! Everything that touches FFmpeg or FFprobe goes through [`MediaToolkit`], so
//! the merge pipeline can be driven by a test double returning canned probe
//! results. [`FfmpegToolkit`] is the real implementation.

use crate::audio::encoder::{build_ffmpeg_args, run_ffmpeg, write_inputs, EncodeRequest, ProgressCallback};
use crate::audio::probe::{parse_ffprobe_output, probe_args, ProbeInfo};
use crate::config::{DEFAULT_FFMPEG, DEFAULT_FFPROBE};
use crate::error::{AudiobookError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// External media operations used by the merge pipeline
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Fail with `DependencyMissing` listing every tool that cannot be launched
    async fn check_dependencies(&self) -> Result<()>;

    async fn probe(&self, path: &Path) -> Result<ProbeInfo>;

    /// Extract the embedded picture of `source` into `dest`
    ///
    /// Returns `false` when the source has no usable picture stream.
    async fn extract_cover_art(&self, source: &Path, dest: &Path) -> Result<bool>;

    /// Encode all chapters into the single output container
    async fn encode_and_mux(&self, request: &EncodeRequest) -> Result<()>;
}

/// [`MediaToolkit`] backed by the `ffmpeg` and `ffprobe` executables
#[derive(Clone)]
pub struct FfmpegToolkit {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    threads: usize,
    progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for FfmpegToolkit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegToolkit")
            .field("ffmpeg", &self.ffmpeg)
            .field("ffprobe", &self.ffprobe)
            .field("threads", &self.threads)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl Default for FfmpegToolkit {
    fn default() -> Self {
        Self::new(DEFAULT_FFMPEG, DEFAULT_FFPROBE, 1)
    }
}

impl FfmpegToolkit {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(ffmpeg: P, ffprobe: Q, threads: usize) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            threads: threads.max(1),
            progress: None,
        }
    }

    /// Report encoding progress (0.0 to 1.0) to `callback`
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Whether `program -version` can be launched and exits cleanly
    async fn can_launch(program: &Path) -> bool {
        match Command::new(program)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
        {
            Ok(status) => status.success(),
            Err(e) => {
                tracing::debug!(program = %program.display(), error = %e, "tool not launchable");
                false
            }
        }
    }
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn check_dependencies(&self) -> Result<()> {
        let mut missing = Vec::new();
        for program in [&self.ffmpeg, &self.ffprobe] {
            if !Self::can_launch(program).await {
                missing.push(program.display().to_string());
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AudiobookError::DependencyMissing { tools: missing })
        }
    }

    async fn probe(&self, path: &Path) -> Result<ProbeInfo> {
        let output = Command::new(&self.ffprobe)
            .args(probe_args(path))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    AudiobookError::DependencyMissing {
                        tools: vec![self.ffprobe.display().to_string()],
                    }
                } else {
                    AudiobookError::probe(path, format!("Failed to execute ffprobe: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AudiobookError::probe(
                path,
                format!("FFprobe failed: {}", stderr.trim()),
            ));
        }

        let json = String::from_utf8(output.stdout).map_err(|e| {
            AudiobookError::probe(path, format!("FFprobe output is not valid UTF-8: {}", e))
        })?;

        let info = parse_ffprobe_output(&json, path)?;
        tracing::debug!(
            path = %path.display(),
            codec = ?info.codec_name,
            bitrate = ?info.bitrate_bps,
            duration_ms = ?info.duration_ms,
            cover = info.has_cover_art,
            "probed"
        );
        Ok(info)
    }

    async fn extract_cover_art(&self, source: &Path, dest: &Path) -> Result<bool> {
        let status = Command::new(&self.ffmpeg)
            .arg("-y")
            .arg("-v")
            .arg("error")
            .arg("-i")
            .arg(source.as_os_str())
            .arg("-an")
            .arg("-vcodec")
            .arg("copy")
            .arg(dest.as_os_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    AudiobookError::DependencyMissing {
                        tools: vec![self.ffmpeg.display().to_string()],
                    }
                } else {
                    AudiobookError::FileIoError(format!(
                        "cover art: {} - {}",
                        source.display(),
                        e
                    ))
                }
            })?;

        if !status.success() {
            tracing::debug!(source = %source.display(), %status, "cover extraction failed");
            return Ok(false);
        }

        let extracted = match tokio::fs::metadata(dest).await {
            Ok(meta) => meta.len() > 0,
            Err(_) => false,
        };
        Ok(extracted)
    }

    async fn encode_and_mux(&self, request: &EncodeRequest) -> Result<()> {
        write_inputs(request).await?;

        let args = build_ffmpeg_args(request, self.threads);
        let total_seconds = request.total_duration_ms() as f64 / 1000.0;
        run_ffmpeg(&self.ffmpeg, &args, total_seconds, self.progress.clone()).await?;

        match tokio::fs::metadata(&request.output).await {
            Ok(meta) if meta.len() > 0 => Ok(()),
            Ok(_) => Err(AudiobookError::encode(
                format!("Output file is empty: {}", request.output.display()),
                None,
            )),
            Err(_) => Err(AudiobookError::encode(
                format!("Output file was not created: {}", request.output.display()),
                None,
            )),
        }
    }
}
