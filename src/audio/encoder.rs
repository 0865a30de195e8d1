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


//! FFmpeg encode-and-mux invocation
//!
//! # Pipeline
//! 1. Write a concat demuxer list naming every source in chapter order
//! 2. Write the FFmetadata file (book tags + chapters)
//! 3. Run one FFmpeg process: concat input, optional cover, metadata input,
//!    AAC encode into an `ipod` (M4B) container
//!
//! FFmpeg prints progress to stderr as `time=HH:MM:SS.ss`; the last lines of
//! stderr are kept so a failure can report what FFmpeg complained about.

use crate::audio::bitrate::BitrateDecision;
use crate::audio::metadata::{generate_ffmetadata, BookMetadata};
use crate::chapters::ChapterEntry;
use crate::error::{AudiobookError, Result};
use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::Mutex;

/// Progress callback (0.0 to 1.0)
pub type ProgressCallback = Arc<dyn Fn(f32) + Send + Sync>;

/// Number of trailing stderr lines kept for diagnostics
const STDERR_TAIL_LINES: usize = 20;

const CONCAT_LIST_NAME: &str = "files.txt";
const FFMETADATA_NAME: &str = "metadata.txt";

/// Everything FFmpeg needs to produce the final audiobook
#[derive(Debug, Clone)]
pub struct EncodeRequest {
    /// Chapters in final order; their sources are concatenated in this order
    pub entries: Vec<ChapterEntry>,
    pub bitrate: BitrateDecision,
    pub metadata: BookMetadata,
    pub cover_art: Option<PathBuf>,
    /// File FFmpeg writes; the caller moves it into place afterwards
    pub output: PathBuf,
    /// Scratch directory for the concat list and FFmetadata file
    pub workspace: PathBuf,
}

impl EncodeRequest {
    /// Total playback length in milliseconds
    pub fn total_duration_ms(&self) -> u64 {
        self.entries.last().map(|e| e.end_ms()).unwrap_or(0)
    }

    pub fn concat_list_path(&self) -> PathBuf {
        self.workspace.join(CONCAT_LIST_NAME)
    }

    pub fn ffmetadata_path(&self) -> PathBuf {
        self.workspace.join(FFMETADATA_NAME)
    }
}

/// Quote a path for the concat demuxer
///
/// Entries are single-quoted; an embedded `'` closes the quote, adds an
/// escaped quote and reopens it.
pub fn escape_concat_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', "'\\''")
}

/// Build the concat demuxer list for the ordered chapters
pub fn concat_list_content(entries: &[ChapterEntry]) -> String {
    entries
        .iter()
        .map(|entry| format!("file '{}'\n", escape_concat_path(&entry.source.path)))
        .collect()
}

/// Write the concat list and FFmetadata file into the request's workspace
pub async fn write_inputs(request: &EncodeRequest) -> Result<()> {
    let list_path = request.concat_list_path();
    tokio::fs::write(&list_path, concat_list_content(&request.entries))
        .await
        .map_err(|e| {
            AudiobookError::FileIoError(format!("write: {} - {}", list_path.display(), e))
        })?;

    let meta_path = request.ffmetadata_path();
    tokio::fs::write(
        &meta_path,
        generate_ffmetadata(&request.metadata, &request.entries),
    )
    .await
    .map_err(|e| {
        AudiobookError::FileIoError(format!("write: {} - {}", meta_path.display(), e))
    })?;

    Ok(())
}

/// Build the FFmpeg argument vector (program name excluded)
pub fn build_ffmpeg_args(request: &EncodeRequest, threads: usize) -> Vec<OsString> {
    let threads = threads.max(1).to_string();
    let mut args: Vec<OsString> = vec![
        "-y".into(),
        "-hide_banner".into(),
        "-threads".into(),
        threads.clone().into(),
        "-f".into(),
        "concat".into(),
        "-safe".into(),
        "0".into(),
        "-i".into(),
        request.concat_list_path().into(),
    ];

    // Metadata is always the last input
    let metadata_input = if let Some(cover) = &request.cover_art {
        args.push("-i".into());
        args.push(cover.clone().into());
        2
    } else {
        1
    };

    args.push("-i".into());
    args.push(request.ffmetadata_path().into());
    args.push("-map_metadata".into());
    args.push(metadata_input.to_string().into());

    if request.cover_art.is_some() {
        for arg in [
            "-map",
            "0:a",
            "-map",
            "1:v",
            "-c:v",
            "copy",
            "-disposition:v:0",
            "attached_pic",
        ] {
            args.push(arg.into());
        }
    } else {
        args.push("-map".into());
        args.push("0:a".into());
    }

    for arg in [
        "-c:a".to_string(),
        "aac".to_string(),
        "-aac_coder".to_string(),
        "fast".to_string(),
        "-threads:a".to_string(),
        threads,
        "-b:a".to_string(),
        request.bitrate.ffmpeg_value(),
        "-ac".to_string(),
        "2".to_string(),
        "-ar".to_string(),
        "44100".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
    ] {
        args.push(arg.into());
    }

    let book = &request.metadata;
    for (key, value) in [
        ("title", book.title.as_str()),
        ("artist", book.artist.as_str()),
        ("album", book.title.as_str()),
        ("genre", book.genre.as_str()),
        ("media_type", "2"),
    ] {
        args.push("-metadata".into());
        args.push(format!("{}={}", key, value).into());
    }

    args.push("-f".into());
    args.push("ipod".into());
    args.push(request.output.clone().into());

    args
}

/// Run FFmpeg, forwarding progress and capturing the stderr tail
///
/// `total_duration` is in seconds; progress is only reported when it is
/// positive.
pub async fn run_ffmpeg(
    program: &Path,
    args: &[OsString],
    total_duration: f64,
    progress_callback: Option<ProgressCallback>,
) -> Result<()> {
    tracing::debug!(program = %program.display(), ?args, "running ffmpeg");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AudiobookError::DependencyMissing {
                    tools: vec![program.display().to_string()],
                }
            } else {
                AudiobookError::encode(format!("Failed to execute ffmpeg: {}", e), None)
            }
        })?;

    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| AudiobookError::encode("Failed to capture ffmpeg stderr", None))?;

    let tail = Arc::new(Mutex::new(VecDeque::with_capacity(STDERR_TAIL_LINES)));

    let reader_task = tokio::spawn({
        let tail = tail.clone();
        let progress_callback = progress_callback.clone();
        async move {
            // FFmpeg rewrites its status line with '\r', so split on both
            let mut reader = BufReader::new(stderr);
            let mut buf = Vec::new();
            let mut last = 0.0f32;
            loop {
                buf.clear();
                match reader.read_until(b'\r', &mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
                let chunk = String::from_utf8_lossy(&buf);
                for line in chunk.split(['\r', '\n']).filter(|l| !l.trim().is_empty()) {
                    if let Some(callback) = &progress_callback {
                        if let Some(progress) = parse_ffmpeg_progress(line, total_duration) {
                            // Update every 1%
                            if (progress - last).abs() > 0.01 {
                                last = progress;
                                callback(progress);
                            }
                        }
                    }
                    let mut tail = tail.lock().await;
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line.to_string());
                }
            }
        }
    });

    let status = child
        .wait()
        .await
        .map_err(|e| AudiobookError::encode(format!("FFmpeg process failed: {}", e), None))?;

    let _ = reader_task.await;

    if !status.success() {
        let tail = tail.lock().await;
        let diagnostics = if tail.is_empty() {
            None
        } else {
            Some(tail.iter().cloned().collect::<Vec<_>>().join("\n"))
        };
        return Err(AudiobookError::encode(
            format!("FFmpeg exited with status: {}", status),
            diagnostics,
        ));
    }

    if let Some(callback) = &progress_callback {
        callback(1.0);
    }

    Ok(())
}

/// Parse FFmpeg progress from a stderr line
///
/// FFmpeg outputs: "time=00:01:23.45 bitrate=64.0kbits/s"
pub fn parse_ffmpeg_progress(line: &str, total_duration: f64) -> Option<f32> {
    let time_start = line.find("time=")?;
    let time_str = &line[time_start + 5..];
    let time_end = time_str.find(' ').unwrap_or(time_str.len());
    let elapsed_seconds = parse_timestamp(&time_str[..time_end])?;

    if total_duration > 0.0 {
        Some((elapsed_seconds / total_duration).clamp(0.0, 1.0) as f32)
    } else {
        None
    }
}

/// Parse timestamp in format HH:MM:SS.ss to seconds
pub fn parse_timestamp(timestamp: &str) -> Option<f64> {
    let parts: Vec<&str> = timestamp.split(':').collect();
    if parts.len() != 3 {
        return None;
    }
    let hours: f64 = parts[0].parse().ok()?;
    let minutes: f64 = parts[1].parse().ok()?;
    let seconds: f64 = parts[2].parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}
