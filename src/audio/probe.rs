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


//! FFprobe output parsing
//!
//! Executes (via [`crate::audio::FfmpegToolkit`]):
//! `ffprobe -v error -print_format json -show_format -show_streams {path}`
//!
//! Only the first audio stream is considered. Stream-level values win over
//! container-level ones for codec and bitrate; the container duration wins over
//! the stream duration. Tags are merged from the container and the audio
//! stream (Ogg and FLAC keep theirs on the stream), container first.

use crate::audio::codec::CodecFamily;
use crate::config::{MAX_SOURCE_DURATION_SECS, MAX_TAG_VALUE_LEN};
use crate::error::{AudiobookError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::Path;

/// Tags embedded in a source file that the pipeline cares about
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedTags {
    pub title: Option<String>,
    pub album: Option<String>,
    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub genre: Option<String>,
}

/// Probed information about one source file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeInfo {
    /// FFprobe codec name of the first audio stream (e.g. `mp3`, `aac`)
    pub codec_name: Option<String>,
    /// Bitrate in bits per second
    pub bitrate_bps: Option<u64>,
    /// Duration in milliseconds
    pub duration_ms: Option<u64>,
    pub tags: EmbeddedTags,
    /// Whether the file carries an embedded picture stream
    pub has_cover_art: bool,
}

impl ProbeInfo {
    /// Codec family of the audio stream, if a codec name was reported
    pub fn codec_family(&self) -> Option<CodecFamily> {
        self.codec_name.as_deref().map(CodecFamily::from_codec_name)
    }
}

/// FFprobe JSON output structures
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
    tags: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    bit_rate: Option<String>,
    duration: Option<String>,
    tags: Option<HashMap<String, String>>,
    disposition: Option<FfprobeDisposition>,
}

#[derive(Debug, Deserialize)]
struct FfprobeDisposition {
    #[serde(default)]
    attached_pic: i32,
}

/// Build the FFprobe argument list for a file
pub fn probe_args(path: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-v",
        "error",
        "-print_format",
        "json",
        "-show_format",
        "-show_streams",
    ]
    .iter()
    .map(OsString::from)
    .collect();
    args.push(path.as_os_str().to_os_string());
    args
}

/// Parse FFprobe JSON output for `path`
pub fn parse_ffprobe_output(json: &str, path: &Path) -> Result<ProbeInfo> {
    let probe: FfprobeOutput = serde_json::from_str(json).map_err(|e| {
        AudiobookError::probe(path, format!("Failed to parse FFprobe output: {}", e))
    })?;

    let audio_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .ok_or_else(|| AudiobookError::probe(path, "No audio stream found in file"))?;

    let format = probe.format.as_ref();

    let bitrate_bps = audio_stream
        .bit_rate
        .as_deref()
        .and_then(parse_bitrate)
        .or_else(|| format.and_then(|f| f.bit_rate.as_deref()).and_then(parse_bitrate));

    let duration_ms = format
        .and_then(|f| f.duration.as_deref())
        .and_then(parse_duration_ms)
        .or_else(|| audio_stream.duration.as_deref().and_then(parse_duration_ms));

    let mut merged: HashMap<String, String> = HashMap::new();
    for tags in [audio_stream.tags.as_ref(), format.and_then(|f| f.tags.as_ref())]
        .into_iter()
        .flatten()
    {
        for (key, value) in tags {
            // Later sources (container) override earlier ones (stream)
            merged.insert(key.to_lowercase(), value.clone());
        }
    }

    let has_cover_art = probe.streams.iter().any(|s| {
        s.codec_type.as_deref() == Some("video")
            && (s.disposition.as_ref().map_or(false, |d| d.attached_pic == 1)
                || matches!(s.codec_name.as_deref(), Some("mjpeg" | "png" | "bmp")))
    });

    Ok(ProbeInfo {
        codec_name: audio_stream
            .codec_name
            .as_ref()
            .map(|c| c.to_lowercase()),
        bitrate_bps,
        duration_ms,
        tags: EmbeddedTags {
            title: tag(&merged, &["title"]),
            album: tag(&merged, &["album"]),
            artist: tag(&merged, &["artist"]),
            album_artist: tag(&merged, &["album_artist", "albumartist"]),
            genre: tag(&merged, &["genre"]),
        },
        has_cover_art,
    })
}

/// First non-empty sanitized value among `keys`
fn tag(tags: &HashMap<String, String>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| tags.get(*key))
        .map(|value| sanitize_tag_value(value))
        .find(|value| !value.is_empty())
}

/// Strip control characters and cap the length of an embedded tag value
pub fn sanitize_tag_value(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_TAG_VALUE_LEN)
        .collect::<String>()
        .trim()
        .to_string()
}

fn parse_bitrate(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok().filter(|b| *b > 0)
}

/// Parse FFprobe seconds (`"123.456000"`) to whole milliseconds
///
/// Non-positive, non-finite, and implausibly long (over 24 hours) values
/// count as unknown.
fn parse_duration_ms(value: &str) -> Option<u64> {
    let seconds = value.trim().parse::<f64>().ok()?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return None;
    }
    if seconds > MAX_SOURCE_DURATION_SECS {
        tracing::warn!("Rejecting implausible duration of {} s", seconds);
        return None;
    }
    Some((seconds * 1000.0).round() as u64)
}
