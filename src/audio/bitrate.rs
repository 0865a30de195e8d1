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


//! Output bitrate selection
//!
//! # Strategy
//! 1. Quick mode: fixed 16 kbit/s, no analysis
//! 2. Per file: `bitrate * multiplier` for lossy sources with a known bitrate,
//!    a fixed reference for lossless sources
//! 3. Take the maximum across files so no file is degraded
//! 4. Round to the nearest 8 kbit/s and clamp to 32..=128 kbit/s

use crate::audio::codec::{CodecFamily, EfficiencyTable};
use crate::config::{
    BITRATE_STEP_BPS, LOSSLESS_REFERENCE_BPS, MAX_BITRATE_BPS, MIN_BITRATE_BPS, QUICK_BITRATE_BPS,
};
use crate::file::SourceFile;
use serde::{Deserialize, Serialize};

/// The chosen output bitrate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BitrateDecision {
    /// Output bitrate in bits per second
    pub bitrate_bps: u32,
    /// Whether quick mode produced this decision
    pub quick: bool,
    /// Maximum effective reference bitrate before rounding and clamping
    pub reference_bps: Option<f64>,
    /// Codec names that were not in the efficiency table and used the baseline
    pub unknown_codecs: Vec<String>,
}

impl BitrateDecision {
    /// Bitrate formatted for FFmpeg's `-b:a` (e.g. `64k`)
    pub fn ffmpeg_value(&self) -> String {
        format!("{}k", self.bitrate_bps / 1000)
    }

    pub fn kbps(&self) -> u32 {
        self.bitrate_bps / 1000
    }
}

/// Select the output bitrate for a set of source files
pub fn select_bitrate(files: &[SourceFile], quick: bool) -> BitrateDecision {
    if quick {
        tracing::info!("Quick mode: using {}k AAC", QUICK_BITRATE_BPS / 1000);
        return BitrateDecision {
            bitrate_bps: QUICK_BITRATE_BPS,
            quick: true,
            reference_bps: None,
            unknown_codecs: Vec::new(),
        };
    }

    let mut unknown_codecs: Vec<String> = Vec::new();
    let mut reference: Option<f64> = None;

    for file in files {
        let family = file.codec_family();

        if family == CodecFamily::Unknown {
            let label = file.codec_label();
            tracing::warn!(
                "Unknown codec '{}' in {}, assuming baseline efficiency",
                label,
                file.file_name
            );
            if !unknown_codecs.contains(&label) {
                unknown_codecs.push(label);
            }
        }

        let effective = match effective_reference(file, family) {
            Some(value) => value,
            None => {
                tracing::debug!("No bitrate known for {}, skipping", file.file_name);
                continue;
            }
        };

        reference = Some(reference.map_or(effective, |current: f64| current.max(effective)));
    }

    let bitrate_bps = match reference {
        Some(value) => clamp_bitrate(round_to_step(value)),
        None => {
            tracing::warn!(
                "No source bitrate available, using {}k",
                MAX_BITRATE_BPS / 1000
            );
            MAX_BITRATE_BPS
        }
    };

    if let Some(value) = reference {
        tracing::info!(
            "Source reference {:.1}k -> optimal AAC {}k",
            value / 1000.0,
            bitrate_bps / 1000
        );
    }

    BitrateDecision {
        bitrate_bps,
        quick: false,
        reference_bps: reference,
        unknown_codecs,
    }
}

/// Effective AAC-equivalent bitrate for one file
fn effective_reference(file: &SourceFile, family: CodecFamily) -> Option<f64> {
    if family.is_lossless() {
        return Some(f64::from(LOSSLESS_REFERENCE_BPS));
    }

    let bitrate = file.info.bitrate_bps?;
    let multiplier = EfficiencyTable::multiplier(family).unwrap_or(EfficiencyTable::BASELINE);
    Some(bitrate as f64 * multiplier)
}

/// Round to the nearest [`BITRATE_STEP_BPS`], ties upward
fn round_to_step(bps: f64) -> u32 {
    let step = f64::from(BITRATE_STEP_BPS);
    let steps = (bps / step + 0.5).floor();
    (steps * step).min(f64::from(u32::MAX)) as u32
}

fn clamp_bitrate(bps: u32) -> u32 {
    bps.clamp(MIN_BITRATE_BPS, MAX_BITRATE_BPS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::probe::ProbeInfo;

    fn source(name: &str, codec: Option<&str>, bitrate: Option<u64>) -> SourceFile {
        SourceFile::new(format!("/books/{}", name), 0).with_info(ProbeInfo {
            codec_name: codec.map(str::to_string),
            bitrate_bps: bitrate,
            duration_ms: Some(1_000),
            ..Default::default()
        })
    }

    #[test]
    fn test_quick_mode_ignores_sources() {
        let files = vec![source("a.flac", Some("flac"), Some(900_000))];
        let decision = select_bitrate(&files, true);
        assert_eq!(decision.bitrate_bps, 16_000);
        assert!(decision.quick);
        assert_eq!(select_bitrate(&[], true).bitrate_bps, 16_000);
    }

    #[test]
    fn test_single_lossy_file_reference() {
        let files = vec![source("a.mp3", Some("mp3"), Some(128_000))];
        let decision = select_bitrate(&files, false);
        let reference = decision.reference_bps.unwrap();
        assert!((reference - 102_400.0).abs() < 1e-6);
        // 102.4k rounds to 104k
        assert_eq!(decision.bitrate_bps, 104_000);
        assert!(!decision.quick);
    }

    #[test]
    fn test_maximum_across_files() {
        let files = vec![
            source("a.mp3", Some("mp3"), Some(64_000)),
            source("b.ogg", Some("vorbis"), Some(80_000)),
            source("c.m4a", Some("aac"), Some(48_000)),
        ];
        let decision = select_bitrate(&files, false);
        let reference = decision.reference_bps.unwrap();
        assert!((reference - 88_000.0).abs() < 1e-6);
        assert_eq!(decision.bitrate_bps, 88_000);
    }

    #[test]
    fn test_unknown_codec_falls_back_to_baseline() {
        let files = vec![source("a.spx", Some("speex"), Some(40_000))];
        let decision = select_bitrate(&files, false);
        assert!((decision.reference_bps.unwrap() - 40_000.0).abs() < 1e-6);
        assert_eq!(decision.bitrate_bps, 40_000);
        assert_eq!(decision.unknown_codecs, vec!["speex".to_string()]);
    }

    #[test]
    fn test_unknown_codec_recorded_without_bitrate() {
        let files = vec![
            source("a.spx", Some("speex"), None),
            source("b.mp3", Some("mp3"), Some(80_000)),
        ];
        let decision = select_bitrate(&files, false);
        assert_eq!(decision.unknown_codecs, vec!["speex".to_string()]);
        assert!((decision.reference_bps.unwrap() - 64_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_lossless_uses_fixed_reference() {
        let files = vec![
            source("a.flac", Some("flac"), Some(1_000_000)),
            source("b.mp3", Some("mp3"), Some(32_000)),
        ];
        let decision = select_bitrate(&files, false);
        assert_eq!(decision.reference_bps, Some(128_000.0));
        assert_eq!(decision.bitrate_bps, 128_000);
    }

    #[test]
    fn test_clamping() {
        let low = select_bitrate(&[source("a.mp3", Some("mp3"), Some(16_000))], false);
        assert_eq!(low.bitrate_bps, MIN_BITRATE_BPS);

        let high = select_bitrate(&[source("a.opus", Some("opus"), Some(256_000))], false);
        assert_eq!(high.bitrate_bps, MAX_BITRATE_BPS);
    }

    #[test]
    fn test_no_known_bitrate_uses_maximum() {
        let files = vec![source("a.mp3", Some("mp3"), None)];
        let decision = select_bitrate(&files, false);
        assert_eq!(decision.reference_bps, None);
        assert_eq!(decision.bitrate_bps, MAX_BITRATE_BPS);
    }

    #[test]
    fn test_extension_used_when_codec_unknown() {
        let files = vec![source("a.mp3", None, Some(80_000))];
        let decision = select_bitrate(&files, false);
        assert!((decision.reference_bps.unwrap() - 64_000.0).abs() < 1e-6);
        assert!(decision.unknown_codecs.is_empty());
    }

    #[test]
    fn test_round_to_step() {
        assert_eq!(round_to_step(100_000.0), 104_000);
        assert_eq!(round_to_step(99_999.0), 96_000);
        assert_eq!(round_to_step(60_000.0), 64_000);
    }

    #[test]
    fn test_ffmpeg_value() {
        let decision = select_bitrate(&[], true);
        assert_eq!(decision.ffmpeg_value(), "16k");
    }
}
