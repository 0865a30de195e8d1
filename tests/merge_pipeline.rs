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

//! End-to-end pipeline tests driven by a canned media toolkit

use async_trait::async_trait;
use audiobook_creator::audio::probe::EmbeddedTags;
use audiobook_creator::{
    AudiobookError, DirectoryTitleChooser, EncodeRequest, MediaToolkit, MergeOptions, Orchestrator,
    ProbeInfo, Result, TitleCandidate, TitleChooser, TitleSource,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;
use tokio::sync::Notify;

#[derive(Clone, Copy, PartialEq)]
enum EncodeBehavior {
    Succeed,
    Fail,
    /// Fails before FFmpeg writes anything
    FailWithoutOutput,
    Hang,
}

struct FakeToolkit {
    probes: HashMap<String, ProbeInfo>,
    dependencies_ok: bool,
    encode: EncodeBehavior,
    encode_started: Notify,
    requests: Mutex<Vec<EncodeRequest>>,
    probed: Mutex<Vec<String>>,
}

impl FakeToolkit {
    fn new(encode: EncodeBehavior) -> Self {
        Self {
            probes: HashMap::new(),
            dependencies_ok: true,
            encode,
            encode_started: Notify::new(),
            requests: Mutex::new(Vec::new()),
            probed: Mutex::new(Vec::new()),
        }
    }

    fn with_file(mut self, name: &str, info: ProbeInfo) -> Self {
        self.probes.insert(name.to_string(), info);
        self
    }

    fn last_request(&self) -> Option<EncodeRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl MediaToolkit for FakeToolkit {
    async fn check_dependencies(&self) -> Result<()> {
        if self.dependencies_ok {
            Ok(())
        } else {
            Err(AudiobookError::DependencyMissing {
                tools: vec!["ffmpeg".to_string()],
            })
        }
    }

    async fn probe(&self, path: &Path) -> Result<ProbeInfo> {
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        self.probed.lock().unwrap().push(name.clone());
        self.probes
            .get(&name)
            .cloned()
            .ok_or_else(|| AudiobookError::probe(path, "no audio stream"))
    }

    async fn extract_cover_art(&self, _source: &Path, dest: &Path) -> Result<bool> {
        tokio::fs::write(dest, b"jpeg").await?;
        Ok(true)
    }

    async fn encode_and_mux(&self, request: &EncodeRequest) -> Result<()> {
        self.requests.lock().unwrap().push(request.clone());
        if self.encode != EncodeBehavior::FailWithoutOutput {
            tokio::fs::write(&request.output, b"encoded").await?;
        }
        self.encode_started.notify_one();

        match self.encode {
            EncodeBehavior::Succeed => Ok(()),
            EncodeBehavior::Fail | EncodeBehavior::FailWithoutOutput => Err(AudiobookError::encode(
                "FFmpeg exited with status: 1",
                Some("Invalid data found".to_string()),
            )),
            EncodeBehavior::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

fn mp3(duration_ms: Option<u64>, title: Option<&str>) -> ProbeInfo {
    ProbeInfo {
        codec_name: Some("mp3".to_string()),
        bitrate_bps: Some(128_000),
        duration_ms,
        tags: EmbeddedTags {
            title: title.map(str::to_string),
            artist: Some("Frank Herbert".to_string()),
            ..Default::default()
        },
        has_cover_art: false,
    }
}

struct Fixture {
    input: TempDir,
    out: TempDir,
}

impl Fixture {
    async fn new(names: &[&str]) -> Self {
        let input = tempfile::tempdir().unwrap();
        for name in names {
            tokio::fs::write(input.path().join(name), b"audio").await.unwrap();
        }
        Self {
            input,
            out: tempfile::tempdir().unwrap(),
        }
    }

    fn output(&self) -> PathBuf {
        self.out.path().join("book.m4b")
    }

    fn partial(&self) -> PathBuf {
        self.out.path().join("book.m4b.part")
    }

    fn options(&self) -> MergeOptions {
        MergeOptions::new(self.input.path(), self.output())
            .title("My Book")
            .threads(2)
    }
}

#[tokio::test]
async fn test_mapping_orders_and_names_chapters() {
    let fx = Fixture::new(&["a.mp3", "b.mp3", "c.mp3"]).await;
    let index = fx.out.path().join("chapters.tsv");
    tokio::fs::write(&index, "c.mp3\tOpening\n").await.unwrap();

    let toolkit = FakeToolkit::new(EncodeBehavior::Succeed)
        .with_file("a.mp3", mp3(Some(60_000), None))
        .with_file("b.mp3", mp3(Some(90_000), Some("Second")))
        .with_file("c.mp3", mp3(Some(30_000), None));
    let chooser = DirectoryTitleChooser;

    let report = Orchestrator::new(&toolkit, &chooser)
        .run(&fx.options().index_file(&index))
        .await
        .unwrap();

    let plan: Vec<(&str, &str, u64)> = report
        .entries
        .iter()
        .map(|e| (e.source.file_name.as_str(), e.title.as_str(), e.start_ms))
        .collect();
    assert_eq!(
        plan,
        vec![
            ("c.mp3", "Opening", 0),
            ("a.mp3", "a", 30_000),
            ("b.mp3", "Second", 90_000),
        ]
    );
    assert_eq!(report.entries[0].title_source, TitleSource::Mapping);
    assert_eq!(report.entries[2].title_source, TitleSource::Embedded);
    assert_eq!(report.total_duration_ms(), 180_000);

    // mp3 at 128k maps to 102.4k, rounded to the 8k grid
    assert_eq!(report.bitrate.bitrate_bps, 104_000);
    assert_eq!(report.metadata.title, "My Book");
    assert_eq!(report.metadata.artist, "Frank Herbert");
    assert_eq!(report.metadata.genre, "Audiobook");
    assert!(!report.dry_run);
    assert_eq!(report.output, fx.output());
    assert_eq!(tokio::fs::read(fx.output()).await.unwrap(), b"encoded");
    assert!(!fx.partial().exists());

    let request = toolkit.last_request().unwrap();
    assert_eq!(request.output, fx.partial());
    assert!(request.cover_art.is_none());
    assert!(!request.workspace.exists());
}

#[tokio::test]
async fn test_quick_mode_uses_fixed_bitrate() {
    let fx = Fixture::new(&["01.mp3"]).await;
    let toolkit =
        FakeToolkit::new(EncodeBehavior::Succeed).with_file("01.mp3", mp3(Some(1_000), None));
    let chooser = DirectoryTitleChooser;

    let report = Orchestrator::new(&toolkit, &chooser)
        .run(&fx.options().quick(true))
        .await
        .unwrap();

    assert_eq!(report.bitrate.bitrate_bps, 16_000);
    assert_eq!(report.bitrate.ffmpeg_value(), "16k");
    // A bare number keeps its filename as the title
    assert_eq!(report.entries[0].title, "01");
}

#[tokio::test]
async fn test_missing_duration_fails_before_encoding() {
    let fx = Fixture::new(&["a.mp3", "b.mp3"]).await;
    let toolkit = FakeToolkit::new(EncodeBehavior::Succeed)
        .with_file("a.mp3", mp3(Some(1_000), None))
        .with_file("b.mp3", mp3(None, None));
    let chooser = DirectoryTitleChooser;

    let err = Orchestrator::new(&toolkit, &chooser)
        .run(&fx.options())
        .await
        .unwrap_err();

    match err {
        AudiobookError::MetadataIncomplete { path } => {
            assert_eq!(path.file_name().unwrap(), "b.mp3");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(toolkit.last_request().is_none());
    assert!(!fx.output().exists());
}

#[tokio::test]
async fn test_probe_failure_is_fatal() {
    let fx = Fixture::new(&["a.mp3", "broken.mp3"]).await;
    let toolkit =
        FakeToolkit::new(EncodeBehavior::Succeed).with_file("a.mp3", mp3(Some(1_000), None));
    let chooser = DirectoryTitleChooser;

    let err = Orchestrator::new(&toolkit, &chooser)
        .run(&fx.options())
        .await
        .unwrap_err();
    assert!(matches!(err, AudiobookError::Probe { .. }));
}

#[tokio::test]
async fn test_missing_dependency_stops_before_probing() {
    let fx = Fixture::new(&["a.mp3"]).await;
    let mut toolkit =
        FakeToolkit::new(EncodeBehavior::Succeed).with_file("a.mp3", mp3(Some(1_000), None));
    toolkit.dependencies_ok = false;
    let chooser = DirectoryTitleChooser;

    let err = Orchestrator::new(&toolkit, &chooser)
        .run(&fx.options())
        .await
        .unwrap_err();

    assert!(matches!(err, AudiobookError::DependencyMissing { .. }));
    assert!(err.user_message().contains("ffmpeg"));
    assert!(toolkit.probed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_dry_run_does_not_encode() {
    let fx = Fixture::new(&["a.mp3", "b.mp3"]).await;
    let toolkit = FakeToolkit::new(EncodeBehavior::Succeed)
        .with_file("a.mp3", mp3(Some(60_000), None))
        .with_file("b.mp3", mp3(Some(90_000), None));
    let chooser = DirectoryTitleChooser;

    let report = Orchestrator::new(&toolkit, &chooser)
        .run(&fx.options().dry_run(true))
        .await
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.entries.len(), 2);
    assert_eq!(report.entries[1].start_ms, 60_000);
    assert!(toolkit.last_request().is_none());
    assert!(!fx.output().exists());
}

#[tokio::test]
async fn test_cover_art_and_cue_sheet() {
    let fx = Fixture::new(&["a.mp3", "b.mp3"]).await;
    let mut with_cover = mp3(Some(2_000), None);
    with_cover.has_cover_art = true;
    let toolkit = FakeToolkit::new(EncodeBehavior::Succeed)
        .with_file("a.mp3", mp3(Some(1_000), None))
        .with_file("b.mp3", with_cover);
    let chooser = DirectoryTitleChooser;

    let report = Orchestrator::new(&toolkit, &chooser)
        .run(&fx.options().cue_sheet(true))
        .await
        .unwrap();

    assert!(report.cover_art);
    let request = toolkit.last_request().unwrap();
    assert_eq!(
        request.cover_art.as_deref().and_then(|p| p.file_name()),
        Some(std::ffi::OsStr::new("cover.jpg"))
    );

    let cue = report.cue_sheet.unwrap();
    assert_eq!(cue, fx.out.path().join("book.cue"));
    let content = tokio::fs::read_to_string(&cue).await.unwrap();
    assert!(content.contains("TRACK 02 AUDIO"));
    assert!(content.contains("INDEX 01 00:01:00"));
}

#[tokio::test]
async fn test_encode_failure_removes_partial_output() {
    let fx = Fixture::new(&["a.mp3"]).await;
    let toolkit =
        FakeToolkit::new(EncodeBehavior::Fail).with_file("a.mp3", mp3(Some(1_000), None));
    let chooser = DirectoryTitleChooser;

    let err = Orchestrator::new(&toolkit, &chooser)
        .run(&fx.options())
        .await
        .unwrap_err();

    assert!(matches!(err, AudiobookError::Encode { .. }));
    assert!(err.user_message().contains("Invalid data found"));
    assert!(!fx.output().exists());
    assert!(!fx.partial().exists());
    let request = toolkit.last_request().unwrap();
    assert!(!request.workspace.exists());
}

#[tokio::test]
async fn test_encode_failure_keeps_existing_output() {
    for behavior in [EncodeBehavior::Fail, EncodeBehavior::FailWithoutOutput] {
        let fx = Fixture::new(&["a.mp3"]).await;
        tokio::fs::write(fx.output(), b"previous audiobook").await.unwrap();
        let toolkit = FakeToolkit::new(behavior).with_file("a.mp3", mp3(Some(1_000), None));
        let chooser = DirectoryTitleChooser;

        let err = Orchestrator::new(&toolkit, &chooser)
            .run(&fx.options())
            .await
            .unwrap_err();

        assert!(matches!(err, AudiobookError::Encode { .. }));
        assert_eq!(
            tokio::fs::read(fx.output()).await.unwrap(),
            b"previous audiobook"
        );
        assert!(!fx.partial().exists());
    }
}

#[tokio::test]
async fn test_successful_encode_replaces_existing_output() {
    let fx = Fixture::new(&["a.mp3"]).await;
    tokio::fs::write(fx.output(), b"previous audiobook").await.unwrap();
    let toolkit =
        FakeToolkit::new(EncodeBehavior::Succeed).with_file("a.mp3", mp3(Some(1_000), None));
    let chooser = DirectoryTitleChooser;

    Orchestrator::new(&toolkit, &chooser)
        .run(&fx.options())
        .await
        .unwrap();

    assert_eq!(tokio::fs::read(fx.output()).await.unwrap(), b"encoded");
    assert!(!fx.partial().exists());
}

#[tokio::test]
async fn test_interrupt_cleans_up_workspace_and_output() {
    let fx = Fixture::new(&["a.mp3", "b.mp3"]).await;
    let toolkit = FakeToolkit::new(EncodeBehavior::Hang)
        .with_file("a.mp3", mp3(Some(1_000), None))
        .with_file("b.mp3", mp3(Some(1_000), None));
    let chooser = DirectoryTitleChooser;

    let options = fx.options();
    let err = Orchestrator::new(&toolkit, &chooser)
        .run_until(&options, toolkit.encode_started.notified())
        .await
        .unwrap_err();

    assert!(matches!(err, AudiobookError::Interrupted));
    assert_eq!(err.exit_code(), 130);
    assert!(!fx.output().exists());
    assert!(!fx.partial().exists());
    let request = toolkit.last_request().unwrap();
    assert!(!request.workspace.exists());
}

#[tokio::test]
async fn test_interrupt_keeps_existing_output() {
    let fx = Fixture::new(&["a.mp3"]).await;
    tokio::fs::write(fx.output(), b"previous audiobook").await.unwrap();
    let toolkit =
        FakeToolkit::new(EncodeBehavior::Hang).with_file("a.mp3", mp3(Some(1_000), None));
    let chooser = DirectoryTitleChooser;

    let options = fx.options();
    let err = Orchestrator::new(&toolkit, &chooser)
        .run_until(&options, toolkit.encode_started.notified())
        .await
        .unwrap_err();

    assert!(matches!(err, AudiobookError::Interrupted));
    assert_eq!(
        tokio::fs::read(fx.output()).await.unwrap(),
        b"previous audiobook"
    );
    assert!(!fx.partial().exists());
}

/// Waits on a user who never answers
struct SilentChooser {
    asked: Notify,
}

#[async_trait]
impl TitleChooser for SilentChooser {
    async fn choose(&self, _candidates: &[TitleCandidate]) -> Option<usize> {
        self.asked.notify_one();
        std::future::pending::<()>().await;
        None
    }
}

#[tokio::test]
async fn test_interrupt_while_choosing_title() {
    let fx = Fixture::new(&["a.mp3"]).await;
    let mut info = mp3(Some(1_000), None);
    info.tags.album = Some("Dune".to_string());
    let toolkit = FakeToolkit::new(EncodeBehavior::Succeed).with_file("a.mp3", info);
    let chooser = SilentChooser {
        asked: Notify::new(),
    };
    let options = MergeOptions::new(fx.input.path(), fx.output());

    let err = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        Orchestrator::new(&toolkit, &chooser).run_until(&options, chooser.asked.notified()),
    )
    .await
    .expect("shutdown must win while the chooser is waiting")
    .unwrap_err();

    assert!(matches!(err, AudiobookError::Interrupted));
    assert!(toolkit.last_request().is_none());
    assert!(!fx.output().exists());
}

#[tokio::test]
async fn test_invalid_output_extension() {
    let fx = Fixture::new(&["a.mp3"]).await;
    let toolkit =
        FakeToolkit::new(EncodeBehavior::Succeed).with_file("a.mp3", mp3(Some(1_000), None));
    let chooser = DirectoryTitleChooser;
    let options = MergeOptions::new(fx.input.path(), fx.out.path().join("book.mp3"));

    let err = Orchestrator::new(&toolkit, &chooser)
        .run(&options)
        .await
        .unwrap_err();
    assert!(matches!(err, AudiobookError::InvalidPath(_)));
}

#[tokio::test]
async fn test_directory_name_used_without_override() {
    let fx = Fixture::new(&["a.mp3"]).await;
    let mut info = mp3(Some(1_000), None);
    info.tags.album = Some("Dune".to_string());
    let toolkit = FakeToolkit::new(EncodeBehavior::Succeed).with_file("a.mp3", info);
    let chooser = DirectoryTitleChooser;
    let options = MergeOptions::new(fx.input.path(), fx.output()).dry_run(true);

    let report = Orchestrator::new(&toolkit, &chooser).run(&options).await.unwrap();

    let dir_name = fx.input.path().file_name().unwrap().to_string_lossy().into_owned();
    assert_eq!(report.metadata.title, dir_name);
}
