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


use anyhow::Context;
use audiobook_creator::audio::metadata::format_timestamp;
use audiobook_creator::config::default_threads;
use audiobook_creator::{
    shutdown_signal, AudiobookError, FfmpegToolkit, MergeOptions, MergeReport, Orchestrator,
    TitleCandidate, TitleChooser, TitleOrigin,
};
use async_trait::async_trait;
use clap::Parser;
use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "audiobook-creator")]
#[command(version, about = "Merge a directory of audio files into a chaptered M4B audiobook", long_about = None)]
struct Cli {
    /// Directory containing the source audio files
    #[arg(short, long, value_name = "DIR")]
    input: PathBuf,

    /// Output .m4b file
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Tab-separated file mapping filenames to chapter titles
    #[arg(short = 'I', long, value_name = "TSV")]
    index: Option<PathBuf>,

    /// Book title (skips the title prompt)
    #[arg(short, long)]
    title: Option<String>,

    /// Encode at 16k for a fast, small preview
    #[arg(long)]
    quick: bool,

    /// Print the chapter plan and bitrate without encoding
    #[arg(long)]
    dry_run: bool,

    /// Also write a cue sheet next to the output
    #[arg(long)]
    cue: bool,

    /// Encoder threads (default: available parallelism)
    #[arg(long)]
    threads: Option<usize>,

    /// FFmpeg executable
    #[arg(long, env = "AUDIOBOOK_FFMPEG", default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// FFprobe executable
    #[arg(long, env = "AUDIOBOOK_FFPROBE", default_value = "ffprobe")]
    ffprobe: PathBuf,
}

/// Asks on the terminal; falls back to the directory name otherwise
///
/// The stdin read runs on the blocking pool so Ctrl-C still reaches the
/// shutdown race while the prompt is open.
struct PromptTitleChooser;

#[async_trait]
impl TitleChooser for PromptTitleChooser {
    async fn choose(&self, candidates: &[TitleCandidate]) -> Option<usize> {
        if !std::io::stdin().is_terminal() {
            return None;
        }

        eprintln!("\nTitle options:");
        for (i, candidate) in candidates.iter().enumerate() {
            let origin = match candidate.origin {
                TitleOrigin::Metadata => "metadata",
                TitleOrigin::Directory => "directory",
            };
            eprintln!("{}. From {}: '{}'", i + 1, origin, candidate.title);
        }
        eprint!("Choose title source (1-{}): ", candidates.len());
        let _ = std::io::stderr().flush();

        let answer = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            match std::io::stdin().lock().read_line(&mut line) {
                Ok(0) | Err(_) => None,
                Ok(_) => Some(line),
            }
        })
        .await
        .ok()
        .flatten();

        match answer {
            None => {
                eprintln!("No input provided, using directory name");
                None
            }
            Some(line) => match line.trim().parse::<usize>() {
                Ok(n) if (1..=candidates.len()).contains(&n) => Some(n - 1),
                _ => {
                    eprintln!("Invalid choice, using directory name");
                    None
                }
            },
        }
    }
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_report(report: &MergeReport) {
    let heading = if report.dry_run { "Plan" } else { "Created" };
    println!("{}: {}", heading, report.output.display());
    println!(
        "  '{}' by {} ({})",
        report.metadata.title, report.metadata.artist, report.metadata.genre
    );
    if report.bitrate.quick {
        println!("  Bitrate: {} (quick mode)", report.bitrate.ffmpeg_value());
    } else {
        println!("  Bitrate: {} AAC", report.bitrate.ffmpeg_value());
    }
    for codec in &report.bitrate.unknown_codecs {
        println!("  Warning: unknown codec '{}', assumed AAC-equivalent", codec);
    }
    println!(
        "  Duration: {}  Cover art: {}",
        format_timestamp(report.total_duration_ms()),
        if report.cover_art { "yes" } else { "no" }
    );
    println!("  Chapters:");
    for entry in &report.entries {
        println!(
            "    {:>3}. [{}] {}  ({})",
            entry.position,
            format_timestamp(entry.start_ms),
            entry.title,
            entry.source.file_name
        );
    }
    if let Some(cue) = &report.cue_sheet {
        println!("  Cue sheet: {}", cue.display());
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let threads = cli.threads.unwrap_or_else(default_threads);

    let mut options = MergeOptions::new(&cli.input, &cli.output)
        .quick(cli.quick)
        .dry_run(cli.dry_run)
        .cue_sheet(cli.cue)
        .threads(threads)
        .ffmpeg(&cli.ffmpeg)
        .ffprobe(&cli.ffprobe);
    if let Some(index) = &cli.index {
        options = options.index_file(index);
    }
    if let Some(title) = cli.title {
        options = options.title(title);
    }

    let show_progress = std::io::stderr().is_terminal();
    let toolkit = FfmpegToolkit::new(&options.ffmpeg, &options.ffprobe, options.threads)
        .with_progress(Arc::new(move |progress: f32| {
            if show_progress {
                eprint!("\rEncoding: {:>3.0}%", progress * 100.0);
                if progress >= 1.0 {
                    eprintln!();
                }
            }
        }));

    let chooser = PromptTitleChooser;
    let orchestrator = Orchestrator::new(&toolkit, &chooser);
    let report = orchestrator
        .run_until(&options, shutdown_signal())
        .await
        .with_context(|| format!("Failed to create audiobook from {}", cli.input.display()))?;

    print_report(&report);
    Ok(())
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let result = runtime.block_on(run(cli));
    // An abandoned title prompt still holds a blocking stdin read
    runtime.shutdown_timeout(Duration::from_millis(250));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<AudiobookError>() {
            Some(e) => {
                eprintln!("\nError: {}", e.user_message());
                ExitCode::from(e.exit_code() as u8)
            }
            None => {
                eprintln!("Error: {:#}", err);
                ExitCode::FAILURE
            }
        },
    }
}
