use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use submux::config::Config;
use submux::media::FfmpegEngine;
use submux::pipeline::{Job, Pipeline, PipelineReport, Stage, StatusCallback, StatusEvent};
use submux::transcribe::WhisperCli;

#[derive(Parser)]
#[command(name = "submux")]
#[command(version, about = "Multi-language subtitle generation and muxing")]
#[command(
    long_about = "Extract audio from a video, transcribe it once per requested language with Whisper, and mux the subtitle tracks back into the container."
)]
struct Cli {
    /// Input video file
    input: PathBuf,

    /// Output container path (defaults to temp_output.mkv)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Whisper model name (defaults to config, then "base")
    #[arg(short, long)]
    model: Option<String>,

    /// Comma-separated language codes (defaults to config, then "en")
    #[arg(short, long)]
    langs: Option<String>,

    /// Replace the original file with the muxed result
    #[arg(short, long)]
    replace: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn stage_message(stage: Stage) -> String {
    match stage {
        Stage::ExtractingAudio => "Extracting audio...".to_string(),
        Stage::Transcribing => "Transcribing...".to_string(),
        Stage::Muxing => "Muxing subtitles into container...".to_string(),
        Stage::Replacing => "Replacing original file...".to_string(),
    }
}

type SharedSpinner = Arc<Mutex<Option<ProgressBar>>>;

/// Render pipeline status events as a per-stage spinner.
fn make_status(spinner: SharedSpinner) -> StatusCallback {
    Box::new(move |event| {
        let Ok(mut current) = spinner.lock() else {
            return;
        };
        match event {
            StatusEvent::StageStarted { stage } => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner:.green} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                pb.set_message(stage_message(stage));
                pb.enable_steady_tick(Duration::from_millis(100));
                *current = Some(pb);
            }
            StatusEvent::StageFinished { stage, elapsed } => {
                if let Some(pb) = current.take() {
                    pb.finish_with_message(format!(
                        "✓ {} completed in {:.1}s",
                        stage,
                        elapsed.as_secs_f64()
                    ));
                }
            }
            StatusEvent::ExtractionProgress { timestamp } => {
                if let Some(pb) = current.as_ref() {
                    pb.set_message(format!("Extracting audio... time={timestamp}"));
                }
            }
            StatusEvent::LanguageStarted {
                language,
                index,
                total,
            } => {
                if let Some(pb) = current.as_ref() {
                    pb.set_message(format!("Transcribing {language} ({index}/{total})..."));
                }
            }
        }
    })
}

fn print_summary(report: &PipelineReport) {
    let stats = &report.stats;
    println!();
    println!("{}", style("Processing complete").green().bold());
    println!("  Final file:  {}", report.output_path.display());
    println!("  Languages:   {}", stats.languages);
    println!("  Timing:");
    println!("    Extract:    {:.2}s", stats.extraction_time.as_secs_f64());
    println!(
        "    Transcribe: {:.2}s",
        stats.transcription_time.as_secs_f64()
    );
    println!("    Mux:        {:.2}s", stats.muxing_time.as_secs_f64());
    println!("    Total:      {:.2}s", stats.total_time.as_secs_f64());
    if report.replaced {
        println!();
        println!("{}", style("Original file replaced successfully").green());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let config = Config::load().context("Failed to load configuration")?;

    let model = cli.model.unwrap_or_else(|| config.default_model.clone());
    let langs = cli.langs.unwrap_or_else(|| config.default_langs.clone());
    let languages: Vec<String> = langs.split(',').map(str::to_string).collect();

    let job = Job::new(cli.input, cli.output, model, languages, cli.replace)?;

    info!("Input:     {}", job.input.display());
    info!("Model:     {}", job.model);
    info!("Languages: {}", job.languages.join(", "));

    let media = FfmpegEngine::new(config.ffmpeg_path.clone());
    let transcriber = WhisperCli::new(config.whisper_path.clone(), job.model.clone());

    let spinner: SharedSpinner = Arc::new(Mutex::new(None));
    let pipeline = Pipeline::new(Box::new(media), Box::new(transcriber))
        .with_status(make_status(spinner.clone()));

    let result = pipeline.run(&job).await;

    if let Ok(mut current) = spinner.lock() {
        if let Some(pb) = current.take() {
            pb.finish_and_clear();
        }
    }

    let report = result.context("Processing failed")?;
    print_summary(&report);

    Ok(())
}
