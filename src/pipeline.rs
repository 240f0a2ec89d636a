use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::artifacts::{ArtifactHandle, ArtifactKind, ArtifactTracker};
use crate::error::{Result, SubmuxError};
use crate::media::MediaEngine;
use crate::transcribe::{Transcriber, TranscriptionStage};

const AUDIO_FILE: &str = "temp_audio.mp3";
const SUBTITLE_BASE: &str = "temp_subs";
const CONTAINER_FILE: &str = "temp_output.mkv";

/// One video-to-subtitled-container run. Immutable once the run starts.
#[derive(Debug, Clone)]
pub struct Job {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub model: String,
    pub languages: Vec<String>,
    pub replace: bool,
}

impl Job {
    /// Build a job, collapsing duplicate language codes (first occurrence
    /// wins, order preserved).
    pub fn new(
        input: PathBuf,
        output: Option<PathBuf>,
        model: String,
        languages: Vec<String>,
        replace: bool,
    ) -> Result<Self> {
        let mut deduped: Vec<String> = Vec::with_capacity(languages.len());
        for language in languages {
            let language = language.trim().to_string();
            if language.is_empty() {
                continue;
            }
            if deduped.contains(&language) {
                warn!("Ignoring duplicate language code '{}'", language);
            } else {
                deduped.push(language);
            }
        }

        if deduped.is_empty() {
            return Err(SubmuxError::Validation(
                "at least one language code is required".to_string(),
            ));
        }

        Ok(Self {
            input,
            output,
            model,
            languages: deduped,
            replace,
        })
    }

    fn validate(&self) -> Result<()> {
        if self.languages.is_empty() {
            return Err(SubmuxError::Validation(
                "at least one language code is required".to_string(),
            ));
        }
        if !self.input.exists() {
            return Err(SubmuxError::FileNotFound(self.input.display().to_string()));
        }
        Ok(())
    }
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ExtractingAudio,
    Transcribing,
    Muxing,
    Replacing,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::ExtractingAudio => write!(f, "audio extraction"),
            Stage::Transcribing => write!(f, "transcription"),
            Stage::Muxing => write!(f, "muxing"),
            Stage::Replacing => write!(f, "replacement"),
        }
    }
}

/// Progress notifications delivered to the presentation layer. The pipeline
/// never touches the console itself.
#[derive(Debug, Clone)]
pub enum StatusEvent {
    StageStarted {
        stage: Stage,
    },
    StageFinished {
        stage: Stage,
        elapsed: Duration,
    },
    /// Running timestamp parsed from the extraction tool's progress markers.
    ExtractionProgress {
        timestamp: String,
    },
    LanguageStarted {
        language: String,
        index: usize,
        total: usize,
    },
}

pub type StatusCallback = Box<dyn Fn(StatusEvent) + Send + Sync>;

/// Per-stage wall-clock timings for one run.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub total_time: Duration,
    pub extraction_time: Duration,
    pub transcription_time: Duration,
    pub muxing_time: Duration,
    pub languages: usize,
}

/// Result of a completed run.
#[derive(Debug)]
pub struct PipelineReport {
    /// Where the subtitled container ended up: the input path when the
    /// original was replaced, the container path otherwise.
    pub output_path: PathBuf,
    pub replaced: bool,
    pub stats: PipelineStats,
}

/// Sequences extraction, transcription, muxing and optional in-place
/// replacement. Owns the artifact set for the run and releases it on every
/// exit path.
pub struct Pipeline {
    media: Box<dyn MediaEngine>,
    transcriber: Box<dyn Transcriber>,
    status: Option<StatusCallback>,
    work_dir: PathBuf,
}

impl Pipeline {
    pub fn new(media: Box<dyn MediaEngine>, transcriber: Box<dyn Transcriber>) -> Self {
        Self {
            media,
            transcriber,
            status: None,
            work_dir: PathBuf::from("."),
        }
    }

    /// Receive status events during the run.
    pub fn with_status(mut self, callback: StatusCallback) -> Self {
        self.status = Some(callback);
        self
    }

    /// Directory for the temporary audio, subtitle and container files.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    /// Run the job to completion. Temporary artifacts are removed before
    /// this returns, on success and on failure alike.
    pub async fn run(&self, job: &Job) -> Result<PipelineReport> {
        job.validate()?;
        self.media.check_availability()?;

        let mut tracker = ArtifactTracker::new();
        let result = self.run_stages(job, &mut tracker).await;
        tracker.release_all();
        result
    }

    async fn run_stages(
        &self,
        job: &Job,
        tracker: &mut ArtifactTracker,
    ) -> Result<PipelineReport> {
        let run_start = Instant::now();
        let mut stats = PipelineStats {
            languages: job.languages.len(),
            ..PipelineStats::default()
        };

        info!("Starting processing for {}", job.input.display());

        // Extraction, overlapped with transcriber warm-up: the only pair of
        // steps with no data dependency.
        self.emit(StatusEvent::StageStarted {
            stage: Stage::ExtractingAudio,
        });
        let stage_start = Instant::now();

        let audio_path = self.work_dir.join(AUDIO_FILE);
        tracker.register(&audio_path, ArtifactKind::Audio);

        let mut on_progress = |timestamp: &str| {
            self.emit(StatusEvent::ExtractionProgress {
                timestamp: timestamp.to_string(),
            });
        };
        let (extracted, prepared) = tokio::join!(
            self.media
                .extract_audio(&job.input, &audio_path, &mut on_progress),
            self.transcriber.prepare(),
        );
        extracted?;
        prepared?;

        stats.extraction_time = stage_start.elapsed();
        self.emit(StatusEvent::StageFinished {
            stage: Stage::ExtractingAudio,
            elapsed: stats.extraction_time,
        });

        // Transcription, one subtitle artifact per language.
        self.emit(StatusEvent::StageStarted {
            stage: Stage::Transcribing,
        });
        let stage_start = Instant::now();

        let subtitle_base = self.work_dir.join(SUBTITLE_BASE);
        let stage = TranscriptionStage::new(self.transcriber.as_ref(), &subtitle_base);
        let subtitles = stage
            .run(&audio_path, &job.languages, tracker, |index, total, language| {
                self.emit(StatusEvent::LanguageStarted {
                    language: language.to_string(),
                    index,
                    total,
                });
            })
            .await?;

        stats.transcription_time = stage_start.elapsed();
        self.emit(StatusEvent::StageFinished {
            stage: Stage::Transcribing,
            elapsed: stats.transcription_time,
        });

        // Muxing. The container is a temporary artifact only when it will be
        // renamed onto the input afterwards; otherwise it is the delivered
        // output and must survive cleanup.
        self.emit(StatusEvent::StageStarted {
            stage: Stage::Muxing,
        });
        let stage_start = Instant::now();

        let container = self.container_path(job);
        let container_handle = job
            .replace
            .then(|| tracker.register(&container, ArtifactKind::Container));

        self.media
            .mux_subtitles(&job.input, &subtitles, &container)
            .await?;

        stats.muxing_time = stage_start.elapsed();
        self.emit(StatusEvent::StageFinished {
            stage: Stage::Muxing,
            elapsed: stats.muxing_time,
        });

        let output_path = if job.replace {
            self.emit(StatusEvent::StageStarted {
                stage: Stage::Replacing,
            });
            let stage_start = Instant::now();

            self.replace_original(job, &container, container_handle, tracker)?;

            self.emit(StatusEvent::StageFinished {
                stage: Stage::Replacing,
                elapsed: stage_start.elapsed(),
            });
            job.input.clone()
        } else {
            container
        };

        stats.total_time = run_start.elapsed();
        info!(
            "Processing completed in {:.1}s, final file: {}",
            stats.total_time.as_secs_f64(),
            output_path.display()
        );

        Ok(PipelineReport {
            output_path,
            replaced: job.replace,
            stats,
        })
    }

    /// Swap the muxed container into the input's place: delete the original,
    /// then rename. If the rename fails the original is already gone; no
    /// rollback is attempted. The container is preserved on disk so its
    /// content can be recovered manually.
    fn replace_original(
        &self,
        job: &Job,
        container: &Path,
        container_handle: Option<ArtifactHandle>,
        tracker: &mut ArtifactTracker,
    ) -> Result<()> {
        info!("Replacing original file {}", job.input.display());

        fs::remove_file(&job.input).map_err(|e| {
            SubmuxError::Replacement(format!(
                "could not delete original {}: {e}",
                job.input.display()
            ))
        })?;

        if let Err(e) = fs::rename(container, &job.input) {
            if let Some(handle) = container_handle {
                tracker.keep(handle);
            }
            return Err(SubmuxError::Replacement(format!(
                "original {} was deleted but moving the new container into place failed: {e}. \
                 The muxed container remains at {} for manual recovery",
                job.input.display(),
                container.display()
            )));
        }

        Ok(())
    }

    fn container_path(&self, job: &Job) -> PathBuf {
        job.output
            .clone()
            .unwrap_or_else(|| self.work_dir.join(CONTAINER_FILE))
    }

    fn emit(&self, event: StatusEvent) {
        if let Some(callback) = &self.status {
            callback(event);
        }
    }
}
