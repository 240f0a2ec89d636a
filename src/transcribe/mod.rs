pub mod whisper;

pub use whisper::WhisperCli;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::artifacts::{ArtifactKind, ArtifactTracker};
use crate::error::Result;
use crate::subtitle;

/// One timed text segment of a transcription result.
#[derive(Debug, Clone)]
pub struct TranscriptSegment {
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

/// Structured result of one transcription call.
#[derive(Debug, Clone)]
pub struct Transcript {
    pub segments: Vec<TranscriptSegment>,
    pub language: Option<String>,
}

/// A subtitle file produced for one requested language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleResult {
    pub path: PathBuf,
    pub language: String,
}

/// The speech-to-text service. A single shared, stateful resource: only one
/// `transcribe` call may be in flight at a time.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Warm-up and availability check. Has no data dependency on the audio,
    /// so the pipeline may run it while audio extraction is still going.
    async fn prepare(&self) -> Result<()>;

    /// Transcribe the audio file into the given language.
    async fn transcribe(&self, audio: &Path, language: &str) -> Result<Transcript>;

    fn name(&self) -> &'static str;
}

/// Produces one subtitle artifact per requested language, in request order.
///
/// Languages are processed strictly sequentially. A failure on any language
/// aborts the stage: the muxing step downstream expects one track per
/// requested language, so a partial result is not a success.
pub struct TranscriptionStage<'a> {
    transcriber: &'a dyn Transcriber,
    base: &'a Path,
}

impl<'a> TranscriptionStage<'a> {
    /// `base` is the subtitle path prefix; language `xx` lands at
    /// `<base>_xx.srt`.
    pub fn new(transcriber: &'a dyn Transcriber, base: &'a Path) -> Self {
        Self { transcriber, base }
    }

    pub async fn run<F>(
        &self,
        audio: &Path,
        languages: &[String],
        tracker: &mut ArtifactTracker,
        mut on_language: F,
    ) -> Result<Vec<SubtitleResult>>
    where
        F: FnMut(usize, usize, &str),
    {
        let total = languages.len();
        let mut results = Vec::with_capacity(total);

        for (i, language) in languages.iter().enumerate() {
            on_language(i + 1, total, language);
            info!(
                "Transcribing {} ({}/{}) with {}",
                language,
                i + 1,
                total,
                self.transcriber.name()
            );

            let srt_path = self.subtitle_path(language);
            tracker.register(&srt_path, ArtifactKind::Subtitle);

            let transcript = self.transcriber.transcribe(audio, language).await?;
            debug!(
                "{} returned {} segments for {}",
                self.transcriber.name(),
                transcript.segments.len(),
                language
            );

            let entries = subtitle::entries_from_segments(&transcript.segments);
            fs::write(&srt_path, subtitle::format_entries(&entries))?;

            results.push(SubtitleResult {
                path: srt_path,
                language: language.clone(),
            });
        }

        Ok(results)
    }

    fn subtitle_path(&self, language: &str) -> PathBuf {
        PathBuf::from(format!("{}_{}.srt", self.base.display(), language))
    }
}
