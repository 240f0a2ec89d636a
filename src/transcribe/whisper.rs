use std::fs;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, SubmuxError};
use crate::process;
use crate::transcribe::{Transcriber, Transcript, TranscriptSegment};

/// Transcriber backed by the `whisper` command-line tool.
///
/// Each call shells out once, asks for JSON output into a scratch directory,
/// and maps the parsed result into a [`Transcript`].
pub struct WhisperCli {
    binary: String,
    model: String,
}

impl WhisperCli {
    pub fn new(binary: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            model: model.into(),
        }
    }

    fn parse_output(output: WhisperOutput) -> Transcript {
        let segments = output
            .segments
            .into_iter()
            .map(|seg| TranscriptSegment {
                start: Duration::from_secs_f64(seg.start.max(0.0)),
                end: Duration::from_secs_f64(seg.end.max(0.0)),
                text: seg.text.trim().to_string(),
            })
            .collect();

        Transcript {
            segments,
            language: output.language,
        }
    }
}

#[async_trait]
impl Transcriber for WhisperCli {
    async fn prepare(&self) -> Result<()> {
        let outcome = process::run(&self.binary, &["--help".to_string()], |_| {})
            .await
            .map_err(|e| {
                SubmuxError::Transcription(format!(
                    "whisper CLI not available ({e}). Install openai-whisper and ensure '{}' is on your PATH",
                    self.binary
                ))
            })?;

        if !outcome.success() {
            return Err(SubmuxError::Transcription(format!(
                "whisper CLI check failed: {}",
                outcome.stderr.trim()
            )));
        }

        debug!("whisper CLI is available, model '{}'", self.model);
        Ok(())
    }

    async fn transcribe(&self, audio: &Path, language: &str) -> Result<Transcript> {
        let scratch = tempfile::tempdir()?;

        let args = vec![
            audio.display().to_string(),
            "--model".to_string(),
            self.model.clone(),
            "--language".to_string(),
            language.to_string(),
            "--task".to_string(),
            "transcribe".to_string(),
            "--output_format".to_string(),
            "json".to_string(),
            "--output_dir".to_string(),
            scratch.path().display().to_string(),
            "--verbose".to_string(),
            "False".to_string(),
        ];

        let outcome = process::run(&self.binary, &args, |line| debug!("whisper: {}", line)).await?;
        if !outcome.success() {
            return Err(SubmuxError::Transcription(format!(
                "whisper exited with status {}: {}",
                outcome
                    .code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                outcome.stderr.trim()
            )));
        }

        let stem = audio
            .file_stem()
            .ok_or_else(|| SubmuxError::Transcription("invalid audio filename".to_string()))?;
        let json_path = scratch
            .path()
            .join(format!("{}.json", stem.to_string_lossy()));

        let content = fs::read_to_string(&json_path).map_err(|e| {
            SubmuxError::Transcription(format!(
                "whisper produced no readable output at {}: {e}",
                json_path.display()
            ))
        })?;
        let output: WhisperOutput = serde_json::from_str(&content)
            .map_err(|e| SubmuxError::Transcription(format!("failed to parse whisper JSON: {e}")))?;

        Ok(Self::parse_output(output))
    }

    fn name(&self) -> &'static str {
        "whisper"
    }
}

// CLI JSON output types

#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    segments: Vec<WhisperSegment>,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_output_maps_segments() {
        let output = WhisperOutput {
            segments: vec![
                WhisperSegment {
                    start: 0.0,
                    end: 2.0,
                    text: " Hello world. ".to_string(),
                },
                WhisperSegment {
                    start: 2.5,
                    end: 4.0,
                    text: "How are you?".to_string(),
                },
            ],
            language: Some("en".to_string()),
        };

        let transcript = WhisperCli::parse_output(output);
        assert_eq!(transcript.segments.len(), 2);
        assert_eq!(transcript.segments[0].text, "Hello world.");
        assert_eq!(transcript.segments[1].start, Duration::from_millis(2500));
        assert_eq!(transcript.language.as_deref(), Some("en"));
    }

    #[test]
    fn test_parse_output_clamps_negative_timestamps() {
        let output = WhisperOutput {
            segments: vec![WhisperSegment {
                start: -0.2,
                end: 1.0,
                text: "Hi".to_string(),
            }],
            language: None,
        };

        let transcript = WhisperCli::parse_output(output);
        assert_eq!(transcript.segments[0].start, Duration::ZERO);
    }

    #[test]
    fn test_whisper_json_deserializes() {
        let json = r#"{
            "text": "Hello world.",
            "segments": [
                {"id": 0, "start": 0.0, "end": 2.0, "text": " Hello world.", "temperature": 0.0}
            ],
            "language": "en"
        }"#;

        let output: WhisperOutput = serde_json::from_str(json).unwrap();
        assert_eq!(output.segments.len(), 1);
        assert_eq!(output.language.as_deref(), Some("en"));
    }
}
