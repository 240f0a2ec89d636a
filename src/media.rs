use std::path::Path;
use std::process::Command;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info};

use crate::error::{Result, SubmuxError};
use crate::process;
use crate::transcribe::SubtitleResult;

/// The external transcoding/muxing engine, behind a trait so the pipeline
/// can be exercised without ffmpeg installed.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Verify the external tool is installed and runnable.
    fn check_availability(&self) -> Result<()>;

    /// Demux the audio stream of `input` into a compressed audio file at
    /// `output`, overwriting any existing file. `on_progress` receives the
    /// running timestamp parsed from the tool's periodic progress markers.
    async fn extract_audio(
        &self,
        input: &Path,
        output: &Path,
        on_progress: &mut (dyn FnMut(&str) + Send),
    ) -> Result<()>;

    /// Remux `input` plus one subtitle stream per entry of `subtitles` into
    /// `output`. Video and audio streams are copied unmodified; each
    /// subtitle track is tagged with its language code, in the supplied
    /// order, with the default disposition disabled.
    async fn mux_subtitles(
        &self,
        input: &Path,
        subtitles: &[SubtitleResult],
        output: &Path,
    ) -> Result<()>;
}

/// [`MediaEngine`] implementation invoking the ffmpeg CLI.
pub struct FfmpegEngine {
    binary: String,
}

impl FfmpegEngine {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn extraction_args(input: &Path, output: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-i".to_string(),
            input.display().to_string(),
            "-q:a".to_string(),
            "0".to_string(),
            "-map".to_string(),
            "a".to_string(),
            "-threads".to_string(),
            "4".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-stats".to_string(),
            output.display().to_string(),
        ]
    }

    fn mux_args(input: &Path, subtitles: &[SubtitleResult], output: &Path) -> Vec<String> {
        let mut args = vec!["-y".to_string(), "-i".to_string(), input.display().to_string()];

        for subtitle in subtitles {
            args.push("-i".to_string());
            args.push(subtitle.path.display().to_string());
        }

        args.push("-map".to_string());
        args.push("0:v".to_string());
        args.push("-map".to_string());
        args.push("0:a".to_string());

        for i in 0..subtitles.len() {
            args.push("-map".to_string());
            args.push(format!("{}:0", i + 1));
        }

        args.extend(
            [
                "-c:v", "copy", "-c:a", "copy", "-c:s", "srt", "-disposition:s", "0",
                "-hide_banner", "-loglevel", "error", "-stats",
            ]
            .iter()
            .map(|s| s.to_string()),
        );

        for (i, subtitle) in subtitles.iter().enumerate() {
            args.push(format!("-metadata:s:s:{i}"));
            args.push(format!("language={}", subtitle.language));
        }

        args.push(output.display().to_string());
        args
    }
}

#[async_trait]
impl MediaEngine for FfmpegEngine {
    fn check_availability(&self) -> Result<()> {
        let output = Command::new(&self.binary)
            .arg("-version")
            .output()
            .map_err(|e| {
                SubmuxError::Config(format!(
                    "FFmpeg not found ('{}'). Please install FFmpeg and ensure it's in your PATH. Error: {e}",
                    self.binary
                ))
            })?;

        if !output.status.success() {
            return Err(SubmuxError::Config("FFmpeg check failed".to_string()));
        }

        debug!("FFmpeg is available");
        Ok(())
    }

    async fn extract_audio(
        &self,
        input: &Path,
        output: &Path,
        on_progress: &mut (dyn FnMut(&str) + Send),
    ) -> Result<()> {
        info!(
            "Extracting audio from {} to {}",
            input.display(),
            output.display()
        );

        let time_re = Regex::new(r"time=(\S+)").expect("Invalid regex");
        let args = Self::extraction_args(input, output);

        let outcome = process::run(&self.binary, &args, |line| {
            if let Some(cap) = time_re.captures(line) {
                on_progress(&cap[1]);
            }
        })
        .await?;
        outcome.check()?;

        info!("Audio extraction completed");
        Ok(())
    }

    async fn mux_subtitles(
        &self,
        input: &Path,
        subtitles: &[SubtitleResult],
        output: &Path,
    ) -> Result<()> {
        info!(
            "Muxing {} subtitle track(s) into {}",
            subtitles.len(),
            output.display()
        );

        let args = Self::mux_args(input, subtitles, output);
        let outcome = process::run(&self.binary, &args, |line| debug!("ffmpeg: {}", line)).await?;
        outcome.check()?;

        info!("Container created at {}", output.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_extraction_args_follow_contract() {
        let args = FfmpegEngine::extraction_args(Path::new("movie.mp4"), Path::new("temp_audio.mp3"));
        assert_eq!(
            args,
            vec![
                "-y",
                "-i",
                "movie.mp4",
                "-q:a",
                "0",
                "-map",
                "a",
                "-threads",
                "4",
                "-hide_banner",
                "-loglevel",
                "error",
                "-stats",
                "temp_audio.mp3",
            ]
        );
    }

    #[test]
    fn test_mux_args_tag_languages_in_order() {
        let subtitles = vec![
            SubtitleResult {
                path: PathBuf::from("temp_subs_en.srt"),
                language: "en".to_string(),
            },
            SubtitleResult {
                path: PathBuf::from("temp_subs_fr.srt"),
                language: "fr".to_string(),
            },
        ];
        let args =
            FfmpegEngine::mux_args(Path::new("movie.mp4"), &subtitles, Path::new("out.mkv"));

        let joined = args.join(" ");
        assert!(joined.starts_with("-y -i movie.mp4 -i temp_subs_en.srt -i temp_subs_fr.srt"));
        assert!(joined.contains("-map 0:v -map 0:a -map 1:0 -map 2:0"));
        assert!(joined.contains("-c:v copy -c:a copy -c:s srt -disposition:s 0"));
        assert!(joined.contains("-metadata:s:s:0 language=en"));
        assert!(joined.contains("-metadata:s:s:1 language=fr"));
        assert_eq!(args.last().map(String::as_str), Some("out.mkv"));

        let en_pos = joined.find("language=en").unwrap();
        let fr_pos = joined.find("language=fr").unwrap();
        assert!(en_pos < fr_pos);
    }

    #[test]
    fn test_time_marker_regex() {
        let time_re = Regex::new(r"time=(\S+)").expect("Invalid regex");
        let line = "size=    1024KiB time=00:01:23.45 bitrate= 128.0kbits/s speed=30x";
        let cap = time_re.captures(line).unwrap();
        assert_eq!(&cap[1], "00:01:23.45");
    }
}
