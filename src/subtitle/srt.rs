// SRT subtitle format
use std::time::Duration;

use crate::error::{Result, SubmuxError};

use super::SubtitleEntry;

/// Serialize entries into SRT: sequential index, timestamp pair, caption
/// text, blank-line separated.
pub fn format_entries(entries: &[SubtitleEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            format!(
                "{}\n{} --> {}\n{}\n",
                entry.index,
                format_timestamp(entry.start),
                format_timestamp(entry.end),
                entry.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse SRT text back into entries.
pub fn parse_entries(content: &str) -> Result<Vec<SubtitleEntry>> {
    let mut entries = Vec::new();

    for block in content.split("\n\n") {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }

        let mut lines = block.lines();
        let index_line = lines
            .next()
            .ok_or_else(|| malformed("missing index line"))?;
        let index: usize = index_line
            .trim()
            .parse()
            .map_err(|_| malformed(&format!("invalid index '{index_line}'")))?;

        let timing_line = lines
            .next()
            .ok_or_else(|| malformed("missing timestamp line"))?;
        let (start_str, end_str) = timing_line
            .split_once(" --> ")
            .ok_or_else(|| malformed(&format!("invalid timestamp line '{timing_line}'")))?;
        let start = parse_timestamp(start_str.trim())?;
        let end = parse_timestamp(end_str.trim())?;

        let text = lines.collect::<Vec<_>>().join("\n");

        entries.push(SubtitleEntry {
            index,
            start,
            end,
            text,
        });
    }

    Ok(entries)
}

fn format_timestamp(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let millis = d.subsec_millis();
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

fn parse_timestamp(s: &str) -> Result<Duration> {
    let (clock, millis) = s
        .split_once(',')
        .ok_or_else(|| malformed(&format!("invalid timestamp '{s}'")))?;

    let mut parts = clock.splitn(3, ':');
    let hours = next_field(&mut parts, s)?;
    let minutes = next_field(&mut parts, s)?;
    let seconds = next_field(&mut parts, s)?;
    let millis: u64 = millis
        .parse()
        .map_err(|_| malformed(&format!("invalid timestamp '{s}'")))?;

    Ok(Duration::from_millis(
        ((hours * 60 + minutes) * 60 + seconds) * 1000 + millis,
    ))
}

fn next_field(parts: &mut std::str::SplitN<'_, char>, original: &str) -> Result<u64> {
    parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| malformed(&format!("invalid timestamp '{original}'")))
}

fn malformed(detail: &str) -> SubmuxError {
    SubmuxError::Transcription(format!("malformed SRT: {detail}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entries() -> Vec<SubtitleEntry> {
        vec![
            SubtitleEntry {
                index: 1,
                start: Duration::from_millis(1500),
                end: Duration::from_millis(4000),
                text: "Hello, world!".to_string(),
            },
            SubtitleEntry {
                index: 2,
                start: Duration::from_millis(4500),
                end: Duration::from_millis(7000),
                text: "This is a test.".to_string(),
            },
        ]
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp(Duration::from_millis(1500)),
            "00:00:01,500"
        );
        assert_eq!(
            format_timestamp(Duration::from_secs(3661) + Duration::from_millis(123)),
            "01:01:01,123"
        );
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(
            parse_timestamp("00:00:01,500").unwrap(),
            Duration::from_millis(1500)
        );
        assert_eq!(
            parse_timestamp("01:01:01,123").unwrap(),
            Duration::from_secs(3661) + Duration::from_millis(123)
        );
        assert!(parse_timestamp("not a timestamp").is_err());
    }

    #[test]
    fn test_srt_format() {
        let output = format_entries(&sample_entries());

        assert!(output.contains("1\n00:00:01,500 --> 00:00:04,000\nHello, world!"));
        assert!(output.contains("2\n00:00:04,500 --> 00:00:07,000\nThis is a test."));
    }

    #[test]
    fn test_round_trip_preserves_segments() {
        let entries = sample_entries();
        let parsed = parse_entries(&format_entries(&entries)).unwrap();
        assert_eq!(parsed, entries);
    }

    #[test]
    fn test_round_trip_multiline_text() {
        let entries = vec![SubtitleEntry {
            index: 1,
            start: Duration::from_secs(0),
            end: Duration::from_secs(5),
            text: "Line one.\nLine two.".to_string(),
        }];

        let parsed = parse_entries(&format_entries(&entries)).unwrap();
        assert_eq!(parsed, entries);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_entries("1\nnot a timestamp\ntext").is_err());
    }
}
