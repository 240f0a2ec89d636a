pub mod srt;

pub use srt::{format_entries, parse_entries};

use std::time::Duration;

use crate::transcribe::TranscriptSegment;

/// One numbered caption, the serialization unit of a subtitle file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    pub index: usize,
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

/// Number transcript segments into subtitle entries, preserving order.
pub fn entries_from_segments(segments: &[TranscriptSegment]) -> Vec<SubtitleEntry> {
    segments
        .iter()
        .enumerate()
        .map(|(i, seg)| SubtitleEntry {
            index: i + 1,
            start: seg.start,
            end: seg.end,
            text: seg.text.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_from_segments_numbers_from_one() {
        let segments = vec![
            TranscriptSegment {
                start: Duration::from_secs(0),
                end: Duration::from_secs(2),
                text: "First.".to_string(),
            },
            TranscriptSegment {
                start: Duration::from_secs(3),
                end: Duration::from_secs(5),
                text: "Second.".to_string(),
            },
        ];

        let entries = entries_from_segments(&segments);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].index, 1);
        assert_eq!(entries[1].index, 2);
        assert_eq!(entries[1].text, "Second.");
    }
}
