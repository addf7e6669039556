pub mod captions;
pub mod player;

use std::{fmt, future::Future, sync::LazyLock};

use regex::Regex;

use crate::{error::ValidationError, types::TranscriptSegment, Error};

pub use captions::YoutubeCaptions;

/// Recognised video reference shapes, tried in order.
static VIDEO_ID_PATTERNS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        r"youtube\.com/watch\?(?:[^#\s]*&)?v=([A-Za-z0-9_-]{11})",
        r"youtu\.be/([A-Za-z0-9_-]{11})",
        r"/embed/([A-Za-z0-9_-]{11})",
        r"^([A-Za-z0-9_-]{11})$",
    ]
    .map(|p| Regex::new(p).expect("static regex must compile"))
});

/// An 11 character YouTube video identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    /// Accepts a watch URL, a `youtu.be` short link, an embed URL or a bare id.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let input = input.trim();
        VIDEO_ID_PATTERNS
            .iter()
            .find_map(|re| re.captures(input))
            .and_then(|caps| caps.get(1))
            .map(|m| VideoId(m.as_str().to_string()))
            .ok_or_else(|| ValidationError::BadVideoId(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caption track of one video, segments in playback order.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub video_id: VideoId,
    pub title: Option<String>,
    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    /// Segment texts joined by single spaces.
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn word_count(&self) -> usize {
        self.segments
            .iter()
            .map(|s| s.text.split_whitespace().count())
            .sum()
    }

    /// End of the last cue, in seconds.
    pub fn duration(&self) -> f64 {
        self.segments
            .iter()
            .map(|s| s.start + s.duration)
            .fold(0.0, f64::max)
    }
}

pub trait CaptionSource: Send + Sync + 'static {
    /// Fetches the caption track of `video_id`.
    ///
    /// Fails with [`crate::error::NotFound::NoCaptions`] when the video is
    /// private, deleted or has captions disabled.
    fn fetch_transcript(
        &self,
        video_id: &VideoId,
    ) -> impl Future<Output = Result<Transcript, Error>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_video_id_forms() {
        let cases = [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=42",
            "https://youtu.be/dQw4w9WgXcQ?si=abc",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "  dQw4w9WgXcQ ",
        ];

        for input in cases {
            assert_eq!(VideoId::parse(input).unwrap().as_str(), "dQw4w9WgXcQ", "{input}");
        }
    }

    #[test]
    fn test_parse_video_id_rejects_garbage() {
        for input in [
            "",
            "not a url",
            "not a video",
            "https://example.com/watch?v=short",
            "dQw4w9WgXcQQ",
        ] {
            assert!(
                matches!(VideoId::parse(input), Err(ValidationError::BadVideoId(_))),
                "{input}"
            );
        }
    }

    #[test]
    fn test_transcript_flattening() {
        let transcript = Transcript {
            video_id: VideoId::parse("dQw4w9WgXcQ").unwrap(),
            title: None,
            segments: vec![
                TranscriptSegment {
                    text: "never gonna".into(),
                    start: 0.0,
                    duration: 1.5,
                },
                TranscriptSegment {
                    text: " ".into(),
                    start: 1.5,
                    duration: 0.5,
                },
                TranscriptSegment {
                    text: "give you up".into(),
                    start: 2.0,
                    duration: 2.25,
                },
            ],
        };

        assert_eq!(transcript.text(), "never gonna give you up");
        assert_eq!(transcript.word_count(), 5);
        assert_eq!(transcript.duration(), 4.25);
    }
}
