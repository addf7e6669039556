use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{ser::SerializeMap, Serialize, Serializer};

use crate::error::ValidationError;

/// Output style requested for a summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStyle {
    #[default]
    General,
    Brief,
    BulletPoints,
    Detailed,
}

impl SummaryStyle {
    pub const EXPECTED: &'static str = "general, brief, bullet_points, detailed";

    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryStyle::General => "general",
            SummaryStyle::Brief => "brief",
            SummaryStyle::BulletPoints => "bullet_points",
            SummaryStyle::Detailed => "detailed",
        }
    }

    /// Parses an optional wire value, treating absent or blank as `General`.
    pub fn parse_optional(value: Option<&str>) -> Result<Self, ValidationError> {
        match value.map(str::trim) {
            None | Some("") => Ok(SummaryStyle::default()),
            Some(v) => v.parse(),
        }
    }
}

impl FromStr for SummaryStyle {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(SummaryStyle::General),
            "brief" => Ok(SummaryStyle::Brief),
            "bullet_points" | "bulletPoints" | "bullet-points" => Ok(SummaryStyle::BulletPoints),
            "detailed" => Ok(SummaryStyle::Detailed),
            other => Err(ValidationError::UnknownVariant {
                field: "summary type",
                value: other.to_string(),
                expected: Self::EXPECTED,
            }),
        }
    }
}

impl fmt::Display for SummaryStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the note assistant should do with the caller's prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteAction {
    #[default]
    Generate,
    Expand,
    Summarize,
}

impl NoteAction {
    pub const EXPECTED: &'static str = "generate, expand, summarize";

    pub fn parse_optional(value: Option<&str>) -> Result<Self, ValidationError> {
        match value.map(str::trim) {
            None | Some("") => Ok(NoteAction::default()),
            Some(v) => v.parse(),
        }
    }
}

impl FromStr for NoteAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generate" => Ok(NoteAction::Generate),
            "expand" => Ok(NoteAction::Expand),
            "summarize" => Ok(NoteAction::Summarize),
            other => Err(ValidationError::UnknownVariant {
                field: "action",
                value: other.to_string(),
                expected: Self::EXPECTED,
            }),
        }
    }
}

/// Main text isolated from an HTML page.
///
/// `body_text` is always plain text with whitespace runs collapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub source: String,
    pub title: String,
    pub body_text: String,
}

/// One timed caption cue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptSegment {
    pub text: String,
    /// Offset from the start of the video, in seconds.
    pub start: f64,
    /// Seconds.
    pub duration: f64,
}

/// Where summarized text came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceLocator {
    Url(String),
    VideoId(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceMetadata {
    pub title: String,
    #[serde(flatten)]
    pub locator: SourceLocator,
}

#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub source_text: String,
    pub style: SummaryStyle,
    pub source: SourceMetadata,
}

/// Metadata attached to the terminal `done` frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayMetadata {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<SummaryStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<NoteAction>,
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceMetadata>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl RelayMetadata {
    pub fn new(model: impl Into<String>) -> Self {
        RelayMetadata {
            model: model.into(),
            style: None,
            action: None,
            truncated: false,
            original_length: None,
            source: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// Progress stage reported by `status` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamStage {
    Extracted,
    Generating,
}

/// One frame of a streamed response.
///
/// A well-formed stream is zero or more `Status`, then zero or more `Delta`,
/// then exactly one of `Done` or `Error`.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Status { stage: StreamStage, message: String },
    Delta { text: String },
    Done { full_text: String, metadata: RelayMetadata },
    Error { code: &'static str, message: String },
}

impl StreamEvent {
    pub fn status(stage: StreamStage, message: impl Into<String>) -> Self {
        StreamEvent::Status {
            stage,
            message: message.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done { .. } | StreamEvent::Error { .. })
    }
}

impl From<&crate::Error> for StreamEvent {
    fn from(err: &crate::Error) -> Self {
        StreamEvent::Error {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Serializes into the wire frames understood by the mobile client:
/// `{status, message}`, `{content}`, `{content: "", finished: true,
/// fullResponse, metadata}` and `{error, message}`.
impl Serialize for StreamEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StreamEvent::Status { stage, message } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("status", stage)?;
                map.serialize_entry("message", message)?;
                map.end()
            }
            StreamEvent::Delta { text } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("content", text)?;
                map.end()
            }
            StreamEvent::Done {
                full_text,
                metadata,
            } => {
                let mut map = serializer.serialize_map(Some(4))?;
                map.serialize_entry("content", "")?;
                map.serialize_entry("finished", &true)?;
                map.serialize_entry("fullResponse", full_text)?;
                map.serialize_entry("metadata", metadata)?;
                map.end()
            }
            StreamEvent::Error { code, message } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("error", code)?;
                map.serialize_entry("message", message)?;
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_style_parsing() {
        assert_eq!(SummaryStyle::parse_optional(None).unwrap(), SummaryStyle::General);
        assert_eq!(SummaryStyle::parse_optional(Some(" ")).unwrap(), SummaryStyle::General);
        assert_eq!("brief".parse::<SummaryStyle>().unwrap(), SummaryStyle::Brief);
        assert_eq!(
            "bulletPoints".parse::<SummaryStyle>().unwrap(),
            SummaryStyle::BulletPoints
        );
        assert!(matches!(
            "haiku".parse::<SummaryStyle>(),
            Err(ValidationError::UnknownVariant { .. })
        ));
    }

    #[test]
    fn test_action_parsing() {
        assert_eq!(NoteAction::parse_optional(None).unwrap(), NoteAction::Generate);
        assert_eq!("expand".parse::<NoteAction>().unwrap(), NoteAction::Expand);
        assert!("rewrite".parse::<NoteAction>().is_err());
    }

    #[test]
    fn test_frames() {
        let status = StreamEvent::status(StreamStage::Extracted, "Extracted 512 characters");
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({"status": "extracted", "message": "Extracted 512 characters"})
        );

        let delta = StreamEvent::Delta {
            text: "Hello".into(),
        };
        assert_eq!(serde_json::to_value(&delta).unwrap(), json!({"content": "Hello"}));

        let error = StreamEvent::Error {
            code: "upstream_error",
            message: "reset".into(),
        };
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({"error": "upstream_error", "message": "reset"})
        );
    }

    #[test]
    fn test_done_frame_carries_metadata() {
        let mut metadata = RelayMetadata::new("gpt-4o-mini");
        metadata.style = Some(SummaryStyle::BulletPoints);
        metadata.truncated = true;
        metadata.source = Some(SourceMetadata {
            title: "A talk".into(),
            locator: SourceLocator::VideoId("dQw4w9WgXcQ".into()),
        });

        let done = StreamEvent::Done {
            full_text: "Summary".into(),
            metadata,
        };
        let value = serde_json::to_value(&done).unwrap();

        assert_eq!(value["content"], "");
        assert_eq!(value["finished"], true);
        assert_eq!(value["fullResponse"], "Summary");
        assert_eq!(value["metadata"]["style"], "bullet_points");
        assert_eq!(value["metadata"]["truncated"], true);
        assert_eq!(value["metadata"]["source"]["videoId"], "dQw4w9WgXcQ");
        assert_eq!(value["metadata"]["source"]["title"], "A talk");
        assert!(value["metadata"].get("action").is_none());
        assert!(done.is_terminal());
    }
}
