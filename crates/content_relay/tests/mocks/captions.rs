use std::sync::{Arc, Mutex};

use content_relay::{
    error::NotFound,
    types::TranscriptSegment,
    yt::{CaptionSource, Transcript, VideoId},
    Error,
};

#[derive(Clone)]
pub struct MockCaptions {
    pub title: Option<String>,
    pub segments: Option<Vec<TranscriptSegment>>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl MockCaptions {
    /// `(text, start, duration)` cues.
    pub fn new(title: &str, cues: &[(&str, f64, f64)]) -> Self {
        Self {
            title: Some(title.to_string()),
            segments: Some(
                cues.iter()
                    .map(|(text, start, duration)| TranscriptSegment {
                        text: text.to_string(),
                        start: *start,
                        duration: *duration,
                    })
                    .collect(),
            ),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn without_captions() -> Self {
        Self {
            title: None,
            segments: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl CaptionSource for MockCaptions {
    async fn fetch_transcript(&self, video_id: &VideoId) -> Result<Transcript, Error> {
        self.calls.lock().unwrap().push(video_id.to_string());

        let segments = self.segments.clone().ok_or_else(|| NotFound::NoCaptions {
            video_id: video_id.to_string(),
        })?;

        Ok(Transcript {
            video_id: video_id.clone(),
            title: self.title.clone(),
            segments,
        })
    }
}
