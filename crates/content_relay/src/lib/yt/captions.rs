use std::time::Duration;

use reqwest::{header::ACCEPT_LANGUAGE, Client};
use serde::Deserialize;

use crate::{
    error::NotFound,
    extract::collapse_whitespace,
    fetch::{send_checked, transport_error, DEFAULT_FETCH_TIMEOUT, USER_AGENT},
    types::TranscriptSegment,
    yt::{player::WatchPage, CaptionSource, Transcript, VideoId},
    Error,
};

/// Reads caption tracks straight from YouTube's watch page and timedtext
/// endpoint.
#[derive(Debug, Clone)]
pub struct YoutubeCaptions {
    client: Client,
    base_url: String,
    language: String,
    timeout: Duration,
}

impl YoutubeCaptions {
    pub const BASE_URL: &str = "https://www.youtube.com";
    pub const DEFAULT_LANGUAGE: &str = "en";

    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: Self::BASE_URL.into(),
            language: Self::DEFAULT_LANGUAGE.into(),
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn get_text(&self, url: &str) -> Result<String, Error> {
        let request = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(ACCEPT_LANGUAGE, format!("{},en;q=0.9", self.language));

        send_checked(request, self.timeout)
            .await?
            .text()
            .await
            .map_err(|e| transport_error(e, self.timeout))
    }
}

impl CaptionSource for YoutubeCaptions {
    #[tracing::instrument(skip_all, fields(video_id = %video_id))]
    async fn fetch_transcript(&self, video_id: &VideoId) -> Result<Transcript, Error> {
        let no_captions = || NotFound::NoCaptions {
            video_id: video_id.to_string(),
        };

        let page = self
            .get_text(&format!("{}/watch?v={video_id}", self.base_url))
            .await
            .map(WatchPage::from)?;

        let Some(player) = page.player_response() else {
            tracing::warn!("No player response on watch page");
            return Err(no_captions().into());
        };

        if !player.is_playable() {
            let reason = player
                .playability_status
                .as_ref()
                .and_then(|s| s.reason.as_deref());
            tracing::info!(?reason, "Video is not playable");
            return Err(no_captions().into());
        }

        let track = player.caption_track(&self.language).ok_or_else(no_captions)?;
        tracing::debug!(language = %track.language_code, generated = track.is_generated(), "Selected caption track");

        let segments = parse_json3(&self.get_text(&track.json3_url()).await?)?;
        if segments.is_empty() {
            tracing::info!("Caption track is empty");
            return Err(no_captions().into());
        }

        Ok(Transcript {
            video_id: video_id.clone(),
            title: player.title().map(str::to_string),
            segments,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Json3 {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    t_start_ms: Option<u64>,
    d_duration_ms: Option<u64>,
    segs: Option<Vec<Json3Seg>>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    utf8: Option<String>,
}

/// Maps a `fmt=json3` caption track to segments. Events without text (window
/// and style events) are skipped.
pub fn parse_json3(body: &str) -> Result<Vec<TranscriptSegment>, Error> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let track = serde_json::from_str::<Json3>(body).map_err(|e| Error::Upstream {
        status: None,
        message: format!("Invalid caption track: {e}"),
    })?;

    let segments = track
        .events
        .into_iter()
        .filter_map(|event| {
            let text = event
                .segs?
                .into_iter()
                .filter_map(|s| s.utf8)
                .collect::<String>();
            let text = collapse_whitespace(&text);
            if text.is_empty() {
                return None;
            }
            Some(TranscriptSegment {
                text,
                start: event.t_start_ms.unwrap_or_default() as f64 / 1000.0,
                duration: event.d_duration_ms.unwrap_or_default() as f64 / 1000.0,
            })
        })
        .collect();

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json3_events() {
        let body = r#"{
            "wireMagic": "pb3",
            "events": [
                {"tStartMs": 0, "dDurationMs": 120000, "id": 1, "wpWinPosId": 1},
                {"tStartMs": 1200, "dDurationMs": 2500, "segs": [{"utf8": "Hello"}, {"utf8": " there,\nfriends"}]},
                {"tStartMs": 3700, "dDurationMs": 10, "segs": [{"utf8": "\n"}]},
                {"tStartMs": 4000, "dDurationMs": 1800, "segs": [{"utf8": "welcome back"}]}
            ]
        }"#;

        let segments = parse_json3(body).unwrap();
        assert_eq!(
            segments,
            vec![
                TranscriptSegment {
                    text: "Hello there, friends".into(),
                    start: 1.2,
                    duration: 2.5,
                },
                TranscriptSegment {
                    text: "welcome back".into(),
                    start: 4.0,
                    duration: 1.8,
                },
            ]
        );
    }

    #[test]
    fn test_parse_json3_empty_body() {
        assert!(parse_json3("").unwrap().is_empty());
        assert!(parse_json3("{}").unwrap().is_empty());
    }

    #[test]
    fn test_parse_json3_rejects_garbage() {
        assert!(matches!(
            parse_json3("<html>"),
            Err(Error::Upstream { status: None, .. })
        ));
    }
}
