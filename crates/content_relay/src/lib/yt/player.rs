//! # Watch page parsing
//!
//! YouTube embeds the player configuration of a video as a
//! `ytInitialPlayerResponse` assignment inside a script tag of the watch page.
//! The caption tracks, playability and title are read from it.

use std::{ops::Deref, sync::LazyLock};

use regex::Regex;
use serde::{de::DeserializeOwned, Deserialize};

static YT_PLAYER_RESPONSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)var\s+ytInitialPlayerResponse\s*=\s*(\{.*?\});\s*(?:var\s|</script>)")
        .expect("static regex must compile")
});

pub struct WatchPage(String);

impl Deref for WatchPage {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<String> for WatchPage {
    fn from(value: String) -> Self {
        WatchPage(value)
    }
}

impl WatchPage {
    /// Deserializes the first `ytInitialPlayerResponse` in the page, or `None`
    /// when there is none or it is not valid JSON.
    pub fn to_json<T: DeserializeOwned>(&self) -> Option<T> {
        YT_PLAYER_RESPONSE_RE
            .captures(self)
            .and_then(|cap| cap.get(1))
            .and_then(|m| {
                serde_json::from_str(m.as_str())
                    .inspect_err(|e| tracing::warn!(error = %e, "Invalid ytInitialPlayerResponse"))
                    .ok()
            })
    }

    pub fn player_response(&self) -> Option<PlayerResponse> {
        self.to_json()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResponse {
    pub playability_status: Option<PlayabilityStatus>,
    pub captions: Option<Captions>,
    pub video_details: Option<VideoDetails>,
}

#[derive(Debug, Deserialize)]
pub struct PlayabilityStatus {
    pub status: String,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Captions {
    pub player_captions_tracklist_renderer: TracklistRenderer,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracklistRenderer {
    #[serde(default)]
    pub caption_tracks: Vec<CaptionTrack>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    /// `asr` for auto-generated tracks.
    pub kind: Option<String>,
}

impl CaptionTrack {
    pub fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }

    pub fn json3_url(&self) -> String {
        let sep = if self.base_url.contains('?') { '&' } else { '?' };
        format!("{}{sep}fmt=json3", self.base_url)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetails {
    pub title: Option<String>,
}

impl PlayerResponse {
    /// Missing status is treated as playable; some embeds omit it.
    pub fn is_playable(&self) -> bool {
        self.playability_status
            .as_ref()
            .is_none_or(|s| s.status == "OK")
    }

    pub fn title(&self) -> Option<&str> {
        self.video_details.as_ref()?.title.as_deref()
    }

    fn tracks(&self) -> &[CaptionTrack] {
        self.captions
            .as_ref()
            .map(|c| c.player_captions_tracklist_renderer.caption_tracks.as_slice())
            .unwrap_or_default()
    }

    /// Picks the best track for `language`: a manual track in that language,
    /// then a generated one, then any regional variant, then the first track.
    pub fn caption_track(&self, language: &str) -> Option<&CaptionTrack> {
        let tracks = self.tracks();
        let regional = format!("{language}-");

        tracks
            .iter()
            .find(|t| t.language_code == language && !t.is_generated())
            .or_else(|| tracks.iter().find(|t| t.language_code == language))
            .or_else(|| tracks.iter().find(|t| t.language_code.starts_with(&regional)))
            .or_else(|| tracks.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(player_json: &str) -> WatchPage {
        WatchPage::from(format!(
            r#"<html><head><script nonce="abc">var ytInitialPlayerResponse = {player_json};var meta = document.createElement('meta');</script></head></html>"#
        ))
    }

    #[test]
    fn test_extracts_player_response() {
        let page = page(
            r#"{"playabilityStatus":{"status":"OK"},
                "videoDetails":{"title":"Talk; with semicolons};"},
                "captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[
                    {"baseUrl":"https://www.youtube.com/api/timedtext?v=x&lang=de","languageCode":"de"},
                    {"baseUrl":"https://www.youtube.com/api/timedtext?v=x&lang=en&kind=asr","languageCode":"en","kind":"asr"},
                    {"baseUrl":"https://www.youtube.com/api/timedtext?v=x&lang=en","languageCode":"en"}
                ]}}}"#,
        );

        let player = page.player_response().unwrap();
        assert!(player.is_playable());
        assert_eq!(player.title(), Some("Talk; with semicolons};"));

        let track = player.caption_track("en").unwrap();
        assert!(!track.is_generated());
        assert_eq!(
            track.json3_url(),
            "https://www.youtube.com/api/timedtext?v=x&lang=en&fmt=json3"
        );
    }

    #[test]
    fn test_track_fallbacks() {
        let page = page(
            r#"{"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[
                {"baseUrl":"https://x/fr","languageCode":"fr"},
                {"baseUrl":"https://x/en-GB","languageCode":"en-GB"}
            ]}}}"#,
        );
        let player = page.player_response().unwrap();

        assert_eq!(player.caption_track("en").unwrap().language_code, "en-GB");
        assert_eq!(player.caption_track("sw").unwrap().language_code, "fr");
    }

    #[test]
    fn test_no_tracks_and_unplayable() {
        let page = page(r#"{"playabilityStatus":{"status":"ERROR","reason":"Video unavailable"}}"#);
        let player = page.player_response().unwrap();

        assert!(!player.is_playable());
        assert!(player.caption_track("en").is_none());
    }

    #[test]
    fn test_missing_or_invalid_player_response() {
        assert!(WatchPage::from("<html>nothing here</html>".to_string())
            .player_response()
            .is_none());
        assert!(page("{invalid: json}").player_response().is_none());
    }
}
