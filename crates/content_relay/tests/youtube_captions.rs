use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{Query, State},
    response::Html,
    routing::get,
    Json, Router,
};
use content_relay::{
    error::NotFound,
    yt::{CaptionSource, VideoId, YoutubeCaptions},
    Error,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

#[derive(Clone)]
struct Stub {
    base: String,
    player: Value,
    timedtext_queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

fn watch_page(player: &Value) -> String {
    format!(
        r#"<!DOCTYPE html><html><head><title>Video - YouTube</title></head><body>
        <script nonce="abc">var ytInitialPlayerResponse = {player};var meta = document.createElement('meta');</script>
        <script>var ytInitialData = {{"contents": {{}}}};</script>
        </body></html>"#
    )
}

async fn watch(State(stub): State<Stub>) -> Html<String> {
    let player = serde_json::to_string(&stub.player)
        .unwrap()
        .replace("{base}", &stub.base);
    Html(watch_page(&serde_json::from_str(&player).unwrap()))
}

async fn timedtext(
    State(stub): State<Stub>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let lang = query.get("lang").cloned().unwrap_or_default();
    stub.timedtext_queries.lock().unwrap().push(query);

    let text = if lang == "en" { "manual" } else { "other" };
    Json(json!({
        "wireMagic": "pb3",
        "events": [
            { "tStartMs": 0, "dDurationMs": 90000, "wpWinPosId": 1 },
            { "tStartMs": 1000, "dDurationMs": 2500, "segs": [{ "utf8": text }, { "utf8": " captions" }] },
            { "tStartMs": 3500, "segs": [{ "utf8": "\n" }] },
            { "tStartMs": 4000, "dDurationMs": 1500, "segs": [{ "utf8": "second\nline" }] },
        ],
    }))
}

/// Serves a watch page whose caption `baseUrl`s point back at this server.
/// `{base}` inside `player` is replaced with the server address.
async fn spawn_youtube(player: Value) -> (YoutubeCaptions, Stub) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let stub = Stub {
        base: base.clone(),
        player,
        timedtext_queries: Arc::default(),
    };
    let router = Router::new()
        .route("/watch", get(watch))
        .route("/api/timedtext", get(timedtext))
        .with_state(stub.clone());
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

    let captions = YoutubeCaptions::new(reqwest::Client::new()).with_base_url(base);
    (captions, stub)
}

fn track(lang: &str, kind: Option<&str>) -> Value {
    let mut track = json!({
        "baseUrl": format!("{{base}}/api/timedtext?v=dQw4w9WgXcQ&lang={lang}"),
        "languageCode": lang,
    });
    if let Some(kind) = kind {
        track["kind"] = json!(kind);
    }
    track
}

fn player(tracks: Vec<Value>) -> Value {
    json!({
        "playabilityStatus": { "status": "OK" },
        "videoDetails": { "videoId": "dQw4w9WgXcQ", "title": "Solar talk" },
        "captions": {
            "playerCaptionsTracklistRenderer": { "captionTracks": tracks },
        },
    })
}

fn video_id() -> VideoId {
    VideoId::parse("dQw4w9WgXcQ").unwrap()
}

#[tokio::test]
async fn test_fetches_manual_english_track_as_json3() {
    let (captions, stub) = spawn_youtube(player(vec![
        track("de", None),
        track("en", Some("asr")),
        track("en", None),
    ]))
    .await;

    let transcript = captions.fetch_transcript(&video_id()).await.unwrap();

    assert_eq!(transcript.title.as_deref(), Some("Solar talk"));
    assert_eq!(transcript.text(), "manual captions second line");
    assert_eq!(transcript.segments.len(), 2);
    assert_eq!(transcript.segments[0].start, 1.0);
    assert_eq!(transcript.segments[0].duration, 2.5);
    assert_eq!(transcript.duration(), 5.5);

    let queries = stub.timedtext_queries.lock().unwrap();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0]["fmt"], "json3");
    assert_eq!(queries[0]["lang"], "en");
    assert!(queries[0].get("kind").is_none());
}

#[tokio::test]
async fn test_falls_back_to_first_track() {
    let (captions, _) = spawn_youtube(player(vec![track("sw", None), track("de", None)])).await;

    let transcript = captions.fetch_transcript(&video_id()).await.unwrap();
    assert_eq!(transcript.text(), "other captions second line");
}

#[tokio::test]
async fn test_video_without_tracks_has_no_captions() {
    let (captions, stub) = spawn_youtube(player(vec![])).await;

    let err = captions.fetch_transcript(&video_id()).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(NotFound::NoCaptions { .. })), "{err}");
    assert!(stub.timedtext_queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unplayable_video_has_no_captions() {
    let mut player = player(vec![track("en", None)]);
    player["playabilityStatus"] = json!({ "status": "LOGIN_REQUIRED", "reason": "Sign in" });
    let (captions, stub) = spawn_youtube(player).await;

    let err = captions.fetch_transcript(&video_id()).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(NotFound::NoCaptions { .. })), "{err}");
    assert!(stub.timedtext_queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_page_without_player_response_has_no_captions() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let router = Router::new().route(
        "/watch",
        get(|| async { Html("<html><body>consent wall</body></html>") }),
    );
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

    let captions = YoutubeCaptions::new(reqwest::Client::new()).with_base_url(base);
    let err = captions.fetch_transcript(&video_id()).await.unwrap_err();
    assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);
}
