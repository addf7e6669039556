use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    extract::{char_len, extract},
    fetch::PageFetcher,
    llm::{CompletionRequest, CompletionService},
    prompt::{build_prompt, chat_messages, note_messages, summary_messages},
    relay::{strip_think_blocks, Relay},
    server::{
        gate::{self, GateJson},
        sse, AppState,
    },
    types::{
        ExtractedContent, NoteAction, RelayMetadata, SourceLocator, SourceMetadata, StreamEvent,
        StreamStage, SummaryRequest, SummaryStyle,
    },
    yt::{CaptionSource, VideoId},
    Error,
};

/// Characters of the flattened transcript echoed back by `summarize-video`.
const TRANSCRIPT_PREVIEW_CHARS: usize = 1000;

type AppStateRef<L, C, F> = State<Arc<AppState<L, C, F>>>;

pub(super) fn router<L, C, F>() -> Router<Arc<AppState<L, C, F>>>
where
    L: CompletionService,
    C: CaptionSource,
    F: PageFetcher,
{
    Router::new()
        .route("/extract", post(extract_page::<L, C, F>))
        .route("/summarize-url", post(summarize_url::<L, C, F>))
        .route("/summarize-video", post(summarize_video::<L, C, F>))
        .route("/transcript/{video_id}", get(transcript::<L, C, F>))
        .route("/chat", post(chat::<L, C, F>))
        .route("/generate-note", post(generate_note::<L, C, F>))
        .route("/summarize", post(summarize_text::<L, C, F>))
}

#[derive(Debug, Deserialize)]
struct ExtractBody {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SummarizeUrlBody {
    url: Option<String>,
    #[serde(alias = "summaryType")]
    summary_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummarizeVideoBody {
    #[serde(alias = "video_url", alias = "url")]
    video_url: Option<String>,
    #[serde(alias = "summary_type")]
    summary_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatBody {
    prompt: Option<String>,
    temperature: Option<f64>,
    #[serde(alias = "maxTokens")]
    max_tokens: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct GenerateNoteBody {
    prompt: Option<String>,
    context: Option<String>,
    action: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SummarizeBody {
    content: Option<String>,
    #[serde(alias = "summaryType")]
    summary_type: Option<String>,
}

/// Runs the extractor off the async workers; parsing large pages is CPU bound.
async fn extract_blocking(html: String, source: String) -> Result<ExtractedContent, Error> {
    tokio::task::spawn_blocking(move || extract(&html, &source))
        .await
        .map_err(|e| Error::Internal(format!("extraction task failed: {e}")))?
        .map_err(Error::from)
}

async fn fetch_and_extract<F: PageFetcher>(fetcher: &F, raw_url: &str) -> Result<ExtractedContent, Error> {
    let url = gate::http_url(raw_url)?;
    let html = fetcher.fetch_page(&url).await?;
    let content = extract_blocking(html, raw_url.to_string()).await?;
    tracing::info!(url = raw_url, chars = char_len(&content.body_text), "Extracted page");
    Ok(content)
}

async fn extract_page<L, C, F>(
    State(state): AppStateRef<L, C, F>,
    GateJson(body): GateJson<ExtractBody>,
) -> Result<Json<Value>, Error>
where
    L: CompletionService,
    C: CaptionSource,
    F: PageFetcher,
{
    let url = gate::required("url", body.url.as_deref())?;
    let content = fetch_and_extract(&state.fetcher, url).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "content": content.body_text,
            "title": content.title,
            "url": content.source,
        },
        "stats": {
            "contentLength": char_len(&content.body_text),
            "extractedAt": Utc::now(),
        },
    })))
}

async fn summarize_url<L, C, F>(
    State(state): AppStateRef<L, C, F>,
    GateJson(body): GateJson<SummarizeUrlBody>,
) -> Result<impl IntoResponse, Error>
where
    L: CompletionService,
    C: CaptionSource,
    F: PageFetcher,
{
    let url = gate::required("url", body.url.as_deref())?;
    let style = SummaryStyle::parse_optional(body.summary_type.as_deref())?;
    let content = fetch_and_extract(&state.fetcher, url).await?;

    let extracted = StreamEvent::status(
        StreamStage::Extracted,
        format!(
            "Extracted {} characters from {}",
            char_len(&content.body_text),
            content.title
        ),
    );

    let request = SummaryRequest {
        source_text: content.body_text,
        style,
        source: SourceMetadata {
            title: content.title,
            locator: SourceLocator::Url(content.source),
        },
    };
    let prompt = request.prompt(state.settings.max_content_length);

    let mut metadata = RelayMetadata::new(state.llm.model());
    metadata.style = Some(style);
    metadata.truncated = prompt.truncated;
    metadata.original_length = Some(prompt.original_length);
    metadata.source = Some(request.source);

    let completion = CompletionRequest {
        messages: summary_messages(&prompt),
        params: state.settings.sampling,
    };
    let relay = Relay::open(&state.llm, completion, metadata)
        .await?
        .with_preamble([
            extracted,
            StreamEvent::status(StreamStage::Generating, "Generating summary"),
        ]);

    Ok(sse(relay))
}

async fn summarize_video<L, C, F>(
    State(state): AppStateRef<L, C, F>,
    GateJson(body): GateJson<SummarizeVideoBody>,
) -> Result<Json<Value>, Error>
where
    L: CompletionService,
    C: CaptionSource,
    F: PageFetcher,
{
    let video_id = VideoId::parse(gate::required("videoUrl", body.video_url.as_deref())?)?;
    let style = SummaryStyle::parse_optional(body.summary_type.as_deref())?;

    let transcript = state.captions.fetch_transcript(&video_id).await?;
    let text = transcript.text();
    tracing::info!(%video_id, segments = transcript.segments.len(), "Fetched transcript");

    let request = SummaryRequest {
        source_text: text.clone(),
        style,
        source: SourceMetadata {
            title: transcript
                .title
                .clone()
                .unwrap_or_else(|| video_id.to_string()),
            locator: SourceLocator::VideoId(video_id.to_string()),
        },
    };
    let prompt = request.prompt(state.settings.max_content_length);

    let summary = state
        .llm
        .complete(CompletionRequest {
            messages: summary_messages(&prompt),
            params: state.settings.sampling,
        })
        .await?;

    Ok(Json(json!({
        "success": true,
        "videoId": video_id.as_str(),
        "title": request.source.title,
        "summary": strip_think_blocks(&summary),
        "summaryType": style,
        "truncated": prompt.truncated,
        "transcriptLength": char_len(&text),
        "transcriptWordCount": transcript.word_count(),
        "videoDuration": transcript.duration(),
        "fullTranscript": text.chars().take(TRANSCRIPT_PREVIEW_CHARS).collect::<String>(),
    })))
}

async fn transcript<L, C, F>(
    State(state): AppStateRef<L, C, F>,
    Path(video): Path<String>,
) -> Result<Json<Value>, Error>
where
    L: CompletionService,
    C: CaptionSource,
    F: PageFetcher,
{
    let video_id = VideoId::parse(&video)?;
    let transcript = state.captions.fetch_transcript(&video_id).await?;

    Ok(Json(json!({
        "success": true,
        "videoId": video_id.as_str(),
        "title": transcript.title,
        "transcript": transcript.text(),
        "wordCount": transcript.word_count(),
        "duration": transcript.duration(),
        "segments": transcript.segments,
    })))
}

async fn chat<L, C, F>(
    State(state): AppStateRef<L, C, F>,
    GateJson(body): GateJson<ChatBody>,
) -> Result<impl IntoResponse, Error>
where
    L: CompletionService,
    C: CaptionSource,
    F: PageFetcher,
{
    let prompt = gate::required("prompt", body.prompt.as_deref())?;
    let params = gate::sampling(&state.settings, body.temperature, body.max_tokens)?;

    let relay = Relay::open(
        &state.llm,
        CompletionRequest {
            messages: chat_messages(prompt),
            params,
        },
        RelayMetadata::new(state.llm.model()),
    )
    .await?;

    Ok(sse(relay))
}

async fn generate_note<L, C, F>(
    State(state): AppStateRef<L, C, F>,
    GateJson(body): GateJson<GenerateNoteBody>,
) -> Result<impl IntoResponse, Error>
where
    L: CompletionService,
    C: CaptionSource,
    F: PageFetcher,
{
    let prompt = gate::required("prompt", body.prompt.as_deref())?;
    let action = NoteAction::parse_optional(body.action.as_deref())?;

    let (messages, truncated) = note_messages(
        action,
        prompt,
        body.context.as_deref(),
        state.settings.max_content_length,
    );

    let mut metadata = RelayMetadata::new(state.llm.model());
    metadata.action = Some(action);
    metadata.truncated = truncated;

    let relay = Relay::open(
        &state.llm,
        CompletionRequest {
            messages,
            params: state.settings.sampling,
        },
        metadata,
    )
    .await?;

    Ok(sse(relay))
}

async fn summarize_text<L, C, F>(
    State(state): AppStateRef<L, C, F>,
    GateJson(body): GateJson<SummarizeBody>,
) -> Result<Json<Value>, Error>
where
    L: CompletionService,
    C: CaptionSource,
    F: PageFetcher,
{
    let content = gate::required("content", body.content.as_deref())?;
    let style = SummaryStyle::parse_optional(body.summary_type.as_deref())?;

    let prompt = build_prompt(
        content,
        style,
        "the provided text",
        state.settings.max_content_length,
    );
    let summary = state
        .llm
        .complete(CompletionRequest {
            messages: summary_messages(&prompt),
            params: state.settings.sampling,
        })
        .await?;

    Ok(Json(json!({
        "summary": strip_think_blocks(&summary),
        "original_length": prompt.original_length,
        "summary_type": style,
        "truncated": prompt.truncated,
    })))
}
