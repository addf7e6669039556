//! # HTTP surface
//!
//! | Method | Path | Response |
//! |--------|------|----------|
//! | `POST` | `/api/extract` | JSON |
//! | `POST` | `/api/summarize-url` | SSE |
//! | `POST` | `/api/summarize-video` | JSON |
//! | `GET`  | `/api/transcript/{video_id}` | JSON |
//! | `POST` | `/api/chat` | SSE |
//! | `POST` | `/api/generate-note` | SSE |
//! | `POST` | `/api/summarize` | JSON |
//! | `*`    | `/api/notes`, `/api/workspaces` | JSON, bearer authenticated |
//! | `GET`  | `/health` | JSON |
//!
//! Errors are returned as `{success: false, error, message}` with the status
//! of [`crate::Error::status`]. Once an SSE response has started, failures arrive as
//! a final `{error, message}` frame instead.

pub mod gate;
mod notes;
mod routes;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use futures::{Stream, StreamExt};
use note_datastore::DataStore;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    auth::TokenVerifier, config::RelaySettings, fetch::PageFetcher, llm::CompletionService,
    relay::RelayStream, yt::CaptionSource,
};

pub use notes::NotesState;

pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Collaborators of the AI endpoints.
pub struct AppState<L, C, F> {
    pub llm: L,
    pub captions: C,
    pub fetcher: F,
    pub settings: RelaySettings,
}

pub struct RelayServerBuilder<L = (), C = (), F = ()> {
    llm: L,
    captions: C,
    fetcher: F,
    settings: RelaySettings,
    max_body_bytes: usize,
    notes: Option<Router>,
}

impl RelayServerBuilder {
    pub fn new() -> Self {
        Self {
            llm: (),
            captions: (),
            fetcher: (),
            settings: RelaySettings::default(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            notes: None,
        }
    }
}

impl Default for RelayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<L, C, F> RelayServerBuilder<L, C, F> {
    pub fn completion<L2: CompletionService>(self, llm: L2) -> RelayServerBuilder<L2, C, F> {
        RelayServerBuilder {
            llm,
            captions: self.captions,
            fetcher: self.fetcher,
            settings: self.settings,
            max_body_bytes: self.max_body_bytes,
            notes: self.notes,
        }
    }

    pub fn captions<C2: CaptionSource>(self, captions: C2) -> RelayServerBuilder<L, C2, F> {
        RelayServerBuilder {
            llm: self.llm,
            captions,
            fetcher: self.fetcher,
            settings: self.settings,
            max_body_bytes: self.max_body_bytes,
            notes: self.notes,
        }
    }

    pub fn fetcher<F2: PageFetcher>(self, fetcher: F2) -> RelayServerBuilder<L, C, F2> {
        RelayServerBuilder {
            llm: self.llm,
            captions: self.captions,
            fetcher,
            settings: self.settings,
            max_body_bytes: self.max_body_bytes,
            notes: self.notes,
        }
    }

    pub fn settings(mut self, settings: RelaySettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Mounts the owner-scoped notes and workspaces API.
    pub fn notes<D, V>(mut self, store: D, verifier: V) -> Self
    where
        D: DataStore + Send + Sync + 'static,
        V: TokenVerifier,
    {
        self.notes = Some(notes::router(store, verifier));
        self
    }
}

impl<L, C, F> RelayServerBuilder<L, C, F>
where
    L: CompletionService,
    C: CaptionSource,
    F: PageFetcher,
{
    pub fn build(self) -> RelayServer<L, C, F> {
        RelayServer {
            state: Arc::new(AppState {
                llm: self.llm,
                captions: self.captions,
                fetcher: self.fetcher,
                settings: self.settings,
            }),
            max_body_bytes: self.max_body_bytes,
            notes: self.notes,
        }
    }
}

pub struct RelayServer<L, C, F> {
    state: Arc<AppState<L, C, F>>,
    max_body_bytes: usize,
    notes: Option<Router>,
}

impl<L, C, F> RelayServer<L, C, F>
where
    L: CompletionService,
    C: CaptionSource,
    F: PageFetcher,
{
    pub fn router(&self) -> Router {
        let mut api = routes::router().with_state(self.state.clone());
        if let Some(notes) = &self.notes {
            api = api.merge(notes.clone());
        }

        Router::new()
            .route("/health", get(health))
            .nest("/api", api)
            .layer(DefaultBodyLimit::max(self.max_body_bytes))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        tracing::info!(addr = ?listener.local_addr().ok(), "Listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

/// Frames a relay as `text/event-stream`, one JSON `data:` line per event.
pub(crate) fn sse(stream: RelayStream) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    Sse::new(stream.map(|event| Event::default().json_data(&event))).keep_alive(KeepAlive::default())
}
