use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use content_relay::{
    auth::HttpTokenVerifier,
    config::Config,
    extract::{char_len, extract},
    fetch::{HttpPageFetcher, PageFetcher, USER_AGENT},
    openai::OpenAIClient,
    server::gate::http_url,
    telemetry::init_tracing_subscriber,
    yt::{CaptionSource, VideoId, YoutubeCaptions},
    RelayServerBuilder,
};
use note_datastore::{InMemoryDataStore, PgDataStore};

#[derive(Parser)]
#[command(name = "content-relay", about = "Content extraction and LLM streaming relay")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve(Config),
    /// Fetch a page and print its extracted content
    Extract {
        url: String,

        #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 10)]
        timeout_secs: u64,
    },
    /// Fetch and print the captions of a video
    Transcript {
        /// Video URL or id
        video: String,

        #[arg(long, env = "CAPTION_LANGUAGE", default_value = YoutubeCaptions::DEFAULT_LANGUAGE)]
        language: String,

        #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 10)]
        timeout_secs: u64,
    },
}

fn http_client() -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build http client")
}

async fn serve(config: Config) -> anyhow::Result<()> {
    config.validate()?;
    let client = http_client()?;

    let llm = OpenAIClient::new(&config.openai_api_key)
        .with_base_url(&config.openai_base_url)
        .with_model(&config.llm_model);
    let captions = YoutubeCaptions::new(client.clone())
        .with_language(&config.caption_language)
        .with_timeout(config.fetch_timeout());
    let fetcher = HttpPageFetcher::new(client.clone()).with_timeout(config.fetch_timeout());

    let mut builder = RelayServerBuilder::new()
        .completion(llm)
        .captions(captions)
        .fetcher(fetcher)
        .settings(config.relay_settings())
        .max_body_bytes(config.max_body_bytes);

    match (&config.auth_verify_url, &config.database_url) {
        (Some(verify_url), Some(database_url)) => {
            let store = PgDataStore::init(database_url).await?;
            builder = builder.notes(store, HttpTokenVerifier::new(client, verify_url));
        }
        (Some(verify_url), None) => {
            tracing::warn!("DATABASE_URL not set, notes are kept in memory");
            builder = builder.notes(
                InMemoryDataStore::default(),
                HttpTokenVerifier::new(client, verify_url),
            );
        }
        (None, _) => tracing::warn!("AUTH_VERIFY_URL not set, notes API disabled"),
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    builder.build().serve(listener).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let _guard = sentry::init((
        std::env::var("SENTRY_DSN").unwrap_or_default(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some("production".into()),
            ..Default::default()
        },
    ));

    let cli = Cli::parse();
    init_tracing_subscriber()?;

    match cli.command {
        Command::Serve(config) => serve(config).await?,
        Command::Extract { url, timeout_secs } => {
            let parsed = http_url(&url)?;
            let html = HttpPageFetcher::new(http_client()?)
                .with_timeout(Duration::from_secs(timeout_secs))
                .fetch_page(&parsed)
                .await?;
            let content = extract(&html, &url)?;

            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "title": content.title,
                    "url": content.source,
                    "contentLength": char_len(&content.body_text),
                    "content": content.body_text,
                }))?
            );
        }
        Command::Transcript {
            video,
            language,
            timeout_secs,
        } => {
            let video_id = VideoId::parse(&video)?;
            let transcript = YoutubeCaptions::new(http_client()?)
                .with_language(language)
                .with_timeout(Duration::from_secs(timeout_secs))
                .fetch_transcript(&video_id)
                .await?;

            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "videoId": video_id.as_str(),
                    "title": transcript.title,
                    "wordCount": transcript.word_count(),
                    "duration": transcript.duration(),
                    "transcript": transcript.text(),
                }))?
            );
        }
    }

    Ok(())
}
