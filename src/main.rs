//! Autohelp - stack trace assistant for chat channels
//!
//! Watches incoming messages for Java stack traces and keeps one status
//! message per user and channel up to date as more context is posted.

mod analysis;
mod config;
mod conversation;
mod error;
mod render;
mod runtime;
mod source;
mod tags;

use analysis::{DocIndex, LocalAnalyzer};
use config::AutohelpConfig;
use conversation::ForgetReason;
use render::StdoutRenderer;
use runtime::{Dispatcher, EventSource};
use source::LineSource;
use std::sync::Arc;
use tags::StaticTags;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout carries rendered messages
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "autohelp=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = AutohelpConfig::from_env()?;
    tracing::info!(
        idle_timeout_secs = config.idle_timeout.as_secs(),
        doc_grace_ms = u64::try_from(config.doc_grace.as_millis()).unwrap_or(u64::MAX),
        channels = ?config.channels,
        "Configuration loaded"
    );

    let tags = match &config.tags_path {
        Some(path) => {
            let custom = StaticTags::load(path)?;
            tracing::info!(path = %path.display(), count = custom.len(), "Loaded custom tags");
            custom.merged_with(StaticTags::builtin())
        }
        None => StaticTags::builtin(),
    };

    let docs = DocIndex::builtin();
    tracing::info!(tags = tags.len(), docs = docs.len(), "Analyzer initialized");

    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(LocalAnalyzer::new(docs)),
        Arc::new(StdoutRenderer::stdout()),
        Arc::new(tags),
        config,
    ));

    let client = reqwest::Client::builder().build()?;
    let sources: Vec<Box<dyn EventSource>> = vec![Box::new(LineSource::stdin(client))];

    let stop = {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                dispatcher.shutdown();
                let cancelled = dispatcher.registry().forget_all(ForgetReason::Cancelled);
                tracing::info!(count = cancelled, "Cancelled live conversations");
            }
        })
    };

    dispatcher.run(sources).await;

    // Input closed: let live conversations finish unless interrupted
    tokio::select! {
        () = dispatcher.registry().wait_until_empty() => {}
        _ = stop => {}
    }
    tracing::info!("Autohelp stopped");

    Ok(())
}
