//! Routes inbound chat messages to conversations

use super::traits::{Analyzer, EventSource, ReceivedFile, Renderer, TagLookup};
use crate::analysis::AnalysisInput;
use crate::config::AutohelpConfig;
use crate::conversation::{ConversationHandle, ConversationKey, ConversationRegistry};
use crate::source::{merge_sources, ReceivedMessage};
use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Manager for all autohelp conversations
pub struct Dispatcher<A, R, T>
where
    A: Analyzer + 'static,
    R: Renderer + 'static,
    T: TagLookup + 'static,
{
    registry: ConversationRegistry<A, R, T>,
    renderer: Arc<R>,
    config: AutohelpConfig,
    shutdown: CancellationToken,
}

impl<A, R, T> Dispatcher<A, R, T>
where
    A: Analyzer + 'static,
    R: Renderer + 'static,
    T: TagLookup + 'static,
{
    pub fn new(analyzer: Arc<A>, renderer: Arc<R>, tags: Arc<T>, config: AutohelpConfig) -> Self {
        let registry = ConversationRegistry::new(analyzer, Arc::clone(&renderer), tags, &config);
        Self {
            registry,
            renderer,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn registry(&self) -> &ConversationRegistry<A, R, T> {
        &self.registry
    }

    /// Consume `sources` until they are exhausted or `shutdown` is called
    pub async fn run(&self, sources: Vec<Box<dyn EventSource>>) {
        let channels = self.config.clone();
        let mut messages = merge_sources(sources, move |m| channels.watches(m.channel_id));

        loop {
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => {
                    tracing::info!("Dispatcher shutting down");
                    break;
                }
                next = messages.next() => match next {
                    Some(message) => {
                        self.handle_message(message);
                    }
                    None => {
                        tracing::info!("All message sources closed");
                        break;
                    }
                },
            }
        }
    }

    /// Stop consuming sources. Live conversations keep running until they
    /// complete or idle out.
    pub fn shutdown(&self) {
        tracing::info!(live = self.registry.len(), "Stopping message sources");
        self.shutdown.cancel();
    }

    /// Route one message to its conversation, starting one if needed.
    ///
    /// Input is fed in background tasks; the returned handle is the
    /// conversation the message was routed to.
    pub fn handle_message(&self, message: ReceivedMessage) -> Option<Arc<ConversationHandle>> {
        let Some(author_id) = message.author_id else {
            tracing::debug!(
                channel_id = message.channel_id,
                message_id = message.message_id,
                "Skipping message without author"
            );
            return None;
        };
        let key = ConversationKey::new(message.channel_id, author_id);

        let (conversation, existed) = match self.registry.find_or_create(key, message.guild_id) {
            Ok(found) => found,
            Err(e) => {
                tracing::error!(conv_key = %key, error = %e, "Failed to start conversation");
                return None;
            }
        };

        Self::feed(&conversation, message.content, message.files);

        if existed {
            self.acknowledge(&conversation, message.channel_id, message.message_id);
        }
        Some(conversation)
    }

    /// Forward text and every attachment independently
    fn feed(
        conversation: &Arc<ConversationHandle>,
        content: Option<String>,
        files: Vec<Arc<dyn ReceivedFile>>,
    ) {
        if let Some(content) = content.filter(|c| !c.trim().is_empty()) {
            let conversation = Arc::clone(conversation);
            tokio::spawn(async move {
                conversation.consume_input(AnalysisInput::text(content)).await;
            });
        }

        for file in files {
            let conversation = Arc::clone(conversation);
            tokio::spawn(async move {
                match file.download().await {
                    Ok(bytes) => {
                        conversation
                            .consume_input(AnalysisInput::file(file.name(), bytes))
                            .await;
                    }
                    Err(e) => {
                        tracing::warn!(
                            conv_key = %conversation.key(),
                            file = %file.name(),
                            error = %e,
                            "Failed to download attachment"
                        );
                    }
                }
            });
        }
    }

    /// React to a repeat message once analysis has produced something
    fn acknowledge(&self, conversation: &Arc<ConversationHandle>, channel_id: u64, message_id: u64) {
        let conversation = Arc::clone(conversation);
        let renderer = Arc::clone(&self.renderer);
        let timeout = self.config.ack_timeout;
        let emoji = self.config.ack_emoji.clone();
        tokio::spawn(async move {
            if !conversation.wait_for_first_event(timeout).await {
                tracing::debug!(conv_key = %conversation.key(), "Skipping acknowledgement");
                return;
            }
            if let Err(e) = renderer.react(channel_id, message_id, &emoji).await {
                tracing::warn!(conv_key = %conversation.key(), error = %e, "Failed to acknowledge message");
            }
        });
    }
}
