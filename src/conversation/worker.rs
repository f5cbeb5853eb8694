//! Per-conversation worker
//!
//! Exactly one worker task drains a conversation's analysis events, so state
//! recomputation and message edits never interleave.

use super::handle::{ConversationHandle, ConversationUpdate, ForgetReason};
use super::state::{ConversationState, Step};
use crate::analysis::AnalysisEvent;
use crate::runtime::{EditableMessage, Renderer, TagLookup};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub struct ConversationWorker<R, T>
where
    R: Renderer + 'static,
    T: TagLookup + 'static,
{
    handle: Arc<ConversationHandle>,
    state: ConversationState,
    renderer: Arc<R>,
    tags: Arc<T>,
    events_rx: mpsc::UnboundedReceiver<AnalysisEvent>,
    /// Expired documentation grace windows, by generation
    grace_tx: mpsc::UnboundedSender<u64>,
    grace_rx: mpsc::UnboundedReceiver<u64>,
    doc_grace: Duration,
    status_message: Option<Box<dyn EditableMessage>>,
}

impl<R, T> ConversationWorker<R, T>
where
    R: Renderer + 'static,
    T: TagLookup + 'static,
{
    pub fn new(
        handle: Arc<ConversationHandle>,
        renderer: Arc<R>,
        tags: Arc<T>,
        events_rx: mpsc::UnboundedReceiver<AnalysisEvent>,
        doc_grace: Duration,
    ) -> Self {
        let (grace_tx, grace_rx) = mpsc::unbounded_channel();
        Self {
            handle,
            state: ConversationState::new(),
            renderer,
            tags,
            events_rx,
            grace_tx,
            grace_rx,
            doc_grace,
            status_message: None,
        }
    }

    pub async fn run(mut self) {
        let conv_key = self.handle.key();
        let cancel = self.handle.cancel_token().clone();
        tracing::debug!(conv_key = %conv_key, "Conversation worker started");

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                Some(event) = self.events_rx.recv() => {
                    if !self.handle.is_alive() {
                        break;
                    }
                    let kind = event.kind().to_string();
                    let applied = AssertUnwindSafe(self.process_event(event)).catch_unwind().await;
                    if applied.is_err() {
                        tracing::error!(conv_key = %conv_key, kind = %kind, "Panic while applying analysis event");
                        continue;
                    }
                    if self.state.is_complete() {
                        self.handle.forget(ForgetReason::Complete);
                        break;
                    }
                }
                Some(generation) = self.grace_rx.recv() => {
                    if self.state.clear_doc_pending(generation) {
                        self.render().await;
                    }
                }
            }
        }

        tracing::debug!(conv_key = %conv_key, "Conversation worker stopped");
    }

    async fn process_event(&mut self, event: AnalysisEvent) {
        let step = self.state.apply(event, self.tags.as_ref());

        let seq = self.handle.record_event_applied();
        self.handle.publish(ConversationUpdate::Applied {
            seq,
            exceptions: self.state.exceptions().len(),
            files: self.state.files().len(),
            docs: self.state.docs().len(),
            complete: self.state.is_complete(),
        });

        match step {
            Step::Ignored => {
                tracing::debug!(conv_key = %self.handle.key(), "Ignoring unrecognized analysis event");
            }
            Step::NothingToRender => {}
            Step::Render { doc_grace } => {
                if let Some(generation) = doc_grace {
                    self.schedule_doc_grace(generation);
                }
                self.render().await;
            }
        }
    }

    fn schedule_doc_grace(&self, generation: u64) {
        let grace_tx = self.grace_tx.clone();
        let cancel = self.handle.cancel_token().clone();
        let delay = self.doc_grace;
        tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(delay) => {
                    let _ = grace_tx.send(generation);
                }
                () = cancel.cancelled() => {}
            }
        });
    }

    /// Send the status message, or edit it once it exists. Failures are
    /// logged; the next render carries the full current view anyway.
    async fn render(&mut self) {
        let Some(payload) = self.state.status() else {
            return;
        };
        let key = self.handle.key();

        let result = match &self.status_message {
            Some(message) => message.edit(&payload).await.map(|()| message.id()),
            None => self
                .renderer
                .send(self.handle.guild_id(), key.channel_id, &payload)
                .await
                .map(|message| {
                    let id = message.id();
                    self.status_message = Some(message);
                    id
                }),
        };

        match result {
            Ok(message_id) => {
                self.handle
                    .publish(ConversationUpdate::Rendered { message_id });
            }
            Err(e) => {
                tracing::warn!(conv_key = %key, error = %e, "Failed to render status message");
            }
        }
    }
}
