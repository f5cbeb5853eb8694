//! Shared handle to a live conversation

use super::ConversationKey;
use crate::analysis::AnalysisInput;
use crate::runtime::AnalysisSession;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

/// Why a conversation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForgetReason {
    IdleTimeout,
    Complete,
    Cancelled,
}

/// Notifications published by a conversation's worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationUpdate {
    /// One analysis event was applied
    Applied {
        seq: u64,
        exceptions: usize,
        files: usize,
        docs: usize,
        complete: bool,
    },
    /// The status message was sent or edited
    Rendered { message_id: u64 },
    Forgotten { reason: ForgetReason },
}

type ForgetHook = Box<dyn FnOnce(ForgetReason) + Send>;

/// Handle shared by the registry, the dispatcher, the worker and the idle timer
pub struct ConversationHandle {
    id: String,
    key: ConversationKey,
    guild_id: u64,
    started_at: DateTime<Utc>,
    session: Arc<dyn AnalysisSession>,
    alive: AtomicBool,
    cancel: CancellationToken,
    on_forget: Mutex<Option<ForgetHook>>,
    /// Number of analysis events applied so far
    progress: watch::Sender<u64>,
    updates: broadcast::Sender<ConversationUpdate>,
}

impl std::fmt::Debug for ConversationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationHandle")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("alive", &self.is_alive())
            .finish_non_exhaustive()
    }
}

impl ConversationHandle {
    pub fn new(key: ConversationKey, guild_id: u64, session: Arc<dyn AnalysisSession>) -> Self {
        let (progress, _) = watch::channel(0);
        let (updates, _) = broadcast::channel(128);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            key,
            guild_id,
            started_at: Utc::now(),
            session,
            alive: AtomicBool::new(true),
            cancel: CancellationToken::new(),
            on_forget: Mutex::new(None),
            progress,
            updates,
        }
    }

    /// Install the hook run exactly once when the conversation is forgotten
    pub fn set_on_forget(&self, hook: impl FnOnce(ForgetReason) + Send + 'static) {
        *self.on_forget.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn key(&self) -> ConversationKey {
        self.key
    }

    pub fn guild_id(&self) -> u64 {
        self.guild_id
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Resolves once the conversation has been forgotten
    pub async fn forgotten(&self) {
        self.cancel.cancelled().await;
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Forward raw input to the analyzer session
    pub async fn consume_input(&self, input: AnalysisInput) {
        if !self.is_alive() {
            tracing::debug!(conv_key = %self.key, "Dropping input for forgotten conversation");
            return;
        }
        tracing::debug!(
            conv_key = %self.key,
            source_type = input.source_type(),
            "Forwarding input to analyzer"
        );
        self.session.consume(input).await;
    }

    /// End the conversation. Returns false if it was already forgotten.
    pub fn forget(&self, reason: ForgetReason) -> bool {
        if !self.alive.swap(false, Ordering::AcqRel) {
            return false;
        }

        self.cancel.cancel();
        let hook = self.on_forget.lock().unwrap().take();
        if let Some(hook) = hook {
            hook(reason);
        }
        self.session.release();
        let _ = self.updates.send(ConversationUpdate::Forgotten { reason });

        let age = Utc::now() - self.started_at;
        tracing::info!(
            conv_key = %self.key,
            conversation_id = %self.id,
            reason = ?reason,
            age_secs = age.num_seconds(),
            "Conversation forgotten"
        );
        true
    }

    /// Subscribe to worker notifications
    pub fn subscribe(&self) -> broadcast::Receiver<ConversationUpdate> {
        self.updates.subscribe()
    }

    pub(crate) fn publish(&self, update: ConversationUpdate) {
        let _ = self.updates.send(update);
    }

    pub(crate) fn record_event_applied(&self) -> u64 {
        let mut seq = 0;
        self.progress.send_modify(|n| {
            *n += 1;
            seq = *n;
        });
        seq
    }

    #[allow(dead_code)] // Used for logging/debugging
    pub fn events_applied(&self) -> u64 {
        *self.progress.borrow()
    }

    /// Wait until at least one analysis event was applied. False on timeout
    /// or if the conversation ends first.
    pub async fn wait_for_first_event(&self, timeout: Duration) -> bool {
        let mut progress = self.progress.subscribe();
        let applied = async {
            loop {
                if *progress.borrow_and_update() > 0 {
                    return true;
                }
                tokio::select! {
                    changed = progress.changed() => {
                        if changed.is_err() {
                            return false;
                        }
                    }
                    () = self.cancel.cancelled() => return *self.progress.borrow() > 0,
                }
            }
        };
        tokio::time::timeout(timeout, applied).await.unwrap_or(false)
    }
}
