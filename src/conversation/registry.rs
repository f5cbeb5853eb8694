//! Registry of live conversations, at most one per key

use super::handle::{ConversationHandle, ForgetReason};
use super::worker::ConversationWorker;
use super::ConversationKey;
use crate::config::AutohelpConfig;
use crate::error::AnalyzerError;
use crate::runtime::{Analyzer, Renderer, TagLookup};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

type Entries = Mutex<HashMap<ConversationKey, Arc<ConversationHandle>>>;

struct Shared {
    entries: Entries,
    /// Number of live entries, for shutdown draining
    live: watch::Sender<usize>,
}

impl Shared {
    /// Remove `id` under `key`; a newer conversation for the same key is kept
    fn remove(&self, key: ConversationKey, id: &str) -> bool {
        let mut entries = self.entries.lock().unwrap();
        let removed = match entries.get(&key) {
            Some(existing) if existing.id() == id => entries.remove(&key).is_some(),
            _ => false,
        };
        self.live.send_replace(entries.len());
        removed
    }
}

/// Owns the key -> conversation map and everything needed to start one
pub struct ConversationRegistry<A, R, T>
where
    A: Analyzer + 'static,
    R: Renderer + 'static,
    T: TagLookup + 'static,
{
    shared: Arc<Shared>,
    analyzer: Arc<A>,
    renderer: Arc<R>,
    tags: Arc<T>,
    idle_timeout: Duration,
    doc_grace: Duration,
}

impl<A, R, T> ConversationRegistry<A, R, T>
where
    A: Analyzer + 'static,
    R: Renderer + 'static,
    T: TagLookup + 'static,
{
    pub fn new(analyzer: Arc<A>, renderer: Arc<R>, tags: Arc<T>, config: &AutohelpConfig) -> Self {
        let (live, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                entries: Mutex::new(HashMap::new()),
                live,
            }),
            analyzer,
            renderer,
            tags,
            idle_timeout: config.idle_timeout,
            doc_grace: config.doc_grace,
        }
    }

    /// Return the live conversation for `key`, or start one.
    ///
    /// The map lock is held for the whole lookup-or-insert, so concurrent
    /// callers for one key always observe a single conversation. The bool is
    /// true when the conversation already existed.
    pub fn find_or_create(
        &self,
        key: ConversationKey,
        guild_id: u64,
    ) -> Result<(Arc<ConversationHandle>, bool), AnalyzerError> {
        let mut entries = self.shared.entries.lock().unwrap();
        if let Some(existing) = entries.get(&key) {
            if existing.is_alive() {
                return Ok((Arc::clone(existing), true));
            }
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = self.analyzer.create_session(events_tx)?;
        let handle = Arc::new(ConversationHandle::new(key, guild_id, session));

        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        let id = handle.id().to_string();
        handle.set_on_forget(move |_| {
            if let Some(shared) = shared.upgrade() {
                shared.remove(key, &id);
            }
        });

        entries.insert(key, Arc::clone(&handle));
        self.shared.live.send_replace(entries.len());
        drop(entries);

        tracing::info!(
            conv_key = %key,
            conversation_id = %handle.id(),
            "Conversation started"
        );

        self.arm_idle_timer(&handle);
        let worker = ConversationWorker::new(
            Arc::clone(&handle),
            Arc::clone(&self.renderer),
            Arc::clone(&self.tags),
            events_rx,
            self.doc_grace,
        );
        tokio::spawn(worker.run());

        Ok((handle, false))
    }

    /// Fires once, `idle_timeout` after creation; never postponed
    fn arm_idle_timer(&self, handle: &Arc<ConversationHandle>) {
        let handle = Arc::clone(handle);
        let idle_timeout = self.idle_timeout;
        tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(idle_timeout) => {
                    handle.forget(ForgetReason::IdleTimeout);
                }
                () = handle.forgotten() => {}
            }
        });
    }

    /// Remove a conversation's entry. Safe to call more than once.
    #[allow(dead_code)] // Removal normally goes through the forget hook
    pub fn remove(&self, conversation: &ConversationHandle) -> bool {
        self.shared.remove(conversation.key(), conversation.id())
    }

    /// Forget every live conversation; returns how many were ended
    pub fn forget_all(&self, reason: ForgetReason) -> usize {
        // Forget hooks take the map lock, so collect first
        let live: Vec<_> = self.shared.entries.lock().unwrap().values().cloned().collect();
        live.into_iter().filter(|h| h.forget(reason)).count()
    }

    #[allow(dead_code)] // For future API use
    pub fn get(&self, key: &ConversationKey) -> Option<Arc<ConversationHandle>> {
        self.shared
            .entries
            .lock()
            .unwrap()
            .get(key)
            .filter(|h| h.is_alive())
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.shared.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves once no conversation is live
    pub async fn wait_until_empty(&self) {
        let mut live = self.shared.live.subscribe();
        // The sender lives in `self.shared`, so this only errors during teardown
        let _ = live.wait_for(|n| *n == 0).await;
    }
}
