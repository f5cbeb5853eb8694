//! Mock implementations for testing
//!
//! These mocks enable dispatcher and conversation tests without a chat
//! platform or a real analyzer.

use super::dispatcher::Dispatcher;
use super::traits::*;
use crate::analysis::{AnalysisEvent, AnalysisInput};
use crate::config::AutohelpConfig;
use crate::conversation::StatusPayload;
use crate::error::{AnalyzerError, DownloadError, RenderError};
use crate::source::ReceivedMessage;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};

type Responder = Arc<dyn Fn(&AnalysisInput) -> Vec<AnalysisEvent> + Send + Sync>;

// ============================================================================
// Mock Tags
// ============================================================================

/// Tag lookup backed by a fixed class name -> explanation map
#[derive(Default)]
pub struct MockTags {
    explanations: HashMap<String, String>,
    /// Class names looked up, in call order
    lookups: Mutex<Vec<String>>,
}

impl MockTags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, class_name: &str, explanation: &str) -> Self {
        self.explanations
            .insert(class_name.to_string(), explanation.to_string());
        self
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

impl TagLookup for MockTags {
    fn explain(&self, class_name: &str, _message: Option<&str>) -> Option<String> {
        self.lookups.lock().unwrap().push(class_name.to_string());
        self.explanations.get(class_name).cloned()
    }
}

// ============================================================================
// Mock Analyzer
// ============================================================================

/// Session that records inputs and emits events on demand
pub struct MockSession {
    events: Mutex<Option<mpsc::UnboundedSender<AnalysisEvent>>>,
    responder: Option<Responder>,
    inputs: Mutex<Vec<AnalysisInput>>,
    releases: AtomicUsize,
}

impl MockSession {
    fn new(events: Option<mpsc::UnboundedSender<AnalysisEvent>>, responder: Option<Responder>) -> Self {
        Self {
            events: Mutex::new(events),
            responder,
            inputs: Mutex::new(Vec::new()),
            releases: AtomicUsize::new(0),
        }
    }

    /// A session not connected to any worker
    pub fn detached() -> Self {
        Self::new(None, None)
    }

    /// Push an event as if the analyzer found it. Dropped once released.
    pub fn emit(&self, event: AnalysisEvent) {
        if let Some(events) = self.events.lock().unwrap().as_ref() {
            let _ = events.send(event);
        }
    }

    pub fn inputs(&self) -> Vec<AnalysisInput> {
        self.inputs.lock().unwrap().clone()
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn is_released(&self) -> bool {
        self.release_count() > 0
    }
}

#[async_trait]
impl AnalysisSession for MockSession {
    async fn consume(&self, input: AnalysisInput) {
        let events = self
            .responder
            .as_ref()
            .map(|respond| respond(&input))
            .unwrap_or_default();
        self.inputs.lock().unwrap().push(input);
        for event in events {
            self.emit(event);
        }
    }

    fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().take();
    }
}

/// Analyzer handing out `MockSession`s
#[derive(Default)]
pub struct MockAnalyzer {
    sessions: Mutex<Vec<Arc<MockSession>>>,
    responder: Option<Responder>,
    unavailable: bool,
}

impl MockAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `create_session` call fails
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Sessions answer each consumed input with the events `respond` returns
    pub fn with_responder(
        mut self,
        respond: impl Fn(&AnalysisInput) -> Vec<AnalysisEvent> + Send + Sync + 'static,
    ) -> Self {
        self.responder = Some(Arc::new(respond));
        self
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    /// The `index`th session created
    pub fn session(&self, index: usize) -> Arc<MockSession> {
        self.sessions.lock().unwrap()[index].clone()
    }
}

impl Analyzer for MockAnalyzer {
    fn create_session(
        &self,
        events: mpsc::UnboundedSender<AnalysisEvent>,
    ) -> Result<Arc<dyn AnalysisSession>, AnalyzerError> {
        if self.unavailable {
            return Err(AnalyzerError::Unavailable("mock analyzer offline".into()));
        }
        let session = Arc::new(MockSession::new(Some(events), self.responder.clone()));
        self.sessions.lock().unwrap().push(session.clone());
        Ok(session)
    }
}

// ============================================================================
// Mock Renderer
// ============================================================================

/// One successful renderer call
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOp {
    Send {
        message_id: u64,
        channel_id: u64,
        payload: StatusPayload,
    },
    Edit {
        message_id: u64,
        payload: StatusPayload,
    },
    React {
        channel_id: u64,
        message_id: u64,
        emoji: String,
    },
}

impl RenderOp {
    /// Payload of a send or edit
    ///
    /// # Panics
    /// On a reaction.
    pub fn payload(&self) -> &StatusPayload {
        match self {
            Self::Send { payload, .. } | Self::Edit { payload, .. } => payload,
            Self::React { .. } => panic!("reaction has no payload"),
        }
    }
}

struct RenderLog {
    ops: Mutex<Vec<RenderOp>>,
    count: watch::Sender<usize>,
}

impl RenderLog {
    fn record(&self, op: RenderOp) {
        let mut ops = self.ops.lock().unwrap();
        ops.push(op);
        self.count.send_replace(ops.len());
    }
}

/// Renderer that records every successful call
pub struct MockRenderer {
    log: Arc<RenderLog>,
    next_id: AtomicU64,
    failing_sends: AtomicUsize,
}

impl Default for MockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRenderer {
    pub fn new() -> Self {
        let (count, _) = watch::channel(0);
        Self {
            log: Arc::new(RenderLog {
                ops: Mutex::new(Vec::new()),
                count,
            }),
            next_id: AtomicU64::new(1000),
            failing_sends: AtomicUsize::new(0),
        }
    }

    /// Fail the next `n` sends; failures are not recorded
    pub fn fail_next_sends(&self, n: usize) {
        self.failing_sends.store(n, Ordering::SeqCst);
    }

    pub fn ops(&self) -> Vec<RenderOp> {
        self.log.ops.lock().unwrap().clone()
    }

    pub fn reactions(&self) -> Vec<RenderOp> {
        self.ops()
            .into_iter()
            .filter(|op| matches!(op, RenderOp::React { .. }))
            .collect()
    }

    /// Wait until at least `n` calls have been recorded
    pub async fn wait_for_ops(&self, n: usize) {
        let mut count = self.log.count.subscribe();
        let _ = count.wait_for(|c| *c >= n).await;
    }
}

#[async_trait]
impl Renderer for MockRenderer {
    async fn send(
        &self,
        _guild_id: u64,
        channel_id: u64,
        payload: &StatusPayload,
    ) -> Result<Box<dyn EditableMessage>, RenderError> {
        let failing = self
            .failing_sends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(RenderError::SendFailed {
                channel_id,
                reason: "mock send failure".into(),
            });
        }
        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.log.record(RenderOp::Send {
            message_id,
            channel_id,
            payload: payload.clone(),
        });
        Ok(Box::new(MockMessage {
            id: message_id,
            log: self.log.clone(),
        }))
    }

    async fn react(&self, channel_id: u64, message_id: u64, emoji: &str) -> Result<(), RenderError> {
        self.log.record(RenderOp::React {
            channel_id,
            message_id,
            emoji: emoji.to_string(),
        });
        Ok(())
    }
}

struct MockMessage {
    id: u64,
    log: Arc<RenderLog>,
}

#[async_trait]
impl EditableMessage for MockMessage {
    fn id(&self) -> u64 {
        self.id
    }

    async fn edit(&self, payload: &StatusPayload) -> Result<(), RenderError> {
        self.log.record(RenderOp::Edit {
            message_id: self.id,
            payload: payload.clone(),
        });
        Ok(())
    }
}

// ============================================================================
// Mock Attachments
// ============================================================================

/// Attachment with canned content, or one that always fails
#[derive(Debug)]
pub struct MockFile {
    name: String,
    bytes: Option<Vec<u8>>,
}

impl MockFile {
    pub fn new(name: &str, content: &str) -> Self {
        Self {
            name: name.to_string(),
            bytes: Some(content.as_bytes().to_vec()),
        }
    }

    /// Download always fails
    pub fn broken(name: &str) -> Self {
        Self {
            name: name.to_string(),
            bytes: None,
        }
    }
}

#[async_trait]
impl ReceivedFile for MockFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn download(&self) -> Result<Vec<u8>, DownloadError> {
        self.bytes.clone().ok_or_else(|| DownloadError::Io {
            path: self.name.clone().into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "mock download failure"),
        })
    }
}

// ============================================================================
// Test Dispatcher
// ============================================================================

/// Dispatcher wired to mocks, with handles to inspect them
pub struct TestDispatcher {
    pub dispatcher: Arc<Dispatcher<MockAnalyzer, MockRenderer, MockTags>>,
    pub analyzer: Arc<MockAnalyzer>,
    pub renderer: Arc<MockRenderer>,
    next_message_id: AtomicU64,
}

impl TestDispatcher {
    pub fn builder() -> TestDispatcherBuilder {
        TestDispatcherBuilder::new()
    }

    /// A message with a fresh id in guild 1
    pub fn message(&self, channel_id: u64, author_id: Option<u64>) -> ReceivedMessage {
        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        ReceivedMessage::new(1, channel_id, message_id, author_id)
    }
}

pub struct TestDispatcherBuilder {
    config: AutohelpConfig,
    analyzer: Option<MockAnalyzer>,
    tags: Option<MockTags>,
}

impl TestDispatcherBuilder {
    pub fn new() -> Self {
        Self {
            config: AutohelpConfig::default(),
            analyzer: None,
            tags: None,
        }
    }

    pub fn config(mut self, config: AutohelpConfig) -> Self {
        self.config = config;
        self
    }

    pub fn analyzer(mut self, analyzer: MockAnalyzer) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn tags(mut self, tags: MockTags) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn build(self) -> TestDispatcher {
        let analyzer = Arc::new(self.analyzer.unwrap_or_default());
        let renderer = Arc::new(MockRenderer::new());
        let tags = Arc::new(self.tags.unwrap_or_default());
        let dispatcher = Arc::new(Dispatcher::new(
            analyzer.clone(),
            renderer.clone(),
            tags,
            self.config,
        ));
        TestDispatcher {
            dispatcher,
            analyzer,
            renderer,
            next_message_id: AtomicU64::new(1),
        }
    }
}

impl Default for TestDispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{RootStackTrace, TraceNode};

    #[tokio::test]
    async fn test_mock_session_stops_emitting_after_release() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = MockSession::new(Some(tx), None);
        let event = || AnalysisEvent::ExceptionFound {
            exception: Arc::new(RootStackTrace::new(TraceNode::new("java.lang.Error", None))),
        };

        session.emit(event());
        session.release();
        session.emit(event());

        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_mock_renderer_failures_not_recorded() {
        let renderer = MockRenderer::new();
        renderer.fail_next_sends(1);
        let payload = StatusPayload {
            content: Some("x".into()),
            embed: None,
        };
        assert!(renderer.send(1, 2, &payload).await.is_err());
        let message = renderer.send(1, 2, &payload).await.unwrap();
        message.edit(&payload).await.unwrap();

        let ops = renderer.ops();
        assert_eq!(ops.len(), 2);
        assert!(matches!(ops[1], RenderOp::Edit { message_id, .. } if message_id == message.id()));
    }

    #[tokio::test]
    async fn test_ops_recorded_before_waiting_are_counted() {
        let renderer = MockRenderer::new();
        let payload = StatusPayload {
            content: Some("x".into()),
            embed: None,
        };
        renderer.send(1, 2, &payload).await.unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(1), renderer.wait_for_ops(1))
            .await
            .unwrap();
    }
}
