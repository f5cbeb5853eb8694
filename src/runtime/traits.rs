//! Trait abstractions for the engine's collaborators
//!
//! The chat platform, the analyzer and the tag service sit behind these traits
//! so the dispatcher and conversation workers can be tested with mocks.

use crate::analysis::{AnalysisEvent, AnalysisInput};
use crate::conversation::StatusPayload;
use crate::error::{AnalyzerError, DownloadError, RenderError};
use crate::source::ReceivedMessage;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Produces analysis sessions
pub trait Analyzer: Send + Sync {
    /// Open a session whose discoveries are pushed into `events`
    fn create_session(
        &self,
        events: mpsc::UnboundedSender<AnalysisEvent>,
    ) -> Result<Arc<dyn AnalysisSession>, AnalyzerError>;
}

/// One conversation's view into the analyzer
#[async_trait]
pub trait AnalysisSession: Send + Sync {
    /// Feed raw input; results arrive asynchronously on the event channel
    async fn consume(&self, input: AnalysisInput);

    /// Stop emitting events and free resources
    fn release(&self);
}

/// Outgoing chat messages
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn send(
        &self,
        guild_id: u64,
        channel_id: u64,
        payload: &StatusPayload,
    ) -> Result<Box<dyn EditableMessage>, RenderError>;

    async fn react(&self, channel_id: u64, message_id: u64, emoji: &str)
        -> Result<(), RenderError>;
}

/// A sent message that can be edited in place
#[async_trait]
pub trait EditableMessage: Send + Sync {
    fn id(&self) -> u64;

    async fn edit(&self, payload: &StatusPayload) -> Result<(), RenderError>;
}

/// Explanations for well-known exceptions
pub trait TagLookup: Send + Sync {
    fn explain(&self, class_name: &str, message: Option<&str>) -> Option<String>;
}

/// An attachment on a received message
#[async_trait]
pub trait ReceivedFile: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    async fn download(&self) -> Result<Vec<u8>, DownloadError>;
}

/// A live stream of inbound chat messages
pub trait EventSource: Send {
    fn name(&self) -> &str;

    fn into_stream(self: Box<Self>) -> BoxStream<'static, ReceivedMessage>;
}

// ============================================================================
// Arc implementations for shared collaborators
// ============================================================================

impl<T: Analyzer + ?Sized> Analyzer for Arc<T> {
    fn create_session(
        &self,
        events: mpsc::UnboundedSender<AnalysisEvent>,
    ) -> Result<Arc<dyn AnalysisSession>, AnalyzerError> {
        (**self).create_session(events)
    }
}

#[async_trait]
impl<T: Renderer + ?Sized> Renderer for Arc<T> {
    async fn send(
        &self,
        guild_id: u64,
        channel_id: u64,
        payload: &StatusPayload,
    ) -> Result<Box<dyn EditableMessage>, RenderError> {
        (**self).send(guild_id, channel_id, payload).await
    }

    async fn react(
        &self,
        channel_id: u64,
        message_id: u64,
        emoji: &str,
    ) -> Result<(), RenderError> {
        (**self).react(channel_id, message_id, emoji).await
    }
}

impl<T: TagLookup + ?Sized> TagLookup for Arc<T> {
    fn explain(&self, class_name: &str, message: Option<&str>) -> Option<String> {
        (**self).explain(class_name, message)
    }
}
