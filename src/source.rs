//! Inbound message sources
//!
//! `LineSource` reads one JSON message per line (stdin in production). Any
//! number of sources can be merged into a single stream.

use crate::config::MAX_ATTACHMENT_BYTES;
use crate::error::DownloadError;
use crate::runtime::{EventSource, ReceivedFile};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::LinesStream;

/// An immutable chat message event
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub guild_id: u64,
    pub channel_id: u64,
    pub message_id: u64,
    /// `None` for webhook and system messages
    pub author_id: Option<u64>,
    pub content: Option<String>,
    pub files: Vec<Arc<dyn ReceivedFile>>,
}

impl ReceivedMessage {
    pub fn new(guild_id: u64, channel_id: u64, message_id: u64, author_id: Option<u64>) -> Self {
        Self {
            guild_id,
            channel_id,
            message_id,
            author_id,
            content: None,
            files: Vec::new(),
        }
    }

    #[allow(dead_code)] // Used by tests and embedders building messages by hand
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    #[allow(dead_code)] // Used by tests and embedders building messages by hand
    pub fn with_file(mut self, file: Arc<dyn ReceivedFile>) -> Self {
        self.files.push(file);
        self
    }
}

// ============================================================================
// Attachments
// ============================================================================

/// Attachment fetched over HTTP
#[derive(Debug)]
pub struct UrlFile {
    name: String,
    url: String,
    client: reqwest::Client,
}

impl UrlFile {
    pub fn new(name: impl Into<String>, url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            client,
        }
    }
}

#[async_trait]
impl ReceivedFile for UrlFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn download(&self) -> Result<Vec<u8>, DownloadError> {
        let http = |source| DownloadError::Http {
            name: self.name.clone(),
            source,
        };
        let mut response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(http)?;
        if response
            .content_length()
            .is_some_and(|len| len > MAX_ATTACHMENT_BYTES as u64)
        {
            return Err(DownloadError::TooLarge {
                name: self.name.clone(),
                limit: MAX_ATTACHMENT_BYTES,
            });
        }
        // Chunked responses carry no length, so enforce the cap while reading
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(http)? {
            if body.len() + chunk.len() > MAX_ATTACHMENT_BYTES {
                return Err(DownloadError::TooLarge {
                    name: self.name.clone(),
                    limit: MAX_ATTACHMENT_BYTES,
                });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

/// Attachment stored on local disk
#[derive(Debug)]
pub struct DiskFile {
    name: String,
    path: PathBuf,
}

impl DiskFile {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

#[async_trait]
impl ReceivedFile for DiskFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn download(&self) -> Result<Vec<u8>, DownloadError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| DownloadError::Io {
                path: self.path.clone(),
                source,
            })?;
        if bytes.len() > MAX_ATTACHMENT_BYTES {
            return Err(DownloadError::TooLarge {
                name: self.name.clone(),
                limit: MAX_ATTACHMENT_BYTES,
            });
        }
        Ok(bytes)
    }
}

/// Attachment whose content came with the message
#[derive(Debug)]
pub struct InlineFile {
    name: String,
    bytes: Vec<u8>,
}

impl InlineFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

#[async_trait]
impl ReceivedFile for InlineFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn download(&self) -> Result<Vec<u8>, DownloadError> {
        Ok(self.bytes.clone())
    }
}

// ============================================================================
// JSON lines
// ============================================================================

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    guild_id: u64,
    channel_id: u64,
    #[serde(default)]
    message_id: u64,
    #[serde(default)]
    author_id: Option<u64>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    attachments: Vec<WireAttachment>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireAttachment {
    Url { name: String, url: String },
    Path { name: String, path: PathBuf },
    Inline { name: String, text: String },
}

impl WireMessage {
    fn into_message(self, client: &reqwest::Client) -> ReceivedMessage {
        let files = self
            .attachments
            .into_iter()
            .map(|attachment| -> Arc<dyn ReceivedFile> {
                match attachment {
                    WireAttachment::Url { name, url } => {
                        Arc::new(UrlFile::new(name, url, client.clone()))
                    }
                    WireAttachment::Path { name, path } => Arc::new(DiskFile::new(name, path)),
                    WireAttachment::Inline { name, text } => {
                        Arc::new(InlineFile::new(name, text.into_bytes()))
                    }
                }
            })
            .collect();
        ReceivedMessage {
            guild_id: self.guild_id,
            channel_id: self.channel_id,
            message_id: self.message_id,
            author_id: self.author_id,
            content: self.content,
            files,
        }
    }
}

/// Parse one JSON line into a message
pub fn parse_line(line: &str, client: &reqwest::Client) -> Result<ReceivedMessage, serde_json::Error> {
    serde_json::from_str::<WireMessage>(line).map(|wire| wire.into_message(client))
}

/// Reads newline-delimited JSON messages from any async reader
pub struct LineSource<R> {
    name: String,
    reader: R,
    client: reqwest::Client,
}

impl LineSource<BufReader<tokio::io::Stdin>> {
    pub fn stdin(client: reqwest::Client) -> Self {
        Self::new("stdin", BufReader::new(tokio::io::stdin()), client)
    }
}

impl<R> LineSource<R>
where
    R: AsyncBufRead + Send + Unpin + 'static,
{
    pub fn new(name: impl Into<String>, reader: R, client: reqwest::Client) -> Self {
        Self {
            name: name.into(),
            reader,
            client,
        }
    }
}

impl<R> EventSource for LineSource<R>
where
    R: AsyncBufRead + Send + Unpin + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn into_stream(self: Box<Self>) -> BoxStream<'static, ReceivedMessage> {
        let LineSource {
            name,
            reader,
            client,
        } = *self;
        LinesStream::new(reader.lines())
            .filter_map(move |line| {
                let parsed = match line {
                    Ok(line) if line.trim().is_empty() => None,
                    Ok(line) => match parse_line(&line, &client) {
                        Ok(message) => Some(message),
                        Err(e) => {
                            tracing::warn!(source = %name, error = %e, "Skipping malformed message line");
                            None
                        }
                    },
                    Err(e) => {
                        tracing::error!(source = %name, error = %e, "Failed to read message line");
                        None
                    }
                };
                futures::future::ready(parsed)
            })
            .boxed()
    }
}

/// Merge sources into one stream, keeping only messages `accept` admits
pub fn merge_sources(
    sources: Vec<Box<dyn EventSource>>,
    accept: impl Fn(&ReceivedMessage) -> bool + Send + 'static,
) -> BoxStream<'static, ReceivedMessage> {
    for source in &sources {
        tracing::info!(source = %source.name(), "Listening for messages");
    }
    stream::select_all(sources.into_iter().map(EventSource::into_stream))
        .filter(move |message| futures::future::ready(accept(message)))
        .boxed()
}
