//! JSON lines renderer
//!
//! Each send, edit or reaction becomes one JSON object on its own line, for a
//! chat bridge (or a human) to pick up.

use crate::conversation::StatusPayload;
use crate::error::RenderError;
use crate::runtime::{EditableMessage, Renderer};
use async_trait::async_trait;
use serde::Serialize;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Operation<'a> {
    Send {
        guild_id: u64,
        channel_id: u64,
        message_id: u64,
        payload: &'a StatusPayload,
    },
    Edit {
        message_id: u64,
        payload: &'a StatusPayload,
    },
    React {
        channel_id: u64,
        message_id: u64,
        emoji: &'a str,
    },
}

fn write_line<W: Write>(out: &Mutex<W>, op: &Operation<'_>) -> Result<(), String> {
    let mut line = serde_json::to_vec(op).map_err(|e| e.to_string())?;
    line.push(b'\n');
    let mut out = out.lock().unwrap();
    out.write_all(&line).map_err(|e| e.to_string())?;
    out.flush().map_err(|e| e.to_string())
}

/// Renderer writing operations to any `Write` sink
pub struct JsonLinesRenderer<W> {
    out: Arc<Mutex<W>>,
    next_id: AtomicU64,
}

/// Renderer used by the binary
pub type StdoutRenderer = JsonLinesRenderer<std::io::Stdout>;

impl StdoutRenderer {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send + 'static> JsonLinesRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Arc::new(Mutex::new(out)),
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl<W: Write + Send + 'static> Renderer for JsonLinesRenderer<W> {
    async fn send(
        &self,
        guild_id: u64,
        channel_id: u64,
        payload: &StatusPayload,
    ) -> Result<Box<dyn EditableMessage>, RenderError> {
        let message_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let op = Operation::Send {
            guild_id,
            channel_id,
            message_id,
            payload,
        };
        write_line(&self.out, &op)
            .map_err(|reason| RenderError::SendFailed { channel_id, reason })?;
        Ok(Box::new(JsonLinesMessage {
            id: message_id,
            out: Arc::clone(&self.out),
        }))
    }

    async fn react(&self, channel_id: u64, message_id: u64, emoji: &str) -> Result<(), RenderError> {
        let op = Operation::React {
            channel_id,
            message_id,
            emoji,
        };
        write_line(&self.out, &op).map_err(|reason| RenderError::ReactFailed { message_id, reason })
    }
}

struct JsonLinesMessage<W> {
    id: u64,
    out: Arc<Mutex<W>>,
}

#[async_trait]
impl<W: Write + Send + 'static> EditableMessage for JsonLinesMessage<W> {
    fn id(&self) -> u64 {
        self.id
    }

    async fn edit(&self, payload: &StatusPayload) -> Result<(), RenderError> {
        let op = Operation::Edit {
            message_id: self.id,
            payload,
        };
        write_line(&self.out, &op).map_err(|reason| RenderError::EditFailed {
            message_id: self.id,
            reason,
        })
    }
}
