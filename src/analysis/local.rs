//! In-process analyzer for chat text and attachments

use super::docs::DocIndex;
use super::event::{AnalysisEvent, AnalysisInput, SourceFile};
use super::parser::parse_stack_traces;
use super::trace::RootStackTrace;
use crate::error::AnalyzerError;
use crate::runtime::{AnalysisSession, Analyzer};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

const SOURCE_EXTENSIONS: &[&str] = &["java", "kt", "kts", "groovy", "scala"];
const TEXT_EXTENSIONS: &[&str] = &["txt", "log"];

/// How an attachment is analyzed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Source,
    Text,
    Ignored,
}

fn classify(name: &str) -> FileKind {
    let Some(extension) = Path::new(name).extension().and_then(|e| e.to_str()) else {
        return FileKind::Text;
    };
    let extension = extension.to_ascii_lowercase();
    if SOURCE_EXTENSIONS.contains(&extension.as_str()) {
        FileKind::Source
    } else if TEXT_EXTENSIONS.contains(&extension.as_str()) {
        FileKind::Text
    } else {
        FileKind::Ignored
    }
}

/// Parses Java stack traces and source files without leaving the process
#[derive(Debug, Clone)]
pub struct LocalAnalyzer {
    docs: Arc<DocIndex>,
}

impl LocalAnalyzer {
    pub fn new(docs: DocIndex) -> Self {
        Self {
            docs: Arc::new(docs),
        }
    }
}

impl Default for LocalAnalyzer {
    fn default() -> Self {
        Self::new(DocIndex::builtin())
    }
}

impl Analyzer for LocalAnalyzer {
    fn create_session(
        &self,
        events: mpsc::UnboundedSender<AnalysisEvent>,
    ) -> Result<Arc<dyn AnalysisSession>, AnalyzerError> {
        if events.is_closed() {
            return Err(AnalyzerError::Unavailable(
                "event receiver already dropped".to_string(),
            ));
        }
        Ok(Arc::new(LocalSession {
            docs: Arc::clone(&self.docs),
            inner: Mutex::new(SessionInner {
                events: Some(events),
                seen: Vec::new(),
                documented: HashSet::new(),
            }),
        }))
    }
}

struct SessionInner {
    /// `None` once released
    events: Option<mpsc::UnboundedSender<AnalysisEvent>>,
    seen: Vec<Arc<RootStackTrace>>,
    documented: HashSet<String>,
}

impl SessionInner {
    fn emit(&self, event: AnalysisEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    fn report_traces(&mut self, docs: &DocIndex, text: &str) {
        for trace in parse_stack_traces(text) {
            if self.seen.iter().any(|seen| seen.same_trace(&trace)) {
                continue;
            }
            let trace = Arc::new(trace);
            self.seen.push(Arc::clone(&trace));
            self.emit(AnalysisEvent::ExceptionFound {
                exception: Arc::clone(&trace),
            });

            for node in trace.nodes() {
                let Some(doc) = docs.get(&node.class_name) else {
                    continue;
                };
                if self.documented.insert(node.class_name.clone()) {
                    self.emit(AnalysisEvent::JavaDocFound {
                        exception_name: node.class_name.clone(),
                        doc: doc.clone(),
                    });
                }
            }
        }
    }
}

struct LocalSession {
    docs: Arc<DocIndex>,
    inner: Mutex<SessionInner>,
}

#[async_trait]
impl AnalysisSession for LocalSession {
    async fn consume(&self, input: AnalysisInput) {
        let mut inner = self.inner.lock().unwrap();
        if inner.events.is_none() {
            return;
        }

        match input {
            AnalysisInput::Text(text) => inner.report_traces(&self.docs, &text),
            AnalysisInput::File { name, bytes } => match classify(&name) {
                FileKind::Source => {
                    let content = String::from_utf8_lossy(&bytes).into_owned();
                    inner.emit(AnalysisEvent::SourceFileFound {
                        file: SourceFile::new(name, content),
                    });
                }
                FileKind::Text => {
                    inner.report_traces(&self.docs, &String::from_utf8_lossy(&bytes));
                }
                FileKind::Ignored => {
                    tracing::debug!(file = %name, "Ignoring attachment type");
                }
            },
        }
    }

    fn release(&self) {
        self.inner.lock().unwrap().events = None;
    }
}
