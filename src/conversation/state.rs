//! Accumulated facts and the derived "best current" view
//!
//! `apply` is pure with respect to I/O: it updates the fact logs, recomputes
//! the derived view and tells the worker what to do next.

use super::blocklist::is_library_package;
use super::status::{build_status, StatusPayload};
use crate::analysis::{
    file_stem, AnalysisEvent, Documentation, RootStackTrace, SourceFile, StackFrame, TraceRef,
};
use crate::runtime::TagLookup;
use std::sync::Arc;

/// A documentation match reported by the analyzer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocMatch {
    pub exception_name: String,
    pub doc: Documentation,
}

/// The single view rendered to the user
#[derive(Debug, Clone, PartialEq)]
pub struct Derived {
    pub exception: TraceRef,
    pub explanation: Option<String>,
    /// First frame that plausibly belongs to user code
    pub cause_element: Option<StackFrame>,
    pub cause_line: Option<String>,
    pub doc: Option<Documentation>,
}

/// What the documentation field currently shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocState {
    Found(Documentation),
    /// A new exception was selected recently; docs may still be on their way
    Pending,
    Missing,
}

/// What the worker should do after applying an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Event kind not understood
    Ignored,
    /// Facts recorded, but there is no exception to show yet
    NothingToRender,
    /// Render the current view; arm the documentation grace timer if asked
    Render { doc_grace: Option<u64> },
}

#[derive(Debug, Default)]
pub struct ConversationState {
    exceptions: Vec<Arc<RootStackTrace>>,
    files: Vec<SourceFile>,
    docs: Vec<DocMatch>,
    derived: Option<Derived>,
    doc_pending: bool,
    /// Bumped whenever the selected exception changes
    doc_generation: u64,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exceptions(&self) -> &[Arc<RootStackTrace>] {
        &self.exceptions
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn docs(&self) -> &[DocMatch] {
        &self.docs
    }

    pub fn derived(&self) -> Option<&Derived> {
        self.derived.as_ref()
    }

    /// Exception, documentation and cause line are all known
    pub fn is_complete(&self) -> bool {
        self.derived
            .as_ref()
            .is_some_and(|d| d.doc.is_some() && d.cause_line.is_some())
    }

    pub fn doc_state(&self) -> DocState {
        match self.derived.as_ref().and_then(|d| d.doc.clone()) {
            Some(doc) => DocState::Found(doc),
            None if self.doc_pending => DocState::Pending,
            None => DocState::Missing,
        }
    }

    /// Record one analysis fact and recompute the derived view
    pub fn apply<T: TagLookup + ?Sized>(&mut self, event: AnalysisEvent, tags: &T) -> Step {
        match event {
            AnalysisEvent::ExceptionFound { exception } => self.exceptions.push(exception),
            AnalysisEvent::SourceFileFound { file } => self.files.push(file),
            AnalysisEvent::JavaDocFound {
                exception_name,
                doc,
            } => self.docs.push(DocMatch {
                exception_name,
                doc,
            }),
            AnalysisEvent::Unrecognized { .. } => return Step::Ignored,
        }

        let Some((exception, explanation)) = select_exception(&self.exceptions, tags) else {
            return Step::NothingToRender;
        };

        let changed = self
            .derived
            .as_ref()
            .is_none_or(|previous| previous.exception != exception);
        let doc_grace = changed.then(|| {
            self.doc_generation += 1;
            self.doc_pending = true;
            self.doc_generation
        });

        let node = exception.node();
        let cause_element = node
            .frames
            .iter()
            .find(|frame| !is_library_package(frame.package()))
            .cloned();
        let doc = self
            .docs
            .iter()
            .find(|m| m.exception_name == node.class_name)
            .map(|m| m.doc.clone());
        let cause_line = cause_element
            .as_ref()
            .and_then(|frame| find_cause_line(&self.files, frame));

        self.derived = Some(Derived {
            exception,
            explanation,
            cause_element,
            cause_line,
            doc,
        });
        Step::Render { doc_grace }
    }

    /// The grace window for `generation` ran out; true if the view changed
    pub fn clear_doc_pending(&mut self, generation: u64) -> bool {
        if generation != self.doc_generation || !self.doc_pending {
            return false;
        }
        self.doc_pending = false;
        self.derived.as_ref().is_some_and(|d| d.doc.is_none())
    }

    /// Payload for the current view, `None` until an exception is known
    pub fn status(&self) -> Option<StatusPayload> {
        let derived = self.derived.as_ref()?;
        Some(build_status(derived, &self.doc_state(), self.is_complete()))
    }
}

/// First candidate with a tag explanation, else the first recorded root.
/// Within each root, children are tried before the root itself.
fn select_exception<T: TagLookup + ?Sized>(
    exceptions: &[Arc<RootStackTrace>],
    tags: &T,
) -> Option<(TraceRef, Option<String>)> {
    for root in exceptions {
        for index in root.candidates() {
            let node = &root.nodes()[index];
            if let Some(explanation) = tags.explain(&node.class_name, node.message.as_deref()) {
                return Some((TraceRef::new(Arc::clone(root), index), Some(explanation)));
            }
        }
    }
    exceptions
        .first()
        .map(|root| (TraceRef::new(Arc::clone(root), 0), None))
}

fn find_cause_line(files: &[SourceFile], frame: &StackFrame) -> Option<String> {
    let (file_name, line) = frame.source()?;
    let stem = file_stem(file_name);
    files
        .iter()
        .find(|f| f.stem() == stem)
        .and_then(|f| f.line(line))
        .map(str::to_string)
}
