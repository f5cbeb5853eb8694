//! Analyzer input and output types

use super::docs::Documentation;
use super::trace::RootStackTrace;
use std::sync::Arc;

/// Raw input fed into an analysis session
#[derive(Debug, Clone)]
pub enum AnalysisInput {
    /// Message text
    Text(String),
    /// A downloaded attachment
    File { name: String, bytes: Vec<u8> },
}

impl AnalysisInput {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    pub fn file(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::File {
            name: name.into(),
            bytes,
        }
    }

    /// Short label for logging
    pub fn source_type(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::File { .. } => "file",
        }
    }
}

/// A source file fragment posted by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// File name without its extension (`Main.java` -> `Main`)
    pub fn stem(&self) -> &str {
        file_stem(&self.name)
    }

    /// Trimmed 1-indexed line, `None` when out of range or blank
    pub fn line(&self, number: usize) -> Option<&str> {
        let line = self.content.lines().nth(number.checked_sub(1)?)?.trim();
        (!line.is_empty()).then_some(line)
    }
}

/// Strip the last extension from a file name
pub(crate) fn file_stem(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// Facts an analyzer discovers for a conversation
#[derive(Debug, Clone)]
pub enum AnalysisEvent {
    ExceptionFound {
        exception: Arc<RootStackTrace>,
    },
    SourceFileFound {
        file: SourceFile,
    },
    JavaDocFound {
        exception_name: String,
        doc: Documentation,
    },
    /// Anything a newer analyzer emits that this engine does not understand
    Unrecognized {
        kind: String,
    },
}

impl AnalysisEvent {
    pub fn kind(&self) -> &str {
        match self {
            Self::ExceptionFound { .. } => "exception_found",
            Self::SourceFileFound { .. } => "source_file_found",
            Self::JavaDocFound { .. } => "javadoc_found",
            Self::Unrecognized { kind } => kind,
        }
    }
}
