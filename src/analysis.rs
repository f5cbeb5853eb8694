//! Stack trace analysis
//!
//! Types for the facts an analyzer discovers about a conversation, plus the
//! built-in analyzer that extracts them from chat messages and attachments.

mod docs;
mod event;
mod local;
mod parser;
mod trace;

pub use docs::{DocIndex, Documentation};
pub use event::{AnalysisEvent, AnalysisInput, SourceFile};
pub(crate) use event::file_stem;
pub use local::LocalAnalyzer;
pub use trace::{FrameLocation, RootStackTrace, StackFrame, TraceNode, TraceRef};
