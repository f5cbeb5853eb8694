//! Java stack trace parser
//!
//! Pulls every root exception (with its `Caused by:` chain) out of free-form
//! chat text. Server log prefixes such as `[12:00:01 ERROR]: ` are tolerated.

use super::trace::{FrameLocation, RootStackTrace, StackFrame, TraceNode};
use regex::Regex;
use std::sync::LazyLock;

static LOG_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:\[[^\]]*\]:?\s*)*").expect("valid regex"));

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(?:Exception in thread "[^"]*"\s+)?(?P<kind>Caused by:\s*|Suppressed:\s*)?(?P<class>[A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)+)(?::\s?(?P<message>.*))?$"#,
    )
    .expect("valid regex")
});

static FRAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*at\s+(?:[\w.$-]+/)?(?P<target>[\w$.<>]+)\((?P<location>[^)]*)\)")
        .expect("valid regex")
});

static MORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\.\.\.\s*\d+\s+(?:more|common frames omitted)").expect("valid regex"));

#[derive(Debug)]
struct Header {
    is_cause: bool,
    node: TraceNode,
}

fn strip_log_prefix(line: &str) -> &str {
    LOG_PREFIX
        .find(line)
        .and_then(|m| line.get(m.end()..))
        .unwrap_or(line)
}

fn looks_like_throwable(class_name: &str) -> bool {
    let simple = class_name.rsplit('.').next().unwrap_or(class_name);
    simple.ends_with("Exception") || simple.ends_with("Error") || simple.ends_with("Throwable")
}

fn parse_header(line: &str) -> Option<Header> {
    let caps = HEADER.captures(strip_log_prefix(line).trim_end())?;
    let class_name = caps.name("class")?.as_str();
    let message = caps
        .name("message")
        .map(|m| m.as_str().trim().to_string())
        .filter(|m| !m.is_empty());
    Some(Header {
        is_cause: caps.name("kind").is_some(),
        node: TraceNode::new(class_name, message),
    })
}

fn parse_location(location: &str) -> FrameLocation {
    if location == "Native Method" {
        return FrameLocation::Native;
    }
    match location.rsplit_once(':') {
        Some((file, line)) => match line.trim().parse::<usize>() {
            Ok(line) if !file.is_empty() => FrameLocation::Source {
                file: file.to_string(),
                line,
            },
            _ => FrameLocation::Unknown,
        },
        None => FrameLocation::Unknown,
    }
}

fn parse_frame(line: &str) -> Option<StackFrame> {
    let caps = FRAME.captures(strip_log_prefix(line))?;
    let target = caps.name("target")?.as_str();
    let (class_name, method) = target.rsplit_once('.')?;
    let location = parse_location(caps.name("location").map_or("", |m| m.as_str()));
    Some(StackFrame::new(class_name, method, location))
}

/// Parse every stack trace in `text`, in order of appearance
pub fn parse_stack_traces(text: &str) -> Vec<RootStackTrace> {
    let lines: Vec<&str> = text.lines().collect();
    let mut traces = Vec::new();
    let mut current: Option<RootStackTrace> = None;

    for (i, line) in lines.iter().enumerate() {
        if let Some(frame) = parse_frame(line) {
            if let Some(trace) = current.as_mut() {
                trace.last_mut().frames.push(frame);
            }
            continue;
        }
        if MORE.is_match(line) {
            continue;
        }

        if let Some(header) = parse_header(line) {
            let next_is_frame = lines.get(i + 1).is_some_and(|l| parse_frame(l).is_some());
            if header.is_cause {
                if let Some(trace) = current.as_mut() {
                    let parent = trace.nodes().len() - 1;
                    trace.push_child(parent, header.node);
                    continue;
                }
            }
            if looks_like_throwable(&header.node.class_name) || next_is_frame {
                traces.extend(current.take());
                current = Some(RootStackTrace::new(header.node));
                continue;
            }
        }

        // Anything else terminates the trace in progress
        traces.extend(current.take());
    }

    traces.extend(current);
    traces
}
