//! Property-based tests for conversation state
//!
//! These tests verify the derived view is consistent across event orders
//! and trace shapes.

use super::blocklist::is_library_package;
use super::state::*;
use crate::analysis::{
    AnalysisEvent, Documentation, FrameLocation, RootStackTrace, SourceFile, StackFrame, TraceNode,
};
use crate::runtime::testing::MockTags;
use proptest::prelude::*;
use std::sync::Arc;

// ============================================================================
// Test Helpers
// ============================================================================

const EXCEPTION: &str = "java.lang.IllegalStateException";

fn doc_event(class_name: &str) -> AnalysisEvent {
    AnalysisEvent::JavaDocFound {
        exception_name: class_name.to_string(),
        doc: Documentation {
            class_name: class_name.to_string(),
            url: format!("https://docs.example.invalid/{class_name}"),
            summary: "summary".to_string(),
        },
    }
}

fn apply_all(events: Vec<AnalysisEvent>, tags: &MockTags) -> ConversationState {
    let mut state = ConversationState::new();
    for event in events {
        state.apply(event, tags);
    }
    state
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_package() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("java.util"),
        Just("java.lang.reflect"),
        Just("org.bukkit.plugin"),
        Just("net.minecraft.server"),
        Just("io.netty.channel"),
        Just("com.example"),
        Just("me.player.plugin"),
    ]
}

fn arb_frame() -> impl Strategy<Value = StackFrame> {
    (arb_package(), prop_oneof![Just("Main"), Just("Util"), Just("Handler")], 1usize..6)
        .prop_map(|(package, class, line)| {
            StackFrame::new(
                format!("{package}.{class}"),
                "run",
                FrameLocation::Source {
                    file: format!("{class}.java"),
                    line,
                },
            )
        })
}

fn arb_trace() -> impl Strategy<Value = Arc<RootStackTrace>> {
    proptest::collection::vec(arb_frame(), 0..6).prop_map(|frames| {
        let mut node = TraceNode::new(EXCEPTION, Some("bad state".to_string()));
        node.frames = frames;
        Arc::new(RootStackTrace::new(node))
    })
}

fn arb_source_file() -> impl Strategy<Value = SourceFile> {
    (
        prop_oneof![Just("Main.java"), Just("Util.java"), Just("Other.kt")],
        arb_lines(),
    )
        .prop_map(|(name, content)| SourceFile::new(name, content))
}

fn arb_fact() -> impl Strategy<Value = AnalysisEvent> {
    prop_oneof![
        arb_source_file().prop_map(|file| AnalysisEvent::SourceFileFound { file }),
        prop_oneof![
            Just(EXCEPTION),
            Just("java.lang.NullPointerException"),
        ]
        .prop_map(doc_event),
    ]
}

fn arb_lines() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-z ;()]{0,12}", 0..6).prop_map(|lines| lines.join("\n"))
}

/// At most one file per stem and one doc per class
fn arb_unique_facts() -> impl Strategy<Value = Vec<AnalysisEvent>> {
    (
        proptest::option::of(arb_lines()),
        proptest::option::of(arb_lines()),
        proptest::option::of(arb_lines()),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(main, util, other, ise_doc, npe_doc)| {
            let files = [("Main.java", main), ("Util.java", util), ("Other.kt", other)];
            let mut events: Vec<AnalysisEvent> = files
                .into_iter()
                .filter_map(|(name, content)| {
                    content.map(|content| AnalysisEvent::SourceFileFound {
                        file: SourceFile::new(name, content),
                    })
                })
                .collect();
            if ise_doc {
                events.push(doc_event(EXCEPTION));
            }
            if npe_doc {
                events.push(doc_event("java.lang.NullPointerException"));
            }
            events
        })
}

/// Exception and facts, then the same events in a shuffled order
fn arb_event_orders() -> impl Strategy<Value = (Vec<AnalysisEvent>, Vec<AnalysisEvent>)> {
    (arb_trace(), arb_unique_facts()).prop_flat_map(|(trace, facts)| {
        let mut events = vec![AnalysisEvent::ExceptionFound { exception: trace }];
        events.extend(facts);
        (Just(events.clone()), Just(events).prop_shuffle())
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_view_independent_of_event_order((ordered, shuffled) in arb_event_orders()) {
        let tags = MockTags::new();
        let a = apply_all(ordered, &tags);
        let b = apply_all(shuffled, &tags);
        prop_assert_eq!(a.derived(), b.derived());
        prop_assert_eq!(a.is_complete(), b.is_complete());
    }

    #[test]
    fn prop_complete_iff_doc_and_cause_line(
        trace in arb_trace(),
        facts in proptest::collection::vec(arb_fact(), 0..8),
    ) {
        let has_doc = facts.iter().any(|event| matches!(
            event,
            AnalysisEvent::JavaDocFound { exception_name, .. } if exception_name == EXCEPTION
        ));
        let mut events = vec![AnalysisEvent::ExceptionFound { exception: trace }];
        events.extend(facts);

        let state = apply_all(events, &MockTags::new());
        let derived = state.derived().unwrap();
        prop_assert_eq!(derived.doc.is_some(), has_doc);
        prop_assert_eq!(
            state.is_complete(),
            derived.doc.is_some() && derived.cause_line.is_some()
        );
        if let Some(line) = &derived.cause_line {
            prop_assert!(!line.trim().is_empty());
            prop_assert!(derived.cause_element.is_some());
        }
    }

    #[test]
    fn prop_cause_element_is_first_user_frame(trace in arb_trace()) {
        let expected = trace
            .root()
            .frames
            .iter()
            .find(|frame| !is_library_package(frame.package()))
            .cloned();

        let state = apply_all(vec![AnalysisEvent::ExceptionFound { exception: trace }], &MockTags::new());
        let derived = state.derived().unwrap();
        if let Some(frame) = &derived.cause_element {
            prop_assert!(!is_library_package(frame.package()));
        }
        prop_assert_eq!(derived.cause_element.clone(), expected);
    }

    /// The first tagged node in children-then-root order wins
    #[test]
    fn prop_children_selected_before_root(
        depth in 1usize..6,
        tagged in proptest::collection::vec(any::<bool>(), 6),
    ) {
        let class = |i: usize| format!("com.example.Failure{i}Exception");
        let mut trace = RootStackTrace::new(TraceNode::new(class(0), None));
        for i in 1..depth {
            trace.push_child(i - 1, TraceNode::new(class(i), None));
        }
        let mut tags = MockTags::new();
        for i in (0..depth).filter(|&i| tagged[i]) {
            tags = tags.with(&class(i), "tagged");
        }
        let expected = (1..depth).chain(std::iter::once(0)).find(|&i| tagged[i]);

        let state = apply_all(vec![AnalysisEvent::ExceptionFound { exception: Arc::new(trace) }], &tags);
        let derived = state.derived().unwrap();
        match expected {
            Some(index) => {
                prop_assert_eq!(derived.exception.index, index);
                prop_assert_eq!(derived.explanation.as_deref(), Some("tagged"));
            }
            None => {
                prop_assert_eq!(derived.exception.index, 0);
                prop_assert_eq!(derived.explanation.clone(), None);
            }
        }
    }
}
