//! Status message payload

use super::state::{Derived, DocState};
use serde::Serialize;

const COLOR_IN_PROGRESS: u32 = 0x00F1_C40F;
const COLOR_COMPLETE: u32 = 0x002E_CC71;

/// Outgoing (or edited) chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed: Option<Embed>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
}

impl Embed {
    /// Field value by name
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

/// Build the status message for the current derived view
pub fn build_status(derived: &Derived, doc: &DocState, complete: bool) -> StatusPayload {
    let node = derived.exception.node();

    let description = [node.message.as_deref(), derived.explanation.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("\n\n");
    let content = derived
        .explanation
        .is_none()
        .then(|| format!("Unknown exception `{}`", node.simple_name()));

    let mut fields = Vec::new();
    let (doc_value, url) = match doc {
        DocState::Found(doc) => (
            format!("{}\n[{}]({})", doc.summary, node.simple_name(), doc.url),
            Some(doc.url.clone()),
        ),
        DocState::Pending => ("Looking for documentation…".to_string(), None),
        DocState::Missing => ("No documentation found".to_string(), None),
    };
    fields.push(EmbedField {
        name: "Documentation".to_string(),
        value: doc_value,
    });

    if let Some(frame) = &derived.cause_element {
        let mut value = format!("`{frame}`");
        if let Some(line) = &derived.cause_line {
            value.push_str(&format!("\n```java\n{line}\n```"));
        }
        fields.push(EmbedField {
            name: "Caused by".to_string(),
            value,
        });
    }

    let footer = if complete {
        Some("Conversation complete".to_string())
    } else {
        derived
            .cause_element
            .as_ref()
            .filter(|_| derived.cause_line.is_none())
            .and_then(|frame| frame.source())
            .map(|(file, line)| format!("Upload {file} to see line {line}"))
    };

    StatusPayload {
        content,
        embed: Some(Embed {
            title: node.class_name.clone(),
            description: (!description.is_empty()).then_some(description),
            url,
            color: if complete {
                COLOR_COMPLETE
            } else {
                COLOR_IN_PROGRESS
            },
            fields,
            footer,
        }),
    }
}
