//! Tag lookup: short explanations for well-known exceptions

use crate::error::TagError;
use crate::runtime::TagLookup;
use serde::Deserialize;
use std::path::Path;

/// A canned explanation keyed on an exception class
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TagDef {
    pub name: String,
    /// Fully qualified or simple class name
    pub exception: String,
    /// Only match when the exception message contains this text
    #[serde(default)]
    pub message_contains: Option<String>,
    pub explanation: String,
}

impl TagDef {
    fn matches(&self, class_name: &str, message: Option<&str>) -> bool {
        let simple = class_name.rsplit('.').next().unwrap_or(class_name);
        if self.exception != class_name && self.exception != simple {
            return false;
        }
        match &self.message_contains {
            None => true,
            Some(needle) => message.is_some_and(|m| m.contains(needle.as_str())),
        }
    }
}

/// In-memory tag table; earlier tags win
#[derive(Debug, Clone, Default)]
pub struct StaticTags {
    tags: Vec<TagDef>,
}

fn tag(name: &str, exception: &str, message_contains: Option<&str>, explanation: &str) -> TagDef {
    TagDef {
        name: name.to_string(),
        exception: exception.to_string(),
        message_contains: message_contains.map(str::to_string),
        explanation: explanation.to_string(),
    }
}

impl StaticTags {
    pub fn new(tags: Vec<TagDef>) -> Self {
        Self { tags }
    }

    pub fn builtin() -> Self {
        Self::new(vec![
            tag(
                "pluginyml",
                "org.bukkit.plugin.InvalidPluginException",
                Some("plugin.yml"),
                "Your plugin jar has no valid `plugin.yml`. Make sure it sits in `src/main/resources` and is packaged into the jar.",
            ),
            tag(
                "classversion",
                "java.lang.UnsupportedClassVersionError",
                None,
                "The plugin was compiled for a newer Java version than the server runs. Lower the target version or update Java.",
            ),
            tag(
                "shading",
                "java.lang.NoClassDefFoundError",
                None,
                "A class available at compile time is missing at runtime. Shade the dependency into your jar or declare it as a plugin dependency.",
            ),
            tag(
                "shading",
                "java.lang.ClassNotFoundException",
                None,
                "A class could not be found at runtime. Shade the dependency into your jar or declare it as a plugin dependency.",
            ),
            tag(
                "asyncaccess",
                "org.bukkit.plugin.IllegalPluginAccessException",
                None,
                "A task was scheduled while the plugin was disabled. Cancel your tasks in `onDisable` instead of scheduling new ones.",
            ),
            tag(
                "cme",
                "java.util.ConcurrentModificationException",
                None,
                "A collection was modified while it was being iterated. Use an `Iterator` and its `remove()` or collect changes and apply them afterwards.",
            ),
            tag(
                "npe",
                "java.lang.NullPointerException",
                None,
                "Something on the highlighted line was `null`. Check which value can be missing and guard against it.",
            ),
            tag(
                "parseint",
                "java.lang.NumberFormatException",
                None,
                "A string that is not a number was parsed as one. Validate user input before calling `parseInt`.",
            ),
        ])
    }

    /// Load tags from a JSON array file
    pub fn load(path: &Path) -> Result<Self, TagError> {
        let text = std::fs::read_to_string(path).map_err(|source| TagError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let tags = serde_json::from_str(&text).map_err(|source| TagError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(tags))
    }

    /// File tags take precedence over the built-in ones
    pub fn merged_with(mut self, other: StaticTags) -> Self {
        self.tags.extend(other.tags);
        self
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl TagLookup for StaticTags {
    fn explain(&self, class_name: &str, message: Option<&str>) -> Option<String> {
        self.tags
            .iter()
            .find(|t| t.matches(class_name, message))
            .map(|t| t.explanation.clone())
    }
}
