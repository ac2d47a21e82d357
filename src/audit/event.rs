//! Audit hook input.

use std::path::PathBuf;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{HookError, Result};

/// The tool call being audited. Only the fields the log needs are kept.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolInput {
    #[serde(deserialize_with = "lenient_text")]
    pub command: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub description: Option<String>,
}

/// One event delivered on stdin. Unknown keys are ignored, and values of an
/// unexpected type are kept as text rather than rejected.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AuditEvent {
    #[serde(deserialize_with = "lenient_text")]
    pub cwd: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub session_id: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub hook_event_name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub tool_name: Option<String>,
    #[serde(deserialize_with = "lenient_tool_input")]
    pub tool_input: ToolInput,
}

/// Strings as-is, `null` as absent, anything else as its JSON text.
fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

/// An object is read field by field; any other value means no tool input.
fn lenient_tool_input<'de, D>(deserializer: D) -> std::result::Result<ToolInput, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => {
            serde_json::from_value(value).map_err(serde::de::Error::custom)
        }
        _ => Ok(ToolInput::default()),
    }
}

impl AuditEvent {
    /// Parse stdin. Anything but a JSON object is invalid input.
    pub fn parse(input: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(input)
            .map_err(|e| HookError::invalid_input(format!("invalid JSON input: {}", e)))?;
        if !value.is_object() {
            return Err(HookError::invalid_input(
                "invalid JSON input: expected an object",
            ));
        }
        serde_json::from_value(value)
            .map_err(|e| HookError::invalid_input(format!("invalid JSON input: {}", e)))
    }

    /// The `cwd` key, when present and non-empty.
    pub fn cwd_path(&self) -> Option<PathBuf> {
        self.cwd
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(PathBuf::from)
    }

    /// First eight characters of the session id.
    pub fn short_session(&self) -> String {
        self.session_id
            .as_deref()
            .unwrap_or("unknown")
            .chars()
            .take(8)
            .collect()
    }
}
