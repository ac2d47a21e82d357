//! The `.current` sidecar: a YAML pointer to the newest handoff.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{FailOpen, HookError, Result};
use crate::util::{read_to_string_limited, write_atomic};

/// How much detail a handoff carries.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum HandoffMode {
    #[default]
    Quick,
    Detailed,
    Team,
}

impl fmt::Display for HandoffMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Quick => "quick",
            Self::Detailed => "detailed",
            Self::Team => "team",
        };
        f.write_str(name)
    }
}

/// Sidecar contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffMetadata {
    /// File name of the newest handoff in the active directory.
    pub current: String,
    pub created: DateTime<Local>,
    pub model: String,
    pub token_estimate: usize,
    pub files_modified: usize,
    pub mode: HandoffMode,
}

impl HandoffMetadata {
    /// Read the sidecar. Missing or unreadable sidecars yield `None`.
    pub fn read(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        Self::try_read(path).fail_open_default("reading handoff metadata")
    }

    fn try_read(path: &Path) -> Result<Option<Self>> {
        parse_sidecar(path).map(Some)
    }

    /// Only the `current` pointer.
    ///
    /// Sidecars written by other tools may carry different or extra fields;
    /// the pointer is all `latest` needs.
    pub fn read_current(path: &Path) -> Option<String> {
        if !path.exists() {
            return None;
        }
        parse_sidecar::<Pointer>(path)
            .map(|p| Some(p.current))
            .fail_open_default("reading handoff pointer")
    }

    /// Replace the sidecar atomically.
    pub fn write(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        write_atomic(path, &yaml)
    }
}

#[derive(Deserialize)]
struct Pointer {
    current: String,
}

fn parse_sidecar<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = read_to_string_limited(path)?;
    serde_yaml::from_str(&text).map_err(|e| {
        HookError::handoff(format!("corrupt metadata {}: {}", path.display(), e))
    })
}

/// True for a bare file name with no directory components.
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name)
        && name != "."
        && name != ".."
}
