//! Tool activity indicator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of a backend tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    /// The backend announced the tool.
    Starting,
    /// The tool is running.
    Executing,
    /// The tool finished.
    Done,
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => write!(f, "starting"),
            Self::Executing => write!(f, "executing"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Transient "the assistant is doing something" notice.
///
/// Only exists between a tool start and a tool completion; never stored
/// on a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolActivity {
    /// Tool name as reported by the backend.
    pub name: String,
    /// Current phase.
    pub status: ToolStatus,
}

impl ToolActivity {
    /// Create a new activity.
    pub fn new(name: impl Into<String>, status: ToolStatus) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }

    /// Create a starting activity.
    pub fn starting(name: impl Into<String>) -> Self {
        Self::new(name, ToolStatus::Starting)
    }

    /// Create an executing activity.
    pub fn executing(name: impl Into<String>) -> Self {
        Self::new(name, ToolStatus::Executing)
    }
}

impl fmt::Display for ToolActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.status)
    }
}
