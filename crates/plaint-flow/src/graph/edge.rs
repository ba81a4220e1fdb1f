use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Label returned by a node's finalize phase; selects the outgoing edge.
///
/// Labels are produced by nodes, not declared to the engine. A label with no
/// registered edge simply ends the run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(Cow<'static, str>);

impl Action {
    /// The generic label nodes return when they have nothing to decide.
    pub const DEFAULT: Action = Action::from_static("default");

    pub const fn from_static(label: &'static str) -> Self {
        Self(Cow::Borrowed(label))
    }

    pub fn new(label: impl Into<String>) -> Self {
        Self(Cow::Owned(label.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Action {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<&'static str> for Action {
    fn from(label: &'static str) -> Self {
        Self::from_static(label)
    }
}

impl From<String> for Action {
    fn from(label: String) -> Self {
        Self::new(label)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
