//! Shared deterministic types for the dispatch core.
//!
//! These types define stable contracts between core components. They should not
//! depend on external state or I/O and must remain deterministic across runs.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Coarse operating state that gates rule eligibility and policy enforcement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Normal,
    /// Replies are limited to a single actionable directive.
    Restrictive,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Normal, Mode::Restrictive];

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::Restrictive => "restrictive",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(raw: &str) -> Result<Self> {
        let token = raw.trim();
        Mode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(token))
            .ok_or_else(|| anyhow!("unknown mode '{token}'"))
    }
}

/// Action identifiers understood by the built-in registry.
pub mod action_ids {
    pub const HELP: &str = "help";
    pub const SET_MODE: &str = "setMode";
    pub const SHOW_STATE: &str = "showState";
    pub const STAGE_REPORT: &str = "stageReport";
    /// Alias of [`STAGE_REPORT`].
    pub const COOK: &str = "cook";
    pub const RESTRICTIVE_CLASSIFY: &str = "restrictiveClassify";
}

/// Structured reply produced by an action handler.
///
/// Created fresh for every dispatch. The guardrail may append notices to
/// `text`; nothing else rewrites it.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ActionResult {
    /// Rendered reply.
    pub text: String,
    /// Identifier of the handler that produced this result, if any.
    pub action_id: Option<String>,
    /// Structured diagnostics for optional debug rendering.
    pub metadata: BTreeMap<String, Value>,
}

impl ActionResult {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn from_action(action_id: &str, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action_id: Some(action_id.to_string()),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}
