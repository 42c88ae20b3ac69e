//! Persisted agent state (`.dispatcher/state.json`).

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::core::types::Mode;
use crate::io::write_atomic;

/// Keys with this prefix are internal bookkeeping and never shown to users.
pub const PRIVATE_KEY_PREFIX: char = '_';

/// Small key-value state blob persisted between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentState {
    /// Current operating mode; `None` until first set or loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    /// Any other keys, kept verbatim across load/save.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl AgentState {
    pub fn with_mode(mode: Mode) -> Self {
        Self {
            mode: Some(mode),
            extra: BTreeMap::new(),
        }
    }

    /// State as a JSON object without private keys. `mode` resolves to
    /// `default_mode` when unset.
    pub fn visible(&self, default_mode: Mode) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(
            "mode".to_string(),
            Value::String(self.mode.unwrap_or(default_mode).to_string()),
        );
        for (key, value) in &self.extra {
            if !key.starts_with(PRIVATE_KEY_PREFIX) {
                map.insert(key.clone(), value.clone());
            }
        }
        map
    }
}

/// File-backed store; a disabled store never touches the filesystem.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
    enabled: bool,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            path: path.into(),
            enabled,
        }
    }

    /// Load state from disk.
    ///
    /// Returns `Ok(None)` when persistence is disabled or no file exists yet.
    /// An unreadable or corrupt file is an error; callers decide whether to
    /// fall back to defaults.
    pub fn load(&self) -> Result<Option<AgentState>> {
        if !self.enabled {
            return Ok(None);
        }
        debug!(path = %self.path.display(), "loading agent state");
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no agent state yet");
                return Ok(None);
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("read agent state {}", self.path.display()));
            }
        };
        let state: AgentState = serde_json::from_str(&contents)
            .with_context(|| format!("parse agent state {}", self.path.display()))?;
        debug!(mode = ?state.mode, keys = state.extra.len(), "agent state loaded");
        Ok(Some(state))
    }

    /// Atomically write state to disk (temp file + rename).
    pub fn save(&self, state: &AgentState) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        debug!(path = %self.path.display(), mode = ?state.mode, "writing agent state");
        let mut buf = serde_json::to_string_pretty(state)?;
        buf.push('\n');
        write_atomic(&self.path, &buf)
            .with_context(|| format!("save agent state {}", self.path.display()))
    }
}
