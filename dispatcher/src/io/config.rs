//! Agent configuration stored at `.dispatcher/config.toml`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::guardrail::Policy;
use crate::core::rules::RuleSpec;
use crate::core::types::Mode;
use crate::io::write_atomic;

pub const DEFAULT_CONFIG_PATH: &str = ".dispatcher/config.toml";
pub const DEFAULT_STATE_PATH: &str = ".dispatcher/state.json";

/// Composition root for the agent (TOML).
///
/// Created once at process start and never mutated afterwards. Missing
/// fields take the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Where the state store reads and writes.
    pub state_path: PathBuf,

    /// When false, state lives in memory for the process lifetime only.
    pub persist: bool,

    /// Mode used when no state has been persisted yet.
    pub default_mode: Mode,

    /// Directive lines allowed per reply in restrictive mode.
    pub max_directives: usize,

    /// Render the metadata bag alongside replies.
    pub debug: bool,

    pub policy: Policy,

    /// Extra rules appended after the built-in table.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleSpec>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            persist: true,
            default_mode: Mode::Normal,
            max_directives: 1,
            debug: false,
            policy: Policy::default(),
            rules: Vec::new(),
        }
    }
}

impl AgentConfig {
    /// In-memory configuration rooted at `state_path`.
    pub fn with_state_path(state_path: impl Into<PathBuf>) -> Self {
        Self {
            state_path: state_path.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_directives == 0 {
            return Err(anyhow!("max_directives must be > 0"));
        }
        if self.state_path.as_os_str().is_empty() {
            return Err(anyhow!("state_path must not be empty"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AgentConfig::default()`.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    let cfg = match fs::read_to_string(path) {
        Ok(contents) => toml::from_str::<AgentConfig>(&contents)
            .with_context(|| format!("parse config {}", path.display()))?,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file, using defaults");
            AgentConfig::default()
        }
        Err(err) => {
            return Err(err).with_context(|| format!("read config {}", path.display()));
        }
    };
    cfg.validate().with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Validate and write `cfg` as TOML, replacing any existing file atomically.
pub fn write_config(path: &Path, cfg: &AgentConfig) -> Result<()> {
    cfg.validate()?;
    let body = toml::to_string_pretty(cfg).context("serialize config")?;
    write_atomic(path, &format!("{body}\n"))
        .with_context(|| format!("save config {}", path.display()))
}
