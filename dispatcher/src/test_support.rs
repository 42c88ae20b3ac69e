//! Test-only helpers for constructing rules, configs and agents.

use std::path::Path;

use tempfile::TempDir;

use crate::agent::Agent;
use crate::core::rules::{Rule, RuleSpec};
use crate::core::types::Mode;
use crate::io::config::AgentConfig;

/// Compile a rule with deterministic defaults; panics on an invalid pattern.
pub fn rule(name: &str, priority: i32, pattern: &str, action: &str, mode: Option<Mode>) -> Rule {
    let spec = RuleSpec {
        mode_required: mode,
        ..RuleSpec::new(name, priority, pattern, action)
    };
    spec.compile().expect("test rule pattern")
}

/// Config persisting to `dir/state.json`.
pub fn temp_config(dir: &Path, default_mode: Mode) -> AgentConfig {
    AgentConfig {
        default_mode,
        ..AgentConfig::with_state_path(dir.join("state.json"))
    }
}

/// Agent with the built-in rule table, persisting under a fresh temp dir.
///
/// Keep the returned `TempDir` alive for as long as the agent is used.
pub fn temp_agent(default_mode: Mode) -> (TempDir, Agent) {
    let temp = tempfile::tempdir().expect("tempdir");
    let agent = Agent::new(temp_config(temp.path(), default_mode)).expect("agent");
    (temp, agent)
}
