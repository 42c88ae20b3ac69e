//! Declarative rule records and the built-in rule table.
//!
//! A rule binds a case-insensitive, multi-line regex (optionally gated on a
//! [`Mode`]) to an action identifier. Rules are plain data: the built-in table
//! below and any `[[rules]]` from the config file go through the same
//! [`RuleSpec::compile`] path.

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::core::types::{Mode, action_ids};

/// Compiled, immutable rule.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Identifier used in diagnostics and logs.
    pub name: String,
    /// Higher wins; ties keep declaration order.
    pub priority: i32,
    pub pattern: Regex,
    /// Action identifier resolved against the registry at dispatch time.
    pub action: String,
    /// Rule is only eligible while the agent is in this mode.
    pub mode_required: Option<Mode>,
    /// Free-form documentation, unused by matching.
    pub notes: String,
}

impl Rule {
    /// True when the mode gate (if any) admits `mode`.
    pub fn is_eligible(&self, mode: Mode) -> bool {
        self.mode_required.is_none_or(|required| required == mode)
    }

    /// True when the pattern matches anywhere in `text`.
    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

/// Serializable form of a [`Rule`] (TOML `[[rules]]` entries).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    #[serde(default)]
    pub priority: i32,
    pub pattern: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode_required: Option<Mode>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

impl RuleSpec {
    pub fn new(name: &str, priority: i32, pattern: &str, action: &str) -> Self {
        Self {
            name: name.to_string(),
            priority,
            pattern: pattern.to_string(),
            action: action.to_string(),
            mode_required: None,
            notes: String::new(),
        }
    }

    pub fn only_in(mut self, mode: Mode) -> Self {
        self.mode_required = Some(mode);
        self
    }

    pub fn notes(mut self, notes: &str) -> Self {
        self.notes = notes.to_string();
        self
    }

    pub fn compile(&self) -> Result<Rule> {
        let pattern = compile_pattern(&self.pattern)
            .with_context(|| format!("compile pattern for rule '{}'", self.name))?;
        Ok(Rule {
            name: self.name.clone(),
            priority: self.priority,
            pattern,
            action: self.action.clone(),
            mode_required: self.mode_required,
            notes: self.notes.clone(),
        })
    }
}

/// Build a case-insensitive, multi-line regex.
pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .multi_line(true)
        .build()
        .with_context(|| format!("invalid regex '{pattern}'"))
}

/// Built-in rule table in declaration order.
///
/// Command rules anchor on `\A`: patterns are multi-line, so `^` would
/// also match a command on a later line.
pub fn builtin_specs() -> Vec<RuleSpec> {
    vec![
        RuleSpec::new(
            "help",
            100,
            r"\A\s*(/help\b|help\s*$|usage\s*$|\?\s*$)",
            action_ids::HELP,
        )
        .notes("explicit help request"),
        RuleSpec::new("show-state", 100, r"\A\s*/state\b", action_ids::SHOW_STATE),
        RuleSpec::new("set-mode", 100, r"\A\s*/mode\b", action_ids::SET_MODE),
        RuleSpec::new("cook", 90, r"\A\s*/cook\b", action_ids::COOK)
            .notes("explicit stage report over a pasted build log"),
        RuleSpec::new(
            "auto-cook",
            50,
            r"build failed|traceback \(most recent call last\)|buildozer|gradle|\bndk\b|\berror:",
            action_ids::STAGE_REPORT,
        )
        .only_in(Mode::Normal)
        .notes("pasted log without a command; restrictive mode classifies instead"),
        RuleSpec::new("greeting", 10, r"\A\s*(hi|hello|hey)\b", action_ids::HELP),
    ]
}

/// Compile the built-in table.
pub fn builtin_rules() -> Result<Vec<Rule>> {
    builtin_specs().iter().map(RuleSpec::compile).collect()
}
