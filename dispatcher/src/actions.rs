//! Action registry and the built-in handlers.
//!
//! A handler turns agent state plus the raw input into an [`ActionResult`].
//! Handlers never fail: malformed input is answered with an explanatory
//! message instead.

use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::agent::Agent;
use crate::core::classifier::classify;
use crate::core::stages::{StageReport, locate};
use crate::core::types::{ActionResult, Mode, action_ids};

/// Handler signature shared by every registered action.
pub type Handler = fn(&mut Agent, &str) -> ActionResult;

pub const MODE_COMMAND: &str = "/mode";
pub const COOK_COMMAND: &str = "/cook";

const HELP_TEXT: &str = "\
Commands:
  /help            show this summary
  /state           show the current agent state
  /mode <name>     switch mode (normal, restrictive)
  /cook <log>      locate the failing build stage in a pasted log
Other text is matched against the rule table. In restrictive mode,
unmatched text is classified and answered with a single next step.";

/// Explicit mapping from action identifier to handler.
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    handlers: BTreeMap<&'static str, Handler>,
}

impl ActionRegistry {
    /// Registry with every built-in handler (and the `cook` alias).
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        registry.register(action_ids::HELP, help);
        registry.register(action_ids::SET_MODE, set_mode);
        registry.register(action_ids::SHOW_STATE, show_state);
        registry.register(action_ids::STAGE_REPORT, stage_report);
        registry.register(action_ids::COOK, stage_report);
        registry.register(action_ids::RESTRICTIVE_CLASSIFY, restrictive_classify);
        registry
    }

    pub fn register(&mut self, id: &'static str, handler: Handler) {
        self.handlers.insert(id, handler);
    }

    pub fn get(&self, id: &str) -> Option<Handler> {
        self.handlers.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.handlers.contains_key(id)
    }

    /// Registered identifiers in sorted order.
    pub fn ids(&self) -> Vec<&'static str> {
        self.handlers.keys().copied().collect()
    }
}

pub fn help(_agent: &mut Agent, _input: &str) -> ActionResult {
    ActionResult::from_action(action_ids::HELP, HELP_TEXT)
}

/// `/mode <name>`: switch and persist the operating mode.
///
/// Unknown names leave state untouched.
pub fn set_mode(agent: &mut Agent, input: &str) -> ActionResult {
    let current = agent.mode();
    let Some(token) = strip_command(input, MODE_COMMAND).split_whitespace().next() else {
        return ActionResult::from_action(
            action_ids::SET_MODE,
            format!("Usage: /mode <{}>. Current mode: {current}.", mode_names()),
        );
    };

    match token.parse::<Mode>() {
        Err(_) => ActionResult::from_action(
            action_ids::SET_MODE,
            format!(
                "Unknown mode '{token}'. Expected one of: {}. Mode stays {current}.",
                mode_names()
            ),
        )
        .with_meta("rejected_mode", token),
        Ok(mode) if mode == current => ActionResult::from_action(
            action_ids::SET_MODE,
            format!("Mode is already {mode}."),
        ),
        Ok(mode) => {
            agent.set_mode(mode);
            ActionResult::from_action(
                action_ids::SET_MODE,
                format!("Mode set to {mode} (was {current})."),
            )
            .with_meta("previous_mode", current.as_str())
        }
    }
}

/// `/state`: visible state as pretty JSON.
pub fn show_state(agent: &mut Agent, _input: &str) -> ActionResult {
    let visible = Value::Object(agent.state().visible(agent.config().default_mode));
    let text = match serde_json::to_string_pretty(&visible) {
        Ok(json) => json,
        Err(err) => format!("State could not be rendered: {err}"),
    };
    ActionResult::from_action(action_ids::SHOW_STATE, text)
}

/// `/cook <log>` or a pasted log: locate the failing pipeline stage.
pub fn stage_report(_agent: &mut Agent, input: &str) -> ActionResult {
    let log = strip_command(input, COOK_COMMAND);
    if log.is_empty() {
        return ActionResult::from_action(
            action_ids::STAGE_REPORT,
            "No log text given. Paste the build output after the command: /cook <log text>",
        );
    }

    let report = locate(log);
    let candidates = json!(report.candidates);
    let result = ActionResult::from_action(action_ids::STAGE_REPORT, render_report(&report))
        .with_meta("stage_candidates", candidates);
    match report.best() {
        Some(best) => result.with_meta("stage_best", best.stage_id),
        None => result.with_meta("stage_best", Value::Null),
    }
}

/// Restrictive-mode fallback: two known failure signatures, one directive.
pub fn restrictive_classify(_agent: &mut Agent, input: &str) -> ActionResult {
    let classification = classify(input);
    ActionResult::from_action(action_ids::RESTRICTIVE_CLASSIFY, classification.render())
        .with_meta("classification", json!(classification.class))
}

/// Human-readable stage report: best match, its meaning, then all candidates.
pub fn render_report(report: &StageReport) -> String {
    let Some(best) = report.best() else {
        return "Stage not recognized. Provide more context: the first error line \
                and the lines around it."
            .to_string();
    };
    let mut buf = format!(
        "Most likely stage: {} (score {})\n{}\nmatched keywords: {}\n",
        best.stage_id,
        best.score,
        best.meaning,
        best.matched_keywords.join(", ")
    );
    buf.push_str("Candidates:");
    for candidate in &report.candidates {
        buf.push_str(&format!(
            "\n  {:<10} score={} [{}]",
            candidate.stage_id,
            candidate.score,
            candidate.matched_keywords.join(", ")
        ));
    }
    buf
}

/// Drop a leading `command` token (case-insensitive) and trim the remainder.
fn strip_command<'a>(input: &'a str, command: &str) -> &'a str {
    let trimmed = input.trim_start();
    match trimmed.get(..command.len()) {
        Some(head) if head.eq_ignore_ascii_case(command) => trimmed[command.len()..].trim(),
        _ => trimmed.trim_end(),
    }
}

fn mode_names() -> String {
    Mode::ALL
        .iter()
        .map(|mode| mode.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
