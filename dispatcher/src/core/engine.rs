//! Deterministic first-match rule selection.

use crate::core::rules::Rule;
use crate::core::types::Mode;

/// Rule list held in evaluation order (priority descending, declaration
/// order preserved among equal priorities).
#[derive(Debug, Clone)]
pub struct RuleEngine {
    rules: Vec<Rule>,
}

impl RuleEngine {
    pub fn new(mut rules: Vec<Rule>) -> Self {
        // `sort_by` is stable, which keeps declaration order for ties.
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        Self { rules }
    }

    /// Return the first eligible rule whose pattern matches `input`.
    ///
    /// Rules gated on another mode are skipped as if they did not match.
    /// Returns `None` when nothing matches; the caller owns the fallback.
    pub fn match_rule(&self, input: &str, mode: Mode) -> Option<&Rule> {
        self.rules
            .iter()
            .filter(|rule| rule.is_eligible(mode))
            .find(|rule| rule.matches(input))
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}
