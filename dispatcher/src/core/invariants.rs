//! Startup checks over the rule table.

use std::collections::HashSet;

use crate::core::rules::Rule;

/// Check rule-table invariants:
/// - No duplicate rule names
/// - Non-empty patterns
/// - Every action resolves to a registered handler
pub fn validate_rule_table(rules: &[Rule], registered: &[&str]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for rule in rules {
        if !seen.insert(rule.name.as_str()) {
            errors.push(format!("duplicate rule name '{}'", rule.name));
        }
        if rule.pattern.as_str().trim().is_empty() {
            errors.push(format!("{}: pattern must not be empty", rule.name));
        }
        if !registered.contains(&rule.action.as_str()) {
            errors.push(format!(
                "{}: action '{}' has no registered handler",
                rule.name, rule.action
            ));
        }
    }

    errors
}
