//! Output-shape policy enforcement.
//!
//! The guardrail flags rather than edits: every violation appends a visible
//! `[policy]` notice and the original reply text is kept as-is.

use serde::{Deserialize, Serialize};

use crate::core::types::Mode;

const FUTURE_PROMISE_PHRASES: &[&str] = &[
    "i'll do it later",
    "i will do it later",
    "i'll get back to you",
    "i will get back to you",
    "i'll follow up",
    "i will follow up",
    "give me some time",
    "later today",
    "稍后",
];

const BACKGROUND_CLAIM_PHRASES: &[&str] = &[
    "in the background",
    "i'm working on it",
    "i am working on it",
    "i will keep monitoring",
    "i'll keep monitoring",
    "still running",
];

const UNVERIFIABLE_PHRASES: &[&str] = &[
    "guaranteed",
    "100% fixed",
    "definitely fixed",
    "i have verified",
    "i verified",
];

/// Independent switches, read-only after agent construction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Policy {
    /// Flag claims of unscoped work happening in the background.
    pub forbid_background_claims: bool,
    /// Flag promises of deferred action.
    pub forbid_future_promises: bool,
    /// Flag certainty claims the agent cannot back up.
    pub require_verifiable: bool,
    /// Limit directive lines while in restrictive mode.
    pub single_directive_in_restrictive: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            forbid_background_claims: true,
            forbid_future_promises: true,
            require_verifiable: true,
            single_directive_in_restrictive: true,
        }
    }
}

/// A single flagged violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyNotice {
    FuturePromise,
    BackgroundClaim,
    Unverifiable,
    DirectiveLimit { found: usize, max: usize },
}

impl PolicyNotice {
    pub fn render(&self) -> String {
        match self {
            PolicyNotice::FuturePromise => "[policy] deferred-action language detected: \
                 nothing happens after this reply; run the command again when ready."
                .to_string(),
            PolicyNotice::BackgroundClaim => {
                "[policy] background-work claim detected: this agent runs no background tasks."
                    .to_string()
            }
            PolicyNotice::Unverifiable => "[policy] unverifiable claim detected: \
                 treat this reply as something to check, not a verified result."
                .to_string(),
            PolicyNotice::DirectiveLimit { found, max } => format!(
                "[policy] directive limit enforced: {found} steps found, at most {max} allowed \
                 in restrictive mode; follow the first one only."
            ),
        }
    }
}

/// Post-processing pass over every produced reply.
#[derive(Debug, Clone)]
pub struct Guardrail {
    policy: Policy,
    max_directives: usize,
}

impl Guardrail {
    pub fn new(policy: Policy, max_directives: usize) -> Self {
        Self {
            policy,
            max_directives,
        }
    }

    /// List violations in `text` under `mode`, in a fixed order.
    pub fn review(&self, text: &str, mode: Mode) -> Vec<PolicyNotice> {
        let lowered = text.to_lowercase();
        let mut notices = Vec::new();

        if self.policy.forbid_future_promises && contains_any(&lowered, FUTURE_PROMISE_PHRASES) {
            notices.push(PolicyNotice::FuturePromise);
        }
        if self.policy.forbid_background_claims
            && contains_any(&lowered, BACKGROUND_CLAIM_PHRASES)
        {
            notices.push(PolicyNotice::BackgroundClaim);
        }
        if self.policy.require_verifiable && contains_any(&lowered, UNVERIFIABLE_PHRASES) {
            notices.push(PolicyNotice::Unverifiable);
        }
        if self.policy.single_directive_in_restrictive && mode == Mode::Restrictive {
            let found = count_directives(text);
            if found > self.max_directives {
                notices.push(PolicyNotice::DirectiveLimit {
                    found,
                    max: self.max_directives,
                });
            }
        }

        notices
    }

    /// Return `text` with one notice line appended per violation.
    pub fn apply(&self, text: &str, mode: Mode) -> String {
        render_with_notices(text, &self.review(text, mode))
    }
}

/// Append rendered notices to `text`, one per line.
pub fn render_with_notices(text: &str, notices: &[PolicyNotice]) -> String {
    if notices.is_empty() {
        return text.to_string();
    }
    let mut buf = text.trim_end().to_string();
    for notice in notices {
        if !buf.is_empty() {
            buf.push('\n');
        }
        buf.push_str(&notice.render());
    }
    buf
}

/// Count bullet-style directive lines (`- `, `* `, `• `, `1.`, `1)`).
pub fn count_directives(text: &str) -> usize {
    text.lines().filter(|line| is_directive_line(line)).count()
}

fn is_directive_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    if ["- ", "* ", "• "]
        .iter()
        .any(|marker| trimmed.starts_with(marker))
    {
        return true;
    }
    let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
    digits > 0 && matches!(trimmed[digits..].chars().next(), Some('.' | ')'))
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guardrail() -> Guardrail {
        Guardrail::new(Policy::default(), 1)
    }

    #[test]
    fn clean_text_is_unchanged() {
        let text = "mode set to normal";
        assert_eq!(guardrail().apply(text, Mode::Restrictive), text);
    }

    #[test]
    fn future_promise_is_flagged_not_removed() {
        let out = guardrail().apply("Sure, I'll do it later.", Mode::Normal);
        assert!(out.starts_with("Sure, I'll do it later."));
        assert!(out.contains("[policy] deferred-action language detected"));
    }

    #[test]
    fn background_and_unverifiable_claims_are_flagged() {
        let notices = guardrail().review(
            "Guaranteed fix, still running in the background",
            Mode::Normal,
        );
        assert_eq!(
            notices,
            vec![PolicyNotice::BackgroundClaim, PolicyNotice::Unverifiable]
        );
    }

    #[test]
    fn directive_limit_only_applies_in_restrictive_mode() {
        let text = "steps:\n- rebuild\n- clean\n";
        assert!(guardrail().review(text, Mode::Normal).is_empty());
        assert_eq!(
            guardrail().review(text, Mode::Restrictive),
            vec![PolicyNotice::DirectiveLimit { found: 2, max: 1 }]
        );
    }

    #[test]
    fn directive_limit_keeps_all_lines() {
        let text = "- rebuild\n- clean";
        let out = guardrail().apply(text, Mode::Restrictive);
        assert!(out.starts_with(text));
        assert!(out.ends_with("follow the first one only."));
    }

    #[test]
    fn single_directive_passes() {
        let text = "classification: x\n- rebuild once.";
        assert!(guardrail().review(text, Mode::Restrictive).is_empty());
    }

    #[test]
    fn disabled_switches_skip_checks() {
        let policy = Policy {
            forbid_future_promises: false,
            single_directive_in_restrictive: false,
            ..Policy::default()
        };
        let guard = Guardrail::new(policy, 1);
        assert!(
            guard
                .review("I'll do it later\n- a\n- b", Mode::Restrictive)
                .is_empty()
        );
    }

    #[test]
    fn counts_numbered_and_starred_directives() {
        assert_eq!(count_directives("1. a\n2) b\n* c\n• d\n-nope\n10 apples"), 4);
    }
}
