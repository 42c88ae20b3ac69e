//! Orchestration for a single dispatch: rule match, handler, guardrail.

use anyhow::Result;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::actions::ActionRegistry;
use crate::core::engine::RuleEngine;
use crate::core::guardrail::{Guardrail, render_with_notices};
use crate::core::invariants::validate_rule_table;
use crate::core::rules::{Rule, builtin_rules};
use crate::core::types::{ActionResult, Mode, action_ids};
use crate::io::config::AgentConfig;
use crate::io::state_store::{AgentState, StateStore};

/// Private state key counting successful saves.
pub const REVISION_KEY: &str = "_revision";

const NO_MATCH_TEXT: &str = "No rule matched this input. Type /help to see the commands.";
const EMPTY_INPUT_TEXT: &str = "Empty input. Type /help to see the commands.";

/// Rule-driven dispatch agent.
///
/// One input string in, one policy-filtered reply out. The only mutable
/// state is the persisted [`AgentState`], changed through [`Agent::set_mode`].
#[derive(Debug)]
pub struct Agent {
    config: AgentConfig,
    engine: RuleEngine,
    registry: ActionRegistry,
    guardrail: Guardrail,
    store: StateStore,
    state: AgentState,
    /// Save failures reported on the next reply.
    pending_warnings: Vec<String>,
}

impl Agent {
    /// Build an agent with the built-in rule table plus `config.rules`.
    pub fn new(config: AgentConfig) -> Result<Self> {
        let mut rules = builtin_rules()?;
        for spec in &config.rules {
            rules.push(spec.compile()?);
        }
        Self::from_parts(config, rules, ActionRegistry::builtin())
    }

    /// Build an agent from explicit rules and the built-in registry.
    pub fn with_rules(config: AgentConfig, rules: Vec<Rule>) -> Result<Self> {
        Self::from_parts(config, rules, ActionRegistry::builtin())
    }

    pub fn from_parts(
        config: AgentConfig,
        rules: Vec<Rule>,
        registry: ActionRegistry,
    ) -> Result<Self> {
        config.validate()?;
        for problem in validate_rule_table(&rules, &registry.ids()) {
            warn!(problem = %problem, "rule table problem");
        }

        let store = StateStore::new(config.state_path.clone(), config.persist);
        let state = match store.load() {
            Ok(Some(state)) => state,
            Ok(None) => AgentState::default(),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "agent state unreadable, using defaults");
                AgentState::default()
            }
        };
        debug!(mode = ?state.mode, persist = config.persist, "agent ready");

        Ok(Self {
            guardrail: Guardrail::new(config.policy, config.max_directives),
            engine: RuleEngine::new(rules),
            registry,
            store,
            state,
            config,
            pending_warnings: Vec::new(),
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    /// Current mode, falling back to the configured default.
    pub fn mode(&self) -> Mode {
        self.state.mode.unwrap_or(self.config.default_mode)
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[Rule] {
        self.engine.rules()
    }

    /// Rule-table problems (see [`validate_rule_table`]).
    pub fn rule_table_problems(&self) -> Vec<String> {
        validate_rule_table(self.engine.rules(), &self.registry.ids())
    }

    /// Dispatch `input` and return the final reply text.
    pub fn respond(&mut self, input: &str) -> String {
        self.handle(input).text
    }

    /// Dispatch `input` and return the full result, metadata included.
    pub fn handle(&mut self, input: &str) -> ActionResult {
        let carried = std::mem::take(&mut self.pending_warnings);
        let mut result = self.dispatch(input);

        let mode = self.mode();
        let notices = self.guardrail.review(&result.text, mode);
        if !notices.is_empty() {
            debug!(count = notices.len(), "policy notices appended");
            result.text = render_with_notices(&result.text, &notices);
            result
                .metadata
                .insert("policy_notices".to_string(), json!(notices));
        }
        for warning in carried {
            result.text.push('\n');
            result.text.push_str(&warning);
        }
        result
            .metadata
            .insert("mode".to_string(), Value::from(mode.as_str()));
        result
    }

    /// Switch mode and flush state.
    ///
    /// A failed save keeps the new mode in memory and is reported on the
    /// next reply.
    pub fn set_mode(&mut self, mode: Mode) {
        info!(from = %self.mode(), to = %mode, "mode change");
        self.state.mode = Some(mode);
        self.persist();
    }

    fn dispatch(&mut self, input: &str) -> ActionResult {
        let mode = self.mode();
        if mode == Mode::Normal && input.trim().is_empty() {
            return ActionResult::new(EMPTY_INPUT_TEXT);
        }

        let (action, rule_name) = match self.engine.match_rule(input, mode) {
            Some(rule) => {
                debug!(rule = %rule.name, action = %rule.action, "rule matched");
                (rule.action.clone(), Some(rule.name.clone()))
            }
            None if mode == Mode::Restrictive => {
                debug!("no rule matched, classifying");
                (action_ids::RESTRICTIVE_CLASSIFY.to_string(), None)
            }
            None => {
                debug!("no rule matched");
                return ActionResult::new(NO_MATCH_TEXT);
            }
        };

        let Some(handler) = self.registry.get(&action) else {
            warn!(action = %action, "no handler registered");
            return ActionResult::new(format!(
                "Internal configuration error: no handler registered for action '{action}'."
            ))
            .with_meta("missing_action", action);
        };

        debug!(action = %action, "dispatching");
        let result = handler(self, input);
        match rule_name {
            Some(name) => result.with_meta("rule", name),
            None => result,
        }
    }

    fn persist(&mut self) {
        let revision = self
            .state
            .extra
            .get(REVISION_KEY)
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let mut next = self.state.clone();
        next.extra.insert(REVISION_KEY.to_string(), json!(revision.saturating_add(1)));

        match self.store.save(&next) {
            Ok(()) => self.state = next,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "agent state not saved");
                self.pending_warnings
                    .push(format!("[warning] state was not saved: {err:#}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{rule, temp_agent, temp_config};

    #[test]
    fn first_run_uses_default_mode() {
        let temp = tempfile::tempdir().expect("tempdir");
        let agent = Agent::new(temp_config(temp.path(), Mode::Restrictive)).expect("agent");
        assert_eq!(agent.mode(), Mode::Restrictive);
        assert!(agent.state().mode.is_none());
    }

    #[test]
    fn unmatched_text_in_normal_mode_points_to_help() {
        let (_temp, mut agent) = temp_agent(Mode::Normal);
        assert_eq!(agent.respond("what is the weather"), NO_MATCH_TEXT);
    }

    #[test]
    fn unmatched_text_in_restrictive_mode_is_classified() {
        let (_temp, mut agent) = temp_agent(Mode::Restrictive);
        let result = agent.handle("the app closes on start");
        assert_eq!(
            result.action_id.as_deref(),
            Some(action_ids::RESTRICTIVE_CLASSIFY)
        );
        assert!(result.text.starts_with("classification: undetermined"));
    }

    #[test]
    fn log_text_routes_by_mode() {
        let (_temp, mut agent) = temp_agent(Mode::Normal);
        let normal = agent.handle("BUILD FAILED: ndk not found");
        assert_eq!(normal.metadata["rule"], json!("auto-cook"));

        agent.set_mode(Mode::Restrictive);
        let restrictive = agent.handle("BUILD FAILED: ndk not found");
        assert_eq!(
            restrictive.action_id.as_deref(),
            Some(action_ids::RESTRICTIVE_CLASSIFY)
        );
        assert!(restrictive.text.contains("android ndk toolchain"));
    }

    #[test]
    fn missing_handler_is_reported_not_fatal() {
        let temp = tempfile::tempdir().expect("tempdir");
        let agent_rules = vec![rule("ghost", 1, "^boo", "summonGhost", None)];
        let mut agent =
            Agent::with_rules(temp_config(temp.path(), Mode::Normal), agent_rules).expect("agent");
        assert_eq!(
            agent.rule_table_problems(),
            vec!["ghost: action 'summonGhost' has no registered handler".to_string()]
        );
        let reply = agent.respond("boo");
        assert_eq!(
            reply,
            "Internal configuration error: no handler registered for action 'summonGhost'."
        );
    }

    #[test]
    fn empty_input_gets_hint() {
        let (_temp, mut agent) = temp_agent(Mode::Normal);
        assert_eq!(agent.respond("   \n"), EMPTY_INPUT_TEXT);
    }

    #[test]
    fn empty_input_in_restrictive_mode_is_classified() {
        let (_temp, mut agent) = temp_agent(Mode::Restrictive);
        let result = agent.handle("   \n");
        assert_eq!(
            result.action_id.as_deref(),
            Some(action_ids::RESTRICTIVE_CLASSIFY)
        );
        assert!(result.text.starts_with("classification: undetermined"));
    }

    #[test]
    fn command_on_a_later_line_is_not_dispatched() {
        let (_temp, mut agent) = temp_agent(Mode::Normal);
        assert_eq!(agent.respond("please switch\n/mode restrictive"), NO_MATCH_TEXT);
        assert_eq!(agent.mode(), Mode::Normal);

        assert_eq!(
            agent.respond("\n  /mode restrictive"),
            "Mode set to restrictive (was normal)."
        );
    }

    #[test]
    fn saturated_revision_does_not_overflow() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = temp_config(temp.path(), Mode::Normal);
        std::fs::write(
            &cfg.state_path,
            format!("{{\"mode\": \"normal\", \"_revision\": {}}}", u64::MAX),
        )
        .expect("write");

        let mut agent = Agent::new(cfg.clone()).expect("agent");
        assert_eq!(
            agent.respond("/mode restrictive"),
            "Mode set to restrictive (was normal)."
        );

        let reloaded = Agent::new(cfg).expect("agent");
        assert_eq!(reloaded.mode(), Mode::Restrictive);
        assert_eq!(reloaded.state().extra[REVISION_KEY], json!(u64::MAX));
    }

    #[test]
    fn guardrail_flags_handler_output() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut registry = ActionRegistry::builtin();
        registry.register("promise", |_, _| {
            ActionResult::from_action("promise", "I'll do it later.")
        });
        registry.register("steps", |_, _| {
            ActionResult::from_action("steps", "- clean\n- rebuild")
        });
        let agent_rules = vec![
            rule("promise", 1, "^promise", "promise", None),
            rule("steps", 1, "^steps", "steps", None),
        ];
        let mut agent = Agent::from_parts(
            temp_config(temp.path(), Mode::Restrictive),
            agent_rules,
            registry,
        )
        .expect("agent");

        let promise = agent.handle("promise");
        assert!(promise.text.starts_with("I'll do it later.\n[policy] deferred-action"));
        assert_eq!(
            promise.metadata["policy_notices"],
            json!([{"kind": "future_promise"}])
        );

        let steps = agent.respond("steps");
        assert!(steps.starts_with("- clean\n- rebuild\n[policy] directive limit enforced"));
    }

    #[test]
    fn mode_change_persists_across_instances() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = temp_config(temp.path(), Mode::Normal);
        let mut agent = Agent::new(cfg.clone()).expect("agent");
        agent.respond("/mode restrictive");

        let reloaded = Agent::new(cfg).expect("agent");
        assert_eq!(reloaded.mode(), Mode::Restrictive);
        assert_eq!(reloaded.state().extra[REVISION_KEY], json!(1));
    }

    #[test]
    fn corrupt_state_falls_back_to_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = temp_config(temp.path(), Mode::Normal);
        std::fs::write(&cfg.state_path, "mode = broken").expect("write");
        let agent = Agent::new(cfg).expect("agent");
        assert_eq!(agent.mode(), Mode::Normal);
    }

    #[test]
    fn save_failure_is_reported_on_next_reply() {
        let temp = tempfile::tempdir().expect("tempdir");
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, "not a directory").expect("write");
        let mut cfg = temp_config(temp.path(), Mode::Normal);
        cfg.state_path = blocker.join("state.json");

        let mut agent = Agent::new(cfg).expect("agent");
        let first = agent.respond("/mode restrictive");
        assert_eq!(first, "Mode set to restrictive (was normal).");
        assert_eq!(agent.mode(), Mode::Restrictive);

        let second = agent.respond("/help");
        assert!(second.contains("[warning] state was not saved"));
        let third = agent.respond("/help");
        assert!(!third.contains("[warning]"));
    }

    #[test]
    fn persistence_disabled_keeps_state_in_memory() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut cfg = temp_config(temp.path(), Mode::Normal);
        cfg.persist = false;
        let mut agent = Agent::new(cfg.clone()).expect("agent");
        agent.respond("/mode restrictive");
        assert_eq!(agent.mode(), Mode::Restrictive);
        assert!(!cfg.state_path.exists());
        assert_eq!(Agent::new(cfg).expect("agent").mode(), Mode::Normal);
    }
}
