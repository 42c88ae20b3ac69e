//! Offline, rule-driven dispatch agent.
//!
//! Free-form text is routed to a bounded set of actions by priority-ordered
//! regex rules, replies are post-processed by a policy guardrail, and a small
//! operating mode is persisted between runs. The architecture enforces a
//! strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (rule matching, stage scoring,
//!   classification, guardrail). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config file, state file).
//!
//! Orchestration modules ([`actions`], [`agent`], [`shared`]) coordinate core
//! logic with I/O to answer one input at a time.

pub mod actions;
pub mod agent;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod shared;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
