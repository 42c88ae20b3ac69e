//! Deterministic, pure logic shared by the dispatch agent.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod classifier;
pub mod engine;
pub mod guardrail;
pub mod invariants;
pub mod rules;
pub mod stages;
pub mod types;
