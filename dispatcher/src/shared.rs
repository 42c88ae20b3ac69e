//! Thread-safe handle for embedding the agent in a multi-threaded host.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::agent::Agent;
use crate::core::types::{ActionResult, Mode};

/// Cloneable handle serializing every call on one [`Agent`].
///
/// The lock covers the whole read → mutate → persist sequence of a call, so
/// concurrent `/mode` changes never interleave with a state read.
#[derive(Debug, Clone)]
pub struct SharedAgent {
    inner: Arc<Mutex<Agent>>,
}

impl SharedAgent {
    pub fn new(agent: Agent) -> Self {
        Self {
            inner: Arc::new(Mutex::new(agent)),
        }
    }

    pub fn handle(&self, input: &str) -> ActionResult {
        self.lock().handle(input)
    }

    pub fn respond(&self, input: &str) -> String {
        self.lock().respond(input)
    }

    pub fn mode(&self) -> Mode {
        self.lock().mode()
    }

    // A poisoned lock still guards a consistent agent.
    fn lock(&self) -> MutexGuard<'_, Agent> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
