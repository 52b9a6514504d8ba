//! Scripted operation: replays a fixed list of outcomes and counts calls.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tgretry_core::retry::{AttemptContext, RawFailure};

#[derive(Clone)]
pub struct Scripted<T> {
    outcomes: Arc<Mutex<VecDeque<Result<T, RawFailure>>>>,
    /// Returned once the script runs out.
    fallback: Result<T, RawFailure>,
    calls: Arc<AtomicU32>,
    contexts: Arc<Mutex<Vec<AttemptContext>>>,
}

impl<T: Clone> Scripted<T> {
    pub fn new(outcomes: Vec<Result<T, RawFailure>>, fallback: Result<T, RawFailure>) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(outcomes.into())),
            fallback,
            calls: Arc::new(AtomicU32::new(0)),
            contexts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always fails with `failure`.
    pub fn always_failing(failure: RawFailure) -> Self {
        Self::new(Vec::new(), Err(failure))
    }

    pub fn call(&self, ctx: AttemptContext) -> Result<T, RawFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.contexts.lock().unwrap().push(ctx);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn contexts(&self) -> Vec<AttemptContext> {
        self.contexts.lock().unwrap().clone()
    }
}
