//! Structured-generation collaborator boundary.
//!
//! Record extraction delegates the language understanding to a remote text
//! model behind the [`TextModel`] trait: one prompt in, one completion out.
//! [`RecordExtractor`] owns the prompting and payload decoding on top of
//! whichever provider is plugged in.
//!
//! # Providers
//!
//! - [`GeminiModel`] - Google Generative Language API
//! - [`OpenAiModel`] - OpenAI chat completions API
//! - [`MockModel`] - deterministic canned completions for tests

mod prompt;
mod providers;
mod service;

use crate::error::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub use providers::{GeminiModel, OpenAiModel, DEFAULT_TIMEOUT_SECS};
pub use service::RecordExtractor;

/// A text-completion model: blocking, I/O-bound, no internal retry. A single
/// call either returns a completion or fails; callers own the isolation.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Short identifier used in log lines.
    fn name(&self) -> &str;

    /// Produce a completion for one prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Deterministic model for tests: a queue of canned completions consumed in
/// order, then a default completion for every further call. No network.
#[derive(Debug, Clone)]
pub struct MockModel {
    default_response: String,
    queued: Arc<Mutex<VecDeque<String>>>,
    fail: bool,
    call_count: Arc<Mutex<usize>>,
}

impl MockModel {
    /// A mock returning `response` for every call.
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            queued: Arc::new(Mutex::new(VecDeque::new())),
            fail: false,
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// A mock whose every call fails, for exercising error paths.
    pub fn failing() -> Self {
        Self {
            default_response: String::new(),
            queued: Arc::new(Mutex::new(VecDeque::new())),
            fail: true,
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Queue a completion to be returned before the default kicks in.
    pub fn push_response(&self, response: impl Into<String>) {
        self.queued.lock().unwrap().push_back(response.into());
    }

    /// Number of times `generate` was invoked.
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl TextModel for MockModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        *self.call_count.lock().unwrap() += 1;
        if self.fail {
            return Err(crate::error::UtilibillError::generation(
                "mock model configured to fail",
            ));
        }
        if let Some(queued) = self.queued.lock().unwrap().pop_front() {
            return Ok(queued);
        }
        Ok(self.default_response.clone())
    }
}
