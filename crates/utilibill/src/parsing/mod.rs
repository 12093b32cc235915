//! Text-extraction collaborator boundary.
//!
//! Document parsing is slow, possibly networked, and entirely replaceable, so
//! it sits behind the [`DocumentParser`] trait. The cache wraps whatever
//! implementation is plugged in. Two implementations ship here:
//!
//! - [`PdfTextParser`] - local extraction via `pdf-extract`
//! - [`MockParser`] - deterministic canned responses for tests

use crate::error::{Result, UtilibillError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// A service that turns a document on disk into plain or markdown text.
#[async_trait]
pub trait DocumentParser: Send + Sync {
    /// Short identifier used in log lines.
    fn name(&self) -> &str;

    /// Extract the full text content of one document.
    async fn parse(&self, path: &Path) -> Result<String>;
}

/// Local PDF text extraction.
///
/// `pdf-extract` is CPU-bound and blocking, so the call runs under
/// `spawn_blocking` to keep the runtime responsive during batch processing.
#[derive(Debug, Default)]
pub struct PdfTextParser;

impl PdfTextParser {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentParser for PdfTextParser {
    fn name(&self) -> &str {
        "pdf-text"
    }

    async fn parse(&self, path: &Path) -> Result<String> {
        let owned = path.to_path_buf();
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text(&owned))
            .await
            .map_err(|e| UtilibillError::parsing(format!("parser task failed: {}", e)))?
            .map_err(|e| {
                UtilibillError::parsing(format!(
                    "failed to extract text from {}: {}",
                    path.display(),
                    e
                ))
            })?;
        Ok(text)
    }
}

/// Deterministic parser for tests: canned text per file name, with optional
/// per-file failure injection and a call counter for cache assertions.
#[derive(Debug, Clone, Default)]
pub struct MockParser {
    texts: Arc<Mutex<HashMap<String, String>>>,
    failures: Arc<Mutex<HashMap<String, String>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the text returned for a given file name.
    pub fn add_text(&self, file_name: impl Into<String>, text: impl Into<String>) {
        self.texts
            .lock()
            .unwrap()
            .insert(file_name.into(), text.into());
    }

    /// Make parsing of a given file name fail with the given message.
    pub fn add_failure(&self, file_name: impl Into<String>, message: impl Into<String>) {
        self.failures
            .lock()
            .unwrap()
            .insert(file_name.into(), message.into());
    }

    /// Number of times `parse` was invoked.
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl DocumentParser for MockParser {
    fn name(&self) -> &str {
        "mock"
    }

    async fn parse(&self, path: &Path) -> Result<String> {
        *self.call_count.lock().unwrap() += 1;

        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        if let Some(message) = self.failures.lock().unwrap().get(&file_name) {
            return Err(UtilibillError::parsing(message.clone()));
        }

        Ok(self
            .texts
            .lock()
            .unwrap()
            .get(&file_name)
            .cloned()
            .unwrap_or_default())
    }
}
