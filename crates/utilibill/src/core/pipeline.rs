//! Per-document extraction sequence and batch orchestration.
//!
//! The sequence per document: parse (through the cache) -> chunk when the
//! text exceeds the configured threshold -> extract records per chunk ->
//! reconcile -> tag with the source file stem. Every stage failure is
//! isolated at the granularity where the data can still be saved: a chunk
//! failure skips that chunk, an extraction failure yields zero records for
//! the document, and a reconciliation failure falls back to the raw records.
//! One bad document never aborts a batch.

use crate::cache::ParsedTextCache;
use crate::chunking::{self, ChunkingConfig};
use crate::core::config::{ExtractionConfig, ReconcilerKind};
use crate::core::io::{file_stem, validate_file_exists};
use crate::error::Result;
use crate::generation::{RecordExtractor, TextModel};
use crate::parsing::DocumentParser;
use crate::reconcile::{DeterministicReconciler, ModelAssistedReconciler, Reconciler};
use crate::types::{ExtractedRecord, FileRecord};
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Global Tokio runtime for the synchronous wrappers.
///
/// Lazily initialized on first use and shared across all sync calls: creating
/// a runtime per call is orders of magnitude slower. Runtime creation only
/// fails on resource exhaustion, at which point nothing else would work
/// either, so failing fast here is the right call.
static GLOBAL_RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create global Tokio runtime - system may be out of resources")
});

/// Outcome of one batch run: canonical records in input order plus the
/// per-document failures that were isolated along the way.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub records: Vec<FileRecord>,
    pub failures: Vec<DocumentFailure>,
}

/// One document that contributed nothing because of an error.
#[derive(Debug)]
pub struct DocumentFailure {
    pub path: PathBuf,
    pub error: String,
}

/// The extraction pipeline for one corpus of documents.
#[derive(Clone)]
pub struct DocumentPipeline {
    parser: Arc<dyn DocumentParser>,
    cache: Option<ParsedTextCache>,
    extractor: RecordExtractor,
    reconciler: Arc<dyn Reconciler>,
    config: ExtractionConfig,
}

impl DocumentPipeline {
    /// Assemble a pipeline from its collaborators. The reconciliation
    /// strategy comes from the config; both strategies share the model.
    pub fn new(
        parser: Arc<dyn DocumentParser>,
        model: Arc<dyn TextModel>,
        config: ExtractionConfig,
    ) -> Self {
        let extractor = RecordExtractor::new(model);
        let reconciler: Arc<dyn Reconciler> = match config.reconciler {
            ReconcilerKind::Deterministic => Arc::new(DeterministicReconciler::new()),
            ReconcilerKind::ModelAssisted => {
                Arc::new(ModelAssistedReconciler::new(extractor.clone()))
            }
        };
        Self::with_reconciler(parser, extractor, reconciler, config)
    }

    /// Assemble a pipeline with an explicit reconciliation strategy.
    pub fn with_reconciler(
        parser: Arc<dyn DocumentParser>,
        extractor: RecordExtractor,
        reconciler: Arc<dyn Reconciler>,
        config: ExtractionConfig,
    ) -> Self {
        let cache = config
            .use_cache
            .then(|| ParsedTextCache::new(&config.cache_dir));
        Self {
            parser,
            cache,
            extractor,
            reconciler,
            config,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Process one document end to end.
    ///
    /// Returns zero records (not an error) when the document parses to
    /// nothing or the extraction call fails; those are per-document
    /// conditions the batch must survive.
    pub async fn process_file(&self, path: &Path) -> Result<Vec<FileRecord>> {
        validate_file_exists(path)?;
        tracing::info!("processing {}", path.display());

        let text = match &self.cache {
            Some(cache) => cache.get_or_parse(path, self.parser.as_ref()).await?,
            None => match self.parser.parse(path).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(
                        "{} parser failed for {}: {}",
                        self.parser.name(),
                        path.display(),
                        e
                    );
                    String::new()
                }
            },
        };

        if text.trim().is_empty() {
            tracing::warn!("no text content for {}", path.display());
            return Ok(vec![]);
        }

        let raw = self.collect_records(&text, path).await?;
        if raw.is_empty() {
            tracing::info!("no records found in {}", path.display());
            return Ok(vec![]);
        }

        let finals = match self.reconciler.reconcile(&raw).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(
                    "{} reconciliation failed for {}, keeping {} raw records: {}",
                    self.reconciler.name(),
                    path.display(),
                    raw.len(),
                    e
                );
                raw
            }
        };

        let stem = file_stem(path);
        tracing::info!("{} records in {}", finals.len(), path.display());
        Ok(finals
            .into_iter()
            .map(|record| FileRecord {
                filename: stem.clone(),
                record,
            })
            .collect())
    }

    /// Run the extraction call(s) for one document's text, chunking when the
    /// configured threshold is exceeded.
    async fn collect_records(&self, text: &str, path: &Path) -> Result<Vec<ExtractedRecord>> {
        if let Some(policy) = &self.config.chunking {
            if text.chars().count() > policy.threshold_chars {
                let chunks = chunking::split_text(
                    text,
                    &ChunkingConfig {
                        max_characters: policy.max_chars,
                        overlap: policy.max_overlap,
                    },
                )?;
                tracing::debug!(
                    "{} split into {} chunks for extraction",
                    path.display(),
                    chunks.len()
                );

                let mut records = Vec::new();
                for chunk in &chunks {
                    match self.extractor.extract_records(&chunk.content).await {
                        Ok(result) => records.extend(result.records),
                        Err(e) => {
                            // One failed chunk loses that chunk's records only
                            tracing::warn!(
                                "extraction failed for chunk {}/{} of {}: {}",
                                chunk.metadata.chunk_index + 1,
                                chunk.metadata.total_chunks,
                                path.display(),
                                e
                            );
                        }
                    }
                }
                return Ok(records);
            }
        }

        match self.extractor.extract_records(text).await {
            Ok(result) => Ok(result.records),
            Err(e) => {
                tracing::warn!("extraction failed for {}: {}", path.display(), e);
                Ok(vec![])
            }
        }
    }

    /// Process a batch of documents with bounded concurrency.
    ///
    /// Per-document errors land in [`BatchOutcome::failures`]; the batch
    /// itself never aborts. Records come back in input order regardless of
    /// completion order.
    pub async fn process_batch(&self, paths: &[PathBuf]) -> BatchOutcome {
        if paths.is_empty() {
            return BatchOutcome::default();
        }

        let max_concurrent = self
            .config
            .max_concurrent_documents
            .unwrap_or_else(|| num_cpus::get() * 2);
        let semaphore = Arc::new(Semaphore::new(max_concurrent));

        let mut tasks = JoinSet::new();
        for (index, path) in paths.iter().enumerate() {
            let pipeline = self.clone();
            let path = path.clone();
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let _permit = semaphore.acquire().await;
                let result = pipeline.process_file(&path).await;
                (index, path, result)
            });
        }

        let mut slots: Vec<Option<Vec<FileRecord>>> = Vec::new();
        slots.resize_with(paths.len(), || None);
        let mut failures = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, _, Ok(records))) => {
                    slots[index] = Some(records);
                }
                Ok((index, path, Err(e))) => {
                    tracing::error!("failed to process {}: {}", path.display(), e);
                    failures.push(DocumentFailure {
                        path,
                        error: e.to_string(),
                    });
                    slots[index] = Some(vec![]);
                }
                Err(join_error) => {
                    tracing::error!("document task panicked: {}", join_error);
                    failures.push(DocumentFailure {
                        path: PathBuf::new(),
                        error: format!("document task panicked: {}", join_error),
                    });
                }
            }
        }

        BatchOutcome {
            records: slots.into_iter().flatten().flatten().collect(),
            failures,
        }
    }

    /// Synchronous wrapper for [`Self::process_file`], on the global runtime.
    pub fn process_file_sync(&self, path: &Path) -> Result<Vec<FileRecord>> {
        GLOBAL_RUNTIME.block_on(self.process_file(path))
    }

    /// Synchronous wrapper for [`Self::process_batch`], on the global runtime.
    pub fn process_batch_sync(&self, paths: &[PathBuf]) -> BatchOutcome {
        GLOBAL_RUNTIME.block_on(self.process_batch(paths))
    }
}
