//! Utilibill - Structured Billing-Data Extraction
//!
//! Utilibill turns utility-bill PDFs into flat, schema-stable CSV rows. Each
//! document is parsed to text through a fingerprint-addressed cache, prompted
//! through a structured-generation model (chunked when the document exceeds a
//! single call's comfortable size), and the resulting candidate records are
//! reconciled into one canonical set per document. A separate scorer compares
//! an extracted table against ground truth field by field.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use utilibill::{DocumentPipeline, ExtractionConfig, PdfTextParser, ProviderConfig};
//!
//! # async fn example() -> utilibill::Result<()> {
//! let provider = ProviderConfig::from_env()?;
//! let pipeline = DocumentPipeline::new(
//!     Arc::new(PdfTextParser::new()),
//!     provider.build_model()?,
//!     ExtractionConfig::default(),
//! );
//!
//! let records = pipeline.process_file("bill.pdf".as_ref()).await?;
//! println!("extracted {} records", records.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Core Module** (`core`): pipeline orchestration, configuration, file discovery
//! - **Cache** (`cache`): fingerprint-addressed persistence of parsed text
//! - **Chunking** (`chunking`): deterministic overlap-aware splitting of long documents
//! - **Generation** (`generation`): structured-generation providers and prompting
//! - **Reconcile** (`reconcile`): duplicate-record merge strategies
//! - **Scoring** (`scoring`): ground-truth accuracy comparison
//!
//! Per-document failures are isolated: a document that fails to parse,
//! extract, or reconcile contributes zero (or raw) records and the batch
//! moves on. Only startup configuration problems are fatal.

#![deny(unsafe_code)]

pub mod cache;
pub mod chunking;
pub mod core;
pub mod error;
pub mod generation;
pub mod output;
pub mod parsing;
pub mod reconcile;
pub mod scoring;
pub mod text;
pub mod types;

pub use error::{Result, UtilibillError};
pub use types::{
    DocumentExtractionResult, ExtractedRecord, FileRecord, DATE_COLUMNS, EXTRACT_COLUMNS,
    FILENAME_COLUMN, MISSING,
};

pub use cache::ParsedTextCache;
pub use chunking::{split_text, Chunk, ChunkMetadata, ChunkingConfig};
pub use core::config::{
    ChunkingPolicy, ExtractionConfig, ProviderConfig, ProviderKind, ReconcilerKind,
};
pub use core::io::pdf_files;
pub use core::pipeline::{BatchOutcome, DocumentFailure, DocumentPipeline};
pub use generation::{GeminiModel, MockModel, OpenAiModel, RecordExtractor, TextModel};
pub use output::write_records_csv;
pub use parsing::{DocumentParser, MockParser, PdfTextParser};
pub use reconcile::{DeterministicReconciler, ModelAssistedReconciler, Reconciler};
pub use scoring::{
    compare_files, load_table, render, score, AccuracyReport, BillRow, FieldAccuracy, Mismatch,
};
