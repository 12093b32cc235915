//! Record extraction service: prompting plus payload decoding on top of a
//! [`TextModel`].

use super::prompt;
use super::TextModel;
use crate::error::{Result, UtilibillError};
use crate::types::{DocumentExtractionResult, ExtractedRecord};
use std::sync::Arc;

/// Turns document text into structured records through a text model.
#[derive(Clone)]
pub struct RecordExtractor {
    model: Arc<dyn TextModel>,
}

impl RecordExtractor {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Extract all billing records the model finds in `document_text`.
    pub async fn extract_records(&self, document_text: &str) -> Result<DocumentExtractionResult> {
        let completion = self
            .model
            .generate(&prompt::extraction_prompt(document_text))
            .await?;
        decode_payload(&completion)
    }

    /// Merge duplicated or partial records through the model. Empty input
    /// short-circuits without a model call.
    pub async fn consolidate_records(
        &self,
        records: &[ExtractedRecord],
    ) -> Result<DocumentExtractionResult> {
        if records.is_empty() {
            return Ok(DocumentExtractionResult::default());
        }

        let raw_records_json = serde_json::to_string_pretty(records)?;
        let completion = self
            .model
            .generate(&prompt::consolidation_prompt(&raw_records_json))
            .await?;
        decode_payload(&completion)
    }
}

/// Decode a model completion into the records payload.
///
/// Models wrap JSON in markdown fences or prose more often than not, so the
/// decoder slices from the first `{` to the last `}` before parsing.
fn decode_payload(completion: &str) -> Result<DocumentExtractionResult> {
    let trimmed = completion.trim();
    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => {
            return Err(UtilibillError::generation(format!(
                "model completion contains no JSON object: {:.120}",
                trimmed
            )))
        }
    };

    serde_json::from_str(json).map_err(|e| {
        UtilibillError::generation_with_source("model completion is not a valid records payload", e)
    })
}
