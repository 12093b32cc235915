//! Prompt templates for record extraction and consolidation.

use crate::types::EXTRACT_COLUMNS;

/// JSON shape the model must emit, appended to every prompt.
fn format_instructions() -> String {
    let fields = EXTRACT_COLUMNS
        .iter()
        .map(|column| format!("    \"{}\": \"string or '-'\"", column))
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        "Respond with a single JSON object and nothing else, following this schema:\n\
         {{\n  \"records\": [\n    {{\n{}\n    }}\n  ]\n}}",
        fields
    )
}

/// Prompt asking the model to extract billing records from document text.
pub fn extraction_prompt(document_text: &str) -> String {
    format!(
        "You are an expert AI assistant for extracting structured data from utility bills.\n\
         Your task is to extract the specified fields from the document text provided below.\n\
         \n\
         Follow these instructions carefully:\n\
         1. Extract all records present in the document. A single document may contain multiple billing periods or accounts.\n\
         2. For dates, normalize them to a standard 'YYYY-MM-DD' format.\n\
         3. For 'Usage' and 'Cost', extract only the numerical values, removing any currency symbols or units.\n\
         4. If a value for a field is not found in a record, you MUST represent it with a hyphen '-'. Do not leave it null or empty.\n\
         5. Pay attention to regional differences in number and date formats (e.g., DD/MM/YYYY vs MM/DD/YYYY, or 1,000.00 vs 1.000,00) and normalize them.\n\
         6. US-style number formatting is expected (e.g., 1,234.56). Use comma as thousand separator. Do not use periods as thousand separators.\n\
         \n\
         Document Text:\n\
         ---\n\
         {}\n\
         ---\n\
         \n\
         {}",
        document_text,
        format_instructions()
    )
}

/// Prompt asking the model to merge duplicated or partial records extracted
/// from different parts of the same document.
pub fn consolidation_prompt(raw_records_json: &str) -> String {
    format!(
        "You are an expert data consolidation AI. You will be given a list of data records extracted from a single document.\n\
         These records may be duplicated, incomplete, or contain slight variations because they were extracted from different parts of the same document.\n\
         \n\
         Your task is to analyze all the records and produce a final, clean, and unique list.\n\
         Follow these rules precisely:\n\
         1. Merge records that clearly refer to the same billing period or item. Use clues like account numbers, meter numbers, and overlapping dates to identify duplicates.\n\
         2. When merging, use the value that is most complete for each field. For example, prefer '5356338-03' over '535633803'. Always prefer an actual value over a hyphen ('-').\n\
         3. Discard records that contain no meaningful information (all fields are '-').\n\
         4. Use '-' for any field that remains missing.\n\
         \n\
         Here is the list of raw, extracted records:\n\
         ---\n\
         {}\n\
         ---\n\
         \n\
         {}",
        raw_records_json,
        format_instructions()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_prompt_embeds_document_and_schema() {
        let prompt = extraction_prompt("Account Number: 7851218574918");
        assert!(prompt.contains("Account Number: 7851218574918"));
        assert!(prompt.contains("\"records\""));
        for column in EXTRACT_COLUMNS {
            assert!(prompt.contains(column), "missing column {}", column);
        }
    }

    #[test]
    fn test_consolidation_prompt_embeds_records() {
        let prompt = consolidation_prompt("[{\"Account Number\": \"123\"}]");
        assert!(prompt.contains("[{\"Account Number\": \"123\"}]"));
        assert!(prompt.contains("overlapping dates"));
    }
}
