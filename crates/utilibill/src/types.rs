//! Core record types shared across the extraction pipeline, CSV sink, and scorer.

use serde::{Deserialize, Deserializer, Serialize};

/// Placeholder standing in for "field not found".
///
/// Every record field is either a real value or exactly this marker, never
/// empty and never null. The CSV sink and the scorer both rely on this
/// structurally: a missing field still occupies its column and still
/// participates in multiset comparison.
pub const MISSING: &str = "-";

/// CSV header for the source-document column.
pub const FILENAME_COLUMN: &str = "Filename";

/// The extracted fields, in fixed output order.
pub const EXTRACT_COLUMNS: [&str; 6] = [
    "Account Number",
    "Meter Number",
    "From Date",
    "To Date",
    "Usage",
    "Cost",
];

/// Columns that receive calendar normalization during scoring.
pub const DATE_COLUMNS: [&str; 2] = ["From Date", "To Date"];

/// One billing-period observation extracted from a document.
///
/// Fields serialize under their CSV header names. Deserialization maps JSON
/// null, absent, and blank values to [`MISSING`] so every field is always
/// present as a key regardless of what the model emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    /// Account number associated with the utility bill.
    #[serde(
        rename = "Account Number",
        default = "missing",
        deserialize_with = "value_or_missing"
    )]
    pub account_number: String,

    /// Meter registration number for the utility service.
    #[serde(
        rename = "Meter Number",
        default = "missing",
        deserialize_with = "value_or_missing"
    )]
    pub meter_number: String,

    /// Start of the billing period, canonical `YYYY-MM-DD`.
    #[serde(
        rename = "From Date",
        default = "missing",
        deserialize_with = "value_or_missing"
    )]
    pub from_date: String,

    /// End of the billing period, canonical `YYYY-MM-DD`.
    #[serde(
        rename = "To Date",
        default = "missing",
        deserialize_with = "value_or_missing"
    )]
    pub to_date: String,

    /// Total consumption for the period as a US-formatted numeric string.
    #[serde(rename = "Usage", default = "missing", deserialize_with = "value_or_missing")]
    pub usage: String,

    /// Total amount due for the period as a US-formatted numeric string,
    /// currency symbols stripped.
    #[serde(rename = "Cost", default = "missing", deserialize_with = "value_or_missing")]
    pub cost: String,
}

fn missing() -> String {
    MISSING.to_string()
}

fn value_or_missing<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    // Models occasionally emit bare numbers despite being asked for strings;
    // accept both rather than failing the whole payload.
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => MISSING.to_string(),
    })
}

impl ExtractedRecord {
    /// A record with every field set to the missing marker.
    pub fn empty() -> Self {
        Self {
            account_number: missing(),
            meter_number: missing(),
            from_date: missing(),
            to_date: missing(),
            usage: missing(),
            cost: missing(),
        }
    }

    /// True when every field is the missing marker.
    pub fn is_empty(&self) -> bool {
        self.values().iter().all(|v| *v == MISSING)
    }

    /// Field values in [`EXTRACT_COLUMNS`] order.
    pub fn values(&self) -> [&str; 6] {
        [
            &self.account_number,
            &self.meter_number,
            &self.from_date,
            &self.to_date,
            &self.usage,
            &self.cost,
        ]
    }

    /// Build a record from values in [`EXTRACT_COLUMNS`] order, mapping blank
    /// values back to the missing marker.
    pub fn from_values(values: [String; 6]) -> Self {
        let [account_number, meter_number, from_date, to_date, usage, cost] =
            values.map(|v| if v.trim().is_empty() { missing() } else { v });
        Self {
            account_number,
            meter_number,
            from_date,
            to_date,
            usage,
            cost,
        }
    }
}

impl Default for ExtractedRecord {
    fn default() -> Self {
        Self::empty()
    }
}

/// Structured-generation payload for one document (or one chunk of one
/// document): the ordered records the model found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentExtractionResult {
    #[serde(default)]
    pub records: Vec<ExtractedRecord>,
}

/// One output row: a canonical record tagged with its source file stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub filename: String,
    pub record: ExtractedRecord,
}
