//! Record reconciliation: merging duplicate or partial records from chunked
//! extraction (or repeated passes) into one canonical set per document.
//!
//! Two strategies implement the same [`Reconciler`] contract:
//!
//! - [`DeterministicReconciler`] - a pure merge algorithm, the default
//! - [`ModelAssistedReconciler`] - delegates the merge to the text model
//!
//! Whatever the strategy, the caller owns the failure fallback: a
//! reconciliation error must leave the raw records in play, never drop a
//! document's data.

use crate::error::Result;
use crate::generation::RecordExtractor;
use crate::text;
use crate::types::{ExtractedRecord, MISSING};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Merge a set of candidate records into a canonical, deduplicated set.
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// Short identifier used in log lines.
    fn name(&self) -> &str;

    /// Produce the canonical record set. Guarantees for any implementation:
    /// every output field value comes from some input record in its group
    /// (never fabricated), and a group with at least one real field survives.
    async fn reconcile(&self, records: &[ExtractedRecord]) -> Result<Vec<ExtractedRecord>>;
}

/// Pure merge algorithm.
///
/// Records are grouped by identity clues: an equal normalized account number,
/// an equal normalized meter number, or overlapping billing periods. Records
/// whose non-missing account or meter numbers conflict never share a group,
/// and a record with no matching clue stands alone. Within a group the most
/// complete value wins per field, first-seen on ties; groups that merge to an
/// entirely missing record are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeterministicReconciler;

impl DeterministicReconciler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Reconciler for DeterministicReconciler {
    fn name(&self) -> &str {
        "deterministic"
    }

    async fn reconcile(&self, records: &[ExtractedRecord]) -> Result<Vec<ExtractedRecord>> {
        let mut groups: Vec<Vec<&ExtractedRecord>> = Vec::new();

        for record in records {
            match groups
                .iter_mut()
                .find(|group| group.iter().any(|member| belong_together(member, record)))
            {
                Some(group) => group.push(record),
                None => groups.push(vec![record]),
            }
        }

        Ok(groups
            .into_iter()
            .map(|group| merge_group(&group))
            .filter(|record| !record.is_empty())
            .collect())
    }
}

/// Model-delegated merge. Errors surface to the caller, which falls back to
/// the raw records.
#[derive(Clone)]
pub struct ModelAssistedReconciler {
    extractor: RecordExtractor,
}

impl ModelAssistedReconciler {
    pub fn new(extractor: RecordExtractor) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl Reconciler for ModelAssistedReconciler {
    fn name(&self) -> &str {
        "model-assisted"
    }

    async fn reconcile(&self, records: &[ExtractedRecord]) -> Result<Vec<ExtractedRecord>> {
        let result = self.extractor.consolidate_records(records).await?;
        Ok(result
            .records
            .into_iter()
            .filter(|record| !record.is_empty())
            .collect())
    }
}

/// Identifier form used for clue comparison: lowercase alphanumerics only, so
/// `5356338-03` and `535633803` compare equal. `None` for missing values or
/// values with no comparable content.
fn comparable_id(value: &str) -> Option<String> {
    if value == MISSING {
        return None;
    }
    let id: String = value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Billing period as a date range; a single known endpoint counts as a
/// one-day period.
fn billing_period(record: &ExtractedRecord) -> Option<(NaiveDate, NaiveDate)> {
    let from = text::parse_date(&text::normalize_date(&record.from_date));
    let to = text::parse_date(&text::normalize_date(&record.to_date));
    match (from, to) {
        (Some(from), Some(to)) => Some((from.min(to), from.max(to))),
        (Some(date), None) | (None, Some(date)) => Some((date, date)),
        (None, None) => None,
    }
}

/// Whether two records carry enough matching identity clues to merge.
///
/// Conflicting non-missing account or meter numbers veto the merge outright;
/// otherwise any single matching clue (account, meter, or overlapping
/// periods) is enough. No clue in common means no merge - records are never
/// merged speculatively.
fn belong_together(a: &ExtractedRecord, b: &ExtractedRecord) -> bool {
    let accounts = (
        comparable_id(&a.account_number),
        comparable_id(&b.account_number),
    );
    let meters = (comparable_id(&a.meter_number), comparable_id(&b.meter_number));

    if let (Some(left), Some(right)) = (&accounts.0, &accounts.1) {
        if left != right {
            return false;
        }
    }
    if let (Some(left), Some(right)) = (&meters.0, &meters.1) {
        if left != right {
            return false;
        }
    }

    let account_match = matches!(&accounts, (Some(left), Some(right)) if left == right);
    let meter_match = matches!(&meters, (Some(left), Some(right)) if left == right);
    let period_match = match (billing_period(a), billing_period(b)) {
        (Some((a_from, a_to)), Some((b_from, b_to))) => a_from <= b_to && b_from <= a_to,
        _ => false,
    };

    account_match || meter_match || period_match
}

/// Completeness score for a candidate field value. Ordered comparison picks
/// the winner: real values beat the missing marker, more content beats less,
/// separator-formatted identifiers beat bare ones.
fn completeness(value: &str) -> (u8, usize, u8) {
    if value == MISSING {
        return (0, 0, 0);
    }
    let content = value.chars().filter(|c| c.is_ascii_alphanumeric()).count();
    let separated = value.chars().any(|c| matches!(c, '-' | '/' | '.' | ' '));
    (1, content, u8::from(separated))
}

/// Merge one group field-by-field. Iteration order is input order, and a
/// value is only replaced by a strictly better one, so ties resolve to the
/// first-seen value deterministically.
fn merge_group(group: &[&ExtractedRecord]) -> ExtractedRecord {
    let mut merged: [String; 6] = std::array::from_fn(|_| MISSING.to_string());

    for record in group {
        for (slot, value) in merged.iter_mut().zip(record.values()) {
            if completeness(value) > completeness(slot) {
                *slot = value.to_string();
            }
        }
    }

    ExtractedRecord::from_values(merged)
}
