//! Deterministic text chunking for documents too long for a single
//! structured-generation call.
//!
//! The splitter is a pure function of its inputs: the same text and config
//! always produce the same chunk sequence. Each window is cut at the largest
//! structural boundary available (paragraph break, then line break, then
//! sentence end, then word gap, then a raw character cut), and consecutive
//! chunks overlap so a record's supporting evidence is never split invisibly
//! across a boundary.
//!
//! Chunks carry character offsets into the original text. Dropping each
//! chunk's overlapped prefix and concatenating the rest reproduces the input
//! exactly; `tests` asserts this property directly.

use crate::error::{Result, UtilibillError};
use serde::{Deserialize, Serialize};

/// One window of the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// Position of a chunk within its source text, in characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub char_start: usize,
    pub char_end: usize,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

/// Splitter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk.
    pub max_characters: usize,
    /// Characters shared between consecutive chunks.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_characters: 4000,
            overlap: 300,
        }
    }
}

/// Boundary patterns in preference order. Later entries are only consulted
/// when no earlier pattern occurs inside the window.
const BOUNDARIES: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Split `text` into overlapping chunks of at most `max_characters`
/// characters each.
///
/// # Errors
///
/// Returns a validation error when `max_characters` is zero or `overlap` is
/// not strictly smaller than `max_characters`.
pub fn split_text(text: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>> {
    if config.max_characters == 0 {
        return Err(UtilibillError::validation(
            "invalid chunking configuration: max_characters must be positive",
        ));
    }
    if config.overlap >= config.max_characters {
        return Err(UtilibillError::validation(format!(
            "invalid chunking configuration: overlap {} must be smaller than max_characters {}",
            config.overlap, config.max_characters
        )));
    }
    if text.is_empty() {
        return Ok(vec![]);
    }

    // Byte offset of every character, so all slicing below stays on char
    // boundaries regardless of multi-byte content.
    let offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let total_chars = offsets.len();
    let byte_at = |char_idx: usize| {
        if char_idx >= total_chars {
            text.len()
        } else {
            offsets[char_idx]
        }
    };

    let mut ranges: Vec<(usize, usize)> = Vec::new();
    let mut start = 0usize;
    let mut prev_end = 0usize;

    loop {
        let remaining = total_chars - start;
        if remaining <= config.max_characters {
            ranges.push((start, total_chars));
            break;
        }

        let window_end = start + config.max_characters;
        let window = &text[byte_at(start)..byte_at(window_end)];
        let cut = find_cut(window)
            .map(|relative| start + relative)
            .unwrap_or(window_end)
            // The cut must make progress past already-emitted text even when
            // the best boundary falls inside the previous chunk's overlap.
            .clamp(prev_end + 1, window_end);

        ranges.push((start, cut));
        prev_end = cut;
        start = cut.saturating_sub(config.overlap).max(start + 1);
    }

    let total_chunks = ranges.len();
    Ok(ranges
        .into_iter()
        .enumerate()
        .map(|(chunk_index, (char_start, char_end))| Chunk {
            content: text[byte_at(char_start)..byte_at(char_end)].to_string(),
            metadata: ChunkMetadata {
                char_start,
                char_end,
                chunk_index,
                total_chunks,
            },
        })
        .collect())
}

/// Best cut position inside `window` as a character count, or `None` when the
/// window contains no structural boundary at all.
fn find_cut(window: &str) -> Option<usize> {
    for boundary in BOUNDARIES {
        if let Some(byte_idx) = window.rfind(boundary) {
            let cut_chars = window[..byte_idx + boundary.len()].chars().count();
            if cut_chars > 0 {
                return Some(cut_chars);
            }
        }
    }
    None
}
