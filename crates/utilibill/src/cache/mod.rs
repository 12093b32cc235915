//! Fingerprint-addressed cache for parsed document text.
//!
//! Parsing is the slowest stage of the pipeline (a remote or CPU-heavy
//! collaborator call per document), so parsed text is persisted under a key
//! derived from the document's identity: file name, byte size, and
//! modification time. Any change to the file changes the fingerprint and
//! forces recomputation; the previous entry for the same document stem is
//! then evicted so at most one live entry exists per logical document.
//!
//! Cache failures never fail the pipeline: an unreadable or corrupt entry is
//! treated as a miss and recomputed, and a failed write only costs the next
//! run a re-parse. Writes go through a temp file and an atomic rename so
//! concurrent document workers never observe a half-written entry.

use crate::error::{Result, UtilibillError};
use crate::parsing::DocumentParser;
use ahash::AHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Cache key hash format width (32 hex digits for u64 hash)
const CACHE_KEY_HASH_WIDTH: usize = 32;

/// Cache entries hold parser output, which is markdown-flavored text.
const CACHE_ENTRY_EXT: &str = "md";

/// On-disk cache of parsed document text, one file per live fingerprint.
#[derive(Debug, Clone)]
pub struct ParsedTextCache {
    cache_dir: PathBuf,
}

impl ParsedTextCache {
    /// Create a cache rooted at `cache_dir`. The directory is created lazily
    /// on first write, not here.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Derive the cache fingerprint for a source file from its name, byte
    /// size, and modification time. Best-effort identity, not cryptographic:
    /// any metadata change must change the key.
    pub fn fingerprint(path: &Path) -> Result<String> {
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                UtilibillError::validation(format!("invalid document path: {}", path.display()))
            })?;
        let metadata = fs::metadata(path)?;
        let size = metadata.len();
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let mut hasher = AHasher::default();
        format!("name={}&size={}&mtime={}", name, size, mtime).hash(&mut hasher);
        Ok(format!(
            "{:0width$x}",
            hasher.finish(),
            width = CACHE_KEY_HASH_WIDTH
        ))
    }

    fn entry_path(&self, stem: &str, fingerprint: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}-{}.{}", stem, fingerprint, CACHE_ENTRY_EXT))
    }

    fn document_stem(path: &Path) -> String {
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string()
    }

    /// Look up cached text for the file's current fingerprint. Returns `None`
    /// on any failure: a cache read problem is a miss, never a hard error.
    pub fn get(&self, path: &Path) -> Option<String> {
        let fingerprint = Self::fingerprint(path).ok()?;
        let entry = self.entry_path(&Self::document_stem(path), &fingerprint);
        if !entry.exists() {
            return None;
        }
        match fs::read_to_string(&entry) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::debug!("unreadable cache entry {}: {}", entry.display(), e);
                // Best-effort cleanup of the corrupt entry so the rewrite is clean
                if let Err(e) = fs::remove_file(&entry) {
                    tracing::debug!("failed to remove corrupt cache entry: {}", e);
                }
                None
            }
        }
    }

    /// Persist parsed text under the file's current fingerprint, then evict
    /// any stale entries for the same document stem.
    pub fn store(&self, path: &Path, text: &str) -> Result<()> {
        fs::create_dir_all(&self.cache_dir).map_err(|e| {
            UtilibillError::cache(format!(
                "failed to create cache directory {}: {}",
                self.cache_dir.display(),
                e
            ))
        })?;

        let fingerprint = Self::fingerprint(path)?;
        let stem = Self::document_stem(path);
        let entry = self.entry_path(&stem, &fingerprint);

        // Write-temp-then-rename: a concurrent reader either sees the old
        // entry, no entry, or the complete new entry.
        let tmp = entry.with_extension("tmp");
        fs::write(&tmp, text)
            .map_err(|e| UtilibillError::cache(format!("failed to write cache entry: {}", e)))?;
        fs::rename(&tmp, &entry)
            .map_err(|e| UtilibillError::cache(format!("failed to commit cache entry: {}", e)))?;

        self.evict_stale(&stem, &fingerprint);
        Ok(())
    }

    /// Read-before-write wrapper around the parsing collaborator.
    ///
    /// Cache hit returns the stored text without recomputation. On a miss the
    /// parser runs; a non-empty result is persisted. Parser failure logs a
    /// warning and yields empty text so one bad document never aborts a batch,
    /// and failures are never cached.
    pub async fn get_or_parse(&self, path: &Path, parser: &dyn DocumentParser) -> Result<String> {
        if let Some(text) = self.get(path) {
            tracing::debug!("cache hit for {}", path.display());
            return Ok(text);
        }

        let text = match parser.parse(path).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("{} parser failed for {}: {}", parser.name(), path.display(), e);
                return Ok(String::new());
            }
        };

        if !text.is_empty() {
            if let Err(e) = self.store(path, &text) {
                // Cache write failure only costs the next run a re-parse
                tracing::debug!("failed to cache parsed text for {}: {}", path.display(), e);
            }
        }
        Ok(text)
    }

    /// Remove entries for `stem` whose fingerprint differs from the one just
    /// written. At most one live entry per logical document.
    fn evict_stale(&self, stem: &str, keep_fingerprint: &str) {
        let read_dir = match fs::read_dir(&self.cache_dir) {
            Ok(rd) => rd,
            Err(e) => {
                tracing::debug!("failed to scan cache directory: {}", e);
                return;
            }
        };

        for entry in read_dir.flatten() {
            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some(fingerprint) = entry_fingerprint(file_name, stem) else {
                continue;
            };
            if fingerprint != keep_fingerprint {
                if let Err(e) = fs::remove_file(&path) {
                    tracing::debug!("failed to evict stale cache entry {}: {}", path.display(), e);
                }
            }
        }
    }

    /// Remove every cache entry. Returns the number of entries removed and
    /// the bytes freed.
    pub fn clear(&self) -> Result<(usize, u64)> {
        if !self.cache_dir.exists() {
            return Ok((0, 0));
        }

        let mut removed_count = 0;
        let mut removed_bytes = 0;

        let read_dir = fs::read_dir(&self.cache_dir)
            .map_err(|e| UtilibillError::cache(format!("failed to read cache directory: {}", e)))?;

        for entry in read_dir {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!("error reading cache entry: {}", e);
                    continue;
                }
            };

            let metadata = match entry.metadata() {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };

            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some(CACHE_ENTRY_EXT) {
                continue;
            }

            match fs::remove_file(&path) {
                Ok(_) => {
                    removed_count += 1;
                    removed_bytes += metadata.len();
                }
                Err(e) => {
                    tracing::debug!("failed to remove {}: {}", path.display(), e);
                }
            }
        }

        Ok((removed_count, removed_bytes))
    }
}

/// Parse `<stem>-<32 hex digits>.md` and return the fingerprint, or `None`
/// when the file name does not belong to `stem`. The strict suffix check
/// keeps a document named `acme` from matching entries of `acme-archive`.
fn entry_fingerprint<'a>(file_name: &'a str, stem: &str) -> Option<&'a str> {
    let rest = file_name.strip_prefix(stem)?.strip_prefix('-')?;
    let fingerprint = rest.strip_suffix(&format!(".{}", CACHE_ENTRY_EXT))?;
    if fingerprint.len() == CACHE_KEY_HASH_WIDTH
        && fingerprint.chars().all(|c| c.is_ascii_hexdigit())
    {
        Some(fingerprint)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::MockParser;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_source(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(content).unwrap();
        path
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let dir = tempdir().unwrap();
        let source = write_source(dir.path(), "bill.pdf", b"content");

        let first = ParsedTextCache::fingerprint(&source).unwrap();
        let second = ParsedTextCache::fingerprint(&source).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 32);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_changes_with_size() {
        let dir = tempdir().unwrap();
        let source = write_source(dir.path(), "bill.pdf", b"content");
        let before = ParsedTextCache::fingerprint(&source).unwrap();

        let mut f = fs::OpenOptions::new().append(true).open(&source).unwrap();
        f.write_all(b" and more").unwrap();
        drop(f);

        let after = ParsedTextCache::fingerprint(&source).unwrap();
        assert_ne!(before, after);
    }

    #[tokio::test]
    async fn test_get_or_parse_hits_cache_on_second_call() {
        let dir = tempdir().unwrap();
        let source = write_source(dir.path(), "bill.pdf", b"raw pdf bytes");
        let cache = ParsedTextCache::new(dir.path().join("cache"));

        let parser = MockParser::new();
        parser.add_text("bill.pdf", "# Parsed bill\nAccount: 123");

        let first = cache.get_or_parse(&source, &parser).await.unwrap();
        let second = cache.get_or_parse(&source, &parser).await.unwrap();

        assert_eq!(first, "# Parsed bill\nAccount: 123");
        assert_eq!(first, second);
        assert_eq!(parser.call_count(), 1, "second call must not re-parse");
    }

    #[tokio::test]
    async fn test_changed_file_forces_recompute_and_evicts_stale_entry() {
        let dir = tempdir().unwrap();
        let source = write_source(dir.path(), "bill.pdf", b"v1");
        let cache_dir = dir.path().join("cache");
        let cache = ParsedTextCache::new(&cache_dir);

        let parser = MockParser::new();
        parser.add_text("bill.pdf", "first parse");
        cache.get_or_parse(&source, &parser).await.unwrap();

        // Grow the file so size (and fingerprint) changes.
        let mut f = fs::OpenOptions::new().append(true).open(&source).unwrap();
        f.write_all(b" now longer").unwrap();
        drop(f);

        parser.add_text("bill.pdf", "second parse");
        let text = cache.get_or_parse(&source, &parser).await.unwrap();
        assert_eq!(text, "second parse");
        assert_eq!(parser.call_count(), 2);

        let entries: Vec<_> = fs::read_dir(&cache_dir)
            .unwrap()
            .flatten()
            .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("md"))
            .collect();
        assert_eq!(entries.len(), 1, "stale entry must be evicted");
    }

    #[tokio::test]
    async fn test_parser_failure_returns_empty_and_caches_nothing() {
        let dir = tempdir().unwrap();
        let source = write_source(dir.path(), "broken.pdf", b"bytes");
        let cache_dir = dir.path().join("cache");
        let cache = ParsedTextCache::new(&cache_dir);

        let parser = MockParser::new();
        parser.add_failure("broken.pdf", "upstream outage");

        let text = cache.get_or_parse(&source, &parser).await.unwrap();
        assert!(text.is_empty());
        assert!(
            !cache_dir.exists() || fs::read_dir(&cache_dir).unwrap().next().is_none(),
            "failures must not be cached"
        );
    }

    #[tokio::test]
    async fn test_empty_parse_result_not_cached() {
        let dir = tempdir().unwrap();
        let source = write_source(dir.path(), "empty.pdf", b"bytes");
        let cache = ParsedTextCache::new(dir.path().join("cache"));

        let parser = MockParser::new();
        let text = cache.get_or_parse(&source, &parser).await.unwrap();
        assert!(text.is_empty());

        // A second call parses again rather than hitting a cached empty entry.
        cache.get_or_parse(&source, &parser).await.unwrap();
        assert_eq!(parser.call_count(), 2);
    }

    #[test]
    fn test_corrupt_entry_treated_as_miss() {
        let dir = tempdir().unwrap();
        let source = write_source(dir.path(), "bill.pdf", b"bytes");
        let cache_dir = dir.path().join("cache");
        let cache = ParsedTextCache::new(&cache_dir);

        cache.store(&source, "good text").unwrap();

        // Overwrite the entry with invalid UTF-8.
        let fingerprint = ParsedTextCache::fingerprint(&source).unwrap();
        let entry = cache_dir.join(format!("bill-{}.md", fingerprint));
        fs::write(&entry, [0xFF, 0xFE, 0xFD]).unwrap();

        assert!(cache.get(&source).is_none());
        assert!(!entry.exists(), "corrupt entry is removed");
    }

    #[test]
    fn test_store_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let source = write_source(dir.path(), "bill.pdf", b"bytes");
        let cache_dir = dir.path().join("cache");
        let cache = ParsedTextCache::new(&cache_dir);

        cache.store(&source, "text").unwrap();

        let leftovers: Vec<_> = fs::read_dir(&cache_dir)
            .unwrap()
            .flatten()
            .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_eviction_respects_similar_stems() {
        let dir = tempdir().unwrap();
        let source_a = write_source(dir.path(), "acme.pdf", b"a");
        let source_b = write_source(dir.path(), "acme-archive.pdf", b"b");
        let cache = ParsedTextCache::new(dir.path().join("cache"));

        cache.store(&source_b, "archive text").unwrap();
        cache.store(&source_a, "acme text").unwrap();

        assert_eq!(cache.get(&source_b).unwrap(), "archive text");
        assert_eq!(cache.get(&source_a).unwrap(), "acme text");
    }

    #[test]
    fn test_clear_removes_all_entries() {
        let dir = tempdir().unwrap();
        let source_a = write_source(dir.path(), "one.pdf", b"a");
        let source_b = write_source(dir.path(), "two.pdf", b"bb");
        let cache = ParsedTextCache::new(dir.path().join("cache"));

        cache.store(&source_a, "text one").unwrap();
        cache.store(&source_b, "text two").unwrap();

        let (removed, bytes) = cache.clear().unwrap();
        assert_eq!(removed, 2);
        assert!(bytes > 0);
        assert!(cache.get(&source_a).is_none());
    }

    #[test]
    fn test_clear_missing_directory_is_noop() {
        let dir = tempdir().unwrap();
        let cache = ParsedTextCache::new(dir.path().join("never-created"));
        assert_eq!(cache.clear().unwrap(), (0, 0));
    }
}
