//! Durable result cache for company records
//!
//! One JSON file per entry under the cache directory, named by its key.
//! Each file holds the record and its creation time.
//!
//! - Reads are lazy-expiring: an entry older than the expiry is a miss
//! - Missing, unreadable or corrupt files are misses, never errors
//! - Writes are best-effort (temp file, then rename)
//! - [`ResultCache::prune`] drops expired and corrupt entries, then the
//!   oldest entries until the directory fits the size budget
//!
//! Access is serialized per entry through striped locks, so hits on
//! different keys never wait on each other.
//!
//! # Example
//!
//! ```rust,ignore
//! use masothue::cache::{CacheConfig, CacheKey, ResultCache};
//!
//! let cache = ResultCache::new(CacheConfig::default());
//! let key = CacheKey::for_tax_id(&tax_id);
//! cache.put(&key, &record).await;
//! let cached = cache.get(&key).await;
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::models::{CompanyRecord, TaxId};
use crate::utils::error::CacheError;
use crate::utils::sha256_hex;

const ENTRY_EXTENSION: &str = "json";
const LOCK_STRIPES: usize = 64;

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Disable to make every lookup a miss and every write a no-op
    pub enabled: bool,

    /// Directory holding one file per entry
    pub dir: PathBuf,

    /// Entries older than this are ignored and pruned
    pub expiry: Duration,

    /// Size budget for all entries, in bytes
    pub max_size_bytes: u64,

    /// Prune after a write that pushes the directory over budget
    pub auto_prune: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from(".cache"),
            expiry: Duration::from_secs(7 * 24 * 60 * 60),
            max_size_bytes: 100 * 1024 * 1024,
            auto_prune: true,
        }
    }
}

/// Cache key: a tax identifier or a hex digest of a detail reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_tax_id(id: &TaxId) -> Self {
        Self(id.as_str().to_string())
    }

    pub fn for_reference(reference: &str) -> Self {
        Self(sha256_hex(reference.trim()))
    }

    /// Accept a raw key; only `[0-9a-f]` keys map to safe file names
    pub fn parse(raw: &str) -> Result<Self, CacheError> {
        let valid = !raw.is_empty()
            && raw
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(CacheError::InvalidKey(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persisted entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub cached_at: DateTime<Utc>,
    pub record: CompanyRecord,
}

/// Result of a prune pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PruneStats {
    pub deleted_count: usize,
    pub freed_bytes: u64,
    pub remaining_count: usize,
    pub remaining_bytes: u64,
}

/// Directory usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entry_count: usize,
    pub total_bytes: u64,
}

/// Scanned entry file
struct EntryFile {
    stem: String,
    path: PathBuf,
    size: u64,
    /// `None` when the file cannot be decoded
    cached_at: Option<DateTime<Utc>>,
}

/// File-backed record cache, shared across workers
#[derive(Debug)]
pub struct ResultCache {
    config: CacheConfig,
    locks: Vec<RwLock<()>>,
}

impl ResultCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            locks: (0..LOCK_STRIPES).map(|_| RwLock::new(())).collect(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn entry_path(&self, stem: &str) -> PathBuf {
        self.config.dir.join(format!("{stem}.{ENTRY_EXTENSION}"))
    }

    fn lock_for(&self, stem: &str) -> &RwLock<()> {
        let mut hasher = DefaultHasher::new();
        stem.hash(&mut hasher);
        &self.locks[(hasher.finish() as usize) % self.locks.len()]
    }

    fn is_expired(&self, cached_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match (now - cached_at).to_std() {
            Ok(age) => age > self.config.expiry,
            // Timestamp in the future: treat as fresh
            Err(_) => false,
        }
    }

    /// Look up a record; any failure is a miss
    pub async fn get(&self, key: &CacheKey) -> Option<CompanyRecord> {
        if !self.config.enabled {
            return None;
        }

        let path = self.entry_path(key.as_str());
        let bytes = {
            let _guard = self.lock_for(key.as_str()).read().await;
            match fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
                Err(e) => {
                    let error = CacheError::io(&path, e);
                    warn!(error = %error, "Cache read failed");
                    return None;
                }
            }
        };

        let entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(source) => {
                let error = CacheError::Corrupt { path, source };
                warn!(error = %error, "Ignoring corrupt cache entry");
                return None;
            }
        };

        if self.is_expired(entry.cached_at, Utc::now()) {
            debug!(key = %key, cached_at = %entry.cached_at, "Cache entry expired");
            return None;
        }

        debug!(key = %key, "Cache hit");
        Some(entry.record)
    }

    /// Store a record; failures are logged and otherwise ignored
    pub async fn put(&self, key: &CacheKey, record: &CompanyRecord) {
        if !self.config.enabled {
            return;
        }

        match self.write_entry(key, record).await {
            Ok(bytes) => {
                debug!(key = %key, bytes = bytes, "Cached record");
                if self.config.auto_prune {
                    self.prune_if_over_budget().await;
                }
            }
            Err(e) => warn!(key = %key, error = %e, "Cache write failed; continuing without cache"),
        }
    }

    async fn write_entry(&self, key: &CacheKey, record: &CompanyRecord) -> Result<u64, CacheError> {
        let entry = CacheEntry {
            cached_at: Utc::now(),
            record: record.clone(),
        };
        let payload = serde_json::to_vec(&entry).map_err(|source| CacheError::Corrupt {
            path: self.entry_path(key.as_str()),
            source,
        })?;

        let path = self.entry_path(key.as_str());
        let temp_path = self.config.dir.join(format!("{key}.{ENTRY_EXTENSION}.tmp"));

        let _guard = self.lock_for(key.as_str()).write().await;

        fs::create_dir_all(&self.config.dir)
            .await
            .map_err(|e| CacheError::io(&self.config.dir, e))?;
        fs::write(&temp_path, &payload)
            .await
            .map_err(|e| CacheError::io(&temp_path, e))?;
        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(CacheError::io(&path, e));
        }

        Ok(payload.len() as u64)
    }

    /// Remove one entry; returns whether it existed
    pub async fn delete(&self, key: &CacheKey) -> bool {
        let path = self.entry_path(key.as_str());
        let _guard = self.lock_for(key.as_str()).write().await;
        fs::remove_file(&path).await.is_ok()
    }

    /// Enforce expiry and the size budget
    ///
    /// Expired and corrupt entries are always deleted; then the oldest
    /// entries go until the total fits `max_size_bytes`. Running it twice
    /// with no writes in between deletes nothing the second time.
    pub async fn prune(&self) -> PruneStats {
        let files = match self.scan(true).await {
            Ok(files) => files,
            Err(e) => {
                debug!(error = %e, "Cache directory unavailable; nothing to prune");
                return PruneStats::default();
            }
        };

        let now = Utc::now();
        let mut stats = PruneStats::default();
        let mut live = Vec::new();

        for file in files {
            let stale = match file.cached_at {
                Some(cached_at) => self.is_expired(cached_at, now),
                None => true,
            };
            if stale {
                if self.remove_scanned(&file).await {
                    stats.deleted_count += 1;
                    stats.freed_bytes += file.size;
                }
            } else {
                live.push(file);
            }
        }

        // Oldest first; name breaks ties so the order is deterministic
        live.sort_by(|a, b| a.cached_at.cmp(&b.cached_at).then_with(|| a.stem.cmp(&b.stem)));

        let mut total: u64 = live.iter().map(|f| f.size).sum();
        let mut kept = 0usize;

        for file in &live {
            if total > self.config.max_size_bytes {
                if self.remove_scanned(file).await {
                    stats.deleted_count += 1;
                    stats.freed_bytes += file.size;
                }
                total = total.saturating_sub(file.size);
            } else {
                kept += 1;
            }
        }

        stats.remaining_count = kept;
        stats.remaining_bytes = total;

        if stats.deleted_count > 0 {
            info!(
                deleted = stats.deleted_count,
                freed_bytes = stats.freed_bytes,
                remaining = stats.remaining_count,
                "Cache pruned"
            );
        }

        stats
    }

    async fn prune_if_over_budget(&self) {
        match self.stats().await {
            Ok(usage) if usage.total_bytes > self.config.max_size_bytes => {
                self.prune().await;
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "Skipping auto-prune"),
        }
    }

    /// Delete a scanned file unless it was rewritten since the scan
    async fn remove_scanned(&self, file: &EntryFile) -> bool {
        let _guard = self.lock_for(&file.stem).write().await;

        match fs::metadata(&file.path).await {
            Ok(meta) if meta.len() == file.size => {}
            _ => return false,
        }
        if let Some(cached_at) = file.cached_at {
            // A concurrent put may have replaced the entry with one of equal size
            if let Ok(bytes) = fs::read(&file.path).await {
                match serde_json::from_slice::<CacheEntry>(&bytes) {
                    Ok(entry) if entry.cached_at != cached_at => return false,
                    _ => {}
                }
            }
        }

        match fs::remove_file(&file.path).await {
            Ok(()) => true,
            Err(e) => {
                let error = CacheError::io(&file.path, e);
                warn!(error = %error, "Failed to delete cache entry");
                false
            }
        }
    }

    /// Remove every entry; returns the number of files deleted
    pub async fn clear(&self) -> usize {
        let files = match self.scan(false).await {
            Ok(files) => files,
            Err(_) => return 0,
        };

        let mut deleted = 0;
        for file in files {
            let _guard = self.lock_for(&file.stem).write().await;
            if fs::remove_file(&file.path).await.is_ok() {
                deleted += 1;
            }
        }

        info!(deleted = deleted, dir = %self.config.dir.display(), "Cache cleared");
        deleted
    }

    /// Entry count and exact byte size of persisted entries
    pub async fn stats(&self) -> Result<CacheStats, CacheError> {
        let files = self.scan(false).await?;
        Ok(CacheStats {
            entry_count: files.len(),
            total_bytes: files.iter().map(|f| f.size).sum(),
        })
    }

    /// List entry files; `decode` also reads each file's timestamp
    async fn scan(&self, decode: bool) -> Result<Vec<EntryFile>, CacheError> {
        let dir = &self.config.dir;
        let mut reader = match fs::read_dir(dir).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CacheError::io(dir, e)),
        };

        let mut files = Vec::new();
        while let Some(dirent) = reader
            .next_entry()
            .await
            .map_err(|e| CacheError::io(dir, e))?
        {
            let path = dirent.path();
            let Some(stem) = entry_stem(&path) else {
                continue;
            };
            let Ok(meta) = dirent.metadata().await else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }

            let cached_at = if decode {
                read_timestamp(&path).await
            } else {
                None
            };

            files.push(EntryFile {
                stem,
                path,
                size: meta.len(),
                cached_at,
            });
        }

        Ok(files)
    }
}

fn entry_stem(path: &Path) -> Option<String> {
    if path.extension()? != ENTRY_EXTENSION {
        return None;
    }
    path.file_stem()?.to_str().map(str::to_string)
}

async fn read_timestamp(path: &Path) -> Option<DateTime<Utc>> {
    let bytes = fs::read(path).await.ok()?;
    serde_json::from_slice::<CacheEntry>(&bytes)
        .ok()
        .map(|entry| entry.cached_at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_forms() {
        let id = TaxId::parse("3604062974").unwrap();
        assert_eq!(CacheKey::for_tax_id(&id).as_str(), "3604062974");

        let key = CacheKey::for_reference("https://masothue.com/abc");
        assert_eq!(key.as_str().len(), 64);
        assert!(CacheKey::parse(key.as_str()).is_ok());
    }

    #[test]
    fn test_cache_key_rejects_paths() {
        assert!(CacheKey::parse("../etc/passwd").is_err());
        assert!(CacheKey::parse("").is_err());
        assert!(CacheKey::parse("ABC").is_err());
    }

    #[test]
    fn test_entry_stem() {
        assert_eq!(
            entry_stem(Path::new("/tmp/c/3604062974.json")).as_deref(),
            Some("3604062974")
        );
        assert_eq!(entry_stem(Path::new("/tmp/c/3604062974.json.tmp")), None);
    }

    #[tokio::test]
    async fn test_disabled_cache_is_inert() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::new(CacheConfig {
            enabled: false,
            dir: dir.path().to_path_buf(),
            ..Default::default()
        });
        let key = CacheKey::parse("3604062974").unwrap();
        cache.put(&key, &CompanyRecord::default()).await;
        assert!(cache.get(&key).await.is_none());
        assert_eq!(cache.stats().await.unwrap().entry_count, 0);
    }
}
