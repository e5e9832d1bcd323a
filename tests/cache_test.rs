//! Result cache tests on a temporary directory

mod common;

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::path::Path;
use tempfile::TempDir;

use masothue::cache::{CacheConfig, CacheEntry, CacheKey, ResultCache};
use masothue::models::{CompanyRecord, TaxId};

use common::test_cache;

fn record(id: &str, name: &str) -> CompanyRecord {
    CompanyRecord {
        tax_id: TaxId::parse(id).ok(),
        name: Some(name.to_string()),
        ..Default::default()
    }
}

fn key(id: &str) -> CacheKey {
    CacheKey::for_tax_id(&TaxId::parse(id).unwrap())
}

/// Write an entry file directly, bypassing `put`
fn write_raw(dir: &Path, key: &CacheKey, cached_at: DateTime<Utc>, record: &CompanyRecord) -> u64 {
    let entry = CacheEntry {
        cached_at,
        record: record.clone(),
    };
    let bytes = serde_json::to_vec(&entry).unwrap();
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join(format!("{key}.json")), &bytes).unwrap();
    bytes.len() as u64
}

#[tokio::test]
async fn test_put_then_get() {
    let dir = TempDir::new().unwrap();
    let cache = test_cache(dir.path());
    let rec = record("3604062974", "CÔNG TY TNHH ABC");

    cache.put(&key("3604062974"), &rec).await;

    assert_eq!(cache.get(&key("3604062974")).await, Some(rec));
    assert_eq!(cache.get(&key("0100109106")).await, None);
    assert!(dir.path().join("3604062974.json").exists());
}

#[tokio::test]
async fn test_expired_entry_is_miss_and_pruned() {
    let dir = TempDir::new().unwrap();
    let cache = test_cache(dir.path());
    let stale_at = Utc::now() - ChronoDuration::days(8);

    write_raw(dir.path(), &key("3604062974"), stale_at, &record("3604062974", "A"));

    assert_eq!(cache.get(&key("3604062974")).await, None);

    let stats = cache.prune().await;
    assert_eq!(stats.deleted_count, 1);
    assert_eq!(stats.remaining_count, 0);
    assert!(!dir.path().join("3604062974.json").exists());
}

#[tokio::test]
async fn test_corrupt_entry_is_miss() {
    let dir = TempDir::new().unwrap();
    let cache = test_cache(dir.path());
    std::fs::write(dir.path().join("3604062974.json"), b"{not json").unwrap();

    assert_eq!(cache.get(&key("3604062974")).await, None);

    let stats = cache.prune().await;
    assert_eq!(stats.deleted_count, 1);
}

#[tokio::test]
async fn test_prune_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let cache = test_cache(dir.path());

    cache.put(&key("3604062974"), &record("3604062974", "A")).await;
    cache.put(&key("0100109106"), &record("0100109106", "B")).await;
    write_raw(
        dir.path(),
        &key("0312345678"),
        Utc::now() - ChronoDuration::days(30),
        &record("0312345678", "C"),
    );

    let first = cache.prune().await;
    assert_eq!(first.deleted_count, 1);
    assert_eq!(first.remaining_count, 2);

    let second = cache.prune().await;
    assert_eq!(second.deleted_count, 0);
    assert_eq!(second.remaining_count, 2);
    assert_eq!(second.remaining_bytes, first.remaining_bytes);
}

#[tokio::test]
async fn test_size_budget_evicts_oldest() {
    let dir = TempDir::new().unwrap();
    let base = Utc::now() - ChronoDuration::hours(3);
    // Whole seconds keep every file the same length
    let base = Utc.timestamp_opt(base.timestamp(), 0).unwrap();

    let ids = ["3604062974", "0100109106", "0312345678"];
    let mut size = 0;
    for (i, id) in ids.iter().enumerate() {
        size = write_raw(
            dir.path(),
            &key(id),
            base + ChronoDuration::minutes(i as i64),
            &record(id, "CÔNG TY"),
        );
    }

    let cache = ResultCache::new(CacheConfig {
        dir: dir.path().to_path_buf(),
        max_size_bytes: size * 2,
        auto_prune: false,
        ..Default::default()
    });

    let stats = cache.prune().await;
    assert_eq!(stats.deleted_count, 1);
    assert_eq!(stats.remaining_count, 2);
    assert!(stats.remaining_bytes <= size * 2);

    assert_eq!(cache.get(&key("3604062974")).await, None);
    assert!(cache.get(&key("0100109106")).await.is_some());
    assert!(cache.get(&key("0312345678")).await.is_some());
}

#[tokio::test]
async fn test_auto_prune_keeps_budget() {
    let dir = TempDir::new().unwrap();
    let cache = ResultCache::new(CacheConfig {
        dir: dir.path().to_path_buf(),
        max_size_bytes: 1,
        auto_prune: true,
        ..Default::default()
    });

    cache.put(&key("3604062974"), &record("3604062974", "A")).await;

    let stats = cache.stats().await.unwrap();
    assert_eq!(stats.entry_count, 0);
}

#[tokio::test]
async fn test_missing_directory() {
    let dir = TempDir::new().unwrap();
    let cache_dir = dir.path().join("not-created-yet");
    let cache = test_cache(&cache_dir);

    assert_eq!(cache.get(&key("3604062974")).await, None);
    assert_eq!(cache.prune().await.deleted_count, 0);
    assert_eq!(cache.stats().await.unwrap().entry_count, 0);

    cache.put(&key("3604062974"), &record("3604062974", "A")).await;
    assert!(cache.get(&key("3604062974")).await.is_some());
}

#[tokio::test]
async fn test_directory_removed_between_calls() {
    let dir = TempDir::new().unwrap();
    let cache_dir = dir.path().join("cache");
    let cache = test_cache(&cache_dir);

    cache.put(&key("3604062974"), &record("3604062974", "A")).await;
    std::fs::remove_dir_all(&cache_dir).unwrap();

    assert_eq!(cache.get(&key("3604062974")).await, None);
    cache.put(&key("3604062974"), &record("3604062974", "B")).await;
    assert_eq!(
        cache.get(&key("3604062974")).await.and_then(|r| r.name),
        Some("B".to_string())
    );
}

#[tokio::test]
async fn test_disabled_cache_is_noop() {
    let dir = TempDir::new().unwrap();
    let cache = ResultCache::new(CacheConfig {
        enabled: false,
        dir: dir.path().to_path_buf(),
        ..Default::default()
    });

    cache.put(&key("3604062974"), &record("3604062974", "A")).await;
    assert_eq!(cache.get(&key("3604062974")).await, None);
    assert!(!dir.path().join("3604062974.json").exists());
}

#[tokio::test]
async fn test_clear_and_delete() {
    let dir = TempDir::new().unwrap();
    let cache = test_cache(dir.path());

    cache.put(&key("3604062974"), &record("3604062974", "A")).await;
    cache.put(&key("0100109106"), &record("0100109106", "B")).await;

    assert!(cache.delete(&key("3604062974")).await);
    assert!(!cache.delete(&key("3604062974")).await);
    assert_eq!(cache.clear().await, 1);
    assert_eq!(cache.stats().await.unwrap().entry_count, 0);
}

#[tokio::test]
async fn test_concurrent_puts_same_key() {
    let dir = TempDir::new().unwrap();
    let cache = std::sync::Arc::new(test_cache(dir.path()));

    let mut tasks = Vec::new();
    for i in 0..16 {
        let cache = cache.clone();
        tasks.push(tokio::spawn(async move {
            cache
                .put(&key("3604062974"), &record("3604062974", &format!("N{i}")))
                .await;
            cache.get(&key("3604062974")).await
        }));
    }

    for task in futures::future::join_all(tasks).await {
        // Every read sees a complete entry from some writer
        let rec = task.unwrap().expect("entry readable");
        assert!(rec.name.unwrap().starts_with('N'));
    }

    let stats = cache.stats().await.unwrap();
    assert_eq!(stats.entry_count, 1);
}
