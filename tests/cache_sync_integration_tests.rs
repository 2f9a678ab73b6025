//! Integration Tests for the Cache Engine and Sync Orchestrator
//!
//! Exercises the public API end to end over the in-memory and file stores.

use local_cache::cache::{loader, CacheLevel, CacheOptions};
use local_cache::store::{MemoryStore, PersistentStore};
use local_cache::sync::{SyncCategory, SyncEventKind, SyncOptions, SyncOrchestrator, SyncSettings};
use local_cache::{CacheEngine, CacheSettings, JsonFileStore};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;

// == Helper Functions ==

async fn create_engine(store: Arc<dyn PersistentStore>) -> Arc<CacheEngine> {
    let engine = Arc::new(CacheEngine::new(store, CacheSettings::default()));
    engine.initialize().await.unwrap();
    engine
}

async fn create_orchestrator(store: Arc<dyn PersistentStore>) -> Arc<SyncOrchestrator> {
    let engine = create_engine(store.clone()).await;
    let orchestrator = Arc::new(SyncOrchestrator::new(engine, store, SyncSettings::default()));
    orchestrator
        .initialize(SyncOptions {
            enable_auto_sync: false,
            interval: Duration::from_secs(60),
        })
        .await
        .unwrap();
    orchestrator
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Transaction {
    id: u32,
    amount_cents: i64,
    memo: String,
}

// == Cache Engine ==

#[tokio::test]
async fn test_ttl_visible_then_absent() {
    let engine = create_engine(Arc::new(MemoryStore::new())).await;
    let options = CacheOptions::default().ttl(Duration::from_millis(100));
    engine.cache_data("quote", &json!({"eur": 1.08}), options).await.unwrap();

    let fresh: Option<serde_json::Value> = engine.get_cached_data("quote").await.unwrap();
    assert_eq!(fresh, Some(json!({"eur": 1.08})));

    sleep(Duration::from_millis(150)).await;
    let stale: Option<serde_json::Value> = engine.get_cached_data("quote").await.unwrap();
    assert_eq!(stale, None);
}

#[tokio::test]
async fn test_category_invalidation() {
    let engine = create_engine(Arc::new(MemoryStore::new())).await;
    let finance = CacheOptions::default().category("finance");

    for id in 0..3 {
        let tx = Transaction {
            id,
            amount_cents: -1250,
            memo: "coffee".to_string(),
        };
        engine
            .cache_data(&format!("tx:{id}"), &tx, finance.clone())
            .await
            .unwrap();
    }
    engine
        .cache_data("layout", &json!({"columns": 2}), CacheOptions::default().category("ui"))
        .await
        .unwrap();

    assert_eq!(engine.clear_cache_by_category("finance").await.unwrap(), 3);
    for id in 0..3 {
        let gone: Option<Transaction> = engine.get_cached_data(&format!("tx:{id}")).await.unwrap();
        assert_eq!(gone, None);
    }
    assert!(engine.contains_key("layout").await.unwrap());
}

#[tokio::test]
async fn test_write_through_promotion() {
    let store = Arc::new(MemoryStore::new());
    let engine = create_engine(store.clone()).await;
    let tx = Transaction {
        id: 7,
        amount_cents: 420_00,
        memo: "salary".to_string(),
    };

    engine
        .cache_data("tx:7", &tx, CacheOptions::default().level(CacheLevel::Disk))
        .await
        .unwrap();
    assert_eq!(engine.get_cached_data::<Transaction>("tx:7").await.unwrap(), Some(tx.clone()));

    // The promoted memory copy keeps serving after the disk copy disappears
    store.delete("cache:tx:7").await.unwrap();
    assert_eq!(engine.get_cached_data::<Transaction>("tx:7").await.unwrap(), Some(tx));
}

#[tokio::test]
async fn test_statistics_track_reads() {
    let engine = create_engine(Arc::new(MemoryStore::new())).await;
    engine.cache_data("a", "1", CacheOptions::default()).await.unwrap();

    for _ in 0..3 {
        engine.get_cached_data::<String>("a").await.unwrap();
    }
    engine.get_cached_data::<String>("b").await.unwrap();

    let stats = engine.get_statistics().await.unwrap();
    assert_eq!(stats.hits, 3);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hit_rate(), 0.75);
    assert_eq!(stats.memory_entries, 1);
    assert_eq!(stats.disk_entries, 1);
}

#[tokio::test]
async fn test_clear_all_is_idempotent() {
    let engine = create_engine(Arc::new(MemoryStore::new())).await;
    engine.cache_data("a", "1", CacheOptions::default()).await.unwrap();

    engine.clear_all_cache().await.unwrap();
    engine.clear_all_cache().await.unwrap();

    let stats = engine.get_statistics().await.unwrap();
    assert_eq!(stats.memory_entries, 0);
    assert_eq!(stats.disk_entries, 0);
}

#[tokio::test]
async fn test_preload_then_read() {
    let engine = create_engine(Arc::new(MemoryStore::new())).await;
    let loaders = vec![
        ("accounts".to_string(), loader(|| async { Ok(vec!["checking", "savings"]) })),
        (
            "rates".to_string(),
            loader(|| async { Err::<(), _>(anyhow::anyhow!("rate service down")) }),
        ),
    ];

    let report = engine.preload_data(loaders, CacheOptions::default()).await.unwrap();
    assert_eq!(report.loaded, vec!["accounts".to_string()]);
    assert_eq!(report.failed.len(), 1);

    let accounts: Option<Vec<String>> = engine.get_cached_data("accounts").await.unwrap();
    assert_eq!(accounts.map(|a| a.len()), Some(2));
}

#[tokio::test]
async fn test_file_store_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache").join("store.json");

    {
        let engine = create_engine(Arc::new(JsonFileStore::new(path.clone()))).await;
        engine
            .cache_data("/home/user/report.pdf", &json!({"pages": 12}), CacheOptions::default())
            .await
            .unwrap();
        engine
            .cache_data("scratch", &json!(1), CacheOptions::default().level(CacheLevel::Memory))
            .await
            .unwrap();
    }

    let engine = create_engine(Arc::new(JsonFileStore::new(path))).await;
    let report: Option<serde_json::Value> =
        engine.get_cached_data("/home/user/report.pdf").await.unwrap();
    assert_eq!(report, Some(json!({"pages": 12})));
    assert_eq!(engine.get_cached_data::<i32>("scratch").await.unwrap(), None);
    assert_eq!(
        engine.keys_with_prefix("/home/user/").await,
        vec!["/home/user/report.pdf".to_string()]
    );
}

// == Sync Orchestrator ==

#[tokio::test]
async fn test_sync_then_read_from_cache() {
    let store = Arc::new(MemoryStore::new());
    store
        .put("data:bookmarks", serde_json::to_vec(&json!(["/docs", "/taxes"])).unwrap())
        .await
        .unwrap();
    let orchestrator = create_orchestrator(store.clone()).await;
    let engine = create_engine(store).await;

    let result = orchestrator.perform_sync().await;
    assert!(result.success);
    assert_eq!(result.synced_items, SyncCategory::ALL.len());

    // A second engine over the same store never sees memory-only sync entries
    assert!(!engine.contains_key("sync:bookmarks").await.unwrap());
}

#[tokio::test]
async fn test_every_subscriber_sees_every_event() {
    let orchestrator = create_orchestrator(Arc::new(MemoryStore::new())).await;
    let mut first = orchestrator.subscribe().await;
    let mut second = orchestrator.subscribe().await;

    orchestrator.sync_category(SyncCategory::Presets).await;

    for receiver in [&mut first, &mut second] {
        let kinds: Vec<SyncEventKind> = vec![
            receiver.recv().await.unwrap().kind,
            receiver.recv().await.unwrap().kind,
            receiver.recv().await.unwrap().kind,
        ];
        assert_eq!(
            kinds,
            vec![
                SyncEventKind::Started,
                SyncEventKind::ItemSynced,
                SyncEventKind::Completed
            ]
        );
    }
}

#[tokio::test]
async fn test_sync_statistics_and_dispose() {
    let orchestrator = create_orchestrator(Arc::new(MemoryStore::new())).await;

    assert!(orchestrator.perform_sync().await.success);
    assert!(orchestrator.perform_sync().await.success);

    let stats = orchestrator.get_statistics().await;
    assert_eq!(stats.successful_syncs, 2);
    assert_eq!(stats.success_rate(), 1.0);

    orchestrator.dispose().await;
    orchestrator.dispose().await;
    assert!(orchestrator.subscribe().await.recv().await.is_err());
}

#[tokio::test]
async fn test_optimize_storage_keeps_live_data() {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = create_orchestrator(store.clone()).await;
    let engine = create_engine(store.clone()).await;

    engine.cache_data("keep", "yes", CacheOptions::default()).await.unwrap();
    engine
        .cache_data("drop", "no", CacheOptions::default().ttl(Duration::from_millis(20)))
        .await
        .unwrap();
    sleep(Duration::from_millis(50)).await;

    let report = orchestrator.optimize_storage().await.unwrap();
    assert_eq!(report.expired_disk, 1);
    assert!(store.get("cache:keep").await.unwrap().is_some());
    assert!(store.get("cache:drop").await.unwrap().is_none());
}
