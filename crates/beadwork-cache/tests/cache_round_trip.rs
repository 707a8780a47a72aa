//! Full pipeline: analyze, persist the snapshot, reload, compare.

use beadwork_cache::{DiskCache, MemoryCache, ResultCache};
use beadwork_core::Issue;
use beadwork_graph::Analyzer;
use std::sync::Arc;
use tempfile::TempDir;

fn issue(id: &str) -> Issue {
    Issue::new(id, id)
}

fn issues() -> Vec<Issue> {
    vec![
        issue("a"),
        issue("b").blocked_by("a"),
        issue("c").blocked_by("a"),
        issue("d").blocked_by("b").blocked_by("c"),
    ]
}

#[tokio::test]
async fn analysis_snapshot_survives_disk_round_trip() {
    let analyzer = Analyzer::new();
    let handle = analyzer.analyze(&issues(), None).await.unwrap();
    let snapshot = handle.snapshot();

    let dir = TempDir::new().unwrap();
    let cache = DiskCache::new(dir.path()).unwrap();
    cache
        .put(handle.data_hash(), handle.config_hash(), &snapshot)
        .unwrap();

    let reloaded = cache
        .get(handle.data_hash(), handle.config_hash())
        .expect("entry should round-trip");
    assert_eq!(*snapshot, reloaded);
}

#[tokio::test]
async fn tiered_cache_short_circuits_recompute() {
    let analyzer = Analyzer::new();
    let handle = analyzer.analyze(&issues(), None).await.unwrap();

    let dir = TempDir::new().unwrap();
    let cache = ResultCache::new(
        MemoryCache::default(),
        Some(DiskCache::new(dir.path()).unwrap()),
    );
    cache.put(
        handle.data_hash(),
        handle.config_hash(),
        Arc::clone(&handle.snapshot()),
    );

    // A fresh tiered cache over the same directory sees the entry.
    let cold = ResultCache::new(
        MemoryCache::default(),
        Some(DiskCache::new(dir.path()).unwrap()),
    );
    let hit = cold
        .get(handle.data_hash(), handle.config_hash())
        .expect("disk tier should serve the entry");
    assert_eq!(hit.node_count, 4);
    assert_eq!(hit.edge_count, 4);
}

#[tokio::test]
async fn disk_hit_rebuilds_a_ready_handle() {
    use beadwork_graph::AnalysisHandle;

    let analyzer = Analyzer::new();
    let original = analyzer.analyze(&issues(), None).await.unwrap();

    let dir = TempDir::new().unwrap();
    let cache = DiskCache::new(dir.path()).unwrap();
    cache
        .put(original.data_hash(), original.config_hash(), &original.snapshot())
        .unwrap();

    // A consumer holding only the fingerprints can short-circuit phase 2.
    let snapshot = cache
        .get(original.data_hash(), original.config_hash())
        .unwrap();
    let rebuilt = AnalysisHandle::from_snapshot(
        original.data_hash().to_string(),
        original.structure_hash().to_string(),
        original.config_hash().to_string(),
        original.config().clone(),
        original.phase1().clone(),
        snapshot,
    );
    assert!(rebuilt.is_ready());
    rebuilt.wait_ready().await;
    assert_eq!(*rebuilt.snapshot(), *original.snapshot());
}

#[tokio::test]
async fn cache_key_is_stable_across_runs() {
    let analyzer_one = Analyzer::new();
    let analyzer_two = Analyzer::new();
    let first = analyzer_one.analyze(&issues(), None).await.unwrap();
    let second = analyzer_two.analyze(&issues(), None).await.unwrap();
    assert_eq!(first.cache_key(), second.cache_key());

    // Content edits change the key; the config half stays put.
    let mut edited = issues();
    edited[0].title = "new title".into();
    let third = analyzer_two.analyze(&edited, None).await.unwrap();
    assert_ne!(first.cache_key(), third.cache_key());
    assert_eq!(first.config_hash(), third.config_hash());
}
