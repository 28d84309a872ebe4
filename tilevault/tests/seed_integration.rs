//! Integration tests for region seeding.
//!
//! These tests verify the complete seed flow through `CachedTileLayer`:
//! - queue order and notification sequence
//! - completeness and idempotence
//! - size budget enforcement
//! - missed tiles, retry and cancellation
//!
//! Run with: `cargo test --test seed_integration`

mod common;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use common::{drain, fixture, names, Fixture};
use tilevault::config::CacheConfig;
use tilevault::coord::{BoundingBox, TileGrid};
use tilevault::events::TileEvent;
use tilevault::layer::CachedTileLayer;
use tilevault::seed::SeedError;
use tilevault::source::TemplateSource;
use tilevault::store::{MemoryStore, TileStore};

// ============================================================================
// Helper Functions
// ============================================================================

/// A box that covers rows 3-4 and columns 4-5 at zoom 3.
fn small_bbox() -> BoundingBox {
    BoundingBox::new(-1.0, 1.0, 1.0, 46.0).unwrap()
}

fn url(z: u8, x: u32, y: u32) -> String {
    format!("https://tiles.example/{z}/{x}/{y}.png")
}

fn layer_with(config: CacheConfig) -> (CachedTileLayer, Fixture, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let f = fixture(store.clone(), config);
    let source = TemplateSource::new("https://tiles.example/{z}/{x}/{y}.png");
    let layer = CachedTileLayer::new(f.engine.clone(), Arc::new(source));
    layer.attach(TileGrid::default());
    (layer, f, store)
}

fn progress_counts(events: &[TileEvent]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|event| match event {
            TileEvent::SeedProgress {
                remaining_length, ..
            } => Some(*remaining_length),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Integration Tests
// ============================================================================

#[tokio::test]
async fn test_two_by_two_seed_notifications() {
    let (layer, f, store) = layer_with(CacheConfig::default());
    let mut rx = f.bus.subscribe();

    let report = layer
        .seed(small_bbox(), 3, 3, &CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    let events = drain(&mut rx);
    assert_eq!(
        names(&events),
        vec![
            "seedstart",
            "seedprogress",
            "seedprogress",
            "seedprogress",
            "seedprogress",
            "seedend"
        ]
    );
    assert_eq!(progress_counts(&events), vec![4, 3, 2, 1]);

    match &events[0] {
        TileEvent::SeedStart(summary) => {
            assert_eq!(summary.queue_length, 4);
            assert_eq!(summary.min_zoom, 3);
            assert_eq!(summary.max_zoom, 3);
            assert_eq!(summary.bbox, small_bbox());
        }
        other => panic!("unexpected first event: {other:?}"),
    }

    assert_eq!(report.summary.queue_length, 4);
    assert_eq!(report.fetched, 4);
    assert_eq!(report.saved, 4);
    assert!(report.missed.is_empty());
    assert!(!report.cancelled);

    assert_eq!(
        f.fetcher.calls(),
        vec![url(3, 4, 3), url(3, 5, 3), url(3, 4, 4), url(3, 5, 4)]
    );
    assert_eq!(store.len(), 4);
}

#[tokio::test]
async fn test_seed_covers_every_tile_in_range() {
    let (layer, _f, store) = layer_with(CacheConfig::default());

    let report = layer
        .seed(small_bbox(), 1, 4, &CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    let grid = TileGrid::default();
    let mut expected = 0;
    for zoom in 1..=4 {
        let range = grid.tile_range(&small_bbox(), zoom).unwrap();
        for tile in range.tiles() {
            let key = url(tile.zoom, tile.col, tile.row).into();
            assert!(
                store.get(&key, false).await.unwrap().is_some(),
                "missing {key}"
            );
            expected += 1;
        }
    }

    assert_eq!(report.summary.queue_length, expected);
    assert_eq!(store.len(), expected);
}

#[tokio::test]
async fn test_second_seed_fetches_nothing() {
    let (layer, f, _store) = layer_with(CacheConfig::default());
    let cancel = CancellationToken::new();

    layer.seed(small_bbox(), 3, 3, &cancel).await.unwrap();
    let first_calls = f.fetcher.call_count();

    // Entries are skipped however old they are.
    f.clock.advance(30 * 86_400_000);
    let mut rx = f.bus.subscribe();
    let report = layer.seed(small_bbox(), 3, 3, &cancel).await.unwrap().unwrap();

    assert_eq!(f.fetcher.call_count(), first_calls);
    assert_eq!(report.skipped, 4);
    assert_eq!(report.fetched, 0);
    assert_eq!(progress_counts(&drain(&mut rx)), vec![4, 3, 2, 1]);
}

#[tokio::test]
async fn test_size_limit_aborts_before_any_fetch() {
    let config = CacheConfig::default()
        .with_size_limit_bytes(3 * 1024)
        .with_assumed_tile_bytes(1024);
    let (layer, f, store) = layer_with(config);
    let mut rx = f.bus.subscribe();

    let err = layer
        .seed(small_bbox(), 3, 3, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SeedError::SizeLimitExceeded {
            tile_count: 4,
            max_tiles: 3,
            size_limit_bytes: 3072
        }
    ));
    assert_eq!(f.fetcher.call_count(), 0);
    assert!(store.is_empty());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_failed_tiles_are_missed_and_retried() {
    let (layer, f, store) = layer_with(CacheConfig::default());
    let cancel = CancellationToken::new();
    f.fetcher.fail(&url(3, 5, 3));

    let report = layer.seed(small_bbox(), 3, 3, &cancel).await.unwrap().unwrap();

    assert_eq!(report.missed_urls(), vec![url(3, 5, 3).as_str()]);
    assert_eq!(report.fetched, 3);
    assert_eq!(store.len(), 3);
    assert_eq!(layer.last_missed_tiles(), vec![url(3, 5, 3)]);

    f.fetcher.recover(&url(3, 5, 3));
    let mut rx = f.bus.subscribe();
    let retry = layer.retry_missed(&cancel).await.unwrap();

    assert_eq!(retry.summary.queue_length, 1);
    assert_eq!(retry.fetched, 1);
    assert!(retry.missed.is_empty());
    assert!(layer.last_missed_tiles().is_empty());
    assert_eq!(store.len(), 4);
    assert_eq!(
        names(&drain(&mut rx)),
        vec!["seedstart", "seedprogress", "seedend"]
    );

    assert!(layer.retry_missed(&cancel).await.is_none());
}

#[tokio::test]
async fn test_cancel_before_start_still_ends() {
    let (layer, f, _store) = layer_with(CacheConfig::default());
    let mut rx = f.bus.subscribe();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = layer.seed(small_bbox(), 3, 3, &cancel).await.unwrap().unwrap();

    assert!(report.cancelled);
    assert_eq!(report.processed(), 0);
    assert_eq!(f.fetcher.call_count(), 0);
    assert_eq!(names(&drain(&mut rx)), vec!["seedstart", "seedend"]);
}

#[tokio::test]
async fn test_cancel_mid_seed_stops_before_next_item() {
    let (layer, f, store) = layer_with(CacheConfig::default());
    let mut rx = f.bus.subscribe();
    let cancel = CancellationToken::new();
    f.fetcher.cancel_after(2, cancel.clone());

    let report = layer.seed(small_bbox(), 3, 3, &cancel).await.unwrap().unwrap();

    assert!(report.cancelled);
    assert_eq!(report.fetched, 2);
    assert_eq!(store.len(), 2);

    let events = drain(&mut rx);
    assert_eq!(progress_counts(&events), vec![4, 3]);
    assert_eq!(events.last().map(TileEvent::name), Some("seedend"));
}

#[tokio::test]
async fn test_seed_works_with_offline_layer() {
    let (layer, f, store) = layer_with(CacheConfig::default().with_use_only_cache(true));

    let report = layer
        .seed(small_bbox(), 3, 3, &CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.fetched, 4);
    assert_eq!(f.fetcher.call_count(), 4);
    assert_eq!(store.len(), 4);
}
