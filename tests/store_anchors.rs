// tests/store_anchors.rs
//
// Anchor files: monotonic saves and merging between competitions.
//
use std::sync::Arc;

use chrono::NaiveDate;
use vf_scrape::store::{AnchorStore, RetryPolicy};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
}

#[tokio::test]
async fn load_returns_the_largest_value_ever_saved() {
    let dir = tempfile::tempdir().unwrap();
    let store = AnchorStore::open(dir.path(), RetryPolicy::immediate(1)).unwrap();

    assert_eq!(store.load(day(), "Euro Cup").await.unwrap(), None);
    for (minutes, effective) in [(570, 570), (540, 570), (600, 600), (0, 600), (600, 600)] {
        assert_eq!(store.save(day(), "Euro Cup", minutes).await.unwrap(), effective);
    }
    assert_eq!(store.load(day(), "Euro Cup").await.unwrap(), Some(600));
}

#[tokio::test]
async fn each_day_has_its_own_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = AnchorStore::open(dir.path(), RetryPolicy::immediate(1)).unwrap();
    let next = day().succ_opt().unwrap();

    store.save(day(), "Euro Cup", 1300).await.unwrap();
    assert_eq!(store.load(next, "Euro Cup").await.unwrap(), None);
    store.save(next, "Euro Cup", 30).await.unwrap();
    assert_eq!(store.load(next, "Euro Cup").await.unwrap(), Some(30));
    assert_eq!(store.load(day(), "Euro Cup").await.unwrap(), Some(1300));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_saves_for_different_competitions_all_survive() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(AnchorStore::open(dir.path(), RetryPolicy::immediate(3)).unwrap());
    let competitions = ["Euro Cup", "Premier League", "Sul Americano", "Copa do Mundo"];

    let mut handles = Vec::new();
    for (i, comp) in competitions.iter().enumerate() {
        let store = Arc::clone(&store);
        let comp = comp.to_string();
        handles.push(tokio::spawn(async move {
            for step in 0..20u32 {
                store.save(day(), &comp, 480 + i as u32 * 100 + step).await.unwrap();
            }
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let all = store.load_day(day()).await.unwrap();
    assert_eq!(all.len(), competitions.len());
    for (i, comp) in competitions.iter().enumerate() {
        assert_eq!(all[*comp], 480 + i as u32 * 100 + 19);
    }
}
